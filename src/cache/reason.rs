//! Eviction Reason Module
//!
//! Closed set of causes reported to the eviction callback.

use std::fmt;

use serde::Serialize;

use crate::error::CacheError;

/// Label rendered for raw codes outside the known reasons.
pub const UNKNOWN_REASON: &str = "Unknown";

// == Evict Reason ==
/// Why an item left the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[repr(u8)]
pub enum EvictReason {
    /// Explicit `remove`
    Removed = 0,
    /// Reaped after its TTL elapsed
    Expired = 1,
    /// Displaced by an insertion into a full cache
    OutOfCapacity = 2,
}

impl EvictReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            EvictReason::Removed => "Removed",
            EvictReason::Expired => "Expired",
            EvictReason::OutOfCapacity => "OutOfCapacity",
        }
    }

    /// Renders a raw reason code, falling back to `"Unknown"`.
    pub fn label(code: u8) -> &'static str {
        EvictReason::try_from(code)
            .map(|reason| reason.as_str())
            .unwrap_or(UNKNOWN_REASON)
    }
}

impl fmt::Display for EvictReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<EvictReason> for u8 {
    fn from(reason: EvictReason) -> Self {
        reason as u8
    }
}

impl TryFrom<u8> for EvictReason {
    type Error = CacheError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(EvictReason::Removed),
            1 => Ok(EvictReason::Expired),
            2 => Ok(EvictReason::OutOfCapacity),
            other => Err(CacheError::UnknownReason(other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reason_display() {
        assert_eq!(EvictReason::Removed.to_string(), "Removed");
        assert_eq!(EvictReason::Expired.to_string(), "Expired");
        assert_eq!(EvictReason::OutOfCapacity.to_string(), "OutOfCapacity");
    }

    #[test]
    fn test_reason_codes() {
        for reason in [
            EvictReason::Removed,
            EvictReason::Expired,
            EvictReason::OutOfCapacity,
        ] {
            assert_eq!(EvictReason::try_from(u8::from(reason)), Ok(reason));
        }
        assert_eq!(
            EvictReason::try_from(3),
            Err(CacheError::UnknownReason(3))
        );
    }

    #[test]
    fn test_unknown_reason_label() {
        assert_eq!(EvictReason::label(1), "Expired");
        assert_eq!(EvictReason::label(3), "Unknown");
        assert_eq!(EvictReason::label(u8::MAX), "Unknown");
    }

    #[test]
    fn test_reason_serialize() {
        let json = serde_json::to_string(&EvictReason::OutOfCapacity).unwrap();
        assert_eq!(json, r#""OutOfCapacity""#);
    }
}
