//! Background Tasks Module
//!
//! Contains the background tasks each cache instance runs.
//!
//! # Tasks
//! - TTL Expiration: sleeps until the soonest deadline and reaps expired items
//! - Cache Dump: periodically hands a snapshot to a diagnostic sink

mod dump;
mod expiration;

pub(crate) use dump::spawn_dump_task;
pub(crate) use expiration::spawn_expiration_task;
