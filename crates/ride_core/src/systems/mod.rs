//! Systems run by the refresh schedule, one per command the polling loop issues.
//!
//! Each system reacts to a single [`crate::clock::EventKind`], calls the matching
//! [`crate::session::SessionContext`] command and schedules the follow-up event.

pub mod dispatch;
pub mod movement;
pub mod telemetry_snapshot;
pub mod trip_started;
