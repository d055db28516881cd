//! Ride lifecycle state machine and driver-motion simulator for one rider session.
//!
//! A rider books a trip ([`session::SessionContext::request_ride`]), a driver is
//! assigned, the driver's position is animated toward pickup and then toward
//! drop-off one [`session::SessionContext::tick`] at a time, and the finished
//! ride is rated and archived in the session's [`history::RideHistory`].

pub mod clock;
pub mod config;
pub mod drivers;
pub mod error;
pub mod geo;
pub mod geocoding;
pub mod history;
pub mod lifecycle;
pub mod pricing;
pub mod random;
pub mod ride;
pub mod runner;
pub mod session;
pub mod systems;

#[cfg(feature = "test-helpers")]
pub mod test_helpers;

pub use error::RideError;
pub use geo::{position_at, route_between, GeoPoint, Route};
pub use ride::{LifecycleState, RideSession, RideSnapshot};
pub use session::{end_session, start_session, SessionContext, SharedSession, UserIdentity};
