//! Ride lifecycle state machine.
//!
//! ```text
//! Requested -> Assigned -> EnRoute -(tick)-> Arrived -> InProgress -(tick)-> Completed
//!      \__________\___________\_____________\______________\--> Cancelled
//! ```
//!
//! Transitions are guarded here; the session context owns the ride and decides
//! what happens around them (discarding cancelled rides, archiving completed ones).

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::MotionConfig;
use crate::drivers::Driver;
use crate::error::RideError;
use crate::geo::{route_between_with_bend, GeoPoint};
use crate::ride::{LifecycleState, RideSession};

/// Progress within this distance of 1.0 counts as arrival, absorbing float drift
/// from repeated addition of the step.
const ARRIVAL_EPSILON: f64 = 1e-9;

/// Commands the presentation layer can issue against a ride.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Command {
    RequestRide,
    AssignDriver,
    BeginEnRoute,
    Tick,
    StartTrip,
    Cancel,
    SubmitFeedback,
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Command::RequestRide => "request a ride",
            Command::AssignDriver => "assign a driver",
            Command::BeginEnRoute => "begin driving to pickup",
            Command::Tick => "tick",
            Command::StartTrip => "start the trip",
            Command::Cancel => "cancel",
            Command::SubmitFeedback => "submit feedback",
        };
        f.write_str(name)
    }
}

impl LifecycleState {
    /// Whether `command` is legal in this state.
    pub fn accepts(self, command: Command) -> bool {
        use LifecycleState::*;
        match command {
            Command::RequestRide => false,
            Command::AssignDriver => self == Requested,
            Command::BeginEnRoute => self == Assigned,
            Command::Tick => self.is_moving(),
            Command::StartTrip => self == Arrived,
            Command::Cancel => !self.is_terminal(),
            Command::SubmitFeedback => self == Completed,
        }
    }

    /// States reachable in one step from this one.
    pub fn successors(self) -> &'static [LifecycleState] {
        use LifecycleState::*;
        match self {
            Requested => &[Assigned, Cancelled],
            Assigned => &[EnRoute, Cancelled],
            EnRoute => &[EnRoute, Arrived, Cancelled],
            Arrived => &[InProgress, Cancelled],
            InProgress => &[InProgress, Completed, Cancelled],
            Completed | Cancelled => &[],
        }
    }

    pub fn can_transition_to(self, next: LifecycleState) -> bool {
        self.successors().contains(&next)
    }
}

impl RideSession {
    fn guard(&self, command: Command) -> Result<(), RideError> {
        if self.state.accepts(command) {
            Ok(())
        } else {
            Err(RideError::InvalidTransition {
                from: self.state,
                command,
            })
        }
    }

    fn enter(&mut self, next: LifecycleState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "illegal transition {:?} -> {:?}",
            self.state,
            next
        );
        debug!(ride_id = %self.id, from = ?self.state, to = ?next, "ride transition");
        self.state = next;
    }

    /// `Requested -> Assigned`. The driver waits at `driver_start` until the
    /// first leg begins.
    pub(crate) fn assign(
        &mut self,
        driver: Arc<Driver>,
        driver_start: GeoPoint,
        now: DateTime<Utc>,
    ) -> Result<(), RideError> {
        self.guard(Command::AssignDriver)?;
        self.driver = Some(driver);
        self.driver_start = Some(driver_start);
        self.assigned_at = Some(now);
        self.enter(LifecycleState::Assigned);
        Ok(())
    }

    /// `Assigned -> EnRoute` along a fresh route from the driver's start to pickup.
    pub(crate) fn begin_en_route(&mut self, motion: &MotionConfig) -> Result<(), RideError> {
        self.guard(Command::BeginEnRoute)?;
        let start = self.driver_start.unwrap_or(self.pickup);
        let route = route_between_with_bend(
            start,
            self.pickup,
            motion.route_points,
            motion.curvature,
            self.bend,
        )?;
        self.route = Some(route);
        self.progress = 0.0;
        self.enter(LifecycleState::EnRoute);
        Ok(())
    }

    /// `Arrived -> InProgress` along a fresh route from pickup to drop-off.
    pub(crate) fn start_trip(
        &mut self,
        motion: &MotionConfig,
        now: DateTime<Utc>,
    ) -> Result<(), RideError> {
        self.guard(Command::StartTrip)?;
        let route = route_between_with_bend(
            self.pickup,
            self.dropoff,
            motion.route_points,
            motion.curvature,
            self.bend,
        )?;
        self.route = Some(route);
        self.progress = 0.0;
        self.picked_up_at = Some(now);
        self.enter(LifecycleState::InProgress);
        Ok(())
    }

    /// Advance progress by `step` on the current leg.
    ///
    /// Outside `EnRoute`/`InProgress` this is a no-op. Progress never
    /// overshoots: the step that would cross 1.0 lands on exactly 1.0 and the
    /// leg's end transition fires on that same tick.
    pub(crate) fn advance(&mut self, step: f64, now: DateTime<Utc>) -> LifecycleState {
        if !self.state.is_moving() {
            return self.state;
        }

        let next = self.progress + step;
        if next >= 1.0 - ARRIVAL_EPSILON {
            self.progress = 1.0;
            match self.state {
                LifecycleState::EnRoute => self.enter(LifecycleState::Arrived),
                _ => {
                    self.completed_at = Some(now);
                    self.enter(LifecycleState::Completed);
                }
            }
        } else {
            self.progress = next;
        }
        self.state
    }

    /// Any non-terminal state `-> Cancelled`. In-flight progress is kept only
    /// for the caller's last look; the session context drops the ride.
    pub(crate) fn cancel(&mut self) -> Result<(), RideError> {
        self.guard(Command::Cancel)?;
        self.enter(LifecycleState::Cancelled);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::Bend;
    use crate::pricing::{FareConfig, PaymentMethod, RideTier};
    use chrono::TimeZone;
    use uuid::Uuid;

    fn ride() -> RideSession {
        let pickup = GeoPoint::new(40.7580, -73.9855).expect("pickup");
        let dropoff = GeoPoint::new(40.7829, -73.9654).expect("dropoff");
        let quote = FareConfig::default().quote(3.2, RideTier::Standard);
        RideSession::new(
            Uuid::nil(),
            pickup,
            dropoff,
            None,
            None,
            quote,
            PaymentMethod::Cash,
            Bend::Right,
            now(),
        )
    }

    fn driver() -> Arc<Driver> {
        Arc::new(Driver {
            id: 1,
            name: "Test Driver".into(),
            vehicle_description: "Sedan".into(),
            plate: "TST 001".into(),
            rating: 4.5,
            trip_count: 10,
            photo_ref: String::new(),
        })
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 8, 0, 0).unwrap()
    }

    fn en_route_ride() -> RideSession {
        let mut ride = ride();
        let start = GeoPoint::new(40.7700, -73.9900).expect("start");
        ride.assign(driver(), start, now()).expect("assign");
        ride.begin_en_route(&MotionConfig::default()).expect("en route");
        ride
    }

    #[test]
    fn accepts_matches_transition_table() {
        use LifecycleState::*;
        assert!(Requested.accepts(Command::AssignDriver));
        assert!(!Assigned.accepts(Command::AssignDriver));
        assert!(Arrived.accepts(Command::StartTrip));
        assert!(!EnRoute.accepts(Command::StartTrip));
        assert!(Completed.accepts(Command::SubmitFeedback));
        for state in [Requested, Assigned, EnRoute, Arrived, InProgress] {
            assert!(state.accepts(Command::Cancel), "{state} should be cancellable");
            assert!(state.can_transition_to(Cancelled));
        }
        assert!(!Completed.accepts(Command::Cancel));
        assert!(!Cancelled.accepts(Command::Cancel));
        assert!(Cancelled.successors().is_empty());
    }

    #[test]
    fn begin_en_route_resets_progress_and_builds_route_to_pickup() {
        let ride = en_route_ride();
        assert_eq!(ride.state(), LifecycleState::EnRoute);
        assert_eq!(ride.progress(), 0.0);
        let route = ride.route().expect("route");
        assert_eq!(route.destination(), ride.pickup());
        assert_eq!(route.len(), MotionConfig::default().route_points);
        assert_eq!(ride.driver_location(), Some(route.origin()));
    }

    #[test]
    fn ticks_increase_progress_until_exact_arrival() {
        let mut ride = en_route_ride();
        let mut last = ride.progress();
        let mut ticks = 0;
        while ride.state() == LifecycleState::EnRoute {
            ride.advance(0.02, now());
            ticks += 1;
            assert!(ride.progress() > last);
            assert!(ride.progress() <= 1.0);
            last = ride.progress();
            assert!(ticks <= 50, "must arrive within 50 ticks");
        }
        assert_eq!(ticks, 50);
        assert_eq!(ride.state(), LifecycleState::Arrived);
        assert_eq!(ride.progress(), 1.0);
        assert_eq!(ride.driver_location(), Some(ride.pickup()));
    }

    #[test]
    fn overshooting_step_clamps_and_transitions_same_tick() {
        let mut ride = en_route_ride();
        ride.advance(0.7, now());
        assert_eq!(ride.state(), LifecycleState::EnRoute);
        assert_eq!(ride.advance(0.7, now()), LifecycleState::Arrived);
        assert_eq!(ride.progress(), 1.0);
    }

    #[test]
    fn tick_outside_moving_states_is_a_no_op() {
        let mut ride = ride();
        assert_eq!(ride.advance(0.5, now()), LifecycleState::Requested);
        assert_eq!(ride.progress(), 0.0);

        let mut arrived = en_route_ride();
        arrived.advance(1.0, now());
        assert_eq!(arrived.advance(0.5, now()), LifecycleState::Arrived);
        assert_eq!(arrived.progress(), 1.0);
    }

    #[test]
    fn start_trip_resets_progress_and_completes_at_dropoff() {
        let mut ride = en_route_ride();
        ride.advance(1.0, now());
        ride.start_trip(&MotionConfig::default(), now())
            .expect("start trip");
        assert_eq!(ride.state(), LifecycleState::InProgress);
        assert_eq!(ride.progress(), 0.0);
        assert_eq!(ride.driver_location(), Some(ride.pickup()));

        ride.advance(0.5, now());
        ride.advance(0.5, now());
        assert_eq!(ride.state(), LifecycleState::Completed);
        assert_eq!(ride.driver_location(), Some(ride.dropoff()));
        assert_eq!(ride.completed_at(), Some(now()));
    }

    #[test]
    fn out_of_order_commands_are_rejected() {
        let mut ride = ride();
        assert_eq!(
            ride.begin_en_route(&MotionConfig::default()),
            Err(RideError::InvalidTransition {
                from: LifecycleState::Requested,
                command: Command::BeginEnRoute,
            })
        );
        assert!(ride.start_trip(&MotionConfig::default(), now()).is_err());
        assert_eq!(ride.state(), LifecycleState::Requested);
    }

    #[test]
    fn cancel_is_absorbing() {
        let mut ride = en_route_ride();
        ride.advance(0.3, now());
        ride.cancel().expect("cancel");
        assert_eq!(ride.state(), LifecycleState::Cancelled);
        assert!(ride.cancel().is_err());
        assert_eq!(ride.advance(0.1, now()), LifecycleState::Cancelled);
    }
}
