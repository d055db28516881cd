use bevy_ecs::prelude::{Res, ResMut};
use tracing::warn;

use crate::clock::{EventKind, SimulationClock};
use crate::config::RefreshConfig;
use crate::session::SessionContext;

/// `AssignDriver`: pick a driver, then send them on their way right away.
pub fn assign_driver_system(
    mut clock: ResMut<SimulationClock>,
    mut session: ResMut<SessionContext>,
) {
    match session.assign_driver() {
        Ok(_) => clock.schedule_in(0, EventKind::BeginEnRoute),
        Err(err) => warn!(error = %err, "driver assignment failed"),
    }
}

/// `BeginEnRoute`: start the pickup leg and the tick cadence.
pub fn begin_en_route_system(
    mut clock: ResMut<SimulationClock>,
    mut session: ResMut<SessionContext>,
    config: Res<RefreshConfig>,
) {
    match session.begin_en_route() {
        Ok(_) => clock.schedule_in(config.interval_ms, EventKind::Tick),
        Err(err) => warn!(error = %err, "could not start pickup leg"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bevy_ecs::prelude::{Schedule, World};

    use crate::ride::LifecycleState;
    use crate::test_helpers::seeded_session;

    #[test]
    fn assignment_schedules_en_route_immediately() {
        let mut world = World::new();
        world.insert_resource(SimulationClock::default());
        let mut session = seeded_session(1);
        session
            .request_ride("Times Square", "Central Park")
            .expect("book");
        world.insert_resource(session);

        let mut schedule = Schedule::default();
        schedule.add_systems(assign_driver_system);
        schedule.run(&mut world);

        let session = world.resource::<SessionContext>();
        assert_eq!(session.state(), Some(LifecycleState::Assigned));
        assert!(session.active_ride().and_then(|r| r.driver()).is_some());

        let next = world
            .resource_mut::<SimulationClock>()
            .pop_next()
            .expect("begin en route event");
        assert_eq!(next.kind, EventKind::BeginEnRoute);
        assert_eq!(next.timestamp, 0);
    }

    #[test]
    fn failed_assignment_schedules_nothing() {
        let mut world = World::new();
        world.insert_resource(SimulationClock::default());
        world.insert_resource(seeded_session(1));

        let mut schedule = Schedule::default();
        schedule.add_systems(assign_driver_system);
        schedule.run(&mut world);

        assert!(world.resource::<SimulationClock>().is_empty());
        assert_eq!(world.resource::<SessionContext>().state(), None);
    }
}
