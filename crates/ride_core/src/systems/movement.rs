//! Movement: one `Tick` event advances the driver one step along the current leg.

use bevy_ecs::prelude::{Res, ResMut};

use crate::clock::{EventKind, SimulationClock};
use crate::config::RefreshConfig;
use crate::ride::{LifecycleState, RideSession};
use crate::session::SessionContext;

pub fn movement_system(
    mut clock: ResMut<SimulationClock>,
    mut session: ResMut<SessionContext>,
    config: Res<RefreshConfig>,
) {
    let Some(state) = session.tick().map(RideSession::state) else {
        return;
    };

    match state {
        LifecycleState::EnRoute | LifecycleState::InProgress => {
            clock.schedule_in(config.interval_ms, EventKind::Tick);
        }
        LifecycleState::Arrived if config.auto_start_trip => {
            clock.schedule_in(config.boarding_delay_ms, EventKind::StartTrip);
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bevy_ecs::prelude::{Schedule, World};

    use crate::config::SessionConfig;
    use crate::test_helpers::{session_with_config, test_identity};

    fn en_route_world(config: RefreshConfig, tick_step: f64) -> World {
        let mut world = World::new();
        world.insert_resource(SimulationClock::default());
        world.insert_resource(config);
        let mut session = session_with_config(
            test_identity(),
            SessionConfig::default().with_seed(4).with_tick_step(tick_step),
        );
        session
            .request_ride("Times Square", "Central Park")
            .expect("book");
        session.assign_driver().expect("assign");
        session.begin_en_route().expect("en route");
        world.insert_resource(session);
        world
    }

    #[test]
    fn tick_while_moving_schedules_next_tick() {
        let mut world = en_route_world(RefreshConfig::default(), 0.1);
        let mut schedule = Schedule::default();
        schedule.add_systems(movement_system);
        schedule.run(&mut world);

        let progress = world
            .resource::<SessionContext>()
            .active_ride()
            .map(RideSession::progress);
        assert_eq!(progress, Some(0.1));

        let next = world
            .resource_mut::<SimulationClock>()
            .pop_next()
            .expect("next tick");
        assert_eq!(next.kind, EventKind::Tick);
        assert_eq!(next.timestamp, 1000);
    }

    #[test]
    fn arrival_schedules_trip_start_only_when_enabled() {
        let mut world = en_route_world(RefreshConfig::default(), 1.0);
        let mut schedule = Schedule::default();
        schedule.add_systems(movement_system);
        schedule.run(&mut world);

        assert_eq!(
            world.resource::<SessionContext>().state(),
            Some(LifecycleState::Arrived)
        );
        let next = world
            .resource_mut::<SimulationClock>()
            .pop_next()
            .expect("start trip");
        assert_eq!(next.kind, EventKind::StartTrip);

        let manual = RefreshConfig {
            auto_start_trip: false,
            ..RefreshConfig::default()
        };
        let mut world = en_route_world(manual, 1.0);
        let mut schedule = Schedule::default();
        schedule.add_systems(movement_system);
        schedule.run(&mut world);
        assert!(world.resource::<SimulationClock>().is_empty());
    }
}
