//! Refresh runner: drives a session the way an auto-refreshing UI would.
//!
//! The session lives in a bevy_ecs `World` as a resource. Each step pops the
//! next event from [`SimulationClock`], inserts it as [`CurrentEvent`], then
//! runs the schedule; the system for that event kind issues one session
//! command and schedules the follow-up. Nothing here runs on its own timer:
//! the caller decides how fast to step.

use bevy_ecs::prelude::{Res, Schedule, World};
use bevy_ecs::schedule::IntoSystemConfigs;

use crate::clock::{CurrentEvent, Event, EventKind, SimulationClock};
use crate::config::RefreshConfig;
use crate::session::SessionContext;
use crate::systems::{
    dispatch::{assign_driver_system, begin_en_route_system},
    movement::movement_system,
    telemetry_snapshot::{capture_snapshot_system, RideFrames},
    trip_started::trip_started_system,
};

fn is_assign_driver(event: Option<Res<CurrentEvent>>) -> bool {
    event
        .map(|e| e.0.kind == EventKind::AssignDriver)
        .unwrap_or(false)
}

fn is_begin_en_route(event: Option<Res<CurrentEvent>>) -> bool {
    event
        .map(|e| e.0.kind == EventKind::BeginEnRoute)
        .unwrap_or(false)
}

fn is_tick(event: Option<Res<CurrentEvent>>) -> bool {
    event
        .map(|e| e.0.kind == EventKind::Tick)
        .unwrap_or(false)
}

fn is_start_trip(event: Option<Res<CurrentEvent>>) -> bool {
    event
        .map(|e| e.0.kind == EventKind::StartTrip)
        .unwrap_or(false)
}

/// World holding `session` plus the clock, cadence and frame buffer.
pub fn refresh_world(session: SessionContext, config: RefreshConfig) -> World {
    let mut world = World::new();
    world.insert_resource(session);
    world.insert_resource(config);
    world.insert_resource(SimulationClock::default());
    world.insert_resource(RideFrames::default());
    world
}

/// Command systems gated on the current event kind, then a snapshot capture.
/// Chained so the snapshot always sees the command's effect.
pub fn refresh_schedule() -> Schedule {
    let mut schedule = Schedule::default();
    schedule.add_systems(
        (
            assign_driver_system.run_if(is_assign_driver),
            begin_en_route_system.run_if(is_begin_en_route),
            movement_system.run_if(is_tick),
            trip_started_system.run_if(is_start_trip),
            capture_snapshot_system,
        )
            .chain(),
    );
    schedule
}

/// Queue driver assignment after the configured search delay. Call after a
/// ride has been requested on the world's session.
///
/// Events still pending from an earlier, cancelled ride are dropped so only
/// one tick chain ever drives the session.
pub fn dispatch_requested_ride(world: &mut World) {
    let delay = world
        .get_resource::<RefreshConfig>()
        .map(|config| config.driver_search_delay_ms)
        .unwrap_or_default();
    let mut clock = world.resource_mut::<SimulationClock>();
    clock.clear();
    clock.schedule_in(delay, EventKind::AssignDriver);
}

/// Queue a manual trip start, for hosts that run with `auto_start_trip = false`.
pub fn request_trip_start(world: &mut World) {
    world
        .resource_mut::<SimulationClock>()
        .schedule_in(0, EventKind::StartTrip);
}

/// Runs one step: pops the next event, inserts it as [`CurrentEvent`], then runs the schedule.
/// Returns `false` when the queue is empty.
pub fn run_next_event(world: &mut World, schedule: &mut Schedule) -> bool {
    run_next_event_with_hook(world, schedule, |_, _| {})
}

/// Runs one step and invokes `hook` after the schedule completes.
pub fn run_next_event_with_hook<F>(world: &mut World, schedule: &mut Schedule, mut hook: F) -> bool
where
    F: FnMut(&World, &Event),
{
    let event = match world.resource_mut::<SimulationClock>().pop_next() {
        Some(e) => e,
        None => return false,
    };
    world.insert_resource(CurrentEvent(event));
    schedule.run(world);
    hook(world, &event);
    true
}

/// Runs steps until the event queue is empty or `max_steps` is reached.
/// Returns the number of steps executed.
pub fn run_until_empty(world: &mut World, schedule: &mut Schedule, max_steps: usize) -> usize {
    let mut steps = 0;
    while steps < max_steps && run_next_event(world, schedule) {
        steps += 1;
    }
    steps
}
