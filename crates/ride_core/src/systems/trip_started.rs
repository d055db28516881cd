use bevy_ecs::prelude::{Res, ResMut};
use tracing::warn;

use crate::clock::{EventKind, SimulationClock};
use crate::config::RefreshConfig;
use crate::session::SessionContext;

/// `StartTrip`: rider boards, drop-off leg begins ticking.
pub fn trip_started_system(
    mut clock: ResMut<SimulationClock>,
    mut session: ResMut<SessionContext>,
    config: Res<RefreshConfig>,
) {
    match session.start_trip() {
        Ok(_) => clock.schedule_in(config.interval_ms, EventKind::Tick),
        Err(err) => warn!(error = %err, "could not start trip"),
    }
}
