//! Rolling buffer of session snapshots, one per processed event, for renderers
//! that replay or chart the ride.

use std::collections::VecDeque;

use bevy_ecs::prelude::{Res, ResMut, Resource};
use serde::Serialize;

use crate::clock::SimulationClock;
use crate::config::RefreshConfig;
use crate::session::{SessionContext, SessionSnapshot};

#[derive(Debug, Clone, Serialize)]
pub struct RideFrame {
    pub timestamp_ms: u64,
    pub snapshot: SessionSnapshot,
}

#[derive(Debug, Default, Resource)]
pub struct RideFrames {
    pub frames: VecDeque<RideFrame>,
}

impl RideFrames {
    pub fn latest(&self) -> Option<&RideFrame> {
        self.frames.back()
    }
}

pub fn capture_snapshot_system(
    clock: Res<SimulationClock>,
    session: Res<SessionContext>,
    config: Res<RefreshConfig>,
    mut frames: ResMut<RideFrames>,
) {
    frames.frames.push_back(RideFrame {
        timestamp_ms: clock.now(),
        snapshot: session.snapshot(),
    });
    while frames.frames.len() > config.max_frames.max(1) {
        frames.frames.pop_front();
    }
}
