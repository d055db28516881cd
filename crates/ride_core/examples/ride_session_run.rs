//! Book one ride, let the refresh runner drive it to completion, then rate it.
//!
//! Run with: RUST_LOG=ride_core=debug cargo run -p ride_core --example ride_session_run

use ride_core::config::{RefreshConfig, SessionConfig};
use ride_core::runner::{dispatch_requested_ride, refresh_schedule, refresh_world, run_until_empty};
use ride_core::systems::telemetry_snapshot::RideFrames;
use ride_core::{end_session, RideError, SessionContext, UserIdentity};
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), RideError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let mut session = SessionContext::builder(UserIdentity::new("demo-rider"))
        .config(SessionConfig::default().with_seed(123))
        .build()?;

    let ride = session.request_ride("Times Square", "Central Park")?;
    println!(
        "--- Requested {} -> {}: {:.2} km, ${:.2}, ~{} min ---",
        ride.pickup(),
        ride.dropoff(),
        ride.distance_km(),
        ride.fare(),
        ride.eta_minutes()
    );

    let mut world = refresh_world(session, RefreshConfig::default());
    dispatch_requested_ride(&mut world);
    let mut schedule = refresh_schedule();
    let steps = run_until_empty(&mut world, &mut schedule, 10_000);

    let frames = world.resource::<RideFrames>();
    println!("Steps executed: {}", steps);
    println!("Frames captured: {}", frames.frames.len());
    for frame in frames.frames.iter().step_by(10) {
        if let Some(ride) = &frame.snapshot.active_ride {
            println!(
                "  t={:>6} ms  {:<11} progress={:.2}",
                frame.timestamp_ms, ride.state, ride.progress
            );
        }
    }

    let Some(mut session) = world.remove_resource::<SessionContext>() else {
        return Ok(());
    };
    let entry = session.submit_feedback(5, Some("great ride"))?;
    println!("Archived ride {} with {} ({} stars)", entry.ride_id, entry.driver_name, entry.rating.stars());

    let history = end_session(session);
    println!("Rides this session: {}, spent ${:.2}", history.len(), history.total_spent());
    Ok(())
}
