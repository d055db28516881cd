mod support;

use ride_core::history::Rating;
use ride_core::pricing::{estimate_duration_minutes, estimate_fare, BASE_FARE};
use ride_core::ride::LifecycleState;
use ride_core::test_helpers::{drive_to_completion, seeded_session, tick_while};
use ride_core::{position_at, route_between, RideError};

#[test]
fn fare_and_duration_properties() {
    for d in [0.0, 0.25, 1.0, 12.5, 400.0] {
        assert!(estimate_fare(d) >= BASE_FARE);
    }
    assert_eq!(estimate_fare(0.0), 5.0);
    assert_eq!(estimate_duration_minutes(60.0), 120);
}

#[test]
fn straight_route_and_endpoints() {
    let a = ride_core::test_helpers::times_square();
    let b = ride_core::test_helpers::central_park();
    let route = route_between(a, b, 25, 0.0).expect("route");
    for (i, p) in route.points().iter().enumerate() {
        let t = i as f64 / 24.0;
        let expected_lat = a.lat() + (b.lat() - a.lat()) * t;
        let expected_lng = a.lng() + (b.lng() - a.lng()) * t;
        assert!((p.lat() - expected_lat).abs() < 1e-12);
        assert!((p.lng() - expected_lng).abs() < 1e-12);
    }
    let curved = route_between(a, b, 25, 0.3).expect("curved");
    for r in [&route, &curved] {
        assert_eq!(position_at(r, 0.0), a);
        assert_eq!(position_at(r, 1.0), b);
    }
}

#[test]
fn ticks_from_en_route_increase_progress_to_exactly_one() {
    let mut ctx = seeded_session(3);
    ctx.request_ride("Times Square", "Central Park").expect("book");
    ctx.assign_driver().expect("assign");
    ctx.begin_en_route().expect("en route");

    let mut last = 0.0;
    while ctx.state() == Some(LifecycleState::EnRoute) {
        let ride = ctx.tick().expect("active ride");
        assert!(ride.progress() > last, "progress must strictly increase");
        assert!((0.0..=1.0).contains(&ride.progress()));
        last = ride.progress();
    }
    let ride = ctx.active_ride().expect("active ride");
    assert_eq!(ride.state(), LifecycleState::Arrived);
    assert_eq!(ride.progress(), 1.0);
    assert_eq!(ride.driver_location(), Some(ride.pickup()));

    // Polling past arrival changes nothing.
    let ride = ctx.tick().expect("active ride");
    assert_eq!(ride.state(), LifecycleState::Arrived);
    assert_eq!(ride.progress(), 1.0);
}

#[test]
fn driver_location_follows_progress_each_tick() {
    let mut ctx = seeded_session(8);
    ctx.request_ride("Grand Central Terminal", "Statue of Liberty")
        .expect("book");
    ctx.assign_driver().expect("assign");
    let start = ctx
        .active_ride()
        .and_then(|r| r.driver_location())
        .expect("driver waits at start");

    ctx.begin_en_route().expect("en route");
    let ride = ctx.tick().expect("active ride");
    let route = ride.route().expect("route");
    assert_eq!(route.origin(), start);
    assert_eq!(
        ride.driver_location(),
        Some(position_at(route, ride.progress()))
    );
}

#[test]
fn cancel_is_legal_from_every_non_terminal_state() {
    let reach: [fn(&mut ride_core::SessionContext); 5] = [
        |_| {},
        |ctx| {
            ctx.assign_driver().expect("assign");
        },
        |ctx| {
            ctx.assign_driver().expect("assign");
            ctx.begin_en_route().expect("en route");
            ctx.tick();
        },
        |ctx| {
            ctx.assign_driver().expect("assign");
            ctx.begin_en_route().expect("en route");
            tick_while(ctx, LifecycleState::EnRoute, 1_000);
        },
        |ctx| {
            ctx.assign_driver().expect("assign");
            ctx.begin_en_route().expect("en route");
            tick_while(ctx, LifecycleState::EnRoute, 1_000);
            ctx.start_trip().expect("start");
            ctx.tick();
        },
    ];
    let expected = [
        LifecycleState::Requested,
        LifecycleState::Assigned,
        LifecycleState::EnRoute,
        LifecycleState::Arrived,
        LifecycleState::InProgress,
    ];

    for (advance, state) in reach.iter().zip(expected) {
        let mut ctx = seeded_session(17);
        ctx.request_ride("Times Square", "Central Park").expect("book");
        advance(&mut ctx);
        assert_eq!(ctx.state(), Some(state));

        let cancelled = ctx.cancel().expect("cancel");
        assert_eq!(cancelled.state(), LifecycleState::Cancelled);
        assert!(ctx.active_ride().is_none());
        assert!(ctx.history().is_empty());
    }
}

#[test]
fn cancel_after_completion_is_rejected() {
    let mut ctx = seeded_session(2);
    ctx.request_ride("Times Square", "Central Park").expect("book");
    drive_to_completion(&mut ctx);

    let err = ctx.cancel().expect_err("completed rides cannot be cancelled");
    assert!(matches!(
        err,
        RideError::InvalidTransition {
            from: LifecycleState::Completed,
            ..
        }
    ));
    assert_eq!(ctx.state(), Some(LifecycleState::Completed));
}

#[test]
fn out_of_range_rating_is_rejected_not_clamped() {
    let mut ctx = seeded_session(4);
    ctx.request_ride("Times Square", "Central Park").expect("book");
    drive_to_completion(&mut ctx);

    assert!(matches!(
        ctx.submit_feedback(6, None),
        Err(RideError::Validation(_))
    ));
    assert!(matches!(
        ctx.submit_feedback(0, None),
        Err(RideError::Validation(_))
    ));
    assert!(ctx.history().is_empty());
    assert_eq!(ctx.state(), Some(LifecycleState::Completed));

    let entry = ctx.submit_feedback(3, None).expect("archive");
    assert_eq!(entry.rating, Rating::new(3).expect("rating"));
    assert_eq!(ctx.history().len(), 1);
    assert_eq!(ctx.history().entries()[0].rating.stars(), 3);
    assert!(ctx.active_ride().is_none());
}

#[test]
fn feedback_without_completed_ride_fails() {
    let mut ctx = seeded_session(5);
    assert_eq!(ctx.submit_feedback(4, None), Err(RideError::NoActiveRide));

    ctx.request_ride("Times Square", "Central Park").expect("book");
    ctx.assign_driver().expect("assign");
    assert_eq!(ctx.submit_feedback(4, None), Err(RideError::NoActiveRide));
    assert_eq!(ctx.state(), Some(LifecycleState::Assigned));
}

#[test]
fn end_to_end_ride_is_archived_with_booked_fare() {
    let mut ctx = seeded_session(42);
    let booked_fare = ctx
        .request_ride("Times Square", "Central Park")
        .expect("book")
        .fare();
    assert_eq!(ctx.state(), Some(LifecycleState::Requested));

    ctx.assign_driver().expect("assign");
    ctx.begin_en_route().expect("en route");
    while ctx.state() != Some(LifecycleState::Arrived) {
        ctx.tick();
    }
    ctx.start_trip().expect("start trip");
    while ctx.state() != Some(LifecycleState::Completed) {
        ctx.tick();
    }

    let entry = ctx
        .submit_feedback(5, Some("great ride"))
        .expect("feedback");
    assert_eq!(ctx.history().len(), 1);
    assert_eq!(entry.fare, booked_fare);
    assert_eq!(entry.feedback.as_deref(), Some("great ride"));
    assert_eq!(entry.pickup_address.as_deref(), Some("Times Square"));
    assert!(!entry.driver_name.is_empty());
    assert!(ctx.active_ride().is_none());
}
