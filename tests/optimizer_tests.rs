use farrier_route::constants::{MESSAGE_MISSING_LOCATIONS, MESSAGE_NO_APPOINTMENTS};
use farrier_route::error::AppError;
use farrier_route::models::{AppointmentStatus, Coordinates, Stop};
use farrier_route::services::nearest_neighbor::order_by_proximity;
use farrier_route::services::reasoning::ReasoningBackend;
use farrier_route::services::route_optimizer::RouteOptimizer;
use farrier_route::services::time_estimator::{annotate_times, TimeModel};
use std::sync::Arc;
use std::time::{Duration, Instant};
use time::macros::{date, datetime};
use uuid::Uuid;

mod common;

use common::{appointment_row, build_optimizer, farrier, test_optimizer_config, StubBackend};
use common::InMemoryAppointmentRepository;

const TWO_STOP_REPLY: &str = r#"Here is the plan:
```json
{"order": [1, 0], "total_estimated_minutes": 128, "steps": [
  {"appointment_index": 1, "departure_time": "08:00", "arrival_time": "08:38", "work_duration_minutes": 45, "maps_url": ""},
  {"appointment_index": 0, "departure_time": "09:23", "arrival_time": "10:00", "work_duration_minutes": 45, "maps_url": "https://www.google.com/maps/dir/?api=1&destination=45,9&travelmode=driving"}
]}
```"#;

/// Farrier with three confirmed stops on 2026-10-16; the second has no
/// coordinates.
fn day_with_missing_location(repo: &InMemoryAppointmentRepository) -> (Uuid, Vec<Uuid>) {
    let profile = farrier(Some((45.46, 9.19)));
    let farrier_id = profile.id;
    repo.add_farrier(profile);

    let rows = [
        appointment_row("Rossi", Some((45.0, 9.0)), datetime!(2026-10-16 08:00 UTC), 1),
        appointment_row("Bianchi", None, datetime!(2026-10-16 09:00 UTC), 2),
        appointment_row("Verdi", Some((45.5, 9.5)), datetime!(2026-10-16 10:00 UTC), 1),
    ];
    let ids = rows.iter().map(|r| r.id).collect();
    for row in rows {
        repo.add_appointment(farrier_id, row);
    }
    (farrier_id, ids)
}

#[tokio::test]
async fn test_unconfigured_fallback_scenario() {
    let repo = Arc::new(InMemoryAppointmentRepository::new());
    let profile = farrier(Some((45.46, 9.19)));
    let farrier_id = profile.id;
    repo.add_farrier(profile);
    // Inserted out of schedule order
    repo.add_appointment(
        farrier_id,
        appointment_row("C", Some((45.5, 9.5)), datetime!(2026-10-16 11:00 UTC), 1),
    );
    repo.add_appointment(
        farrier_id,
        appointment_row("A", Some((45.0, 9.0)), datetime!(2026-10-16 08:00 UTC), 1),
    );
    repo.add_appointment(
        farrier_id,
        appointment_row("B", Some((45.01, 9.0)), datetime!(2026-10-16 09:30 UTC), 1),
    );

    let optimizer = build_optimizer(repo, None, &test_optimizer_config());
    assert!(!optimizer.is_configured());

    let route = optimizer
        .optimize_route(farrier_id, date!(2026 - 10 - 16))
        .await
        .unwrap();

    assert_eq!(route.order, vec![0, 1, 2]);
    assert_eq!(route.total_estimated_minutes, 135);
    assert!(route.message.is_none());
    let arrivals: Vec<_> = route.steps.iter().map(|s| s.arrival_time.as_str()).collect();
    assert_eq!(arrivals, ["08:00", "10:00", "12:00"]);
    assert!(route.steps.iter().all(|s| s.work_duration_minutes == 45));
    assert!(route.steps[0].maps_url.contains("destination=45,9"));
}

#[tokio::test]
async fn test_fallback_total_is_sum_of_horse_work() {
    let repo = Arc::new(InMemoryAppointmentRepository::new());
    let profile = farrier(None);
    let farrier_id = profile.id;
    repo.add_farrier(profile);
    for (i, horses) in [3, 1, 4, 2].into_iter().enumerate() {
        repo.add_appointment(
            farrier_id,
            appointment_row(
                &format!("c{}", i),
                Some((45.0 + i as f64 * 0.05, 9.0)),
                datetime!(2026-10-16 08:00 UTC) + time::Duration::hours(i as i64),
                horses,
            ),
        );
    }

    let optimizer = build_optimizer(repo, None, &test_optimizer_config());
    let route = optimizer
        .optimize_route(farrier_id, date!(2026 - 10 - 16))
        .await
        .unwrap();

    assert_eq!(route.order, vec![0, 1, 2, 3]);
    assert_eq!(route.total_estimated_minutes, (3 + 1 + 4 + 2) * 45);
}

#[tokio::test]
async fn test_empty_day() {
    let repo = Arc::new(InMemoryAppointmentRepository::new());
    let profile = farrier(Some((45.46, 9.19)));
    let farrier_id = profile.id;
    repo.add_farrier(profile);
    // Another day and a non-routable status are both ignored
    repo.add_appointment(
        farrier_id,
        appointment_row("Tomorrow", Some((45.0, 9.0)), datetime!(2026-10-17 08:00 UTC), 1),
    );
    let mut proposed = appointment_row("Proposed", Some((45.0, 9.0)), datetime!(2026-10-16 08:00 UTC), 1);
    proposed.status = AppointmentStatus::Proposed.as_str().to_string();
    repo.add_appointment(farrier_id, proposed);

    let backend = Arc::new(StubBackend::replying(TWO_STOP_REPLY));
    let optimizer = build_optimizer(
        repo,
        Some(backend.clone() as Arc<dyn ReasoningBackend>),
        &test_optimizer_config(),
    );
    let route = optimizer
        .optimize_route(farrier_id, date!(2026 - 10 - 16))
        .await
        .unwrap();

    assert!(route.order.is_empty());
    assert_eq!(route.total_estimated_minutes, 0);
    assert!(route.steps.is_empty());
    assert_eq!(route.message.as_deref(), Some(MESSAGE_NO_APPOINTMENTS));
    assert_eq!(backend.calls(), 0);

    let json = serde_json::to_value(&route).unwrap();
    assert_eq!(json["order"], serde_json::json!([]));
    assert_eq!(json["message"], MESSAGE_NO_APPOINTMENTS);
}

#[tokio::test]
async fn test_no_geocoded_stops() {
    let repo = Arc::new(InMemoryAppointmentRepository::new());
    let profile = farrier(None);
    let farrier_id = profile.id;
    repo.add_farrier(profile);
    repo.add_appointment(farrier_id, appointment_row("A", None, datetime!(2026-10-16 08:00 UTC), 3));
    repo.add_appointment(farrier_id, appointment_row("B", None, datetime!(2026-10-16 09:00 UTC), 1));

    let backend = Arc::new(StubBackend::replying(TWO_STOP_REPLY));
    let optimizer = build_optimizer(
        repo,
        Some(backend.clone() as Arc<dyn ReasoningBackend>),
        &test_optimizer_config(),
    );
    let route = optimizer
        .optimize_route(farrier_id, date!(2026 - 10 - 16))
        .await
        .unwrap();

    assert_eq!(route.order, vec![0, 1]);
    assert_eq!(route.total_estimated_minutes, 90);
    assert!(route.steps.is_empty());
    assert_eq!(route.message.as_deref(), Some(MESSAGE_MISSING_LOCATIONS));
    assert_eq!(backend.calls(), 0);
}

#[tokio::test]
async fn test_success_is_remapped_to_full_list() {
    let repo = Arc::new(InMemoryAppointmentRepository::new());
    let (farrier_id, ids) = day_with_missing_location(&repo);

    let backend = Arc::new(StubBackend::replying(TWO_STOP_REPLY));
    let optimizer = build_optimizer(
        repo,
        Some(backend.clone() as Arc<dyn ReasoningBackend>),
        &test_optimizer_config(),
    );
    let route = optimizer
        .optimize_route(farrier_id, date!(2026 - 10 - 16))
        .await
        .unwrap();

    // Subset [0, 2] of the full list; reply order [1, 0] means [2, 0]
    assert_eq!(route.order, vec![2, 0]);
    assert_eq!(route.total_estimated_minutes, 128);
    assert_eq!(route.steps[0].appointment_index, 2);
    assert_eq!(route.steps[0].appointment_id, Some(ids[2]));
    assert_eq!(route.steps[1].appointment_id, Some(ids[0]));
    assert!(route.steps[0].maps_url.contains("destination=45.5,9.5"));

    let mut unique = route.order.clone();
    unique.sort();
    unique.dedup();
    assert_eq!(unique.len(), route.order.len());
    assert!(route.order.iter().all(|&i| i < ids.len()));

    let prompt = backend.last_prompt().unwrap();
    assert!(prompt.contains("0: Rossi"));
    assert!(prompt.contains("1: Verdi"));
    assert!(!prompt.contains("Bianchi"));
}

#[tokio::test]
async fn test_call_failure_has_no_fallback() {
    let repo = Arc::new(InMemoryAppointmentRepository::new());
    let (farrier_id, _) = day_with_missing_location(&repo);

    let backend = Arc::new(StubBackend::failing());
    let optimizer = build_optimizer(
        repo,
        Some(backend.clone() as Arc<dyn ReasoningBackend>),
        &test_optimizer_config(),
    );
    let result = optimizer.optimize_route(farrier_id, date!(2026 - 10 - 16)).await;

    assert!(matches!(result, Err(AppError::OptimizerCall(_))));
    assert_eq!(backend.calls(), 1);
}

#[tokio::test]
async fn test_failed_call_is_retried() {
    let repo = Arc::new(InMemoryAppointmentRepository::new());
    let (farrier_id, _) = day_with_missing_location(&repo);

    let backend = Arc::new(StubBackend::failing_then(1, TWO_STOP_REPLY));
    let mut config = test_optimizer_config();
    config.max_retries = 1;
    let optimizer = build_optimizer(repo, Some(backend.clone() as Arc<dyn ReasoningBackend>), &config);

    let route = optimizer
        .optimize_route(farrier_id, date!(2026 - 10 - 16))
        .await
        .unwrap();
    assert_eq!(route.order, vec![2, 0]);
    assert_eq!(backend.calls(), 2);
}

#[tokio::test]
async fn test_timeout_counts_as_call_failure() {
    let repo = Arc::new(InMemoryAppointmentRepository::new());
    let (farrier_id, _) = day_with_missing_location(&repo);

    let backend = Arc::new(StubBackend::slow(Duration::from_secs(10), TWO_STOP_REPLY));
    let optimizer = build_optimizer(
        repo,
        Some(backend as Arc<dyn ReasoningBackend>),
        &test_optimizer_config(),
    );

    let started = Instant::now();
    let result = optimizer.optimize_route(farrier_id, date!(2026 - 10 - 16)).await;
    assert!(matches!(result, Err(AppError::OptimizerCall(_))));
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[tokio::test]
async fn test_malformed_reply_is_not_retried() {
    let repo = Arc::new(InMemoryAppointmentRepository::new());
    let (farrier_id, _) = day_with_missing_location(&repo);

    // Duplicate index: not a permutation of the two geocoded stops
    let reply = r#"{"order": [0, 0], "total_estimated_minutes": 90, "steps": []}"#;
    let backend = Arc::new(StubBackend::replying(reply));
    let mut config = test_optimizer_config();
    config.max_retries = 2;
    let optimizer = build_optimizer(repo, Some(backend.clone() as Arc<dyn ReasoningBackend>), &config);

    let result = optimizer.optimize_route(farrier_id, date!(2026 - 10 - 16)).await;
    assert!(matches!(result, Err(AppError::MalformedOptimizerResponse(_))));
    assert_eq!(backend.calls(), 1);
}

#[tokio::test]
async fn test_unknown_farrier_and_store_failure() {
    let repo = Arc::new(InMemoryAppointmentRepository::new());
    let optimizer = build_optimizer(repo.clone(), None, &test_optimizer_config());

    let result = optimizer
        .optimize_route(Uuid::new_v4(), date!(2026 - 10 - 16))
        .await;
    assert!(matches!(result, Err(AppError::NotFound(_))));

    repo.set_fail_reads(true);
    let result = optimizer
        .optimize_route(Uuid::new_v4(), date!(2026 - 10 - 16))
        .await;
    assert!(matches!(result, Err(AppError::LoadFailure(_))));
}

#[test]
fn test_two_stops_with_missing_coordinates_stay_in_order() {
    let with_coords = Stop::new(
        Uuid::new_v4(),
        "A".to_string(),
        Coordinates::new(45.0, 9.0).ok(),
        datetime!(2026-10-16 08:00 UTC),
        1,
    );
    let without = Stop::new(
        Uuid::new_v4(),
        "B".to_string(),
        None,
        datetime!(2026-10-16 09:00 UTC),
        1,
    );
    let ids = vec![without.id, with_coords.id];

    let ordered = order_by_proximity(vec![without, with_coords], Coordinates::new(45.5, 9.5).ok());
    assert_eq!(ordered.iter().map(|s| s.id).collect::<Vec<_>>(), ids);

    let timed = annotate_times(ordered, datetime!(2026-10-16 08:00 UTC), &TimeModel::default());
    assert_eq!(timed.stops[0].distance_from_previous_km, None);
    assert_eq!(timed.stops[1].distance_from_previous_km, None);
    assert!(timed.stops[1].approximate);
    assert_eq!(timed.total_estimated_minutes, 90.0);
}
