// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Activity creation, scheduling bounds and list queries over the memory store.

use std::sync::Arc;

use chrono::{TimeDelta, Timelike, Utc};
use chrono_tz::America::Los_Angeles as LA;
use rand::rngs::StdRng;
use rand::SeedableRng;
use trip_activities::config::Config;
use trip_activities::db::{ActivityStore, MemoryDb};
use trip_activities::error::AppError;
use trip_activities::models::Revision;
use trip_activities::services::ActivityService;
use trip_activities::AppState;

mod common;
use common::{fast_policy, memory_service, new_activity};

#[tokio::test]
async fn test_create_activity_stores_fresh_record() {
    let (service, db) = memory_service();
    let before = Utc::now();

    let activity = service
        .create_activity(new_activity("Harbor cruise", &["boats", "boats", "food"]))
        .await
        .unwrap();

    assert!(!activity.id.is_empty());
    assert_eq!(activity.revision, Revision::INITIAL);
    assert!(activity.committed_trip_ids.is_empty());
    assert!(activity.group_chat.is_empty());
    assert_eq!(activity.interests, vec!["boats", "food"]);
    assert!(activity.created_at >= before);

    let stored = db.get(&activity.id).await.unwrap();
    assert_eq!(stored.record, activity);
    assert_eq!(db.activity_count(), 1);
}

#[tokio::test]
async fn test_created_daytime_window_is_in_bounds() {
    let (service, _) = memory_service();

    for _ in 0..50 {
        let activity = service
            .create_activity(new_activity("Museum visit", &[]))
            .await
            .unwrap();
        let period = activity.time_period;

        assert_eq!(period.duration(), TimeDelta::hours(3));
        assert!(period.start > activity.created_at, "Start must be in the future");
        assert!(period.start <= activity.created_at + TimeDelta::days(7));
        assert!(period.start.hour() >= 8, "start {}", period.start);
        assert!(
            period.end <= period.start.date_naive().and_hms_opt(18, 0, 0).unwrap().and_utc(),
            "end {}",
            period.end
        );
        assert_eq!(period.start.minute(), 0);
        assert_eq!(period.start.second(), 0);
    }
}

#[tokio::test]
async fn test_evening_activity_keeps_full_duration() {
    let (service, _) = memory_service();
    let mut request = new_activity("Night market", &[]);
    request.is_evening = true;
    request.duration_hours = 1.5;

    let activity = service.create_activity(request).await.unwrap();
    assert_eq!(activity.time_period.duration(), TimeDelta::minutes(90));
    assert!(activity.is_evening);
}

#[tokio::test]
async fn test_create_activity_rejects_invalid_requests() {
    let (service, db) = memory_service();

    let mut long_day = new_activity("All day hike", &[]);
    long_day.duration_hours = 11.0;
    let mut free_negative = new_activity("Refund", &[]);
    free_negative.price = -5.0;
    let unnamed = new_activity("", &[]);
    let mut zero = new_activity("Instant", &[]);
    zero.duration_hours = 0.0;
    let mut blink = new_activity("Blink", &[]);
    blink.duration_hours = 0.0001;

    for request in [long_day, free_negative, unnamed, zero, blink] {
        let err = service.create_activity(request).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)), "got {:?}", err);
        assert!(!err.is_retryable());
    }
    assert_eq!(db.activity_count(), 0, "Nothing inserted on rejection");
}

#[tokio::test]
async fn test_seeded_services_schedule_identically() {
    let db = MemoryDb::new();
    let make = || {
        ActivityService::with_rng(
            Arc::new(db.clone()),
            Arc::new(db.clone()),
            fast_policy(4),
            LA,
            StdRng::seed_from_u64(7),
        )
    };
    let (a, b) = (make(), make());

    let first = a
        .create_activity(new_activity("Wine tasting", &[]))
        .await
        .unwrap();
    let second = b
        .create_activity(new_activity("Wine tasting", &[]))
        .await
        .unwrap();

    assert_ne!(first.id, second.id);
    assert_eq!(first.time_period.duration(), second.time_period.duration());
    // Same seed, same day offset; creation instants differ by microseconds.
    let local = |t: chrono::DateTime<Utc>| t.with_timezone(&LA).date_naive();
    let gap = (local(first.time_period.start) - local(second.time_period.start)).num_days();
    assert!(gap.abs() <= 1);
}

#[tokio::test]
async fn test_query_committed_for_trip_sorted_by_start() {
    let (service, _) = memory_service();
    let mut ids = Vec::new();
    for name in ["Bike tour", "Cooking class", "Jazz club", "Tide pools"] {
        let activity = service
            .create_activity(new_activity(name, &[]))
            .await
            .unwrap();
        service.commit_trip(&activity.id, "t1").await.unwrap();
        ids.push(activity.id);
    }
    let other = service
        .create_activity(new_activity("Not ours", &[]))
        .await
        .unwrap();
    service.commit_trip(&other.id, "t2").await.unwrap();

    let views = service.query_committed_for_trip("t1").await.unwrap();
    assert_eq!(views.len(), 4);
    assert!(views.iter().all(|v| ids.contains(&v.id)));
    for pair in views.windows(2) {
        assert!(pair[0].time_period.start <= pair[1].time_period.start);
    }

    assert!(service
        .query_committed_for_trip("t-none")
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_query_recommended_for_user() {
    let (service, _) = memory_service();
    service
        .create_activity(new_activity("Surf lesson", &["water", "sports"]))
        .await
        .unwrap();
    service
        .create_activity(new_activity("Gallery walk", &["art"]))
        .await
        .unwrap();
    service
        .create_activity(new_activity("Kayak tour", &["water"]))
        .await
        .unwrap();

    let tags = vec!["water".to_string(), "music".to_string()];
    let mut names: Vec<String> = service
        .query_recommended_for_user(&tags)
        .await
        .unwrap()
        .into_iter()
        .map(|v| v.name)
        .collect();
    names.sort();
    assert_eq!(names, vec!["Kayak tour", "Surf lesson"]);

    let none = service.query_recommended_for_user(&[]).await.unwrap();
    assert!(none.is_empty());
    let blank = service
        .query_recommended_for_user(&["  ".to_string()])
        .await
        .unwrap();
    assert!(blank.is_empty());
}

#[tokio::test]
async fn test_app_state_with_memory_backend() {
    let state = AppState::from_config(Config::default()).await.unwrap();
    let activity = state
        .activities
        .create_activity(new_activity("Farmers market", &["food"]))
        .await
        .unwrap();
    let outcome = state
        .activities
        .commit_trip(&activity.id, "t1")
        .await
        .unwrap();
    assert_eq!(outcome.committed_count, 1);
    assert_eq!(state.activities.mutator().policy().max_attempts, 8);
}
