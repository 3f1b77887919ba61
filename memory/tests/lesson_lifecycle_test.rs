//! Lesson lifecycle tests.
//!
//! Covers creation guards, the update protocol (scalar fields, the embedded
//! participant instruction, and every capacity/available combination),
//! deletion, and the read-side queries.
//!
//! Run with: `cargo test --test lesson_lifecycle_test`

#![allow(clippy::expect_used)]
#![allow(clippy::unwrap_used)]

use classbook_core::{
    BookingConfig, BookingEnvironment, BookingError, EnrollmentMutator, ErrorKind, LessonService,
    UserKey,
    environment::Clock,
    lessons::{LessonPatch, ParticipantInstruction},
};
use classbook_memory::{MemoryDirectory, MemoryStore};
use classbook_testing::{LessonBuilder, test_clock, user};
use std::sync::Arc;

fn test_env() -> BookingEnvironment {
    let directory = MemoryDirectory::with_users([
        user("teacher@example.com"),
        user("ada@example.com"),
        user("bob@example.com"),
    ]);
    BookingEnvironment::new(
        Arc::new(MemoryStore::new()),
        Arc::new(directory),
        Arc::new(test_clock()),
        BookingConfig::default(),
    )
}

#[tokio::test]
async fn create_starts_with_an_empty_ledger() {
    let env = test_env();
    let service = LessonService::new(env);

    let lesson = service
        .create(LessonBuilder::new("Beginner Piano").capacity(10).build())
        .await
        .unwrap();

    assert_eq!(lesson.capacity, 10);
    assert_eq!(lesson.available_seats, 10);
    assert!(lesson.participants.is_empty());
    assert_eq!(lesson.created_at, test_clock().now());
    assert!(lesson.invariant_holds());
}

#[tokio::test]
async fn create_rejects_capacity_below_minimum() {
    let env = test_env();
    let service = LessonService::new(env);

    let err = service
        .create(LessonBuilder::new("Tiny").capacity(4).build())
        .await
        .unwrap_err();
    assert_eq!(
        err,
        BookingError::CapacityBelowMinimum {
            capacity: 4,
            minimum: 5
        }
    );
    assert_eq!(err.kind(), ErrorKind::Invalid);
}

#[tokio::test]
async fn create_rejects_unknown_owner() {
    let env = test_env();
    let service = LessonService::new(env);
    let ghost = UserKey::new("ghost@example.com");

    let err = service
        .create(LessonBuilder::new("Haunted").owner(&ghost).build())
        .await
        .unwrap_err();
    assert_eq!(err, BookingError::UserNotFound(ghost));
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn create_rejects_identical_resubmission() {
    let env = test_env();
    let service = LessonService::new(env);

    service
        .create(LessonBuilder::new("Beginner Piano").build())
        .await
        .unwrap();
    let err = service
        .create(LessonBuilder::new("Beginner Piano").build())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Duplicate);

    // A single differing field is a different lesson, not a duplicate.
    service
        .create(LessonBuilder::new("Beginner Piano").location("Room 9").build())
        .await
        .unwrap();
}

#[tokio::test]
async fn enroll_and_unenroll_round_trip() {
    let env = test_env();
    let service = LessonService::new(env.clone());
    let enrollment = EnrollmentMutator::new(env);
    let ada = UserKey::new("ada@example.com");

    let lesson = service
        .create(LessonBuilder::new("Round Trip").capacity(10).build())
        .await
        .unwrap();

    let lesson = enrollment.add_participant(lesson.id, &ada, 3).await.unwrap();
    assert_eq!(lesson.available_seats, 7);
    assert_eq!(lesson.participants.len(), 1);
    assert_eq!(lesson.seats_held_by(&ada), Some(3));

    let lesson = enrollment
        .remove_participant(lesson.id, &ada, None)
        .await
        .unwrap();
    assert_eq!(lesson.available_seats, 10);
    assert!(lesson.participants.is_empty());
    assert!(lesson.invariant_holds());
}

#[tokio::test]
async fn capacity_reduction_respects_booked_seats() {
    let env = test_env();
    let service = LessonService::new(env.clone());
    let enrollment = EnrollmentMutator::new(env);
    let ada = UserKey::new("ada@example.com");

    let lesson = service
        .create(LessonBuilder::new("Shrinking").capacity(10).build())
        .await
        .unwrap();
    enrollment.add_participant(lesson.id, &ada, 3).await.unwrap();

    // Below the booked total: rejected.
    let err = service
        .update(
            lesson.id,
            &LessonPatch {
                capacity: Some(2),
                ..LessonPatch::default()
            },
        )
        .await
        .unwrap_err();
    assert_eq!(
        err,
        BookingError::CapacityBelowBooked {
            capacity: 2,
            booked: 3
        }
    );

    // Exactly the booked total: allowed, with zero seats left to sell.
    let updated = service
        .update(
            lesson.id,
            &LessonPatch {
                capacity: Some(3),
                ..LessonPatch::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.capacity, 3);
    assert_eq!(updated.available_seats, 0);
    assert!(updated.invariant_holds());
}

#[tokio::test]
async fn update_applies_scalar_fields() {
    let env = test_env();
    let service = LessonService::new(env);

    let lesson = service
        .create(LessonBuilder::new("Renamed").build())
        .await
        .unwrap();
    let updated = service
        .update(
            lesson.id,
            &LessonPatch {
                name: Some("Advanced Piano".to_string()),
                location: Some("Hall".to_string()),
                price: Some(classbook_core::Money::from_cents(2500)),
                ..LessonPatch::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(updated.name, "Advanced Piano");
    assert_eq!(updated.location, "Hall");
    assert_eq!(updated.price.cents(), 2500);
    // Seat bookkeeping untouched by a purely descriptive patch.
    assert_eq!(updated.capacity, lesson.capacity);
    assert_eq!(updated.available_seats, lesson.available_seats);
    assert!(updated.revision > lesson.revision);
}

#[tokio::test]
async fn update_add_instruction_enrolls_and_recomputes() {
    let env = test_env();
    let service = LessonService::new(env);
    let ada = UserKey::new("ada@example.com");

    let lesson = service
        .create(LessonBuilder::new("Instructed").capacity(10).build())
        .await
        .unwrap();
    let updated = service
        .update(
            lesson.id,
            &LessonPatch {
                participant: Some(ParticipantInstruction::Add {
                    key: ada.clone(),
                    seats: 4,
                }),
                ..LessonPatch::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(updated.seats_held_by(&ada), Some(4));
    assert_eq!(updated.available_seats, 6);
    assert!(updated.invariant_holds());
}

#[tokio::test]
async fn update_add_instruction_rejections() {
    let env = test_env();
    let service = LessonService::new(env);
    let ada = UserKey::new("ada@example.com");
    let ghost = UserKey::new("ghost@example.com");

    let lesson = service
        .create(LessonBuilder::new("Guarded").capacity(5).build())
        .await
        .unwrap();

    let err = service
        .update(
            lesson.id,
            &LessonPatch {
                participant: Some(ParticipantInstruction::Add {
                    key: ada.clone(),
                    seats: 0,
                }),
                ..LessonPatch::default()
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err, BookingError::InvalidSeatCount);

    let err = service
        .update(
            lesson.id,
            &LessonPatch {
                participant: Some(ParticipantInstruction::Add {
                    key: ghost.clone(),
                    seats: 1,
                }),
                ..LessonPatch::default()
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err, BookingError::UserNotFound(ghost));

    // More seats than the whole lesson holds.
    let err = service
        .update(
            lesson.id,
            &LessonPatch {
                participant: Some(ParticipantInstruction::Add {
                    key: ada,
                    seats: 6,
                }),
                ..LessonPatch::default()
            },
        )
        .await
        .unwrap_err();
    assert_eq!(
        err,
        BookingError::ExceedsCapacity {
            booked: 6,
            capacity: 5
        }
    );
}

#[tokio::test]
async fn update_remove_instruction_releases_the_full_holding() {
    let env = test_env();
    let service = LessonService::new(env.clone());
    let enrollment = EnrollmentMutator::new(env);
    let ada = UserKey::new("ada@example.com");
    let bob = UserKey::new("bob@example.com");

    let lesson = service
        .create(LessonBuilder::new("Leaving").capacity(10).build())
        .await
        .unwrap();
    enrollment.add_participant(lesson.id, &ada, 3).await.unwrap();

    // Removing someone who is not enrolled is rejected.
    let err = service
        .update(
            lesson.id,
            &LessonPatch {
                participant: Some(ParticipantInstruction::Remove { key: bob.clone() }),
                ..LessonPatch::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, BookingError::NotEnrolled { .. }));
    assert_eq!(err.kind(), ErrorKind::Invalid);

    // The seat count comes from the record, not the caller.
    let updated = service
        .update(
            lesson.id,
            &LessonPatch {
                participant: Some(ParticipantInstruction::Remove { key: ada.clone() }),
                ..LessonPatch::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.seats_held_by(&ada), None);
    assert_eq!(updated.available_seats, 10);
}

#[tokio::test]
async fn update_remove_combined_with_capacity_change() {
    let env = test_env();
    let service = LessonService::new(env.clone());
    let enrollment = EnrollmentMutator::new(env);
    let ada = UserKey::new("ada@example.com");
    let bob = UserKey::new("bob@example.com");

    let lesson = service
        .create(LessonBuilder::new("Reshaped").capacity(10).build())
        .await
        .unwrap();
    enrollment.add_participant(lesson.id, &ada, 2).await.unwrap();
    enrollment.add_participant(lesson.id, &bob, 3).await.unwrap();

    // Remove ada (releasing 2) and shrink to 6 in the same update: the new
    // capacity is checked against the post-removal booked total of 3.
    let updated = service
        .update(
            lesson.id,
            &LessonPatch {
                capacity: Some(6),
                participant: Some(ParticipantInstruction::Remove { key: ada }),
                ..LessonPatch::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.capacity, 6);
    assert_eq!(updated.booked_seats(), 3);
    assert_eq!(updated.available_seats, 3);
    assert!(updated.invariant_holds());
}

#[tokio::test]
async fn explicit_capacity_pair_must_be_consistent() {
    let env = test_env();
    let service = LessonService::new(env.clone());
    let enrollment = EnrollmentMutator::new(env);
    let ada = UserKey::new("ada@example.com");

    let lesson = service
        .create(LessonBuilder::new("Paired").capacity(10).build())
        .await
        .unwrap();
    enrollment.add_participant(lesson.id, &ada, 3).await.unwrap();

    let err = service
        .update(
            lesson.id,
            &LessonPatch {
                capacity: Some(8),
                available_seats: Some(4),
                ..LessonPatch::default()
            },
        )
        .await
        .unwrap_err();
    assert_eq!(
        err,
        BookingError::InconsistentCapacityPair {
            capacity: 8,
            available: 4,
            booked: 3
        }
    );

    let updated = service
        .update(
            lesson.id,
            &LessonPatch {
                capacity: Some(8),
                available_seats: Some(5),
                ..LessonPatch::default()
            },
        )
        .await
        .unwrap();
    assert_eq!((updated.capacity, updated.available_seats), (8, 5));
}

#[tokio::test]
async fn explicit_availability_rederives_capacity() {
    let env = test_env();
    let service = LessonService::new(env.clone());
    let enrollment = EnrollmentMutator::new(env);
    let ada = UserKey::new("ada@example.com");

    let lesson = service
        .create(LessonBuilder::new("Rederived").capacity(10).build())
        .await
        .unwrap();
    enrollment.add_participant(lesson.id, &ada, 3).await.unwrap();

    let updated = service
        .update(
            lesson.id,
            &LessonPatch {
                available_seats: Some(9),
                ..LessonPatch::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.capacity, 12);
    assert_eq!(updated.available_seats, 9);
    assert!(updated.invariant_holds());
}

#[tokio::test]
async fn delete_semantics() {
    let env = test_env();
    let service = LessonService::new(env.clone());
    let enrollment = EnrollmentMutator::new(env);
    let ada = UserKey::new("ada@example.com");

    let lesson = service
        .create(LessonBuilder::new("Doomed").build())
        .await
        .unwrap();
    enrollment.add_participant(lesson.id, &ada, 1).await.unwrap();

    // Deleting with active participants is permitted.
    assert!(service.delete(lesson.id).await.unwrap());

    let err = service.delete(lesson.id).await.unwrap_err();
    assert_eq!(err, BookingError::LessonNotFound(lesson.id));
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn queries_filter_by_owner_and_enrollment() {
    let env = test_env();
    let service = LessonService::new(env.clone());
    let enrollment = EnrollmentMutator::new(env);
    let teacher = UserKey::new("teacher@example.com");
    let ada = UserKey::new("ada@example.com");

    let piano = service
        .create(LessonBuilder::new("Piano").build())
        .await
        .unwrap();
    service
        .create(LessonBuilder::new("Chess").topic("Games").build())
        .await
        .unwrap();
    enrollment.add_participant(piano.id, &ada, 1).await.unwrap();

    assert_eq!(service.list().await.unwrap().len(), 2);
    assert_eq!(service.list_by_owner(&teacher).await.unwrap().len(), 2);

    let enrolled = service.list_enrolled(&ada).await.unwrap();
    assert_eq!(enrolled.len(), 1);
    assert_eq!(enrolled[0].id, piano.id);

    let err = service.get(classbook_core::LessonId::new()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}
