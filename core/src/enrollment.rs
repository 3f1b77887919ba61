//! Enrollment mutator.
//!
//! The atomic primitive every seat-changing write goes through. Direct API
//! calls use the standalone methods, which pair a fresh read with a
//! revision-guarded write and retry when they lose the race; the order
//! coordinator uses [`EnrollmentMutator::add_participant_in`] to make the
//! same mutation inside its transaction scope.

use crate::environment::BookingEnvironment;
use crate::error::{BookingError, Result};
use crate::store::{StoreError, StoreTx};
use crate::types::{Lesson, LessonId, UserKey};
use tracing::{debug, instrument};

/// Increments and decrements a lesson's seat allocation as single atomic
/// steps.
#[derive(Clone)]
pub struct EnrollmentMutator {
    env: BookingEnvironment,
}

impl EnrollmentMutator {
    /// Creates a new `EnrollmentMutator`
    #[must_use]
    pub fn new(env: BookingEnvironment) -> Self {
        Self { env }
    }

    /// Allocates `seats` to `key` in the given lesson.
    ///
    /// # Errors
    ///
    /// - [`BookingError::LessonNotFound`] when the lesson is absent
    /// - [`BookingError::InvalidSeatCount`] when `seats` is zero
    /// - [`BookingError::NoSeatsAvailable`] when the lesson is full
    /// - [`BookingError::InsufficientSeats`] when fewer seats are open than
    ///   requested
    /// - [`BookingError::ConcurrentModification`] when the retry budget runs
    ///   out
    /// - [`BookingError::Store`] on persistence failure
    #[instrument(skip(self), fields(%lesson_id, %key, seats))]
    pub async fn add_participant(
        &self,
        lesson_id: LessonId,
        key: &UserKey,
        seats: u32,
    ) -> Result<Lesson> {
        let now = self.env.clock.now();
        self.mutate_with_retry(lesson_id, |lesson| lesson.allocate(key, seats, now))
            .await
    }

    /// Same allocation, inside a caller-supplied transaction scope.
    ///
    /// The scope serializes the write, so a lost revision precondition here
    /// means the scope itself is broken; it surfaces as a store failure
    /// rather than being retried.
    ///
    /// # Errors
    ///
    /// As [`EnrollmentMutator::add_participant`], with scope conflicts
    /// surfacing as [`BookingError::Store`].
    pub async fn add_participant_in(
        &self,
        tx: &mut (dyn StoreTx + '_),
        lesson_id: LessonId,
        key: &UserKey,
        seats: u32,
    ) -> Result<Lesson> {
        let mut lesson = tx
            .find_lesson(lesson_id)
            .await?
            .ok_or(BookingError::LessonNotFound(lesson_id))?;
        let expected = lesson.revision;
        lesson.allocate(key, seats, self.env.clock.now())?;
        Ok(tx.update_lesson(&lesson, expected).await?)
    }

    /// Releases seats held by `key`, the full holding when `seats` is `None`.
    ///
    /// # Errors
    ///
    /// - [`BookingError::LessonNotFound`] when the lesson is absent
    /// - [`BookingError::NotEnrolled`] when the key holds no seats
    /// - [`BookingError::ReleaseExceedsHolding`] when releasing more than
    ///   held
    /// - [`BookingError::ConcurrentModification`] when the retry budget runs
    ///   out
    /// - [`BookingError::Store`] on persistence failure
    #[instrument(skip(self), fields(%lesson_id, %key))]
    pub async fn remove_participant(
        &self,
        lesson_id: LessonId,
        key: &UserKey,
        seats: Option<u32>,
    ) -> Result<Lesson> {
        let now = self.env.clock.now();
        self.mutate_with_retry(lesson_id, |lesson| {
            lesson.release(key, seats, now).map(|_| ())
        })
        .await
    }

    /// Load → pure ledger mutation → conditional write, retried against
    /// fresh state while the write keeps losing to concurrent writers.
    async fn mutate_with_retry<F>(&self, lesson_id: LessonId, mut apply: F) -> Result<Lesson>
    where
        F: FnMut(&mut Lesson) -> Result<()>,
    {
        for attempt in 0..self.env.config.cas_retry_limit {
            let mut lesson = self
                .env
                .store
                .find_lesson(lesson_id)
                .await?
                .ok_or(BookingError::LessonNotFound(lesson_id))?;
            let expected = lesson.revision;
            apply(&mut lesson)?;

            match self.env.store.update_lesson(&lesson, expected).await {
                Ok(stored) => return Ok(stored),
                Err(StoreError::Conflict { .. }) => {
                    debug!(attempt, %lesson_id, "seat count changed underneath, retrying");
                }
                Err(err) => return Err(err.into()),
            }
        }
        Err(BookingError::ConcurrentModification(lesson_id))
    }
}
