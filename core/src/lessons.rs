//! Lesson capacity manager.
//!
//! Owns creation, field-level update (including the embedded add/remove
//! participant instruction), deletion, and the read-side lesson queries.
//! Every seat-affecting decision here is made against a freshly-loaded
//! record and written back as one revision-guarded conditional update, so a
//! concurrent writer can never slip between the check and the write.

use crate::environment::BookingEnvironment;
use crate::error::{BookingError, Result};
use crate::store::{DuplicateKey, LessonFilter, StoreError};
use crate::types::{Lesson, LessonId, Money, UserKey};
use tracing::{debug, instrument, warn};

/// Input for creating a lesson.
#[derive(Clone, Debug)]
pub struct NewLesson {
    /// Lesson name
    pub name: String,
    /// Subject taught
    pub topic: String,
    /// Where the lesson takes place
    pub location: String,
    /// Free-form description
    pub description: String,
    /// Optional image reference
    pub image: Option<String>,
    /// Key of the teaching user; must resolve in the directory
    pub owner: UserKey,
    /// Price per seat
    pub price: Money,
    /// Total seats
    pub capacity: u32,
}

/// Embedded participant mutation carried by a lesson update.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ParticipantInstruction {
    /// Enroll `key` for `seats` additional seats
    Add {
        /// Participant to enroll
        key: UserKey,
        /// Seats to add, at least 1
        seats: u32,
    },
    /// Unenroll `key` entirely; the seat count is taken from the record
    Remove {
        /// Participant to unenroll
        key: UserKey,
    },
}

/// Partial field update for a lesson.
///
/// `None` fields are left untouched. `capacity` and `available_seats` may be
/// supplied together or alone; whichever combination arrives, the update
/// keeps `capacity == available_seats + booked` true against the booked total
/// the update itself produces.
#[derive(Clone, Debug, Default)]
pub struct LessonPatch {
    /// New name
    pub name: Option<String>,
    /// New topic
    pub topic: Option<String>,
    /// New location
    pub location: Option<String>,
    /// New description
    pub description: Option<String>,
    /// New image reference
    pub image: Option<String>,
    /// New per-seat price
    pub price: Option<Money>,
    /// New total capacity
    pub capacity: Option<u32>,
    /// New available-seat count
    pub available_seats: Option<u32>,
    /// Embedded participant mutation
    pub participant: Option<ParticipantInstruction>,
}

/// The seat-count consequence of a participant instruction.
#[derive(Clone, Debug)]
enum SeatDelta {
    None,
    Add { key: UserKey, seats: u32 },
    Remove { key: UserKey, seats: u32 },
}

/// Resolves the final `(capacity, available_seats)` pair for an update.
///
/// `future_booked` is the booked total the update will leave behind; the
/// result always satisfies `capacity == available + future_booked`.
fn resolve_capacity(
    current_capacity: u32,
    patch_capacity: Option<u32>,
    patch_available: Option<u32>,
    future_booked: u32,
    adding: bool,
) -> Result<(u32, u32)> {
    match (patch_capacity, patch_available) {
        (Some(capacity), Some(available)) => {
            let implied = available
                .checked_add(future_booked)
                .ok_or(BookingError::CapacityOverflow)?;
            if capacity != implied {
                return Err(BookingError::InconsistentCapacityPair {
                    capacity,
                    available,
                    booked: future_booked,
                });
            }
            Ok((capacity, available))
        }
        (Some(capacity), None) => {
            if capacity < future_booked {
                return Err(BookingError::CapacityBelowBooked {
                    capacity,
                    booked: future_booked,
                });
            }
            Ok((capacity, capacity - future_booked))
        }
        (None, Some(available)) => {
            // Explicit availability alone re-derives capacity around it.
            let capacity = available
                .checked_add(future_booked)
                .ok_or(BookingError::CapacityOverflow)?;
            Ok((capacity, available))
        }
        (None, None) => {
            if future_booked > current_capacity {
                return Err(if adding {
                    BookingError::ExceedsCapacity {
                        booked: future_booked,
                        capacity: current_capacity,
                    }
                } else {
                    BookingError::CapacityBelowBooked {
                        capacity: current_capacity,
                        booked: future_booked,
                    }
                });
            }
            Ok((current_capacity, current_capacity - future_booked))
        }
    }
}

/// Service owning a lesson's capacity state.
#[derive(Clone)]
pub struct LessonService {
    env: BookingEnvironment,
}

impl LessonService {
    /// Creates a new `LessonService`
    #[must_use]
    pub fn new(env: BookingEnvironment) -> Self {
        Self { env }
    }

    /// Creates a lesson with an empty ledger (`available_seats == capacity`).
    ///
    /// # Errors
    ///
    /// - [`BookingError::CapacityBelowMinimum`] for a capacity under the
    ///   configured floor
    /// - [`BookingError::UserNotFound`] when the owner key is unknown
    /// - [`BookingError::DuplicateLesson`] when an identical lesson already
    ///   exists (duplicate-submission guard)
    /// - [`BookingError::Store`] on persistence failure
    #[instrument(skip(self, input), fields(name = %input.name, owner = %input.owner))]
    pub async fn create(&self, input: NewLesson) -> Result<Lesson> {
        if input.capacity < self.env.config.min_capacity {
            return Err(BookingError::CapacityBelowMinimum {
                capacity: input.capacity,
                minimum: self.env.config.min_capacity,
            });
        }

        if self
            .env
            .directory
            .find_by_key(&input.owner)
            .await?
            .is_none()
        {
            return Err(BookingError::UserNotFound(input.owner));
        }

        let probe = DuplicateKey {
            name: input.name.clone(),
            topic: input.topic.clone(),
            location: input.location.clone(),
            capacity: input.capacity,
            price: input.price,
            image: input.image.clone(),
        };
        if !self
            .env
            .store
            .list_lessons(&LessonFilter::DuplicateOf(probe))
            .await?
            .is_empty()
        {
            return Err(BookingError::DuplicateLesson { name: input.name });
        }

        let now = self.env.clock.now();
        let lesson = Lesson {
            id: LessonId::new(),
            name: input.name,
            topic: input.topic,
            location: input.location,
            description: input.description,
            image: input.image,
            owner: input.owner,
            price: input.price,
            capacity: input.capacity,
            available_seats: input.capacity,
            participants: Vec::new(),
            revision: 0,
            created_at: now,
            updated_at: now,
        };
        self.env.store.insert_lesson(&lesson).await?;
        debug!(lesson_id = %lesson.id, capacity = lesson.capacity, "lesson created");
        Ok(lesson)
    }

    /// Applies a partial update, optionally carrying a participant
    /// instruction, as one atomic conditional write.
    ///
    /// The full decision (booked total, instruction resolution, capacity
    /// resolution) is recomputed from fresh state on every conditional-update
    /// conflict, up to the configured retry budget.
    ///
    /// # Errors
    ///
    /// - [`BookingError::LessonNotFound`] when the lesson is absent
    /// - [`BookingError::UserNotFound`] when an instruction key is unknown
    /// - [`BookingError::InvalidSeatCount`] for an add of zero seats
    /// - [`BookingError::NotEnrolled`] for a remove of a non-participant
    /// - [`BookingError::CapacityBelowBooked`],
    ///   [`BookingError::InconsistentCapacityPair`],
    ///   [`BookingError::ExceedsCapacity`] per the capacity rules
    /// - [`BookingError::ConcurrentModification`] when the retry budget runs
    ///   out
    /// - [`BookingError::Store`] on persistence failure
    #[instrument(skip(self, patch), fields(%lesson_id))]
    pub async fn update(&self, lesson_id: LessonId, patch: &LessonPatch) -> Result<Lesson> {
        for attempt in 0..self.env.config.cas_retry_limit {
            let mut lesson = self
                .env
                .store
                .find_lesson(lesson_id)
                .await?
                .ok_or(BookingError::LessonNotFound(lesson_id))?;
            let expected = lesson.revision;

            let current_booked = lesson.booked_seats();
            let delta = self.resolve_instruction(&lesson, patch).await?;
            let future_booked = match &delta {
                SeatDelta::None => current_booked,
                SeatDelta::Add { seats, .. } => current_booked
                    .checked_add(*seats)
                    .ok_or(BookingError::CapacityOverflow)?,
                SeatDelta::Remove { seats, .. } => current_booked - seats,
            };

            let (capacity, available) = resolve_capacity(
                lesson.capacity,
                patch.capacity,
                patch.available_seats,
                future_booked,
                matches!(delta, SeatDelta::Add { .. }),
            )?;

            if let Some(name) = &patch.name {
                lesson.name = name.clone();
            }
            if let Some(topic) = &patch.topic {
                lesson.topic = topic.clone();
            }
            if let Some(location) = &patch.location {
                lesson.location = location.clone();
            }
            if let Some(description) = &patch.description {
                lesson.description = description.clone();
            }
            if let Some(image) = &patch.image {
                lesson.image = Some(image.clone());
            }
            if let Some(price) = patch.price {
                lesson.price = price;
            }
            lesson.capacity = capacity;
            lesson.available_seats = available;
            match &delta {
                SeatDelta::None => {}
                SeatDelta::Add { key, seats } => lesson.upsert_participant(key, *seats),
                SeatDelta::Remove { key, .. } => {
                    lesson.drop_participant(key);
                }
            }
            lesson.updated_at = self.env.clock.now();
            debug_assert!(lesson.invariant_holds());

            match self.env.store.update_lesson(&lesson, expected).await {
                Ok(stored) => {
                    debug!(lesson_id = %stored.id, revision = stored.revision, "lesson updated");
                    return Ok(stored);
                }
                Err(StoreError::Conflict { .. }) => {
                    debug!(attempt, %lesson_id, "lesson changed underneath update, retrying");
                }
                Err(err) => return Err(err.into()),
            }
        }
        Err(BookingError::ConcurrentModification(lesson_id))
    }

    /// Deletes a lesson.
    ///
    /// Deleting a lesson that still has participants is permitted; the
    /// orphaned enrollment is logged for the operator.
    ///
    /// # Errors
    ///
    /// - [`BookingError::LessonNotFound`] when the lesson is absent
    /// - [`BookingError::Store`] on persistence failure
    #[instrument(skip(self), fields(%lesson_id))]
    pub async fn delete(&self, lesson_id: LessonId) -> Result<bool> {
        let lesson = self
            .env
            .store
            .find_lesson(lesson_id)
            .await?
            .ok_or(BookingError::LessonNotFound(lesson_id))?;
        if !lesson.participants.is_empty() {
            warn!(
                %lesson_id,
                participants = lesson.participants.len(),
                booked = lesson.booked_seats(),
                "deleting lesson with active participants"
            );
        }
        Ok(self.env.store.delete_lesson(lesson_id).await?)
    }

    /// Fetches one lesson.
    ///
    /// # Errors
    ///
    /// - [`BookingError::LessonNotFound`] when the lesson is absent
    /// - [`BookingError::Store`] on persistence failure
    pub async fn get(&self, lesson_id: LessonId) -> Result<Lesson> {
        self.env
            .store
            .find_lesson(lesson_id)
            .await?
            .ok_or(BookingError::LessonNotFound(lesson_id))
    }

    /// Lists every lesson.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::Store`] on persistence failure.
    pub async fn list(&self) -> Result<Vec<Lesson>> {
        Ok(self.env.store.list_lessons(&LessonFilter::All).await?)
    }

    /// Lists the lessons a user teaches.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::Store`] on persistence failure.
    pub async fn list_by_owner(&self, owner: &UserKey) -> Result<Vec<Lesson>> {
        Ok(self
            .env
            .store
            .list_lessons(&LessonFilter::ByOwner(owner.clone()))
            .await?)
    }

    /// Lists the lessons a user holds seats in.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::Store`] on persistence failure.
    pub async fn list_enrolled(&self, key: &UserKey) -> Result<Vec<Lesson>> {
        Ok(self
            .env
            .store
            .list_lessons(&LessonFilter::ByParticipant(key.clone()))
            .await?)
    }

    /// Validates a participant instruction against the directory and the
    /// current record, reducing it to its seat-count consequence.
    async fn resolve_instruction(
        &self,
        lesson: &Lesson,
        patch: &LessonPatch,
    ) -> Result<SeatDelta> {
        match &patch.participant {
            None => Ok(SeatDelta::None),
            Some(ParticipantInstruction::Add { key, seats }) => {
                if *seats < 1 {
                    return Err(BookingError::InvalidSeatCount);
                }
                if self.env.directory.find_by_key(key).await?.is_none() {
                    return Err(BookingError::UserNotFound(key.clone()));
                }
                Ok(SeatDelta::Add {
                    key: key.clone(),
                    seats: *seats,
                })
            }
            Some(ParticipantInstruction::Remove { key }) => {
                if self.env.directory.find_by_key(key).await?.is_none() {
                    return Err(BookingError::UserNotFound(key.clone()));
                }
                let held = lesson
                    .seats_held_by(key)
                    .ok_or_else(|| BookingError::NotEnrolled {
                        lesson: lesson.id,
                        key: key.clone(),
                    })?;
                Ok(SeatDelta::Remove {
                    key: key.clone(),
                    seats: held,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    // The four explicit/implicit combinations of the capacity resolution
    // table, each pinned against the booked total the update produces.

    #[test]
    fn both_explicit_must_agree_with_booked() {
        assert_eq!(resolve_capacity(10, Some(8), Some(5), 3, false), Ok((8, 5)));
        assert_eq!(
            resolve_capacity(10, Some(9), Some(5), 3, false),
            Err(BookingError::InconsistentCapacityPair {
                capacity: 9,
                available: 5,
                booked: 3
            })
        );
    }

    #[test]
    fn capacity_only_rederives_availability() {
        assert_eq!(resolve_capacity(10, Some(6), None, 4, false), Ok((6, 2)));
        // Boundary: capacity exactly equal to booked leaves zero available.
        assert_eq!(resolve_capacity(10, Some(3), None, 3, false), Ok((3, 0)));
        assert_eq!(
            resolve_capacity(10, Some(2), None, 3, false),
            Err(BookingError::CapacityBelowBooked {
                capacity: 2,
                booked: 3
            })
        );
    }

    #[test]
    fn availability_only_rederives_capacity() {
        assert_eq!(resolve_capacity(10, None, Some(7), 3, false), Ok((10, 7)));
        assert_eq!(resolve_capacity(10, None, Some(9), 3, false), Ok((12, 9)));
    }

    #[test]
    fn implicit_pair_follows_the_instruction() {
        assert_eq!(resolve_capacity(10, None, None, 6, true), Ok((10, 4)));
        assert_eq!(
            resolve_capacity(5, None, None, 6, true),
            Err(BookingError::ExceedsCapacity {
                booked: 6,
                capacity: 5
            })
        );
        assert_eq!(resolve_capacity(10, None, None, 0, false), Ok((10, 10)));
    }
}
