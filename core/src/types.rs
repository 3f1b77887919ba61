//! Domain types for the Classbook booking backend.
//!
//! This module contains the identifiers, value objects, and entities the
//! capacity engine operates on. The [`Lesson`] entity is the capacity ledger:
//! its seat-arithmetic methods are the single place where seats are allocated
//! and released, so every write path shares the same invariant checks.

use crate::error::BookingError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// ============================================================================
// Identifiers
// ============================================================================

/// Unique identifier for a lesson
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LessonId(Uuid);

impl LessonId {
    /// Creates a new random `LessonId`
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a `LessonId` from a `Uuid`
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for LessonId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for LessonId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for an order
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct OrderId(Uuid);

impl OrderId {
    /// Creates a new random `OrderId`
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create an `OrderId` from a `Uuid`
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for OrderId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Key identifying a user across the system (a lowercase-normalized email).
///
/// Lessons reference their owner by key, participants are unique by key, and
/// orders record the purchaser's key. Normalization happens on construction so
/// lookups never have to care about case.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UserKey(String);

impl UserKey {
    /// Creates a `UserKey`, trimming whitespace and lowercasing
    #[must_use]
    pub fn new(key: impl AsRef<str>) -> Self {
        Self(key.as_ref().trim().to_lowercase())
    }

    /// Returns the key as a string reference
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Money Value Object (cents-based to avoid floating point errors)
// ============================================================================

/// Represents a price in cents to avoid floating-point arithmetic errors
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Money(u64);

impl Money {
    /// A zero amount
    pub const ZERO: Self = Self(0);

    /// Creates a `Money` value from cents
    #[must_use]
    pub const fn from_cents(cents: u64) -> Self {
        Self(cents)
    }

    /// Creates a `Money` value from whole dollars with overflow checking
    #[must_use]
    pub const fn checked_from_dollars(dollars: u64) -> Option<Self> {
        match dollars.checked_mul(100) {
            Some(cents) => Some(Self(cents)),
            None => None,
        }
    }

    /// Returns the amount in cents
    #[must_use]
    pub const fn cents(&self) -> u64 {
        self.0
    }

    /// Checks if the amount is zero
    #[must_use]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Adds two money amounts with overflow checking
    #[must_use]
    pub const fn checked_add(self, other: Self) -> Option<Self> {
        match self.0.checked_add(other.0) {
            Some(result) => Some(Self(result)),
            None => None,
        }
    }

    /// Multiplies money by a seat count with overflow checking
    #[must_use]
    pub const fn checked_multiply(self, quantity: u32) -> Option<Self> {
        match self.0.checked_mul(quantity as u64) {
            Some(result) => Some(Self(result)),
            None => None,
        }
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${}.{:02}", self.0 / 100, self.0 % 100)
    }
}

// ============================================================================
// Capacity Ledger Entity
// ============================================================================

/// A participant holding seats in a lesson
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    /// The participant's user key
    pub key: UserKey,
    /// Seats this participant currently holds (always ≥ 1)
    pub seats_held: u32,
}

/// The lesson record — the capacity ledger entity.
///
/// Bookkeeping invariants, maintained by every write path:
///
/// - `capacity == available_seats + booked_seats()` at all times visible to
///   any reader
/// - `available_seats` never goes negative and `capacity` never drops below
///   the booked total
/// - `participants` never contains an entry with zero seats; a participant
///   reduced to zero is removed entirely
///
/// The `revision` field is the optimistic-concurrency token: the store bumps
/// it on every successful write and rejects writes whose expected revision is
/// stale, which is what collapses read-check-write into one atomic step.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Lesson {
    /// Unique lesson identifier, immutable after creation
    pub id: LessonId,
    /// Lesson name (e.g., "Beginner Piano")
    pub name: String,
    /// Subject taught
    pub topic: String,
    /// Where the lesson takes place
    pub location: String,
    /// Free-form description
    pub description: String,
    /// Optional image reference (opaque to the engine)
    pub image: Option<String>,
    /// Key of the user who teaches the lesson
    pub owner: UserKey,
    /// Price per seat
    pub price: Money,
    /// Total seats ever sellable
    pub capacity: u32,
    /// Seats currently open; always `capacity - booked_seats()`
    pub available_seats: u32,
    /// Enrolled participants, unique by key, in enrollment order
    pub participants: Vec<Participant>,
    /// Optimistic-concurrency token, bumped by the store on each write
    pub revision: u64,
    /// When the lesson was created
    pub created_at: DateTime<Utc>,
    /// When the lesson was last written
    pub updated_at: DateTime<Utc>,
}

impl Lesson {
    /// Total seats currently held across all participants
    #[must_use]
    pub fn booked_seats(&self) -> u32 {
        self.participants.iter().map(|p| p.seats_held).sum()
    }

    /// Seats held by one participant, if enrolled
    #[must_use]
    pub fn seats_held_by(&self, key: &UserKey) -> Option<u32> {
        self.participants
            .iter()
            .find(|p| &p.key == key)
            .map(|p| p.seats_held)
    }

    /// Checks the ledger bookkeeping invariants.
    ///
    /// Exposed so tests and debug assertions can verify that no operation
    /// leaves the record observable in an inconsistent state.
    #[must_use]
    pub fn invariant_holds(&self) -> bool {
        let booked = self.booked_seats();
        self.capacity == self.available_seats + booked
            && self.capacity >= booked
            && self.participants.iter().all(|p| p.seats_held >= 1)
    }

    /// Allocates seats to a participant: insert-or-increment the holding and
    /// decrement `available_seats` by the same amount.
    ///
    /// This is the single add-side seat mutation; the enrollment mutator, the
    /// lesson update protocol, and order placement all route through it.
    ///
    /// # Errors
    ///
    /// - [`BookingError::InvalidSeatCount`] when `seats` is zero
    /// - [`BookingError::NoSeatsAvailable`] when the lesson is full
    /// - [`BookingError::InsufficientSeats`] when fewer than `seats` are open
    pub fn allocate(
        &mut self,
        key: &UserKey,
        seats: u32,
        now: DateTime<Utc>,
    ) -> Result<(), BookingError> {
        if seats < 1 {
            return Err(BookingError::InvalidSeatCount);
        }
        if self.available_seats == 0 {
            return Err(BookingError::NoSeatsAvailable(self.id));
        }
        if self.available_seats < seats {
            return Err(BookingError::InsufficientSeats {
                name: self.name.clone(),
                requested: seats,
                available: self.available_seats,
            });
        }

        self.upsert_participant(key, seats);
        self.available_seats -= seats;
        self.updated_at = now;
        debug_assert!(self.invariant_holds());
        Ok(())
    }

    /// Releases seats held by a participant: decrement-or-remove the holding
    /// and return the seats to `available_seats`.
    ///
    /// When `seats` is `None` the participant's full holding is released.
    /// Returns the number of seats actually released.
    ///
    /// # Errors
    ///
    /// - [`BookingError::NotEnrolled`] when the key holds no seats here
    /// - [`BookingError::ReleaseExceedsHolding`] when asked to release more
    ///   than the current holding
    /// - [`BookingError::ExceedsCapacity`] when the release would push
    ///   `available_seats` past `capacity` (cannot happen while the ledger is
    ///   consistent; rechecked because it depends on live data)
    pub fn release(
        &mut self,
        key: &UserKey,
        seats: Option<u32>,
        now: DateTime<Utc>,
    ) -> Result<u32, BookingError> {
        let held = self
            .seats_held_by(key)
            .ok_or_else(|| BookingError::NotEnrolled {
                lesson: self.id,
                key: key.clone(),
            })?;
        let releasing = seats.unwrap_or(held);
        if releasing > held {
            return Err(BookingError::ReleaseExceedsHolding {
                requested: releasing,
                held,
            });
        }
        let restored = self.available_seats + releasing;
        if restored > self.capacity {
            return Err(BookingError::ExceedsCapacity {
                booked: restored,
                capacity: self.capacity,
            });
        }

        if releasing == held {
            self.drop_participant(key);
        } else if let Some(entry) = self.participants.iter_mut().find(|p| &p.key == key) {
            entry.seats_held -= releasing;
        }
        self.available_seats = restored;
        self.updated_at = now;
        debug_assert!(self.invariant_holds());
        Ok(releasing)
    }

    /// Inserts a participant or increments an existing holding
    pub fn upsert_participant(&mut self, key: &UserKey, seats: u32) {
        if let Some(entry) = self.participants.iter_mut().find(|p| &p.key == key) {
            entry.seats_held += seats;
        } else {
            self.participants.push(Participant {
                key: key.clone(),
                seats_held: seats,
            });
        }
    }

    /// Removes a participant entirely, returning the seats they held
    pub fn drop_participant(&mut self, key: &UserKey) -> Option<u32> {
        let index = self.participants.iter().position(|p| &p.key == key)?;
        Some(self.participants.remove(index).seats_held)
    }
}

// ============================================================================
// Orders
// ============================================================================

/// Contact details recorded with an order (opaque to the engine)
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactInfo {
    /// Purchaser's display name
    pub name: String,
    /// Purchaser's phone number
    pub phone: String,
}

/// One lesson + seat-count allocation recorded in an order
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    /// The lesson the seats were booked in
    pub lesson_id: LessonId,
    /// Seats booked by this line item
    pub seats_booked: u32,
}

/// A completed multi-lesson purchase.
///
/// Created exactly once, inside the order transaction, after every line item
/// has been allocated; never mutated or deleted afterwards.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Order {
    /// Unique order identifier
    pub id: OrderId,
    /// Key of the purchasing user
    pub purchaser: UserKey,
    /// Contact details supplied with the purchase
    pub contact: ContactInfo,
    /// The allocated line items, in the order they were supplied
    pub line_items: Vec<LineItem>,
    /// Sum of `lesson.price * seats_booked` across line items
    pub total_price: Money,
    /// When the order was committed
    pub created_at: DateTime<Utc>,
}
