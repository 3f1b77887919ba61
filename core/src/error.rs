//! Error types for booking operations.

use crate::store::StoreError;
use crate::types::{LessonId, OrderId, UserKey};
use thiserror::Error;

/// Result type alias for booking operations.
pub type Result<T> = std::result::Result<T, BookingError>;

/// Coarse failure taxonomy the request-handling layer maps onto transport
/// responses.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// A referenced lesson, user, order, or participant is absent
    NotFound,
    /// Structurally valid input that is semantically rejected
    Invalid,
    /// A create collided with an existing identical record
    Duplicate,
    /// The persistence collaborator failed
    Unavailable,
}

/// Failure modes of the capacity engine.
///
/// Variants are fine-grained so callers and tests can match on the exact
/// cause; [`BookingError::kind`] collapses them into the four-way taxonomy
/// the transport layer cares about.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum BookingError {
    // ═══════════════════════════════════════════════════════════
    // Missing references
    // ═══════════════════════════════════════════════════════════

    /// The referenced lesson does not exist.
    #[error("lesson {0} not found")]
    LessonNotFound(LessonId),

    /// The referenced user key does not resolve to a known user.
    #[error("user {0} not found")]
    UserNotFound(UserKey),

    /// The referenced order does not exist.
    #[error("order {0} not found")]
    OrderNotFound(OrderId),

    // ═══════════════════════════════════════════════════════════
    // Lesson field rejections
    // ═══════════════════════════════════════════════════════════

    /// A lesson with identical descriptive fields already exists.
    #[error("an identical lesson named {name:?} already exists")]
    DuplicateLesson {
        /// Name of the colliding lesson
        name: String,
    },

    /// Capacity is below the configured minimum.
    #[error("capacity {capacity} is below the minimum of {minimum}")]
    CapacityBelowMinimum {
        /// Requested capacity
        capacity: u32,
        /// Configured floor
        minimum: u32,
    },

    /// Capacity cannot be set below the seats already booked.
    #[error("capacity cannot be less than booked seats: {booked}")]
    CapacityBelowBooked {
        /// Requested capacity
        capacity: u32,
        /// Seats currently booked
        booked: u32,
    },

    /// Explicit capacity and available-seats values disagree with the booked
    /// total.
    #[error(
        "capacity {capacity} and available seats {available} are inconsistent with {booked} booked seats"
    )]
    InconsistentCapacityPair {
        /// Explicit capacity supplied
        capacity: u32,
        /// Explicit available seats supplied
        available: u32,
        /// Seats the update would leave booked
        booked: u32,
    },

    /// Capacity arithmetic overflowed.
    #[error("capacity arithmetic overflowed")]
    CapacityOverflow,

    // ═══════════════════════════════════════════════════════════
    // Seat allocation rejections
    // ═══════════════════════════════════════════════════════════

    /// The lesson has no open seats at all.
    #[error("no seats available in lesson {0}")]
    NoSeatsAvailable(LessonId),

    /// Fewer seats are open than were requested.
    #[error("not enough space in lesson {name:?}, only {available} left")]
    InsufficientSeats {
        /// Name of the lesson that ran short
        name: String,
        /// Seats requested
        requested: u32,
        /// Seats actually open
        available: u32,
    },

    /// The booked total would exceed the lesson's capacity.
    #[error("{booked} booked seats exceeds available space of {capacity}")]
    ExceedsCapacity {
        /// Seats the operation would leave booked
        booked: u32,
        /// The lesson's capacity
        capacity: u32,
    },

    /// The participant holds no seats in this lesson.
    #[error("{key} is not enrolled in lesson {lesson}")]
    NotEnrolled {
        /// The lesson in question
        lesson: LessonId,
        /// The key that is not enrolled
        key: UserKey,
    },

    /// Asked to release more seats than the participant holds.
    #[error("cannot release {requested} seats, only {held} held")]
    ReleaseExceedsHolding {
        /// Seats requested for release
        requested: u32,
        /// Seats currently held
        held: u32,
    },

    /// Seat counts must be at least one.
    #[error("seat count must be at least 1")]
    InvalidSeatCount,

    // ═══════════════════════════════════════════════════════════
    // Order rejections
    // ═══════════════════════════════════════════════════════════

    /// An order needs at least one line item.
    #[error("an order requires at least one line item")]
    EmptyOrder,

    /// The order total overflowed.
    #[error("order total overflowed")]
    PriceOverflow,

    // ═══════════════════════════════════════════════════════════
    // Concurrency and system errors
    // ═══════════════════════════════════════════════════════════

    /// The lesson changed underneath the operation and the retry budget ran
    /// out.
    #[error("lesson {0} was modified concurrently, retries exhausted")]
    ConcurrentModification(LessonId),

    /// The persistence collaborator failed.
    #[error("persistence failure: {0}")]
    Store(#[from] StoreError),
}

impl BookingError {
    /// Maps this error onto the four-way taxonomy.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::LessonNotFound(_) | Self::UserNotFound(_) | Self::OrderNotFound(_) => {
                ErrorKind::NotFound
            }
            Self::DuplicateLesson { .. } => ErrorKind::Duplicate,
            Self::Store(_) => ErrorKind::Unavailable,
            _ => ErrorKind::Invalid,
        }
    }

    /// Returns `true` if this error is a rejection of the caller's input
    /// rather than a system fault.
    #[must_use]
    pub const fn is_user_error(&self) -> bool {
        !matches!(self.kind(), ErrorKind::Unavailable)
    }
}
