//! # Classbook Core
//!
//! The capacity-consistency engine for a lesson booking backend: a finite
//! resource (a lesson's seats) sold across concurrent, multi-item orders.
//!
//! ## Components
//!
//! - [`types::Lesson`] — the capacity ledger entity and its pure seat
//!   arithmetic
//! - [`lessons::LessonService`] — creation, field-level update (with the
//!   embedded add/remove participant instruction), deletion, and queries
//! - [`enrollment::EnrollmentMutator`] — the atomic allocate/release
//!   primitive every seat-changing write goes through
//! - [`orders::OrderCoordinator`] — all-or-nothing multi-lesson purchases
//!
//! ## Invariants
//!
//! For every lesson, at all times visible to any reader:
//!
//! 1. `capacity == available_seats + sum(participants.seats_held)`
//! 2. `available_seats >= 0` and `capacity >= booked_seats()`
//! 3. no participant holds zero seats; a holding reduced to zero is removed
//!
//! Both are enforced by routing every write through a revision-guarded
//! conditional update ([`store::Store::update_lesson`]) and, for orders, a
//! transaction scope ([`store::StoreTx`]) with rollback-on-abort. There is
//! no separate read-then-write pair anywhere in the engine.
//!
//! ## Architecture
//!
//! Functional core, imperative shell: the ledger arithmetic is pure and
//! synchronous; the services own the I/O choreography. External
//! collaborators (persistence, user lookup, clock) are injected through
//! [`environment::BookingEnvironment`]; the engine holds no global state.

pub mod config;
pub mod directory;
pub mod enrollment;
pub mod environment;
pub mod error;
pub mod lessons;
pub mod orders;
pub mod store;
pub mod types;

pub use config::BookingConfig;
pub use directory::{UserDirectory, UserRecord};
pub use enrollment::EnrollmentMutator;
pub use environment::{BookingEnvironment, Clock, SystemClock};
pub use error::{BookingError, ErrorKind, Result};
pub use lessons::{LessonPatch, LessonService, NewLesson, ParticipantInstruction};
pub use orders::{LineItemRequest, OrderCoordinator};
pub use store::{DuplicateKey, LessonFilter, Store, StoreError, StoreTx};
pub use types::{
    ContactInfo, Lesson, LessonId, LineItem, Money, Order, OrderId, Participant, UserKey,
};
