//! Persistence collaborator interface.
//!
//! The engine never talks to a database directly; it goes through [`Store`]
//! and, for multi-document work, the [`StoreTx`] transaction scope. The
//! contract the engine leans on:
//!
//! - [`Store::update_lesson`] is an **atomic conditional update**: the write
//!   succeeds only if the stored revision still equals the revision the
//!   caller read, otherwise it fails with [`StoreError::Conflict`] and the
//!   caller must re-read and retry. Read-check-write is never split into
//!   separate steps anywhere in the engine.
//! - [`StoreTx`] provides all-or-nothing visibility: no other operation can
//!   observe a subset of the scope's writes, and dropping the scope without
//!   committing rolls every staged write back.

use crate::types::{Lesson, LessonId, Money, Order, OrderId, UserKey};
use async_trait::async_trait;
use thiserror::Error;

/// Failures at the persistence boundary.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// A conditional update's revision precondition no longer held.
    #[error("conditional update conflict on {entity}")]
    Conflict {
        /// Identifier of the document that changed underneath the writer
        entity: String,
    },

    /// The backend itself failed.
    #[error("storage backend failure: {0}")]
    Backend(String),
}

/// The descriptive fields that make two lesson submissions "identical" for
/// the duplicate-submission guard.
#[derive(Clone, Debug, PartialEq)]
pub struct DuplicateKey {
    /// Lesson name
    pub name: String,
    /// Subject taught
    pub topic: String,
    /// Where the lesson takes place
    pub location: String,
    /// Total seats
    pub capacity: u32,
    /// Price per seat
    pub price: Money,
    /// Optional image reference
    pub image: Option<String>,
}

impl DuplicateKey {
    /// Returns `true` if `lesson` matches every guarded field
    #[must_use]
    pub fn matches(&self, lesson: &Lesson) -> bool {
        lesson.name == self.name
            && lesson.topic == self.topic
            && lesson.location == self.location
            && lesson.capacity == self.capacity
            && lesson.price == self.price
            && lesson.image == self.image
    }
}

/// Filter for find-many lesson queries.
#[derive(Clone, Debug, PartialEq)]
pub enum LessonFilter {
    /// Every lesson
    All,
    /// Lessons taught by the given user
    ByOwner(UserKey),
    /// Lessons the given user holds seats in
    ByParticipant(UserKey),
    /// Lessons matching the duplicate-submission guard
    DuplicateOf(DuplicateKey),
}

impl LessonFilter {
    /// Returns `true` if `lesson` satisfies this filter
    #[must_use]
    pub fn matches(&self, lesson: &Lesson) -> bool {
        match self {
            Self::All => true,
            Self::ByOwner(key) => &lesson.owner == key,
            Self::ByParticipant(key) => lesson.seats_held_by(key).is_some(),
            Self::DuplicateOf(probe) => probe.matches(lesson),
        }
    }
}

/// Document persistence for lessons and orders.
///
/// Implementations must make `update_lesson` atomic with respect to every
/// other write of the same lesson, including writes made through transaction
/// scopes.
#[async_trait]
pub trait Store: Send + Sync {
    /// Finds a lesson by id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Backend`] if the backend fails.
    async fn find_lesson(&self, id: LessonId) -> Result<Option<Lesson>, StoreError>;

    /// Lists lessons matching `filter`, in creation order.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Backend`] if the backend fails.
    async fn list_lessons(&self, filter: &LessonFilter) -> Result<Vec<Lesson>, StoreError>;

    /// Inserts a new lesson document.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Backend`] if the backend fails or the id is
    /// already taken.
    async fn insert_lesson(&self, lesson: &Lesson) -> Result<(), StoreError>;

    /// Atomically replaces a lesson if its stored revision still equals
    /// `expected_revision`, returning the stored document with its bumped
    /// revision.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Conflict`] when the precondition fails (the
    /// lesson changed underneath the caller, or was deleted) and
    /// [`StoreError::Backend`] if the backend fails.
    async fn update_lesson(
        &self,
        lesson: &Lesson,
        expected_revision: u64,
    ) -> Result<Lesson, StoreError>;

    /// Deletes a lesson, returning `true` if a document was removed.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Backend`] if the backend fails.
    async fn delete_lesson(&self, id: LessonId) -> Result<bool, StoreError>;

    /// Finds an order by id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Backend`] if the backend fails.
    async fn find_order(&self, id: OrderId) -> Result<Option<Order>, StoreError>;

    /// Lists every order, in creation order.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Backend`] if the backend fails.
    async fn list_orders(&self) -> Result<Vec<Order>, StoreError>;

    /// Inserts a new order document.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Backend`] if the backend fails or the id is
    /// already taken.
    async fn insert_order(&self, order: &Order) -> Result<(), StoreError>;

    /// Opens a transaction scope.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Backend`] if the backend cannot start a
    /// transaction.
    async fn begin(&self) -> Result<Box<dyn StoreTx + '_>, StoreError>;
}

/// A transaction scope over the store.
///
/// Writes staged here become visible to other operations only when
/// [`StoreTx::commit`] succeeds; reads inside the scope observe the scope's
/// own staged writes. Dropping the scope (or calling [`StoreTx::rollback`])
/// discards everything, which is how a failed order undoes its partial
/// allocations.
#[async_trait]
pub trait StoreTx: Send {
    /// Finds a lesson by id, observing this scope's staged writes.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Backend`] if the backend fails.
    async fn find_lesson(&mut self, id: LessonId) -> Result<Option<Lesson>, StoreError>;

    /// Conditionally replaces a lesson inside the scope, with the same
    /// revision precondition as [`Store::update_lesson`].
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Conflict`] when the precondition fails and
    /// [`StoreError::Backend`] if the backend fails.
    async fn update_lesson(
        &mut self,
        lesson: &Lesson,
        expected_revision: u64,
    ) -> Result<Lesson, StoreError>;

    /// Stages an order insert inside the scope.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Backend`] if the backend fails or the id is
    /// already taken.
    async fn insert_order(&mut self, order: &Order) -> Result<(), StoreError>;

    /// Publishes every staged write atomically.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Backend`] if the commit fails; nothing is
    /// published in that case.
    async fn commit(self: Box<Self>) -> Result<(), StoreError>;

    /// Discards every staged write.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Backend`] if the backend fails; staged writes
    /// are still discarded.
    async fn rollback(self: Box<Self>) -> Result<(), StoreError>;
}
