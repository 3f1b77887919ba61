//! In-memory document store with transaction scopes.
//!
//! Concurrency model: one writer lock guards the tables. Standalone
//! operations take it per call, so a conditional update is atomic with
//! respect to every other write. A transaction scope holds the lock for its
//! whole lifetime and mutates a staged copy of the tables; commit publishes
//! the copy in one assignment, rollback (or drop) discards it. Readers can
//! therefore never observe a half-applied scope, and every write still goes
//! through the same revision precondition a shared-database backend would
//! enforce.

use async_trait::async_trait;
use classbook_core::store::{LessonFilter, Store, StoreError, StoreTx};
use classbook_core::types::{Lesson, LessonId, Order, OrderId};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::debug;

#[derive(Clone, Debug, Default)]
struct Tables {
    lessons: HashMap<LessonId, Lesson>,
    orders: HashMap<OrderId, Order>,
}

impl Tables {
    fn lessons_matching(&self, filter: &LessonFilter) -> Vec<Lesson> {
        let mut lessons: Vec<Lesson> = self
            .lessons
            .values()
            .filter(|lesson| filter.matches(lesson))
            .cloned()
            .collect();
        lessons.sort_by(|a, b| (a.created_at, a.id).cmp(&(b.created_at, b.id)));
        lessons
    }

    fn replace_if_current(
        &mut self,
        lesson: &Lesson,
        expected_revision: u64,
    ) -> Result<Lesson, StoreError> {
        match self.lessons.get(&lesson.id) {
            Some(current) if current.revision == expected_revision => {
                let mut stored = lesson.clone();
                stored.revision = expected_revision + 1;
                self.lessons.insert(stored.id, stored.clone());
                Ok(stored)
            }
            // A deleted lesson fails the precondition the same way a
            // concurrently-updated one does.
            Some(current) => {
                debug!(
                    lesson_id = %lesson.id,
                    expected_revision,
                    current_revision = current.revision,
                    "conditional update lost"
                );
                Err(StoreError::Conflict {
                    entity: lesson.id.to_string(),
                })
            }
            None => Err(StoreError::Conflict {
                entity: lesson.id.to_string(),
            }),
        }
    }

    fn insert_lesson(&mut self, lesson: &Lesson) -> Result<(), StoreError> {
        if self.lessons.contains_key(&lesson.id) {
            return Err(StoreError::Backend(format!(
                "lesson id {} already exists",
                lesson.id
            )));
        }
        self.lessons.insert(lesson.id, lesson.clone());
        Ok(())
    }

    fn insert_order(&mut self, order: &Order) -> Result<(), StoreError> {
        if self.orders.contains_key(&order.id) {
            return Err(StoreError::Backend(format!(
                "order id {} already exists",
                order.id
            )));
        }
        self.orders.insert(order.id, order.clone());
        Ok(())
    }
}

/// In-memory [`Store`] implementation.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
}

impl MemoryStore {
    /// Creates an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn find_lesson(&self, id: LessonId) -> Result<Option<Lesson>, StoreError> {
        Ok(self.tables.lock().await.lessons.get(&id).cloned())
    }

    async fn list_lessons(&self, filter: &LessonFilter) -> Result<Vec<Lesson>, StoreError> {
        Ok(self.tables.lock().await.lessons_matching(filter))
    }

    async fn insert_lesson(&self, lesson: &Lesson) -> Result<(), StoreError> {
        self.tables.lock().await.insert_lesson(lesson)
    }

    async fn update_lesson(
        &self,
        lesson: &Lesson,
        expected_revision: u64,
    ) -> Result<Lesson, StoreError> {
        self.tables
            .lock()
            .await
            .replace_if_current(lesson, expected_revision)
    }

    async fn delete_lesson(&self, id: LessonId) -> Result<bool, StoreError> {
        Ok(self.tables.lock().await.lessons.remove(&id).is_some())
    }

    async fn find_order(&self, id: OrderId) -> Result<Option<Order>, StoreError> {
        Ok(self.tables.lock().await.orders.get(&id).cloned())
    }

    async fn list_orders(&self) -> Result<Vec<Order>, StoreError> {
        let tables = self.tables.lock().await;
        let mut orders: Vec<Order> = tables.orders.values().cloned().collect();
        orders.sort_by(|a, b| (a.created_at, a.id).cmp(&(b.created_at, b.id)));
        Ok(orders)
    }

    async fn insert_order(&self, order: &Order) -> Result<(), StoreError> {
        self.tables.lock().await.insert_order(order)
    }

    async fn begin(&self) -> Result<Box<dyn StoreTx + '_>, StoreError> {
        let guard = Arc::clone(&self.tables).lock_owned().await;
        let staged = guard.clone();
        Ok(Box::new(MemoryTx { guard, staged }))
    }
}

/// A transaction scope over [`MemoryStore`].
///
/// Holds the store's writer lock, so the scope is serialized against every
/// other operation; all mutations land on `staged` and become visible only
/// through [`StoreTx::commit`].
struct MemoryTx {
    guard: OwnedMutexGuard<Tables>,
    staged: Tables,
}

#[async_trait]
impl StoreTx for MemoryTx {
    async fn find_lesson(&mut self, id: LessonId) -> Result<Option<Lesson>, StoreError> {
        Ok(self.staged.lessons.get(&id).cloned())
    }

    async fn update_lesson(
        &mut self,
        lesson: &Lesson,
        expected_revision: u64,
    ) -> Result<Lesson, StoreError> {
        self.staged.replace_if_current(lesson, expected_revision)
    }

    async fn insert_order(&mut self, order: &Order) -> Result<(), StoreError> {
        self.staged.insert_order(order)
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let MemoryTx { mut guard, staged } = *self;
        *guard = staged;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), StoreError> {
        // Dropping the scope releases the lock and discards the staged
        // tables; nothing was ever visible outside it.
        drop(self);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use classbook_core::environment::Clock;
    use classbook_core::types::{Money, UserKey};
    use classbook_testing::test_clock;

    fn lesson() -> Lesson {
        let now = test_clock().now();
        Lesson {
            id: LessonId::new(),
            name: "Smoke".to_string(),
            topic: "Music".to_string(),
            location: "Room 4".to_string(),
            description: String::new(),
            image: None,
            owner: UserKey::new("teacher@example.com"),
            price: Money::from_cents(1000),
            capacity: 10,
            available_seats: 10,
            participants: Vec::new(),
            revision: 0,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn insert_find_delete_round_trip() {
        tokio_test::block_on(async {
            let store = MemoryStore::new();
            let sample = lesson();

            store.insert_lesson(&sample).await.unwrap();
            assert_eq!(store.find_lesson(sample.id).await.unwrap(), Some(sample.clone()));
            assert!(store.delete_lesson(sample.id).await.unwrap());
            assert_eq!(store.find_lesson(sample.id).await.unwrap(), None);
        });
    }

    #[test]
    fn revision_bumps_on_every_write() {
        tokio_test::block_on(async {
            let store = MemoryStore::new();
            let sample = lesson();
            store.insert_lesson(&sample).await.unwrap();

            let first = store.update_lesson(&sample, 0).await.unwrap();
            let second = store.update_lesson(&first, first.revision).await.unwrap();
            assert_eq!((first.revision, second.revision), (1, 2));
        });
    }
}
