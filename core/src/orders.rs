//! Order coordinator.
//!
//! Turns a multi-lesson purchase into one all-or-nothing unit of work. Every
//! read and write happens inside a single [`StoreTx`] scope; line items are
//! allocated immediately, in the caller-supplied order, so a later item that
//! references the same lesson sees the availability an earlier item already
//! consumed. Any failure rolls the whole scope back — partial allocation is
//! never observable, and no order record exists for a failed purchase.

use crate::enrollment::EnrollmentMutator;
use crate::environment::BookingEnvironment;
use crate::error::{BookingError, Result};
use crate::store::StoreTx;
use crate::types::{ContactInfo, LessonId, LineItem, Money, Order, OrderId, UserKey};
use std::fmt;
use tracing::{debug, instrument, warn};

/// One requested lesson + seat count in a purchase.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LineItemRequest {
    /// Lesson to book seats in
    pub lesson_id: LessonId,
    /// Seats requested, at least 1
    pub seats: u32,
}

/// Phases of an order's lifecycle, for structured logging.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum OrderPhase {
    Started,
    Validating,
    Allocating,
    Committed,
    Aborted,
}

impl fmt::Display for OrderPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let phase = match self {
            Self::Started => "started",
            Self::Validating => "validating",
            Self::Allocating => "allocating",
            Self::Committed => "committed",
            Self::Aborted => "aborted",
        };
        write!(f, "{phase}")
    }
}

/// Coordinates multi-lesson purchases.
#[derive(Clone)]
pub struct OrderCoordinator {
    env: BookingEnvironment,
    enrollment: EnrollmentMutator,
}

impl OrderCoordinator {
    /// Creates a new `OrderCoordinator`
    #[must_use]
    pub fn new(env: BookingEnvironment) -> Self {
        let enrollment = EnrollmentMutator::new(env.clone());
        Self { env, enrollment }
    }

    /// Places an order: validates the purchaser, allocates every line item
    /// inside one transaction scope, computes the total, and records the
    /// order — or rolls everything back and propagates the failure.
    ///
    /// # Errors
    ///
    /// - [`BookingError::EmptyOrder`] / [`BookingError::InvalidSeatCount`]
    ///   for a malformed item list
    /// - [`BookingError::UserNotFound`] when the purchaser is unknown
    /// - [`BookingError::LessonNotFound`] when a line item's lesson is absent
    /// - [`BookingError::InsufficientSeats`] when a lesson runs short,
    ///   naming the lesson and the seats left
    /// - [`BookingError::PriceOverflow`] when the total cannot be represented
    /// - [`BookingError::Store`] on persistence or transaction failure
    #[instrument(skip(self, contact, line_items), fields(%purchaser, items = line_items.len()))]
    pub async fn place_order(
        &self,
        purchaser: UserKey,
        contact: ContactInfo,
        line_items: &[LineItemRequest],
    ) -> Result<Order> {
        debug!(phase = %OrderPhase::Started, "placing order");
        if line_items.is_empty() {
            return Err(BookingError::EmptyOrder);
        }
        if line_items.iter().any(|item| item.seats < 1) {
            return Err(BookingError::InvalidSeatCount);
        }

        let mut tx = self.env.store.begin().await?;
        let outcome = self
            .run_order(&mut *tx, &purchaser, contact, line_items)
            .await;

        match outcome {
            Ok(order) => {
                tx.commit().await?;
                debug!(phase = %OrderPhase::Committed, order_id = %order.id, total = %order.total_price, "order committed");
                Ok(order)
            }
            Err(err) => {
                debug!(phase = %OrderPhase::Aborted, error = %err, "order aborted, rolling back");
                if let Err(rollback_err) = tx.rollback().await {
                    warn!(error = %rollback_err, "rollback reported a failure");
                }
                Err(err)
            }
        }
    }

    /// Fetches one order.
    ///
    /// # Errors
    ///
    /// - [`BookingError::OrderNotFound`] when the order is absent
    /// - [`BookingError::Store`] on persistence failure
    pub async fn get(&self, order_id: OrderId) -> Result<Order> {
        self.env
            .store
            .find_order(order_id)
            .await?
            .ok_or(BookingError::OrderNotFound(order_id))
    }

    /// Lists every order.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::Store`] on persistence failure.
    pub async fn list(&self) -> Result<Vec<Order>> {
        Ok(self.env.store.list_orders().await?)
    }

    /// The transactional body: everything here either commits as a whole or
    /// leaves no trace.
    async fn run_order(
        &self,
        tx: &mut (dyn StoreTx + '_),
        purchaser: &UserKey,
        contact: ContactInfo,
        line_items: &[LineItemRequest],
    ) -> Result<Order> {
        debug!(phase = %OrderPhase::Validating, %purchaser, "resolving purchaser");
        if self.env.directory.find_by_key(purchaser).await?.is_none() {
            return Err(BookingError::UserNotFound(purchaser.clone()));
        }

        debug!(phase = %OrderPhase::Allocating, items = line_items.len(), "allocating line items");
        let mut total_price = Money::ZERO;
        let mut allocated = Vec::with_capacity(line_items.len());
        for item in line_items {
            let lesson = tx
                .find_lesson(item.lesson_id)
                .await?
                .ok_or(BookingError::LessonNotFound(item.lesson_id))?;
            if lesson.available_seats < item.seats {
                return Err(BookingError::InsufficientSeats {
                    name: lesson.name.clone(),
                    requested: item.seats,
                    available: lesson.available_seats,
                });
            }

            let subtotal = lesson
                .price
                .checked_multiply(item.seats)
                .ok_or(BookingError::PriceOverflow)?;
            total_price = total_price
                .checked_add(subtotal)
                .ok_or(BookingError::PriceOverflow)?;

            // Allocate now, not after validation of the remaining items, so
            // a second line item on the same lesson contends with this one.
            self.enrollment
                .add_participant_in(tx, item.lesson_id, purchaser, item.seats)
                .await?;
            allocated.push(LineItem {
                lesson_id: item.lesson_id,
                seats_booked: item.seats,
            });
        }

        let order = Order {
            id: OrderId::new(),
            purchaser: purchaser.clone(),
            contact,
            line_items: allocated,
            total_price,
            created_at: self.env.clock.now(),
        };
        tx.insert_order(&order).await?;
        Ok(order)
    }
}
