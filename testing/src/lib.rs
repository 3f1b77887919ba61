//! # Classbook Testing
//!
//! Testing utilities and fixtures for the capacity engine:
//!
//! - A deterministic [`FixedClock`]
//! - Builders for lesson inputs, directory users, and order contacts
//!
//! ## Example
//!
//! ```ignore
//! use classbook_testing::{LessonBuilder, test_clock, user};
//!
//! let input = LessonBuilder::new("Beginner Piano")
//!     .capacity(10)
//!     .price_cents(2000)
//!     .build();
//! ```

use chrono::{DateTime, Utc};
use classbook_core::environment::Clock;

/// Mock implementations for testing.
pub mod mocks {
    use super::{Clock, DateTime, Utc};

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making tests reproducible.
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Create a default fixed clock for tests (2026-01-01 00:00:00 UTC)
    ///
    /// # Panics
    ///
    /// This function will panic if the hardcoded timestamp fails to parse,
    /// which should never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(
            DateTime::parse_from_rfc3339("2026-01-01T00:00:00Z")
                .expect("hardcoded timestamp should always parse")
                .with_timezone(&Utc),
        )
    }
}

/// Builders for common test fixtures.
pub mod fixtures {
    use classbook_core::directory::UserRecord;
    use classbook_core::lessons::NewLesson;
    use classbook_core::types::{ContactInfo, Money, UserKey};

    /// Default owner key used by [`LessonBuilder`]
    pub const DEFAULT_OWNER: &str = "teacher@example.com";

    /// Builder for [`NewLesson`] inputs with sensible defaults
    #[derive(Debug, Clone)]
    pub struct LessonBuilder {
        name: String,
        topic: String,
        location: String,
        description: String,
        image: Option<String>,
        owner: UserKey,
        price: Money,
        capacity: u32,
    }

    impl LessonBuilder {
        /// Starts a builder for a lesson with the given name
        #[must_use]
        pub fn new(name: impl Into<String>) -> Self {
            Self {
                name: name.into(),
                topic: "Music".to_string(),
                location: "Room 4".to_string(),
                description: "A test lesson".to_string(),
                image: None,
                owner: UserKey::new(DEFAULT_OWNER),
                price: Money::from_cents(2000),
                capacity: 10,
            }
        }

        /// Sets the topic
        #[must_use]
        pub fn topic(mut self, topic: impl Into<String>) -> Self {
            self.topic = topic.into();
            self
        }

        /// Sets the location
        #[must_use]
        pub fn location(mut self, location: impl Into<String>) -> Self {
            self.location = location.into();
            self
        }

        /// Sets the owner key
        #[must_use]
        pub fn owner(mut self, owner: &UserKey) -> Self {
            self.owner = owner.clone();
            self
        }

        /// Sets the per-seat price in cents
        #[must_use]
        pub const fn price_cents(mut self, cents: u64) -> Self {
            self.price = Money::from_cents(cents);
            self
        }

        /// Sets the capacity
        #[must_use]
        pub const fn capacity(mut self, capacity: u32) -> Self {
            self.capacity = capacity;
            self
        }

        /// Builds the `NewLesson` input
        #[must_use]
        pub fn build(self) -> NewLesson {
            NewLesson {
                name: self.name,
                topic: self.topic,
                location: self.location,
                description: self.description,
                image: self.image,
                owner: self.owner,
                price: self.price,
                capacity: self.capacity,
            }
        }
    }

    /// A directory user for the given key
    #[must_use]
    pub fn user(key: &str) -> UserRecord {
        UserRecord {
            key: UserKey::new(key),
            name: key
                .split('@')
                .next()
                .unwrap_or(key)
                .to_string(),
        }
    }

    /// Contact details for order tests
    #[must_use]
    pub fn contact(name: &str) -> ContactInfo {
        ContactInfo {
            name: name.to_string(),
            phone: "0700 000000".to_string(),
        }
    }
}

// Re-export commonly used items
pub use fixtures::{DEFAULT_OWNER, LessonBuilder, contact, user};
pub use mocks::{FixedClock, test_clock};
