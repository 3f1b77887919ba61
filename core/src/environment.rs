//! Injected dependencies for the capacity engine.
//!
//! All external collaborators are abstracted behind traits and handed to the
//! services in one [`BookingEnvironment`] value; the engine holds no global
//! state of its own, so it stays independently testable.

use crate::config::BookingConfig;
use crate::directory::UserDirectory;
use crate::store::Store;
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Clock trait - abstracts time operations for testability
pub trait Clock: Send + Sync {
    /// Get the current time
    fn now(&self) -> DateTime<Utc>;
}

/// Production clock backed by the system time
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Environment dependencies shared by every engine component
#[derive(Clone)]
pub struct BookingEnvironment {
    /// Document persistence
    pub store: Arc<dyn Store>,
    /// User lookup
    pub directory: Arc<dyn UserDirectory>,
    /// Clock for timestamps
    pub clock: Arc<dyn Clock>,
    /// Engine tunables
    pub config: BookingConfig,
}

impl BookingEnvironment {
    /// Creates a new `BookingEnvironment`
    #[must_use]
    pub fn new(
        store: Arc<dyn Store>,
        directory: Arc<dyn UserDirectory>,
        clock: Arc<dyn Clock>,
        config: BookingConfig,
    ) -> Self {
        Self {
            store,
            directory,
            clock,
            config,
        }
    }
}
