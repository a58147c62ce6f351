//! Navigation for a terminal host.

use frontdesk_platform_access::Navigator;
use std::sync::{Mutex, PoisonError};
use tracing::info;

/// Prints navigations instead of performing them.
#[derive(Debug, Default)]
pub struct ConsoleNavigator {
    visited: Mutex<Vec<String>>,
}

impl ConsoleNavigator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Routes navigated to so far, oldest first.
    #[must_use]
    pub fn visited(&self) -> Vec<String> {
        self.visited
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Navigator for ConsoleNavigator {
    fn navigate(&self, route: &str) {
        info!(route, "navigate");
        println!("-> {route}");
        self.visited
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(route.to_string());
    }
}
