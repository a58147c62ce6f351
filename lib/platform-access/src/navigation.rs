//! Navigation hook supplied by the host environment.

use std::sync::{Mutex, PoisonError};

/// Performs navigation on behalf of the authority.
///
/// The authority decides where to go; the host owns how to get there
/// (router push, full reload, printing the route in a console host).
pub trait Navigator: Send + Sync {
    /// Navigates to `route`.
    fn navigate(&self, route: &str);
}

/// Navigator that records routes instead of acting on them.
///
/// Useful for hosts that apply navigation after the fact, and in tests.
#[derive(Debug, Default)]
pub struct RecordingNavigator {
    routes: Mutex<Vec<String>>,
}

impl RecordingNavigator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns every route navigated to, oldest first.
    #[must_use]
    pub fn routes(&self) -> Vec<String> {
        self.routes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Returns the most recent route.
    #[must_use]
    pub fn last(&self) -> Option<String> {
        self.routes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .last()
            .cloned()
    }
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, route: &str) {
        self.routes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(route.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_navigator_keeps_order() {
        let nav = RecordingNavigator::new();
        assert!(nav.last().is_none());
        nav.navigate("/login");
        nav.navigate("/dashboard");
        assert_eq!(nav.routes(), vec!["/login", "/dashboard"]);
        assert_eq!(nav.last().as_deref(), Some("/dashboard"));
    }
}
