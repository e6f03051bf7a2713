//! Analytics selection state.
//!
//! Tracks which uploaded file the dashboard is looking at and the reporting
//! period. Both belong to the signed-in user, so the selected file is dropped
//! whenever the session ends.

use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::debug;

use crate::auth::{LogoutReason, SessionObserver};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportingPeriod {
    pub start: Option<String>,
    pub end: Option<String>,
}

#[derive(Debug, Default)]
struct SelectionState {
    file: Option<String>,
    period: ReportingPeriod,
}

#[derive(Debug, Default)]
pub struct AnalyticsSelection {
    state: Mutex<SelectionState>,
}

impl AnalyticsSelection {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, SelectionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn select_file(&self, name: impl Into<String>) {
        self.state().file = Some(name.into());
    }

    pub fn selected_file(&self) -> Option<String> {
        self.state().file.clone()
    }

    pub fn clear_selected_file(&self) {
        self.state().file = None;
    }

    pub fn set_period(&self, start: Option<String>, end: Option<String>) {
        self.state().period = ReportingPeriod { start, end };
    }

    pub fn period(&self) -> ReportingPeriod {
        self.state().period.clone()
    }
}

impl SessionObserver for AnalyticsSelection {
    fn on_logout(&self, reason: LogoutReason) {
        if let Some(file) = self.state().file.take() {
            debug!(%file, ?reason, "Cleared selected file on logout");
        }
    }
}
