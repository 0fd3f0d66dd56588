//! Session data types

/// Whether a session's scheduler thread is running
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    /// Pipeline owned by the session; waves run only on `evaluate()`
    #[default]
    Idle,
    /// Pipeline owned by the scheduler thread
    Running,
}

impl SessionState {
    /// Check if the scheduler thread is running
    pub fn is_running(&self) -> bool {
        matches!(self, SessionState::Running)
    }

    /// Display name for the state
    pub fn display_name(&self) -> &'static str {
        match self {
            SessionState::Idle => "Idle",
            SessionState::Running => "Running",
        }
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}
