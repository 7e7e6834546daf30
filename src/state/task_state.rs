/// Lifecycle states of a supervised crawl task
use std::fmt;

/// Represents the current state of one site's crawl task
///
/// Transitions are `Pending -> Running -> (Completed | Cancelled | Failed)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskState {
    /// Task is registered but has not started running
    Pending,

    /// Task is crawling
    Running,

    /// Task finished its crawl
    Completed,

    /// Task observed cancellation and unwound
    Cancelled,

    /// Task hit an unexpected error or panicked
    Failed,
}

impl TaskState {
    /// Returns true if the task will not change state again
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled | Self::Failed)
    }

    /// Returns the lowercase name of the state
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_terminal() {
        assert!(!TaskState::Pending.is_terminal());
        assert!(!TaskState::Running.is_terminal());

        assert!(TaskState::Completed.is_terminal());
        assert!(TaskState::Cancelled.is_terminal());
        assert!(TaskState::Failed.is_terminal());
    }

    #[test]
    fn test_display() {
        assert_eq!(TaskState::Cancelled.to_string(), "cancelled");
    }
}
