//! Service lifecycle state machine
//!
//! ```text
//!  New ──► Starting ──► Running ──► Stopping ──► Stopped
//!              │           │            │           │
//!              └───────────┴─────┬──────┘           │
//!                                ▼                  │
//!                             Failed     Starting ◄─┘ (restart)
//! ```

use serde::{Deserialize, Serialize};

/// Lifecycle state of a registered service
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceState {
    /// Registered, never started
    New,

    /// Factory is constructing the instance
    Starting,

    /// Instance is live and visible to trackers
    Running,

    /// Factory is destroying the instance
    Stopping,

    /// Instance destroyed cleanly; may be restarted or unregistered
    Stopped,

    /// Construction or destruction failed; absorbing
    Failed,
}

impl ServiceState {
    /// All states in lifecycle order
    pub const ALL: [ServiceState; 6] = [
        ServiceState::New,
        ServiceState::Starting,
        ServiceState::Running,
        ServiceState::Stopping,
        ServiceState::Stopped,
        ServiceState::Failed,
    ];

    /// Check whether `self -> next` is a legal single step
    pub fn can_transition_to(self, next: ServiceState) -> bool {
        use ServiceState::*;
        matches!(
            (self, next),
            (New, Starting)
                | (Starting, Running)
                | (Running, Stopping)
                | (Stopping, Stopped)
                | (Stopped, Starting)
                | (Starting, Failed)
                | (Running, Failed)
                | (Stopping, Failed)
        )
    }

    /// Only running services are available to trackers and point queries
    pub fn is_available(self) -> bool {
        matches!(self, ServiceState::Running)
    }

    /// Check if this state admits no further transitions
    pub fn is_terminal(self) -> bool {
        matches!(self, ServiceState::Failed)
    }

    /// Check if the record may be removed from the kernel
    pub fn is_removable(self) -> bool {
        matches!(
            self,
            ServiceState::New | ServiceState::Stopped | ServiceState::Failed
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ServiceState::New => "new",
            ServiceState::Starting => "starting",
            ServiceState::Running => "running",
            ServiceState::Stopping => "stopping",
            ServiceState::Stopped => "stopped",
            ServiceState::Failed => "failed",
        }
    }
}

impl Default for ServiceState {
    fn default() -> Self {
        Self::New
    }
}

impl std::fmt::Display for ServiceState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
