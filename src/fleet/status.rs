use std::fmt;

use serde::Serialize;

/// Lifecycle of one worker as seen by the controller.
///
/// Transitions only move forward: `None -> Running -> {Stopped | Failed}`, plus
/// `None -> Failed` when the start retry budget runs out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ClientStatus {
    #[default]
    None,
    Running,
    Stopped,
    Failed,
}

impl ClientStatus {
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, ClientStatus::Stopped | ClientStatus::Failed)
    }

    #[must_use]
    pub const fn can_transition_to(self, next: ClientStatus) -> bool {
        matches!(
            (self, next),
            (ClientStatus::None, ClientStatus::Running)
                | (ClientStatus::None, ClientStatus::Failed)
                | (ClientStatus::Running, ClientStatus::Stopped)
                | (ClientStatus::Running, ClientStatus::Failed)
        )
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            ClientStatus::None => "none",
            ClientStatus::Running => "running",
            ClientStatus::Stopped => "stopped",
            ClientStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for ClientStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
