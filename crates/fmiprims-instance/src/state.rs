use std::fmt;

use serde::Serialize;

/// Position of one component instance in its lifecycle.
///
/// ```text
/// Unloaded -> Instantiated -> Initialized <-> Terminated -> Freed
///                  \_________________________________________/
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum LifecycleState {
    /// No native instance exists yet.
    Unloaded,
    Instantiated,
    Initialized,
    Terminated,
    /// The native instance is gone; nothing is allowed anymore.
    Freed,
}

impl LifecycleState {
    /// Whether get/set calls may reach the native side.
    pub fn allows_exchange(self) -> bool {
        matches!(self, LifecycleState::Instantiated | LifecycleState::Initialized)
    }

    /// Whether the native instance may be freed from this state.
    pub fn allows_free(self) -> bool {
        matches!(self, LifecycleState::Instantiated | LifecycleState::Terminated)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            LifecycleState::Unloaded => "unloaded",
            LifecycleState::Instantiated => "instantiated",
            LifecycleState::Initialized => "initialized",
            LifecycleState::Terminated => "terminated",
            LifecycleState::Freed => "freed",
        }
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
