//! Module instance lifecycle state machine.

use serde::{Deserialize, Serialize};

use erpmod_core::{FrameworkError, FrameworkResult};

/// Where a module instance is in its life.
///
/// ```text
/// Constructed -> Initializing -> Ready
///                     |   ^         |
///                     v   | retry   | failed refresh
///                   Error <---------+
/// any state except Disposed -> Disposed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
    Constructed,
    Initializing,
    Ready,
    Error,
    Disposed,
}

impl LifecycleState {
    pub fn as_str(self) -> &'static str {
        match self {
            LifecycleState::Constructed => "constructed",
            LifecycleState::Initializing => "initializing",
            LifecycleState::Ready => "ready",
            LifecycleState::Error => "error",
            LifecycleState::Disposed => "disposed",
        }
    }

    pub fn can_transition_to(self, next: LifecycleState) -> bool {
        use LifecycleState::*;
        matches!(
            (self, next),
            (Constructed, Initializing)
                | (Initializing, Ready)
                | (Initializing, Error)
                | (Ready, Error)
                | (Error, Initializing)
                | (Constructed | Initializing | Ready | Error, Disposed)
        )
    }

    /// The next state, or `InvalidTransition`.
    pub fn transition(self, next: LifecycleState) -> FrameworkResult<LifecycleState> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(FrameworkError::InvalidTransition {
                from: self.as_str().to_string(),
                to: next.as_str().to_string(),
            })
        }
    }

    pub fn is_disposed(self) -> bool {
        self == LifecycleState::Disposed
    }
}

impl core::fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use LifecycleState::*;

    const ALL: [LifecycleState; 5] = [Constructed, Initializing, Ready, Error, Disposed];

    #[test]
    fn allowed_transitions() {
        let allowed = [
            (Constructed, Initializing),
            (Initializing, Ready),
            (Initializing, Error),
            (Ready, Error),
            (Error, Initializing),
            (Constructed, Disposed),
            (Initializing, Disposed),
            (Ready, Disposed),
            (Error, Disposed),
        ];
        for from in ALL {
            for to in ALL {
                assert_eq!(
                    from.can_transition_to(to),
                    allowed.contains(&(from, to)),
                    "{from} -> {to}"
                );
            }
        }
    }

    #[test]
    fn disposed_is_terminal() {
        for to in ALL {
            assert!(matches!(
                Disposed.transition(to),
                Err(FrameworkError::InvalidTransition { .. })
            ));
        }
    }

    #[test]
    fn ready_cannot_skip_back_to_initializing() {
        let err = Ready.transition(Initializing).unwrap_err();
        assert_eq!(
            err,
            FrameworkError::InvalidTransition {
                from: "ready".into(),
                to: "initializing".into()
            }
        );
    }
}
