//! Map surface visibility and what each transition turns on or off.

use ridelink_common::{LifecycleError, SurfaceLifecycleState};
use tracing::{debug, warn};

/// Side effects the session must perform for a transition, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateAction {
    /// Open the presence subscription and run the connectivity probe.
    SubscribePresence,
    /// Location delivery is wanted (it still waits for the map style).
    StartLocation,
    StopLocation,
    /// Cancel every listener and release the map surface.
    ReleaseAll,
}

/// Tracks [`SurfaceLifecycleState`] and rejects impossible transitions.
#[derive(Debug)]
pub struct LifecycleGate {
    state: SurfaceLifecycleState,
    activations: u32,
}

impl Default for LifecycleGate {
    fn default() -> Self {
        Self::new()
    }
}

impl LifecycleGate {
    pub fn new() -> Self {
        Self {
            state: SurfaceLifecycleState::Created,
            activations: 0,
        }
    }

    pub fn state(&self) -> SurfaceLifecycleState {
        self.state
    }

    /// Number of times the surface has entered STARTED.
    pub fn activations(&self) -> u32 {
        self.activations
    }

    pub fn is_started(&self) -> bool {
        self.state == SurfaceLifecycleState::Started
    }

    /// Move to `to`. Repeating the current state is a no-op.
    pub fn transition(
        &mut self,
        to: SurfaceLifecycleState,
    ) -> Result<Vec<GateAction>, LifecycleError> {
        use SurfaceLifecycleState::*;

        let from = self.state;
        if from == to {
            debug!(state = %to, "lifecycle unchanged");
            return Ok(Vec::new());
        }

        let actions = match (from, to) {
            (Destroyed, _) => {
                warn!(to = %to, "surface already destroyed");
                return Err(LifecycleError::Destroyed);
            }
            (Created, Started) => vec![GateAction::SubscribePresence, GateAction::StartLocation],
            (Stopped, Started) => vec![GateAction::StartLocation],
            (Started, Stopped) => vec![GateAction::StopLocation],
            (Started, Destroyed) => vec![GateAction::StopLocation, GateAction::ReleaseAll],
            (Created | Stopped, Destroyed) => vec![GateAction::ReleaseAll],
            _ => {
                warn!(from = %from, to = %to, "rejected lifecycle transition");
                return Err(LifecycleError::InvalidTransition {
                    from: from.to_string(),
                    to: to.to_string(),
                });
            }
        };

        if to == Started {
            self.activations += 1;
        }
        debug!(from = %from, to = %to, ?actions, "lifecycle transition");
        self.state = to;
        Ok(actions)
    }
}
