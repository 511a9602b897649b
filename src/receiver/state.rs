//! Connection state machine.

/// Lifecycle state of a receiver's connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    /// A connection attempt is in flight.
    #[default]
    Connecting,
    /// Connected and exchanging frames.
    Open,
    /// Connected, but the peer sent `Terminate`; the next close is final.
    Terminating,
    /// Disconnected; a reconnect is pending.
    ClosedRetryable,
    /// Disconnected for good.
    ClosedTerminal,
}

impl ConnectionState {
    /// Check if transition to target state is valid.
    ///
    /// Valid transitions:
    /// - Connecting -> Open
    /// - Connecting -> ClosedRetryable (connection attempt failed)
    /// - Open -> Terminating
    /// - Open -> ClosedRetryable
    /// - Terminating -> ClosedTerminal
    /// - ClosedRetryable -> Connecting
    /// - any non-terminal state -> ClosedTerminal (owner shut down)
    pub fn can_transition_to(&self, target: ConnectionState) -> bool {
        use ConnectionState::*;
        matches!(
            (*self, target),
            (Connecting, Open)
                | (Connecting, ClosedRetryable)
                | (Open, Terminating)
                | (Open, ClosedRetryable)
                | (ClosedRetryable, Connecting)
                | (Connecting | Open | Terminating | ClosedRetryable, ClosedTerminal)
        )
    }

    /// Attempt to transition to a new state.
    ///
    /// Returns `Ok(())` if the transition is valid, or an error otherwise.
    pub fn transition_to(&mut self, target: ConnectionState) -> crate::Result<()> {
        if self.can_transition_to(target) {
            *self = target;
            Ok(())
        } else {
            Err(crate::error::TtyShareError::InvalidStateTransition {
                from: *self,
                to: target,
            })
        }
    }

    /// Check if this is a terminal state (no further transitions possible).
    pub fn is_terminal(&self) -> bool {
        matches!(self, ConnectionState::ClosedTerminal)
    }

    /// Check if frames can be sent in this state.
    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionState::Open | ConnectionState::Terminating)
    }

    /// Whether a close in this state should be followed by a reconnect.
    pub fn retries_on_close(&self) -> bool {
        matches!(self, ConnectionState::Connecting | ConnectionState::Open)
    }
}
