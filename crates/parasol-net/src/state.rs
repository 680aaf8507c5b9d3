//! The NetSocket connection lifecycle, `spec.md` §4.8:
//! `DISCONNECTED → RESOLVING → CONNECTING → {HANDSHAKING →}? CONNECTED →
//! DISCONNECTED`. A server socket instead moves directly from initialised
//! to `LISTENING`; each accepted client then runs its own copy of the
//! client state machine.

/// One connection's lifecycle state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NetSocketState {
    Disconnected,
    Resolving,
    Connecting,
    HandshakingSsl,
    Connected,
    Listening,
}

impl NetSocketState {
    /// Whether `next` is a legal transition from `self`, per the state
    /// diagram in `spec.md` §4.8.
    pub fn can_transition_to(self, next: NetSocketState) -> bool {
        use NetSocketState::*;
        matches!(
            (self, next),
            (Disconnected, Resolving)
                | (Disconnected, Listening)
                | (Resolving, Connecting)
                | (Resolving, Disconnected)
                | (Connecting, HandshakingSsl)
                | (Connecting, Connected)
                | (Connecting, Disconnected)
                | (HandshakingSsl, Connected)
                | (HandshakingSsl, Disconnected)
                | (Connected, Disconnected)
                | (Listening, Disconnected)
        )
    }
}

/// A small state machine wrapper that rejects illegal transitions rather
/// than silently clobbering state, mirroring the original's `SetLong(Self,
/// FID_State, ...)` call sites which are themselves gated by the lifecycle
/// the C++ source documents in comments only.
#[derive(Debug)]
pub struct StateMachine {
    state: NetSocketState,
}

impl StateMachine {
    pub fn new() -> Self {
        Self { state: NetSocketState::Disconnected }
    }

    pub fn current(&self) -> NetSocketState {
        self.state
    }

    pub fn transition(&mut self, next: NetSocketState) -> Result<(), NetSocketState> {
        if self.state.can_transition_to(next) {
            self.state = next;
            Ok(())
        } else {
            Err(self.state)
        }
    }
}

impl Default for StateMachine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use NetSocketState::*;

    #[test]
    fn client_lifecycle_without_ssl() {
        let mut sm = StateMachine::new();
        assert_eq!(sm.current(), Disconnected);
        sm.transition(Resolving).unwrap();
        sm.transition(Connecting).unwrap();
        sm.transition(Connected).unwrap();
        sm.transition(Disconnected).unwrap();
    }

    #[test]
    fn client_lifecycle_with_ssl_handshake() {
        let mut sm = StateMachine::new();
        sm.transition(Resolving).unwrap();
        sm.transition(Connecting).unwrap();
        sm.transition(HandshakingSsl).unwrap();
        sm.transition(Connected).unwrap();
    }

    #[test]
    fn server_socket_skips_directly_to_listening() {
        let mut sm = StateMachine::new();
        sm.transition(Listening).unwrap();
        sm.transition(Disconnected).unwrap();
    }

    #[test]
    fn illegal_transition_is_rejected() {
        let mut sm = StateMachine::new();
        assert!(sm.transition(Connected).is_err());
        assert_eq!(sm.current(), Disconnected);
    }
}
