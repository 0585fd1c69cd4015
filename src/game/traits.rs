use std::net::SocketAddr;

use thiserror::Error;

pub type PlayerId = u32;

/// Live network session of a player, as handed over by the transport.
pub type SessionHandle = SocketAddr;

/// Maps a stable player identifier to its live session.
///
/// Owned by the transport layer; matches only consult it.
pub trait IdentityDirectory {
    fn resolve(&self, player_id: PlayerId) -> Option<SessionHandle>;
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GameError {
    /// Join refused (match closed or full)
    #[error("Join rejected: {0}")]
    JoinRejected(String),
    /// Game is not in a valid state for the operation
    #[error("Invalid state: {0}")]
    InvalidState(String),
    /// An invariant was broken upstream; the match cannot continue
    #[error("Contract violation: {0}")]
    Contract(String),
}

/// Lifecycle of a match. `Terminated` is final.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchPhase {
    Initializing,
    Waiting,
    Playing,
    Terminated,
}

/// Discovery flags advertised by a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchLabel {
    pub open: bool,
    pub snake: bool,
}

/// One queued client input, delivered to the match once per tick.
#[derive(Debug, Clone, PartialEq)]
pub struct InputMessage {
    pub sender: PlayerId,
    pub op_code: i64,
    pub data: Vec<u8>,
}

/// Encoded server message plus the sessions it must reach.
#[derive(Debug, Clone, PartialEq)]
pub struct Dispatch {
    pub recipients: Vec<SessionHandle>,
    pub payload: Vec<u8>,
}

#[derive(Debug, Default)]
pub struct TickResult {
    /// Outbound messages in emission order
    pub dispatches: Vec<Dispatch>,
    /// Set when this call moved the match to `Terminated`
    pub terminated: bool,
}

impl TickResult {
    pub fn push(&mut self, dispatch: Option<Dispatch>) {
        if let Some(dispatch) = dispatch {
            self.dispatches.push(dispatch);
        }
    }
}

/// Authoritative match driven by a host that serializes every call.
pub trait Game: Send {
    fn tick(&mut self, inputs: Vec<InputMessage>) -> TickResult;
    fn join_attempt(&mut self, player_id: PlayerId) -> Result<(), GameError>;
    fn player_joined(
        &mut self,
        player_id: PlayerId,
        name: String,
        handle: SessionHandle,
    ) -> Result<(), GameError>;
    fn player_left(&mut self, player_id: PlayerId) -> TickResult;
    fn signal(&mut self, data: &str) -> TickResult;
    fn phase(&self) -> MatchPhase;
    fn label(&self) -> MatchLabel;
    fn is_terminated(&self) -> bool {
        self.phase() == MatchPhase::Terminated
    }
}
