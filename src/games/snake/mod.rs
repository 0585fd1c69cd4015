pub mod bot;
pub mod broadcast;
pub mod config;
pub mod roster;
pub mod state;
pub mod systems;

use prost::Message;
use crate::game::traits::{
    Game, GameError, InputMessage, MatchLabel, MatchPhase, PlayerId, SessionHandle, TickResult,
};
use crate::protocol::snake::{MoveInput, OpCode};

pub use broadcast::{Broadcaster, Target};
pub use config::SnakeConfig;
pub use roster::{Presence, Roster};
pub use state::{Cell, Controller, Direction, Point, Snake, SnakeGrid};
pub use systems::GridError;

pub const KILL_SIGNAL: &str = "kill";

pub struct SnakeMatch {
    /// Lifecycle phase
    phase: MatchPhase,
    /// Simulated board, owned for the match's whole life
    grid: SnakeGrid,
    /// Humans and their sessions
    roster: Roster,
    broadcaster: Broadcaster,
    config: SnakeConfig,
    /// Simulated ticks so far
    tick: u64,
}

impl SnakeMatch {
    /// Creates the board with the configured bots. The match waits for its
    /// first human before simulating.
    pub fn new(match_id: impl Into<String>, config: SnakeConfig) -> Result<Self, GameError> {
        let match_id = match_id.into();
        let mut phase = MatchPhase::Initializing;
        tracing::debug!("Match {} {:?}", match_id, phase);

        let grid = systems::new_game(config.width, config.height, config.initial_bots, config.seed)
            .map_err(|e| GameError::Contract(e.to_string()))?;

        phase = MatchPhase::Waiting;
        tracing::info!(
            "Match {} created: {}x{} board, {} bots",
            match_id,
            config.width,
            config.height,
            grid.len()
        );

        Ok(Self {
            phase,
            grid,
            roster: Roster::new(),
            broadcaster: Broadcaster::new(match_id),
            config,
            tick: 0,
        })
    }

    pub fn id(&self) -> &str {
        self.broadcaster.match_id()
    }

    pub fn current_tick(&self) -> u64 {
        self.tick
    }

    pub fn grid(&self) -> &SnakeGrid {
        &self.grid
    }

    #[cfg(test)]
    pub(crate) fn grid_mut(&mut self) -> &mut SnakeGrid {
        &mut self.grid
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    pub fn config(&self) -> &SnakeConfig {
        &self.config
    }

    fn terminate(&mut self, reason: &str) {
        if self.phase != MatchPhase::Terminated {
            tracing::info!("Match {} terminated: {}", self.id(), reason);
            self.phase = MatchPhase::Terminated;
        }
    }

    /// A broken grid precondition ends the match, never the process.
    fn abort(&mut self, err: GridError, result: &mut TickResult) {
        tracing::error!("Match {} aborted: {}", self.id(), err);
        result.push(self.broadcaster.feedback(
            &format!("match aborted: {}", err),
            &self.roster,
            Target::All,
        ));
        self.terminate("contract violation");
        result.terminated = true;
    }

    /// Moves every entity in slot order on a scratch copy. The copy is
    /// committed only if all moves were legal; otherwise the slot of the
    /// first stuck entity is returned and the board is left untouched.
    fn advance(&mut self) -> Result<Option<usize>, GridError> {
        let mut scratch = self.grid.clone();

        for index in 0..scratch.len() {
            let direction = scratch
                .snake(index)
                .map(|s| s.direction)
                .ok_or(GridError::NoSuchEntity(index))?;

            if !systems::can_change_direction(&scratch, index, direction) {
                return Ok(Some(index));
            }

            let moved = systems::move_snake(&mut scratch, index)?;
            if moved.ate_food {
                tracing::debug!("Match {}: slot {} ate food", self.id(), index);
            }
        }

        self.grid = scratch;
        Ok(None)
    }

    fn apply_input(&mut self, input: InputMessage, result: &mut TickResult) -> Result<(), GridError> {
        let index = systems::index_of_player(&self.grid, input.sender)?;

        let op_code = i32::try_from(input.op_code)
            .ok()
            .and_then(|code| OpCode::try_from(code).ok());

        match op_code {
            Some(OpCode::Move) => {
                let Ok(requested) = MoveInput::decode(&input.data[..]) else {
                    tracing::warn!("Player {} sent an undecodable move", input.sender);
                    result.push(self.broadcaster.feedback(
                        "malformed move received",
                        &self.roster,
                        Target::Sender(input.sender),
                    ));
                    return Ok(());
                };

                match systems::validate_direction(&self.grid, index, requested.x, requested.y) {
                    Some(direction) => {
                        if let Some(snake) = self.grid.snake_mut(index) {
                            snake.direction = direction;
                        }
                        tracing::trace!("Player {} steers {:?}", input.sender, direction);
                    }
                    None => {
                        tracing::warn!(
                            "Player {} sent invalid direction ({}, {})",
                            input.sender,
                            requested.x,
                            requested.y
                        );
                        result.push(self.broadcaster.feedback(
                            "invalid direction received",
                            &self.roster,
                            Target::Sender(input.sender),
                        ));
                    }
                }
            }
            _ => {
                let message = format!("unsupported opcode received: ({})", input.op_code);
                tracing::warn!("Player {}: {}", input.sender, message);
                result.push(self.broadcaster.feedback(
                    &message,
                    &self.roster,
                    Target::Sender(input.sender),
                ));
            }
        }

        Ok(())
    }
}

impl Game for SnakeMatch {
    fn tick(&mut self, inputs: Vec<InputMessage>) -> TickResult {
        let mut result = TickResult::default();
        if self.phase != MatchPhase::Playing {
            return result;
        }

        self.tick += 1;

        match self.advance() {
            Ok(None) => {}
            Ok(Some(stuck)) => {
                let loser = self.grid.controller(stuck).unwrap_or(Controller::Bot);
                let message = format!("Player {} lost!", loser);
                tracing::error!("Match {}: {}", self.id(), message);
                result.push(self.broadcaster.feedback(&message, &self.roster, Target::All));
                self.terminate("an entity got stuck");
                result.terminated = true;
            }
            Err(e) => {
                self.abort(e, &mut result);
                return result;
            }
        }

        result.push(self.broadcaster.update(&self.grid, self.tick, &self.roster, Target::All));
        tracing::trace!("Match {} tick {}\n{}", self.id(), self.tick, self.grid);

        if self.phase != MatchPhase::Playing {
            return result;
        }

        bot::steer_bots(&mut self.grid);

        for input in inputs {
            if let Err(e) = self.apply_input(input, &mut result) {
                self.abort(e, &mut result);
            }
            if self.phase != MatchPhase::Playing {
                break;
            }
        }

        result
    }

    fn join_attempt(&mut self, player_id: PlayerId) -> Result<(), GameError> {
        if self.phase == MatchPhase::Terminated {
            return Err(GameError::JoinRejected("match has ended".to_string()));
        }

        if self.roster.contains(player_id) {
            return Err(GameError::JoinRejected("already in this match".to_string()));
        }

        if self.roster.reserved() >= self.config.max_players {
            return Err(GameError::JoinRejected("match is full".to_string()));
        }

        self.roster.begin_join();
        tracing::debug!(
            "Match {}: join attempt from player {} ({} in progress)",
            self.id(),
            player_id,
            self.roster.joins_in_progress()
        );
        Ok(())
    }

    fn player_joined(
        &mut self,
        player_id: PlayerId,
        name: String,
        handle: SessionHandle,
    ) -> Result<(), GameError> {
        if self.phase == MatchPhase::Terminated {
            return Err(GameError::InvalidState("match has ended".to_string()));
        }

        if self.roster.contains(player_id) {
            return Err(GameError::InvalidState(format!(
                "player {} already joined",
                player_id
            )));
        }

        let slot = match systems::add_snake(&mut self.grid, Controller::Human(player_id)) {
            Ok(slot) => slot,
            Err(e) => {
                tracing::error!("Match {}: cannot seat player {}: {}", self.id(), player_id, e);
                self.terminate("no room for a new snake");
                return Err(GameError::Contract(e.to_string()));
            }
        };

        self.roster.confirm_join(Presence {
            player_id,
            name: name.clone(),
            handle,
        });
        self.phase = MatchPhase::Playing;

        tracing::info!(
            "Player {} ({}) joined match {} in slot {}",
            player_id,
            name,
            self.id(),
            slot
        );
        Ok(())
    }

    fn player_left(&mut self, player_id: PlayerId) -> TickResult {
        let mut result = TickResult::default();

        if self.roster.remove(player_id).is_none() {
            tracing::warn!("Match {}: leave from unknown player {}", self.id(), player_id);
            return result;
        }

        let was_terminated = self.phase == MatchPhase::Terminated;
        result.push(self.broadcaster.feedback(
            &format!("player {} left!", player_id),
            &self.roster,
            Target::All,
        ));

        let removed = systems::index_of_player(&self.grid, player_id)
            .and_then(|index| systems::remove_snake(&mut self.grid, index));
        if let Err(e) = removed {
            self.abort(e, &mut result);
            return result;
        }

        result.push(self.broadcaster.update(&self.grid, self.tick, &self.roster, Target::All));
        tracing::info!("Player {} left match {}", player_id, self.id());

        if self.roster.is_empty() {
            self.terminate("no players left");
        }
        result.terminated = !was_terminated && self.phase == MatchPhase::Terminated;

        result
    }

    fn signal(&mut self, data: &str) -> TickResult {
        let mut result = TickResult::default();

        if data == KILL_SIGNAL {
            result.terminated = self.phase != MatchPhase::Terminated;
            self.terminate("killing match due to rpc signal");
        } else {
            tracing::debug!("Match {}: ignoring signal {:?}", self.id(), data);
        }

        result
    }

    fn phase(&self) -> MatchPhase {
        self.phase
    }

    /// Open while seats remain and the match has not ended.
    fn label(&self) -> MatchLabel {
        MatchLabel {
            open: self.phase != MatchPhase::Terminated
                && self.roster.reserved() < self.config.max_players,
            snake: true,
        }
    }
}
