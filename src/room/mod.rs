use std::collections::{BTreeMap, HashMap};

use rand::Rng;
use thiserror::Error;

use crate::game::traits::{
    Dispatch, Game, GameError, InputMessage, MatchLabel, PlayerId, SessionHandle, TickResult,
};
use crate::games::snake::{KILL_SIGNAL, SnakeConfig, SnakeMatch};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DirectoryError {
    #[error("Match {0} not found")]
    MatchNotFound(String),
    #[error("Player {0} is not in a match")]
    NotInMatch(PlayerId),
    #[error("Player {0} is already in match {1}")]
    AlreadyInMatch(PlayerId, String),
    #[error(transparent)]
    Game(#[from] GameError),
}

/// A live match plus the input queued for its next tick.
struct MatchEntry {
    game: SnakeMatch,
    /// Receipt order
    inbox: Vec<InputMessage>,
}

/// Manages all matches
pub struct MatchDirectory {
    matches: BTreeMap<String, MatchEntry>,
    player_match: HashMap<PlayerId, String>,
    config: SnakeConfig,
}

impl MatchDirectory {
    pub fn new(config: SnakeConfig) -> Self {
        Self {
            matches: BTreeMap::new(),
            player_match: HashMap::new(),
            config,
        }
    }

    pub fn create_match(&mut self) -> Result<String, DirectoryError> {
        let id = self.generate_match_id();
        let game = SnakeMatch::new(id.clone(), self.config.clone())?;
        self.matches.insert(
            id.clone(),
            MatchEntry {
                game,
                inbox: Vec::new(),
            },
        );
        Ok(id)
    }

    /// Ids of matches whose label passes `filter`, in id order.
    pub fn list(&self, filter: impl Fn(&MatchLabel) -> bool) -> Vec<String> {
        self.matches
            .iter()
            .filter(|(_, entry)| filter(&entry.game.label()))
            .map(|(id, _)| id.clone())
            .collect()
    }

    pub fn get(&self, match_id: &str) -> Option<&SnakeMatch> {
        self.matches.get(match_id).map(|entry| &entry.game)
    }

    pub fn len(&self) -> usize {
        self.matches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }

    pub fn match_of(&self, player_id: PlayerId) -> Option<&str> {
        self.player_match.get(&player_id).map(String::as_str)
    }

    /// Seats the player in the first open match, creating one when none is
    /// open. Returns the match id.
    pub fn join_or_create(
        &mut self,
        player_id: PlayerId,
        name: String,
        handle: SessionHandle,
    ) -> Result<String, DirectoryError> {
        if let Some(current) = self.player_match.get(&player_id) {
            return Err(DirectoryError::AlreadyInMatch(player_id, current.clone()));
        }

        let open = self.list(|label| label.open && label.snake).into_iter().next();
        let (match_id, created) = match open {
            Some(id) => (id, false),
            None => (self.create_match()?, true),
        };

        if let Err(e) = self.join(&match_id, player_id, name, handle) {
            if created && self.matches.remove(&match_id).is_some() {
                tracing::debug!("Match {} removed (first join failed)", match_id);
            }
            return Err(e);
        }
        Ok(match_id)
    }

    pub fn join(
        &mut self,
        match_id: &str,
        player_id: PlayerId,
        name: String,
        handle: SessionHandle,
    ) -> Result<(), DirectoryError> {
        if let Some(current) = self.player_match.get(&player_id) {
            return Err(DirectoryError::AlreadyInMatch(player_id, current.clone()));
        }

        let entry = self
            .matches
            .get_mut(match_id)
            .ok_or_else(|| DirectoryError::MatchNotFound(match_id.to_string()))?;

        entry.game.join_attempt(player_id)?;
        let joined = entry.game.player_joined(player_id, name, handle);
        if let Err(e) = joined {
            self.reap();
            return Err(e.into());
        }

        self.player_match.insert(player_id, match_id.to_string());
        Ok(())
    }

    /// Removes the player from their match and drops their queued input.
    pub fn leave(&mut self, player_id: PlayerId) -> Result<Vec<Dispatch>, DirectoryError> {
        let match_id = self
            .player_match
            .remove(&player_id)
            .ok_or(DirectoryError::NotInMatch(player_id))?;
        let entry = self
            .matches
            .get_mut(&match_id)
            .ok_or_else(|| DirectoryError::MatchNotFound(match_id.clone()))?;

        let queued = entry.inbox.len();
        entry.inbox.retain(|input| input.sender != player_id);
        if entry.inbox.len() != queued {
            tracing::debug!(
                "Dropped {} queued inputs of player {}",
                queued - entry.inbox.len(),
                player_id
            );
        }

        let result = entry.game.player_left(player_id);
        Ok(self.finish(result))
    }

    /// Queues input for the sender's match; it is applied on the next tick.
    pub fn queue_input(&mut self, input: InputMessage) -> Result<(), DirectoryError> {
        let match_id = self
            .player_match
            .get(&input.sender)
            .ok_or(DirectoryError::NotInMatch(input.sender))?;
        let entry = self
            .matches
            .get_mut(match_id)
            .ok_or_else(|| DirectoryError::MatchNotFound(match_id.clone()))?;

        entry.inbox.push(input);
        Ok(())
    }

    /// Ticks every match with its drained inbox.
    pub fn tick_all(&mut self) -> Vec<Dispatch> {
        let mut dispatches = Vec::new();
        let mut any_terminated = false;

        for entry in self.matches.values_mut() {
            let inputs = std::mem::take(&mut entry.inbox);
            let result = entry.game.tick(inputs);
            any_terminated |= result.terminated;
            dispatches.extend(result.dispatches);
        }

        if any_terminated {
            self.reap();
        }

        dispatches
    }

    pub fn signal(&mut self, match_id: &str, data: &str) -> Result<Vec<Dispatch>, DirectoryError> {
        let entry = self
            .matches
            .get_mut(match_id)
            .ok_or_else(|| DirectoryError::MatchNotFound(match_id.to_string()))?;

        let result = entry.game.signal(data);
        Ok(self.finish(result))
    }

    /// Sends the kill signal to every snake match. Returns how many were
    /// signalled.
    pub fn kill_all(&mut self) -> usize {
        let ids = self.list(|label| label.snake);
        for id in &ids {
            if let Some(entry) = self.matches.get_mut(id) {
                entry.game.signal(KILL_SIGNAL);
            }
        }
        self.reap();

        tracing::info!("Killed {} matches", ids.len());
        ids.len()
    }

    fn finish(&mut self, result: TickResult) -> Vec<Dispatch> {
        if result.terminated {
            self.reap();
        }
        result.dispatches
    }

    /// Drops terminated matches and every player index entry into them.
    fn reap(&mut self) {
        let ended: Vec<String> = self
            .matches
            .iter()
            .filter(|(_, entry)| entry.game.is_terminated())
            .map(|(id, _)| id.clone())
            .collect();

        for id in ended {
            self.matches.remove(&id);
            self.player_match.retain(|_, match_id| *match_id != id);
            tracing::info!("Match {} removed (terminated)", id);
        }
    }

    /// Random 4-character match code
    fn generate_match_id(&self) -> String {
        const CHARS: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
        let mut rng = rand::rng();

        loop {
            let code: String = (0..4)
                .map(|_| CHARS[rng.random_range(0..CHARS.len())] as char)
                .collect();
            if !self.matches.contains_key(&code) {
                return code;
            }
        }
    }

    #[cfg(test)]
    fn game_mut(&mut self, match_id: &str) -> Option<&mut SnakeMatch> {
        self.matches.get_mut(match_id).map(|entry| &mut entry.game)
    }
}
