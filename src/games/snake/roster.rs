use std::collections::BTreeMap;

use crate::game::traits::{IdentityDirectory, PlayerId, SessionHandle};

/// A human taking part in a match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Presence {
    pub player_id: PlayerId,
    pub name: String,
    pub handle: SessionHandle,
}

/// Humans registered with one match, keyed by player id.
///
/// Bots never appear here; they only exist as grid entities.
#[derive(Debug, Default)]
pub struct Roster {
    presences: BTreeMap<PlayerId, Presence>,
    /// Accepted join attempts not yet confirmed
    joins_in_progress: usize,
}

impl Roster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin_join(&mut self) {
        self.joins_in_progress += 1;
    }

    /// Registers the presence and settles one pending join. Returns the
    /// previous presence when the player was already registered.
    pub fn confirm_join(&mut self, presence: Presence) -> Option<Presence> {
        self.joins_in_progress = self.joins_in_progress.saturating_sub(1);
        self.presences.insert(presence.player_id, presence)
    }

    pub fn remove(&mut self, player_id: PlayerId) -> Option<Presence> {
        self.presences.remove(&player_id)
    }

    pub fn get(&self, player_id: PlayerId) -> Option<&Presence> {
        self.presences.get(&player_id)
    }

    pub fn contains(&self, player_id: PlayerId) -> bool {
        self.presences.contains_key(&player_id)
    }

    pub fn human_count(&self) -> usize {
        self.presences.len()
    }

    pub fn joins_in_progress(&self) -> usize {
        self.joins_in_progress
    }

    /// Seats taken or promised.
    pub fn reserved(&self) -> usize {
        self.presences.len() + self.joins_in_progress
    }

    pub fn is_empty(&self) -> bool {
        self.presences.is_empty()
    }

    pub fn player_ids(&self) -> Vec<PlayerId> {
        self.presences.keys().copied().collect()
    }

    pub fn recipients_all(&self) -> Vec<SessionHandle> {
        self.presences.values().map(|p| p.handle).collect()
    }

    /// Sender-only target; empty when the player is not registered.
    pub fn recipient(&self, player_id: PlayerId) -> Vec<SessionHandle> {
        self.resolve(player_id).into_iter().collect()
    }
}

impl IdentityDirectory for Roster {
    fn resolve(&self, player_id: PlayerId) -> Option<SessionHandle> {
        self.presences.get(&player_id).map(|p| p.handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{IpAddr, Ipv4Addr, SocketAddr};

    fn presence(player_id: PlayerId, port: u16) -> Presence {
        Presence {
            player_id,
            name: format!("p{}", player_id),
            handle: SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), port),
        }
    }

    #[test]
    fn test_join_lifecycle() {
        let mut roster = Roster::new();
        roster.begin_join();
        roster.begin_join();
        assert_eq!(roster.joins_in_progress(), 2);
        assert_eq!(roster.reserved(), 2);

        assert!(roster.confirm_join(presence(1, 4001)).is_none());
        assert_eq!(roster.joins_in_progress(), 1);
        assert_eq!(roster.human_count(), 1);
        assert_eq!(roster.reserved(), 2);
    }

    #[test]
    fn test_confirm_without_intent_does_not_underflow() {
        let mut roster = Roster::new();
        roster.confirm_join(presence(1, 4001));
        assert_eq!(roster.joins_in_progress(), 0);
        assert!(roster.contains(1));
    }

    #[test]
    fn test_recipients() {
        let mut roster = Roster::new();
        roster.confirm_join(presence(2, 4002));
        roster.confirm_join(presence(1, 4001));

        assert_eq!(roster.player_ids(), vec![1, 2]);
        assert_eq!(roster.recipients_all().len(), 2);
        assert_eq!(roster.recipient(2), vec![presence(2, 4002).handle]);
        assert!(roster.recipient(3).is_empty());
    }

    #[test]
    fn test_remove() {
        let mut roster = Roster::new();
        roster.confirm_join(presence(1, 4001));

        assert_eq!(roster.remove(1).map(|p| p.player_id), Some(1));
        assert!(roster.remove(1).is_none());
        assert!(roster.is_empty());
        assert_eq!(roster.resolve(1), None);
    }
}
