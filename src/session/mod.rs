use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

use crate::game::traits::{IdentityDirectory, PlayerId, SessionHandle};

#[derive(Debug, Clone)]
pub struct Session {
    pub player_id: PlayerId,
    pub player_name: String,
    pub addr: SocketAddr,
    pub last_seen: Instant,
    pub last_ping: Option<Instant>,
    pub ping_count: u32,
}

/// Manages all connected player sessions
pub struct SessionManager {
    /// Map from socket address to session
    sessions_by_addr: HashMap<SocketAddr, Session>,
    /// Map from player ID to socket address (for reverse lookup)
    addr_by_player_id: HashMap<PlayerId, SocketAddr>,
    /// Next player ID to assign
    next_player_id: PlayerId,
    /// How long before a session is considered timed out
    timeout_duration: Duration,
}

impl SessionManager {
    pub fn new(timeout_seconds: u64) -> Self {
        Self::with_timeout(Duration::from_secs(timeout_seconds))
    }

    pub fn with_timeout(timeout_duration: Duration) -> Self {
        Self {
            sessions_by_addr: HashMap::new(),
            addr_by_player_id: HashMap::new(),
            next_player_id: 1,
            timeout_duration,
        }
    }

    /// Returns the session for `addr`, creating one with a fresh id when the
    /// address is new.
    pub fn register(&mut self, addr: SocketAddr, player_name: String) -> &Session {
        let next_player_id = &mut self.next_player_id;
        let addr_by_player_id = &mut self.addr_by_player_id;

        self.sessions_by_addr
            .entry(addr)
            .and_modify(|session| {
                session.last_seen = Instant::now();
                session.player_name = player_name.clone();
            })
            .or_insert_with(|| {
                let player_id = *next_player_id;
                *next_player_id += 1;
                addr_by_player_id.insert(player_id, addr);
                tracing::info!("New player registered: id={}, addr={}", player_id, addr);

                Session {
                    player_id,
                    player_name,
                    addr,
                    last_seen: Instant::now(),
                    last_ping: None,
                    ping_count: 0,
                }
            })
    }

    pub fn ping(&mut self, addr: &SocketAddr) {
        if let Some(session) = self.sessions_by_addr.get_mut(addr) {
            session.last_ping = Some(Instant::now());
            session.last_seen = Instant::now();
            session.ping_count += 1;
        }
    }

    pub fn update_last_seen(&mut self, addr: &SocketAddr) {
        if let Some(session) = self.sessions_by_addr.get_mut(addr) {
            session.last_seen = Instant::now();
        }
    }

    pub fn get_by_addr(&self, addr: &SocketAddr) -> Option<&Session> {
        self.sessions_by_addr.get(addr)
    }

    pub fn get_by_player_id(&self, player_id: PlayerId) -> Option<&Session> {
        self.addr_by_player_id
            .get(&player_id)
            .and_then(|addr| self.sessions_by_addr.get(addr))
    }

    pub fn len(&self) -> usize {
        self.sessions_by_addr.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions_by_addr.is_empty()
    }

    pub fn remove(&mut self, addr: &SocketAddr) -> Option<Session> {
        let session = self.sessions_by_addr.remove(addr)?;
        self.addr_by_player_id.remove(&session.player_id);
        tracing::info!("Player disconnected: id={}, addr={}", session.player_id, addr);
        Some(session)
    }

    pub fn cleanup_timed_out(&mut self) -> Vec<Session> {
        let now = Instant::now();
        let timeout = self.timeout_duration;

        let timed_out_addrs: Vec<SocketAddr> = self
            .sessions_by_addr
            .iter()
            .filter(|(_, session)| now.duration_since(session.last_seen) > timeout)
            .map(|(addr, _)| *addr)
            .collect();

        let mut removed = Vec::new();
        for addr in timed_out_addrs {
            if let Some(session) = self.remove(&addr) {
                tracing::info!(
                    "Player timed out: id={}, name={}",
                    session.player_id,
                    session.player_name
                );
                removed.push(session);
            }
        }

        removed
    }
}

impl IdentityDirectory for SessionManager {
    fn resolve(&self, player_id: PlayerId) -> Option<SessionHandle> {
        self.addr_by_player_id.get(&player_id).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{IpAddr, Ipv4Addr};

    fn addr(port: u16) -> SocketAddr {
        SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), port)
    }

    #[test]
    fn test_register_assigns_ids_per_address() {
        let mut sessions = SessionManager::new(30);
        assert_eq!(sessions.register(addr(1000), "a".into()).player_id, 1);
        assert_eq!(sessions.register(addr(1001), "b".into()).player_id, 2);

        let again = sessions.register(addr(1000), "renamed".into());
        assert_eq!(again.player_id, 1);
        assert_eq!(again.player_name, "renamed");
        assert_eq!(sessions.len(), 2);
    }

    #[test]
    fn test_resolve() {
        let mut sessions = SessionManager::new(30);
        let id = sessions.register(addr(1000), "a".into()).player_id;

        assert_eq!(sessions.resolve(id), Some(addr(1000)));
        assert_eq!(sessions.get_by_player_id(id).map(|s| s.addr), Some(addr(1000)));
        assert_eq!(sessions.resolve(99), None);
    }

    #[test]
    fn test_remove() {
        let mut sessions = SessionManager::new(30);
        let id = sessions.register(addr(1000), "a".into()).player_id;

        assert_eq!(sessions.remove(&addr(1000)).map(|s| s.player_id), Some(id));
        assert_eq!(sessions.resolve(id), None);
        assert!(sessions.remove(&addr(1000)).is_none());
        assert!(sessions.is_empty());
    }

    #[test]
    fn test_ping_counts() {
        let mut sessions = SessionManager::new(30);
        sessions.register(addr(1000), "a".into());
        sessions.ping(&addr(1000));
        sessions.ping(&addr(1000));

        let session = sessions.get_by_addr(&addr(1000)).unwrap();
        assert_eq!(session.ping_count, 2);
        assert!(session.last_ping.is_some());
    }

    #[test]
    fn test_cleanup_timed_out() {
        let mut sessions = SessionManager::with_timeout(Duration::from_millis(20));
        sessions.register(addr(1000), "stale".into());
        std::thread::sleep(Duration::from_millis(40));
        sessions.register(addr(1001), "fresh".into());

        let removed = sessions.cleanup_timed_out();
        assert_eq!(removed.len(), 1);
        assert_eq!(removed[0].player_name, "stale");
        assert!(sessions.get_by_addr(&addr(1001)).is_some());
    }
}
