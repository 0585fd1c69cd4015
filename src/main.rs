use std::net::SocketAddr;
use std::sync::Arc;

use prost::Message;
use snake_server::config::{Config, DEFAULT_CONFIG_PATH};
use snake_server::game::traits::InputMessage;
use snake_server::network::udp::UdpServer;
use snake_server::protocol::client::{ClientMessage, JoinMatch, MatchData, Ping, client_message::Payload};
use snake_server::protocol::server::{Error, MatchJoined, Pong, ServerMessage, server_message};
use snake_server::room::{DirectoryError, MatchDirectory};
use snake_server::session::SessionManager;
use tokio::sync::Mutex;
use tokio::time::{Duration, MissedTickBehavior};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("snake_server=debug".parse()?),
        )
        .init();

    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
    let config = Config::load(&config_path)?;

    let server = Arc::new(UdpServer::bind(&config.server.bind).await?);
    tracing::info!(
        "Snake server started: {}x{} board, {} ticks/s",
        config.snake.width,
        config.snake.height,
        config.snake.tick_rate_hz
    );

    let sessions = Arc::new(Mutex::new(SessionManager::new(config.server.session_timeout_secs)));
    let matches = Arc::new(Mutex::new(MatchDirectory::new(config.snake.clone())));

    // Fixed-rate simulation of every match
    let matches_tick = matches.clone();
    let server_tick = server.clone();
    let tick_duration = config.snake.tick_duration();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(tick_duration);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            interval.tick().await;
            let dispatches = matches_tick.lock().await.tick_all();
            server_tick.deliver(&dispatches).await;
        }
    });

    // Cleanup task for timed-out sessions
    let sessions_cleanup = sessions.clone();
    let matches_cleanup = matches.clone();
    let server_cleanup = server.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(5));
        loop {
            interval.tick().await;
            let mut sessions = sessions_cleanup.lock().await;
            let mut matches = matches_cleanup.lock().await;

            for session in sessions.cleanup_timed_out() {
                if let Ok(dispatches) = matches.leave(session.player_id) {
                    server_cleanup.deliver(&dispatches).await;
                }
            }
        }
    });

    // Main receive loop
    loop {
        let (data, addr) = match server.recv().await {
            Ok(result) => result,
            Err(e) => {
                tracing::debug!("recv error - sent to closed port. Ignoring. Error: {}", e);
                continue;
            }
        };

        let msg = match ClientMessage::decode(&data[..]) {
            Ok(msg) => msg,
            Err(e) => {
                tracing::warn!("Failed to decode from {}: {}", addr, e);
                continue;
            }
        };

        let mut sessions = sessions.lock().await;
        let mut matches = matches.lock().await;

        match msg.payload {
            Some(Payload::JoinMatch(join)) => {
                handle_join_match(&server, &mut sessions, &mut matches, addr, join).await;
            }

            Some(Payload::LeaveMatch(_)) => {
                handle_leave_match(&server, &mut sessions, &mut matches, addr).await;
            }

            Some(Payload::MatchData(data)) => {
                handle_match_data(&server, &mut sessions, &mut matches, addr, data).await;
            }

            Some(Payload::Ping(ping)) => {
                handle_ping(&server, &mut sessions, addr, ping).await;
            }

            Some(Payload::KillMatches(_)) => {
                sessions.update_last_seen(&addr);
                let killed = matches.kill_all();
                tracing::info!("Kill requested by {}: {} matches terminated", addr, killed);
            }

            None => {
                tracing::warn!("Empty message from {}", addr);
            }
        }
    }
}

async fn handle_ping(server: &UdpServer, sessions: &mut SessionManager, addr: SocketAddr, ping: Ping) {
    sessions.ping(&addr);

    if let Some(session) = sessions.get_by_addr(&addr) {
        tracing::trace!(
            "Ping from player {} (seq={}, count={})",
            session.player_id,
            ping.sequence,
            session.ping_count
        );
    } else {
        tracing::warn!("Ping from unknown address {}", addr);
    }

    let pong_message = ServerMessage {
        payload: Some(server_message::Payload::Pong(Pong {
            timestamp: ping.timestamp,
            sequence: ping.sequence,
            server_time: current_timestamp_ms(),
        })),
    };

    if let Err(e) = server.send(&pong_message.encode_to_vec(), addr).await {
        tracing::warn!("Failed to send pong: {}", e);
    }
}

async fn handle_join_match(
    server: &UdpServer,
    sessions: &mut SessionManager,
    matches: &mut MatchDirectory,
    addr: SocketAddr,
    join: JoinMatch,
) {
    let player_id = sessions.register(addr, join.player_name.clone()).player_id;

    match matches.join_or_create(player_id, join.player_name.clone(), addr) {
        Ok(match_id) => {
            let response = ServerMessage {
                payload: Some(server_message::Payload::MatchJoined(MatchJoined {
                    player_id,
                    match_id: match_id.clone(),
                })),
            };
            let _ = server.send(&response.encode_to_vec(), addr).await;

            tracing::info!(
                "Player {} ({}) joined match '{}'",
                player_id,
                join.player_name,
                match_id
            );
        }
        Err(e) => {
            tracing::debug!("Player {} could not join: {}", player_id, e);
            send_error(server, addr, format!("Failed to join match: {}", e)).await;
        }
    }
}

async fn handle_leave_match(
    server: &UdpServer,
    sessions: &mut SessionManager,
    matches: &mut MatchDirectory,
    addr: SocketAddr,
) {
    sessions.update_last_seen(&addr);

    let Some(session) = sessions.get_by_addr(&addr) else {
        tracing::warn!("LeaveMatch from unknown address: {}", addr);
        return;
    };

    match matches.leave(session.player_id) {
        Ok(dispatches) => server.deliver(&dispatches).await,
        Err(DirectoryError::NotInMatch(player_id)) => {
            tracing::debug!("Player {} left while not in a match", player_id);
        }
        Err(e) => tracing::warn!("Leave failed for {}: {}", addr, e),
    }
}

async fn handle_match_data(
    server: &UdpServer,
    sessions: &mut SessionManager,
    matches: &mut MatchDirectory,
    addr: SocketAddr,
    data: MatchData,
) {
    sessions.update_last_seen(&addr);

    let Some(session) = sessions.get_by_addr(&addr) else {
        tracing::warn!("MatchData from unknown address: {}", addr);
        return;
    };

    let input = InputMessage {
        sender: session.player_id,
        op_code: data.op_code,
        data: data.data,
    };

    if let Err(e) = matches.queue_input(input) {
        tracing::warn!("Dropping input from {}: {}", addr, e);
        send_error(server, addr, e.to_string()).await;
    }
}

async fn send_error(server: &UdpServer, addr: SocketAddr, message: String) {
    let response = ServerMessage {
        payload: Some(server_message::Payload::Error(Error { message })),
    };
    if let Err(e) = server.send(&response.encode_to_vec(), addr).await {
        tracing::warn!("Failed to send error to {}: {}", addr, e);
    }
}

fn current_timestamp_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
