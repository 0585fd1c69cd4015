use prost::Message;

use super::roster::Roster;
use super::state::{Point, SnakeGrid};
use crate::game::traits::{Dispatch, PlayerId};
use crate::protocol::common;
use crate::protocol::server::{MatchData, ServerMessage, server_message};
use crate::protocol::snake::{Feedback, OpCode, SnakeState, SnakeView};

/// Who an outbound event is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Sender(PlayerId),
    All,
}

/// Turns snapshots and feedback into dispatches for one match.
#[derive(Debug, Clone)]
pub struct Broadcaster {
    match_id: String,
}

impl Broadcaster {
    pub fn new(match_id: impl Into<String>) -> Self {
        Self {
            match_id: match_id.into(),
        }
    }

    pub fn match_id(&self) -> &str {
        &self.match_id
    }

    pub fn update(&self, grid: &SnakeGrid, tick: u64, roster: &Roster, target: Target) -> Option<Dispatch> {
        let state = snapshot(grid, tick);
        self.dispatch(OpCode::Update, &state, roster, target)
    }

    pub fn feedback(&self, message: &str, roster: &Roster, target: Target) -> Option<Dispatch> {
        let body = Feedback {
            message: message.to_string(),
        };
        self.dispatch(OpCode::Feedback, &body, roster, target)
    }

    fn dispatch<M: Message>(
        &self,
        op_code: OpCode,
        body: &M,
        roster: &Roster,
        target: Target,
    ) -> Option<Dispatch> {
        let recipients = match target {
            Target::Sender(player_id) => roster.recipient(player_id),
            Target::All => roster.recipients_all(),
        };
        if recipients.is_empty() {
            return None;
        }

        let wrapped = ServerMessage {
            payload: Some(server_message::Payload::MatchData(MatchData {
                match_id: self.match_id.clone(),
                op_code: op_code.code(),
                data: encode_message(body)?,
            })),
        };

        Some(Dispatch {
            recipients,
            payload: encode_message(&wrapped)?,
        })
    }
}

/// Encodes into an exactly sized buffer. Failures drop the message.
pub fn encode_message<M: Message>(message: &M) -> Option<Vec<u8>> {
    let mut buf = Vec::with_capacity(message.encoded_len());
    match message.encode(&mut buf) {
        Ok(()) => Some(buf),
        Err(e) => {
            tracing::warn!("Dropping outbound message, encode failed: {}", e);
            None
        }
    }
}

fn to_proto(pos: Point) -> common::Point {
    common::Point { x: pos.x, y: pos.y }
}

/// Pass-by-value copy of the board; consumers never see live state.
pub fn snapshot(grid: &SnakeGrid, tick: u64) -> SnakeState {
    let snakes = grid
        .entities
        .iter()
        .map(|entity| SnakeView {
            player_id: entity.controller.player_id().unwrap_or_default(),
            bot: entity.controller.is_bot(),
            body: entity.snake.body.iter().copied().map(to_proto).collect(),
            direction: Some(to_proto(entity.snake.direction.as_point())),
        })
        .collect();

    SnakeState {
        width: grid.width(),
        height: grid.height(),
        tick,
        snakes,
        has_food: grid.has_food,
        food: grid.food.map(to_proto),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::games::snake::roster::Presence;
    use crate::games::snake::state::{Controller, Direction};
    use crate::games::snake::systems::tests::{place_snake, set_food};
    use std::net::{IpAddr, Ipv4Addr, SocketAddr};

    fn roster_with(ids: &[PlayerId]) -> Roster {
        let mut roster = Roster::new();
        for &id in ids {
            roster.confirm_join(Presence {
                player_id: id,
                name: format!("p{}", id),
                handle: SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 5000 + id as u16),
            });
        }
        roster
    }

    fn unwrap_match_data(payload: &[u8]) -> MatchData {
        match ServerMessage::decode(payload).unwrap().payload {
            Some(server_message::Payload::MatchData(data)) => data,
            other => panic!("Expected MatchData, got {:?}", other),
        }
    }

    #[test]
    fn test_snapshot_contents() {
        let mut grid = SnakeGrid::with_seed(10, 8, 1);
        place_snake(&mut grid, Controller::Bot, &[(1, 1), (0, 1)], Direction::Right);
        place_snake(&mut grid, Controller::Human(3), &[(5, 5), (4, 5), (4, 4)], Direction::Down);
        set_food(&mut grid, 7, 7);

        let state = snapshot(&grid, 12);
        assert_eq!((state.width, state.height, state.tick), (10, 8, 12));
        assert!(state.has_food);
        assert_eq!(state.food, Some(common::Point { x: 7, y: 7 }));
        assert_eq!(state.snakes.len(), 2);

        assert!(state.snakes[0].bot);
        assert_eq!(state.snakes[0].player_id, 0);
        assert!(!state.snakes[1].bot);
        assert_eq!(state.snakes[1].player_id, 3);
        assert_eq!(state.snakes[1].body.len(), 3);
        assert_eq!(state.snakes[1].body[0], common::Point { x: 5, y: 5 });
        assert_eq!(state.snakes[1].direction, Some(common::Point { x: 1, y: 0 }));
    }

    #[test]
    fn test_update_to_all() {
        let grid = SnakeGrid::with_seed(4, 4, 1);
        let roster = roster_with(&[1, 2]);
        let broadcaster = Broadcaster::new("m-1");

        let dispatch = broadcaster.update(&grid, 3, &roster, Target::All).unwrap();
        assert_eq!(dispatch.recipients.len(), 2);

        let data = unwrap_match_data(&dispatch.payload);
        assert_eq!(data.match_id, "m-1");
        assert_eq!(data.op_code, 100);
        let state = SnakeState::decode(&data.data[..]).unwrap();
        assert_eq!(state.tick, 3);
    }

    #[test]
    fn test_feedback_to_sender_only() {
        let roster = roster_with(&[1, 2]);
        let broadcaster = Broadcaster::new("m-1");

        let dispatch = broadcaster
            .feedback("invalid direction received", &roster, Target::Sender(2))
            .unwrap();
        assert_eq!(dispatch.recipients, roster.recipient(2));

        let data = unwrap_match_data(&dispatch.payload);
        assert_eq!(data.op_code, 101);
        let feedback = Feedback::decode(&data.data[..]).unwrap();
        assert_eq!(feedback.message, "invalid direction received");
    }

    #[test]
    fn test_no_recipients_no_dispatch() {
        let grid = SnakeGrid::with_seed(4, 4, 1);
        let broadcaster = Broadcaster::new("m-1");

        assert!(broadcaster.update(&grid, 0, &Roster::new(), Target::All).is_none());
        assert!(broadcaster
            .feedback("hello", &roster_with(&[1]), Target::Sender(9))
            .is_none());
    }
}
