use prost::Message;
use snake_server::protocol::client::{
    ClientMessage, JoinMatch, LeaveMatch, MatchData, Ping, client_message::Payload,
};
use snake_server::protocol::server::{ServerMessage, server_message};
use snake_server::protocol::snake::{Feedback, MoveInput, OpCode, SnakeState};
use std::net::UdpSocket;
use std::thread;
use std::time::{Duration, Instant};

fn main() -> std::io::Result<()> {
    let server_addr = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "127.0.0.1:9000".to_string());
    let socket = UdpSocket::bind("127.0.0.1:0")?;
    socket.set_read_timeout(Some(Duration::from_millis(200)))?;

    // 1. Join a match
    send(&socket, &server_addr, Payload::JoinMatch(JoinMatch {
        player_name: "Player1".to_string(),
    }))?;
    println!("Sent: JoinMatch");
    receive_response(&socket);

    // 2. Steer around a square while printing what the match sends back
    let turns = [(1, 0), (0, -1), (-1, 0), (0, 1)];
    let started = Instant::now();
    let mut sequence = 0;
    while started.elapsed() < Duration::from_secs(5) {
        let (x, y) = turns[sequence as usize % turns.len()];
        send(&socket, &server_addr, Payload::MatchData(MatchData {
            op_code: OpCode::Move.code(),
            data: MoveInput { x, y }.encode_to_vec(),
        }))?;
        println!("Sent: Move ({}, {})", x, y);

        send(&socket, &server_addr, Payload::Ping(Ping {
            timestamp: started.elapsed().as_millis() as u64,
            sequence,
        }))?;
        sequence += 1;

        for _ in 0..4 {
            receive_response(&socket);
        }
        thread::sleep(Duration::from_millis(300));
    }

    // 3. Leave
    send(&socket, &server_addr, Payload::LeaveMatch(LeaveMatch {}))?;
    println!("Sent: LeaveMatch");

    println!("Done!");
    Ok(())
}

fn send(socket: &UdpSocket, server_addr: &str, payload: Payload) -> std::io::Result<()> {
    let msg = ClientMessage {
        payload: Some(payload),
    };
    socket.send_to(&msg.encode_to_vec(), server_addr)?;
    Ok(())
}

fn receive_response(socket: &UdpSocket) {
    let mut buf = [0u8; 2048];
    let (len, _) = match socket.recv_from(&mut buf) {
        Ok(received) => received,
        Err(_) => return,
    };

    let Ok(response) = ServerMessage::decode(&buf[..len]) else {
        println!("Received {} bytes (failed to decode)", len);
        return;
    };

    match response.payload {
        Some(server_message::Payload::MatchData(data)) if data.op_code == OpCode::Update.code() => {
            match SnakeState::decode(&data.data[..]) {
                Ok(state) => println!(
                    "Update: tick {} with {} snakes, food {:?}",
                    state.tick,
                    state.snakes.len(),
                    state.food.map(|p| (p.x, p.y))
                ),
                Err(e) => println!("Bad update: {}", e),
            }
        }
        Some(server_message::Payload::MatchData(data)) if data.op_code == OpCode::Feedback.code() => {
            match Feedback::decode(&data.data[..]) {
                Ok(feedback) => println!("Feedback: {}", feedback.message),
                Err(e) => println!("Bad feedback: {}", e),
            }
        }
        other => println!("Received: {:?}", other),
    }
}
