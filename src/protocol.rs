//! Wire types generated from `proto/` by prost-build.

pub mod common {
    include!(concat!(env!("OUT_DIR"), "/game.common.rs"));
}

pub mod client {
    include!(concat!(env!("OUT_DIR"), "/game.client.rs"));
}

pub mod server {
    include!(concat!(env!("OUT_DIR"), "/game.server.rs"));
}

pub mod snake {
    include!(concat!(env!("OUT_DIR"), "/game.snake.rs"));

    impl OpCode {
        /// Op codes travel as `int64` inside `MatchData`.
        pub fn code(self) -> i64 {
            self as i64
        }
    }
}
