use std::{env, time::Duration};

// Runtime/server constants (not gameplay tuning).

pub fn http_port() -> u16 {
    env::var("PONG_SERVER_PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(3001)
}

pub const INPUT_CHANNEL_CAPACITY: usize = 256;
pub const UPDATE_BROADCAST_CAPACITY: usize = 128;

pub const TICK_INTERVAL: Duration = Duration::from_millis(1000 / 60);
// Delay between both players connecting and the rally going live.
pub const START_GRACE_DELAY: Duration = Duration::from_millis(2000);
