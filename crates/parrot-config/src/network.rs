use std::env;
use std::time::Duration;

use serde::{Deserialize, Serialize};

fn default_bind_addr() -> String {
    "127.0.0.1:7878".to_string()
}

fn default_handshake_timeout_ms() -> u64 {
    5000
}

#[derive(Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct NetworkConfig {
    /// Address the page socket listens on
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
    /// A connection that has not finished the WebSocket upgrade by then is dropped
    #[serde(default = "default_handshake_timeout_ms")]
    pub handshake_timeout_ms: u64,
}

impl NetworkConfig {
    pub fn new() -> Self {
        let bind_addr = env::var("PARROT_WS_ADDR").unwrap_or_else(|_| default_bind_addr());

        Self {
            bind_addr,
            ..Self::default()
        }
    }

    pub fn handshake_timeout(&self) -> Duration {
        Duration::from_millis(self.handshake_timeout_ms)
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            handshake_timeout_ms: default_handshake_timeout_ms(),
        }
    }
}
