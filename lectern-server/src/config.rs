//! Server configuration.
//!
//! Loaded from `LECTERN_*` environment variables with defaults suitable for
//! local development.

use std::collections::HashMap;
use std::env;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:3000";

/// Largest accepted inbound frame, in bytes.
pub const DEFAULT_MAX_MESSAGE_BYTES: usize = 64 * 1024;

pub const DEFAULT_IDLE_TIMEOUT_SECS: u64 = 60;

/// Per-member outbound queue depth before the member is evicted.
pub const DEFAULT_OUTBOUND_QUEUE: usize = 64;

pub const DEFAULT_ROOM_QUEUE: usize = 100;

pub const DEFAULT_UNCLAIMED_ROOM_TTL_SECS: u64 = 30;

/// Upper bound for every configured timeout or grace period.
pub const MAX_TIMER_SECS: u64 = 7 * 24 * 60 * 60;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {name}: {value:?}")]
    InvalidValue { name: String, value: String },

    #[error("{0} must be greater than zero")]
    Zero(String),

    #[error("{name} is {value}, above the maximum of {max}")]
    OutOfRange { name: String, value: u64, max: u64 },

    #[error("Invalid token entry {0:?}, expected token=peer:role")]
    InvalidToken(String),
}

/// Settings for one connection adapter.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    pub max_message_bytes: usize,
    /// A connection that receives nothing (not even a pong) for this long is torn down.
    pub idle_timeout: Duration,
}

impl ConnectionConfig {
    /// Keepalive ping period, 9/10 of the idle timeout (capped at `MAX_TIMER_SECS`).
    pub fn ping_period(&self) -> Duration {
        let idle = self.idle_timeout.min(Duration::from_secs(MAX_TIMER_SECS));
        idle - idle / 10
    }
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            max_message_bytes: DEFAULT_MAX_MESSAGE_BYTES,
            idle_timeout: Duration::from_secs(DEFAULT_IDLE_TIMEOUT_SECS),
        }
    }
}

/// Settings for every room coordinator.
#[derive(Debug, Clone)]
pub struct RoomConfig {
    pub outbound_queue: usize,
    pub command_queue: usize,
    /// Whether a broadcast is also delivered back to its sender.
    pub echo_broadcasts: bool,
    /// How long a room that lost its last member waits before tearing down.
    pub empty_room_grace: Duration,
    /// How long a freshly created room waits for its first member.
    pub unclaimed_room_ttl: Duration,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            outbound_queue: DEFAULT_OUTBOUND_QUEUE,
            command_queue: DEFAULT_ROOM_QUEUE,
            echo_broadcasts: false,
            empty_room_grace: Duration::ZERO,
            unclaimed_room_ttl: Duration::from_secs(DEFAULT_UNCLAIMED_ROOM_TTL_SECS),
        }
    }
}

#[derive(Clone)]
pub struct SignalingConfig {
    pub bind_address: String,
    pub connection: ConnectionConfig,
    pub room: RoomConfig,
    /// Raw `token=peer:role` list for the static authenticator.
    pub tokens: String,
}

/// Tokens are redacted.
impl fmt::Debug for SignalingConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignalingConfig")
            .field("bind_address", &self.bind_address)
            .field("connection", &self.connection)
            .field("room", &self.room)
            .field("tokens", &"[REDACTED]")
            .finish()
    }
}

impl Default for SignalingConfig {
    fn default() -> Self {
        Self {
            bind_address: DEFAULT_BIND_ADDRESS.to_string(),
            connection: ConnectionConfig::default(),
            room: RoomConfig::default(),
            tokens: String::new(),
        }
    }
}

impl SignalingConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a HashMap (for testing).
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let bind_address = vars
            .get("LECTERN_BIND_ADDRESS")
            .cloned()
            .unwrap_or(defaults.bind_address);

        let max_message_bytes = parse_var(
            vars,
            "LECTERN_MAX_MESSAGE_BYTES",
            defaults.connection.max_message_bytes,
        )?;
        let idle_timeout_secs = parse_var(
            vars,
            "LECTERN_IDLE_TIMEOUT_SECS",
            defaults.connection.idle_timeout.as_secs(),
        )?;
        let outbound_queue = parse_var(
            vars,
            "LECTERN_OUTBOUND_QUEUE",
            defaults.room.outbound_queue,
        )?;
        let command_queue = parse_var(vars, "LECTERN_ROOM_QUEUE", defaults.room.command_queue)?;
        let echo_broadcasts = parse_var(
            vars,
            "LECTERN_ECHO_BROADCASTS",
            defaults.room.echo_broadcasts,
        )?;
        let empty_room_grace_ms = parse_var(vars, "LECTERN_EMPTY_ROOM_GRACE_MS", 0u64)?;
        let unclaimed_room_ttl_secs = parse_var(
            vars,
            "LECTERN_UNCLAIMED_ROOM_TTL_SECS",
            defaults.room.unclaimed_room_ttl.as_secs(),
        )?;

        for (name, value) in [
            ("LECTERN_MAX_MESSAGE_BYTES", max_message_bytes as u64),
            ("LECTERN_IDLE_TIMEOUT_SECS", idle_timeout_secs),
            ("LECTERN_OUTBOUND_QUEUE", outbound_queue as u64),
            ("LECTERN_ROOM_QUEUE", command_queue as u64),
            ("LECTERN_UNCLAIMED_ROOM_TTL_SECS", unclaimed_room_ttl_secs),
        ] {
            if value == 0 {
                return Err(ConfigError::Zero(name.to_string()));
            }
        }

        for (name, value, max) in [
            ("LECTERN_IDLE_TIMEOUT_SECS", idle_timeout_secs, MAX_TIMER_SECS),
            ("LECTERN_EMPTY_ROOM_GRACE_MS", empty_room_grace_ms, MAX_TIMER_SECS * 1000),
            ("LECTERN_UNCLAIMED_ROOM_TTL_SECS", unclaimed_room_ttl_secs, MAX_TIMER_SECS),
        ] {
            if value > max {
                return Err(ConfigError::OutOfRange {
                    name: name.to_string(),
                    value,
                    max,
                });
            }
        }

        Ok(Self {
            bind_address,
            connection: ConnectionConfig {
                max_message_bytes,
                idle_timeout: Duration::from_secs(idle_timeout_secs),
            },
            room: RoomConfig {
                outbound_queue,
                command_queue,
                echo_broadcasts,
                empty_room_grace: Duration::from_millis(empty_room_grace_ms),
                unclaimed_room_ttl: Duration::from_secs(unclaimed_room_ttl_secs),
            },
            tokens: vars.get("LECTERN_TOKENS").cloned().unwrap_or_default(),
        })
    }
}

fn parse_var<T: std::str::FromStr>(
    vars: &HashMap<String, String>,
    name: &str,
    default: T,
) -> Result<T, ConfigError> {
    match vars.get(name) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
            name: name.to_string(),
            value: raw.clone(),
        }),
    }
}
