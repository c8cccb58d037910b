//! WebSocket and HTTP protocol types
//!
//! This module contains the JSON message types exchanged with the Pong
//! server on the three channels (game, queue, tournament) and the JSON body
//! returned by the mutating HTTP endpoints. These types are
//! platform-independent and can be tested without a network.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use tracing::warn;

use super::input::MoveIntent;
use super::types::{GameMode, WindowSize};

// =============================================================================
// ID DECODING
// =============================================================================

/// Session / tournament ids are database keys: the server sends them either
/// as JSON numbers or as strings.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Text(String),
    Number(serde_json::Number),
}

impl From<RawId> for String {
    fn from(raw: RawId) -> Self {
        match raw {
            RawId::Text(s) => s,
            RawId::Number(n) => n.to_string(),
        }
    }
}

fn de_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    RawId::deserialize(deserializer).map(String::from)
}

fn de_opt_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Option::<RawId>::deserialize(deserializer).map(|id| id.map(String::from))
}

/// Decode an inbound frame, logging and discarding anything malformed
pub fn decode<T: DeserializeOwned>(channel: &str, text: &str) -> Option<T> {
    match serde_json::from_str(text) {
        Ok(msg) => Some(msg),
        Err(e) => {
            warn!(channel, error = %e, "[PROTOCOL] Dropping malformed message");
            None
        }
    }
}

// =============================================================================
// ENTITY UPDATES
// =============================================================================

/// Partial paddle state; absent fields leave the local value untouched
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PaddleUpdate {
    #[serde(default)]
    pub xpos: Option<f64>,
    #[serde(default)]
    pub ypos: Option<f64>,
    #[serde(default)]
    pub width: Option<f64>,
    #[serde(default)]
    pub height: Option<f64>,
    #[serde(default)]
    pub score: Option<u32>,
    #[serde(default)]
    pub pause_request: Option<bool>,
    #[serde(default)]
    pub pause_timer: Option<f64>,
    #[serde(default)]
    pub connected: Option<bool>,
}

/// Partial ball state
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BallUpdate {
    #[serde(default)]
    pub xpos: Option<f64>,
    #[serde(default)]
    pub ypos: Option<f64>,
    #[serde(default)]
    pub x_speed: Option<f64>,
    #[serde(default)]
    pub y_speed: Option<f64>,
    #[serde(default)]
    pub radius: Option<f64>,
}

/// Game status reported by the server inside `game_state`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerStatus {
    Initializing,
    Ongoing,
    /// Short delay after a point is scored
    Delayed,
    Paused,
    Finished,
    Unknown,
}

impl ServerStatus {
    pub fn from_wire(status: &str) -> Self {
        match status {
            "initializing" => ServerStatus::Initializing,
            "ongoing" => ServerStatus::Ongoing,
            "delayed" => ServerStatus::Delayed,
            "paused" => ServerStatus::Paused,
            "finished" => ServerStatus::Finished,
            _ => ServerStatus::Unknown,
        }
    }
}

/// Payload of `game_state` (and the state part of `game_init`)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GameStateData {
    #[serde(default)]
    pub paddle1: Option<PaddleUpdate>,
    #[serde(default)]
    pub paddle2: Option<PaddleUpdate>,
    #[serde(default)]
    pub ball: Option<BallUpdate>,
    #[serde(default)]
    pub status: Option<String>,
}

impl GameStateData {
    pub fn status(&self) -> Option<ServerStatus> {
        self.status.as_deref().map(ServerStatus::from_wire)
    }
}

/// Payload of `game_init`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameInitData {
    pub window: WindowSize,
    pub mode: GameMode,
    #[serde(default)]
    pub player1: String,
    #[serde(default)]
    pub player2: String,
    #[serde(flatten)]
    pub state: GameStateData,
}

// =============================================================================
// GAME CHANNEL
// =============================================================================

/// Messages sent on `/ws/game/{id}/`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GameClientMessage {
    /// Polled until `game_init` arrives
    GameInitRequest,
    MoveCommand { message: MoveIntent },
    /// Online concession
    ForfeitMessage,
    /// Local abandonment
    QuitMessage,
}

/// Messages received on `/ws/game/{id}/`
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GameServerMessage {
    GameInit {
        data: GameInitData,
    },
    GameState {
        data: GameStateData,
    },
    WinnerMessage {
        winner: String,
    },
    /// `message` is "<name> has forfeited the game"
    ForfeitNotification {
        message: String,
    },
    #[serde(other)]
    Unknown,
}

// =============================================================================
// QUEUE CHANNEL
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum QueueClientMessage {
    LeaveMessage,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum QueueServerMessage {
    GameMatched {
        #[serde(deserialize_with = "de_id")]
        session_id: String,
    },
    #[serde(other)]
    Unknown,
}

// =============================================================================
// TOURNAMENT CHANNEL
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadyState {
    Ready,
    NotReady,
}

/// Absolute start deadline of one bracket round
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundDeadline {
    pub round: u32,
    #[serde(alias = "start_time")]
    pub deadline: DateTime<Utc>,
}

/// Optional bracket data pushed along with `tournament_message`
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TournamentSnapshot {
    #[serde(default, deserialize_with = "de_opt_id")]
    pub match_id: Option<String>,
    #[serde(default)]
    pub ready: BTreeMap<String, bool>,
    #[serde(default)]
    pub rounds: Vec<RoundDeadline>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TournamentClientMessage {
    ReadyStateUpdate {
        ready_state: ReadyState,
        match_id: String,
    },
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TournamentServerMessage {
    /// Bracket changed; the view must be re-fetched
    TournamentMessage {
        #[serde(default)]
        message: Option<String>,
        #[serde(default)]
        data: Option<TournamentSnapshot>,
    },
    GameStart {
        #[serde(deserialize_with = "de_id")]
        session_id: String,
    },
    #[serde(other)]
    Unknown,
}

// =============================================================================
// HTTP RESPONSES
// =============================================================================

/// JSON body of the queue / local-game / tournament-join / logout endpoints.
///
/// Matchmaking endpoints answer with `status: "success" | "error"`, the
/// tournament and user endpoints with `success: bool`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ActionResponse {
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default, deserialize_with = "de_opt_id")]
    pub session_id: Option<String>,
    #[serde(default)]
    pub next_url: Option<String>,
}

impl ActionResponse {
    pub fn is_success(&self) -> bool {
        self.success == Some(true) || self.status.as_deref() == Some("success")
    }

    /// Message to surface to the user on rejection
    pub fn failure_message(&self) -> String {
        self.message
            .clone()
            .unwrap_or_else(|| "Request failed".to_string())
    }
}

// =============================================================================
// TESTS
// =============================================================================
