//! Client constants - timings, endpoints and wire strings
//!
//! All magic numbers shared by the session, queue and tournament clients.

use std::time::Duration;

// =============================================================================
// TIMINGS
// =============================================================================

/// Interval between two `game_init_request` polls while awaiting init
pub const INIT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Outbound move commands are capped at this rate
pub const MOVE_SEND_RATE_HZ: u64 = 75;

/// Minimum time between two move-command bursts (1000 / 75 ms)
pub const MOVE_SEND_TIMESTEP: Duration = Duration::from_nanos(1_000_000_000 / MOVE_SEND_RATE_HZ);

/// How long the end-of-game banner stays on screen before teardown
pub const END_BANNER_DURATION: Duration = Duration::from_secs(3);

/// Refresh period of the queue elapsed-time counter
pub const QUEUE_TIMER_INTERVAL: Duration = Duration::from_secs(1);

/// Refresh period of the tournament round countdowns
pub const ROUND_TIMER_INTERVAL: Duration = Duration::from_secs(1);

// =============================================================================
// WEBSOCKET PATHS
// =============================================================================

/// Matchmaking queue channel
pub const QUEUE_WS_PATH: &str = "/ws/queue/";

/// Tournament channel (one per tab, spans a whole bracket)
pub const TOURNAMENT_WS_PATH: &str = "/ws/tournaments/";

/// Game channel for a session id
pub fn game_ws_path(session_id: &str) -> String {
    format!("/ws/game/{}/", session_id)
}

// =============================================================================
// HTTP ENDPOINTS & VIEWS
// =============================================================================

pub const QUEUE_JOIN_ENDPOINT: &str = "/matchmaking/";
pub const LOCAL_GAME_ENDPOINT: &str = "/matchmaking/local_game/";
pub const LOGOUT_ENDPOINT: &str = "/users/logout/";

pub fn tournament_join_endpoint(tournament_id: &str) -> String {
    format!("/tournaments/join/{}/", tournament_id)
}

/// Landing view after a session ends outside a tournament
pub const HOME_VIEW: &str = "/home/";

pub fn game_view(session_id: &str) -> String {
    format!("/pong/{}/", session_id)
}

/// Every bracket page lives under this prefix
pub const TOURNAMENT_VIEW_PREFIX: &str = "/tournaments/";

pub fn tournament_view(tournament_id: &str) -> String {
    format!("{}{}/", TOURNAMENT_VIEW_PREFIX, tournament_id)
}
