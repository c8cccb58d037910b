//! Localized status banners drawn over the playfield
//!
//! The server only sends raw facts (a paddle requested a pause, a player
//! forfeited, a winner). This module turns them into user-facing text in
//! the configured language.

use serde::{Deserialize, Serialize};

use super::types::{CanvasSize, EntitySnapshot, RenderMode};

/// Suffix of the server's forfeit notification text
const FORFEIT_SUFFIX: &str = " has forfeited the game";

/// Playfield size the banner font sizes are tuned for
const BASELINE_CANVAS: CanvasSize = CanvasSize {
    width: 1200.0,
    height: 900.0,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    Fr,
    Es,
}

/// A status line shown while a game is paused or over
#[derive(Debug, Clone, PartialEq)]
pub enum Banner {
    Pause { player: String, seconds: u32 },
    Forfeit { player: String },
    Winner { name: String },
}

impl Banner {
    pub fn localized(&self, lang: Language) -> String {
        match self {
            Banner::Pause { player, seconds } => match lang {
                Language::En => format!(
                    "{} has requested a pause. Game will resume in {} seconds.",
                    player, seconds
                ),
                Language::Es => format!(
                    "{} ha solicitado una pausa. El juego se reanudará en {} segundos.",
                    player, seconds
                ),
                Language::Fr => format!(
                    "{} a demandé une pause. Le jeu reprendra dans {} secondes.",
                    player, seconds
                ),
            },
            Banner::Forfeit { player } => match lang {
                Language::En => format!("{} has forfeited the game.", player),
                Language::Es => format!("{} ha abandonado el juego.", player),
                Language::Fr => format!("{} a abandonné la partie.", player),
            },
            Banner::Winner { name } => match lang {
                Language::En => format!("{} wins!", name),
                Language::Es => format!("¡{} gana!", name),
                Language::Fr => format!("{} gagne!", name),
            },
        }
    }
}

/// Extract the player name from "<name> has forfeited the game"
pub fn forfeiting_player(message: &str) -> &str {
    match message.find(FORFEIT_SUFFIX) {
        Some(idx) => &message[..idx],
        None => message,
    }
}

/// Pause banner for the paddle that requested the pause.
///
/// If both paddles requested one, the longer remaining timer wins.
pub fn pause_banner(snapshot: &EntitySnapshot, player1: &str, player2: &str) -> Option<Banner> {
    let (p1, p2) = (&snapshot.paddle1, &snapshot.paddle2);
    let (player, paddle) = match (p1.pause_request, p2.pause_request) {
        (true, true) if p1.pause_timer > p2.pause_timer => (player1, p1),
        (true, true) => (player2, p2),
        (true, false) => (player1, p1),
        (false, true) => (player2, p2),
        (false, false) => return None,
    };
    Some(Banner::Pause {
        player: player.to_string(),
        seconds: paddle.pause_timer.max(0.0).ceil() as u32,
    })
}

/// Notification shown after the user switches renderer
pub fn render_mode_notice(mode: RenderMode, lang: Language) -> String {
    let label = mode.label();
    match lang {
        Language::En => format!("You changed the render to {}", label),
        Language::Fr => format!("Vous avez changé le rendu en {}", label),
        Language::Es => format!("Ha cambiado el renderizado a {}", label),
    }
}

/// Scale a baseline font size by the canvas area relative to 1200x900
pub fn adaptive_text_size(canvas: CanvasSize, baseline_size: f64) -> f64 {
    let ratio = (canvas.width * canvas.height) / (BASELINE_CANVAS.width * BASELINE_CANVAS.height);
    baseline_size * ratio.max(0.0).sqrt()
}
