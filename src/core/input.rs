//! Input sampling - held keys, touch zones and move intents
//!
//! Keys are tracked by their DOM names (`"ArrowUp"`, `"z"`). The send loop
//! reads the held set every tick and turns it into discrete move intents;
//! the raw key state never leaves the client.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::types::GameMode;

// =============================================================================
// MOVE INTENTS
// =============================================================================

/// Discrete movement command sent as `move_command.message`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MoveIntent {
    #[serde(rename = "move_up_player1")]
    UpPlayer1,
    #[serde(rename = "move_down_player1")]
    DownPlayer1,
    #[serde(rename = "move_up_player2")]
    UpPlayer2,
    #[serde(rename = "move_down_player2")]
    DownPlayer2,
    /// Online: the server knows which paddle belongs to this client
    #[serde(rename = "move_up_player")]
    Up,
    #[serde(rename = "move_down_player")]
    Down,
}

// =============================================================================
// KEY BINDINGS
// =============================================================================

fn default_player1_up() -> Vec<String> {
    vec!["z".to_string(), "w".to_string()]
}

fn default_player1_down() -> Vec<String> {
    vec!["s".to_string()]
}

fn default_arrow_up() -> Vec<String> {
    vec!["ArrowUp".to_string()]
}

fn default_arrow_down() -> Vec<String> {
    vec!["ArrowDown".to_string()]
}

/// Key layout for both modes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyBindings {
    #[serde(default = "default_player1_up")]
    pub player1_up: Vec<String>,
    #[serde(default = "default_player1_down")]
    pub player1_down: Vec<String>,
    #[serde(default = "default_arrow_up")]
    pub player2_up: Vec<String>,
    #[serde(default = "default_arrow_down")]
    pub player2_down: Vec<String>,
    #[serde(default = "default_arrow_up")]
    pub online_up: Vec<String>,
    #[serde(default = "default_arrow_down")]
    pub online_down: Vec<String>,
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self {
            player1_up: default_player1_up(),
            player1_down: default_player1_down(),
            player2_up: default_arrow_up(),
            player2_down: default_arrow_down(),
            online_up: default_arrow_up(),
            online_down: default_arrow_down(),
        }
    }
}

// =============================================================================
// TOUCH
// =============================================================================

/// On-screen control buttons (`btn-up`, `btn-down1`, ...)
///
/// A button stands for a paddle role, not for a key, so rebinding the
/// keyboard never disables the touch controls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TouchButton {
    Up,
    Down,
    Up1,
    Down1,
    Up2,
    Down2,
}

impl TouchButton {
    /// Intent the button produces in `mode`, if any.
    ///
    /// `btn-up`/`btn-down` drive the right paddle locally and the own
    /// paddle online; the player 1 buttons only exist in local games.
    pub fn intent(self, mode: GameMode) -> Option<MoveIntent> {
        match (mode, self) {
            (GameMode::Local, TouchButton::Up1) => Some(MoveIntent::UpPlayer1),
            (GameMode::Local, TouchButton::Down1) => Some(MoveIntent::DownPlayer1),
            (GameMode::Local, TouchButton::Up | TouchButton::Up2) => Some(MoveIntent::UpPlayer2),
            (GameMode::Local, TouchButton::Down | TouchButton::Down2) => {
                Some(MoveIntent::DownPlayer2)
            }
            (GameMode::Online, TouchButton::Up | TouchButton::Up2) => Some(MoveIntent::Up),
            (GameMode::Online, TouchButton::Down | TouchButton::Down2) => Some(MoveIntent::Down),
            (GameMode::Online, TouchButton::Up1 | TouchButton::Down1) => None,
        }
    }

    /// Parse the element id of a touch button
    pub fn from_element_id(id: &str) -> Option<Self> {
        match id {
            "btn-up" => Some(TouchButton::Up),
            "btn-down" => Some(TouchButton::Down),
            "btn-up1" => Some(TouchButton::Up1),
            "btn-down1" => Some(TouchButton::Down1),
            "btn-up2" => Some(TouchButton::Up2),
            "btn-down2" => Some(TouchButton::Down2),
            _ => None,
        }
    }
}

// =============================================================================
// KEY STATE
// =============================================================================

/// Single-character keys are case-folded so Shift/CapsLock don't matter
fn normalize(key: &str) -> String {
    let mut chars = key.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => c.to_lowercase().collect(),
        _ => key.to_string(),
    }
}

/// Currently held keys and touch buttons
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KeyState {
    held: HashSet<String>,
    touched: HashSet<TouchButton>,
}

impl KeyState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn press(&mut self, key: &str) {
        self.held.insert(normalize(key));
    }

    pub fn release(&mut self, key: &str) {
        self.held.remove(&normalize(key));
    }

    pub fn is_held(&self, key: &str) -> bool {
        self.held.contains(&normalize(key))
    }

    pub fn any_held(&self, keys: &[String]) -> bool {
        keys.iter().any(|k| self.is_held(k))
    }

    pub fn touch_start(&mut self, button: TouchButton) {
        self.touched.insert(button);
    }

    pub fn touch_end(&mut self, button: TouchButton) {
        self.touched.remove(&button);
    }

    pub fn is_touched(&self, button: TouchButton) -> bool {
        self.touched.contains(&button)
    }

    fn touch_requests(&self, mode: GameMode, intent: MoveIntent) -> bool {
        self.touched.iter().any(|b| b.intent(mode) == Some(intent))
    }

    pub fn clear(&mut self) {
        self.held.clear();
        self.touched.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.held.is_empty() && self.touched.is_empty()
    }
}

/// Derive the move intents for the keys and touch buttons currently held.
///
/// Up and down held together yield both intents; the server resolves them.
pub fn move_intents(mode: GameMode, bindings: &KeyBindings, keys: &KeyState) -> Vec<MoveIntent> {
    let roles = match mode {
        GameMode::Local => vec![
            (MoveIntent::UpPlayer1, bindings.player1_up.as_slice()),
            (MoveIntent::DownPlayer1, bindings.player1_down.as_slice()),
            (MoveIntent::UpPlayer2, bindings.player2_up.as_slice()),
            (MoveIntent::DownPlayer2, bindings.player2_down.as_slice()),
        ],
        GameMode::Online => vec![
            (MoveIntent::Up, bindings.online_up.as_slice()),
            (MoveIntent::Down, bindings.online_down.as_slice()),
        ],
    };
    let mut intents = Vec::new();
    for (intent, bound) in roles {
        if keys.any_held(bound) || keys.touch_requests(mode, intent) {
            intents.push(intent);
        }
    }
    intents
}
