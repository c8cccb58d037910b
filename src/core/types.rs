//! Core types - game entities, playfield and canvas dimensions

use serde::{Deserialize, Serialize};

use super::protocol::{BallUpdate, PaddleUpdate};
use super::scaling::ScaleFactors;

// =============================================================================
// GAME MODE
// =============================================================================

/// How the two paddles are controlled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameMode {
    /// Both players share this keyboard
    Local,
    /// One player per client
    Online,
}

// =============================================================================
// RENDER MODE
// =============================================================================

/// Rendering backend selected by the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RenderMode {
    /// 2D immediate-mode canvas
    #[default]
    #[serde(rename = "2d")]
    Flat,
    /// 3D scene graph
    #[serde(rename = "3d")]
    Scene,
}

impl RenderMode {
    pub fn label(self) -> &'static str {
        match self {
            RenderMode::Flat => "2D",
            RenderMode::Scene => "3D",
        }
    }
}

// =============================================================================
// DIMENSIONS
// =============================================================================

/// Server-declared logical playfield size, fixed for the whole session
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WindowSize {
    pub width: f64,
    pub height: f64,
}

impl WindowSize {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// Current on-screen canvas size (fluid, device-dependent)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CanvasSize {
    pub width: f64,
    pub height: f64,
}

impl CanvasSize {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

// =============================================================================
// ENTITIES
// =============================================================================

/// Paddle state, in canvas coordinates once merged
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Paddle {
    pub xpos: f64,
    pub ypos: f64,
    pub width: f64,
    pub height: f64,
    pub score: u32,
    pub pause_request: bool,
    /// Seconds left before a requested pause ends
    pub pause_timer: f64,
    pub connected: bool,
}

impl Paddle {
    /// Overwrite the fields present in `update`, leave the others untouched
    pub fn merge(&mut self, update: &PaddleUpdate) {
        if let Some(v) = update.xpos {
            self.xpos = v;
        }
        if let Some(v) = update.ypos {
            self.ypos = v;
        }
        if let Some(v) = update.width {
            self.width = v;
        }
        if let Some(v) = update.height {
            self.height = v;
        }
        if let Some(v) = update.score {
            self.score = v;
        }
        if let Some(v) = update.pause_request {
            self.pause_request = v;
        }
        if let Some(v) = update.pause_timer {
            self.pause_timer = v;
        }
        if let Some(v) = update.connected {
            self.connected = v;
        }
    }
}

/// Ball state, in canvas coordinates once merged
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Ball {
    pub xpos: f64,
    pub ypos: f64,
    /// Server-space velocity, never rescaled
    pub x_speed: f64,
    pub y_speed: f64,
    pub radius: f64,
}

impl Ball {
    pub fn merge(&mut self, update: &BallUpdate) {
        if let Some(v) = update.xpos {
            self.xpos = v;
        }
        if let Some(v) = update.ypos {
            self.ypos = v;
        }
        if let Some(v) = update.x_speed {
            self.x_speed = v;
        }
        if let Some(v) = update.y_speed {
            self.y_speed = v;
        }
        if let Some(v) = update.radius {
            self.radius = v;
        }
    }
}

/// Local copy of every entity of one game
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntitySnapshot {
    pub paddle1: Paddle,
    pub paddle2: Paddle,
    pub ball: Ball,
}

impl EntitySnapshot {
    /// Rescale the present entity updates and merge them over the snapshot
    pub fn apply(
        &mut self,
        paddle1: Option<&PaddleUpdate>,
        paddle2: Option<&PaddleUpdate>,
        ball: Option<&BallUpdate>,
        scale: ScaleFactors,
    ) {
        if let Some(update) = paddle1 {
            self.paddle1.merge(&update.scaled(scale));
        }
        if let Some(update) = paddle2 {
            self.paddle2.merge(&update.scaled(scale));
        }
        if let Some(update) = ball {
            self.ball.merge(&update.scaled(scale));
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paddle_merge_only_present_fields() {
        let mut paddle = Paddle {
            xpos: 10.0,
            ypos: 20.0,
            width: 5.0,
            height: 50.0,
            score: 2,
            ..Default::default()
        };
        let update = PaddleUpdate {
            ypos: Some(80.0),
            score: Some(3),
            ..Default::default()
        };
        paddle.merge(&update);
        assert_eq!(paddle.xpos, 10.0);
        assert_eq!(paddle.ypos, 80.0);
        assert_eq!(paddle.width, 5.0);
        assert_eq!(paddle.height, 50.0);
        assert_eq!(paddle.score, 3);
    }

    #[test]
    fn test_ball_merge_keeps_missing_fields() {
        let mut ball = Ball {
            xpos: 1.0,
            ypos: 2.0,
            x_speed: 3.0,
            y_speed: 4.0,
            radius: 5.0,
        };
        ball.merge(&BallUpdate {
            xpos: Some(100.0),
            ..Default::default()
        });
        assert_eq!(ball.xpos, 100.0);
        assert_eq!(ball.ypos, 2.0);
        assert_eq!(ball.radius, 5.0);
    }

    #[test]
    fn test_snapshot_apply_scales_before_merge() {
        let mut snapshot = EntitySnapshot::default();
        let scale = ScaleFactors {
            scale_x: 0.5,
            scale_y: 2.0,
        };
        snapshot.apply(
            Some(&PaddleUpdate {
                xpos: Some(100.0),
                ypos: Some(100.0),
                ..Default::default()
            }),
            None,
            Some(&BallUpdate {
                radius: Some(10.0),
                ..Default::default()
            }),
            scale,
        );
        assert_eq!(snapshot.paddle1.xpos, 50.0);
        assert_eq!(snapshot.paddle1.ypos, 200.0);
        assert_eq!(snapshot.paddle2, Paddle::default());
        assert_eq!(snapshot.ball.radius, 5.0);
    }
}
