//! Coordinate rescaling from server space to canvas space
//!
//! The server simulates in a fixed logical playfield (`WindowSize`) while the
//! canvas is resized freely. Every positional/size field is multiplied by the
//! canvas/window ratio of its axis before it is merged locally.

use super::protocol::{BallUpdate, PaddleUpdate};
use super::types::{CanvasSize, WindowSize};

/// Per-axis multipliers from server space to canvas space
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaleFactors {
    pub scale_x: f64,
    pub scale_y: f64,
}

impl ScaleFactors {
    pub const IDENTITY: ScaleFactors = ScaleFactors {
        scale_x: 1.0,
        scale_y: 1.0,
    };

    /// Ratio between the canvas and the server window.
    ///
    /// Identity when no canvas exists yet, or when the window is degenerate.
    pub fn between(window: WindowSize, canvas: Option<CanvasSize>) -> Self {
        let Some(canvas) = canvas else {
            return Self::IDENTITY;
        };
        if window.width <= 0.0 || window.height <= 0.0 {
            return Self::IDENTITY;
        }
        Self {
            scale_x: canvas.width / window.width,
            scale_y: canvas.height / window.height,
        }
    }

    fn x(&self, v: Option<f64>) -> Option<f64> {
        v.map(|v| v * self.scale_x)
    }

    fn y(&self, v: Option<f64>) -> Option<f64> {
        v.map(|v| v * self.scale_y)
    }
}

impl PaddleUpdate {
    /// Copy with positions and sizes in canvas space
    pub fn scaled(&self, scale: ScaleFactors) -> PaddleUpdate {
        PaddleUpdate {
            xpos: scale.x(self.xpos),
            ypos: scale.y(self.ypos),
            width: scale.x(self.width),
            height: scale.y(self.height),
            ..self.clone()
        }
    }
}

impl BallUpdate {
    /// Copy with position and radius in canvas space (radius follows x)
    pub fn scaled(&self, scale: ScaleFactors) -> BallUpdate {
        BallUpdate {
            xpos: scale.x(self.xpos),
            ypos: scale.y(self.ypos),
            radius: scale.x(self.radius),
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_without_canvas() {
        let scale = ScaleFactors::between(WindowSize::new(1200.0, 900.0), None);
        assert_eq!(scale, ScaleFactors::IDENTITY);
    }

    #[test]
    fn test_ratio_per_axis() {
        let scale = ScaleFactors::between(
            WindowSize::new(1200.0, 900.0),
            Some(CanvasSize::new(600.0, 300.0)),
        );
        assert_eq!(scale.scale_x, 0.5);
        assert!((scale.scale_y - 1.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_degenerate_window_is_identity() {
        let scale = ScaleFactors::between(
            WindowSize::new(0.0, 900.0),
            Some(CanvasSize::new(600.0, 300.0)),
        );
        assert_eq!(scale, ScaleFactors::IDENTITY);
    }

    #[test]
    fn test_paddle_scaled_leaves_score_and_pause() {
        let update = PaddleUpdate {
            xpos: Some(10.0),
            ypos: Some(10.0),
            width: Some(4.0),
            height: Some(40.0),
            score: Some(7),
            pause_request: Some(true),
            pause_timer: Some(12.0),
            connected: None,
        };
        let scaled = update.scaled(ScaleFactors {
            scale_x: 2.0,
            scale_y: 0.5,
        });
        assert_eq!(scaled.xpos, Some(20.0));
        assert_eq!(scaled.ypos, Some(5.0));
        assert_eq!(scaled.width, Some(8.0));
        assert_eq!(scaled.height, Some(20.0));
        assert_eq!(scaled.score, Some(7));
        assert_eq!(scaled.pause_timer, Some(12.0));
        assert_eq!(scaled.connected, None);
    }

    #[test]
    fn test_ball_speed_not_scaled() {
        let update = BallUpdate {
            xpos: Some(100.0),
            ypos: Some(100.0),
            x_speed: Some(3.0),
            y_speed: Some(-3.0),
            radius: Some(10.0),
        };
        let scaled = update.scaled(ScaleFactors {
            scale_x: 0.5,
            scale_y: 2.0,
        });
        assert_eq!(scaled.xpos, Some(50.0));
        assert_eq!(scaled.ypos, Some(200.0));
        assert_eq!(scaled.radius, Some(5.0));
        assert_eq!(scaled.x_speed, Some(3.0));
        assert_eq!(scaled.y_speed, Some(-3.0));
    }
}
