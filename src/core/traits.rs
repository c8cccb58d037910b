//! Core traits - abstractions for the rendering backends and the page shell
//!
//! The game session never draws or touches the page itself. It publishes a
//! `RenderFrame` for whichever renderer is active and asks a `Navigator` to
//! swap views and toggle chrome. For testing, mock implementations are
//! provided.

use std::sync::Arc;

use parking_lot::RwLock;

use super::banner::{Banner, Language};
use super::error::ClientError;
use super::types::{CanvasSize, EntitySnapshot, GameMode, RenderMode};

// =============================================================================
// RENDER FRAME
// =============================================================================

/// Everything a renderer needs to draw one game, in canvas coordinates
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderFrame {
    pub session_id: String,
    /// None until `game_init` arrived
    pub mode: Option<GameMode>,
    pub player1: String,
    pub player2: String,
    pub entities: EntitySnapshot,
    /// False once the game is over (paddles and ball are hidden)
    pub show_entities: bool,
    pub banners: Vec<Banner>,
    pub language: Language,
}

/// Frame shared between the session (writer) and the renderer (reader)
pub type SharedFrame = Arc<RwLock<RenderFrame>>;

// =============================================================================
// RENDER BRIDGE
// =============================================================================

/// A rendering backend consuming the shared frame
pub trait RenderBridge {
    /// Begin drawing `frame` every animation tick
    fn start(&mut self, frame: SharedFrame);

    /// Stop drawing and release the canvas
    fn stop(&mut self);

    fn resize(&mut self, canvas: CanvasSize);

    /// Current canvas size, None when no canvas exists
    fn canvas_size(&self) -> Option<CanvasSize>;

    /// Select the backend used by the next `start`
    fn set_mode(&mut self, _mode: RenderMode) {}
}

impl<R: RenderBridge + ?Sized> RenderBridge for Box<R> {
    fn start(&mut self, frame: SharedFrame) {
        (**self).start(frame)
    }

    fn stop(&mut self) {
        (**self).stop()
    }

    fn resize(&mut self, canvas: CanvasSize) {
        (**self).resize(canvas)
    }

    fn canvas_size(&self) -> Option<CanvasSize> {
        (**self).canvas_size()
    }

    fn set_mode(&mut self, mode: RenderMode) {
        (**self).set_mode(mode)
    }
}

/// Dispatches to the 2D or 3D backend.
///
/// A mode change only takes effect at the next `start`; a running game keeps
/// its renderer.
pub struct RenderSelector<F, S> {
    flat: F,
    scene: S,
    mode: RenderMode,
    running: Option<RenderMode>,
}

impl<F: RenderBridge, S: RenderBridge> RenderSelector<F, S> {
    pub fn new(flat: F, scene: S, mode: RenderMode) -> Self {
        Self {
            flat,
            scene,
            mode,
            running: None,
        }
    }

    pub fn mode(&self) -> RenderMode {
        self.mode
    }

    /// Backend currently drawing, if any
    pub fn running(&self) -> Option<RenderMode> {
        self.running
    }

    fn backend(&mut self, mode: RenderMode) -> &mut dyn RenderBridge {
        match mode {
            RenderMode::Flat => &mut self.flat,
            RenderMode::Scene => &mut self.scene,
        }
    }
}

impl<F: RenderBridge, S: RenderBridge> RenderBridge for RenderSelector<F, S> {
    fn start(&mut self, frame: SharedFrame) {
        if let Some(previous) = self.running.take() {
            self.backend(previous).stop();
        }
        let mode = self.mode;
        self.backend(mode).start(frame);
        self.running = Some(mode);
    }

    fn stop(&mut self) {
        if let Some(mode) = self.running.take() {
            self.backend(mode).stop();
        }
    }

    fn resize(&mut self, canvas: CanvasSize) {
        let mode = self.running.unwrap_or(self.mode);
        self.backend(mode).resize(canvas);
    }

    fn canvas_size(&self) -> Option<CanvasSize> {
        match self.running.unwrap_or(self.mode) {
            RenderMode::Flat => self.flat.canvas_size(),
            RenderMode::Scene => self.scene.canvas_size(),
        }
    }

    fn set_mode(&mut self, mode: RenderMode) {
        self.mode = mode;
    }
}

// =============================================================================
// NAVIGATOR
// =============================================================================

/// Remaining time before one tournament round starts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundCountdown {
    pub round: u32,
    /// `M:SS` or `00:00`
    pub remaining: String,
}

/// The page shell around the game: views, navbar, chrome and notifications
pub trait Navigator {
    /// Fetch and display the view at `path`
    fn load_view(&mut self, path: &str) -> Result<(), ClientError>;

    /// Whether a tournament bracket is the view currently on screen
    fn is_showing_tournament(&self) -> bool;

    fn update_navbar(&mut self);

    fn update_sidebar(&mut self);

    /// Hide navbar and sidebar while a game is on screen
    fn hide_chrome(&mut self);

    fn show_chrome(&mut self);

    fn show_queue(&mut self);

    fn update_queue_timer(&mut self, elapsed: &str);

    fn hide_queue(&mut self);

    fn update_round_timers(&mut self, countdowns: &[RoundCountdown]);

    /// Surface a message to the user
    fn notify(&mut self, message: &str);
}

// =============================================================================
// TEST MOCKS
// =============================================================================
