//! Frame-driven runtime wiring the native transports into the coordinator

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use chrono::Utc;
use tracing::info;

use super::config::{ClientConfig, ConfigError};
use super::http::HttpApiClient;
use super::logging::init_logging;
use super::websocket::WsConnector;
use crate::core::coordinator::SessionCoordinator;
use crate::core::error::ApiError;
use crate::core::traits::{Navigator, RenderBridge};

/// Interval between two coordinator ticks (~120 Hz, above the move send rate)
pub const FRAME_INTERVAL: Duration = Duration::from_millis(8);

pub type NativeCoordinator<N, R> = SessionCoordinator<WsConnector, HttpApiClient, N, R>;

/// Load the config next to the executable and set up logging from it
pub fn bootstrap() -> Result<ClientConfig, ConfigError> {
    let config = ClientConfig::load()?;
    let log_file = ClientConfig::config_directory().and_then(|dir| config.log_file_path(&dir));
    init_logging(config.logging.console, log_file);
    info!(server = %config.server.url, "Pong client starting...");
    Ok(config)
}

pub struct ClientRuntime<N: Navigator, R: RenderBridge> {
    coordinator: NativeCoordinator<N, R>,
    shutdown_flag: Arc<AtomicBool>,
}

impl<N: Navigator, R: RenderBridge> ClientRuntime<N, R> {
    pub fn new(config: &ClientConfig, navigator: N, renderer: R) -> Result<Self, ApiError> {
        let connector = WsConnector::new(&config.server);
        let api = HttpApiClient::new(&config.server)?;
        let coordinator = SessionCoordinator::new(connector, api, navigator, renderer)
            .with_bindings(config.keybindings.clone())
            .with_language(config.language)
            .with_render_mode(config.render.mode);
        Ok(Self {
            coordinator,
            shutdown_flag: Arc::new(AtomicBool::new(false)),
        })
    }

    pub fn coordinator(&mut self) -> &mut NativeCoordinator<N, R> {
        &mut self.coordinator
    }

    /// Flag that stops `run` when set
    pub fn shutdown_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.shutdown_flag)
    }

    /// Drive the coordinator once
    pub fn run_frame(&mut self) {
        self.coordinator.tick(Instant::now(), Utc::now());
    }

    /// Tick at `FRAME_INTERVAL` until the shutdown flag is set.
    ///
    /// `on_frame` runs before each tick; it is where the host feeds user input.
    pub fn run<F>(&mut self, mut on_frame: F)
    where
        F: FnMut(&mut NativeCoordinator<N, R>),
    {
        info!("[RUNTIME] Frame loop started");
        while !self.shutdown_flag.load(Ordering::SeqCst) {
            let started = Instant::now();
            on_frame(&mut self.coordinator);
            self.run_frame();
            if let Some(remaining) = FRAME_INTERVAL.checked_sub(started.elapsed()) {
                thread::sleep(remaining);
            }
        }
        info!("[RUNTIME] Frame loop stopped");
    }
}
