//! Session coordinator - at most one game, queue hand-offs, return views
//!
//! The coordinator owns every collaborator and the single session slot. All
//! user actions and the frame tick go through it, so the invariant "one game
//! channel at a time" is enforced in exactly one place.

use std::time::Instant;

use chrono::{DateTime, Utc};
use tracing::{error, info, warn};

use super::banner::{render_mode_notice, Language};
use super::constants::{game_view, game_ws_path, tournament_view, HOME_VIEW};
use super::error::ClientError;
use super::game_session::{GameSession, TeardownReason};
use super::input::{KeyBindings, TouchButton};
use super::io_traits::{ApiClient, ChannelConnector, MessageChannel};
use super::matchmaking::{MatchmakingClient, QueueOutcome};
use super::protocol::{ReadyState, RoundDeadline};
use super::tournament::TournamentClient;
use super::traits::{Navigator, RenderBridge};
use super::types::{CanvasSize, RenderMode};

/// Single-slot session registry.
///
/// Only the session carrying the slot's generation is ever driven.
struct SessionSlot<Ch: MessageChannel> {
    generation: u64,
    current: Option<GameSession<Ch>>,
}

impl<Ch: MessageChannel> SessionSlot<Ch> {
    fn next_generation(&mut self) -> u64 {
        self.generation += 1;
        self.generation
    }

    /// The current session, unless it belongs to an older generation
    fn live_mut(&mut self) -> Option<&mut GameSession<Ch>> {
        let generation = self.generation;
        match self.current.as_mut() {
            Some(session) if session.generation() == generation => Some(session),
            Some(session) => {
                warn!(
                    session = %session.session_id(),
                    generation = session.generation(),
                    current = generation,
                    "[GAME] Ignoring stale session"
                );
                None
            }
            None => None,
        }
    }
}

pub struct SessionCoordinator<C, A, N, R>
where
    C: ChannelConnector,
{
    connector: C,
    api: A,
    navigator: N,
    renderer: R,
    bindings: KeyBindings,
    language: Language,
    render_mode: RenderMode,
    matchmaking: MatchmakingClient<C::Channel>,
    tournament: TournamentClient<C::Channel>,
    slot: SessionSlot<C::Channel>,
}

impl<C, A, N, R> SessionCoordinator<C, A, N, R>
where
    C: ChannelConnector,
    A: ApiClient,
    N: Navigator,
    R: RenderBridge,
{
    pub fn new(connector: C, api: A, navigator: N, renderer: R) -> Self {
        Self {
            connector,
            api,
            navigator,
            renderer,
            bindings: KeyBindings::default(),
            language: Language::default(),
            render_mode: RenderMode::default(),
            matchmaking: MatchmakingClient::new(),
            tournament: TournamentClient::new(),
            slot: SessionSlot {
                generation: 0,
                current: None,
            },
        }
    }

    pub fn with_bindings(mut self, bindings: KeyBindings) -> Self {
        self.bindings = bindings;
        self
    }

    pub fn with_language(mut self, language: Language) -> Self {
        self.language = language;
        self
    }

    pub fn with_render_mode(mut self, mode: RenderMode) -> Self {
        self.render_mode = mode;
        self.renderer.set_mode(mode);
        self
    }

    // -------------------------------------------------------------------------
    // Accessors
    // -------------------------------------------------------------------------

    pub fn session(&self) -> Option<&GameSession<C::Channel>> {
        self.slot.current.as_ref()
    }

    pub fn generation(&self) -> u64 {
        self.slot.generation
    }

    pub fn has_active_session(&self) -> bool {
        self.slot.current.is_some()
    }

    pub fn matchmaking(&self) -> &MatchmakingClient<C::Channel> {
        &self.matchmaking
    }

    pub fn tournament(&self) -> &TournamentClient<C::Channel> {
        &self.tournament
    }

    pub fn navigator(&self) -> &N {
        &self.navigator
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn connector(&self) -> &C {
        &self.connector
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn render_mode(&self) -> RenderMode {
        self.render_mode
    }

    // -------------------------------------------------------------------------
    // Game lifecycle
    // -------------------------------------------------------------------------

    /// Show the game view and open its channel, replacing any running game
    pub fn load_game(&mut self, session_id: &str) -> Result<(), ClientError> {
        if self.slot.current.is_some() {
            self.finish_session(TeardownReason::Replaced);
        }

        self.navigator.hide_chrome();
        if let Err(e) = self.navigator.load_view(&game_view(session_id)) {
            error!(session = %session_id, error = %e, "[GAME] Failed to load game view");
            self.navigator.show_chrome();
            return Err(e);
        }

        let channel = match self.connector.open(&game_ws_path(session_id)) {
            Ok(channel) => channel,
            Err(e) => {
                error!(session = %session_id, error = %e, "[GAME] Failed to open game channel");
                self.restore_chrome();
                self.return_to_landing();
                return Err(e.into());
            }
        };

        let generation = self.slot.next_generation();
        let session = GameSession::new(session_id, generation, channel, self.language);
        info!(session = %session_id, generation = generation, "[GAME] Session created");
        self.slot.current = Some(session);
        Ok(())
    }

    /// Tear down the current session and restore the page around it
    fn finish_session(&mut self, reason: TeardownReason) {
        let Some(mut session) = self.slot.current.take() else {
            return;
        };
        if !session.teardown(&mut self.renderer, &reason) {
            return;
        }
        self.restore_chrome();
        if reason.navigates_away() {
            self.return_to_landing();
        }
    }

    /// Bring back navbar and sidebar, refreshed for the new login state
    fn restore_chrome(&mut self) {
        self.navigator.show_chrome();
        self.navigator.update_navbar();
        self.navigator.update_sidebar();
    }

    /// Tournament page if a tournament is pending, else home
    fn return_to_landing(&mut self) {
        let path = match self.tournament.tournament_id() {
            Some(id) => tournament_view(id),
            None => HOME_VIEW.to_string(),
        };
        if let Err(e) = self.navigator.load_view(&path) {
            error!(view = %path, error = %e, "[GAME] Failed to load landing view");
        }
    }

    // -------------------------------------------------------------------------
    // Queue
    // -------------------------------------------------------------------------

    pub fn join_queue(&mut self, now: Instant) -> Result<(), ClientError> {
        if self.has_active_session() {
            warn!("[QUEUE] Refusing to queue while a game is active");
            return Err(ClientError::GameActive);
        }
        self.matchmaking
            .join(&mut self.connector, &self.api, &mut self.navigator, now)
    }

    pub fn cancel_queue(&mut self) -> bool {
        self.matchmaking.cancel(&mut self.navigator)
    }

    pub fn start_local_game(&mut self) -> Result<(), ClientError> {
        if self.matchmaking.is_queued() {
            self.matchmaking.cancel(&mut self.navigator);
        }
        let session_id = self
            .matchmaking
            .start_local_game(&self.api, &mut self.navigator)?;
        self.load_game(&session_id)
    }

    // -------------------------------------------------------------------------
    // Tournament
    // -------------------------------------------------------------------------

    pub fn join_tournament(&mut self, tournament_id: &str) -> Result<(), ClientError> {
        self.tournament.join(
            &mut self.connector,
            &self.api,
            &mut self.navigator,
            tournament_id,
        )
    }

    pub fn connect_tournament(&mut self, tournament_id: &str) -> Result<(), ClientError> {
        self.tournament.connect(&mut self.connector, tournament_id)
    }

    pub fn set_ready(&mut self, ready_state: ReadyState, match_id: &str) -> bool {
        self.tournament.send_ready(ready_state, match_id)
    }

    pub fn observe_round_deadlines(&mut self, rounds: Vec<RoundDeadline>) {
        self.tournament.observe_round_deadlines(rounds);
    }

    // -------------------------------------------------------------------------
    // In-game actions
    // -------------------------------------------------------------------------

    pub fn forfeit(&mut self) -> Result<(), ClientError> {
        let session = self.slot.live_mut().ok_or(ClientError::NoSession)?;
        if session.forfeit() {
            Ok(())
        } else {
            Err(ClientError::NotAllowed("forfeit"))
        }
    }

    pub fn quit(&mut self) -> Result<(), ClientError> {
        let session = self.slot.live_mut().ok_or(ClientError::NoSession)?;
        if session.quit() {
            Ok(())
        } else {
            Err(ClientError::NotAllowed("quit"))
        }
    }

    pub fn key_down(&mut self, key: &str) {
        if let Some(session) = self.slot.live_mut() {
            session.key_down(key);
        }
    }

    pub fn key_up(&mut self, key: &str) {
        if let Some(session) = self.slot.live_mut() {
            session.key_up(key);
        }
    }

    pub fn touch_start(&mut self, button: TouchButton) {
        if let Some(session) = self.slot.live_mut() {
            session.touch_start(button);
        }
    }

    pub fn touch_end(&mut self, button: TouchButton) {
        if let Some(session) = self.slot.live_mut() {
            session.touch_end(button);
        }
    }

    /// New canvas size; used by the next state update
    pub fn resize(&mut self, canvas: CanvasSize) {
        self.renderer.resize(canvas);
    }

    /// Switch renderer; takes effect when the next game starts
    pub fn set_render_mode(&mut self, mode: RenderMode) {
        if mode == self.render_mode {
            return;
        }
        self.render_mode = mode;
        self.renderer.set_mode(mode);
        self.navigator
            .notify(&render_mode_notice(mode, self.language));
        info!(mode = ?mode, "[GAME] Render mode changed");
    }

    // -------------------------------------------------------------------------
    // Page lifecycle
    // -------------------------------------------------------------------------

    /// Recover after a page reload from the ids the page carried
    pub fn resume(
        &mut self,
        session_id: Option<&str>,
        tournament_id: Option<&str>,
    ) -> Result<(), ClientError> {
        if let Some(id) = tournament_id {
            self.connect_tournament(id)?;
        }
        if let Some(id) = session_id {
            self.load_game(id)?;
        }
        Ok(())
    }

    /// Drop every channel, then log out on the server
    pub fn logout(&mut self) -> Result<(), ClientError> {
        self.finish_session(TeardownReason::LoggedOut);
        self.matchmaking.shutdown(&mut self.navigator);
        self.tournament.leave();

        let response = self.api.logout().map_err(|e| {
            error!(error = %e, "[HTTP] Logout failed");
            ClientError::from(e)
        })?;
        if !response.is_success() {
            let message = response.failure_message();
            self.navigator.notify(&message);
            return Err(ClientError::Rejected(message));
        }
        self.navigator.update_navbar();
        self.navigator.update_sidebar();
        let next = response.next_url.unwrap_or_else(|| HOME_VIEW.to_string());
        self.navigator.load_view(&next)
    }

    // -------------------------------------------------------------------------
    // Frame tick
    // -------------------------------------------------------------------------

    /// Drive every state machine once
    pub fn tick(&mut self, now: Instant, wall: DateTime<Utc>) {
        if let Some(QueueOutcome::Matched(session_id)) = self.matchmaking.poll(&mut self.navigator)
        {
            if let Err(e) = self.load_game(&session_id) {
                error!(session = %session_id, error = %e, "[QUEUE] Could not open matched game");
            }
        }

        let game_active = self.has_active_session();
        if let Some(session_id) = self.tournament.poll(&mut self.navigator, game_active) {
            if self.matchmaking.is_queued() {
                self.matchmaking.cancel(&mut self.navigator);
            }
            if let Err(e) = self.load_game(&session_id) {
                error!(session = %session_id, error = %e, "[TOURNAMENT] Could not open game");
            }
        }

        let reason = match self.slot.live_mut() {
            Some(session) => session
                .pump(&mut self.renderer, now)
                .or_else(|| session.tick(now, &self.bindings)),
            None => None,
        };
        if let Some(reason) = reason {
            self.finish_session(reason);
        }

        self.matchmaking.tick_timer(&mut self.navigator, now);
        self.tournament.tick_timers(&mut self.navigator, now, wall);
    }
}
