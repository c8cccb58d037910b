//! Core module - platform-independent state machines and protocol types

pub mod banner;
pub mod constants;
pub mod coordinator;
pub mod error;
pub mod format;
pub mod game_session;
pub mod input;
pub mod io_traits;
pub mod matchmaking;
pub mod protocol;
pub mod rate_limit;
pub mod scaling;
pub mod tournament;
pub mod traits;
pub mod types;

pub use banner::{Banner, Language};
pub use coordinator::SessionCoordinator;
pub use error::{ApiError, ChannelError, ClientError};
pub use format::{format_countdown, format_elapsed};
pub use game_session::{GamePhase, GameSession, TeardownReason};
pub use input::{KeyBindings, MoveIntent, TouchButton};
pub use io_traits::{ApiClient, ChannelConnector, ChannelEvent, MessageChannel};
pub use protocol::{ActionResponse, GameClientMessage, GameServerMessage, ReadyState};
pub use traits::{Navigator, RenderBridge, RenderFrame, RenderSelector, SharedFrame};
pub use types::{CanvasSize, GameMode, RenderMode, WindowSize};
