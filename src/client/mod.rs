//! Client module - native transports, configuration and the frame loop

pub mod config;
pub mod http;
pub mod logging;
pub mod runtime;
pub mod websocket;

pub use config::ClientConfig;
pub use http::HttpApiClient;
pub use runtime::{bootstrap, ClientRuntime};
pub use websocket::{WsChannel, WsConnector};
