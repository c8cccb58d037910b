// Pong web client: game sessions, matchmaking queue and tournaments

pub mod client;
pub mod core;
