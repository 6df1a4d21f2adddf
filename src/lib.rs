// Public API for integration tests and potential library usage

pub mod command;
pub mod config;
pub mod game;
pub mod hub;
pub mod protocol;
pub mod questions;
pub mod state;
pub mod transport;
pub mod types;
pub mod ws;
