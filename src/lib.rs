//! Country openness indicators computed from yearly bibliometric tables.

pub mod batch;
pub mod cli;
pub mod data;
pub mod engine;
pub mod indicators;
pub mod logging;
pub mod server;
pub mod settings;
