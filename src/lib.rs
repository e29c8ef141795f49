pub mod api;
pub mod cli;
pub mod commands;
pub mod config;
pub mod logging;
pub mod pipeline;
pub mod review;
pub mod session;
pub mod tui;
