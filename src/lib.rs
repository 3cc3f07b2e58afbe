pub mod browser;
pub mod cli;
pub mod commands;
pub mod deps;
pub mod launcher;
pub mod platform;
pub mod ports;
pub mod readiness;
pub mod session;
pub mod signal;
pub mod supervisor;
pub mod ui;
