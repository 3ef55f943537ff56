// src/build/mod.rs — Android build: command, child process, log observers, artifacts

pub mod artifacts;
pub mod banner;
pub mod manifest;
pub mod monitor;
pub mod progress;
pub mod runner;
pub mod session;
