// src/lib.rs — Library root for romci

pub mod build;
pub mod cli;
pub mod infra;
pub mod notify;
pub mod power;
pub mod upload;
pub mod util;
