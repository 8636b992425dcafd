pub mod acquire;
pub mod audio;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod history;
pub mod pipeline;
pub mod sink;
pub mod transcribe;
