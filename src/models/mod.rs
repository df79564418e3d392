pub mod command;
pub mod config;
pub mod error;
pub mod frame;
pub mod outcome;
pub mod state;
