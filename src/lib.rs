pub mod alert;
pub mod api;
pub mod audio;
pub mod board;
pub mod config;
pub mod error;
pub mod fetch;
pub mod flap;
pub mod refresh;
pub mod sheet;
pub mod tui;
pub mod types;
