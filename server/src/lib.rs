pub mod config;
pub mod error;
pub mod messages;
pub mod player;
pub mod quiz;
pub mod state;
pub mod web;
