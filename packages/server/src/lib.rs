//! Random-chat matchmaking and presence server.
//!
//! Pairs anonymous users for ephemeral one-to-one chats, lets friends chat
//! persistently, and reconciles abrupt disconnects through a grace period.

// layers
pub mod domain;
pub mod infrastructure;
pub mod ui;
pub mod usecase;

pub mod config;
