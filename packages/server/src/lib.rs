//! Real-time room relay library.
//!
//! Clients connect over WebSocket, join named rooms and have their messages
//! fanned out to every other member of the room.

// layers
pub mod domain;
pub mod infrastructure;
pub mod ui;
pub mod usecase;

pub mod config;
