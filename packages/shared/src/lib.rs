//! Utilities shared by the RoomRelay packages.

pub mod logger;
pub mod process;
pub mod time;
