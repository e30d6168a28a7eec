//! Discord surface: gateway event handling, slash commands, and rendering.

pub mod commands;
pub mod handler;
pub mod relay;
pub mod render;
