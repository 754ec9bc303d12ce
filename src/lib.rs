//! Real-time game-session relay server.
//!
//! Pairs (or small groups) of clients share a live session — moves,
//! board state, annotations, chat, control signals — through long-lived
//! WebSocket connections. The server groups connections into rooms,
//! keeps the two player roles unique per room, relays domain events it
//! never inspects, and reconciles disconnects so rooms neither leak nor
//! desync.

pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod logger;
pub mod time;
pub mod ui;
pub mod usecase;

// Re-export entry points
pub use config::ServerConfig;
pub use ui::run;
