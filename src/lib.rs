//! # Shared Canvas Server
//!
//! A real-time shared-canvas server. Clients hold WebSocket connections to a
//! single authority that owns a square grid of colored tiles. Clients log in
//! under a unique name, propose tile changes, and every accepted change is
//! broadcast to all logged-in clients so their views stay consistent.
//!
//! ## Layout
//! - [`board`]: the grid, tiles and colors
//! - [`stats`]: live counters over every proposed tile
//! - [`server`]: connection registry, board service, per-connection sessions
//! - [`config`]: environment and argument based configuration

pub mod board;
pub mod config;
pub mod server;
pub mod stats;
pub mod utils;
