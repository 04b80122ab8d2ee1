//! Agora - Turn-Based AI Debate Orchestration Server
//!
//! Orchestrates multi-party debates between AI-simulated historical figures.
//! The core is the turn-scheduling and per-character memory engine: it decides
//! whose turn it is, assembles a bounded conversational context per model call,
//! and maintains each character's working memory and episodic summary across
//! arbitrarily long debates.
//!
//! ## Features
//!
//! - **Deterministic scheduling:** round-robin rotation through format phases;
//!   human turns interleave without consuming an AI slot
//! - **Bounded context:** a fixed recent-turn window plus a compressed episodic
//!   summary keeps model input flat as transcripts grow
//! - **Streaming turns:** SSE delta streaming with detached background
//!   persistence and memory updates
//! - **Local-First:** SQLite storage, append-only transcript
//!
//! ## Quick Start
//!
//! ```bash
//! # Start the server
//! agora serve
//!
//! # Write a default config
//! agora init
//! ```

pub mod cli;
pub mod config;
pub mod db;
pub mod debate;
pub mod engine;
pub mod error;
pub mod logging;
pub mod memory;
pub mod persona;
pub mod provider;
pub mod server;

// Re-export commonly used types
pub use error::AgoraError;

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");
