#![cfg_attr(not(test), deny(clippy::panic))]
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions
)]

//! # Greenroom Server
//!
//! A multi-tenant, in-memory lobby coordination service for games.
//!
//! Lobbies are short-lived player rooms scoped per game. Clients drive them
//! over a small HTTP surface and watch them over a WebSocket event channel
//! with server-initiated heartbeats. Nothing is persisted; a restart drops
//! all lobbies and subscribers.

/// Session token validation
pub mod auth;

/// Server configuration (JSON file + defaults)
pub mod config;

/// Lobby State Engine: the authoritative lobby registry
pub mod engine;

/// Event Hub: subscriber fan-out, heartbeats, idle reaping
pub mod hub;

/// Structured logging configuration
pub mod logging;

/// Event taxonomy, identifiers, and input sanitization
pub mod protocol;

/// HTTP request surface
pub mod rest;

/// Top-level server wiring
pub mod server;

/// WebSocket subscriber transport
pub mod websocket;
