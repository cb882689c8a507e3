//! Domain Layer - Core notification types.
//!
//! This layer contains the core domain types for the notification stream
//! with no transport dependencies. All types here are pure Rust with
//! serialization support.

/// Decoded notification events (actor, subject, deterministic id).
pub mod notification;
