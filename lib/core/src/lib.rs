//! Core domain types and utilities for nowplaying.
//!
//! This crate provides the foundational types and error handling shared by
//! the identity, upstream, and server crates.

pub mod error;
pub mod id;

pub use error::Result;
pub use id::{ParseIdError, UserId};
