//! nowplaying web server.
//!
//! This crate provides the HTTP surface for nowplaying: user registration,
//! first-party session tokens, and a proxy to Spotify's currently-playing
//! endpoint that refreshes expired Spotify credentials on the way.

pub mod auth;
pub mod cache;
pub mod config;
pub mod error;
pub mod routes;
