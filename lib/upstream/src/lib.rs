//! Spotify access for nowplaying.
//!
//! This crate provides:
//!
//! - **Token refresh**: `TokenRefresher`, backed by the OAuth 2.0 refresh grant
//! - **Activity client**: `ActivityClient`, the currently-playing endpoint
//! - **Orchestrator**: `ActivityOrchestrator`, which proxies the activity
//!   call and refreshes an expired access credential at most once

pub mod activity;
pub mod credential;
pub mod error;
pub mod http;
pub mod orchestrator;
pub mod refresher;

pub use activity::{
    ActivityClient, ActivityResponse, CurrentActivity, HttpActivityClient,
    SPOTIFY_CURRENTLY_PLAYING_URL,
};
pub use credential::CredentialPair;
pub use error::{ActivityError, UpstreamError};
pub use http::DEFAULT_REQUEST_TIMEOUT;
pub use orchestrator::ActivityOrchestrator;
pub use refresher::{OAuthTokenRefresher, SPOTIFY_TOKEN_URL, TokenRefresher};
