//! Authentication module for the nowplaying server.
//!
//! This module provides:
//! - The session gate middleware and the `CurrentSession` extractor
//! - The PostgreSQL user directory
//! - Shared application state
//!
//! Session tokens are stateless: the gate verifies the token signature,
//! issuer, and expiry, and never consults the store or the cache.

pub mod db;
pub mod middleware;

use nowplaying_identity::{Registrar, SessionCache, SessionCodec, UserDirectory};
use nowplaying_upstream::{ActivityClient, ActivityOrchestrator, TokenRefresher};
use std::sync::Arc;

pub use db::PgUserDirectory;
pub use middleware::{CurrentSession, require_session};

/// Shared application state.
///
/// Every collaborator is injected here at construction; handlers reach
/// nothing else.
pub struct AppState {
    /// Session token codec.
    pub codec: Arc<SessionCodec>,
    /// User directory.
    pub directory: Arc<dyn UserDirectory>,
    /// Registration flow.
    pub registrar: Registrar,
    /// Currently-playing proxy.
    pub orchestrator: ActivityOrchestrator,
}

impl AppState {
    /// Creates a new application state.
    pub fn new(
        codec: SessionCodec,
        directory: Arc<dyn UserDirectory>,
        cache: Arc<dyn SessionCache>,
        refresher: Arc<dyn TokenRefresher>,
        client: Arc<dyn ActivityClient>,
    ) -> Self {
        let codec = Arc::new(codec);
        Self {
            registrar: Registrar::new(directory.clone(), cache, codec.clone()),
            orchestrator: ActivityOrchestrator::new(directory.clone(), refresher, client),
            codec,
            directory,
        }
    }
}
