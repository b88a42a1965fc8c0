//! Users, session credentials, and registration for nowplaying.
//!
//! This crate provides:
//! - The `User` type and the `Registration` request that creates it
//! - Session tokens (`SessionCodec`, `SessionClaims`) and the request gate
//! - The `UserDirectory` and `SessionCache` storage seams, with in-memory
//!   implementations
//! - The `Registrar`, which creates users or hands existing ones a session
//!
//! # Example
//!
//! ```
//! use nowplaying_identity::{Identity, SessionCodec, authorize};
//! use nowplaying_core::UserId;
//! use chrono::Duration;
//!
//! let codec = SessionCodec::new(
//!     Some("secret".to_string()),
//!     "nowplaying",
//!     Duration::minutes(60),
//! );
//! let identity = Identity {
//!     user_id: UserId::new(),
//!     username: "alice".to_string(),
//!     email: "alice@example.com".to_string(),
//! };
//!
//! let token = codec.issue(&identity).unwrap();
//! let header = format!("Bearer {}", token.as_str());
//! let claims = authorize(&codec, Some(&header)).unwrap();
//!
//! assert_eq!(claims.email(), "alice@example.com");
//! ```

pub mod cache;
pub mod claims;
pub mod codec;
pub mod directory;
pub mod error;
pub mod gate;
pub mod registration;
pub mod user;

// Re-export main types at crate root
pub use cache::{InMemorySessionCache, SessionCache};
pub use claims::{Identity, SessionClaims, SessionToken};
pub use codec::{DEFAULT_SESSION_MINUTES, SessionCodec};
pub use directory::{InMemoryUserDirectory, UserDirectory};
pub use error::{CacheError, DirectoryError, RegistrationError, SessionError};
pub use gate::{authorize, bearer_token};
pub use registration::{RegisteredSession, Registrar, RegistrationOutcome};
pub use user::{Registration, User};
