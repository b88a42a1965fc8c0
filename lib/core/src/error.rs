//! Error handling foundation for nowplaying.
//!
//! Only the `Result` alias lives here. Domain errors are plain enums owned by
//! the crate that produces them (`SessionError`, `DirectoryError`,
//! `UpstreamError`, ...). Service operations return `Result<T, TheirError>`
//! over a `Report`, classifying lower-layer errors into their own kind before
//! `?` so the HTTP boundary matches on `current_context()` alone.

use rootcause::Report;

/// A Result type alias using rootcause's Report for error handling.
pub type Result<T, C = ()> = std::result::Result<T, Report<C>>;
