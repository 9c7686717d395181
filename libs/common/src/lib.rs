//! Common library for the authentication workspace
//!
//! This crate provides functionality shared by the services in the
//! workspace: PostgreSQL connectivity, storage error types, and the
//! sliding-window redirect tracker used to break redirect loops.

pub mod database;
pub mod error;
pub mod redirect;

pub use redirect::RedirectTracker;

/// Example usage of the database module
///
/// ```rust,no_run
/// use common::database::{DatabaseConfig, init_pool, health_check};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = DatabaseConfig::from_env()?;
///     let pool = init_pool(&config).await?;
///     let is_healthy = health_check(&pool).await?;
///     println!("Database health check: {}", is_healthy);
///     Ok(())
/// }
/// ```
///
/// Example usage of the redirect tracker
///
/// ```rust
/// use common::RedirectTracker;
///
/// let mut tracker = RedirectTracker::default();
/// assert!(!tracker.track_redirect("/dashboard"));
/// tracker.reset();
/// assert!(tracker.bypass_marker().starts_with("bypass_"));
/// ```
pub fn example_usage() {}
