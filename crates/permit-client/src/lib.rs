//! # Permit Client
//!
//! Library for software that needs to confirm its permit with a permit
//! server at startup or periodically. Every call is a fresh remote lookup;
//! nothing is cached.
//!
//! ```rust,no_run
//! use permit_client::{CheckRequest, Client, ClientError};
//!
//! async fn example() -> Result<(), ClientError> {
//!     let client = Client::new("https://permits.example.com")?;
//!     let permit = client
//!         .check(&CheckRequest::new("k".repeat(64), "example.com"))
//!         .await?;
//!     println!("licensed until {:?}", permit.expires);
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod error;

pub use client::{CheckRequest, Client, DEFAULT_TIMEOUT};
pub use error::{ClientError, Result};
