//! Resource providers for loading ZPT templates.
//!
//! This crate provides platform-specific implementations of the
//! `ResourceProvider` trait from zpt-traits.
//!
//! ## Available Providers
//!
//! - [`FilesystemResourceProvider`]: Loads templates from the local filesystem
//!
//! ## Re-exports
//!
//! For convenience, we also re-export the in-memory provider from zpt-traits:
//! - [`InMemoryResourceProvider`]: Pre-populated in-memory storage

mod filesystem;

pub use filesystem::FilesystemResourceProvider;

// Re-export the in-memory provider from zpt-traits for convenience
pub use zpt_traits::InMemoryResourceProvider;
