//! rover: fetch named files from a remote repository into a local cache,
//! checking every cached copy against its known-good content hash.

pub mod config;
pub mod logging;

pub mod cache;
pub mod checksum;
pub mod error;
pub mod fetch;
pub mod fetcher;
pub mod registry;
pub mod retry;

pub use error::RoverError;
