//! Client library for the Proteus media service: resilient downloads of
//! assets that may still be processing, and multipart encoding of uploads.

pub mod checksum;
pub mod client;
pub mod config;
pub mod download;
pub mod filename;
pub mod logging;
pub mod payload;
pub mod transport;

pub use client::{ClientError, ProteusClient, SavedMedia};
pub use config::ProteusConfig;
