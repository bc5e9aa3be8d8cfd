//! feedsign Library
//!
//! Quorum-signed price feed updates: canonical encoding, digest, signing and
//! verification, plus the registry, store and ledger seams around them.

pub mod config;
pub mod errors;
pub mod feeds;
pub mod keystore;
pub mod ledger;
pub mod protocol;
pub mod registry;
pub mod types;
