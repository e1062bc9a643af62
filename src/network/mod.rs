// file: src/network/mod.rs
// version: 2.0.0
// guid: exec0002-3456-789a-bcde-f0123456789a

//! Network access for fetching the tunnel binary

pub mod download;

pub use download::NetworkDownloader;
