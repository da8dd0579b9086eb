//! P2PScout Library
//!
//! Snapshot-cached aggregation and ranking of USDT/fiat P2P offers

pub mod aggregate;
pub mod cache;
pub mod config;
pub mod http;
pub mod marketplace;
pub mod normalize;
pub mod rank;
pub mod refresh;
pub mod service;
pub mod types;
