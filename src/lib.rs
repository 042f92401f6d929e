pub mod cli;
pub mod dataset;
pub mod error;
pub mod explain;
pub mod geo;
pub mod matcher;
pub mod oneshot;
pub mod server;
pub mod service;
pub mod storage;
