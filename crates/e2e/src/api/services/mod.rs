//! Endpoint-family services

pub mod realworld;

pub use realworld::RealWorldService;
