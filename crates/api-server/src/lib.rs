#![warn(clippy::unwrap_used)]

pub mod error;
pub mod rest;
pub mod server;

pub use server::ApiServer;
