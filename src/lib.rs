//! foglio: a small self-hosted blogging platform backed by pluggable object
//! storage, with cached in-memory post/category indices and durable index
//! snapshots.

pub mod application;
pub mod config;
pub mod domain;
pub mod infra;
