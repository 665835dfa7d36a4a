pub mod auth;
pub mod cleanup;
pub mod config;
pub mod error;
pub mod models;
pub mod storage;
