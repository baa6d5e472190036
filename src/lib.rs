//! Agora - feed composition, moderation inbox and cache-bust jobs for a
//! community publishing platform.
//!
//! This library provides the query composers, their HTTP surface and the
//! background jobs that keep cached fragments fresh.

pub mod api;
pub mod cache;
pub mod config;
pub mod db;
pub mod jobs;
pub mod models;
pub mod services;
