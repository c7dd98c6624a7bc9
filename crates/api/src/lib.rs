//! `lingora-api` — HTTP surface for the language-learning backend.

pub mod app;
pub mod config;
pub mod context;
pub mod middleware;
