pub mod admin;
pub mod app;
pub mod audits;
pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod security;
pub mod state;
pub mod validation;
