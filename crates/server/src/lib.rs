//! Bazaar account service library.
//!
//! Registration with emailed codes, password and QR login, profiles, and the
//! admin-managed chat presets, exposed as an axum [`Router`](axum::Router) via
//! [`routes::app`] so the binary and the integration tests share one stack.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod extract;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
