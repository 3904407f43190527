//! Dream Job Search client library.
//!
//! This crate provides the client-side core of the Dream Job Search
//! product: the Google OAuth authorization relay, the backend API client,
//! and the live log stream viewer.

pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod logs;
pub mod session;
pub mod store;
pub mod tags;
