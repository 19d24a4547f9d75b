//! # opsdeck-client
//!
//! Typed async client for the remote dashboard API.
//!
//! This crate provides one operation per (entity-type, verb) — list, create,
//! update, delete — for projects, clients, team members, tasks, and finance
//! entries, plus the reports overview and the reshaped finance summaries.
//! Requests are authenticated with the injected [`opsdeck_session::Session`]
//! and failures map to a uniform [`Error`] carrying the HTTP status and the
//! server's message where available.

#![warn(clippy::all)]
#![forbid(unsafe_code)]

pub mod client;
pub mod error;

pub use client::ApiClient;
pub use error::{Error, Result};
