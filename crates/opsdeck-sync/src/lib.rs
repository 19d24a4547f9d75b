//! # opsdeck-sync
//!
//! The entity cache and mutation coordinator: the bookkeeping that keeps
//! every view consistent after writes against the remote store.
//!
//! This crate provides:
//! - [`SyncCache`] — keyed cache with single-flight fetch deduplication
//! - [`QueryKey`] — logical query identities the views read
//! - [`Freshness`] — observable entry state (absent, loading, fresh, stale,
//!   errored)
//! - declared-key invalidation on mutation success, and a manual refresh-all
//!
//! It is deliberately independent of HTTP and of any rendering mechanism:
//! fetchers are plain async closures, so the same contract serves a CLI, a
//! UI, or a test harness.

#![warn(clippy::all)]
#![forbid(unsafe_code)]

pub mod cache;
pub mod error;
pub mod key;

pub use cache::{Freshness, SyncCache};
pub use error::{Error, Result};
pub use key::QueryKey;
