// SPDX-FileCopyrightText: 2026 Subarchive Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Subarchive integration tests.
//!
//! Provides mock adapters and fixture builders for fast, deterministic,
//! CI-runnable tests without a live feed bridge or Redis server.
//!
//! # Components
//!
//! - [`MockFeed`] - Scripted channel feed with call capture
//! - [`MemoryBackend`] - In-memory archive backend with failure injection
//! - [`fixtures`] - Builders for channels, messages, and media

pub mod fixtures;
pub mod memory_backend;
pub mod mock_feed;

pub use memory_backend::MemoryBackend;
pub use mock_feed::{FeedCall, MockFeed};
