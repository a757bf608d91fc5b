// SPDX-FileCopyrightText: 2026 Subarchive Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Remote channel feed for Subarchive.
//!
//! Everything that talks to, or interprets answers from, the channel feed:
//! - [`HttpFeed`]: the [`ChannelFeed`](subarchive_core::ChannelFeed) backed by the feed bridge
//! - [`resolve_channels`]: configured names to channel handles
//! - [`classify`]: incoming posts to message classes and canonical file names
//! - [`MediaRetriever`]: bounded-memory chunked downloads

pub mod classifier;
pub mod client;
pub mod resolver;
pub mod retriever;
pub mod wire;

pub use classifier::{classify, sanitize_file_name};
pub use client::HttpFeed;
pub use resolver::resolve_channels;
pub use retriever::{MediaRetriever, CHUNK_SIZE};
