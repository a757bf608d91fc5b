// SPDX-FileCopyrightText: 2026 Subarchive Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Incremental channel sync for Subarchive.
//!
//! The [`SyncEngine`] runs one task per resolved channel, replays an optional
//! backlog, then polls the feed for differences and hands every classified
//! message to the [`DispatchRegistry`]. A single [`CancellationToken`]
//! (see [`shutdown::install_signal_handler`]) stops all of them.
//!
//! [`CancellationToken`]: tokio_util::sync::CancellationToken

pub mod dispatch;
pub mod engine;
pub mod shutdown;

pub use dispatch::{DispatchRegistry, DispatchRegistryBuilder, MessageHandler};
pub use engine::{SyncEngine, SyncSettings};
