// SPDX-FileCopyrightText: 2026 Subarchive Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Read-only HTTP API over the archive.
//!
//! The gateway never writes. It pages through the [`ArchiveStore`] with the
//! same cursor the store hands out, so clients chain `offset` values until
//! they receive `-1`.
//!
//! [`ArchiveStore`]: subarchive_storage::ArchiveStore

pub mod handlers;
pub mod server;

pub use handlers::{ListParams, ListResponse};
pub use server::{router, start_server, GatewayState, HealthState, PageLimits, ServerConfig};
