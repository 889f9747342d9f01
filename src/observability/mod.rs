// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Observability module for structured logging and tracing.
//!
//! All diagnostic and operational output of the runtime goes through the
//! struct-based message types in [`messages`]. Each message implements
//! `Display` for the human-readable line and
//! [`StructuredLog`](messages::StructuredLog) to attach its fields to the
//! `tracing` event, so subscribers can filter on `wire`, `shard` and friends
//! instead of parsing text.
//!
//! # Architecture
//!
//! Messages are organized by subsystem:
//! * `messages::mesh` - scheduling, ticks and the async runner
//! * `messages::wire` - wire lifecycle
//! * `messages::shard` - shard-level events
//! * `messages::compose` - compose-time negotiation
//! * `messages::abi` - the C interface table
//!
//! # Usage
//!
//! ```rust
//! use shardmesh::observability::messages::compose::CompositionFailed;
//!
//! let error = std::io::Error::new(std::io::ErrorKind::Other, "test error");
//! let msg = CompositionFailed {
//!     wire: "main",
//!     error: &error,
//! };
//!
//! tracing::warn!("{}", msg);
//! ```
//!
//! The binary installs a `tracing-subscriber` formatter with an `EnvFilter`;
//! library users install whatever subscriber they like.

pub mod messages;
