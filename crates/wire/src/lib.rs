//! Wire protocol for docparity
//!
//! A framed command protocol emulating a document-database client protocol:
//! - codec: 4-byte little-endian length prefix + JSON envelope
//! - envelope: `{id, op, db, params}` requests and `{id, ok, result | error}` replies
//! - commands: server-side execution of commands against a `Store`
//! - server: `ProtocolServer` with an explicit readiness acknowledgment
//! - client: `ProtocolClient` with typed per-collection helpers

#![warn(clippy::all)]

pub mod client;
pub mod codec;
pub mod commands;
pub mod envelope;
pub mod error;
pub mod server;

pub use client::{ClientOptions, ProtocolClient};
pub use codec::MAX_FRAME_LEN;
pub use envelope::{ApiError, Request, Response};
pub use error::{Result, WireError};
pub use server::{ProtocolServer, ServerConfig, ServerHandle, DEFAULT_READY_TIMEOUT};
