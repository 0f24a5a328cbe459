//! # hearth_net
//!
//! Wire shapes for replication and RPC. The world core decides *what* goes on
//! the wire; moving bytes between peers is left to an external transport.
//!
//! This crate provides:
//!
//! - [`channels`]: channel names and builders.
//! - [`messages`]: replication deltas, component payloads and envelopes.
//! - [`codec`]: MessagePack serialisation helpers.
//! - [`error`]: network-layer error types.

pub mod channels;
pub mod codec;
pub mod error;
pub mod messages;

pub use codec::{decode, encode};
pub use error::NetError;
pub use messages::{ComponentPayload, DeltaKind, Envelope, ReplicationDelta, ReplicationPriority};
