//! Replication and RPC message types.
//!
//! All message types derive `Serialize` and `Deserialize` for MessagePack
//! transport. The world builds them; an external transport moves them.

use hearth_component::{ComponentTypeId, Entity};
use serde::{Deserialize, Serialize};

use crate::channels;
use crate::codec;
use crate::error::NetError;

// ── Replication ─────────────────────────────────────────────────────────────

/// Send ordering between replicated entities within one frame.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum ReplicationPriority {
    /// Decorative objects.
    Low,
    /// Most entities.
    #[default]
    Normal,
    /// Players and projectiles.
    High,
    /// Game-critical state.
    Critical,
}

/// What a delta tells the receiver to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeltaKind {
    /// First delta for an entity: `changed` holds every replicated component.
    Spawn,
    /// Only components whose encoding changed since the last send.
    Update,
    /// The entity is gone.
    Despawn,
}

/// One encoded component value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentPayload {
    /// The component kind.
    pub type_id: ComponentTypeId,
    /// MessagePack-encoded value, with field names.
    pub data: Vec<u8>,
}

/// A change to one replicated entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplicationDelta {
    /// Monotonic per-world counter; receivers drop anything older than what
    /// they have applied.
    pub sequence: u64,
    /// The world frame that produced this delta.
    pub frame: u64,
    /// The entity the delta describes.
    pub entity: Entity,
    /// Spawn, update or despawn.
    pub kind: DeltaKind,
    /// Components added or changed.
    pub changed: Vec<ComponentPayload>,
    /// Components removed since the last send.
    pub removed: Vec<ComponentTypeId>,
}

impl ReplicationDelta {
    /// Returns `true` if the delta carries nothing worth sending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.kind == DeltaKind::Update && self.changed.is_empty() && self.removed.is_empty()
    }
}

// ── Envelope ────────────────────────────────────────────────────────────────

/// The unit handed to the transport: a channel, the entity it concerns and
/// an opaque payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    /// [`channels::REPLICATION`] or an RPC channel.
    pub channel: String,
    /// The entity the message concerns.
    pub entity: Entity,
    /// Encoded body.
    pub payload: Vec<u8>,
}

impl Envelope {
    /// Wrap a replication delta.
    ///
    /// # Errors
    ///
    /// Returns [`NetError::Encode`] if the delta cannot be encoded.
    pub fn delta(delta: &ReplicationDelta) -> Result<Self, NetError> {
        Ok(Self {
            channel: channels::REPLICATION.to_string(),
            entity: delta.entity,
            payload: codec::encode(delta)?,
        })
    }

    /// Wrap an RPC call.
    ///
    /// # Errors
    ///
    /// Returns [`NetError::InvalidRpcName`] for a malformed name.
    pub fn rpc(name: &str, entity: Entity, payload: Vec<u8>) -> Result<Self, NetError> {
        Ok(Self {
            channel: channels::rpc(name)?,
            entity,
            payload,
        })
    }

    /// Decode the replication delta this envelope carries.
    ///
    /// # Errors
    ///
    /// [`NetError::UnexpectedChannel`] if this is not a replication envelope,
    /// or [`NetError::Decode`] if the payload is malformed.
    pub fn to_delta(&self) -> Result<ReplicationDelta, NetError> {
        if self.channel != channels::REPLICATION {
            return Err(NetError::UnexpectedChannel(self.channel.clone()));
        }
        codec::decode(&self.payload)
    }

    /// The RPC name, if this is an RPC envelope.
    #[must_use]
    pub fn rpc_name(&self) -> Option<&str> {
        channels::rpc_name(&self.channel)
    }

    /// Encode the whole envelope for a byte-oriented transport.
    ///
    /// # Errors
    ///
    /// Returns [`NetError::Encode`] if serialisation fails.
    pub fn to_bytes(&self) -> Result<Vec<u8>, NetError> {
        codec::encode(self)
    }

    /// Decode an envelope produced by [`Envelope::to_bytes`].
    ///
    /// # Errors
    ///
    /// Returns [`NetError::Decode`] if the bytes are malformed.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, NetError> {
        codec::decode(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn delta(kind: DeltaKind) -> ReplicationDelta {
        ReplicationDelta {
            sequence: 7,
            frame: 3,
            entity: Entity::new(2, 1),
            kind,
            changed: vec![ComponentPayload {
                type_id: ComponentTypeId::from_name("Transform2D"),
                data: vec![1, 2, 3],
            }],
            removed: Vec::new(),
        }
    }

    #[test]
    fn test_delta_envelope_decodes_back() {
        let original = delta(DeltaKind::Spawn);
        let envelope = Envelope::delta(&original).unwrap();
        assert_eq!(envelope.channel, channels::REPLICATION);
        assert_eq!(envelope.entity, original.entity);
        assert_eq!(envelope.to_delta().unwrap(), original);
        assert_eq!(envelope.rpc_name(), None);
    }

    #[test]
    fn test_rpc_envelope_is_not_a_delta() {
        let envelope = Envelope::rpc("jump", Entity::new(0, 0), vec![9]).unwrap();
        assert_eq!(envelope.rpc_name(), Some("jump"));
        assert!(matches!(
            envelope.to_delta(),
            Err(NetError::UnexpectedChannel(_))
        ));
    }

    #[test]
    fn test_empty_update() {
        let mut d = delta(DeltaKind::Update);
        d.changed.clear();
        assert!(d.is_empty());
        d.kind = DeltaKind::Despawn;
        assert!(!d.is_empty());
    }

    #[test]
    fn test_priority_ordering() {
        assert!(ReplicationPriority::Critical > ReplicationPriority::High);
        assert!(ReplicationPriority::Low < ReplicationPriority::default());
    }

    #[test]
    fn test_envelope_bytes() {
        let envelope = Envelope::rpc("ping", Entity::new(4, 0), vec![]).unwrap();
        let restored = Envelope::from_bytes(&envelope.to_bytes().unwrap()).unwrap();
        assert_eq!(restored, envelope);
    }
}
