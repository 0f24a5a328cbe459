//! Replication state and RPC dispatch.
//!
//! The network-sync phase encodes every replicated entity's serializable
//! components, diffs them against what was last sent, and queues
//! [`Envelope`]s in an outbox. Moving envelopes is the transport's job;
//! the world only fills and drains the outbox. The outbox is bounded by
//! [`ReplicationConfig::outbox_capacity`]; a host that stops draining it
//! loses the oldest envelopes first, with a warning per dropped envelope.
//!
//! Send rates are measured in wall-clock time, so slowing the simulation
//! with a time scale does not slow the network.
//!
//! [`ReplicationConfig::outbox_capacity`]: crate::config::ReplicationConfig::outbox_capacity

use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;

use hearth_component::{ComponentTypeId, EcsError, EcsResult, Entity};
use hearth_net::{
    ComponentPayload, DeltaKind, Envelope, ReplicationDelta, ReplicationPriority, channels,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use crate::config::{ReplicationConfig, positive};
use crate::pipeline::{FrameReport, Phase};
use crate::world::World;

/// Handler invoked for an inbound RPC.
pub type RpcHandler = Arc<dyn Fn(&mut World, Entity, &[u8]) -> EcsResult<()> + Send + Sync>;

/// How often and in what order an entity is sent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReplicationSettings {
    /// Order within a frame; higher goes first.
    pub priority: ReplicationPriority,
    /// Update sends per second.
    pub rate_hz: f32,
}

impl ReplicationSettings {
    /// Settings with the given priority and rate.
    #[must_use]
    pub fn new(priority: ReplicationPriority, rate_hz: f32) -> Self {
        Self { priority, rate_hz }
    }

    /// Reject a zero, negative or non-finite rate.
    ///
    /// # Errors
    ///
    /// [`EcsError::InvalidArgument`].
    pub fn validate(&self) -> EcsResult<()> {
        positive("rate_hz", self.rate_hz)
    }
}

#[derive(Debug, Clone)]
struct Replicated {
    settings: ReplicationSettings,
    /// Encodings sent last time, by kind.
    last_sent: BTreeMap<ComponentTypeId, Vec<u8>>,
    spawned: bool,
    /// Seconds since the last send.
    since_send: f32,
}

/// Per-world replication bookkeeping.
pub(crate) struct Replication {
    default_rate_hz: f32,
    outbox_capacity: usize,
    dropped: u64,
    entities: BTreeMap<Entity, Replicated>,
    despawns: Vec<(Entity, ReplicationPriority)>,
    outbox: VecDeque<Envelope>,
    sequence: u64,
    handlers: BTreeMap<String, RpcHandler>,
}

impl Replication {
    pub(crate) fn new(config: ReplicationConfig) -> Self {
        Self {
            default_rate_hz: config.default_rate_hz,
            outbox_capacity: config.outbox_capacity.max(1),
            dropped: 0,
            entities: BTreeMap::new(),
            despawns: Vec::new(),
            outbox: VecDeque::new(),
            sequence: 0,
            handlers: BTreeMap::new(),
        }
    }

    /// Drop `entity` from the replicated set, queueing a despawn if the
    /// receiver has seen it.
    pub(crate) fn forget(&mut self, entity: Entity) {
        if let Some(entry) = self.entities.remove(&entity) {
            if entry.spawned {
                self.despawns.push((entity, entry.settings.priority));
            }
        }
    }

    /// Queue `envelope`, dropping the oldest one if the outbox is full.
    fn enqueue(&mut self, envelope: Envelope) {
        while self.outbox.len() >= self.outbox_capacity {
            let Some(oldest) = self.outbox.pop_front() else {
                break;
            };
            self.dropped += 1;
            warn!(
                channel = %oldest.channel,
                entity = %oldest.entity,
                capacity = self.outbox_capacity,
                dropped = self.dropped,
                "outbox full, dropped oldest envelope"
            );
        }
        self.outbox.push_back(envelope);
    }

    fn next_sequence(&mut self) -> u64 {
        self.sequence += 1;
        self.sequence
    }
}

impl std::fmt::Debug for Replication {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Replication")
            .field("replicated", &self.entities.len())
            .field("outbox", &self.outbox.len())
            .field("dropped", &self.dropped)
            .field("sequence", &self.sequence)
            .field("rpcs", &self.handlers.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl World {
    // ── Replication ─────────────────────────────────────────────────────────

    /// Start replicating `entity` at normal priority and the configured rate.
    ///
    /// # Errors
    ///
    /// [`EcsError::InvalidHandle`] for a dead entity.
    pub fn replicate_entity(&mut self, entity: Entity) -> EcsResult<()> {
        let settings =
            ReplicationSettings::new(ReplicationPriority::Normal, self.replication.default_rate_hz);
        self.replicate_entity_with(entity, settings)
    }

    /// Start replicating `entity`, or change its settings if already
    /// replicated.
    ///
    /// # Errors
    ///
    /// [`EcsError::InvalidHandle`] for a dead entity,
    /// [`EcsError::InvalidArgument`] for an invalid rate.
    pub fn replicate_entity_with(
        &mut self,
        entity: Entity,
        settings: ReplicationSettings,
    ) -> EcsResult<()> {
        self.ensure_alive(entity)?;
        settings.validate()?;
        self.replication
            .entities
            .entry(entity)
            .and_modify(|entry| entry.settings = settings)
            .or_insert_with(|| Replicated {
                settings,
                last_sent: BTreeMap::new(),
                spawned: false,
                since_send: 0.0,
            });
        debug!(world = %self.id, entity = %entity, priority = ?settings.priority, "replicating entity");
        Ok(())
    }

    /// Stop sending updates for `entity`. Returns `false` if it was not
    /// replicated. No despawn is sent.
    ///
    /// # Errors
    ///
    /// [`EcsError::InvalidHandle`] for a dead entity.
    pub fn stop_replicating_entity(&mut self, entity: Entity) -> EcsResult<bool> {
        self.ensure_alive(entity)?;
        Ok(self.replication.entities.remove(&entity).is_some())
    }

    /// Returns `true` if `entity` is replicated.
    #[must_use]
    pub fn is_replicated(&self, entity: Entity) -> bool {
        self.replication.entities.contains_key(&entity)
    }

    /// Number of replicated entities.
    #[must_use]
    pub fn replicated_count(&self) -> usize {
        self.replication.entities.len()
    }

    /// Take every queued envelope, oldest first.
    pub fn drain_outbox(&mut self) -> Vec<Envelope> {
        self.replication.outbox.drain(..).collect()
    }

    /// The oldest queued envelope, left in place.
    #[must_use]
    pub fn peek_envelope(&self) -> Option<&Envelope> {
        self.replication.outbox.front()
    }

    /// Take the oldest queued envelope.
    pub fn pop_envelope(&mut self) -> Option<Envelope> {
        self.replication.outbox.pop_front()
    }

    /// Number of queued envelopes.
    #[must_use]
    pub fn outbox_len(&self) -> usize {
        self.replication.outbox.len()
    }

    /// Envelopes dropped so far because the outbox was full.
    #[must_use]
    pub fn outbox_dropped(&self) -> u64 {
        self.replication.dropped
    }

    /// The network-sync phase. `wall_dt` is the unscaled frame delta.
    pub(crate) fn sync_replication(
        &mut self,
        wall_dt: f32,
        report: &mut FrameReport,
    ) -> EcsResult<()> {
        let mut deltas: Vec<(ReplicationPriority, ReplicationDelta)> = self
            .replication
            .despawns
            .drain(..)
            .map(|(entity, priority)| {
                let delta = ReplicationDelta {
                    sequence: 0,
                    frame: report.frame,
                    entity,
                    kind: DeltaKind::Despawn,
                    changed: Vec::new(),
                    removed: Vec::new(),
                };
                (priority, delta)
            })
            .collect();

        for (&entity, entry) in &mut self.replication.entities {
            entry.since_send += wall_dt;
            let interval = entry.settings.rate_hz.recip();
            if entry.spawned && entry.since_send < interval {
                continue;
            }

            let mut current = BTreeMap::new();
            let mut failure = None;
            for (&type_id, store) in &self.stores {
                if !self
                    .registry
                    .descriptor(type_id)
                    .is_some_and(|d| d.serializable)
                {
                    continue;
                }
                match store.encode_entry(entity) {
                    Some(Ok(bytes)) => {
                        current.insert(type_id, bytes);
                    }
                    Some(Err(err)) => {
                        failure = Some(err);
                        break;
                    }
                    None => {}
                }
            }
            if let Some(err) = failure {
                report.record_failure(self.id, Phase::NetworkSync, entity, err.to_string());
                continue;
            }

            let delta = if entry.spawned {
                let changed = current
                    .iter()
                    .filter(|(id, bytes)| entry.last_sent.get(*id) != Some(*bytes))
                    .map(|(&type_id, bytes)| ComponentPayload {
                        type_id,
                        data: bytes.clone(),
                    })
                    .collect();
                let removed = entry
                    .last_sent
                    .keys()
                    .filter(|id| !current.contains_key(*id))
                    .copied()
                    .collect();
                ReplicationDelta {
                    sequence: 0,
                    frame: report.frame,
                    entity,
                    kind: DeltaKind::Update,
                    changed,
                    removed,
                }
            } else {
                ReplicationDelta {
                    sequence: 0,
                    frame: report.frame,
                    entity,
                    kind: DeltaKind::Spawn,
                    changed: current
                        .iter()
                        .map(|(&type_id, bytes)| ComponentPayload {
                            type_id,
                            data: bytes.clone(),
                        })
                        .collect(),
                    removed: Vec::new(),
                }
            };

            entry.since_send = if entry.spawned {
                (entry.since_send - interval).min(interval)
            } else {
                0.0
            };
            entry.spawned = true;
            entry.last_sent = current;
            if !delta.is_empty() {
                deltas.push((entry.settings.priority, delta));
            }
        }

        deltas.sort_by(|a, b| b.0.cmp(&a.0));
        for (_, mut delta) in deltas {
            delta.sequence = self.replication.next_sequence();
            trace!(world = %self.id, entity = %delta.entity, kind = ?delta.kind, sequence = delta.sequence, "delta queued");
            let envelope = Envelope::delta(&delta).map_err(EcsError::from)?;
            self.replication.enqueue(envelope);
            report.deltas_queued += 1;
        }
        Ok(())
    }

    // ── RPC ─────────────────────────────────────────────────────────────────

    /// Register the handler for inbound calls to `name`, replacing any
    /// previous one.
    ///
    /// # Errors
    ///
    /// [`EcsError::InvalidArgument`] for an invalid RPC name.
    pub fn register_rpc<F>(&mut self, name: &str, handler: F) -> EcsResult<()>
    where
        F: Fn(&mut World, Entity, &[u8]) -> EcsResult<()> + Send + Sync + 'static,
    {
        channels::validate_rpc_name(name)?;
        self.replication
            .handlers
            .insert(name.to_string(), Arc::new(handler));
        debug!(world = %self.id, rpc = name, "rpc registered");
        Ok(())
    }

    /// Queue an outbound call to `name` concerning `entity`.
    ///
    /// # Errors
    ///
    /// [`EcsError::InvalidArgument`] for an unregistered name,
    /// [`EcsError::InvalidHandle`] for a dead entity.
    pub fn call_rpc(&mut self, name: &str, entity: Entity, payload: Vec<u8>) -> EcsResult<()> {
        if !self.replication.handlers.contains_key(name) {
            return Err(EcsError::invalid_argument(format!("unknown rpc `{name}`")));
        }
        self.ensure_alive(entity)?;
        let envelope = Envelope::rpc(name, entity, payload)?;
        self.replication.enqueue(envelope);
        Ok(())
    }

    /// Run the handler for an inbound RPC envelope. Call between updates.
    ///
    /// # Errors
    ///
    /// [`EcsError::InvalidArgument`] if the envelope is not an RPC or names
    /// an unregistered call, [`EcsError::InvalidHandle`] for a dead entity,
    /// and whatever the handler returns.
    pub fn dispatch_rpc(&mut self, envelope: &Envelope) -> EcsResult<()> {
        let name = envelope.rpc_name().ok_or_else(|| {
            EcsError::invalid_argument(format!("`{}` is not an rpc channel", envelope.channel))
        })?;
        let handler = self
            .replication
            .handlers
            .get(name)
            .cloned()
            .ok_or_else(|| EcsError::invalid_argument(format!("unknown rpc `{name}`")))?;
        self.ensure_alive(envelope.entity)?;
        handler(self, envelope.entity, &envelope.payload)
    }
}
