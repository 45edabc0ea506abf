//! Visual entity records and the arenas that own them.
//!
//! Every record carries a stable [`EntityId`]; renderers address records by
//! id each frame instead of relying on scene-graph membership.

use crate::config::Populations;
use nalgebra::Vector3;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Stable handle of an entity record within its arena.
pub type EntityId = u64;

/// Records stored in an [`EntityArena`].
pub trait Identified {
    /// Returns the record's handle.
    fn id(&self) -> EntityId;
}

/// Insertion-ordered collection with monotonically allocated ids.
///
/// Ids are never reused, even after `clear`, so a stale handle can never
/// alias a newer record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityArena<T> {
    items: Vec<T>,
    next_id: EntityId,
}

impl<T> Default for EntityArena<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            next_id: 0,
        }
    }
}

impl<T: Identified> EntityArena<T> {
    /// Creates an empty arena.
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates an id, builds the record with it and stores it.
    pub fn insert_with(&mut self, build: impl FnOnce(EntityId) -> T) -> EntityId {
        let id = self.next_id;
        self.next_id += 1;
        self.items.push(build(id));
        id
    }

    /// Returns the record with the given id.
    pub fn get(&self, id: EntityId) -> Option<&T> {
        self.items.iter().find(|item| item.id() == id)
    }

    /// Returns the record with the given id mutably.
    #[cfg(test)]
    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut T> {
        self.items.iter_mut().find(|item| item.id() == id)
    }

    /// Iterates in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.items.iter()
    }

    /// Iterates mutably in insertion order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut T> {
        self.items.iter_mut()
    }

    /// Keeps only the records for which `keep` returns true.
    pub fn retain(&mut self, keep: impl FnMut(&T) -> bool) {
        self.items.retain(keep);
    }

    /// Removes every record. Id allocation continues from where it was.
    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Returns the records as a slice.
    pub fn as_slice(&self) -> &[T] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Ion species gated by a membrane channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChannelKind {
    Sodium,
    Potassium,
    Calcium,
}

/// A membrane ion channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IonChannel {
    pub id: EntityId,
    pub kind: ChannelKind,

    /// Placement on the terminal membrane (synapse-local frame)
    pub site: Vector3<f64>,

    pub is_open: bool,
}

impl Identified for IonChannel {
    fn id(&self) -> EntityId {
        self.id
    }
}

/// A synaptic vesicle in the presynaptic terminal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vesicle {
    pub id: EntityId,

    /// Docking position restored on reset
    pub original_position: Vector3<f64>,

    /// Current position
    pub position: Vector3<f64>,

    /// Clock time of release; `Some` exactly when released
    pub release_time: Option<Duration>,
}

impl Vesicle {
    /// Returns true once the vesicle has fused and released its contents.
    pub fn released(&self) -> bool {
        self.release_time.is_some()
    }

    /// Marks the vesicle released at `now`.
    pub fn release(&mut self, now: Duration) {
        self.release_time = Some(now);
    }

    /// Returns the vesicle to its docked, unreleased state.
    pub fn restore(&mut self) {
        self.position = self.original_position;
        self.release_time = None;
    }
}

impl Identified for Vesicle {
    fn id(&self) -> EntityId {
        self.id
    }
}

/// A neurotransmitter particle crossing the synaptic cleft.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Neurotransmitter {
    pub id: EntityId,
    pub position: Vector3<f64>,

    /// Displacement per frame
    pub velocity: Vector3<f64>,

    pub birth: Duration,
    pub lifetime: Duration,

    /// Presentation outputs, recomputed every tick
    pub opacity: f64,
    pub glow: f64,
    pub scale: f64,
}

impl Neurotransmitter {
    /// Time since birth; never negative.
    pub fn age(&self, now: Duration) -> Duration {
        now.saturating_sub(self.birth)
    }

    /// Returns true once the particle has outlived its lifetime.
    pub fn is_expired(&self, now: Duration) -> bool {
        self.age(now) >= self.lifetime
    }

    /// Fraction of the lifetime elapsed, clamped to `[0, 1]`.
    pub fn fade(&self, now: Duration) -> f64 {
        if self.lifetime.is_zero() {
            return 1.0;
        }
        (self.age(now).as_secs_f64() / self.lifetime.as_secs_f64()).min(1.0)
    }
}

impl Identified for Neurotransmitter {
    fn id(&self) -> EntityId {
        self.id
    }
}

/// Postsynaptic receptor subtype.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReceptorKind {
    Ampa,
    Nmda,
}

/// A postsynaptic receptor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Receptor {
    pub id: EntityId,
    pub kind: ReceptorKind,
    pub site: Vector3<f64>,
    pub bound: bool,
}

impl Identified for Receptor {
    fn id(&self) -> EntityId {
        self.id
    }
}

/// A depolarization pulse travelling along the axon.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionPotential {
    pub id: EntityId,

    /// Coordinate along the axon axis (synapse at 0)
    pub position: f64,

    /// Advance per frame
    pub speed: f64,

    pub amplitude: f64,
    pub active: bool,
}

impl Identified for ActionPotential {
    fn id(&self) -> EntityId {
        self.id
    }
}

/// Membrane placement bounds in the synapse-local frame.
const CHANNEL_X: f64 = -0.9;
const RECEPTOR_X: f64 = 0.9;
const MEMBRANE_HALF_SPAN: f64 = 0.75;
const VESICLE_X_MIN: f64 = -0.8;
const VESICLE_X_SPAN: f64 = 0.6;

/// The long-lived entities created at setup: channels, vesicles, receptors.
///
/// None of these are destroyed before teardown; each cycle only flips
/// their lifecycle flags.
#[derive(Debug, Clone, Default)]
pub struct EntityStore {
    pub channels: EntityArena<IonChannel>,
    pub vesicles: EntityArena<Vesicle>,
    pub receptors: EntityArena<Receptor>,
}

impl EntityStore {
    /// Creates the setup populations with randomized membrane placement.
    pub fn populate<R: Rng + ?Sized>(populations: &Populations, rng: &mut R) -> Self {
        let mut store = Self::default();

        let channel_counts = [
            (ChannelKind::Sodium, populations.sodium_channels),
            (ChannelKind::Potassium, populations.potassium_channels),
            (ChannelKind::Calcium, populations.calcium_channels),
        ];
        for (kind, count) in channel_counts {
            for _ in 0..count {
                let site = membrane_site(CHANNEL_X, rng);
                store.channels.insert_with(|id| IonChannel {
                    id,
                    kind,
                    site,
                    is_open: false,
                });
            }
        }

        for _ in 0..populations.vesicles {
            let x = VESICLE_X_MIN + rng.gen::<f64>() * VESICLE_X_SPAN;
            let dock = membrane_site(x, rng);
            store.vesicles.insert_with(|id| Vesicle {
                id,
                original_position: dock,
                position: dock,
                release_time: None,
            });
        }

        let receptor_counts = [
            (ReceptorKind::Ampa, populations.ampa_receptors),
            (ReceptorKind::Nmda, populations.nmda_receptors),
        ];
        for (kind, count) in receptor_counts {
            for _ in 0..count {
                let site = membrane_site(RECEPTOR_X, rng);
                store.receptors.insert_with(|id| Receptor {
                    id,
                    kind,
                    site,
                    bound: false,
                });
            }
        }

        store
    }

    /// Opens every channel of `kind`. Returns how many changed state.
    pub fn open_channels(&mut self, kind: ChannelKind) -> usize {
        let mut opened = 0;
        for channel in self.channels.iter_mut().filter(|c| c.kind == kind) {
            if !channel.is_open {
                channel.is_open = true;
                opened += 1;
            }
        }
        opened
    }

    /// Binds the first unbound receptor in iteration order.
    pub fn bind_first_unbound(&mut self) -> Option<EntityId> {
        let receptor = self.receptors.iter_mut().find(|r| !r.bound)?;
        receptor.bound = true;
        Some(receptor.id)
    }

    /// Returns channels, receptors and vesicles to their initial state.
    pub fn restore(&mut self) {
        for channel in self.channels.iter_mut() {
            channel.is_open = false;
        }
        for receptor in self.receptors.iter_mut() {
            receptor.bound = false;
        }
        for vesicle in self.vesicles.iter_mut() {
            vesicle.restore();
        }
    }

    /// Returns true when every record is in its initial lifecycle state.
    pub fn is_pristine(&self) -> bool {
        self.channels.iter().all(|c| !c.is_open)
            && self.receptors.iter().all(|r| !r.bound)
            && self.vesicles.iter().all(|v| !v.released())
    }
}

fn membrane_site<R: Rng + ?Sized>(x: f64, rng: &mut R) -> Vector3<f64> {
    Vector3::new(
        x,
        (rng.gen::<f64>() - 0.5) * 2.0 * MEMBRANE_HALF_SPAN,
        (rng.gen::<f64>() - 0.5) * 2.0 * MEMBRANE_HALF_SPAN,
    )
}
