//! Domain events consumed from the external event bus
//!
//! The scene publishes avatar lifecycle events; metrics that care (reaction
//! time, classification, awareness) subscribe through the registry. Events
//! carry simulation timestamps assigned by the publisher.

use crate::sample::{EntityCategory, EntityId, Vec3};
use serde::{Deserialize, Serialize};

/// Operator's binary classification call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PredictedClass {
    Hostile,
    NonHostile,
}

impl PredictedClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            PredictedClass::Hostile => "hostile",
            PredictedClass::NonHostile => "non_hostile",
        }
    }
}

/// Avatar lifecycle event
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AvatarEvent {
    /// An avatar entered the scene
    Spawned {
        id: EntityId,
        category: EntityCategory,
        /// Simulation time of the spawn (seconds)
        timestamp: f64,
        position: Vec3,
    },
    /// The operator classified an avatar
    Classified {
        id: EntityId,
        /// Ground truth at classification time
        category: EntityCategory,
        predicted: PredictedClass,
        timestamp: f64,
        position: Vec3,
    },
    /// An avatar left the scene
    Despawned {
        id: EntityId,
        category: EntityCategory,
        timestamp: f64,
        /// Whether the avatar was never classified while present
        missed: bool,
    },
}

impl AvatarEvent {
    pub fn id(&self) -> EntityId {
        match self {
            AvatarEvent::Spawned { id, .. }
            | AvatarEvent::Classified { id, .. }
            | AvatarEvent::Despawned { id, .. } => *id,
        }
    }

    pub fn timestamp(&self) -> f64 {
        match self {
            AvatarEvent::Spawned { timestamp, .. }
            | AvatarEvent::Classified { timestamp, .. }
            | AvatarEvent::Despawned { timestamp, .. } => *timestamp,
        }
    }
}
