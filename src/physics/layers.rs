//! Collision layers and filtering
//!
//! A fixed-capacity table of named layers. Each layer owns one bit and a mask of
//! the layers it collides with; the collision relation is kept symmetric.

use rapier3d::prelude::{Group, InteractionGroups};
use serde::{Deserialize, Serialize};

use super::error::{PhysicsError, Result};

/// Maximum number of layers, one per bit of the collision mask
pub const MAX_LAYERS: usize = 32;

/// Id of the built-in layer every collider falls back to
pub const DEFAULT_LAYER: u32 = 0;

/// A named collision layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhysicsLayer {
    pub layer_id: u32,
    pub name: String,
    /// `1 << layer_id`
    pub bit_value: u32,
    /// Bits of every layer this layer collides with
    pub collides_with: u32,
    /// Built-in layers cannot be removed or renamed
    #[serde(default)]
    pub reserved: bool,
}

impl PhysicsLayer {
    fn new(layer_id: u32, name: impl Into<String>) -> Self {
        let bit_value = 1 << layer_id;
        Self {
            layer_id,
            name: name.into(),
            bit_value,
            collides_with: bit_value,
            reserved: false,
        }
    }

    /// A layer is usable when it has a name and a bit
    #[must_use]
    pub fn is_valid(&self) -> bool {
        !self.name.is_empty() && self.bit_value > 0
    }
}

/// Filter data attached to every collider and character controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollisionFilter {
    /// Own layer bit
    pub group: u32,
    /// Layers this shape collides with
    pub mask: u32,
}

impl CollisionFilter {
    /// Filter that collides with everything
    pub const ALL: Self = Self {
        group: u32::MAX,
        mask: u32::MAX,
    };

    /// Convert into rapier interaction groups.
    ///
    /// Rapier tests `(a.group & b.mask) != 0 && (b.group & a.mask) != 0`.
    #[must_use]
    pub fn interaction_groups(&self) -> InteractionGroups {
        InteractionGroups::new(
            Group::from_bits_truncate(self.group),
            Group::from_bits_truncate(self.mask),
        )
    }
}

/// Registry of collision layers with a symmetric collision matrix
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhysicsLayerManager {
    /// Layers sorted by id
    layers: Vec<PhysicsLayer>,
}

impl PhysicsLayerManager {
    /// Create a manager holding only the reserved "Default" layer
    #[must_use]
    pub fn new() -> Self {
        let mut default_layer = PhysicsLayer::new(DEFAULT_LAYER, "Default");
        default_layer.reserved = true;
        Self {
            layers: vec![default_layer],
        }
    }

    /// Register a layer and return its id.
    ///
    /// If the name is already registered the existing id is returned. New layers
    /// collide with themselves, or with every layer when `set_collisions` is set.
    pub fn add_layer(&mut self, name: &str, set_collisions: bool) -> Result<u32> {
        if name.is_empty() {
            return Err(PhysicsError::InvalidConfig(
                "layer name cannot be empty".to_string(),
            ));
        }
        if let Some(existing) = self.layer_by_name(name) {
            return Ok(existing.layer_id);
        }

        let layer_id = self
            .next_layer_id()
            .ok_or(PhysicsError::LayerCapacityExceeded(MAX_LAYERS))?;
        let index = self
            .layers
            .iter()
            .position(|layer| layer.layer_id > layer_id)
            .unwrap_or(self.layers.len());
        self.layers.insert(index, PhysicsLayer::new(layer_id, name));

        if set_collisions {
            let others: Vec<u32> = self.layers.iter().map(|l| l.layer_id).collect();
            for other in others {
                self.set_layer_collision(layer_id, other, true);
            }
        }

        log::debug!("Added collision layer '{name}' ({layer_id})");
        Ok(layer_id)
    }

    /// Remove a layer and clear its bit from every other layer
    pub fn remove_layer(&mut self, layer_id: u32) -> Result<()> {
        let layer = self
            .layer(layer_id)
            .ok_or(PhysicsError::InvalidLayer(layer_id))?;
        if layer.reserved {
            return Err(PhysicsError::ReservedLayer(layer_id));
        }

        let bit_value = layer.bit_value;
        for other in &mut self.layers {
            other.collides_with &= !bit_value;
        }
        self.layers.retain(|l| l.layer_id != layer_id);
        Ok(())
    }

    /// Rename a layer.
    ///
    /// An empty name clears the layer and disables all of its collisions with
    /// other layers. A name used by another layer is rejected.
    pub fn update_layer_name(&mut self, layer_id: u32, new_name: &str) -> Result<()> {
        let layer = self
            .layer(layer_id)
            .ok_or(PhysicsError::InvalidLayer(layer_id))?;
        if layer.reserved {
            return Err(PhysicsError::ReservedLayer(layer_id));
        }
        if !new_name.is_empty()
            && self
                .layer_by_name(new_name)
                .is_some_and(|other| other.layer_id != layer_id)
        {
            return Err(PhysicsError::LayerNameInUse(new_name.to_string()));
        }

        if new_name.is_empty() {
            let colliding: Vec<u32> = self
                .layer_collisions(layer_id)
                .iter()
                .map(|l| l.layer_id)
                .collect();
            for other in colliding {
                self.set_layer_collision(layer_id, other, false);
            }
        }

        if let Some(layer) = self.layer_mut(layer_id) {
            layer.name = new_name.to_string();
        }
        Ok(())
    }

    /// Enable or disable collision between two layers, updating both sides
    pub fn set_layer_collision(&mut self, layer_id: u32, other_layer_id: u32, should_collide: bool) {
        let (Some(layer), Some(other)) = (self.layer(layer_id), self.layer(other_layer_id)) else {
            log::warn!("Cannot set collision between unknown layers {layer_id} and {other_layer_id}");
            return;
        };
        let (bit, other_bit) = (layer.bit_value, other.bit_value);

        if self.should_collide(layer_id, other_layer_id) == should_collide
            && self.should_collide(other_layer_id, layer_id) == should_collide
        {
            return;
        }

        for entry in &mut self.layers {
            let mask = if entry.layer_id == layer_id {
                other_bit
            } else if entry.layer_id == other_layer_id {
                bit
            } else {
                continue;
            };
            if should_collide {
                entry.collides_with |= mask;
            } else {
                entry.collides_with &= !mask;
            }
        }
    }

    /// Other layers this layer collides with
    #[must_use]
    pub fn layer_collisions(&self, layer_id: u32) -> Vec<&PhysicsLayer> {
        let Some(layer) = self.layer(layer_id) else {
            return Vec::new();
        };
        self.layers
            .iter()
            .filter(|other| other.layer_id != layer_id && layer.collides_with & other.bit_value != 0)
            .collect()
    }

    /// Look up a layer by id
    #[must_use]
    pub fn layer(&self, layer_id: u32) -> Option<&PhysicsLayer> {
        self.layers.iter().find(|l| l.layer_id == layer_id)
    }

    fn layer_mut(&mut self, layer_id: u32) -> Option<&mut PhysicsLayer> {
        self.layers.iter_mut().find(|l| l.layer_id == layer_id)
    }

    /// Look up a layer by name
    #[must_use]
    pub fn layer_by_name(&self, name: &str) -> Option<&PhysicsLayer> {
        self.layers.iter().find(|l| l.name == name)
    }

    /// Whether `layer_id` refers to a named, registered layer
    #[must_use]
    pub fn is_layer_valid(&self, layer_id: u32) -> bool {
        self.layer(layer_id).is_some_and(PhysicsLayer::is_valid)
    }

    /// Pure bitmask test: does `layer_id` collide with `other_layer_id`?
    #[must_use]
    pub fn should_collide(&self, layer_id: u32, other_layer_id: u32) -> bool {
        match (self.layer(layer_id), self.layer(other_layer_id)) {
            (Some(layer), Some(other)) => layer.collides_with & other.bit_value != 0,
            _ => false,
        }
    }

    /// Filter data for a layer, falling back to the default layer
    #[must_use]
    pub fn filter_for(&self, layer_id: u32) -> CollisionFilter {
        let layer = match self.layer(layer_id) {
            Some(layer) => layer,
            None => {
                log::warn!("Invalid collision layer {layer_id}, using the default layer");
                match self.layer(DEFAULT_LAYER) {
                    Some(layer) => layer,
                    None => return CollisionFilter::ALL,
                }
            }
        };
        CollisionFilter {
            group: layer.bit_value,
            mask: layer.collides_with,
        }
    }

    /// All registered layers, sorted by id
    #[must_use]
    pub fn layers(&self) -> &[PhysicsLayer] {
        &self.layers
    }

    /// Names of all registered layers, sorted by id
    pub fn layer_names(&self) -> impl Iterator<Item = &str> {
        self.layers.iter().map(|l| l.name.as_str())
    }

    /// Drop every user layer, keeping only "Default"
    pub fn clear(&mut self) {
        *self = Self::new();
    }

    /// Check a deserialized table: unique power-of-two bits, default layer present
    pub fn validate(&self) -> Result<()> {
        if self.layers.len() > MAX_LAYERS {
            return Err(PhysicsError::LayerCapacityExceeded(MAX_LAYERS));
        }
        if !self.layer(DEFAULT_LAYER).is_some_and(|l| l.reserved) {
            return Err(PhysicsError::InvalidLayer(DEFAULT_LAYER));
        }
        let mut seen = 0u32;
        for layer in &self.layers {
            let expected = 1u32.checked_shl(layer.layer_id).unwrap_or(0);
            if layer.bit_value != expected || seen & expected != 0 {
                return Err(PhysicsError::InvalidLayer(layer.layer_id));
            }
            seen |= expected;
        }
        Ok(())
    }

    fn next_layer_id(&self) -> Option<u32> {
        (0..MAX_LAYERS as u32).find(|id| self.layer(*id).is_none())
    }
}

impl Default for PhysicsLayerManager {
    fn default() -> Self {
        Self::new()
    }
}
