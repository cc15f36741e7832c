//! # Object Identifiers
//!
//! World objects are identified by a 64-bit GUID:
//! - Upper 16 bits: high type (what kind of object)
//! - Lower 48 bits: counter assigned by the host simulation
//!
//! Readers only ever hold GUIDs, never pointers to engine objects. A GUID is
//! resolved back to a live object by the owning context at the moment of
//! interaction.

use serde::{Deserialize, Serialize};

const COUNTER_BITS: u32 = 48;
const COUNTER_MASK: u64 = (1 << COUNTER_BITS) - 1;

/// Object category encoded in the high bits of a GUID.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u16)]
pub enum HighGuid {
    /// A player character.
    Player = 0x0000,
    /// A game object (chest, door, herb node, ...).
    GameObject = 0xF110,
    /// A transient spell effect placed in the world.
    DynamicObject = 0xF100,
    /// A creature (NPC or monster).
    Creature = 0xF130,
    /// A trigger volume.
    AreaTrigger = 0xF150,
}

impl HighGuid {
    const fn from_bits(bits: u16) -> Option<Self> {
        match bits {
            0x0000 => Some(Self::Player),
            0xF110 => Some(Self::GameObject),
            0xF100 => Some(Self::DynamicObject),
            0xF130 => Some(Self::Creature),
            0xF150 => Some(Self::AreaTrigger),
            _ => None,
        }
    }
}

/// Unique identifier for a world object.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(transparent)]
pub struct ObjectGuid(u64);

impl ObjectGuid {
    /// The null GUID. Never indexed by the grid.
    pub const EMPTY: Self = Self(0);

    /// Creates a GUID from its high type and counter.
    ///
    /// Counters wider than 48 bits are truncated.
    #[inline]
    #[must_use]
    pub const fn new(high: HighGuid, counter: u64) -> Self {
        Self(((high as u64) << COUNTER_BITS) | (counter & COUNTER_MASK))
    }

    /// Wraps a raw 64-bit value as handed over by the host.
    #[inline]
    #[must_use]
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Raw 64-bit value.
    #[inline]
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }

    /// Counter portion.
    #[inline]
    #[must_use]
    pub const fn counter(self) -> u64 {
        self.0 & COUNTER_MASK
    }

    /// High type, if the high bits name a known category.
    #[inline]
    #[must_use]
    pub const fn high(self) -> Option<HighGuid> {
        HighGuid::from_bits((self.0 >> COUNTER_BITS) as u16)
    }

    /// True for the null GUID.
    #[inline]
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl Default for ObjectGuid {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl std::fmt::Display for ObjectGuid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "0x{:016X}", self.0)
    }
}

/// Identifier of a world region ("map").
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RegionId(pub u32);

impl std::fmt::Display for RegionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "region#{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guid_roundtrip() {
        let guid = ObjectGuid::new(HighGuid::Creature, 12345);
        assert_eq!(guid.counter(), 12345);
        assert_eq!(guid.high(), Some(HighGuid::Creature));
        assert!(!guid.is_empty());
    }

    #[test]
    fn test_player_guid_is_not_empty() {
        // Player high bits are zero; counter zero is the only null value.
        let guid = ObjectGuid::new(HighGuid::Player, 1);
        assert_eq!(guid.high(), Some(HighGuid::Player));
        assert!(!guid.is_empty());
        assert!(ObjectGuid::EMPTY.is_empty());
    }

    #[test]
    fn test_counter_truncation() {
        let guid = ObjectGuid::new(HighGuid::GameObject, u64::MAX);
        assert_eq!(guid.counter(), COUNTER_MASK);
        assert_eq!(guid.high(), Some(HighGuid::GameObject));
    }

    #[test]
    fn test_unknown_high_bits() {
        let guid = ObjectGuid::from_raw(0x1234_0000_0000_0001);
        assert_eq!(guid.high(), None);
    }
}
