//! # Entity Snapshots
//!
//! Plain-data copies of world objects, captured by the writer during a rebuild.
//!
//! ## Rules
//!
//! 1. **Value types** - copying a snapshot never touches the engine object.
//! 2. **Closed set of kinds** - callers `match` exhaustively, no downcasts.
//! 3. **Immutable once published** - the grid hands out `&EntitySnapshot`
//!    or copies, never `&mut`.

use phalanx_shared::{ObjectGuid, Position, Vec3};

/// Number of snapshot kinds.
pub const KIND_COUNT: usize = 5;

/// The five kinds of world objects the grid indexes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum EntityKind {
    /// NPCs and monsters.
    Creature = 0,
    /// Player characters (including other agents).
    Player = 1,
    /// Chests, doors, herb and ore nodes.
    GameObject = 2,
    /// Spell effects placed on the ground.
    TransientEffect = 3,
    /// Invisible trigger volumes.
    TriggerVolume = 4,
}

impl EntityKind {
    /// All kinds, in index order.
    pub const ALL: [Self; KIND_COUNT] = [
        Self::Creature,
        Self::Player,
        Self::GameObject,
        Self::TransientEffect,
        Self::TriggerVolume,
    ];

    /// Dense index, `0..KIND_COUNT`.
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Mask containing only this kind.
    #[inline]
    #[must_use]
    pub const fn mask(self) -> KindMask {
        KindMask(1 << self as u8)
    }

    /// Lowercase name, used in stats and logs.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Creature => "creature",
            Self::Player => "player",
            Self::GameObject => "gameobject",
            Self::TransientEffect => "transient_effect",
            Self::TriggerVolume => "trigger_volume",
        }
    }
}

/// Set of entity kinds a query is interested in.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct KindMask(u8);

impl KindMask {
    /// Matches nothing. Queries with this mask return empty results.
    pub const NONE: Self = Self(0);
    /// Creatures only.
    pub const CREATURE: Self = EntityKind::Creature.mask();
    /// Players only.
    pub const PLAYER: Self = EntityKind::Player.mask();
    /// Game objects only.
    pub const GAME_OBJECT: Self = EntityKind::GameObject.mask();
    /// Transient effects only.
    pub const TRANSIENT_EFFECT: Self = EntityKind::TransientEffect.mask();
    /// Trigger volumes only.
    pub const TRIGGER_VOLUME: Self = EntityKind::TriggerVolume.mask();
    /// Creatures and players.
    pub const UNITS: Self = Self(Self::CREATURE.0 | Self::PLAYER.0);
    /// Every kind.
    pub const ALL: Self = Self((1 << KIND_COUNT) - 1);

    /// True if `kind` is part of the mask.
    #[inline]
    #[must_use]
    pub const fn contains(self, kind: EntityKind) -> bool {
        self.0 & (1 << kind as u8) != 0
    }

    /// True if no kind is selected.
    #[inline]
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 & Self::ALL.0 == 0
    }

    /// Union of two masks.
    #[inline]
    #[must_use]
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    /// Iterates the selected kinds in index order.
    pub fn kinds(self) -> impl Iterator<Item = EntityKind> {
        EntityKind::ALL.into_iter().filter(move |k| self.contains(*k))
    }
}

impl std::ops::BitOr for KindMask {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self {
        self.union(rhs)
    }
}

/// Coarse status bits captured with every snapshot.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct StatusFlags(u16);

impl StatusFlags {
    /// No flags.
    pub const EMPTY: Self = Self(0);
    /// Unit is alive / object is active.
    pub const ALIVE: Self = Self(1 << 0);
    /// Hostile to agents.
    pub const HOSTILE: Self = Self(1 << 1);
    /// Friendly to agents.
    pub const FRIENDLY: Self = Self(1 << 2);
    /// Corpse already looted.
    pub const LOOTED: Self = Self(1 << 3);
    /// Currently in combat.
    pub const IN_COMBAT: Self = Self(1 << 4);
    /// Has loot available.
    pub const LOOTABLE: Self = Self(1 << 5);
    /// Offers or completes quests.
    pub const QUEST_GIVER: Self = Self(1 << 6);
    /// Sells items.
    pub const VENDOR: Self = Self(1 << 7);
    /// Corpse can be skinned.
    pub const SKINNABLE: Self = Self(1 << 8);
    /// Controlled by a player or agent.
    pub const PLAYER_CONTROLLED: Self = Self(1 << 9);

    /// Raw bits.
    #[inline]
    #[must_use]
    pub const fn bits(self) -> u16 {
        self.0
    }

    /// True if every bit of `other` is set.
    #[inline]
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Adds the bits of `other`.
    #[inline]
    pub fn insert(&mut self, other: Self) {
        self.0 |= other.0;
    }

    /// Clears the bits of `other`.
    #[inline]
    pub fn remove(&mut self, other: Self) {
        self.0 &= !other.0;
    }
}

impl std::ops::BitOr for StatusFlags {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// Fields every snapshot carries.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SnapshotHeader {
    /// Identity of the engine object.
    pub guid: ObjectGuid,
    /// Position at capture time.
    pub position: Position,
    /// Status at capture time.
    pub flags: StatusFlags,
    /// Generation of the buffer this snapshot was published in.
    ///
    /// Stamped by the grid during rebuild; whatever the capturer puts here is
    /// overwritten.
    pub generation: u64,
}

impl SnapshotHeader {
    /// Header for a freshly captured object (generation is filled in later).
    #[must_use]
    pub const fn new(guid: ObjectGuid, position: Position, flags: StatusFlags) -> Self {
        Self {
            guid,
            position,
            flags,
            generation: 0,
        }
    }
}

/// Creature-specific state.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CreatureSnapshot {
    /// Common fields.
    pub header: SnapshotHeader,
    /// Template entry.
    pub entry: u32,
    /// Level.
    pub level: u8,
    /// Health as a fraction in `0.0..=1.0`.
    pub health: f32,
    /// Faction template.
    pub faction: u32,
    /// Elite or boss.
    pub elite: bool,
    /// Current victim, `EMPTY` if none.
    pub target: ObjectGuid,
}

/// Player-specific state.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlayerSnapshot {
    /// Common fields.
    pub header: SnapshotHeader,
    /// Level.
    pub level: u8,
    /// Class id.
    pub class: u8,
    /// Health as a fraction in `0.0..=1.0`.
    pub health: f32,
    /// Mana/energy/rage as a fraction in `0.0..=1.0`.
    pub power: f32,
    /// Faction template.
    pub faction: u32,
    /// Group id, `0` if ungrouped.
    pub group: u32,
}

/// Game-object-specific state.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GameObjectSnapshot {
    /// Common fields.
    pub header: SnapshotHeader,
    /// Template entry.
    pub entry: u32,
    /// Object type (chest, door, node, ...).
    pub object_type: u8,
    /// Maximum distance at which it can be used.
    pub interaction_range: f32,
    /// Engine state byte (ready, active, ...).
    pub state: u8,
}

/// Transient spell-effect state.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TransientEffectSnapshot {
    /// Common fields.
    pub header: SnapshotHeader,
    /// Spell that created the effect.
    pub spell_id: u32,
    /// Who cast it.
    pub caster: ObjectGuid,
    /// Area radius.
    pub radius: f32,
    /// Remaining lifetime in milliseconds.
    pub remaining_ms: u32,
}

/// Trigger-volume state.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TriggerVolumeSnapshot {
    /// Common fields.
    pub header: SnapshotHeader,
    /// Trigger id.
    pub trigger_id: u32,
    /// Cylinder radius.
    pub radius: f32,
    /// Cylinder height.
    pub height: f32,
}

/// One captured world object.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum EntitySnapshot {
    /// See [`CreatureSnapshot`].
    Creature(CreatureSnapshot),
    /// See [`PlayerSnapshot`].
    Player(PlayerSnapshot),
    /// See [`GameObjectSnapshot`].
    GameObject(GameObjectSnapshot),
    /// See [`TransientEffectSnapshot`].
    TransientEffect(TransientEffectSnapshot),
    /// See [`TriggerVolumeSnapshot`].
    TriggerVolume(TriggerVolumeSnapshot),
}

impl EntitySnapshot {
    /// Which kind this is.
    #[inline]
    #[must_use]
    pub const fn kind(&self) -> EntityKind {
        match self {
            Self::Creature(_) => EntityKind::Creature,
            Self::Player(_) => EntityKind::Player,
            Self::GameObject(_) => EntityKind::GameObject,
            Self::TransientEffect(_) => EntityKind::TransientEffect,
            Self::TriggerVolume(_) => EntityKind::TriggerVolume,
        }
    }

    /// Common fields.
    #[inline]
    #[must_use]
    pub const fn header(&self) -> &SnapshotHeader {
        match self {
            Self::Creature(s) => &s.header,
            Self::Player(s) => &s.header,
            Self::GameObject(s) => &s.header,
            Self::TransientEffect(s) => &s.header,
            Self::TriggerVolume(s) => &s.header,
        }
    }

    pub(crate) fn header_mut(&mut self) -> &mut SnapshotHeader {
        match self {
            Self::Creature(s) => &mut s.header,
            Self::Player(s) => &mut s.header,
            Self::GameObject(s) => &mut s.header,
            Self::TransientEffect(s) => &mut s.header,
            Self::TriggerVolume(s) => &mut s.header,
        }
    }

    /// GUID of the captured object.
    #[inline]
    #[must_use]
    pub const fn guid(&self) -> ObjectGuid {
        self.header().guid
    }

    /// Position at capture time.
    #[inline]
    #[must_use]
    pub const fn position(&self) -> Position {
        self.header().position
    }

    /// Status flags at capture time.
    #[inline]
    #[must_use]
    pub const fn flags(&self) -> StatusFlags {
        self.header().flags
    }

    /// Generation of the buffer this snapshot belongs to.
    #[inline]
    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.header().generation
    }

    /// Shorthand for `flags().contains(StatusFlags::ALIVE)`.
    #[inline]
    #[must_use]
    pub const fn is_alive(&self) -> bool {
        self.flags().contains(StatusFlags::ALIVE)
    }

    /// Shorthand for `flags().contains(StatusFlags::HOSTILE)`.
    #[inline]
    #[must_use]
    pub const fn is_hostile(&self) -> bool {
        self.flags().contains(StatusFlags::HOSTILE)
    }

    /// Health fraction for units, `None` for everything else.
    #[must_use]
    pub const fn health(&self) -> Option<f32> {
        match self {
            Self::Creature(c) => Some(c.health),
            Self::Player(p) => Some(p.health),
            _ => None,
        }
    }

    /// Faction for units, `None` for everything else.
    #[must_use]
    pub const fn faction(&self) -> Option<u32> {
        match self {
            Self::Creature(c) => Some(c.faction),
            Self::Player(p) => Some(p.faction),
            _ => None,
        }
    }

    /// Interaction range for game objects, `None` for everything else.
    #[must_use]
    pub const fn interaction_range(&self) -> Option<f32> {
        match self {
            Self::GameObject(g) => Some(g.interaction_range),
            _ => None,
        }
    }

    /// Squared 3D distance from `point` to this snapshot.
    #[inline]
    #[must_use]
    pub fn distance_squared_to(&self, point: Vec3) -> f32 {
        self.position().point().distance_squared(point)
    }
}

/// An engine-side object that can be captured into a snapshot.
///
/// Implemented by whatever the host simulation enumerates. Returning `None`
/// means "not live or not of interest" and the object is skipped.
pub trait WorldObject {
    /// Captures the object's current state by value.
    fn capture(&self) -> Option<EntitySnapshot>;
}

impl WorldObject for EntitySnapshot {
    fn capture(&self) -> Option<EntitySnapshot> {
        Some(*self)
    }
}

impl<T: WorldObject + ?Sized> WorldObject for &T {
    fn capture(&self) -> Option<EntitySnapshot> {
        (**self).capture()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use phalanx_shared::HighGuid;

    fn creature() -> EntitySnapshot {
        EntitySnapshot::Creature(CreatureSnapshot {
            header: SnapshotHeader::new(
                ObjectGuid::new(HighGuid::Creature, 7),
                Position::at(1.0, 2.0, 3.0),
                StatusFlags::ALIVE | StatusFlags::HOSTILE,
            ),
            entry: 299,
            level: 5,
            health: 0.5,
            faction: 14,
            elite: false,
            target: ObjectGuid::EMPTY,
        })
    }

    #[test]
    fn test_kind_mask() {
        assert!(KindMask::UNITS.contains(EntityKind::Creature));
        assert!(KindMask::UNITS.contains(EntityKind::Player));
        assert!(!KindMask::UNITS.contains(EntityKind::GameObject));
        assert!(KindMask::NONE.is_empty());
        assert_eq!(KindMask::ALL.kinds().count(), KIND_COUNT);
        assert_eq!(
            (KindMask::CREATURE | KindMask::TRIGGER_VOLUME).kinds().collect::<Vec<_>>(),
            vec![EntityKind::Creature, EntityKind::TriggerVolume]
        );
    }

    #[test]
    fn test_status_flags() {
        let mut flags = StatusFlags::ALIVE | StatusFlags::LOOTABLE;
        assert!(flags.contains(StatusFlags::ALIVE));
        flags.remove(StatusFlags::ALIVE);
        assert!(!flags.contains(StatusFlags::ALIVE));
        flags.insert(StatusFlags::LOOTED);
        assert!(flags.contains(StatusFlags::LOOTED | StatusFlags::LOOTABLE));
    }

    #[test]
    fn test_snapshot_accessors() {
        let snap = creature();
        assert_eq!(snap.kind(), EntityKind::Creature);
        assert!(snap.is_alive());
        assert!(snap.is_hostile());
        assert_eq!(snap.health(), Some(0.5));
        assert_eq!(snap.faction(), Some(14));
        assert_eq!(snap.interaction_range(), None);
        assert_eq!(snap.guid().counter(), 7);
    }

    #[test]
    fn test_copy_is_independent() {
        let original = creature();
        let mut copy = original;
        copy.header_mut().generation = 42;
        assert_eq!(original.generation(), 0);
        assert_eq!(copy.generation(), 42);
    }
}
