//! Stateless helpers over one pinned buffer.
//!
//! Pass a [`GridView`](crate::GridView) (it derefs to [`GridBuffer`]) so a
//! sequence of helper calls all answer from the same generation.

use phalanx_shared::{ObjectGuid, Vec3};

use crate::grid::GridBuffer;
use crate::snapshot::{EntitySnapshot, KindMask};

/// Snapshots of the selected kinds within `radius` of `center`, in cell order.
#[must_use]
pub fn within_radius<'a>(
    buffer: &'a GridBuffer,
    center: Vec3,
    radius: f32,
    mask: KindMask,
) -> Vec<&'a EntitySnapshot> {
    let mut out = Vec::new();
    buffer.for_each_within(center, radius, mask, |s| out.push(s));
    out
}

/// Same as [`within_radius`], nearest first. Equal distances are ordered by
/// GUID so the result is deterministic.
#[must_use]
pub fn sorted_by_distance<'a>(
    buffer: &'a GridBuffer,
    center: Vec3,
    radius: f32,
    mask: KindMask,
) -> Vec<&'a EntitySnapshot> {
    let center = buffer.geometry().clamp_center(center);
    let mut out: Vec<(f32, &EntitySnapshot)> = Vec::new();
    buffer.for_each_within(center, radius, mask, |s| {
        out.push((s.distance_squared_to(center), s));
    });
    out.sort_unstable_by(|(da, a), (db, b)| da.total_cmp(db).then_with(|| a.guid().cmp(&b.guid())));
    out.into_iter().map(|(_, s)| s).collect()
}

/// Closest snapshot of the selected kinds within `radius` that satisfies
/// `predicate`.
#[must_use]
pub fn nearest<'a>(
    buffer: &'a GridBuffer,
    center: Vec3,
    radius: f32,
    mask: KindMask,
    mut predicate: impl FnMut(&EntitySnapshot) -> bool,
) -> Option<&'a EntitySnapshot> {
    let center = buffer.geometry().clamp_center(center);
    let mut best: Option<(f32, &'a EntitySnapshot)> = None;
    buffer.for_each_within(center, radius, mask, |s| {
        if !predicate(s) {
            return;
        }
        let d = s.distance_squared_to(center);
        let better = match best {
            None => true,
            Some((bd, b)) => d < bd || (d == bd && s.guid() < b.guid()),
        };
        if better {
            best = Some((d, s));
        }
    });
    best.map(|(_, s)| s)
}

/// Snapshot with this GUID, if it was published in this buffer.
#[inline]
#[must_use]
pub fn resolve_guid(buffer: &GridBuffer, guid: ObjectGuid) -> Option<&EntitySnapshot> {
    buffer.get(guid)
}

/// Resolves a batch of GUIDs, keeping input order and dropping unknown ones.
#[must_use]
pub fn resolve_guids<'a>(buffer: &'a GridBuffer, guids: &[ObjectGuid]) -> Vec<&'a EntitySnapshot> {
    guids.iter().filter_map(|&guid| buffer.get(guid)).collect()
}

/// Number of snapshots of the selected kinds within `radius` of `center`.
#[must_use]
pub fn count_within(buffer: &GridBuffer, center: Vec3, radius: f32, mask: KindMask) -> usize {
    let mut count = 0;
    buffer.for_each_within(center, radius, mask, |_| count += 1);
    count
}

/// True if any snapshot of the selected kinds within `radius` satisfies
/// `predicate`.
#[must_use]
pub fn any_within(
    buffer: &GridBuffer,
    center: Vec3,
    radius: f32,
    mask: KindMask,
    mut predicate: impl FnMut(&EntitySnapshot) -> bool,
) -> bool {
    let mut found = false;
    buffer.for_each_within(center, radius, mask, |s| {
        if !found && predicate(s) {
            found = true;
        }
    });
    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::{DoubleBufferedGrid, GridGeometry, GridView, RegionBounds};
    use crate::snapshot::{CreatureSnapshot, GameObjectSnapshot, SnapshotHeader, StatusFlags};
    use phalanx_shared::{HighGuid, Position, RegionId};
    use std::time::Duration;

    fn creature(counter: u64, x: f32, y: f32, flags: StatusFlags) -> EntitySnapshot {
        EntitySnapshot::Creature(CreatureSnapshot {
            header: SnapshotHeader::new(
                ObjectGuid::new(HighGuid::Creature, counter),
                Position::at(x, y, 0.0),
                flags,
            ),
            entry: 100,
            level: 10,
            health: 1.0,
            faction: 14,
            elite: false,
            target: ObjectGuid::EMPTY,
        })
    }

    fn chest(counter: u64, x: f32, y: f32) -> EntitySnapshot {
        EntitySnapshot::GameObject(GameObjectSnapshot {
            header: SnapshotHeader::new(
                ObjectGuid::new(HighGuid::GameObject, counter),
                Position::at(x, y, 0.0),
                StatusFlags::LOOTABLE,
            ),
            entry: 7,
            object_type: 3,
            interaction_range: 5.0,
            state: 1,
        })
    }

    fn view(objects: Vec<EntitySnapshot>) -> GridView {
        let geometry = GridGeometry::new(RegionBounds::square(0.0, 0.0, 32.0, 32), 32.0).unwrap();
        let (grid, mut writer) = DoubleBufferedGrid::new(RegionId(1), geometry, Duration::from_secs(1));
        writer.rebuild_and_swap(objects);
        grid.load()
    }

    #[test]
    fn test_sorted_by_distance_with_ties() {
        let view = view(vec![
            creature(3, 110.0, 100.0, StatusFlags::ALIVE),
            creature(1, 90.0, 100.0, StatusFlags::ALIVE),
            creature(2, 102.0, 100.0, StatusFlags::ALIVE),
        ]);
        let sorted = sorted_by_distance(&view, Vec3::new(100.0, 100.0, 0.0), 50.0, KindMask::ALL);
        let counters: Vec<u64> = sorted.iter().map(|s| s.guid().counter()).collect();
        assert_eq!(counters, vec![2, 1, 3]);
    }

    #[test]
    fn test_nearest_with_predicate() {
        let view = view(vec![
            creature(1, 101.0, 100.0, StatusFlags::ALIVE),
            creature(2, 105.0, 100.0, StatusFlags::ALIVE | StatusFlags::HOSTILE),
            creature(3, 103.0, 100.0, StatusFlags::EMPTY | StatusFlags::HOSTILE),
        ]);
        let center = Vec3::new(100.0, 100.0, 0.0);
        let hostile_alive = nearest(&view, center, 30.0, KindMask::CREATURE, |s| {
            s.is_alive() && s.is_hostile()
        });
        assert_eq!(hostile_alive.map(|s| s.guid().counter()), Some(2));
        assert!(nearest(&view, center, 30.0, KindMask::PLAYER, |_| true).is_none());
    }

    #[test]
    fn test_counts_and_masks() {
        let view = view(vec![
            creature(1, 10.0, 10.0, StatusFlags::ALIVE),
            creature(2, 12.0, 10.0, StatusFlags::ALIVE),
            chest(1, 11.0, 11.0),
            creature(3, 500.0, 500.0, StatusFlags::ALIVE),
        ]);
        let center = Vec3::new(10.0, 10.0, 0.0);
        assert_eq!(count_within(&view, center, 5.0, KindMask::ALL), 3);
        assert_eq!(count_within(&view, center, 5.0, KindMask::CREATURE), 2);
        assert_eq!(count_within(&view, center, 5.0, KindMask::NONE), 0);
        assert_eq!(within_radius(&view, center, 5.0, KindMask::GAME_OBJECT).len(), 1);
        assert!(any_within(&view, center, 5.0, KindMask::ALL, |s| s.interaction_range().is_some()));
        assert!(!any_within(&view, center, 5.0, KindMask::PLAYER, |_| true));
    }

    #[test]
    fn test_resolve_guids_keeps_order() {
        let view = view(vec![
            creature(1, 10.0, 10.0, StatusFlags::ALIVE),
            creature(2, 20.0, 20.0, StatusFlags::ALIVE),
        ]);
        let wanted = [
            ObjectGuid::new(HighGuid::Creature, 2),
            ObjectGuid::new(HighGuid::Creature, 99),
            ObjectGuid::new(HighGuid::Creature, 1),
        ];
        let found: Vec<u64> = resolve_guids(&view, &wanted).iter().map(|s| s.guid().counter()).collect();
        assert_eq!(found, vec![2, 1]);
        assert!(resolve_guid(&view, ObjectGuid::EMPTY).is_none());
    }
}
