//! Overlap resolution after student moves.

use crate::model::classroom::ClassroomState;
use crate::model::ids::ItemKind;
use std::collections::{BTreeMap, BTreeSet};

/// Extra gap left below a moved student when pushing an item out of its way.
pub const LAYOUT_COLLISION_OFFSET: f64 = 5.0;

type Bounds = (f64, f64, f64, f64);

fn overlaps(a: Bounds, b: Bounds) -> bool {
    let (ax, ay, aw, ah) = a;
    let (bx, by, bw, bh) = b;
    !(ax + aw <= bx || ax >= bx + bw || ay + ah <= by || ay >= by + bh)
}

/// Vertical shifts that clear items overlapped by the moved students.
///
/// Only moved students push; moved items are never pushed themselves. An item
/// overlapped by several moved students takes the largest shift. Returns
/// `(kind, id, new_x, new_y)` targets suitable for `MoveItems::capture`.
pub fn collision_shifts(
    state: &ClassroomState,
    moved: &[(ItemKind, String)],
) -> Vec<(ItemKind, String, f64, f64)> {
    let moved_keys: BTreeSet<(ItemKind, &str)> =
        moved.iter().map(|(kind, id)| (*kind, id.as_str())).collect();

    let others: Vec<(ItemKind, &str, Bounds)> = state
        .students
        .values()
        .map(|s| (ItemKind::Student, s.id.as_str(), (s.x, s.y, s.width, s.height)))
        .chain(
            state
                .furniture
                .values()
                .map(|f| (ItemKind::Furniture, f.id.as_str(), (f.x, f.y, f.width, f.height))),
        )
        .filter(|(kind, id, _)| !moved_keys.contains(&(*kind, *id)))
        .collect();

    let mut targets: BTreeMap<(ItemKind, &str), (f64, f64)> = BTreeMap::new();
    for (kind, id) in moved {
        if *kind != ItemKind::Student {
            continue;
        }
        let Some(pusher) = state.item_bounds(*kind, id) else {
            continue;
        };
        let pusher_bottom = pusher.1 + pusher.3;
        for (other_kind, other_id, other) in &others {
            if !overlaps(pusher, *other) {
                continue;
            }
            let overlap = pusher_bottom - other.1;
            if overlap <= 0.0 {
                continue;
            }
            let new_y = other.1 + overlap + LAYOUT_COLLISION_OFFSET;
            targets
                .entry((*other_kind, *other_id))
                .and_modify(|target| target.1 = target.1.max(new_y))
                .or_insert((other.0, new_y));
        }
    }

    targets
        .into_iter()
        .map(|((kind, id), (x, y))| (kind, id.to_string(), x, y))
        .collect()
}
