//! Week and session sequencing
//!
//! Weeks within a course and sessions within a week carry a position number
//! that must always form the contiguous run `1..=N`. This module holds the
//! storage-independent half of that discipline:
//!
//! - creation-time gap and range validation
//! - move planning for the two reorder strategies
//! - compaction planning after a removal
//! - parking slot calculation for collision-free application
//!
//! Plans are applied by the service layer inside a single transaction. The
//! displaced siblings are first parked above every real position, the moved
//! item is then written to its target, and finally the parked siblings are
//! written to their final positions. No two siblings ever share a position,
//! even between statements.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Distance above the current maximum at which displaced siblings are parked
pub const PARKING_OFFSET: i64 = 9999;

/// Highest position a week or session can be created at
pub const MAX_POSITION: i64 = 32767;

/// How the siblings between the old and new position are rearranged
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReorderStrategy {
    /// Remove the item and reinsert it at the target; siblings in between
    /// shift one place toward the vacated position.
    #[default]
    Shift,
    /// Exchange the item with the sibling occupying the target.
    Swap,
}

impl std::str::FromStr for ReorderStrategy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "shift" => Ok(ReorderStrategy::Shift),
            "swap" => Ok(ReorderStrategy::Swap),
            other => Err(Error::Config(format!(
                "Unknown reorder strategy '{}' (expected 'shift' or 'swap')",
                other
            ))),
        }
    }
}

/// One sibling and its current position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Slot {
    pub id: Uuid,
    pub position: i64,
}

/// Position change for a single sibling
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Assignment {
    pub id: Uuid,
    pub from: i64,
    pub to: i64,
}

/// Result of planning a move
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MovePlan {
    /// The item being moved; `None` when the move is a no-op
    pub item: Option<Assignment>,
    /// Siblings that have to make room, in application order
    pub displaced: Vec<Assignment>,
}

impl MovePlan {
    pub fn is_noop(&self) -> bool {
        self.item.is_none()
    }

    /// Every assignment in the plan, item first
    pub fn assignments(&self) -> impl Iterator<Item = &Assignment> {
        self.item.iter().chain(self.displaced.iter())
    }
}

/// Positions in `1..requested` that no sibling occupies
pub fn missing_before(existing: &[i64], requested: i64) -> Vec<i64> {
    let mut occupied: Vec<i64> = existing
        .iter()
        .copied()
        .filter(|position| (1..requested).contains(position))
        .collect();
    occupied.sort_unstable();
    occupied.dedup();

    let mut occupied = occupied.into_iter().peekable();
    (1..requested)
        .filter(|position| {
            if occupied.peek() == Some(position) {
                occupied.next();
                false
            } else {
                true
            }
        })
        .collect()
}

/// Validate the position of a brand-new sibling
///
/// `existing` holds the positions currently occupied. A position below 1 or
/// above [`MAX_POSITION`] is a range error; any empty position below
/// `requested` is a gap error naming all of them. Whether `requested` itself
/// is occupied is checked against storage by the caller.
pub fn validate_insert(label: &'static str, existing: &[i64], requested: i64) -> Result<()> {
    if !(1..=MAX_POSITION).contains(&requested) {
        return Err(Error::SequenceRange {
            label,
            requested,
            max: existing.len() as i64 + 1,
        });
    }

    let missing = missing_before(existing, requested);
    if !missing.is_empty() {
        return Err(Error::SequenceGap {
            label,
            requested,
            missing,
        });
    }

    Ok(())
}

/// Check a move target against the number of siblings other than the item
pub fn validate_move_target(label: &'static str, others: usize, requested: i64) -> Result<()> {
    let max = others as i64 + 1;
    if requested < 1 || requested > max {
        return Err(Error::SequenceRange {
            label,
            requested,
            max,
        });
    }
    Ok(())
}

/// Plan moving `item` to `target` within `siblings`
///
/// `siblings` must include the item itself.
pub fn plan_move(
    label: &'static str,
    siblings: &[Slot],
    item: Uuid,
    target: i64,
    strategy: ReorderStrategy,
) -> Result<MovePlan> {
    let current = siblings
        .iter()
        .find(|slot| slot.id == item)
        .ok_or_else(|| Error::NotFound(format!("{} {}", label, item)))?;

    validate_move_target(label, siblings.len() - 1, target)?;

    let old = current.position;
    if target == old {
        return Ok(MovePlan::default());
    }

    let mut displaced: Vec<Assignment> = match strategy {
        ReorderStrategy::Shift => siblings
            .iter()
            .filter(|slot| slot.id != item)
            .filter_map(|slot| {
                let to = if target < old && slot.position >= target && slot.position < old {
                    slot.position + 1
                } else if target > old && slot.position > old && slot.position <= target {
                    slot.position - 1
                } else {
                    return None;
                };
                Some(Assignment {
                    id: slot.id,
                    from: slot.position,
                    to,
                })
            })
            .collect(),
        ReorderStrategy::Swap => siblings
            .iter()
            .filter(|slot| slot.id != item && slot.position == target)
            .map(|slot| Assignment {
                id: slot.id,
                from: slot.position,
                to: old,
            })
            .collect(),
    };
    displaced.sort_by_key(|assignment| assignment.from);

    Ok(MovePlan {
        item: Some(Assignment {
            id: item,
            from: old,
            to: target,
        }),
        displaced,
    })
}

/// Plan closing the hole left by removing the sibling at `removed`
///
/// Returned in ascending order so each target slot is already free when
/// written.
pub fn plan_compaction(remaining: &[Slot], removed: i64) -> Vec<Assignment> {
    let mut shifts: Vec<Assignment> = remaining
        .iter()
        .filter(|slot| slot.position > removed)
        .map(|slot| Assignment {
            id: slot.id,
            from: slot.position,
            to: slot.position - 1,
        })
        .collect();
    shifts.sort_by_key(|assignment| assignment.from);
    shifts
}

/// Temporary position for the `index`-th parked sibling
pub fn parking_position(siblings: &[Slot], index: usize) -> i64 {
    let max = siblings.iter().map(|slot| slot.position).max().unwrap_or(0);
    max + PARKING_OFFSET + index as i64
}

/// Apply a plan in memory, returning siblings ordered by position
pub fn apply_plan(siblings: &[Slot], plan: &MovePlan) -> Vec<Slot> {
    let mut result: Vec<Slot> = siblings
        .iter()
        .map(|slot| {
            let position = plan
                .assignments()
                .find(|assignment| assignment.id == slot.id)
                .map(|assignment| assignment.to)
                .unwrap_or(slot.position);
            Slot {
                id: slot.id,
                position,
            }
        })
        .collect();
    result.sort_by_key(|slot| slot.position);
    result
}

/// True when positions are exactly `1..=len` in some order
pub fn is_contiguous(positions: &[i64]) -> bool {
    let mut sorted = positions.to_vec();
    sorted.sort_unstable();
    sorted
        .iter()
        .enumerate()
        .all(|(index, position)| *position == index as i64 + 1)
}
