//! Renumbering engine
//!
//! Applies the plans from [`elearn_common::sequence`] to storage. Runs on
//! the caller's transaction; a failure at any step leaves nothing behind
//! once the transaction is dropped.

use elearn_common::sequence::{self, MovePlan, ReorderStrategy};
use elearn_common::{Error, Result};
use sqlx::SqliteConnection;
use tracing::debug;
use uuid::Uuid;

use crate::db::sequence::{self as store, SequenceScope};

/// Validate the position for a new sibling, appending when none is given
pub async fn insert_position(
    conn: &mut SqliteConnection,
    scope: SequenceScope,
    requested: Option<i64>,
) -> Result<i64> {
    let Some(requested) = requested else {
        return store::next_position(conn, scope).await;
    };

    let existing: Vec<i64> = store::list(conn, scope)
        .await?
        .iter()
        .map(|slot| slot.position)
        .collect();
    sequence::validate_insert(scope.label(), &existing, requested)?;

    if store::position_exists(conn, scope, requested).await? {
        return Err(Error::UniquenessConflict(format!(
            "{} {} already exists",
            scope.label(),
            requested
        )));
    }

    Ok(requested)
}

/// Move `item` to `target`, rearranging siblings per `strategy`
///
/// Displaced siblings are parked above every real position first, so no
/// write ever collides with the `(parent, position)` uniqueness constraint.
pub async fn move_item(
    conn: &mut SqliteConnection,
    scope: SequenceScope,
    item: Uuid,
    target: i64,
    strategy: ReorderStrategy,
) -> Result<MovePlan> {
    let siblings = store::list(conn, scope).await?;
    let plan = sequence::plan_move(scope.label(), &siblings, item, target, strategy)?;

    let Some(moved) = plan.item else {
        debug!("{} {} already at position {}", scope.label(), item, target);
        return Ok(plan);
    };

    for (index, displaced) in plan.displaced.iter().enumerate() {
        let parked = sequence::parking_position(&siblings, index);
        debug!(
            "Parking {} {} at {} (from {})",
            scope.label(),
            displaced.id,
            parked,
            displaced.from
        );
        store::set_position(conn, scope, displaced.id, parked).await?;
    }

    store::set_position(conn, scope, moved.id, moved.to).await?;

    for displaced in &plan.displaced {
        store::set_position(conn, scope, displaced.id, displaced.to).await?;
    }

    debug!(
        "Moved {} {} from {} to {} ({} displaced)",
        scope.label(),
        moved.id,
        moved.from,
        moved.to,
        plan.displaced.len()
    );
    Ok(plan)
}

/// Shift later siblings down after the one at `removed` was deleted
pub async fn compact_after_removal(
    conn: &mut SqliteConnection,
    scope: SequenceScope,
    removed: i64,
) -> Result<usize> {
    let remaining = store::list(conn, scope).await?;
    let shifts = sequence::plan_compaction(&remaining, removed);

    for shift in &shifts {
        store::set_position(conn, scope, shift.id, shift.to).await?;
    }

    if !shifts.is_empty() {
        debug!(
            "Compacted {} {} sibling(s) after removing position {}",
            shifts.len(),
            scope.label(),
            removed
        );
    }
    Ok(shifts.len())
}
