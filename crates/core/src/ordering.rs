//! Manual ordering of collection records.
//!
//! Pure helpers for display sorting, next-position allocation and the
//! two-record swap behind the move up / move down buttons. Swap targets are
//! always resolved by record id against the list passed in, never by a
//! cached index.

use crate::error::CoreError;
use crate::record::Record;
use crate::types::RecordId;

/// Move direction for a reorder request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveDirection {
    Up,
    Down,
}

impl MoveDirection {
    pub fn from_name(name: &str) -> Result<Self, CoreError> {
        match name {
            "up" => Ok(Self::Up),
            "down" => Ok(Self::Down),
            other => Err(CoreError::Validation(format!(
                "Invalid move direction '{other}'. Must be one of: up, down"
            ))),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Up => "up",
            Self::Down => "down",
        }
    }
}

/// One half of a swap: give record `id` the position `sort_order`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderAssignment {
    pub id: RecordId,
    pub sort_order: i64,
}

/// The two updates that exchange the positions of neighbouring records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapPlan {
    /// The record the user asked to move.
    pub moved: OrderAssignment,
    /// The neighbour it trades places with.
    pub displaced: OrderAssignment,
}

impl SwapPlan {
    /// Both records already share a position; the swap changes nothing.
    pub fn is_tie(&self) -> bool {
        self.moved.sort_order == self.displaced.sort_order
    }
}

/// Stable sort by `sort_order` ascending. Rows without a position go last;
/// ties keep their input order.
pub fn sort_for_display(records: &mut [Record]) {
    records.sort_by_key(|r| r.sort_order.unwrap_or(i64::MAX));
}

/// Position for a newly created record: one past the current maximum,
/// treating an empty collection as maximum 0.
pub fn next_sort_order(records: &[Record]) -> i64 {
    records
        .iter()
        .filter_map(|r| r.sort_order)
        .fold(0, i64::max)
        + 1
}

fn neighbour_index(len: usize, index: usize, direction: MoveDirection) -> Option<usize> {
    match direction {
        MoveDirection::Up => index.checked_sub(1),
        MoveDirection::Down => (index + 1 < len).then_some(index + 1),
    }
}

/// Whether `id` can move in `direction` (used for button state).
pub fn can_move(records: &[Record], id: &RecordId, direction: MoveDirection) -> bool {
    records
        .iter()
        .position(|r| &r.id == id)
        .and_then(|i| neighbour_index(records.len(), i, direction))
        .is_some()
}

/// Plan the swap for moving `id` one step in `direction`.
///
/// Returns `Ok(None)` when the record already sits at the boundary.
pub fn plan_swap(
    records: &[Record],
    id: &RecordId,
    direction: MoveDirection,
) -> Result<Option<SwapPlan>, CoreError> {
    let index = records
        .iter()
        .position(|r| &r.id == id)
        .ok_or_else(|| CoreError::NotFound {
            entity: "record",
            id: id.clone(),
        })?;

    let Some(other) = neighbour_index(records.len(), index, direction) else {
        return Ok(None);
    };

    let current = &records[index];
    let neighbour = &records[other];
    let (Some(current_order), Some(neighbour_order)) = (current.sort_order, neighbour.sort_order)
    else {
        return Err(CoreError::InvariantViolation(format!(
            "Cannot swap {} and {}: missing sort_order",
            current.id, neighbour.id
        )));
    };

    Ok(Some(SwapPlan {
        moved: OrderAssignment {
            id: current.id.clone(),
            sort_order: neighbour_order,
        },
        displaced: OrderAssignment {
            id: neighbour.id.clone(),
            sort_order: current_order,
        },
    }))
}
