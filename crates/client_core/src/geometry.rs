//! Pointer and keyboard deltas to calendar time.

use std::ops::Add;

use chrono::Duration;
use shared::domain::TimeWindow;

/// Vertical keyboard step.
pub const KEYBOARD_SLOT_MINUTES: i64 = 15;
pub const DEFAULT_SLOT_MINUTES: i64 = 15;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScreenPoint {
    pub x: f64,
    pub y: f64,
}

impl ScreenPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// A column (day) and row (slot) on the time grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GridCell {
    pub day: i64,
    pub slot: i64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct GridOffset {
    pub days: i64,
    pub slots: i64,
}

impl GridOffset {
    pub const ZERO: Self = Self { days: 0, slots: 0 };

    pub fn new(days: i64, slots: i64) -> Self {
        Self { days, slots }
    }

    pub fn between(from: GridCell, to: GridCell) -> Self {
        Self {
            days: to.day - from.day,
            slots: to.slot - from.slot,
        }
    }

    pub fn to_duration(self, slot_minutes: i64) -> Duration {
        Duration::days(self.days) + Duration::minutes(self.slots * slot_minutes)
    }
}

impl Add for GridOffset {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            days: self.days + rhs.days,
            slots: self.slots + rhs.slots,
        }
    }
}

/// Maps pointer coordinates onto the rendered time grid.
pub trait TimeGridGeometry: Send + Sync {
    /// `None` when the point lies outside the grid.
    fn cell_at(&self, point: ScreenPoint) -> Option<GridCell>;
    fn slot_minutes(&self) -> i64;
}

/// Week-style grid: equal-width day columns, equal-height slot rows.
#[derive(Debug, Clone, PartialEq)]
pub struct UniformTimeGrid {
    pub left: f64,
    pub top: f64,
    pub column_width: f64,
    pub row_height: f64,
    pub days: i64,
    pub slots_per_day: i64,
    pub slot_minutes: i64,
}

impl UniformTimeGrid {
    /// Seven columns of 24h in `slot_minutes` rows, anchored at the origin.
    pub fn week(column_width: f64, row_height: f64, slot_minutes: i64) -> Self {
        let slot_minutes = slot_minutes.max(1);
        Self {
            left: 0.0,
            top: 0.0,
            column_width,
            row_height,
            days: 7,
            slots_per_day: 24 * 60 / slot_minutes,
            slot_minutes,
        }
    }

    /// Top-left corner of `cell`, used to place a ghost at a known slot.
    pub fn point_for(&self, cell: GridCell) -> ScreenPoint {
        ScreenPoint {
            x: self.left + cell.day as f64 * self.column_width,
            y: self.top + cell.slot as f64 * self.row_height,
        }
    }
}

impl TimeGridGeometry for UniformTimeGrid {
    fn cell_at(&self, point: ScreenPoint) -> Option<GridCell> {
        if self.column_width <= 0.0 || self.row_height <= 0.0 {
            return None;
        }
        let day = ((point.x - self.left) / self.column_width).floor();
        let slot = ((point.y - self.top) / self.row_height).floor();
        if !day.is_finite() || !slot.is_finite() {
            return None;
        }
        let (day, slot) = (day as i64, slot as i64);
        if !(0..self.days).contains(&day) || !(0..self.slots_per_day).contains(&slot) {
            return None;
        }
        Some(GridCell { day, slot })
    }

    fn slot_minutes(&self) -> i64 {
        self.slot_minutes
    }
}

/// Candidate window for a gesture: always derived from the pre-gesture snapshot, never
/// from the live store, so repeated moves cannot compound.
pub fn apply_offset(snapshot: TimeWindow, offset: GridOffset, slot_minutes: i64) -> TimeWindow {
    snapshot.shifted(offset.to_duration(slot_minutes))
}
