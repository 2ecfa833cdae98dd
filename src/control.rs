//! Controller edge events and the pad matrix they update.
//!
//! Events are queued between ticks and applied all at once before the next
//! tick, so every input-grid operator in a tick sees the same pad state.
//!
//! The pad matrix is 19 columns by 9 rows: two 8×8 arrays side by side with a
//! top row of control pads above them.

use crate::value::{UiGrid, UI_SIDE};
use std::collections::VecDeque;

/// Pad matrix columns.
pub const PAD_COLUMNS: usize = 19;
/// Pad matrix rows.
pub const PAD_ROWS: usize = 9;

/// Events held between ticks; further pushes are refused until the next tick.
pub const CONTROL_QUEUE_CAPACITY: usize = 256;

/// First column of the right-hand array (`array_1`).
const RIGHT_ARRAY_X: usize = 10;
/// First column of the left-hand array (`array_2`).
const LEFT_ARRAY_X: usize = 1;
/// Top-row column of the first control pad pair.
const CONTROL_PADS_X: usize = 10;

/// A pad press or release.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlEvent {
    pub x: u8,
    pub y: u8,
    pub pressed: bool,
}

impl ControlEvent {
    pub fn press(x: u8, y: u8) -> Self {
        Self { x, y, pressed: true }
    }

    pub fn release(x: u8, y: u8) -> Self {
        Self { x, y, pressed: false }
    }
}

/// Current pad state plus the events waiting for the next tick.
#[derive(Debug, Clone)]
pub struct ControlSurface {
    pads: [[bool; PAD_ROWS]; PAD_COLUMNS],
    pending: VecDeque<ControlEvent>,
}

impl Default for ControlSurface {
    fn default() -> Self {
        Self::new()
    }
}

impl ControlSurface {
    pub fn new() -> Self {
        Self {
            pads: [[false; PAD_ROWS]; PAD_COLUMNS],
            pending: VecDeque::with_capacity(CONTROL_QUEUE_CAPACITY),
        }
    }

    /// Queue an event. Returns it back when the queue is full.
    pub fn push(&mut self, event: ControlEvent) -> Result<(), ControlEvent> {
        if self.pending.len() >= CONTROL_QUEUE_CAPACITY {
            return Err(event);
        }
        self.pending.push_back(event);
        Ok(())
    }

    /// Apply every queued event in arrival order. Returns how many took effect.
    pub fn apply_pending(&mut self) -> usize {
        let mut applied = 0;
        while let Some(event) = self.pending.pop_front() {
            let (x, y) = (event.x as usize, event.y as usize);
            if x >= PAD_COLUMNS || y >= PAD_ROWS {
                log::debug!("ignoring {:?} outside the pad matrix", event);
                continue;
            }
            self.pads[x][y] = event.pressed;
            applied += 1;
        }
        applied
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    pub fn is_pressed(&self, x: usize, y: usize) -> bool {
        x < PAD_COLUMNS && y < PAD_ROWS && self.pads[x][y]
    }

    /// The right-hand 8×8 array.
    pub fn right_array(&self) -> UiGrid {
        self.array_at(RIGHT_ARRAY_X)
    }

    /// The left-hand 8×8 array.
    pub fn left_array(&self) -> UiGrid {
        self.array_at(LEFT_ARRAY_X)
    }

    /// Control pad pair `n` (0..4) as cells `[0][0]` (plus) and `[0][1]` (minus).
    pub fn control_pair(&self, n: usize) -> UiGrid {
        let mut grid = UiGrid::new();
        let x = CONTROL_PADS_X + 2 * n;
        grid.set(0, 0, self.is_pressed(x, 0));
        grid.set(0, 1, self.is_pressed(x + 1, 0));
        grid
    }

    fn array_at(&self, left: usize) -> UiGrid {
        let mut grid = UiGrid::new();
        for x in 0..UI_SIDE {
            for y in 0..UI_SIDE {
                grid.set(x, y, self.pads[left + x][y + 1]);
            }
        }
        grid
    }
}
