//! Operators over 8×8 pad grids.

use super::synth::grid_note;
use super::synth::NOTE_COUNT;
use crate::value::{Signal, UiGrid, UI_SIDE};

pub fn input_grid(grid: UiGrid) -> Signal {
    Signal::ui(grid)
}

/// Flip left to right.
pub fn mirror(input: &Signal) -> Signal {
    let Some(grid) = input.as_ui() else {
        return Signal::Error;
    };
    let mut out = UiGrid::new();
    for x in 0..UI_SIDE {
        for y in 0..UI_SIDE {
            out.set(x, y, grid.get(UI_SIDE - 1 - x, y));
        }
    }
    Signal::ui(out)
}

/// Flips each cell on the press edge of its input. Holds state across Error
/// inputs, which read as all released.
#[derive(Debug, Default)]
pub struct ToggleGrid {
    last_input: UiGrid,
    output: UiGrid,
}

impl ToggleGrid {
    pub fn process(&mut self, input: &Signal) -> Signal {
        let grid = input.as_ui().copied().unwrap_or_default();
        for x in 0..UI_SIDE {
            for y in 0..UI_SIDE {
                let now = grid.get(x, y);
                if now && !self.last_input.get(x, y) {
                    self.output.set(x, y, !self.output.get(x, y));
                }
                self.last_input.set(x, y, now);
            }
        }
        Signal::ui(self.output)
    }
}

pub fn logic_or(a: &Signal, b: &Signal) -> Signal {
    if a.as_ui().is_none() && b.as_ui().is_none() {
        return Signal::Error;
    }
    let lhs = a.as_ui().copied().unwrap_or_default();
    let rhs = b.as_ui().copied().unwrap_or_default();
    let mut out = UiGrid::new();
    for x in 0..UI_SIDE {
        for y in 0..UI_SIDE {
            out.set(x, y, lhs.get(x, y) || rhs.get(x, y));
        }
    }
    Signal::ui(out)
}

/// Light every cell that plays the same note as some lit cell.
pub fn note_wrap(input: &Signal) -> Signal {
    let Some(grid) = input.as_ui() else {
        return Signal::Error;
    };
    let mut notes = [false; NOTE_COUNT];
    for (x, y) in grid.lit() {
        notes[grid_note(x, y)] = true;
    }
    let mut out = UiGrid::new();
    for x in 0..UI_SIDE {
        for y in 0..UI_SIDE {
            out.set(x, y, notes[grid_note(x, y)]);
        }
    }
    Signal::ui(out)
}

/// One generation of Conway's rules on a torus.
pub fn game_of_life(input: &Signal) -> Signal {
    let Some(grid) = input.as_ui() else {
        return Signal::Error;
    };
    const MASK: usize = UI_SIDE - 1;
    let mut out = UiGrid::new();
    for x in 0..UI_SIDE {
        for y in 0..UI_SIDE {
            let mut neighbours = 0;
            for dx in [MASK, 0, 1] {
                for dy in [MASK, 0, 1] {
                    if (dx, dy) != (0, 0) && grid.get((x + dx) & MASK, (y + dy) & MASK) {
                        neighbours += 1;
                    }
                }
            }
            let alive = grid.get(x, y);
            out.set(x, y, neighbours == 3 || (alive && neighbours == 2));
        }
    }
    Signal::ui(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid_with(cells: &[(usize, usize)]) -> Signal {
        let mut grid = UiGrid::new();
        for &(x, y) in cells {
            grid.set(x, y, true);
        }
        Signal::ui(grid)
    }

    #[test]
    fn mirror_flips_columns() {
        let out = mirror(&grid_with(&[(0, 3)]));
        assert_eq!(out, grid_with(&[(7, 3)]));
        assert!(mirror(&Signal::silence()).is_error());
    }

    #[test]
    fn toggle_flips_on_press_edges() {
        let mut toggle = ToggleGrid::default();
        let pressed = grid_with(&[(2, 2)]);
        assert_eq!(toggle.process(&pressed), pressed);
        // Held: no change.
        assert_eq!(toggle.process(&pressed), pressed);
        // Released, then pressed again: off.
        toggle.process(&Signal::Error);
        assert_eq!(toggle.process(&pressed), grid_with(&[]));
    }

    #[test]
    fn or_accepts_one_grid() {
        let a = grid_with(&[(1, 1)]);
        assert_eq!(logic_or(&a, &Signal::Error), a);
        assert_eq!(
            logic_or(&a, &grid_with(&[(5, 6)])),
            grid_with(&[(1, 1), (5, 6)])
        );
        assert!(logic_or(&Signal::Error, &Signal::silence()).is_error());
    }

    #[test]
    fn note_wrap_lights_equal_notes() {
        // (4,0) and (0,3) both map to note 90.
        let out = note_wrap(&grid_with(&[(4, 0)]));
        let grid = out.as_ui().unwrap();
        assert!(grid.get(0, 3));
        assert!(grid.get(4, 0));
        assert_eq!(grid.count(), 2);
    }

    #[test]
    fn blinker_oscillates_across_the_wrap() {
        let vertical = grid_with(&[(0, 7), (0, 0), (0, 1)]);
        let horizontal = game_of_life(&vertical);
        assert_eq!(horizontal, grid_with(&[(7, 0), (0, 0), (1, 0)]));
        assert_eq!(game_of_life(&horizontal), vertical);
    }
}
