//! Signal values carried on graph wires.
//!
//! Values are immutable and reference counted: a slot owns its value for exactly
//! one tick, and anything an operator wants to keep longer must go through
//! [`Signal::duplicate`], which makes an independent deep copy. The only value
//! shared across owners is the [`Signal::Error`] sentinel.

use crate::{BLOCK_SIZE, BYTEBEAT_SIZE};
use std::sync::Arc;

/// Bytes a value's type tag and length header add to its size.
pub const HEADER_LEN: usize = 8;

/// Rows and columns of a UI grid.
pub const UI_SIDE: usize = 8;

/// Type tag of a signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignalKind {
    Error = 0,
    Audio = 1,
    Ui = 2,
    ByteBeat = 3,
    Pair = 4,
}

/// One block of audio samples.
pub type AudioBlock = [f32; BLOCK_SIZE];

/// One block of bytebeat integers.
pub type ByteBeatBlock = [i32; BYTEBEAT_SIZE];

/// An 8×8 grid of pad or lamp states, indexed `[x][y]`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct UiGrid {
    cells: [[bool; UI_SIDE]; UI_SIDE],
}

impl UiGrid {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_cells(cells: [[bool; UI_SIDE]; UI_SIDE]) -> Self {
        Self { cells }
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> bool {
        self.cells[x][y]
    }

    #[inline]
    pub fn set(&mut self, x: usize, y: usize, on: bool) {
        self.cells[x][y] = on;
    }

    pub fn cells(&self) -> &[[bool; UI_SIDE]; UI_SIDE] {
        &self.cells
    }

    /// Coordinates of every lit cell, column-major.
    pub fn lit(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        (0..UI_SIDE)
            .flat_map(|x| (0..UI_SIDE).map(move |y| (x, y)))
            .filter(|&(x, y)| self.cells[x][y])
    }

    pub fn count(&self) -> usize {
        self.lit().count()
    }
}

/// Two nested values with their combined encoded length.
#[derive(Debug, PartialEq)]
pub struct PairNode {
    first: Signal,
    second: Signal,
    byte_len: usize,
}

impl PairNode {
    pub fn first(&self) -> &Signal {
        &self.first
    }

    pub fn second(&self) -> &Signal {
        &self.second
    }
}

/// A tagged, immutable wire value.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Signal {
    /// Missing input or type mismatch. Shared, never copied.
    #[default]
    Error,
    Audio(Arc<AudioBlock>),
    Ui(Arc<UiGrid>),
    ByteBeat(Arc<ByteBeatBlock>),
    Pair(Arc<PairNode>),
}

impl Signal {
    pub fn audio(block: AudioBlock) -> Self {
        Signal::Audio(Arc::new(block))
    }

    pub fn silence() -> Self {
        Signal::audio([0.0; BLOCK_SIZE])
    }

    pub fn ui(grid: UiGrid) -> Self {
        Signal::Ui(Arc::new(grid))
    }

    pub fn bytebeat(block: ByteBeatBlock) -> Self {
        Signal::ByteBeat(Arc::new(block))
    }

    /// Bundle two values on one wire.
    pub fn pair(first: Signal, second: Signal) -> Self {
        let byte_len = HEADER_LEN
            .saturating_add(first.byte_len())
            .saturating_add(second.byte_len());
        Signal::Pair(Arc::new(PairNode {
            first,
            second,
            byte_len,
        }))
    }

    pub fn kind(&self) -> SignalKind {
        match self {
            Signal::Error => SignalKind::Error,
            Signal::Audio(_) => SignalKind::Audio,
            Signal::Ui(_) => SignalKind::Ui,
            Signal::ByteBeat(_) => SignalKind::ByteBeat,
            Signal::Pair(_) => SignalKind::Pair,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Signal::Error)
    }

    /// Encoded size in bytes, header included.
    pub fn byte_len(&self) -> usize {
        match self {
            Signal::Error => HEADER_LEN,
            Signal::Audio(_) => HEADER_LEN + BLOCK_SIZE * 4,
            Signal::Ui(_) => HEADER_LEN + UI_SIDE * UI_SIDE,
            Signal::ByteBeat(_) => HEADER_LEN + BYTEBEAT_SIZE * 4,
            Signal::Pair(node) => node.byte_len,
        }
    }

    /// Independent deep copy, for values kept past the current tick.
    pub fn duplicate(&self) -> Signal {
        match self {
            Signal::Error => Signal::Error,
            Signal::Audio(block) => Signal::Audio(Arc::new(**block)),
            Signal::Ui(grid) => Signal::Ui(Arc::new(**grid)),
            Signal::ByteBeat(block) => Signal::ByteBeat(Arc::new(**block)),
            Signal::Pair(node) => Signal::Pair(Arc::new(PairNode {
                first: node.first.duplicate(),
                second: node.second.duplicate(),
                byte_len: node.byte_len,
            })),
        }
    }

    /// True when both handles point at the same payload allocation.
    pub fn shares_payload(&self, other: &Signal) -> bool {
        match (self, other) {
            (Signal::Error, Signal::Error) => true,
            (Signal::Audio(a), Signal::Audio(b)) => Arc::ptr_eq(a, b),
            (Signal::Ui(a), Signal::Ui(b)) => Arc::ptr_eq(a, b),
            (Signal::ByteBeat(a), Signal::ByteBeat(b)) => Arc::ptr_eq(a, b),
            (Signal::Pair(a), Signal::Pair(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }

    pub fn as_audio(&self) -> Option<&AudioBlock> {
        match self {
            Signal::Audio(block) => Some(&**block),
            _ => None,
        }
    }

    pub fn as_ui(&self) -> Option<&UiGrid> {
        match self {
            Signal::Ui(grid) => Some(&**grid),
            _ => None,
        }
    }

    pub fn as_bytebeat(&self) -> Option<&ByteBeatBlock> {
        match self {
            Signal::ByteBeat(block) => Some(&**block),
            _ => None,
        }
    }

    pub fn as_pair(&self) -> Option<(&Signal, &Signal)> {
        match self {
            Signal::Pair(node) => Some((&node.first, &node.second)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_follow_variants() {
        assert_eq!(Signal::Error.kind(), SignalKind::Error);
        assert_eq!(Signal::silence().kind(), SignalKind::Audio);
        assert_eq!(Signal::ui(UiGrid::new()).kind(), SignalKind::Ui);
        assert_eq!(Signal::pair(Signal::Error, Signal::Error).kind(), SignalKind::Pair);
    }

    #[test]
    fn byte_lengths_describe_the_encoding() {
        assert_eq!(Signal::Error.byte_len(), 8);
        assert_eq!(Signal::silence().byte_len(), 8 + BLOCK_SIZE * 4);
        assert_eq!(Signal::ui(UiGrid::new()).byte_len(), 72);
        let nested = Signal::pair(
            Signal::silence(),
            Signal::pair(Signal::ui(UiGrid::new()), Signal::Error),
        );
        assert_eq!(nested.byte_len(), 8 + (8 + BLOCK_SIZE * 4) + (8 + 72 + 8));
    }

    #[test]
    fn duplicate_is_deep() {
        let original = Signal::pair(Signal::silence(), Signal::bytebeat([3; BYTEBEAT_SIZE]));
        let copy = original.duplicate();
        assert_eq!(copy, original);
        assert!(!copy.shares_payload(&original));
        let (a, _) = original.as_pair().unwrap();
        let (b, _) = copy.as_pair().unwrap();
        assert!(!a.shares_payload(b));
    }

    #[test]
    fn error_duplicates_to_the_sentinel() {
        let copy = Signal::Error.duplicate();
        assert!(copy.is_error());
        assert!(copy.shares_payload(&Signal::Error));
    }

    #[test]
    fn grid_reports_lit_cells() {
        let mut grid = UiGrid::new();
        grid.set(2, 5, true);
        grid.set(7, 0, true);
        assert_eq!(grid.lit().collect::<Vec<_>>(), vec![(2, 5), (7, 0)]);
        assert_eq!(grid.count(), 2);
    }
}
