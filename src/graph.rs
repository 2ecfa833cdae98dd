//! Instance graph: the 8×64 grid of operator slots and their wiring.
//!
//! Wiring is by coordinate and may form any shape, cycles and self-loops
//! included, because every slot reads the previous tick's values.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use crate::invariant::{assert_invariant, GRAPH_PLACEMENT_LEGAL, GRAPH_REMOVAL_RELEASES_STATE};
use crate::operators::{OperatorKind, OperatorState, MAX_INPUTS};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Slot columns.
pub const GRID_COLUMNS: usize = 8;
/// Slot rows.
pub const GRID_ROWS: usize = 64;
/// Total slots.
pub const SLOT_COUNT: usize = GRID_COLUMNS * GRID_ROWS;

/// Slot whose value the player decomposes into audio and lamp state.
pub const OUTPUT_SLOT: Coord = Coord { x: 7, y: 0 };

/// A slot position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Coord {
    /// Column, `0..GRID_COLUMNS`.
    pub x: u8,
    /// Row, `0..GRID_ROWS`.
    pub y: u8,
}

impl Coord {
    /// Create a coordinate. Range is checked on use, not here.
    pub const fn new(x: u8, y: u8) -> Self {
        Self { x, y }
    }

    /// True when the coordinate names a slot.
    pub fn is_valid(self) -> bool {
        (self.x as usize) < GRID_COLUMNS && (self.y as usize) < GRID_ROWS
    }

    /// Flat index into slot storage. Only meaningful for valid coordinates.
    #[inline]
    pub fn index(self) -> usize {
        self.y as usize * GRID_COLUMNS + self.x as usize
    }

    /// Inverse of [`index`](Self::index).
    pub fn from_index(index: usize) -> Self {
        Self {
            x: (index % GRID_COLUMNS) as u8,
            y: (index / GRID_COLUMNS) as u8,
        }
    }
}

impl fmt::Display for Coord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// A placed operator.
#[derive(Debug)]
pub struct Instance {
    kind: OperatorKind,
    inputs: [Option<Coord>; MAX_INPUTS],
    pub(crate) state: Option<OperatorState>,
}

impl Instance {
    /// The component this slot holds.
    pub fn kind(&self) -> OperatorKind {
        self.kind
    }

    /// Wired input coordinates, one per declared input.
    pub fn inputs(&self) -> impl Iterator<Item = Coord> + '_ {
        self.inputs.iter().take(self.kind.arity()).flatten().copied()
    }

    /// Raw input table; unused entries are `None`.
    pub fn input_table(&self) -> &[Option<Coord>; MAX_INPUTS] {
        &self.inputs
    }

    /// True once the operator has run and created its private state.
    pub fn has_state(&self) -> bool {
        self.state.is_some()
    }
}

/// Errors that can occur when editing the graph.
#[derive(Debug, Clone, PartialEq)]
pub enum GraphError {
    /// Slot coordinate outside the grid.
    SlotOutOfRange(Coord),
    /// Input coordinate outside the grid.
    InputOutOfRange(Coord),
    /// Slot already holds an instance.
    SlotOccupied(Coord),
    /// Slot holds nothing to remove.
    SlotEmpty(Coord),
    /// Wrong number of inputs for the component.
    ArityMismatch {
        /// Component being placed.
        kind: OperatorKind,
        /// Inputs it takes.
        expected: usize,
        /// Inputs supplied.
        got: usize,
    },
}

impl fmt::Display for GraphError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GraphError::SlotOutOfRange(c) => write!(f, "slot {} is outside the grid", c),
            GraphError::InputOutOfRange(c) => write!(f, "input {} is outside the grid", c),
            GraphError::SlotOccupied(c) => write!(f, "slot {} is occupied", c),
            GraphError::SlotEmpty(c) => write!(f, "slot {} is empty", c),
            GraphError::ArityMismatch {
                kind,
                expected,
                got,
            } => write!(f, "{:?} takes {} inputs, got {}", kind, expected, got),
        }
    }
}

impl std::error::Error for GraphError {}

/// The grid of slots.
#[derive(Debug)]
pub struct InstanceGraph {
    slots: Vec<Option<Instance>>,
}

impl InstanceGraph {
    /// Create an empty grid.
    pub fn new() -> Self {
        let mut slots = Vec::with_capacity(SLOT_COUNT);
        slots.resize_with(SLOT_COUNT, || None);
        Self { slots }
    }

    /// Place `kind` into an empty slot with the given wiring and no state.
    pub fn place_instance(
        &mut self,
        slot: Coord,
        kind: OperatorKind,
        inputs: &[Coord],
    ) -> Result<(), GraphError> {
        if !slot.is_valid() {
            return Err(GraphError::SlotOutOfRange(slot));
        }
        if inputs.len() != kind.arity() {
            return Err(GraphError::ArityMismatch {
                kind,
                expected: kind.arity(),
                got: inputs.len(),
            });
        }
        if let Some(bad) = inputs.iter().find(|c| !c.is_valid()) {
            return Err(GraphError::InputOutOfRange(*bad));
        }
        if self.slots[slot.index()].is_some() {
            return Err(GraphError::SlotOccupied(slot));
        }

        let mut table = [None; MAX_INPUTS];
        for (entry, &input) in table.iter_mut().zip(inputs) {
            *entry = Some(input);
        }
        self.slots[slot.index()] = Some(Instance {
            kind,
            inputs: table,
            state: None,
        });

        assert_invariant(
            GRAPH_PLACEMENT_LEGAL,
            self.slots[slot.index()]
                .as_ref()
                .map_or(false, |i| i.state.is_none()),
            "placed instance starts without state",
            Some("place_instance"),
        );
        log::info!("placed {:?} at {} reading {:?}", kind, slot, inputs);
        Ok(())
    }

    /// Empty a slot, releasing its private state. Returns what it held.
    pub fn remove_instance(&mut self, slot: Coord) -> Result<OperatorKind, GraphError> {
        if !slot.is_valid() {
            return Err(GraphError::SlotOutOfRange(slot));
        }
        let removed = self.slots[slot.index()]
            .take()
            .ok_or(GraphError::SlotEmpty(slot))?;
        let kind = removed.kind;
        drop(removed);

        assert_invariant(
            GRAPH_REMOVAL_RELEASES_STATE,
            self.slots[slot.index()].is_none(),
            "removed slot is empty",
            Some("remove_instance"),
        );
        log::info!("removed {:?} from {}", kind, slot);
        Ok(kind)
    }

    /// The instance at `slot`, if any.
    pub fn instance(&self, slot: Coord) -> Option<&Instance> {
        if !slot.is_valid() {
            return None;
        }
        self.slots[slot.index()].as_ref()
    }

    /// Occupied slots in index order.
    pub fn occupied(&self) -> impl Iterator<Item = (Coord, &Instance)> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, s)| s.as_ref().map(|inst| (Coord::from_index(i), inst)))
    }

    /// Number of occupied slots.
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    /// True when no slot is occupied.
    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(|s| s.is_none())
    }

    /// Remove every instance.
    pub fn clear(&mut self) {
        self.slots.iter_mut().for_each(|s| *s = None);
    }

    pub(crate) fn slot_mut(&mut self, index: usize) -> Option<&mut Instance> {
        self.slots.get_mut(index).and_then(|s| s.as_mut())
    }
}

impl Default for InstanceGraph {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn placement_binds_kind_and_wiring() {
        let mut graph = InstanceGraph::new();
        let slot = Coord::new(3, 10);
        graph
            .place_instance(slot, OperatorKind::Add, &[Coord::new(0, 0), Coord::new(1, 0)])
            .unwrap();
        let inst = graph.instance(slot).unwrap();
        assert_eq!(inst.kind(), OperatorKind::Add);
        assert_eq!(
            inst.inputs().collect::<Vec<_>>(),
            vec![Coord::new(0, 0), Coord::new(1, 0)]
        );
        assert!(!inst.has_state());
        assert_eq!(graph.len(), 1);
    }

    #[test]
    fn occupied_slot_is_rejected() {
        let mut graph = InstanceGraph::new();
        let slot = Coord::new(0, 0);
        graph.place_instance(slot, OperatorKind::BbTime, &[]).unwrap();
        assert_eq!(
            graph.place_instance(slot, OperatorKind::BbConst128, &[]),
            Err(GraphError::SlotOccupied(slot))
        );
    }

    #[test]
    fn wiring_is_validated() {
        let mut graph = InstanceGraph::new();
        assert_eq!(
            graph.place_instance(Coord::new(8, 0), OperatorKind::BbTime, &[]),
            Err(GraphError::SlotOutOfRange(Coord::new(8, 0)))
        );
        assert_eq!(
            graph.place_instance(Coord::new(0, 0), OperatorKind::Identity, &[Coord::new(0, 64)]),
            Err(GraphError::InputOutOfRange(Coord::new(0, 64)))
        );
        assert!(matches!(
            graph.place_instance(Coord::new(0, 0), OperatorKind::Pair, &[Coord::new(1, 1)]),
            Err(GraphError::ArityMismatch { expected: 2, got: 1, .. })
        ));
        assert!(graph.is_empty());
    }

    #[test]
    fn self_loops_are_legal() {
        let mut graph = InstanceGraph::new();
        let slot = Coord::new(4, 4);
        graph
            .place_instance(slot, OperatorKind::Pair, &[slot, slot])
            .unwrap();
    }

    #[test]
    fn removal_empties_the_slot() {
        let mut graph = InstanceGraph::new();
        let slot = Coord::new(2, 2);
        assert_eq!(graph.remove_instance(slot), Err(GraphError::SlotEmpty(slot)));
        graph.place_instance(slot, OperatorKind::Delay, &[slot]).unwrap();
        assert_eq!(graph.remove_instance(slot), Ok(OperatorKind::Delay));
        assert!(graph.instance(slot).is_none());
    }

    proptest! {
        #[test]
        fn coord_index_round_trips(x in 0u8..8, y in 0u8..64) {
            let c = Coord::new(x, y);
            prop_assert!(c.index() < SLOT_COUNT);
            prop_assert_eq!(Coord::from_index(c.index()), c);
        }
    }
}
