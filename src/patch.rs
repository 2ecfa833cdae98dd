//! Persistence of the logical graph.
//!
//! A patch records, per occupied slot, its coordinate, component and input
//! coordinates. Private operator state is never saved: a loaded patch starts
//! cold.

use crate::graph::{Coord, GraphError, InstanceGraph};
use crate::invariant::{assert_invariant, PATCH_RESTORES_GRAPH};
use crate::operators::OperatorKind;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::path::Path;

#[derive(Debug)]
pub enum PatchError {
    Io(std::io::Error),
    Json(serde_json::Error),
    Graph(GraphError),
    /// Two records name the same slot.
    DuplicateSlot(Coord),
}

impl fmt::Display for PatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PatchError::Io(e) => write!(f, "patch i/o failed: {}", e),
            PatchError::Json(e) => write!(f, "malformed patch: {}", e),
            PatchError::Graph(e) => write!(f, "patch does not fit the grid: {}", e),
            PatchError::DuplicateSlot(c) => write!(f, "slot {} listed twice", c),
        }
    }
}

impl std::error::Error for PatchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PatchError::Io(e) => Some(e),
            PatchError::Json(e) => Some(e),
            PatchError::Graph(e) => Some(e),
            PatchError::DuplicateSlot(_) => None,
        }
    }
}

impl From<std::io::Error> for PatchError {
    fn from(e: std::io::Error) -> Self {
        PatchError::Io(e)
    }
}

impl From<serde_json::Error> for PatchError {
    fn from(e: serde_json::Error) -> Self {
        PatchError::Json(e)
    }
}

impl From<GraphError> for PatchError {
    fn from(e: GraphError) -> Self {
        PatchError::Graph(e)
    }
}

/// One occupied slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlotRecord {
    pub slot: Coord,
    pub kind: OperatorKind,
    #[serde(default)]
    pub inputs: Vec<Coord>,
}

/// A whole graph, ready to save or rebuild.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Patch {
    pub slots: Vec<SlotRecord>,
}

impl Patch {
    /// Record every occupied slot of `graph`, in slot order.
    pub fn from_graph(graph: &InstanceGraph) -> Self {
        let slots = graph
            .occupied()
            .map(|(slot, inst)| SlotRecord {
                slot,
                kind: inst.kind(),
                inputs: inst.inputs().collect(),
            })
            .collect();
        Self { slots }
    }

    /// Rebuild a graph with every instance cold.
    pub fn build(&self) -> Result<InstanceGraph, PatchError> {
        let mut seen = HashSet::new();
        let mut graph = InstanceGraph::new();
        for record in &self.slots {
            if !seen.insert(record.slot) {
                return Err(PatchError::DuplicateSlot(record.slot));
            }
            graph.place_instance(record.slot, record.kind, &record.inputs)?;
        }
        assert_invariant(
            PATCH_RESTORES_GRAPH,
            graph.len() == self.slots.len(),
            "every record placed",
            Some("Patch::build"),
        );
        Ok(graph)
    }

    pub fn to_json(&self) -> Result<String, PatchError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(text: &str) -> Result<Self, PatchError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn load(path: &Path) -> Result<Self, PatchError> {
        let patch = Self::from_json(&fs::read_to_string(path)?)?;
        log::info!("loaded {} slots from {}", patch.slots.len(), path.display());
        Ok(patch)
    }

    pub fn save(&self, path: &Path) -> Result<(), PatchError> {
        fs::write(path, self.to_json()?)?;
        log::info!("saved {} slots to {}", self.slots.len(), path.display());
        Ok(())
    }
}

/// A small playable patch: two bandlimited synths played from the pad arrays,
/// mixed, equalized and routed to the output slot with both arrays as lamps.
pub fn demo() -> Patch {
    use OperatorKind::*;
    let c = Coord::new;
    let record = |slot: Coord, kind: OperatorKind, inputs: &[Coord]| SlotRecord {
        slot,
        kind,
        inputs: inputs.to_vec(),
    };
    Patch {
        slots: vec![
            record(c(0, 1), Array1, &[]),
            record(c(1, 1), Array2, &[]),
            record(c(2, 1), Control1, &[]),
            record(c(3, 1), Slider, &[c(2, 1)]),
            record(c(0, 2), BlSquareSynth, &[c(3, 1), c(0, 1)]),
            record(c(1, 2), BlSawtoothSynth, &[c(3, 1), c(1, 1)]),
            record(c(2, 2), Add, &[c(0, 2), c(1, 2)]),
            record(c(3, 2), Attenuate, &[c(2, 2)]),
            record(c(4, 2), Equalizer, &[c(3, 2)]),
            record(c(5, 1), Pair, &[c(0, 1), c(1, 1)]),
            record(c(7, 0), Pair, &[c(4, 2), c(5, 1)]),
        ],
    }
}
