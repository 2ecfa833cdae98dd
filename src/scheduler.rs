//! Double-buffered graph scheduler.
//!
//! Every tick each occupied slot reads the previous tick's values at its input
//! coordinates and writes its result into the next buffer; the buffers then
//! swap. A slot's value at tick T depends only on its own state and the values
//! of tick T−1, so the evaluation order within a tick is irrelevant and
//! feedback loops are well defined.

use crate::control::{ControlEvent, ControlSurface};
use crate::graph::{Coord, GraphError, InstanceGraph, OUTPUT_SLOT, SLOT_COUNT};
use crate::invariant::{assert_invariant, TICK_ORDER_IS_PERMUTATION};
use crate::kernel::KernelTable;
use crate::operators::{OperatorKind, TickContext, MAX_INPUTS};
use crate::samples::SampleBank;
use crate::value::Signal;
use crate::EngineConfig;

static ERROR: Signal = Signal::Error;

/// Owns the graph, both value snapshots and everything operators read.
#[derive(Debug)]
pub struct Scheduler {
    config: EngineConfig,
    kernel: &'static KernelTable,
    graph: InstanceGraph,
    controls: ControlSurface,
    samples: SampleBank,
    /// Values of the last completed tick.
    current: Vec<Signal>,
    /// Scratch buffer filled during a tick; all Error between ticks.
    pending: Vec<Signal>,
    order: Vec<usize>,
    ticks: u64,
}

impl Scheduler {
    pub fn new(config: EngineConfig, graph: InstanceGraph) -> Self {
        Self {
            config,
            kernel: KernelTable::shared(),
            graph,
            controls: ControlSurface::new(),
            samples: SampleBank::default(),
            current: vec![Signal::Error; SLOT_COUNT],
            pending: vec![Signal::Error; SLOT_COUNT],
            order: (0..SLOT_COUNT).collect(),
            ticks: 0,
        }
    }

    /// Use `samples` for playback operators.
    pub fn with_samples(mut self, samples: SampleBank) -> Self {
        self.samples = samples;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn graph(&self) -> &InstanceGraph {
        &self.graph
    }

    /// Edit the graph between ticks.
    pub fn graph_mut(&mut self) -> &mut InstanceGraph {
        &mut self.graph
    }

    pub fn place_instance(
        &mut self,
        slot: Coord,
        kind: OperatorKind,
        inputs: &[Coord],
    ) -> Result<(), GraphError> {
        self.graph.place_instance(slot, kind, inputs)
    }

    /// Remove an instance. Its last value stays visible until the next tick.
    pub fn remove_instance(&mut self, slot: Coord) -> Result<OperatorKind, GraphError> {
        self.graph.remove_instance(slot)
    }

    /// Queue a controller event for the next tick.
    pub fn push_control(&mut self, event: ControlEvent) -> Result<(), ControlEvent> {
        self.controls.push(event)
    }

    pub fn controls(&self) -> &ControlSurface {
        &self.controls
    }

    /// Completed ticks.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Value produced at `slot` by the last tick. Error for empty or invalid
    /// slots.
    pub fn value_at(&self, slot: Coord) -> &Signal {
        if !slot.is_valid() {
            return &ERROR;
        }
        &self.current[slot.index()]
    }

    /// Value of the output convention slot.
    pub fn output(&self) -> &Signal {
        self.value_at(OUTPUT_SLOT)
    }

    /// Every slot's value from the last tick, in slot index order.
    pub fn values(&self) -> &[Signal] {
        &self.current
    }

    /// Advance the whole graph by one block.
    pub fn tick(&mut self) {
        let order = std::mem::take(&mut self.order);
        self.evaluate(&order);
        self.order = order;
    }

    /// [`tick`](Self::tick) visiting slots in a caller-chosen order, which must be
    /// a permutation of all slot indices. Results do not depend on it.
    #[doc(hidden)]
    pub fn tick_with_order(&mut self, order: &[usize]) {
        let mut seen = vec![false; SLOT_COUNT];
        let mut valid = order.len() == SLOT_COUNT;
        for &i in order {
            match seen.get_mut(i) {
                Some(s) if !*s => *s = true,
                _ => valid = false,
            }
        }
        assert_invariant(
            TICK_ORDER_IS_PERMUTATION,
            valid,
            "tick order must visit every slot exactly once",
            Some("tick_with_order"),
        );
        self.evaluate(order);
    }

    fn evaluate(&mut self, order: &[usize]) {
        self.controls.apply_pending();
        let ctx = TickContext {
            config: &self.config,
            kernel: self.kernel,
            controls: &self.controls,
            samples: &self.samples,
        };

        let mut inputs: [&Signal; MAX_INPUTS] = [&ERROR; MAX_INPUTS];
        for &index in order {
            let Some(instance) = self.graph.slot_mut(index) else {
                continue;
            };
            let kind = instance.kind();
            let arity = kind.arity();
            for (input, coord) in inputs.iter_mut().zip(instance.input_table()).take(arity) {
                *input = match coord {
                    Some(c) if c.is_valid() => &self.current[c.index()],
                    _ => &ERROR,
                };
            }
            let state = instance
                .state
                .get_or_insert_with(|| kind.init_state(&ctx));
            self.pending[index] = kind.apply(state, &inputs[..arity], &ctx);
        }

        // The old snapshot becomes scratch; dropping its values releases them.
        std::mem::swap(&mut self.current, &mut self.pending);
        self.pending.iter_mut().for_each(|v| *v = Signal::Error);
        self.ticks += 1;
    }
}
