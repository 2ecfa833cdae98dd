//! Operator catalog.
//!
//! Every component the grid can hold is one [`OperatorKind`]. Kinds with memory
//! get an [`OperatorState`] created lazily on their first tick; [`OperatorKind::apply`]
//! is the single entry point the scheduler calls, once per instance per tick.

mod audio;
mod bandlimited;
mod bytebeat;
mod generic;
mod synth;
mod ui;

pub use audio::{PlaybackCursor, ShelvingFilter, Slider};
pub use bandlimited::{BandlimitedSynth, Waveform, AMPLITUDE};
pub use bytebeat::{ByteBeatClock, ByteBeatSlider};
pub use generic::{DelayLine, DELAY_TICKS};
pub use synth::{grid_note, note_frequency, NaiveSynth, NoteSet, Shape, NOTE_COUNT};
pub use ui::ToggleGrid;

use crate::control::ControlSurface;
use crate::invariant::{contract_violation, OPERATOR_STATE_KIND};
use crate::kernel::KernelTable;
use crate::samples::SampleBank;
use crate::value::Signal;
use crate::EngineConfig;
use serde::{Deserialize, Serialize};

/// Most inputs any component takes.
pub const MAX_INPUTS: usize = 8;

static ERROR: Signal = Signal::Error;

/// Everything an operator may read besides its inputs and state.
#[derive(Debug, Clone, Copy)]
pub struct TickContext<'a> {
    pub config: &'a EngineConfig,
    pub kernel: &'static KernelTable,
    pub controls: &'a ControlSurface,
    pub samples: &'a SampleBank,
}

/// The fixed component catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperatorKind {
    // Inputs
    Playback,
    #[serde(rename = "array_1")]
    Array1,
    #[serde(rename = "array_2")]
    Array2,
    #[serde(rename = "control_1")]
    Control1,
    #[serde(rename = "control_2")]
    Control2,
    #[serde(rename = "control_3")]
    Control3,
    #[serde(rename = "control_4")]
    Control4,
    // Generic
    Identity,
    Delay,
    DelaySync,
    // Pairs
    First,
    Second,
    Pair,
    // Audio
    Attenuate,
    Invert,
    Add,
    Multiply,
    Saturate,
    Equalizer,
    // UI
    Mirror,
    Toggle,
    LogicOr,
    NoteWrap,
    GameOfLife,
    // Synthesizers
    SineSynth,
    SquareSynth,
    SawtoothSynth,
    BlSquareSynth,
    BlSawtoothSynth,
    // Controllers
    Slider,
    BbSlider,
    // Bytebeat
    BbTime,
    BbShiftRight,
    BbNot,
    BbOr,
    BbAnd,
    BbXor,
    #[serde(rename = "bb_const_128")]
    BbConst128,
    BbToAudio,
}

impl OperatorKind {
    pub const ALL: [OperatorKind; 39] = [
        OperatorKind::Playback,
        OperatorKind::Array1,
        OperatorKind::Array2,
        OperatorKind::Control1,
        OperatorKind::Control2,
        OperatorKind::Control3,
        OperatorKind::Control4,
        OperatorKind::Identity,
        OperatorKind::Delay,
        OperatorKind::DelaySync,
        OperatorKind::First,
        OperatorKind::Second,
        OperatorKind::Pair,
        OperatorKind::Attenuate,
        OperatorKind::Invert,
        OperatorKind::Add,
        OperatorKind::Multiply,
        OperatorKind::Saturate,
        OperatorKind::Equalizer,
        OperatorKind::Mirror,
        OperatorKind::Toggle,
        OperatorKind::LogicOr,
        OperatorKind::NoteWrap,
        OperatorKind::GameOfLife,
        OperatorKind::SineSynth,
        OperatorKind::SquareSynth,
        OperatorKind::SawtoothSynth,
        OperatorKind::BlSquareSynth,
        OperatorKind::BlSawtoothSynth,
        OperatorKind::Slider,
        OperatorKind::BbSlider,
        OperatorKind::BbTime,
        OperatorKind::BbShiftRight,
        OperatorKind::BbNot,
        OperatorKind::BbOr,
        OperatorKind::BbAnd,
        OperatorKind::BbXor,
        OperatorKind::BbConst128,
        OperatorKind::BbToAudio,
    ];

    /// Number of wired inputs.
    pub fn arity(self) -> usize {
        use OperatorKind::*;
        match self {
            Playback | Array1 | Array2 | Control1 | Control2 | Control3 | Control4 => 0,
            BbTime | BbConst128 => 0,
            Identity | Delay | DelaySync | First | Second => 1,
            Attenuate | Invert | Saturate | Equalizer => 1,
            Mirror | Toggle | NoteWrap | GameOfLife => 1,
            Slider | BbSlider | BbShiftRight | BbNot | BbToAudio => 1,
            Pair | Add | Multiply | LogicOr | BbOr | BbAnd | BbXor => 2,
            SineSynth | SquareSynth | SawtoothSynth | BlSquareSynth | BlSawtoothSynth => 2,
        }
    }

    /// Position in the 8×8 component palette, `(column, row)`.
    pub fn catalog_position(self) -> (u8, u8) {
        use OperatorKind::*;
        match self {
            Playback => (0, 0),
            Array1 => (1, 0),
            Array2 => (2, 0),
            Control1 => (4, 0),
            Control2 => (5, 0),
            Control3 => (6, 0),
            Control4 => (7, 0),
            Identity => (0, 1),
            Delay => (1, 1),
            DelaySync => (2, 1),
            First => (0, 2),
            Second => (1, 2),
            Pair => (3, 2),
            Attenuate => (0, 3),
            Invert => (1, 3),
            Add => (3, 3),
            Multiply => (4, 3),
            Saturate => (6, 3),
            Equalizer => (7, 3),
            Mirror => (0, 4),
            Toggle => (1, 4),
            LogicOr => (3, 4),
            NoteWrap => (5, 4),
            GameOfLife => (7, 4),
            SineSynth => (0, 5),
            SquareSynth => (1, 5),
            SawtoothSynth => (2, 5),
            BlSquareSynth => (4, 5),
            BlSawtoothSynth => (5, 5),
            Slider => (0, 6),
            BbSlider => (1, 6),
            BbTime => (0, 7),
            BbShiftRight => (1, 7),
            BbNot => (2, 7),
            BbOr => (3, 7),
            BbAnd => (4, 7),
            BbXor => (5, 7),
            BbConst128 => (6, 7),
            BbToAudio => (7, 7),
        }
    }

    /// The component at a palette position, if any.
    pub fn from_catalog(column: u8, row: u8) -> Option<OperatorKind> {
        Self::ALL
            .iter()
            .copied()
            .find(|kind| kind.catalog_position() == (column, row))
    }

    /// Fresh private state for a new instance.
    pub fn init_state(self, ctx: &TickContext<'_>) -> OperatorState {
        use OperatorKind::*;
        let sample_rate = ctx.config.sample_rate;
        match self {
            Playback => OperatorState::Playback(PlaybackCursor::default()),
            Delay => OperatorState::Delay(DelayLine::new(false)),
            DelaySync => OperatorState::Delay(DelayLine::new(true)),
            Equalizer => OperatorState::Equalizer(ShelvingFilter::default()),
            Toggle => OperatorState::Toggle(ToggleGrid::default()),
            SineSynth => OperatorState::Naive(NaiveSynth::new(Shape::Sine)),
            SquareSynth => OperatorState::Naive(NaiveSynth::new(Shape::Square)),
            SawtoothSynth => OperatorState::Naive(NaiveSynth::new(Shape::Sawtooth)),
            BlSquareSynth => OperatorState::Bandlimited(Box::new(BandlimitedSynth::new(
                Waveform::Square,
                sample_rate,
                ctx.kernel,
            ))),
            BlSawtoothSynth => OperatorState::Bandlimited(Box::new(BandlimitedSynth::new(
                Waveform::Sawtooth,
                sample_rate,
                ctx.kernel,
            ))),
            Slider => OperatorState::Slider(audio::Slider::default()),
            BbSlider => OperatorState::ByteBeatSlider(ByteBeatSlider::default()),
            BbTime => OperatorState::ByteBeatClock(ByteBeatClock::default()),
            _ => OperatorState::Stateless,
        }
    }

    /// Compute this tick's output. `inputs` holds one value per declared input.
    pub fn apply(self, state: &mut OperatorState, inputs: &[&Signal], ctx: &TickContext<'_>) -> Signal {
        use OperatorKind::*;
        let a = input(inputs, 0);
        let b = input(inputs, 1);
        match (self, state) {
            (Playback, OperatorState::Playback(cursor)) => cursor.next_block(ctx.samples),
            (Array1, _) => ui::input_grid(ctx.controls.right_array()),
            (Array2, _) => ui::input_grid(ctx.controls.left_array()),
            (Control1, _) => ui::input_grid(ctx.controls.control_pair(0)),
            (Control2, _) => ui::input_grid(ctx.controls.control_pair(1)),
            (Control3, _) => ui::input_grid(ctx.controls.control_pair(2)),
            (Control4, _) => ui::input_grid(ctx.controls.control_pair(3)),

            (Identity, _) => a.clone(),
            (Delay | DelaySync, OperatorState::Delay(line)) => line.tick(a),
            (First, _) => generic::first(a),
            (Second, _) => generic::second(a),
            (Pair, _) => Signal::pair(a.clone(), b.clone()),

            (Attenuate, _) => audio::map_samples(a, |s| s * 0.7),
            (Invert, _) => audio::map_samples(a, |s| -s),
            (Saturate, _) => audio::map_samples(a, f32::sin),
            (Add, _) => audio::combine(a, b, |x, y| x + y, i32::wrapping_add),
            (Multiply, _) => audio::combine(a, b, |x, y| x * y, i32::wrapping_mul),
            (Equalizer, OperatorState::Equalizer(filter)) => filter.process(a),

            (Mirror, _) => ui::mirror(a),
            (Toggle, OperatorState::Toggle(toggle)) => toggle.process(a),
            (LogicOr, _) => ui::logic_or(a, b),
            (NoteWrap, _) => ui::note_wrap(a),
            (GameOfLife, _) => ui::game_of_life(a),

            (SineSynth | SquareSynth | SawtoothSynth, OperatorState::Naive(synth)) => {
                synth.process(a, b, ctx.config.sample_rate)
            }
            (BlSquareSynth | BlSawtoothSynth, OperatorState::Bandlimited(synth)) => {
                synth.process(a, b)
            }

            (Slider, OperatorState::Slider(slider)) => slider.process(a, ctx.config.sample_rate),
            (BbSlider, OperatorState::ByteBeatSlider(slider)) => slider.process(a),

            (BbTime, OperatorState::ByteBeatClock(clock)) => clock.next_block(),
            (BbShiftRight, _) => bytebeat::map_values(a, |v| v >> 1),
            (BbNot, _) => bytebeat::map_values(a, |v| !v),
            (BbOr, _) => bytebeat::combine(a, b, |x, y| x | y),
            (BbAnd, _) => bytebeat::combine(a, b, |x, y| x & y),
            (BbXor, _) => bytebeat::combine(a, b, |x, y| x ^ y),
            (BbConst128, _) => bytebeat::constant(128),
            (BbToAudio, _) => bytebeat::to_audio(a),

            (kind, state) => contract_violation(
                OPERATOR_STATE_KIND,
                &format!("{:?} invoked with {} state", kind, state.name()),
            ),
        }
    }
}

/// Private per-instance memory.
#[derive(Debug)]
pub enum OperatorState {
    Stateless,
    Playback(PlaybackCursor),
    Delay(DelayLine),
    Equalizer(ShelvingFilter),
    Toggle(ToggleGrid),
    Naive(NaiveSynth),
    Bandlimited(Box<BandlimitedSynth>),
    Slider(Slider),
    ByteBeatSlider(ByteBeatSlider),
    ByteBeatClock(ByteBeatClock),
}

impl OperatorState {
    pub fn name(&self) -> &'static str {
        match self {
            OperatorState::Stateless => "stateless",
            OperatorState::Playback(_) => "playback",
            OperatorState::Delay(_) => "delay",
            OperatorState::Equalizer(_) => "equalizer",
            OperatorState::Toggle(_) => "toggle",
            OperatorState::Naive(_) => "naive synth",
            OperatorState::Bandlimited(_) => "bandlimited synth",
            OperatorState::Slider(_) => "slider",
            OperatorState::ByteBeatSlider(_) => "bytebeat slider",
            OperatorState::ByteBeatClock(_) => "bytebeat clock",
        }
    }
}

/// The `i`th input, or Error when it was not supplied.
#[inline]
pub(crate) fn input<'a>(inputs: &[&'a Signal], i: usize) -> &'a Signal {
    inputs.get(i).copied().unwrap_or(&ERROR)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn catalog_positions_are_unique() {
        let positions: HashSet<_> = OperatorKind::ALL.iter().map(|k| k.catalog_position()).collect();
        assert_eq!(positions.len(), OperatorKind::ALL.len());
        for kind in OperatorKind::ALL {
            let (x, y) = kind.catalog_position();
            assert!(x < 8 && y < 8);
            assert_eq!(OperatorKind::from_catalog(x, y), Some(kind));
            assert!(kind.arity() <= MAX_INPUTS);
        }
        assert_eq!(OperatorKind::from_catalog(3, 0), None);
    }

    #[test]
    fn kinds_serialize_by_name() {
        let json = serde_json::to_string(&OperatorKind::BlSawtoothSynth).unwrap();
        assert_eq!(json, "\"bl_sawtooth_synth\"");
        let back: OperatorKind = serde_json::from_str("\"bb_const_128\"").unwrap();
        assert_eq!(back, OperatorKind::BbConst128);
        let json = serde_json::to_string(&OperatorKind::Control3).unwrap();
        assert_eq!(json, "\"control_3\"");
    }
}
