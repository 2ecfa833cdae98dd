//! Note mapping and the naive (aliasing) synthesizers.
//!
//! Both synth families take the same inputs: an audio pitch offset, whose
//! exponential is the playback speed, and a UI grid of held notes.

use crate::value::{Signal, UiGrid, UI_SIDE};
use crate::BLOCK_SIZE;
use std::f64::consts::PI;

/// Size of the note bitmap.
pub const NOTE_COUNT: usize = 128;

/// MIDI-style note played by grid cell `(x, y)`.
#[inline]
pub fn grid_note(x: usize, y: usize) -> usize {
    (UI_SIDE - x) * 3 + (UI_SIDE - y) * 4 + 46
}

/// Equal-tempered frequency of `note`, A4 = 440 Hz.
#[inline]
pub fn note_frequency(note: usize) -> f64 {
    440.0 * 2f64.powf((note as f64 - 69.0) / 12.0)
}

/// Which notes a grid holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NoteSet {
    held: [bool; NOTE_COUNT],
}

impl Default for NoteSet {
    fn default() -> Self {
        Self {
            held: [false; NOTE_COUNT],
        }
    }
}

impl NoteSet {
    pub fn from_grid(grid: &UiGrid) -> Self {
        let mut set = Self::default();
        for (x, y) in grid.lit() {
            set.held[grid_note(x, y)] = true;
        }
        set
    }

    #[inline]
    pub fn contains(&self, note: usize) -> bool {
        self.held[note]
    }

    pub fn set(&mut self, note: usize, on: bool) {
        self.held[note] = on;
    }

    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        (0..NOTE_COUNT).filter(|&n| self.held[n])
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        !self.held.iter().any(|&h| h)
    }
}

/// Speed factor per sample from the pitch-offset input. Non-audio reads as
/// zero offset.
pub(crate) fn speed_factors(offset: &Signal) -> [f64; BLOCK_SIZE] {
    let mut speeds = [1.0; BLOCK_SIZE];
    if let Some(block) = offset.as_audio() {
        for (s, &o) in speeds.iter_mut().zip(block.iter()) {
            *s = speed_factor(o);
        }
    }
    speeds
}

/// Playback speed for a pitch offset in natural-log units. Offsets that
/// give no usable speed (NaN, infinite, or zero after `exp`) play at 1.
pub(crate) fn speed_factor(offset: f32) -> f64 {
    let speed = (offset as f64).exp();
    if speed.is_finite() && speed > 0.0 {
        speed
    } else {
        1.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    Sine,
    Square,
    Sawtooth,
}

impl Shape {
    #[inline]
    fn eval(self, t: f64, freq: f64) -> f64 {
        match self {
            Shape::Sine => (t * 2.0 * PI * freq).sin(),
            Shape::Square => {
                if (t * 2.0 * PI * freq).sin() > 0.0 {
                    1.0
                } else {
                    -1.0
                }
            }
            Shape::Sawtooth => {
                let phase = t * freq;
                (phase - phase.floor()) * 2.0 - 1.0
            }
        }
    }
}

/// Direct evaluation of the waveform for every held cell, summed. Aliases at
/// high pitches; kept for its sound.
#[derive(Debug)]
pub struct NaiveSynth {
    shape: Shape,
    time: f64,
}

impl NaiveSynth {
    pub fn new(shape: Shape) -> Self {
        Self { shape, time: 0.0 }
    }

    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn process(&mut self, offset: &Signal, notes: &Signal, sample_rate: f64) -> Signal {
        let Some(grid) = notes.as_ui() else {
            return Signal::Error;
        };
        let speeds = speed_factors(offset);
        let mut out = [0.0f32; BLOCK_SIZE];

        // Each held cell sounds, even when two cells share a note.
        for (x, y) in grid.lit() {
            let freq = note_frequency(grid_note(x, y));
            let mut t = self.time;
            for (o, &speed) in out.iter_mut().zip(speeds.iter()) {
                *o += self.shape.eval(t, freq) as f32;
                t += speed / sample_rate;
            }
        }

        self.time += speeds.iter().map(|s| s / sample_rate).sum::<f64>();
        Signal::audio(out)
    }
}
