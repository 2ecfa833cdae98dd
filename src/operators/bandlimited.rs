//! Bandlimited square and sawtooth synthesizers.
//!
//! Each synth keeps a running piecewise-linear description of the summed
//! waveform of every held note and feeds it to a [`SegmentStream`]. A tick
//! works one block ahead of the render clock: note changes take effect at
//! `start` (one block ahead), and every waveform discontinuity up to
//! `deadline` (two blocks ahead) is submitted before the block renders, which
//! covers the stream's lookahead requirement.
//!
//! Crossings that land on the same instant share one breakpoint. When a block
//! still holds more than [`MAX_CROSSINGS_PER_BLOCK`], they are merged into
//! that many equal time bins, moving each edge by less than a bin width. The
//! level after every bin stays exact, so dense chords lose a little
//! antialiasing instead of overrunning the stream's log.

use super::synth::{note_frequency, speed_factor, NoteSet, NOTE_COUNT};
use crate::kernel::KernelTable;
use crate::stream::{Breakpoint, SegmentStream, LOG_CAPACITY};
use crate::value::Signal;
use crate::BLOCK_SIZE;

/// Peak level of one note, chosen so a single note lands just under full
/// scale after the kernel's DC gain.
pub const AMPLITUDE: f64 = 0.79;

/// Residual below which an empty synth counts as silent.
const DRIFT_EPSILON: f64 = 1e-7;

/// Crossing breakpoints submitted per block. The render walk reaches back
/// through three blocks of submissions, each with one note-change breakpoint,
/// and the log needs a spare entry to detect wrapping.
pub const MAX_CROSSINGS_PER_BLOCK: usize = (LOG_CAPACITY - 16) / 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Waveform {
    Square,
    Sawtooth,
}

impl Waveform {
    /// Time between discontinuities at frequency `freq`.
    #[inline]
    fn crossing_period(self, freq: f64) -> f64 {
        match self {
            Waveform::Square => 0.5 / freq,
            Waveform::Sawtooth => 1.0 / freq,
        }
    }

    /// Jump in value at the `k`th crossing.
    #[inline]
    fn crossing_step(self, k: i64) -> f64 {
        match self {
            Waveform::Square if k.rem_euclid(2) == 0 => 2.0 * AMPLITUDE,
            Waveform::Square | Waveform::Sawtooth => -2.0 * AMPLITUDE,
        }
    }

    /// Value and slope one note contributes `since` seconds after its
    /// crossing number `k`.
    #[inline]
    fn level(self, k: i64, since: f64, period: f64) -> (f64, f64) {
        match self {
            Waveform::Square if k.rem_euclid(2) == 0 => (AMPLITUDE, 0.0),
            Waveform::Square => (-AMPLITUDE, 0.0),
            Waveform::Sawtooth => (
                AMPLITUDE * (2.0 * since / period - 1.0),
                2.0 * AMPLITUDE / period,
            ),
        }
    }
}

/// Index of the newest crossing at `t` or earlier, or strictly before `t`
/// when `inclusive` is false. Compared through `k * period` so the answer
/// agrees with the crossing times [`BandlimitedSynth`] schedules.
fn last_crossing(period: f64, t: f64, inclusive: bool) -> i64 {
    let passed = |k: i64| {
        let time = k as f64 * period;
        if inclusive {
            time <= t
        } else {
            time < t
        }
    };
    let mut k = (t / period).floor() as i64;
    while passed(k + 1) {
        k += 1;
    }
    while !passed(k) {
        k -= 1;
    }
    k
}

#[derive(Debug, Clone, Copy)]
struct Crossing {
    time: f64,
    step: f64,
}

/// Merge each run of crossings that `same` pairs with the run's first time
/// into one crossing at their mean time carrying the summed step. Input must be sorted by time.
fn merge_runs(crossings: &mut Vec<Crossing>, same: impl Fn(f64, f64) -> bool) {
    if crossings.is_empty() {
        return;
    }
    let mut write = 0;
    let mut anchor = crossings[0].time;
    let mut run = 1.0;
    for read in 1..crossings.len() {
        let next = crossings[read];
        if same(anchor, next.time) {
            run += 1.0;
            let head = &mut crossings[write];
            head.time += (next.time - head.time) / run;
            head.step += next.step;
        } else {
            write += 1;
            crossings[write] = next;
            anchor = next.time;
            run = 1.0;
        }
    }
    crossings.truncate(write + 1);
}

/// Private state of one bandlimited synth instance.
#[derive(Debug)]
pub struct BandlimitedSynth {
    waveform: Waveform,
    stream: SegmentStream,
    /// Start of the block the next tick renders, advanced one block per tick.
    /// Tracks the stream's per-sample clock up to rounding.
    time: f64,
    block: f64,
    /// Shortest crossing period; notes pitched above it are held there.
    min_period: f64,
    /// Newest breakpoint submitted.
    segment: Breakpoint,
    notes: NoteSet,
    note_count: usize,
    crossings: Vec<Crossing>,
}

impl BandlimitedSynth {
    pub fn new(waveform: Waveform, sample_rate: f64, kernel: &'static KernelTable) -> Self {
        Self {
            waveform,
            stream: SegmentStream::new(sample_rate, kernel),
            time: 0.0,
            block: BLOCK_SIZE as f64 / sample_rate,
            min_period: 1.0 / sample_rate,
            segment: Breakpoint::default(),
            notes: NoteSet::default(),
            note_count: 0,
            crossings: Vec::new(),
        }
    }

    pub fn waveform(&self) -> Waveform {
        self.waveform
    }

    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn held_notes(&self) -> usize {
        self.note_count
    }

    /// The newest breakpoint submitted to the stream.
    pub fn segment(&self) -> &Breakpoint {
        &self.segment
    }

    /// Render one block. A non-UI note input yields Error without advancing
    /// the clock.
    pub fn process(&mut self, offset: &Signal, notes: &Signal) -> Signal {
        let Some(grid) = notes.as_ui() else {
            return Signal::Error;
        };
        let held = NoteSet::from_grid(grid);
        let speed = offset.as_audio().map_or(1.0, |block| speed_factor(block[0]));
        let start = self.time + self.block;
        let deadline = start + self.block;
        let previous = self.notes;

        self.apply_note_changes(&held, start, speed);
        self.schedule_crossings(&held, &previous, start, deadline, speed);

        let mut out = [0.0f32; BLOCK_SIZE];
        self.stream.render(&mut out);
        self.time += self.block;
        Signal::audio(out)
    }

    fn period(&self, note: usize, speed: f64) -> f64 {
        self.waveform
            .crossing_period(note_frequency(note) * speed)
            .max(self.min_period)
    }

    fn apply_note_changes(&mut self, held: &NoteSet, start: f64, speed: f64) {
        let mut p0 = self.segment.value_at(start);
        let mut p1 = self.segment.p1;
        let mut changed = false;

        for note in 0..NOTE_COUNT {
            let now = held.contains(note);
            if now == self.notes.contains(note) {
                continue;
            }
            let period = self.period(note, speed);
            // A crossing exactly at `start` belongs to a note that keeps
            // playing, so a release sees the level before it.
            let k = last_crossing(period, start, now);
            let (value, slope) = self.waveform.level(k, start - k as f64 * period, period);
            if now {
                p0 += value;
                p1 += slope;
                self.note_count += 1;
            } else {
                p0 -= value;
                p1 -= slope;
                self.note_count -= 1;
            }
            self.notes.set(note, now);
            changed = true;
        }

        if !changed {
            return;
        }
        if self.note_count == 0 && (p0.abs() > DRIFT_EPSILON || p1.abs() > DRIFT_EPSILON) {
            log::warn!(
                "{:?} synth drifted to {:e} (slope {:e}) with no notes held, resetting",
                self.waveform,
                p0,
                p1
            );
            p0 = 0.0;
            p1 = 0.0;
        }
        self.segment = Breakpoint::new(start, p0, p1);
        self.stream.update(self.segment);
    }

    /// Submit every discontinuity before `deadline` not yet submitted, in time
    /// order. Notes held last tick already covered everything before `start`;
    /// notes pressed at `start` include any crossing there in their level.
    fn schedule_crossings(
        &mut self,
        held: &NoteSet,
        previous: &NoteSet,
        start: f64,
        deadline: f64,
        speed: f64,
    ) {
        self.crossings.clear();
        for note in held.iter() {
            let period = self.period(note, speed);
            let continuing = previous.contains(note);
            let mut k = (start / period).floor() as i64 - 1;
            loop {
                let time = k as f64 * period;
                if time >= deadline {
                    break;
                }
                if time > start || (continuing && time == start) {
                    self.crossings.push(Crossing {
                        time,
                        step: self.waveform.crossing_step(k),
                    });
                }
                k += 1;
            }
        }
        self.crossings
            .sort_unstable_by(|a, b| a.time.total_cmp(&b.time));

        merge_runs(&mut self.crossings, |a, b| a == b);
        if self.crossings.len() > MAX_CROSSINGS_PER_BLOCK {
            let width = (deadline - start) / MAX_CROSSINGS_PER_BLOCK as f64;
            let bin = |t: f64| (((t - start) / width) as usize).min(MAX_CROSSINGS_PER_BLOCK - 1);
            log::debug!(
                "{:?} synth binning {} crossings into {}",
                self.waveform,
                self.crossings.len(),
                MAX_CROSSINGS_PER_BLOCK
            );
            merge_runs(&mut self.crossings, |a, b| bin(a) == bin(b));
        }

        for crossing in &self.crossings {
            if crossing.step == 0.0 {
                continue;
            }
            let value = self.segment.value_at(crossing.time) + crossing.step;
            self.segment = Breakpoint::new(crossing.time, value, self.segment.p1);
            self.stream.update(self.segment);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::UiGrid;

    fn synth(waveform: Waveform) -> BandlimitedSynth {
        BandlimitedSynth::new(waveform, 48_000.0, KernelTable::shared())
    }

    fn grid_with(cells: &[(usize, usize)]) -> Signal {
        let mut grid = UiGrid::new();
        for &(x, y) in cells {
            grid.set(x, y, true);
        }
        Signal::ui(grid)
    }

    fn peak(signal: &Signal) -> f32 {
        signal
            .as_audio()
            .unwrap()
            .iter()
            .fold(0.0f32, |m, s| m.max(s.abs()))
    }

    #[test]
    fn empty_grid_is_silent() {
        let mut s = synth(Waveform::Square);
        for _ in 0..4 {
            assert_eq!(s.process(&Signal::Error, &grid_with(&[])), Signal::silence());
        }
    }

    #[test]
    fn non_grid_input_freezes_the_clock() {
        let mut s = synth(Waveform::Sawtooth);
        assert!(s.process(&Signal::silence(), &Signal::silence()).is_error());
        assert_eq!(s.time(), 0.0);
    }

    #[test]
    fn held_square_stays_near_full_scale() {
        let mut s = synth(Waveform::Square);
        // Note 69, A440.
        let notes = grid_with(&[(7, 3)]);
        let mut loudest = 0.0f32;
        for _ in 0..40 {
            loudest = loudest.max(peak(&s.process(&Signal::Error, &notes)));
        }
        assert_eq!(s.held_notes(), 1);
        assert!(loudest > 0.8 && loudest < 1.3, "peak {}", loudest);
    }

    #[test]
    fn release_returns_to_silence() {
        for waveform in [Waveform::Square, Waveform::Sawtooth] {
            let mut s = synth(waveform);
            let notes = grid_with(&[(2, 5), (6, 1)]);
            for _ in 0..25 {
                s.process(&Signal::Error, &notes);
            }
            let empty = grid_with(&[]);
            for _ in 0..3 {
                s.process(&Signal::Error, &empty);
            }
            assert_eq!(s.held_notes(), 0);
            assert!(peak(&s.process(&Signal::Error, &empty)) < 1e-6, "{:?}", waveform);
        }
    }

    #[test]
    fn crossings_on_block_boundaries_are_kept() {
        // 880 crossings per second against 800 blocks: every tenth block
        // boundary lands on a crossing.
        let mut s = synth(Waveform::Square);
        let notes = grid_with(&[(7, 3)]);
        for _ in 0..200 {
            s.process(&Signal::Error, &notes);
            assert!((s.segment().p0.abs() - AMPLITUDE).abs() < 1e-9, "{}", s.segment().p0);
        }
    }

    #[test]
    fn last_crossing_respects_inclusivity() {
        assert_eq!(last_crossing(0.25, 0.5, true), 2);
        assert_eq!(last_crossing(0.25, 0.5, false), 1);
        assert_eq!(last_crossing(0.25, 0.6, false), 2);
        assert_eq!(last_crossing(0.25, 0.0, false), -1);
    }

    #[test]
    fn octave_chord_with_coincident_crossings() {
        let mut s = synth(Waveform::Square);
        // Notes 57 and 69 cross together on every other edge.
        let notes = grid_with(&[(7, 6), (7, 3)]);
        for _ in 0..100 {
            let out = s.process(&Signal::Error, &notes);
            assert!(peak(&out) < 2.5);
        }
        // Crossings alternate direction, so the position stays bounded.
        assert!(s.segment().p0.abs() <= 2.0 * AMPLITUDE + 1e-9);
    }

    #[test]
    fn sawtooth_slope_tracks_held_notes() {
        let mut s = synth(Waveform::Sawtooth);
        s.process(&Signal::Error, &grid_with(&[(7, 3)]));
        let expected = AMPLITUDE * 2.0 * 440.0;
        assert!((s.segment().p1 - expected).abs() < 1e-6);
    }

    #[test]
    fn pitch_offset_scales_speed() {
        let mut s = synth(Waveform::Sawtooth);
        let octave_up = Signal::audio([std::f32::consts::LN_2; BLOCK_SIZE]);
        s.process(&octave_up, &grid_with(&[(7, 3)]));
        let expected = AMPLITUDE * 2.0 * 880.0;
        assert!((s.segment().p1 - expected).abs() < 1e-3);
    }

    #[test]
    fn unusable_offsets_render_at_base_pitch() {
        let notes = grid_with(&[(7, 3), (2, 5)]);
        for offset in [f32::INFINITY, f32::NEG_INFINITY, f32::NAN] {
            let mut s = synth(Waveform::Square);
            let offset = Signal::audio([offset; BLOCK_SIZE]);
            for _ in 0..20 {
                let out = s.process(&offset, &notes);
                assert!(out.as_audio().unwrap().iter().all(|v| v.is_finite()));
            }
            assert_eq!(s.held_notes(), 2);
        }
        let mut s = synth(Waveform::Sawtooth);
        s.process(&Signal::audio([f32::INFINITY; BLOCK_SIZE]), &grid_with(&[(7, 3)]));
        assert!((s.segment().p1 - AMPLITUDE * 2.0 * 440.0).abs() < 1e-6);
    }

    #[test]
    fn pitch_above_nyquist_is_held_at_one_crossing_per_sample() {
        let mut s = synth(Waveform::Sawtooth);
        // e^12 lifts note 102 far past the sample rate.
        let offset = Signal::audio([12.0; BLOCK_SIZE]);
        for _ in 0..10 {
            let out = s.process(&offset, &grid_with(&[(0, 0)]));
            assert!(out.as_audio().unwrap().iter().all(|v| v.is_finite()));
        }
        assert!((s.segment().p1 - AMPLITUDE * 2.0 * 48_000.0).abs() < 1e-6);
    }

    #[test]
    fn dense_chord_under_offset_renders_and_releases() {
        let mut full = UiGrid::new();
        for x in 0..8 {
            for y in 0..8 {
                full.set(x, y, true);
            }
        }
        let full = Signal::ui(full);
        let offset = Signal::audio([1.0; BLOCK_SIZE]);
        for waveform in [Waveform::Square, Waveform::Sawtooth] {
            let mut s = synth(waveform);
            for _ in 0..40 {
                let out = s.process(&offset, &full);
                assert!(out.as_audio().unwrap().iter().all(|v| v.is_finite()));
            }
            let empty = grid_with(&[]);
            for _ in 0..3 {
                s.process(&offset, &empty);
            }
            assert_eq!(s.held_notes(), 0);
            assert!(peak(&s.process(&offset, &empty)) < 1e-6, "{:?}", waveform);
        }
    }

    #[test]
    fn submissions_stay_ahead_of_the_render() {
        let mut s = synth(Waveform::Square);
        let notes = grid_with(&[(7, 3)]);
        for _ in 0..1_000 {
            let deadline = s.time + 2.0 * s.block;
            assert!(deadline >= s.stream.time_dependency(BLOCK_SIZE));
            s.process(&Signal::Error, &notes);
        }
        assert!((s.time - s.stream.time()).abs() < 1e-9);
    }

    #[test]
    fn merge_runs_sums_steps_at_mean_time() {
        let c = |time, step| Crossing { time, step };
        let mut crossings = vec![c(1.0, 1.0), c(1.0, -1.0), c(2.0, 0.5), c(2.5, 0.5), c(4.0, 1.0)];
        merge_runs(&mut crossings, |a, b| a == b);
        assert_eq!(crossings.len(), 4);
        assert_eq!(crossings[0].step, 0.0);

        merge_runs(&mut crossings, |a, b| (a / 3.0).floor() == (b / 3.0).floor());
        assert_eq!(crossings.len(), 2);
        assert!((crossings[0].time - 11.0 / 6.0).abs() < 1e-12);
        assert_eq!(crossings[0].step, 1.0);
        assert_eq!(crossings[1].time, 4.0);
    }
}
