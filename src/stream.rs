//! Bandlimited segment stream.
//!
//! A stream is an ideal piecewise-polynomial signal described by a log of
//! [`Breakpoint`]s, rendered to samples by convolving it with the kernel from
//! [`crate::kernel`]. Any density of discontinuities renders alias-free as long as
//! the caller submits breakpoints ahead of [`SegmentStream::time_dependency`].

use crate::invariant::{contract_violation, BREAKPOINT_ORDER, STREAM_LOG_COVERAGE};
use crate::kernel::{KernelTable, KERNEL_SUPPORT, KERNEL_UNIT};

/// Breakpoints kept in the circular log.
pub const LOG_CAPACITY: usize = 256;
const LOG_MASK: usize = LOG_CAPACITY - 1;

/// Start of a polynomial piece, valid from `time` until the next breakpoint.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Breakpoint {
    /// Absolute time in seconds.
    pub time: f64,
    /// Position at `time`.
    pub p0: f64,
    /// Speed, in units per second.
    pub p1: f64,
    /// Acceleration. Carried, not rendered.
    pub p2: f64,
}

impl Breakpoint {
    pub fn new(time: f64, p0: f64, p1: f64) -> Self {
        Self {
            time,
            p0,
            p1,
            p2: 0.0,
        }
    }

    /// Value of the linear piece at `t`.
    #[inline]
    pub fn value_at(&self, t: f64) -> f64 {
        self.p1 * (t - self.time) + self.p0
    }
}

/// One oscillator's render clock and breakpoint log.
#[derive(Debug, Clone)]
pub struct SegmentStream {
    time: f64,
    sample_rate: f64,
    /// Converts a per-second slope into per-sample units for the `k2` terms.
    slope_scale: f64,
    kernel: &'static KernelTable,
    log: [Breakpoint; LOG_CAPACITY],
    head: usize,
}

impl SegmentStream {
    /// A silent stream at time zero.
    ///
    /// The log starts with a zero breakpoint one kernel support in the past so the
    /// backward walk in [`render`](Self::render) always finds an end.
    pub fn new(sample_rate: f64, kernel: &'static KernelTable) -> Self {
        let mut log = [Breakpoint::default(); LOG_CAPACITY];
        log[0] = Breakpoint::new(-(KERNEL_SUPPORT as f64) / sample_rate, 0.0, 0.0);
        Self {
            time: 0.0,
            sample_rate,
            slope_scale: 1.0 / sample_rate,
            kernel,
            log,
            head: 0,
        }
    }

    /// Current render time in seconds.
    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    /// The newest breakpoint in the log.
    pub fn last(&self) -> &Breakpoint {
        &self.log[self.head]
    }

    /// Latest breakpoint time that must be submitted before rendering `samples`
    /// more samples.
    pub fn time_dependency(&self, samples: usize) -> f64 {
        self.time + (samples + KERNEL_SUPPORT) as f64 / self.sample_rate
    }

    /// Append a breakpoint. Times must not decrease.
    pub fn update(&mut self, bp: Breakpoint) {
        let last = self.log[self.head].time;
        if !(bp.time >= last) {
            contract_violation(
                BREAKPOINT_ORDER,
                &format!("breakpoint at {} submitted after {}", bp.time, last),
            );
        }
        self.head = (self.head + 1) & LOG_MASK;
        self.log[self.head] = bp;
    }

    /// Render `out.len()` samples, advancing the clock by one sample period each.
    pub fn render(&mut self, out: &mut [f32]) {
        let period = 1.0 / self.sample_rate;
        let support = KERNEL_SUPPORT as f64 / self.sample_rate;
        let to_index = self.sample_rate * KERNEL_UNIT as f64;

        for sample in out.iter_mut() {
            self.time += period;
            let now = self.time;
            let window_start = now - support;
            let mut x2 = now + support;

            let mut seg = self.head;
            while self.log[seg].time > x2 {
                seg = self.step_back(seg);
            }
            let mut x1 = self.log[seg].time;

            let mut acc = 0.0;
            while x1 > window_start {
                let bp = &self.log[seg];
                let fx1 = bp.p0;
                let fx2 = bp.value_at(x2);
                acc += self.segment_term(fx1, fx2, bp.p1, x1 - now, x2 - now, to_index);

                x2 = x1;
                seg = self.step_back(seg);
                x1 = self.log[seg].time;
            }

            // Oldest overlapping segment, clipped at the trailing window edge.
            let bp = &self.log[seg];
            let fx1 = bp.value_at(window_start);
            let fx2 = bp.value_at(x2);
            acc += self.segment_term(fx1, fx2, bp.p1, window_start - now, x2 - now, to_index);

            *sample = acc as f32;
        }
    }

    #[inline]
    fn step_back(&self, seg: usize) -> usize {
        let prev = seg.wrapping_sub(1) & LOG_MASK;
        if prev == self.head {
            contract_violation(
                STREAM_LOG_COVERAGE,
                "breakpoint log exhausted before covering the kernel window",
            );
        }
        prev
    }

    #[inline]
    fn segment_term(&self, fx1: f64, fx2: f64, slope: f64, d1: f64, d2: f64, to_index: f64) -> f64 {
        let i1 = (d1 * to_index) as i64;
        let i2 = (d2 * to_index) as i64;
        let a = self.slope_scale * slope;
        let k = self.kernel;
        fx2 * k.gk1(i2) - fx1 * k.gk1(i1) - a * k.gk2(i2) + a * k.gk2(i1)
    }
}
