//! Audio-rate operators.

use crate::samples::SampleBank;
use crate::value::{AudioBlock, ByteBeatBlock, Signal, UiGrid};
use crate::{BLOCK_SIZE, BYTEBEAT_SIZE};

/// Ramp rate of [`Slider`], in units per second.
pub const SLIDE_RATE: f64 = 0.1;

const LOW_SHELF: f64 = 0.008;
const HIGH_SHELF: f64 = 0.9;
const INPUT_TRIM: f64 = 0.5;
const LOW_MIX: f64 = 13.5;
const HIGH_MIX: f64 = 3.0;

/// Loop position into the shared [`SampleBank`].
#[derive(Debug, Default)]
pub struct PlaybackCursor {
    pos: usize,
}

impl PlaybackCursor {
    pub fn next_block(&mut self, bank: &SampleBank) -> Signal {
        let mut block = [0.0f32; BLOCK_SIZE];
        for sample in block.iter_mut() {
            *sample = bank.frame(self.pos);
            self.pos = (self.pos + 1) % bank.len();
        }
        Signal::audio(block)
    }
}

/// Apply `f` to every sample of an audio input.
pub fn map_samples(input: &Signal, f: impl Fn(f32) -> f32) -> Signal {
    match input.as_audio() {
        Some(block) => {
            let mut out: AudioBlock = *block;
            out.iter_mut().for_each(|s| *s = f(*s));
            Signal::audio(out)
        }
        None => Signal::Error,
    }
}

/// Elementwise combination. Audio wins if either side is audio, then
/// bytebeat; the mismatched side reads as silence.
pub fn combine(
    a: &Signal,
    b: &Signal,
    audio: impl Fn(f32, f32) -> f32,
    bytebeat: impl Fn(i32, i32) -> i32,
) -> Signal {
    const SILENCE: AudioBlock = [0.0; BLOCK_SIZE];
    const SILENCE_BB: ByteBeatBlock = [0; BYTEBEAT_SIZE];

    if a.as_audio().is_some() || b.as_audio().is_some() {
        let lhs = a.as_audio().unwrap_or(&SILENCE);
        let rhs = b.as_audio().unwrap_or(&SILENCE);
        let mut out = [0.0f32; BLOCK_SIZE];
        for (o, (&x, &y)) in out.iter_mut().zip(lhs.iter().zip(rhs.iter())) {
            *o = audio(x, y);
        }
        Signal::audio(out)
    } else if a.as_bytebeat().is_some() || b.as_bytebeat().is_some() {
        let lhs = a.as_bytebeat().unwrap_or(&SILENCE_BB);
        let rhs = b.as_bytebeat().unwrap_or(&SILENCE_BB);
        let mut out = [0i32; BYTEBEAT_SIZE];
        for (o, (&x, &y)) in out.iter_mut().zip(lhs.iter().zip(rhs.iter())) {
            *o = bytebeat(x, y);
        }
        Signal::bytebeat(out)
    } else {
        Signal::Error
    }
}

/// One-pole low shelf plus one-pole high shelf, mixed.
#[derive(Debug, Default)]
pub struct ShelvingFilter {
    low_y: f64,
    high_x: f64,
    high_y: f64,
}

impl ShelvingFilter {
    /// Filter one block. A non-audio input yields Error and resets the filter.
    pub fn process(&mut self, input: &Signal) -> Signal {
        let Some(block) = input.as_audio() else {
            *self = Self::default();
            return Signal::Error;
        };

        let mut out = [0.0f32; BLOCK_SIZE];
        for (o, &s) in out.iter_mut().zip(block.iter()) {
            let x = s as f64 * INPUT_TRIM;
            let low = x * LOW_SHELF + self.low_y * (1.0 - LOW_SHELF);
            let high = HIGH_SHELF * self.high_y + HIGH_SHELF * (x - self.high_x);
            self.low_y = low;
            self.high_x = x;
            self.high_y = high;
            *o = (low * LOW_MIX + high * HIGH_MIX) as f32;
        }
        Signal::audio(out)
    }
}

/// Audio-rate control value ramped by a pad pair: `[0][0]` raises, `[0][1]`
/// lowers.
#[derive(Debug, Default)]
pub struct Slider {
    value: f64,
}

impl Slider {
    pub fn process(&mut self, input: &Signal, sample_rate: f64) -> Signal {
        let pads = input.as_ui().copied().unwrap_or_default();
        let rate = ramp_direction(&pads) * SLIDE_RATE / sample_rate;
        let mut out = [0.0f32; BLOCK_SIZE];
        for o in out.iter_mut() {
            *o = self.value as f32;
            self.value += rate;
        }
        Signal::audio(out)
    }

    pub fn value(&self) -> f64 {
        self.value
    }
}

fn ramp_direction(pads: &UiGrid) -> f64 {
    let mut direction = 0.0;
    if pads.get(0, 0) {
        direction += 1.0;
    }
    if pads.get(0, 1) {
        direction -= 1.0;
    }
    direction
}

#[cfg(test)]
mod tests {
    use super::*;

    fn constant(v: f32) -> Signal {
        Signal::audio([v; BLOCK_SIZE])
    }

    #[test]
    fn playback_loops_over_the_bank() {
        let bank = SampleBank::from_frames(vec![0.25, -0.5, 1.0]).unwrap();
        let mut cursor = PlaybackCursor::default();
        let block = cursor.next_block(&bank);
        let block = block.as_audio().unwrap();
        assert_eq!(&block[..4], &[0.25, -0.5, 1.0, 0.25]);
    }

    #[test]
    fn transforms_reject_non_audio() {
        assert!(map_samples(&Signal::bytebeat([1; BYTEBEAT_SIZE]), |s| s).is_error());
        let halved = map_samples(&constant(0.5), |s| s * 0.7);
        assert_eq!(halved.as_audio().unwrap()[3], 0.5 * 0.7);
    }

    #[test]
    fn combine_substitutes_silence_for_one_mismatch() {
        let sum = combine(&constant(0.25), &Signal::Error, |x, y| x + y, i32::wrapping_add);
        assert_eq!(sum, constant(0.25));
        let product = combine(&constant(0.25), &Signal::Error, |x, y| x * y, i32::wrapping_mul);
        assert_eq!(product, constant(0.0));
        let bb = combine(
            &Signal::bytebeat([3; BYTEBEAT_SIZE]),
            &Signal::bytebeat([4; BYTEBEAT_SIZE]),
            |x, y| x + y,
            i32::wrapping_add,
        );
        assert_eq!(bb, Signal::bytebeat([7; BYTEBEAT_SIZE]));
        assert!(combine(&Signal::Error, &Signal::Error, |x, _| x, |x, _| x).is_error());
    }

    #[test]
    fn audio_outranks_bytebeat() {
        let mixed = combine(
            &Signal::bytebeat([5; BYTEBEAT_SIZE]),
            &constant(0.5),
            |x, y| x + y,
            i32::wrapping_add,
        );
        assert_eq!(mixed, constant(0.5));
    }

    #[test]
    fn equalizer_blocks_dc_in_the_high_band() {
        let mut filter = ShelvingFilter::default();
        let mut last = 0.0;
        for _ in 0..2000 {
            last = filter.process(&constant(1.0)).as_audio().unwrap()[BLOCK_SIZE - 1];
        }
        // Settled: low band passes 0.5, high band decays to zero.
        assert!((last as f64 - 0.5 * LOW_MIX).abs() < 1e-3, "{}", last);
    }

    #[test]
    fn equalizer_resets_on_error() {
        let mut filter = ShelvingFilter::default();
        filter.process(&constant(1.0));
        assert!(filter.process(&Signal::Error).is_error());
        let fresh = ShelvingFilter::default().process(&constant(1.0));
        assert_eq!(filter.process(&constant(1.0)), fresh);
    }

    #[test]
    fn slider_ramps_while_held() {
        let mut slider = Slider::default();
        let mut pads = UiGrid::new();
        pads.set(0, 0, true);
        let out = slider.process(&Signal::ui(pads), 48_000.0);
        let out = out.as_audio().unwrap();
        assert_eq!(out[0], 0.0);
        let expected = SLIDE_RATE * BLOCK_SIZE as f64 / 48_000.0;
        assert!((slider.value() - expected).abs() < 1e-12);
        // Both pads cancel; an Error input holds the value.
        pads.set(0, 1, true);
        slider.process(&Signal::ui(pads), 48_000.0);
        slider.process(&Signal::Error, 48_000.0);
        assert!((slider.value() - expected).abs() < 1e-12);
    }
}
