//! Bytebeat operators: integer streams at one sixth of the audio rate.

use crate::value::{ByteBeatBlock, Signal};
use crate::{BYTEBEAT_OVERSAMPLE, BYTEBEAT_SIZE};

/// Free-running integer clock.
#[derive(Debug, Default)]
pub struct ByteBeatClock {
    t: i32,
}

impl ByteBeatClock {
    pub fn next_block(&mut self) -> Signal {
        let mut block = [0i32; BYTEBEAT_SIZE];
        for v in block.iter_mut() {
            *v = self.t;
            self.t = self.t.wrapping_add(1);
        }
        Signal::bytebeat(block)
    }
}

/// Integer stepped up by rising edges on cell `[0][0]` and down by rising
/// edges on `[0][1]`.
#[derive(Debug, Default)]
pub struct ByteBeatSlider {
    value: i32,
    old_plus: bool,
    old_minus: bool,
}

impl ByteBeatSlider {
    pub fn process(&mut self, input: &Signal) -> Signal {
        let pads = input.as_ui().copied().unwrap_or_default();
        let (plus, minus) = (pads.get(0, 0), pads.get(0, 1));
        if plus && !self.old_plus {
            self.value = self.value.wrapping_add(1);
        }
        if minus && !self.old_minus {
            self.value = self.value.wrapping_sub(1);
        }
        self.old_plus = plus;
        self.old_minus = minus;
        constant(self.value)
    }
}

pub fn constant(value: i32) -> Signal {
    Signal::bytebeat([value; BYTEBEAT_SIZE])
}

pub fn map_values(input: &Signal, f: impl Fn(i32) -> i32) -> Signal {
    match input.as_bytebeat() {
        Some(block) => {
            let mut out: ByteBeatBlock = *block;
            out.iter_mut().for_each(|v| *v = f(*v));
            Signal::bytebeat(out)
        }
        None => Signal::Error,
    }
}

/// Bitwise combination; a single mismatched side reads as zeros.
pub fn combine(a: &Signal, b: &Signal, f: impl Fn(i32, i32) -> i32) -> Signal {
    const ZEROS: ByteBeatBlock = [0; BYTEBEAT_SIZE];
    if a.as_bytebeat().is_none() && b.as_bytebeat().is_none() {
        return Signal::Error;
    }
    let lhs = a.as_bytebeat().unwrap_or(&ZEROS);
    let rhs = b.as_bytebeat().unwrap_or(&ZEROS);
    let mut out = [0i32; BYTEBEAT_SIZE];
    for (o, (&x, &y)) in out.iter_mut().zip(lhs.iter().zip(rhs.iter())) {
        *o = f(x, y);
    }
    Signal::bytebeat(out)
}

/// Low byte of each value as a sample in [-1, 1), held for the oversampling
/// factor.
pub fn to_audio(input: &Signal) -> Signal {
    let Some(block) = input.as_bytebeat() else {
        return Signal::Error;
    };
    let mut out = [0.0f32; BYTEBEAT_SIZE * BYTEBEAT_OVERSAMPLE];
    for (chunk, &v) in out.chunks_exact_mut(BYTEBEAT_OVERSAMPLE).zip(block.iter()) {
        let sample = (v & 0xff) as f32 / 256.0 * 2.0 - 1.0;
        chunk.fill(sample);
    }
    Signal::audio(out)
}
