//! Routing operators: delay lines and pair access.

use crate::value::Signal;

/// Length of both delay lines, in ticks.
pub const DELAY_TICKS: usize = 115;

/// Fixed-length delay. Retained inputs are deep copies, so they outlive the
/// snapshot they were read from.
#[derive(Debug)]
pub struct DelayLine {
    ring: Vec<Signal>,
    pos: usize,
    /// Latch the input into every slot once per revolution instead of one slot
    /// per tick.
    synchronous: bool,
}

impl DelayLine {
    pub fn new(synchronous: bool) -> Self {
        Self {
            ring: vec![Signal::Error; DELAY_TICKS],
            pos: 0,
            synchronous,
        }
    }

    /// Emit the value stored [`DELAY_TICKS`] ticks ago and store `input`.
    pub fn tick(&mut self, input: &Signal) -> Signal {
        let out = if self.synchronous {
            let out = self.ring[self.pos].clone();
            if self.pos == 0 {
                let latched = input.duplicate();
                for slot in self.ring.iter_mut() {
                    *slot = latched.duplicate();
                }
            }
            out
        } else {
            std::mem::replace(&mut self.ring[self.pos], input.duplicate())
        };
        self.pos = (self.pos + 1) % DELAY_TICKS;
        out
    }
}

pub fn first(input: &Signal) -> Signal {
    match input.as_pair() {
        Some((first, _)) => first.clone(),
        None => Signal::Error,
    }
}

pub fn second(input: &Signal) -> Signal {
    match input.as_pair() {
        Some((_, second)) => second.clone(),
        None => Signal::Error,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::BYTEBEAT_SIZE;

    #[test]
    fn delay_emits_after_full_revolution() {
        let mut line = DelayLine::new(false);
        let marker = Signal::bytebeat([7; BYTEBEAT_SIZE]);
        assert!(line.tick(&marker).is_error());
        for _ in 1..DELAY_TICKS {
            assert!(line.tick(&Signal::Error).is_error());
        }
        let out = line.tick(&Signal::Error);
        assert_eq!(out, marker);
        assert!(!out.shares_payload(&marker));
    }

    #[test]
    fn synchronous_delay_latches_once_per_revolution() {
        let mut line = DelayLine::new(true);
        let a = Signal::bytebeat([1; BYTEBEAT_SIZE]);
        let b = Signal::bytebeat([2; BYTEBEAT_SIZE]);
        assert!(line.tick(&a).is_error());
        // Inputs between latches are ignored.
        for _ in 1..DELAY_TICKS {
            assert_eq!(line.tick(&b), a);
        }
        // Slot 0 still holds the first latch; `b` is latched now.
        assert_eq!(line.tick(&b), a);
        assert_eq!(line.tick(&Signal::Error), b);
    }

    #[test]
    fn pair_access_rejects_non_pairs() {
        let pair = Signal::pair(Signal::silence(), Signal::Error);
        assert_eq!(first(&pair), Signal::silence());
        assert!(second(&pair).is_error());
        assert!(first(&Signal::silence()).is_error());
    }
}
