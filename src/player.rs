//! Player: turns the output slot into sound and lamp state.
//!
//! The output slot carries `Pair(audio, Pair(ui, ui))`. Each cycle the player
//! commits the current audio block to its sink, which is the one blocking call
//! pacing the loop, and then ticks the graph.

use crate::graph::OUTPUT_SLOT;
use crate::scheduler::Scheduler;
use crate::value::{AudioBlock, Signal, UiGrid};
use crate::BLOCK_SIZE;
use std::fmt;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use std::thread;
use std::time::Duration;

/// Output gain applied before clamping. Negative to restore the waveform's
/// polarity.
pub const MASTER_GAIN: f32 = -0.2;
/// Output channels; the mono block is duplicated.
pub const CHANNELS: usize = 2;
/// Sleep per block when no device paces the loop.
pub const IDLE_PACE: Duration = Duration::from_millis(1);

/// Interleaved 16-bit PCM for one block.
pub type PcmBlock = [i16; BLOCK_SIZE * CHANNELS];

/// What the output slot decomposes into. Missing parts read as silence and
/// dark lamps.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frame {
    pub audio: AudioBlock,
    /// Lamps of the right-hand array.
    pub right_lamps: UiGrid,
    /// Lamps of the left-hand array.
    pub left_lamps: UiGrid,
}

impl Frame {
    pub fn decompose(output: &Signal) -> Self {
        let mut frame = Frame {
            audio: [0.0; BLOCK_SIZE],
            right_lamps: UiGrid::new(),
            left_lamps: UiGrid::new(),
        };
        let Some((audio, lamps)) = output.as_pair() else {
            log::trace!("output slot holds {:?}, playing silence", output.kind());
            return frame;
        };
        if let Some(block) = audio.as_audio() {
            frame.audio = *block;
        }
        if let Some((right, left)) = lamps.as_pair() {
            if let Some(grid) = right.as_ui() {
                frame.right_lamps = *grid;
            }
            if let Some(grid) = left.as_ui() {
                frame.left_lamps = *grid;
            }
        }
        frame
    }

    /// Gain, clamp and convert to interleaved stereo.
    pub fn to_pcm(&self) -> PcmBlock {
        let mut pcm = [0i16; BLOCK_SIZE * CHANNELS];
        for (pair, &s) in pcm.chunks_exact_mut(CHANNELS).zip(self.audio.iter()) {
            let v = (s * MASTER_GAIN).clamp(-1.0, 1.0);
            pair.fill((v * 32767.0) as i16);
        }
        pcm
    }
}

#[derive(Debug)]
pub enum SinkError {
    Wav(hound::Error),
    /// Commit after the sink was finished.
    Closed,
}

impl fmt::Display for SinkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SinkError::Wav(e) => write!(f, "wav output failed: {}", e),
            SinkError::Closed => write!(f, "sink already finished"),
        }
    }
}

impl std::error::Error for SinkError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SinkError::Wav(e) => Some(e),
            SinkError::Closed => None,
        }
    }
}

impl From<hound::Error> for SinkError {
    fn from(e: hound::Error) -> Self {
        SinkError::Wav(e)
    }
}

/// Destination for rendered blocks.
pub trait AudioSink {
    /// Deliver one block. May block to pace the caller.
    fn commit(&mut self, pcm: &PcmBlock) -> Result<(), SinkError>;

    /// Flush and close.
    fn finish(&mut self) -> Result<(), SinkError> {
        Ok(())
    }
}

/// Writes 16-bit stereo WAV.
pub struct WavSink {
    writer: Option<hound::WavWriter<BufWriter<File>>>,
}

impl WavSink {
    pub fn create(path: &Path, sample_rate: u32) -> Result<Self, SinkError> {
        let spec = hound::WavSpec {
            channels: CHANNELS as u16,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let writer = hound::WavWriter::create(path, spec)?;
        Ok(Self {
            writer: Some(writer),
        })
    }
}

impl AudioSink for WavSink {
    fn commit(&mut self, pcm: &PcmBlock) -> Result<(), SinkError> {
        let writer = self.writer.as_mut().ok_or(SinkError::Closed)?;
        for &sample in pcm.iter() {
            writer.write_sample(sample)?;
        }
        Ok(())
    }

    fn finish(&mut self) -> Result<(), SinkError> {
        if let Some(writer) = self.writer.take() {
            writer.finalize()?;
        }
        Ok(())
    }
}

/// Discards audio, sleeping a fixed time per block to approximate device
/// pacing.
#[derive(Debug, Clone, Copy)]
pub struct PacedSink {
    pace: Duration,
}

impl PacedSink {
    pub fn new(pace: Duration) -> Self {
        Self { pace }
    }
}

impl Default for PacedSink {
    fn default() -> Self {
        Self::new(IDLE_PACE)
    }
}

impl AudioSink for PacedSink {
    fn commit(&mut self, _pcm: &PcmBlock) -> Result<(), SinkError> {
        if !self.pace.is_zero() {
            thread::sleep(self.pace);
        }
        Ok(())
    }
}

/// Open a WAV sink, or fall back to timing-only pacing when that fails.
pub fn open_sink(path: Option<&Path>, sample_rate: u32) -> Box<dyn AudioSink> {
    match path {
        Some(path) => match WavSink::create(path, sample_rate) {
            Ok(sink) => Box::new(sink),
            Err(e) => {
                log::warn!("{}: {}; continuing without audio output", path.display(), e);
                Box::new(PacedSink::default())
            }
        },
        None => Box::new(PacedSink::default()),
    }
}

/// Drives a scheduler against a sink.
pub struct Player {
    scheduler: Scheduler,
    sink: Box<dyn AudioSink>,
    frame: Frame,
}

impl Player {
    pub fn new(scheduler: Scheduler, sink: Box<dyn AudioSink>) -> Self {
        let frame = Frame::decompose(scheduler.value_at(OUTPUT_SLOT));
        Self {
            scheduler,
            sink,
            frame,
        }
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn scheduler_mut(&mut self) -> &mut Scheduler {
        &mut self.scheduler
    }

    /// The most recently committed frame.
    pub fn frame(&self) -> &Frame {
        &self.frame
    }

    /// Commit the current output block, then tick.
    pub fn cycle(&mut self) -> Result<(), SinkError> {
        self.frame = Frame::decompose(self.scheduler.output());
        self.sink.commit(&self.frame.to_pcm())?;
        self.scheduler.tick();
        Ok(())
    }

    /// Run `cycles` cycles and close the sink.
    pub fn run(&mut self, cycles: u64) -> Result<(), SinkError> {
        for _ in 0..cycles {
            self.cycle()?;
        }
        self.sink.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn output(audio: Signal, right: Signal, left: Signal) -> Signal {
        Signal::pair(audio, Signal::pair(right, left))
    }

    #[test]
    fn decomposes_convention_value() {
        let mut lamps = UiGrid::new();
        lamps.set(3, 4, true);
        let value = output(Signal::audio([0.5; BLOCK_SIZE]), Signal::ui(lamps), Signal::Error);
        let frame = Frame::decompose(&value);
        assert_eq!(frame.audio, [0.5; BLOCK_SIZE]);
        assert_eq!(frame.right_lamps, lamps);
        assert_eq!(frame.left_lamps, UiGrid::new());
    }

    #[test]
    fn non_pair_output_is_silent_and_dark() {
        let frame = Frame::decompose(&Signal::silence());
        assert_eq!(frame.audio, [0.0; BLOCK_SIZE]);
        assert_eq!(frame.right_lamps.count(), 0);
    }

    #[test]
    fn pcm_inverts_scales_and_clamps() {
        let mut audio = [0.0f32; BLOCK_SIZE];
        audio[0] = 1.0;
        audio[1] = -10.0;
        let frame = Frame::decompose(&output(Signal::audio(audio), Signal::Error, Signal::Error));
        let pcm = frame.to_pcm();
        assert_eq!(pcm[0], (-0.2f32 * 32767.0) as i16);
        assert_eq!(pcm[0], pcm[1]);
        assert_eq!(pcm[2], 32767);
        assert_eq!(pcm[4], 0);
    }

    #[test]
    fn paced_sink_accepts_blocks() {
        let mut sink = PacedSink::new(Duration::ZERO);
        sink.commit(&[0; BLOCK_SIZE * CHANNELS]).unwrap();
        sink.finish().unwrap();
    }

    #[test]
    fn unwritable_path_falls_back() {
        let mut sink = open_sink(Some(Path::new("/nonexistent/dir/out.wav")), 48_000);
        assert!(sink.commit(&[0; BLOCK_SIZE * CHANNELS]).is_ok());
    }
}
