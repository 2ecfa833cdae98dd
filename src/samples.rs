//! Sample bank for the playback operator.

use std::fmt;
use std::path::Path;

/// Frames in the silent stand-in used when no sample could be loaded.
pub const SILENT_FRAMES: usize = 1024;

#[derive(Debug)]
pub enum SampleError {
    Wav(hound::Error),
    /// The file decoded but held no frames.
    Empty,
}

impl fmt::Display for SampleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SampleError::Wav(e) => write!(f, "could not read sample: {}", e),
            SampleError::Empty => write!(f, "sample has no frames"),
        }
    }
}

impl std::error::Error for SampleError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SampleError::Wav(e) => Some(e),
            SampleError::Empty => None,
        }
    }
}

impl From<hound::Error> for SampleError {
    fn from(e: hound::Error) -> Self {
        SampleError::Wav(e)
    }
}

/// One mono sample, played in a loop. Immutable once loaded.
#[derive(Debug, Clone)]
pub struct SampleBank {
    frames: Vec<f32>,
}

impl Default for SampleBank {
    fn default() -> Self {
        Self::silent(SILENT_FRAMES)
    }
}

impl SampleBank {
    pub fn silent(frames: usize) -> Self {
        Self {
            frames: vec![0.0; frames.max(1)],
        }
    }

    pub fn from_frames(frames: Vec<f32>) -> Result<Self, SampleError> {
        if frames.is_empty() {
            return Err(SampleError::Empty);
        }
        Ok(Self { frames })
    }

    /// Read the left channel of a WAV file, scaled to [-1, 1).
    pub fn load(path: &Path) -> Result<Self, SampleError> {
        let mut reader = hound::WavReader::open(path)?;
        let spec = reader.spec();
        let channels = spec.channels.max(1) as usize;

        let interleaved: Vec<f32> = match spec.sample_format {
            hound::SampleFormat::Float => reader.samples::<f32>().collect::<Result<_, _>>()?,
            hound::SampleFormat::Int => {
                let full_scale = (1i64 << (spec.bits_per_sample - 1)) as f32;
                reader
                    .samples::<i32>()
                    .map(|s| s.map(|v| v as f32 / full_scale))
                    .collect::<Result<_, _>>()?
            }
        };

        let left = interleaved.into_iter().step_by(channels).collect();
        let bank = Self::from_frames(left)?;
        log::info!(
            "loaded {} frames from {}",
            bank.len(),
            path.display()
        );
        Ok(bank)
    }

    /// [`load`](Self::load), degrading to silence with a warning.
    pub fn load_or_silent(path: &Path) -> Self {
        match Self::load(path) {
            Ok(bank) => bank,
            Err(e) => {
                log::warn!("{}: {}; playing silence", path.display(), e);
                Self::silent(SILENT_FRAMES)
            }
        }
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Frame at `pos`, wrapping around the end.
    #[inline]
    pub fn frame(&self, pos: usize) -> f32 {
        self.frames[pos % self.frames.len()]
    }
}
