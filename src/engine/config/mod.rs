//! Per-session decoder configuration.
//!
//! A [`DecoderConfig`] is handed to every session at open time; there is no
//! process-wide default that one session could change under another.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::engine::error::{Result, SessionError};

/// Sample width of the produced PCM.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u16", into = "u16")]
pub enum BitDepth {
    /// Unsigned 8-bit, centred on 128.
    U8,
    S16,
    S24,
    S32,
}

impl BitDepth {
    pub fn bits(self) -> u16 {
        match self {
            BitDepth::U8 => 8,
            BitDepth::S16 => 16,
            BitDepth::S24 => 24,
            BitDepth::S32 => 32,
        }
    }

    pub fn bytes(self) -> usize {
        self.bits() as usize / 8
    }
}

impl TryFrom<u16> for BitDepth {
    type Error = String;

    fn try_from(bits: u16) -> std::result::Result<Self, Self::Error> {
        match bits {
            8 => Ok(BitDepth::U8),
            16 => Ok(BitDepth::S16),
            24 => Ok(BitDepth::S24),
            32 => Ok(BitDepth::S32),
            other => Err(format!("unsupported bits per sample: {}", other)),
        }
    }
}

impl From<BitDepth> for u16 {
    fn from(depth: BitDepth) -> Self {
        depth.bits()
    }
}

/// Shape of the PCM a session hands out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputFormat {
    /// Output rate in Hz. `None` keeps the source rate.
    pub sample_rate: Option<u32>,
    /// Output channel count. `None` keeps the source layout.
    pub channels: Option<u16>,
    pub bits_per_sample: BitDepth,
}

impl Default for OutputFormat {
    fn default() -> Self {
        Self {
            sample_rate: None,
            channels: None,
            bits_per_sample: BitDepth::S16,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecoderConfig {
    pub output: OutputFormat,
    /// Apply a gentle low-pass to the output to take the edge off aliasing.
    pub noise_reduction: bool,
    /// Frames per resampler input chunk.
    pub resample_chunk_frames: usize,
    /// Linear gain applied before integer conversion.
    pub scale: f32,
    /// Byte count used by `read_default`.
    pub read_size: usize,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            output: OutputFormat::default(),
            noise_reduction: false,
            resample_chunk_frames: 1024,
            scale: 1.0,
            read_size: 1024,
        }
    }
}

impl DecoderConfig {
    /// Fixed 44.1 kHz stereo 16-bit output with noise reduction, the way
    /// tracker modules are traditionally rendered.
    pub fn tracker() -> Self {
        Self {
            output: OutputFormat {
                sample_rate: Some(44_100),
                channels: Some(2),
                bits_per_sample: BitDepth::S16,
            },
            noise_reduction: true,
            ..Self::default()
        }
    }

    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: DecoderConfig =
            toml::from_str(text).map_err(|e| SessionError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> Result<()> {
        if self.output.sample_rate == Some(0) {
            return Err(SessionError::Config("output sample rate must be non-zero".into()));
        }
        if self.output.channels == Some(0) {
            return Err(SessionError::Config("output channel count must be non-zero".into()));
        }
        if self.resample_chunk_frames == 0 {
            return Err(SessionError::Config("resample chunk must hold at least one frame".into()));
        }
        if !self.scale.is_finite() || self.scale < 0.0 {
            return Err(SessionError::InvalidScale(self.scale));
        }
        Ok(())
    }
}
