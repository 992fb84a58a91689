//! Deterministic WAV fixtures.
//!
//! The ramp fixture stores `frame % RAMP_PERIOD` in the left channel, so a
//! test can tell from the first decoded sample exactly which frame a read
//! started at.

#![allow(dead_code)]

use std::f32::consts::PI;
use std::path::Path;

use hound::{SampleFormat, WavSpec, WavWriter};

pub const RAMP_PERIOD: u64 = 30_000;

fn spec(sample_rate: u32, channels: u16) -> WavSpec {
    WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    }
}

/// Stereo ramp: left = frame index modulo [`RAMP_PERIOD`], right = silence.
pub fn generate_ramp_wav<P: AsRef<Path>>(
    path: P,
    sample_rate: u32,
    duration_ms: u64,
) -> Result<(), hound::Error> {
    let mut writer = WavWriter::create(path, spec(sample_rate, 2))?;
    let frames = sample_rate as u64 * duration_ms / 1000;
    for frame in 0..frames {
        writer.write_sample((frame % RAMP_PERIOD) as i16)?;
        writer.write_sample(0i16)?;
    }
    writer.finalize()
}

/// Sine at `frequency_hz` on every channel.
pub fn generate_sine_wav<P: AsRef<Path>>(
    path: P,
    sample_rate: u32,
    channels: u16,
    duration_ms: u64,
    frequency_hz: f32,
    amplitude: f32,
) -> Result<(), hound::Error> {
    let mut writer = WavWriter::create(path, spec(sample_rate, channels))?;
    let frames = sample_rate as u64 * duration_ms / 1000;
    for frame in 0..frames {
        let t = frame as f32 / sample_rate as f32;
        let value = (amplitude * (2.0 * PI * frequency_hz * t).sin() * i16::MAX as f32) as i16;
        for _ in 0..channels {
            writer.write_sample(value)?;
        }
    }
    writer.finalize()
}

/// Little-endian 16-bit sample at `index` within `bytes`.
pub fn sample_at(bytes: &[u8], index: usize) -> i16 {
    i16::from_le_bytes([bytes[index * 2], bytes[index * 2 + 1]])
}
