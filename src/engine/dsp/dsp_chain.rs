use tracing::debug;

use crate::engine::dsp::biquad::BiquadFilter;
use crate::engine::dsp::remix::remix;
use crate::engine::dsp::resampler::Resampler;
use crate::engine::error::{Result, SessionError};

/// Cutoff of the noise-reduction low-pass, capped below Nyquist.
const NOISE_REDUCTION_HZ: f32 = 16_000.0;

/// Post-decode processing between the engine's native blocks and the
/// session's output format: channel remix, resampling, optional
/// noise reduction, then gain.
pub struct DspChain {
    source_channels: usize,
    output_channels: usize,
    resampler: Option<Resampler>,
    noise_filters: Vec<BiquadFilter>,
    scale: f32,
}

impl DspChain {
    pub fn new(
        source_rate: u32,
        source_channels: usize,
        output_rate: u32,
        output_channels: usize,
        chunk_frames: usize,
        noise_reduction: bool,
        scale: f32,
    ) -> Result<Self> {
        let resampler = if source_rate != output_rate {
            debug!(
                from = source_rate,
                to = output_rate,
                channels = output_channels,
                "Initializing resampler"
            );
            Some(Resampler::new(source_rate, output_rate, output_channels, chunk_frames)?)
        } else {
            None
        };

        let noise_filters = if noise_reduction {
            let cutoff = NOISE_REDUCTION_HZ.min(output_rate as f32 * 0.45);
            (0..output_channels)
                .map(|_| BiquadFilter::low_pass(output_rate as f32, cutoff, 0.707))
                .collect()
        } else {
            Vec::new()
        };

        let mut chain = Self {
            source_channels,
            output_channels,
            resampler,
            noise_filters,
            scale: 1.0,
        };
        chain.set_scale(scale)?;
        Ok(chain)
    }

    /// Processes one decoded block. May return fewer frames than it was
    /// given (or none) while the resampler fills its next chunk.
    pub fn process(&mut self, block: &[f32]) -> Result<Vec<f32>> {
        let mut samples = remix(block, self.source_channels, self.output_channels);
        if let Some(resampler) = &mut self.resampler {
            samples = resampler.process(&samples)?;
        }
        self.finish(&mut samples);
        Ok(samples)
    }

    /// Drains anything still held by the resampler at end of stream.
    pub fn flush(&mut self) -> Result<Vec<f32>> {
        let mut samples = match &mut self.resampler {
            Some(resampler) => resampler.flush()?,
            None => Vec::new(),
        };
        self.finish(&mut samples);
        Ok(samples)
    }

    /// Forgets all history, e.g. after a seek.
    pub fn reset(&mut self) {
        if let Some(resampler) = &mut self.resampler {
            resampler.reset();
        }
        for filter in &mut self.noise_filters {
            filter.reset();
        }
    }

    pub fn set_scale(&mut self, scale: f32) -> Result<()> {
        if !scale.is_finite() || scale < 0.0 {
            return Err(SessionError::InvalidScale(scale));
        }
        self.scale = scale;
        Ok(())
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    fn finish(&mut self, samples: &mut [f32]) {
        if !self.noise_filters.is_empty() {
            for frame in samples.chunks_exact_mut(self.output_channels) {
                for (sample, filter) in frame.iter_mut().zip(self.noise_filters.iter_mut()) {
                    *sample = filter.process(*sample);
                }
            }
        }
        if self.scale != 1.0 {
            for sample in samples.iter_mut() {
                *sample *= self.scale;
            }
        }
    }
}
