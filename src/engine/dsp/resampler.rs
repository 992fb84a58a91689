use audioadapter_buffers::direct::SequentialSliceOfVecs;
use rubato::{Fft, FixedSync, Resampler as RubatoResampler};

use crate::engine::error::{Result, SessionError};

/// Interleaved wrapper over rubato's FFT resampler.
///
/// Input is accumulated until a full chunk is available. The filter's own
/// delay is dropped from the front of the output, and the flush emits only
/// as many frames as the consumed input accounts for, so output frame `n`
/// lines up with input time `n / target_rate`.
pub struct Resampler {
    resampler: Fft<f32>,
    source_rate: u64,
    target_rate: u64,
    channels: usize,
    chunk_size: usize,
    buffer: Vec<f32>,
    /// Output frames still to discard before real signal starts.
    delay_remaining: usize,
    input_frames: u64,
    output_frames: u64,
}

impl Resampler {
    pub fn new(
        source_sample_rate: u32,
        target_sample_rate: u32,
        channels: usize,
        chunk_size: usize,
    ) -> Result<Self> {
        let resampler = Fft::<f32>::new(
            source_sample_rate as usize,
            target_sample_rate as usize,
            chunk_size,
            2,
            channels,
            FixedSync::Input,
        )
        .map_err(|e| SessionError::Resampler(e.to_string()))?;
        let delay_remaining = resampler.output_delay();

        Ok(Self {
            resampler,
            source_rate: source_sample_rate as u64,
            target_rate: target_sample_rate as u64,
            channels,
            chunk_size,
            buffer: Vec::with_capacity(chunk_size * channels),
            delay_remaining,
            input_frames: 0,
            output_frames: 0,
        })
    }

    pub fn process(&mut self, input: &[f32]) -> Result<Vec<f32>> {
        self.input_frames += (input.len() / self.channels) as u64;
        self.buffer.extend_from_slice(input);
        self.drain_chunks()
    }

    /// Pushes the partial chunk through, padded with silence, until the
    /// output covers all consumed input. Padding never reaches the caller.
    pub fn flush(&mut self) -> Result<Vec<f32>> {
        let expected = self.expected_output_frames();
        let mut out = Vec::new();
        let per_chunk =
            (self.chunk_size as u64 * self.target_rate / self.source_rate.max(1)).max(1);
        let missing = expected.saturating_sub(self.output_frames) + self.delay_remaining as u64;
        let max_rounds = missing / per_chunk + 2;
        let mut rounds = 0;

        while self.output_frames < expected && rounds < max_rounds {
            let remaining_frames = self.buffer.len() / self.channels;
            let padding_needed = (self.chunk_size - remaining_frames) * self.channels;
            self.buffer.resize(self.buffer.len() + padding_needed, 0.0);
            out.extend(self.drain_chunks()?);
            rounds += 1;
        }
        self.buffer.clear();

        if self.output_frames > expected {
            let excess = (self.output_frames - expected) as usize * self.channels;
            out.truncate(out.len().saturating_sub(excess));
            self.output_frames = expected;
        }
        Ok(out)
    }

    /// Drops buffered input and filter history, e.g. after a seek.
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.resampler.reset();
        self.delay_remaining = self.resampler.output_delay();
        self.input_frames = 0;
        self.output_frames = 0;
    }

    /// `ceil(input_frames * target / source)`
    fn expected_output_frames(&self) -> u64 {
        let scaled = self.input_frames as u128 * self.target_rate as u128;
        scaled.div_ceil(self.source_rate.max(1) as u128) as u64
    }

    fn drain_chunks(&mut self) -> Result<Vec<f32>> {
        let mut all_output = Vec::new();
        let chunk_len = self.chunk_size * self.channels;

        while self.buffer.len() >= chunk_len {
            let num_frames = self.chunk_size;
            let mut input_buffer = vec![vec![0.0; num_frames]; self.channels];
            for (i, frame) in self.buffer[..chunk_len].chunks_exact(self.channels).enumerate() {
                for (ch, &sample) in frame.iter().enumerate() {
                    input_buffer[ch][i] = sample;
                }
            }
            self.buffer.drain(..chunk_len);

            let out_len = self.resampler.output_frames_next();
            let mut output_buffer = vec![vec![0.0; out_len]; self.channels];
            let input_adapter = SequentialSliceOfVecs::new(&input_buffer, self.channels, num_frames)
                .map_err(|e| SessionError::Decode(format!("resampler input: {}", e)))?;
            let mut output_adapter =
                SequentialSliceOfVecs::new_mut(&mut output_buffer, self.channels, out_len)
                    .map_err(|e| SessionError::Decode(format!("resampler output: {}", e)))?;

            self.resampler
                .process_into_buffer(&input_adapter, &mut output_adapter, None)
                .map_err(|e| SessionError::Decode(format!("resampling failed: {}", e)))?;

            let skip = self.delay_remaining.min(out_len);
            self.delay_remaining -= skip;
            self.output_frames += (out_len - skip) as u64;

            all_output.reserve((out_len - skip) * self.channels);
            for i in skip..out_len {
                for channel in &output_buffer {
                    all_output.push(channel[i]);
                }
            }
        }

        Ok(all_output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn doubles_frame_count_exactly() {
        let mut r = Resampler::new(22_050, 44_100, 2, 256).unwrap();
        let input = vec![0.1f32; 256 * 2 * 8];
        let mut out = r.process(&input).unwrap();
        out.extend(r.flush().unwrap());
        assert_eq!(out.len(), 256 * 8 * 2 * 2);
    }

    #[test]
    fn filter_delay_is_removed() {
        let mut r = Resampler::new(22_050, 44_100, 1, 256).unwrap();
        let input = vec![0.5f32; 4096];
        let mut out = r.process(&input).unwrap();
        out.extend(r.flush().unwrap());

        assert_eq!(out.len(), 8192);
        // Well past the leading edge of the filter, the level is the input's.
        assert!((out[1024] - 0.5).abs() < 0.01, "{}", out[1024]);
        assert!((out[6000] - 0.5).abs() < 0.01, "{}", out[6000]);
    }

    #[test]
    fn reset_restarts_the_output_count() {
        let mut r = Resampler::new(22_050, 44_100, 1, 256).unwrap();
        r.process(&[0.25; 1000]).unwrap();
        r.reset();
        let mut out = r.process(&[0.25; 300]).unwrap();
        out.extend(r.flush().unwrap());
        assert_eq!(out.len(), 600);
    }

    #[test]
    fn partial_chunk_waits_for_more_input() {
        let mut r = Resampler::new(48_000, 44_100, 1, 512).unwrap();
        assert!(r.process(&[0.0; 100]).unwrap().is_empty());
        assert_eq!(r.flush().unwrap().len(), 92);
        assert!(r.flush().unwrap().is_empty());
    }
}
