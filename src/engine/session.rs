use std::path::Path;

use tracing::{debug, info};

use crate::engine::buffer::PcmBuffer;
use crate::engine::clock::{PositionClock, SessionState};
use crate::engine::config::{BitDepth, DecoderConfig};
use crate::engine::convert::samples_to_bytes;
use crate::engine::decoder::{symphonia_decoder::SymphoniaDecoder, DecoderEngine};
use crate::engine::dsp::DspChain;
use crate::engine::error::{Result, SessionError};
use crate::engine::source::SourceBuffer;

/// One open audio source, its engine, and its position cursor.
///
/// Reads are pull-based: each call hands out up to the requested number of
/// bytes of interleaved little-endian PCM in the session's output format.
/// An empty read means end of stream and is not an error.
///
/// Position is bookkeeping, not a query of the engine: reads advance it by
/// the duration of the bytes handed out, seeks overwrite it with the
/// requested value. Block-aligned decoding means it may drift slightly
/// from the engine's true position.
pub struct DecodeSession {
    state: SessionState,
    config: DecoderConfig,
    // The engine holds its own handle to the source bytes.
    engine: Option<Box<dyn DecoderEngine>>,
    dsp: Option<DspChain>,
    source: Option<SourceBuffer>,
    pending: PcmBuffer,
    clock: PositionClock,
    title: String,
    length_ms: u64,
    total_frames: u64,
    source_rate: u32,
    sample_rate: u32,
    channels: u16,
    depth: BitDepth,
    drained: bool,
}

impl DecodeSession {
    /// An unopened session holding only its configuration.
    pub fn new(config: DecoderConfig) -> Self {
        let depth = config.output.bits_per_sample;
        Self {
            state: SessionState::Unopened,
            config,
            engine: None,
            dsp: None,
            source: None,
            pending: PcmBuffer::new(),
            clock: PositionClock::new(0, 0, depth.bytes()),
            title: String::new(),
            length_ms: 0,
            total_frames: 0,
            source_rate: 0,
            sample_rate: 0,
            channels: 0,
            depth,
            drained: false,
        }
    }

    /// Opens `path` with the given configuration.
    pub fn open<P: AsRef<Path>>(path: P, config: DecoderConfig) -> Result<Self> {
        let mut session = Self::new(config);
        session.load(path)?;
        Ok(session)
    }

    /// Loads `path` into an unopened session. On failure the session stays
    /// unopened and everything acquired so far has been released.
    pub fn load<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        self.expect_state(SessionState::Unopened, "load")?;
        self.config.validate()?;

        let source = SourceBuffer::load(path)?;
        let engine = SymphoniaDecoder::from_bytes(source.shared(), source.extension())?;
        self.attach(source, Box::new(engine))
    }

    /// Takes ownership of a loaded source and the engine decoding it.
    pub(crate) fn attach(
        &mut self,
        source: SourceBuffer,
        engine: Box<dyn DecoderEngine>,
    ) -> Result<()> {
        let source_rate = engine.sample_rate();
        let source_channels = engine.channels();
        let sample_rate = self.config.output.sample_rate.unwrap_or(source_rate);
        let channels = self.config.output.channels.unwrap_or(source_channels);

        let dsp = DspChain::new(
            source_rate,
            source_channels as usize,
            sample_rate,
            channels as usize,
            self.config.resample_chunk_frames,
            self.config.noise_reduction,
            self.config.scale,
        )?;

        let total_frames = engine.total_frames();
        let length_ms = if source_rate > 0 {
            total_frames * 1000 / source_rate as u64
        } else {
            0
        };
        let title = engine
            .title()
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| source.base_name());

        info!(
            path = %source.path().display(),
            title = %title,
            length_ms,
            source_rate,
            sample_rate,
            channels,
            bits = self.depth.bits(),
            "Opened decode session"
        );

        self.clock = PositionClock::new(sample_rate, channels, self.depth.bytes());
        self.pending.clear();
        self.title = title;
        self.length_ms = length_ms;
        self.total_frames = total_frames;
        self.source_rate = source_rate;
        self.sample_rate = sample_rate;
        self.channels = channels;
        self.drained = false;
        self.dsp = Some(dsp);
        self.engine = Some(engine);
        self.source = Some(source);
        self.state = SessionState::Opened;
        Ok(())
    }

    /// Returns up to `max_bytes` of decoded PCM. Empty at end of stream.
    pub fn read(&mut self, max_bytes: usize) -> Result<Vec<u8>> {
        self.expect_state(SessionState::Opened, "read")?;
        if max_bytes == 0 {
            return Ok(Vec::new());
        }

        while self.pending.len() < max_bytes && !self.drained {
            self.decode_block()?;
        }

        let mut out = vec![0u8; max_bytes.min(self.pending.len())];
        let n = self.pending.pop_slice(&mut out);
        out.truncate(n);
        self.clock.advance_bytes(n);
        Ok(out)
    }

    /// Reads `config.read_size` bytes.
    pub fn read_default(&mut self) -> Result<Vec<u8>> {
        self.read(self.config.read_size)
    }

    /// Returns everything pending plus the next decoded block, whatever its
    /// size. Empty at end of stream.
    pub fn read_block(&mut self) -> Result<Vec<u8>> {
        self.expect_state(SessionState::Opened, "read")?;
        let before = self.pending.len();
        while self.pending.len() == before && !self.drained {
            self.decode_block()?;
        }
        let available = self.pending.len();
        self.read(available)
    }

    /// Moves to `target_ms`. Targets past the end fail and leave the
    /// position untouched; on success the position is exactly `target_ms`.
    pub fn seek(&mut self, target_ms: u64) -> Result<()> {
        self.expect_state(SessionState::Opened, "seek")?;
        if target_ms > self.length_ms {
            return Err(SessionError::SeekPastEnd {
                target_ms,
                length_ms: self.length_ms,
            });
        }

        let frame = (target_ms as f64 / 1000.0 * self.source_rate as f64) as u64;
        if let Some(engine) = self.engine.as_mut() {
            engine.seek(frame)?;
        }
        if let Some(dsp) = self.dsp.as_mut() {
            dsp.reset();
        }
        self.pending.clear();
        self.drained = false;
        self.clock.set_position_ms(target_ms as f64);

        debug!(target_ms, frame, "Seeked");
        Ok(())
    }

    /// Releases the engine and the source bytes. Safe to call any number of
    /// times, in any state.
    pub fn close(&mut self) {
        if self.state == SessionState::Closed {
            return;
        }
        if self.engine.take().is_some() {
            debug!(title = %self.title, "Released decoder engine");
        }
        self.dsp = None;
        self.source = None;
        self.pending.clear();
        self.state = SessionState::Closed;
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Embedded title, or the file name when the source has none.
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Duration in milliseconds.
    pub fn length(&self) -> u64 {
        self.length_ms
    }

    /// Current position in milliseconds.
    pub fn position(&self) -> f64 {
        self.clock.position_ms()
    }

    /// Overrides the position bookkeeping without touching the engine.
    /// Negative and non-finite values are rejected.
    pub fn set_position(&mut self, ms: f64) -> Result<()> {
        if !ms.is_finite() || ms < 0.0 {
            return Err(SessionError::InvalidPosition(ms));
        }
        self.clock.set_position_ms(ms);
        Ok(())
    }

    /// Output sample rate in Hz.
    pub fn frequency(&self) -> u32 {
        self.sample_rate
    }

    pub fn source_frequency(&self) -> u32 {
        self.source_rate
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    pub fn bits_per_sample(&self) -> u16 {
        self.depth.bits()
    }

    /// Total source frames.
    pub fn samples(&self) -> u64 {
        self.total_frames
    }

    /// Average bitrate of the source in bits per second.
    pub fn bitrate(&self) -> u32 {
        match &self.source {
            Some(source) if self.length_ms > 0 => {
                u32::try_from(source.len() as u64 * 8 * 1000 / self.length_ms).unwrap_or(u32::MAX)
            }
            _ => 0,
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.source.as_ref().map(|s| s.path())
    }

    pub fn config(&self) -> &DecoderConfig {
        &self.config
    }

    /// Sets the linear output gain.
    pub fn set_scale(&mut self, scale: f32) -> Result<()> {
        match self.dsp.as_mut() {
            Some(dsp) => dsp.set_scale(scale)?,
            None if !scale.is_finite() || scale < 0.0 => {
                return Err(SessionError::InvalidScale(scale))
            }
            None => {}
        }
        self.config.scale = scale;
        Ok(())
    }

    fn decode_block(&mut self) -> Result<()> {
        let (engine, dsp) = match (self.engine.as_mut(), self.dsp.as_mut()) {
            (Some(engine), Some(dsp)) => (engine, dsp),
            _ => {
                self.drained = true;
                return Ok(());
            }
        };

        let samples = match engine.decode_next()? {
            Some(block) => dsp.process(&block)?,
            None => {
                self.drained = true;
                dsp.flush()?
            }
        };

        if !samples.is_empty() {
            let mut bytes = Vec::new();
            samples_to_bytes(&samples, self.depth, &mut bytes);
            self.pending.push_slice(&bytes);
        }
        Ok(())
    }

    fn expect_state(&self, expected: SessionState, operation: &'static str) -> Result<()> {
        if self.state == expected {
            Ok(())
        } else {
            Err(SessionError::InvalidState {
                state: self.state,
                operation,
            })
        }
    }
}

impl Drop for DecodeSession {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for DecodeSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DecodeSession")
            .field("state", &self.state)
            .field("title", &self.title)
            .field("length_ms", &self.length_ms)
            .field("position_ms", &self.clock.position_ms())
            .field("sample_rate", &self.sample_rate)
            .field("channels", &self.channels)
            .field("bits", &self.depth.bits())
            .finish()
    }
}
