pub mod symphonia_decoder;

use crate::engine::error::Result;

/// The engine behind a session: turns a loaded source into blocks of
/// interleaved `f32` samples at the source's native rate and layout.
pub trait DecoderEngine: Send {
    /// Decodes the next block of audio data.
    /// Returns `Ok(None)` at end of stream; errors are hard faults.
    fn decode_next(&mut self) -> Result<Option<Vec<f32>>>;

    /// Returns the sample rate of the audio.
    fn sample_rate(&self) -> u32;

    /// Returns the number of channels.
    fn channels(&self) -> u16;

    /// Total length in frames (samples per channel).
    fn total_frames(&self) -> u64;

    /// Embedded track title, if the source carries one.
    fn title(&self) -> Option<String>;

    /// Repositions decoding at the given frame offset.
    fn seek(&mut self, frame: u64) -> Result<()>;
}
