use std::io::Cursor;

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{Decoder, DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error;
use symphonia::core::formats::{FormatOptions, FormatReader, SeekMode, SeekTo, Track};
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::{MetadataOptions, MetadataRevision, StandardTagKey};
use symphonia::core::probe::{Hint, ProbeResult};
use symphonia::core::units::{Time, TimeBase};
use tracing::{debug, warn};

use crate::engine::decoder::DecoderEngine;
use crate::engine::error::{Result, SessionError};
use crate::engine::source::SharedBytes;

/// Symphonia-backed engine reading from a shared in-memory copy of the file.
pub struct SymphoniaDecoder {
    reader: Box<dyn FormatReader>,
    decoder: Box<dyn Decoder>,
    track_id: u32,
    sample_rate: u32,
    channels: u16,
    time_base: Option<TimeBase>,
    total_frames: u64,
    title: Option<String>,
    /// Frames still to discard after a seek landed before its target.
    skip_frames: u64,
    /// Set by a seek to exactly the end; cleared by the next seek.
    at_end: bool,
}

impl SymphoniaDecoder {
    pub fn from_bytes(bytes: SharedBytes, extension: Option<&str>) -> Result<Self> {
        let mut probed = probe(bytes.clone(), extension)?;
        let mut reader = probed.format;

        let track = select_track(reader.tracks()).ok_or(SessionError::NoAudioTrack)?;
        let track_id = track.id;
        let params = track.codec_params.clone();

        let sample_rate = match params.sample_rate {
            Some(rate) if rate > 0 => rate,
            _ => {
                warn!("Track does not declare a sample rate, assuming 44100 Hz");
                44_100
            }
        };
        let channels = params.channels.map(|c| c.count() as u16).unwrap_or(2);

        let decoder = symphonia::default::get_codecs()
            .make(&params, &DecoderOptions::default())
            .map_err(|e| SessionError::UnrecognizedFormat(e.to_string()))?;

        let total_frames = match params.n_frames {
            Some(frames) => frames,
            None => {
                debug!("Container has no frame count, counting packets");
                count_frames(bytes, extension, track_id)
            }
        };

        let title = probed
            .metadata
            .get()
            .as_ref()
            .and_then(|m| m.current())
            .and_then(title_from_revision)
            .or_else(|| reader.metadata().current().and_then(title_from_revision));

        debug!(
            sample_rate,
            channels,
            total_frames,
            title = ?title,
            "Opened decoder engine"
        );

        Ok(Self {
            reader,
            decoder,
            track_id,
            sample_rate,
            channels,
            time_base: params.time_base,
            total_frames,
            title,
            skip_frames: 0,
            at_end: false,
        })
    }

    fn frame_to_ts(&self, frame: u64) -> u64 {
        match self.time_base {
            Some(tb) if !(tb.numer == 1 && tb.denom == self.sample_rate) => {
                tb.calc_timestamp(Time::from(frame as f64 / self.sample_rate as f64))
            }
            _ => frame,
        }
    }

    fn ts_to_frames(&self, ts: u64) -> u64 {
        match self.time_base {
            Some(tb) if !(tb.numer == 1 && tb.denom == self.sample_rate) => {
                let time = tb.calc_time(ts);
                ((time.seconds as f64 + time.frac) * self.sample_rate as f64).round() as u64
            }
            _ => ts,
        }
    }
}

impl DecoderEngine for SymphoniaDecoder {
    fn decode_next(&mut self) -> Result<Option<Vec<f32>>> {
        if self.at_end {
            return Ok(None);
        }

        loop {
            let packet = match self.reader.next_packet() {
                Ok(packet) => packet,
                Err(Error::IoError(ref err)) if err.kind() == std::io::ErrorKind::UnexpectedEof => {
                    return Ok(None);
                }
                Err(Error::ResetRequired) => {
                    warn!("Stream layout changed mid-file, treating as end of stream");
                    return Ok(None);
                }
                Err(err) => return Err(SessionError::Decode(err.to_string())),
            };

            if packet.track_id() != self.track_id {
                continue;
            }

            match self.decoder.decode(&packet) {
                Ok(audio_buf) => {
                    let spec = *audio_buf.spec();
                    let block_channels = spec.channels.count().max(1);
                    let mut sample_buf =
                        SampleBuffer::<f32>::new(audio_buf.capacity() as u64, spec);
                    sample_buf.copy_interleaved_ref(audio_buf);
                    let mut samples = sample_buf.samples().to_vec();

                    if self.skip_frames > 0 {
                        let frames = (samples.len() / block_channels) as u64;
                        let skip = self.skip_frames.min(frames);
                        samples.drain(..skip as usize * block_channels);
                        self.skip_frames -= skip;
                    }

                    if samples.is_empty() {
                        continue;
                    }
                    return Ok(Some(samples));
                }
                Err(Error::DecodeError(err)) => {
                    warn!(error = %err, "Skipping undecodable packet");
                    continue;
                }
                Err(Error::IoError(ref err)) if err.kind() == std::io::ErrorKind::UnexpectedEof => {
                    return Ok(None);
                }
                Err(err) => return Err(SessionError::Decode(err.to_string())),
            }
        }
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn channels(&self) -> u16 {
        self.channels
    }

    fn total_frames(&self) -> u64 {
        self.total_frames
    }

    fn title(&self) -> Option<String> {
        self.title.clone()
    }

    fn seek(&mut self, frame: u64) -> Result<()> {
        if self.total_frames > 0 && frame >= self.total_frames {
            self.at_end = true;
            self.skip_frames = 0;
            return Ok(());
        }

        let seeked = self
            .reader
            .seek(
                SeekMode::Accurate,
                SeekTo::TimeStamp {
                    ts: self.frame_to_ts(frame),
                    track_id: self.track_id,
                },
            )
            .map_err(|e| SessionError::Decode(format!("seek to frame {} failed: {}", frame, e)))?;

        self.decoder.reset();
        self.skip_frames = self.ts_to_frames(seeked.required_ts.saturating_sub(seeked.actual_ts));
        self.at_end = false;
        Ok(())
    }
}

fn probe(bytes: SharedBytes, extension: Option<&str>) -> Result<ProbeResult> {
    let mss = MediaSourceStream::new(Box::new(Cursor::new(bytes)), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = extension {
        hint.with_extension(ext);
    }

    symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .map_err(|e| SessionError::UnrecognizedFormat(e.to_string()))
}

fn select_track(tracks: &[Track]) -> Option<&Track> {
    tracks
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
}

/// Sums packet durations on a second reader over the same bytes.
fn count_frames(bytes: SharedBytes, extension: Option<&str>, track_id: u32) -> u64 {
    let mut reader = match probe(bytes, extension) {
        Ok(probed) => probed.format,
        Err(_) => return 0,
    };

    let mut frames = 0;
    while let Ok(packet) = reader.next_packet() {
        if packet.track_id() == track_id {
            frames += packet.dur();
        }
    }
    frames
}

fn title_from_revision(revision: &MetadataRevision) -> Option<String> {
    revision
        .tags()
        .iter()
        .find(|tag| matches!(tag.std_key, Some(StandardTagKey::TrackTitle)))
        .map(|tag| tag.value.to_string())
        .filter(|title| !title.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::error::ErrorKind;

    #[test]
    fn garbage_is_a_format_error() {
        let bytes = SharedBytes::new(vec![0x42u8; 512]);
        let err = SymphoniaDecoder::from_bytes(bytes, Some("mod")).err().unwrap();
        assert_eq!(err.kind(), ErrorKind::Format);
    }

    #[test]
    fn empty_input_is_a_format_error() {
        let bytes = SharedBytes::new(Vec::new());
        let err = SymphoniaDecoder::from_bytes(bytes, None).err().unwrap();
        assert_eq!(err.kind(), ErrorKind::Format);
    }
}
