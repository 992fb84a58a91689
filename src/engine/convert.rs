//! Float to integer PCM conversion.
//!
//! Decoded samples arrive as interleaved `f32` in `[-1.0, 1.0]`. They leave
//! the session as interleaved little-endian integers of the configured
//! width, clipped to the representable range.

use crate::engine::config::BitDepth;

/// Appends `samples` to `out` as little-endian PCM of the given depth.
pub fn samples_to_bytes(samples: &[f32], depth: BitDepth, out: &mut Vec<u8>) {
    out.reserve(samples.len() * depth.bytes());
    match depth {
        BitDepth::U8 => {
            for &s in samples {
                let v = quantize(s, 8);
                out.push((v + 128) as u8);
            }
        }
        BitDepth::S16 => {
            for &s in samples {
                let v = quantize(s, 16) as i16;
                out.extend_from_slice(&v.to_le_bytes());
            }
        }
        BitDepth::S24 => {
            for &s in samples {
                let v = quantize(s, 24);
                out.extend_from_slice(&v.to_le_bytes()[..3]);
            }
        }
        BitDepth::S32 => {
            for &s in samples {
                let v = quantize(s, 32);
                out.extend_from_slice(&v.to_le_bytes());
            }
        }
    }
}

/// Scales to a signed integer of `bits` width and clips.
#[inline]
fn quantize(sample: f32, bits: u32) -> i32 {
    let scale = (1i64 << (bits - 1)) as f64;
    let min = -scale;
    let max = scale - 1.0;
    let v = (sample as f64 * scale).round();
    if v.is_nan() {
        0
    } else {
        v.clamp(min, max) as i32
    }
}

/// Number of whole frames contained in `bytes` of output.
pub fn frames_in(bytes: usize, channels: u16, depth: BitDepth) -> usize {
    let frame = channels as usize * depth.bytes();
    if frame == 0 {
        0
    } else {
        bytes / frame
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s16(samples: &[f32]) -> Vec<i16> {
        let mut out = Vec::new();
        samples_to_bytes(samples, BitDepth::S16, &mut out);
        out.chunks_exact(2)
            .map(|b| i16::from_le_bytes([b[0], b[1]]))
            .collect()
    }

    #[test]
    fn s16_clips_at_both_rails() {
        assert_eq!(s16(&[1.5, -1.5, 1.0, -1.0]), vec![32767, -32768, 32767, -32768]);
    }

    #[test]
    fn s16_reproduces_integer_sources_exactly() {
        let input: Vec<f32> = [0i16, 1, -1, 10500, -20000, 32767]
            .iter()
            .map(|&v| v as f32 / 32768.0)
            .collect();
        assert_eq!(s16(&input), vec![0, 1, -1, 10500, -20000, 32767]);
    }

    #[test]
    fn u8_is_offset_binary() {
        let mut out = Vec::new();
        samples_to_bytes(&[0.0, -1.0, 1.0], BitDepth::U8, &mut out);
        assert_eq!(out, vec![128, 0, 255]);
    }

    #[test]
    fn s24_packs_three_bytes() {
        let mut out = Vec::new();
        samples_to_bytes(&[-1.0, 0.5], BitDepth::S24, &mut out);
        assert_eq!(out.len(), 6);
        assert_eq!(&out[..3], &[0x00, 0x00, 0x80]);
        assert_eq!(&out[3..], &[0x00, 0x00, 0x40]);
    }

    #[test]
    fn s32_full_scale_does_not_overflow() {
        let mut out = Vec::new();
        samples_to_bytes(&[1.0], BitDepth::S32, &mut out);
        assert_eq!(i32::from_le_bytes([out[0], out[1], out[2], out[3]]), i32::MAX);
    }

    #[test]
    fn nan_is_silence() {
        assert_eq!(s16(&[f32::NAN]), vec![0]);
    }

    #[test]
    fn frame_counting() {
        assert_eq!(frames_in(1024, 2, BitDepth::S16), 256);
        assert_eq!(frames_in(1023, 2, BitDepth::S16), 255);
        assert_eq!(frames_in(9, 1, BitDepth::S24), 3);
    }
}
