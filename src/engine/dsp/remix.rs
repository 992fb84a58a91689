/// Converts interleaved audio between channel counts.
///
/// Upmixing repeats source channels cyclically (mono feeds every output).
/// Downmixing averages each group of source channels that folds onto the
/// same output channel, so stereo to mono is the mean of left and right.
pub fn remix(samples: &[f32], from: usize, to: usize) -> Vec<f32> {
    if from == to || from == 0 || to == 0 {
        return samples.to_vec();
    }

    let frames = samples.len() / from;
    let mut out = Vec::with_capacity(frames * to);

    for frame in samples.chunks_exact(from) {
        if from < to {
            for ch in 0..to {
                out.push(frame[ch % from]);
            }
        } else {
            for ch in 0..to {
                let mut sum = 0.0;
                let mut count = 0usize;
                for src in (ch..from).step_by(to) {
                    sum += frame[src];
                    count += 1;
                }
                out.push(sum / count as f32);
            }
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mono_to_stereo_duplicates() {
        assert_eq!(remix(&[0.1, 0.2], 1, 2), vec![0.1, 0.1, 0.2, 0.2]);
    }

    #[test]
    fn stereo_to_mono_averages() {
        assert_eq!(remix(&[1.0, 0.0, -0.5, -0.5], 2, 1), vec![0.5, -0.5]);
    }

    #[test]
    fn surround_to_stereo_folds_even_and_odd() {
        let frame = [0.2, 0.4, 0.6, 0.8];
        let out = remix(&frame, 4, 2);
        assert!((out[0] - 0.4).abs() < 1e-6);
        assert!((out[1] - 0.6).abs() < 1e-6);
    }

    #[test]
    fn same_layout_is_identity() {
        let input = [0.3, -0.3, 0.1, 0.0];
        assert_eq!(remix(&input, 2, 2), input.to_vec());
    }
}
