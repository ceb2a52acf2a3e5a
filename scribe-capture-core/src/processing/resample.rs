//! Pure-math sample conditioning for the encoder path: channel downmix
//! and linear-interpolation resampling to the codec rate.

/// Average interleaved frames down to mono. Mono input is returned as-is.
pub fn downmix_to_mono(samples: &[f32], channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return samples.to_vec();
    }
    samples
        .chunks(channels)
        .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
        .collect()
}

/// Linear-interpolation resampling for mono audio.
///
/// Returns the input unchanged when the rates already match.
pub fn resample_linear(samples: &[f32], source_rate: u32, target_rate: u32) -> Vec<f32> {
    if source_rate == target_rate || samples.is_empty() {
        return samples.to_vec();
    }

    let ratio = target_rate as f64 / source_rate as f64;
    let output_count = (samples.len() as f64 * ratio) as usize;
    if output_count == 0 {
        return Vec::new();
    }

    let mut output = vec![0.0f32; output_count];
    for (i, sample) in output.iter_mut().enumerate() {
        let source_index = i as f64 / ratio;
        let index = source_index as usize;
        let fraction = (source_index - index as f64) as f32;

        if index + 1 < samples.len() {
            *sample = samples[index] * (1.0 - fraction) + samples[index + 1] * fraction;
        } else if index < samples.len() {
            *sample = samples[index];
        }
    }
    output
}
