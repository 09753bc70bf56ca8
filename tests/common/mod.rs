#![allow(dead_code)]

use std::f32::consts::PI;

use spectral_stretch::{Stretch, StretchError, TransformEngine};

pub fn gen_sine<F>(freq_hz: f32, sr: u32, n: usize, amp_fn: F) -> Vec<f32>
where
    F: Fn(usize) -> f32,
{
    (0..n)
        .map(|i| {
            let phase = 2.0 * PI * freq_hz * i as f32 / sr as f32;
            amp_fn(i) * phase.sin()
        })
        .collect()
}

pub fn gen_two_tone(freq_a: f32, amp_a: f32, freq_b: f32, amp_b: f32, sr: u32, n: usize) -> Vec<f32> {
    (0..n)
        .map(|i| {
            let t = i as f32 / sr as f32;
            amp_a * (2.0 * PI * freq_a * t).sin() + amp_b * (2.0 * PI * freq_b * t).sin()
        })
        .collect()
}

/// Interleaves equally long channels.
pub fn interleave(channels: &[Vec<f32>]) -> Vec<f32> {
    let frames = channels.iter().map(Vec::len).min().unwrap_or(0);
    let mut out = Vec::with_capacity(frames * channels.len());
    for f in 0..frames {
        for ch in channels {
            out.push(ch[f]);
        }
    }
    out
}

/// Extracts one channel of an interleaved buffer.
pub fn channel_of(interleaved: &[f32], channels: usize, channel: usize) -> Vec<f32> {
    interleaved
        .iter()
        .skip(channel)
        .step_by(channels)
        .copied()
        .collect()
}

pub fn windowed_rms(signal: &[f32], start: usize, len: usize) -> f64 {
    if signal.is_empty() || len == 0 {
        return 0.0;
    }
    let start = start.min(signal.len());
    let end = (start + len).min(signal.len());
    if end <= start {
        return 0.0;
    }
    let sum_sq: f64 = signal[start..end]
        .iter()
        .map(|&s| {
            let v = s as f64;
            v * v
        })
        .sum();
    (sum_sq / (end - start) as f64).sqrt()
}

pub fn count_positive_zero_crossings(signal: &[f32], start: usize, end: usize) -> usize {
    if signal.len() < 2 {
        return 0;
    }
    let start = start.min(signal.len() - 1);
    let end = end.min(signal.len());
    if end <= start + 1 {
        return 0;
    }
    (start..end - 1)
        .filter(|&i| signal[i] <= 0.0 && signal[i + 1] > 0.0)
        .count()
}

pub fn estimate_freq_zero_crossings(signal: &[f32], sr: u32, start: usize, end: usize) -> f64 {
    if end <= start + 1 {
        return 0.0;
    }
    let crossings = count_positive_zero_crossings(signal, start, end) as f64;
    crossings / ((end - start) as f64 / sr as f64)
}

/// Lag of `b` relative to `a` with the highest normalised correlation.
pub fn best_lag_crosscorr(a: &[f32], b: &[f32], max_lag: usize) -> isize {
    let mut best_lag = 0isize;
    let mut best_score = f64::NEG_INFINITY;

    for lag in -(max_lag as isize)..=(max_lag as isize) {
        let mut dot = 0.0f64;
        let mut a2 = 0.0f64;
        let mut b2 = 0.0f64;
        let mut n = 0usize;
        for (i, &av) in a.iter().enumerate() {
            let j = i as isize + lag;
            if j < 0 || j >= b.len() as isize {
                continue;
            }
            let (av, bv) = (av as f64, b[j as usize] as f64);
            dot += av * bv;
            a2 += av * av;
            b2 += bv * bv;
            n += 1;
        }
        if n < 16 || a2 <= 0.0 || b2 <= 0.0 {
            continue;
        }
        let score = dot / (a2.sqrt() * b2.sqrt());
        if score > best_score {
            best_score = score;
            best_lag = lag;
        }
    }
    best_lag
}

/// Normalised single-bin DFT magnitude at `freq_hz`.
pub fn energy_at_freq(signal: &[f32], sr: u32, freq_hz: f32) -> f64 {
    if signal.is_empty() {
        return 0.0;
    }
    let mut re = 0.0f64;
    let mut im = 0.0f64;
    for (i, &s) in signal.iter().enumerate() {
        let angle = 2.0 * std::f64::consts::PI * freq_hz as f64 * i as f64 / sr as f64;
        re += s as f64 * angle.cos();
        im -= s as f64 * angle.sin();
    }
    (re * re + im * im).sqrt() / signal.len() as f64
}

/// Streams interleaved `input` through `stretch` in chunks of `chunk_frames`
/// input frames, producing `ratio` output frames per input frame, then
/// flushes. Returns everything written.
pub fn run_streaming<E: TransformEngine>(
    stretch: &mut Stretch<E>,
    input: &[f32],
    chunk_frames: usize,
    ratio: f64,
) -> Result<Vec<f32>, StretchError> {
    let channels = stretch.channel_count();
    let mut output = Vec::new();
    let mut produced = 0usize;
    let mut consumed = 0usize;
    for chunk in input.chunks(chunk_frames.max(1) * channels) {
        consumed += chunk.len() / channels;
        let target = (consumed as f64 * ratio).round() as usize;
        let frames = target - produced;
        let start = output.len();
        output.resize(start + frames * channels, 0.0);
        stretch.process(chunk, &mut output[start..])?;
        produced = target;
    }
    let start = output.len();
    output.resize(start + stretch.output_latency() * channels, 0.0);
    stretch.flush(&mut output[start..])?;
    Ok(output)
}
