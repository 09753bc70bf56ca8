#![forbid(unsafe_code)]
//! Real-time audio time stretching and pitch shifting.
//!
//! `spectral_stretch` converts interleaved multi-channel audio at one tempo and
//! pitch into output at an independently adjustable tempo and pitch, with
//! bounded, queryable latency. The stretch ratio of each call is simply the
//! ratio of its output length to its input length, so it may change from one
//! call to the next.
//!
//! # Quick Start
//!
//! ```
//! use spectral_stretch::Stretch;
//!
//! let mut stretch = Stretch::preset_default(2, 44100.0).unwrap();
//! stretch.set_transpose_semitones(3.0, None);
//!
//! // 512 stereo frames in, 1024 out: half speed, three semitones up
//! let input = vec![0.0f32; 512 * 2];
//! let mut output = vec![0.0f32; 1024 * 2];
//! stretch.process(&input, &mut output).unwrap();
//!
//! // Drain what is still in flight at the end of the stream
//! let mut tail = vec![0.0f32; stretch.output_latency() * 2];
//! stretch.flush(&mut tail).unwrap();
//! ```
//!
//! # Offline rendering
//!
//! [`render`] runs a whole buffer through a stretcher, pre-rolling with
//! [`Stretch::seek`] and draining with [`Stretch::flush`] so the output lines
//! up with the input:
//!
//! ```
//! use spectral_stretch::{render, Stretch};
//!
//! let input: Vec<f32> = (0..4096).map(|i| (i as f32 * 0.05).sin()).collect();
//! let mut stretch = Stretch::new(1, 512, 128).unwrap();
//! let output = render(&mut stretch, &input, 6144, 256).unwrap();
//! assert_eq!(output.len(), 6144);
//! ```
//!
//! # Real-time use
//!
//! [`Stretch::seek`], [`Stretch::process`], [`Stretch::flush`] and the
//! parameter setters never allocate, block or log. All state is sized when
//! the stretcher is built. A stretcher is driven from one thread at a time
//! through `&mut self`; separate stretchers share nothing.
//!
//! # Custom engines
//!
//! The DSP core sits behind the [`TransformEngine`] trait. [`Stretch`] uses
//! [`SpectralStretch`] by default; [`Stretch::with_engine`] accepts any other
//! implementation.

pub mod core;
pub mod error;
pub mod io;
pub mod stream;
pub mod stretch;

pub use core::types::{Preset, Sample, StretchConfig};
pub use core::view::{Channel, ChannelMut, ChannelView, ChannelViewMut};
pub use error::{Result, StretchError};
pub use stream::Stretch;
pub use stretch::{semitones_to_factor, PitchParams, SpectralStretch, TransformEngine};

/// Stretches a whole interleaved buffer to `output_frames` frames.
///
/// The first [`input_latency`](Stretch::input_latency) frames are fed with
/// [`seek`](Stretch::seek), the rest in chunks of about `chunk_frames` output
/// frames, and the stream is drained with [`flush`](Stretch::flush). The
/// leading [`output_latency`](Stretch::output_latency) frames are dropped, so
/// output frame `i` is centred on input frame `i * input_frames /
/// output_frames`.
///
/// The stretcher is reset first and left drained.
///
/// # Errors
///
/// Propagates the stretcher's errors. Allocates the returned buffer.
pub fn render<E: TransformEngine>(
    stretch: &mut Stretch<E>,
    input: &[f32],
    output_frames: usize,
    chunk_frames: usize,
) -> Result<Vec<f32>> {
    let channels = stretch.channel_count();
    let input_frames = input.len() / channels;
    stretch.reset();
    if output_frames == 0 {
        return Ok(Vec::new());
    }

    let pre_roll = stretch.input_latency().min(input_frames);
    let rate = input_frames as f64 / output_frames as f64;
    stretch.seek(&input[..pre_roll * channels], rate)?;

    // The rest of the input, padded with the pre-rolled length of silence so
    // every output frame maps to input at the same rate.
    let mut body = input[pre_roll * channels..input_frames * channels].to_vec();
    body.resize(input_frames * channels, 0.0);

    let latency = stretch.output_latency();
    let mut output = vec![0.0f32; (output_frames + latency) * channels];

    let chunk_frames = chunk_frames.max(1);
    let mut out_start = 0;
    while out_start < output_frames {
        let out_end = (out_start + chunk_frames).min(output_frames);
        let in_start = input_position(out_start, input_frames, output_frames);
        let in_end = input_position(out_end, input_frames, output_frames);
        stretch.process(
            &body[in_start * channels..in_end * channels],
            &mut output[out_start * channels..out_end * channels],
        )?;
        out_start = out_end;
    }
    stretch.flush(&mut output[output_frames * channels..])?;

    output.drain(..latency * channels);
    Ok(output)
}

#[inline]
fn input_position(output_frame: usize, input_frames: usize, output_frames: usize) -> usize {
    ((output_frame as f64 * input_frames as f64 / output_frames as f64).round() as usize)
        .min(input_frames)
}
