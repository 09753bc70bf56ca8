use std::num::NonZeroUsize;

use crate::core::types::StretchConfig;
use crate::core::view::{ChannelView, ChannelViewMut};
use crate::error::{Result, StretchError};
use crate::stretch::engine::TransformEngine;
use crate::stretch::params::PitchParams;
use crate::stretch::spectral::SpectralStretch;

/// Real-time time stretcher and pitch shifter over interleaved buffers.
///
/// A `Stretch` owns one [`TransformEngine`] and is the only way to reach it.
/// It is move-only; dropping it releases the engine. All operations take
/// `&mut self`, so a handle is driven from one thread at a time. Separate
/// handles share nothing.
///
/// Buffers are interleaved `frame0[ch0..chN-1], frame1[..], ...` and must
/// hold a whole number of frames of the handle's channel count. This is
/// checked with `debug_assert!` only.
///
/// None of [`seek`](Self::seek), [`process`](Self::process),
/// [`flush`](Self::flush) or the setters allocate.
#[derive(Debug)]
pub struct Stretch<E: TransformEngine = SpectralStretch> {
    engine: E,
    channel_count: NonZeroUsize,
}

impl Stretch<SpectralStretch> {
    /// Creates a stretcher with an explicit block length and interval, both
    /// in frames.
    ///
    /// # Errors
    /// [`StretchError::InvalidConfig`] for zero channels, a block shorter than
    /// two frames, or an interval outside `1..=block_length`.
    pub fn new(channel_count: usize, block_length: usize, interval: usize) -> Result<Self> {
        Self::from_config(&StretchConfig::new(channel_count, block_length, interval))
    }

    /// Creates a stretcher with block and interval tuned for quality at
    /// `sample_rate`.
    pub fn preset_default(channel_count: usize, sample_rate: f32) -> Result<Self> {
        Self::from_config(&StretchConfig::preset_default(channel_count, sample_rate)?)
    }

    /// Like [`preset_default`](Self::preset_default), tuned for lower CPU
    /// cost at some quality expense.
    pub fn preset_cheaper(channel_count: usize, sample_rate: f32) -> Result<Self> {
        Self::from_config(&StretchConfig::preset_cheaper(channel_count, sample_rate)?)
    }

    /// Creates a stretcher from a stored configuration.
    pub fn from_config(config: &StretchConfig) -> Result<Self> {
        Self::with_engine(SpectralStretch::new(config)?)
    }
}

impl<E: TransformEngine> Stretch<E> {
    /// Wraps an already configured engine.
    pub fn with_engine(engine: E) -> Result<Self> {
        let channel_count = NonZeroUsize::new(engine.channels()).ok_or_else(|| {
            StretchError::InvalidConfig("engine reports zero channels".to_string())
        })?;
        Ok(Self {
            engine,
            channel_count,
        })
    }

    /// Number of interleaved channels in every buffer.
    #[inline]
    pub fn channel_count(&self) -> usize {
        self.channel_count.get()
    }

    /// Analysis block length in frames.
    #[inline]
    pub fn block_length(&self) -> usize {
        self.engine.block_length()
    }

    /// Frames between successive blocks.
    #[inline]
    pub fn interval(&self) -> usize {
        self.engine.interval()
    }

    /// Delay between samples passed to [`process`](Self::process) and the
    /// centre of any pitch-shift or stretch effect, in frames.
    #[inline]
    pub fn input_latency(&self) -> usize {
        self.engine.input_latency()
    }

    /// Delay between the centre of an effect and the output that carries it,
    /// in frames. Also the buffer size [`flush`](Self::flush) needs.
    #[inline]
    pub fn output_latency(&self) -> usize {
        self.engine.output_latency()
    }

    /// Input plus output latency: the delay of a 1:1 stream.
    #[inline]
    pub fn total_latency(&self) -> usize {
        self.input_latency() + self.output_latency()
    }

    /// Current transpose and formant settings.
    pub fn pitch_params(&self) -> &PitchParams {
        self.engine.pitch_params()
    }

    /// The transform engine behind this handle.
    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Mutable access to the transform engine.
    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    /// Returns the stretcher to its configured state, discarding buffered
    /// audio. Pitch and formant settings are kept.
    pub fn reset(&mut self) {
        self.engine.reset();
    }

    /// Sets the frequency multiplier, with an optional tonality limit in
    /// cycles per sample above which partials are offset rather than scaled.
    pub fn set_transpose_factor(&mut self, multiplier: f32, tonality_limit: Option<f32>) {
        self.engine
            .set_transpose_factor(multiplier, tonality_limit.unwrap_or(0.0));
    }

    /// Sets the frequency shift in semitones, with an optional tonality limit.
    pub fn set_transpose_semitones(&mut self, semitones: f32, tonality_limit: Option<f32>) {
        self.engine
            .set_transpose_semitones(semitones, tonality_limit.unwrap_or(0.0));
    }

    /// Sets the formant (spectral envelope) multiplier. With
    /// `compensate_pitch` the envelope is placed relative to the input, so a
    /// factor of 1 keeps formants in place under transposition.
    pub fn set_formant_factor(&mut self, multiplier: f32, compensate_pitch: bool) {
        self.engine.set_formant_factor(multiplier, compensate_pitch);
    }

    /// Sets the formant shift in semitones.
    pub fn set_formant_semitones(&mut self, semitones: f32, compensate_pitch: bool) {
        self.engine.set_formant_semitones(semitones, compensate_pitch);
    }

    /// Rough fundamental frequency in cycles per sample, used for formant
    /// analysis. 0 detects it.
    pub fn set_formant_base(&mut self, frequency: f32) {
        self.engine.set_formant_base(frequency);
    }

    /// Adds pre-roll without producing output or moving the output position.
    ///
    /// `playback_rate` is the speed the pre-roll would have been played at;
    /// it sets how far apart the analysis blocks that warm up the engine are.
    pub fn seek(&mut self, input: impl AsRef<[f32]>, playback_rate: f64) -> Result<()> {
        let input = input.as_ref();
        debug_assert_eq!(0, input.len() % self.channel_count());

        let view = ChannelView::new(input, self.channel_count);
        self.engine.seek(&view, view.frames(), playback_rate)
    }

    /// Consumes all of `input` and fills all of `output`. Differing lengths
    /// stretch the audio by `output.len() / input.len()`; the ratio may change
    /// from call to call.
    pub fn process(&mut self, input: impl AsRef<[f32]>, mut output: impl AsMut<[f32]>) -> Result<()> {
        let input = input.as_ref();
        let output = output.as_mut();
        debug_assert_eq!(0, input.len() % self.channel_count());
        debug_assert_eq!(0, output.len() % self.channel_count());

        let input = ChannelView::new(input, self.channel_count);
        let mut output = ChannelViewMut::new(output, self.channel_count);
        let (input_frames, output_frames) = (input.frames(), output.frames());
        self.engine
            .process(&input, input_frames, &mut output, output_frames)
    }

    /// Writes the remaining output after the last input. Size `output` with
    /// [`output_latency`](Self::output_latency). Afterwards the stretcher
    /// behaves as a fresh stream.
    pub fn flush(&mut self, mut output: impl AsMut<[f32]>) -> Result<()> {
        let output = output.as_mut();
        debug_assert_eq!(0, output.len() % self.channel_count());

        let mut output = ChannelViewMut::new(output, self.channel_count);
        let frames = output.frames();
        self.engine.flush(&mut output, frames)
    }
}

impl<E: TransformEngine> Drop for Stretch<E> {
    fn drop(&mut self) {
        log::trace!(
            "releasing stretcher ({} channels, block {})",
            self.channel_count,
            self.engine.block_length()
        );
    }
}
