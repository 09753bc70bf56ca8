//! The narrow interface between the stretch handle and the DSP core.

use crate::core::view::{ChannelView, ChannelViewMut};
use crate::error::Result;
use crate::stretch::params::{semitones_to_factor, PitchParams};

/// A stateful streaming time-stretch/pitch-shift core.
///
/// [`Stretch`](crate::Stretch) owns one engine and forwards every operation
/// to it after wrapping caller buffers in channel-major views. Implementors
/// must not allocate, block or log from [`seek`](Self::seek),
/// [`process`](Self::process), [`flush`](Self::flush) or the parameter
/// setters.
///
/// Views may expose more channels than the engine was configured with; the
/// extra channels are left untouched. Fewer channels is an error, reported
/// before any state changes.
pub trait TransformEngine {
    /// Number of channels the engine was configured for.
    fn channels(&self) -> usize;

    /// Analysis/synthesis block length in frames.
    fn block_length(&self) -> usize;

    /// Distance between synthesised blocks in output frames.
    fn interval(&self) -> usize;

    /// Frames between input passed to `process` and the centre of its effect.
    fn input_latency(&self) -> usize;

    /// Frames between the centre of an effect and the output carrying it.
    fn output_latency(&self) -> usize;

    /// Drops buffered audio and analysis history, keeping configuration and
    /// pitch/formant parameters.
    fn reset(&mut self);

    /// Current pitch and formant parameters.
    fn pitch_params(&self) -> &PitchParams;

    /// Sets the frequency multiplier. `tonality_limit` is in cycles per
    /// sample, 0 for unlimited.
    fn set_transpose_factor(&mut self, multiplier: f32, tonality_limit: f32);

    /// Sets the frequency shift in semitones.
    fn set_transpose_semitones(&mut self, semitones: f32, tonality_limit: f32) {
        self.set_transpose_factor(semitones_to_factor(semitones), tonality_limit);
    }

    /// Sets the spectral envelope multiplier.
    fn set_formant_factor(&mut self, multiplier: f32, compensate_pitch: bool);

    /// Sets the spectral envelope shift in semitones.
    fn set_formant_semitones(&mut self, semitones: f32, compensate_pitch: bool) {
        self.set_formant_factor(semitones_to_factor(semitones), compensate_pitch);
    }

    /// Sets the rough fundamental used by formant analysis, in cycles per
    /// sample. 0 detects it per block.
    fn set_formant_base(&mut self, frequency: f32);

    /// Loads `input_frames` frames of pre-roll as if they had been played at
    /// `playback_rate`, without producing output.
    fn seek(&mut self, input: &ChannelView<'_>, input_frames: usize, playback_rate: f64)
        -> Result<()>;

    /// Consumes `input_frames` frames and writes exactly `output_frames` frames.
    fn process(
        &mut self,
        input: &ChannelView<'_>,
        input_frames: usize,
        output: &mut ChannelViewMut<'_>,
        output_frames: usize,
    ) -> Result<()>;

    /// Writes `output_frames` frames of remaining output and drains the stream.
    fn flush(&mut self, output: &mut ChannelViewMut<'_>, output_frames: usize) -> Result<()>;
}
