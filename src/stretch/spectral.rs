//! Streaming phase-vocoder engine: the default [`TransformEngine`].
//!
//! Output is built by overlap-adding one synthesised block every `interval`
//! output frames. The input block for an output position `i` of a call ends
//! at input frame `round(i * input_frames / output_frames)` of that call, so
//! the ratio between the two lengths sets the stretch. Blocks reaching back
//! before the start of a call read from a per-channel history of the last
//! `2 * block_length` input frames.
//!
//! All buffers are sized at construction; nothing on the streaming path
//! allocates.

use crate::core::ring_buffer::RingBuffer;
use crate::core::types::StretchConfig;
use crate::core::view::{Channel, ChannelView, ChannelViewMut};
use crate::error::{try_filled, Result, StretchError};
use crate::stretch::engine::TransformEngine;
use crate::stretch::params::PitchParams;
use crate::stretch::phase_vocoder::{PhaseVocoder, SpectralChannel};

/// Per-channel streaming state.
#[derive(Debug)]
struct ChannelState {
    /// Most recent input frames, kept full (silence before the stream starts).
    history: RingBuffer<f32>,
    /// Overlap-add accumulator, a ring of `block_length` frames.
    output: Vec<f32>,
    spectrum: SpectralChannel,
}

impl ChannelState {
    fn new(block_length: usize, bands: usize) -> Result<Self> {
        let capacity = block_length
            .checked_mul(2)
            .ok_or(StretchError::Allocation {
                samples: block_length,
            })?;
        let mut history = RingBuffer::try_with_capacity(capacity)?;
        history.fill_default();
        Ok(Self {
            history,
            output: try_filled(block_length, 0.0)?,
            spectrum: SpectralChannel::new(bands)?,
        })
    }

    fn clear(&mut self) {
        self.history.fill_default();
        self.output.iter_mut().for_each(|x| *x = 0.0);
        self.spectrum.clear();
    }

    /// Appends the last `history.capacity()` of `frames` samples.
    fn push_history(&mut self, input: Option<Channel<'_>>, frames: usize) {
        let start = frames.saturating_sub(self.history.capacity());
        for frame in start..frames {
            let sample = input.and_then(|ch| ch.get(frame)).unwrap_or(0.0);
            self.history.push_overwrite(sample);
        }
    }
}

/// How a block obtains the phase pair it estimates frequencies from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Analysis {
    /// No new input since the last block: keep the previous spectrum.
    Hold,
    /// The previous block is still valid as the earlier phase reference.
    Advance(usize),
    /// Analyse a reference block `hop` frames before the current one.
    Reanalyse(usize),
}

/// Sample `frame` relative to the start of the current call. Negative frames
/// come from history.
#[inline]
fn block_sample(history: &RingBuffer<f32>, input: Option<Channel<'_>>, frame: isize) -> f32 {
    if frame >= 0 {
        return input.and_then(|ch| ch.get(frame as usize)).unwrap_or(0.0);
    }
    let index = history.len() as isize + frame;
    if index < 0 {
        return 0.0;
    }
    history.get(index as usize).unwrap_or(0.0)
}

/// Default transform engine: a streaming phase vocoder with peak-shifting
/// transposition and cepstral formant correction.
#[derive(Debug)]
pub struct SpectralStretch {
    config: StretchConfig,
    params: PitchParams,
    vocoder: PhaseVocoder,
    states: Vec<ChannelState>,
    /// Read position in each channel's output ring.
    output_position: usize,
    /// Output frames until the next block is synthesised.
    until_block: usize,
    /// End of the last analysed block, relative to the start of the next call.
    prev_input_end: Option<isize>,
    /// Analysis hop requested by the last `seek`.
    seek_hop: Option<usize>,
    /// Set until the first block after construction, reset or flush.
    fresh: bool,
}

impl SpectralStretch {
    /// Builds an engine for `config`.
    ///
    /// # Errors
    /// [`StretchError::InvalidConfig`] when the configuration is invalid,
    /// [`StretchError::Allocation`] when state buffers cannot be reserved.
    pub fn new(config: &StretchConfig) -> Result<Self> {
        config.validate()?;
        let vocoder = PhaseVocoder::new(config.block_length, config.interval)?;

        let mut states = Vec::new();
        states
            .try_reserve_exact(config.channels)
            .map_err(|_| StretchError::Allocation {
                samples: config.channels,
            })?;
        for _ in 0..config.channels {
            states.push(ChannelState::new(config.block_length, vocoder.bands())?);
        }

        let engine = Self {
            config: *config,
            params: PitchParams::default(),
            vocoder,
            states,
            output_position: 0,
            until_block: 0,
            prev_input_end: None,
            seek_hop: None,
            fresh: true,
        };
        log::debug!(
            "spectral engine configured: {} (input latency {}, output latency {})",
            engine.config,
            engine.input_latency(),
            engine.output_latency()
        );
        Ok(engine)
    }

    /// Engine tuned for quality at `sample_rate`.
    pub fn preset_default(channels: usize, sample_rate: f32) -> Result<Self> {
        Self::new(&StretchConfig::preset_default(channels, sample_rate)?)
    }

    /// Engine tuned for lower CPU cost at `sample_rate`.
    pub fn preset_cheaper(channels: usize, sample_rate: f32) -> Result<Self> {
        Self::new(&StretchConfig::preset_cheaper(channels, sample_rate)?)
    }

    /// The configuration this engine was built with.
    pub fn config(&self) -> &StretchConfig {
        &self.config
    }

    /// Checks that a view exposes every configured channel.
    fn check_channels(&self, channels: usize) -> Result<()> {
        let needed = self.states.len();
        if channels < needed {
            return Err(StretchError::ChannelOutOfRange {
                channel: needed - 1,
                channels,
            });
        }
        Ok(())
    }

    fn clear_stream(&mut self) {
        self.states.iter_mut().for_each(ChannelState::clear);
        self.output_position = 0;
        self.until_block = 0;
        self.prev_input_end = None;
        self.seek_hop = None;
        self.fresh = true;
    }

    /// Shared body of `process` and `flush`; `input: None` is silence.
    fn run(
        &mut self,
        input: Option<&ChannelView<'_>>,
        input_frames: usize,
        output: &mut ChannelViewMut<'_>,
        output_frames: usize,
    ) -> Result<()> {
        if let Some(view) = input {
            self.check_channels(view.channels())?;
        }
        self.check_channels(output.channels())?;

        let ring = self.config.block_length;
        let mut done = 0;
        while done < output_frames {
            if self.until_block == 0 {
                let end = (done as f64 * input_frames as f64 / output_frames as f64).round();
                self.process_block(input, end as isize)?;
                self.until_block = self.config.interval;
            }

            let run = self.until_block.min(output_frames - done);
            for (c, state) in self.states.iter_mut().enumerate() {
                let mut out = output.channel_mut(c)?;
                for k in 0..run {
                    let slot = &mut state.output[(self.output_position + k) % ring];
                    out[done + k] = *slot;
                    *slot = 0.0;
                }
            }
            self.output_position = (self.output_position + run) % ring;
            self.until_block -= run;
            done += run;
        }

        for (c, state) in self.states.iter_mut().enumerate() {
            let channel = match input {
                Some(view) => Some(view.channel(c)?),
                None => None,
            };
            state.push_history(channel, input_frames);
        }
        if let Some(end) = self.prev_input_end.as_mut() {
            *end -= input_frames as isize;
        }
        Ok(())
    }

    /// Analyses the block ending at input frame `end` of the current call and
    /// overlap-adds its synthesis at the output read position.
    fn process_block(&mut self, input: Option<&ChannelView<'_>>, end: isize) -> Result<()> {
        let block = self.config.block_length as isize;
        let interval = self.config.interval;

        let analysis = match (self.seek_hop.take(), self.prev_input_end) {
            (Some(hop), _) => Analysis::Reanalyse(hop),
            (None, Some(prev)) => {
                let hop = end - prev;
                if hop <= 0 {
                    Analysis::Hold
                } else if hop as usize <= interval {
                    Analysis::Advance(hop as usize)
                } else {
                    Analysis::Reanalyse(interval)
                }
            }
            (None, None) => Analysis::Reanalyse(interval),
        };

        for (c, state) in self.states.iter_mut().enumerate() {
            let channel = match input {
                Some(view) => Some(view.channel(c)?),
                None => None,
            };
            let ChannelState {
                history,
                output,
                spectrum,
            } = state;
            let history = &*history;
            let start = end - block;

            match analysis {
                Analysis::Hold => {}
                Analysis::Advance(hop) => {
                    std::mem::swap(&mut spectrum.phases, &mut spectrum.prev_phases);
                    self.vocoder.analyse(
                        |i| block_sample(history, channel, start + i as isize),
                        &mut spectrum.magnitudes,
                        &mut spectrum.phases,
                    );
                    self.vocoder.estimate_frequencies(spectrum, hop);
                }
                Analysis::Reanalyse(hop) => {
                    let prev_start = start - hop as isize;
                    self.vocoder.analyse(
                        |i| block_sample(history, channel, prev_start + i as isize),
                        &mut spectrum.magnitudes,
                        &mut spectrum.prev_phases,
                    );
                    self.vocoder.analyse(
                        |i| block_sample(history, channel, start + i as isize),
                        &mut spectrum.magnitudes,
                        &mut spectrum.phases,
                    );
                    self.vocoder.estimate_frequencies(spectrum, hop);
                }
            }

            self.vocoder.synthesise(
                spectrum,
                &self.params,
                self.fresh,
                output,
                self.output_position,
            );
        }

        self.fresh = false;
        self.prev_input_end = Some(end);
        Ok(())
    }
}

impl TransformEngine for SpectralStretch {
    fn channels(&self) -> usize {
        self.config.channels
    }

    fn block_length(&self) -> usize {
        self.config.block_length
    }

    fn interval(&self) -> usize {
        self.config.interval
    }

    fn input_latency(&self) -> usize {
        self.config.block_length / 2
    }

    fn output_latency(&self) -> usize {
        self.config.block_length - self.input_latency()
    }

    fn reset(&mut self) {
        self.clear_stream();
        log::debug!("spectral engine reset ({})", self.config);
    }

    fn pitch_params(&self) -> &PitchParams {
        &self.params
    }

    fn set_transpose_factor(&mut self, multiplier: f32, tonality_limit: f32) {
        self.params.set_transpose(multiplier, tonality_limit);
    }

    fn set_formant_factor(&mut self, multiplier: f32, compensate_pitch: bool) {
        self.params.set_formant(multiplier, compensate_pitch);
    }

    fn set_formant_base(&mut self, frequency: f32) {
        self.params.set_formant_base(frequency);
    }

    fn seek(
        &mut self,
        input: &ChannelView<'_>,
        input_frames: usize,
        playback_rate: f64,
    ) -> Result<()> {
        self.check_channels(input.channels())?;

        for (c, state) in self.states.iter_mut().enumerate() {
            let channel = input.channel(c)?;
            state.history.fill_default();
            state.push_history(Some(channel), input_frames);
        }

        let rate = if playback_rate.is_finite() {
            playback_rate.abs()
        } else {
            1.0
        };
        let hop = (self.config.interval as f64 * rate).round() as usize;
        self.seek_hop = Some(hop.clamp(1, self.config.block_length));
        self.prev_input_end = None;
        Ok(())
    }

    fn process(
        &mut self,
        input: &ChannelView<'_>,
        input_frames: usize,
        output: &mut ChannelViewMut<'_>,
        output_frames: usize,
    ) -> Result<()> {
        self.run(Some(input), input_frames, output, output_frames)
    }

    fn flush(&mut self, output: &mut ChannelViewMut<'_>, output_frames: usize) -> Result<()> {
        self.run(None, output_frames, output, output_frames)?;
        self.clear_stream();
        Ok(())
    }
}
