use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::Parser;
use log::{info, warn};

use spectral_stretch::io::{read_wav_file, write_wav_file, WavAudio, WavEncoding};
use spectral_stretch::{render, Preset, Stretch, StretchConfig};

/// Time-stretch and pitch-shift a WAV file.
#[derive(Parser, Debug)]
#[command(name = "spectral-stretch", version)]
struct Args {
    /// Input WAV file (16/24-bit PCM or 32-bit float).
    input: PathBuf,
    /// Output WAV file.
    output: PathBuf,

    /// Playback rate: 2 plays twice as fast, 0.5 half as fast.
    #[arg(long, default_value = "1")]
    rate: f32,

    /// Pitch shift in semitones.
    #[arg(long, default_value = "0", allow_hyphen_values = true)]
    semitones: f32,

    /// Formant shift in semitones.
    #[arg(long, allow_hyphen_values = true)]
    formant_semitones: Option<f32>,

    /// Keep formants relative to the input instead of the shifted pitch.
    #[arg(long)]
    compensate_pitch: bool,

    /// Fundamental used for formant analysis, in Hz (0 detects it).
    #[arg(long)]
    formant_base: Option<f32>,

    /// Frequency in Hz above which partials are offset instead of scaled.
    #[arg(long)]
    tonality_limit: Option<f32>,

    /// Block/interval preset: default or cheaper.
    #[arg(long, default_value = "default")]
    preset: Preset,

    /// Block length in frames (overrides the preset).
    #[arg(long)]
    block: Option<usize>,

    /// Interval in frames (overrides the preset).
    #[arg(long)]
    interval: Option<usize>,

    /// JSON file holding a stored configuration.
    #[arg(long, value_name = "FILE", conflicts_with_all = ["block", "interval"])]
    config: Option<PathBuf>,

    /// Output frames per process call.
    #[arg(long, default_value = "1024")]
    chunk_size: usize,

    /// Write 32-bit float instead of 16-bit PCM.
    #[arg(long)]
    float: bool,
}

fn build_config(args: &Args, channels: usize, sample_rate: f32) -> anyhow::Result<StretchConfig> {
    if let Some(path) = &args.config {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let mut config: StretchConfig = serde_json::from_str(&text)
            .with_context(|| format!("failed to parse {}", path.display()))?;
        if config.channels != channels {
            warn!(
                "config has {} channels, input has {}; using the input's",
                config.channels, channels
            );
            config.channels = channels;
        }
        return Ok(config);
    }

    let mut config = StretchConfig::from_preset(args.preset, channels, sample_rate)?;
    if let Some(block) = args.block {
        config = config.with_block_length(block);
    }
    if let Some(interval) = args.interval {
        config = config.with_interval(interval);
    } else if args.block.is_some() {
        config = config.with_interval((config.block_length / 4).max(1));
    }
    Ok(config)
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    if !args.rate.is_finite() || args.rate <= 0.0 {
        bail!("rate must be positive, got {}", args.rate);
    }

    let input = read_wav_file(&args.input)
        .with_context(|| format!("failed to read {}", args.input.display()))?;
    let sample_rate = input.sample_rate as f32;
    let channels = usize::from(input.channels);
    info!(
        "input: {} frames, {} Hz, {} channels, {:.2}s",
        input.frames(),
        input.sample_rate,
        input.channels,
        input.duration_secs()
    );

    let config = build_config(&args, channels, sample_rate)?;
    let mut stretch = Stretch::from_config(&config)?;
    info!(
        "{} (latency: input {}, output {})",
        config,
        stretch.input_latency(),
        stretch.output_latency()
    );

    let tonality_limit = args.tonality_limit.map(|hz| hz / sample_rate);
    stretch.set_transpose_semitones(args.semitones, tonality_limit);
    if let Some(semitones) = args.formant_semitones {
        stretch.set_formant_semitones(semitones, args.compensate_pitch);
    } else if args.compensate_pitch {
        stretch.set_formant_factor(1.0, true);
    }
    if let Some(hz) = args.formant_base {
        stretch.set_formant_base(hz / sample_rate);
    }

    let output_frames = (input.frames() as f64 / f64::from(args.rate)).round() as usize;
    let samples = render(&mut stretch, &input.samples, output_frames, args.chunk_size)?;
    let output = WavAudio::new(samples, input.sample_rate, input.channels);

    let encoding = if args.float {
        WavEncoding::Float32
    } else {
        WavEncoding::Pcm16
    };
    write_wav_file(&args.output, &output, encoding)
        .with_context(|| format!("failed to write {}", args.output.display()))?;
    info!(
        "output: {} frames, {:.2}s -> {}",
        output.frames(),
        output.duration_secs(),
        args.output.display()
    );
    Ok(())
}
