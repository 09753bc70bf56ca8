//! Minimal RIFF/WAVE reading and writing for the command-line renderer.
//!
//! Reads 16/24-bit PCM and 32-bit float; writes 16-bit PCM or 32-bit float.
//! Samples are interleaved, the layout [`Stretch`](crate::Stretch) consumes.

use std::path::Path;

use crate::core::types::Sample;
use crate::error::{Result, StretchError};

const FORMAT_PCM: u16 = 1;
const FORMAT_IEEE_FLOAT: u16 = 3;
const FORMAT_EXTENSIBLE: u16 = 0xFFFE;

/// Sample encoding used when writing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WavEncoding {
    Pcm16,
    Float32,
}

impl WavEncoding {
    fn format_code(self) -> u16 {
        match self {
            WavEncoding::Pcm16 => FORMAT_PCM,
            WavEncoding::Float32 => FORMAT_IEEE_FLOAT,
        }
    }

    fn bits(self) -> u16 {
        match self {
            WavEncoding::Pcm16 => 16,
            WavEncoding::Float32 => 32,
        }
    }
}

/// Decoded interleaved audio.
#[derive(Debug, Clone, PartialEq)]
pub struct WavAudio {
    pub samples: Vec<Sample>,
    pub sample_rate: u32,
    pub channels: u16,
}

impl WavAudio {
    pub fn new(samples: Vec<Sample>, sample_rate: u32, channels: u16) -> Self {
        Self {
            samples,
            sample_rate,
            channels,
        }
    }

    /// Number of complete frames.
    pub fn frames(&self) -> usize {
        self.samples.len() / usize::from(self.channels.max(1))
    }

    /// Duration in seconds.
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.frames() as f64 / f64::from(self.sample_rate)
    }
}

#[derive(Debug, Clone, Copy)]
struct FormatChunk {
    code: u16,
    channels: u16,
    sample_rate: u32,
    bits: u16,
}

fn invalid(msg: impl Into<String>) -> StretchError {
    StretchError::InvalidFormat(msg.into())
}

fn u16_at(data: &[u8], offset: usize) -> Result<u16> {
    data.get(offset..offset + 2)
        .map(|b| u16::from_le_bytes([b[0], b[1]]))
        .ok_or_else(|| invalid("unexpected end of file"))
}

fn u32_at(data: &[u8], offset: usize) -> Result<u32> {
    data.get(offset..offset + 4)
        .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .ok_or_else(|| invalid("unexpected end of file"))
}

fn parse_format(chunk: &[u8]) -> Result<FormatChunk> {
    if chunk.len() < 16 {
        return Err(invalid("fmt chunk too short"));
    }
    let mut code = u16_at(chunk, 0)?;
    if code == FORMAT_EXTENSIBLE && chunk.len() >= 26 {
        // Sub-format GUID starts with the plain format code
        code = u16_at(chunk, 24)?;
    }
    Ok(FormatChunk {
        code,
        channels: u16_at(chunk, 2)?,
        sample_rate: u32_at(chunk, 4)?,
        bits: u16_at(chunk, 14)?,
    })
}

fn decode_samples(format: FormatChunk, data: &[u8]) -> Result<Vec<Sample>> {
    let samples = match (format.code, format.bits) {
        (FORMAT_PCM, 16) => data
            .chunks_exact(2)
            .map(|b| f32::from(i16::from_le_bytes([b[0], b[1]])) / 32768.0)
            .collect(),
        (FORMAT_PCM, 24) => data
            .chunks_exact(3)
            .map(|b| {
                // Place in the top bytes so the shift sign-extends
                let raw = i32::from_le_bytes([0, b[0], b[1], b[2]]) >> 8;
                raw as f32 / 8_388_608.0
            })
            .collect(),
        (FORMAT_IEEE_FLOAT, 32) => data
            .chunks_exact(4)
            .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .collect(),
        (code, bits) => {
            return Err(invalid(format!(
                "unsupported sample format: code {}, {} bits",
                code, bits
            )))
        }
    };
    Ok(samples)
}

/// Parses a WAV file held in memory.
pub fn read_wav(data: &[u8]) -> Result<WavAudio> {
    if data.get(0..4) != Some(b"RIFF".as_slice()) {
        return Err(invalid("missing RIFF header"));
    }
    if data.get(8..12) != Some(b"WAVE".as_slice()) {
        return Err(invalid("missing WAVE identifier"));
    }

    let mut format = None;
    let mut audio = None;
    let mut cursor = 12;
    while cursor + 8 <= data.len() {
        let id = &data[cursor..cursor + 4];
        let size = u32_at(data, cursor + 4)? as usize;
        let body_start = cursor + 8;
        // A truncated data chunk keeps whatever was written
        let body_end = body_start.saturating_add(size).min(data.len());
        let body = &data[body_start..body_end];

        match id {
            b"fmt " => format = Some(parse_format(body)?),
            b"data" => audio = Some(body),
            _ => {}
        }
        cursor = body_start.saturating_add(size).saturating_add(size % 2);
    }

    let format = format.ok_or_else(|| invalid("no fmt chunk"))?;
    let audio = audio.ok_or_else(|| invalid("no data chunk"))?;
    if format.channels == 0 {
        return Err(invalid("zero channels"));
    }
    if format.sample_rate == 0 {
        return Err(invalid("zero sample rate"));
    }

    let mut samples = decode_samples(format, audio)?;
    samples.truncate(samples.len() - samples.len() % usize::from(format.channels));
    Ok(WavAudio::new(samples, format.sample_rate, format.channels))
}

/// Reads and parses a WAV file from disk.
pub fn read_wav_file(path: impl AsRef<Path>) -> Result<WavAudio> {
    let path = path.as_ref();
    let data = std::fs::read(path)
        .map_err(|e| StretchError::Io(format!("{}: {}", path.display(), e)))?;
    read_wav(&data)
}

/// Largest data chunk a RIFF header can describe.
const MAX_DATA_SIZE: u64 = u32::MAX as u64 - 36;

/// Encodes `audio` as a WAV file.
///
/// # Errors
/// [`StretchError::InvalidFormat`] when the frame size or the data length
/// does not fit the header fields.
pub fn write_wav(audio: &WavAudio, encoding: WavEncoding) -> Result<Vec<u8>> {
    let bytes_per_sample = u64::from(encoding.bits() / 8);
    let block_align = u32::from(audio.channels) * u32::from(encoding.bits() / 8);
    let block_align = u16::try_from(block_align).map_err(|_| {
        invalid(format!(
            "{} channels of {} bits exceed the WAV frame size",
            audio.channels,
            encoding.bits()
        ))
    })?;
    let byte_rate = u64::from(audio.sample_rate) * u64::from(block_align);
    let byte_rate = u32::try_from(byte_rate)
        .map_err(|_| invalid(format!("byte rate {} exceeds the WAV header", byte_rate)))?;
    let data_size = audio.samples.len() as u64 * bytes_per_sample;
    if data_size > MAX_DATA_SIZE {
        return Err(invalid(format!(
            "{} bytes of audio exceed the WAV size limit",
            data_size
        )));
    }
    let data_size = data_size as u32;

    let mut out = Vec::with_capacity(44 + data_size as usize);
    out.extend_from_slice(b"RIFF");
    out.extend_from_slice(&(36 + data_size).to_le_bytes());
    out.extend_from_slice(b"WAVE");

    out.extend_from_slice(b"fmt ");
    out.extend_from_slice(&16u32.to_le_bytes());
    out.extend_from_slice(&encoding.format_code().to_le_bytes());
    out.extend_from_slice(&audio.channels.to_le_bytes());
    out.extend_from_slice(&audio.sample_rate.to_le_bytes());
    out.extend_from_slice(&byte_rate.to_le_bytes());
    out.extend_from_slice(&block_align.to_le_bytes());
    out.extend_from_slice(&encoding.bits().to_le_bytes());

    out.extend_from_slice(b"data");
    out.extend_from_slice(&data_size.to_le_bytes());
    match encoding {
        WavEncoding::Pcm16 => {
            for &sample in &audio.samples {
                let raw = (sample.clamp(-1.0, 1.0) * 32767.0).round() as i16;
                out.extend_from_slice(&raw.to_le_bytes());
            }
        }
        WavEncoding::Float32 => {
            for &sample in &audio.samples {
                out.extend_from_slice(&sample.to_le_bytes());
            }
        }
    }
    Ok(out)
}

/// Encodes `audio` and writes it to `path`.
pub fn write_wav_file(path: impl AsRef<Path>, audio: &WavAudio, encoding: WavEncoding) -> Result<()> {
    let path = path.as_ref();
    std::fs::write(path, write_wav(audio, encoding)?)
        .map_err(|e| StretchError::Io(format!("{}: {}", path.display(), e)))
}
