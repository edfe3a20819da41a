//! Offline rendering of WAV files through the [`FuzzEngine`].
//!
//! The file is split into channels, fed to the engine in fixed-size blocks
//! the way a host would, then interleaved back and written out.

use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use std::path::Path;

use crate::engine::FuzzEngine;

pub const DEFAULT_BLOCK_SIZE: usize = 512;
pub const DEFAULT_BIT_DEPTH: u16 = 32;

/// Errors raised while rendering a file.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("WAV file error: {0}")]
    Wav(#[from] hound::Error),

    #[error("block size must be at least one sample")]
    InvalidBlockSize,

    #[error("unsupported output bit depth: {0} (expected 16, 24, or 32)")]
    UnsupportedBitDepth(u16),

    #[error("{samples} samples cannot be split into {channels} channel(s)")]
    Truncated { samples: usize, channels: usize },

    #[error("channel {channel} has {len} samples, expected {expected}")]
    RaggedChannels {
        channel: usize,
        len: usize,
        expected: usize,
    },

    #[error("cannot write {0} channels to a WAV file")]
    TooManyChannels(usize),
}

pub type Result<T> = std::result::Result<T, RenderError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderOptions {
    pub block_size: usize,
    pub bit_depth: u16,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            block_size: DEFAULT_BLOCK_SIZE,
            bit_depth: DEFAULT_BIT_DEPTH,
        }
    }
}

impl RenderOptions {
    pub fn validate(&self) -> Result<()> {
        if self.block_size == 0 {
            return Err(RenderError::InvalidBlockSize);
        }
        match self.bit_depth {
            16 | 24 | 32 => Ok(()),
            other => Err(RenderError::UnsupportedBitDepth(other)),
        }
    }
}

/// What a render pass did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderSummary {
    pub sample_rate: u32,
    pub channels: usize,
    pub frames: usize,
    pub blocks: usize,
}

/// Read a WAV file as one `Vec` per channel, scaled to [-1.0, 1.0].
pub fn read_channels<P: AsRef<Path>>(path: P) -> Result<(Vec<Vec<f32>>, WavSpec)> {
    let reader = WavReader::open(path)?;
    let spec = reader.spec();

    let interleaved: Vec<f32> = match spec.sample_format {
        SampleFormat::Float => reader
            .into_samples::<f32>()
            .collect::<std::result::Result<Vec<_>, _>>()?,
        SampleFormat::Int => {
            let max_val = int_scale(spec.bits_per_sample);
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| v as f32 / max_val))
                .collect::<std::result::Result<Vec<_>, _>>()?
        }
    };

    Ok((deinterleave(&interleaved, spec.channels as usize)?, spec))
}

/// Interleave `channels` and write them as a WAV file.
///
/// 32 bits writes IEEE float, 16 and 24 bits write clamped integers. Every
/// channel must hold the same number of samples.
pub fn write_channels<P: AsRef<Path>>(
    path: P,
    channels: &[Vec<f32>],
    sample_rate: u32,
    bit_depth: u16,
) -> Result<()> {
    let sample_format = match bit_depth {
        32 => SampleFormat::Float,
        16 | 24 => SampleFormat::Int,
        other => return Err(RenderError::UnsupportedBitDepth(other)),
    };
    let num_channels =
        u16::try_from(channels.len()).map_err(|_| RenderError::TooManyChannels(channels.len()))?;
    let frames = channels.first().map_or(0, Vec::len);
    if let Some((channel, ragged)) = channels
        .iter()
        .enumerate()
        .find(|(_, channel)| channel.len() != frames)
    {
        return Err(RenderError::RaggedChannels {
            channel,
            len: ragged.len(),
            expected: frames,
        });
    }

    let spec = WavSpec {
        channels: num_channels,
        sample_rate,
        bits_per_sample: bit_depth,
        sample_format,
    };
    let mut writer = WavWriter::create(path, spec)?;

    let max_val = int_scale(bit_depth);
    for frame in 0..frames {
        for channel in channels {
            let sample = channel[frame];
            match sample_format {
                SampleFormat::Float => writer.write_sample(sample)?,
                SampleFormat::Int => {
                    let int_sample = (sample * max_val).clamp(-max_val, max_val - 1.0) as i32;
                    writer.write_sample(int_sample)?;
                }
            }
        }
    }

    writer.finalize()?;
    Ok(())
}

/// Run the engine over whole channels, `block_size` frames at a time.
///
/// Returns the number of blocks processed. The final block may be short.
/// Block boundaries follow the first channel; shorter channels are processed
/// over their own length.
pub fn process_channels(
    engine: &FuzzEngine,
    channels: &mut [Vec<f32>],
    block_size: usize,
) -> Result<usize> {
    if block_size == 0 {
        return Err(RenderError::InvalidBlockSize);
    }

    let frames = channels.first().map_or(0, Vec::len);
    let mut blocks = 0;
    let mut start = 0;
    while start < frames {
        let end = (start + block_size).min(frames);
        let mut block: Vec<&mut [f32]> = channels
            .iter_mut()
            .map(|channel| {
                let len = channel.len();
                &mut channel[start.min(len)..end.min(len)]
            })
            .collect();
        engine.process(&mut block);

        blocks += 1;
        start = end;
    }

    Ok(blocks)
}

/// Read `input`, fuzz it with the engine's current settings and write `output`.
///
/// The output keeps the input's sample rate and channel count.
pub fn render_file<P: AsRef<Path>, Q: AsRef<Path>>(
    engine: &FuzzEngine,
    input: P,
    output: Q,
    options: RenderOptions,
) -> Result<RenderSummary> {
    options.validate()?;

    let (mut channels, spec) = read_channels(input.as_ref())?;
    let frames = channels.first().map_or(0, Vec::len);
    tracing::info!(
        path = %input.as_ref().display(),
        channels = channels.len(),
        sample_rate = spec.sample_rate,
        frames,
        "read input"
    );

    let settings = engine.settings();
    tracing::debug!(
        gain = settings.gain,
        mix = settings.mix,
        volume = settings.volume,
        block_size = options.block_size,
        "rendering"
    );
    let blocks = process_channels(engine, &mut channels, options.block_size)?;

    write_channels(
        output.as_ref(),
        &channels,
        spec.sample_rate,
        options.bit_depth,
    )?;
    tracing::info!(
        path = %output.as_ref().display(),
        bit_depth = options.bit_depth,
        blocks,
        "wrote output"
    );

    Ok(RenderSummary {
        sample_rate: spec.sample_rate,
        channels: channels.len(),
        frames,
        blocks,
    })
}

fn int_scale(bits_per_sample: u16) -> f32 {
    2f32.powi(i32::from(bits_per_sample) - 1)
}

fn deinterleave(samples: &[f32], num_channels: usize) -> Result<Vec<Vec<f32>>> {
    if num_channels == 0 || samples.len() % num_channels != 0 {
        return Err(RenderError::Truncated {
            samples: samples.len(),
            channels: num_channels,
        });
    }

    let frames = samples.len() / num_channels;
    let mut channels = vec![Vec::with_capacity(frames); num_channels];
    for frame in samples.chunks_exact(num_channels) {
        for (channel, &sample) in channels.iter_mut().zip(frame) {
            channel.push(sample);
        }
    }

    Ok(channels)
}
