use atomic_float::AtomicF32;
use std::sync::atomic::Ordering;

/// Drive range covered by a `gain` of 1.0
pub const MAX_DRIVE_DB: f32 = 60.0;
/// Positive ceiling of the wet signal, applied in double precision so clipped
/// samples land exactly on `0.99f32`
const CLIP_CEILING: f64 = 0.99;

pub const DEFAULT_GAIN: f32 = 0.0;
pub const DEFAULT_MIX: f32 = 0.0;
pub const DEFAULT_VOLUME: f32 = 0.1;

/// Decibels to linear amplitude, `10^(dB/20)`
#[inline]
pub fn db_to_gain(db: f32) -> f32 {
    10f32.powf(db / 20.0)
}

/// A snapshot of the three fuzz controls
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FuzzSettings {
    pub gain: f32,
    pub mix: f32,
    pub volume: f32,
}

impl Default for FuzzSettings {
    fn default() -> Self {
        Self {
            gain: DEFAULT_GAIN,
            mix: DEFAULT_MIX,
            volume: DEFAULT_VOLUME,
        }
    }
}

impl FuzzSettings {
    /// Linear drive applied before clipping
    #[inline]
    pub fn drive(&self) -> f32 {
        db_to_gain(self.gain * MAX_DRIVE_DB)
    }
}

/// Run one sample through drive, clipping, dry/wet and volume.
///
/// Only positive overshoot is limited: a wet sample above the ceiling is
/// pulled back to it, negative excursions pass through untouched.
#[inline]
pub fn process_sample(dry_sample: f32, settings: &FuzzSettings) -> f32 {
    fuzz(dry_sample, settings.drive(), settings.mix, settings.volume)
}

#[inline]
fn fuzz(dry_sample: f32, drive: f32, mix: f32, volume: f32) -> f32 {
    let mut wet = dry_sample * drive;
    let wide = f64::from(wet);
    if wide > CLIP_CEILING {
        wet = (wide * (CLIP_CEILING / wide.abs())) as f32;
    }

    let out = (dry_sample * (1.0 - mix)) + (wet * mix);
    out * volume
}

/// Memoryless fuzz processor.
///
/// Parameters live in independent atomics, so [`FuzzEngine::configure`] can be
/// called from a control thread while the audio thread is inside
/// [`FuzzEngine::process`]. A block may see a partially updated triple; the
/// next block picks up the rest.
#[derive(Debug)]
pub struct FuzzEngine {
    gain: AtomicF32,
    mix: AtomicF32,
    volume: AtomicF32,
}

impl Default for FuzzEngine {
    fn default() -> Self {
        Self::with_settings(FuzzSettings::default())
    }
}

impl FuzzEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_settings(settings: FuzzSettings) -> Self {
        Self {
            gain: AtomicF32::new(settings.gain),
            mix: AtomicF32::new(settings.mix),
            volume: AtomicF32::new(settings.volume),
        }
    }

    /// Set all three controls. Values outside the nominal ranges are stored
    /// as-is and applied arithmetically.
    pub fn configure(&self, gain: f32, mix: f32, volume: f32) {
        self.gain.store(gain, Ordering::Relaxed);
        self.mix.store(mix, Ordering::Relaxed);
        self.volume.store(volume, Ordering::Relaxed);
    }

    pub fn settings(&self) -> FuzzSettings {
        FuzzSettings {
            gain: self.gain.load(Ordering::Relaxed),
            mix: self.mix.load(Ordering::Relaxed),
            volume: self.volume.load(Ordering::Relaxed),
        }
    }

    /// Transform every sample of every channel in place.
    ///
    /// Parameters are read once for the whole block. Each channel is walked
    /// over its own length, so empty blocks and empty channels are no-ops.
    pub fn process(&self, block: &mut [&mut [f32]]) {
        let settings = self.settings();
        let drive = settings.drive();

        for channel in block.iter_mut() {
            for sample in channel.iter_mut() {
                *sample = fuzz(*sample, drive, settings.mix, settings.volume);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::{assert_abs_diff_eq, assert_relative_eq};
    use std::sync::Arc;
    use std::thread;

    fn engine(gain: f32, mix: f32, volume: f32) -> FuzzEngine {
        let engine = FuzzEngine::new();
        engine.configure(gain, mix, volume);
        engine
    }

    #[test]
    fn defaults() {
        let settings = FuzzEngine::new().settings();
        assert_eq!(settings, FuzzSettings::default());
        assert_eq!(settings.gain, 0.0);
        assert_eq!(settings.mix, 0.0);
        assert_eq!(settings.volume, 0.1);
    }

    #[test]
    fn dry_path_is_scaled_by_volume_only() {
        let engine = engine(0.0, 0.0, 0.1);
        let mut left = [0.5f32];
        let mut right = [-0.25f32];
        engine.process(&mut [&mut left, &mut right]);

        assert_relative_eq!(left[0], 0.05, epsilon = 1e-7);
        assert_relative_eq!(right[0], -0.025, epsilon = 1e-7);
    }

    #[test]
    fn drive_follows_decibel_mapping() {
        let half = FuzzSettings {
            gain: 0.5,
            ..FuzzSettings::default()
        };
        assert_relative_eq!(half.drive(), 31.622_776, max_relative = 1e-5);

        let full = FuzzSettings {
            gain: 1.0,
            ..FuzzSettings::default()
        };
        assert_relative_eq!(full.drive(), 1000.0, max_relative = 1e-5);
        assert_eq!(FuzzSettings::default().drive(), 1.0);
    }

    #[test]
    fn positive_overshoot_is_pulled_to_ceiling() {
        assert_eq!(fuzz(1.0, 1.5, 1.0, 1.0), 0.99f32);
        assert_abs_diff_eq!(fuzz(1.0, 1.5, 1.0, 0.1), 0.099, epsilon = 1e-7);

        // Half dry, half clipped wet
        assert_abs_diff_eq!(fuzz(1.0, 1.5, 0.5, 1.0), 0.995, epsilon = 1e-6);
    }

    #[test]
    fn clipped_samples_land_exactly_on_ceiling() {
        let engine = engine(0.0, 1.0, 1.0);
        let mut samples: Vec<f32> = vec![1.016_806_4, 1.030_117_8, 1.5];
        samples.extend((1..=20_000).map(|i| 0.99 + i as f32 * 0.05));
        samples.extend((1..=2_000).map(|i| 1.0 + i as f32 * 1.0e-5));
        engine.process(&mut [samples.as_mut_slice()]);

        for sample in samples {
            assert_eq!(sample, 0.99f32);
        }
    }

    #[test]
    fn ceiling_is_not_touched_below_threshold() {
        assert_eq!(fuzz(0.99, 1.0, 1.0, 1.0), 0.99);
        assert_eq!(fuzz(0.5, 1.0, 1.0, 1.0), 0.5);
    }

    #[test]
    fn negative_overshoot_is_not_clamped() {
        let engine = engine(0.0, 1.0, 1.0);
        let mut samples = [-2.0f32];
        engine.process(&mut [&mut samples]);
        assert_eq!(samples[0], -2.0);

        // Heavy drive drives negative samples far past -1
        let settings = FuzzSettings {
            gain: 0.5,
            mix: 1.0,
            volume: 1.0,
        };
        assert_relative_eq!(
            process_sample(-0.5, &settings),
            -15.811_388,
            max_relative = 1e-5
        );
    }

    #[test]
    fn heavy_drive_saturates_positive_half() {
        let engine = engine(1.0, 1.0, 0.1);
        let mut samples = [0.01f32, 0.2, 0.9];
        engine.process(&mut [&mut samples]);
        for sample in samples {
            assert_abs_diff_eq!(sample, 0.099, epsilon = 1e-6);
        }
    }

    #[test]
    fn empty_blocks_are_noops() {
        let engine = engine(1.0, 1.0, 0.1);
        engine.process(&mut []);

        let mut empty: [f32; 0] = [];
        engine.process(&mut [&mut empty]);
        assert!(empty.is_empty());
    }

    #[test]
    fn out_of_range_values_are_applied() {
        let engine = engine(0.0, 2.0, 1.0);
        assert_eq!(engine.settings().mix, 2.0);

        // dry * (1 - 2) + wet * 2 = wet when drive is unity
        let mut samples = [0.5f32];
        engine.process(&mut [&mut samples]);
        assert_relative_eq!(samples[0], 0.5, epsilon = 1e-7);

        let engine = engine_with_volume(2.0);
        let mut samples = [0.25f32];
        engine.process(&mut [&mut samples]);
        assert_relative_eq!(samples[0], 0.5, epsilon = 1e-7);
    }

    fn engine_with_volume(volume: f32) -> FuzzEngine {
        FuzzEngine::with_settings(FuzzSettings {
            volume,
            ..FuzzSettings::default()
        })
    }

    #[test]
    fn same_configuration_gives_same_output() {
        let engine = engine(0.3, 0.7, 0.05);
        let input = [0.0f32, 0.1, -0.4, 0.8, -1.0, 1.0];

        let mut first = input;
        let mut second = input;
        engine.process(&mut [&mut first]);
        engine.process(&mut [&mut second]);
        assert_eq!(first, second);

        // Processing already processed audio is not idempotent
        let mut again = first;
        engine.process(&mut [&mut again]);
        assert_ne!(again, first);
    }

    #[test]
    fn channels_are_processed_independently() {
        let engine = engine(0.2, 0.5, 0.1);
        let mut left = [0.3f32, -0.3];
        let mut right = [0.7f32, 0.0];
        engine.process(&mut [&mut left, &mut right]);

        let settings = engine.settings();
        assert_eq!(left[0], process_sample(0.3, &settings));
        assert_eq!(left[1], process_sample(-0.3, &settings));
        assert_eq!(right[0], process_sample(0.7, &settings));
        assert_eq!(right[1], 0.0);
    }

    #[test]
    fn configure_from_another_thread() {
        let engine = Arc::new(FuzzEngine::new());
        let control = {
            let engine = engine.clone();
            thread::spawn(move || engine.configure(0.0, 1.0, 0.05))
        };
        control.join().unwrap();

        let mut samples = [0.4f32];
        engine.process(&mut [&mut samples]);
        assert_relative_eq!(samples[0], 0.02, epsilon = 1e-7);
    }
}
