use nih_plug::prelude::*;
use std::sync::Arc;

pub mod engine;
pub mod render;

pub use engine::{db_to_gain, process_sample, FuzzEngine, FuzzSettings};

use engine::{DEFAULT_GAIN, DEFAULT_MIX, DEFAULT_VOLUME};

/// Upper bound of the output volume control
const MAX_VOLUME: f32 = 0.1;

pub struct SimpleFuzz {
    params: Arc<SimpleFuzzParams>,
    engine: FuzzEngine,
}

#[derive(Params)]
pub struct SimpleFuzzParams {
    #[id = "gain"]
    pub gain: FloatParam,
    #[id = "mix"]
    pub mix: FloatParam,
    #[id = "volume"]
    pub volume: FloatParam,
}

impl Default for SimpleFuzz {
    fn default() -> Self {
        Self {
            params: Arc::new(SimpleFuzzParams::default()),
            engine: FuzzEngine::new(),
        }
    }
}

impl Default for SimpleFuzzParams {
    fn default() -> Self {
        Self {
            // Drive before the clipper, 0-60 dB
            gain: FloatParam::new(
                "Gain",
                DEFAULT_GAIN,
                FloatRange::Linear { min: 0.0, max: 1.0 },
            )
            .with_value_to_string(formatters::v2s_f32_rounded(2)),

            mix: FloatParam::new(
                "Mix",
                DEFAULT_MIX,
                FloatRange::Linear { min: 0.0, max: 1.0 },
            )
            .with_value_to_string(formatters::v2s_f32_rounded(2)),

            volume: FloatParam::new(
                "Volume",
                DEFAULT_VOLUME,
                FloatRange::Linear {
                    min: 0.0,
                    max: MAX_VOLUME,
                },
            )
            .with_value_to_string(formatters::v2s_f32_rounded(3)),
        }
    }
}

impl SimpleFuzzParams {
    /// Current host-side values as one snapshot
    pub fn settings(&self) -> FuzzSettings {
        FuzzSettings {
            gain: self.gain.value(),
            mix: self.mix.value(),
            volume: self.volume.value(),
        }
    }
}

impl SimpleFuzz {
    /// Push the current parameter values into the engine, then fuzz the block
    pub fn process_block(&self, block: &mut [&mut [f32]]) {
        let FuzzSettings { gain, mix, volume } = self.params.settings();
        self.engine.configure(gain, mix, volume);
        self.engine.process(block);
    }
}

impl Plugin for SimpleFuzz {
    const NAME: &'static str = "Simple Fuzz";
    const VENDOR: &'static str = "simple_fuzz";
    const URL: &'static str = "";
    const EMAIL: &'static str = "";

    const VERSION: &'static str = env!("CARGO_PKG_VERSION");

    // Stereo first, mono as fallback; inputs and outputs always match
    const AUDIO_IO_LAYOUTS: &'static [AudioIOLayout] = &[
        AudioIOLayout {
            main_input_channels: NonZeroU32::new(2),
            main_output_channels: NonZeroU32::new(2),

            aux_input_ports: &[],
            aux_output_ports: &[],

            names: PortNames::const_default(),
        },
        AudioIOLayout {
            main_input_channels: NonZeroU32::new(1),
            main_output_channels: NonZeroU32::new(1),

            aux_input_ports: &[],
            aux_output_ports: &[],

            names: PortNames::const_default(),
        },
    ];

    const MIDI_INPUT: MidiConfig = MidiConfig::None;

    // Parameters are read once per host block
    const SAMPLE_ACCURATE_AUTOMATION: bool = false;

    type SysExMessage = ();
    type BackgroundTask = ();

    fn params(&self) -> Arc<dyn Params> {
        self.params.clone()
    }

    fn initialize(
        &mut self,
        audio_io_layout: &AudioIOLayout,
        buffer_config: &BufferConfig,
        _context: &mut impl InitContext<Self>,
    ) -> bool {
        let channels = audio_io_layout
            .main_output_channels
            .map(NonZeroU32::get)
            .unwrap_or(0);
        nih_log!(
            "initialized with {} channel(s) at {} Hz, max block {}",
            channels,
            buffer_config.sample_rate,
            buffer_config.max_buffer_size
        );
        true
    }

    fn process(
        &mut self,
        buffer: &mut Buffer,
        _aux: &mut AuxiliaryBuffers,
        _context: &mut impl ProcessContext<Self>,
    ) -> ProcessStatus {
        self.process_block(buffer.as_slice());

        ProcessStatus::Normal
    }
}

impl ClapPlugin for SimpleFuzz {
    const CLAP_ID: &'static str = "com.simple-fuzz.simple-fuzz";
    const CLAP_DESCRIPTION: Option<&'static str> =
        Some("soft-clipping fuzz with dry/wet mix and output volume");
    const CLAP_MANUAL_URL: Option<&'static str> = None;
    const CLAP_SUPPORT_URL: Option<&'static str> = None;
    const CLAP_FEATURES: &'static [ClapFeature] = &[
        ClapFeature::AudioEffect,
        ClapFeature::Mono,
        ClapFeature::Stereo,
        ClapFeature::Distortion,
    ];
}

impl Vst3Plugin for SimpleFuzz {
    const VST3_CLASS_ID: [u8; 16] = *b"SimpleFuzzEffect";

    const VST3_SUBCATEGORIES: &'static [Vst3SubCategory] =
        &[Vst3SubCategory::Fx, Vst3SubCategory::Distortion];
}

nih_export_clap!(SimpleFuzz);
nih_export_vst3!(SimpleFuzz);
