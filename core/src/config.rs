//! Generator configuration (~/.config/JJYWave/config.toml)
//!
//! Carrier and encoding settings, with defaults and TOML persistence in the
//! platform-specific config directory.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Errors from loading, saving or validating configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Reading or writing the config file failed
    #[error("config file I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// The config file is not valid TOML for [`GeneratorConfig`]
    #[error("config file could not be parsed: {0}")]
    Parse(#[from] toml::de::Error),

    /// The config could not be serialized
    #[error("config could not be serialized: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// A field holds a value the generator cannot use
    #[error("invalid {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

/// Complete generator configuration.
///
/// Serialized to/from TOML; every section falls back to its defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct GeneratorConfig {
    /// Audio format and carrier settings
    #[serde(default)]
    pub carrier: CarrierConfiguration,
    /// Time-code content settings
    #[serde(default)]
    pub encoding: EncodingOptions,
}

/// Longwave band being simulated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CarrierBand {
    /// Fukushima station, 40 kHz
    #[default]
    Khz40,
    /// Kyushu station, 60 kHz
    Khz60,
}

impl CarrierBand {
    /// Broadcast carrier frequency in Hz
    pub fn nominal_frequency(self) -> f64 {
        match self {
            CarrierBand::Khz40 => 40_000.0,
            CarrierBand::Khz60 => 60_000.0,
        }
    }

    /// Audio-rate carrier whose third harmonic lands on the band
    pub fn audio_frequency(self) -> f64 {
        self.nominal_frequency() / 3.0
    }
}

/// Carrier waveform shape
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum WaveformShape {
    #[default]
    Sine,
    /// Hard-clipped sine, richer in odd harmonics
    Square,
}

/// Audio format and carrier configuration.
///
/// `sample_rate` and `channel_count` are format-affecting: the generator
/// refuses to change them while transmitting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CarrierConfiguration {
    /// Output sample rate in Hz (default: 96000)
    #[serde(default = "default_sample_rate")]
    pub sample_rate: f64,
    /// Interleaved output channels (default: 2)
    #[serde(default = "default_channel_count")]
    pub channel_count: u16,
    /// Play `test_frequency` instead of the band carrier (default: false)
    #[serde(default)]
    pub test_mode: bool,
    /// Carrier used in test mode, in Hz
    #[serde(default = "default_test_frequency")]
    pub test_frequency: f64,
    /// Carrier used in normal mode, in Hz (default: band audio frequency)
    #[serde(default = "default_actual_frequency")]
    pub actual_frequency: f64,
    /// Simulated band (default: 40 kHz)
    #[serde(default)]
    pub band: CarrierBand,
    /// Carrier shape (default: sine)
    #[serde(default)]
    pub waveform: WaveformShape,
    /// Full-power amplitude (default: 1.0, range: 0.0-1.0)
    #[serde(default = "default_gain")]
    pub gain: f32,
    /// Reduced-power amplitude as a fraction of `gain` (default: 0.1)
    #[serde(default = "default_low_amplitude_fraction")]
    pub low_amplitude_fraction: f32,
}

fn default_sample_rate() -> f64 {
    96_000.0
}
fn default_channel_count() -> u16 {
    2
}
fn default_test_frequency() -> f64 {
    CarrierBand::Khz40.audio_frequency()
}
fn default_actual_frequency() -> f64 {
    CarrierBand::default().audio_frequency()
}
fn default_gain() -> f32 {
    1.0
}
fn default_low_amplitude_fraction() -> f32 {
    0.1
}
fn default_true() -> bool {
    true
}

impl Default for CarrierConfiguration {
    fn default() -> Self {
        Self {
            sample_rate: default_sample_rate(),
            channel_count: default_channel_count(),
            test_mode: false,
            test_frequency: default_test_frequency(),
            actual_frequency: default_actual_frequency(),
            band: CarrierBand::default(),
            waveform: WaveformShape::default(),
            gain: default_gain(),
            low_amplitude_fraction: default_low_amplitude_fraction(),
        }
    }
}

impl CarrierConfiguration {
    /// Frequency actually rendered: test tone in test mode, band carrier otherwise
    pub fn effective_frequency(&self) -> f64 {
        if self.test_mode {
            self.test_frequency
        } else {
            self.actual_frequency
        }
    }

    /// Switch band and retune the carrier to it
    pub fn set_band(&mut self, band: CarrierBand) {
        self.band = band;
        self.actual_frequency = band.audio_frequency();
    }

    /// Output format fields that differ from `other`
    ///
    /// These need the sink renegotiated, so they cannot change mid-run.
    pub fn format_changes(&self, other: &CarrierConfiguration) -> Vec<&'static str> {
        let mut fields = Vec::new();
        if self.sample_rate != other.sample_rate {
            fields.push("sample_rate");
        }
        if self.channel_count != other.channel_count {
            fields.push("channel_count");
        }
        fields
    }

    /// Check that every field is usable for synthesis
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.sample_rate.is_finite() || self.sample_rate < 1.0 {
            return Err(ConfigError::InvalidValue {
                field: "sample_rate",
                reason: format!("{} Hz is not a usable sample rate", self.sample_rate),
            });
        }
        if self.channel_count == 0 {
            return Err(ConfigError::InvalidValue {
                field: "channel_count",
                reason: "at least one channel is required".to_string(),
            });
        }
        for (field, freq) in [
            ("test_frequency", self.test_frequency),
            ("actual_frequency", self.actual_frequency),
        ] {
            if !freq.is_finite() || freq < 0.0 {
                return Err(ConfigError::InvalidValue {
                    field,
                    reason: format!("{freq} Hz is not a usable frequency"),
                });
            }
        }
        if !self.gain.is_finite() || !(0.0..=1.0).contains(&self.gain) {
            return Err(ConfigError::InvalidValue {
                field: "gain",
                reason: format!("{} is outside 0.0-1.0", self.gain),
            });
        }
        if !self.low_amplitude_fraction.is_finite()
            || !(0.0..=1.0).contains(&self.low_amplitude_fraction)
        {
            return Err(ConfigError::InvalidValue {
                field: "low_amplitude_fraction",
                reason: format!("{} is outside 0.0-1.0", self.low_amplitude_fraction),
            });
        }
        Ok(())
    }
}

/// Direction of a planned leap second
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeapSecondKind {
    Insert,
    Delete,
}

/// Leap second scheduled at the end of a UTC month
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeapSecondPlan {
    pub year_utc: i32,
    /// 1-12
    pub month_utc: u32,
    pub kind: LeapSecondKind,
}

/// The six service-status flags sent on announcement minutes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ServiceStatusBits(pub [bool; 6]);

impl ServiceStatusBits {
    pub fn get(&self, index: usize) -> bool {
        self.0.get(index).copied().unwrap_or(false)
    }

    pub fn set(&mut self, index: usize, value: bool) {
        if let Some(bit) = self.0.get_mut(index) {
            *bit = value;
        }
    }

    /// Pack into the low 6 bits, flag 0 in bit 5
    pub fn bits(&self) -> u8 {
        self.0
            .iter()
            .fold(0u8, |acc, &bit| (acc << 1) | u8::from(bit))
    }

    /// Unpack the low 6 bits, bit 5 into flag 0
    pub fn from_bits(bits: u8) -> Self {
        let mut flags = [false; 6];
        for (i, flag) in flags.iter_mut().enumerate() {
            *flag = bits & (1 << (5 - i)) != 0;
        }
        Self(flags)
    }
}

/// What the time code carries besides the calendar fields.
///
/// When `leap_second_plan` is set it is the only leap-second source; the
/// manual `leap_second_pending` / `leap_second_inserted` flags are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncodingOptions {
    /// Morse call sign on minutes 15 and 45 (default: true)
    #[serde(default = "default_true")]
    pub enable_callsign: bool,
    /// Service-status bits on call sign minutes (default: false)
    #[serde(default)]
    pub enable_service_status_bits: bool,
    /// Manual mode: a leap second is being executed this minute
    #[serde(default)]
    pub leap_second_pending: bool,
    /// Manual mode direction: insert (true) or delete (false)
    #[serde(default)]
    pub leap_second_inserted: bool,
    #[serde(default)]
    pub service_status_bits: ServiceStatusBits,
    /// Calendar-driven leap second
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub leap_second_plan: Option<LeapSecondPlan>,
}

impl Default for EncodingOptions {
    fn default() -> Self {
        Self {
            enable_callsign: default_true(),
            enable_service_status_bits: false,
            leap_second_pending: false,
            leap_second_inserted: false,
            service_status_bits: ServiceStatusBits::default(),
            leap_second_plan: None,
        }
    }
}

/// Returns the platform-specific configuration directory.
///
/// On Windows: `%APPDATA%\JJYWave\config`
/// On macOS: `~/Library/Application Support/io.jjywave.JJYWave`
/// On Linux: `~/.config/JJYWave`
///
/// Returns `None` if the home directory cannot be determined.
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("io.jjywave", "", "JJYWave")
        .map(|dirs| dirs.config_dir().to_path_buf())
}

/// Loads the configuration from disk.
///
/// Reads `config.toml` from the platform's configuration directory.
/// Returns default values if the file doesn't exist or cannot be parsed.
pub fn load() -> GeneratorConfig {
    config_dir()
        .and_then(|dir| load_from(&dir.join("config.toml")).ok())
        .unwrap_or_default()
}

/// Load and parse a specific config file
pub fn load_from(path: &Path) -> Result<GeneratorConfig, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    Ok(toml::from_str(&content)?)
}

/// Saves the configuration to disk.
///
/// Writes `config.toml` to the platform's configuration directory.
/// Creates the directory if it doesn't exist.
///
/// # Errors
///
/// Returns an error if the directory cannot be created or the file
/// cannot be written.
pub fn save(config: &GeneratorConfig) -> Result<(), ConfigError> {
    if let Some(dir) = config_dir() {
        save_to(&dir.join("config.toml"), config)?;
    }
    Ok(())
}

/// Write `config` to `path`, creating parent directories
pub fn save_to(path: &Path, config: &GeneratorConfig) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content)?;
    Ok(())
}
