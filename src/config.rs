use serde::{Deserialize, Serialize};
use twox_hash::XxHash3_64;

/// Frozen per-catalogue extractor parameters (spec §3, §6).
///
/// Every field here MUST be identical at ingest and query time; changing any
/// one of them invalidates the catalogue. [`ExtractorConfig::epoch`] folds
/// them into a single 64-bit fingerprint that the store records on first
/// ingest, so later drift can be caught instead of silently poisoning the
/// catalogue (see the drift note in DESIGN.md).
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ExtractorConfig {
    pub sample_rate: u32,
    pub fft_size: usize,
    pub hop: usize,
    pub freq_lo: f64,
    pub freq_hi: f64,
    pub peak_radius: usize,
    pub amp_percentile: f64,
    pub fan_size: usize,
    pub target_zone_start: usize,
    pub target_zone_width: usize,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            sample_rate: 22_050,
            fft_size: 2048,
            hop: 512,
            freq_lo: 20.0,
            freq_hi: 5_000.0,
            peak_radius: 10,
            amp_percentile: 90.0,
            fan_size: 5,
            target_zone_start: 1,
            target_zone_width: 75,
        }
    }
}

impl ExtractorConfig {
    /// Fixed key for the epoch mixer, versioned independently of the
    /// per-tuple hash key in `hasher` so a format change in one doesn't
    /// silently alias with the other.
    const EPOCH_SEED: u64 = 0x45_43_48_4f_5f_45_50_31; // "ECHO_EP1"

    /// A stable 64-bit fingerprint of the configuration, used to detect
    /// parameter drift between a catalogue and the running process.
    pub fn epoch(&self) -> u64 {
        let mut bytes = Vec::with_capacity(64);
        bytes.extend_from_slice(&self.sample_rate.to_le_bytes());
        bytes.extend_from_slice(&(self.fft_size as u64).to_le_bytes());
        bytes.extend_from_slice(&(self.hop as u64).to_le_bytes());
        bytes.extend_from_slice(&self.freq_lo.to_bits().to_le_bytes());
        bytes.extend_from_slice(&self.freq_hi.to_bits().to_le_bytes());
        bytes.extend_from_slice(&(self.peak_radius as u64).to_le_bytes());
        bytes.extend_from_slice(&self.amp_percentile.to_bits().to_le_bytes());
        bytes.extend_from_slice(&(self.fan_size as u64).to_le_bytes());
        bytes.extend_from_slice(&(self.target_zone_start as u64).to_le_bytes());
        bytes.extend_from_slice(&(self.target_zone_width as u64).to_le_bytes());
        XxHash3_64::oneshot_with_seed(Self::EPOCH_SEED, &bytes)
    }
}

/// Tunable matcher thresholds (spec §4.5, §6).
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct MatcherConfig {
    pub max_query: usize,
    pub batch_size: usize,
    pub early_exit: u32,
    pub min_peak: u32,
    pub good_match_baseline: u32,
    pub min_confidence_pct: f64,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            max_query: 400,
            batch_size: 100,
            early_exit: 80,
            min_peak: 5,
            good_match_baseline: 100,
            min_confidence_pct: 5.0,
        }
    }
}

/// The file extensions the cheap pre-decode reject (§6) allows through.
pub const SUPPORTED_EXTENSIONS: &[&str] = &["mp3", "wav", "flac", "ogg", "m4a"];

/// Top-level service configuration, assembled by [`ServiceConfig::load`] from
/// built-in defaults, an optional file, and `ECHOID_`-prefixed environment
/// variables, in increasing precedence.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub extractor: ExtractorConfig,
    pub matcher: MatcherConfig,
    pub http_addr: String,
    pub log_filter: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            extractor: ExtractorConfig::default(),
            matcher: MatcherConfig::default(),
            http_addr: "0.0.0.0:8080".to_string(),
            log_filter: "info".to_string(),
        }
    }
}

impl ServiceConfig {
    /// Loads configuration from (lowest to highest precedence): built-in
    /// defaults, `config/default.toml` (or the path in `ECHOID_CONFIG`), and
    /// `ECHOID_`-prefixed environment variables.
    pub fn load() -> anyhow::Result<Self> {
        let config_path =
            std::env::var("ECHOID_CONFIG").unwrap_or_else(|_| "config/default.toml".to_string());

        let builder = config::Config::builder()
            .add_source(config::Config::try_from(&ServiceConfig::default())?)
            .add_source(config::File::with_name(&config_path).required(false))
            .add_source(
                config::Environment::with_prefix("ECHOID")
                    .separator("__")
                    .try_parsing(true),
            );

        let settings = builder.build()?;
        Ok(settings.try_deserialize()?)
    }
}
