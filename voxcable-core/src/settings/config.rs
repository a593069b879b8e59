use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::tts::edge::EdgeNeuralConfig;
use crate::tts::espeak::EspeakConfig;
use crate::tts::types::BackendKind;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    #[serde(default)]
    pub audio: AudioSettings,

    #[serde(default)]
    pub tts: TtsSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioSettings {
    /// Name fragment identifying the virtual-cable output device.
    /// Matching is a case-sensitive substring check.
    #[serde(default = "default_device_name")]
    pub device_name: String,

    /// Where synthesis artifacts are written before playback.
    /// Defaults to `~/.voxcable/cache` when unset.
    #[serde(default)]
    pub cache_dir: Option<PathBuf>,
}

impl Default for AudioSettings {
    fn default() -> Self {
        Self {
            device_name: default_device_name(),
            cache_dir: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TtsSettings {
    #[serde(default)]
    pub default_backend: BackendKind,

    #[serde(default)]
    pub edge: EdgeSettings,

    #[serde(default)]
    pub espeak: EspeakSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EdgeSettings {
    #[serde(default = "default_edge_voice")]
    pub voice: String,

    #[serde(default = "default_rate_percent")]
    pub rate_percent: i32,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for EdgeSettings {
    fn default() -> Self {
        Self {
            voice: default_edge_voice(),
            rate_percent: default_rate_percent(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl EdgeSettings {
    pub fn to_config(&self) -> EdgeNeuralConfig {
        EdgeNeuralConfig {
            voice: self.voice.clone(),
            rate_percent: self.rate_percent,
            timeout: Duration::from_secs(self.timeout_secs),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EspeakSettings {
    #[serde(default = "default_rate_wpm")]
    pub rate_wpm: u32,

    #[serde(default)]
    pub voice: Option<String>,
}

impl Default for EspeakSettings {
    fn default() -> Self {
        Self {
            rate_wpm: default_rate_wpm(),
            voice: None,
        }
    }
}

impl EspeakSettings {
    pub fn to_config(&self) -> EspeakConfig {
        EspeakConfig {
            rate_wpm: self.rate_wpm,
            voice: self.voice.clone(),
        }
    }
}

fn default_device_name() -> String {
    "CABLE Input".to_string()
}

fn default_edge_voice() -> String {
    "zh-TW-HsiaoChenNeural".to_string()
}

fn default_rate_percent() -> i32 {
    10
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_rate_wpm() -> u32 {
    175
}
