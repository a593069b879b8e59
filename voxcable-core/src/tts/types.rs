use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;

/// Which synthesis backend handles a request
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum BackendKind {
    /// Remote neural synthesis over the network (non-blocking, cancellable)
    #[default]
    NetworkNeural,
    /// Local offline engine (blocking, isolated on a worker thread)
    LocalOffline,
}

impl BackendKind {
    pub fn label(&self) -> &'static str {
        match self {
            BackendKind::NetworkNeural => "network-neural",
            BackendKind::LocalOffline => "local-offline",
        }
    }
}

impl FromStr for BackendKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "network-neural" => Ok(BackendKind::NetworkNeural),
            "local-offline" => Ok(BackendKind::LocalOffline),
            other => anyhow::bail!(
                "unknown backend {other:?}, expected network-neural or local-offline"
            ),
        }
    }
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// One user submission: non-blank text plus the backend to synthesize it with
#[derive(Debug, Clone)]
pub struct SynthesisRequest {
    pub text: String,
    pub backend: BackendKind,
}

impl SynthesisRequest {
    /// Build a request, rejecting blank text (whitespace-only input is a
    /// no-op at the command surface, not an error).
    pub fn new(text: &str, backend: BackendKind) -> Option<Self> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }
        Some(Self {
            text: text.to_string(),
            backend,
        })
    }
}

/// The result of one successful synthesis: a complete WAV file on disk.
///
/// Owned by the session until playback finishes; the backing file is deleted
/// afterwards by `Session::cleanup`.
#[derive(Debug, Clone)]
pub struct AudioArtifact {
    pub path: PathBuf,
    pub sample_rate: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_text_is_rejected() {
        assert!(SynthesisRequest::new("", BackendKind::NetworkNeural).is_none());
        assert!(SynthesisRequest::new("   \t\n", BackendKind::LocalOffline).is_none());
    }

    #[test]
    fn text_is_trimmed() {
        let request = SynthesisRequest::new("  Hello  ", BackendKind::NetworkNeural).unwrap();
        assert_eq!(request.text, "Hello");
    }

    #[test]
    fn backend_labels_round_trip() {
        for kind in [BackendKind::NetworkNeural, BackendKind::LocalOffline] {
            assert_eq!(kind.label().parse::<BackendKind>().unwrap(), kind);
        }
    }

    #[test]
    fn invalid_backend_values_are_rejected() {
        for value in ["edge", "pytts", "Network-Neural", "network_neural", ""] {
            assert!(value.parse::<BackendKind>().is_err(), "accepted {value:?}");
        }
    }
}
