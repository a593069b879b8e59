//! One speech session: backend state plus the synthesize/play/cleanup pipeline
//!
//! The session is an explicit state object rather than process globals, so
//! tests (and in principle multiple sessions) can instantiate it
//! independently. Device resolution and engine initialization both degrade
//! gracefully: a session without a device keeps synthesizing, a session
//! without the local engine keeps serving the network backend.

use anyhow::{anyhow, Context, Result};
use std::path::PathBuf;
use uuid::Uuid;

use crate::audio::device;
use crate::audio::playback::AudioPlayer;
use crate::error::VoxError;
use crate::settings::Settings;
use crate::tts::edge::EdgeNeural;
use crate::tts::espeak::{EspeakEngine, LocalSynth};
use crate::tts::provider::TextToSpeech;
use crate::tts::types::{AudioArtifact, BackendKind, SynthesisRequest};

/// How a playback request ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayOutcome {
    /// The clip played to completion on the resolved device
    Completed,
    /// No device was resolved; playback was skipped (expected degraded mode)
    Skipped,
}

pub struct Session {
    backend: BackendKind,
    network: EdgeNeural,
    local: Option<LocalSynth>,
    player: Option<AudioPlayer>,
    device_name: Option<String>,
    cache_dir: PathBuf,
}

impl Session {
    /// Build a session from settings: create the cache directory, resolve
    /// the output device once, and initialize both backends.
    ///
    /// Only cache-directory failure is fatal; everything else degrades.
    pub fn new(settings: &Settings) -> Result<Self> {
        let cache_dir = match &settings.audio.cache_dir {
            Some(dir) => dir.clone(),
            None => default_cache_dir()?,
        };
        std::fs::create_dir_all(&cache_dir)
            .with_context(|| format!("failed to create cache directory {}", cache_dir.display()))?;

        let (player, device_name) = match device::resolve(&settings.audio.device_name) {
            Ok(output) => {
                let name = output.name.clone();
                match AudioPlayer::new(output) {
                    Ok(player) => (Some(player), Some(name)),
                    Err(e) => {
                        tracing::warn!(error = %e, "output device unusable, continuing without playback");
                        (None, None)
                    }
                }
            }
            // DeviceNotFound and DeviceEnumerationFailed both degrade to
            // synthesis-only mode rather than aborting startup.
            Err(e) => {
                tracing::warn!(error = %e, "continuing without playback");
                (None, None)
            }
        };

        let local = match EspeakEngine::new(settings.tts.espeak.to_config()) {
            Ok(engine) => Some(LocalSynth::new(engine)),
            Err(e) => {
                tracing::warn!(error = %e, "local-offline backend unavailable");
                None
            }
        };

        Ok(Self {
            backend: settings.tts.default_backend,
            network: EdgeNeural::new(settings.tts.edge.to_config()),
            local,
            player,
            device_name,
            cache_dir,
        })
    }

    /// The currently active backend
    pub fn backend(&self) -> BackendKind {
        self.backend
    }

    /// Switch the active backend. Setting the current value is a no-op.
    pub fn set_backend(&mut self, kind: BackendKind) {
        if self.backend != kind {
            tracing::info!(from = %self.backend, to = %kind, "switching synthesis backend");
            self.backend = kind;
        }
    }

    /// Name of the resolved output device, if any
    pub fn device_name(&self) -> Option<&str> {
        self.device_name.as_deref()
    }

    pub fn local_available(&self) -> bool {
        self.local.is_some()
    }

    /// Synthesize one request into a fresh cache artifact.
    ///
    /// The destination name carries a v4 UUID so sequential and concurrent
    /// requests never alias files. No retries: a failure is surfaced for
    /// this request and the caller re-prompts.
    pub async fn synthesize(&self, request: &SynthesisRequest) -> Result<AudioArtifact, VoxError> {
        let path = self
            .cache_dir
            .join(format!("clip_{}.wav", Uuid::new_v4().simple()));

        let backend: &dyn TextToSpeech = match request.backend {
            BackendKind::NetworkNeural => &self.network,
            BackendKind::LocalOffline => self
                .local
                .as_ref()
                .map(|synth| synth as &dyn TextToSpeech)
                .ok_or_else(|| {
                    VoxError::SynthesisFailed(anyhow!("local-offline engine is not available"))
                })?,
        };

        backend
            .synthesize(&request.text, &path)
            .await
            .map_err(VoxError::SynthesisFailed)?;

        // The artifact must be a complete, decodable file before we return.
        let sample_rate = match hound::WavReader::open(&path) {
            Ok(reader) => reader.spec().sample_rate,
            Err(e) => {
                let _ = std::fs::remove_file(&path);
                return Err(VoxError::SynthesisFailed(
                    anyhow!(e).context("backend produced an undecodable artifact"),
                ));
            }
        };

        tracing::debug!(path = %path.display(), sample_rate, backend = %request.backend, "synthesis complete");
        Ok(AudioArtifact { path, sample_rate })
    }

    /// Play an artifact on the resolved device, waiting until it finishes.
    ///
    /// With no resolved device this returns [`PlayOutcome::Skipped`] without
    /// attempting submission. Waiting here is what serializes playback: at
    /// most one clip is in flight on the shared device. A stream failure
    /// mid-playback surfaces as [`VoxError::PlaybackFailed`] for this
    /// request only.
    pub async fn play(&self, artifact: &AudioArtifact) -> Result<PlayOutcome, VoxError> {
        let Some(player) = &self.player else {
            tracing::info!("no playback device available, skipping playback");
            return Ok(PlayOutcome::Skipped);
        };

        let playback = player.play(artifact).map_err(VoxError::PlaybackFailed)?;
        playback.wait().await.map_err(VoxError::PlaybackFailed)?;
        Ok(PlayOutcome::Completed)
    }

    /// Delete an artifact's backing file. Failure is reported, never fatal.
    pub fn cleanup(&self, artifact: &AudioArtifact) {
        if let Err(e) = std::fs::remove_file(&artifact.path) {
            let err = VoxError::CacheCleanupFailed(
                anyhow!(e).context(format!("removing {}", artifact.path.display())),
            );
            tracing::warn!(error = %err, "artifact not removed");
        }
    }

    /// The full pipeline for one submission: request, synthesize, play,
    /// cleanup. Blank text is a no-op, not an error.
    pub async fn speak(&self, text: &str) -> Result<Option<PlayOutcome>, VoxError> {
        let Some(request) = SynthesisRequest::new(text, self.backend) else {
            return Ok(None);
        };

        let artifact = self.synthesize(&request).await?;
        let outcome = self.play(&artifact).await;
        // The artifact is released whether playback succeeded or not.
        self.cleanup(&artifact);
        outcome.map(Some)
    }
}

fn default_cache_dir() -> Result<PathBuf> {
    let home = dirs::home_dir().context("failed to get home directory")?;
    Ok(home.join(".voxcable").join("cache"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tts::edge::EdgeNeuralConfig;
    use tempfile::TempDir;

    /// A session with no device and no local engine, as on a headless CI box
    fn degraded_session(cache_dir: PathBuf) -> Session {
        Session {
            backend: BackendKind::NetworkNeural,
            network: EdgeNeural::new(EdgeNeuralConfig::default()),
            local: None,
            player: None,
            device_name: None,
            cache_dir,
        }
    }

    #[tokio::test]
    async fn play_without_device_is_skipped() {
        let dir = TempDir::new().unwrap();
        let session = degraded_session(dir.path().to_path_buf());

        let artifact = AudioArtifact {
            path: dir.path().join("missing.wav"),
            sample_rate: 24000,
        };

        // Skipped before any decode attempt: the missing file is never read.
        let outcome = session.play(&artifact).await.unwrap();
        assert_eq!(outcome, PlayOutcome::Skipped);
    }

    #[tokio::test]
    async fn blank_text_is_a_no_op() {
        let dir = TempDir::new().unwrap();
        let session = degraded_session(dir.path().to_path_buf());

        assert!(session.speak("   ").await.unwrap().is_none());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn local_backend_unavailable_is_synthesis_failure() {
        let dir = TempDir::new().unwrap();
        let session = degraded_session(dir.path().to_path_buf());

        let request = SynthesisRequest::new("Hello", BackendKind::LocalOffline).unwrap();
        let err = session.synthesize(&request).await.unwrap_err();
        assert!(matches!(err, VoxError::SynthesisFailed(_)));
        // A failed synthesis leaves no artifact on disk.
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn setting_current_backend_is_a_no_op() {
        let dir = TempDir::new().unwrap();
        let mut session = degraded_session(dir.path().to_path_buf());

        assert_eq!(session.backend(), BackendKind::NetworkNeural);
        session.set_backend(BackendKind::NetworkNeural);
        assert_eq!(session.backend(), BackendKind::NetworkNeural);

        session.set_backend(BackendKind::LocalOffline);
        assert_eq!(session.backend(), BackendKind::LocalOffline);
    }

    #[tokio::test]
    async fn cleanup_of_missing_file_does_not_panic() {
        let dir = TempDir::new().unwrap();
        let session = degraded_session(dir.path().to_path_buf());

        session.cleanup(&AudioArtifact {
            path: dir.path().join("already-gone.wav"),
            sample_rate: 24000,
        });
    }
}
