use thiserror::Error;

/// Errors surfaced by the synthesis and playback pipeline.
///
/// Device errors degrade the session to synthesis-only mode; synthesis and
/// playback errors apply to a single request and the caller re-prompts.
/// None of these are fatal to the process.
#[derive(Error, Debug)]
pub enum VoxError {
    #[error("no output device matching {0:?} was found")]
    DeviceNotFound(String),

    #[error("audio device enumeration failed: {0}")]
    DeviceEnumerationFailed(anyhow::Error),

    #[error("synthesis failed: {0}")]
    SynthesisFailed(anyhow::Error),

    #[error("playback failed: {0}")]
    PlaybackFailed(anyhow::Error),

    #[error("cache cleanup failed: {0}")]
    CacheCleanupFailed(anyhow::Error),
}
