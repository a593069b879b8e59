use anyhow::Result;
use async_trait::async_trait;
use std::path::Path;

/// Trait for text-to-speech backends
///
/// Both engines produce a complete WAV file at `destination` or leave nothing
/// there. Callers must not assume the call is non-suspending: the network
/// backend awaits I/O and the local backend runs on a worker thread.
#[async_trait]
pub trait TextToSpeech: Send + Sync {
    /// Synthesize text into a WAV file at `destination`
    async fn synthesize(&self, text: &str, destination: &Path) -> Result<()>;
}
