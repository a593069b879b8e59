//! Local offline synthesis via an espeak-ng engine handle
//!
//! The engine's native execution model is synchronous: each call runs the
//! binary to completion. The async wrapper isolates that blocking call on a
//! worker thread behind an exclusive lock, so the runtime stays responsive
//! and no two calls use the engine concurrently.

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::io::Write;
use std::path::Path;
use std::process::{Command, Stdio};
use std::sync::Arc;
use tokio::sync::Mutex;

use super::provider::TextToSpeech;

const BINARY_CANDIDATES: &[&str] = &["espeak-ng", "espeak"];

#[derive(Debug, Clone)]
pub struct EspeakConfig {
    /// Speech rate in words per minute
    pub rate_wpm: u32,
    pub voice: Option<String>,
}

impl Default for EspeakConfig {
    fn default() -> Self {
        Self {
            rate_wpm: 175,
            voice: None,
        }
    }
}

/// Handle to a local espeak installation, probed once at startup and reused.
///
/// The handle gives no reentrancy guarantee; [`LocalSynth`] serializes
/// access to it.
pub struct EspeakEngine {
    binary: String,
    config: EspeakConfig,
}

impl EspeakEngine {
    pub fn new(config: EspeakConfig) -> Result<Self> {
        let binary = probe_binary(BINARY_CANDIDATES)?;
        tracing::info!(binary = %binary, rate_wpm = config.rate_wpm, "offline engine initialized");
        Ok(Self { binary, config })
    }

    /// Synthesize text to a WAV file, blocking until the engine finishes.
    ///
    /// Writes to a `.part` file renamed into place on success, so a failed
    /// call leaves nothing at the destination.
    pub fn synthesize_to_wav(&self, text: &str, destination: &Path) -> Result<()> {
        let part = destination.with_extension("wav.part");
        let result = self.run_engine(text, &part);
        if let Err(e) = result {
            let _ = std::fs::remove_file(&part);
            return Err(e);
        }
        std::fs::rename(&part, destination)
            .with_context(|| format!("failed to move artifact to {}", destination.display()))?;
        Ok(())
    }

    fn run_engine(&self, text: &str, output: &Path) -> Result<()> {
        let mut cmd = Command::new(&self.binary);
        cmd.arg("-w")
            .arg(output)
            .arg("-s")
            .arg(self.config.rate_wpm.to_string())
            .arg("--stdin")
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        if let Some(voice) = &self.config.voice {
            cmd.arg("-v").arg(voice);
        }

        let mut child = cmd
            .spawn()
            .with_context(|| format!("failed to spawn {}", self.binary))?;

        // Text goes through stdin so no shell quoting applies.
        child
            .stdin
            .take()
            .context("engine stdin unavailable")?
            .write_all(text.as_bytes())
            .context("failed to write text to engine")?;

        let status = child.wait().context("failed to wait for engine")?;
        if !status.success() {
            anyhow::bail!("{} exited with {status}", self.binary);
        }

        let written = std::fs::metadata(output).map(|m| m.len()).unwrap_or(0);
        if written == 0 {
            anyhow::bail!("engine produced no audio");
        }
        Ok(())
    }
}

fn probe_binary(candidates: &[&str]) -> Result<String> {
    for candidate in candidates {
        let probe = Command::new(candidate)
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();
        if matches!(probe, Ok(status) if status.success()) {
            return Ok(candidate.to_string());
        }
    }
    anyhow::bail!("no espeak binary found, tried: {}", candidates.join(", "))
}

/// Async wrapper giving the blocking engine the uniform synthesis contract
pub struct LocalSynth {
    engine: Arc<Mutex<EspeakEngine>>,
}

impl LocalSynth {
    pub fn new(engine: EspeakEngine) -> Self {
        Self {
            engine: Arc::new(Mutex::new(engine)),
        }
    }
}

#[async_trait]
impl TextToSpeech for LocalSynth {
    async fn synthesize(&self, text: &str, destination: &Path) -> Result<()> {
        let engine = Arc::clone(&self.engine);
        let text = text.to_string();
        let destination = destination.to_path_buf();

        // The lock is held for the whole engine run: concurrent submissions
        // queue here instead of entering the engine in parallel.
        tokio::task::spawn_blocking(move || {
            let engine = engine.blocking_lock();
            engine.synthesize_to_wav(&text, &destination)
        })
        .await
        .context("synthesis worker panicked")?
    }
}

#[cfg(test)]
mod tests {
    use super::probe_binary;

    #[test]
    fn probe_fails_when_no_candidate_exists() {
        let err = probe_binary(&["voxcable-no-such-engine"]).unwrap_err();
        assert!(err.to_string().contains("voxcable-no-such-engine"));
    }
}
