//! Edge read-aloud neural text-to-speech implementation
//!
//! Speaks the websocket protocol of the Microsoft Edge read-aloud service:
//! a `speech.config` message selecting the output format, an SSML message
//! carrying the text, then binary audio frames until `turn.end`.

use anyhow::{Context, Result};
use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use std::path::Path;
use std::time::Duration;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

use super::provider::TextToSpeech;

const ENDPOINT: &str =
    "wss://speech.platform.bing.com/consumer/speech/synthesize/readaloud/edge/v1";
const TRUSTED_CLIENT_TOKEN: &str = "6A5AA1D4EAFF4E9FB37E23D68491D6F4";

/// The raw PCM format requested from the service
const OUTPUT_FORMAT: &str = "raw-24khz-16bit-mono-pcm";
const OUTPUT_SAMPLE_RATE: u32 = 24000;

#[derive(Debug, Clone)]
pub struct EdgeNeuralConfig {
    pub voice: String,
    /// Speech-rate adjustment in percent, e.g. 10 for "+10%"
    pub rate_percent: i32,
    /// Bound on the whole synthesis exchange so a dead network cannot
    /// suspend the pipeline indefinitely
    pub timeout: Duration,
}

impl Default for EdgeNeuralConfig {
    fn default() -> Self {
        Self {
            voice: "zh-TW-HsiaoChenNeural".to_string(),
            rate_percent: 10,
            timeout: Duration::from_secs(30),
        }
    }
}

/// Edge read-aloud neural synthesis backend
pub struct EdgeNeural {
    config: EdgeNeuralConfig,
}

impl EdgeNeural {
    pub fn new(config: EdgeNeuralConfig) -> Self {
        Self { config }
    }

    async fn run_exchange(&self, text: &str) -> Result<Vec<u8>> {
        let url = format!(
            "{ENDPOINT}?TrustedClientToken={TRUSTED_CLIENT_TOKEN}&ConnectionId={}",
            uuid::Uuid::new_v4().simple()
        );

        let (ws_stream, _) = connect_async(url.as_str())
            .await
            .context("failed to connect to synthesis service")?;
        let (mut write, mut read) = ws_stream.split();

        write
            .send(Message::Text(speech_config_message()))
            .await
            .context("failed to send speech config")?;

        let ssml = ssml_message(&self.config.voice, self.config.rate_percent, text);
        write
            .send(Message::Text(ssml))
            .await
            .context("failed to send SSML request")?;

        let mut audio = Vec::new();
        loop {
            let msg = read
                .next()
                .await
                .context("connection closed before synthesis completed")?
                .context("websocket error during synthesis")?;

            match msg {
                Message::Text(text) => {
                    if text.contains("Path:turn.end") {
                        break;
                    }
                }
                Message::Binary(frame) => {
                    if let Some(payload) = audio_payload(&frame) {
                        audio.extend_from_slice(payload);
                    }
                }
                Message::Close(_) => {
                    anyhow::bail!("service closed the connection before turn end");
                }
                _ => {}
            }
        }

        if audio.is_empty() {
            anyhow::bail!("service returned no audio");
        }
        Ok(audio)
    }
}

#[async_trait]
impl TextToSpeech for EdgeNeural {
    async fn synthesize(&self, text: &str, destination: &Path) -> Result<()> {
        let pcm = tokio::time::timeout(self.config.timeout, self.run_exchange(text))
            .await
            .context("synthesis timed out")??;

        tracing::debug!(
            bytes = pcm.len(),
            voice = %self.config.voice,
            "received audio from synthesis service"
        );

        // The file is only written once the full stream has been received.
        persist_artifact(&pcm, destination)
    }
}

/// Write the PCM as a WAV file, leaving nothing at the destination when the
/// write fails.
fn persist_artifact(pcm: &[u8], destination: &Path) -> Result<()> {
    if let Err(e) = write_pcm_as_wav(pcm, destination) {
        let _ = std::fs::remove_file(destination);
        return Err(e);
    }
    Ok(())
}

fn protocol_timestamp() -> String {
    chrono::Utc::now()
        .format("%a %b %d %Y %H:%M:%S GMT+0000 (Coordinated Universal Time)")
        .to_string()
}

fn speech_config_message() -> String {
    let config = serde_json::json!({
        "context": {
            "synthesis": {
                "audio": {
                    "metadataoptions": {
                        "sentenceBoundaryEnabled": "false",
                        "wordBoundaryEnabled": "false"
                    },
                    "outputFormat": OUTPUT_FORMAT
                }
            }
        }
    });
    format!(
        "X-Timestamp:{}\r\nContent-Type:application/json; charset=utf-8\r\nPath:speech.config\r\n\r\n{config}",
        protocol_timestamp()
    )
}

fn ssml_message(voice: &str, rate_percent: i32, text: &str) -> String {
    let body = format!(
        "<speak version='1.0' xmlns='http://www.w3.org/2001/10/synthesis' xml:lang='en-US'>\
         <voice name='{voice}'>\
         <prosody pitch='+0Hz' rate='{rate_percent:+}%' volume='+0%'>{}</prosody>\
         </voice></speak>",
        xml_escape(text)
    );
    format!(
        "X-RequestId:{}\r\nContent-Type:application/ssml+xml\r\nX-Timestamp:{}\r\nPath:ssml\r\n\r\n{body}",
        uuid::Uuid::new_v4().simple(),
        protocol_timestamp()
    )
}

fn xml_escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '\'' => escaped.push_str("&apos;"),
            '"' => escaped.push_str("&quot;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Extract the audio payload from a binary protocol frame.
///
/// Frames carry a big-endian u16 header length, the text headers, then the
/// payload. Frames whose headers do not mark an audio path are skipped.
fn audio_payload(frame: &[u8]) -> Option<&[u8]> {
    if frame.len() < 2 {
        return None;
    }
    let header_len = u16::from_be_bytes([frame[0], frame[1]]) as usize;
    let payload_start = 2 + header_len;
    if frame.len() < payload_start {
        return None;
    }
    let header = std::str::from_utf8(&frame[2..payload_start]).ok()?;
    if !header.contains("Path:audio") {
        return None;
    }
    Some(&frame[payload_start..])
}

fn write_pcm_as_wav(pcm: &[u8], destination: &Path) -> Result<()> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: OUTPUT_SAMPLE_RATE,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(destination, spec)
        .with_context(|| format!("failed to create {}", destination.display()))?;
    for chunk in pcm.chunks_exact(2) {
        writer
            .write_sample(i16::from_le_bytes([chunk[0], chunk[1]]))
            .context("failed to write WAV sample")?;
    }
    writer.finalize().context("failed to finalize WAV file")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ssml_carries_voice_rate_and_text() {
        let msg = ssml_message("zh-TW-HsiaoChenNeural", 10, "Hello");
        assert!(msg.contains("Path:ssml"));
        assert!(msg.contains("name='zh-TW-HsiaoChenNeural'"));
        assert!(msg.contains("rate='+10%'"));
        assert!(msg.contains(">Hello</prosody>"));
    }

    #[test]
    fn negative_rate_is_signed() {
        let msg = ssml_message("en-US-AriaNeural", -5, "x");
        assert!(msg.contains("rate='-5%'"));
    }

    #[test]
    fn text_is_xml_escaped() {
        assert_eq!(
            xml_escape("a < b & c > \"d\""),
            "a &lt; b &amp; c &gt; &quot;d&quot;"
        );
    }

    #[test]
    fn audio_frame_payload_is_extracted() {
        let header = b"X-RequestId:1\r\nPath:audio\r\n";
        let mut frame = (header.len() as u16).to_be_bytes().to_vec();
        frame.extend_from_slice(header);
        frame.extend_from_slice(&[1, 2, 3, 4]);
        assert_eq!(audio_payload(&frame), Some(&[1, 2, 3, 4][..]));
    }

    #[test]
    fn non_audio_frames_are_skipped() {
        let header = b"Path:turn.start\r\n";
        let mut frame = (header.len() as u16).to_be_bytes().to_vec();
        frame.extend_from_slice(header);
        frame.extend_from_slice(&[9, 9]);
        assert_eq!(audio_payload(&frame), None);
    }

    #[test]
    fn truncated_frames_are_skipped() {
        assert_eq!(audio_payload(&[0]), None);
        assert_eq!(audio_payload(&[0, 200, 1]), None);
    }

    #[test]
    fn failed_write_leaves_nothing_at_the_destination() {
        let dir = tempfile::TempDir::new().unwrap();
        let destination = dir.path().join("missing-subdir").join("clip.wav");

        let err = persist_artifact(&[0, 0, 0, 0], &destination).unwrap_err();
        assert!(err.to_string().contains("failed to create"));
        assert!(!destination.exists());
    }

    #[test]
    fn persisted_artifact_is_decodable() {
        let dir = tempfile::TempDir::new().unwrap();
        let destination = dir.path().join("clip.wav");

        persist_artifact(&[0, 0, 1, 0], &destination).unwrap();
        let reader = hound::WavReader::open(&destination).unwrap();
        assert_eq!(reader.spec().sample_rate, OUTPUT_SAMPLE_RATE);
        assert_eq!(reader.len(), 2);
    }

    #[test]
    fn speech_config_requests_raw_pcm() {
        let msg = speech_config_message();
        assert!(msg.contains("Path:speech.config"));
        assert!(msg.contains("raw-24khz-16bit-mono-pcm"));
    }
}
