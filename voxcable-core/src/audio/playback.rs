//! Audio playback using cpal
//! Decodes a WAV artifact and resamples to the native device rate if needed

use anyhow::{Context, Result};
use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::{
    Device, FromSample, SampleFormat, SizedSample, Stream, StreamConfig, SupportedStreamConfig,
};
use hound::WavReader;
use rubato::{FftFixedIn, Resampler};
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use super::device::OutputDevice;
use crate::tts::types::AudioArtifact;

/// Plays synthesis artifacts on one resolved output device
pub struct AudioPlayer {
    device: Device,
    supported_config: SupportedStreamConfig,
}

/// Audio playback handle - dropping stops playback (RAII)
pub struct AudioPlayback {
    _stream: Stream,
    status: Arc<PlaybackStatus>,
}

/// Completion state shared with the stream callbacks.
///
/// A stream error also marks playback finished, so a waiter sees the failure
/// instead of polling a flag that can no longer be set.
struct PlaybackStatus {
    finished: AtomicBool,
    error: Mutex<Option<cpal::StreamError>>,
}

impl PlaybackStatus {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            finished: AtomicBool::new(false),
            error: Mutex::new(None),
        })
    }

    fn complete(&self) {
        self.finished.store(true, Ordering::SeqCst);
    }

    fn fail(&self, err: cpal::StreamError) {
        *self.error.lock().unwrap() = Some(err);
        self.finished.store(true, Ordering::SeqCst);
    }

    fn is_finished(&self) -> bool {
        self.finished.load(Ordering::SeqCst)
    }

    async fn wait(&self) -> Result<()> {
        while !self.is_finished() {
            tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;
        }
        match self.error.lock().unwrap().take() {
            Some(err) => Err(anyhow::Error::new(err).context("playback stream failed")),
            None => Ok(()),
        }
    }
}

impl AudioPlayback {
    /// Check if playback has finished
    pub fn is_finished(&self) -> bool {
        self.status.is_finished()
    }

    /// Wait for playback to complete
    ///
    /// This is the pipeline's serialization point: the session awaits it
    /// before cleaning up, so at most one clip plays on the shared device.
    /// A stream error mid-playback (device unplugged) ends the wait with
    /// that error.
    pub async fn wait(&self) -> Result<()> {
        self.status.wait().await
    }
}

impl AudioPlayer {
    /// Create a player bound to a resolved output device, consuming it
    pub fn new(output: OutputDevice) -> Result<Self> {
        let device = output.device;
        let supported_config = device
            .default_output_config()
            .context("failed to get default output config")?;

        tracing::debug!(
            native_sample_rate = supported_config.sample_rate().0,
            native_channels = supported_config.channels(),
            native_format = ?supported_config.sample_format(),
            "audio player initialized"
        );

        Ok(Self {
            device,
            supported_config,
        })
    }

    /// Play a WAV artifact, returns handle that stops on drop
    pub fn play(&self, artifact: &AudioArtifact) -> Result<AudioPlayback> {
        let native_rate = self.supported_config.sample_rate().0;
        let native_channels = self.supported_config.channels() as usize;
        let sample_format = self.supported_config.sample_format();
        let config: StreamConfig = self.supported_config.clone().into();

        let (mono, source_rate) = load_wav_mono_f32(&artifact.path)?;
        let resampled = resample(&mono, source_rate, native_rate)?;

        let samples = if native_channels > 1 {
            expand_to_channels(&resampled, native_channels)
        } else {
            resampled
        };

        let samples = Arc::new(samples);
        let position = Arc::new(AtomicUsize::new(0));
        let status = PlaybackStatus::new();

        let stream = match sample_format {
            SampleFormat::F32 => {
                self.build_stream::<f32>(&config, samples, position, status.clone())?
            }
            SampleFormat::I16 => {
                self.build_stream::<i16>(&config, samples, position, status.clone())?
            }
            format => anyhow::bail!("unsupported sample format: {:?}", format),
        };

        stream.play().context("failed to start playback stream")?;

        Ok(AudioPlayback {
            _stream: stream,
            status,
        })
    }

    fn build_stream<T>(
        &self,
        config: &StreamConfig,
        samples: Arc<Vec<f32>>,
        position: Arc<AtomicUsize>,
        status: Arc<PlaybackStatus>,
    ) -> Result<Stream>
    where
        T: SizedSample + FromSample<f32> + Default + Send + 'static,
    {
        let data_status = status.clone();
        self.device
            .build_output_stream(
                config,
                move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                    let pos = position.load(Ordering::SeqCst);
                    let remaining = samples.len().saturating_sub(pos);

                    if remaining == 0 {
                        data.fill(T::default());
                        data_status.complete();
                        return;
                    }

                    let to_copy = remaining.min(data.len());
                    for (i, &sample) in samples[pos..pos + to_copy].iter().enumerate() {
                        data[i] = T::from_sample(sample);
                    }

                    if to_copy < data.len() {
                        data[to_copy..].fill(T::default());
                    }

                    position.store(pos + to_copy, Ordering::SeqCst);
                },
                move |err| {
                    tracing::error!(error = ?err, "playback stream error");
                    status.fail(err);
                },
                None,
            )
            .context("failed to build output stream")
    }
}

/// Load a WAV file as mono f32 samples plus its sample rate
fn load_wav_mono_f32(path: &Path) -> Result<(Vec<f32>, u32)> {
    let reader = WavReader::open(path)
        .with_context(|| format!("failed to open WAV file {}", path.display()))?;

    let spec = reader.spec();
    let sample_rate = spec.sample_rate;
    let channels = spec.channels as usize;

    let samples: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Int => {
            let max = (1i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| v as f32 / max))
                .collect::<std::result::Result<_, _>>()
                .context("failed to decode WAV samples")?
        }
        hound::SampleFormat::Float => reader
            .into_samples::<f32>()
            .collect::<std::result::Result<_, _>>()
            .context("failed to decode WAV samples")?,
    };

    Ok((downmix_to_mono(&samples, channels), sample_rate))
}

fn downmix_to_mono(samples: &[f32], channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return samples.to_vec();
    }
    samples
        .chunks(channels)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect()
}

fn resample(samples: &[f32], source_rate: u32, target_rate: u32) -> Result<Vec<f32>> {
    let chunk_size = 1024;
    let mut resampler =
        FftFixedIn::<f32>::new(source_rate as usize, target_rate as usize, chunk_size, 2, 1)
            .context("failed to create resampler")?;

    let mut output = Vec::new();
    let mut pos = 0;

    while pos < samples.len() {
        let frames_needed = resampler.input_frames_next();
        let end = (pos + frames_needed).min(samples.len());

        let mut input_chunk = samples[pos..end].to_vec();
        if input_chunk.len() < frames_needed {
            input_chunk.resize(frames_needed, 0.0);
        }

        let input = vec![input_chunk];
        match resampler.process(&input, None) {
            Ok(resampled) => {
                if let Some(chunk) = resampled.into_iter().next() {
                    output.extend(chunk);
                }
            }
            Err(e) => {
                anyhow::bail!("resampling failed: {:?}", e);
            }
        }

        pos = end;
        if end == samples.len() {
            break;
        }
    }

    Ok(output)
}

fn expand_to_channels(samples: &[f32], channels: usize) -> Vec<f32> {
    let mut output = Vec::with_capacity(samples.len() * channels);
    for &sample in samples {
        for _ in 0..channels {
            output.push(sample);
        }
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn downmix_averages_frames() {
        let stereo = [1.0, 0.0, 0.5, 0.5, -1.0, 1.0];
        assert_eq!(downmix_to_mono(&stereo, 2), vec![0.5, 0.5, 0.0]);
    }

    #[test]
    fn downmix_mono_is_identity() {
        let mono = [0.25, -0.25];
        assert_eq!(downmix_to_mono(&mono, 1), mono.to_vec());
    }

    #[test]
    fn expand_duplicates_each_sample() {
        assert_eq!(expand_to_channels(&[0.1, 0.2], 2), vec![0.1, 0.1, 0.2, 0.2]);
    }

    #[test]
    fn loads_i16_wav_as_mono_f32() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tone.wav");

        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 24000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(&path, spec).unwrap();
        writer.write_sample(i16::MAX).unwrap();
        writer.write_sample(0i16).unwrap();
        writer.write_sample(i16::MIN).unwrap();
        writer.finalize().unwrap();

        let (samples, rate) = load_wav_mono_f32(&path).unwrap();
        assert_eq!(rate, 24000);
        assert_eq!(samples.len(), 3);
        assert!((samples[0] - (i16::MAX as f32 / 32768.0)).abs() < 1e-6);
        assert_eq!(samples[1], 0.0);
        assert!((samples[2] + 1.0).abs() < 1e-6);
    }

    #[tokio::test]
    async fn wait_ends_when_playback_completes() {
        let status = PlaybackStatus::new();
        status.complete();
        status.wait().await.unwrap();
    }

    #[tokio::test]
    async fn stream_error_ends_the_wait_with_a_failure() {
        let status = PlaybackStatus::new();

        // The data callback stops firing once the stream errors, so the
        // error callback is the only remaining path out of the wait.
        status.fail(cpal::StreamError::DeviceNotAvailable);

        assert!(status.is_finished());
        let err = status.wait().await.unwrap_err();
        assert!(err.to_string().contains("playback stream failed"));
    }

    #[test]
    fn resample_preserves_duration() {
        let one_second = vec![0.0f32; 24000];
        let out = resample(&one_second, 24000, 48000).unwrap();
        // FFT resampler flushes in chunks; expect roughly two seconds' worth.
        assert!(out.len() > 40000 && out.len() <= 50000);
    }
}
