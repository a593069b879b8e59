pub mod audio;
pub mod error;
pub mod session;
pub mod settings;
pub mod tts;

// Public library API - the CLI drives everything through these types.
pub use audio::device::OutputDevice;
pub use audio::playback::AudioPlayer;
pub use error::VoxError;
pub use session::{PlayOutcome, Session};
pub use settings::{Settings, SettingsManager};
pub use tts::types::{AudioArtifact, BackendKind, SynthesisRequest};
