//! Audio device resolution and playback

pub mod device;
pub mod playback;
