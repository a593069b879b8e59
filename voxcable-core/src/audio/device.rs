//! Output device resolution using cpal
//!
//! Finds the virtual-cable device by a configured name fragment so synthesized
//! speech can be routed to it instead of the speakers.

use anyhow::anyhow;
use cpal::traits::{DeviceTrait, HostTrait};
use cpal::Device;

use crate::error::VoxError;

/// A resolved audio output device.
///
/// `index` is the position in the host's enumeration order at resolution
/// time. The handle is resolved once per process and kept for its lifetime;
/// if the device is unplugged later, playback fails at that point instead of
/// triggering a re-resolution.
pub struct OutputDevice {
    pub index: usize,
    pub name: String,
    pub max_output_channels: u16,
    pub(crate) device: Device,
}

impl std::fmt::Debug for OutputDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutputDevice")
            .field("index", &self.index)
            .field("name", &self.name)
            .field("max_output_channels", &self.max_output_channels)
            .finish()
    }
}

/// Resolve a name fragment to an output device.
///
/// Enumerates all devices on the default host and selects the first whose
/// name contains `name_fragment` (case-sensitive) and which has at least one
/// output channel. When several devices qualify, enumeration order decides;
/// that order is platform-dependent.
///
/// Both failure modes are recoverable: the caller is expected to keep
/// running in synthesis-only mode.
pub fn resolve(name_fragment: &str) -> Result<OutputDevice, VoxError> {
    let host = cpal::default_host();
    let devices = host
        .devices()
        .map_err(|e| VoxError::DeviceEnumerationFailed(anyhow!(e)))?;

    let mut candidates = Vec::new();
    for (index, device) in devices.enumerate() {
        let Ok(name) = device.name() else {
            continue;
        };
        let channels = max_output_channels(&device);
        candidates.push((index, device, name, channels));
    }

    let Some(pos) = first_matching(
        candidates.iter().map(|(i, _, name, ch)| (*i, name.as_str(), *ch)),
        name_fragment,
    )
    .and_then(|selected| candidates.iter().position(|(i, _, _, _)| *i == selected)) else {
        return Err(VoxError::DeviceNotFound(name_fragment.to_string()));
    };

    let (index, device, name, max_output_channels) = candidates.swap_remove(pos);
    tracing::info!(
        device_name = %name,
        index,
        channels = max_output_channels,
        "resolved output device"
    );

    Ok(OutputDevice {
        index,
        name,
        max_output_channels,
        device,
    })
}

/// The selection rule, kept pure so it can be tested without audio hardware:
/// first device whose name contains the fragment and has output channels,
/// identified by its host enumeration index. Devices whose name query failed
/// never become candidates, so the indices may skip values.
fn first_matching<'a>(
    candidates: impl IntoIterator<Item = (usize, &'a str, u16)>,
    fragment: &str,
) -> Option<usize> {
    candidates
        .into_iter()
        .find(|(_, name, channels)| *channels > 0 && name.contains(fragment))
        .map(|(index, _, _)| index)
}

fn max_output_channels(device: &Device) -> u16 {
    device
        .supported_output_configs()
        .map(|configs| configs.map(|c| c.channels()).max().unwrap_or(0))
        .unwrap_or(0)
}
