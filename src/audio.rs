// src/audio.rs - Default output device volume control
use std::process::Command;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};

/// Settable output levels of an endpoint, in its native units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VolumeRange {
    pub min: f32,
    pub max: f32,
    pub step: f32,
}

impl VolumeRange {
    pub fn new(min: f32, max: f32, step: f32) -> Self {
        Self { min, max, step }
    }

    pub fn percent() -> Self {
        Self::new(0.0, 100.0, 1.0)
    }

    pub fn clamp(&self, level: f32) -> f32 {
        level.clamp(self.min, self.max)
    }

    fn quantize(&self, level: f32) -> f32 {
        let level = self.clamp(level);
        if self.step > 0.0 {
            self.clamp(self.min + ((level - self.min) / self.step).round() * self.step)
        } else {
            level
        }
    }
}

/// The default output device of the host audio system.
pub trait AudioEndpoint {
    fn name(&self) -> &'static str;
    fn volume_range(&self) -> Result<VolumeRange>;
    fn master_volume_level(&mut self) -> Result<f32>;
    fn set_master_volume_level(&mut self, level: f32) -> Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AudioBackend {
    #[default]
    Auto,
    Pactl,
    Osascript,
    Wasapi,
    DryRun,
}

pub fn open_endpoint(backend: AudioBackend) -> Result<Box<dyn AudioEndpoint>> {
    let endpoint: Box<dyn AudioEndpoint> = match backend {
        AudioBackend::Pactl => Box::new(PactlEndpoint::new()?),
        AudioBackend::Osascript => Box::new(OsascriptEndpoint::new()?),
        AudioBackend::Wasapi => open_wasapi()?,
        AudioBackend::DryRun => Box::new(DryRunEndpoint::default()),
        AudioBackend::Auto => {
            let detected = if cfg!(target_os = "linux") {
                PactlEndpoint::new().map(|e| Box::new(e) as Box<dyn AudioEndpoint>)
            } else if cfg!(target_os = "macos") {
                OsascriptEndpoint::new().map(|e| Box::new(e) as Box<dyn AudioEndpoint>)
            } else if cfg!(windows) {
                open_wasapi()
            } else {
                Err(Error::Audio("no volume backend for this platform".into()))
            };

            match detected {
                Ok(endpoint) => endpoint,
                Err(e) => {
                    warn!("{}; volume changes will only be logged", e);
                    Box::new(DryRunEndpoint::default())
                }
            }
        }
    };

    info!("Using {} audio endpoint", endpoint.name());
    Ok(endpoint)
}

#[cfg(windows)]
fn open_wasapi() -> Result<Box<dyn AudioEndpoint>> {
    Ok(Box::new(WasapiEndpoint::new()?))
}

#[cfg(not(windows))]
fn open_wasapi() -> Result<Box<dyn AudioEndpoint>> {
    Err(Error::Audio("wasapi is only available on Windows".into()))
}

fn run(program: &str, args: &[&str]) -> Result<String> {
    let output = Command::new(program)
        .args(args)
        .output()
        .map_err(|e| Error::Audio(format!("failed to run {}: {}", program, e)))?;

    if !output.status.success() {
        return Err(Error::Audio(format!(
            "{} exited with {}: {}",
            program,
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// PulseAudio / PipeWire through `pactl`. Levels are percentages.
pub struct PactlEndpoint;

impl PactlEndpoint {
    const SINK: &'static str = "@DEFAULT_SINK@";

    pub fn new() -> Result<Self> {
        run("pactl", &["--version"])?;
        Ok(Self)
    }
}

/// First channel percentage of `pactl get-sink-volume` output.
fn parse_pactl_volume(output: &str) -> Result<f32> {
    output
        .split_whitespace()
        .find_map(|token| token.strip_suffix('%'))
        .and_then(|pct| pct.parse::<f32>().ok())
        .ok_or_else(|| Error::Audio(format!("unrecognized pactl output: {}", output.trim())))
}

impl AudioEndpoint for PactlEndpoint {
    fn name(&self) -> &'static str {
        "pactl"
    }

    fn volume_range(&self) -> Result<VolumeRange> {
        Ok(VolumeRange::percent())
    }

    fn master_volume_level(&mut self) -> Result<f32> {
        parse_pactl_volume(&run("pactl", &["get-sink-volume", Self::SINK])?)
    }

    fn set_master_volume_level(&mut self, level: f32) -> Result<()> {
        let pct = format!("{}%", level.round() as i32);
        run("pactl", &["set-sink-volume", Self::SINK, &pct]).map(|_| ())
    }
}

/// macOS through `osascript`. Levels are 0-100.
pub struct OsascriptEndpoint;

impl OsascriptEndpoint {
    pub fn new() -> Result<Self> {
        let mut endpoint = Self;
        endpoint.master_volume_level()?;
        Ok(endpoint)
    }
}

impl AudioEndpoint for OsascriptEndpoint {
    fn name(&self) -> &'static str {
        "osascript"
    }

    fn volume_range(&self) -> Result<VolumeRange> {
        Ok(VolumeRange::percent())
    }

    fn master_volume_level(&mut self) -> Result<f32> {
        let out = run("osascript", &["-e", "output volume of (get volume settings)"])?;
        out.trim()
            .parse::<f32>()
            .map_err(|_| Error::Audio(format!("unrecognized osascript output: {}", out.trim())))
    }

    fn set_master_volume_level(&mut self, level: f32) -> Result<()> {
        let script = format!("set volume output volume {}", level.round() as i32);
        run("osascript", &["-e", &script]).map(|_| ())
    }
}

#[cfg(windows)]
pub use wasapi::WasapiEndpoint;

#[cfg(windows)]
mod wasapi {
    use tracing::debug;
    use windows::Win32::Media::Audio::Endpoints::IAudioEndpointVolume;
    use windows::Win32::Media::Audio::{eConsole, eRender, IMMDeviceEnumerator, MMDeviceEnumerator};
    use windows::Win32::System::Com::{CoCreateInstance, CoInitializeEx, CLSCTX_ALL, COINIT_APARTMENTTHREADED};

    use super::{AudioEndpoint, VolumeRange};
    use crate::error::{Error, Result};

    fn audio_error(what: &str, e: windows::core::Error) -> Error {
        Error::Audio(format!("{}: {}", what, e))
    }

    /// Default render device through the Core Audio endpoint volume interface. Levels are dB.
    pub struct WasapiEndpoint {
        volume: IAudioEndpointVolume,
    }

    impl WasapiEndpoint {
        pub fn new() -> Result<Self> {
            unsafe {
                // the window may already have set up COM on this thread, in either apartment mode
                if let Err(e) = CoInitializeEx(None, COINIT_APARTMENTTHREADED).ok() {
                    debug!("CoInitializeEx: {}", e);
                }

                let enumerator: IMMDeviceEnumerator = CoCreateInstance(&MMDeviceEnumerator, None, CLSCTX_ALL)
                    .map_err(|e| audio_error("failed to create device enumerator", e))?;
                let device = enumerator
                    .GetDefaultAudioEndpoint(eRender, eConsole)
                    .map_err(|e| audio_error("no default output device", e))?;
                let volume: IAudioEndpointVolume = device
                    .Activate(CLSCTX_ALL, None)
                    .map_err(|e| audio_error("failed to activate endpoint volume", e))?;

                Ok(Self { volume })
            }
        }
    }

    impl AudioEndpoint for WasapiEndpoint {
        fn name(&self) -> &'static str {
            "wasapi"
        }

        fn volume_range(&self) -> Result<VolumeRange> {
            let (mut min, mut max, mut step) = (0.0f32, 0.0f32, 0.0f32);
            unsafe { self.volume.GetVolumeRange(&mut min, &mut max, &mut step) }
                .map_err(|e| audio_error("GetVolumeRange", e))?;
            Ok(VolumeRange::new(min, max, step))
        }

        fn master_volume_level(&mut self) -> Result<f32> {
            unsafe { self.volume.GetMasterVolumeLevel() }.map_err(|e| audio_error("GetMasterVolumeLevel", e))
        }

        fn set_master_volume_level(&mut self, level: f32) -> Result<()> {
            unsafe { self.volume.SetMasterVolumeLevel(level, std::ptr::null()) }
                .map_err(|e| audio_error("SetMasterVolumeLevel", e))
        }
    }
}

/// Logs level changes without touching the system mixer.
///
/// Reports the -65.25..0 dB range of a typical Windows speaker endpoint.
pub struct DryRunEndpoint {
    level: f32,
}

impl Default for DryRunEndpoint {
    fn default() -> Self {
        Self { level: 0.0 }
    }
}

impl AudioEndpoint for DryRunEndpoint {
    fn name(&self) -> &'static str {
        "dry-run"
    }

    fn volume_range(&self) -> Result<VolumeRange> {
        Ok(VolumeRange::new(-65.25, 0.0, 0.03125))
    }

    fn master_volume_level(&mut self) -> Result<f32> {
        Ok(self.level)
    }

    fn set_master_volume_level(&mut self, level: f32) -> Result<()> {
        info!("[dry-run] master volume level -> {:.2} dB", level);
        self.level = level;
        Ok(())
    }
}

/// Sends levels to an endpoint, skipping ones it already holds.
pub struct VolumeController {
    endpoint: Box<dyn AudioEndpoint>,
    range: VolumeRange,
    last_applied: Option<f32>,
}

impl VolumeController {
    pub fn new(endpoint: Box<dyn AudioEndpoint>) -> Result<Self> {
        let range = endpoint.volume_range()?;
        if !(range.min < range.max) {
            return Err(Error::Audio(format!(
                "{} reported an empty volume range {:?}",
                endpoint.name(),
                range
            )));
        }
        info!("Volume range of {}: {} .. {}", endpoint.name(), range.min, range.max);

        Ok(Self {
            endpoint,
            range,
            last_applied: None,
        })
    }

    pub fn range(&self) -> VolumeRange {
        self.range
    }

    pub fn endpoint_name(&self) -> &'static str {
        self.endpoint.name()
    }

    pub fn last_applied(&self) -> Option<f32> {
        self.last_applied
    }

    /// Returns whether a command was actually sent.
    pub fn apply(&mut self, level: f32) -> Result<bool> {
        let level = self.range.quantize(level);

        if self.last_applied == Some(level) {
            return Ok(false);
        }

        self.endpoint.set_master_volume_level(level)?;
        debug!("Set {} volume to {}", self.endpoint.name(), level);
        self.last_applied = Some(level);
        Ok(true)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    /// Records every level it is asked to set.
    #[derive(Clone)]
    pub(crate) struct RecordingEndpoint {
        pub range: VolumeRange,
        pub levels: Rc<RefCell<Vec<f32>>>,
        pub fail: bool,
    }

    impl RecordingEndpoint {
        pub(crate) fn new(range: VolumeRange) -> Self {
            Self {
                range,
                levels: Rc::new(RefCell::new(Vec::new())),
                fail: false,
            }
        }
    }

    impl AudioEndpoint for RecordingEndpoint {
        fn name(&self) -> &'static str {
            "recording"
        }

        fn volume_range(&self) -> Result<VolumeRange> {
            Ok(self.range)
        }

        fn master_volume_level(&mut self) -> Result<f32> {
            Ok(self.levels.borrow().last().copied().unwrap_or(self.range.max))
        }

        fn set_master_volume_level(&mut self, level: f32) -> Result<()> {
            if self.fail {
                return Err(Error::Audio("device unplugged".into()));
            }
            self.levels.borrow_mut().push(level);
            Ok(())
        }
    }

    #[test]
    fn parses_pactl_sink_volume() {
        let out = "Volume: front-left: 42597 /  65% / -11.23 dB,   front-right: 42597 /  65% / -11.23 dB\n        balance 0.00\n";
        assert_eq!(parse_pactl_volume(out).unwrap(), 65.0);
    }

    #[test]
    fn rejects_unknown_pactl_output() {
        assert!(parse_pactl_volume("Failed to get sink volume").is_err());
    }

    #[test]
    fn repeated_levels_are_sent_once() {
        let endpoint = RecordingEndpoint::new(VolumeRange::percent());
        let levels = endpoint.levels.clone();
        let mut controller = VolumeController::new(Box::new(endpoint)).unwrap();

        assert!(controller.apply(40.2).unwrap());
        assert!(!controller.apply(39.8).unwrap());
        assert!(controller.apply(41.0).unwrap());

        assert_eq!(*levels.borrow(), vec![40.0, 41.0]);
        assert_eq!(controller.last_applied(), Some(41.0));
    }

    #[test]
    fn levels_are_clamped_to_range() {
        let endpoint = RecordingEndpoint::new(VolumeRange::new(-65.25, 0.0, 0.03125));
        let levels = endpoint.levels.clone();
        let mut controller = VolumeController::new(Box::new(endpoint)).unwrap();

        controller.apply(12.0).unwrap();
        controller.apply(-100.0).unwrap();

        assert_eq!(*levels.borrow(), vec![0.0, -65.25]);
    }

    #[test]
    fn failed_set_is_retried_next_time() {
        let mut endpoint = RecordingEndpoint::new(VolumeRange::percent());
        endpoint.fail = true;
        let mut controller = VolumeController::new(Box::new(endpoint)).unwrap();

        assert!(controller.apply(50.0).is_err());
        assert_eq!(controller.last_applied(), None);
    }

    #[test]
    fn empty_range_is_rejected() {
        let endpoint = RecordingEndpoint::new(VolumeRange::new(0.0, 0.0, 1.0));
        assert!(VolumeController::new(Box::new(endpoint)).is_err());
    }

    #[test]
    fn backend_names_parse() {
        let backend: AudioBackend = serde_json::from_str(r#""wasapi""#).unwrap();
        assert_eq!(backend, AudioBackend::Wasapi);
        let backend: AudioBackend = serde_json::from_str(r#""dry-run""#).unwrap();
        assert_eq!(backend, AudioBackend::DryRun);
    }

    #[cfg(not(windows))]
    #[test]
    fn wasapi_needs_windows() {
        assert!(matches!(open_endpoint(AudioBackend::Wasapi), Err(Error::Audio(_))));
    }

    #[test]
    fn dry_run_backend_opens_everywhere() {
        let controller = VolumeController::new(open_endpoint(AudioBackend::DryRun).unwrap()).unwrap();
        assert_eq!(controller.endpoint_name(), "dry-run");
        assert_eq!(controller.range(), VolumeRange::new(-65.25, 0.0, 0.03125));
    }

    #[test]
    fn dry_run_remembers_level() {
        let mut endpoint = DryRunEndpoint::default();
        endpoint.set_master_volume_level(-20.0).unwrap();
        assert_eq!(endpoint.master_volume_level().unwrap(), -20.0);
    }
}
