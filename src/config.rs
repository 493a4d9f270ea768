//! Controller Configuration
//!
//! JSON-backed settings for the render profile, voice mode, device buffer and
//! loop behavior. Missing keys fall back to their defaults.
//!
//! ```
//! use opl_fms::{ControllerConfig, RenderProfile};
//!
//! let config = ControllerConfig::from_json_str(r#"{ "render_profile": "SBPRO" }"#).unwrap();
//! assert_eq!(config.render_profile, RenderProfile::SbPro);
//! assert_eq!(config.buffer_frames, 1024);
//! ```

use crate::render::RenderProfile;
use crate::{OplError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Smallest device buffer in frames
pub const MIN_BUFFER_FRAMES: usize = 64;
/// Largest device buffer in frames
pub const MAX_BUFFER_FRAMES: usize = 16_384;
/// Highest accepted output volume
pub const MAX_VOLUME: f32 = 2.0;

/// Settings applied to an [`OplController`](crate::OplController) and its audio device
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    /// Output coloration profile
    pub render_profile: RenderProfile,
    /// Nine melodic channels (`true`) or six plus drums (`false`)
    pub melodic_mode: bool,
    /// Frames per device buffer
    pub buffer_frames: usize,
    /// Device volume (1.0 = unity)
    pub volume: f32,
    /// Whether song playback wraps around
    pub loop_playback: bool,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        ControllerConfig {
            render_profile: RenderProfile::Raw,
            melodic_mode: true,
            buffer_frames: 1024,
            volume: 1.0,
            loop_playback: false,
        }
    }
}

impl ControllerConfig {
    /// Parse and validate a JSON document
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: ControllerConfig = serde_json::from_str(json)
            .map_err(|e| OplError::ConfigError(format!("malformed config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Read a JSON config file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let config = Self::from_json_str(&text)?;
        log::debug!("loaded config from {}: {:?}", path.as_ref().display(), config);
        Ok(config)
    }

    /// Serialize as pretty-printed JSON
    pub fn to_json_string(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| OplError::ConfigError(format!("cannot serialize config: {}", e)))
    }

    /// Check value ranges
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=MAX_VOLUME).contains(&self.volume) {
            return Err(OplError::ConfigError(format!(
                "volume {} outside 0.0..={}",
                self.volume, MAX_VOLUME
            )));
        }
        if !(MIN_BUFFER_FRAMES..=MAX_BUFFER_FRAMES).contains(&self.buffer_frames) {
            return Err(OplError::ConfigError(format!(
                "buffer_frames {} outside {}..={}",
                self.buffer_frames, MIN_BUFFER_FRAMES, MAX_BUFFER_FRAMES
            )));
        }
        Ok(())
    }
}
