//! Engine settings
//!
//! Settings are plain serde structs stored as TOML or RON and picked by file
//! extension. [`RendererConfig`] is the only one the engine reads today.

use std::path::Path;

use serde::de::DeserializeOwned;
pub use serde::{Deserialize, Serialize};

use crate::render::api::BufferUsage;

/// On-disk encodings understood by [`Config`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// `.toml`
    Toml,
    /// `.ron`
    Ron,
}

impl ConfigFormat {
    /// Pick the encoding from a file extension
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Ok(Self::Toml),
            Some("ron") => Ok(Self::Ron),
            _ => Err(ConfigError::UnsupportedFormat(path.display().to_string())),
        }
    }

    fn decode<T: DeserializeOwned>(self, text: &str) -> Result<T, ConfigError> {
        match self {
            Self::Toml => toml::from_str(text).map_err(|e| ConfigError::Parse(e.to_string())),
            Self::Ron => ron::from_str(text).map_err(|e| ConfigError::Parse(e.to_string())),
        }
    }

    fn encode<T: Serialize>(self, value: &T) -> Result<String, ConfigError> {
        match self {
            Self::Toml => toml::to_string_pretty(value).map_err(|e| ConfigError::Serialize(e.to_string())),
            Self::Ron => ron::ser::to_string_pretty(value, ron::ser::PrettyConfig::default())
                .map_err(|e| ConfigError::Serialize(e.to_string())),
        }
    }
}

/// Serializable settings stored as TOML or RON
pub trait Config: Serialize + DeserializeOwned + Default {
    /// Read and decode `path`; the extension selects the format
    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let format = ConfigFormat::from_path(path)?;
        let config = format.decode(&std::fs::read_to_string(path)?)?;
        log::debug!("Loaded {:?} config from {:?}", format, path);
        Ok(config)
    }

    /// Encode and write to `path`
    fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let text = ConfigFormat::from_path(path)?.encode(self)?;
        std::fs::write(path, text)?;
        Ok(())
    }
}

/// Failures while reading, writing or validating configuration
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// Reading or writing the file failed
    #[error("Config file access failed: {0}")]
    Io(#[from] std::io::Error),

    /// The text is not valid for the selected format
    #[error("Config parse failed: {0}")]
    Parse(String),

    /// The value could not be encoded
    #[error("Config encoding failed: {0}")]
    Serialize(String),

    /// Neither `.toml` nor `.ron`
    #[error("Unsupported config file: {0}")]
    UnsupportedFormat(String),

    /// A value is out of its valid range
    #[error("Invalid value: {0}")]
    Invalid(String),
}

/// # Renderer Configuration
///
/// Initial native state and resource policy for the OpenGL renderer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    /// Initial clear colour, 0-255 per channel
    pub clear_color: [u8; 3],
    /// Whether depth testing starts enabled
    pub depth_test: bool,
    /// Whether back faces are culled
    pub cull_back_faces: bool,
    /// Storage hint applied to every buffer upload
    pub buffer_usage: BufferUsage,
    /// Enable native debug output when a debug monitor is attached
    pub debug_output: bool,
    /// Maximum native debug messages drained per frame
    pub debug_message_batch: u32,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            clear_color: [0, 0, 0],
            depth_test: true,
            cull_back_faces: true,
            buffer_usage: BufferUsage::Static,
            debug_output: cfg!(debug_assertions),
            debug_message_batch: 64,
        }
    }
}

impl Config for RendererConfig {}

impl RendererConfig {
    /// Set the initial clear colour
    pub fn with_clear_color(mut self, color: [u8; 3]) -> Self {
        self.clear_color = color;
        self
    }

    /// Enable or disable depth testing at startup
    pub fn with_depth_test(mut self, enabled: bool) -> Self {
        self.depth_test = enabled;
        self
    }

    /// Enable or disable back-face culling
    pub fn with_back_face_culling(mut self, enabled: bool) -> Self {
        self.cull_back_faces = enabled;
        self
    }

    /// Set the buffer storage hint
    pub fn with_buffer_usage(mut self, usage: BufferUsage) -> Self {
        self.buffer_usage = usage;
        self
    }

    /// Enable or disable native debug output
    pub fn with_debug_output(mut self, enabled: bool) -> Self {
        self.debug_output = enabled;
        self
    }

    /// Reject settings the renderer cannot honour
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.debug_output && self.debug_message_batch == 0 {
            return Err(ConfigError::Invalid(
                "debug_message_batch must be non-zero when debug output is enabled".to_string(),
            ));
        }
        Ok(())
    }
}
