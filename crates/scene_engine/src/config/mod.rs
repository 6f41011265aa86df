//! Configuration system
//!
//! Scene settings are plain serde structs loadable from TOML or RON files
//! through the [`Config`] trait; every field has a default matching the
//! built-in demo scene so a missing file is never fatal.

use serde::{Deserialize, Serialize};

use crate::foundation::math::Vec3;
use crate::render::{MainLight, ShadowBias};

/// Configuration trait
pub trait Config: Serialize + for<'de> Deserialize<'de> + Default {
    /// Load configuration from file
    fn load_from_file(path: &str) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(ConfigError::Io)?;

        if path.ends_with(".toml") {
            toml::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string()))
        } else if path.ends_with(".ron") {
            ron::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string()))
        } else {
            Err(ConfigError::UnsupportedFormat(path.to_string()))
        }
    }

    /// Save configuration to file
    fn save_to_file(&self, path: &str) -> Result<(), ConfigError> {
        let contents = if path.ends_with(".toml") {
            toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))?
        } else if path.ends_with(".ron") {
            ron::ser::to_string_pretty(self, Default::default())
                .map_err(|e| ConfigError::Serialize(e.to_string()))?
        } else {
            return Err(ConfigError::UnsupportedFormat(path.to_string()));
        };

        std::fs::write(path, contents).map_err(ConfigError::Io)
    }
}

/// Configuration errors
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Parse error
    #[error("Parse error: {0}")]
    Parse(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialize(String),

    /// Unsupported format
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
}

/// Settings for the assembled demo scene
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneSettings {
    /// Root directory resolved by the default asset source
    pub asset_root: String,

    /// Number of asset loader worker threads
    pub loader_threads: usize,

    /// Skybox environment map path
    pub skybox_path: String,

    /// Indirect light environment map path
    pub indirect_light_path: String,

    /// Asynchronously loaded model path
    pub model_path: String,

    /// Material applied to the metallic decoration cube
    pub metallic_material_path: String,

    /// Material applied to the glass child cube
    pub glass_material_path: String,

    /// Main directional light parameters
    pub main_light: LightSettings,
}

impl Default for SceneSettings {
    fn default() -> Self {
        Self {
            asset_root: "assets".to_string(),
            loader_threads: 2,
            skybox_path: "light/test_ibl_skybox.ktx".to_string(),
            indirect_light_path: "light/test_ibl_ibl.ktx".to_string(),
            model_path: "models/cockroach.glb".to_string(),
            metallic_material_path: "materials/metallic.filamat".to_string(),
            glass_material_path: "materials/glass.filamat".to_string(),
            main_light: LightSettings::default(),
        }
    }
}

impl Config for SceneSettings {}

/// Serializable main-light parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LightSettings {
    /// Light direction (normalized at use site)
    pub direction: [f32; 3],

    /// Linear RGB color
    pub color: [f32; 3],

    /// Intensity in lux
    pub intensity: f32,

    /// Whether the light casts shadows
    pub cast_shadows: bool,

    /// Shadow depth bias
    pub shadow_constant_bias: f32,

    /// Shadow blur kernel width
    pub shadow_blur_width: f32,
}

impl Default for LightSettings {
    fn default() -> Self {
        Self {
            direction: [0.0, -1.0, 0.0],
            color: [1.0, 1.0, 1.0],
            intensity: 100_000.0,
            cast_shadows: true,
            shadow_constant_bias: 0.05,
            shadow_blur_width: 3.0,
        }
    }
}

impl LightSettings {
    /// Convert to the renderer-facing light description
    pub fn to_main_light(&self) -> MainLight {
        MainLight {
            direction: Vec3::from(self.direction),
            color: Vec3::from(self.color),
            intensity: self.intensity,
            shadow: self.cast_shadows.then(|| ShadowBias {
                constant_bias: self.shadow_constant_bias,
                blur_width: self.shadow_blur_width,
            }),
        }
    }
}
