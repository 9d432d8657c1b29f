use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use viewport::{FitDirection, FitPolicy, Size};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

pub const DEFAULT_SHADER_SIZE: u32 = 512;

/// Upper bound for `defaults.refresh_rate` and the `--refresh-rate` override.
pub const MAX_REFRESH_RATE: f32 = 1000.0;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MultiConfig {
    pub version: u32,
    #[serde(default)]
    pub defaults: Defaults,
    #[serde(default)]
    pub effects: BTreeMap<String, EffectConfig>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Defaults {
    pub fps: Option<f32>,
    #[serde(default)]
    pub stretch: FitPolicy,
    #[serde(default)]
    pub stretch_direction: FitDirection,
    pub refresh_rate: Option<f32>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EffectConfig {
    pub shader: PathBuf,
    #[serde(default = "default_shader_size")]
    pub shader_width: u32,
    #[serde(default = "default_shader_size")]
    pub shader_height: u32,
    /// Render at the control's own size instead of the shader size.
    #[serde(default)]
    pub fill_canvas: bool,
    #[serde(default)]
    pub stretch: Option<FitPolicy>,
    #[serde(default)]
    pub stretch_direction: Option<FitDirection>,
    #[serde(default)]
    pub fps: Option<f32>,
    #[serde(default)]
    pub bounds: Bounds,
    #[serde(default)]
    pub resizes: Vec<ResizeStep>,
    #[serde(default)]
    pub lifecycle: Vec<LifecycleStep>,
}

/// Control bounds written as `WIDTHxHEIGHT`, e.g. `"800x450"`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Bounds {
    pub width: f64,
    pub height: f64,
}

impl Bounds {
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    pub fn to_size(self) -> Size {
        Size::new(self.width, self.height)
    }
}

impl Default for Bounds {
    fn default() -> Self {
        Self::new(800.0, 450.0)
    }
}

impl FromStr for Bounds {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let (width, height) = raw
            .trim()
            .split_once(['x', 'X'])
            .ok_or_else(|| format!("invalid bounds '{raw}'; expected WIDTHxHEIGHT"))?;
        let parse = |value: &str| -> Result<f64, String> {
            let parsed: f64 = value
                .trim()
                .parse()
                .map_err(|_| format!("invalid bounds '{raw}'; '{value}' is not a number"))?;
            if !parsed.is_finite() || parsed < 0.0 {
                return Err(format!("invalid bounds '{raw}'; sizes must be non-negative"));
            }
            Ok(parsed)
        };
        Ok(Self::new(parse(width)?, parse(height)?))
    }
}

impl TryFrom<String> for Bounds {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Bounds> for String {
    fn from(bounds: Bounds) -> Self {
        bounds.to_string()
    }
}

impl fmt::Display for Bounds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ResizeStep {
    #[serde(deserialize_with = "deserialize_duration", serialize_with = "serialize_duration")]
    pub at: Duration,
    pub bounds: Bounds,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct LifecycleStep {
    #[serde(deserialize_with = "deserialize_duration", serialize_with = "serialize_duration")]
    pub at: Duration,
    pub action: LifecycleAction,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LifecycleAction {
    Start,
    Stop,
    /// Stop followed by Dispose, as when a control leaves the visual tree.
    Detach,
}

/// Effect settings with the `[defaults]` table folded in.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedEffect {
    pub name: String,
    pub shader: PathBuf,
    pub shader_size: Size,
    pub fill_canvas: bool,
    pub stretch: FitPolicy,
    pub stretch_direction: FitDirection,
    pub fps: Option<f32>,
    pub bounds: Bounds,
    pub resizes: Vec<ResizeStep>,
    pub lifecycle: Vec<LifecycleStep>,
}

fn default_shader_size() -> u32 {
    DEFAULT_SHADER_SIZE
}

fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    deserialize_duration_opt(deserializer).map(|d| d.unwrap_or(Duration::ZERO))
}

fn serialize_duration<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_str(&humantime::format_duration(*duration).to_string())
}

fn deserialize_duration_opt<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
where
    D: Deserializer<'de>,
{
    struct Visitor;
    impl<'de> de::Visitor<'de> for Visitor {
        type Value = Option<Duration>;

        fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
            formatter.write_str("a duration as number of seconds or human-readable string")
        }

        fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            humantime::parse_duration(v)
                .map(Some)
                .map_err(|err| E::custom(format!("invalid duration '{v}': {err}")))
        }

        fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(Some(Duration::from_secs(v)))
        }

        fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            if v < 0 {
                return Err(E::custom("duration must be non-negative"));
            }
            Ok(Some(Duration::from_secs(v as u64)))
        }

        fn visit_f64<E>(self, v: f64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            if v.is_nan() || v.is_sign_negative() || v.is_infinite() {
                return Err(E::custom("duration must be non-negative"));
            }
            Duration::try_from_secs_f64(v)
                .map(Some)
                .map_err(|err| E::custom(format!("invalid duration {v}: {err}")))
        }

        fn visit_none<E>(self) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(None)
        }

        fn visit_unit<E>(self) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(None)
        }
    }

    deserializer.deserialize_any(Visitor)
}

impl MultiConfig {
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let raw: MultiConfig = toml::from_str(input)?;
        raw.validate()?;
        Ok(raw)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    pub fn effect(&self, name: &str) -> Option<&EffectConfig> {
        self.effects.get(name)
    }

    /// Refresh rate of the simulated display; falls back to 60 Hz.
    pub fn refresh_rate(&self) -> f32 {
        self.defaults.refresh_rate.unwrap_or(60.0)
    }

    pub fn resolved_effect(&self, name: &str) -> Option<ResolvedEffect> {
        let effect = self.effects.get(name)?;
        Some(ResolvedEffect {
            name: name.to_string(),
            shader: effect.shader.clone(),
            shader_size: Size::new(
                f64::from(effect.shader_width),
                f64::from(effect.shader_height),
            ),
            fill_canvas: effect.fill_canvas,
            stretch: effect.stretch.unwrap_or(self.defaults.stretch),
            stretch_direction: effect
                .stretch_direction
                .unwrap_or(self.defaults.stretch_direction),
            fps: effect.fps.or(self.defaults.fps),
            bounds: effect.bounds,
            resizes: sorted_by_time(&effect.resizes, |step| step.at),
            lifecycle: sorted_by_time(&effect.lifecycle, |step| step.at),
        })
    }

    pub fn resolved_effects(&self) -> Vec<ResolvedEffect> {
        self.effects
            .keys()
            .filter_map(|name| self.resolved_effect(name))
            .collect()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.version != 1 {
            return Err(ConfigError::Invalid(format!(
                "unsupported config version {}; expected 1",
                self.version
            )));
        }

        if self.effects.is_empty() {
            return Err(ConfigError::Invalid(
                "config must define at least one effect".into(),
            ));
        }

        if let Some(fps) = self.defaults.fps {
            if fps < 0.0 {
                return Err(ConfigError::Invalid("defaults.fps must be >= 0".into()));
            }
        }

        if let Some(rate) = self.defaults.refresh_rate {
            if !(rate > 0.0 && rate <= MAX_REFRESH_RATE) {
                return Err(ConfigError::Invalid(format!(
                    "defaults.refresh_rate must be > 0 and <= {MAX_REFRESH_RATE}"
                )));
            }
        }

        for (name, effect) in &self.effects {
            if name.trim().is_empty() {
                return Err(ConfigError::Invalid("effect names may not be empty".into()));
            }

            if effect.shader.as_os_str().is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "effect '{name}' must name a shader"
                )));
            }

            if effect.shader_width == 0 || effect.shader_height == 0 {
                return Err(ConfigError::Invalid(format!(
                    "effect '{name}' shader size must be greater than zero"
                )));
            }

            if let Some(fps) = effect.fps {
                if fps < 0.0 {
                    return Err(ConfigError::Invalid(format!(
                        "effect '{name}' fps must be >= 0"
                    )));
                }
            }
        }

        Ok(())
    }
}

fn sorted_by_time<T: Clone>(steps: &[T], at: impl Fn(&T) -> Duration) -> Vec<T> {
    let mut steps = steps.to_vec();
    steps.sort_by_key(|step| at(step));
    steps
}
