use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseFitError {
    #[error("unknown stretch mode '{0}'; expected none, fill, uniform, or uniform-to-fill")]
    Policy(String),
    #[error("unknown stretch direction '{0}'; expected both, up-only, or down-only")]
    Direction(String),
}

/// How a fixed-size source surface is mapped onto a variable-size viewport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FitPolicy {
    /// Keep the source at its native size.
    None,
    /// Stretch each axis independently; aspect ratio is not preserved.
    Fill,
    /// Largest uniform scale that still fits; may letterbox.
    #[default]
    Uniform,
    /// Smallest uniform scale that covers the viewport; may crop.
    #[serde(alias = "uniformtofill", alias = "uniform_to_fill")]
    UniformToFill,
}

/// Restricts which way a [`FitPolicy`] is allowed to scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FitDirection {
    /// Only scale up; factors below 1.0 are raised to 1.0.
    #[serde(rename = "up-only", alias = "up_only", alias = "no-scale-down")]
    NoScaleDown,
    /// Only scale down; factors above 1.0 are lowered to 1.0.
    #[serde(rename = "down-only", alias = "down_only", alias = "no-scale-up")]
    NoScaleUp,
    #[default]
    Both,
}

impl FitPolicy {
    /// Per-axis factors before any direction clamp is applied.
    pub(crate) fn raw_factors(self, ratio_x: f64, ratio_y: f64) -> (f64, f64) {
        match self {
            FitPolicy::None => (1.0, 1.0),
            FitPolicy::Fill => (ratio_x, ratio_y),
            FitPolicy::Uniform => {
                let uniform = ratio_x.min(ratio_y);
                (uniform, uniform)
            }
            FitPolicy::UniformToFill => {
                let uniform = ratio_x.max(ratio_y);
                (uniform, uniform)
            }
        }
    }
}

impl FitDirection {
    pub(crate) fn clamp(self, factor: f64) -> f64 {
        match self {
            FitDirection::NoScaleDown => factor.max(1.0),
            FitDirection::NoScaleUp => factor.min(1.0),
            FitDirection::Both => factor,
        }
    }
}

fn normalize(value: &str) -> String {
    value
        .trim()
        .to_ascii_lowercase()
        .chars()
        .filter(|ch| !matches!(ch, '-' | '_' | ' '))
        .collect()
}

impl FromStr for FitPolicy {
    type Err = ParseFitError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match normalize(value).as_str() {
            "none" => Ok(FitPolicy::None),
            "fill" | "stretch" => Ok(FitPolicy::Fill),
            "uniform" | "contain" => Ok(FitPolicy::Uniform),
            "uniformtofill" | "cover" => Ok(FitPolicy::UniformToFill),
            _ => Err(ParseFitError::Policy(value.trim().to_string())),
        }
    }
}

impl FromStr for FitDirection {
    type Err = ParseFitError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match normalize(value).as_str() {
            "both" => Ok(FitDirection::Both),
            "uponly" | "noscaledown" => Ok(FitDirection::NoScaleDown),
            "downonly" | "noscaleup" => Ok(FitDirection::NoScaleUp),
            _ => Err(ParseFitError::Direction(value.trim().to_string())),
        }
    }
}

impl fmt::Display for FitPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FitPolicy::None => f.write_str("none"),
            FitPolicy::Fill => f.write_str("fill"),
            FitPolicy::Uniform => f.write_str("uniform"),
            FitPolicy::UniformToFill => f.write_str("uniform-to-fill"),
        }
    }
}

impl fmt::Display for FitDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FitDirection::NoScaleDown => f.write_str("up-only"),
            FitDirection::NoScaleUp => f.write_str("down-only"),
            FitDirection::Both => f.write_str("both"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_policy_aliases() {
        assert_eq!("Uniform".parse::<FitPolicy>().unwrap(), FitPolicy::Uniform);
        assert_eq!(
            "uniform-to-fill".parse::<FitPolicy>().unwrap(),
            FitPolicy::UniformToFill
        );
        assert_eq!(
            "UniformToFill".parse::<FitPolicy>().unwrap(),
            FitPolicy::UniformToFill
        );
        assert_eq!("fill".parse::<FitPolicy>().unwrap(), FitPolicy::Fill);
        assert_eq!(" none ".parse::<FitPolicy>().unwrap(), FitPolicy::None);
        assert_eq!(
            "tile".parse::<FitPolicy>(),
            Err(ParseFitError::Policy("tile".into()))
        );
    }

    #[test]
    fn parses_direction_aliases() {
        assert_eq!("both".parse::<FitDirection>().unwrap(), FitDirection::Both);
        assert_eq!(
            "UpOnly".parse::<FitDirection>().unwrap(),
            FitDirection::NoScaleDown
        );
        assert_eq!(
            "no-scale-up".parse::<FitDirection>().unwrap(),
            FitDirection::NoScaleUp
        );
        assert!("sideways".parse::<FitDirection>().is_err());
    }

    #[test]
    fn display_round_trips_through_from_str() {
        for policy in [
            FitPolicy::None,
            FitPolicy::Fill,
            FitPolicy::Uniform,
            FitPolicy::UniformToFill,
        ] {
            assert_eq!(policy.to_string().parse::<FitPolicy>().unwrap(), policy);
        }
        for direction in [
            FitDirection::NoScaleDown,
            FitDirection::NoScaleUp,
            FitDirection::Both,
        ] {
            assert_eq!(
                direction.to_string().parse::<FitDirection>().unwrap(),
                direction
            );
        }
    }

    #[test]
    fn direction_clamps_factors() {
        assert_eq!(FitDirection::NoScaleUp.clamp(1.5), 1.0);
        assert_eq!(FitDirection::NoScaleUp.clamp(0.5), 0.5);
        assert_eq!(FitDirection::NoScaleDown.clamp(0.5), 1.0);
        assert_eq!(FitDirection::NoScaleDown.clamp(2.0), 2.0);
        assert_eq!(FitDirection::Both.clamp(0.25), 0.25);
    }
}
