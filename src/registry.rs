//! Conversion profiles and the slug → profile registry.
//!
//! The registry is built once from the `[format.*]` config tables and shared
//! read-only for the life of the process. A lookup miss is not an error: it
//! means the request names a format this server does not offer.

use crate::config::{ConfigError, FormatConfig};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

/// The closed set of transforms a profile can apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// Re-encode the decoded original unchanged.
    Copy,
    /// Scale and center-crop to exactly `width × height`.
    Thumbnail,
    /// Scale to `width × height` without preserving the aspect ratio.
    Resize,
    /// Scale down to fit inside `width × height`, preserving the aspect ratio.
    Fit,
}

impl Operation {
    pub fn as_str(self) -> &'static str {
        match self {
            Operation::Copy => "copy",
            Operation::Thumbnail => "thumbnail",
            Operation::Resize => "resize",
            Operation::Fit => "fit",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownOperation(pub String);

impl FromStr for Operation {
    type Err = UnknownOperation;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "copy" => Ok(Operation::Copy),
            "thumbnail" => Ok(Operation::Thumbnail),
            "resize" => Ok(Operation::Resize),
            "fit" => Ok(Operation::Fit),
            other => Err(UnknownOperation(other.to_string())),
        }
    }
}

/// A named transform: operation plus target dimensions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionProfile {
    pub name: String,
    pub operation: Operation,
    pub width: u32,
    pub height: u32,
}

/// Immutable slug → profile mapping.
#[derive(Debug, Clone, Default)]
pub struct ConversionRegistry {
    profiles: HashMap<String, ConversionProfile>,
}

impl ConversionRegistry {
    /// Build from the raw `[format.*]` tables, rejecting unknown operations.
    pub fn from_config(formats: &BTreeMap<String, FormatConfig>) -> Result<Self, ConfigError> {
        let mut profiles = HashMap::with_capacity(formats.len());
        for (slug, format) in formats {
            let operation = format.operation.parse().map_err(|UnknownOperation(op)| {
                ConfigError::UnsupportedOperation {
                    slug: slug.clone(),
                    operation: op,
                }
            })?;
            profiles.insert(
                slug.clone(),
                ConversionProfile {
                    name: slug.clone(),
                    operation,
                    width: format.width,
                    height: format.height,
                },
            );
        }
        Ok(Self { profiles })
    }

    pub fn from_profiles(profiles: impl IntoIterator<Item = ConversionProfile>) -> Self {
        Self {
            profiles: profiles
                .into_iter()
                .map(|p| (p.name.clone(), p))
                .collect(),
        }
    }

    pub fn lookup(&self, slug: &str) -> Option<&ConversionProfile> {
        self.profiles.get(slug)
    }

    /// Profiles sorted by slug, for stable listings.
    pub fn profiles(&self) -> Vec<&ConversionProfile> {
        let mut all: Vec<_> = self.profiles.values().collect();
        all.sort_by(|a, b| a.name.cmp(&b.name));
        all
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn format(operation: &str, width: u32, height: u32) -> FormatConfig {
        FormatConfig {
            operation: operation.to_string(),
            width,
            height,
        }
    }

    #[test]
    fn operation_parses_known_names() {
        assert_eq!("copy".parse(), Ok(Operation::Copy));
        assert_eq!("thumbnail".parse(), Ok(Operation::Thumbnail));
        assert_eq!("resize".parse(), Ok(Operation::Resize));
        assert_eq!("fit".parse(), Ok(Operation::Fit));
    }

    #[test]
    fn operation_names_are_case_sensitive() {
        assert!("Fit".parse::<Operation>().is_err());
    }

    #[test]
    fn operation_display_matches_config_name() {
        for op in [
            Operation::Copy,
            Operation::Thumbnail,
            Operation::Resize,
            Operation::Fit,
        ] {
            assert_eq!(op.to_string().parse(), Ok(op));
        }
    }

    #[test]
    fn lookup_known_and_unknown() {
        let mut formats = BTreeMap::new();
        formats.insert("thumb".to_string(), format("thumbnail", 50, 50));
        formats.insert("big".to_string(), format("fit", 1200, 1200));
        let registry = ConversionRegistry::from_config(&formats).unwrap();

        let thumb = registry.lookup("thumb").unwrap();
        assert_eq!(thumb.name, "thumb");
        assert_eq!(thumb.operation, Operation::Thumbnail);
        assert_eq!((thumb.width, thumb.height), (50, 50));

        assert!(registry.lookup("huge").is_none());
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn from_config_rejects_unknown_operation() {
        let mut formats = BTreeMap::new();
        formats.insert("blur".to_string(), format("gaussian", 10, 10));
        let err = ConversionRegistry::from_config(&formats).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::UnsupportedOperation { ref slug, ref operation }
                if slug == "blur" && operation == "gaussian"
        ));
    }

    #[test]
    fn profiles_sorted_by_name() {
        let registry = ConversionRegistry::from_profiles([
            ConversionProfile {
                name: "z".into(),
                operation: Operation::Copy,
                width: 0,
                height: 0,
            },
            ConversionProfile {
                name: "a".into(),
                operation: Operation::Fit,
                width: 10,
                height: 10,
            },
        ]);
        let names: Vec<&str> = registry.profiles().iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["a", "z"]);
    }
}
