//! Build variants: named, immutable sets of `-D<KEY>=<VALUE>` flags.
//!
//! Variants compose by explicit union ([`BuildVariant::extend`],
//! [`BuildVariant::merge`]). A key bound to two different values is a hard
//! error when the variant is defined, never resolved by precedence.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::error::VariantError;

/// A single compile-time flag.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct BuildFlag {
    pub key: String,
    pub value: String,
}

impl BuildFlag {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Render as a build-system argument.
    pub fn to_arg(&self) -> String {
        format!("-D{}={}", self.key, self.value)
    }
}

impl fmt::Display for BuildFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_arg())
    }
}

impl FromStr for BuildFlag {
    type Err = VariantError;

    /// Parse `-DKEY=VALUE` (the leading `-D` is optional).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let body = s.strip_prefix("-D").unwrap_or(s);
        match body.split_once('=') {
            Some((key, value)) if !key.is_empty() => Ok(BuildFlag::new(key, value)),
            _ => Err(VariantError::MalformedFlag(s.to_string())),
        }
    }
}

/// Two flag bindings that must never appear in the same variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Incompatibility {
    pub left: BuildFlag,
    pub right: BuildFlag,
    pub reason: &'static str,
}

/// Documented incompatibilities checked on every variant construction.
pub fn known_incompatibilities() -> Vec<Incompatibility> {
    vec![Incompatibility {
        left: BuildFlag::new("USE_GLIBCXX_DEBUG", "YES"),
        right: BuildFlag::new("USE_LP", "YES"),
        reason: "the debug standard library is not ABI-compatible with the LP solver build",
    }]
}

/// A named, immutable, ordered set of flags with unique keys.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BuildVariant {
    name: String,
    flags: Vec<BuildFlag>,
}

impl BuildVariant {
    /// Define a variant. Identical repeats collapse; a key bound to two
    /// different values is a `Conflict`.
    pub fn new(name: impl Into<String>, flags: Vec<BuildFlag>) -> Result<Self, VariantError> {
        let name = name.into();
        let mut seen: BTreeMap<String, String> = BTreeMap::new();
        let mut unique = Vec::with_capacity(flags.len());

        for flag in flags {
            match seen.get(&flag.key) {
                Some(existing) if *existing == flag.value => continue,
                Some(existing) => {
                    return Err(VariantError::Conflict {
                        variant: name,
                        key: flag.key,
                        first: existing.clone(),
                        second: flag.value,
                    })
                }
                None => {
                    seen.insert(flag.key.clone(), flag.value.clone());
                    unique.push(flag);
                }
            }
        }

        let variant = Self {
            name,
            flags: unique,
        };
        variant.check_incompatibilities()?;
        Ok(variant)
    }

    /// New variant containing every flag of `self` followed by `extra`.
    pub fn extend(
        &self,
        name: impl Into<String>,
        extra: Vec<BuildFlag>,
    ) -> Result<Self, VariantError> {
        let mut flags = self.flags.clone();
        flags.extend(extra);
        Self::new(name, flags)
    }

    /// Union of two variants under a new name.
    pub fn merge(
        name: impl Into<String>,
        base: &BuildVariant,
        other: &BuildVariant,
    ) -> Result<Self, VariantError> {
        base.extend(name, other.flags.clone())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn flags(&self) -> &[BuildFlag] {
        &self.flags
    }

    /// Value bound to `key`, if any.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.flags
            .iter()
            .find(|f| f.key == key)
            .map(|f| f.value.as_str())
    }

    /// Flags as `-DKEY=VALUE` arguments, in declaration order.
    pub fn to_args(&self) -> Vec<String> {
        self.flags.iter().map(BuildFlag::to_arg).collect()
    }

    fn check_incompatibilities(&self) -> Result<(), VariantError> {
        for rule in known_incompatibilities() {
            let has = |flag: &BuildFlag| self.get(&flag.key) == Some(flag.value.as_str());
            if has(&rule.left) && has(&rule.right) {
                return Err(VariantError::Incompatible {
                    variant: self.name.clone(),
                    left: rule.left.to_arg(),
                    right: rule.right.to_arg(),
                    reason: rule.reason.to_string(),
                });
            }
        }
        Ok(())
    }
}

/// Immutable set of selectable variants.
#[derive(Debug, Clone)]
pub struct VariantCatalog {
    variants: Vec<BuildVariant>,
    default: usize,
    debug: usize,
}

impl VariantCatalog {
    /// Build a catalog. Names must be unique and both selections must exist.
    pub fn new(
        variants: Vec<BuildVariant>,
        default: &str,
        debug: &str,
    ) -> Result<Self, VariantError> {
        let mut names = std::collections::BTreeSet::new();
        for variant in &variants {
            if !names.insert(variant.name.as_str()) {
                return Err(VariantError::Duplicate(variant.name.clone()));
            }
        }
        let position = |name: &str| {
            variants
                .iter()
                .position(|v| v.name == name)
                .ok_or_else(|| VariantError::Unknown(name.to_string()))
        };
        let default = position(default)?;
        let debug = position(debug)?;
        Ok(Self {
            variants,
            default,
            debug,
        })
    }

    /// Variant selected by name.
    pub fn get(&self, name: &str) -> Result<&BuildVariant, VariantError> {
        self.variants
            .iter()
            .find(|v| v.name == name)
            .ok_or_else(|| VariantError::Unknown(name.to_string()))
    }

    pub fn default_variant(&self) -> &BuildVariant {
        &self.variants[self.default]
    }

    pub fn debug_variant(&self) -> &BuildVariant {
        &self.variants[self.debug]
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.variants.iter().map(|v| v.name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &BuildVariant> {
        self.variants.iter()
    }

    /// The engine's build targets.
    pub fn standard() -> Result<Self, VariantError> {
        let plugins = testing_plugins();
        let build = |name: &str,
                     build_type: &str,
                     compiler: Option<&str>|
         -> Result<BuildVariant, VariantError> {
            let mut flags = vec![BuildFlag::new("CMAKE_BUILD_TYPE", build_type)];
            if let Some(cxx) = compiler {
                flags.push(BuildFlag::new("CMAKE_CXX_COMPILER", cxx));
            }
            BuildVariant::new(name, flags)?.extend(name, plugins.clone())
        };

        let minimal = BuildVariant::new(
            "minimal",
            vec![
                BuildFlag::new("CMAKE_BUILD_TYPE", "Release"),
                BuildFlag::new("DISABLE_PLUGINS_BY_DEFAULT", "YES"),
            ],
        )?;
        let testing = minimal.extend("testing", plugins.clone())?;
        let glibcxx_debug = BuildVariant::new(
            "glibcxx_debug",
            vec![
                BuildFlag::new("CMAKE_BUILD_TYPE", "Debug"),
                BuildFlag::new("USE_LP", "NO"),
                BuildFlag::new("USE_GLIBCXX_DEBUG", "YES"),
            ],
        )?
        .extend("glibcxx_debug", plugins.clone())?;

        Self::new(
            vec![
                build("release", "Release", None)?,
                build("debug", "Debug", None)?,
                build("release_clang", "Release", Some("/usr/bin/clang++"))?,
                build("debug_clang", "Debug", Some("/usr/bin/clang++"))?,
                build("release_gcc", "Release", Some("/usr/bin/g++"))?,
                build("debug_gcc", "Debug", Some("/usr/bin/g++"))?,
                glibcxx_debug,
                minimal,
                testing,
            ],
            "release",
            "debug",
        )
    }
}

/// Plugins compiled into every testing build.
fn testing_plugins() -> Vec<BuildFlag> {
    const PLUGINS: &[&str] = &[
        "POLICY_TESTING",
        "MAX_HEURISTIC",
        "FF_HEURISTIC",
        "LANDMARK_CUT_HEURISTIC",
        "ITERATED_SEARCH",
        "LAZY_WASTAR",
        "LAZY_GREEDY",
        "EAGER_WASTAR",
        "EAGER_GREEDY",
        "ASTAR",
        "LANDMARKS",
        "ENFORCED_HILL_CLIMBING_SEARCH",
        "BLIND_SEARCH_HEURISTIC",
    ];

    std::iter::once(BuildFlag::new("DISABLE_PLUGINS_BY_DEFAULT", "YES"))
        .chain(
            PLUGINS
                .iter()
                .map(|p| BuildFlag::new(format!("PLUGIN_{p}_ENABLED"), "YES")),
        )
        .collect()
}
