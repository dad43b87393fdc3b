//! Severity levels and the registry that names them
//!
//! Ranks are plain integers: lower is more verbose, and a sink keeps a
//! record when `record.level >= sink.threshold`. Three debug tiers sit at and
//! below the standard debug rank so development-only chatter can be filtered
//! exactly like the built-in levels.

use super::error::{LoggerError, Result};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// A severity rank
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Level(u32);

impl Level {
    pub const NOTSET: Level = Level(0);
    /// Most verbose tier, for math and algorithm internals
    pub const DEBUG3: Level = Level(8);
    /// Development-only detail
    pub const DEBUG2: Level = Level(9);
    /// Same rank as the standard debug level
    pub const DEBUG1: Level = Level(10);
    pub const DEBUG: Level = Level::DEBUG1;
    pub const INFO: Level = Level(20);
    pub const WARNING: Level = Level(30);
    pub const WARN: Level = Level::WARNING;
    pub const ERROR: Level = Level(40);
    pub const CRITICAL: Level = Level(50);
    pub const FATAL: Level = Level::CRITICAL;

    #[must_use]
    pub const fn new(rank: u32) -> Self {
        Level(rank)
    }

    #[must_use]
    pub const fn rank(self) -> u32 {
        self.0
    }

    /// Name of a built-in level, without consulting a registry
    pub fn standard_name(self) -> Option<&'static str> {
        STANDARD_LEVELS
            .iter()
            .find(|(level, _)| *level == self)
            .map(|(_, name)| *name)
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.standard_name() {
            Some(name) => f.write_str(name),
            None => write!(f, "Level {}", self.0),
        }
    }
}

impl From<u32> for Level {
    fn from(rank: u32) -> Self {
        Level(rank)
    }
}

const STANDARD_LEVELS: &[(Level, &str)] = &[
    (Level::NOTSET, "NOTSET"),
    (Level::DEBUG3, "DEBUG3"),
    (Level::DEBUG2, "DEBUG2"),
    (Level::DEBUG1, "DEBUG1"),
    (Level::INFO, "INFO"),
    (Level::WARNING, "WARNING"),
    (Level::ERROR, "ERROR"),
    (Level::CRITICAL, "CRITICAL"),
];

const STANDARD_ALIASES: &[(&str, Level)] = &[
    ("DEBUG", Level::DEBUG1),
    ("WARN", Level::WARNING),
    ("FATAL", Level::CRITICAL),
];

/// A level as it arrives from configuration: either a rank or a name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LevelSpec {
    ByRank(u32),
    ByName(String),
}

impl From<Level> for LevelSpec {
    fn from(level: Level) -> Self {
        LevelSpec::ByRank(level.rank())
    }
}

impl From<u32> for LevelSpec {
    fn from(rank: u32) -> Self {
        LevelSpec::ByRank(rank)
    }
}

impl From<&str> for LevelSpec {
    fn from(name: &str) -> Self {
        LevelSpec::ByName(name.to_string())
    }
}

impl From<String> for LevelSpec {
    fn from(name: String) -> Self {
        LevelSpec::ByName(name)
    }
}

impl FromStr for LevelSpec {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(match s.trim().parse::<u32>() {
            Ok(rank) => LevelSpec::ByRank(rank),
            Err(_) => LevelSpec::ByName(s.to_string()),
        })
    }
}

impl fmt::Display for LevelSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LevelSpec::ByRank(rank) => write!(f, "{}", rank),
            LevelSpec::ByName(name) => f.write_str(name),
        }
    }
}

#[derive(Debug, Default)]
struct RegistryTables {
    names: HashMap<Level, String>,
    ranks: HashMap<String, Level>,
}

/// Ordered set of named severity levels
///
/// Populated with the standard ranks and the three debug tiers on
/// construction. Lookups by name are case-insensitive.
///
/// # Example
///
/// ```
/// use bootlog::{Level, LevelSpec, SeverityRegistry};
///
/// let registry = SeverityRegistry::new();
/// assert_eq!(registry.resolve(&LevelSpec::from("debug2")).unwrap(), Level::DEBUG2);
/// assert_eq!(registry.name_of(Level::DEBUG1), "DEBUG1");
/// ```
#[derive(Debug)]
pub struct SeverityRegistry {
    tables: RwLock<RegistryTables>,
}

impl SeverityRegistry {
    pub fn new() -> Self {
        let mut tables = RegistryTables::default();
        for (level, name) in STANDARD_LEVELS {
            tables.names.insert(*level, (*name).to_string());
            tables.ranks.insert((*name).to_string(), *level);
        }
        for (alias, level) in STANDARD_ALIASES {
            tables.ranks.insert((*alias).to_string(), *level);
        }
        Self {
            tables: RwLock::new(tables),
        }
    }

    /// Register a display name for a rank
    ///
    /// Registering the same name again is a no-op; renaming a rank that
    /// already has a different name is rejected.
    pub fn register(&self, level: Level, name: &str) -> Result<()> {
        let upper = name.to_uppercase();
        let mut tables = self.tables.write();
        if let Some(existing) = tables.names.get(&level) {
            if *existing != upper {
                return Err(LoggerError::LevelConflict {
                    rank: level.rank(),
                    existing: existing.clone(),
                    requested: upper,
                });
            }
            return Ok(());
        }
        tables.names.insert(level, upper.clone());
        tables.ranks.insert(upper, level);
        Ok(())
    }

    /// Add an extra name that resolves to an existing rank
    pub fn register_alias(&self, alias: &str, level: Level) {
        self.tables.write().ranks.insert(alias.to_uppercase(), level);
    }

    /// Resolve a configured level to its rank
    pub fn resolve(&self, spec: &LevelSpec) -> Result<Level> {
        match spec {
            LevelSpec::ByRank(rank) => Ok(Level(*rank)),
            LevelSpec::ByName(name) => self
                .tables
                .read()
                .ranks
                .get(&name.trim().to_uppercase())
                .copied()
                .ok_or_else(|| LoggerError::unknown_level(name.clone())),
        }
    }

    /// Display name for a rank, `Level {n}` when unregistered
    pub fn name_of(&self, level: Level) -> String {
        self.tables
            .read()
            .names
            .get(&level)
            .cloned()
            .unwrap_or_else(|| format!("Level {}", level.rank()))
    }

    /// All registered levels, most verbose first
    pub fn levels(&self) -> Vec<(Level, String)> {
        let mut levels: Vec<_> = self
            .tables
            .read()
            .names
            .iter()
            .map(|(level, name)| (*level, name.clone()))
            .collect();
        levels.sort_by_key(|(level, _)| *level);
        levels
    }
}

impl Default for SeverityRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_tiers_are_ordered() {
        assert!(Level::DEBUG3 < Level::DEBUG2);
        assert!(Level::DEBUG2 < Level::DEBUG1);
        assert_eq!(Level::DEBUG, Level::DEBUG1);
        assert!(Level::DEBUG1 < Level::INFO);
        assert!(Level::NOTSET < Level::DEBUG3);
    }

    #[test]
    fn test_resolve_by_name_is_case_insensitive() {
        let registry = SeverityRegistry::new();
        assert_eq!(registry.resolve(&"info".into()).unwrap(), Level::INFO);
        assert_eq!(registry.resolve(&"Warning".into()).unwrap(), Level::WARNING);
        assert_eq!(registry.resolve(&"warn".into()).unwrap(), Level::WARNING);
        assert_eq!(registry.resolve(&"fatal".into()).unwrap(), Level::CRITICAL);
        assert_eq!(registry.resolve(&"DEBUG".into()).unwrap(), Level::DEBUG1);
        assert_eq!(registry.resolve(&"debug3".into()).unwrap(), Level::DEBUG3);
    }

    #[test]
    fn test_resolve_by_rank() {
        let registry = SeverityRegistry::new();
        assert_eq!(registry.resolve(&LevelSpec::ByRank(9)).unwrap(), Level::DEBUG2);
        assert_eq!(registry.resolve(&LevelSpec::ByRank(25)).unwrap(), Level::new(25));
    }

    #[test]
    fn test_resolve_unknown_name() {
        let registry = SeverityRegistry::new();
        let err = registry.resolve(&"chatty".into()).unwrap_err();
        assert!(matches!(err, LoggerError::UnknownLevel { .. }));
    }

    #[test]
    fn test_names() {
        let registry = SeverityRegistry::new();
        assert_eq!(registry.name_of(Level::DEBUG1), "DEBUG1");
        assert_eq!(registry.name_of(Level::CRITICAL), "CRITICAL");
        assert_eq!(registry.name_of(Level::new(33)), "Level 33");
    }

    #[test]
    fn test_register_custom_level() {
        let registry = SeverityRegistry::new();
        registry.register(Level::new(25), "notice").unwrap();
        assert_eq!(registry.name_of(Level::new(25)), "NOTICE");
        assert_eq!(registry.resolve(&"Notice".into()).unwrap(), Level::new(25));

        // same name twice is fine
        registry.register(Level::new(25), "NOTICE").unwrap();

        let err = registry.register(Level::new(25), "other").unwrap_err();
        assert!(matches!(err, LoggerError::LevelConflict { rank: 25, .. }));
    }

    #[test]
    fn test_levels_sorted() {
        let registry = SeverityRegistry::new();
        let levels = registry.levels();
        assert_eq!(levels.first().map(|(l, _)| *l), Some(Level::NOTSET));
        assert_eq!(levels.last().map(|(l, _)| *l), Some(Level::CRITICAL));
        assert!(levels.windows(2).all(|w| w[0].0 < w[1].0));
    }

    #[test]
    fn test_level_spec_parsing() {
        assert_eq!("20".parse::<LevelSpec>().unwrap(), LevelSpec::ByRank(20));
        assert_eq!(
            "info".parse::<LevelSpec>().unwrap(),
            LevelSpec::ByName("info".to_string())
        );
        let spec: LevelSpec = serde_json::from_str("\"DEBUG2\"").unwrap();
        assert_eq!(spec, LevelSpec::ByName("DEBUG2".to_string()));
        let spec: LevelSpec = serde_json::from_str("30").unwrap();
        assert_eq!(spec, LevelSpec::ByRank(30));
    }

    #[test]
    fn test_level_display() {
        assert_eq!(Level::WARNING.to_string(), "WARNING");
        assert_eq!(Level::new(7).to_string(), "Level 7");
    }
}
