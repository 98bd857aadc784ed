//! Backup target resolution.
//!
//! A target specification is a comma-separated list of tokens. Group tokens
//! (`every`, `all`, `recommended`, `default`) expand to several categories,
//! single tokens (`db`, `attachments`, `key`, `config`, `sends`,
//! `icon_cache`) select exactly one. Tokens combine additively.

use crate::error::{Error, Result};
use std::fmt;
use std::str::FromStr;

/// Token used when the specification string is empty.
pub const DEFAULT_TARGET_SPEC: &str = "default";

/// Every token accepted in a target specification, in documentation order.
pub const KNOWN_TOKENS: &[&str] = &[
    "every",
    "all",
    "recommended",
    "default",
    "db",
    "attachments",
    "key",
    "config",
    "sends",
    "icon_cache",
];

/// Resolved set of data categories included in a backup run.
///
/// When `every` is set the orchestrator walks the whole source tree and the
/// other flags are ignored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BackupTargets {
    pub every: bool,
    pub database: bool,
    pub attachments: bool,
    pub key_files: bool,
    pub config: bool,
    pub sends: bool,
    pub icon_cache: bool,
}

impl BackupTargets {
    /// Parses a comma-separated target specification.
    ///
    /// All unrecognized tokens are collected and reported in one error, in
    /// the order they appear.
    pub fn parse(spec: &str) -> Result<Self> {
        let tokens: Vec<&str> = if spec.is_empty() {
            vec![DEFAULT_TARGET_SPEC]
        } else {
            spec.split(',').collect()
        };

        let mut targets = BackupTargets::default();
        let mut unsupported = Vec::new();

        for token in tokens {
            match token {
                "every" => targets.every = true,
                "all" => targets.merge(Self::all()),
                "recommended" => targets.merge(Self::recommended()),
                "default" => targets.merge(Self::default_set()),
                "db" => targets.database = true,
                "attachments" => targets.attachments = true,
                "key" => targets.key_files = true,
                "config" => targets.config = true,
                "sends" => targets.sends = true,
                "icon_cache" => targets.icon_cache = true,
                other => unsupported.push(other.to_string()),
            }
        }

        if !unsupported.is_empty() {
            return Err(Error::UnsupportedTargets {
                tokens: unsupported,
            });
        }

        Ok(targets)
    }

    /// Every category except the whole-tree mode.
    pub fn all() -> Self {
        Self {
            every: false,
            database: true,
            attachments: true,
            key_files: true,
            config: true,
            sends: true,
            icon_cache: true,
        }
    }

    /// Database, attachments, config and key files.
    pub fn recommended() -> Self {
        Self {
            key_files: true,
            ..Self::default_set()
        }
    }

    /// Database, attachments and config.
    pub fn default_set() -> Self {
        Self {
            database: true,
            attachments: true,
            config: true,
            ..Self::default()
        }
    }

    /// Whole-tree mode.
    pub fn everything() -> Self {
        Self {
            every: true,
            ..Self::default()
        }
    }

    /// Returns true if no category is selected.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    fn merge(&mut self, other: Self) {
        self.every |= other.every;
        self.database |= other.database;
        self.attachments |= other.attachments;
        self.key_files |= other.key_files;
        self.config |= other.config;
        self.sends |= other.sends;
        self.icon_cache |= other.icon_cache;
    }
}

impl FromStr for BackupTargets {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for BackupTargets {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.every {
            return write!(f, "every");
        }

        let names: Vec<&str> = [
            (self.database, "db"),
            (self.attachments, "attachments"),
            (self.key_files, "key"),
            (self.config, "config"),
            (self.sends, "sends"),
            (self.icon_cache, "icon_cache"),
        ]
        .into_iter()
        .filter_map(|(set, name)| set.then_some(name))
        .collect();

        write!(f, "{}", names.join(","))
    }
}
