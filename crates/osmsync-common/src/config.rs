//! Configuration validation primitives
//!
//! Both processes read raw values through clap (environment variables with
//! defaults) and then validate them into an immutable config. Validation never
//! stops at the first problem: every issue is collected into [`ConfigErrors`]
//! so the operator sees the whole list on stderr in one go.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// A single configuration problem, keyed by the environment variable name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigIssue {
    pub key: String,
    pub message: String,
}

impl ConfigIssue {
    pub fn new(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ConfigIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.key, self.message)
    }
}

/// Non-empty list of configuration problems
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigErrors {
    issues: Vec<ConfigIssue>,
}

impl ConfigErrors {
    pub fn issues(&self) -> &[ConfigIssue] {
        &self.issues
    }

    /// Whether any issue was raised for the given key
    pub fn has_key(&self, key: &str) -> bool {
        self.issues.iter().any(|issue| issue.key == key)
    }
}

impl fmt::Display for ConfigErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invalid configuration ({} problem(s))", self.issues.len())?;
        for issue in &self.issues {
            write!(f, "\n  - {}", issue)?;
        }
        Ok(())
    }
}

impl std::error::Error for ConfigErrors {}

/// Accumulates issues while a raw configuration is being checked
#[derive(Debug, Default)]
pub struct Validator {
    issues: Vec<ConfigIssue>,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, key: &str, message: impl Into<String>) {
        self.issues.push(ConfigIssue::new(key, message));
    }

    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }

    /// Parse `raw` as `T`, recording an issue and returning `None` on failure.
    ///
    /// The value must match exactly; surrounding whitespace is rejected.
    pub fn parse<T>(&mut self, key: &str, raw: &str) -> Option<T>
    where
        T: FromStr,
        T::Err: fmt::Display,
    {
        match raw.parse::<T>() {
            Ok(value) => Some(value),
            Err(e) => {
                self.push(key, e.to_string());
                None
            },
        }
    }

    /// Resolve a directory against the working directory and require it to exist
    pub fn existing_dir(&mut self, key: &str, raw: &Path) -> Option<PathBuf> {
        let path = match std::path::absolute(raw) {
            Ok(path) => path,
            Err(e) => {
                self.push(key, format!("cannot resolve {}: {}", raw.display(), e));
                return None;
            },
        };

        if path.is_dir() {
            Some(path)
        } else {
            self.push(key, format!("the folder {} does not exist", path.display()));
            None
        }
    }

    /// Finish validation, yielding `value` only if nothing was recorded
    pub fn finish<T>(self, value: impl FnOnce() -> Option<T>) -> Result<T, ConfigErrors> {
        if !self.issues.is_empty() {
            return Err(ConfigErrors {
                issues: self.issues,
            });
        }

        value().ok_or_else(|| ConfigErrors {
            issues: vec![ConfigIssue::new("config", "incomplete configuration")],
        })
    }

    /// Stop early with the issues collected so far, if any
    pub fn checkpoint(&mut self) -> Result<(), ConfigErrors> {
        if self.issues.is_empty() {
            Ok(())
        } else {
            Err(ConfigErrors {
                issues: std::mem::take(&mut self.issues),
            })
        }
    }
}

/// A `yes`/`no` switch, spelled the way the deployment environment spells it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Toggle {
    Yes,
    No,
}

impl Toggle {
    pub fn enabled(self) -> bool {
        self == Toggle::Yes
    }
}

impl FromStr for Toggle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "yes" => Ok(Toggle::Yes),
            "no" => Ok(Toggle::No),
            other => Err(format!("'{}' not supported, expected 'yes' or 'no'", other)),
        }
    }
}

impl fmt::Display for Toggle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Toggle::Yes => write!(f, "yes"),
            Toggle::No => write!(f, "no"),
        }
    }
}
