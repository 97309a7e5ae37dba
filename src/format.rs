//! The fixed set of on-disk formats and how one is picked for a store.
//!
//! A format is resolved exactly once, when the store is opened:
//!
//! 1. An explicit type name wins. It must be one of [`Format::NAMES`];
//!    anything else is a [`StoreError::UnknownFormat`] raised before the
//!    file is read.
//! 2. Otherwise the file extension is matched case-insensitively against the
//!    same names (`settings.YML` → YAML).
//! 3. No file, no extension, or an unrecognized extension falls back to JSON.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::error::StoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Format {
    #[default]
    Json,
    Xml,
    Yaml,
    /// A PHP source file returning an array literal.
    Php,
}

impl Format {
    pub const ALL: [Format; 4] = [Format::Json, Format::Xml, Format::Yaml, Format::Php];

    /// Type names accepted by [`FromStr`], also used as file extensions.
    pub const NAMES: [&'static str; 4] = ["json", "xml", "yml", "php"];

    pub fn as_str(self) -> &'static str {
        match self {
            Format::Json => "json",
            Format::Xml => "xml",
            Format::Yaml => "yml",
            Format::Php => "php",
        }
    }

    /// Infer a format from a path's extension, if it names one.
    pub fn from_extension(path: &Path) -> Option<Format> {
        let ext = path.extension()?.to_str()?;
        ext.to_ascii_lowercase().parse().ok()
    }

    /// Resolve the effective format from an explicit name and/or a file path.
    pub fn resolve(explicit: Option<&str>, file: Option<&Path>) -> Result<Format, StoreError> {
        if let Some(name) = explicit {
            return name.parse();
        }
        Ok(file.and_then(Format::from_extension).unwrap_or_default())
    }
}

impl FromStr for Format {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Format::ALL
            .into_iter()
            .find(|f| f.as_str() == s)
            .ok_or_else(|| StoreError::UnknownFormat { name: s.into() })
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
