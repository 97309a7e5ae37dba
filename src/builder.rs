use std::path::PathBuf;

use tracing::debug;

use crate::error::StoreError;
use crate::format::Format;
use crate::store::Store;
use crate::xml;

/// Builder for opening a [`Store`].
///
/// Everything is optional. With no file the store lives in memory only and
/// [`save()`](Store::save) reports `false`.
///
/// ```ignore
/// let store = Store::builder()
///     .file("settings.xml")
///     .root("settings")
///     .open()?;
/// ```
#[derive(Debug, Clone)]
pub struct StoreBuilder {
    file: Option<PathBuf>,
    format: Option<String>,
    root: String,
    escape_slashes: bool,
}

impl Default for StoreBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl StoreBuilder {
    pub fn new() -> Self {
        Self {
            file: None,
            format: None,
            root: "root".into(),
            escape_slashes: false,
        }
    }

    /// Back the store with a file. It is read on [`open()`](Self::open) if it
    /// exists and written by [`Store::save`].
    pub fn file(mut self, path: impl Into<PathBuf>) -> Self {
        self.file = Some(path.into());
        self
    }

    /// Use this format regardless of the file extension.
    pub fn format(mut self, format: Format) -> Self {
        self.format = Some(format.as_str().into());
        self
    }

    /// Select the format by type name (`json`, `xml`, `yml` or `php`).
    ///
    /// The name is checked by [`open()`](Self::open), before any file access.
    pub fn format_name(mut self, name: &str) -> Self {
        self.format = Some(name.into());
        self
    }

    /// Name of the XML wrapping element (default: `"root"`).
    pub fn root(mut self, name: &str) -> Self {
        self.root = name.into();
        self
    }

    /// Write `\/` for forward slashes in JSON output (default: off).
    pub fn escape_slashes(mut self, escape: bool) -> Self {
        self.escape_slashes = escape;
        self
    }

    /// Resolve the effective format: explicit name, then file extension,
    /// then JSON.
    fn effective_format(&self) -> Result<Format, StoreError> {
        Format::resolve(self.format.as_deref(), self.file.as_deref())
    }

    /// Validate the configuration, then load the file if there is one.
    ///
    /// Configuration errors are reported before the filesystem is touched.
    /// A file that fails to parse aborts the open; there is no partially
    /// loaded store.
    pub fn open(self) -> Result<Store, StoreError> {
        let format = self.effective_format()?;
        if !xml::is_element_name(&self.root) {
            return Err(StoreError::InvalidRootElement(self.root));
        }
        debug!(
            file = ?self.file,
            %format,
            explicit = self.format.is_some(),
            "resolved store format"
        );

        let mut store = Store::with_settings(self.file, format, self.root, self.escape_slashes);
        store.load()?;
        Ok(store)
    }
}
