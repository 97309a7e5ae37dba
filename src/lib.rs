//! A file-backed key-value settings store. Open a file, read and write keys,
//! save.
//!
//! ```ignore
//! let mut store = Store::open("settings.yml")?;
//! store.set("theme", "dark")?;
//! store.increment("launches")?;
//! store.save();
//! ```
//!
//! The store keeps an ordered tree of [`Value`]s in memory. Every read and
//! write works on that tree; the file is read once when the store is opened
//! and written only by [`save()`](Store::save).
//!
//! # Formats
//!
//! Four on-disk formats are supported, selected by [`Format`]:
//!
//! | Type  | Extension | Collaborator |
//! |-------|-----------|--------------|
//! | `json`| `.json`   | serde_json |
//! | `xml` | `.xml`    | quick-xml |
//! | `yml` | `.yml`    | serde_yaml |
//! | `php` | `.php`    | built-in literal parser |
//!
//! The format comes from, in order: an explicit type on the builder, the
//! file extension (case-insensitive), and finally JSON. An explicit type
//! that is not one of the four names fails with
//! [`StoreError::UnknownFormat`] before the filesystem is touched.
//!
//! Empty files are empty stores in every format. A file whose top level is
//! not a mapping is rejected with [`StoreError::NotAMappingDocument`].
//!
//! XML has no native types, so written files carry a `type` attribute on
//! every non-string element and read them back exactly. See the [`xml`]
//! module for the encoding. PHP files are `<?php return [...];` array
//! literals; they are parsed, never executed.
//!
//! # Validation
//!
//! Anything [`Serialize`](serde::Serialize) can be written with
//! [`set()`](Store::set) or [`set_many()`](Store::set_many), as long as
//! every leaf has a scalar representation. Byte buffers, non-finite floats,
//! integers beyond `i64` and maps with composite keys are rejected with
//! [`StoreError::NonScalarValue`], naming the offending path. The whole
//! input is checked before anything is written: a rejected `set_many`
//! leaves the store exactly as it was.
//!
//! # Counters
//!
//! [`increment()`](Store::increment) and [`decrement()`](Store::decrement)
//! treat an absent or null key as 0. An existing value must already be an
//! integer (or a float or string that is exactly one); anything else is
//! [`StoreError::NotAnInteger`].
//!
//! # Saving
//!
//! [`save()`](Store::save) writes the whole tree under an exclusive file
//! lock and returns `false` when there is no file or the write fails. The
//! cause of a failed write is logged through `tracing`;
//! [`try_save()`](Store::try_save) returns it instead.
//!
//! Saved files are pretty-printed. Exports
//! ([`to_json`](Store::to_json), [`to_xml`](Store::to_xml),
//! [`to_yaml`](Store::to_yaml), [`to_php`](Store::to_php)) work with or
//! without a file.
//!
//! # Command layer
//!
//! [`StoreAction`] describes an operation independent of any CLI framework
//! and [`Store::handle`] runs it, returning a displayable [`StoreResult`].
//! Keys in actions may be dotted to reach nested values.
//!
//! For [clap](https://docs.rs/clap) users, the `cli` module (behind the
//! `clap` Cargo feature, on by default) provides [`StoreArgs`], which parses
//! the store flags and a `list|get|set|unset|increment|decrement|clear|export`
//! subcommand. To use kvfile without clap:
//!
//! ```toml
//! kvfile = { version = "...", default-features = false }
//! ```
//!
//! # Error handling
//!
//! All fallible operations return [`StoreError`].
//! [`kind()`](StoreError::kind) sorts every variant into configuration,
//! validation, format and I/O errors.

pub mod error;
pub mod types;
pub mod xml;

mod builder;
#[cfg(feature = "clap")]
mod cli;
mod codec;
mod convert;
mod format;
mod json;
mod ops;
mod persist;
mod php;
mod store;
mod value;
mod yaml;

#[cfg(test)]
mod fixtures;

pub use builder::StoreBuilder;
#[cfg(feature = "clap")]
pub use cli::{StoreArgs, StoreSubcommand};
pub use codec::{Codec, CodecSettings, codec_for};
pub use convert::{ConvertError, to_value, validate};
pub use error::{ErrorKind, StoreError};
pub use format::Format;
pub use json::JsonCodec;
pub use ops::StoreResult;
pub use php::PhpCodec;
pub use store::Store;
pub use types::StoreAction;
pub use value::{Map, Value};
pub use xml::XmlCodec;
pub use yaml::YamlCodec;
