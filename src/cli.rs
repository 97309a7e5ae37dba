//! Clap adapter for kvfile.
//!
//! This module is the optional integration layer between the store and the
//! [clap](https://docs.rs/clap) CLI parser. It is compiled only when the
//! `clap` Cargo feature is enabled (on by default).
//!
//! [`StoreArgs`] carries both halves a command line needs: the flags that
//! open a store (`--file`, `--type`, `--root`, `--escape-slashes`) and an
//! optional [`StoreSubcommand`]. [`StoreArgs::builder()`] turns the flags
//! into a [`StoreBuilder`]; [`StoreArgs::into_action()`] turns the
//! subcommand into a [`StoreAction`] for [`Store::handle`](crate::Store::handle).
//!
//! Without clap, construct [`StoreAction`] values directly.

use std::path::PathBuf;

use clap::{Args, Subcommand};

use crate::builder::StoreBuilder;
use crate::error::StoreError;
use crate::format::Format;
use crate::types::StoreAction;

/// Clap-derived args for a store command group.
///
/// Embed this into your app's clap derive:
/// ```ignore
/// #[derive(Parser)]
/// struct Cli {
///     #[command(flatten)]
///     store: StoreArgs,
/// }
/// ```
#[derive(Debug, Args)]
pub struct StoreArgs {
    /// Settings file to read and write.
    #[arg(long, short, global = true)]
    pub file: Option<PathBuf>,

    /// Store type: json, xml, yml or php. Defaults to the file extension.
    #[arg(long = "type", value_name = "TYPE", global = true)]
    pub store_type: Option<String>,

    /// Root element name for XML files.
    #[arg(long, default_value = "root", global = true)]
    pub root: String,

    /// Escape forward slashes in JSON output.
    #[arg(long, global = true)]
    pub escape_slashes: bool,

    #[command(subcommand)]
    pub action: Option<StoreSubcommand>,
}

/// Available store subcommands.
#[derive(Debug, Subcommand)]
pub enum StoreSubcommand {
    /// Show every key-value pair, nested keys dotted.
    List,
    /// Show the value of a key.
    Get {
        /// Key, dotted for nested values (e.g. "database.url").
        key: String,
    },
    /// Set a key and save.
    Set {
        /// Key, dotted for nested values (e.g. "database.url").
        key: String,
        /// Value; numbers, booleans, null and JSON lists or objects are typed.
        #[arg(allow_hyphen_values = true)]
        value: String,
    },
    /// Remove a key and save.
    Unset {
        key: String,
    },
    /// Add to an integer counter and save.
    Increment {
        key: String,
        #[arg(long, default_value_t = 1, allow_negative_numbers = true)]
        by: i64,
    },
    /// Subtract from an integer counter and save.
    Decrement {
        key: String,
        #[arg(long, default_value_t = 1, allow_negative_numbers = true)]
        by: i64,
    },
    /// Remove every key and save.
    Clear,
    /// Print the whole store in another format.
    Export {
        /// Output type: json, xml, yml or php.
        #[arg(value_parser = parse_format)]
        format: Format,
        #[arg(long)]
        pretty: bool,
    },
}

fn parse_format(name: &str) -> Result<Format, String> {
    name.parse().map_err(|e: StoreError| e.to_string())
}

impl StoreArgs {
    /// A builder configured from the store flags.
    pub fn builder(&self) -> StoreBuilder {
        let mut builder = StoreBuilder::new()
            .root(&self.root)
            .escape_slashes(self.escape_slashes);
        if let Some(file) = &self.file {
            builder = builder.file(file);
        }
        if let Some(name) = &self.store_type {
            builder = builder.format_name(name);
        }
        builder
    }

    /// Convert clap-parsed args into a framework-agnostic `StoreAction`.
    ///
    /// No subcommand and explicit `list` both map to `StoreAction::List`.
    pub fn into_action(self) -> StoreAction {
        match self.action {
            None | Some(StoreSubcommand::List) => StoreAction::List,
            Some(StoreSubcommand::Get { key }) => StoreAction::Get { key },
            Some(StoreSubcommand::Set { key, value }) => StoreAction::Set { key, value },
            Some(StoreSubcommand::Unset { key }) => StoreAction::Unset { key },
            Some(StoreSubcommand::Increment { key, by }) => StoreAction::Increment { key, by },
            Some(StoreSubcommand::Decrement { key, by }) => StoreAction::Decrement { key, by },
            Some(StoreSubcommand::Clear) => StoreAction::Clear,
            Some(StoreSubcommand::Export { format, pretty }) => {
                StoreAction::Export { format, pretty }
            }
        }
    }
}
