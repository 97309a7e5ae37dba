//! # kvfile demo application
//!
//! A small CLI over a single settings file, showing how to wire
//! [`StoreArgs`] into a clap application. It exists to demonstrate and
//! manually verify kvfile's features.
//!
//! ## Running
//!
//! ```sh
//! cargo run --example kvfile_demo -- --file demo.yml set server.port 8080
//! cargo run --example kvfile_demo -- --file demo.yml list
//! ```
//!
//! ## Features demonstrated
//!
//! | Feature               | How to exercise it                                              |
//! |-----------------------|-----------------------------------------------------------------|
//! | Format by extension   | `--file demo.xml set a 1`, then look at `demo.xml`              |
//! | Explicit type         | `--file demo.conf --type php set a 1`                           |
//! | Typed values          | `set tags '["a","b"]'`, `set debug true`, `set ratio 0.5`       |
//! | Nested keys           | `set server.port 8080`, then `get server.port`                  |
//! | Counters              | `increment runs`, `decrement runs --by 5`                       |
//! | Export                | `export xml --pretty`                                           |
//! | XML root element      | `--file demo.xml --root settings set a 1`                       |
//! | Slash escaping        | `--file demo.json --escape-slashes set url http://x/y`          |
//! | In-memory store       | omit `--file`; mutations report "(not saved)"                   |

use clap::Parser;

use kvfile::StoreArgs;

/// kvfile demo: read and write a settings file from the command line.
#[derive(Parser, Debug)]
#[command(name = "kvfile-demo")]
struct Cli {
    #[command(flatten)]
    store: StoreArgs,
}

fn main() {
    let cli = Cli::parse();

    let mut store = cli.store.builder().open().unwrap_or_else(|e| {
        eprintln!("Failed to open store:\n{e}");
        std::process::exit(1);
    });

    let action = cli.store.into_action();
    match store.handle(&action) {
        Ok(result) => println!("{result}"),
        Err(e) => {
            eprintln!("Store error:\n{e}");
            std::process::exit(1);
        }
    }
}
