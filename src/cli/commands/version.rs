//! Version information display

use serde_json::json;

use crate::cli::args::{OutputFormat, VersionArgs};

/// Print the package name and version.
pub fn run(args: &VersionArgs) {
    let name = env!("CARGO_PKG_NAME");
    let version = env!("CARGO_PKG_VERSION");

    match args.format {
        OutputFormat::Human => println!("{name} {version}"),
        OutputFormat::Json => println!(
            "{}",
            json!({ "name": name, "version": version, "rust_version": env!("CARGO_PKG_RUST_VERSION") })
        ),
    }
}
