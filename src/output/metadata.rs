//! Code for writing metadata to file
use anyhow::Result;
use chrono::prelude::*;
use serde::Serialize;
use std::fs;
use std::path::Path;

/// The output file name for metadata
const METADATA_FILE_NAME: &str = "metadata.toml";

#[derive(Serialize)]
struct Metadata<'a> {
    run: RunMetadata<'a>,
    program: ProgramMetadata<'a>,
}

/// A scenario file which was run, with the seed it used
#[derive(Serialize)]
struct ScenarioMetadata<'a> {
    /// Path to the scenario file
    path: &'a Path,
    /// The base seed for random variation
    seed: u64,
}

/// Information about the run
#[derive(Serialize)]
struct RunMetadata<'a> {
    /// The date and time on which the run started
    datetime: String,
    /// The scenarios which were run
    scenarios: Vec<ScenarioMetadata<'a>>,
}

impl<'a> RunMetadata<'a> {
    fn new(scenarios: &[(&'a Path, u64)]) -> Self {
        Self {
            datetime: Local::now().to_rfc2822(),
            scenarios: scenarios
                .iter()
                .map(|&(path, seed)| ScenarioMetadata { path, seed })
                .collect(),
        }
    }
}

#[derive(Serialize)]
struct ProgramMetadata<'a> {
    /// The program name
    name: &'a str,
    /// The program version as specified in Cargo.toml
    version: &'a str,
    /// Whether it is a debug build
    is_debug: bool,
}

impl Default for ProgramMetadata<'_> {
    fn default() -> Self {
        Self {
            name: env!("CARGO_PKG_NAME"),
            version: env!("CARGO_PKG_VERSION"),
            is_debug: cfg!(debug_assertions),
        }
    }
}

/// Write metadata to the specified output path in TOML format.
///
/// `scenarios` lists the path of each scenario file that was run, along with its seed.
pub fn write_metadata(output_path: &Path, scenarios: &[(&Path, u64)]) -> Result<()> {
    let metadata = Metadata {
        run: RunMetadata::new(scenarios),
        program: ProgramMetadata::default(),
    };
    let file_path = output_path.join(METADATA_FILE_NAME);
    fs::write(&file_path, toml::to_string(&metadata)?)?;

    Ok(())
}
