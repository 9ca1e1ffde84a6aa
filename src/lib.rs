//! Common functionality for gridcast, a multi-year electricity scenario engine.
//!
//! A scenario projects demand in each region, evolves technology costs along learning curves,
//! dispatches generation in merit order and accounts for the resulting emissions, one year at a
//! time. Two scenarios can then be compared.
#![warn(missing_docs)]
use std::path::PathBuf;

pub mod cli;
pub mod comparison;
pub mod config;
pub mod cost;
pub mod demand;
pub mod dispatch;
pub mod emissions;
pub mod error;
pub mod finance;
pub mod id;
pub mod input;
pub mod log;
pub mod output;
pub mod random;
pub mod region;
pub mod renewable;
pub mod settings;
pub mod simulation;
pub mod storage;
pub mod technology;
pub mod units;

#[cfg(test)]
mod fixture;

/// Get the config dir for the program
pub fn get_gridcast_config_dir() -> PathBuf {
    let Some(mut config_dir) = dirs::config_dir() else {
        // No config dir on this platform, so use the working directory
        return PathBuf::new();
    };
    config_dir.push("gridcast");

    config_dir
}
