// Copyright 2025 HEM Sp. z o.o.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use log::LevelFilter;
use resmgr_core::config::DEFAULT_DDC_DELAY_PATH;
use resmgr_core::region::DEFAULT_DEVICE_PROPERTIES_PATH;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn to_level_filter(&self) -> LevelFilter {
        match self {
            LogLevel::Trace => LevelFilter::Trace,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Error => LevelFilter::Error,
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogLevel::Trace => write!(f, "trace"),
            LogLevel::Debug => write!(f, "debug"),
            LogLevel::Info => write!(f, "info"),
            LogLevel::Warn => write!(f, "warn"),
            LogLevel::Error => write!(f, "error"),
        }
    }
}

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Set the log level
    #[arg(short, long, value_enum, default_value_t = LogLevel::Info, global = true)]
    pub log_level: LogLevel,

    /// Write the log to this file as well as to the console
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Pick a resolution for a persisted name and a list of sink resolutions
    Select {
        /// Persisted resolution name, e.g. 1080p50
        #[arg(short, long)]
        persisted: String,

        /// Resolutions advertised by the sink, comma separated
        #[arg(short, long, value_delimiter = ',')]
        supported: Vec<String>,

        /// Use the EU fallback table
        #[arg(long)]
        eu: bool,
    },

    /// Run the resolution service against a simulated display
    Run {
        /// JSON display profile
        #[arg(short, long)]
        profile: PathBuf,

        /// Platform properties file deciding the region
        #[arg(long, default_value = DEFAULT_DEVICE_PROPERTIES_PATH)]
        device_properties: PathBuf,

        /// File holding the DDC retry count
        #[arg(long, default_value = DEFAULT_DDC_DELAY_PATH)]
        ddc_delay: PathBuf,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn select_arguments() {
        let cli = Cli::try_parse_from([
            "resmgr_service", "select", "--persisted", "1080p50", "--supported", "720p,1080i,1080p60", "--eu",
        ])
        .unwrap();
        assert_eq!(cli.log_level, LogLevel::Info);
        match cli.command {
            Commands::Select { persisted, supported, eu } => {
                assert_eq!(persisted, "1080p50");
                assert_eq!(supported, vec!["720p", "1080i", "1080p60"]);
                assert!(eu);
            }
            Commands::Run { .. } => panic!("expected select"),
        }
    }

    #[test]
    fn run_arguments_with_defaults() {
        let cli = Cli::try_parse_from(["resmgr_service", "run", "--profile", "tv.json", "--log-level", "debug"]).unwrap();
        assert_eq!(cli.log_level, LogLevel::Debug);
        assert!(cli.log_file.is_none());
        match cli.command {
            Commands::Run { profile, device_properties, ddc_delay } => {
                assert_eq!(profile, PathBuf::from("tv.json"));
                assert_eq!(device_properties, PathBuf::from(DEFAULT_DEVICE_PROPERTIES_PATH));
                assert_eq!(ddc_delay, PathBuf::from(DEFAULT_DDC_DELAY_PATH));
            }
            Commands::Select { .. } => panic!("expected run"),
        }
    }

    #[test]
    fn invalid_log_level_is_rejected() {
        assert!(Cli::try_parse_from(["resmgr_service", "--log-level", "loud", "run", "--profile", "a.json"]).is_err());
    }
}
