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

use std::io;
use std::path::PathBuf;
use thiserror::Error;

use crate::display::VideoPortType;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolutionParseError {
    #[error("Unknown resolution base in \"{0}\"")]
    UnknownBase(String),

    #[error("Invalid frame rate suffix in \"{0}\"")]
    InvalidRate(String),
}

#[derive(Error, Debug)]
pub enum DisplayError {
    #[error("Video port {0} is not available on this platform")]
    PortNotAvailable(VideoPortType),

    #[error("Display HAL call failed: {0}")]
    Hal(String),
}

#[derive(Error, Debug)]
pub enum ControllerError {
    #[error("Display query failed: {0}")]
    Display(#[from] DisplayError),

    #[error("Failed to apply resolution {resolution} to port {port}: {source}")]
    Apply {
        port: VideoPortType,
        resolution: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Failed to read persisted settings: {0}")]
    Persistence(anyhow::Error),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Invalid value in {path}: {value:?}")]
    InvalidValue {
        path: PathBuf,
        value: String,
    },

    #[error("Invalid display profile: {0}")]
    Profile(#[from] serde_json::Error),
}
