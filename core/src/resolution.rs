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

use std::fmt;
use std::num::NonZeroU32;
use std::str::FromStr;

use crate::errors::ResolutionParseError;

/// Progressive frame rate used on US platforms and for secondary (60 Hz) candidates.
pub const DEFAULT_PROGRESSIVE_FPS: u32 = 60;
/// Progressive frame rate preferred on EU platforms.
pub const EU_PROGRESSIVE_FPS: u32 = 50;
/// Interlaced field rate preferred on EU platforms.
pub const EU_INTERLACED_FPS: u32 = 25;

/// Resolution used when nothing better is known (platform default).
pub const PLATFORM_DEFAULT_RESOLUTION: &str = "720p";
/// Resolution tried when even the platform default is not supported.
pub const LAST_RESORT_RESOLUTION: &str = "480p";

/// Base resolution without frame rate, e.g. `1080p` or `1080i`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ResolutionBase {
    Ntsc480p,
    Pal576p,
    Hd720p,
    Fhd1080i,
    Fhd1080p,
    Uhd2160p,
}

impl ResolutionBase {
    /// Master fallback order, highest resolution first.
    pub const MASTER_ORDER: [ResolutionBase; 6] = [
        ResolutionBase::Uhd2160p,
        ResolutionBase::Fhd1080p,
        ResolutionBase::Fhd1080i,
        ResolutionBase::Hd720p,
        ResolutionBase::Pal576p,
        ResolutionBase::Ntsc480p,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ResolutionBase::Ntsc480p => "480p",
            ResolutionBase::Pal576p => "576p",
            ResolutionBase::Hd720p => "720p",
            ResolutionBase::Fhd1080i => "1080i",
            ResolutionBase::Fhd1080p => "1080p",
            ResolutionBase::Uhd2160p => "2160p",
        }
    }

    /// Normalizes any resolution name to its base.
    ///
    /// The numeric prefix of the name is kept and the scan letter is `i` when the name contains
    /// an `i` anywhere, `p` otherwise. So `1080p60` becomes `1080p` and `1080i25` becomes `1080i`.
    /// Returns `None` when the normalized form is not one of the known bases.
    pub fn normalize(name: &str) -> Option<ResolutionBase> {
        let digits_end = name
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(name.len());
        let digits = &name[..digits_end];
        if digits.is_empty() {
            return None;
        }
        let letter = if name.contains('i') {
            'i'
        } else if name.contains('p') {
            'p'
        } else {
            return None;
        };
        Self::from_parts(digits, letter)
    }

    fn from_parts(digits: &str, letter: char) -> Option<ResolutionBase> {
        match (digits, letter) {
            ("480", 'p') => Some(ResolutionBase::Ntsc480p),
            ("576", 'p') => Some(ResolutionBase::Pal576p),
            ("720", 'p') => Some(ResolutionBase::Hd720p),
            ("1080", 'i') => Some(ResolutionBase::Fhd1080i),
            ("1080", 'p') => Some(ResolutionBase::Fhd1080p),
            ("2160", 'p') => Some(ResolutionBase::Uhd2160p),
            _ => None,
        }
    }

    /// Secondary candidate tried on EU platforms when the persisted name is not supported.
    ///
    /// 50 Hz content falls back to the same picture size at 60 Hz. 30, 25 and 24 Hz variants are
    /// never proposed.
    pub fn secondary(&self) -> Option<ResolutionName> {
        match self {
            ResolutionBase::Hd720p => Some(ResolutionName::new(*self, None)),
            ResolutionBase::Fhd1080p => Some(ResolutionName::with_rate(*self, DEFAULT_PROGRESSIVE_FPS)),
            ResolutionBase::Fhd1080i => Some(ResolutionName::new(*self, None)),
            ResolutionBase::Uhd2160p => Some(ResolutionName::with_rate(*self, DEFAULT_PROGRESSIVE_FPS)),
            ResolutionBase::Ntsc480p | ResolutionBase::Pal576p => None,
        }
    }

    /// Fallback candidate rated for EU platforms: `2160p50`, `1080p50`, `720p50`, `1080i25`.
    pub fn eu_rated(&self) -> ResolutionName {
        match self {
            ResolutionBase::Uhd2160p | ResolutionBase::Fhd1080p | ResolutionBase::Hd720p => {
                ResolutionName::with_rate(*self, EU_PROGRESSIVE_FPS)
            }
            ResolutionBase::Fhd1080i => ResolutionName::with_rate(*self, EU_INTERLACED_FPS),
            ResolutionBase::Pal576p | ResolutionBase::Ntsc480p => ResolutionName::new(*self, None),
        }
    }

    /// Fallback candidate rated for US platforms: `2160p60`, `1080p60`, everything else unsuffixed.
    pub fn us_rated(&self) -> ResolutionName {
        match self {
            ResolutionBase::Uhd2160p | ResolutionBase::Fhd1080p => {
                ResolutionName::with_rate(*self, DEFAULT_PROGRESSIVE_FPS)
            }
            _ => ResolutionName::new(*self, None),
        }
    }
}

impl fmt::Display for ResolutionBase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResolutionBase {
    type Err = ResolutionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ResolutionBase::MASTER_ORDER
            .iter()
            .copied()
            .find(|base| base.as_str() == s)
            .ok_or_else(|| ResolutionParseError::UnknownBase(s.to_string()))
    }
}

/// A resolution identifier: known base plus optional frame rate, e.g. `1080p60`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResolutionName {
    base: ResolutionBase,
    rate: Option<NonZeroU32>,
}

impl ResolutionName {
    pub fn new(base: ResolutionBase, rate: Option<NonZeroU32>) -> Self {
        Self { base, rate }
    }

    /// Builds a name with a frame rate. A zero rate yields the unsuffixed name.
    pub fn with_rate(base: ResolutionBase, rate: u32) -> Self {
        Self { base, rate: NonZeroU32::new(rate) }
    }

    pub fn base(&self) -> ResolutionBase {
        self.base
    }

    pub fn rate(&self) -> Option<u32> {
        self.rate.map(NonZeroU32::get)
    }
}

impl fmt::Display for ResolutionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.rate {
            Some(rate) => write!(f, "{}{}", self.base, rate),
            None => write!(f, "{}", self.base),
        }
    }
}

impl FromStr for ResolutionName {
    type Err = ResolutionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let letter_pos = s
            .find(['i', 'p'])
            .ok_or_else(|| ResolutionParseError::UnknownBase(s.to_string()))?;
        let (base, suffix) = s.split_at(letter_pos + 1);
        let base: ResolutionBase = base.parse()?;
        if suffix.is_empty() {
            return Ok(ResolutionName::new(base, None));
        }
        if !suffix.bytes().all(|b| b.is_ascii_digit()) || suffix.starts_with('0') {
            return Err(ResolutionParseError::InvalidRate(s.to_string()));
        }
        let rate = suffix
            .parse::<NonZeroU32>()
            .map_err(|_| ResolutionParseError::InvalidRate(s.to_string()))?;
        Ok(ResolutionName::new(base, Some(rate)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_base_and_rate() {
        let name: ResolutionName = "1080p60".parse().unwrap();
        assert_eq!(name.base(), ResolutionBase::Fhd1080p);
        assert_eq!(name.rate(), Some(60));
        assert_eq!(name.to_string(), "1080p60");

        let name: ResolutionName = "720p".parse().unwrap();
        assert_eq!(name.base(), ResolutionBase::Hd720p);
        assert_eq!(name.rate(), None);
        assert_eq!(name.to_string(), "720p");

        let name: ResolutionName = "1080i25".parse().unwrap();
        assert_eq!(name.base(), ResolutionBase::Fhd1080i);
        assert_eq!(name.rate(), Some(25));
    }

    #[test]
    fn rejects_unknown_base_and_bad_rate() {
        assert!(matches!("900p".parse::<ResolutionName>(), Err(ResolutionParseError::UnknownBase(_))));
        assert!(matches!("p60".parse::<ResolutionName>(), Err(ResolutionParseError::UnknownBase(_))));
        assert!(matches!("1366x768".parse::<ResolutionName>(), Err(ResolutionParseError::UnknownBase(_))));
        assert!(matches!("1080p0".parse::<ResolutionName>(), Err(ResolutionParseError::InvalidRate(_))));
        assert!(matches!("1080p6x".parse::<ResolutionName>(), Err(ResolutionParseError::InvalidRate(_))));
    }

    #[test]
    fn normalize_keeps_numeric_prefix_and_scan_letter() {
        assert_eq!(ResolutionBase::normalize("1080p60"), Some(ResolutionBase::Fhd1080p));
        assert_eq!(ResolutionBase::normalize("1080i"), Some(ResolutionBase::Fhd1080i));
        assert_eq!(ResolutionBase::normalize("1080i25"), Some(ResolutionBase::Fhd1080i));
        assert_eq!(ResolutionBase::normalize("2160p50"), Some(ResolutionBase::Uhd2160p));
        assert_eq!(ResolutionBase::normalize("480i"), None);
        assert_eq!(ResolutionBase::normalize("garbage"), None);
        assert_eq!(ResolutionBase::normalize(""), None);
        assert_eq!(ResolutionBase::normalize(" 1080p"), None);
    }

    #[test]
    fn secondary_mapping_ignores_persisted_rate() {
        assert_eq!(ResolutionBase::Hd720p.secondary().map(|n| n.to_string()), Some("720p".into()));
        assert_eq!(ResolutionBase::Fhd1080p.secondary().map(|n| n.to_string()), Some("1080p60".into()));
        assert_eq!(ResolutionBase::Fhd1080i.secondary().map(|n| n.to_string()), Some("1080i".into()));
        assert_eq!(ResolutionBase::Uhd2160p.secondary().map(|n| n.to_string()), Some("2160p60".into()));
        assert_eq!(ResolutionBase::Pal576p.secondary(), None);
        assert_eq!(ResolutionBase::Ntsc480p.secondary(), None);
    }

    #[test]
    fn rated_candidates() {
        let eu: Vec<String> = ResolutionBase::MASTER_ORDER.iter().map(|b| b.eu_rated().to_string()).collect();
        assert_eq!(eu, vec!["2160p50", "1080p50", "1080i25", "720p50", "576p", "480p"]);
        let us: Vec<String> = ResolutionBase::MASTER_ORDER.iter().map(|b| b.us_rated().to_string()).collect();
        assert_eq!(us, vec!["2160p60", "1080p60", "1080i", "720p", "576p", "480p"]);
    }
}
