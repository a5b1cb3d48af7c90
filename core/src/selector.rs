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

use log::debug;

use crate::fallback_table::FallbackTable;
use crate::region::RegionMode;
use crate::resolution::{ResolutionBase, LAST_RESORT_RESOLUTION, PLATFORM_DEFAULT_RESOLUTION};

/// Which rule of the selection policy produced a decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionStep {
    /// The persisted resolution is supported as-is.
    Exact,
    /// EU only: same picture size at the 60 Hz (or unsuffixed) rate.
    Secondary,
    /// Next lower base from the fallback table.
    Fallback,
    /// Literal `720p`.
    PlatformDefault,
    /// Literal `480p`.
    LastResort,
    /// First resolution the display reports.
    AnyAvailable,
}

impl fmt::Display for SelectionStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SelectionStep::Exact => "exact",
            SelectionStep::Secondary => "secondary",
            SelectionStep::Fallback => "fallback",
            SelectionStep::PlatformDefault => "platform-default",
            SelectionStep::LastResort => "last-resort",
            SelectionStep::AnyAvailable => "any-available",
        };
        f.write_str(s)
    }
}

/// Outcome of a successful selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolutionDecision {
    /// Name of the chosen entry, exactly as the display reported it.
    pub resolution: String,
    /// Index of the chosen entry in the supported list.
    pub index: usize,
    /// Passed verbatim to the resolution applier.
    pub force_compatible: bool,
    pub step: SelectionStep,
}

impl ResolutionDecision {
    fn new(resolution: &str, index: usize, step: SelectionStep) -> Self {
        Self {
            resolution: resolution.to_string(),
            index,
            force_compatible: true,
            step,
        }
    }
}

/// Picks the resolution to apply to a display from its EDID resolution list.
///
/// Holds only the region and the fallback table derived from it. Both are fixed at construction,
/// so a selector can be shared freely between tasks.
#[derive(Debug, Clone)]
pub struct ResolutionSelector {
    region: RegionMode,
    table: FallbackTable,
}

impl ResolutionSelector {
    pub fn new(region: RegionMode) -> Self {
        Self {
            region,
            table: FallbackTable::build(region),
        }
    }

    pub fn region(&self) -> RegionMode {
        self.region
    }

    pub fn fallback_table(&self) -> &FallbackTable {
        &self.table
    }

    /// Selects the resolution to apply given the persisted preference and the supported list.
    ///
    /// Rules, first hit wins:
    /// 1. exact persisted name,
    /// 2. EU only, the secondary candidate of the persisted base,
    /// 3. walk the fallback table below the persisted base, EU-rated candidate first, then US-rated,
    /// 4. `720p`,
    /// 5. `480p`,
    /// 6. the first supported entry.
    ///
    /// Every search prefers the last matching entry of `supported`. Returns `None` only when
    /// `supported` is empty.
    pub fn select<S: AsRef<str>>(&self, persisted: &str, supported: &[S]) -> Option<ResolutionDecision> {
        if supported.is_empty() {
            return None;
        }

        if let Some(index) = find_last(supported, persisted) {
            debug!("Got platform resolution - {}", persisted);
            return Some(ResolutionDecision::new(persisted, index, SelectionStep::Exact));
        }

        let persisted_base = ResolutionBase::normalize(persisted);

        if self.region.is_eu() {
            if let Some(secondary) = persisted_base.and_then(|base| base.secondary()) {
                let secondary = secondary.to_string();
                debug!("Secondary resolution for {}: {}", persisted, secondary);
                if let Some(index) = find_last(supported, &secondary) {
                    debug!("Got secondary resolution - {}", secondary);
                    return Some(ResolutionDecision::new(&secondary, index, SelectionStep::Secondary));
                }
            }
        }

        if let Some(decision) = self.walk_fallback_table(persisted_base, supported) {
            return Some(decision);
        }

        if let Some(index) = find_last(supported, PLATFORM_DEFAULT_RESOLUTION) {
            debug!("Got default platform resolution - {}", PLATFORM_DEFAULT_RESOLUTION);
            return Some(ResolutionDecision::new(PLATFORM_DEFAULT_RESOLUTION, index, SelectionStep::PlatformDefault));
        }

        if let Some(index) = find_last(supported, LAST_RESORT_RESOLUTION) {
            debug!("Default to {} resolution", LAST_RESORT_RESOLUTION);
            return Some(ResolutionDecision::new(LAST_RESORT_RESOLUTION, index, SelectionStep::LastResort));
        }

        let first = supported[0].as_ref();
        debug!("Using any TV supported resolution as final fallback: {}", first);
        Some(ResolutionDecision::new(first, 0, SelectionStep::AnyAvailable))
    }

    fn walk_fallback_table<S: AsRef<str>>(
        &self,
        persisted_base: Option<ResolutionBase>,
        supported: &[S],
    ) -> Option<ResolutionDecision> {
        // An unknown base behaves as if it sat at the top of the table.
        let start = persisted_base
            .and_then(|base| self.table.position(base))
            .unwrap_or(0);

        for base in self.table.bases().iter().skip(start + 1) {
            let mut candidates = Vec::with_capacity(2);
            if self.region.is_eu() {
                candidates.push(base.eu_rated().to_string());
            }
            candidates.push(base.us_rated().to_string());

            for candidate in candidates {
                debug!("Check next resolution: {}", candidate);
                if let Some(index) = find_last(supported, &candidate) {
                    debug!("Got next best resolution - {}", candidate);
                    return Some(ResolutionDecision::new(&candidate, index, SelectionStep::Fallback));
                }
            }
        }
        None
    }
}

/// Selects with a throwaway selector. Prefer keeping a [`ResolutionSelector`] around.
pub fn select_resolution<S: AsRef<str>>(persisted: &str, supported: &[S], is_eu: bool) -> Option<ResolutionDecision> {
    ResolutionSelector::new(RegionMode::from_eu_flag(is_eu)).select(persisted, supported)
}

fn find_last<S: AsRef<str>>(supported: &[S], name: &str) -> Option<usize> {
    supported.iter().rposition(|entry| entry.as_ref() == name)
}
