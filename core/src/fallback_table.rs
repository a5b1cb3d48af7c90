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

use log::debug;

use crate::region::RegionMode;
use crate::resolution::ResolutionBase;

/// Ordered list of base resolutions walked when the persisted resolution is not supported.
///
/// Built once at startup, read-only afterwards. `576p` is part of the table on EU platforms only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FallbackTable {
    bases: Vec<ResolutionBase>,
}

impl FallbackTable {
    pub fn build(region: RegionMode) -> Self {
        let bases: Vec<ResolutionBase> = ResolutionBase::MASTER_ORDER
            .iter()
            .copied()
            .filter(|base| *base != ResolutionBase::Pal576p || region.is_eu())
            .collect();
        for (i, base) in bases.iter().enumerate() {
            debug!("Fallback resolution[{}]: {}", i, base);
        }
        Self { bases }
    }

    pub fn bases(&self) -> &[ResolutionBase] {
        &self.bases
    }

    pub fn position(&self, base: ResolutionBase) -> Option<usize> {
        self.bases.iter().position(|b| *b == base)
    }

    pub fn contains(&self, base: ResolutionBase) -> bool {
        self.position(base).is_some()
    }
}

/// Builds the fallback table for a region given as a plain EU flag.
pub fn build_fallback_table(is_eu: bool) -> FallbackTable {
    FallbackTable::build(RegionMode::from_eu_flag(is_eu))
}
