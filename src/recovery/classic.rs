// Copyright (c) 2025 The TCP-Recovery Authors.
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

use super::CongestionState;
use super::RecoveryOps;
use super::RecoveryStats;
use crate::Result;

/// Classic recovery cuts the congestion window to the slow start threshold
/// when the connection enters recovery and does nothing afterwards. It is
/// the minimal conforming policy and the comparison baseline for PRR.
#[derive(Debug, Default)]
pub struct ClassicRecovery {
    /// Recovery statistics.
    stats: RecoveryStats,
}

impl ClassicRecovery {
    pub fn new() -> Self {
        Self {
            stats: Default::default(),
        }
    }
}

impl RecoveryOps for ClassicRecovery {
    fn name(&self) -> &str {
        "CLASSIC"
    }

    fn enter_recovery(
        &mut self,
        state: &mut CongestionState,
        dup_ack_count: u64,
        sack_enabled: bool,
        unacked_bytes: u64,
    ) -> Result<()> {
        self.stats.recovery_episodes = self.stats.recovery_episodes.saturating_add(1);

        state.cwnd = state.ssthresh;
        Ok(())
    }

    fn fork(&self) -> Box<dyn RecoveryOps> {
        Box::new(ClassicRecovery::new())
    }

    fn stats(&self) -> &RecoveryStats {
        &self.stats
    }
}
