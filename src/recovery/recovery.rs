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

#![allow(unused_variables)]

use core::str::FromStr;
use std::fmt;

use strum_macros::EnumIter;

use crate::Error;
use crate::RecoveryConfig;
use crate::Result;
pub use classic::ClassicRecovery;
pub use prr::PrrConfig;
pub use prr::PrrRecovery;

/// Available loss recovery algorithm
#[derive(Eq, PartialEq, Debug, Clone, Copy, Default, EnumIter)]
pub enum RecoveryAlgorithm {
    /// Classic recovery sets the congestion window directly to the slow
    /// start threshold when the connection enters recovery and leaves the
    /// pacing of retransmissions to the congestion control algorithm.
    Classic,

    /// PRR spreads retransmissions across the acks received during
    /// recovery, in proportion to the amount of data newly confirmed
    /// delivered, so that the data in flight converges smoothly toward the
    /// slow start threshold without collapsing the window or bursting.
    #[default]
    Prr,
}

impl FromStr for RecoveryAlgorithm {
    type Err = Error;

    fn from_str(algor: &str) -> Result<RecoveryAlgorithm> {
        if algor.eq_ignore_ascii_case("classic") {
            Ok(RecoveryAlgorithm::Classic)
        } else if algor.eq_ignore_ascii_case("prr") {
            Ok(RecoveryAlgorithm::Prr)
        } else {
            Err(Error::InvalidConfig("unknown".into()))
        }
    }
}

/// Bound on the per-ack send budget applied by PRR once the data in flight
/// has fallen to or below the slow start threshold.
///
/// See <https://www.rfc-editor.org/rfc/rfc6937.html#section-2>.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Default, EnumIter)]
pub enum ReductionBound {
    /// CRB strictly bounds sending to the amount of data delivered, at the
    /// cost of exiting recovery below the slow start threshold when the
    /// episode loses acks or retransmissions.
    Conservative,

    /// SSRB allows one extra segment per ack beyond the delivered amount,
    /// growing the window no faster than slow start while catching back up
    /// to the threshold.
    #[default]
    SlowStart,
}

impl FromStr for ReductionBound {
    type Err = Error;

    fn from_str(bound: &str) -> Result<ReductionBound> {
        if bound.eq_ignore_ascii_case("crb") || bound.eq_ignore_ascii_case("conservative") {
            Ok(ReductionBound::Conservative)
        } else if bound.eq_ignore_ascii_case("ssrb") || bound.eq_ignore_ascii_case("slowstart") {
            Ok(ReductionBound::SlowStart)
        } else {
            Err(Error::InvalidConfig("unknown".into()))
        }
    }
}

/// Per-connection congestion variables read and written during recovery.
///
/// The connection owns this state for its whole lifetime; recovery
/// algorithms mutate it synchronously from the lifecycle callbacks and
/// never retain a reference to it.
#[derive(Debug, Default, Clone)]
pub struct CongestionState {
    /// Congestion window in bytes. The authoritative value the sender
    /// transmits against.
    pub cwnd: u64,

    /// Slow start threshold in bytes.
    pub ssthresh: u64,

    /// Bytes sent but not yet acknowledged or known lost.
    pub bytes_in_flight: u64,

    /// Sender maximum segment size in bytes.
    pub segment_size: u64,

    /// Inflated congestion window, kept in step with `cwnd`.
    pub cwnd_inflated: u64,
}

/// Loss recovery statistics.
#[derive(Debug, Default, Clone)]
pub struct RecoveryStats {
    /// Total bytes confirmed delivered (acked or sacked) during recovery.
    pub bytes_delivered_in_recovery: u64,

    /// Total bytes transmitted during recovery.
    pub bytes_sent_in_recovery: u64,

    /// Number of recovery episodes entered.
    pub recovery_episodes: u64,
}

/// Loss recovery interfaces shared by different algorithms.
///
/// The owning connection drives one instance through
/// `enter_recovery -> {do_recovery | update_bytes_sent}* -> exit_recovery`
/// per loss episode, on the thread that processes that connection's
/// events. Instances are never shared between connections; `fork` gives a
/// duplicated connection its own counters.
pub trait RecoveryOps {
    /// Name of the recovery algorithm.
    fn name(&self) -> &str;

    /// Callback when the connection enters the recovery phase.
    ///
    /// `unacked_bytes` is the amount of data in flight at the time loss
    /// was detected. Returns an error if the algorithm's preconditions do
    /// not hold, in which case no episode state has been touched.
    fn enter_recovery(
        &mut self,
        state: &mut CongestionState,
        dup_ack_count: u64,
        sack_enabled: bool,
        unacked_bytes: u64,
    ) -> Result<()>;

    /// Callback for each ack received while the connection remains in the
    /// recovery phase. Adjusts `state.cwnd` to authorize further sending.
    fn do_recovery(
        &mut self,
        state: &mut CongestionState,
        last_acked_bytes: u64,
        last_sacked_bytes: u64,
        is_dup_ack: bool,
    ) {
    }

    /// Callback when the connection leaves the recovery phase.
    fn exit_recovery(&mut self, state: &mut CongestionState) {}

    /// Callback after new data was transmitted during recovery. Called by
    /// the sender for every transmission, independent of ack processing.
    fn update_bytes_sent(&mut self, bytes_sent: u64) {}

    /// Copy the recovery algorithm into a new, independently owned
    /// instance, for use by a connection duplicated from this one.
    fn fork(&self) -> Box<dyn RecoveryOps>;

    /// Recovery stats.
    fn stats(&self) -> &RecoveryStats;
}

impl fmt::Debug for dyn RecoveryOps {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "recovery ops.")
    }
}

/// Build a recovery ops instance.
pub fn build_recovery_ops(conf: &RecoveryConfig) -> Box<dyn RecoveryOps> {
    match conf.recovery_algorithm {
        RecoveryAlgorithm::Classic => Box::new(ClassicRecovery::new()),
        RecoveryAlgorithm::Prr => Box::new(PrrRecovery::new(PrrConfig::from(conf))),
    }
}


mod classic;
mod prr;
