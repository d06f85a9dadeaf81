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

use log::*;

use super::CongestionState;
use super::RecoveryOps;
use super::RecoveryStats;
use super::ReductionBound;
use crate::Error;
use crate::RecoveryConfig;
use crate::Result;

/// Prr Configuration.
#[derive(Debug, Clone)]
pub struct PrrConfig {
    /// Bound on the send budget once the data in flight has fallen to or
    /// below the slow start threshold.
    reduction_bound: ReductionBound,
}

impl PrrConfig {
    pub fn from(conf: &RecoveryConfig) -> Self {
        Self {
            reduction_bound: conf.reduction_bound,
        }
    }

    /// Update the reduction bound.
    fn set_reduction_bound(&mut self, reduction_bound: ReductionBound) -> &mut Self {
        self.reduction_bound = reduction_bound;
        self
    }
}

impl Default for PrrConfig {
    fn default() -> Self {
        Self {
            reduction_bound: ReductionBound::SlowStart,
        }
    }
}

/// Proportional Rate Reduction algorithm.
///
/// PRR spreads retransmissions across the acks received during a loss
/// recovery episode, in proportion to the amount of data each ack confirms
/// delivered, so that the data in flight converges toward the slow start
/// threshold without collapsing the window or bursting.
///
/// See <https://www.rfc-editor.org/rfc/rfc6937.html>.
#[derive(Debug, Clone)]
pub struct PrrRecovery {
    /// Configuration.
    config: PrrConfig,

    /// Bytes confirmed delivered (acked or sacked) since the current
    /// episode began.
    prr_delivered: u64,

    /// Bytes transmitted since the current episode began.
    prr_out: u64,

    /// Unacknowledged bytes in flight when the current episode began.
    recovery_flight_size: u64,

    /// Cumulative sacked bytes reported by the last processed ack.
    previous_sacked_bytes: u64,

    /// Duplicate acks seen since the last cumulative ack.
    dup_ack_count: u64,

    /// Whether the peer reports selective acknowledgments.
    sack_enabled: bool,

    /// Recovery statistics.
    stats: RecoveryStats,
}

impl PrrRecovery {
    pub fn new(config: PrrConfig) -> Self {
        Self {
            config,
            prr_delivered: 0,
            prr_out: 0,
            recovery_flight_size: 0,
            previous_sacked_bytes: 0,
            dup_ack_count: 0,
            sack_enabled: false,
            stats: Default::default(),
        }
    }

    /// Bytes newly confirmed delivered by the current ack.
    ///
    /// With SACK the delta of the cumulative sacked total can be negative
    /// when previously sacked ranges are renumbered or discarded, so the
    /// sum is clamped at zero. Without SACK each duplicate ack is credited
    /// one segment, and the credit is charged back against the next
    /// cumulative ack.
    fn delivered_bytes(
        &mut self,
        state: &CongestionState,
        last_acked_bytes: u64,
        last_sacked_bytes: u64,
        is_dup_ack: bool,
    ) -> u64 {
        if self.sack_enabled {
            let change_in_sacked_bytes =
                last_sacked_bytes as i64 - self.previous_sacked_bytes as i64;
            self.previous_sacked_bytes = last_sacked_bytes;
            (last_acked_bytes as i64 + change_in_sacked_bytes).max(0) as u64
        } else if is_dup_ack {
            self.dup_ack_count = self.dup_ack_count.saturating_add(1);
            state.segment_size
        } else {
            let bytes_acked = self.dup_ack_count.saturating_mul(state.segment_size);
            self.dup_ack_count = 0;
            last_acked_bytes.saturating_sub(bytes_acked)
        }
    }
}

impl RecoveryOps for PrrRecovery {
    fn name(&self) -> &str {
        "PRR"
    }

    fn enter_recovery(
        &mut self,
        state: &mut CongestionState,
        dup_ack_count: u64,
        sack_enabled: bool,
        unacked_bytes: u64,
    ) -> Result<()> {
        if !sack_enabled {
            return Err(Error::InvalidConfig(
                "prr recovery requires sack support".into(),
            ));
        }

        self.prr_out = 0;
        self.prr_delivered = 0;
        self.sack_enabled = sack_enabled;
        self.recovery_flight_size = unacked_bytes;
        self.stats.recovery_episodes = self.stats.recovery_episodes.saturating_add(1);

        // A zero delta step, so that the floor below forces the first
        // retransmission out before any ack arrives.
        self.do_recovery(state, 0, 0, false);
        Ok(())
    }

    fn do_recovery(
        &mut self,
        state: &mut CongestionState,
        last_acked_bytes: u64,
        last_sacked_bytes: u64,
        is_dup_ack: bool,
    ) {
        let last_delivered_bytes =
            self.delivered_bytes(state, last_acked_bytes, last_sacked_bytes, is_dup_ack);

        self.prr_delivered = self.prr_delivered.saturating_add(last_delivered_bytes);
        self.stats.bytes_delivered_in_recovery = self
            .stats
            .bytes_delivered_in_recovery
            .saturating_add(last_delivered_bytes);

        let mut send_count = if state.bytes_in_flight > state.ssthresh {
            // Still above the target window: release data in proportion to
            // what was delivered, against the flight size snapshot.
            //  sndcnt = CEIL(prr_delivered * ssthresh / RecoverFS) - prr_out
            if self.recovery_flight_size > 0 {
                let target = self
                    .prr_delivered
                    .saturating_mul(state.ssthresh)
                    .saturating_add(self.recovery_flight_size - 1)
                    / self.recovery_flight_size;
                target.saturating_sub(self.prr_out)
            } else {
                0
            }
        } else {
            // At or below the target window: catch back up to ssthresh, as
            // permitted by the configured reduction bound.
            let limit = match self.config.reduction_bound {
                ReductionBound::Conservative => self.prr_delivered.saturating_sub(self.prr_out),
                ReductionBound::SlowStart => self
                    .prr_delivered
                    .saturating_sub(self.prr_out)
                    .max(last_delivered_bytes)
                    .saturating_add(state.segment_size),
            };
            limit.min(state.ssthresh.saturating_sub(state.bytes_in_flight))
        };

        // Force a fast retransmit upon entering fast recovery.
        if self.prr_out == 0 {
            send_count = send_count.max(state.segment_size);
        }

        state.cwnd = state.bytes_in_flight.saturating_add(send_count);
        state.cwnd_inflated = state.cwnd;

        trace!(
            "{}. DO_RECOVERY. last_delivered = {}, prr_delivered = {}, prr_out = {}, send_count = {}, cwnd = {}",
            self.name(),
            last_delivered_bytes,
            self.prr_delivered,
            self.prr_out,
            send_count,
            state.cwnd,
        );
    }

    fn exit_recovery(&mut self, state: &mut CongestionState) {
        state.cwnd = state.ssthresh;
        state.cwnd_inflated = state.cwnd;
    }

    fn update_bytes_sent(&mut self, bytes_sent: u64) {
        self.prr_out = self.prr_out.saturating_add(bytes_sent);
        self.stats.bytes_sent_in_recovery = self
            .stats
            .bytes_sent_in_recovery
            .saturating_add(bytes_sent);
    }

    fn fork(&self) -> Box<dyn RecoveryOps> {
        Box::new(self.clone())
    }

    fn stats(&self) -> &RecoveryStats {
        &self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SEGMENT_SIZE: u64 = crate::DEFAULT_SEGMENT_SIZE;

    fn recovery_state() -> CongestionState {
        // 15 segments in flight, target window of 10 segments.
        CongestionState {
            cwnd: 21900,
            ssthresh: 14600,
            bytes_in_flight: 21900,
            segment_size: SEGMENT_SIZE,
            cwnd_inflated: 21900,
        }
    }

    #[test]
    fn prr_init() {
        let r = PrrRecovery::new(PrrConfig::default());
        assert_eq!(r.name(), "PRR");
        assert_eq!(r.prr_delivered, 0);
        assert_eq!(r.prr_out, 0);
        assert_eq!(r.stats().recovery_episodes, 0);
    }

    #[test]
    fn prr_new_config() {
        let mut config = PrrConfig::default();
        assert_eq!(config.reduction_bound, ReductionBound::SlowStart);

        config.set_reduction_bound(ReductionBound::Conservative);
        assert_eq!(config.reduction_bound, ReductionBound::Conservative);

        let conf = RecoveryConfig {
            reduction_bound: ReductionBound::Conservative,
            ..RecoveryConfig::default()
        };
        let config = PrrConfig::from(&conf);
        assert_eq!(config.reduction_bound, ReductionBound::Conservative);
    }

    #[test]
    fn prr_enter_recovery_requires_sack() {
        let mut r = PrrRecovery::new(PrrConfig::default());
        let mut state = recovery_state();

        let err = r.enter_recovery(&mut state, 3, false, 21900);
        assert_eq!(
            err,
            Err(Error::InvalidConfig("prr recovery requires sack support".into()))
        );

        // A failed entry leaves no episode state behind.
        assert_eq!(r.recovery_flight_size, 0);
        assert_eq!(r.stats().recovery_episodes, 0);
        assert_eq!(state.cwnd, 21900);
    }

    #[test]
    fn prr_enter_recovery_forces_retransmit() {
        let mut r = PrrRecovery::new(PrrConfig::default());
        let mut state = recovery_state();

        r.enter_recovery(&mut state, 0, true, 21900).unwrap();

        // Nothing was delivered yet, so the proportional budget is zero,
        // but the floor guarantees one segment for the fast retransmit.
        assert_eq!(r.prr_delivered, 0);
        assert_eq!(r.prr_out, 0);
        assert_eq!(state.cwnd, 21900 + SEGMENT_SIZE);
        assert_eq!(state.cwnd_inflated, state.cwnd);
        assert_eq!(r.stats().recovery_episodes, 1);
    }

    #[test]
    fn prr_proportional_reduction() {
        let conf = RecoveryConfig {
            reduction_bound: ReductionBound::Conservative,
            ..RecoveryConfig::default()
        };
        let mut r = PrrRecovery::new(PrrConfig::from(&conf));
        let mut state = recovery_state();

        r.enter_recovery(&mut state, 0, true, 21900).unwrap();
        assert_eq!(state.cwnd, 23360);

        // The forced retransmit goes out.
        r.update_bytes_sent(SEGMENT_SIZE);

        // An ack for two segments arrives. Still above ssthresh:
        //  sndcnt = CEIL(2920 * 14600 / 21900) - 1460 = 1947 - 1460 = 487
        state.bytes_in_flight = 19040;
        r.do_recovery(&mut state, 2920, 0, false);

        assert_eq!(r.prr_delivered, 2920);
        assert_eq!(state.cwnd, 19040 + 487);
        assert_eq!(state.cwnd_inflated, state.cwnd);
    }

    #[test]
    fn prr_reduction_bound_caps_catch_up() {
        // Below ssthresh, SSRB allows one extra segment per ack while CRB
        // releases no more than was delivered.
        for (bound, cwnd) in [
            (ReductionBound::SlowStart, 5000),
            (ReductionBound::Conservative, 4000),
        ] {
            let conf = RecoveryConfig {
                reduction_bound: bound,
                ..RecoveryConfig::default()
            };
            let mut r = PrrRecovery::new(PrrConfig::from(&conf));
            let mut state = CongestionState {
                cwnd: 10000,
                ssthresh: 5000,
                bytes_in_flight: 10000,
                segment_size: 1000,
                cwnd_inflated: 10000,
            };

            r.enter_recovery(&mut state, 0, true, 10000).unwrap();
            r.update_bytes_sent(1000);

            state.bytes_in_flight = 4000;
            r.do_recovery(&mut state, 1000, 0, false);
            assert_eq!(state.cwnd, cwnd);
        }
    }

    #[test]
    fn prr_sacked_bytes_delta_clamped() {
        let mut r = PrrRecovery::new(PrrConfig::default());
        let mut state = recovery_state();

        r.enter_recovery(&mut state, 0, true, 21900).unwrap();
        r.update_bytes_sent(SEGMENT_SIZE);

        // Two segments reported sacked.
        r.do_recovery(&mut state, 0, 2920, false);
        assert_eq!(r.prr_delivered, 2920);
        assert_eq!(r.previous_sacked_bytes, 2920);

        // The sacked total shrinks; the negative delta must not reduce
        // prr_delivered or wrap.
        r.do_recovery(&mut state, 0, 1460, false);
        assert_eq!(r.prr_delivered, 2920);
        assert_eq!(r.previous_sacked_bytes, 1460);
    }

    #[test]
    fn prr_dup_ack_credit() {
        let mut r = PrrRecovery::new(PrrConfig::default());
        let mut state = recovery_state();

        // The non-SACK path is driven directly, as entry requires SACK.
        r.sack_enabled = false;
        r.recovery_flight_size = 21900;

        // Three duplicate acks, one segment credited each.
        for n in 1..=3 {
            r.do_recovery(&mut state, 0, 0, true);
            assert_eq!(r.dup_ack_count, n);
        }
        assert_eq!(r.prr_delivered, 3 * SEGMENT_SIZE);

        // The cumulative ack covering exactly the dup-ack credit delivers
        // nothing new and clears the credit.
        r.do_recovery(&mut state, 3 * SEGMENT_SIZE, 0, false);
        assert_eq!(r.dup_ack_count, 0);
        assert_eq!(r.prr_delivered, 3 * SEGMENT_SIZE);

        // A later cumulative ack beyond the credit counts in full.
        r.do_recovery(&mut state, SEGMENT_SIZE, 0, false);
        assert_eq!(r.prr_delivered, 4 * SEGMENT_SIZE);
    }

    #[test]
    fn prr_zero_flight_size() {
        let mut r = PrrRecovery::new(PrrConfig::default());
        let mut state = recovery_state();

        // A zero flight snapshot cannot feed the proportional formula;
        // only the forced retransmit goes out.
        r.enter_recovery(&mut state, 0, true, 0).unwrap();
        assert_eq!(state.cwnd, 21900 + SEGMENT_SIZE);

        r.update_bytes_sent(SEGMENT_SIZE);
        r.do_recovery(&mut state, SEGMENT_SIZE, 0, false);
        assert_eq!(state.cwnd, state.bytes_in_flight);
    }

    #[test]
    fn prr_exit_recovery() {
        let mut r = PrrRecovery::new(PrrConfig::default());
        let mut state = recovery_state();

        r.enter_recovery(&mut state, 0, true, 21900).unwrap();
        r.update_bytes_sent(SEGMENT_SIZE);
        state.bytes_in_flight = 19040;
        r.do_recovery(&mut state, 2920, 0, false);

        r.exit_recovery(&mut state);
        assert_eq!(state.cwnd, state.ssthresh);
        assert_eq!(state.cwnd_inflated, state.ssthresh);
    }

    #[test]
    fn prr_fork_is_independent() {
        let mut r = PrrRecovery::new(PrrConfig::default());
        let mut state = recovery_state();

        r.enter_recovery(&mut state, 0, true, 21900).unwrap();
        r.update_bytes_sent(SEGMENT_SIZE);

        let mut clone = r.fork();
        let mut clone_state = recovery_state();
        clone.update_bytes_sent(2920);
        clone.do_recovery(&mut clone_state, 2920, 0, false);

        // The clone carried the counters at the time of the fork and has
        // moved on; the original is untouched.
        assert_eq!(clone.stats().bytes_sent_in_recovery, SEGMENT_SIZE + 2920);
        assert_eq!(r.prr_out, SEGMENT_SIZE);
        assert_eq!(r.prr_delivered, 0);
        assert_eq!(r.stats().bytes_sent_in_recovery, SEGMENT_SIZE);
    }

    #[test]
    fn prr_full_episode() {
        let _ = env_logger::builder().is_test(true).try_init();

        let mut r = PrrRecovery::new(PrrConfig::default());
        let mut state = recovery_state();

        r.enter_recovery(&mut state, 0, true, 21900).unwrap();

        let mut bytes_in_flight = state.bytes_in_flight;
        let (mut last_delivered, mut last_out) = (r.prr_delivered, r.prr_out);

        // One segment is acked per round; whatever budget the policy opens
        // up is transmitted before the next ack.
        for _ in 0..10 {
            let budget = state.cwnd.saturating_sub(bytes_in_flight);
            if budget > 0 {
                r.update_bytes_sent(budget);
                bytes_in_flight += budget;
            }

            bytes_in_flight -= SEGMENT_SIZE;
            state.bytes_in_flight = bytes_in_flight;
            r.do_recovery(&mut state, SEGMENT_SIZE, 0, false);

            assert!(r.prr_delivered >= last_delivered);
            assert!(r.prr_out >= last_out);
            assert!(state.cwnd >= bytes_in_flight);
            last_delivered = r.prr_delivered;
            last_out = r.prr_out;
        }

        r.exit_recovery(&mut state);
        assert_eq!(state.cwnd, state.ssthresh);

        assert_eq!(r.stats().recovery_episodes, 1);
        assert_eq!(r.stats().bytes_delivered_in_recovery, r.prr_delivered);
        assert_eq!(r.stats().bytes_sent_in_recovery, r.prr_out);
    }
}
