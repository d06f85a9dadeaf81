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

//! TCP-Recovery implements loss recovery rate control for reliable
//! byte-stream transports. Once the transport's state machine has detected
//! packet loss and entered a recovery phase, the policy decides on every
//! acknowledgment how many additional bytes the sender may transmit, so
//! that the data in flight converges smoothly toward the window chosen by
//! the congestion control algorithm.
//!
//! The crate provides two policies behind the [`RecoveryOps`] trait:
//!
//! * **Classic**: cuts the congestion window directly to the slow start
//!   threshold on entering recovery and does nothing else.
//! * **PRR**: Proportional Rate Reduction
//!   ([RFC 6937](https://www.rfc-editor.org/rfc/rfc6937.html)), which
//!   paces sending during recovery in proportion to the data confirmed
//!   delivered, with a configurable reduction bound (CRB or SSRB).
//!
//! The transport owns a [`CongestionState`] per connection and drives the
//! policy through `enter_recovery -> {do_recovery | update_bytes_sent}* ->
//! exit_recovery`; the policy mutates `cwnd` synchronously and the caller
//! observes the new window upon return. Loss detection, retransmission
//! timers, and packet I/O stay with the caller.

/// Default sender maximum segment size in bytes, assuming an Ethernet MTU
/// of 1500 bytes less 40 bytes of IP and TCP headers.
pub const DEFAULT_SEGMENT_SIZE: u64 = 1460;

/// Result type for recovery operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Configurations about loss recovery.
#[derive(Debug, Clone)]
pub struct RecoveryConfig {
    /// The loss recovery algorithm.
    pub recovery_algorithm: RecoveryAlgorithm,

    /// The reduction bound mode applied by PRR once the data in flight has
    /// fallen to or below the slow start threshold.
    pub reduction_bound: ReductionBound,
}

impl Default for RecoveryConfig {
    fn default() -> RecoveryConfig {
        RecoveryConfig {
            recovery_algorithm: RecoveryAlgorithm::Prr,
            reduction_bound: ReductionBound::SlowStart,
        }
    }
}


pub use crate::error::Error;
pub use crate::recovery::build_recovery_ops;
pub use crate::recovery::ClassicRecovery;
pub use crate::recovery::CongestionState;
pub use crate::recovery::PrrConfig;
pub use crate::recovery::PrrRecovery;
pub use crate::recovery::RecoveryAlgorithm;
pub use crate::recovery::RecoveryOps;
pub use crate::recovery::RecoveryStats;
pub use crate::recovery::ReductionBound;

#[path = "recovery/recovery.rs"]
pub mod recovery;

pub mod error;
