//! Domain constants
//!
//! Defaults shared by the configuration layer, the reconciler and the queue
//! gateways.

/// Longest delivery delay a single enqueue may request (SQS ceiling).
pub const MAX_QUEUE_DELAY_SECS: u64 = 900;

/// Long-poll wait used by every receive call.
pub const DEFAULT_RECEIVE_WAIT_SECS: u64 = 10;

/// Upper bound on the long-poll wait accepted by SQS.
pub const MAX_RECEIVE_WAIT_SECS: u64 = 20;

/// Slack under which an envelope counts as due.
///
/// Absorbs queue redelivery jitter so a message arriving a moment early does
/// not burn another receive/send round trip.
pub const DEFAULT_DUE_TOLERANCE_SECS: u64 = 2;

/// Seed delay for the default backoff policy.
pub const DEFAULT_BACKOFF_SEED_SECS: u64 = 5;

/// How long `stop()` waits for the poll task to wind down.
pub const DEFAULT_STOP_TIMEOUT_SECS: u64 = 15;
