//! # Store Primitives
//!
//! Hardcoded runtime constants for the tag store.
//!
//! These values are compiled into the binary and are immutable at runtime.
//! Anything an operator may want to tune lives in the app configuration.

use std::time::Duration;

// =============================================================================
// DIGEST FORMAT
// =============================================================================

/// The only supported digest algorithm.
///
/// Canonical digests are written as `sha256:<hex>`.
pub const DIGEST_ALGORITHM: &str = "sha256";

/// Separator between the algorithm and the hex-encoded hash.
pub const DIGEST_SEPARATOR: char = ':';

/// Length in bytes of a SHA-256 hash.
pub const SHA256_LEN: usize = 32;

/// Length of the hex encoding of a SHA-256 hash.
pub const SHA256_HEX_LEN: usize = SHA256_LEN * 2;

// =============================================================================
// INPUT VALIDATION LIMITS
// =============================================================================

/// Maximum length for tag names, in bytes.
///
/// Tags longer than this are rejected before touching any tier.
pub const MAX_TAG_LENGTH: usize = 1024;

/// Maximum size of a single cache entry (64 KiB).
///
/// Tag entries hold one canonical digest, so anything close to this limit
/// is already garbage. The limit is enforced before buffering content.
pub const MAX_CACHE_FILE_SIZE: usize = 64 * 1024;

// =============================================================================
// WRITE-BACK DEFAULTS
// =============================================================================

/// Default delay before a freshly put tag becomes eligible for upload.
pub const DEFAULT_WRITE_BACK_DELAY: Duration = Duration::from_secs(30);

/// Default first retry delay after a failed upload.
pub const DEFAULT_RETRY_INITIAL_DELAY: Duration = Duration::from_secs(1);

/// Default cap for exponential upload backoff (5 minutes).
pub const DEFAULT_RETRY_MAX_DELAY: Duration = Duration::from_secs(300);

/// Default backoff multiplier between consecutive upload attempts.
pub const DEFAULT_RETRY_MULTIPLIER: u32 = 2;

/// Seconds after the Unix epoch used as the schedule time when a delay
/// overflows `SystemTime`.
pub const LATEST_SCHEDULE_SECS: u64 = u64::MAX >> 2;
