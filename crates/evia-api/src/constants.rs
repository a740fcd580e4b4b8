/// API path prefix
pub const API_PREFIX: &str = "/api";

/// Extra body allowance on top of the image for the other multipart fields.
pub const MULTIPART_OVERHEAD_BYTES: usize = 1024 * 1024;

/// How often expired one-time codes are purged.
pub const CODE_PURGE_INTERVAL_SECS: u64 = 600;

/// Maximum requests handled at once; further requests wait for a slot.
pub const HTTP_CONCURRENCY_LIMIT: usize = 512;
