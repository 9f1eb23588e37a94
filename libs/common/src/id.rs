use ulid::Ulid;

/// Generates a new ULID-based ID with the given prefix.
///
/// # Examples
/// ```
/// let id = matchcast_common::id::prefixed_ulid("job");
/// assert!(id.starts_with("job_"));
/// ```
pub fn prefixed_ulid(prefix: &str) -> String {
    format!("{}_{}", prefix, Ulid::new().to_string())
}

/// Well-known ID prefixes.
pub mod prefix {
    pub const JOB: &str = "job";
    pub const OBSERVER: &str = "obs";
    pub const BROADCAST: &str = "bc";
    pub const SUBSCRIPTION: &str = "sub";
}
