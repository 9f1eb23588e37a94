pub mod fingerprint;
pub mod id;

pub use fingerprint::content_fingerprint;
