//! Response caching keyed by request fingerprint.

mod key;
mod store;

pub use key::cache_key;
pub use store::{expiry_deadline, ResponseCache};
