//! Integration test crate for queue-porter.
//!
//! All content lives in `tests/`; this library target is intentionally
//! empty.
