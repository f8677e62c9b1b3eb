//! Property-based tests
//!
//! Invariants that should hold for every input rather than hand-picked
//! cases. By default proptest runs 256 cases per property; raise it with
//! `PROPTEST_CASES`.
//!
//! - `normalize_props`: response normalization
//!   - exactly one of data/error is present
//!   - JSON error bodies resolve `error` > `message` > status line
//!   - 2xx JSON bodies come back unchanged
//!   - arbitrary bytes never panic

mod normalize_props;
