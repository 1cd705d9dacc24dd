//! Symbol evolution across commit history.
//!
//! ```text
//! snapshots (oldest → newest)
//!     │  extract per snapshot (parallel)
//!     ▼
//! versions grouped by (name, kind)
//!     │  whitespace-insensitive dedup, Myers line diffs
//!     ▼
//! VersionChain ──▶ CompressedView
//! ```
//!
//! Retention is always decided chronologically. Presentation order is up to
//! the caller; see [`VersionChain::newest_first`].

mod chain;
mod compressed;

pub use chain::{build_chain, compare, LineDiff, Timeline, Version, VersionChain};
pub use compressed::{CompressedView, Row, TaggedChange};
