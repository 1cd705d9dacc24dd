//! Line diff engine.
//!
//! Two strategies serve different purposes:
//!
//! - [`greedy_diff`]: bounded-lookahead alignment for side-by-side comparison
//!   of two versions. Cheap, local, not minimal.
//! - [`hunks`] / [`line_diff`]: zero-context Myers hunks, used to record the
//!   line changes of every evolution step.

mod greedy;
mod hunks;

pub use greedy::{greedy_diff, greedy_diff_text, DiffOp, LOOKAHEAD};
pub use hunks::{hunks, line_changes, line_diff, ChangeKind, Hunk, HunkLine, LineChange, WhitespaceMode};
