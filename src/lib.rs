//! Optimal paragraph line breaking for `paragraph-break`.
//!
//! The crate formats a paragraph expressed as a stream of typographic atoms
//! (boxes, glue, penalties) into an optimal sequence of line breaks using the
//! Knuth-Plass total-fit algorithm: a forward sweep maintains a frontier of
//! active breakpoints, scores every feasible line against a tolerance bound,
//! and a back-chained walk extracts the minimum-demerit break sequence with
//! per-line adjustment ratios for justified rendering.

#![cfg_attr(
    not(test),
    deny(
        clippy::disallowed_methods,
        clippy::expect_used,
        clippy::unwrap_used,
        clippy::panic,
        clippy::panic_in_result_fn,
        clippy::todo,
        clippy::unimplemented
    )
)]

mod break_engine;
mod break_ir;
mod paragraph;

pub use break_engine::{
    BreakEngine, BreakResult, Breakpoint, FormatDiagnostic, FormatError,
};
pub use break_ir::{
    Atom, BreakConfig, FitnessClass, GlueSpec, DEMERITS_INFINITY, INFINITE_STRETCH,
    MINUS_INFINITY, PLUS_INFINITY, RATIO_MINUS_INFINITY, RATIO_PLUS_INFINITY,
};
pub use paragraph::{
    BuildError, Paragraph, ParagraphWriter, WordProvider, DEFAULT_HYPHENATION_PENALTY,
};
