use core::fmt;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::paragraph::WordProvider;

/// Integer plus-infinity sentinel for penalties and demerits.
///
/// A quarter of the native range so saturating sums of a few sentinels stay
/// ordered above every finite value instead of wrapping.
pub const PLUS_INFINITY: i32 = i32::MAX / 4;

/// Integer minus-infinity sentinel; a penalty at or below this value forces a
/// break.
pub const MINUS_INFINITY: i32 = i32::MIN / 4;

/// Glue stretchability sentinel meaning "stretches without bound".
pub const INFINITE_STRETCH: u32 = PLUS_INFINITY as u32;

/// Demerits plus-infinity sentinel; also the default extra charge for two
/// flagged breaks in a row, which makes such pairs effectively forbidden.
pub const DEMERITS_INFINITY: u32 = PLUS_INFINITY as u32;

/// Adjustment-ratio plus-infinity sentinel (line cannot stretch to fit).
pub const RATIO_PLUS_INFINITY: f32 = f32::MAX;

/// Adjustment-ratio minus-infinity sentinel (line cannot shrink to fit).
///
/// `f32::MIN` is the most negative finite value, so a predecessor handed this
/// ratio always fails the `r >= -1` feasibility test and is deactivated.
pub const RATIO_MINUS_INFINITY: f32 = f32::MIN;

/// Natural width, stretchability, and shrinkability of an inter-word space.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct GlueSpec {
    /// Natural width in device units.
    pub width: u32,
    /// How far the space may grow, or [`INFINITE_STRETCH`].
    pub stretch: u32,
    /// How far the space may shrink.
    pub shrink: u32,
}

/// One element of the paragraph stream.
///
/// Boxes are rigid glyph clusters, glue is flexible inter-word space, and
/// penalties mark places where breaking is discouraged, allowed at a cost,
/// or forced.
#[derive(Clone)]
pub enum Atom {
    /// Rigid glyph cluster, typically a word or word fragment.
    Box {
        /// Width of the cluster in device units.
        width: u32,
        /// The word behind the box; streamed back out by the writer.
        word: Arc<dyn WordProvider>,
    },
    /// Flexible inter-word space.
    Glue {
        width: u32,
        stretch: u32,
        shrink: u32,
    },
    /// Break-cost marker.
    Penalty {
        /// Width added to the line only when this break is taken (hyphen
        /// glyph width for optional hyphens).
        width: u32,
        /// Break cost; [`PLUS_INFINITY`] forbids, [`MINUS_INFINITY`] forces.
        penalty: i32,
        /// Flagged penalties attract an extra charge when chosen on two
        /// consecutive lines.
        flagged: bool,
        /// Carried word, if any (the hyphen sign for optional hyphens).
        word: Option<Arc<dyn WordProvider>>,
    },
}

impl Atom {
    /// Natural width in device units.
    pub fn width(&self) -> u32 {
        match self {
            Self::Box { width, .. } | Self::Glue { width, .. } | Self::Penalty { width, .. } => {
                *width
            }
        }
    }

    /// Stretchability; zero for boxes and penalties.
    pub fn stretchability(&self) -> u32 {
        match self {
            Self::Glue { stretch, .. } => *stretch,
            _ => 0,
        }
    }

    /// Shrinkability; zero for boxes and penalties.
    pub fn shrinkability(&self) -> u32 {
        match self {
            Self::Glue { shrink, .. } => *shrink,
            _ => 0,
        }
    }

    /// Break cost; zero for boxes and glue.
    pub fn penalty(&self) -> i32 {
        match self {
            Self::Penalty { penalty, .. } => *penalty,
            _ => 0,
        }
    }

    pub fn is_box(&self) -> bool {
        matches!(self, Self::Box { .. })
    }

    pub fn is_glue(&self) -> bool {
        matches!(self, Self::Glue { .. })
    }

    pub fn is_penalty(&self) -> bool {
        matches!(self, Self::Penalty { .. })
    }

    /// True for a flagged penalty atom.
    pub fn is_flagged_penalty(&self) -> bool {
        matches!(self, Self::Penalty { flagged: true, .. })
    }

    /// True when this atom mandates a break.
    pub fn is_forced_break(&self) -> bool {
        matches!(self, Self::Penalty { penalty, .. } if *penalty <= MINUS_INFINITY)
    }

    /// Whether the search may break here, given the immediately preceding
    /// atom.
    ///
    /// Boxes never break; glue breaks only after a box (so a space following
    /// a penalty or another glue is not a break opportunity); penalties break
    /// unless their cost is plus-infinity.
    pub fn is_legal_break(&self, prev: Option<&Atom>) -> bool {
        match self {
            Self::Box { .. } => false,
            Self::Glue { .. } => prev.is_some_and(Atom::is_box),
            Self::Penalty { penalty, .. } => *penalty < PLUS_INFINITY,
        }
    }

    /// Carried word, if any.
    pub fn word(&self) -> Option<&Arc<dyn WordProvider>> {
        match self {
            Self::Box { word, .. } => Some(word),
            Self::Penalty { word, .. } => word.as_ref(),
            Self::Glue { .. } => None,
        }
    }
}

impl fmt::Debug for Atom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Box { width, word } => f
                .debug_struct("Box")
                .field("width", width)
                .field("word", &word.label().unwrap_or("<word>"))
                .finish(),
            Self::Glue {
                width,
                stretch,
                shrink,
            } => f
                .debug_struct("Glue")
                .field("width", width)
                .field("stretch", stretch)
                .field("shrink", shrink)
                .finish(),
            Self::Penalty {
                width,
                penalty,
                flagged,
                word,
            } => f
                .debug_struct("Penalty")
                .field("width", width)
                .field("penalty", penalty)
                .field("flagged", flagged)
                .field("word", &word.as_ref().and_then(|w| w.label()))
                .finish(),
        }
    }
}

/// Coarse bucket of the adjustment ratio.
///
/// Used to discourage wildly varying inter-line spacing: consecutive lines
/// whose classes differ by more than one step attract an extra demerit
/// charge. `Max` is the sentinel class of the initial pseudo-break and of
/// out-of-range queries; it neighbors every class equally.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FitnessClass {
    Tight,
    Normal,
    Loose,
    VeryLoose,
    Max,
}

impl FitnessClass {
    /// Classify a line by its adjustment ratio.
    pub fn from_ratio(ratio: f32) -> Self {
        if ratio < -0.5 {
            Self::Tight
        } else if ratio <= 0.5 {
            Self::Normal
        } else if ratio <= 1.0 {
            Self::Loose
        } else {
            Self::VeryLoose
        }
    }

    /// Bucket index for the per-class candidate tables.
    pub(crate) fn index(self) -> usize {
        self as usize
    }

    /// Whether two classes are close enough to avoid the non-adjacent
    /// fitness charge. `Max` neighbors everything.
    pub fn neighbors(self, other: FitnessClass) -> bool {
        if self == Self::Max || other == Self::Max {
            return true;
        }
        ((self as i8) - (other as i8)).abs() <= 1
    }
}

/// Formatting knobs for one format call.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BreakConfig {
    /// Upper bound on the per-line adjustment ratio; lines needing more
    /// stretch than this are not feasible.
    pub tolerance: f32,
    /// Desired line length in device units.
    pub line_length: u32,
    /// Use the combined `(1 + badness + penalty)^2` demerits formula from
    /// the 1981 worked example instead of the separate squares.
    pub use_old_demerits_formula: bool,
    /// Bucket candidates by fitness class and charge non-adjacent
    /// transitions.
    pub use_fitness_class: bool,
    /// Charge added when consecutive lines' fitness classes differ by more
    /// than one step. Also bounds which runner-up classes stay on the
    /// frontier.
    pub non_adjacent_fitness_demerits: u32,
    /// Charge added when two flagged penalties are broken in a row. The
    /// default sentinel makes consecutive hyphenated lines effectively
    /// forbidden.
    pub extra_flagged_penalty: u32,
}

impl Default for BreakConfig {
    fn default() -> Self {
        Self {
            tolerance: 1.0,
            line_length: 500,
            use_old_demerits_formula: false,
            use_fitness_class: true,
            non_adjacent_fitness_demerits: 10_000,
            extra_flagged_penalty: DEMERITS_INFINITY,
        }
    }
}
