use core::fmt;
use std::sync::Arc;

use crate::break_ir::{Atom, GlueSpec, INFINITE_STRETCH, MINUS_INFINITY, PLUS_INFINITY};

/// Default cost for breaking inside a word at a hyphenation point.
pub const DEFAULT_HYPHENATION_PENALTY: u32 = 50;

/// Measurement hook for the words that fill a paragraph.
///
/// The builder asks a word for its glyph width and for the space that should
/// follow it; the writer streams the same object back to the rendering sink.
/// Implementations own the device-specific width tables, which keeps the
/// engine free of font knowledge.
pub trait WordProvider: Send + Sync {
    /// Natural width of the word's glyphs in device units.
    fn width(&self) -> u32;

    /// Natural width, stretch, and shrink of the inter-word space that
    /// should follow this word (e.g. wider space after a period).
    fn next_glue(&self) -> GlueSpec;

    /// Human-readable form for diagnostics and text sinks.
    fn label(&self) -> Option<&str> {
        None
    }
}

/// Rendering sink driven by [`crate::BreakResult::write_text`].
///
/// The walk visits atoms in order against the chosen breaks: every box (and
/// a chosen break's carried hyphen sign) arrives through `write_word`, every
/// unchosen glue through `write_space` with its justified width, and each
/// chosen break through `break_here`.
pub trait ParagraphWriter {
    fn write_word(&mut self, word: &dyn WordProvider);
    fn write_space(&mut self, space_width: f32);
    fn break_here(&mut self, line_number: usize);
}

/// Builder misuse error; the paragraph keeps its prior valid state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BuildError {
    /// The paragraph was already finished; no further atoms may be appended
    /// and `finish` may not run twice.
    AlreadyFinished,
}

impl fmt::Display for BuildError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlreadyFinished => write!(f, "paragraph already finished"),
        }
    }
}

impl std::error::Error for BuildError {}

/// Append-only paragraph under construction.
///
/// Callers stream boxes, glue, and hyphenation penalties in reading order,
/// then call [`finish`](Self::finish) exactly once; only a finished
/// paragraph can be formatted.
pub struct Paragraph {
    atoms: Vec<Atom>,
    finished: bool,
    hyphenation_penalty: u32,
}

impl Default for Paragraph {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Paragraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Paragraph")
            .field("atoms", &self.atoms.len())
            .field("finished", &self.finished)
            .field("hyphenation_penalty", &self.hyphenation_penalty)
            .finish()
    }
}

impl Paragraph {
    /// Create an empty paragraph with default hyphenation cost.
    pub fn new() -> Self {
        Self {
            atoms: Vec::with_capacity(64),
            finished: false,
            hyphenation_penalty: DEFAULT_HYPHENATION_PENALTY,
        }
    }

    /// Override the cost charged for breaking at a hyphenation point.
    pub fn with_hyphenation_penalty(mut self, penalty: u32) -> Self {
        self.hyphenation_penalty = penalty;
        self
    }

    fn check_open(&self) -> Result<(), BuildError> {
        if self.finished {
            Err(BuildError::AlreadyFinished)
        } else {
            Ok(())
        }
    }

    /// Append a box for `word`; the width comes from the provider.
    pub fn add_box(&mut self, word: Arc<dyn WordProvider>) -> Result<(), BuildError> {
        self.check_open()?;
        self.atoms.push(Atom::Box {
            width: word.width(),
            word,
        });
        Ok(())
    }

    /// Append inter-word glue.
    ///
    /// The glue values come from the nearest preceding box's word, so the
    /// word decides the natural space that follows it. With no preceding box
    /// the glue is rigid and zero-width.
    pub fn add_glue(&mut self) -> Result<(), BuildError> {
        self.check_open()?;
        let spec = self
            .atoms
            .iter()
            .rev()
            .find_map(|atom| match atom {
                Atom::Box { word, .. } => Some(word.next_glue()),
                _ => None,
            })
            .unwrap_or_default();
        self.atoms.push(Atom::Glue {
            width: spec.width,
            stretch: spec.stretch,
            shrink: spec.shrink,
        });
        Ok(())
    }

    /// Append an optional hyphenation point carrying the hyphen sign.
    ///
    /// The sign's width is charged to the line only when the break is taken,
    /// and the sign is streamed to the writer at that break.
    pub fn add_optional_hyphen(
        &mut self,
        hyphen_sign: Arc<dyn WordProvider>,
    ) -> Result<(), BuildError> {
        self.check_open()?;
        self.atoms.push(Atom::Penalty {
            width: hyphen_sign.width(),
            penalty: self.hyphenation_penalty as i32,
            flagged: true,
            word: Some(hyphen_sign),
        });
        Ok(())
    }

    /// Append a break opportunity at a hyphen already part of the preceding
    /// box (no extra glyph appears when the break is taken).
    pub fn add_explicit_hyphen(&mut self) -> Result<(), BuildError> {
        self.check_open()?;
        self.atoms.push(Atom::Penalty {
            width: 0,
            penalty: self.hyphenation_penalty as i32,
            flagged: true,
            word: None,
        });
        Ok(())
    }

    /// Append a bare penalty atom.
    ///
    /// `MINUS_INFINITY` forces a break here, `PLUS_INFINITY` forbids one,
    /// finite values charge the break accordingly.
    pub fn add_penalty(&mut self, penalty: i32, flagged: bool) -> Result<(), BuildError> {
        self.check_open()?;
        self.atoms.push(Atom::Penalty {
            width: 0,
            penalty,
            flagged,
            word: None,
        });
        Ok(())
    }

    /// Close the paragraph.
    ///
    /// Removes a trailing glue if present, then appends the terminal
    /// pattern: a forbidden break, an infinitely stretchable glue, and a
    /// forced break. This guarantees the search always terminates at a
    /// single well-defined final breakpoint.
    pub fn finish(&mut self) -> Result<(), BuildError> {
        self.check_open()?;
        if self.atoms.last().is_some_and(Atom::is_glue) {
            self.atoms.pop();
        }
        self.atoms.push(Atom::Penalty {
            width: 0,
            penalty: PLUS_INFINITY,
            flagged: false,
            word: None,
        });
        self.atoms.push(Atom::Glue {
            width: 0,
            stretch: INFINITE_STRETCH,
            shrink: 0,
        });
        self.atoms.push(Atom::Penalty {
            width: 0,
            penalty: MINUS_INFINITY,
            flagged: false,
            word: None,
        });
        self.finished = true;
        Ok(())
    }

    /// Whether `finish` has run.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Atom stream in reading order.
    pub fn atoms(&self) -> &[Atom] {
        &self.atoms
    }

    /// Number of atoms.
    pub fn len(&self) -> usize {
        self.atoms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.atoms.is_empty()
    }

    /// Whether the search may break at `index`, applying the glue-after-box
    /// rule.
    pub fn is_legal_break(&self, index: usize) -> bool {
        let Some(atom) = self.atoms.get(index) else {
            return false;
        };
        let prev = index.checked_sub(1).and_then(|i| self.atoms.get(i));
        atom.is_legal_break(prev)
    }

    /// Index of the nearest box at or before `index`.
    ///
    /// This is the word a reader would associate with a break at `index`;
    /// used by sinks and by failure reporting.
    pub fn previous_box(&self, index: usize) -> Option<usize> {
        self.atoms
            .iter()
            .enumerate()
            .take(index.saturating_add(1))
            .rev()
            .find_map(|(i, atom)| atom.is_box().then_some(i))
    }
}
