use smallvec::SmallVec;
use std::sync::{Arc, Mutex};

use crate::break_ir::{
    Atom, BreakConfig, FitnessClass, DEMERITS_INFINITY, MINUS_INFINITY, RATIO_MINUS_INFINITY,
    RATIO_PLUS_INFINITY,
};
use crate::paragraph::{Paragraph, ParagraphWriter};

const FITNESS_BUCKETS: usize = 4;
// Inline capacity for the active frontier; spills to the heap on dense
// paragraphs with many competing fitness classes.
const ACTIVE_INLINE: usize = 16;

/// Runtime diagnostics from a format call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FormatDiagnostic {
    /// A feasible break was admitted to the frontier.
    FeasibleBreak {
        atom: usize,
        line_number: usize,
        total_demerits: u32,
    },
    /// An active breakpoint left the frontier (out of reach or forced past).
    Deactivated { atom: Option<usize> },
    /// The frontier emptied before the paragraph end; formatting aborts.
    ActiveSetExhausted { atom: usize },
}

type DiagnosticCallback = Arc<Mutex<Box<dyn FnMut(FormatDiagnostic) + Send + 'static>>>;
type DiagnosticSink = Option<DiagnosticCallback>;

/// Format-call error.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FormatError {
    /// `finish` was not called on the paragraph before formatting.
    NotFinished,
    /// No break sequence satisfies the tolerance; the paragraph cannot be
    /// formatted.
    CannotBreak {
        /// Atom at which the active set emptied.
        atom: usize,
        /// Nearest preceding box, the word a reader would be shown.
        word_atom: Option<usize>,
    },
}

impl core::fmt::Display for FormatError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotFinished => write!(f, "paragraph not finished"),
            Self::CannotBreak { atom, word_atom } => {
                write!(f, "no feasible break sequence (atom={}", atom)?;
                if let Some(word_atom) = word_atom {
                    write!(f, " word_atom={}", word_atom)?;
                }
                write!(f, ")")
            }
        }
    }
}

impl std::error::Error for FormatError {}

/// One state in the break search graph.
///
/// Records the atom chosen as a break, the running width/stretch/shrink
/// sums up to (but excluding) that atom, and the best path that reaches it.
/// Nodes are arena-allocated; `predecessor` is an index into the same arena.
#[derive(Clone, Debug)]
pub struct Breakpoint {
    /// Break atom index, or `None` for the initial pseudo-break before the
    /// paragraph.
    pub atom: Option<usize>,
    /// Lines closed on the best path to this node; 0 for the initial node.
    pub line_number: usize,
    /// Fitness class of the line ending here.
    pub fitness: FitnessClass,
    /// Adjustment ratio of the line ending here.
    pub adjust_ratio: f32,
    /// Demerits accumulated along the best path to this node.
    pub total_demerits: u32,
    /// Arena index of the predecessor on the best path.
    pub predecessor: Option<usize>,
    total_width: u32,
    total_stretch: u32,
    total_shrink: u32,
}

impl Breakpoint {
    fn initial() -> Self {
        Self {
            atom: None,
            line_number: 0,
            fitness: FitnessClass::Max,
            adjust_ratio: 0.0,
            total_demerits: 0,
            predecessor: None,
            total_width: 0,
            total_stretch: 0,
            total_shrink: 0,
        }
    }

    /// Width sum once the line after this break starts.
    ///
    /// A break atom's own width joins the next line only when its penalty is
    /// exactly zero (glue); a positive-cost penalty's width (optional hyphen
    /// glyph) belongs to the line that takes the break.
    fn width_after(&self, atoms: &[Atom]) -> u32 {
        let mut total = self.total_width;
        if let Some(atom) = self.atom.and_then(|index| atoms.get(index)) {
            if atom.penalty() == 0 {
                total = total.saturating_add(atom.width());
            }
        }
        total
    }

    fn stretch_after(&self, atoms: &[Atom]) -> u32 {
        let mut total = self.total_stretch;
        if let Some(atom) = self.atom.and_then(|index| atoms.get(index)) {
            total = total.saturating_add(atom.stretchability());
        }
        total
    }

    fn shrink_after(&self, atoms: &[Atom]) -> u32 {
        let mut total = self.total_shrink;
        if let Some(atom) = self.atom.and_then(|index| atoms.get(index)) {
            total = total.saturating_add(atom.shrinkability());
        }
        total
    }

    /// Adjustment ratio of the line from this node to `candidate`, given the
    /// running sums at the candidate.
    fn adjust_ratio_to(
        &self,
        atoms: &[Atom],
        candidate: usize,
        total_width: u32,
        total_stretch: u32,
        total_shrink: u32,
        desired: u32,
    ) -> f32 {
        let mut line_length = i64::from(total_width) - i64::from(self.width_after(atoms));
        let candidate_atom = &atoms[candidate];
        // A positive-cost break contributes its width to the line it ends
        // (the hyphen glyph appears when the break is taken).
        if candidate_atom.penalty() > 0 {
            line_length += i64::from(candidate_atom.width());
        }
        let desired = i64::from(desired);

        if line_length < desired {
            let stretch = total_stretch.saturating_sub(self.stretch_after(atoms));
            if stretch > 0 {
                (desired - line_length) as f32 / stretch as f32
            } else {
                RATIO_PLUS_INFINITY
            }
        } else if line_length > desired {
            let shrink = total_shrink.saturating_sub(self.shrink_after(atoms));
            if shrink > 0 {
                (desired - line_length) as f32 / shrink as f32
            } else {
                RATIO_MINUS_INFINITY
            }
        } else {
            0.0
        }
    }

    /// Demerits of the line from this node to `candidate`.
    ///
    /// Badness arrives finite here (feasibility already established), so the
    /// round-to-integer conversion is well defined. All arithmetic saturates;
    /// the result is clamped into `u32`.
    fn line_demerits(
        &self,
        atoms: &[Atom],
        candidate: usize,
        badness: f32,
        cfg: &BreakConfig,
    ) -> u32 {
        let candidate_atom = &atoms[candidate];
        let flagged_pair = self
            .atom
            .and_then(|index| atoms.get(index))
            .is_some_and(Atom::is_flagged_penalty)
            && candidate_atom.is_flagged_penalty();
        let extra = if flagged_pair {
            u64::from(cfg.extra_flagged_penalty)
        } else {
            0
        };

        let base = ((badness + 0.5) as u64).saturating_add(1);
        let penalty = candidate_atom.penalty();
        let demerits = if penalty >= 0 {
            if cfg.use_old_demerits_formula {
                let combined = base.saturating_add(penalty as u64);
                combined.saturating_mul(combined).saturating_add(extra)
            } else {
                let squared_penalty = (penalty as u64).saturating_mul(penalty as u64);
                base.saturating_mul(base)
                    .saturating_add(squared_penalty)
                    .saturating_add(extra)
            }
        } else if penalty <= MINUS_INFINITY {
            base.saturating_mul(base).saturating_add(extra)
        } else {
            let magnitude = u64::from(penalty.unsigned_abs());
            let squared_penalty = magnitude.saturating_mul(magnitude);
            base.saturating_mul(base)
                .saturating_sub(squared_penalty)
                .saturating_add(extra)
        };

        demerits.min(u64::from(u32::MAX)) as u32
    }
}

fn badness(ratio: f32) -> f32 {
    if ratio < -1.0 {
        RATIO_PLUS_INFINITY
    } else {
        100.0 * ratio.abs().powi(3)
    }
}

#[derive(Clone, Copy)]
struct CandidateSlot {
    predecessor: Option<usize>,
    total_demerits: u32,
    ratio: f32,
    fitness: FitnessClass,
}

impl CandidateSlot {
    const EMPTY: Self = Self {
        predecessor: None,
        total_demerits: DEMERITS_INFINITY,
        ratio: RATIO_PLUS_INFINITY,
        fitness: FitnessClass::Max,
    };
}

/// Deterministic line-break engine.
///
/// A format call is a pure computation over a finished paragraph's atom
/// sequence: a forward sweep maintains the active frontier of partial
/// solutions, and the optimal break sequence is read back over predecessor
/// links. Re-formatting with different settings means formatting again; each
/// call builds a fresh breakpoint graph.
#[derive(Clone)]
pub struct BreakEngine {
    cfg: BreakConfig,
    diagnostics: DiagnosticSink,
}

impl core::fmt::Debug for BreakEngine {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("BreakEngine")
            .field("cfg", &self.cfg)
            .field("has_diagnostics", &self.diagnostics.is_some())
            .finish()
    }
}

impl BreakEngine {
    /// Create an engine with the given configuration.
    pub fn new(cfg: BreakConfig) -> Self {
        Self {
            cfg,
            diagnostics: None,
        }
    }

    /// Install a diagnostics sink receiving structured format events.
    pub fn with_diagnostics<F>(mut self, callback: F) -> Self
    where
        F: FnMut(FormatDiagnostic) + Send + 'static,
    {
        self.diagnostics = Some(Arc::new(Mutex::new(Box::new(callback))));
        self
    }

    /// Engine configuration.
    pub fn config(&self) -> &BreakConfig {
        &self.cfg
    }

    fn emit(&self, diagnostic: FormatDiagnostic) {
        if let Some(callback) = &self.diagnostics {
            if let Ok(mut callback) = callback.lock() {
                (callback)(diagnostic);
            }
        }
    }

    /// Choose the optimal break sequence for `paragraph`.
    ///
    /// Walks atoms in order; at every legal breakpoint each active
    /// predecessor is scored, predecessors out of shrink range are
    /// deactivated, and the best feasible candidate per fitness class joins
    /// the frontier. The paragraph's forced terminal break guarantees a
    /// single final node on success.
    pub fn format(&self, paragraph: &Paragraph) -> Result<BreakResult, FormatError> {
        if !paragraph.is_finished() {
            return Err(FormatError::NotFinished);
        }
        let cfg = self.cfg;
        let class_count = if cfg.use_fitness_class {
            FITNESS_BUCKETS
        } else {
            1
        };
        let atoms = paragraph.atoms();

        let mut nodes: Vec<Breakpoint> = Vec::with_capacity(atoms.len() / 2 + 2);
        nodes.push(Breakpoint::initial());
        let mut active: SmallVec<[usize; ACTIVE_INLINE]> = SmallVec::new();
        active.push(0);

        let mut total_width = 0u32;
        let mut total_stretch = 0u32;
        let mut total_shrink = 0u32;

        for (index, atom) in atoms.iter().enumerate() {
            if paragraph.is_legal_break(index) {
                let forced = atom.is_forced_break();
                let mut slots = [CandidateSlot::EMPTY; FITNESS_BUCKETS];
                let mut min_total = DEMERITS_INFINITY;
                let mut survivors: SmallVec<[usize; ACTIVE_INLINE]> = SmallVec::new();

                for &active_id in &active {
                    let node = &nodes[active_id];
                    let ratio = node.adjust_ratio_to(
                        atoms,
                        index,
                        total_width,
                        total_stretch,
                        total_shrink,
                        cfg.line_length,
                    );
                    // A forced break retires every predecessor; a predecessor
                    // past its shrink range can never reach a later break.
                    if forced || ratio < -1.0 {
                        self.emit(FormatDiagnostic::Deactivated { atom: node.atom });
                    } else {
                        survivors.push(active_id);
                    }
                    if ratio >= -1.0 && ratio < cfg.tolerance {
                        let fitness = FitnessClass::from_ratio(ratio);
                        let mut demerits =
                            node.line_demerits(atoms, index, badness(ratio), &cfg);
                        if cfg.use_fitness_class && !node.fitness.neighbors(fitness) {
                            demerits = demerits.saturating_add(cfg.non_adjacent_fitness_demerits);
                        }
                        let total = node.total_demerits.saturating_add(demerits);
                        let bucket = if cfg.use_fitness_class {
                            fitness.index()
                        } else {
                            0
                        };
                        let slot = &mut slots[bucket];
                        if total < slot.total_demerits {
                            *slot = CandidateSlot {
                                predecessor: Some(active_id),
                                total_demerits: total,
                                ratio,
                                fitness,
                            };
                            if total < min_total {
                                min_total = total;
                            }
                        }
                    }
                }
                active = survivors;

                if min_total < DEMERITS_INFINITY {
                    // Keep runner-up classes close to the minimum alive: they
                    // may win later through fitness-adjacency charges.
                    let admit = min_total.saturating_add(cfg.non_adjacent_fitness_demerits);
                    for slot in slots.iter().take(class_count) {
                        let Some(predecessor) = slot.predecessor else {
                            continue;
                        };
                        if slot.total_demerits > admit {
                            continue;
                        }
                        let line_number = nodes[predecessor].line_number + 1;
                        self.emit(FormatDiagnostic::FeasibleBreak {
                            atom: index,
                            line_number,
                            total_demerits: slot.total_demerits,
                        });
                        nodes.push(Breakpoint {
                            atom: Some(index),
                            line_number,
                            fitness: slot.fitness,
                            adjust_ratio: slot.ratio,
                            total_demerits: slot.total_demerits,
                            predecessor: Some(predecessor),
                            total_width,
                            total_stretch,
                            total_shrink,
                        });
                        active.push(nodes.len() - 1);
                    }
                }

                if active.is_empty() {
                    self.emit(FormatDiagnostic::ActiveSetExhausted { atom: index });
                    return Err(FormatError::CannotBreak {
                        atom: index,
                        word_atom: paragraph.previous_box(index),
                    });
                }
            }

            if atom.penalty() <= 0 {
                total_width = total_width.saturating_add(atom.width());
            }
            total_stretch = total_stretch.saturating_add(atom.stretchability());
            total_shrink = total_shrink.saturating_add(atom.shrinkability());
        }

        // The forced terminal break retired every older node, so the arena
        // tail is the final breakpoint; read the best path back from it.
        let final_id = nodes.len() - 1;
        if nodes[final_id].line_number == 0 {
            return Err(FormatError::CannotBreak {
                atom: atoms.len().saturating_sub(1),
                word_atom: None,
            });
        }
        let mut best = Vec::with_capacity(nodes[final_id].line_number);
        let mut cursor = Some(final_id);
        while let Some(id) = cursor {
            let node = &nodes[id];
            if node.atom.is_none() {
                break;
            }
            best.push(id);
            cursor = node.predecessor;
        }
        best.reverse();

        Ok(BreakResult { nodes, best })
    }
}

/// Chosen break sequence plus the full breakpoint graph behind it.
///
/// Line queries are 1-based and sentinel-returning out of range, so sinks
/// can probe without bounds bookkeeping.
#[derive(Clone, Debug)]
pub struct BreakResult {
    nodes: Vec<Breakpoint>,
    best: Vec<usize>,
}

impl BreakResult {
    /// Number of chosen lines.
    pub fn number_of_lines(&self) -> usize {
        self.best.len()
    }

    /// Breakpoint ending `line_number`, if in range.
    pub fn line(&self, line_number: usize) -> Option<&Breakpoint> {
        line_number
            .checked_sub(1)
            .and_then(|index| self.best.get(index))
            .map(|&id| &self.nodes[id])
    }

    /// Adjustment ratio of `line_number`; [`RATIO_PLUS_INFINITY`] out of
    /// range.
    pub fn adjust_ratio(&self, line_number: usize) -> f32 {
        self.line(line_number)
            .map_or(RATIO_PLUS_INFINITY, |node| node.adjust_ratio)
    }

    /// Accumulated demerits through `line_number`; [`DEMERITS_INFINITY`] out
    /// of range.
    pub fn total_demerits(&self, line_number: usize) -> u32 {
        self.line(line_number)
            .map_or(DEMERITS_INFINITY, |node| node.total_demerits)
    }

    /// Fitness class of `line_number`; [`FitnessClass::Max`] out of range.
    pub fn fitness_class(&self, line_number: usize) -> FitnessClass {
        self.line(line_number)
            .map_or(FitnessClass::Max, |node| node.fitness)
    }

    /// Every breakpoint recorded during the sweep, in creation order.
    ///
    /// The initial pseudo-break is first; nodes stay alive even after
    /// leaving the frontier because later predecessor links reach them.
    pub fn breakpoints(&self) -> &[Breakpoint] {
        &self.nodes
    }

    /// The chosen breakpoints in line order.
    pub fn chosen(&self) -> impl Iterator<Item = &Breakpoint> + '_ {
        self.best.iter().map(move |&id| &self.nodes[id])
    }

    /// Stream the formatted paragraph to a sink.
    ///
    /// Boxes arrive through `write_word`; glue not chosen as a break arrives
    /// through `write_space` with its justified width (`w + r*stretch` for
    /// r >= 0, `w - r*shrink` otherwise, r being the current line's ratio);
    /// each chosen break first streams its carried hyphen sign, if any, then
    /// `break_here`. Returns the number of lines emitted.
    pub fn write_text(&self, paragraph: &Paragraph, sink: &mut dyn ParagraphWriter) -> usize {
        let mut line_cursor = 0usize;
        let mut lines_emitted = 0usize;

        for (index, atom) in paragraph.atoms().iter().enumerate() {
            let chosen = self.best.get(line_cursor).map(|&id| &self.nodes[id]);
            if chosen.is_some_and(|node| node.atom == Some(index)) {
                if let Some(word) = atom.word() {
                    sink.write_word(word.as_ref());
                }
                lines_emitted += 1;
                sink.break_here(lines_emitted);
                line_cursor += 1;
            } else if atom.is_box() {
                if let Some(word) = atom.word() {
                    sink.write_word(word.as_ref());
                }
            } else if atom.is_glue() {
                let ratio = chosen.map_or(0.0, |node| node.adjust_ratio);
                let width = atom.width() as f32;
                let space = if ratio >= 0.0 {
                    width + atom.stretchability() as f32 * ratio
                } else {
                    width - atom.shrinkability() as f32 * ratio
                };
                sink.write_space(space);
            }
        }

        lines_emitted
    }
}
