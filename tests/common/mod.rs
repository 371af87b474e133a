//! Shared fixtures for the regression tests: an ascii word provider with the
//! classic per-letter width table, a hyphenation exception list, a plain-text
//! paragraph loader, and capture sinks for the writer interface.

use std::sync::Arc;

use paragraph_break::{
    BreakResult, GlueSpec, Paragraph, ParagraphWriter, WordProvider,
};

/// The worked-example paragraph from the 1981 "Breaking Paragraphs into
/// Lines" article.
pub const FROG_PRINCE: &str = "In olden times when wishing still helped one, there lived a \
king whose daughters were all beautiful; and the youngest was \
so beautiful that the sun itself, which has seen so much, was \
astonished whenever it shone in her face. Close by the king's \
castle lay a great dark forest, and under an old lime-tree in the \
forest was a well, and when the day was very warm, the king's \
child went out into the forest and sat down by the side of the \
cool fountain; and when she was bored she took a golden ball, \
and threw it up on high and caught it; and this ball was her \
favorite plaything.";

/// A paragraph whose natural optimum would hyphenate two consecutive lines.
pub const HYPHEN_ADJACENCY: &str = "AAAAAAAAAA AAAAAAAAAA AAAAAAAAAA AAAAAAA hyphenationtest \
BBBBBBBBBB BBBBBBBBBB BBBBBBBBBB jlC hyphenationtest \
DDDDDDDDDD DDDDDDDDDD";

/// A paragraph whose first line must be very tight, making the second line's
/// cheapest break clash with the fitness-adjacency rule.
pub const FITNESS_PROPAGATION: &str = "The first line's best break makes it very veryyyyyy \
tiiiiiiiiiiiiiight, the second line's best break is of class two but another break will \
have to be preferred; it will give another line of class 0.";

/// Glyph width per ascii character, as in the 1981 worked example. Unknown
/// characters are 10 units wide; the space is 0 so a line's length is the sum
/// of its word widths plus glue.
fn char_width(ch: char) -> u32 {
    match ch {
        ' ' => 0,
        'a' => 9,
        'b' => 10,
        'c' => 8,
        'd' => 10,
        'e' => 8,
        'f' => 6,
        'g' => 9,
        'h' => 10,
        'i' => 5,
        'j' => 6,
        'k' => 10,
        'l' => 5,
        'm' => 15,
        'n' => 10,
        'o' => 9,
        'p' => 10,
        'q' => 10,
        'r' => 7,
        's' => 7,
        't' => 7,
        'u' => 10,
        'v' => 9,
        'w' => 13,
        'x' => 10,
        'y' => 10,
        'z' => 8,
        'C' => 13,
        'I' => 6,
        '-' => 6,
        ',' | ';' | '.' | '\'' => 5,
        _ => 10,
    }
}

/// Ascii word with table-derived width and punctuation-aware glue.
pub struct AsciiWord {
    text: String,
    width: u32,
}

impl AsciiWord {
    pub fn new(text: &str) -> Self {
        let width = text.chars().map(char_width).sum();
        Self {
            text: text.to_string(),
            width,
        }
    }

    /// Override the computed width; used for the indentation box, which is
    /// blank but 18 units wide.
    pub fn with_width(text: &str, width: u32) -> Self {
        Self {
            text: text.to_string(),
            width,
        }
    }

    pub fn arc(text: &str) -> Arc<dyn WordProvider> {
        Arc::new(Self::new(text))
    }
}

impl WordProvider for AsciiWord {
    fn width(&self) -> u32 {
        self.width
    }

    fn next_glue(&self) -> GlueSpec {
        match self.text.chars().last() {
            Some(',') => GlueSpec {
                width: 6,
                stretch: 4,
                shrink: 2,
            },
            Some(';') => GlueSpec {
                width: 6,
                stretch: 4,
                shrink: 1,
            },
            Some('.') => GlueSpec {
                width: 8,
                stretch: 6,
                shrink: 1,
            },
            _ => GlueSpec {
                width: 6,
                stretch: 3,
                shrink: 2,
            },
        }
    }

    fn label(&self) -> Option<&str> {
        Some(&self.text)
    }
}

/// Hyphenation exception list covering every splittable word in the
/// fixtures: byte length of the first part, and whether the hyphen is
/// already spelled in the word.
const HYPHEN_EXCEPTIONS: &[(&str, usize, bool)] = &[
    ("lime-tree", 5, true),
    ("wishing", 4, false),
    ("daughters", 5, false),
    ("beautiful", 4, false),
    ("youngest", 5, false),
    ("itself", 2, false),
    ("astonished", 5, false),
    ("whenever", 4, false),
    ("forest", 3, false),
    ("under", 2, false),
    ("fountain", 4, false),
    ("favorite", 5, false),
    ("plaything", 4, false),
    ("hyphenationtest", 11, false),
];

fn hyphen_split(word: &str) -> Option<(usize, bool)> {
    HYPHEN_EXCEPTIONS
        .iter()
        .find(|(prefix, _, _)| word.starts_with(prefix))
        .map(|&(_, first_len, explicit)| (first_len, explicit))
}

/// Build a paragraph from whitespace-separated text.
///
/// Words on the exception list are split into two boxes around a hyphen
/// penalty (an explicit hyphen when the glyph is already part of the first
/// box, an optional hyphen sign otherwise); every word is followed by glue
/// derived from its spelling. `with_indentation` prepends a blank box of
/// width 18.
pub fn load_text(par: &mut Paragraph, text: &str, with_indentation: bool) {
    if with_indentation {
        par.add_box(Arc::new(AsciiWord::with_width("   ", 18)))
            .expect("open paragraph");
    }
    for word in text.split_whitespace() {
        match hyphen_split(word) {
            Some((first_len, explicit)) => {
                let (head, tail) = word.split_at(first_len);
                par.add_box(AsciiWord::arc(head)).expect("open paragraph");
                if explicit {
                    par.add_explicit_hyphen().expect("open paragraph");
                } else {
                    par.add_optional_hyphen(AsciiWord::arc("-"))
                        .expect("open paragraph");
                }
                par.add_box(AsciiWord::arc(tail)).expect("open paragraph");
            }
            None => {
                par.add_box(AsciiWord::arc(word)).expect("open paragraph");
            }
        }
        par.add_glue().expect("open paragraph");
    }
    par.finish().expect("finish paragraph");
}

/// The word (nearest preceding box) ending each chosen line.
pub fn break_words(par: &Paragraph, result: &BreakResult) -> Vec<String> {
    result
        .chosen()
        .map(|node| {
            let atom = node.atom.expect("chosen break has an atom");
            let box_index = par.previous_box(atom).expect("break has a preceding box");
            par.atoms()[box_index]
                .word()
                .and_then(|word| word.label())
                .unwrap_or_default()
                .to_string()
        })
        .collect()
}

/// Sink that reassembles line text, one entry per emitted line.
#[derive(Default)]
pub struct LineCapture {
    current: String,
    pub lines: Vec<String>,
    pub line_numbers: Vec<usize>,
}

impl ParagraphWriter for LineCapture {
    fn write_word(&mut self, word: &dyn WordProvider) {
        self.current.push_str(word.label().unwrap_or_default());
    }

    fn write_space(&mut self, _space_width: f32) {
        self.current.push(' ');
    }

    fn break_here(&mut self, line_number: usize) {
        self.lines.push(self.current.trim_end().to_string());
        self.line_numbers.push(line_number);
        self.current.clear();
    }
}

/// Sink that sums effective widths (word widths plus justified spaces) per
/// line.
#[derive(Default)]
pub struct MeasureCapture {
    current: f32,
    pub lines: Vec<f32>,
}

impl ParagraphWriter for MeasureCapture {
    fn write_word(&mut self, word: &dyn WordProvider) {
        self.current += word.width() as f32;
    }

    fn write_space(&mut self, space_width: f32) {
        self.current += space_width;
    }

    fn break_here(&mut self, _line_number: usize) {
        self.lines.push(self.current);
        self.current = 0.0;
    }
}
