//! Chunked text assembly for IR rendering
//!
//! The printer receives a stream of chunks (plain text, keywords, types,
//! newlines) and joins consecutive chunks with a single space, except at
//! the start of a line. Keywords can be wrapped in terminal escape
//! sequences; the default for new printers is a process-wide flag.

use std::sync::atomic::{AtomicBool, Ordering};

static DEFAULT_COLORIZE: AtomicBool = AtomicBool::new(false);

const KEYWORD_ON: &str = "\x1b[1;37m";
const KEYWORD_OFF: &str = "\x1b[0m";

pub struct PrettyPrinter {
    out: String,
    colorize: bool,
    at_line_start: bool,
    indent: usize,
}

impl PrettyPrinter {
    pub fn new() -> PrettyPrinter {
        PrettyPrinter {
            out: String::new(),
            colorize: DEFAULT_COLORIZE.load(Ordering::Relaxed),
            at_line_start: true,
            indent: 0,
        }
    }

    pub fn with_colorize(colorize: bool) -> PrettyPrinter {
        let mut p = PrettyPrinter::new();
        p.colorize = colorize;
        p
    }

    /// Set the process-wide default for keyword colorizing.
    pub fn set_default_colorize(colorize: bool) {
        DEFAULT_COLORIZE.store(colorize, Ordering::Relaxed);
    }

    fn chunk(&mut self, part: &str) {
        if part.is_empty() {
            return;
        }
        if self.at_line_start {
            for _ in 0..self.indent {
                self.out.push(' ');
            }
        } else {
            self.out.push(' ');
        }
        self.out.push_str(part);
        self.at_line_start = false;
    }

    /// Emit a plain text chunk.
    pub fn text(&mut self, part: impl AsRef<str>) {
        self.chunk(part.as_ref());
    }

    /// Glue a part onto the previous chunk with no separating space.
    pub fn append(&mut self, part: impl AsRef<str>) {
        self.out.push_str(part.as_ref());
    }

    /// Emit a keyword chunk, colorized when enabled.
    pub fn keyword(&mut self, part: impl AsRef<str>) {
        if self.colorize {
            let wrapped = format!("{}{}{}", KEYWORD_ON, part.as_ref(), KEYWORD_OFF);
            self.chunk(&wrapped);
        } else {
            self.chunk(part.as_ref());
        }
    }

    /// Emit a type chunk.
    pub fn ty(&mut self, part: impl AsRef<str>) {
        self.chunk(part.as_ref());
    }

    /// End the current line; the next chunk starts a new one with no
    /// separating space.
    pub fn newline(&mut self) {
        self.out.push('\n');
        self.at_line_start = true;
    }

    /// Run `f` with the line indent increased by `by` spaces.
    pub fn indented<F: FnOnce(&mut Self)>(&mut self, by: usize, f: F) {
        self.indent += by;
        f(self);
        self.indent -= by;
    }

    pub fn finish(self) -> String {
        self.out
    }
}

impl Default for PrettyPrinter {
    fn default() -> Self {
        PrettyPrinter::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_chunks_are_space_separated() {
        let mut p = PrettyPrinter::with_colorize(false);
        p.text("foo");
        p.keyword("doh");
        p.text("bar");
        assert_eq!(p.finish(), "foo doh bar");
    }

    #[test]
    fn test_no_space_after_newline() {
        let mut p = PrettyPrinter::with_colorize(false);
        p.text("foo");
        p.newline();
        p.text("bar");
        assert_eq!(p.finish(), "foo\nbar");
    }

    #[test]
    fn test_empty_chunks_are_dropped() {
        let mut p = PrettyPrinter::with_colorize(false);
        p.text("foo");
        p.text("");
        p.text("bar");
        assert_eq!(p.finish(), "foo bar");
    }

    #[test]
    fn test_append_glues_to_previous_chunk() {
        let mut p = PrettyPrinter::with_colorize(false);
        p.text("%count");
        p.append(",");
        p.text("%outer");
        assert_eq!(p.finish(), "%count, %outer");
    }

    #[test]
    fn test_indentation_applies_at_line_start() {
        let mut p = PrettyPrinter::with_colorize(false);
        p.text("1:");
        p.newline();
        p.indented(3, |p| {
            p.text("nop");
            p.newline();
        });
        p.text("}");
        assert_eq!(p.finish(), "1:\n   nop\n}");
    }

    #[test]
    fn test_colorized_keywords() {
        let mut p = PrettyPrinter::with_colorize(true);
        p.keyword("function");
        assert_eq!(p.finish(), "\x1b[1;37mfunction\x1b[0m");
    }
}
