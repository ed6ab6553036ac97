use std::collections::BTreeMap;

use codart_syntax::Token;
use thiserror::Error;

/// Which side of a token boundary an insertion attaches to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertSide {
    Before,
    After,
}

/// A queued edit, addressed by index into the buffer's token sequence.
///
/// Ranges are inclusive on both ends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RewriteOp {
    Insert {
        index: usize,
        text: String,
        side: InsertSide,
    },
    Delete {
        start: usize,
        end: usize,
    },
    Replace {
        start: usize,
        end: usize,
        text: String,
    },
}

impl RewriteOp {
    fn range(&self) -> Option<(usize, usize)> {
        match self {
            RewriteOp::Insert { .. } => None,
            RewriteOp::Delete { start, end } | RewriteOp::Replace { start, end, .. } => {
                Some((*start, *end))
            }
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RewriteError {
    #[error("token index {index} is out of bounds (len={len})")]
    OutOfBounds { index: usize, len: usize },
    #[error("invalid token range {start}..={end}")]
    InvalidRange { start: usize, end: usize },
    #[error("overlapping edits: {first:?} overlaps {second:?}")]
    OverlappingEdits {
        first: (usize, usize),
        second: (usize, usize),
    },
    #[error("insertion at token {index} falls inside edited range {start}..={end}")]
    InsertInsideEdit {
        index: usize,
        start: usize,
        end: usize,
    },
}

/// Accumulates edits over an immutable token sequence and renders them in one go.
///
/// Inserts at the same boundary are emitted in the order they were queued. An insert placed
/// before the first token of a deleted or replaced range (or after its last token) survives the
/// edit; inserts strictly inside such a range are rejected, as are overlapping ranges.
#[derive(Debug)]
pub struct RewriteBuffer<'a> {
    text: &'a str,
    tokens: &'a [Token],
    ops: Vec<RewriteOp>,
    modified: bool,
}

impl<'a> RewriteBuffer<'a> {
    pub fn new(text: &'a str, tokens: &'a [Token]) -> Self {
        Self {
            text,
            tokens,
            ops: Vec::new(),
            modified: false,
        }
    }

    pub fn tokens(&self) -> &'a [Token] {
        self.tokens
    }

    pub fn token_text(&self, index: usize) -> Option<&'a str> {
        self.tokens.get(index).map(|t| t.text(self.text))
    }

    pub fn ops(&self) -> &[RewriteOp] {
        &self.ops
    }

    /// Whether any edit was queued.
    pub fn is_modified(&self) -> bool {
        self.modified
    }

    /// Queue `text` before token `index`. `index == tokens.len()` appends at the end of the file.
    pub fn insert_before(&mut self, index: usize, text: impl Into<String>) -> Result<(), RewriteError> {
        if index > self.tokens.len() {
            return Err(RewriteError::OutOfBounds {
                index,
                len: self.tokens.len(),
            });
        }
        self.check_insert(index, InsertSide::Before)?;
        self.push(RewriteOp::Insert {
            index,
            text: text.into(),
            side: InsertSide::Before,
        });
        Ok(())
    }

    pub fn insert_after(&mut self, index: usize, text: impl Into<String>) -> Result<(), RewriteError> {
        self.check_index(index)?;
        self.check_insert(index, InsertSide::After)?;
        self.push(RewriteOp::Insert {
            index,
            text: text.into(),
            side: InsertSide::After,
        });
        Ok(())
    }

    pub fn delete(&mut self, start: usize, end: usize) -> Result<(), RewriteError> {
        self.check_range(start, end)?;
        self.push(RewriteOp::Delete { start, end });
        Ok(())
    }

    pub fn replace(
        &mut self,
        start: usize,
        end: usize,
        text: impl Into<String>,
    ) -> Result<(), RewriteError> {
        self.check_range(start, end)?;
        self.push(RewriteOp::Replace {
            start,
            end,
            text: text.into(),
        });
        Ok(())
    }

    fn push(&mut self, op: RewriteOp) {
        self.ops.push(op);
        self.modified = true;
    }

    fn check_index(&self, index: usize) -> Result<(), RewriteError> {
        if index >= self.tokens.len() {
            return Err(RewriteError::OutOfBounds {
                index,
                len: self.tokens.len(),
            });
        }
        Ok(())
    }

    fn check_range(&self, start: usize, end: usize) -> Result<(), RewriteError> {
        if start > end {
            return Err(RewriteError::InvalidRange { start, end });
        }
        self.check_index(end)?;

        for op in &self.ops {
            match op {
                RewriteOp::Insert { index, side, .. } => {
                    if insert_is_inside(*index, *side, start, end) {
                        return Err(RewriteError::InsertInsideEdit {
                            index: *index,
                            start,
                            end,
                        });
                    }
                }
                _ => {
                    if let Some((s, e)) = op.range() {
                        if s <= end && start <= e {
                            return Err(RewriteError::OverlappingEdits {
                                first: (s, e),
                                second: (start, end),
                            });
                        }
                    }
                }
            }
        }
        Ok(())
    }

    fn check_insert(&self, index: usize, side: InsertSide) -> Result<(), RewriteError> {
        for (start, end) in self.ops.iter().filter_map(RewriteOp::range) {
            if insert_is_inside(index, side, start, end) {
                return Err(RewriteError::InsertInsideEdit { index, start, end });
            }
        }
        Ok(())
    }

    /// Render the original text with every queued edit applied.
    pub fn render(&self) -> String {
        let mut before: BTreeMap<usize, Vec<&str>> = BTreeMap::new();
        let mut after: BTreeMap<usize, Vec<&str>> = BTreeMap::new();
        let mut ranges: BTreeMap<usize, (usize, &str)> = BTreeMap::new();

        for op in &self.ops {
            match op {
                RewriteOp::Insert { index, text, side } => {
                    let map = match side {
                        InsertSide::Before => &mut before,
                        InsertSide::After => &mut after,
                    };
                    map.entry(*index).or_default().push(text);
                }
                RewriteOp::Delete { start, end } => {
                    ranges.insert(*start, (*end, ""));
                }
                RewriteOp::Replace { start, end, text } => {
                    ranges.insert(*start, (*end, text.as_str()));
                }
            }
        }

        let mut out = String::with_capacity(self.text.len());
        let mut idx = 0usize;
        while idx < self.tokens.len() {
            if let Some(texts) = before.get(&idx) {
                texts.iter().for_each(|t| out.push_str(t));
            }

            let last = match ranges.get(&idx) {
                Some((end, replacement)) => {
                    out.push_str(replacement);
                    *end
                }
                None => {
                    out.push_str(self.tokens[idx].text(self.text));
                    idx
                }
            };

            if let Some(texts) = after.get(&last) {
                texts.iter().for_each(|t| out.push_str(t));
            }
            idx = last + 1;
        }

        if let Some(texts) = before.get(&self.tokens.len()) {
            texts.iter().for_each(|t| out.push_str(t));
        }
        out
    }
}

fn insert_is_inside(index: usize, side: InsertSide, start: usize, end: usize) -> bool {
    match side {
        InsertSide::Before => start < index && index <= end,
        InsertSide::After => start <= index && index < end,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use codart_syntax::lex;
    use pretty_assertions::assert_eq;

    const TEXT: &str = "int a = b + c;";

    fn significant(tokens: &[Token]) -> Vec<usize> {
        tokens
            .iter()
            .enumerate()
            .filter(|(_, t)| !t.kind.is_trivia())
            .map(|(i, _)| i)
            .collect()
    }

    #[test]
    fn untouched_buffer_renders_original() {
        let tokens = lex(TEXT);
        let buffer = RewriteBuffer::new(TEXT, &tokens);
        assert!(!buffer.is_modified());
        assert_eq!(buffer.render(), TEXT);
    }

    #[test]
    fn replace_delete_and_inserts_compose() {
        let tokens = lex(TEXT);
        let sig = significant(&tokens);
        // int a = b + c ;
        // 0   1 2 3 4 5 6
        let mut buffer = RewriteBuffer::new(TEXT, &tokens);
        buffer.replace(sig[3], sig[3], "x.b").unwrap();
        buffer.delete(sig[4] - 1, sig[5]).unwrap();
        buffer.insert_before(sig[0], "final ").unwrap();
        buffer.insert_before(sig[0], "/*1*/").unwrap();
        buffer.insert_after(sig[6], " // done").unwrap();
        assert!(buffer.is_modified());
        assert_eq!(buffer.render(), "final /*1*/int a = x.b; // done");
    }

    #[test]
    fn inserts_at_range_edges_survive() {
        let tokens = lex(TEXT);
        let sig = significant(&tokens);
        let mut buffer = RewriteBuffer::new(TEXT, &tokens);
        buffer.replace(sig[3], sig[5], "z").unwrap();
        buffer.insert_before(sig[3], "(").unwrap();
        buffer.insert_after(sig[5], ")").unwrap();
        assert_eq!(buffer.render(), "int a = (z);");
    }

    #[test]
    fn append_at_end_of_file() {
        let tokens = lex(TEXT);
        let mut buffer = RewriteBuffer::new(TEXT, &tokens);
        buffer.insert_before(tokens.len(), "\n").unwrap();
        assert_eq!(buffer.render(), "int a = b + c;\n");
    }

    #[test]
    fn overlapping_ranges_are_rejected() {
        let tokens = lex(TEXT);
        let mut buffer = RewriteBuffer::new(TEXT, &tokens);
        buffer.delete(2, 6).unwrap();
        assert_eq!(
            buffer.replace(6, 8, "x"),
            Err(RewriteError::OverlappingEdits {
                first: (2, 6),
                second: (6, 8),
            })
        );
        // Touching ranges are fine.
        buffer.replace(7, 8, "x").unwrap();
        assert_eq!(buffer.ops().len(), 2);
    }

    #[test]
    fn inserts_inside_ranges_are_rejected() {
        let tokens = lex(TEXT);
        let mut buffer = RewriteBuffer::new(TEXT, &tokens);
        buffer.delete(2, 6).unwrap();
        assert!(matches!(
            buffer.insert_before(4, "x"),
            Err(RewriteError::InsertInsideEdit { index: 4, .. })
        ));
        assert!(matches!(
            buffer.insert_after(2, "x"),
            Err(RewriteError::InsertInsideEdit { index: 2, .. })
        ));

        let mut buffer = RewriteBuffer::new(TEXT, &tokens);
        buffer.insert_after(3, "x").unwrap();
        assert!(matches!(
            buffer.replace(2, 6, "y"),
            Err(RewriteError::InsertInsideEdit { index: 3, .. })
        ));
    }

    #[test]
    fn out_of_bounds_and_inverted_ranges() {
        let tokens = lex(TEXT);
        let len = tokens.len();
        let mut buffer = RewriteBuffer::new(TEXT, &tokens);
        assert_eq!(
            buffer.delete(0, len),
            Err(RewriteError::OutOfBounds { index: len, len })
        );
        assert_eq!(
            buffer.insert_after(len, "x"),
            Err(RewriteError::OutOfBounds { index: len, len })
        );
        assert_eq!(
            buffer.replace(3, 2, "x"),
            Err(RewriteError::InvalidRange { start: 3, end: 2 })
        );
        assert!(!buffer.is_modified());
    }
}
