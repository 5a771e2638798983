//! Splits an update document into `(verb text, body text)` pairs.
//!
//! Three counters are tracked while scanning: `<...>` depth, `{...}` depth
//! and whether we are inside a `"..."` literal. Only a `;` at brace depth 0
//! ends a verb, and only braces outside IRIs and literals delimit a body.

use super::UpdateError;

/// One operation before its verb and body are interpreted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawOperation {
    /// Everything between the previous operation and the opening brace,
    /// prologue declarations included.
    pub head: String,
    /// `None` when the head was ended by `;` or the end of input instead
    /// of a block.
    pub body: Option<String>,
}

#[derive(Debug, Default)]
struct Scanner {
    angle: usize,
    brace: usize,
    in_quote: bool,
    escaped: bool,
    head: String,
    body: String,
}

impl Scanner {
    fn push(&mut self, c: char) {
        if self.brace > 0 {
            self.body.push(c);
        } else {
            self.head.push(c);
        }
    }

    /// Close a head that has no block; blank heads vanish.
    fn end_head(&mut self, ops: &mut Vec<RawOperation>) {
        let head = std::mem::take(&mut self.head);
        if !head.trim().is_empty() {
            ops.push(RawOperation { head, body: None });
        }
    }
}

/// Scan `document` into raw operations, in document order.
pub fn scan(document: &str) -> Result<Vec<RawOperation>, UpdateError> {
    let mut s = Scanner::default();
    let mut ops = Vec::new();

    for c in document.chars() {
        if s.in_quote {
            s.push(c);
            if s.escaped {
                s.escaped = false;
            } else if c == '\\' {
                s.escaped = true;
            } else if c == '"' {
                s.in_quote = false;
            }
            continue;
        }

        match c {
            '"' => {
                s.in_quote = true;
                s.push(c);
            }
            '<' => {
                s.angle += 1;
                s.push(c);
            }
            '>' if s.angle > 0 => {
                s.angle -= 1;
                s.push(c);
            }
            _ if s.angle > 0 => s.push(c),
            '{' if s.brace == 0 => s.brace = 1,
            '{' => {
                s.brace += 1;
                s.push(c);
            }
            '}' if s.brace == 1 => {
                s.brace = 0;
                ops.push(RawOperation {
                    head: std::mem::take(&mut s.head),
                    body: Some(std::mem::take(&mut s.body).trim().to_string()),
                });
            }
            '}' if s.brace == 0 => {
                return Err(UpdateError::Lexical("unexpected `}`".to_string()));
            }
            '}' => {
                s.brace -= 1;
                s.push(c);
            }
            ';' if s.brace == 0 => s.end_head(&mut ops),
            _ => s.push(c),
        }
    }

    if s.in_quote {
        return Err(UpdateError::Lexical("unterminated string literal".to_string()));
    }
    if s.angle > 0 {
        return Err(UpdateError::Lexical("unterminated IRI".to_string()));
    }
    if s.brace > 0 {
        return Err(UpdateError::Lexical("unterminated `{` block".to_string()));
    }

    s.end_head(&mut ops);
    Ok(ops)
}
