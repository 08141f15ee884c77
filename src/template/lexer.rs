//! Template tokenizer - phase one of compilation.
//!
//! Scans the static fragments as one stream of markup with holes between
//! them. The lexer state at each hole decides what the hole is:
//!
//! ```text
//! <div class=${a} ...${b}>${c}</div>
//!            ^attr    ^spread ^slot
//! ```
//!
//! Holes anywhere else (tag names, closing tags, comments, the middle of a
//! quoted value, bare tag position) are rejected, as is input that ends in
//! any state other than text.

use crate::error::CompileError;

const PARTIAL_ATTRIBUTE: &str = "partial attribute interpolation; quote the whole value";

/// What a hole between two fragments stands for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Hole {
    Slot,
    Attr { name: String },
    Spread,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Token {
    /// Markup text between tags
    Text(String),
    /// Body of `<!-- ... -->`
    Comment(String),
    /// `<name`
    OpenTag { name: String },
    /// Static source inside an opening tag (attributes, whitespace)
    TagSource(String),
    /// `>` or `/>`
    TagEnd { self_closing: bool },
    /// `</name>`
    CloseTag { name: String },
    /// The dynamic value with this index
    Hole { index: usize, hole: Hole },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Text,
    TagName,
    InTag,
    Quoted(char),
    Comment,
    CloseTag,
}

struct Lexer<'a> {
    template: &'a str,
    tokens: Vec<Token>,
    state: State,
    buf: String,
    /// Closing quote expected at the start of the next fragment
    pending_quote: Option<char>,
}

/// Tokenize `fragments`; a hole sits between every pair of fragments.
pub(crate) fn tokenize(fragments: &[&str], template: &str) -> Result<Vec<Token>, CompileError> {
    let mut lexer = Lexer {
        template,
        tokens: Vec::new(),
        state: State::Text,
        buf: String::new(),
        pending_quote: None,
    };

    for (index, fragment) in fragments.iter().enumerate() {
        let chars: Vec<char> = fragment.chars().collect();
        let mut pos = 0;

        if let Some(quote) = lexer.pending_quote.take() {
            if chars.first() != Some(&quote) {
                return Err(lexer.malformed(PARTIAL_ATTRIBUTE));
            }
            pos = 1;
        }

        while pos < chars.len() {
            pos = lexer.step(&chars, pos)?;
        }

        if index + 1 < fragments.len() {
            lexer.hole(index)?;
        }
    }

    lexer.finish()
}

fn starts_with(chars: &[char], pattern: &str) -> bool {
    let mut rest = chars.iter();
    pattern.chars().all(|p| rest.next() == Some(&p))
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | ':' | '.')
}

impl Lexer<'_> {
    fn malformed(&self, reason: impl Into<String>) -> CompileError {
        CompileError::Malformed {
            template: self.template.to_string(),
            reason: reason.into(),
        }
    }

    fn flush_text(&mut self) {
        if !self.buf.is_empty() {
            self.tokens.push(Token::Text(std::mem::take(&mut self.buf)));
        }
    }

    fn flush_tag_source(&mut self) {
        if !self.buf.is_empty() {
            self.tokens.push(Token::TagSource(std::mem::take(&mut self.buf)));
        }
    }

    /// Consume input at `pos`, returning the next position.
    fn step(&mut self, chars: &[char], pos: usize) -> Result<usize, CompileError> {
        let c = chars[pos];
        let rest = &chars[pos + 1..];

        match self.state {
            State::Text => {
                if c != '<' {
                    self.buf.push(c);
                    return Ok(pos + 1);
                }
                if starts_with(rest, "!--") {
                    self.flush_text();
                    self.state = State::Comment;
                    Ok(pos + 4)
                } else if rest.first() == Some(&'/') {
                    self.flush_text();
                    self.state = State::CloseTag;
                    Ok(pos + 2)
                } else if rest.first().is_some_and(|n| n.is_ascii_alphabetic()) {
                    self.flush_text();
                    self.state = State::TagName;
                    Ok(pos + 1)
                } else if rest.is_empty() {
                    Err(self.malformed("`<` must be followed by a literal tag name"))
                } else {
                    self.buf.push(c);
                    Ok(pos + 1)
                }
            }
            State::Comment => {
                if c == '-' && starts_with(rest, "->") {
                    self.tokens.push(Token::Comment(std::mem::take(&mut self.buf)));
                    self.state = State::Text;
                    Ok(pos + 3)
                } else {
                    self.buf.push(c);
                    Ok(pos + 1)
                }
            }
            State::TagName => {
                if is_name_char(c) {
                    self.buf.push(c);
                    return Ok(pos + 1);
                }
                let name = std::mem::take(&mut self.buf);
                self.tokens.push(Token::OpenTag { name });
                self.state = State::InTag;
                if c.is_whitespace() {
                    self.buf.push(c);
                    Ok(pos + 1)
                } else if c == '>' || c == '/' {
                    // let InTag handle the tag end
                    Ok(pos)
                } else {
                    Err(self.malformed(format!("invalid character `{c}` in tag name")))
                }
            }
            State::InTag => match c {
                '"' | '\'' => {
                    self.buf.push(c);
                    self.state = State::Quoted(c);
                    Ok(pos + 1)
                }
                '>' => {
                    self.flush_tag_source();
                    self.tokens.push(Token::TagEnd { self_closing: false });
                    self.state = State::Text;
                    Ok(pos + 1)
                }
                '/' if rest.first() == Some(&'>') => {
                    self.flush_tag_source();
                    self.tokens.push(Token::TagEnd { self_closing: true });
                    self.state = State::Text;
                    Ok(pos + 2)
                }
                '<' => Err(self.malformed("unexpected `<` inside a tag")),
                _ => {
                    self.buf.push(c);
                    Ok(pos + 1)
                }
            },
            State::Quoted(quote) => {
                self.buf.push(c);
                if c == quote {
                    self.state = State::InTag;
                }
                Ok(pos + 1)
            }
            State::CloseTag => {
                if c == '>' {
                    let name = std::mem::take(&mut self.buf).trim().to_string();
                    if name.is_empty() {
                        return Err(self.malformed("empty closing tag"));
                    }
                    self.tokens.push(Token::CloseTag { name });
                    self.state = State::Text;
                } else if is_name_char(c) || c.is_whitespace() {
                    self.buf.push(c);
                } else {
                    return Err(self.malformed(format!("invalid character `{c}` in closing tag")));
                }
                Ok(pos + 1)
            }
        }
    }

    /// Name of the attribute whose `=` ends the buffer.
    fn trailing_attr_name(&self) -> String {
        let before_eq = self.buf.trim_end_matches('=');
        let start = before_eq
            .char_indices()
            .rev()
            .find(|(_, c)| c.is_whitespace() || *c == '"' || *c == '\'')
            .map_or(0, |(i, c)| i + c.len_utf8());
        before_eq[start..].to_string()
    }

    /// Classify the hole for value `index` from the current state.
    fn hole(&mut self, index: usize) -> Result<(), CompileError> {
        match self.state {
            State::Text => {
                self.flush_text();
                self.tokens.push(Token::Hole { index, hole: Hole::Slot });
                Ok(())
            }
            State::InTag => {
                if self.buf.ends_with("...") {
                    self.buf.truncate(self.buf.len() - 3);
                    self.flush_tag_source();
                    self.tokens.push(Token::Hole { index, hole: Hole::Spread });
                    Ok(())
                } else if self.buf.ends_with('=') {
                    let name = self.trailing_attr_name();
                    if name.is_empty() {
                        return Err(self.malformed("attribute value without a name"));
                    }
                    self.flush_tag_source();
                    self.tokens.push(Token::Hole { index, hole: Hole::Attr { name } });
                    Ok(())
                } else {
                    Err(self.malformed("a dynamic value inside a tag must follow `name=` or `...`"))
                }
            }
            State::Quoted(quote) => {
                let opens_value = {
                    let mut tail = self.buf.chars().rev();
                    tail.next() == Some(quote) && tail.next() == Some('=')
                };
                if !opens_value {
                    return Err(self.malformed(PARTIAL_ATTRIBUTE));
                }
                self.buf.pop();
                let name = self.trailing_attr_name();
                self.flush_tag_source();
                self.tokens.push(Token::Hole { index, hole: Hole::Attr { name } });
                self.state = State::InTag;
                self.pending_quote = Some(quote);
                Ok(())
            }
            State::TagName => Err(self.malformed("dynamic values cannot appear in a tag name")),
            State::Comment => Err(self.malformed("dynamic values cannot appear inside a comment")),
            State::CloseTag => Err(self.malformed("dynamic values cannot appear in a closing tag")),
        }
    }

    fn finish(mut self) -> Result<Vec<Token>, CompileError> {
        match self.state {
            State::Text => {
                self.flush_text();
                Ok(self.tokens)
            }
            State::TagName | State::InTag => Err(self.malformed("unterminated tag")),
            State::Quoted(_) => Err(self.malformed("unterminated quoted attribute value")),
            State::Comment => Err(self.malformed("unterminated comment")),
            State::CloseTag => Err(self.malformed("unterminated closing tag")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex(fragments: &[&str]) -> Result<Vec<Token>, CompileError> {
        tokenize(fragments, "test")
    }

    fn reason(err: CompileError) -> String {
        match err {
            CompileError::Malformed { reason, .. } => reason,
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_slot_hole() {
        let tokens = lex(&["<div>", "</div>"]).unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::OpenTag { name: "div".into() },
                Token::TagEnd { self_closing: false },
                Token::Hole { index: 0, hole: Hole::Slot },
                Token::CloseTag { name: "div".into() },
            ]
        );
    }

    #[test]
    fn test_attr_and_spread_holes() {
        let tokens = lex(&["<Count ...", " onclick=", " />"]).unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::OpenTag { name: "Count".into() },
                Token::TagSource(" ".into()),
                Token::Hole { index: 0, hole: Hole::Spread },
                Token::TagSource(" onclick=".into()),
                Token::Hole { index: 1, hole: Hole::Attr { name: "onclick".into() } },
                Token::TagSource(" ".into()),
                Token::TagEnd { self_closing: true },
            ]
        );
    }

    #[test]
    fn test_quoted_whole_value_is_attr() {
        let tokens = lex(&["<input value=\"", "\">"]).unwrap();
        assert_eq!(
            tokens[1..],
            [
                Token::TagSource(" value=".into()),
                Token::Hole { index: 0, hole: Hole::Attr { name: "value".into() } },
                Token::TagEnd { self_closing: false },
            ]
        );
    }

    #[test]
    fn test_static_quoted_gt_does_not_end_tag() {
        let tokens = lex(&["<a title=\"x > y\">go</a>"]).unwrap();
        assert_eq!(tokens[1], Token::TagSource(" title=\"x > y\"".into()));
        assert_eq!(tokens[3], Token::Text("go".into()));
    }

    #[test]
    fn test_comment_and_lone_lt() {
        let tokens = lex(&["a < b<!-- note -->"]).unwrap();
        assert_eq!(
            tokens,
            vec![Token::Text("a < b".into()), Token::Comment(" note ".into())]
        );
    }

    #[test]
    fn test_malformed_inputs() {
        assert!(reason(lex(&["<div"]).unwrap_err()).contains("unterminated tag"));
        assert!(reason(lex(&["<a href=\"x>"]).unwrap_err()).contains("unterminated quoted"));
        assert!(reason(lex(&["<!-- x"]).unwrap_err()).contains("unterminated comment"));
        assert!(reason(lex(&["<div></div"]).unwrap_err()).contains("unterminated closing"));
        assert!(reason(lex(&["<", ">"]).unwrap_err()).contains("literal tag name"));
        assert!(reason(lex(&["<div ", ">"]).unwrap_err()).contains("must follow"));
        assert!(reason(lex(&["<a class=\"x ", "\">"]).unwrap_err()).contains("partial"));
        assert!(reason(lex(&["<!-- ", " -->"]).unwrap_err()).contains("comment"));
    }
}
