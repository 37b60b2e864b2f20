//! Line-oriented dump reader
//!
//! ```text
//! record   := indent(spaces) type(non-space run) [' ' argument-to-eol] newline
//! children := records whose indent == parent indent + 2
//! ```
//!
//! Reading is speculative: [`DumpReader::read_if`] reads a record, asks a
//! predicate whether to accept it, and rewinds to a [`Marker`] if not. This is
//! how the end of a child list is detected without overreading.

use super::ast::{self, Node};
use super::DecodeError;

/// Snapshot of all reader state, restorable with [`DumpReader::reset`]
#[derive(Debug, Clone)]
pub struct Marker {
    position: usize,
    line: usize,
    indent: usize,
    token: String,
    argument: Option<String>,
}

/// Dump reader over a borrowed source text
#[derive(Debug)]
pub struct DumpReader<'a> {
    source: &'a str,
    position: usize,
    line: usize,
    indent: usize,
    token: String,
    argument: Option<String>,
}

impl<'a> DumpReader<'a> {
    /// Create a reader positioned at the start of `source`
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            position: 0,
            line: 1,
            indent: 0,
            token: String::new(),
            argument: None,
        }
    }

    /// Indent width of the last record read
    pub fn indent(&self) -> usize {
        self.indent
    }

    /// Type token of the last record read, including any soak marker
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Argument of the last record read
    pub fn argument(&self) -> Option<&str> {
        self.argument.as_deref()
    }

    /// Current line (1-based)
    pub fn line(&self) -> usize {
        self.line
    }

    /// Unread input
    pub fn rest(&self) -> &'a str {
        &self.source[self.position..]
    }

    /// Capture the reader state
    pub fn mark(&self) -> Marker {
        Marker {
            position: self.position,
            line: self.line,
            indent: self.indent,
            token: self.token.clone(),
            argument: self.argument.clone(),
        }
    }

    /// Restore a previously captured state
    pub fn reset(&mut self, marker: Marker) {
        self.position = marker.position;
        self.line = marker.line;
        self.indent = marker.indent;
        self.token = marker.token;
        self.argument = marker.argument;
    }

    /// Read the root record and its subtree
    pub fn parse(&mut self) -> Result<Node, DecodeError> {
        match self.read_if(|_| true)? {
            Some(node) => Ok(node),
            None => Err(DecodeError::Malformed {
                line: self.line,
                message: "expected a record".to_string(),
            }),
        }
    }

    /// Read one record with its subtree if `accept` approves of its header.
    ///
    /// On rejection (or at end of input) all state is rewound and `None` is
    /// returned.
    pub fn read_if<F>(&mut self, accept: F) -> Result<Option<Node>, DecodeError>
    where
        F: Fn(&DumpReader<'a>) -> bool,
    {
        let marker = self.mark();
        let line = self.line;

        self.read_header();

        if self.token.is_empty() || !accept(self) {
            self.reset(marker);
            return Ok(None);
        }

        self.read_node(line).map(Some)
    }

    /// Read every following record at exactly `indent`
    pub fn read_children(&mut self, indent: usize) -> Result<Vec<Node>, DecodeError> {
        let mut children = Vec::new();
        while let Some(node) = self.read_if(|reader| reader.indent == indent)? {
            children.push(node);
        }
        Ok(children)
    }

    fn read_node(&mut self, line: usize) -> Result<Node, DecodeError> {
        // Children overwrite the header fields, so take them first.
        let indent = self.indent;
        let mut token = std::mem::take(&mut self.token);
        let argument = self.argument.take();

        let soak = token.ends_with('?');
        if soak {
            token.pop();
        }

        let children = self.read_children(indent + 2)?;
        ast::assemble(&token, soak, argument, children, line)
    }

    fn read_header(&mut self) {
        self.indent = self.skip_while(|c| c == ' ');

        let start = self.position;
        self.skip_while(|c| c != ' ' && c != '\n' && c != '\r');
        self.token = self.source[start..self.position].to_string();

        self.argument = if self.peek() == Some(' ') {
            self.position += 1;
            let argument = self.read_argument();
            let argument = unquote(&argument);
            (!argument.is_empty()).then(|| argument.to_string())
        } else {
            None
        };

        self.consume_newlines();
    }

    /// Read to end of line, turning backslash-newline runs into embedded newlines
    fn read_argument(&mut self) -> String {
        let mut out = String::new();
        while let Some(c) = self.peek() {
            match c {
                '\\' if matches!(self.peek_at(1), Some('\n' | '\r')) => {
                    self.position += 1;
                    let start = self.position;
                    self.consume_newlines();
                    out.push_str(&self.source[start..self.position]);
                }
                '\n' | '\r' => break,
                _ => {
                    out.push(c);
                    self.position += c.len_utf8();
                }
            }
        }
        out
    }

    fn consume_newlines(&mut self) {
        let start = self.position;
        self.skip_while(|c| c == '\n' || c == '\r');
        let run = &self.source[start..self.position];
        let newlines = run.matches('\n').count();
        self.line += if newlines == 0 && !run.is_empty() { 1 } else { newlines };
    }

    fn skip_while(&mut self, pred: impl Fn(char) -> bool) -> usize {
        let start = self.position;
        while let Some(c) = self.peek() {
            if !pred(c) {
                break;
            }
            self.position += c.len_utf8();
        }
        self.position - start
    }

    fn peek(&self) -> Option<char> {
        self.source[self.position..].chars().next()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.source[self.position..].chars().nth(offset)
    }
}

/// Strip one layer of matching `"` or `'` quotes
pub fn unquote(text: &str) -> &str {
    let bytes = text.as_bytes();
    if bytes.len() >= 2 {
        let (first, last) = (bytes[0], bytes[bytes.len() - 1]);
        if first == last && (first == b'"' || first == b'\'') {
            return &text[1..text.len() - 1];
        }
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::NodeKind;

    #[test]
    fn test_unquote() {
        assert_eq!(unquote("\"x\""), "x");
        assert_eq!(unquote("'x'"), "x");
        assert_eq!(unquote("\"\"x\"\""), "\"x\"");
        assert_eq!(unquote("\"x'"), "\"x'");
        assert_eq!(unquote("\""), "\"");
        assert_eq!(unquote("x"), "x");
    }

    #[test]
    fn test_header_fields() {
        let mut reader = DumpReader::new("  Access? \"name\"\n");
        let marker = reader.mark();
        reader.read_header();
        assert_eq!(reader.indent(), 2);
        assert_eq!(reader.token(), "Access?");
        assert_eq!(reader.argument(), Some("name"));
        assert_eq!(reader.line(), 2);

        reader.reset(marker);
        assert_eq!(reader.indent(), 0);
        assert_eq!(reader.token(), "");
        assert_eq!(reader.line(), 1);
        assert_eq!(reader.rest(), "  Access? \"name\"\n");
    }

    #[test]
    fn test_read_if_rewinds_on_rejection() {
        let mut reader = DumpReader::new("Value \"a\"\nValue \"b\"\n");
        let node = reader.read_if(|r| r.indent() == 2).unwrap();
        assert!(node.is_none());
        assert_eq!(reader.rest(), "Value \"a\"\nValue \"b\"\n");
        assert_eq!(reader.line(), 1);

        let node = reader.read_if(|r| r.indent() == 0).unwrap().unwrap();
        assert_eq!(node.simple_name(), Some("a"));
        assert_eq!(reader.rest(), "Value \"b\"\n");
    }

    #[test]
    fn test_children_by_indent() {
        let text = "Block\n  Value \"a\"\n    Access \"b\"\n  Value \"c\"\nValue \"d\"";
        let mut reader = DumpReader::new(text);
        let root = reader.parse().unwrap();
        match &root.kind {
            NodeKind::Block { expressions } => {
                assert_eq!(expressions.len(), 2);
                assert_eq!(expressions[0].children().len(), 2);
                assert_eq!(expressions[1].simple_name(), Some("c"));
                assert_eq!(expressions[1].line, 4);
            }
            other => panic!("expected Block, got {:?}", other),
        }
        assert_eq!(reader.rest(), "Value \"d\"");
    }

    #[test]
    fn test_escaped_newline_in_argument() {
        let mut reader = DumpReader::new("Value \"\"a\\\nb\"\"\nBlock");
        let node = reader.parse().unwrap();
        assert_eq!(node.children()[0].as_literal(), Some("\"a\nb\""));
        assert_eq!(reader.line(), 3);
    }

    #[test]
    fn test_crlf_line_endings() {
        let mut reader = DumpReader::new("Block\r\n  Value \"x\"\r\n");
        let root = reader.parse().unwrap();
        assert_eq!(root.children().len(), 1);
        assert_eq!(root.children()[0].simple_name(), Some("x"));
    }

    #[test]
    fn test_soak_marker() {
        let mut reader = DumpReader::new("Value \"a\"\n  Access? \"b\"");
        let root = reader.parse().unwrap();
        assert!(root.children()[1].soak);
        assert!(!root.soak);
    }
}
