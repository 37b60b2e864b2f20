//! Dump printer
//!
//! Reproduces the textual dump a tree was decoded from, so that
//! `decode(text)?.render() == text` for any well-formed dump.

use std::fmt;

use super::ast::{Node, NodeKind};

impl Node {
    /// Render this node and its subtree in dump form
    pub fn render(&self) -> String {
        let mut out = String::new();
        write_node(self, 0, &mut out);
        out.trim_start_matches(['\r', '\n']).to_string()
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

fn write_node(node: &Node, indent: usize, out: &mut String) {
    // Literals render inline on their parent's line.
    if let NodeKind::Literal { value } = &node.kind {
        out.push_str(" \"");
        escape_into(value, out);
        out.push('"');
        return;
    }

    out.push('\n');
    out.extend(std::iter::repeat(' ').take(indent));
    out.push_str(node.name());

    if let NodeKind::In { negated: true, .. } = node.kind {
        out.push('!');
    }
    if node.soak {
        out.push('?');
    }
    match &node.kind {
        NodeKind::Op { operator, flip, .. } => {
            out.push(' ');
            out.push_str(operator);
            if *flip {
                out.push('!');
            }
        }
        NodeKind::Bool { value } => {
            out.push(' ');
            out.push_str(value);
        }
        _ => {}
    }

    for child in node.children() {
        write_node(child, indent + 2, out);
    }
}

/// Put a backslash in front of every run of newline characters
fn escape_into(value: &str, out: &mut String) {
    let mut in_run = false;
    for c in value.chars() {
        let newline = c == '\n' || c == '\r';
        if newline && !in_run {
            out.push('\\');
        }
        in_run = newline;
        out.push(c);
    }
}

#[cfg(test)]
mod tests {
    use crate::parser::decode;

    fn round_trip(text: &str) {
        let tree = decode(text).unwrap();
        assert_eq!(tree.render(), text);
    }

    #[test]
    fn test_render_assignment() {
        round_trip("Block\n  Assign\n    Value \"x\"\n    Value \"127\"");
    }

    #[test]
    fn test_render_op_header() {
        round_trip("Op >\n  Op >\n    Value \"200\"\n    Value \"x\"\n  Value \"60\"");
    }

    #[test]
    fn test_render_postfix_and_negated_in() {
        round_trip("Block\n  Op ++!\n    Value \"a\"\n  In!\n    Value \"a\"\n    Value\n      Arr");
    }

    #[test]
    fn test_render_soak_and_bool() {
        round_trip("Block\n  Value \"a\"\n    Access? \"b\"\n  Bool true\n  Null\n  Undefined");
    }

    #[test]
    fn test_render_escaped_newlines() {
        round_trip("Value \"\"one\\\ntwo\\\n\nthree\"\"");
    }

    #[test]
    fn test_render_display_matches_render() {
        let tree = decode("Block\n  Comment").unwrap();
        assert_eq!(tree.to_string(), "Block\n  Comment");
    }
}
