//! Graphviz DOT output for the retention graph.

use std::fmt::Write;

/// Escapes a label for use inside a quoted DOT string.
///
/// Member descriptors contain `<init>`-style names, so angle brackets are escaped alongside
/// quotes, backslashes and line breaks.
///
/// # Examples
///
/// ```rust
/// use shaker::utils::escape_dot;
///
/// assert_eq!(escape_dot("a.B.<init>()void"), "a.B.\\<init\\>()void");
/// ```
#[must_use]
pub fn escape_dot(label: &str) -> String {
    let mut escaped = String::with_capacity(label.len());
    for c in label.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '"' => escaped.push_str("\\\""),
            '\n' => escaped.push_str("\\n"),
            '\r' => {}
            '<' => escaped.push_str("\\<"),
            '>' => escaped.push_str("\\>"),
            other => escaped.push(other),
        }
    }
    escaped
}

/// Incremental writer for a `digraph`.
///
/// Nodes are addressed by numeric ids chosen by the caller; labels are escaped on write.
pub struct DotWriter {
    out: String,
}

impl DotWriter {
    /// Starts a digraph named `name` with boxed monospace nodes
    #[must_use]
    pub fn new(name: &str) -> Self {
        let mut out = String::new();
        let _ = writeln!(out, "digraph {name} {{");
        out.push_str("    node [shape=box, fontname=\"monospace\"];\n");
        DotWriter { out }
    }

    /// Writes a node; roots are drawn with a double border
    pub fn node(&mut self, id: usize, label: &str, root: bool) -> &mut Self {
        let style = if root { ", peripheries=2" } else { "" };
        let _ = writeln!(self.out, "    n{id} [label=\"{}\"{style}];", escape_dot(label));
        self
    }

    /// Writes an edge
    pub fn edge(&mut self, from: usize, to: usize, label: &str) -> &mut Self {
        let _ = writeln!(self.out, "    n{from} -> n{to} [label=\"{}\"];", escape_dot(label));
        self
    }

    /// Closes the digraph and returns the text
    #[must_use]
    pub fn finish(mut self) -> String {
        self.out.push_str("}\n");
        self.out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_member_descriptor() {
        assert_eq!(escape_dot("app.Main.main()void"), "app.Main.main()void");
        assert_eq!(escape_dot("app.A.<clinit>()void"), "app.A.\\<clinit\\>()void");
    }

    #[test]
    fn test_escape_quotes_and_breaks() {
        assert_eq!(escape_dot("rule \"keep\""), "rule \\\"keep\\\"");
        assert_eq!(escape_dot("a\\b"), "a\\\\b");
        assert_eq!(escape_dot("one\r\ntwo"), "one\\ntwo");
    }

    #[test]
    fn test_writer_output() {
        let mut writer = DotWriter::new("kept");
        writer
            .node(0, "rule #0", true)
            .node(1, "app.Main", false)
            .edge(0, 1, "KeepRule");
        let dot = writer.finish();

        assert!(dot.starts_with("digraph kept {\n"));
        assert!(dot.contains("    n0 [label=\"rule #0\", peripheries=2];\n"));
        assert!(dot.contains("    n1 [label=\"app.Main\"];\n"));
        assert!(dot.contains("    n0 -> n1 [label=\"KeepRule\"];\n"));
        assert!(dot.ends_with("}\n"));
    }
}
