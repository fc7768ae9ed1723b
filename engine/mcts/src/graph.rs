//! Mermaid rendering of a revision tree.
//!
//! Output is for people watching a search; it has no effect on the search.

use std::fmt::{self, Write};

use crate::node::NodeId;
use crate::tree::SearchTree;

/// Characters of content shown in each node label.
pub const LABEL_CONTENT_CHARS: usize = 25;

/// Render the whole tree as a fenced Mermaid `graph LR` block.
///
/// `highlighted`, if given, gets a cyan outline.
pub fn render_mermaid<T: fmt::Display>(tree: &SearchTree<T>, highlighted: Option<NodeId>) -> String {
    let mut body = String::new();
    // Writing into a String cannot fail.
    let _ = write_node(&mut body, tree, tree.root(), 0, highlighted);
    format!("\n```mermaid\ngraph LR\n{body}\n```\n")
}

fn write_node<T: fmt::Display>(
    out: &mut String,
    tree: &SearchTree<T>,
    id: NodeId,
    offset: usize,
    highlighted: Option<NodeId>,
) -> fmt::Result {
    let node = tree.get(id);
    let padding = " ".repeat(offset);
    let label = node.label();

    writeln!(
        out,
        "{padding}{label}({label}:{} - {})",
        node.visits,
        escape_label(&truncate(&node.content.to_string(), LABEL_CONTENT_CHARS))
    )?;

    if highlighted == Some(id) {
        writeln!(out, "{padding}style {label} stroke:#0ff")?;
    }

    for &child in &node.children {
        write_node(out, tree, child, offset + 4, highlighted)?;
        writeln!(out, "{padding}{label} --> {}", child.label())?;
    }

    Ok(())
}

fn truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

fn escape_label(text: &str) -> String {
    text.replace('"', "&quot;")
}
