use conftree_core::Node;

/// Render a config tree with its tags, down to `max_depth` levels below the
/// top.
pub fn render_tree(node: &Node, max_depth: usize) -> String {
    let mut out = String::new();
    if node.is_root() {
        for child in &node.children {
            render_node(child, 0, max_depth, &mut out);
        }
    } else {
        render_node(node, 0, max_depth, &mut out);
    }
    out
}

fn render_node(node: &Node, depth: usize, max_depth: usize, out: &mut String) {
    let indent = "  ".repeat(depth);
    if node.tags.is_empty() {
        out.push_str(&format!("{}{}\n", indent, node.line));
    } else {
        out.push_str(&format!("{}{} [{}]\n", indent, node.line, node.tags.join(", ")));
    }

    if depth >= max_depth {
        return;
    }

    for child in &node.children {
        render_node(child, depth + 1, max_depth, out);
    }
}
