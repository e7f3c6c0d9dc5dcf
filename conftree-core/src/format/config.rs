use crate::platform::{PlatformSpec, NEWLINE_MARKER};
use crate::tree::{Node, PATH_SEPARATOR};

/// Render a tree as indented configuration text.
///
/// Top-level sections are followed by the platform separator, and sections
/// with a dedicated closing command get it at the header's indentation.
pub fn format_config(node: &Node, masked: bool) -> String {
    let spec = node.spec();
    let mut out = String::new();
    if !node.is_root() {
        write_section(node, 0, spec, masked, &mut out);
        return out;
    }
    for child in &node.children {
        write_section(child, 0, spec, masked, &mut out);
        if !child.children.is_empty() {
            push_line(&mut out, "", spec.separator());
        }
    }
    out
}

/// Render a tree as a flat command stream, leaving every section with its
/// closing command unless the platform closes it implicitly.
pub fn format_patch(node: &Node, masked: bool) -> String {
    let spec = node.spec();
    let mut out = String::new();
    if !node.is_root() {
        write_patch(node, spec, masked, &mut out);
        return out;
    }
    for child in &node.children {
        write_patch(child, spec, masked, &mut out);
    }
    out
}

/// Render one line per node holding its full ancestor path.
pub fn format_formal(node: &Node) -> String {
    let mut out = String::new();
    let prefix: Vec<&str> = if node.is_root() {
        Vec::new()
    } else {
        push_line(&mut out, "", &one_line(&node.line));
        vec![node.line.as_str()]
    };
    node.walk(&mut |path, child| {
        let parts: Vec<&str> = prefix
            .iter()
            .chain(path.iter())
            .copied()
            .chain(std::iter::once(child.line.as_str()))
            .collect();
        push_line(&mut out, "", &one_line(&parts.join(PATH_SEPARATOR)));
    });
    out
}

fn write_section(
    node: &Node,
    depth: usize,
    spec: &dyn PlatformSpec,
    masked: bool,
    out: &mut String,
) {
    let indent = spec.indent().repeat(depth);
    push_line(out, &indent, &display_line(&node.line, spec, masked));
    for child in &node.children {
        write_section(child, depth + 1, spec, masked, out);
    }
    if node.children.is_empty() {
        return;
    }
    if let Some(exit) = spec.required_exit(&node.line) {
        push_line(out, &indent, exit);
    }
}

fn write_patch(node: &Node, spec: &dyn PlatformSpec, masked: bool, out: &mut String) {
    push_line(out, "", &display_line(&node.line, spec, masked));
    if node.children.is_empty() {
        return;
    }
    for child in &node.children {
        write_patch(child, spec, masked, out);
    }
    if let Some(exit) = spec.patch_exit(&node.line) {
        push_line(out, "", exit);
    }
}

fn display_line(line: &str, spec: &dyn PlatformSpec, masked: bool) -> String {
    let line = if masked {
        spec.mask(line)
    } else {
        line.to_string()
    };
    line.replace(NEWLINE_MARKER, "\n")
}

fn one_line(line: &str) -> String {
    line.replace(NEWLINE_MARKER, "\\n")
}

fn push_line(out: &mut String, indent: &str, line: &str) {
    out.push_str(indent);
    out.push_str(line);
    out.push('\n');
}
