//! ASCII rendering of comment threads.

use crate::models::CommentNode;

/// Marker for comments carrying attachments.
const ATTACHMENT: char = '📎';

const MIDDLE: &str = "├── ";
const LAST: &str = "└── ";

/// Longest excerpt shown per comment, in characters.
const EXCERPT_LEN: usize = 60;

/// Render a comment forest as an indented thread.
///
/// Example output:
/// ```text
/// #1 alice: Launch plan looks good
/// ├── #2 bob: Agreed 📎1
/// │   └── #4 alice: Thanks
/// └── #3 carol: One question on pricing…
/// #5 dave: Separate topic
/// ```
pub fn render_tree(nodes: &[CommentNode]) -> String {
    let mut output = String::new();
    // (node, prefix for its children, branch glyph), popped in display order
    let mut stack: Vec<(&CommentNode, String, Option<&str>)> =
        nodes.iter().rev().map(|node| (node, String::new(), None)).collect();

    while let Some((node, prefix, branch)) = stack.pop() {
        let child_prefix = match branch {
            Some(glyph) => {
                output.push_str(&prefix);
                output.push_str(glyph);
                let last = glyph == LAST;
                format!("{}{}", prefix, if last { "    " } else { "│   " })
            }
            None => String::new(),
        };
        output.push_str(&label(node));
        output.push('\n');

        let count = node.children.len();
        for (i, child) in node.children.iter().enumerate().rev() {
            let glyph = if i + 1 == count { LAST } else { MIDDLE };
            stack.push((child, child_prefix.clone(), Some(glyph)));
        }
    }
    output
}

fn label(node: &CommentNode) -> String {
    let record = &node.record;
    let mut label = format!("#{} {}: {}", record.id, record.author_id, excerpt(&record.text));
    if !record.attached_files.is_empty() {
        label.push(' ');
        label.push(ATTACHMENT);
        label.push_str(&record.attached_files.len().to_string());
    }
    label
}

/// First line of the text with inline images collapsed, cut to `EXCERPT_LEN`.
fn excerpt(text: &str) -> String {
    let first_line = text.lines().next().unwrap_or("");
    let collapsed = collapse_images(first_line);
    let collapsed = collapsed.trim();
    if collapsed.chars().count() > EXCERPT_LEN {
        let cut: String = collapsed.chars().take(EXCERPT_LEN).collect();
        format!("{}…", cut.trim_end())
    } else {
        collapsed.to_string()
    }
}

fn collapse_images(line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    let mut rest = line;
    while let Some(start) = rest.find("<img") {
        out.push_str(&rest[..start]);
        match rest[start..].find('>') {
            Some(end) => {
                out.push_str("[image]");
                rest = &rest[start + end + 1..];
            }
            None => {
                rest = &rest[start..];
                break;
            }
        }
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AttachedFile, CommentRecord};
    use chrono::Utc;

    fn make_node(id: i64, author: &str, text: &str, children: Vec<CommentNode>) -> CommentNode {
        CommentNode {
            record: CommentRecord {
                id,
                board_id: 1,
                parent_id: None,
                author_id: author.to_string(),
                text: text.to_string(),
                attached_files: Vec::new(),
                created_at: Utc::now(),
                updated_at: Utc::now(),
            },
            children,
        }
    }

    #[test]
    fn test_single_root() {
        let tree = vec![make_node(1, "alice", "Hello", vec![])];
        assert_eq!(render_tree(&tree), "#1 alice: Hello\n");
    }

    #[test]
    fn test_nested_children() {
        let tree = vec![
            make_node(
                1,
                "alice",
                "Launch plan",
                vec![
                    make_node(2, "bob", "Agreed", vec![make_node(4, "alice", "Thanks", vec![])]),
                    make_node(3, "carol", "Question", vec![]),
                ],
            ),
            make_node(5, "dave", "Other", vec![]),
        ];
        let expected = "#1 alice: Launch plan\n├── #2 bob: Agreed\n│   └── #4 alice: Thanks\n└── #3 carol: Question\n#5 dave: Other\n";
        assert_eq!(render_tree(&tree), expected);
    }

    #[test]
    fn test_attachment_marker() {
        let mut node = make_node(1, "alice", "See file", vec![]);
        node.record.attached_files.push(AttachedFile {
            file_id: "f1".to_string(),
            display_name: "a.pdf".to_string(),
        });
        assert_eq!(render_tree(&[node]), "#1 alice: See file 📎1\n");
    }

    #[test]
    fn test_excerpt_collapses_images_and_truncates() {
        assert_eq!(
            excerpt("look <img src=\"data:image/png;base64,AAAA\" alt=\"x\"> here\nsecond line"),
            "look [image] here"
        );
        let long = "x".repeat(80);
        assert_eq!(excerpt(&long), format!("{}…", "x".repeat(EXCERPT_LEN)));
    }

    #[test]
    fn test_deep_chain() {
        let mut node = make_node(2000, "alice", "leaf", vec![]);
        for id in (1..2000).rev() {
            node = make_node(id, "bob", "reply", vec![node]);
        }

        let out = render_tree(&[node]);

        assert_eq!(out.lines().count(), 2000);
        let last = out.lines().last().unwrap();
        assert_eq!(last, format!("{}└── #2000 alice: leaf", "    ".repeat(1998)));
    }
}
