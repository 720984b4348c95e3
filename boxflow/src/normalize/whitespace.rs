//! Whitespace pruning and word splitting. Text boxes that are pure
//! whitespace survive only where the whitespace is significant; everything
//! kept is split into words for line breaking.

use crate::box_tree::{BoxId, BoxTree, Text};

/// Prunes insignificant whitespace-only text boxes and splits the survivors
/// into words. Children are visited in reverse so removal doesn't disturb
/// the indices still to be visited.
pub fn correct_text_boxes(tree: &mut BoxTree, id: BoxId) {
    apply_generated_content(tree, id);

    let count = tree[id].children.len();
    for i in (0..count).rev() {
        let child = tree[id].children[i];
        if !tree[child].is_text() {
            correct_text_boxes(tree, child);
            continue;
        }

        if keep_text_box(tree, id, i) {
            parse_to_words(tree, child);
        } else {
            tree.destroy(child);
        }
    }
}

/// Turns a quoted `content` value on a childless element into a text child,
/// so generated content flows through the same pruning and word splitting.
fn apply_generated_content(tree: &mut BoxTree, id: BoxId) {
    if tree[id].tag.is_none() || !tree[id].children.is_empty() || tree[id].is_text() {
        return;
    }
    let content = tree[id].styles.get("content").to_string();
    let quoted = content.len() >= 2 &&
        ((content.starts_with('"') && content.ends_with('"')) ||
            (content.starts_with('\'') && content.ends_with('\'')));
    if !quoted {
        return;
    }
    let text = content[1..content.len() - 1].to_string();
    let text_box = tree.alloc(crate::box_tree::BoxNode::new_text(text));
    tree.append(id, text_box);
}

fn keep_text_box(tree: &BoxTree, parent: BoxId, index: usize) -> bool {
    let children = &tree[parent].children;
    let child = children[index];
    let node = &tree[child];

    let has_content = match node.text {
        Some(Text::Raw(ref t)) => !t.chars().all(char::is_whitespace),
        Some(Text::Words(_)) => true,
        None => false,
    };
    if has_content || node.is_preformatted() || children.len() == 1 {
        return true;
    }

    // Whitespace between two inline boxes separates words.
    if index > 0 &&
        index < children.len() - 1 &&
        tree[children[index - 1]].is_inline() &&
        tree[children[index + 1]].is_inline()
    {
        return true;
    }

    // Leading/trailing whitespace next to an inline sibling, inside an
    // inline container, is visible at the container boundary.
    if tree[parent].is_inline() && children.len() > 1 {
        if index == 0 && tree[children[1]].is_inline() {
            return true;
        }
        if index == children.len() - 1 && tree[children[index - 1]].is_inline() {
            return true;
        }
    }

    false
}

fn parse_to_words(tree: &mut BoxTree, id: BoxId) {
    let raw = match tree[id].text {
        Some(Text::Raw(ref t)) => t.clone(),
        _ => return,
    };
    let preserve = tree[id].is_preformatted();
    tree[id].text = Some(Text::Words(split_words(&raw, preserve)));
}

/// Splits text into word tokens. Collapsed mode folds every whitespace run
/// into a single `" "` token; preserve mode keeps text verbatim, with each
/// newline as its own `"\n"` token.
pub fn split_words(text: &str, preserve: bool) -> Vec<String> {
    let mut words = Vec::new();

    if preserve {
        let mut current = String::new();
        for ch in text.chars() {
            if ch == '\n' {
                if !current.is_empty() {
                    words.push(std::mem::replace(&mut current, String::new()));
                }
                words.push("\n".to_string());
            } else {
                current.push(ch);
            }
        }
        if !current.is_empty() {
            words.push(current);
        }
        return words;
    }

    let mut current = String::new();
    for ch in text.chars() {
        if ch.is_whitespace() {
            if !current.is_empty() {
                words.push(std::mem::replace(&mut current, String::new()));
            }
            if words.last().map(|w| &**w) != Some(" ") {
                words.push(" ".to_string());
            }
        } else {
            current.push(ch);
        }
    }
    if !current.is_empty() {
        words.push(current);
    }
    words
}
