//! Structural normalization of the box tree. Runs after the cascade, in a
//! fixed order; every pass leaves the tree in a state the next pass can rely
//! on, and running the whole pipeline twice is a no-op.

use crate::box_tree::{BoxId, BoxTree, Text};
use crate::context::RenderContext;
use crate::errors::ErrorReporter;
use crate::style::Display;

pub mod inline_blocks;
pub mod tables;
pub mod whitespace;

pub fn run(tree: &mut BoxTree, context: &RenderContext, errors: &mut ErrorReporter) {
    let root = tree.root();
    whitespace::correct_text_boxes(tree, root);
    correct_img_boxes(tree, root);
    correct_line_breaks(tree, root);
    inline_blocks::correct_inline_boxes_parent(tree, root);
    inline_blocks::correct_block_inside_inline(tree, root, context, errors);
    // Splitting may have left mixed inline and block siblings behind.
    inline_blocks::correct_inline_boxes_parent(tree, root);
    correct_absolute_inlines(tree, root);
    tables::correct_anonymous_tables(tree, root, context);
}

/// A block-level image still lays out as a replaced inline; give it an
/// anonymous block wrapper and demote it.
fn correct_img_boxes(tree: &mut BoxTree, id: BoxId) {
    let children = tree[id].children.clone();
    for child in children {
        if tree[child].is_image() && tree[child].display == Display::Block {
            let wrapper = tree.synthesize_anonymous(child, Display::Block);
            tree.insert_before(child, wrapper);
            tree.detach(child);
            tree.set_display(child, Display::Inline);
            tree.append(wrapper, child);
        } else {
            correct_img_boxes(tree, child);
        }
    }
}

/// A `<br>` that doesn't separate inline content contributes vertical space;
/// model that as an explicit newline word.
fn correct_line_breaks(tree: &mut BoxTree, id: BoxId) {
    let children = tree[id].children.clone();
    for child in children {
        correct_line_breaks(tree, child);
    }

    if !tree[id].is_line_break() {
        return;
    }

    let prev_is_inline = match tree.prev_sibling(id) {
        Some(prev) => tree[prev].is_inline(),
        None => false,
    };
    if prev_is_inline {
        return;
    }

    let mut cursor = tree.next_sibling(id);
    while let Some(next) = cursor {
        if tree[next].is_inline() && !tree[next].is_line_break() {
            return;
        }
        cursor = tree.next_sibling(next);
    }

    tree[id].text = Some(Text::Words(vec!["\n".to_string()]));
}

static ABSOLUTE_COPIED_PROPERTIES: &[&str] = &[
    "left", "top", "right", "bottom", "width", "height", "text-align",
];

/// An absolutely positioned inline gets an anonymous block wrapper that
/// takes over the positioning; the inline itself becomes static.
fn correct_absolute_inlines(tree: &mut BoxTree, id: BoxId) {
    let children = tree[id].children.clone();
    for child in children {
        let is_absolute_inline = tree[child].is_inline() &&
            tree[child].styles.get("position").eq_ignore_ascii_case("absolute");
        if is_absolute_inline {
            let wrapper = tree.synthesize_anonymous(child, Display::Block);
            for property in ABSOLUTE_COPIED_PROPERTIES {
                if let Some(value) = tree[child].styles.get_raw(property).map(|v| v.to_string()) {
                    tree[wrapper].styles.set(property, value);
                }
            }
            tree[wrapper].styles.set("position", "absolute");
            tree.insert_before(child, wrapper);
            tree.detach(child);
            tree[child].styles.set("position", "static");
            tree.append(wrapper, child);
        }
        correct_absolute_inlines(tree, child);
    }
}
