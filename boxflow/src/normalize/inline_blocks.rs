//! Inline/block segregation: wraps inline runs living next to blocks in
//! anonymous blocks, and splits inline boxes that contain blocks into
//! inline continuations with the blocks hoisted out.

use crate::box_tree::{BoxId, BoxTree};
use crate::context::{DebugFlags, RenderContext};
use crate::errors::{CorrectionError, ErrorKind, ErrorReporter};
use crate::style::Display;

/// A block container must have either only inline children or only block
/// children. Where both appear, each maximal run of inline siblings is
/// wrapped in an anonymous block.
pub fn correct_inline_boxes_parent(tree: &mut BoxTree, id: BoxId) {
    if tree.contains_variant_boxes(id) {
        let children = tree[id].children.clone();
        let mut run: Vec<BoxId> = Vec::new();
        for child in children {
            if tree[child].is_inline() {
                run.push(child);
            } else {
                wrap_inline_run(tree, id, &mut run);
            }
        }
        wrap_inline_run(tree, id, &mut run);
    }

    let children = tree[id].children.clone();
    for child in children {
        if !tree.contains_inlines_only(child) {
            correct_inline_boxes_parent(tree, child);
        }
    }
}

fn wrap_inline_run(tree: &mut BoxTree, parent: BoxId, run: &mut Vec<BoxId>) {
    let first = match run.first() {
        Some(f) => *f,
        None => return,
    };
    let wrapper = tree.synthesize_anonymous(parent, Display::Block);
    tree.insert_before(first, wrapper);
    for member in run.drain(..) {
        tree.detach(member);
        tree.append(wrapper, member);
    }
}

// An inline subtree this deep is assumed to be hostile input rather than a
// document, and the split gives up on it.
const MAX_SPLIT_DEPTH: usize = 64;

/// Finds boxes whose children are all inline while the subtree below hides a
/// block, and flattens them: inline content stays in continuations of the
/// offending inline box, blocks are hoisted to be siblings. A follow-up
/// `correct_inline_boxes_parent` pass wraps the result.
pub fn correct_block_inside_inline(
    tree: &mut BoxTree,
    id: BoxId,
    context: &RenderContext,
    errors: &mut ErrorReporter,
) {
    if tree.contains_inlines_only(id) && !tree.contains_inlines_only_deep(id) {
        if context.debug.contains(DebugFlags::TRACE_CORRECTIONS) {
            debug!("{}: flattening blocks out of inline children", id);
        }
        if let Err(e) = flatten_children(tree, id) {
            errors.report(ErrorKind::StructuralCorrection, Some(id), e.to_string());
            return;
        }
    }

    if !tree.contains_inlines_only(id) {
        let children = tree[id].children.clone();
        for child in children {
            correct_block_inside_inline(tree, child, context, errors);
        }
    }
}

/// Rebuilds `id`'s child list so no inline child hides a block. Inline
/// children that are already clean stay put; an inline child containing
/// blocks is replaced by its split parts.
///
/// Depth is checked before anything is detached, so a refused split leaves
/// the subtree exactly as it was.
fn flatten_children(tree: &mut BoxTree, id: BoxId) -> Result<(), CorrectionError> {
    for child in &tree[id].children {
        if tree[*child].is_inline() &&
            !tree.contains_inlines_only_deep(*child) &&
            exceeds_split_depth(tree, *child, 0)
        {
            return Err(CorrectionError::UnsplittableBox(*child));
        }
    }

    let children = std::mem::replace(&mut tree[id].children, Vec::new());
    for child in &children {
        tree[*child].parent = None;
    }

    let mut replacement = Vec::new();
    for child in children {
        if tree[child].is_inline() && !tree.contains_inlines_only_deep(child) {
            let parts = split_bad_box(tree, child);
            replacement.extend(parts);
        } else {
            replacement.push(child);
        }
    }

    for child in &replacement {
        tree[*child].parent = Some(id);
    }
    tree[id].children = replacement;
    Ok(())
}

/// Whether the split would have to recurse through more than
/// `MAX_SPLIT_DEPTH` nested bad boxes. Mirrors the recursion in
/// `split_bad_box`: clean inline subtrees are appended whole and don't
/// count against the cap.
fn exceeds_split_depth(tree: &BoxTree, id: BoxId, depth: usize) -> bool {
    if depth >= MAX_SPLIT_DEPTH {
        return true;
    }
    tree[id].children.iter().any(|c| {
        tree[*c].is_inline() &&
            !tree.contains_inlines_only_deep(*c) &&
            exceeds_split_depth(tree, *c, depth + 1)
    })
}

/// Splits an inline box containing blocks into a sequence of detached parts:
/// continuations of the box holding its inline content, interleaved with the
/// hoisted blocks. The original box is destroyed. Depth was bounded by the
/// caller, so the recursion here is free to descend.
fn split_bad_box(tree: &mut BoxTree, bad: BoxId) -> Vec<BoxId> {
    let children = std::mem::replace(&mut tree[bad].children, Vec::new());
    for child in &children {
        tree[*child].parent = None;
    }

    let mut parts = Vec::new();
    let mut current: Option<BoxId> = None;

    for child in children {
        if !tree[child].is_inline() {
            if let Some(continuation) = current.take() {
                parts.push(continuation);
            }
            parts.push(child);
            continue;
        }

        if tree.contains_inlines_only_deep(child) {
            let continuation =
                *current.get_or_insert_with(|| tree.synthesize_continuation(bad));
            tree.append(continuation, child);
            continue;
        }

        // The child is itself an inline hiding blocks; split it and merge
        // its parts, wrapping its continuations in continuations of ours.
        let inner_parts = split_bad_box(tree, child);
        for part in inner_parts {
            if tree[part].is_inline() {
                let continuation =
                    *current.get_or_insert_with(|| tree.synthesize_continuation(bad));
                tree.append(continuation, part);
            } else {
                if let Some(continuation) = current.take() {
                    parts.push(continuation);
                }
                parts.push(part);
            }
        }
    }

    if let Some(continuation) = current.take() {
        parts.push(continuation);
    }

    tree.destroy(bad);
    parts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::box_tree::BoxNode;

    fn anon(tree: &mut BoxTree, display: Display) -> BoxId {
        tree.alloc(BoxNode::new_anonymous(display))
    }

    fn text(tree: &mut BoxTree, t: &str) -> BoxId {
        tree.alloc(BoxNode::new_text(t.to_string()))
    }

    #[test]
    fn inline_runs_get_anonymous_block_wrappers() {
        // [text, inline, block, text] becomes
        // [anon-block[text, inline], block, anon-block[text]].
        let mut tree = BoxTree::new(BoxNode::new_anonymous(Display::Block));
        let root = tree.root();
        let t1 = text(&mut tree, "Hello ");
        let span = anon(&mut tree, Display::Inline);
        let block = anon(&mut tree, Display::Block);
        let t2 = text(&mut tree, " Tail");
        for id in [t1, span, block, t2].iter() {
            tree.append(root, *id);
        }

        correct_inline_boxes_parent(&mut tree, root);

        let children = tree[root].children.clone();
        assert_eq!(children.len(), 3);
        assert!(tree[children[0]].anonymous);
        assert_eq!(tree[children[0]].children, vec![t1, span]);
        assert_eq!(children[1], block);
        assert!(tree[children[2]].anonymous);
        assert_eq!(tree[children[2]].children, vec![t2]);
    }

    #[test]
    fn all_inline_children_are_left_alone() {
        let mut tree = BoxTree::new(BoxNode::new_anonymous(Display::Block));
        let root = tree.root();
        let a = text(&mut tree, "a");
        let b = anon(&mut tree, Display::Inline);
        tree.append(root, a);
        tree.append(root, b);

        correct_inline_boxes_parent(&mut tree, root);
        assert_eq!(tree[root].children, vec![a, b]);
    }

    #[test]
    fn block_inside_inline_is_hoisted() {
        // div > span > [text, block, text] becomes
        // div > [span'[text], block, span''[text]].
        let mut tree = BoxTree::new(BoxNode::new_anonymous(Display::Block));
        let root = tree.root();
        let span = anon(&mut tree, Display::Inline);
        tree[span].styles.set("color", "red");
        let t1 = text(&mut tree, "before");
        let block = anon(&mut tree, Display::Block);
        let t2 = text(&mut tree, "after");
        tree.append(root, span);
        tree.append(span, t1);
        tree.append(span, block);
        tree.append(span, t2);

        let context = RenderContext::default();
        let mut errors = ErrorReporter::new();
        correct_block_inside_inline(&mut tree, root, &context, &mut errors);

        assert!(errors.events().is_empty());
        let children = tree[root].children.clone();
        assert_eq!(children.len(), 3);
        assert!(tree[children[0]].is_inline());
        assert_eq!(tree[children[0]].children, vec![t1]);
        assert_eq!(tree[children[0]].styles.get("color"), "red");
        assert_eq!(children[1], block);
        assert!(tree[children[2]].is_inline());
        assert_eq!(tree[children[2]].children, vec![t2]);
    }

    #[test]
    fn nested_bad_boxes_split_recursively() {
        // div > a > [t1, b > [t2, block], t3]
        let mut tree = BoxTree::new(BoxNode::new_anonymous(Display::Block));
        let root = tree.root();
        let a = anon(&mut tree, Display::Inline);
        let b = anon(&mut tree, Display::Inline);
        let t1 = text(&mut tree, "1");
        let t2 = text(&mut tree, "2");
        let t3 = text(&mut tree, "3");
        let block = anon(&mut tree, Display::Block);
        tree.append(root, a);
        tree.append(a, t1);
        tree.append(a, b);
        tree.append(b, t2);
        tree.append(b, block);
        tree.append(a, t3);

        let context = RenderContext::default();
        let mut errors = ErrorReporter::new();
        correct_block_inside_inline(&mut tree, root, &context, &mut errors);

        assert!(errors.events().is_empty());
        let children = tree[root].children.clone();
        // a'[t1, b'[t2]], block, a''[t3]
        assert_eq!(children.len(), 3);
        let first = children[0];
        assert!(tree[first].is_inline());
        assert_eq!(tree[first].children.len(), 2);
        assert_eq!(tree[first].children[0], t1);
        let inner = tree[first].children[1];
        assert_eq!(tree[inner].children, vec![t2]);
        assert_eq!(children[1], block);
        assert_eq!(tree[children[2]].children, vec![t3]);
    }

    #[test]
    fn refused_split_leaves_the_subtree_untouched() {
        // A block hidden under more nested inlines than the split is
        // willing to descend through. The failure must be reported and the
        // whole child list (clean siblings included) kept as-is.
        let mut tree = BoxTree::new(BoxNode::new_anonymous(Display::Block));
        let root = tree.root();
        let div = anon(&mut tree, Display::Block);
        let keep = text(&mut tree, "keep");
        tree.append(root, div);
        tree.append(div, keep);

        let outer = anon(&mut tree, Display::Inline);
        tree.append(div, outer);
        let mut cursor = outer;
        for _ in 0..70 {
            let next = anon(&mut tree, Display::Inline);
            tree.append(cursor, next);
            cursor = next;
        }
        let block = anon(&mut tree, Display::Block);
        tree.append(cursor, block);

        let before = tree.dump();
        let context = RenderContext::default();
        let mut errors = ErrorReporter::new();
        correct_block_inside_inline(&mut tree, root, &context, &mut errors);

        assert_eq!(errors.events().len(), 1);
        assert_eq!(errors.events()[0].kind, ErrorKind::StructuralCorrection);
        assert_eq!(errors.events()[0].subtree, Some(div));
        assert_eq!(tree.dump(), before);
        assert_eq!(tree[div].children, vec![keep, outer]);
    }

    #[test]
    fn whole_pipeline_wraps_split_results() {
        let mut tree = BoxTree::new(BoxNode::new_anonymous(Display::Block));
        let root = tree.root();
        let span = anon(&mut tree, Display::Inline);
        let t1 = text(&mut tree, "x");
        let block = anon(&mut tree, Display::Block);
        tree.append(root, span);
        tree.append(span, t1);
        tree.append(span, block);

        let context = RenderContext::default();
        let mut errors = ErrorReporter::new();
        correct_inline_boxes_parent(&mut tree, root);
        correct_block_inside_inline(&mut tree, root, &context, &mut errors);
        correct_inline_boxes_parent(&mut tree, root);

        // Every child of the root is now block-level.
        for child in &tree[root].children {
            assert!(!tree[*child].is_inline());
        }
        assert!(!tree.contains_variant_boxes(root));
    }
}
