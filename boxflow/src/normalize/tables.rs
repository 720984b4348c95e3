//! Anonymous table box generation, after CSS 2.1 §17.2.1: drop boxes that
//! can't exist where they are, synthesize missing rows and cells below
//! tables, and synthesize missing tables above stray table parts.

use crate::box_tree::{BoxId, BoxTree};
use crate::context::{DebugFlags, RenderContext};
use crate::style::Display;

pub fn correct_anonymous_tables(tree: &mut BoxTree, id: BoxId, context: &RenderContext) {
    remove_irrelevant_boxes(tree, id, context);
    generate_missing_child_wrappers(tree, id, context);
    generate_missing_parents(tree, id, context);

    // The sub-passes may have created wrappers; recurse over the fresh
    // child list so they get fixed up too.
    let children = tree[id].children.clone();
    for child in children {
        correct_anonymous_tables(tree, child, context);
    }
}

/// Columns have no content; column groups hold only columns. Anything else
/// in those positions is hidden.
fn remove_irrelevant_boxes(tree: &mut BoxTree, id: BoxId, context: &RenderContext) {
    match tree[id].display {
        Display::TableColumn => {
            let children = tree[id].children.clone();
            for child in children {
                if context.debug.contains(DebugFlags::TRACE_TABLES) {
                    debug!("{}: hiding content of a table-column", child);
                }
                tree.set_display(child, Display::None);
            }
        },
        Display::TableColumnGroup => {
            let children = tree[id].children.clone();
            for child in children {
                let display = tree[child].display;
                if display != Display::TableColumn && display != Display::None {
                    if context.debug.contains(DebugFlags::TRACE_TABLES) {
                        debug!("{}: hiding non-column in a column-group", child);
                    }
                    tree.set_display(child, Display::None);
                }
            }
        },
        _ => {},
    }
}

/// What a child of this box must be for the table model to hold, if the box
/// constrains its children at all.
fn required_child_wrapper(display: Display) -> Option<(Display, fn(Display) -> bool)> {
    if display.is_table() {
        return Some((Display::TableRow, |d| d.is_proper_table_child()));
    }
    if display.is_row_group() {
        return Some((Display::TableRow, |d| d == Display::TableRow));
    }
    if display == Display::TableRow {
        return Some((Display::TableCell, |d| d == Display::TableCell));
    }
    None
}

/// Wraps runs of children that aren't legal under a table, row group or row
/// in an anonymous box of the required kind.
fn generate_missing_child_wrappers(tree: &mut BoxTree, id: BoxId, context: &RenderContext) {
    let (wrapper_display, is_legal) = match required_child_wrapper(tree[id].display) {
        Some(r) => r,
        None => return,
    };

    let children = tree[id].children.clone();
    let mut run: Vec<BoxId> = Vec::new();
    for child in children {
        let display = tree[child].display;
        if display == Display::None || is_legal(display) {
            wrap_table_run(tree, &mut run, wrapper_display, context);
        } else {
            run.push(child);
        }
    }
    wrap_table_run(tree, &mut run, wrapper_display, context);
}

/// Wraps stray cells in an anonymous row, and stray table parts in an
/// anonymous table.
fn generate_missing_parents(tree: &mut BoxTree, id: BoxId, context: &RenderContext) {
    let parent_display = tree[id].display;

    // Cells need a row above them.
    if parent_display != Display::TableRow {
        let children = tree[id].children.clone();
        let mut run: Vec<BoxId> = Vec::new();
        for child in children {
            if tree[child].display == Display::TableCell {
                run.push(child);
            } else {
                wrap_table_run(tree, &mut run, Display::TableRow, context);
            }
        }
        wrap_table_run(tree, &mut run, Display::TableRow, context);
    }

    // Rows, columns, groups and captions need a table above them.
    let table_display = if parent_display.is_inline_level() {
        Display::InlineTable
    } else {
        Display::Table
    };
    let children = tree[id].children.clone();
    let mut run: Vec<BoxId> = Vec::new();
    for child in children {
        if tree[child].display.is_proper_table_child() &&
            !is_legal_parent_for(parent_display, tree[child].display)
        {
            run.push(child);
        } else {
            wrap_table_run(tree, &mut run, table_display, context);
        }
    }
    wrap_table_run(tree, &mut run, table_display, context);
}

fn is_legal_parent_for(parent: Display, child: Display) -> bool {
    if parent.is_table() {
        return true;
    }
    match child {
        Display::TableRow => parent.is_row_group(),
        Display::TableColumn => parent == Display::TableColumnGroup,
        _ => false,
    }
}

fn wrap_table_run(
    tree: &mut BoxTree,
    run: &mut Vec<BoxId>,
    display: Display,
    context: &RenderContext,
) {
    let first = match run.first() {
        Some(f) => *f,
        None => return,
    };
    if context.debug.contains(DebugFlags::TRACE_TABLES) {
        debug!(
            "wrapping {} boxes starting at {} in an anonymous {:?}",
            run.len(),
            first,
            display
        );
    }
    let wrapper = tree.synthesize_anonymous(first, display);
    tree.insert_before(first, wrapper);
    for member in run.drain(..) {
        tree.detach(member);
        tree.append(wrapper, member);
    }
}
