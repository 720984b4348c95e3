//! The cascade: resolves each box's style map from inheritance, matched
//! rules, legacy presentational attributes and the inline style attribute,
//! in that order.
//!
//! `!important` acts as a lock: once an important declaration writes a
//! property, every later write to it on that box is ignored, whatever its
//! own importance.

use crate::box_tree::{BoxId, BoxTree};
use crate::context::{DebugFlags, RenderContext};
use crate::css::{CssData, DeclarationBlock};
use crate::style::{self, Display};
use crate::value;
use std::collections::HashSet;

pub fn apply(tree: &mut BoxTree, context: &RenderContext, css: &CssData) {
    let root = tree.root();
    // The root is always a block container, whatever the sheets say.
    tree.set_display(root, Display::Block);
    apply_to(tree, root, context, css);
}

fn apply_to(tree: &mut BoxTree, id: BoxId, context: &RenderContext, css: &CssData) {
    inherit_from_parent(tree, id);

    if tree[id].tag.is_some() {
        let mut locked = HashSet::new();

        let matched = match tree[id].tag.as_ref().and_then(|t| t.element_ref()) {
            Some(element) => css.matching_rules(&context.media, &element),
            None => Vec::new(),
        };

        if context.debug.contains(DebugFlags::TRACE_CASCADE) {
            debug!("{}: {} matching rules", id, matched.len());
        }

        for rule in &matched {
            apply_block(tree, id, &rule.block, &mut locked, context);
        }

        translate_attributes(tree, id, &mut locked, context);

        if let Some(style_attr) = tree[id]
            .tag
            .as_ref()
            .and_then(|t| t.attribute("style"))
            .map(|s| s.to_string())
        {
            let block = crate::css::parse_style_attribute(&style_attr);
            apply_block(tree, id, &block, &mut locked, context);
        }
    }

    resolve_current_color(tree, id);
    push_down_text_decoration(tree, id);

    let children = tree[id].children.clone();
    for child in children {
        apply_to(tree, child, context, css);
    }
}

/// Copies the parent's explicitly-set inheritable values down. Runs before
/// any rule applies, so matched rules override inherited values.
fn inherit_from_parent(tree: &mut BoxTree, id: BoxId) {
    let parent = match tree[id].parent {
        Some(p) => p,
        None => return,
    };
    let inherited: Vec<(String, String)> = tree[parent]
        .styles
        .iter()
        .filter(|(name, _)| style::is_inherited(name))
        .map(|(name, value)| (name.to_string(), value.to_string()))
        .collect();
    for (name, value) in inherited {
        tree[id].styles.set(&name, value);
    }
}

fn apply_block(
    tree: &mut BoxTree,
    id: BoxId,
    block: &DeclarationBlock,
    locked: &mut HashSet<String>,
    context: &RenderContext,
) {
    for declaration in block.iter() {
        if locked.contains(&declaration.name) {
            continue;
        }

        let value = resolve_keyword_value(tree, id, &declaration.name, &declaration.value);

        if !is_style_allowed(tree, id, &declaration.name, &value) {
            continue;
        }

        if declaration.important {
            locked.insert(declaration.name.clone());
        }

        set_property(tree, id, &declaration.name, &value, context);
    }
}

/// Resolves `inherit` and `initial` to concrete values at apply time.
fn resolve_keyword_value(tree: &BoxTree, id: BoxId, name: &str, value: &str) -> String {
    if value.eq_ignore_ascii_case("inherit") {
        return match tree[id].parent {
            Some(parent) => tree[parent].styles.get(name).to_string(),
            None => style::initial_value(name).to_string(),
        };
    }
    if value.eq_ignore_ascii_case("initial") {
        return style::initial_value(name).to_string();
    }
    value.to_string()
}

/// Table-structural elements refuse `display` values that would break the
/// table model their tag implies.
fn is_style_allowed(tree: &BoxTree, id: BoxId, name: &str, value: &str) -> bool {
    if name != "display" {
        return true;
    }
    let tag = match tree[id].tag {
        Some(ref t) => t,
        None => return true,
    };
    let required = match &*tag.name {
        "table" => Display::Table,
        "tr" => Display::TableRow,
        "tbody" => Display::TableRowGroup,
        "thead" => Display::TableHeaderGroup,
        "tfoot" => Display::TableFooterGroup,
        "td" | "th" => Display::TableCell,
        "col" => Display::TableColumn,
        "colgroup" => Display::TableColumnGroup,
        "caption" => Display::TableCaption,
        _ => return true,
    };
    match Display::parse(value) {
        Some(d) => d == required || d == Display::None,
        None => false,
    }
}

static COLOR_PROPERTIES: &[&str] = &[
    "color",
    "background-color",
    "border-top-color",
    "border-right-color",
    "border-bottom-color",
    "border-left-color",
    "text-decoration-color",
];

/// Validates and stores one property. Invalid values are dropped so a bad
/// declaration never clobbers a good earlier one.
fn set_property(tree: &mut BoxTree, id: BoxId, name: &str, value: &str, context: &RenderContext) {
    if name == "display" {
        match Display::parse(value) {
            Some(display) => tree.set_display(id, display),
            None => {},
        }
        return;
    }

    if COLOR_PROPERTIES.contains(&name) {
        let valid = value.eq_ignore_ascii_case("transparent") ||
            value.eq_ignore_ascii_case("currentcolor") ||
            value::try_parse_color(value, context.colors).is_some();
        if !valid {
            return;
        }
        tree[id].styles.set(name, value);
        return;
    }

    if name == "font-family" {
        // Keep the inherited family when nothing in the list exists.
        if let Some(resolved) = value::resolve_font_family(value, context.fonts) {
            tree[id].styles.set(name, resolved);
        }
        return;
    }

    tree[id].styles.set(name, value);
}

/// A locked-aware write used by attribute translation.
fn set_translated(
    tree: &mut BoxTree,
    id: BoxId,
    name: &str,
    value: &str,
    locked: &HashSet<String>,
    context: &RenderContext,
) {
    if locked.contains(name) {
        return;
    }
    set_property(tree, id, name, value, context);
}

/// Appends `px` to bare numbers so legacy attribute values read as lengths.
fn translate_length(value: &str) -> String {
    let trimmed = value.trim();
    if value::is_valid_length(trimmed) {
        return trimmed.to_string();
    }
    if trimmed.parse::<f64>().is_ok() {
        return format!("{}px", trimmed);
    }
    trimmed.to_string()
}

/// Maps legacy presentational attributes onto the equivalent properties.
fn translate_attributes(
    tree: &mut BoxTree,
    id: BoxId,
    locked: &mut HashSet<String>,
    context: &RenderContext,
) {
    let (tag_name, attributes) = match tree[id].tag {
        Some(ref tag) => (tag.name.to_string(), tag.attributes.clone()),
        None => return,
    };

    for (name, value) in &attributes {
        let value = value.trim();
        match &**name {
            "align" => translate_align(
                tree,
                id,
                &tag_name,
                &value.to_ascii_lowercase(),
                locked,
                context,
            ),
            "background" => {
                let url = format!("url({})", value);
                set_translated(tree, id, "background-image", &url, locked, context)
            },
            "bgcolor" => set_translated(
                tree,
                id,
                "background-color",
                &value.to_ascii_lowercase(),
                locked,
                context,
            ),
            "border" => {
                let width = translate_length(value);
                for side in &["top", "right", "bottom", "left"] {
                    set_translated(
                        tree,
                        id,
                        &format!("border-{}-width", side),
                        &width,
                        locked,
                        context,
                    );
                    set_translated(
                        tree,
                        id,
                        &format!("border-{}-style", side),
                        "solid",
                        locked,
                        context,
                    );
                }
                if tag_name == "table" && value != "0" {
                    apply_table_border(tree, id, "1px", context);
                }
            },
            "bordercolor" => {
                for side in &["top", "right", "bottom", "left"] {
                    set_translated(
                        tree,
                        id,
                        &format!("border-{}-color", side),
                        &value.to_ascii_lowercase(),
                        locked,
                        context,
                    );
                }
            },
            "cellspacing" => {
                set_translated(tree, id, "border-spacing", &translate_length(value), locked, context)
            },
            "cellpadding" => apply_cell_padding(tree, id, &translate_length(value), context),
            "color" => {
                set_translated(tree, id, "color", &value.to_ascii_lowercase(), locked, context)
            },
            "dir" => set_translated(tree, id, "direction", &value.to_ascii_lowercase(), locked, context),
            "face" => set_translated(tree, id, "font-family", value, locked, context),
            "height" => set_translated(tree, id, "height", &translate_length(value), locked, context),
            "hspace" => {
                let length = translate_length(value);
                set_translated(tree, id, "margin-left", &length, locked, context);
                set_translated(tree, id, "margin-right", &length, locked, context);
            },
            "nowrap" => set_translated(tree, id, "white-space", "nowrap", locked, context),
            "size" => {
                if tag_name == "hr" {
                    set_translated(tree, id, "height", &translate_length(value), locked, context);
                } else if tag_name == "font" {
                    set_translated(tree, id, "font-size", &translate_length(value), locked, context);
                }
            },
            "valign" => set_translated(
                tree,
                id,
                "vertical-align",
                &value.to_ascii_lowercase(),
                locked,
                context,
            ),
            "vspace" => {
                let length = translate_length(value);
                set_translated(tree, id, "margin-top", &length, locked, context);
                set_translated(tree, id, "margin-bottom", &length, locked, context);
            },
            "width" => set_translated(tree, id, "width", &translate_length(value), locked, context),
            _ => {},
        }
    }
}

/// `align` is element-sensitive. On images, `left`/`right` float the image
/// and the vertical keywords set `vertical-align`; on everything else the
/// horizontal keywords become `text-align` and any other value is treated
/// as a vertical alignment.
fn translate_align(
    tree: &mut BoxTree,
    id: BoxId,
    tag_name: &str,
    value: &str,
    locked: &HashSet<String>,
    context: &RenderContext,
) {
    if tag_name == "img" {
        match value {
            "left" | "right" => {
                set_translated(tree, id, "vertical-align", "top", locked, context);
                set_translated(tree, id, "float", value, locked, context);
            },
            "top" => set_translated(tree, id, "vertical-align", "top", locked, context),
            "bottom" => set_translated(tree, id, "vertical-align", "baseline", locked, context),
            "middle" => set_translated(tree, id, "vertical-align", "middle", locked, context),
            _ => {},
        }
        return;
    }

    match value {
        "left" | "center" | "right" | "justify" => {
            set_translated(tree, id, "text-align", value, locked, context)
        },
        _ => set_translated(tree, id, "vertical-align", value, locked, context),
    }
}

/// The `border` attribute on a table also gives every cell a thin solid
/// border. Cells haven't cascaded yet, so the values written here act as
/// their defaults and any matching rule still overrides them.
fn apply_table_border(tree: &mut BoxTree, table: BoxId, width: &str, context: &RenderContext) {
    for_all_cells(tree, table, |tree, cell| {
        for side in &["top", "right", "bottom", "left"] {
            set_property(tree, cell, &format!("border-{}-style", side), "solid", context);
            set_property(tree, cell, &format!("border-{}-width", side), width, context);
        }
    });
}

fn apply_cell_padding(tree: &mut BoxTree, table: BoxId, padding: &str, context: &RenderContext) {
    for_all_cells(tree, table, |tree, cell| {
        for side in &["top", "right", "bottom", "left"] {
            set_property(tree, cell, &format!("padding-{}", side), padding, context);
        }
    });
}

/// Visits every `td`/`th` up to three levels below a table, covering both
/// `table > tr > td` and `table > tbody > tr > td` shapes.
fn for_all_cells(tree: &mut BoxTree, table: BoxId, mut f: impl FnMut(&mut BoxTree, BoxId)) {
    let l1 = tree[table].children.clone();
    for a in l1 {
        if tree[a].tag_is("td") || tree[a].tag_is("th") {
            f(tree, a);
            continue;
        }
        let l2 = tree[a].children.clone();
        for b in l2 {
            if tree[b].tag_is("td") || tree[b].tag_is("th") {
                f(tree, b);
                continue;
            }
            let l3 = tree[b].children.clone();
            for c in l3 {
                if tree[c].tag_is("td") || tree[c].tag_is("th") {
                    f(tree, c);
                }
            }
        }
    }
}

static CURRENTCOLOR_PROPERTIES: &[&str] = &[
    "border-top-color",
    "border-right-color",
    "border-bottom-color",
    "border-left-color",
    "text-decoration-color",
];

/// Replaces `currentcolor` with the box's computed `color` once both are
/// known.
fn resolve_current_color(tree: &mut BoxTree, id: BoxId) {
    let color = tree[id].styles.get("color").to_string();
    for property in CURRENTCOLOR_PROPERTIES {
        if tree[id].styles.get(property).eq_ignore_ascii_case("currentcolor") {
            tree[id].styles.set(property, color.clone());
        }
    }
}

static TEXT_DECORATION_PROPERTIES: &[&str] = &[
    "text-decoration",
    "text-decoration-line",
    "text-decoration-style",
    "text-decoration-color",
];

/// `text-decoration` isn't inherited, but it paints across descendants.
/// Push it down to the children so the terminal text boxes carry it, and
/// clear it on the container.
fn push_down_text_decoration(tree: &mut BoxTree, id: BoxId) {
    if tree[id].is_text() || tree[id].children.is_empty() {
        return;
    }
    if tree[id].styles.get("text-decoration").is_empty() {
        return;
    }

    let values: Vec<(&'static str, String)> = TEXT_DECORATION_PROPERTIES
        .iter()
        .map(|p| (*p, tree[id].styles.get(p).to_string()))
        .collect();

    let children = tree[id].children.clone();
    for child in children {
        for (property, value) in &values {
            if !value.is_empty() {
                tree[child].styles.set(property, value.clone());
            }
        }
    }

    for (property, _) in &values {
        tree[id].styles.unset(property);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::box_tree::{BoxNode, SourceTag};
    use crate::css::Stylesheet;
    use kuchiki::traits::*;

    fn element_box(tree: &mut BoxTree, html: &str, selector: &str) -> BoxId {
        let doc = kuchiki::parse_html().one(html);
        let element = doc.select_first(selector).unwrap();
        let node = element.as_node().clone();
        let (name, attributes) = {
            let data = node.as_element().unwrap();
            let attributes = data
                .attributes
                .borrow()
                .map
                .iter()
                .map(|(name, attr)| (name.local.to_string(), attr.value.clone()))
                .collect();
            (data.name.local.clone(), attributes)
        };
        tree.alloc(BoxNode::new_element(SourceTag {
            name,
            attributes,
            node,
        }))
    }

    fn css(text: &str) -> CssData {
        let mut data = CssData::default();
        data.add_stylesheet(Stylesheet::parse(text));
        data
    }

    #[test]
    fn later_rule_wins_at_equal_specificity() {
        let mut tree = BoxTree::new(BoxNode::new_anonymous(Display::Block));
        let root = tree.root();
        let div = element_box(&mut tree, "<div></div>", "div");
        tree.append(root, div);

        let context = RenderContext::default();
        apply(&mut tree, &context, &css("div { color: red } div { color: blue }"));
        assert_eq!(tree[div].styles.get("color"), "blue");
    }

    #[test]
    fn important_locks_out_later_writes() {
        let mut tree = BoxTree::new(BoxNode::new_anonymous(Display::Block));
        let root = tree.root();
        let div = element_box(
            &mut tree,
            "<div style=\"color: green\"></div>",
            "div",
        );
        tree.append(root, div);

        let context = RenderContext::default();
        apply(
            &mut tree,
            &context,
            &css("div { color: red !important } div { color: blue }"),
        );
        // Neither later rules nor the inline style get through the lock.
        assert_eq!(tree[div].styles.get("color"), "red");
    }

    #[test]
    fn inherit_keyword_resolves_against_the_parent() {
        let mut tree = BoxTree::new(BoxNode::new_anonymous(Display::Block));
        let root = tree.root();
        tree[root].styles.set("width", "123px");
        let div = element_box(&mut tree, "<div style=\"width: inherit\"></div>", "div");
        tree.append(root, div);

        let context = RenderContext::default();
        apply(&mut tree, &context, &CssData::default());
        assert_eq!(tree[div].styles.get("width"), "123px");
    }

    #[test]
    fn table_elements_refuse_foreign_display_values() {
        let mut tree = BoxTree::new(BoxNode::new_anonymous(Display::Block));
        let root = tree.root();
        let tr = element_box(
            &mut tree,
            "<table><tr style=\"display: block\"></tr></table>",
            "tr",
        );
        tree.append(root, tr);

        let context = RenderContext::default();
        apply(&mut tree, &context, &css("tr { display: table-row }"));
        assert_eq!(tree[tr].display, Display::TableRow);
    }

    #[test]
    fn presentational_attributes_translate() {
        let mut tree = BoxTree::new(BoxNode::new_anonymous(Display::Block));
        let root = tree.root();
        let div = element_box(
            &mut tree,
            "<div width=\"300\" bgcolor=\"RED\" nowrap></div>",
            "div",
        );
        tree.append(root, div);

        let context = RenderContext::default();
        apply(&mut tree, &context, &CssData::default());
        assert_eq!(tree[div].styles.get("width"), "300px");
        assert_eq!(tree[div].styles.get("background-color"), "red");
        assert_eq!(tree[div].styles.get("white-space"), "nowrap");
    }

    #[test]
    fn align_attribute_is_element_sensitive() {
        let mut tree = BoxTree::new(BoxNode::new_anonymous(Display::Block));
        let root = tree.root();
        let img = element_box(&mut tree, "<img align=\"RIGHT\">", "img");
        let p = element_box(&mut tree, "<p align=\"center\"></p>", "p");
        let td = element_box(
            &mut tree,
            "<table><tr><td align=\"top\"></td></tr></table>",
            "td",
        );
        tree.append(root, img);
        tree.append(root, p);
        tree.append(root, td);

        let context = RenderContext::default();
        apply(&mut tree, &context, &CssData::default());

        // Images float; their baseline moves to the top.
        assert_eq!(tree[img].styles.get("float"), "right");
        assert_eq!(tree[img].styles.get("vertical-align"), "top");
        assert_eq!(tree[img].styles.get_raw("text-align"), None);

        // Horizontal keywords align text, anything else aligns vertically.
        assert_eq!(tree[p].styles.get("text-align"), "center");
        assert_eq!(tree[td].styles.get("vertical-align"), "top");
        assert_eq!(tree[td].styles.get_raw("text-align"), None);
    }

    #[test]
    fn invalid_colors_are_dropped() {
        let mut tree = BoxTree::new(BoxNode::new_anonymous(Display::Block));
        let root = tree.root();
        let div = element_box(&mut tree, "<div></div>", "div");
        tree.append(root, div);

        let context = RenderContext::default();
        apply(
            &mut tree,
            &context,
            &css("div { color: red } div { color: notacolor }"),
        );
        assert_eq!(tree[div].styles.get("color"), "red");
    }

    #[test]
    fn currentcolor_resolves_to_computed_color() {
        let mut tree = BoxTree::new(BoxNode::new_anonymous(Display::Block));
        let root = tree.root();
        let div = element_box(&mut tree, "<div></div>", "div");
        tree.append(root, div);

        let context = RenderContext::default();
        apply(
            &mut tree,
            &context,
            &css("div { color: red; border-top-color: currentcolor }"),
        );
        assert_eq!(tree[div].styles.get("border-top-color"), "red");
    }

    #[test]
    fn text_decoration_pushes_down_to_text() {
        let mut tree = BoxTree::new(BoxNode::new_anonymous(Display::Block));
        let root = tree.root();
        let div = element_box(&mut tree, "<div>hi</div>", "div");
        let text = tree.alloc(BoxNode::new_text("hi".into()));
        tree.append(root, div);
        tree.append(div, text);

        let context = RenderContext::default();
        apply(
            &mut tree,
            &context,
            &css("div { text-decoration: underline }"),
        );
        assert_eq!(tree[div].styles.get("text-decoration"), "");
        assert_eq!(tree[text].styles.get("text-decoration"), "underline");
        assert_eq!(tree[text].styles.get("text-decoration-line"), "underline");
    }
}
