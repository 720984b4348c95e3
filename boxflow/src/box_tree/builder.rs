//! The end-to-end pipeline: parse markup, gather stylesheets, register
//! fonts, read page margins, cascade, normalize.

use crate::box_tree::{BoxNode, BoxTree, SourceTag};
use crate::cascade;
use crate::context::RenderContext;
use crate::css::{CssData, Stylesheet};
use crate::dom::{self, DiscoveredStyle};
use crate::errors::{ErrorKind, ErrorReporter, ReportedError};
use crate::normalize;
use crate::style::Display;
use crate::value;
use app_units::Au;
use euclid::default::SideOffsets2D;
use kuchiki::{NodeData, NodeRef};
use std::borrow::Cow;
use std::io;

pub struct GenerateResult<'a> {
    pub tree: BoxTree,
    /// The stylesheet collection actually used: borrowed when the document
    /// contributed nothing, an extended copy otherwise.
    pub css: Cow<'a, CssData>,
    pub page_margin: SideOffsets2D<Au>,
    pub errors: Vec<ReportedError>,
}

/// Runs the whole pipeline over an HTML document and the given stylesheet
/// collection.
pub fn generate_box_tree<'a>(
    html: &str,
    context: &RenderContext,
    css: &'a CssData,
) -> io::Result<GenerateResult<'a>> {
    let dom = dom::build_dom(&mut html.as_bytes())?;
    let mut errors = ErrorReporter::new();

    let mut tree = BoxTree::new(BoxNode::new_anonymous(Display::Block));
    let root = tree.root();
    build_boxes(&mut tree, root, &dom);

    let mut effective: Cow<'a, CssData> = Cow::Borrowed(css);
    for style in dom::discover_styles(&dom) {
        match style {
            DiscoveredStyle::Inline(text) => {
                effective.to_mut().add_stylesheet(Stylesheet::parse(&text));
            },
            DiscoveredStyle::Linked(href) => match context.resources.load_stylesheet(&href) {
                Some(text) => {
                    effective.to_mut().add_stylesheet(Stylesheet::parse(&text));
                },
                None => errors.report(
                    ErrorKind::StylesheetLoad,
                    None,
                    format!("failed to load stylesheet {:?}", href),
                ),
            },
        }
    }

    register_font_faces(context, &effective);
    let page_margin = resolve_page_margin(context, &effective);

    cascade::apply(&mut tree, context, &effective);
    normalize::run(&mut tree, context, &mut errors);

    Ok(GenerateResult {
        tree,
        css: effective,
        page_margin,
        errors: errors.into_events(),
    })
}

/// Mirrors the DOM into boxes: one box per element, one per non-empty text
/// node. Comments, doctypes and processing instructions generate nothing.
fn build_boxes(tree: &mut BoxTree, parent: crate::box_tree::BoxId, node: &NodeRef) {
    for child in node.children() {
        match child.data() {
            NodeData::Element(ref element) => {
                let attributes = element
                    .attributes
                    .borrow()
                    .map
                    .iter()
                    .map(|(name, attr)| (name.local.to_string(), attr.value.clone()))
                    .collect();
                let b = tree.alloc(BoxNode::new_element(SourceTag {
                    name: element.name.local.clone(),
                    attributes,
                    node: child.clone(),
                }));
                tree.append(parent, b);
                build_boxes(tree, b, &child);
            },
            NodeData::Text(ref text) => {
                let t = text.borrow().clone();
                if !t.is_empty() {
                    let b = tree.alloc(BoxNode::new_text(t));
                    tree.append(parent, b);
                }
            },
            _ => {},
        }
    }
}

fn register_font_faces(context: &RenderContext, css: &CssData) {
    for face in css.font_face_rules(&context.media) {
        let family = match face.block.get("font-family") {
            Some(d) => value::font_face_family_name(&d.value),
            None => continue,
        };
        let src = match face.block.get("src") {
            Some(d) => value::parse_font_face_src(&d.value),
            None => continue,
        };

        let mut registered = false;
        if let Some(ref local) = src.local {
            registered = context.fonts.add_local_font_family(&family, local);
        }
        if !registered {
            if let Some(ref url) = src.url {
                registered =
                    context.fonts.add_font_family_from_url(&family, url, src.format.as_deref());
            }
        }
        if !registered {
            warn!("could not register @font-face family {:?}", family);
        }
    }
}

/// Margins from the unnamed `@page` rule, resolved against the page width.
fn resolve_page_margin(context: &RenderContext, css: &CssData) -> SideOffsets2D<Au> {
    let mut margin = SideOffsets2D::new(Au(0), Au(0), Au(0), Au(0));
    let page_width = context.page_size.width.to_f64_px();

    for rule in css.page_rules(&context.media) {
        if !rule.selector.is_empty() {
            continue;
        }
        let mut side = |name: &str, out: &mut Au| {
            if let Some(d) = rule.block.get(name) {
                *out = Au::from_f64_px(value::parse_length(
                    &d.value, page_width, 16.0, None, false, false,
                ));
            }
        };
        side("margin-top", &mut margin.top);
        side("margin-right", &mut margin.right);
        side("margin-bottom", &mut margin.bottom);
        side("margin-left", &mut margin.left);
    }

    margin
}
