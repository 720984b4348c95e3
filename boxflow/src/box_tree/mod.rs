//! The box tree: an arena of boxes addressed by id, with explicit structural
//! surgery (detach, append, insert-before) so the correction passes can
//! rearrange subtrees without fighting the borrow checker.

use self::arena::BoxArena;
use crate::misc::print_tree::PrintTree;
use crate::style::{self, Display, StyleMap};
use crate::value;
use html5ever::LocalName;
use kuchiki::{ElementData, NodeDataRef, NodeRef};
use std::fmt;
use std::io::Write;

mod arena;
pub mod builder;

#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub struct BoxId(pub usize);

impl fmt::Debug for BoxId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl fmt::Display for BoxId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Text content of a box: raw as parsed, or split into words (with collapsed
/// whitespace) once the whitespace pass has run.
#[derive(Debug, Clone, PartialEq)]
pub enum Text {
    Raw(String),
    Words(Vec<String>),
}

/// The element a box was generated from. Anonymous boxes have none.
#[derive(Clone)]
pub struct SourceTag {
    pub name: LocalName,
    /// Attributes, lowercased names, in document order.
    pub attributes: Vec<(String, String)>,
    /// The originating DOM node, kept for selector matching.
    pub node: NodeRef,
}

impl fmt::Debug for SourceTag {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("SourceTag")
            .field("name", &&*self.name)
            .field("attributes", &self.attributes)
            .finish()
    }
}

impl SourceTag {
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| &**v)
    }

    pub fn element_ref(&self) -> Option<NodeDataRef<ElementData>> {
        self.node.clone().into_element_ref()
    }
}

#[derive(Debug)]
pub struct BoxNode {
    pub tag: Option<SourceTag>,
    pub display: Display,
    pub styles: StyleMap,
    pub text: Option<Text>,
    pub anonymous: bool,
    pub parent: Option<BoxId>,
    pub children: Vec<BoxId>,
}

impl BoxNode {
    pub fn new_element(tag: SourceTag) -> Self {
        Self {
            tag: Some(tag),
            display: Display::Inline,
            styles: StyleMap::default(),
            text: None,
            anonymous: false,
            parent: None,
            children: Vec::new(),
        }
    }

    pub fn new_text(text: String) -> Self {
        Self {
            tag: None,
            display: Display::Inline,
            styles: StyleMap::default(),
            text: Some(Text::Raw(text)),
            anonymous: false,
            parent: None,
            children: Vec::new(),
        }
    }

    pub fn new_anonymous(display: Display) -> Self {
        let mut styles = StyleMap::default();
        styles.set("display", display.as_str());
        Self {
            tag: None,
            display,
            styles,
            text: None,
            anonymous: true,
            parent: None,
            children: Vec::new(),
        }
    }

    pub fn tag_is(&self, name: &str) -> bool {
        self.tag.as_ref().map_or(false, |t| &*t.name == name)
    }

    pub fn is_line_break(&self) -> bool {
        self.tag_is("br")
    }

    pub fn is_image(&self) -> bool {
        self.tag_is("img")
    }

    /// Line breaks participate in inline layout but are never treated as
    /// inline content by the structural passes.
    pub fn is_inline(&self) -> bool {
        self.display.is_inline_level() && !self.is_line_break()
    }

    pub fn is_text(&self) -> bool {
        self.text.is_some()
    }

    pub fn white_space(&self) -> &str {
        self.styles.get("white-space")
    }

    pub fn is_preformatted(&self) -> bool {
        match self.white_space() {
            "pre" | "pre-wrap" => true,
            _ => false,
        }
    }
}

pub struct BoxTree {
    nodes: BoxArena,
    root: BoxId,
}

impl std::ops::Index<BoxId> for BoxTree {
    type Output = BoxNode;

    fn index(&self, id: BoxId) -> &BoxNode {
        &self.nodes[id]
    }
}

impl std::ops::IndexMut<BoxId> for BoxTree {
    fn index_mut(&mut self, id: BoxId) -> &mut BoxNode {
        &mut self.nodes[id]
    }
}

impl BoxTree {
    pub fn new(root: BoxNode) -> Self {
        let mut nodes = BoxArena::default();
        let root = nodes.allocate(root);
        Self { nodes, root }
    }

    pub fn root(&self) -> BoxId {
        self.root
    }

    pub fn alloc(&mut self, node: BoxNode) -> BoxId {
        self.nodes.allocate(node)
    }

    pub fn append(&mut self, parent: BoxId, child: BoxId) {
        debug_assert!(self[child].parent.is_none(), "appending an attached box");
        self[child].parent = Some(parent);
        self[parent].children.push(child);
    }

    /// Inserts `child` as a sibling right before `before`.
    pub fn insert_before(&mut self, before: BoxId, child: BoxId) {
        debug_assert!(self[child].parent.is_none(), "inserting an attached box");
        let parent = self[before].parent.expect("inserting before the root");
        let index = self
            .child_index(parent, before)
            .expect("sibling not in its parent's child list");
        self[child].parent = Some(parent);
        self[parent].children.insert(index, child);
    }

    /// Unlinks a box from its parent. The box and its subtree stay alive.
    pub fn detach(&mut self, child: BoxId) {
        let parent = match self[child].parent.take() {
            Some(p) => p,
            None => return,
        };
        let index = self
            .child_index(parent, child)
            .expect("child not in its parent's child list");
        self[parent].children.remove(index);
    }

    /// Detaches a box and frees it together with its whole subtree.
    pub fn destroy(&mut self, id: BoxId) {
        self.detach(id);
        self.destroy_subtree(id);
    }

    fn destroy_subtree(&mut self, id: BoxId) {
        let children = std::mem::replace(&mut self[id].children, Vec::new());
        for child in children {
            self.destroy_subtree(child);
        }
        self.nodes.deallocate(id);
    }

    /// Moves every child of `from` to the end of `to`'s child list,
    /// preserving order.
    pub fn reparent_children(&mut self, from: BoxId, to: BoxId) {
        let children = std::mem::replace(&mut self[from].children, Vec::new());
        for child in &children {
            self[*child].parent = Some(to);
        }
        self[to].children.extend(children);
    }

    pub fn child_index(&self, parent: BoxId, child: BoxId) -> Option<usize> {
        self[parent].children.iter().position(|c| *c == child)
    }

    pub fn prev_sibling(&self, id: BoxId) -> Option<BoxId> {
        let parent = self[id].parent?;
        let index = self.child_index(parent, id)?;
        if index == 0 {
            None
        } else {
            Some(self[parent].children[index - 1])
        }
    }

    pub fn next_sibling(&self, id: BoxId) -> Option<BoxId> {
        let parent = self[id].parent?;
        let index = self.child_index(parent, id)?;
        self[parent].children.get(index + 1).copied()
    }

    pub fn contains_inlines_only(&self, id: BoxId) -> bool {
        self[id].children.iter().all(|c| self[*c].is_inline())
    }

    /// Whether every box in the subtree below `id` is inline.
    pub fn contains_inlines_only_deep(&self, id: BoxId) -> bool {
        self[id].children.iter().all(|c| {
            self[*c].is_inline() && self.contains_inlines_only_deep(*c)
        })
    }

    /// Whether `id` has both inline and non-inline children.
    pub fn contains_variant_boxes(&self, id: BoxId) -> bool {
        let mut has_inline = false;
        let mut has_block = false;
        for child in &self[id].children {
            if self[*child].is_inline() {
                has_inline = true;
            } else {
                has_block = true;
            }
        }
        has_inline && has_block
    }

    /// The em size of a box in pixels, resolved through the font-size chain.
    pub fn em_height(&self, id: BoxId) -> f64 {
        let parent_em = match self[id].parent {
            Some(p) => self.em_height(p),
            None => 16.0,
        };
        let font_size = match self[id].styles.get_raw("font-size") {
            Some(v) => v,
            None => return parent_em,
        };
        let resolved = match_ignore_ascii_case! { font_size.trim(),
            "" => return parent_em,
            "xx-small" => 9.0,
            "x-small" => 10.0,
            "small" => 13.0,
            "medium" => 16.0,
            "large" => 18.0,
            "x-large" => 24.0,
            "xx-large" => 32.0,
            "smaller" => parent_em * 0.8,
            "larger" => parent_em * 1.2,
            _ => value::parse_length(font_size, parent_em, parent_em, None, false, false),
        };
        if resolved > 0.0 {
            resolved
        } else {
            parent_em
        }
    }

    pub fn set_display(&mut self, id: BoxId, display: Display) {
        let node = &mut self[id];
        node.display = display;
        node.styles.set("display", display.as_str());
    }

    /// Creates an anonymous box inheriting the inheritable properties that
    /// `style_source` has explicitly set.
    pub fn synthesize_anonymous(&mut self, style_source: BoxId, display: Display) -> BoxId {
        let mut node = BoxNode::new_anonymous(display);
        for (name, value) in self[style_source].styles.iter() {
            if style::is_inherited(name) {
                node.styles.set(name, value);
            }
        }
        node.styles.set("display", display.as_str());
        self.alloc(node)
    }

    /// Creates a detached copy of a box (tag, display, full style) with no
    /// children, used when splitting a box into parts.
    pub fn synthesize_continuation(&mut self, of: BoxId) -> BoxId {
        let source = &self[of];
        let node = BoxNode {
            tag: source.tag.clone(),
            display: source.display,
            styles: source.styles.clone(),
            text: None,
            anonymous: source.anonymous,
            parent: None,
            children: Vec::new(),
        };
        self.alloc(node)
    }

    fn print_box(&self, id: BoxId, print: &mut PrintTree) {
        let node = &self[id];
        let description = match node.text {
            Some(Text::Raw(ref t)) => format!("Text {:?}", t),
            Some(Text::Words(ref w)) => format!("Words {:?}", w),
            None => match node.tag {
                Some(ref tag) => format!("{:?} <{}>", node.display, tag.name),
                None => format!("{:?} (anonymous)", node.display),
            },
        };
        print.new_level(description);
        for child in &node.children {
            self.print_box(*child, print);
        }
        print.end_level();
    }

    pub fn print(&self) {
        self.print_to(&mut std::io::stdout());
    }

    pub fn print_to(&self, dest: &mut dyn Write) {
        let mut print = PrintTree::new("Box tree", dest);
        self.print_box(self.root, &mut print);
    }

    /// The tree rendered as the dump format, for tests.
    pub fn dump(&self) -> String {
        let mut out = Vec::new();
        self.print_to(&mut out);
        String::from_utf8(out).unwrap()
    }
}
