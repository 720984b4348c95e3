//! DOM parsing helpers on top of html5ever/kuchiki, plus in-document
//! stylesheet discovery.

use crate::misc::print_tree::PrintTree;
use html5ever::LocalName;
use kuchiki::traits::*;
use kuchiki::{self, NodeData, NodeRef};
use std::io::{self, Read, Write};

/// Parses a DOM tree using html5ever and returns the root.
pub fn build_dom<R>(input: &mut R) -> io::Result<NodeRef>
where
    R: Read,
{
    kuchiki::parse_html().from_utf8().read_from(input)
}

fn print_node(node: &NodeRef, print: &mut PrintTree) {
    print.new_level(match node.data() {
        NodeData::Document(..) => "#document".into(),
        NodeData::DocumentFragment => "#document-fragment".into(),
        NodeData::Comment(ref comment) => format!("<!-- {} -->", comment.borrow()),
        NodeData::ProcessingInstruction(ref content) => {
            let content = content.borrow();
            format!("<?{} {}?>", content.0, content.1)
        },
        NodeData::Doctype(ref doctype) => format!(
            "<!DOCTYPE {} {} {}>",
            doctype.name, doctype.public_id, doctype.system_id
        ),
        NodeData::Text(ref text) => format!("#text {:?}", text.borrow()),
        NodeData::Element(ref element) => format!("<{}>", element.name.local),
    });

    for child in node.children() {
        print_node(&child, print);
    }

    print.end_level();
}

/// Prints the dom to stdout.
pub fn print_dom(root: &NodeRef) {
    print_dom_to(root, &mut std::io::stdout());
}

/// Prints the dom to a particular output.
pub fn print_dom_to(root: &NodeRef, dest: &mut dyn Write) {
    let mut tree = PrintTree::new("DOM tree", dest);
    print_node(root, &mut tree);
}

/// A stylesheet contributed by the document, in document order.
#[derive(Debug, Clone, PartialEq)]
pub enum DiscoveredStyle {
    /// The text content of a `<style>` element.
    Inline(String),
    /// The href of a `<link rel="stylesheet">` element, still to be fetched.
    Linked(String),
}

/// Walks the DOM collecting `<style>` contents and stylesheet links, in
/// document order.
pub fn discover_styles(root: &NodeRef) -> Vec<DiscoveredStyle> {
    let mut styles = Vec::new();
    discover_styles_from(root, &mut styles);
    styles
}

fn discover_styles_from(node: &NodeRef, styles: &mut Vec<DiscoveredStyle>) {
    if let NodeData::Element(ref element) = node.data() {
        if element.name.local == LocalName::from("style") {
            let mut css = String::new();
            for child in node.children() {
                if let NodeData::Text(ref text) = child.data() {
                    css.push_str(&text.borrow());
                }
            }
            styles.push(DiscoveredStyle::Inline(css));
            return;
        }
        if element.name.local == LocalName::from("link") {
            let attributes = element.attributes.borrow();
            let is_stylesheet = attributes
                .get("rel")
                .map_or(false, |rel| rel.eq_ignore_ascii_case("stylesheet"));
            if is_stylesheet {
                if let Some(href) = attributes.get("href") {
                    styles.push(DiscoveredStyle::Linked(href.to_string()));
                }
            }
            return;
        }
    }

    for child in node.children() {
        discover_styles_from(&child, styles);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn styles_are_discovered_in_document_order() {
        let html = "<html><head>\
                    <link rel=\"StyleSheet\" href=\"a.css\">\
                    <style>div { color: red }</style>\
                    <link rel=\"icon\" href=\"fav.ico\">\
                    </head><body></body></html>";
        let dom = build_dom(&mut html.as_bytes()).unwrap();
        let styles = discover_styles(&dom);
        assert_eq!(
            styles,
            vec![
                DiscoveredStyle::Linked("a.css".to_string()),
                DiscoveredStyle::Inline("div { color: red }".to_string()),
            ]
        );
    }
}
