//! The string-valued property model: display kinds, the property table with
//! initial values and inheritance flags, and the per-box resolved style map.
//!
//! Resolved values stay strings until layout; the cascade only decides *which*
//! string wins for each property.

use std::collections::HashMap;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Display {
    Block,
    Inline,
    InlineBlock,
    ListItem,
    Table,
    InlineTable,
    TableRow,
    TableRowGroup,
    TableHeaderGroup,
    TableFooterGroup,
    TableColumn,
    TableColumnGroup,
    TableCell,
    TableCaption,
    None,
}

impl Display {
    pub fn parse(value: &str) -> Option<Display> {
        Some(match_ignore_ascii_case! { value.trim(),
            "block" => Display::Block,
            "inline" => Display::Inline,
            "inline-block" => Display::InlineBlock,
            "list-item" => Display::ListItem,
            "table" => Display::Table,
            "inline-table" => Display::InlineTable,
            "table-row" => Display::TableRow,
            "table-row-group" => Display::TableRowGroup,
            "table-header-group" => Display::TableHeaderGroup,
            "table-footer-group" => Display::TableFooterGroup,
            "table-column" => Display::TableColumn,
            "table-column-group" => Display::TableColumnGroup,
            "table-cell" => Display::TableCell,
            "table-caption" => Display::TableCaption,
            "none" => Display::None,
            _ => return None,
        })
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Display::Block => "block",
            Display::Inline => "inline",
            Display::InlineBlock => "inline-block",
            Display::ListItem => "list-item",
            Display::Table => "table",
            Display::InlineTable => "inline-table",
            Display::TableRow => "table-row",
            Display::TableRowGroup => "table-row-group",
            Display::TableHeaderGroup => "table-header-group",
            Display::TableFooterGroup => "table-footer-group",
            Display::TableColumn => "table-column",
            Display::TableColumnGroup => "table-column-group",
            Display::TableCell => "table-cell",
            Display::TableCaption => "table-caption",
            Display::None => "none",
        }
    }

    pub fn is_inline_level(self) -> bool {
        match self {
            Display::Inline | Display::InlineBlock | Display::InlineTable => true,
            _ => false,
        }
    }

    pub fn is_table(self) -> bool {
        self == Display::Table || self == Display::InlineTable
    }

    pub fn is_row_group(self) -> bool {
        match self {
            Display::TableRowGroup | Display::TableHeaderGroup | Display::TableFooterGroup => true,
            _ => false,
        }
    }

    /// https://www.w3.org/TR/CSS2/tables.html#anonymous-boxes
    pub fn is_proper_table_child(self) -> bool {
        match self {
            Display::TableRow |
            Display::TableColumn |
            Display::TableColumnGroup |
            Display::TableCaption => true,
            d => d.is_row_group(),
        }
    }
}

pub struct PropertyDef {
    pub name: &'static str,
    pub initial: &'static str,
    pub inherited: bool,
}

macro_rules! property_table {
    ($(($name: expr, $initial: expr, $inherited: expr),)+) => {
        pub static PROPERTIES: &[PropertyDef] = &[
            $(PropertyDef { name: $name, initial: $initial, inherited: $inherited },)+
        ];
    }
}

property_table! {
    ("display", "inline", false),
    ("position", "static", false),
    ("float", "none", false),
    ("clear", "none", false),
    ("top", "auto", false),
    ("right", "auto", false),
    ("bottom", "auto", false),
    ("left", "auto", false),
    ("width", "auto", false),
    ("height", "auto", false),
    ("min-width", "0", false),
    ("min-height", "0", false),
    ("max-width", "none", false),
    ("max-height", "none", false),
    ("margin-top", "0", false),
    ("margin-right", "0", false),
    ("margin-bottom", "0", false),
    ("margin-left", "0", false),
    ("padding-top", "0", false),
    ("padding-right", "0", false),
    ("padding-bottom", "0", false),
    ("padding-left", "0", false),
    ("border-top-width", "medium", false),
    ("border-right-width", "medium", false),
    ("border-bottom-width", "medium", false),
    ("border-left-width", "medium", false),
    ("border-top-style", "none", false),
    ("border-right-style", "none", false),
    ("border-bottom-style", "none", false),
    ("border-left-style", "none", false),
    ("border-top-color", "currentcolor", false),
    ("border-right-color", "currentcolor", false),
    ("border-bottom-color", "currentcolor", false),
    ("border-left-color", "currentcolor", false),
    ("border-spacing", "0", true),
    ("border-collapse", "separate", true),
    ("background-color", "transparent", false),
    ("background-image", "none", false),
    ("background-position", "0% 0%", false),
    ("background-repeat", "repeat", false),
    ("color", "black", true),
    ("content", "normal", false),
    ("direction", "ltr", true),
    ("empty-cells", "show", true),
    ("font-family", "serif", true),
    ("font-size", "medium", true),
    ("font-style", "normal", true),
    ("font-variant", "normal", true),
    ("font-weight", "normal", true),
    ("letter-spacing", "normal", true),
    ("line-height", "normal", true),
    ("list-style-type", "disc", true),
    ("list-style-position", "outside", true),
    ("list-style-image", "none", true),
    ("overflow", "visible", false),
    ("text-align", "", true),
    ("text-decoration", "", false),
    ("text-decoration-line", "", false),
    ("text-decoration-style", "", false),
    ("text-decoration-color", "", false),
    ("text-indent", "0", true),
    ("text-transform", "none", true),
    ("vertical-align", "baseline", false),
    ("visibility", "visible", true),
    ("white-space", "normal", true),
    ("word-spacing", "normal", true),
    ("word-break", "normal", true),
    ("page-break-before", "auto", false),
    ("page-break-after", "auto", false),
}

/// The initial (CSS default) value of a property, or the empty string for
/// properties we don't track.
pub fn initial_value(name: &str) -> &'static str {
    for def in PROPERTIES {
        if def.name.eq_ignore_ascii_case(name) {
            return def.initial;
        }
    }
    ""
}

pub fn is_inherited(name: &str) -> bool {
    for def in PROPERTIES {
        if def.name.eq_ignore_ascii_case(name) {
            return def.inherited;
        }
    }
    false
}

/// Resolved style properties of one box. Lookups fall back to the property's
/// initial value, so an untouched map is already a fully-initialized style
/// (which also lets values written to a box *before* its own cascade pass,
/// like table cell borders from legacy attributes, survive step 1).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StyleMap {
    values: HashMap<String, String>,
}

impl StyleMap {
    pub fn get(&self, name: &str) -> &str {
        match self.values.get(&name.to_ascii_lowercase()) {
            Some(v) => v,
            None => initial_value(name),
        }
    }

    /// The explicitly-set value, without the initial-value fallback.
    pub fn get_raw(&self, name: &str) -> Option<&str> {
        self.values.get(&name.to_ascii_lowercase()).map(|v| &**v)
    }

    pub fn set(&mut self, name: &str, value: impl Into<String>) {
        self.values.insert(name.to_ascii_lowercase(), value.into());
    }

    pub fn unset(&mut self, name: &str) {
        self.values.remove(&name.to_ascii_lowercase());
    }

    /// The explicitly-set properties, in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (&**k, &**v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_round_trip() {
        assert_eq!(Display::parse("Table-Row"), Some(Display::TableRow));
        assert_eq!(Display::parse("garbage"), None);
        assert_eq!(Display::TableHeaderGroup.as_str(), "table-header-group");
        assert!(Display::TableHeaderGroup.is_row_group());
        assert!(Display::TableCaption.is_proper_table_child());
        assert!(!Display::TableCell.is_proper_table_child());
    }

    #[test]
    fn style_map_falls_back_to_initial() {
        let mut map = StyleMap::default();
        assert_eq!(map.get("white-space"), "normal");
        assert_eq!(map.get("color"), "black");
        map.set("Color", "red");
        assert_eq!(map.get("color"), "red");
        assert_eq!(map.get_raw("white-space"), None);
    }
}
