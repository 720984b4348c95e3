//! Stylesheet parsing and rule matching.
//!
//! Declarations keep their values as raw strings; interpretation happens when
//! the cascade applies them. Rules carry their selectors compiled, and
//! matching returns them sorted ascending by (specificity, source order) so
//! that the last applied value wins.

use cssparser::{
    self, AtRuleType, CowRcStr, DeclarationListParser, Parser, ParserInput, RuleListParser,
};
use smallvec::SmallVec;
use std::rc::Rc;

#[derive(Debug, Clone, PartialEq)]
pub struct Declaration {
    /// Always lowercase.
    pub name: String,
    pub value: String,
    pub important: bool,
}

/// An ordered set of declarations with unique property names. A later
/// declaration replaces an earlier one for the same property, unless the
/// earlier one was `!important` and the later one is not.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeclarationBlock {
    declarations: Vec<Declaration>,
}

impl DeclarationBlock {
    pub fn push(&mut self, declaration: Declaration) {
        if let Some(existing) = self
            .declarations
            .iter_mut()
            .find(|d| d.name == declaration.name)
        {
            if existing.important && !declaration.important {
                return;
            }
            *existing = declaration;
            return;
        }
        self.declarations.push(declaration);
    }

    pub fn get(&self, name: &str) -> Option<&Declaration> {
        let name = name.to_ascii_lowercase();
        self.declarations.iter().find(|d| d.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Declaration> {
        self.declarations.iter()
    }

    pub fn len(&self) -> usize {
        self.declarations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.declarations.is_empty()
    }
}

pub struct StyleRule {
    pub selectors: kuchiki::Selectors,
    pub block: DeclarationBlock,
}

#[derive(Clone)]
pub struct MediaRule {
    pub condition: String,
    pub rules: Vec<CssRule>,
}

#[derive(Clone)]
pub struct FontFaceRule {
    pub block: DeclarationBlock,
}

#[derive(Clone)]
pub struct PageRule {
    /// The raw page selector (`:first`, a name), empty when absent.
    pub selector: String,
    pub block: DeclarationBlock,
}

#[derive(Clone)]
pub struct KeyframesRule {
    pub name: String,
}

#[derive(Clone)]
pub enum CssRule {
    Style(Rc<StyleRule>),
    Media(MediaRule),
    FontFace(FontFaceRule),
    Page(PageRule),
    /// Recognized so documents using animations parse cleanly; the body is
    /// discarded since nothing here animates.
    Keyframes(KeyframesRule),
}

#[derive(Debug)]
pub enum RuleParseError<'i> {
    InvalidSelector,
    UnsupportedAtRule(CowRcStr<'i>),
}

pub type ParseError<'i> = cssparser::ParseError<'i, RuleParseError<'i>>;

/// Consumes the rest of `input` and hands back its raw text.
fn raw_remainder<'i>(input: &mut Parser<'i, '_>) -> &'i str {
    let start = input.position();
    while input.next().is_ok() {}
    input.slice_from(start)
}

/// Splits a declaration value from its `!important` suffix.
fn strip_important(value: &str) -> (&str, bool) {
    let trimmed = value.trim();
    let lower = trimmed.to_ascii_lowercase();
    if let Some(prefix_len) = lower.rfind("!important").filter(|p| {
        lower[p + "!important".len()..].trim().is_empty()
    }) {
        return (trimmed[..prefix_len].trim_end(), true);
    }
    (trimmed, false)
}

static BORDER_STYLE_KEYWORDS: &[&str] = &[
    "none", "hidden", "dotted", "dashed", "solid", "double", "groove", "ridge", "inset", "outset",
];

fn is_border_style_keyword(token: &str) -> bool {
    BORDER_STYLE_KEYWORDS
        .iter()
        .any(|k| k.eq_ignore_ascii_case(token))
}

fn is_border_width_token(token: &str) -> bool {
    token.starts_with(|c: char| c.is_ascii_digit() || c == '.') ||
        token.eq_ignore_ascii_case("thin") ||
        token.eq_ignore_ascii_case("medium") ||
        token.eq_ignore_ascii_case("thick")
}

type Declarations = SmallVec<[Declaration; 1]>;

fn declaration(name: &str, value: impl Into<String>, important: bool) -> Declaration {
    Declaration {
        name: name.to_string(),
        value: value.into(),
        important,
    }
}

/// Expands `margin`-style shorthands: one to four space-separated values
/// mapped to top/right/bottom/left.
fn expand_four_sides(prefix: &str, suffix: &str, value: &str, important: bool) -> Declarations {
    let side_name = |side: &str| {
        if suffix.is_empty() {
            format!("{}-{}", prefix, side)
        } else {
            format!("{}-{}-{}", prefix, side, suffix)
        }
    };

    let parts: Vec<&str> = value.split_whitespace().collect();
    let (top, right, bottom, left) = match *parts {
        [all] => (all, all, all, all),
        [vertical, horizontal] => (vertical, horizontal, vertical, horizontal),
        [top, horizontal, bottom] => (top, horizontal, bottom, horizontal),
        [top, right, bottom, left] => (top, right, bottom, left),
        _ => return Declarations::new(),
    };

    let mut ret = Declarations::new();
    ret.push(declaration(&side_name("top"), top, important));
    ret.push(declaration(&side_name("right"), right, important));
    ret.push(declaration(&side_name("bottom"), bottom, important));
    ret.push(declaration(&side_name("left"), left, important));
    ret
}

/// Expands `border` and the per-side `border-top` etc. shorthands by
/// classifying each token as width, style or color.
fn expand_border(side: Option<&str>, value: &str, important: bool) -> Declarations {
    let sides: &[&str] = match side {
        Some(s) => &[s][..],
        None => &["top", "right", "bottom", "left"],
    };

    let mut ret = Declarations::new();
    // Per CSS, omitted components reset to their initial values.
    let mut width = "medium";
    let mut style = "none";
    let mut color = "currentcolor";

    for token in value.split_whitespace() {
        if is_border_style_keyword(token) {
            style = token;
        } else if is_border_width_token(token) {
            width = token;
        } else {
            color = token;
        }
    }

    for s in sides {
        ret.push(declaration(&format!("border-{}-width", s), width, important));
        ret.push(declaration(&format!("border-{}-style", s), style, important));
        ret.push(declaration(&format!("border-{}-color", s), color, important));
    }
    ret
}

fn expand_declaration(name: &str, value: &str, important: bool) -> Declarations {
    let name = name.to_ascii_lowercase();
    match_ignore_ascii_case! { &name,
        "margin" => expand_four_sides("margin", "", value, important),
        "padding" => expand_four_sides("padding", "", value, important),
        "border-width" => expand_four_sides("border", "width", value, important),
        "border-style" => expand_four_sides("border", "style", value, important),
        "border-color" => expand_four_sides("border", "color", value, important),
        "border" => expand_border(None, value, important),
        "border-top" => expand_border(Some("top"), value, important),
        "border-right" => expand_border(Some("right"), value, important),
        "border-bottom" => expand_border(Some("bottom"), value, important),
        "border-left" => expand_border(Some("left"), value, important),
        "text-decoration" => {
            let mut ret = Declarations::new();
            ret.push(declaration("text-decoration", value, important));
            ret.push(declaration("text-decoration-line", value, important));
            ret
        },
        _ => {
            let mut ret = Declarations::new();
            ret.push(declaration(&name, value, important));
            ret
        },
    }
}

struct PropertyParser;

impl<'i> cssparser::DeclarationParser<'i> for PropertyParser {
    type Declaration = Declarations;
    type Error = RuleParseError<'i>;

    fn parse_value<'t>(
        &mut self,
        name: CowRcStr<'i>,
        input: &mut Parser<'i, 't>,
    ) -> Result<Self::Declaration, ParseError<'i>> {
        let raw = raw_remainder(input);
        let (value, important) = strip_important(raw);
        Ok(expand_declaration(&name, value, important))
    }
}

impl<'i> cssparser::AtRuleParser<'i> for PropertyParser {
    type PreludeBlock = ();
    type PreludeNoBlock = ();
    type AtRule = Declarations;
    type Error = RuleParseError<'i>;
}

pub fn parse_declarations(input: &mut Parser) -> DeclarationBlock {
    let mut block = DeclarationBlock::default();
    for result in DeclarationListParser::new(input, PropertyParser) {
        let declarations = match result {
            Ok(d) => d,
            Err((error, slice)) => {
                warn!("declaration dropped: {:?} in {:?}", error.kind, slice);
                continue;
            },
        };
        for declaration in declarations {
            block.push(declaration);
        }
    }
    block
}

/// Parses the contents of a `style="..."` attribute.
pub fn parse_style_attribute(text: &str) -> DeclarationBlock {
    let mut input = ParserInput::new(text);
    let mut input = Parser::new(&mut input);
    parse_declarations(&mut input)
}

pub enum AtRulePrelude {
    Media(String),
    FontFace,
    Page(String),
    Keyframes(String),
}

struct RuleParser;

impl<'i> cssparser::QualifiedRuleParser<'i> for RuleParser {
    type Prelude = kuchiki::Selectors;
    type QualifiedRule = CssRule;
    type Error = RuleParseError<'i>;

    fn parse_prelude<'t>(
        &mut self,
        input: &mut Parser<'i, 't>,
    ) -> Result<Self::Prelude, ParseError<'i>> {
        let location = input.current_source_location();
        let position = input.position();
        while input.next().is_ok() {}
        kuchiki::Selectors::compile(input.slice_from(position))
            .map_err(|()| location.new_custom_error(RuleParseError::InvalidSelector))
    }

    fn parse_block<'t>(
        &mut self,
        selectors: Self::Prelude,
        _location: cssparser::SourceLocation,
        input: &mut Parser<'i, 't>,
    ) -> Result<CssRule, ParseError<'i>> {
        Ok(CssRule::Style(Rc::new(StyleRule {
            selectors,
            block: parse_declarations(input),
        })))
    }
}

impl<'i> cssparser::AtRuleParser<'i> for RuleParser {
    type PreludeBlock = AtRulePrelude;
    type PreludeNoBlock = ();
    type AtRule = CssRule;
    type Error = RuleParseError<'i>;

    fn parse_prelude<'t>(
        &mut self,
        name: CowRcStr<'i>,
        input: &mut Parser<'i, 't>,
    ) -> Result<AtRuleType<(), AtRulePrelude>, ParseError<'i>> {
        let prelude = raw_remainder(input).trim().to_string();
        let rule = match_ignore_ascii_case! { &name,
            "media" => AtRulePrelude::Media(prelude),
            "font-face" => AtRulePrelude::FontFace,
            "page" => AtRulePrelude::Page(prelude.trim_start_matches(':').to_string()),
            "keyframes" | "-webkit-keyframes" => AtRulePrelude::Keyframes(prelude),
            _ => {
                return Err(
                    input.new_custom_error(RuleParseError::UnsupportedAtRule(name.clone()))
                )
            },
        };
        Ok(AtRuleType::WithBlock(rule))
    }

    fn parse_block<'t>(
        &mut self,
        prelude: AtRulePrelude,
        _location: cssparser::SourceLocation,
        input: &mut Parser<'i, 't>,
    ) -> Result<CssRule, ParseError<'i>> {
        Ok(match prelude {
            AtRulePrelude::Media(condition) => CssRule::Media(MediaRule {
                condition,
                rules: parse_rule_list(input),
            }),
            AtRulePrelude::FontFace => CssRule::FontFace(FontFaceRule {
                block: parse_declarations(input),
            }),
            AtRulePrelude::Page(selector) => CssRule::Page(PageRule {
                selector,
                block: parse_declarations(input),
            }),
            AtRulePrelude::Keyframes(name) => {
                while input.next().is_ok() {}
                CssRule::Keyframes(KeyframesRule { name })
            },
        })
    }
}

fn parse_rule_list(input: &mut Parser) -> Vec<CssRule> {
    let mut rules = Vec::new();
    for result in RuleListParser::new_for_nested_rule(input, RuleParser) {
        match result {
            Ok(rule) => rules.push(rule),
            Err((error, slice)) => {
                warn!("rule dropped: {:?} in {:?}", error.kind, slice);
            },
        }
    }
    rules
}

#[derive(Clone, Default)]
pub struct Stylesheet {
    pub rules: Vec<CssRule>,
}

impl Stylesheet {
    pub fn parse(css: &str) -> Stylesheet {
        let mut input = ParserInput::new(css);
        let mut input = Parser::new(&mut input);

        let mut rules = Vec::new();
        for result in RuleListParser::new_for_stylesheet(&mut input, RuleParser) {
            match result {
                Ok(rule) => rules.push(rule),
                Err((error, slice)) => {
                    warn!("rule dropped: {:?} in {:?}", error.kind, slice);
                },
            }
        }

        Stylesheet { rules }
    }
}

/// Whether a media query list applies to the target medium. This understands
/// comma-separated media types with the `only`/`not` prefixes; feature
/// expressions are ignored (the type alone decides).
pub fn media_matches(condition: &str, media: &str) -> bool {
    let condition = condition.trim();
    if condition.is_empty() {
        return true;
    }
    for part in condition.split(',') {
        let mut tokens = part.split_whitespace();
        let mut first = match tokens.next() {
            Some(t) => t,
            None => continue,
        };
        let mut negated = false;
        if first.eq_ignore_ascii_case("only") {
            first = match tokens.next() {
                Some(t) => t,
                None => continue,
            };
        } else if first.eq_ignore_ascii_case("not") {
            negated = true;
            first = match tokens.next() {
                Some(t) => t,
                None => continue,
            };
        }
        let type_matches = first.eq_ignore_ascii_case("all") || first.eq_ignore_ascii_case(media);
        if type_matches != negated {
            return true;
        }
    }
    false
}

/// All the stylesheets that apply to a document: the built-in defaults plus
/// whatever the document contributes. Cloning copies the sheet list but
/// shares the (immutable) style rules.
#[derive(Clone, Default)]
pub struct CssData {
    stylesheets: Vec<Stylesheet>,
}

impl CssData {
    /// The built-in user-agent sheet alone.
    pub fn with_defaults() -> Self {
        let mut data = CssData::default();
        data.add_stylesheet(Stylesheet::parse(include_str!("../../res/default.css")));
        data
    }

    pub fn add_stylesheet(&mut self, stylesheet: Stylesheet) {
        self.stylesheets.push(stylesheet);
    }

    pub fn stylesheet_count(&self) -> usize {
        self.stylesheets.len()
    }

    fn walk_effective_rules<'a>(&'a self, media: &str, f: &mut impl FnMut(&'a CssRule)) {
        fn walk<'a>(rules: &'a [CssRule], media: &str, f: &mut impl FnMut(&'a CssRule)) {
            for rule in rules {
                match rule {
                    CssRule::Media(m) => {
                        if media_matches(&m.condition, media) {
                            walk(&m.rules, media, f);
                        }
                    },
                    other => f(other),
                }
            }
        }
        for sheet in &self.stylesheets {
            walk(&sheet.rules, media, f);
        }
    }

    /// The style rules whose selectors match `element`, ascending by
    /// (specificity, source order). A rule with several matching selectors
    /// appears once per match, at each selector's own specificity.
    pub fn matching_rules(
        &self,
        media: &str,
        element: &kuchiki::NodeDataRef<kuchiki::ElementData>,
    ) -> Vec<Rc<StyleRule>> {
        struct Match {
            specificity: kuchiki::Specificity,
            source_order: usize,
            rule: Rc<StyleRule>,
        }

        let mut matches = Vec::new();
        let mut source_order = 0;
        self.walk_effective_rules(media, &mut |rule| {
            if let CssRule::Style(style_rule) = rule {
                for selector in &style_rule.selectors.0 {
                    if selector.matches(element) {
                        matches.push(Match {
                            specificity: selector.specificity(),
                            source_order,
                            rule: style_rule.clone(),
                        });
                    }
                }
            }
            source_order += 1;
        });

        matches.sort_by_key(|m| (m.specificity, m.source_order));
        matches.into_iter().map(|m| m.rule).collect()
    }

    pub fn font_face_rules(&self, media: &str) -> Vec<FontFaceRule> {
        let mut out = Vec::new();
        self.walk_effective_rules(media, &mut |rule| {
            if let CssRule::FontFace(r) = rule {
                out.push(r.clone());
            }
        });
        out
    }

    pub fn page_rules(&self, media: &str) -> Vec<PageRule> {
        let mut out = Vec::new();
        self.walk_effective_rules(media, &mut |rule| {
            if let CssRule::Page(r) = rule {
                out.push(r.clone());
            }
        });
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kuchiki::traits::*;

    #[test]
    fn important_suffix_is_stripped() {
        assert_eq!(strip_important("red !important"), ("red", true));
        assert_eq!(strip_important("red ! IMPORTANT "), ("red ! IMPORTANT", false));
        assert_eq!(strip_important("red!important"), ("red", true));
        assert_eq!(strip_important("red"), ("red", false));
    }

    #[test]
    fn later_declaration_replaces_earlier() {
        let block = parse_style_attribute("color: red; color: blue");
        assert_eq!(block.len(), 1);
        assert_eq!(block.get("color").unwrap().value, "blue");
    }

    #[test]
    fn important_survives_later_normal_declaration() {
        let block = parse_style_attribute("color: red !important; color: blue");
        assert_eq!(block.get("color").unwrap().value, "red");
        assert!(block.get("color").unwrap().important);

        let block = parse_style_attribute("color: red !important; color: blue !important");
        assert_eq!(block.get("color").unwrap().value, "blue");
    }

    #[test]
    fn margin_shorthand_expands() {
        let block = parse_style_attribute("margin: 1px 2px");
        assert_eq!(block.get("margin-top").unwrap().value, "1px");
        assert_eq!(block.get("margin-right").unwrap().value, "2px");
        assert_eq!(block.get("margin-bottom").unwrap().value, "1px");
        assert_eq!(block.get("margin-left").unwrap().value, "2px");
        assert!(block.get("margin").is_none());
    }

    #[test]
    fn border_shorthand_classifies_tokens() {
        let block = parse_style_attribute("border: 1px solid red");
        assert_eq!(block.get("border-top-width").unwrap().value, "1px");
        assert_eq!(block.get("border-left-style").unwrap().value, "solid");
        assert_eq!(block.get("border-bottom-color").unwrap().value, "red");

        // Omitted components reset.
        let block = parse_style_attribute("border: solid");
        assert_eq!(block.get("border-top-width").unwrap().value, "medium");
        assert_eq!(block.get("border-top-color").unwrap().value, "currentcolor");
    }

    #[test]
    fn text_decoration_sets_line_longhand() {
        let block = parse_style_attribute("text-decoration: underline");
        assert_eq!(block.get("text-decoration").unwrap().value, "underline");
        assert_eq!(block.get("text-decoration-line").unwrap().value, "underline");
    }

    #[test]
    fn media_type_matching() {
        assert!(media_matches("", "print"));
        assert!(media_matches("all", "print"));
        assert!(media_matches("print", "print"));
        assert!(media_matches("screen, print", "print"));
        assert!(media_matches("only print", "print"));
        assert!(!media_matches("screen", "print"));
        assert!(media_matches("not screen", "print"));
        assert!(!media_matches("not print", "print"));
        assert!(media_matches("print and (max-width: 10cm)", "print"));
    }

    #[test]
    fn rules_sort_by_specificity_then_source_order() {
        let sheet = Stylesheet::parse(
            "div { color: red } .fancy { color: green } div { color: blue }",
        );
        let mut data = CssData::default();
        data.add_stylesheet(sheet);

        let doc = kuchiki::parse_html().one("<div class=\"fancy\"></div>");
        let element = doc.select_first("div").unwrap();

        let rules = data.matching_rules("print", &element);
        assert_eq!(rules.len(), 3);
        let colors: Vec<_> = rules
            .iter()
            .map(|r| r.block.get("color").unwrap().value.clone())
            .collect();
        // Class selector outranks both tag selectors.
        assert_eq!(colors, ["red", "blue", "green"]);
    }

    #[test]
    fn media_blocks_filter_rules() {
        let sheet = Stylesheet::parse(
            "@media screen { div { color: red } } @media print { div { color: blue } }",
        );
        let mut data = CssData::default();
        data.add_stylesheet(sheet);

        let doc = kuchiki::parse_html().one("<div></div>");
        let element = doc.select_first("div").unwrap();

        let rules = data.matching_rules("print", &element);
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].block.get("color").unwrap().value, "blue");
    }

    #[test]
    fn unknown_at_rules_are_skipped() {
        let sheet = Stylesheet::parse("@import url(x.css); div { color: red }");
        assert_eq!(sheet.rules.len(), 1);
    }

    #[test]
    fn font_face_and_page_rules_are_collected() {
        let sheet = Stylesheet::parse(
            "@font-face { font-family: \"Nice\"; src: url(nice.woff2) } \
             @page { margin: 2cm } \
             @page :first { margin-top: 4cm }",
        );
        let mut data = CssData::default();
        data.add_stylesheet(sheet);

        let faces = data.font_face_rules("print");
        assert_eq!(faces.len(), 1);
        assert_eq!(faces[0].block.get("font-family").unwrap().value, "\"Nice\"");

        let pages = data.page_rules("print");
        assert_eq!(pages.len(), 2);
        assert_eq!(pages[0].selector, "");
        assert_eq!(pages[1].selector, "first");
    }
}
