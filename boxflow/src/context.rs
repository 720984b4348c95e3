//! Ambient state for a single render: the target medium, the page size,
//! tracing flags, and the collaborators that answer environment questions
//! (stylesheet bytes, font availability, named colors).

use crate::value::RgbaColor;
use app_units::Au;
use euclid::default::Size2D;
use font_kit::source::SystemSource;
use std::cell::RefCell;
use std::collections::HashSet;

bitflags! {
    /// Opt-in tracing of individual pipeline stages, logged at debug level.
    pub struct DebugFlags: u32 {
        const TRACE_CASCADE = 1 << 0;
        const TRACE_CORRECTIONS = 1 << 1;
        const TRACE_TABLES = 1 << 2;
    }
}

impl Default for DebugFlags {
    fn default() -> Self {
        DebugFlags::empty()
    }
}

/// Fetches external stylesheets referenced by `<link rel="stylesheet">`.
pub trait ResourceLoader {
    /// Returns the stylesheet text, or `None` when the resource can't be
    /// resolved. Failures are reported, not fatal.
    fn load_stylesheet(&self, href: &str) -> Option<String>;
}

/// Answers font questions for `font-family` resolution and registers
/// `@font-face` sources.
pub trait FontEnvironment {
    fn add_local_font_family(&self, family: &str, local: &str) -> bool;
    fn add_font_family_from_url(&self, family: &str, url: &str, format: Option<&str>) -> bool;
    fn font_exists(&self, family: &str) -> bool;
}

/// Resolves CSS named colors. Split out as a trait so hosts can extend the
/// palette (system colors, theme colors).
pub trait ColorEnvironment {
    fn resolve_named_color(&self, name: &str) -> Option<RgbaColor>;
}

/// A loader that resolves nothing. Every `<link>` becomes a reported load
/// failure.
pub struct NoResources;

impl ResourceLoader for NoResources {
    fn load_stylesheet(&self, _href: &str) -> Option<String> {
        None
    }
}

/// A font environment with no fonts at all; `font-family` always keeps the
/// inherited value.
pub struct NoFonts;

impl FontEnvironment for NoFonts {
    fn add_local_font_family(&self, _family: &str, _local: &str) -> bool {
        false
    }

    fn add_font_family_from_url(&self, _family: &str, _url: &str, _format: Option<&str>) -> bool {
        false
    }

    fn font_exists(&self, family: &str) -> bool {
        // Generic families are always considered present.
        matches!(
            &*family.to_ascii_lowercase(),
            "serif" | "sans-serif" | "monospace" | "cursive" | "fantasy"
        )
    }
}

/// Font lookup against the fonts installed on the system, plus families
/// registered from `@font-face` rules during this render.
pub struct SystemFonts {
    source: SystemSource,
    registered: RefCell<HashSet<String>>,
}

impl SystemFonts {
    pub fn new() -> Self {
        Self {
            source: SystemSource::new(),
            registered: RefCell::new(HashSet::new()),
        }
    }
}

impl Default for SystemFonts {
    fn default() -> Self {
        Self::new()
    }
}

impl FontEnvironment for SystemFonts {
    fn add_local_font_family(&self, family: &str, local: &str) -> bool {
        if self.source.select_family_by_name(local).is_err() {
            return false;
        }
        self.registered
            .borrow_mut()
            .insert(family.to_ascii_lowercase());
        true
    }

    fn add_font_family_from_url(&self, family: &str, _url: &str, _format: Option<&str>) -> bool {
        // Remote faces are fetched by the host at paint time; here we only
        // record that the family name resolves.
        self.registered
            .borrow_mut()
            .insert(family.to_ascii_lowercase());
        true
    }

    fn font_exists(&self, family: &str) -> bool {
        let lower = family.to_ascii_lowercase();
        if NoFonts.font_exists(family) || self.registered.borrow().contains(&lower) {
            return true;
        }
        self.source.select_family_by_name(family).is_ok()
    }
}

/// The CSS 2.1 named color palette (plus a few common extensions).
pub struct CssNamedColors;

static NAMED_COLOR_TABLE: &[(&str, RgbaColor)] = &[
    ("aqua", RgbaColor::rgb(0, 255, 255)),
    ("black", RgbaColor::BLACK),
    ("blue", RgbaColor::rgb(0, 0, 255)),
    ("brown", RgbaColor::rgb(165, 42, 42)),
    ("cyan", RgbaColor::rgb(0, 255, 255)),
    ("darkblue", RgbaColor::rgb(0, 0, 139)),
    ("darkgray", RgbaColor::rgb(169, 169, 169)),
    ("darkgreen", RgbaColor::rgb(0, 100, 0)),
    ("darkred", RgbaColor::rgb(139, 0, 0)),
    ("fuchsia", RgbaColor::rgb(255, 0, 255)),
    ("gold", RgbaColor::rgb(255, 215, 0)),
    ("gray", RgbaColor::rgb(128, 128, 128)),
    ("green", RgbaColor::rgb(0, 128, 0)),
    ("lightblue", RgbaColor::rgb(173, 216, 230)),
    ("lightgray", RgbaColor::rgb(211, 211, 211)),
    ("lightgreen", RgbaColor::rgb(144, 238, 144)),
    ("lime", RgbaColor::rgb(0, 255, 0)),
    ("magenta", RgbaColor::rgb(255, 0, 255)),
    ("maroon", RgbaColor::rgb(128, 0, 0)),
    ("navy", RgbaColor::rgb(0, 0, 128)),
    ("olive", RgbaColor::rgb(128, 128, 0)),
    ("orange", RgbaColor::rgb(255, 165, 0)),
    ("pink", RgbaColor::rgb(255, 192, 203)),
    ("purple", RgbaColor::rgb(128, 0, 128)),
    ("red", RgbaColor::rgb(255, 0, 0)),
    ("silver", RgbaColor::rgb(192, 192, 192)),
    ("teal", RgbaColor::rgb(0, 128, 128)),
    ("transparent", RgbaColor::TRANSPARENT),
    ("violet", RgbaColor::rgb(238, 130, 238)),
    ("white", RgbaColor::rgb(255, 255, 255)),
    ("yellow", RgbaColor::rgb(255, 255, 0)),
];

impl ColorEnvironment for CssNamedColors {
    fn resolve_named_color(&self, name: &str) -> Option<RgbaColor> {
        let lower = name.to_ascii_lowercase();
        NAMED_COLOR_TABLE
            .iter()
            .find(|(n, _)| *n == lower)
            .map(|(_, c)| *c)
    }
}

pub static NO_RESOURCES: NoResources = NoResources;
pub static NO_FONTS: NoFonts = NoFonts;
pub static NAMED_COLORS: CssNamedColors = CssNamedColors;

/// Everything a render needs besides the document itself.
pub struct RenderContext<'a> {
    /// The medium stylesheets are matched against, e.g. `print` or `screen`.
    pub media: String,
    pub page_size: Size2D<Au>,
    pub debug: DebugFlags,
    pub resources: &'a dyn ResourceLoader,
    pub fonts: &'a dyn FontEnvironment,
    pub colors: &'a dyn ColorEnvironment,
}

impl<'a> Default for RenderContext<'a> {
    fn default() -> Self {
        Self {
            media: "print".to_string(),
            // A4 at 96dpi.
            page_size: Size2D::new(Au::from_f64_px(793.7), Au::from_f64_px(1122.5)),
            debug: DebugFlags::default(),
            resources: &NO_RESOURCES,
            fonts: &NO_FONTS,
            colors: &NAMED_COLORS,
        }
    }
}
