//! Parsing of raw property-value strings: numbers, lengths, colors, border
//! widths, font lists. Everything here is total: malformed input yields zero
//! or `None`, never a panic, so a bad declaration can be ignored by callers.

use crate::context::{ColorEnvironment, FontEnvironment};
use cssparser::{Parser, ParserInput, Token};

/// Pixels per millimeter and friends, per CSS 2.1 absolute units at 96dpi.
const PX_PER_MM: f64 = 3.779527559;
const PX_PER_CM: f64 = 37.795275591;
const PX_PER_IN: f64 = 96.0;
const PX_PER_PC: f64 = 16.0;

/// Lexical check for the simple CSS float grammar used here: digits with at
/// most one `.`, no sign, no exponent.
pub fn is_float(text: &str, start: usize, len: usize) -> bool {
    if len < 1 || start + len > text.len() {
        return false;
    }
    let mut saw_dot = false;
    for b in text.as_bytes()[start..start + len].iter() {
        match *b {
            b'.' => {
                if saw_dot {
                    return false;
                }
                saw_dot = true;
            },
            b'0'..=b'9' => {},
            _ => return false,
        }
    }
    true
}

pub fn is_int(text: &str, start: usize, len: usize) -> bool {
    if len < 1 || start + len > text.len() {
        return false;
    }
    text.as_bytes()[start..start + len]
        .iter()
        .all(|b| b.is_ascii_digit())
}

/// Evaluates a number, resolving a trailing `%` against `hundred_percent`.
/// Unparsable input is 0, never an error.
pub fn parse_number(number: &str, hundred_percent: f64) -> f64 {
    let number = number.trim();
    if number.is_empty() {
        return 0.0;
    }

    let is_percent = number.ends_with('%');
    let to_parse = if is_percent {
        &number[..number.len() - 1]
    } else {
        number
    };

    let result = match to_parse.trim().parse::<f64>() {
        Ok(v) => v,
        Err(_) => return 0.0,
    };

    if is_percent {
        result / 100.0 * hundred_percent
    } else {
        result
    }
}

/// Splits the trailing two-character unit off a length, falling back to
/// `default_unit` when the suffix isn't a known unit.
fn get_unit<'a>(length: &'a str, default_unit: Option<&'a str>) -> (&'a str, bool) {
    let unit = if length.len() >= 3 {
        &length[length.len() - 2..]
    } else {
        ""
    };
    match unit {
        "em" | "ex" | "px" | "mm" | "cm" | "in" | "pt" | "pc" => (unit, true),
        _ => (default_unit.unwrap_or(""), false),
    }
}

/// Parses a length with a unit suffix (e.g. `10px`, `3.1em`).
///
/// * `hundred_percent` resolves percentages.
/// * `em_px` is the em size in pixels for `em`/`ex`.
/// * `font_adjust` applies the 72/96 factor to pixel values for font-related
///   lengths.
/// * `return_points` short-circuits `pt` values to the raw number.
///
/// An unrecognized unit zeroes the value; that permissiveness is relied on by
/// documents in the wild.
pub fn parse_length(
    length: &str,
    hundred_percent: f64,
    em_px: f64,
    default_unit: Option<&str>,
    font_adjust: bool,
    return_points: bool,
) -> f64 {
    let length = length.trim();
    if length.is_empty() || length == "0" {
        return 0.0;
    }

    if length.ends_with('%') {
        return parse_number(length, hundred_percent);
    }

    let (unit, has_unit) = get_unit(length, default_unit);
    let number = if has_unit {
        &length[..length.len() - 2]
    } else {
        length
    };

    let factor = match unit {
        "em" => em_px,
        "ex" => em_px / 2.0,
        "px" => {
            if font_adjust {
                72.0 / 96.0
            } else {
                1.0
            }
        },
        "mm" => PX_PER_MM,
        "cm" => PX_PER_CM,
        "in" => PX_PER_IN,
        "pt" => {
            if return_points {
                return parse_number(number, hundred_percent);
            }
            96.0 / 72.0
        },
        "pc" => PX_PER_PC,
        _ => 0.0,
    };

    factor * parse_number(number, hundred_percent)
}

/// Whether the string already reads as a CSS length (number plus a known unit
/// or `%`). Used by legacy attribute translation to decide if a `px` suffix
/// must be added.
pub fn is_valid_length(value: &str) -> bool {
    let value = value.trim();
    if value.len() <= 1 {
        return false;
    }
    let number = if value.ends_with('%') {
        &value[..value.len() - 1]
    } else {
        let (_, has_unit) = get_unit(value, None);
        if !has_unit {
            return false;
        }
        &value[..value.len() - 2]
    };
    !number.is_empty() && is_float(number, 0, number.len())
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct RgbaColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl RgbaColor {
    pub const BLACK: RgbaColor = RgbaColor::rgb(0, 0, 0);
    pub const TRANSPARENT: RgbaColor = RgbaColor {
        r: 0,
        g: 0,
        b: 0,
        a: 0,
    };

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }
}

/// Parses a CSS color literal: `#`-hex (3/4/6/8 digits), `rgb(..)`,
/// `rgba(..)` (integer alpha, 0-255), or a named color resolved through the
/// collaborator. Malformed input is `None`; callers treat that as "invalid
/// declaration, ignore".
pub fn try_parse_color(text: &str, colors: &dyn ColorEnvironment) -> Option<RgbaColor> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    if text.starts_with('#') {
        return color_from_hex(&text[1..]);
    }

    let lower_starts = |prefix: &str| {
        text.len() > prefix.len() && text[..prefix.len()].eq_ignore_ascii_case(prefix)
    };

    if lower_starts("rgba(") && text.ends_with(')') {
        let parts = parse_int_list(&text["rgba(".len()..text.len() - 1]);
        if let [r, g, b, a] = *parts {
            return Some(RgbaColor::rgba(r, g, b, a));
        }
        return None;
    }

    if lower_starts("rgb(") && text.ends_with(')') {
        let parts = parse_int_list(&text["rgb(".len()..text.len() - 1]);
        if let [r, g, b] = *parts {
            return Some(RgbaColor::rgb(r, g, b));
        }
        return None;
    }

    colors.resolve_named_color(text)
}

fn color_from_hex(digits: &str) -> Option<RgbaColor> {
    fn nibble(b: u8) -> Option<u8> {
        match b {
            b'0'..=b'9' => Some(b - b'0'),
            b'a'..=b'f' => Some(b - b'a' + 10),
            b'A'..=b'F' => Some(b - b'A' + 10),
            _ => None,
        }
    }

    let bytes = digits.as_bytes();
    let mut channels = [0u8; 4];

    match bytes.len() {
        // Short forms duplicate each nibble: #abc == #aabbcc.
        3 | 4 => {
            for (i, b) in bytes.iter().enumerate() {
                let n = nibble(*b)?;
                channels[i] = n * 16 + n;
            }
            if bytes.len() == 3 {
                channels[3] = 255;
            }
        },
        6 | 8 => {
            for i in 0..bytes.len() / 2 {
                channels[i] = nibble(bytes[i * 2])? * 16 + nibble(bytes[i * 2 + 1])?;
            }
            if bytes.len() == 6 {
                channels[3] = 255;
            }
        },
        _ => return None,
    }

    Some(RgbaColor::rgba(
        channels[0], channels[1], channels[2], channels[3],
    ))
}

fn parse_int_list(text: &str) -> Vec<u8> {
    text.split(',')
        .filter_map(|part| part.trim().parse::<u16>().ok())
        .filter(|v| *v <= 255)
        .map(|v| v as u8)
        .collect()
}

/// Resolves `thin`/`medium`/`thick` border keywords; anything else is parsed
/// as a length. An empty value means `medium`.
pub fn actual_border_width(value: &str, em_px: f64) -> f64 {
    match_ignore_ascii_case! { value.trim(),
        "" | "medium" => 2.0,
        "thin" => 1.0,
        "thick" => 4.0,
        _ => parse_length(value, 1.0, em_px, None, false, false).abs(),
    }
}

/// Picks the first comma-separated, quote-trimmed family name the font
/// collaborator reports as available. `None` keeps the inherited value.
pub fn resolve_font_family(value: &str, fonts: &dyn FontEnvironment) -> Option<String> {
    for family in value.split(',') {
        let family = family.trim().trim_matches('"').trim_matches('\'').trim();
        if family.is_empty() {
            continue;
        }
        if fonts.font_exists(family) {
            return Some(family.to_string());
        }
    }
    None
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct FontFaceSource {
    pub url: Option<String>,
    pub format: Option<String>,
    pub local: Option<String>,
}

/// Extracts `local(..)`, `url(..)` and `format(..)` components from a
/// `@font-face` `src` value.
pub fn parse_font_face_src(value: &str) -> FontFaceSource {
    let mut input = ParserInput::new(value);
    let mut input = Parser::new(&mut input);
    let mut src = FontFaceSource::default();

    loop {
        let token = match input.next() {
            Ok(t) => t.clone(),
            Err(_) => break,
        };
        match token {
            Token::UnquotedUrl(ref url) => src.url = Some(url.to_string()),
            Token::Function(ref name) => {
                let name = name.to_string();
                let argument = input
                    .parse_nested_block(|i| -> Result<Option<String>, cssparser::ParseError<()>> {
                        match i.next() {
                            Ok(&Token::QuotedString(ref s)) => Ok(Some(s.to_string())),
                            Ok(&Token::Ident(ref s)) => Ok(Some(s.to_string())),
                            Ok(&Token::UnquotedUrl(ref s)) => Ok(Some(s.to_string())),
                            _ => Ok(None),
                        }
                    })
                    .ok()
                    .and_then(|a| a);
                match_ignore_ascii_case! { &name,
                    "local" => src.local = argument,
                    "format" => src.format = argument,
                    "url" => src.url = argument,
                    _ => {},
                }
            },
            _ => {},
        }
    }

    src
}

/// Strips the quotes off a `@font-face` family name.
pub fn font_face_family_name(value: &str) -> String {
    value
        .trim()
        .trim_matches('"')
        .trim_matches('\'')
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::CssNamedColors;

    #[test]
    fn float_and_int_checks() {
        assert!(is_float("12.5", 0, 4));
        assert!(is_float("12", 0, 2));
        assert!(!is_float("1.2.3", 0, 5));
        assert!(!is_float("-1", 0, 2));
        assert!(is_int("42", 0, 2));
        assert!(!is_int("4.2", 0, 3));
        assert!(!is_int("", 0, 0));
    }

    #[test]
    fn number_parsing() {
        assert_eq!(parse_number("50%", 200.0), 100.0);
        assert_eq!(parse_number("12.5", 0.0), 12.5);
        assert_eq!(parse_number("bogus", 100.0), 0.0);
        assert_eq!(parse_number("", 100.0), 0.0);
    }

    #[test]
    fn length_parsing() {
        assert_eq!(parse_length("50%", 200.0, 16.0, None, false, false), 100.0);
        assert_eq!(parse_length("", 200.0, 16.0, None, false, false), 0.0);
        assert_eq!(parse_length("0", 200.0, 16.0, None, false, false), 0.0);
        assert_eq!(parse_length("2em", 0.0, 10.0, None, false, false), 20.0);
        assert_eq!(parse_length("4ex", 0.0, 10.0, None, false, false), 20.0);
        assert_eq!(parse_length("10px", 0.0, 16.0, None, false, false), 10.0);
        assert_eq!(
            parse_length("96px", 0.0, 16.0, None, true, false),
            72.0,
            "font-related pixels use the 72/96 factor"
        );
        assert!((parse_length("2cm", 0.0, 16.0, None, false, false) - 75.590551182).abs() < 1e-6);
        assert_eq!(parse_length("1in", 0.0, 16.0, None, false, false), 96.0);
        assert_eq!(parse_length("72pt", 0.0, 16.0, None, false, false), 96.0);
        assert_eq!(
            parse_length("10pt", 0.0, 16.0, None, false, true),
            10.0,
            "return_points short-circuits to the raw number"
        );
        assert_eq!(parse_length("1pc", 0.0, 16.0, None, false, false), 16.0);
        // Unknown units silently zero the value.
        assert_eq!(parse_length("5vh", 0.0, 16.0, None, false, false), 0.0);
        // A bare number takes the default unit.
        assert_eq!(parse_length("12", 0.0, 16.0, Some("px"), false, false), 12.0);
    }

    #[test]
    fn valid_length_checks() {
        assert!(is_valid_length("10px"));
        assert!(is_valid_length("50%"));
        assert!(!is_valid_length("100"));
        assert!(!is_valid_length("auto"));
        assert!(!is_valid_length(""));
    }

    #[test]
    fn color_parsing() {
        let colors = CssNamedColors;
        assert_eq!(
            try_parse_color("#fff", &colors),
            Some(RgbaColor::rgb(255, 255, 255))
        );
        assert_eq!(
            try_parse_color("#a28b34", &colors),
            Some(RgbaColor::rgb(0xa2, 0x8b, 0x34))
        );
        assert_eq!(
            try_parse_color("#abcd", &colors),
            Some(RgbaColor::rgba(0xaa, 0xbb, 0xcc, 0xdd))
        );
        assert_eq!(
            try_parse_color("rgb(255, 180, 90)", &colors),
            Some(RgbaColor::rgb(255, 180, 90))
        );
        assert_eq!(
            try_parse_color("rgba(0, 0, 0, 128)", &colors),
            Some(RgbaColor::rgba(0, 0, 0, 128))
        );
        assert_eq!(try_parse_color("#xyz", &colors), None);
        assert_eq!(try_parse_color("rgb(1, 2)", &colors), None);
        assert_eq!(
            try_parse_color("red", &colors),
            Some(RgbaColor::rgb(255, 0, 0))
        );
        assert_eq!(try_parse_color("no-such-color", &colors), None);
    }

    #[test]
    fn border_width_keywords() {
        assert_eq!(actual_border_width("thin", 16.0), 1.0);
        assert_eq!(actual_border_width("medium", 16.0), 2.0);
        assert_eq!(actual_border_width("thick", 16.0), 4.0);
        assert_eq!(actual_border_width("", 16.0), 2.0);
        assert_eq!(actual_border_width("3px", 16.0), 3.0);
    }

    #[test]
    fn font_face_src_components() {
        let src = parse_font_face_src("local(\"Nice Font\"), url(fonts/nice.woff2) format(\"woff2\")");
        assert_eq!(src.local.as_deref(), Some("Nice Font"));
        assert_eq!(src.url.as_deref(), Some("fonts/nice.woff2"));
        assert_eq!(src.format.as_deref(), Some("woff2"));
    }
}
