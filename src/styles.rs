//! Types for styling text.

use std::fmt;

use bitflags::bitflags;
use logos::Logos;

/// An 8-bit per channel RGBA color.
#[derive(Clone, Copy, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Color {
    /// The red channel.
    pub red: u8,
    /// The green channel.
    pub green: u8,
    /// The blue channel.
    pub blue: u8,
    /// The alpha channel.
    pub alpha: u8,
}

impl Color {
    /// Opaque black.
    pub const BLACK: Self = Self::rgb(0, 0, 0);
    /// Opaque blue.
    pub const BLUE: Self = Self::rgb(0, 0, 255);
    /// Opaque gray.
    pub const GRAY: Self = Self::rgb(128, 128, 128);
    /// Opaque green.
    pub const GREEN: Self = Self::rgb(0, 128, 0);
    /// Opaque red.
    pub const RED: Self = Self::rgb(255, 0, 0);
    /// Fully transparent black.
    pub const TRANSPARENT: Self = Self::new(0, 0, 0, 0);
    /// Opaque white.
    pub const WHITE: Self = Self::rgb(255, 255, 255);
    /// Opaque yellow.
    pub const YELLOW: Self = Self::rgb(255, 255, 0);

    /// Returns a color from its four channels.
    #[must_use]
    pub const fn new(red: u8, green: u8, blue: u8, alpha: u8) -> Self {
        Self {
            red,
            green,
            blue,
            alpha,
        }
    }

    /// Returns an opaque color.
    #[must_use]
    pub const fn rgb(red: u8, green: u8, blue: u8) -> Self {
        Self::new(red, green, blue, 255)
    }

    /// Returns this color with `alpha` replacing its alpha channel.
    #[must_use]
    pub const fn with_alpha(self, alpha: u8) -> Self {
        Self { alpha, ..self }
    }

    /// Parses a CSS color: a name, `#rgb`, `#rgba`, `#rrggbb`, `#rrggbbaa`,
    /// `rgb(r, g, b)` or `rgba(r, g, b, a)`.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        if let Some(hex) = value.strip_prefix('#') {
            return Self::parse_hex(hex);
        }
        let lower = value.to_ascii_lowercase();
        if let Some(args) = lower
            .strip_prefix("rgba(")
            .or_else(|| lower.strip_prefix("rgb("))
            .and_then(|rest| rest.strip_suffix(')'))
        {
            return Self::parse_functional(args);
        }
        NAMED_COLORS
            .iter()
            .find(|(name, _)| *name == lower)
            .map(|(_, color)| *color)
    }

    fn parse_hex(hex: &str) -> Option<Self> {
        let digit = |index: usize| -> Option<u8> {
            hex.get(index..=index)
                .and_then(|digit| u8::from_str_radix(digit, 16).ok())
                .map(|value| value * 17)
        };
        let pair = |index: usize| -> Option<u8> {
            hex.get(index..index + 2)
                .and_then(|pair| u8::from_str_radix(pair, 16).ok())
        };
        match hex.len() {
            3 => Some(Self::rgb(digit(0)?, digit(1)?, digit(2)?)),
            4 => Some(Self::new(digit(0)?, digit(1)?, digit(2)?, digit(3)?)),
            6 => Some(Self::rgb(pair(0)?, pair(2)?, pair(4)?)),
            8 => Some(Self::new(pair(0)?, pair(2)?, pair(4)?, pair(6)?)),
            _ => None,
        }
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn parse_functional(args: &str) -> Option<Self> {
        let mut channels = args.split(',').map(str::trim);
        let mut channel = || -> Option<u8> {
            let value = channels.next()?;
            let parsed = if let Some(percent) = value.strip_suffix('%') {
                percent.parse::<f32>().ok()? * 2.55
            } else {
                value.parse::<f32>().ok()?
            };
            Some(parsed.clamp(0., 255.).round() as u8)
        };
        let red = channel()?;
        let green = channel()?;
        let blue = channel()?;
        let alpha = match channels.next() {
            Some(alpha) => (alpha.parse::<f32>().ok()?.clamp(0., 1.) * 255.).round() as u8,
            None => 255,
        };
        Some(Self::new(red, green, blue, alpha))
    }
}

impl fmt::Debug for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "#{:02x}{:02x}{:02x}{:02x}",
            self.red, self.green, self.blue, self.alpha
        )
    }
}

impl From<Color> for image::Rgba<u8> {
    fn from(color: Color) -> Self {
        image::Rgba([color.red, color.green, color.blue, color.alpha])
    }
}

const NAMED_COLORS: &[(&str, Color)] = &[
    ("black", Color::BLACK),
    ("white", Color::WHITE),
    ("red", Color::RED),
    ("green", Color::GREEN),
    ("lime", Color::rgb(0, 255, 0)),
    ("blue", Color::BLUE),
    ("navy", Color::rgb(0, 0, 128)),
    ("yellow", Color::YELLOW),
    ("cyan", Color::rgb(0, 255, 255)),
    ("aqua", Color::rgb(0, 255, 255)),
    ("magenta", Color::rgb(255, 0, 255)),
    ("fuchsia", Color::rgb(255, 0, 255)),
    ("gray", Color::GRAY),
    ("grey", Color::GRAY),
    ("silver", Color::rgb(192, 192, 192)),
    ("maroon", Color::rgb(128, 0, 0)),
    ("olive", Color::rgb(128, 128, 0)),
    ("purple", Color::rgb(128, 0, 128)),
    ("teal", Color::rgb(0, 128, 128)),
    ("orange", Color::rgb(255, 165, 0)),
    ("transparent", Color::TRANSPARENT),
];

bitflags! {
    /// Decorations applied to runes.
    ///
    /// [`PARAGRAPH_START`](Self::PARAGRAPH_START) is a layout hint carried on
    /// the first rune of a span, and [`BACKGROUND`](Self::BACKGROUND) only
    /// appears in a span's decoration mask.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct Decorations: u16 {
        /// A line below the text.
        const UNDERLINE = 1 << 0;
        /// A line above the text.
        const OVERLINE = 1 << 1;
        /// A line through the middle of the text.
        const LINE_THROUGH = 1 << 2;
        /// A dotted line below the text.
        const DOTTED_UNDERLINE = 1 << 3;
        /// Raised, superscript text.
        const SUPERSCRIPT = 1 << 4;
        /// Lowered, subscript text.
        const SUBSCRIPT = 1 << 5;
        /// The span starts a new paragraph.
        const PARAGRAPH_START = 1 << 6;
        /// At least one rune has a background color.
        const BACKGROUND = 1 << 7;
        /// Any kind of underline.
        const ANY_UNDERLINE = Self::UNDERLINE.bits() | Self::DOTTED_UNDERLINE.bits();
    }
}

/// The weight (boldness) of a font.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Weight(pub u16);

impl Weight {
    /// The weight of bold text.
    pub const BOLD: Self = Self(700);
    /// The weight of regular text.
    pub const NORMAL: Self = Self(400);

    /// Returns true if this weight is rendered with a bold face.
    #[must_use]
    pub const fn is_bold(self) -> bool {
        self.0 >= 600
    }

    fn parse(value: &str, current: Self) -> Option<Self> {
        match value {
            "normal" => Some(Self::NORMAL),
            "bold" => Some(Self::BOLD),
            "bolder" => Some(Self(current.0.saturating_add(300).min(900))),
            "lighter" => Some(Self(current.0.saturating_sub(300).max(100))),
            number => number.parse().ok().map(Self),
        }
    }
}

impl Default for Weight {
    fn default() -> Self {
        Self::NORMAL
    }
}

/// Whether a font is upright or slanted.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash)]
pub enum Slant {
    /// Upright glyphs.
    #[default]
    Normal,
    /// Italic or oblique glyphs.
    Italic,
}

/// Returns the size in points of an absolute font size keyword.
#[must_use]
pub fn font_size_keyword(keyword: &str) -> Option<f32> {
    match keyword {
        "xx-small" => Some(7.),
        "x-small" => Some(7.5),
        "small" => Some(10.),
        "medium" => Some(12.),
        "large" => Some(14.),
        "x-large" => Some(18.),
        "xx-large" => Some(24.),
        _ => None,
    }
}

/// One frame of the font style stack: everything needed to pick a face and
/// paint runes with it.
#[derive(Clone, Debug, PartialEq)]
pub struct FontStyle {
    /// The font family, or a generic family such as `monospace`.
    pub family: String,
    /// The font size, in points.
    pub size: f32,
    /// The font weight.
    pub weight: Weight,
    /// The font slant.
    pub slant: Slant,
    /// The foreground color.
    pub color: Color,
    /// The background color. `None` is transparent.
    pub background: Option<Color>,
    /// Decorations applied to every rune in this style.
    pub decorations: Decorations,
}

impl Default for FontStyle {
    fn default() -> Self {
        Self {
            family: String::from("sans-serif"),
            size: 12.,
            weight: Weight::NORMAL,
            slant: Slant::Normal,
            color: Color::BLACK,
            background: None,
            decorations: Decorations::empty(),
        }
    }
}

impl FontStyle {
    /// Sets the family and returns self.
    #[must_use]
    pub fn with_family(mut self, family: impl Into<String>) -> Self {
        self.family = family.into();
        self
    }

    /// Sets the size in points and returns self.
    #[must_use]
    pub fn with_size(mut self, size: f32) -> Self {
        self.size = size;
        self
    }

    /// Sets the weight and returns self.
    #[must_use]
    pub fn with_weight(mut self, weight: Weight) -> Self {
        self.weight = weight;
        self
    }

    /// Sets the slant and returns self.
    #[must_use]
    pub fn with_slant(mut self, slant: Slant) -> Self {
        self.slant = slant;
        self
    }

    /// Sets the foreground color and returns self.
    #[must_use]
    pub fn with_color(mut self, color: Color) -> Self {
        self.color = color;
        self
    }

    /// Sets the background color and returns self.
    #[must_use]
    pub fn with_background(mut self, background: Option<Color>) -> Self {
        self.background = background;
        self
    }

    /// Adds `decorations` and returns self.
    #[must_use]
    pub fn with_decorations(mut self, decorations: Decorations) -> Self {
        self.decorations |= decorations;
        self
    }

    /// Changes the size by `points`, rounding the current size first.
    pub fn step_size(&mut self, points: f32) {
        self.size = (self.size.round() + points).max(1.);
    }

    /// Applies a single CSS-like property. Returns false if the property or
    /// its value was not understood, in which case the style is unchanged.
    pub fn apply_property(&mut self, name: &str, value: &str) -> bool {
        let value = value.trim();
        match name.trim().to_ascii_lowercase().as_str() {
            "color" => Color::parse(value).map(|color| self.color = color).is_some(),
            "background-color" | "background" => {
                if value.eq_ignore_ascii_case("none") {
                    self.background = None;
                    true
                } else {
                    Color::parse(value)
                        .map(|color| self.background = Some(color))
                        .is_some()
                }
            }
            "font-family" => {
                let family = value
                    .split(',')
                    .next()
                    .unwrap_or_default()
                    .trim()
                    .trim_matches(|ch| ch == '"' || ch == '\'');
                if family.is_empty() {
                    false
                } else {
                    self.family = family.to_string();
                    true
                }
            }
            "font-size" => self.apply_font_size(value),
            "font-weight" => Weight::parse(&value.to_ascii_lowercase(), self.weight)
                .map(|weight| self.weight = weight)
                .is_some(),
            "font-style" => match value.to_ascii_lowercase().as_str() {
                "normal" => {
                    self.slant = Slant::Normal;
                    true
                }
                "italic" | "oblique" => {
                    self.slant = Slant::Italic;
                    true
                }
                _ => false,
            },
            "text-decoration" | "text-decoration-line" => self.apply_text_decoration(value),
            "baseline-shift" => match value {
                "super" => {
                    self.decorations.insert(Decorations::SUPERSCRIPT);
                    true
                }
                "sub" => {
                    self.decorations.insert(Decorations::SUBSCRIPT);
                    true
                }
                "baseline" => {
                    self.decorations
                        .remove(Decorations::SUPERSCRIPT | Decorations::SUBSCRIPT);
                    true
                }
                _ => false,
            },
            _ => false,
        }
    }

    fn apply_font_size(&mut self, value: &str) -> bool {
        let value = value.to_ascii_lowercase();
        if let Some(points) = font_size_keyword(&value) {
            self.size = points;
            return true;
        }
        let size = match value.as_str() {
            "smaller" => Some(self.size.round() - 2.),
            "larger" => Some(self.size.round() + 2.),
            value => {
                let number_end = value
                    .find(|ch: char| !(ch.is_ascii_digit() || ch == '.' || ch == '-'))
                    .unwrap_or(value.len());
                let (number, unit) = value.split_at(number_end);
                number.parse::<f32>().ok().and_then(|number| match unit {
                    "" | "pt" => Some(number),
                    // A CSS pixel is defined as 1/96 inch.
                    "px" => Some(number * 0.75),
                    "em" | "rem" => Some(number * self.size),
                    "%" => Some(number / 100. * self.size),
                    _ => None,
                })
            }
        };
        match size {
            Some(size) if size > 0. => {
                self.size = size;
                true
            }
            _ => false,
        }
    }

    fn apply_text_decoration(&mut self, value: &str) -> bool {
        let mut understood = false;
        for word in value.split_whitespace() {
            let decoration = match word.to_ascii_lowercase().as_str() {
                "none" => {
                    self.decorations.remove(
                        Decorations::ANY_UNDERLINE
                            | Decorations::OVERLINE
                            | Decorations::LINE_THROUGH,
                    );
                    understood = true;
                    continue;
                }
                "underline" => Decorations::UNDERLINE,
                "overline" => Decorations::OVERLINE,
                "line-through" => Decorations::LINE_THROUGH,
                "dotted-underline" | "dotted" => Decorations::DOTTED_UNDERLINE,
                _ => continue,
            };
            self.decorations.insert(decoration);
            understood = true;
        }
        understood
    }

    /// Applies every property in `props`, returning the declarations that
    /// were not understood.
    pub fn apply_props<'a>(&mut self, props: &'a StyleProps) -> Vec<(&'a str, &'a str)> {
        props
            .iter()
            .filter(|(name, value)| !self.apply_property(name, value))
            .collect()
    }
}

/// An ordered list of `(name, value)` style properties.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StyleProps(Vec<(String, String)>);

impl StyleProps {
    /// Returns an empty list.
    #[must_use]
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    /// Parses an inline style declaration such as
    /// `color: red; font-family: "a; b"`. Declarations without a `:` are
    /// skipped.
    #[must_use]
    pub fn parse(declarations: &str) -> Self {
        let mut props = Self::new();
        let mut declaration_start = 0;
        let mut colon = None;
        let mut finish = |start: usize, colon: Option<usize>, end: usize| {
            if let Some(colon) = colon {
                let name = declarations[start..colon].trim();
                if !name.is_empty() {
                    props.push(name, declarations[colon + 1..end].trim());
                }
            }
        };
        for (token, span) in DeclarationToken::lexer(declarations).spanned() {
            match token {
                Ok(DeclarationToken::Colon) if colon.is_none() => colon = Some(span.start),
                Ok(DeclarationToken::Semicolon) => {
                    finish(declaration_start, colon.take(), span.start);
                    declaration_start = span.end;
                }
                // Values keep their raw text, so other tokens only matter for
                // keeping quoted semicolons out of the split.
                _ => {}
            }
        }
        finish(declaration_start, colon, declarations.len());
        props
    }

    /// Adds a property and returns self.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.push(name, value);
        self
    }

    /// Adds a property.
    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.push((name.into(), value.into()));
    }

    /// Returns true if there are no properties.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates over the properties in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(name, value)| (name.as_str(), value.as_str()))
    }
}

#[derive(Logos, Debug, Clone, Copy, PartialEq)]
#[logos(skip r"[ \t\n\r\f]+")]
enum DeclarationToken {
    #[token(":")]
    Colon,
    #[token(";")]
    Semicolon,
    #[regex(r#""[^"]*""#)]
    #[regex(r"'[^']*'")]
    Quoted,
    #[regex(r#"[^:;"' \t\n\r\f]+"#)]
    Word,
}

/// Style properties keyed by selector: `.name` for classes or a bare tag
/// name.
#[derive(Clone, Debug, Default)]
pub struct ClassStyles(ahash::AHashMap<String, StyleProps>);

impl ClassStyles {
    /// Returns an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds the properties for `selector` and returns self.
    #[must_use]
    pub fn with(mut self, selector: impl Into<String>, props: StyleProps) -> Self {
        self.insert(selector, props);
        self
    }

    /// Sets the properties for `selector`.
    pub fn insert(&mut self, selector: impl Into<String>, props: StyleProps) {
        self.0.insert(selector.into(), props);
    }

    /// Returns the properties for `selector`.
    #[must_use]
    pub fn get(&self, selector: &str) -> Option<&StyleProps> {
        self.0.get(selector)
    }
}

/// Alignment along one axis.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Align {
    /// Align to the left or top.
    #[default]
    Start,
    /// Center within the available space.
    Center,
    /// Align to the right or bottom.
    End,
}

/// How whitespace and line breaks in the source text are treated.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum WhiteSpace {
    /// Collapse whitespace and wrap lines.
    #[default]
    Normal,
    /// Collapse whitespace but never wrap.
    NoWrap,
    /// Preserve whitespace and line breaks, never wrap.
    Pre,
    /// Preserve line breaks and wrap.
    PreLine,
    /// Preserve whitespace and line breaks, and wrap.
    PreWrap,
}

/// The direction runes advance within a span.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TextDirection {
    /// Horizontal text, left to right.
    #[default]
    LeftToRight,
    /// Upright glyphs stacked top to bottom.
    TopToBottom,
    /// Glyphs rotated 90 degrees, running top to bottom.
    TopToBottomRotated,
}

/// Paragraph-level layout parameters. All distances are in pixels.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct TextStyle {
    /// Horizontal alignment of each line.
    pub align: Align,
    /// Vertical alignment of the whole block.
    pub align_v: Align,
    /// The line height as a multiple of the font's height.
    pub line_height: f32,
    /// Extra space added between runes.
    pub letter_spacing: f32,
    /// Extra space added after whitespace runes.
    pub word_spacing: f32,
    /// The number of columns between tab stops. 0 uses 4.
    pub tab_size: usize,
    /// The indentation of the first line of each paragraph.
    pub indent: f32,
    /// Space added before each paragraph except the first.
    pub paragraph_spacing: f32,
    /// Whitespace handling.
    pub white_space: WhiteSpace,
    /// The writing direction.
    pub direction: TextDirection,
}

impl Default for TextStyle {
    fn default() -> Self {
        Self {
            align: Align::Start,
            align_v: Align::Start,
            line_height: 1.,
            letter_spacing: 0.,
            word_spacing: 0.,
            tab_size: 4,
            indent: 0.,
            paragraph_spacing: 0.,
            white_space: WhiteSpace::Normal,
            direction: TextDirection::LeftToRight,
        }
    }
}

impl TextStyle {
    /// Sets the horizontal alignment and returns self.
    #[must_use]
    pub fn with_align(mut self, align: Align) -> Self {
        self.align = align;
        self
    }

    /// Sets the vertical alignment and returns self.
    #[must_use]
    pub fn with_align_v(mut self, align: Align) -> Self {
        self.align_v = align;
        self
    }

    /// Sets the line height multiplier and returns self.
    #[must_use]
    pub fn with_line_height(mut self, line_height: f32) -> Self {
        self.line_height = line_height;
        self
    }

    /// Sets the letter and word spacing and returns self.
    #[must_use]
    pub fn with_spacing(mut self, letter_spacing: f32, word_spacing: f32) -> Self {
        self.letter_spacing = letter_spacing;
        self.word_spacing = word_spacing;
        self
    }

    /// Sets the tab size in columns and returns self.
    #[must_use]
    pub fn with_tab_size(mut self, tab_size: usize) -> Self {
        self.tab_size = tab_size;
        self
    }

    /// Sets the first-line indent and returns self.
    #[must_use]
    pub fn with_indent(mut self, indent: f32) -> Self {
        self.indent = indent;
        self
    }

    /// Sets the space between paragraphs and returns self.
    #[must_use]
    pub fn with_paragraph_spacing(mut self, spacing: f32) -> Self {
        self.paragraph_spacing = spacing;
        self
    }

    /// Sets the whitespace handling and returns self.
    #[must_use]
    pub fn with_white_space(mut self, white_space: WhiteSpace) -> Self {
        self.white_space = white_space;
        self
    }

    /// Returns true if lines should wrap to the available width.
    #[must_use]
    pub const fn has_word_wrap(&self) -> bool {
        matches!(
            self.white_space,
            WhiteSpace::Normal | WhiteSpace::PreLine | WhiteSpace::PreWrap
        )
    }

    /// Returns true if whitespace in the source should be preserved.
    #[must_use]
    pub const fn has_pre(&self) -> bool {
        matches!(
            self.white_space,
            WhiteSpace::Pre | WhiteSpace::PreLine | WhiteSpace::PreWrap
        )
    }

    /// Returns the effective number of columns between tab stops.
    #[must_use]
    pub const fn effective_tab_size(&self) -> usize {
        if self.tab_size == 0 {
            4
        } else {
            self.tab_size
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_colors() {
        assert_eq!(Color::parse("red"), Some(Color::RED));
        assert_eq!(Color::parse("#fff"), Some(Color::WHITE));
        assert_eq!(Color::parse("#00000080"), Some(Color::new(0, 0, 0, 128)));
        assert_eq!(
            Color::parse("rgb(10, 20, 30)"),
            Some(Color::rgb(10, 20, 30))
        );
        assert_eq!(
            Color::parse("rgba(255, 0, 0, 0.5)"),
            Some(Color::new(255, 0, 0, 128))
        );
        assert_eq!(Color::parse("#ggg"), None);
        assert_eq!(Color::parse("not-a-color"), None);
    }

    #[test]
    fn style_props_round_trip_into_font_style() {
        let props = StyleProps::parse(
            "color: #ff0000; font-weight: bold; font-size: 16px; text-decoration: underline; bogus: 1",
        );
        let mut style = FontStyle::default();
        let unknown = style.apply_props(&props);
        assert_eq!(unknown, vec![("bogus", "1")]);
        assert_eq!(style.color, Color::RED);
        assert!(style.weight.is_bold());
        assert!((style.size - 12.).abs() < f32::EPSILON);
        assert!(style.decorations.contains(Decorations::UNDERLINE));
    }

    #[test]
    fn style_props_keep_quoted_separators() {
        let props = StyleProps::parse("font-family: \"a; b\", serif;color:red;;junk");
        let parsed: Vec<_> = props.iter().collect();
        assert_eq!(
            parsed,
            vec![("font-family", "\"a; b\", serif"), ("color", "red")]
        );
    }

    #[test]
    fn font_size_units() {
        let mut style = FontStyle::default();
        assert!(style.apply_property("font-size", "x-large"));
        assert!((style.size - 18.).abs() < f32::EPSILON);
        assert!(style.apply_property("font-size", "50%"));
        assert!((style.size - 9.).abs() < f32::EPSILON);
        assert!(!style.apply_property("font-size", "12furlongs"));
        assert!((style.size - 9.).abs() < f32::EPSILON);
    }

    #[test]
    fn white_space_modes() {
        let style = TextStyle::default();
        assert!(style.has_word_wrap());
        assert!(!style.has_pre());
        let pre = style.with_white_space(WhiteSpace::Pre);
        assert!(!pre.has_word_wrap());
        assert!(pre.has_pre());
        assert_eq!(pre.with_tab_size(0).effective_tab_size(), 4);
    }
}
