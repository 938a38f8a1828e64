//! An HTML-like markup subset for styled text.
//!
//! [`TextBlock::set_markup`] turns markup into spans: inline tags change the
//! style of the runes they enclose, `<p>` and `<br>` start new lines, and
//! `<a href>` records a [`Link`]. Markup problems never abort parsing.
//! Unknown tags and properties are skipped and recorded as diagnostics.
use std::borrow::Cow;

use logos::{Lexer, Logos};

use super::{Link, Span, SpanPos, TextBlock};
use crate::diagnostics::Diagnostic;
use crate::fonts::FontService;
use crate::styles::{
    font_size_keyword, ClassStyles, Color, Decorations, FontStyle, Slant, StyleProps,
    TextDirection, TextStyle, Weight, WhiteSpace,
};

const OPEN_QUOTE: &str = "\u{201c}";
const CLOSE_QUOTE: &str = "\u{201d}";

/// Colors and stylesheet used while parsing markup.
#[derive(Clone, Debug)]
pub struct MarkupOptions {
    /// The foreground color of `<a>` links.
    pub link_color: Color,
    /// The background color of `<mark>` text.
    pub highlight_color: Color,
    /// Styles for `.class` and tag-name selectors.
    pub classes: ClassStyles,
}

impl Default for MarkupOptions {
    fn default() -> Self {
        Self {
            link_color: Color::BLUE,
            highlight_color: Color::YELLOW,
            classes: ClassStyles::new(),
        }
    }
}

impl MarkupOptions {
    /// Sets the link color and returns self.
    #[must_use]
    pub fn with_link_color(mut self, color: Color) -> Self {
        self.link_color = color;
        self
    }

    /// Sets the highlight color and returns self.
    #[must_use]
    pub fn with_highlight_color(mut self, color: Color) -> Self {
        self.highlight_color = color;
        self
    }

    /// Sets the stylesheet and returns self.
    #[must_use]
    pub fn with_classes(mut self, classes: ClassStyles) -> Self {
        self.classes = classes;
        self
    }
}

impl TextBlock {
    /// Replaces the contents with the spans described by `markup`, starting
    /// from `font`.
    ///
    /// When `style` preserves whitespace, text is kept verbatim and every
    /// newline starts a new span. Otherwise whitespace collapses to single
    /// spaces and only `<p>` and `<br>` start new spans. The spans are not
    /// positioned; call [`layout`](Self::layout) next.
    pub fn set_markup(
        &mut self,
        markup: &str,
        font: &FontStyle,
        style: &TextStyle,
        fonts: &FontService,
        options: &MarkupOptions,
    ) {
        self.reset(style.direction);
        let mut parser = MarkupParser::new(font, style, fonts, options);
        parser.parse(markup);
        let (spans, links, diagnostics) = parser.finish();
        tracing::trace!(spans = spans.len(), links = links.len(), "parsed markup");
        self.spans = spans;
        self.links = links;
        self.diagnostics = diagnostics;
    }
}

#[derive(Logos, Debug, Clone, Copy, PartialEq)]
enum MarkupToken {
    #[regex(r"<[^<>]*>")]
    Tag,
    #[regex(r"[^<]+")]
    Text,
    #[token("<")]
    StrayOpen,
}

#[derive(Logos, Debug, Clone, Copy, PartialEq)]
#[logos(skip r"[ \t\n\r\f]+")]
enum AttributeToken<'s> {
    #[regex(r#"[^ \t\n\r\f"'=<>/][^ \t\n\r\f"'=<>]*"#, |lex| lex.slice())]
    Word(&'s str),
    #[token("=")]
    Equals,
    #[regex(r#""[^"]*""#, unquote)]
    #[regex(r"'[^']*'", unquote)]
    Quoted(&'s str),
    #[token("/")]
    Slash,
}

fn unquote<'s>(lex: &mut Lexer<'s, AttributeToken<'s>>) -> &'s str {
    let quoted = lex.slice();
    &quoted[1..quoted.len() - 1]
}

#[derive(Debug, PartialEq)]
enum ParsedTag {
    Open {
        name: String,
        attributes: Vec<(String, String)>,
        self_closing: bool,
    },
    Close(String),
    /// Comments, doctypes and processing instructions.
    Ignored,
    /// Not a tag at all, such as `<3>`.
    Literal,
}

impl ParsedTag {
    fn parse(tag: &str) -> Self {
        let inner = &tag[1..tag.len() - 1];
        if inner.starts_with('!') || inner.starts_with('?') {
            return Self::Ignored;
        }
        let (closing, rest) = match inner.strip_prefix('/') {
            Some(rest) => (true, rest),
            None => (false, inner),
        };
        let name_end = rest
            .find(|ch: char| ch.is_whitespace() || ch == '/')
            .unwrap_or(rest.len());
        let name = &rest[..name_end];
        if !name.chars().next().is_some_and(char::is_alphabetic) {
            return Self::Literal;
        }
        let name = name.to_ascii_lowercase();
        if closing {
            return Self::Close(name);
        }

        let mut attributes = Vec::new();
        let mut pending: Option<&str> = None;
        let mut expecting_value = false;
        let mut self_closing = false;
        let mut push = |name: &str, value: &str| {
            attributes.push((
                name.to_ascii_lowercase(),
                html_escape::decode_html_entities(value).into_owned(),
            ));
        };
        for token in AttributeToken::lexer(&rest[name_end..]) {
            self_closing = token == Ok(AttributeToken::Slash);
            match token {
                Ok(AttributeToken::Word(value) | AttributeToken::Quoted(value))
                    if expecting_value =>
                {
                    if let Some(name) = pending.take() {
                        push(name, value);
                    }
                    expecting_value = false;
                }
                Ok(AttributeToken::Equals) if pending.is_some() => expecting_value = true,
                Ok(AttributeToken::Word(word)) => {
                    if let Some(name) = pending.replace(word) {
                        push(name, "");
                    }
                }
                _ => {
                    expecting_value = false;
                    if let Some(name) = pending.take() {
                        push(name, "");
                    }
                }
            }
        }
        if let Some(name) = pending {
            push(name, "");
        }
        Self::Open {
            name,
            attributes,
            self_closing,
        }
    }
}

struct Frame {
    tag: String,
    style: FontStyle,
    link: Option<usize>,
}

struct MarkupParser<'a> {
    fonts: &'a FontService,
    options: &'a MarkupOptions,
    white_space: WhiteSpace,
    direction: TextDirection,
    spans: Vec<Span>,
    current: Span,
    links: Vec<Link>,
    diagnostics: Vec<Diagnostic>,
    stack: Vec<Frame>,
    next_is_para_start: bool,
}

impl<'a> MarkupParser<'a> {
    fn new(
        font: &FontStyle,
        style: &TextStyle,
        fonts: &'a FontService,
        options: &'a MarkupOptions,
    ) -> Self {
        Self {
            fonts,
            options,
            white_space: style.white_space,
            direction: style.direction,
            spans: Vec::new(),
            current: Span::new(style.direction),
            links: Vec::new(),
            diagnostics: Vec::new(),
            stack: vec![Frame {
                tag: String::new(),
                style: font.clone(),
                link: None,
            }],
            next_is_para_start: false,
        }
    }

    fn is_pre(&self) -> bool {
        matches!(
            self.white_space,
            WhiteSpace::Pre | WhiteSpace::PreLine | WhiteSpace::PreWrap
        )
    }

    fn parse(&mut self, markup: &str) {
        for (token, range) in MarkupToken::lexer(markup).spanned() {
            let source = &markup[range];
            match token {
                Ok(MarkupToken::Tag) => match ParsedTag::parse(source) {
                    ParsedTag::Open {
                        name,
                        attributes,
                        self_closing,
                    } => self.open_tag(name, attributes, self_closing),
                    ParsedTag::Close(name) => self.close_tag(&name),
                    ParsedTag::Ignored => {}
                    ParsedTag::Literal => self.literal(source),
                },
                Ok(MarkupToken::Text) => self.text(source),
                Ok(MarkupToken::StrayOpen) | Err(()) => self.literal(source),
            }
        }
    }

    fn position(&self) -> SpanPos {
        SpanPos::new(self.spans.len(), self.current.len())
    }

    fn text(&mut self, source: &str) {
        if !self.is_pre() {
            let collapsed = self.collapse(source, false);
            let decoded = html_escape::decode_html_entities(&collapsed).into_owned();
            self.append(&decoded);
            return;
        }

        let mut lines = source.split('\n').peekable();
        while let Some(line) = lines.next() {
            let line = line.strip_suffix('\r').unwrap_or(line);
            let line = if self.white_space == WhiteSpace::PreLine {
                Cow::Owned(self.collapse(line, true))
            } else {
                Cow::Borrowed(line)
            };
            let decoded = html_escape::decode_html_entities(&line).into_owned();
            self.append(&decoded);
            if lines.peek().is_some() {
                self.break_line();
            }
        }
    }

    fn literal(&mut self, source: &str) {
        if self.is_pre() {
            self.append(source);
        } else {
            let collapsed = self.collapse(source, false);
            self.append(&collapsed);
        }
    }

    /// Collapses runs of ASCII whitespace to single spaces. Whitespace after
    /// a space is dropped, as is leading whitespace on an empty line unless
    /// `keep_leading` is set.
    fn collapse(&self, text: &str, keep_leading: bool) -> String {
        let mut after_space = self
            .current
            .text
            .last()
            .map_or(!keep_leading, char::is_ascii_whitespace);
        let mut collapsed = String::with_capacity(text.len());
        for ch in text.chars() {
            if ch.is_ascii_whitespace() {
                if !after_space {
                    collapsed.push(' ');
                    after_space = true;
                }
            } else {
                collapsed.push(ch);
                after_space = false;
            }
        }
        collapsed
    }

    fn append(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        let Some(frame) = self.stack.last() else {
            return;
        };
        let at_start = self.current.is_empty();
        if let Some(link) = self
            .stack
            .iter()
            .rev()
            .find_map(|frame| frame.link)
            .and_then(|index| self.links.get_mut(index))
        {
            if link.label.is_empty() {
                link.start = SpanPos::new(self.spans.len(), self.current.len());
            }
            link.label.push_str(text);
        }
        let mut session = self.fonts.session();
        self.current
            .append_str(text, &frame.style, &mut session, &mut self.diagnostics);
        if self.next_is_para_start && at_start {
            self.current.set_new_paragraph();
        }
        self.next_is_para_start = false;
    }

    fn break_line(&mut self) {
        let finished = std::mem::replace(&mut self.current, Span::new(self.direction));
        self.finish_span(finished);
    }

    fn finish_span(&mut self, mut span: Span) {
        if !self.is_pre() {
            span.trim_space_right();
        }
        let index = self.spans.len();
        let len = span.len();
        for link in &mut self.links {
            for position in [&mut link.start, &mut link.end] {
                if position.span == index && position.rune > len {
                    position.rune = len;
                }
            }
        }
        self.spans.push(span);
    }

    fn open_tag(&mut self, name: String, attributes: Vec<(String, String)>, self_closing: bool) {
        let pre = self.is_pre();
        let options = self.options;
        match name.as_str() {
            "br" => {
                if !pre {
                    self.break_line();
                }
                return;
            }
            "p" | "pre" if pre => return,
            _ => {}
        }

        let Some(parent) = self.stack.last() else {
            return;
        };
        let mut style = parent.style.clone();
        let mut link = None;
        if !apply_simple_tag(&name, &mut style, options) {
            match name.as_str() {
                "a" => {
                    style.color = options.link_color;
                    style.decorations.insert(Decorations::UNDERLINE);
                    link = Some(self.links.len());
                    let url = attributes
                        .iter()
                        .find(|(name, _)| name == "href")
                        .map(|(_, value)| value.clone())
                        .unwrap_or_default();
                    let position = self.position();
                    self.links.push(Link {
                        label: String::new(),
                        url,
                        properties: attributes.clone(),
                        start: position,
                        end: position,
                    });
                }
                "q" => self.append(OPEN_QUOTE),
                "p" => {
                    if !self.current.is_empty() {
                        self.break_line();
                    }
                    self.next_is_para_start = true;
                }
                "span" | "dfn" | "bdo" | "pre" => {}
                _ => Diagnostic::UnknownTag(name.clone()).record(&mut self.diagnostics),
            }
        }

        for (attribute, value) in &attributes {
            match attribute.as_str() {
                "style" => self.apply_props(&mut style, &StyleProps::parse(value)),
                "class" => {
                    for class in value.split_ascii_whitespace() {
                        if let Some(props) = options.classes.get(&format!(".{class}")) {
                            self.apply_props(&mut style, props);
                        }
                    }
                }
                _ => {
                    style.apply_property(attribute, value);
                }
            }
        }
        if let Some(props) = options.classes.get(&name) {
            self.apply_props(&mut style, props);
        }

        if self_closing {
            if let Some(link) = link.and_then(|index| self.links.get_mut(index)) {
                link.end = link.start;
            }
        } else {
            self.stack.push(Frame {
                tag: name,
                style,
                link,
            });
        }
    }

    fn apply_props(&mut self, style: &mut FontStyle, props: &StyleProps) {
        for (name, value) in style.apply_props(props) {
            Diagnostic::UnknownProperty {
                name: name.to_string(),
                value: value.to_string(),
            }
            .record(&mut self.diagnostics);
        }
    }

    fn close_tag(&mut self, name: &str) {
        let pre = self.is_pre();
        match name {
            "br" => return,
            "p" | "pre" if pre => return,
            "p" => {
                self.break_line();
                self.next_is_para_start = true;
            }
            _ => {}
        }

        if self.stack.len() <= 1 {
            Diagnostic::UnmatchedClose {
                found: name.to_string(),
                expected: String::new(),
            }
            .record(&mut self.diagnostics);
            return;
        }
        if let Some(top) = self.stack.last() {
            if top.tag != name {
                Diagnostic::UnmatchedClose {
                    found: name.to_string(),
                    expected: top.tag.clone(),
                }
                .record(&mut self.diagnostics);
            }
            if top.tag == "q" {
                self.append(CLOSE_QUOTE);
            }
        }
        if let Some(frame) = self.stack.pop() {
            let position = self.position();
            if let Some(link) = frame.link.and_then(|index| self.links.get_mut(index)) {
                link.end = position;
            }
        }
    }

    fn finish(mut self) -> (Vec<Span>, Vec<Link>, Vec<Diagnostic>) {
        let position = self.position();
        for frame in self.stack.drain(1..) {
            if let Some(link) = frame.link.and_then(|index| self.links.get_mut(index)) {
                link.end = position;
            }
        }
        let last = std::mem::replace(&mut self.current, Span::new(self.direction));
        self.finish_span(last);
        if (!self.is_pre() || self.spans.len() == 1)
            && self.spans.last().is_some_and(Span::is_empty)
        {
            self.spans.pop();
        }
        (self.spans, self.links, self.diagnostics)
    }
}

/// Applies the styling of tags that only change the font. Returns false if
/// `name` is not one of them.
fn apply_simple_tag(name: &str, style: &mut FontStyle, options: &MarkupOptions) -> bool {
    match name {
        "b" | "strong" => style.weight = Weight::BOLD,
        "i" | "em" | "var" | "cite" => style.slant = Slant::Italic,
        "u" | "ins" => style.decorations.insert(Decorations::UNDERLINE),
        "s" | "del" | "strike" => style.decorations.insert(Decorations::LINE_THROUGH),
        "sup" => {
            style.decorations.insert(Decorations::SUPERSCRIPT);
            style.step_size(-2.);
        }
        "sub" => {
            style.decorations.insert(Decorations::SUBSCRIPT);
            style.step_size(-2.);
        }
        "small" => style.step_size(-2.),
        "big" => style.step_size(2.),
        "mark" => style.background = Some(options.highlight_color),
        "abbr" | "acronym" => style.decorations.insert(Decorations::DOTTED_UNDERLINE),
        "tt" | "kbd" | "samp" | "code" => style.family = String::from("monospace"),
        keyword => {
            let Some(size) = font_size_keyword(keyword) else {
                return false;
            };
            style.size = size;
        }
    }
    true
}
