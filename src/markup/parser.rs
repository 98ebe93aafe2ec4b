// Markup reader
//
// Accepts the forgiving subset of HTML/XML a game page is written in:
// quoted, unquoted and bare attributes, self-closing tags, HTML void
// elements, comments, doctypes and processing instructions. Text content is
// not part of the object model and is dropped.

use super::{Element, MarkupError};

/// Elements that never have a closing tag in HTML
const VOID_ELEMENTS: &[&str] = &[
    "AREA", "BASE", "BR", "COL", "EMBED", "HR", "IMG", "INPUT", "LINK", "META", "SOURCE", "TRACK",
    "WBR",
];

/// Elements whose content is raw text that must not be parsed as markup
const RAW_TEXT_ELEMENTS: &[&str] = &["SCRIPT", "STYLE"];

/// Deepest element nesting the reader accepts
pub(crate) const MAX_DEPTH: usize = 1024;

/// Parse markup text into its top-level elements
pub(crate) fn parse_nodes(text: &str) -> Result<Vec<Element>, MarkupError> {
    Reader::new(text).read_all()
}

/// An element still waiting for its closing tag
struct OpenElement {
    element: Element,
    line: usize,
    column: usize,
}

struct Reader<'a> {
    src: &'a str,
    pos: usize,
    line: usize,
    column: usize,
}

impl<'a> Reader<'a> {
    fn new(src: &'a str) -> Self {
        Self {
            src,
            pos: 0,
            line: 1,
            column: 1,
        }
    }

    fn read_all(mut self) -> Result<Vec<Element>, MarkupError> {
        let mut top_level = Vec::new();
        let mut stack: Vec<OpenElement> = Vec::new();

        while !self.at_end() {
            if self.starts_with("<!--") {
                self.skip_past("-->", "unterminated comment")?;
            } else if self.starts_with("<?") {
                self.skip_past("?>", "unterminated processing instruction")?;
            } else if self.starts_with("<!") {
                self.skip_past(">", "unterminated declaration")?;
            } else if self.starts_with("</") {
                let (line, column) = (self.line, self.column);
                self.advance(2);
                let name = self.read_name().to_ascii_uppercase();
                self.skip_whitespace();
                if !self.eat(">") {
                    return Err(self.error_at(line, column, format!("malformed closing tag </{}", name)));
                }

                let Some(open) = stack.pop() else {
                    return Err(self.error_at(line, column, format!("unexpected closing tag </{}>", name)));
                };
                if open.element.tag() != name {
                    return Err(self.error_at(
                        line,
                        column,
                        format!(
                            "closing tag </{}> does not match <{}> opened at line {}, column {}",
                            name,
                            open.element.tag(),
                            open.line,
                            open.column
                        ),
                    ));
                }
                Self::attach(&mut stack, &mut top_level, open.element);
            } else if self.starts_with("<") && self.next_is_name_start() {
                let (line, column) = (self.line, self.column);
                let (element, self_closing) = self.read_start_tag()?;

                if self_closing || VOID_ELEMENTS.contains(&element.tag()) {
                    Self::attach(&mut stack, &mut top_level, element);
                } else if RAW_TEXT_ELEMENTS.contains(&element.tag()) {
                    let closing = format!("</{}", element.tag().to_ascii_lowercase());
                    self.skip_raw_text(&closing, line, column)?;
                    self.skip_past(">", "unterminated closing tag")?;
                    Self::attach(&mut stack, &mut top_level, element);
                } else {
                    if stack.len() >= MAX_DEPTH {
                        return Err(self.error_at(
                            line,
                            column,
                            format!("elements nested too deeply (limit {})", MAX_DEPTH),
                        ));
                    }
                    stack.push(OpenElement {
                        element,
                        line,
                        column,
                    });
                }
            } else {
                // Character data; a lone '<' that starts no tag is text too
                self.bump();
                while !self.at_end() && !self.starts_with("<") {
                    self.bump();
                }
            }
        }

        if let Some(open) = stack.pop() {
            return Err(self.error_at(
                open.line,
                open.column,
                format!("unclosed element <{}>", open.element.tag()),
            ));
        }

        Ok(top_level)
    }

    fn attach(stack: &mut [OpenElement], top_level: &mut Vec<Element>, element: Element) {
        match stack.last_mut() {
            Some(parent) => parent.element.children.push(element),
            None => top_level.push(element),
        }
    }

    /// Read `<name attr=value ...>` or `<name ... />`; returns the element and whether it self-closed
    fn read_start_tag(&mut self) -> Result<(Element, bool), MarkupError> {
        self.advance(1);
        let name = self.read_name();
        let mut element = Element::new(name);

        loop {
            self.skip_whitespace();
            if self.at_end() {
                return Err(self.error(format!("unterminated start tag <{}>", element.tag())));
            }
            if self.eat("/>") {
                return Ok((element, true));
            }
            if self.eat(">") {
                return Ok((element, false));
            }

            let attr_name = self.read_name();
            if attr_name.is_empty() {
                return Err(self.error(format!(
                    "unexpected character {:?} in <{}>",
                    self.peek().unwrap_or_default(),
                    element.tag()
                )));
            }
            let attr_name = attr_name.to_ascii_lowercase();

            self.skip_whitespace();
            let value = if self.eat("=") {
                self.skip_whitespace();
                let raw = self.read_attr_value()?;
                decode_entities(raw)
            } else {
                String::new()
            };

            if element.attr(&attr_name).is_some() {
                log::debug!(
                    "Ignoring duplicate attribute '{}' on <{}>",
                    attr_name,
                    element.tag()
                );
            } else {
                element.attributes.push((attr_name, value));
            }
        }
    }

    fn read_attr_value(&mut self) -> Result<&'a str, MarkupError> {
        let quote = match self.peek() {
            Some(q @ ('"' | '\'')) => q,
            _ => {
                let start = self.pos;
                while let Some(c) = self.peek() {
                    if c.is_whitespace() || c == '>' {
                        break;
                    }
                    self.bump();
                }
                return Ok(&self.src[start..self.pos]);
            }
        };

        let (line, column) = (self.line, self.column);
        self.bump();
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c == quote {
                let value = &self.src[start..self.pos];
                self.bump();
                return Ok(value);
            }
            self.bump();
        }
        Err(self.error_at(line, column, "unterminated attribute value".to_string()))
    }

    fn read_name(&mut self) -> &'a str {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c.is_alphanumeric() || matches!(c, '-' | '_' | ':' | '.') {
                self.bump();
            } else {
                break;
            }
        }
        &self.src[start..self.pos]
    }

    fn next_is_name_start(&self) -> bool {
        self.src[self.pos..]
            .chars()
            .nth(1)
            .is_some_and(|c| c.is_alphabetic() || c == '_')
    }

    fn skip_raw_text(&mut self, closing: &str, line: usize, column: usize) -> Result<(), MarkupError> {
        while !self.at_end() {
            if self.src[self.pos..]
                .get(..closing.len())
                .is_some_and(|s| s.eq_ignore_ascii_case(closing))
            {
                return Ok(());
            }
            self.bump();
        }
        Err(self.error_at(line, column, format!("unclosed raw text element {}>", closing)))
    }

    fn skip_past(&mut self, terminator: &str, message: &str) -> Result<(), MarkupError> {
        let (line, column) = (self.line, self.column);
        while !self.at_end() {
            if self.eat(terminator) {
                return Ok(());
            }
            self.bump();
        }
        Err(self.error_at(line, column, message.to_string()))
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.bump();
        }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.src.len()
    }

    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn starts_with(&self, s: &str) -> bool {
        self.src[self.pos..].starts_with(s)
    }

    fn eat(&mut self, s: &str) -> bool {
        if self.starts_with(s) {
            self.advance(s.chars().count());
            true
        } else {
            false
        }
    }

    fn advance(&mut self, chars: usize) {
        for _ in 0..chars {
            self.bump();
        }
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn error(&self, message: String) -> MarkupError {
        self.error_at(self.line, self.column, message)
    }

    fn error_at(&self, line: usize, column: usize, message: String) -> MarkupError {
        MarkupError {
            line,
            column,
            message,
        }
    }
}

/// Decode the character references allowed in attribute values.
/// Unknown or unterminated references are kept literally, as browsers do.
pub(crate) fn decode_entities(raw: &str) -> String {
    if !raw.contains('&') {
        return raw.to_string();
    }

    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];

        let decoded = rest.find(';').and_then(|semi| {
            let entity = &rest[1..semi];
            let c = match entity {
                "amp" => Some('&'),
                "lt" => Some('<'),
                "gt" => Some('>'),
                "quot" => Some('"'),
                "apos" => Some('\''),
                _ => entity
                    .strip_prefix("#x")
                    .or_else(|| entity.strip_prefix("#X"))
                    .map(|hex| u32::from_str_radix(hex, 16))
                    .or_else(|| entity.strip_prefix('#').map(str::parse::<u32>))
                    .and_then(Result::ok)
                    .and_then(char::from_u32),
            };
            c.map(|c| (c, semi))
        });

        match decoded {
            Some((c, semi)) => {
                out.push(c);
                rest = &rest[semi + 1..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_nested_elements() {
        let nodes = parse_nodes(
            r#"<game w="320" h="240">
                <player x="10" y="20"></player>
                <wall solid x="0" y="200" w="320" h="40"/>
            </game>"#,
        )
        .unwrap();

        assert_eq!(nodes.len(), 1);
        let game = &nodes[0];
        assert_eq!(game.tag(), "GAME");
        assert_eq!(game.children().len(), 2);
        assert_eq!(game.children()[0].tag(), "PLAYER");
        assert_eq!(game.children()[1].attr("solid"), Some(""));
        assert_eq!(game.children()[1].attr("w"), Some("320"));
    }

    #[test]
    fn test_attribute_quoting_styles() {
        let nodes = parse_nodes(r#"<box a="1" b='two' c=3 d></box>"#).unwrap();
        let attrs: Vec<_> = nodes[0].attributes().collect();
        assert_eq!(attrs, vec![("a", "1"), ("b", "two"), ("c", "3"), ("d", "")]);
    }

    #[test]
    fn test_json_in_single_quotes() {
        let nodes = parse_nodes(r#"<method name="move" parameters='["dx","dy"]'/>"#).unwrap();
        assert_eq!(nodes[0].attr("parameters"), Some(r#"["dx","dy"]"#));
    }

    #[test]
    fn test_entities_decoded() {
        let nodes =
            parse_nodes(r#"<method parameters="[&quot;dx&quot;]" action="if (a &lt; b) x = 1;"/>"#)
                .unwrap();
        assert_eq!(nodes[0].attr("parameters"), Some(r#"["dx"]"#));
        assert_eq!(nodes[0].attr("action"), Some("if (a < b) x = 1;"));
    }

    #[test]
    fn test_decode_numeric_and_unknown_entities() {
        assert_eq!(decode_entities("&#65;&#x42;"), "AB");
        assert_eq!(decode_entities("a & b"), "a & b");
        assert_eq!(decode_entities("&bogus;"), "&bogus;");
    }

    #[test]
    fn test_comments_doctype_and_text_skipped() {
        let nodes = parse_nodes(
            "<?xml version=\"1.0\"?><!DOCTYPE html><!-- intro --><game>hello <b>x</b></game>",
        )
        .unwrap();
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].children()[0].tag(), "B");
    }

    #[test]
    fn test_void_and_raw_text_elements() {
        let nodes = parse_nodes(
            "<html><head><meta charset=utf-8><script>if (a < b) {}</script></head><body><game></game></body></html>",
        )
        .unwrap();
        let html = &nodes[0];
        let head = &html.children()[0];
        assert_eq!(head.children().len(), 2);
        assert_eq!(html.children()[1].children()[0].tag(), "GAME");
    }

    #[test]
    fn test_mismatched_closing_tag() {
        let err = parse_nodes("<game>\n  <player></wall>\n</game>").unwrap_err();
        assert_eq!(err.line, 2);
        assert!(err.message.contains("</WALL>"));
    }

    #[test]
    fn test_unclosed_element() {
        let err = parse_nodes("<game><player>").unwrap_err();
        assert!(err.message.contains("unclosed element <PLAYER>"));
    }

    #[test]
    fn test_unexpected_closing_tag() {
        let err = parse_nodes("</game>").unwrap_err();
        assert!(err.message.contains("unexpected closing tag"));
    }

    #[test]
    fn test_deep_nesting_is_rejected() {
        let depth = 200_000;
        let text = format!("{}<game/>{}", "<div>".repeat(depth), "</div>".repeat(depth));
        let err = parse_nodes(&text).unwrap_err();
        assert!(err.message.contains("nested too deeply"));
        assert_eq!(err.line, 1);

        // Right at the limit is still accepted
        let text = format!(
            "{}<game/>{}",
            "<div>".repeat(MAX_DEPTH),
            "</div>".repeat(MAX_DEPTH)
        );
        let document = crate::markup::Document::parse(&text).unwrap();
        assert!(document.game_root().is_some());
    }
}
