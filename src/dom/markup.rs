use super::node::{MemoryNode, NodeData};

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];
const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style", "textarea", "title"];

/// Parses a forgiving subset of HTML into a detached document node.
///
/// Unknown closing tags are dropped, unclosed elements are closed at end of
/// input, comments and doctypes are skipped. Whitespace-only text is kept
/// inside `body` and dropped elsewhere.
pub fn parse_markup(markup: &str) -> MemoryNode {
    let document = MemoryNode::document();
    let mut stack = vec![document.clone()];
    let mut cursor = Cursor::new(markup);

    while !cursor.is_done() {
        let text = cursor.take_until('<');
        let keep_blank = stack.iter().any(|node| node.tag() == Some("body"));
        push_text(current(&stack, &document), text, keep_blank);
        if cursor.is_done() {
            break;
        }

        if cursor.eat("<!--") {
            cursor.skip_past("-->");
        } else if cursor.starts_with("</") {
            cursor.advance(2);
            let name = cursor.take_name().to_ascii_lowercase();
            cursor.skip_past(">");
            close_element(&mut stack, &name);
        } else if cursor.starts_with("<!") || cursor.starts_with("<?") {
            cursor.skip_past(">");
        } else if cursor.peek_nth(1).is_some_and(|ch| ch.is_ascii_alphabetic()) {
            cursor.advance(1);
            let (element, self_closing) = parse_open_tag(&mut cursor);
            let tag = element.tag().unwrap_or_default().to_string();
            current(&stack, &document).append_child(element.clone());

            if RAW_TEXT_ELEMENTS.contains(&tag.as_str()) && !self_closing {
                let raw = cursor.take_until_closing(&tag);
                if tag == "script" || tag == "style" {
                    if !raw.is_empty() {
                        element.append_child(MemoryNode::text(raw));
                    }
                } else {
                    push_text(&element, raw, false);
                }
            } else if !self_closing && !VOID_ELEMENTS.contains(&tag.as_str()) {
                stack.push(element);
            }
        } else {
            cursor.advance(1);
            push_text(current(&stack, &document), "<", true);
        }
    }

    document
}

pub fn serialize(node: &MemoryNode) -> String {
    let mut out = String::new();
    write_node(node, &mut out);
    out
}

fn current<'a>(stack: &'a [MemoryNode], document: &'a MemoryNode) -> &'a MemoryNode {
    stack.last().unwrap_or(document)
}

fn push_text(parent: &MemoryNode, raw: &str, keep_blank: bool) {
    if raw.is_empty() || (!keep_blank && raw.trim().is_empty()) {
        return;
    }
    parent.append_child(MemoryNode::text(decode_entities(raw)));
}

fn close_element(stack: &mut Vec<MemoryNode>, name: &str) {
    let Some(index) = stack.iter().rposition(|node| node.tag() == Some(name)) else {
        return;
    };
    stack.truncate(index);
}

fn parse_open_tag(cursor: &mut Cursor<'_>) -> (MemoryNode, bool) {
    let tag = cursor.take_name().to_ascii_lowercase();
    let mut attrs: Vec<(String, String)> = Vec::new();
    let mut self_closing = false;

    loop {
        cursor.skip_whitespace();
        if cursor.is_done() {
            break;
        }
        if cursor.eat(">") {
            break;
        }
        if cursor.eat("/>") {
            self_closing = true;
            break;
        }
        if cursor.eat("/") {
            continue;
        }

        let name = cursor.take_attr_name().to_ascii_lowercase();
        if name.is_empty() {
            cursor.advance(1);
            continue;
        }
        cursor.skip_whitespace();
        let value = if cursor.eat("=") {
            cursor.skip_whitespace();
            decode_entities(cursor.take_attr_value())
        } else {
            String::new()
        };
        if !attrs.iter().any(|(existing, _)| *existing == name) {
            attrs.push((name, value));
        }
    }

    (MemoryNode::element(tag, attrs), self_closing)
}

fn write_node(node: &MemoryNode, out: &mut String) {
    match node.data() {
        NodeData::Document => {
            for child in node.children() {
                write_node(&child, out);
            }
        }
        NodeData::Text(content) => {
            let raw_parent = node
                .parent()
                .and_then(|parent| parent.tag().map(|tag| tag == "script" || tag == "style"))
                .unwrap_or(false);
            if raw_parent {
                out.push_str(content);
            } else {
                out.push_str(&encode_entities(content, false));
            }
        }
        NodeData::Element { tag, attrs } => {
            out.push('<');
            out.push_str(tag);
            for (key, value) in attrs {
                out.push(' ');
                out.push_str(key);
                if !value.is_empty() {
                    out.push_str("=\"");
                    out.push_str(&encode_entities(value, true));
                    out.push('"');
                }
            }
            out.push('>');
            if VOID_ELEMENTS.contains(&tag.as_str()) {
                return;
            }
            for child in node.children() {
                write_node(&child, out);
            }
            out.push_str("</");
            out.push_str(tag);
            out.push('>');
        }
    }
}

fn decode_entities(raw: &str) -> String {
    if !raw.contains('&') {
        return raw.to_string();
    }
    raw.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&nbsp;", "\u{a0}")
        .replace("&amp;", "&")
}

fn encode_entities(raw: &str, attribute: bool) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' if attribute => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }
    out
}

struct Cursor<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn rest(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn is_done(&self) -> bool {
        self.pos >= self.input.len()
    }

    fn starts_with(&self, prefix: &str) -> bool {
        self.rest().starts_with(prefix)
    }

    fn peek_nth(&self, n: usize) -> Option<char> {
        self.rest().chars().nth(n)
    }

    fn eat(&mut self, prefix: &str) -> bool {
        if self.starts_with(prefix) {
            self.pos += prefix.len();
            return true;
        }
        false
    }

    /// Advances by `n` characters.
    fn advance(&mut self, n: usize) {
        let rest = self.rest();
        let offset = rest
            .char_indices()
            .nth(n)
            .map(|(index, _)| index)
            .unwrap_or(rest.len());
        self.pos += offset;
    }

    fn take_while(&mut self, keep: impl Fn(char) -> bool) -> &'a str {
        let rest = self.rest();
        let end = rest
            .char_indices()
            .find(|(_, ch)| !keep(*ch))
            .map(|(index, _)| index)
            .unwrap_or(rest.len());
        self.pos += end;
        &rest[..end]
    }

    fn take_until(&mut self, stop: char) -> &'a str {
        self.take_while(|ch| ch != stop)
    }

    fn take_name(&mut self) -> &'a str {
        self.take_while(|ch| !ch.is_whitespace() && ch != '/' && ch != '>')
    }

    fn take_attr_name(&mut self) -> &'a str {
        self.take_while(|ch| !ch.is_whitespace() && !matches!(ch, '=' | '>' | '/' | '"' | '\''))
    }

    fn take_attr_value(&mut self) -> &'a str {
        for quote in ['"', '\''] {
            if self.rest().starts_with(quote) {
                self.advance(1);
                let value = self.take_until(quote);
                self.advance(1);
                return value;
            }
        }
        self.take_while(|ch| !ch.is_whitespace() && ch != '>')
    }

    fn skip_whitespace(&mut self) {
        self.take_while(char::is_whitespace);
    }

    fn skip_past(&mut self, marker: &str) {
        match self.rest().find(marker) {
            Some(index) => self.pos += index + marker.len(),
            None => self.pos = self.input.len(),
        }
    }

    /// Returns raw content up to `</tag` and consumes the closing tag.
    fn take_until_closing(&mut self, tag: &str) -> &'a str {
        let rest = self.rest();
        let lowered = rest.to_ascii_lowercase();
        let needle = format!("</{tag}");
        match lowered.find(&needle) {
            Some(index) => {
                let content = &rest[..index];
                self.pos += index;
                self.skip_past(">");
                content
            }
            None => {
                self.pos = self.input.len();
                rest
            }
        }
    }
}
