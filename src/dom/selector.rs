use super::node::MemoryNode;

/// Compound selector: optional tag name plus attribute presence tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    tag: Option<String>,
    attrs: Vec<String>,
}

impl Selector {
    pub fn parse(input: &str) -> Option<Self> {
        let input = input.trim();
        if input.is_empty() {
            return None;
        }

        let (tag_text, mut rest) = match input.find('[') {
            Some(index) => (&input[..index], &input[index..]),
            None => (input, ""),
        };
        let tag = if tag_text.is_empty() || tag_text == "*" {
            None
        } else if tag_text.chars().all(is_name_char) {
            Some(tag_text.to_ascii_lowercase())
        } else {
            return None;
        };

        let mut attrs = Vec::new();
        while !rest.is_empty() {
            let inner = rest.strip_prefix('[')?;
            let close = inner.find(']')?;
            let name = inner[..close].trim();
            if name.is_empty() || !name.chars().all(is_name_char) {
                return None;
            }
            attrs.push(name.to_ascii_lowercase());
            rest = &inner[close + 1..];
        }

        Some(Self { tag, attrs })
    }

    pub fn matches(&self, node: &MemoryNode) -> bool {
        let Some(tag) = node.tag() else {
            return false;
        };
        if self.tag.as_deref().is_some_and(|wanted| wanted != tag) {
            return false;
        }
        self.attrs.iter().all(|name| node.has_attribute(name))
    }
}

fn is_name_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_' | ':')
}

#[cfg(test)]
mod tests {
    use super::Selector;
    use crate::dom::node::MemoryNode;

    #[test]
    fn parses_tag_and_attribute_tests() {
        let selector = Selector::parse("a[href][a-transition]").expect("selector should parse");
        let link = MemoryNode::element(
            "a",
            vec![
                ("href".to_string(), "/b".to_string()),
                ("a-transition".to_string(), "fade".to_string()),
            ],
        );
        let bare = MemoryNode::element("a", vec![("href".to_string(), "/b".to_string())]);

        assert!(selector.matches(&link));
        assert!(!selector.matches(&bare));
        assert!(!selector.matches(&MemoryNode::text("a")));
    }

    #[test]
    fn attribute_only_selector_matches_any_tag() {
        let selector = Selector::parse("[a-page]").expect("selector should parse");
        let section = MemoryNode::element("section", vec![("a-page".to_string(), String::new())]);
        assert!(selector.matches(&section));
    }

    #[test]
    fn rejects_malformed_selectors() {
        assert!(Selector::parse("").is_none());
        assert!(Selector::parse("a[href").is_none());
        assert!(Selector::parse("div > p").is_none());
        assert!(Selector::parse("a[]").is_none());
    }
}
