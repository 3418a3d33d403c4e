//! Click filtering: decides whether a click on the page is a soft
//! navigation, a same-page no-op, or something the host should handle.

use url::Url;

use crate::config::MarkerConfig;
use crate::dom::Dom;
use crate::nav::NavigationRequest;
use crate::transition::{DEFAULT_TRANSITION, Trigger};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Modifiers {
    pub ctrl: bool,
    pub meta: bool,
    pub alt: bool,
    pub shift: bool,
}

impl Modifiers {
    pub fn any(self) -> bool {
        self.ctrl || self.meta || self.alt || self.shift
    }
}

#[derive(Debug, Clone)]
pub struct ClickEvent<N> {
    pub target: N,
    pub modifiers: Modifiers,
    default_prevented: bool,
}

impl<N> ClickEvent<N> {
    pub fn new(target: N) -> Self {
        Self {
            target,
            modifiers: Modifiers::default(),
            default_prevented: false,
        }
    }

    pub fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }

    pub fn prevent_default(&mut self) {
        self.default_prevented = true;
    }

    pub fn default_prevented(&self) -> bool {
        self.default_prevented
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    Modified,
    AlreadyPrevented,
    NoLink,
    EmptyHref,
    FragmentOnly,
    Targeted,
    OptedOut,
    CrossOrigin,
    InvalidHref,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClickDisposition<N> {
    /// Left to the host's default handling.
    Ignored(IgnoreReason),
    SamePage { address: Url, link: N },
    Navigate(NavigationRequest<N>),
}

pub fn classify_click<D: Dom>(
    dom: &D,
    location: &Url,
    markers: &MarkerConfig,
    event: &ClickEvent<D::Node>,
) -> ClickDisposition<D::Node> {
    use ClickDisposition::Ignored;

    if event.modifiers.any() {
        return Ignored(IgnoreReason::Modified);
    }
    if event.default_prevented() {
        return Ignored(IgnoreReason::AlreadyPrevented);
    }
    let Some(link) = dom.closest(&event.target, "a[href]") else {
        return Ignored(IgnoreReason::NoLink);
    };

    let href = dom.attribute(&link, "href").unwrap_or_default();
    let href = href.trim();
    if href.is_empty() {
        return Ignored(IgnoreReason::EmptyHref);
    }
    if href.starts_with('#') {
        return Ignored(IgnoreReason::FragmentOnly);
    }
    if dom.attribute(&link, "target").is_some() {
        return Ignored(IgnoreReason::Targeted);
    }
    if dom.attribute(&link, &markers.ignore).is_some() {
        return Ignored(IgnoreReason::OptedOut);
    }

    let Ok(address) = location.join(href) else {
        return Ignored(IgnoreReason::InvalidHref);
    };
    if !same_host(location, &address) {
        return Ignored(IgnoreReason::CrossOrigin);
    }
    if address.path() == location.path() {
        return ClickDisposition::SamePage { address, link };
    }

    let transition = dom
        .attribute(&link, &markers.transition)
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| DEFAULT_TRANSITION.to_string());
    ClickDisposition::Navigate(
        NavigationRequest::new(address.as_str())
            .with_transition(transition)
            .with_trigger(Trigger::Element(link)),
    )
}

/// Compares the host component (name and explicit port) and treats
/// `www.example.com` and `example.com` alike. The scheme is not compared.
fn same_host(location: &Url, candidate: &Url) -> bool {
    fn bare(url: &Url) -> Option<&str> {
        url.host_str().map(|host| host.strip_prefix("www.").unwrap_or(host))
    }
    bare(location) == bare(candidate) && location.port() == candidate.port()
}

#[cfg(test)]
mod tests {
    use url::Url;

    use super::{ClickDisposition, ClickEvent, IgnoreReason, Modifiers, classify_click};
    use crate::config::MarkerConfig;
    use crate::dom::{Dom, MemoryHost, MemoryNode};
    use crate::transition::Trigger;

    const PAGE: &str = r##"<main a-root><section a-page>
        <a id="plain" href="/b"><span id="label">b</span></a>
        <a id="fade" href="/c" a-transition="fade">c</a>
        <a id="self" href="/a?tab=2">self</a>
        <a id="frag" href="#top">top</a>
        <a id="blank" href="/d" target="_blank">d</a>
        <a id="opt" href="/e" a-ignore>e</a>
        <a id="ext" href="https://other.org/x">x</a>
        <a id="www" href="https://www.example.com/f">f</a>
        <a id="plain-http" href="http://example.com/g">g</a>
        <a id="port" href="https://example.com:8443/h">h</a>
        <a id="empty" href="  ">none</a>
        <p id="text">no link</p>
    </section></main>"##;

    fn host() -> MemoryHost {
        MemoryHost::new("https://example.com/a", PAGE).expect("host should build")
    }

    fn node(host: &MemoryHost, id: &str) -> MemoryNode {
        host.document()
            .descendants()
            .into_iter()
            .find(|node| node.attribute("id") == Some(id))
            .expect("node should exist")
    }

    fn classify(host: &MemoryHost, event: &ClickEvent<MemoryNode>) -> ClickDisposition<MemoryNode> {
        let location = Url::parse("https://example.com/a").expect("url should parse");
        classify_click(host, &location, &MarkerConfig::default(), event)
    }

    fn ignored(host: &MemoryHost, id: &str) -> Option<IgnoreReason> {
        match classify(host, &ClickEvent::new(node(host, id))) {
            ClickDisposition::Ignored(reason) => Some(reason),
            _ => None,
        }
    }

    #[test]
    fn click_inside_link_navigates_with_default_transition() {
        let host = host();
        let link = node(&host, "plain");
        let disposition = classify(&host, &ClickEvent::new(node(&host, "label")));
        let ClickDisposition::Navigate(request) = disposition else {
            panic!("expected navigation");
        };
        assert_eq!(request.address, "https://example.com/b");
        assert_eq!(request.transition, "default");
        assert!(!request.is_pop_state);
        assert_eq!(request.trigger, Trigger::Element(link));
    }

    #[test]
    fn transition_attribute_selects_transition() {
        let host = host();
        let ClickDisposition::Navigate(request) = classify(&host, &ClickEvent::new(node(&host, "fade")))
        else {
            panic!("expected navigation");
        };
        assert_eq!(request.transition, "fade");
    }

    #[test]
    fn same_path_is_same_page_even_with_query() {
        let host = host();
        let disposition = classify(&host, &ClickEvent::new(node(&host, "self")));
        assert!(matches!(
            disposition,
            ClickDisposition::SamePage { ref address, .. } if address.query() == Some("tab=2")
        ));
    }

    #[test]
    fn non_navigable_clicks_are_ignored() {
        let host = host();
        assert_eq!(ignored(&host, "frag"), Some(IgnoreReason::FragmentOnly));
        assert_eq!(ignored(&host, "blank"), Some(IgnoreReason::Targeted));
        assert_eq!(ignored(&host, "opt"), Some(IgnoreReason::OptedOut));
        assert_eq!(ignored(&host, "ext"), Some(IgnoreReason::CrossOrigin));
        assert_eq!(ignored(&host, "empty"), Some(IgnoreReason::EmptyHref));
        assert_eq!(ignored(&host, "text"), Some(IgnoreReason::NoLink));
        assert_eq!(ignored(&host, "port"), Some(IgnoreReason::CrossOrigin));
        assert_eq!(ignored(&host, "www"), None);
        assert_eq!(ignored(&host, "plain-http"), None);
    }

    #[test]
    fn modified_or_prevented_clicks_are_ignored() {
        let host = host();
        let modified = ClickEvent::new(node(&host, "plain")).with_modifiers(Modifiers {
            meta: true,
            ..Modifiers::default()
        });
        assert_eq!(
            classify(&host, &modified),
            ClickDisposition::Ignored(IgnoreReason::Modified)
        );

        let mut prevented = ClickEvent::new(node(&host, "plain"));
        prevented.prevent_default();
        assert_eq!(
            classify(&host, &prevented),
            ClickDisposition::Ignored(IgnoreReason::AlreadyPrevented)
        );
        assert!(host.query("[a-page]", None).is_some());
    }
}
