//! A small in-memory element tree with a CSS selector subset.

use std::collections::BTreeMap;

/// Index of a node inside a [`FakeDom`].
pub type NodeId = usize;

#[derive(Debug, Clone)]
struct FakeNode {
    tag: String,
    attrs: BTreeMap<String, String>,
    parent: Option<NodeId>,
}

/// An element tree just rich enough for engine tests: tags, attributes,
/// parents, and a selector subset (`tag`, `#id`, `.class`, `[attr]`,
/// `[attr="value"]`, `*`, and compounds like `img.hero[src]`).
///
/// No combinators; the engine only ever queries flat selectors.
#[derive(Debug, Clone)]
pub struct FakeDom {
    nodes: Vec<FakeNode>,
}

impl Default for FakeDom {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeDom {
    /// An empty document: `html` root with a `body` child.
    #[must_use]
    pub fn new() -> Self {
        let mut dom = Self { nodes: Vec::new() };
        let html = dom.push("html", None);
        dom.push("body", Some(html));
        dom
    }

    /// The `body` element every document starts with.
    #[must_use]
    pub fn body(&self) -> NodeId {
        self.nodes
            .iter()
            .position(|node| node.tag == "body")
            .expect("document always has a body")
    }

    fn push(&mut self, tag: &str, parent: Option<NodeId>) -> NodeId {
        self.nodes.push(FakeNode {
            tag: tag.to_ascii_lowercase(),
            attrs: BTreeMap::new(),
            parent,
        });
        self.nodes.len() - 1
    }

    /// Append an element under `parent`, returning its id.
    pub fn add_element(&mut self, parent: NodeId, tag: &str) -> NodeId {
        assert!(parent < self.nodes.len(), "unknown parent node {parent}");
        self.push(tag, Some(parent))
    }

    /// Number of nodes in the tree (including `html` and `body`).
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    #[must_use]
    pub fn tag(&self, node: NodeId) -> &str {
        &self.nodes[node].tag
    }

    #[must_use]
    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes[node].parent
    }

    #[must_use]
    pub fn attr(&self, node: NodeId, name: &str) -> Option<&str> {
        self.nodes[node].attrs.get(name).map(String::as_str)
    }

    pub fn set_attr(&mut self, node: NodeId, name: &str, value: &str) {
        self.nodes[node].attrs.insert(name.to_string(), value.to_string());
    }

    pub fn remove_attr(&mut self, node: NodeId, name: &str) {
        self.nodes[node].attrs.remove(name);
    }

    /// All nodes matching `selector`, in document order.
    #[must_use]
    pub fn query(&self, selector: &str) -> Vec<NodeId> {
        (0..self.nodes.len())
            .filter(|&node| self.matches(node, selector))
            .collect()
    }

    /// Whether `node` matches a flat compound selector.
    #[must_use]
    pub fn matches(&self, node: NodeId, selector: &str) -> bool {
        let Some(parts) = parse_selector(selector) else {
            return false;
        };
        parts.iter().all(|part| self.matches_part(node, part))
    }

    fn matches_part(&self, node: NodeId, part: &SelectorPart) -> bool {
        let n = &self.nodes[node];
        match part {
            SelectorPart::Universal => true,
            SelectorPart::Tag(tag) => n.tag == *tag,
            SelectorPart::Id(id) => n.attrs.get("id").is_some_and(|v| v == id),
            SelectorPart::Class(class) => n
                .attrs
                .get("class")
                .is_some_and(|v| v.split_whitespace().any(|c| c == class)),
            SelectorPart::Attr(name) => n.attrs.contains_key(name),
            SelectorPart::AttrEq(name, value) => n.attrs.get(name).is_some_and(|v| v == value),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum SelectorPart {
    Universal,
    Tag(String),
    Id(String),
    Class(String),
    Attr(String),
    AttrEq(String, String),
}

fn parse_selector(selector: &str) -> Option<Vec<SelectorPart>> {
    let selector = selector.trim();
    if selector.is_empty() {
        return None;
    }
    let mut parts = Vec::new();
    let mut chars = selector.chars().peekable();
    while let Some(&c) = chars.peek() {
        match c {
            '*' => {
                chars.next();
                parts.push(SelectorPart::Universal);
            }
            '#' => {
                chars.next();
                parts.push(SelectorPart::Id(take_ident(&mut chars)?));
            }
            '.' => {
                chars.next();
                parts.push(SelectorPart::Class(take_ident(&mut chars)?));
            }
            '[' => {
                chars.next();
                parts.push(take_attr(&mut chars)?);
            }
            _ => {
                let tag = take_ident(&mut chars)?;
                parts.push(SelectorPart::Tag(tag.to_ascii_lowercase()));
            }
        }
    }
    Some(parts)
}

fn take_ident(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) -> Option<String> {
    let mut ident = String::new();
    while let Some(&c) = chars.peek() {
        if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
            ident.push(c);
            chars.next();
        } else {
            break;
        }
    }
    if ident.is_empty() {
        None
    } else {
        Some(ident)
    }
}

fn take_attr(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) -> Option<SelectorPart> {
    let mut name = String::new();
    while let Some(&c) = chars.peek() {
        if c == ']' {
            chars.next();
            return Some(SelectorPart::Attr(name));
        }
        if c == '=' {
            chars.next();
            break;
        }
        name.push(c);
        chars.next();
    }
    // value, optionally quoted
    let mut value = String::new();
    let quoted = matches!(chars.peek(), Some('"' | '\''));
    let quote = if quoted { chars.next() } else { None };
    while let Some(&c) = chars.peek() {
        if quoted && Some(c) == quote {
            chars.next();
            continue;
        }
        if c == ']' {
            chars.next();
            return Some(SelectorPart::AttrEq(name, value));
        }
        value.push(c);
        chars.next();
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> FakeDom {
        let mut dom = FakeDom::new();
        let main = dom.add_element(dom.body(), "main");
        dom.set_attr(main, "id", "content");
        let img = dom.add_element(main, "img");
        dom.set_attr(img, "class", "hero large");
        dom.set_attr(img, "src", "a.png");
        dom.add_element(main, "img");
        dom
    }

    #[test]
    fn test_query_by_tag() {
        let dom = sample();
        assert_eq!(dom.query("img").len(), 2);
        assert_eq!(dom.query("main").len(), 1);
        assert_eq!(dom.query("video").len(), 0);
    }

    #[test]
    fn test_query_by_id_class_attr() {
        let dom = sample();
        assert_eq!(dom.query("#content").len(), 1);
        assert_eq!(dom.query(".hero").len(), 1);
        assert_eq!(dom.query(".large").len(), 1);
        assert_eq!(dom.query("[src]").len(), 1);
        assert_eq!(dom.query("[src=\"a.png\"]").len(), 1);
        assert_eq!(dom.query("[src=\"b.png\"]").len(), 0);
    }

    #[test]
    fn test_compound_selector() {
        let dom = sample();
        assert_eq!(dom.query("img.hero[src]").len(), 1);
        assert_eq!(dom.query("img.missing").len(), 0);
    }

    #[test]
    fn test_unquoted_attr_value() {
        let dom = sample();
        assert_eq!(dom.query("[src=a.png]").len(), 1);
    }

    #[test]
    fn test_parent_chain() {
        let dom = sample();
        let img = dom.query(".hero")[0];
        let main = dom.parent(img).unwrap();
        assert_eq!(dom.tag(main), "main");
        let body = dom.parent(main).unwrap();
        assert_eq!(body, dom.body());
        let html = dom.parent(body).unwrap();
        assert!(dom.parent(html).is_none());
    }
}
