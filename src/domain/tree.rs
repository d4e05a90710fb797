//! Render-level document tree shared by every pipeline pass.
//!
//! The tree is a plain owned value: each render call builds one, threads it
//! through the passes by value, and drops it after serialization. There are
//! no parent pointers, so passes that need context carry it down explicitly.

use serde::Serialize;

/// Root of a rendered document. Holds the top-level nodes in source order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Document {
    pub children: Vec<Node>,
}

/// A node below the document root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Node {
    Element(Element),
    Text(String),
}

/// An HTML element with ordered, uniquely-named attributes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Element {
    pub name: String,
    pub attrs: Vec<Attribute>,
    pub children: Vec<Node>,
}

/// A single attribute. Values are raw strings; escaping is the serializer's job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Attribute {
    pub name: String,
    pub value: String,
}

impl Attribute {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

impl Document {
    pub fn new(children: Vec<Node>) -> Self {
        Self { children }
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// Drop whitespace-only text before the first top-level node and collapse
    /// whitespace-only text after the last one to a single newline.
    pub fn trim_edge_whitespace(&mut self) {
        let leading = self
            .children
            .iter()
            .take_while(|node| node.is_blank_text())
            .count();
        self.children.drain(..leading);

        if let Some(last) = self.children.last_mut()
            && last.is_blank_text()
        {
            *last = Node::text("\n");
        }
    }
}

impl Node {
    pub fn text(value: impl Into<String>) -> Self {
        Node::Text(value.into())
    }

    pub fn as_element(&self) -> Option<&Element> {
        match self {
            Node::Element(element) => Some(element),
            Node::Text(_) => None,
        }
    }

    fn is_blank_text(&self) -> bool {
        matches!(self, Node::Text(text) if text.trim().is_empty())
    }
}

impl From<Element> for Node {
    fn from(element: Element) -> Self {
        Node::Element(element)
    }
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attrs: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_attr(name, value);
        self
    }

    pub fn with_children(mut self, children: Vec<Node>) -> Self {
        self.children = children;
        self
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|attr| attr.name == name)
            .map(|attr| attr.value.as_str())
    }

    /// Set an attribute, replacing the value in place when it already exists
    /// so attribute order stays stable.
    pub fn set_attr(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.attrs.iter_mut().find(|attr| attr.name == name) {
            Some(existing) => existing.value = value,
            None => self.attrs.push(Attribute { name, value }),
        }
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.attr("class")
            .is_some_and(|value| value.split_ascii_whitespace().any(|token| token == class))
    }

    /// Append a class token unless it is already present.
    pub fn add_class(&mut self, class: &str) {
        match self.attr("class") {
            Some(existing) if existing.split_ascii_whitespace().any(|token| token == class) => {}
            Some(existing) if !existing.trim().is_empty() => {
                let joined = format!("{} {class}", existing.trim());
                self.set_attr("class", joined);
            }
            _ => self.set_attr("class", class),
        }
    }

    /// Heading level for `h1`..`h6`, `None` for every other element.
    pub fn heading_level(&self) -> Option<u8> {
        let bytes = self.name.as_bytes();
        match bytes {
            [b'h', digit @ b'1'..=b'6'] => Some(digit - b'0'),
            _ => None,
        }
    }

    /// Concatenated text of every descendant text node, tags stripped.
    pub fn text_content(&self) -> String {
        let mut buffer = String::new();
        collect_text(&self.children, &mut buffer);
        buffer
    }
}

fn collect_text(nodes: &[Node], buffer: &mut String) {
    for node in nodes {
        match node {
            Node::Text(text) => buffer.push_str(text),
            Node::Element(element) => collect_text(&element.children, buffer),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heading_level_only_matches_h1_to_h6() {
        assert_eq!(Element::new("h1").heading_level(), Some(1));
        assert_eq!(Element::new("h6").heading_level(), Some(6));
        assert_eq!(Element::new("h7").heading_level(), None);
        assert_eq!(Element::new("hr").heading_level(), None);
        assert_eq!(Element::new("header").heading_level(), None);
    }

    #[test]
    fn text_content_flattens_nested_markup() {
        let heading = Element::new("h2").with_children(vec![
            Node::text("Hello "),
            Element::new("em")
                .with_children(vec![Node::text("brave")])
                .into(),
            Node::text(" world"),
        ]);

        assert_eq!(heading.text_content(), "Hello brave world");
    }

    #[test]
    fn set_attr_keeps_original_position() {
        let mut element = Element::new("a")
            .with_attr("href", "#one")
            .with_attr("class", "x");
        element.set_attr("href", "#two");

        assert_eq!(element.attrs[0], Attribute::new("href", "#two"));
        assert_eq!(element.attrs[1], Attribute::new("class", "x"));
    }

    #[test]
    fn add_class_does_not_duplicate_tokens() {
        let mut element = Element::new("pre").with_attr("class", "a");
        element.add_class("b");
        element.add_class("b");
        assert_eq!(element.attr("class"), Some("a b"));
    }

    #[test]
    fn edge_whitespace_is_trimmed_at_the_top_level_only() {
        let mut document = Document::new(vec![
            Node::text("\n  "),
            Element::new("p")
                .with_children(vec![Node::text(" keep ")])
                .into(),
            Node::text("\n\n"),
        ]);
        document.trim_edge_whitespace();
        assert_eq!(
            document.children,
            vec![
                Element::new("p")
                    .with_children(vec![Node::text(" keep ")])
                    .into(),
                Node::text("\n"),
            ]
        );

        let mut blank = Document::new(vec![Node::text(" \n ")]);
        blank.trim_edge_whitespace();
        assert!(blank.is_empty());
    }
}
