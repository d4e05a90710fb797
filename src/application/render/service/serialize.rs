use crate::domain::tree::{Document, Element, Node};

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

/// Elements whose leading newline is swallowed by the HTML parser.
const NEWLINE_SENSITIVE: &[&str] = &["pre", "textarea", "listing"];

/// Render the tree to an HTML string. Pure serialization: no node is added,
/// removed, or rewritten here.
///
/// The output never contains a blank line. A newline that would end a
/// whitespace-only line is written as `&#10;`, so the whole fragment reads
/// back as a single raw HTML block when it is fed through the renderer again.
pub(crate) fn serialize(document: &Document) -> String {
    let mut writer = HtmlWriter::default();
    for node in &document.children {
        writer.node(node);
    }
    writer.html
}

pub(crate) fn serialize_element(element: &Element) -> String {
    let mut writer = HtmlWriter::default();
    writer.element(element);
    writer.html
}

#[derive(Default)]
struct HtmlWriter {
    html: String,
    /// True while the current output line holds nothing but whitespace.
    line_is_blank: bool,
}

impl HtmlWriter {
    fn node(&mut self, node: &Node) {
        match node {
            Node::Text(text) => self.text(text),
            Node::Element(element) => self.element(element),
        }
    }

    fn element(&mut self, element: &Element) {
        self.markup("<");
        self.markup(&element.name);
        for attr in &element.attrs {
            self.markup(" ");
            self.markup(&attr.name);
            self.markup("=\"");
            self.attribute_value(&attr.value);
            self.markup("\"");
        }

        if VOID_ELEMENTS.contains(&element.name.as_str()) {
            self.markup(" />");
            return;
        }
        self.markup(">");

        if NEWLINE_SENSITIVE.contains(&element.name.as_str())
            && matches!(element.children.first(), Some(Node::Text(text)) if text.starts_with('\n'))
        {
            self.newline();
        }

        for child in &element.children {
            self.node(child);
        }

        self.markup("</");
        self.markup(&element.name);
        self.markup(">");
    }

    fn markup(&mut self, markup: &str) {
        self.html.push_str(markup);
        self.line_is_blank = false;
    }

    fn newline(&mut self) {
        if self.line_is_blank {
            self.html.push_str("&#10;");
            self.line_is_blank = false;
        } else {
            self.html.push('\n');
            self.line_is_blank = true;
        }
    }

    fn text(&mut self, value: &str) {
        for ch in value.chars() {
            match ch {
                '\n' => self.newline(),
                ' ' | '\t' => self.html.push(ch),
                '&' => self.markup("&amp;"),
                '<' => self.markup("&lt;"),
                '>' => self.markup("&gt;"),
                '\u{a0}' => self.markup("&nbsp;"),
                _ => {
                    self.html.push(ch);
                    self.line_is_blank = false;
                }
            }
        }
    }

    fn attribute_value(&mut self, value: &str) {
        for ch in value.chars() {
            match ch {
                '&' => self.html.push_str("&amp;"),
                '"' => self.html.push_str("&quot;"),
                '<' => self.html.push_str("&lt;"),
                '>' => self.html.push_str("&gt;"),
                '\n' => self.html.push_str("&#10;"),
                '\u{a0}' => self.html.push_str("&nbsp;"),
                _ => self.html.push(ch),
            }
        }
        self.line_is_blank = false;
    }
}
