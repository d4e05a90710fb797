//! Allow-list sanitizer over the render-level tree.
//!
//! This is the only security boundary between authored content and the
//! browser. Elements without a schema entry are unwrapped (their children are
//! kept), elements in the drop set lose their whole subtree, and attributes
//! survive only when both their name and value pass the schema.

use crate::domain::{
    schema::{SanitizationSchema, ValuePattern, is_drop_subtree_tag},
    tree::{Attribute, Document, Element, Node},
};

/// Counts of what the sanitizer removed, logged by the render service.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) struct SanitizeReport {
    pub(crate) unwrapped_elements: usize,
    pub(crate) dropped_subtrees: usize,
    pub(crate) dropped_attributes: usize,
}

impl SanitizeReport {
    pub(crate) fn is_clean(&self) -> bool {
        self.unwrapped_elements == 0 && self.dropped_subtrees == 0 && self.dropped_attributes == 0
    }
}

pub(crate) fn sanitize(document: Document, schema: &SanitizationSchema) -> (Document, SanitizeReport) {
    let mut report = SanitizeReport::default();
    let children = sanitize_nodes(document.children, schema, &mut report);
    let mut document = Document::new(children);
    document.trim_edge_whitespace();
    (document, report)
}

fn sanitize_nodes(
    nodes: Vec<Node>,
    schema: &SanitizationSchema,
    report: &mut SanitizeReport,
) -> Vec<Node> {
    let mut output = Vec::with_capacity(nodes.len());
    for node in nodes {
        match node {
            Node::Text(text) => push_text(&mut output, text),
            Node::Element(element) => sanitize_element(element, schema, report, &mut output),
        }
    }
    output
}

fn sanitize_element(
    element: Element,
    schema: &SanitizationSchema,
    report: &mut SanitizeReport,
    output: &mut Vec<Node>,
) {
    let Element {
        name,
        attrs,
        children,
    } = element;

    if is_drop_subtree_tag(&name) {
        report.dropped_subtrees += 1;
        return;
    }

    if !schema.allows_tag(&name) {
        report.unwrapped_elements += 1;
        for child in sanitize_nodes(children, schema, report) {
            match child {
                Node::Text(text) => push_text(output, text),
                element @ Node::Element(_) => output.push(element),
            }
        }
        return;
    }

    let attrs = filter_attributes(&name, attrs, schema, report);
    let children = sanitize_nodes(children, schema, report);
    let mut element = Element {
        name,
        attrs,
        children,
    };
    for (attribute, value) in schema.required_attributes(&element.name) {
        element.set_attr(attribute, value);
    }
    output.push(Node::Element(element));
}

fn filter_attributes(
    tag: &str,
    attrs: Vec<Attribute>,
    schema: &SanitizationSchema,
    report: &mut SanitizeReport,
) -> Vec<Attribute> {
    let mut kept = Vec::with_capacity(attrs.len());
    for attr in attrs {
        let Some(rule) = schema.attribute_rule(tag, &attr.name) else {
            report.dropped_attributes += 1;
            continue;
        };

        let value = if attr.name == "class" {
            filter_class_tokens(&attr.value, &rule.pattern)
        } else if rule.pattern.matches(&attr.value) {
            Some(attr.value)
        } else {
            None
        };

        match value {
            Some(value) => kept.push(Attribute {
                name: attr.name,
                value,
            }),
            None => report.dropped_attributes += 1,
        }
    }
    kept
}

/// Class lists are checked token by token; the attribute disappears when no
/// token survives.
fn filter_class_tokens(value: &str, pattern: &ValuePattern) -> Option<String> {
    let tokens: Vec<&str> = value
        .split_ascii_whitespace()
        .filter(|token| pattern.matches(token))
        .collect();
    (!tokens.is_empty()).then(|| tokens.join(" "))
}

/// Unwrapping can leave text nodes side by side; keep them merged so the tree
/// matches what re-parsing the serialized output would produce.
fn push_text(output: &mut Vec<Node>, text: String) {
    if let Some(Node::Text(previous)) = output.last_mut() {
        previous.push_str(&text);
    } else {
        output.push(Node::Text(text));
    }
}
