//! Lowering from comrak's markdown AST to the render-level [`Document`].
//!
//! Comrak's HTML formatter turns markdown constructs into markup while
//! passing raw HTML fragments through untouched. The resulting string is then
//! parsed with html5ever's fragment parser, the same algorithm a browser uses
//! for `innerHTML`, so authored HTML ends up as ordinary element and text
//! nodes shaped exactly as a browser would see them.

use comrak::{format_html, nodes::AstNode, options::Options};
use html5ever::{
    LocalName, Namespace, ParseOpts, QualName, parse_fragment, tendril::TendrilSink,
};
use markup5ever_rcdom::{Handle, NodeData, RcDom};

use crate::{
    application::render::types::RenderError,
    domain::tree::{Attribute, Document, Element, Node},
};

const HTML_NAMESPACE: &str = "http://www.w3.org/1999/xhtml";

/// Elements the HTML parser keeps on its list of active formatting elements
/// and re-opens inside every new block until they are closed.
const FORMATTING_ELEMENTS: &[&str] = &[
    "a", "b", "big", "code", "em", "font", "i", "nobr", "s", "small", "strike", "strong", "tt",
    "u",
];

/// Lower a parsed markdown tree into a [`Document`].
pub(crate) fn lower<'a>(
    root: &'a AstNode<'a>,
    options: &Options<'static>,
    max_depth: usize,
    max_elements: usize,
) -> Result<Document, RenderError> {
    let mut html = String::new();
    format_html(root, options, &mut html).map_err(|err| RenderError::Format {
        message: err.to_string(),
    })?;
    check_element_budget(&html, max_elements)?;
    parse_html_fragment(&html, max_depth)
}

/// Upper-bound the number of elements html5ever will create for `html` and
/// fail before parsing when it exceeds `limit`.
///
/// Every start tag creates one element. On top of that, each tag may make
/// the tree builder re-open every formatting element that is still unclosed,
/// so unclosed `<b>`s followed by many `<p>`s grow the tree quadratically.
/// Every `<` is inspected, including ones inside raw text, and end tags only
/// release the budget of a formatting element they actually close. The
/// estimate therefore bounds the parser's work up to a constant factor.
pub(crate) fn check_element_budget(html: &str, limit: usize) -> Result<(), RenderError> {
    let mut unclosed = [0usize; FORMATTING_ELEMENTS.len()];
    let mut open_formatting = 0usize;
    let mut estimate = 0usize;

    let bytes = html.as_bytes();
    for (index, _) in html.match_indices('<') {
        let rest = &bytes[index + 1..];
        let (closing, rest) = match rest.split_first() {
            Some((b'/', tail)) => (true, tail),
            _ => (false, rest),
        };
        let name_len = rest
            .iter()
            .take_while(|byte| byte.is_ascii_alphanumeric())
            .count();
        if name_len == 0 || !rest[0].is_ascii_alphabetic() {
            continue;
        }

        let name = &rest[..name_len];
        let slot = FORMATTING_ELEMENTS
            .iter()
            .position(|tag| name.eq_ignore_ascii_case(tag.as_bytes()));

        if closing {
            if let Some(slot) = slot
                && unclosed[slot] > 0
            {
                unclosed[slot] -= 1;
                open_formatting -= 1;
            }
            estimate = estimate.saturating_add(open_formatting);
        } else {
            estimate = estimate.saturating_add(open_formatting + 1);
            if let Some(slot) = slot {
                unclosed[slot] += 1;
                open_formatting += 1;
            }
        }

        if estimate > limit {
            return Err(RenderError::TooManyElements { estimate, limit });
        }
    }
    Ok(())
}

/// Parse an HTML fragment in `<body>` context into a [`Document`].
pub(crate) fn parse_html_fragment(html: &str, max_depth: usize) -> Result<Document, RenderError> {
    if html.trim().is_empty() {
        return Ok(Document::default());
    }

    let context = QualName::new(
        None,
        Namespace::from(HTML_NAMESPACE),
        LocalName::from("body"),
    );
    let dom = parse_fragment(RcDom::default(), ParseOpts::default(), context, Vec::new())
        .one(html);

    // The fragment parser wraps its output in a synthetic <html> element.
    let container = dom
        .document
        .children
        .borrow()
        .iter()
        .find(|child| matches!(child.data, NodeData::Element { .. }))
        .cloned();

    let children = match container {
        Some(container) => convert_children(&container, 1, max_depth)?,
        None => Vec::new(),
    };
    Ok(Document::new(children))
}

fn convert_children(
    handle: &Handle,
    depth: usize,
    max_depth: usize,
) -> Result<Vec<Node>, RenderError> {
    let children = handle.children.borrow();
    let mut nodes = Vec::with_capacity(children.len());

    for child in children.iter() {
        match &child.data {
            NodeData::Text { contents } => {
                let text = contents.borrow();
                if let Some(Node::Text(previous)) = nodes.last_mut() {
                    previous.push_str(&text);
                } else {
                    nodes.push(Node::text(text.to_string()));
                }
            }
            NodeData::Element { name, attrs, .. } => {
                if depth > max_depth {
                    return Err(RenderError::NestingTooDeep {
                        depth,
                        limit: max_depth,
                    });
                }

                let tag = if &*name.ns == HTML_NAMESPACE {
                    name.local.to_string()
                } else {
                    // Foreign content (SVG, MathML) keeps its root name so the
                    // sanitizer can recognise and drop it.
                    format!("{}", name.local).to_ascii_lowercase()
                };

                let attrs = attrs
                    .borrow()
                    .iter()
                    .map(|attr| {
                        let name = match &attr.name.prefix {
                            Some(prefix) => format!("{prefix}:{}", attr.name.local),
                            None => attr.name.local.to_string(),
                        };
                        Attribute::new(name, attr.value.to_string())
                    })
                    .collect();

                let children = convert_children(child, depth + 1, max_depth)?;
                nodes.push(Node::Element(Element {
                    name: tag,
                    attrs,
                    children,
                }));
            }
            // Comments, doctypes and processing instructions carry no content.
            _ => {}
        }
    }

    Ok(nodes)
}
