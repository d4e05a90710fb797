//! Heading passes: id assignment, table-of-contents collection, and
//! self-link injection. All three walk headings in document order.

use crate::{
    application::render::types::HeadingRecord,
    domain::{
        slug::AnchorSlugger,
        tree::{Document, Element, Node},
    },
};

/// Inclusive range of heading levels collected into the table of contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TocLevels {
    min: u8,
    max: u8,
}

impl TocLevels {
    /// Returns `None` unless `1 <= min <= max <= 6`.
    pub fn new(min: u8, max: u8) -> Option<Self> {
        (1 <= min && min <= max && max <= 6).then_some(Self { min, max })
    }

    pub fn min(&self) -> u8 {
        self.min
    }

    pub fn max(&self) -> u8 {
        self.max
    }

    pub fn contains(&self, level: u8) -> bool {
        (self.min..=self.max).contains(&level)
    }
}

impl Default for TocLevels {
    fn default() -> Self {
        Self { min: 2, max: 4 }
    }
}

/// Give every heading a unique `id`. Existing ids are kept unless an earlier
/// heading already claimed them; generated ids come from one counter shared
/// by all six levels. Ids on other elements, such as footnote targets, are
/// never handed to a heading.
pub(crate) fn assign_heading_ids(mut document: Document) -> Document {
    let mut slugger = AnchorSlugger::new();
    reserve_element_ids(&document.children, &mut slugger);
    for_each_heading(&mut document.children, &mut |heading| {
        let existing = heading
            .attr("id")
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(str::to_string);

        let id = match existing {
            Some(id) if slugger.reserve(&id) => id,
            _ => slugger.anchor_for(&heading.text_content()),
        };
        heading.set_attr("id", id);
    });
    document
}

fn reserve_element_ids(nodes: &[Node], slugger: &mut AnchorSlugger) {
    for node in nodes {
        let Node::Element(element) = node else {
            continue;
        };
        if element.heading_level().is_none()
            && let Some(id) = element.attr("id").map(str::trim)
            && !id.is_empty()
        {
            slugger.reserve(id);
        }
        reserve_element_ids(&element.children, slugger);
    }
}

/// Record `(id, text, level)` for headings inside `levels` whose trimmed text
/// is not empty, in document order.
pub(crate) fn collect_headings(document: &Document, levels: TocLevels) -> Vec<HeadingRecord> {
    let mut records = Vec::new();
    collect_from(&document.children, levels, &mut records);
    records
}

fn collect_from(nodes: &[Node], levels: TocLevels, records: &mut Vec<HeadingRecord>) {
    for node in nodes {
        let Node::Element(element) = node else {
            continue;
        };

        if let Some(level) = element.heading_level()
            && levels.contains(level)
            && let Some(id) = element.attr("id")
        {
            let text = element.text_content().trim().to_string();
            if !text.is_empty() {
                records.push(HeadingRecord {
                    id: id.to_string(),
                    text,
                    level,
                });
            }
        }
        collect_from(&element.children, levels, records);
    }
}

/// Wrap the content of every heading in `<a class="{class}" href="#{id}">`.
/// Headings that already carry such a link are refreshed instead of wrapped
/// twice; links nested inside a heading are unwrapped first because anchors
/// cannot nest.
pub(crate) fn inject_heading_anchors(mut document: Document, class: &str) -> Document {
    inject_into(&mut document.children, class);
    document
}

fn inject_into(nodes: &mut [Node], class: &str) {
    for node in nodes.iter_mut() {
        let Node::Element(element) = node else {
            continue;
        };
        if element.heading_level().is_some() {
            anchor_heading(element, class);
        } else {
            inject_into(&mut element.children, class);
        }
    }
}

fn anchor_heading(heading: &mut Element, class: &str) {
    let Some(id) = heading.attr("id").map(str::to_string) else {
        return;
    };
    let href = format!("#{id}");

    if let [Node::Element(existing)] = heading.children.as_mut_slice()
        && existing.name == "a"
        && existing.has_class(class)
        && !contains_heading(&existing.children)
    {
        existing.set_attr("href", href);
        let children = std::mem::take(&mut existing.children);
        existing.children = unwrap_links(children);
        return;
    }

    let children = std::mem::take(&mut heading.children);
    if !contains_heading(&children) {
        heading.children = vec![self_link(class, &href, children)];
        return;
    }

    // A nested heading gets its own link, so only the runs of content
    // around it link to the outer heading.
    let mut output = Vec::with_capacity(children.len());
    let mut run = Vec::new();
    for mut child in children {
        if !node_contains_heading(&child) {
            run.push(child);
            continue;
        }
        flush_run(&mut output, &mut run, class, &href);
        inject_into(std::slice::from_mut(&mut child), class);
        output.push(child);
    }
    flush_run(&mut output, &mut run, class, &href);
    heading.children = output;
}

fn flush_run(output: &mut Vec<Node>, run: &mut Vec<Node>, class: &str, href: &str) {
    let content = std::mem::take(run);
    let blank = content
        .iter()
        .all(|node| matches!(node, Node::Text(text) if text.trim().is_empty()));
    if blank {
        output.extend(content);
    } else {
        output.push(self_link(class, href, content));
    }
}

fn self_link(class: &str, href: &str, content: Vec<Node>) -> Node {
    Element::new("a")
        .with_attr("class", class)
        .with_attr("href", href)
        .with_children(unwrap_links(content))
        .into()
}

fn contains_heading(nodes: &[Node]) -> bool {
    nodes.iter().any(node_contains_heading)
}

fn node_contains_heading(node: &Node) -> bool {
    match node {
        Node::Element(element) => {
            element.heading_level().is_some() || contains_heading(&element.children)
        }
        Node::Text(_) => false,
    }
}

fn unwrap_links(nodes: Vec<Node>) -> Vec<Node> {
    let mut output = Vec::with_capacity(nodes.len());
    for node in nodes {
        match node {
            Node::Element(element) if element.name == "a" => {
                for child in unwrap_links(element.children) {
                    push_merged(&mut output, child);
                }
            }
            Node::Element(mut element) => {
                element.children = unwrap_links(element.children);
                output.push(Node::Element(element));
            }
            text @ Node::Text(_) => push_merged(&mut output, text),
        }
    }
    output
}

fn push_merged(output: &mut Vec<Node>, node: Node) {
    match (output.last_mut(), node) {
        (Some(Node::Text(previous)), Node::Text(text)) => previous.push_str(&text),
        (_, node) => output.push(node),
    }
}

/// Visit headings in document order, outer headings before the headings
/// nested inside them.
fn for_each_heading<F>(nodes: &mut [Node], visit: &mut F)
where
    F: FnMut(&mut Element),
{
    for node in nodes.iter_mut() {
        let Node::Element(element) = node else {
            continue;
        };
        if element.heading_level().is_some() {
            visit(element);
        }
        for_each_heading(&mut element.children, visit);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::render::service::{lower::parse_html_fragment, serialize::serialize};

    fn document(html: &str) -> Document {
        parse_html_fragment(html, 64).expect("parse")
    }

    fn ids(document: &Document) -> Vec<String> {
        let mut ids = Vec::new();
        let mut document = document.clone();
        for_each_heading(&mut document.children, &mut |heading| {
            ids.push(heading.attr("id").unwrap_or_default().to_string());
        });
        ids
    }

    #[test]
    fn duplicate_headings_receive_incrementing_suffixes() {
        let doc = assign_heading_ids(document("<h1>Title</h1><h2>A</h2><h2>A</h2><h3>A</h3>"));
        assert_eq!(ids(&doc), vec!["title", "a", "a-1", "a-2"]);
    }

    #[test]
    fn existing_ids_are_kept_and_reserved() {
        let doc = assign_heading_ids(document(
            "<h2 id=\"intro\">Custom</h2><h2>Intro</h2><h2 id=\"intro\">Again</h2>",
        ));
        assert_eq!(ids(&doc), vec!["intro", "intro-1", "again"]);
    }

    #[test]
    fn ids_on_other_elements_are_not_reused() {
        let doc = assign_heading_ids(document(
            "<h2>Fn 1</h2><p>x</p><li id=\"fn-1\">Note</li><h2 id=\"fn-1\">Also</h2>",
        ));
        assert_eq!(ids(&doc), vec!["fn-1-1", "also"]);
    }

    #[test]
    fn symbol_only_headings_fall_back_to_placeholder() {
        let doc = assign_heading_ids(document("<h2>🚀</h2><h2>!!</h2>"));
        assert_eq!(ids(&doc), vec!["section", "section-1"]);
    }

    #[test]
    fn collector_filters_levels_and_empty_text() {
        let doc = assign_heading_ids(document(
            "<h1>Top</h1><h2> Two </h2><h3><em>Three</em></h3><h4>   </h4><h5>Five</h5>",
        ));
        let records = collect_headings(&doc, TocLevels::default());

        assert_eq!(
            records,
            vec![
                HeadingRecord {
                    id: "two".into(),
                    text: "Two".into(),
                    level: 2
                },
                HeadingRecord {
                    id: "three".into(),
                    text: "Three".into(),
                    level: 3
                },
            ]
        );
        // The empty h4 keeps its id in the markup.
        assert_eq!(ids(&doc)[3], "section");
    }

    #[test]
    fn collector_respects_custom_levels() {
        let doc = assign_heading_ids(document("<h1>One</h1><h2>Two</h2><h6>Six</h6>"));
        let levels = TocLevels::new(1, 6).expect("levels");
        let records = collect_headings(&doc, levels);
        let levels: Vec<u8> = records.iter().map(|record| record.level).collect();
        assert_eq!(levels, vec![1, 2, 6]);
    }

    #[test]
    fn toc_levels_validate_bounds() {
        assert!(TocLevels::new(0, 3).is_none());
        assert!(TocLevels::new(4, 3).is_none());
        assert!(TocLevels::new(2, 7).is_none());
        assert!(TocLevels::new(3, 3).is_some());
    }

    #[test]
    fn anchors_wrap_heading_content() {
        let doc = assign_heading_ids(document("<h2>Hello <em>there</em></h2>"));
        let doc = inject_heading_anchors(doc, "heading-anchor");
        assert_eq!(
            serialize(&doc),
            "<h2 id=\"hello-there\"><a class=\"heading-anchor\" href=\"#hello-there\">Hello <em>there</em></a></h2>"
        );
    }

    #[test]
    fn anchor_injection_is_idempotent() {
        let doc = assign_heading_ids(document("<h3>Again</h3>"));
        let once = inject_heading_anchors(doc, "heading-anchor");
        let twice = inject_heading_anchors(once.clone(), "heading-anchor");
        assert_eq!(once, twice);
    }

    #[test]
    fn nested_headings_get_ids_records_and_their_own_links() {
        let doc = assign_heading_ids(document("<h2>Outer <span><h3>Inner</h3></span> tail</h2>"));
        assert_eq!(ids(&doc), vec!["outer-inner-tail", "inner"]);

        let records = collect_headings(&doc, TocLevels::default());
        let levels: Vec<_> = records
            .iter()
            .map(|record| (record.id.as_str(), record.level))
            .collect();
        assert_eq!(levels, vec![("outer-inner-tail", 2), ("inner", 3)]);

        let once = inject_heading_anchors(doc, "heading-anchor");
        assert_eq!(
            serialize(&once),
            "<h2 id=\"outer-inner-tail\">\
             <a class=\"heading-anchor\" href=\"#outer-inner-tail\">Outer </a>\
             <span><h3 id=\"inner\"><a class=\"heading-anchor\" href=\"#inner\">Inner</a></h3></span>\
             <a class=\"heading-anchor\" href=\"#outer-inner-tail\"> tail</a></h2>"
        );

        let twice = inject_heading_anchors(once.clone(), "heading-anchor");
        assert_eq!(once, twice);
    }

    #[test]
    fn nested_links_are_unwrapped_inside_headings() {
        let doc = assign_heading_ids(document("<h2>See <a href=\"/x\">docs</a></h2>"));
        let doc = inject_heading_anchors(doc, "heading-anchor");
        assert_eq!(
            serialize(&doc),
            "<h2 id=\"see-docs\"><a class=\"heading-anchor\" href=\"#see-docs\">See docs</a></h2>"
        );
    }
}
