//! Table-of-contents widget built from the collected headings.

use crate::domain::tree::{Element, Node};

use super::service::serialize_element;
use super::types::{HeadingRecord, RenderOutput};

pub const DEFAULT_TOC_TITLE: &str = "Table of contents";

impl RenderOutput {
    /// Navigation markup linking to every collected heading, or an empty
    /// string when there is nothing to list. The markup is built from the
    /// same records callers receive, so links always match heading ids.
    pub fn toc_html(&self, title: &str) -> String {
        if self.headings.is_empty() {
            return String::new();
        }

        let items = self.headings.iter().map(toc_item).collect();
        let nav = Element::new("nav")
            .with_attr("aria-label", title)
            .with_attr("class", "toc-container")
            .with_children(vec![
                Element::new("h2")
                    .with_attr("class", "toc-title")
                    .with_children(vec![Node::text(title)])
                    .into(),
                Element::new("ul")
                    .with_attr("class", "toc-list")
                    .with_children(items)
                    .into(),
            ]);
        serialize_element(&nav)
    }
}

fn toc_item(heading: &HeadingRecord) -> Node {
    let link = Element::new("a")
        .with_attr("href", format!("#{}", heading.id))
        .with_children(vec![Node::text(heading.text.as_str())]);
    Element::new("li")
        .with_attr("class", format!("toc-item toc-level-{}", heading.level))
        .with_children(vec![link.into()])
        .into()
}
