use inkpress::application::render::{
    DEFAULT_TOC_TITLE, HeadingRecord, MarkdownRenderService, RenderError, RenderOutput,
    RenderPipelineConfig, RenderRequest, RenderService, TocLevels, render_service,
};
use pretty_assertions::assert_eq;

const ARTICLE: &str = include_str!("fixtures/article.md");

fn render(markdown: &str) -> RenderOutput {
    render_service()
        .render(&RenderRequest::new(markdown).with_label("test"))
        .expect("render succeeds")
}

fn heading(id: &str, text: &str, level: u8) -> HeadingRecord {
    HeadingRecord {
        id: id.into(),
        text: text.into(),
        level,
    }
}

/// Ids of heading elements in the order they appear in `html`.
fn heading_ids(html: &str) -> Vec<String> {
    let mut ids = Vec::new();
    let mut rest = html;
    while let Some(start) = rest.find("<h") {
        rest = &rest[start + 2..];
        let is_heading = rest.starts_with(|ch: char| ('1'..='6').contains(&ch));
        if !is_heading || !rest[1..].starts_with(" id=\"") {
            continue;
        }
        let value = &rest[" id=\"".len() + 1..];
        if let Some(end) = value.find('"') {
            ids.push(value[..end].to_string());
        }
    }
    ids
}

/// Text content of an HTML fragment produced by the serializer.
fn text_content(html: &str) -> String {
    let mut text = String::new();
    let mut in_tag = false;
    for ch in html.chars() {
        match ch {
            '<' => in_tag = true,
            '>' if in_tag => in_tag = false,
            _ if !in_tag => text.push(ch),
            _ => {}
        }
    }
    text.replace("&#10;", "\n")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&nbsp;", "\u{a0}")
        .replace("&amp;", "&")
}

#[test]
fn duplicate_headings_are_suffixed_and_h1_is_excluded() {
    let output = render("# Title\n\n## A\n\nx\n\n## A\n\ny");

    assert_eq!(output.headings, vec![heading("a", "A", 2), heading("a-1", "A", 2)]);
    assert_eq!(heading_ids(&output.html), vec!["title", "a", "a-1"]);
}

#[test]
fn script_is_removed_and_text_survives() {
    let output = render("<script>alert(1)</script>\n\nhello");

    assert!(output.html.contains("hello"), "{}", output.html);
    assert!(!output.html.contains("<script"), "{}", output.html);
}

#[test]
fn empty_input_renders_nothing() {
    assert_eq!(render(""), RenderOutput::empty());
    assert_eq!(render(" \n \t\n"), RenderOutput::empty());
}

#[test]
fn unknown_language_degrades_to_plain_code() {
    let output = render("```no-such-language\nkeep <this> & that\n```\n");

    assert_eq!(
        output.html,
        "<pre><code class=\"language-no-such-language\">keep &lt;this&gt; &amp; that\n</code></pre>\n"
    );
    assert!(!output.html.contains("syntax-"));
}

#[test]
fn fixture_produces_expected_table_of_contents() {
    let output = render(ARTICLE);

    assert_eq!(
        output.headings,
        vec![
            heading("getting-started", "Getting Started", 2),
            heading("getting-started-1", "Getting Started", 2),
            heading("tokens-spans", "Tokens & Spans", 3),
            heading("section", "🚀", 4),
        ]
    );
    assert_eq!(
        heading_ids(&output.html),
        vec![
            "building-a-tiny-parser",
            "getting-started",
            "getting-started-1",
            "tokens-spans",
            "section",
            "deep-detail",
        ]
    );
}

#[test]
fn heading_ids_are_unique() {
    let markdown = (1..=6)
        .flat_map(|level| {
            let marks = "#".repeat(level);
            [
                format!("{marks} Same\n"),
                format!("{marks} Same 1\n"),
                format!("{marks} ✨\n"),
            ]
        })
        .collect::<Vec<_>>()
        .join("\n");
    let output = render(&markdown);

    let ids = heading_ids(&output.html);
    assert_eq!(ids.len(), 18);
    let mut distinct = ids.clone();
    distinct.sort();
    distinct.dedup();
    assert_eq!(distinct.len(), ids.len(), "{ids:?}");
}

#[test]
fn rendering_is_deterministic() {
    let first = render(ARTICLE);
    let second = render(ARTICLE);
    assert_eq!(first, second);
}

#[test]
fn toc_ids_appear_once_and_in_order() {
    let output = render(ARTICLE);
    let mut cursor = 0;

    for record in &output.headings {
        let needle = format!("id=\"{}\"", record.id);
        assert_eq!(output.html.matches(&needle).count(), 1, "{needle}");

        let position = output.html.find(&needle).expect("id present");
        assert!(position >= cursor, "{} is out of order", record.id);
        cursor = position;
    }
}

#[test]
fn rendering_own_output_is_a_fixed_point() {
    let first = render(ARTICLE);
    let second = render(&first.html);

    assert_eq!(second.html, first.html);
    assert_eq!(second.headings, first.headings);
}

#[test]
fn highlighted_code_keeps_its_text() {
    let output = render(ARTICLE);
    let original = "fn main() {\n    let tokens = lex(\"1 + 2\");\n\n    // blank line above is preserved\n    println!(\"{tokens:?}\");\n}\n";

    let open = "<code class=\"language-rust\">";
    let start = output.html.find(open).expect("rust block") + open.len();
    let end = start + output.html[start..].find("</code>").expect("closing tag");
    let block = &output.html[start..end];

    assert!(block.contains("<span class=\"syntax-"), "{block}");
    assert_eq!(text_content(block), original);
    assert!(output.html.contains("<pre class=\"syntax-highlight\">"));
}

#[test]
fn raw_figures_and_gfm_constructs_survive() {
    let output = render(ARTICLE);
    let html = &output.html;

    assert!(html.contains("<figure>"), "{html}");
    assert!(html.contains("<figcaption>The pipeline at a glance</figcaption>"), "{html}");
    assert!(html.contains("loading=\"lazy\""), "{html}");
    assert!(html.contains("<del>struck</del>"), "{html}");
    assert!(html.contains("<table>"), "{html}");
    assert!(html.contains("type=\"checkbox\""), "{html}");
    assert!(html.contains("sentence<br />"), "{html}");
    assert!(html.contains("<a href=\"https://www.rust-lang.org\">"), "{html}");
}

#[test]
fn every_heading_links_to_itself() {
    let output = render(ARTICLE);
    for id in heading_ids(&output.html) {
        let link = format!("<a class=\"heading-anchor\" href=\"#{id}\">");
        assert_eq!(output.html.matches(&link).count(), 1, "{link}");
    }
}

#[test]
fn custom_levels_and_disabled_anchors() {
    let config = RenderPipelineConfig {
        toc_levels: TocLevels::new(1, 1).expect("levels"),
        autolink_heading_anchors: false,
        ..RenderPipelineConfig::default()
    };
    let service = MarkdownRenderService::new(config).expect("service");
    let output = service
        .render(&RenderRequest::new(ARTICLE))
        .expect("render succeeds");

    assert_eq!(
        output.headings,
        vec![heading("building-a-tiny-parser", "Building a Tiny Parser", 1)]
    );
    assert!(!output.html.contains("heading-anchor"));
}

#[test]
fn deeply_nested_input_fails_with_a_typed_error() {
    let markdown = format!("{}deep", "> ".repeat(400));
    let error = render_service()
        .render(&RenderRequest::new(markdown))
        .expect_err("too deep");

    assert!(matches!(error, RenderError::NestingTooDeep { .. }), "{error}");
}

#[test]
fn deeply_nested_raw_html_fails_with_a_typed_error() {
    let markdown = format!("<div>\n{}x\n", "<span>".repeat(400));
    let error = render_service()
        .render(&RenderRequest::new(markdown))
        .expect_err("too deep");

    assert!(matches!(error, RenderError::NestingTooDeep { .. }), "{error}");
}

#[test]
fn toc_widget_matches_heading_records() {
    let output = render("## One\n\n### Two\n");

    assert_eq!(
        output.toc_html(DEFAULT_TOC_TITLE),
        "<nav aria-label=\"Table of contents\" class=\"toc-container\">\
         <h2 class=\"toc-title\">Table of contents</h2>\
         <ul class=\"toc-list\">\
         <li class=\"toc-item toc-level-2\"><a href=\"#one\">One</a></li>\
         <li class=\"toc-item toc-level-3\"><a href=\"#two\">Two</a></li>\
         </ul></nav>"
    );
}

#[test]
fn unclosed_formatting_before_many_blocks_fails_with_a_typed_error() {
    let bold: String = (0..2000).map(|i| format!("<b x={i}>")).collect();
    let markdown = format!("x {bold}{}", "<p>a".repeat(8000));
    let error = render_service()
        .render(&RenderRequest::new(markdown))
        .expect_err("too many elements");

    assert!(matches!(error, RenderError::TooManyElements { .. }), "{error}");
}

#[test]
fn nested_headings_get_ids_anchors_and_toc_entries() {
    let output = render("<h2><span><h3>Inner</h3></span></h2>\n\n## Inner");

    assert_eq!(
        output.headings,
        vec![
            heading("inner", "Inner", 2),
            heading("inner-1", "Inner", 3),
            heading("inner-2", "Inner", 2),
        ]
    );
    assert_eq!(
        output.html,
        "<h2 id=\"inner\"><span><h3 id=\"inner-1\">\
         <a class=\"heading-anchor\" href=\"#inner-1\">Inner</a></h3></span></h2>\n\
         <h2 id=\"inner-2\"><a class=\"heading-anchor\" href=\"#inner-2\">Inner</a></h2>\n"
    );
}

#[test]
fn toc_title_is_escaped() {
    let output = render("## One\n");
    let toc = output.toc_html("Say \"hi\" <now>");

    assert!(
        toc.starts_with("<nav aria-label=\"Say &quot;hi&quot; &lt;now&gt;\" class=\"toc-container\">"),
        "{toc}"
    );
    assert!(
        toc.contains("<h2 class=\"toc-title\">Say \"hi\" &lt;now&gt;</h2>"),
        "{toc}"
    );
}

#[test]
fn blank_headings_get_ids_but_no_toc_entry() {
    let output = render("## Real\n\n##\n\n<h3>   </h3>\n\n### Also");

    assert_eq!(
        output.headings,
        vec![heading("real", "Real", 2), heading("also", "Also", 3)]
    );
    assert_eq!(
        heading_ids(&output.html),
        vec!["real", "section", "section-1", "also"]
    );
}

#[test]
fn unwrapped_block_does_not_leave_edge_whitespace() {
    assert_eq!(render("<center>\n<em>x</em>\n</center>").html, "<em>x</em>\n");
}

#[test]
fn footnote_ids_are_not_reused_for_headings() {
    let output = render("## Fn 1\n\nText[^1].\n\n[^1]: Note.\n");

    assert_eq!(output.headings, vec![heading("fn-1-1", "Fn 1", 2)]);
    assert_eq!(output.html.matches("id=\"fn-1\"").count(), 1, "{}", output.html);
}
