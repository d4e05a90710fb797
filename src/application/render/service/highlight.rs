//! Syntax highlighting for fenced code blocks.
//!
//! Blocks are recognised as `<pre><code class="language-…">`. The code text is
//! tokenised with syntect and rebuilt as nested `<span>` elements whose
//! classes are the scope atoms, so the text content is unchanged and only
//! markup is added.

use syntect::{
    html::ClassStyle,
    parsing::{
        BasicScopeStackOp, ParseState, Scope, ScopeStack, SyntaxReference, SyntaxSet,
    },
    util::LinesWithEndings,
};
use tracing::{debug, warn};

use crate::domain::tree::{Document, Element, Node};

const LANGUAGE_PREFIX: &str = "language-";
/// Class added to the `<pre>` of every highlighted block.
pub(crate) const HIGHLIGHTED_BLOCK_CLASS: &str = "syntax-highlight";

pub(crate) struct CodeHighlighter {
    syntax_set: SyntaxSet,
    class_style: ClassStyle,
}

impl CodeHighlighter {
    pub(crate) fn new(class_style: ClassStyle) -> Self {
        Self {
            syntax_set: SyntaxSet::load_defaults_newlines(),
            class_style,
        }
    }

    /// Highlight every fenced block in the document. Blocks in unknown
    /// languages are left untouched.
    pub(crate) fn highlight(&self, mut document: Document, label: &str) -> Document {
        self.visit(&mut document.children, label);
        document
    }

    fn visit(&self, nodes: &mut [Node], label: &str) {
        for node in nodes.iter_mut() {
            let Node::Element(element) = node else {
                continue;
            };
            if element.name == "pre" {
                self.highlight_block(element, label);
            } else {
                self.visit(&mut element.children, label);
            }
        }
    }

    fn highlight_block(&self, pre: &mut Element, label: &str) {
        let [Node::Element(code)] = pre.children.as_mut_slice() else {
            return;
        };
        if code.name != "code" {
            return;
        }
        let Some(language) = code_language(code) else {
            return;
        };

        let Some(syntax) = self.find_syntax(&language) else {
            debug!(
                target = "application::render::highlight",
                document = label,
                language = %language,
                "No syntax definition; leaving block unhighlighted"
            );
            return;
        };

        let source = code.text_content();
        match self.tokenize(&source, syntax) {
            Ok(children) => {
                code.children = children;
                pre.add_class(HIGHLIGHTED_BLOCK_CLASS);
            }
            Err(message) => {
                warn!(
                    target = "application::render::highlight",
                    document = label,
                    language = %language,
                    error = %message,
                    "Syntax highlighting failed; leaving block unhighlighted"
                );
            }
        }
    }

    fn find_syntax(&self, token: &str) -> Option<&SyntaxReference> {
        let lowercase = token.to_ascii_lowercase();
        self.syntax_set
            .find_syntax_by_token(&lowercase)
            .or_else(|| self.syntax_set.find_syntax_by_name(token))
            .or_else(|| self.syntax_set.find_syntax_by_extension(&lowercase))
    }

    /// Split `source` into nested spans following syntect's scope stack.
    fn tokenize(&self, source: &str, syntax: &SyntaxReference) -> Result<Vec<Node>, String> {
        let mut state = ParseState::new(syntax);
        let mut scopes = ScopeStack::new();
        let mut builder = SpanBuilder::new(self.class_prefix());

        for line in LinesWithEndings::from(source) {
            let ops = state
                .parse_line(line, &self.syntax_set)
                .map_err(|err| err.to_string())?;

            let mut cursor = 0;
            for (index, op) in ops {
                let index = index.min(line.len());
                if index > cursor {
                    builder.text(&line[cursor..index]);
                    cursor = index;
                }
                scopes
                    .apply_with_hook(&op, |basic, _| match basic {
                        BasicScopeStackOp::Push(scope) => builder.open(scope),
                        BasicScopeStackOp::Pop => builder.close(),
                    })
                    .map_err(|err| format!("{err:?}"))?;
            }
            if cursor < line.len() {
                builder.text(&line[cursor..]);
            }
        }

        Ok(builder.finish())
    }

    fn class_prefix(&self) -> &'static str {
        if let ClassStyle::SpacedPrefixed { prefix } = self.class_style {
            prefix
        } else {
            ""
        }
    }
}

/// Language hint from the first `language-*` class token.
fn code_language(code: &Element) -> Option<String> {
    code.attr("class")?
        .split_ascii_whitespace()
        .find_map(|token| token.strip_prefix(LANGUAGE_PREFIX))
        .filter(|language| !language.is_empty())
        .map(str::to_string)
}

/// Incrementally builds nested spans. `frames[0]` collects top-level nodes;
/// each further frame is an open span.
struct SpanBuilder {
    prefix: &'static str,
    frames: Vec<Element>,
}

impl SpanBuilder {
    fn new(prefix: &'static str) -> Self {
        Self {
            prefix,
            frames: vec![Element::new("code")],
        }
    }

    fn text(&mut self, text: &str) {
        let Some(frame) = self.frames.last_mut() else {
            return;
        };
        if let Some(Node::Text(previous)) = frame.children.last_mut() {
            previous.push_str(text);
        } else {
            frame.children.push(Node::text(text));
        }
    }

    fn open(&mut self, scope: Scope) {
        let classes = scope
            .build_string()
            .split('.')
            .map(|atom| format!("{}{atom}", self.prefix))
            .collect::<Vec<_>>()
            .join(" ");
        self.frames
            .push(Element::new("span").with_attr("class", classes));
    }

    fn close(&mut self) {
        if self.frames.len() <= 1 {
            return;
        }
        if let Some(span) = self.frames.pop()
            && !span.children.is_empty()
            && let Some(parent) = self.frames.last_mut()
        {
            parent.children.push(span.into());
        }
    }

    fn finish(mut self) -> Vec<Node> {
        while self.frames.len() > 1 {
            self.close();
        }
        self.frames
            .pop()
            .map(|root| root.children)
            .unwrap_or_default()
    }
}
