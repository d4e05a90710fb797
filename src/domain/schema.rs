//! Allow-list schema consumed by the sanitizer.
//!
//! The schema is data only: a map from tag name to the attributes permitted
//! on it, an optional value restriction per attribute, and a wildcard entry
//! whose attributes apply to every allowed tag. It is built once, validated,
//! and then shared read-only across renders.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::{ParseError, Url};

/// Key of the entry whose attributes apply to every allowed tag.
pub const WILDCARD: &str = "*";

/// Tags whose whole subtree is discarded instead of being unwrapped.
pub const DROP_SUBTREE_TAGS: &[&str] = &[
    "applet", "base", "embed", "frame", "frameset", "head", "iframe", "link", "math", "meta",
    "noembed", "noframes", "noscript", "object", "param", "plaintext", "script", "select",
    "style", "svg", "template", "textarea", "title", "xmp",
];

const HREF_SCHEMES: &[&str] = &["http", "https", "mailto", "tel"];
const SRC_SCHEMES: &[&str] = &["http", "https"];
const CITE_SCHEMES: &[&str] = &["http", "https"];

/// Attributes whose value is a URL. Overrides naming one of these always get
/// the `href` scheme check, whatever value rule they ask for.
const URL_ATTRIBUTES: &[&str] = &[
    "action",
    "background",
    "cite",
    "formaction",
    "href",
    "longdesc",
    "poster",
    "src",
    "xlink:href",
];

/// Restriction applied to an attribute's value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ValuePattern {
    /// Any value is accepted.
    Any,
    /// The value must equal one of the listed strings (ASCII case-insensitive).
    OneOf { values: BTreeSet<String> },
    /// The value must start with one of the listed prefixes, e.g. `language-`.
    Prefix { prefixes: Vec<String> },
    /// The value must be a relative URL or an absolute URL with a listed scheme.
    Url { schemes: BTreeSet<String> },
}

impl ValuePattern {
    pub fn one_of(values: &[&str]) -> Self {
        ValuePattern::OneOf {
            values: values.iter().map(|value| value.to_string()).collect(),
        }
    }

    pub fn prefix(prefixes: &[&str]) -> Self {
        ValuePattern::Prefix {
            prefixes: prefixes.iter().map(|prefix| prefix.to_string()).collect(),
        }
    }

    pub fn url(schemes: &[&str]) -> Self {
        ValuePattern::Url {
            schemes: schemes.iter().map(|scheme| scheme.to_string()).collect(),
        }
    }

    /// Check a single value (or, for class lists, a single token).
    pub fn matches(&self, value: &str) -> bool {
        match self {
            ValuePattern::Any => true,
            ValuePattern::OneOf { values } => values
                .iter()
                .any(|allowed| allowed.eq_ignore_ascii_case(value.trim())),
            ValuePattern::Prefix { prefixes } => prefixes
                .iter()
                .any(|prefix| value.starts_with(prefix.as_str()) && value.len() > prefix.len()),
            ValuePattern::Url { schemes } => url_is_allowed(value, schemes),
        }
    }
}

fn url_is_allowed(value: &str, schemes: &BTreeSet<String>) -> bool {
    match Url::parse(value) {
        Ok(url) => schemes.contains(url.scheme()),
        Err(ParseError::RelativeUrlWithoutBase) => true,
        Err(_) => false,
    }
}

/// Permission for one attribute on one tag (or on the wildcard entry).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttributeRule {
    pub pattern: ValuePattern,
}

impl AttributeRule {
    pub fn any() -> Self {
        Self {
            pattern: ValuePattern::Any,
        }
    }

    pub fn with(pattern: ValuePattern) -> Self {
        Self { pattern }
    }
}

/// Allowed attributes of a single tag, plus attributes forced onto every
/// kept element of that tag.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TagRule {
    pub attributes: BTreeMap<String, AttributeRule>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub required: BTreeMap<String, String>,
}

/// Immutable allow-list configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SanitizationSchema {
    tags: BTreeMap<String, TagRule>,
}

/// Override entry merged onto the base schema, typically read from settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct SchemaOverride {
    pub tag: String,
    #[serde(default)]
    pub attributes: Vec<AttributeOverride>,
}

/// Attribute permission inside a [`SchemaOverride`]. A bare string allows any
/// value; the table form restricts values to an exact set or to prefixes.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum AttributeOverride {
    Name(String),
    Rule {
        name: String,
        #[serde(default)]
        one_of: Vec<String>,
        #[serde(default)]
        prefixes: Vec<String>,
    },
}

impl AttributeOverride {
    fn name(&self) -> &str {
        match self {
            AttributeOverride::Name(name) | AttributeOverride::Rule { name, .. } => name,
        }
    }

    fn to_rule(&self) -> AttributeRule {
        match self {
            AttributeOverride::Name(_) => AttributeRule::any(),
            AttributeOverride::Rule {
                one_of, prefixes, ..
            } => {
                if !one_of.is_empty() {
                    AttributeRule::with(ValuePattern::OneOf {
                        values: one_of.iter().cloned().collect(),
                    })
                } else if !prefixes.is_empty() {
                    AttributeRule::with(ValuePattern::Prefix {
                        prefixes: prefixes.clone(),
                    })
                } else {
                    AttributeRule::any()
                }
            }
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SchemaError {
    #[error("tag `{tag}` is always removed and cannot be allowed")]
    ForbiddenTag { tag: String },
    #[error("`{tag}` is not a valid tag name")]
    InvalidTagName { tag: String },
    #[error("attribute `{attribute}` on `{tag}` cannot be allowed")]
    ForbiddenAttribute { tag: String, attribute: String },
    #[error("`{attribute}` is not a valid attribute name")]
    InvalidAttributeName { attribute: String },
}

impl Default for SanitizationSchema {
    fn default() -> Self {
        Self::base()
    }
}

impl SanitizationSchema {
    /// Schema with no tags at all; every element is unwrapped or dropped.
    pub fn empty() -> Self {
        Self {
            tags: BTreeMap::new(),
        }
    }

    /// The default allow-list for authored articles: GitHub-flavoured
    /// Markdown output plus figures, lazy image hints, and footnotes.
    pub fn base() -> Self {
        let mut schema = Self::empty();

        schema.allow_tags(&[
            "a", "abbr", "b", "bdo", "blockquote", "br", "caption", "cite", "code", "dd", "del",
            "details", "dfn", "div", "dl", "dt", "em", "figcaption", "figure", "h1", "h2", "h3",
            "h4", "h5", "h6", "hr", "i", "img", "input", "ins", "kbd", "li", "mark", "ol", "p",
            "pre", "q", "rp", "rt", "ruby", "s", "samp", "section", "small", "span", "strike",
            "strong", "sub", "summary", "sup", "table", "tbody", "td", "tfoot", "th", "thead",
            "time", "tr", "tt", "u", "ul", "var", "wbr",
        ]);

        schema.allow_attribute(WILDCARD, "class", ValuePattern::Any);
        schema.allow_attribute(WILDCARD, "title", ValuePattern::Any);
        schema.allow_attribute(WILDCARD, "lang", ValuePattern::Any);
        schema.allow_attribute(WILDCARD, "dir", ValuePattern::one_of(&["ltr", "rtl", "auto"]));
        schema.allow_attribute(WILDCARD, "aria-label", ValuePattern::Any);
        schema.allow_attribute(WILDCARD, "aria-hidden", ValuePattern::one_of(&["true", "false"]));

        schema.allow_attribute("a", "href", ValuePattern::url(HREF_SCHEMES));
        schema.allow_attribute("a", "target", ValuePattern::Any);
        schema.allow_attribute("a", "rel", ValuePattern::Any);
        schema.allow_attribute("a", "id", ValuePattern::prefix(&["fnref-"]));
        schema.allow_attribute("a", "data-footnote-ref", ValuePattern::Any);
        schema.allow_attribute("a", "data-footnote-backref", ValuePattern::Any);
        schema.allow_attribute("a", "data-footnote-backref-idx", ValuePattern::Any);

        schema.allow_attribute("img", "src", ValuePattern::url(SRC_SCHEMES));
        schema.allow_attribute("img", "longdesc", ValuePattern::url(SRC_SCHEMES));
        schema.allow_attribute("img", "alt", ValuePattern::Any);
        schema.allow_attribute("img", "width", ValuePattern::Any);
        schema.allow_attribute("img", "height", ValuePattern::Any);
        schema.allow_attribute("img", "loading", ValuePattern::one_of(&["lazy", "eager"]));
        schema.allow_attribute(
            "img",
            "decoding",
            ValuePattern::one_of(&["sync", "async", "auto"]),
        );

        schema.allow_attribute("code", "class", ValuePattern::prefix(&["language-"]));

        schema.allow_attribute("input", "type", ValuePattern::one_of(&["checkbox"]));
        schema.allow_attribute("input", "checked", ValuePattern::Any);
        schema.allow_attribute("input", "disabled", ValuePattern::Any);
        schema.require_attribute("input", "type", "checkbox");
        schema.require_attribute("input", "disabled", "");

        for cell in ["th", "td"] {
            schema.allow_attribute(
                cell,
                "align",
                ValuePattern::one_of(&["left", "center", "right", "justify"]),
            );
            schema.allow_attribute(cell, "colspan", ValuePattern::Any);
            schema.allow_attribute(cell, "rowspan", ValuePattern::Any);
        }
        schema.allow_attribute(
            "th",
            "scope",
            ValuePattern::one_of(&["row", "col", "rowgroup", "colgroup"]),
        );

        schema.allow_attribute("ol", "start", ValuePattern::Any);
        schema.allow_attribute("li", "id", ValuePattern::prefix(&["fn-"]));
        schema.allow_attribute("section", "data-footnotes", ValuePattern::Any);
        schema.allow_attribute("time", "datetime", ValuePattern::Any);
        schema.allow_attribute("details", "open", ValuePattern::Any);

        for quoted in ["blockquote", "q", "del", "ins"] {
            schema.allow_attribute(quoted, "cite", ValuePattern::url(CITE_SCHEMES));
        }

        for heading in ["h1", "h2", "h3", "h4", "h5", "h6"] {
            schema.allow_attribute(heading, "id", ValuePattern::Any);
        }

        schema
    }

    /// Merge overrides onto this schema, rejecting entries that would open a
    /// script-execution path.
    pub fn with_overrides(mut self, overrides: &[SchemaOverride]) -> Result<Self, SchemaError> {
        for entry in overrides {
            let tag = entry.tag.trim().to_ascii_lowercase();
            validate_tag(&tag)?;

            self.tags.entry(tag.clone()).or_default();
            for attribute in &entry.attributes {
                let name = attribute.name().trim().to_ascii_lowercase();
                validate_attribute(&tag, &name)?;
                let pattern = if URL_ATTRIBUTES.contains(&name.as_str()) {
                    ValuePattern::url(HREF_SCHEMES)
                } else {
                    attribute.to_rule().pattern
                };
                self.allow_attribute(&tag, &name, pattern);
            }
        }
        Ok(self)
    }

    pub fn allows_tag(&self, tag: &str) -> bool {
        tag != WILDCARD && self.tags.contains_key(tag)
    }

    /// Rule governing `attribute` on `tag`. A tag-specific rule wins over the
    /// wildcard rule of the same name.
    pub fn attribute_rule(&self, tag: &str, attribute: &str) -> Option<&AttributeRule> {
        self.tags
            .get(tag)
            .and_then(|rule| rule.attributes.get(attribute))
            .or_else(|| {
                self.tags
                    .get(WILDCARD)
                    .and_then(|rule| rule.attributes.get(attribute))
            })
    }

    /// Attributes the sanitizer sets on every kept `tag`, in name order.
    pub fn required_attributes(&self, tag: &str) -> impl Iterator<Item = (&str, &str)> + use<'_> {
        self.tags
            .get(tag)
            .into_iter()
            .flat_map(|rule| rule.required.iter())
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }

    fn allow_tags(&mut self, tags: &[&str]) {
        for tag in tags {
            self.tags.entry((*tag).to_string()).or_default();
        }
    }

    fn allow_attribute(&mut self, tag: &str, attribute: &str, pattern: ValuePattern) {
        self.tags
            .entry(tag.to_string())
            .or_default()
            .attributes
            .insert(attribute.to_string(), AttributeRule::with(pattern));
    }

    fn require_attribute(&mut self, tag: &str, attribute: &str, value: &str) {
        self.tags
            .entry(tag.to_string())
            .or_default()
            .required
            .insert(attribute.to_string(), value.to_string());
    }
}

pub fn is_drop_subtree_tag(tag: &str) -> bool {
    DROP_SUBTREE_TAGS.contains(&tag)
}

fn validate_tag(tag: &str) -> Result<(), SchemaError> {
    if tag == WILDCARD {
        return Ok(());
    }
    if tag.is_empty()
        || !tag.starts_with(|ch: char| ch.is_ascii_alphabetic())
        || !tag.chars().all(|ch| ch.is_ascii_alphanumeric() || ch == '-')
    {
        return Err(SchemaError::InvalidTagName {
            tag: tag.to_string(),
        });
    }
    if is_drop_subtree_tag(tag) {
        return Err(SchemaError::ForbiddenTag {
            tag: tag.to_string(),
        });
    }
    Ok(())
}

fn validate_attribute(tag: &str, attribute: &str) -> Result<(), SchemaError> {
    let valid_start = attribute.starts_with(|ch: char| ch.is_ascii_alphabetic());
    let valid_rest = attribute
        .chars()
        .all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_' | ':' | '.'));
    if !valid_start || !valid_rest {
        return Err(SchemaError::InvalidAttributeName {
            attribute: attribute.to_string(),
        });
    }
    if attribute.starts_with("on") || matches!(attribute, "style" | "srcdoc" | "srcset") {
        return Err(SchemaError::ForbiddenAttribute {
            tag: tag.to_string(),
            attribute: attribute.to_string(),
        });
    }
    Ok(())
}
