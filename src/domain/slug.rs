//! Deterministic, URL-safe heading anchors.
//!
//! Slugs keep Unicode alphanumerics (lowercased) and collapse every other run
//! of characters into a single hyphen, so `Hello, World!` becomes
//! `hello-world` and `Überblick` stays readable as `überblick`.

use std::collections::HashMap;

/// Placeholder used when a heading has no alphanumeric content at all.
pub const FALLBACK_SLUG: &str = "section";

/// Derive the base slug for a heading's flattened text.
pub fn derive_slug(input: &str) -> String {
    let mut slug = String::with_capacity(input.len());
    let mut pending_separator = false;

    for ch in input.chars() {
        if ch.is_alphanumeric() {
            if pending_separator && !slug.is_empty() {
                slug.push('-');
            }
            pending_separator = false;
            slug.extend(ch.to_lowercase());
        } else {
            pending_separator = true;
        }
    }

    if slug.is_empty() {
        FALLBACK_SLUG.to_string()
    } else {
        slug
    }
}

/// Deterministically generate unique anchor slugs within a single document.
///
/// Headings processed in order receive monotonic suffixes when duplicates
/// occur (`overview`, `overview-1`, `overview-2`). A slugger lives for exactly
/// one render call.
#[derive(Default, Debug)]
pub struct AnchorSlugger {
    occurrences: HashMap<String, usize>,
}

impl AnchorSlugger {
    pub fn new() -> Self {
        Self {
            occurrences: HashMap::new(),
        }
    }

    /// Generate a unique anchor for the provided heading text.
    pub fn anchor_for(&mut self, heading: &str) -> String {
        let base = derive_slug(heading);
        let mut candidate = base.clone();

        while self.occurrences.contains_key(&candidate) {
            let count = self.occurrences.entry(base.clone()).or_insert(0);
            *count += 1;
            candidate = format!("{base}-{count}");
        }

        self.occurrences.insert(candidate.clone(), 0);
        candidate
    }

    /// Record an id that already exists in the document. Returns `false` when
    /// the id has been handed out before, in which case the caller must pick
    /// a fresh one.
    pub fn reserve(&mut self, id: &str) -> bool {
        if self.occurrences.contains_key(id) {
            return false;
        }
        self.occurrences.insert(id.to_string(), 0);
        true
    }
}
