//! Safe Markdown-to-HTML rendering with heading anchors and
//! table-of-contents extraction.

pub mod application;
pub mod config;
pub mod domain;
pub mod infra;
