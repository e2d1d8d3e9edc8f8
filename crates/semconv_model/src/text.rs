//! Markdown-aware text: brief and note fields split into plain runs and
//! `[text](url)` links, so renderers can restyle links per target format.

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

static MD_LINK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[([^\[\]]+)\]\(([^)]+)\)").unwrap());

/// A markdown link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MdLink {
    pub text: String,
    pub url: String,
}

impl fmt::Display for MdLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]({})", self.text, self.url)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum TextPart {
    Text(String),
    Link(MdLink),
}

/// A text field decomposed into plain runs and markdown links. The raw
/// text is kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TextWithLinks {
    pub raw_text: String,
    pub parts: Vec<TextPart>,
}

impl TextWithLinks {
    pub fn parse(text: &str) -> Self {
        let mut parts = Vec::new();
        let mut last = 0;
        for captures in MD_LINK_RE.captures_iter(text) {
            let whole = match captures.get(0) {
                Some(m) => m,
                None => continue,
            };
            let prev = &text[last..whole.start()];
            if !prev.is_empty() {
                parts.push(TextPart::Text(prev.to_owned()));
            }
            parts.push(TextPart::Link(MdLink {
                text: captures
                    .get(1)
                    .map(|m| m.as_str().to_owned())
                    .unwrap_or_default(),
                url: captures
                    .get(2)
                    .map(|m| m.as_str().to_owned())
                    .unwrap_or_default(),
            }));
            last = whole.end();
        }
        let tail = &text[last..];
        if !tail.is_empty() {
            parts.push(TextPart::Text(tail.to_owned()));
        }
        Self {
            raw_text: text.to_owned(),
            parts,
        }
    }
}

impl fmt::Display for TextWithLinks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for part in &self.parts {
            match part {
                TextPart::Text(text) => write!(f, "{}", text)?,
                TextPart::Link(link) => write!(f, "{}", link)?,
            }
        }
        Ok(())
    }
}
