//! Format-preserving MSBuild project/props document
//!
//! Handles:
//! - `<PackageVersion Include="X" Version="1.0" />`
//! - `<PackageReference Include="X" Version="1.0"></PackageReference>`
//! - Child element metadata: `<PackageReference Include="X"><Version>1.0</Version></PackageReference>`
//! - Attributes in any order, single or double quotes
//! - Items inside `<!-- -->` comments are ignored
//!
//! Edits rewrite only the bytes of the touched value or element; the rest of
//! the file (indentation, comments, conditions) is kept verbatim.

use super::{ManifestDocument, ManifestItem};
use crate::domain::ItemKind;
use crate::error::ManifestError;
use regex::Regex;
use std::fs;
use std::ops::Range;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Start tag of a package item; quoted attribute values may contain `>`
const ITEM_PATTERN: &str =
    r#"<(PackageVersion|PackageReference)\b((?:[^>"']|"[^"]*"|'[^']*')*?)(/?)>"#;

const COMMENT_PATTERN: &str = r"(?s)<!--.*?-->";

/// Property groups without attributes that could hold a condition path
const PROPERTY_GROUP_PATTERN: &str = r"(?is)<PropertyGroup\b([^>/]*)>(.*?)</PropertyGroup\s*>";

/// A value that is exactly one `$(Property)` reference
const PROPERTY_REF_PATTERN: &str = r"^\$\(\s*([A-Za-z_][A-Za-z0-9_.\-]*)\s*\)$";

/// Location of one item element in the document text
#[derive(Debug, Clone)]
struct ItemSpan {
    kind: ItemKind,
    include: String,
    /// Whole element, start tag through closing tag
    element: Range<usize>,
    /// Attribute text inside the start tag
    attrs: Range<usize>,
    /// Text between start and closing tag, empty for self-closing items
    body: Range<usize>,
}

/// An MSBuild XML file loaded into memory
#[derive(Debug, Clone)]
pub struct MsBuildDocument {
    path: PathBuf,
    content: String,
}

impl MsBuildDocument {
    /// Load a document from disk
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, ManifestError> {
        let path = path.into();
        if !path.is_file() {
            return Err(ManifestError::not_found(&path));
        }
        let content =
            fs::read_to_string(&path).map_err(|e| ManifestError::read_error(&path, e))?;
        Ok(Self { path, content })
    }

    /// Build a document from text; `path` is where `save` will write
    pub fn from_text(path: impl Into<PathBuf>, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
        }
    }

    /// Current document text
    pub fn content(&self) -> &str {
        &self.content
    }

    fn comment_ranges(&self) -> Vec<Range<usize>> {
        match Regex::new(COMMENT_PATTERN) {
            Ok(re) => re.find_iter(&self.content).map(|m| m.range()).collect(),
            Err(_) => Vec::new(),
        }
    }

    fn scan(&self) -> Vec<ItemSpan> {
        let Ok(item_re) = Regex::new(ITEM_PATTERN) else {
            return Vec::new();
        };
        let comments = self.comment_ranges();
        let mut spans = Vec::new();

        for caps in item_re.captures_iter(&self.content) {
            let (Some(whole), Some(name), Some(attrs)) = (caps.get(0), caps.get(1), caps.get(2))
            else {
                continue;
            };
            if comments.iter().any(|c| c.contains(&whole.start())) {
                continue;
            }

            let kind = match name.as_str() {
                "PackageVersion" => ItemKind::PackageVersion,
                _ => ItemKind::PackageReference,
            };
            let self_closing = caps.get(3).is_some_and(|m| !m.as_str().is_empty());

            let Some(include) = find_attribute(&self.content, attrs.range(), "Include")
                .map(|r| unescape(self.content[r].trim()))
            else {
                continue;
            };

            let (element, body) = if self_closing {
                (whole.range(), whole.end()..whole.end())
            } else {
                match find_closing_tag(&self.content, whole.end(), kind) {
                    Some(close) => (whole.start()..close.end, whole.end()..close.start),
                    None => (whole.range(), whole.end()..whole.end()),
                }
            };

            spans.push(ItemSpan {
                kind,
                include,
                element,
                attrs: attrs.range(),
                body,
            });
        }

        spans
    }

    fn find(&self, kind: ItemKind, include: &str) -> Result<ItemSpan, ManifestError> {
        self.scan()
            .into_iter()
            .find(|s| s.kind == kind && s.include.eq_ignore_ascii_case(include))
            .ok_or_else(|| ManifestError::item_not_found(&self.path, kind.element_name(), include))
    }

    fn metadata_range(&self, span: &ItemSpan, name: &str) -> Option<Range<usize>> {
        find_attribute(&self.content, span.attrs.clone(), name)
            .or_else(|| find_child_element(&self.content, span.body.clone(), name))
    }

    /// Range holding the effective version of an item.
    ///
    /// A `Version` of the form `$(Name)` resolves to the last unconditional
    /// `<Name>` property defined in this file; anything else is the item's
    /// own text.
    fn version_range(&self, span: &ItemSpan) -> Option<Range<usize>> {
        let range = self.metadata_range(span, "Version")?;
        let Some(property) = property_reference(self.content[range.clone()].trim()) else {
            return Some(range);
        };
        match self.property_range(&property) {
            Some(value) if !self.content[value.clone()].contains("$(") => Some(value),
            _ => Some(range),
        }
    }

    fn property_range(&self, name: &str) -> Option<Range<usize>> {
        let group_re = Regex::new(PROPERTY_GROUP_PATTERN).ok()?;
        let comments = self.comment_ranges();
        let in_comment = |at: usize| comments.iter().any(|c| c.contains(&at));
        let mut found = None;

        for caps in group_re.captures_iter(&self.content) {
            let (Some(whole), Some(attrs), Some(body)) = (caps.get(0), caps.get(1), caps.get(2))
            else {
                continue;
            };
            if in_comment(whole.start()) || attrs.as_str().to_ascii_lowercase().contains("condition")
            {
                continue;
            }
            // later definitions override earlier ones
            if let Some(value) = child_elements(&self.content, body.range(), name)
                .into_iter()
                .filter(|r| !in_comment(r.start))
                .last()
            {
                found = Some(value);
            }
        }
        found
    }

    /// Read named metadata of the first matching item
    pub fn metadata(&self, kind: ItemKind, include: &str, name: &str) -> Option<String> {
        let span = self.find(kind, include).ok()?;
        self.metadata_range(&span, name)
            .map(|r| unescape(self.content[r].trim()))
    }
}

impl ManifestDocument for MsBuildDocument {
    fn path(&self) -> &Path {
        &self.path
    }

    fn items(&self, kind: ItemKind) -> Vec<ManifestItem> {
        self.scan()
            .into_iter()
            .filter(|s| s.kind == kind)
            .map(|s| {
                let version = self
                    .version_range(&s)
                    .map(|r| unescape(self.content[r].trim()));
                ManifestItem {
                    kind: s.kind,
                    include: s.include,
                    version,
                }
            })
            .collect()
    }

    fn set_metadata(
        &mut self,
        kind: ItemKind,
        include: &str,
        name: &str,
        value: &str,
    ) -> Result<(), ManifestError> {
        let span = self.find(kind, include)?;
        let escaped = escape(value);
        let target = if name.eq_ignore_ascii_case("Version") {
            self.version_range(&span)
        } else {
            self.metadata_range(&span, name)
        };

        match target {
            Some(range) => self.content.replace_range(range, &escaped),
            None => {
                let attrs = &self.content[span.attrs.clone()];
                let at = span.attrs.start + attrs.trim_end().len();
                self.content
                    .insert_str(at, &format!(" {}=\"{}\"", name, escaped));
            }
        }

        debug!(path = %self.path.display(), %kind, include, name, value, "metadata set");
        Ok(())
    }

    fn remove_item(&mut self, kind: ItemKind, include: &str) -> Result<(), ManifestError> {
        let span = self.find(kind, include)?;
        let range = widen_to_line(&self.content, span.element);
        self.content.replace_range(range, "");

        debug!(path = %self.path.display(), %kind, include, "item removed");
        Ok(())
    }

    /// Write through a temporary sibling file and rename it over the original
    fn save(&mut self) -> Result<(), ManifestError> {
        let file_name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "manifest".to_string());
        let temp_path = self.path.with_file_name(format!(".{}.tmp", file_name));

        fs::write(&temp_path, &self.content)
            .map_err(|e| ManifestError::write_error(&temp_path, e))?;
        if let Err(e) = fs::rename(&temp_path, &self.path) {
            let _ = fs::remove_file(&temp_path);
            return Err(ManifestError::write_error(&self.path, e));
        }

        debug!(path = %self.path.display(), "manifest saved");
        Ok(())
    }
}

/// Value range of attribute `name` within `attrs` (case-insensitive name)
fn find_attribute(content: &str, attrs: Range<usize>, name: &str) -> Option<Range<usize>> {
    let pattern = format!(
        r#"(?i)(?:^|\s){}\s*=\s*(?:"([^"]*)"|'([^']*)')"#,
        regex::escape(name)
    );
    let re = Regex::new(&pattern).ok()?;
    let text = &content[attrs.clone()];
    let caps = re.captures(text)?;
    let value = caps.get(1).or_else(|| caps.get(2))?;
    Some(attrs.start + value.start()..attrs.start + value.end())
}

/// Inner text range of the first `<name>...</name>` within `body`
fn find_child_element(content: &str, body: Range<usize>, name: &str) -> Option<Range<usize>> {
    child_elements(content, body, name).into_iter().next()
}

/// Inner text ranges of every attribute-less `<name>...</name>` within `body`
fn child_elements(content: &str, body: Range<usize>, name: &str) -> Vec<Range<usize>> {
    if body.is_empty() {
        return Vec::new();
    }
    let pattern = format!(
        r"(?is)<{0}\s*>(.*?)</{0}\s*>",
        regex::escape(name)
    );
    let Ok(re) = Regex::new(&pattern) else {
        return Vec::new();
    };
    let text = &content[body.clone()];
    re.captures_iter(text)
        .filter_map(|caps| caps.get(1))
        .map(|inner| body.start + inner.start()..body.start + inner.end())
        .collect()
}

/// Property name of a `$(Name)` value
fn property_reference(value: &str) -> Option<String> {
    let re = Regex::new(PROPERTY_REF_PATTERN).ok()?;
    re.captures(value)?.get(1).map(|m| m.as_str().to_string())
}

fn find_closing_tag(content: &str, from: usize, kind: ItemKind) -> Option<Range<usize>> {
    let pattern = format!(r"</{}\s*>", kind.element_name());
    let re = Regex::new(&pattern).ok()?;
    re.find(&content[from..])
        .map(|m| from + m.start()..from + m.end())
}

/// Extend an element range to its whole line when nothing else shares the line
fn widen_to_line(content: &str, element: Range<usize>) -> Range<usize> {
    let line_start = content[..element.start]
        .rfind('\n')
        .map(|i| i + 1)
        .unwrap_or(0);
    let line_end = content[element.end..]
        .find('\n')
        .map(|i| element.end + i + 1)
        .unwrap_or(content.len());

    let before = &content[line_start..element.start];
    let after = &content[element.end..line_end];
    if before.trim().is_empty() && after.trim().is_empty() {
        line_start..line_end
    } else {
        element
    }
}

fn escape(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn unescape(value: &str) -> String {
    value
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}
