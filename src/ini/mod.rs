//! INI-style config document adapter
//!
//! Parses managed configuration files into sections of ordered key/value
//! pairs while remembering every source line, so targeted edits (set one
//! key in one section) re-serialize the rest of the document untouched,
//! comments and key order included.
//!
//! Lookups of absent sections or keys return `None` rather than failing:
//! managed files often ship with only a subset of recognized keys.

use crate::error::{self, Result};
use crate::template::LINE_SEP;

/// One line (or continued line group) inside a section or the preamble
#[derive(Debug, Clone, PartialEq)]
enum Line {
    /// Blank or comment line, kept verbatim
    Raw(String),
    /// Key/value pair; `raw` holds the source lines while the entry is unedited
    Entry {
        key: String,
        value: String,
        raw: Option<Vec<String>>,
    },
}

#[derive(Debug, Clone, PartialEq)]
struct Section {
    name: String,
    header: String,
    lines: Vec<Line>,
    /// Created by an edit rather than parsed from the source text
    appended: bool,
}

impl Section {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            header: format!("[{name}]"),
            lines: Vec::new(),
            appended: true,
        }
    }

    fn entry_index(&self, key: &str) -> Option<usize> {
        self.lines.iter().position(|line| match line {
            Line::Entry { key: k, .. } => k.eq_ignore_ascii_case(key),
            Line::Raw(_) => false,
        })
    }

    fn entries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.lines.iter().filter_map(|line| match line {
            Line::Entry { key, value, .. } => Some((key.as_str(), value.as_str())),
            Line::Raw(_) => None,
        })
    }
}

/// Whether a conditional edit applies to keys that are not in the document yet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presence {
    /// Only rewrite a key that already exists with a different value
    OnlyIfPresent,
    /// Add the key when absent, rewrite it when different
    Always,
}

/// A parsed INI-style document
#[derive(Debug, Clone, PartialEq)]
pub struct IniDocument {
    preamble: Vec<String>,
    sections: Vec<Section>,
    trailing_newline: bool,
    /// Line separator of the source text, reused when writing
    newline: &'static str,
}

impl Default for IniDocument {
    fn default() -> Self {
        Self {
            preamble: Vec::new(),
            sections: Vec::new(),
            trailing_newline: false,
            newline: LINE_SEP,
        }
    }
}

impl IniDocument {
    /// Parse `text`; `source` names the document in error messages
    pub fn parse(text: &str, source: &str) -> Result<Self> {
        let mut doc = IniDocument {
            trailing_newline: text.is_empty() || text.ends_with('\n'),
            newline: newline_of(text),
            ..Self::default()
        };

        for (idx, line) in text.lines().enumerate() {
            let line_no = idx + 1;
            let trimmed = line.trim();

            if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with(';') {
                match doc.sections.last_mut() {
                    Some(section) => section.lines.push(Line::Raw(line.to_string())),
                    None => doc.preamble.push(line.to_string()),
                }
                continue;
            }

            let indented = line.starts_with([' ', '\t']);
            if indented {
                if let Some(Line::Entry { value, raw, .. }) =
                    doc.sections.last_mut().and_then(|s| s.lines.last_mut())
                {
                    value.push('\n');
                    value.push_str(trimmed);
                    if let Some(raw) = raw {
                        raw.push(line.to_string());
                    }
                    continue;
                }
            }

            if trimmed.starts_with('[') {
                let name = section_name(trimmed).ok_or_else(|| {
                    error::config_parse_failed(source, line_no, "malformed section header")
                })?;
                if name.is_empty() {
                    return Err(error::config_parse_failed(
                        source,
                        line_no,
                        "empty section name",
                    ));
                }
                if doc.has_section(name) {
                    return Err(error::config_parse_failed(
                        source,
                        line_no,
                        format!("duplicate section [{name}]"),
                    ));
                }
                doc.sections.push(Section {
                    name: name.to_string(),
                    header: line.to_string(),
                    lines: Vec::new(),
                    appended: false,
                });
                continue;
            }

            let Some(section) = doc.sections.last_mut() else {
                return Err(error::config_parse_failed(
                    source,
                    line_no,
                    "option found before any section header",
                ));
            };
            let Some(sep) = trimmed.find(['=', ':']) else {
                return Err(error::config_parse_failed(
                    source,
                    line_no,
                    "expected 'key = value'",
                ));
            };
            let key = trimmed[..sep].trim();
            if key.is_empty() {
                return Err(error::config_parse_failed(source, line_no, "empty option name"));
            }
            if section.entry_index(key).is_some() {
                return Err(error::config_parse_failed(
                    source,
                    line_no,
                    format!("duplicate option '{key}' in section [{}]", section.name),
                ));
            }
            section.lines.push(Line::Entry {
                key: key.to_string(),
                value: trimmed[sep + 1..].trim().to_string(),
                raw: Some(vec![line.to_string()]),
            });
        }

        Ok(doc)
    }

    /// Whether the document has a section named `section`
    pub fn has_section(&self, section: &str) -> bool {
        self.section(section).is_some()
    }

    /// Section names in document order
    #[allow(dead_code)]
    pub fn sections(&self) -> impl Iterator<Item = &str> {
        self.sections.iter().map(|s| s.name.as_str())
    }

    /// Key/value pairs of one section in document order; empty for an absent section
    #[allow(dead_code)]
    pub fn items(&self, section: &str) -> Vec<(&str, &str)> {
        self.section(section)
            .map(|s| s.entries().collect())
            .unwrap_or_default()
    }

    /// Value of `key` in `section`, or `None` when either is absent
    pub fn get(&self, section: &str, key: &str) -> Option<&str> {
        let section = self.section(section)?;
        section.entry_index(key).and_then(|i| match &section.lines[i] {
            Line::Entry { value, .. } => Some(value.as_str()),
            Line::Raw(_) => None,
        })
    }

    /// Set `key` in `section`, creating either when missing
    pub fn set(&mut self, section: &str, key: &str, value: impl Into<String>) {
        let value = value.into();
        if !self.has_section(section) {
            self.sections.push(Section::new(section));
        }
        let Some(target) = self.sections.iter_mut().find(|s| s.name == section) else {
            return;
        };

        if let Some(idx) = target.entry_index(key) {
            if let Line::Entry {
                value: current,
                raw,
                ..
            } = &mut target.lines[idx]
            {
                if *current != value {
                    *current = value;
                    *raw = None;
                }
            }
            return;
        }

        let insert_at = target
            .lines
            .iter()
            .rposition(|line| matches!(line, Line::Entry { .. }))
            .map_or(0, |i| i + 1);
        target.lines.insert(
            insert_at,
            Line::Entry {
                key: key.to_string(),
                value,
                raw: None,
            },
        );
    }

    /// Set `key` only when its current value diverges from `value`
    ///
    /// Returns whether the document changed.
    pub fn set_if_divergent(
        &mut self,
        section: &str,
        key: &str,
        value: &str,
        presence: Presence,
    ) -> bool {
        match (self.get(section, key), presence) {
            (Some(current), _) if current == value => false,
            (None, Presence::OnlyIfPresent) => false,
            _ => {
                self.set(section, key, value);
                true
            }
        }
    }

    /// Remove `key` from `section`, returning whether it was present
    #[allow(dead_code)]
    pub fn remove(&mut self, section: &str, key: &str) -> bool {
        let Some(target) = self.sections.iter_mut().find(|s| s.name == section) else {
            return false;
        };
        match target.entry_index(key) {
            Some(idx) => {
                target.lines.remove(idx);
                true
            }
            None => false,
        }
    }

    /// Serialize the whole document
    pub fn to_text(&self) -> String {
        let mut lines: Vec<String> = self.preamble.clone();
        for section in &self.sections {
            if section.appended && lines.last().is_some_and(|l| !l.trim().is_empty()) {
                lines.push(String::new());
            }
            lines.push(section.header.clone());
            for line in &section.lines {
                match line {
                    Line::Raw(text) => lines.push(text.clone()),
                    Line::Entry {
                        raw: Some(raw), ..
                    } => lines.extend(raw.iter().cloned()),
                    Line::Entry {
                        key,
                        value,
                        raw: None,
                    } => lines.push(format_entry(key, value, self.newline)),
                }
            }
        }

        let mut text = lines.join(self.newline);
        if self.trailing_newline && !text.is_empty() {
            text.push_str(self.newline);
        }
        text
    }

    fn section(&self, name: &str) -> Option<&Section> {
        self.sections.iter().find(|s| s.name == name)
    }
}

/// `[name]` optionally followed by a `;` or `#` comment
fn section_name(header: &str) -> Option<&str> {
    let rest = header.strip_prefix('[')?;
    let close = rest.rfind(']')?;
    let trailer = rest[close + 1..].trim_start();
    if !(trailer.is_empty() || trailer.starts_with([';', '#'])) {
        return None;
    }
    Some(rest[..close].trim())
}

/// Line separator used by `text`; [`LINE_SEP`] when it has no line break
fn newline_of(text: &str) -> &'static str {
    match text.find('\n') {
        Some(idx) if text[..idx].ends_with('\r') => "\r\n",
        Some(_) => "\n",
        None => LINE_SEP,
    }
}

fn format_entry(key: &str, value: &str, newline: &str) -> String {
    let mut parts = value.split('\n');
    let first = parts.next().unwrap_or_default();
    let mut out = format!("{key} = {first}");
    for rest in parts {
        out.push_str(newline);
        out.push('\t');
        out.push_str(rest);
    }
    out
}

const HEADER_PREFIX: &str = "# Adjusted source file ";

/// Prefix `contents` with a comment block naming the file it was derived from
///
/// A header left by an earlier run is replaced, not stacked.
pub fn add_header(source_name: &str, contents: &str) -> String {
    let contents = strip_header(contents);
    let mut lines = vec![
        format!("{HEADER_PREFIX}{}", source_name.trim()),
        format!("# Generated by stackup {}", env!("CARGO_PKG_VERSION")),
        String::new(),
    ];
    if !contents.is_empty() {
        lines.push(contents.to_string());
    }
    lines.join(newline_of(contents))
}

fn strip_header(contents: &str) -> &str {
    if !contents.starts_with(HEADER_PREFIX) {
        return contents;
    }
    let mut rest = contents;
    for _ in 0..3 {
        rest = rest.split_once('\n').map_or("", |(_, tail)| tail);
    }
    rest
}
