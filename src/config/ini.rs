//! Low-level scanner for the INI-like configuration grammar (§6).
//!
//! Deliberately hand-written rather than pulled from a generic INI crate:
//! the grammar is small (sections, `key = value`, `#` comments, quoted
//! values) and the config file format is explicitly out of core scope
//! (§1) — this is adapter-interface plumbing, not the multiplexing engine.

use std::collections::HashMap;

use super::ConfigError;

/// One `[section]` block with its `key = value` entries, in file order.
pub struct Section {
    pub name: String,
    pub line: usize,
    pub entries: HashMap<String, String>,
}

/// Scans `text` into an ordered list of sections. Lines before the first
/// section header are rejected (§6 gives no meaning to keys outside a
/// section).
pub fn scan(text: &str) -> Result<Vec<Section>, ConfigError> {
    let mut sections = Vec::new();
    let mut current: Option<Section> = None;

    for (idx, raw_line) in text.lines().enumerate() {
        let line_no = idx + 1;
        let line = strip_comment(raw_line).trim();
        if line.is_empty() {
            continue;
        }

        if let Some(name) = parse_header(line) {
            if let Some(section) = current.take() {
                sections.push(section);
            }
            current = Some(Section {
                name: name.to_string(),
                line: line_no,
                entries: HashMap::new(),
            });
            continue;
        }

        let section = current.as_mut().ok_or(ConfigError::KeyOutsideSection { line: line_no })?;
        let (key, value) = parse_kv(line, line_no)?;
        section.entries.insert(key, value);
    }

    if let Some(section) = current.take() {
        sections.push(section);
    }

    Ok(sections)
}

fn parse_header(line: &str) -> Option<&str> {
    let line = line.strip_prefix('[')?;
    let name = line.strip_suffix(']')?;
    Some(name)
}

fn parse_kv(line: &str, line_no: usize) -> Result<(String, String), ConfigError> {
    let (key, value) = line
        .split_once('=')
        .ok_or(ConfigError::MalformedLine { line: line_no })?;
    let key = key.trim().to_string();
    if key.is_empty() {
        return Err(ConfigError::MalformedLine { line: line_no });
    }
    let value = unquote(value.trim());
    Ok((key, value))
}

fn unquote(value: &str) -> String {
    let bytes = value.as_bytes();
    if bytes.len() >= 2 {
        let first = bytes[0];
        let last = bytes[bytes.len() - 1];
        if (first == b'\'' || first == b'"') && first == last {
            return value[1..value.len() - 1].to_string();
        }
    }
    value.to_string()
}

/// Strips a `#` comment, honoring quoted values so a literal `#` inside
/// quotes is not treated as a comment marker.
fn strip_comment(line: &str) -> &str {
    let mut in_single = false;
    let mut in_double = false;
    for (i, c) in line.char_indices() {
        match c {
            '\'' if !in_double => in_single = !in_single,
            '"' if !in_single => in_double = !in_double,
            '#' if !in_single && !in_double => return &line[..i],
            _ => {}
        }
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scans_sections_and_entries() {
        let text = "\
[global]
qsize = 16
# a comment
logto = user

[file]
direction = 'in'
filename = \"/tmp/x.log\" # trailing comment
";
        let sections = scan(text).unwrap();
        assert_eq!(sections.len(), 2);
        assert_eq!(sections[0].name, "global");
        assert_eq!(sections[0].entries.get("qsize").unwrap(), "16");
        assert_eq!(sections[1].entries.get("direction").unwrap(), "in");
        assert_eq!(sections[1].entries.get("filename").unwrap(), "/tmp/x.log");
    }

    #[test]
    fn rejects_keys_outside_section() {
        let text = "qsize = 16\n[global]\n";
        assert!(matches!(
            scan(text),
            Err(ConfigError::KeyOutsideSection { line: 1 })
        ));
    }

    #[test]
    fn blank_lines_and_full_line_comments_ignored() {
        let text = "[global]\n\n# nothing here\nqsize = 4\n";
        let sections = scan(text).unwrap();
        assert_eq!(sections[0].entries.len(), 1);
    }
}
