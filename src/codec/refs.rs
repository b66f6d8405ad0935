use std::sync::LazyLock;

use regex::Regex;

use crate::codec::literal::Literal;

static REF_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"ref\(\s*['"](.*?)['"]\s*\)"#).expect("valid regex"));

/// Command tuple code linking a single record: `(4, ref('x'))`.
const CMD_LINK: i64 = 4;
/// Command tuple code replacing the whole set: `(6, 0, [ref('x'), ...])`.
const CMD_REPLACE: i64 = 6;

/// Extracts the referenced ids from a relational command list such as
/// `[(6, 0, [ref('a'), ref('b')])]`.
///
/// Only commands 4 and 6 contribute; other codes are skipped. Anything that
/// does not parse as a list or tuple yields an empty list.
pub fn parse_refs(expr: &str) -> Vec<String> {
    let Ok(root) = Literal::parse(expr) else {
        return Vec::new();
    };
    let Some(commands) = root.items() else {
        return Vec::new();
    };

    let mut names = Vec::new();
    for command in commands {
        let Some(parts) = command.items() else {
            continue;
        };
        match parts.first() {
            Some(Literal::Int(CMD_LINK)) => {
                if let Some(Literal::Ref(id)) = parts.get(1) {
                    names.push(id.clone());
                }
            }
            Some(Literal::Int(CMD_REPLACE)) => {
                let calls = parts.get(2).and_then(Literal::items).unwrap_or_default();
                names.extend(calls.iter().filter_map(|call| match call {
                    Literal::Ref(id) => Some(id.clone()),
                    _ => None,
                }));
            }
            _ => {}
        }
    }
    names
}

/// Formats ids as `ref()` calls ready to sit between the brackets of a
/// command 6 literal. Empty ids are dropped; no ids gives an empty string.
pub fn make_refs<S: AsRef<str>>(xml_ids: &[S]) -> String {
    let lines: Vec<String> = xml_ids
        .iter()
        .map(AsRef::as_ref)
        .filter(|id| !id.is_empty())
        .map(|id| format!("{}ref('{}'),", " ".repeat(12), id))
        .collect();
    if lines.is_empty() {
        return String::new();
    }
    format!("\n{}\n{}", lines.join("\n"), " ".repeat(8))
}

/// Wraps [`make_refs`] output into a complete `(6, 0, [...])` command list.
pub fn replace_command<S: AsRef<str>>(xml_ids: &[S]) -> String {
    format!("[(6, 0, [{}])]", make_refs(xml_ids))
}

/// First `ref('...')` found in an eval expression.
pub fn first_ref(expr: &str) -> Option<String> {
    REF_RE
        .captures(expr)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Model name of a single-clause search domain `[('model', '=', 'x.y')]`.
/// Any other shape yields `None`.
pub fn search_model(expr: &str) -> Option<String> {
    let root = Literal::parse(expr).ok()?;
    let [clause] = root.items()? else {
        return None;
    };
    let [_, _, value] = clause.items()? else {
        return None;
    };
    value.as_str().map(str::to_string)
}
