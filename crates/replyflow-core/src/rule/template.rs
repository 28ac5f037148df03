//! Reply template rendering.

use chrono::{DateTime, Local};
use std::collections::HashMap;

/// Template variables available to reply templates.
pub type TemplateContext = HashMap<String, String>;

/// Runtime variables of one reply.
#[derive(Debug, Clone, Copy)]
pub struct ReplyVariables<'a> {
    pub account: &'a str,
    pub target: &'a str,
    /// Contact remark, else display name, else the target id.
    pub sender_name: &'a str,
    pub content: &'a str,
}

impl ReplyVariables<'_> {
    /// `sender_name`, `target`, `content`, `account`, plus `time`
    /// (`HH:MM:SS`) and `date` (`YYYY-MM-DD`) taken from `now`.
    pub fn to_context(&self, now: &DateTime<Local>) -> TemplateContext {
        TemplateContext::from([
            ("sender_name".to_string(), self.sender_name.to_string()),
            ("target".to_string(), self.target.to_string()),
            ("content".to_string(), self.content.to_string()),
            ("time".to_string(), now.format("%H:%M:%S").to_string()),
            ("date".to_string(), now.format("%Y-%m-%d").to_string()),
            ("account".to_string(), self.account.to_string()),
        ])
    }
}

enum Segment<'a> {
    Text(&'a str),
    Brace(char),
    Key(&'a str),
}

/// Splits a template into literal text and `{key}` placeholders.
///
/// Returns `None` for unbalanced braces.
fn parse(template: &str) -> Option<Vec<Segment<'_>>> {
    let mut segments = Vec::new();
    let mut rest = template;

    while let Some(pos) = rest.find(['{', '}']) {
        if pos > 0 {
            segments.push(Segment::Text(&rest[..pos]));
        }
        let tail = &rest[pos..];
        if tail.starts_with("{{") {
            segments.push(Segment::Brace('{'));
            rest = &tail[2..];
        } else if tail.starts_with("}}") {
            segments.push(Segment::Brace('}'));
            rest = &tail[2..];
        } else if tail.starts_with('}') {
            return None;
        } else {
            let close = tail.find('}')?;
            let key = &tail[1..close];
            if key.contains('{') {
                return None;
            }
            segments.push(Segment::Key(key));
            rest = &tail[close + 1..];
        }
    }
    if !rest.is_empty() {
        segments.push(Segment::Text(rest));
    }
    Some(segments)
}

/// Substitutes `{key}` placeholders from `context`.
///
/// `{{` and `}}` render as literal braces. If any referenced key is missing,
/// or the braces are unbalanced, the template is returned unchanged.
pub fn render(template: &str, context: &TemplateContext) -> String {
    let Some(segments) = parse(template) else {
        return template.to_string();
    };

    let mut out = String::with_capacity(template.len());
    for segment in segments {
        match segment {
            Segment::Text(text) => out.push_str(text),
            Segment::Brace(c) => out.push(c),
            Segment::Key(key) => match context.get(key) {
                Some(value) => out.push_str(value),
                None => return template.to_string(),
            },
        }
    }
    out
}

/// Placeholder names referenced by `template`, in order of appearance.
pub fn placeholders(template: &str) -> Vec<&str> {
    parse(template)
        .unwrap_or_default()
        .into_iter()
        .filter_map(|segment| match segment {
            Segment::Key(key) => Some(key),
            _ => None,
        })
        .collect()
}
