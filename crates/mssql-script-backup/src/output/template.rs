//! Positional output path templates.
//!
//! A template such as `out/{1}/{3}/{2}_{4:yyyyMMdd}.{5}.sql` is parsed once
//! and expanded per event. Placeholders are positional:
//!
//! | index | value |
//! |-------|-------|
//! | `{0}` | server name |
//! | `{1}` | database name |
//! | `{2}` | object name |
//! | `{3}` | object type name |
//! | `{4}` | run start timestamp, optionally `{4:<format>}` |
//! | `{5}` | pipeline kind (`schema` or `data`) |
//!
//! Timestamp formats use .NET-style tokens (`yyyy`, `MM`, `dd`, `HH`, `mm`,
//! `ss`, `fff`, ...) or, when the format contains `%`, chrono strftime
//! syntax. `{{` and `}}` produce literal braces.

use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, Local};

use crate::error::{BackupError, Result};
use crate::pipeline::PipelineKind;

/// strftime form of the timestamp used when `{4}` has no format.
pub const DEFAULT_TIMESTAMP_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

/// Highest placeholder index.
const MAX_INDEX: usize = 5;

/// Index of the pipeline kind placeholder.
const KIND_INDEX: usize = 5;

/// Index of the timestamp placeholder.
const TIMESTAMP_INDEX: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Token { index: usize, format: Option<String> },
}

/// Values substituted into a template for one event.
#[derive(Debug, Clone, Copy)]
pub struct TemplateTokens<'a> {
    pub server: &'a str,
    pub database: &'a str,
    pub object: &'a str,
    pub type_name: &'a str,
    pub timestamp: DateTime<Local>,
    pub kind: PipelineKind,
}

/// A parsed output path template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputTemplate {
    source: String,
    segments: Vec<Segment>,
}

impl OutputTemplate {
    /// Parse a template, rejecting unknown placeholders and unbalanced braces.
    pub fn parse(template: &str) -> Result<Self> {
        if template.trim().is_empty() {
            return Err(BackupError::Template(
                "output template cannot be empty".to_string(),
            ));
        }

        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut chars = template.chars().peekable();

        while let Some(c) = chars.next() {
            match c {
                '{' if chars.peek() == Some(&'{') => {
                    chars.next();
                    literal.push('{');
                }
                '}' if chars.peek() == Some(&'}') => {
                    chars.next();
                    literal.push('}');
                }
                '{' => {
                    let mut body = String::new();
                    let mut closed = false;
                    for c in chars.by_ref() {
                        if c == '}' {
                            closed = true;
                            break;
                        }
                        body.push(c);
                    }
                    if !closed {
                        return Err(BackupError::Template(format!(
                            "unclosed placeholder in {:?}",
                            template
                        )));
                    }
                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }
                    segments.push(parse_token(&body, template)?);
                }
                '}' => {
                    return Err(BackupError::Template(format!(
                        "unmatched '}}' in {:?}",
                        template
                    )));
                }
                _ => literal.push(c),
            }
        }
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        Ok(Self {
            source: template.to_string(),
            segments,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Whether the template separates schema and data output (`{5}`).
    pub fn has_kind_token(&self) -> bool {
        self.segments
            .iter()
            .any(|s| matches!(s, Segment::Token { index, .. } if *index == KIND_INDEX))
    }

    /// Expand into a concrete path string.
    ///
    /// Path separators inside substituted names are replaced so an object
    /// name cannot move the file outside its directory.
    pub fn expand(&self, tokens: &TemplateTokens<'_>) -> String {
        let mut out = String::with_capacity(self.source.len() + 32);
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Token { index, format } => match *index {
                    0 => out.push_str(&path_safe(tokens.server)),
                    1 => out.push_str(&path_safe(tokens.database)),
                    2 => out.push_str(&path_safe(tokens.object)),
                    3 => out.push_str(&path_safe(tokens.type_name)),
                    TIMESTAMP_INDEX => {
                        let fmt = format.as_deref().unwrap_or(DEFAULT_TIMESTAMP_FORMAT);
                        out.push_str(&tokens.timestamp.format(fmt).to_string());
                    }
                    _ => out.push_str(tokens.kind.as_str()),
                },
            }
        }
        out
    }
}

fn parse_token(body: &str, template: &str) -> Result<Segment> {
    let (index, format) = match body.split_once(':') {
        Some((index, format)) => (index, Some(format)),
        None => (body, None),
    };

    let index: usize = index.trim().parse().map_err(|_| {
        BackupError::Template(format!("invalid placeholder {{{}}} in {:?}", body, template))
    })?;
    if index > MAX_INDEX {
        return Err(BackupError::Template(format!(
            "unknown placeholder {{{}}} in {:?}; valid indexes are 0-{}",
            index, template, MAX_INDEX
        )));
    }

    // A format is only meaningful for the timestamp.
    let format = match format {
        Some(f) if index == TIMESTAMP_INDEX && !f.is_empty() => {
            let strftime = if f.contains('%') {
                f.to_string()
            } else {
                dotnet_to_strftime(f)
            };
            if StrftimeItems::new(&strftime).any(|item| matches!(item, Item::Error)) {
                return Err(BackupError::Template(format!(
                    "invalid timestamp format {:?} in {:?}",
                    f, template
                )));
            }
            Some(strftime)
        }
        _ => None,
    };

    Ok(Segment::Token { index, format })
}

/// Translate a .NET custom date/time format into strftime.
fn dotnet_to_strftime(format: &str) -> String {
    let chars: Vec<char> = format.chars().collect();
    let mut out = String::with_capacity(format.len() * 2);
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        let run = chars[i..].iter().take_while(|&&x| x == c).count();

        match c {
            '\'' | '"' => {
                // Quoted literal
                i += 1;
                while i < chars.len() && chars[i] != c {
                    push_literal(&mut out, chars[i]);
                    i += 1;
                }
                i += 1;
                continue;
            }
            '\\' if i + 1 < chars.len() => {
                push_literal(&mut out, chars[i + 1]);
                i += 2;
                continue;
            }
            'y' => out.push_str(if run >= 4 || run == 3 { "%Y" } else { "%y" }),
            'M' => out.push_str(match run {
                1 => "%-m",
                2 => "%m",
                3 => "%b",
                _ => "%B",
            }),
            'd' => out.push_str(match run {
                1 => "%-d",
                2 => "%d",
                3 => "%a",
                _ => "%A",
            }),
            'H' => out.push_str(if run == 1 { "%-H" } else { "%H" }),
            'h' => out.push_str(if run == 1 { "%-I" } else { "%I" }),
            'm' => out.push_str(if run == 1 { "%-M" } else { "%M" }),
            's' => out.push_str(if run == 1 { "%-S" } else { "%S" }),
            'f' | 'F' => out.push_str(match run {
                1..=3 => "%3f",
                4..=6 => "%6f",
                _ => "%9f",
            }),
            't' => out.push_str("%p"),
            _ => {
                for _ in 0..run {
                    push_literal(&mut out, c);
                }
            }
        }
        i += run;
    }
    out
}

fn push_literal(out: &mut String, c: char) {
    if c == '%' {
        out.push_str("%%");
    } else {
        out.push(c);
    }
}

fn path_safe(value: &str) -> String {
    value
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c => c,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn tokens(kind: PipelineKind) -> TemplateTokens<'static> {
        TemplateTokens {
            server: "SRV01",
            database: "Sales",
            object: "Orders",
            type_name: "Table",
            timestamp: Local.with_ymd_and_hms(2024, 3, 5, 14, 7, 9).unwrap(),
            kind,
        }
    }

    #[test]
    fn test_expand_positional_tokens() {
        let template = OutputTemplate::parse("out/{0}/{1}_{2}_{3}.{5}.sql").unwrap();
        assert_eq!(
            template.expand(&tokens(PipelineKind::Schema)),
            "out/SRV01/Sales_Orders_Table.schema.sql"
        );
        assert!(template.has_kind_token());
    }

    #[test]
    fn test_timestamp_formats() {
        let t = tokens(PipelineKind::Data);
        let default = OutputTemplate::parse("{4}.sql").unwrap();
        assert_eq!(default.expand(&t), "2024-03-05_14-07-09.sql");

        let dotnet = OutputTemplate::parse("{4:yyyyMMdd_HHmm}.sql").unwrap();
        assert_eq!(dotnet.expand(&t), "20240305_1407.sql");

        let strftime = OutputTemplate::parse("{4:%Y/%m}.sql").unwrap();
        assert_eq!(strftime.expand(&t), "2024/03.sql");

        let quoted = OutputTemplate::parse("{4:yyyy'y'MM}").unwrap();
        assert_eq!(quoted.expand(&t), "2024y03");
    }

    #[test]
    fn test_escaped_braces() {
        let template = OutputTemplate::parse("{{{1}}}.sql").unwrap();
        assert_eq!(template.expand(&tokens(PipelineKind::Schema)), "{Sales}.sql");
        assert!(!template.has_kind_token());
    }

    #[test]
    fn test_parse_rejects_bad_templates() {
        assert!(OutputTemplate::parse("").is_err());
        assert!(OutputTemplate::parse("out/{6}.sql").is_err());
        assert!(OutputTemplate::parse("out/{x}.sql").is_err());
        assert!(OutputTemplate::parse("out/{1.sql").is_err());
        assert!(OutputTemplate::parse("out/1}.sql").is_err());
        assert!(OutputTemplate::parse("{4:%J}").is_err());
    }

    #[test]
    fn test_names_cannot_escape_directory() {
        let template = OutputTemplate::parse("out/{2}.sql").unwrap();
        let mut t = tokens(PipelineKind::Schema);
        t.object = "../etc/passwd";
        assert_eq!(template.expand(&t), "out/.._etc_passwd.sql");
    }
}
