//! Template-driven record formatting
//!
//! A formatter is a parsed template plus an optional strftime date format.
//! Three template styles are understood:
//!
//! - `%`: `%(asctime)s %(levelname)-8s %(lineno)d %(created).3f`, `%%`
//! - `{`: `{asctime} {levelname:<8} {lineno:>4} {created:.3f}`, `{{` `}}`
//! - `$`: `$asctime ${levelname} $message`, `$$`
//!
//! Templates are parsed once, up front, so a malformed template is an error
//! at configuration time and never at emission time.

use super::error::{LoggerError, Result};
use super::log_context::FieldValue;
use super::record::LogRecord;
use chrono::format::{Item, StrftimeItems};
use chrono::Local;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt::{self, Write};
use std::str::FromStr;

/// Placeholders every record can fill
pub const RECORD_FIELDS: &[&str] = &[
    "name",
    "levelname",
    "levelno",
    "message",
    "asctime",
    "created",
    "msecs",
    "pathname",
    "filename",
    "module",
    "lineno",
    "funcName",
    "thread",
    "threadName",
    "process",
];

/// Template style indicator
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FormatStyle {
    #[default]
    #[serde(rename = "%")]
    Percent,
    #[serde(rename = "{")]
    Brace,
    #[serde(rename = "$")]
    Dollar,
}

impl FormatStyle {
    pub fn symbol(&self) -> &'static str {
        match self {
            FormatStyle::Percent => "%",
            FormatStyle::Brace => "{",
            FormatStyle::Dollar => "$",
        }
    }
}

impl fmt::Display for FormatStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl FromStr for FormatStyle {
    type Err = LoggerError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "%" | "percent" => Ok(FormatStyle::Percent),
            "{" | "brace" => Ok(FormatStyle::Brace),
            "$" | "dollar" => Ok(FormatStyle::Dollar),
            _ => Err(LoggerError::config(
                "style",
                format!("expected one of '%', '{{', '$', got '{}'", s),
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Align {
    Left,
    Right,
    Center,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Conversion {
    Str,
    Repr,
    Int,
    Float,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct FieldSpec {
    fill: char,
    align: Option<Align>,
    width: Option<usize>,
    precision: Option<usize>,
    conversion: Conversion,
}

impl Default for FieldSpec {
    fn default() -> Self {
        Self {
            fill: ' ',
            align: None,
            width: None,
            precision: None,
            conversion: Conversion::Str,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Field { key: String, spec: FieldSpec },
}

impl Segment {
    fn field(key: &str) -> Self {
        Segment::Field {
            key: key.to_string(),
            spec: FieldSpec::default(),
        }
    }
}

enum Value<'a> {
    Str(Cow<'a, str>),
    Int(i64),
    Float(f64),
}

impl Value<'_> {
    fn is_numeric(&self) -> bool {
        !matches!(self, Value::Str(_))
    }

    fn plain(&self) -> Cow<'_, str> {
        match self {
            Value::Str(s) => Cow::Borrowed(s.as_ref()),
            Value::Int(i) => Cow::Owned(i.to_string()),
            Value::Float(f) => Cow::Owned(f.to_string()),
        }
    }
}

const BOOTSTRAP_TEMPLATE: &str = "%(asctime)s (preconfig) : %(levelname)s - %(message)s";

/// Parsed template, date format and style
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Formatter {
    template: String,
    style: FormatStyle,
    date_format: Option<String>,
    segments: Vec<Segment>,
}

impl Formatter {
    /// Parse `template` in the given style
    ///
    /// # Example
    ///
    /// ```
    /// use bootlog::{FormatStyle, Formatter};
    ///
    /// let formatter = Formatter::new("{levelname:<8} {message}", None, FormatStyle::Brace).unwrap();
    /// assert_eq!(formatter.fields().collect::<Vec<_>>(), ["levelname", "message"]);
    ///
    /// assert!(Formatter::new("%(message", None, FormatStyle::Percent).is_err());
    /// ```
    pub fn new(template: &str, date_format: Option<&str>, style: FormatStyle) -> Result<Self> {
        let segments = match style {
            FormatStyle::Percent => parse_percent(template)?,
            FormatStyle::Brace => parse_brace(template)?,
            FormatStyle::Dollar => parse_dollar(template)?,
        };
        if !segments.iter().any(|s| matches!(s, Segment::Field { .. })) {
            return Err(LoggerError::formatter(
                style.symbol(),
                format!("template '{}' has no placeholders", template),
            ));
        }
        if let Some(date_format) = date_format {
            validate_date_format(date_format)?;
        }

        Ok(Self {
            template: template.to_string(),
            style,
            date_format: date_format.map(str::to_string),
            segments,
        })
    }

    /// Formatter used by every sink before configuration
    pub fn bootstrap() -> Self {
        Self {
            template: BOOTSTRAP_TEMPLATE.to_string(),
            style: FormatStyle::Percent,
            date_format: None,
            segments: vec![
                Segment::field("asctime"),
                Segment::Literal(" (preconfig) : ".to_string()),
                Segment::field("levelname"),
                Segment::Literal(" - ".to_string()),
                Segment::field("message"),
            ],
        }
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    pub fn style(&self) -> FormatStyle {
        self.style
    }

    pub fn date_format(&self) -> Option<&str> {
        self.date_format.as_deref()
    }

    /// Placeholder names in template order
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|segment| match segment {
            Segment::Field { key, .. } => Some(key.as_str()),
            Segment::Literal(_) => None,
        })
    }

    /// Reject placeholders that neither the record nor `extra_keys` provide
    pub fn validate_fields<'a, I>(&self, extra_keys: I) -> Result<()>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let extra: Vec<&str> = extra_keys.into_iter().collect();
        for key in self.fields() {
            if !RECORD_FIELDS.contains(&key) && !extra.contains(&key) {
                return Err(LoggerError::formatter(
                    self.style.symbol(),
                    format!("unknown placeholder '{}'", key),
                ));
            }
        }
        Ok(())
    }

    /// Render one record; exception text follows on its own lines
    pub fn format(&self, record: &LogRecord) -> String {
        let mut out = String::with_capacity(128);
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Field { key, spec } => {
                    if let Some(value) = self.lookup(record, key) {
                        out.push_str(&render(&value, spec));
                    }
                }
            }
        }
        if let Some(ref exception) = record.exception {
            out.push('\n');
            out.push_str(exception.trim_end_matches('\n'));
        }
        out
    }

    /// Local-time `asctime` for a record
    pub fn format_time(&self, record: &LogRecord) -> String {
        let local = record.timestamp.with_timezone(&Local);
        let mut out = String::with_capacity(32);
        // date formats are validated in `new`, so these writes cannot fail
        let _ = match self.date_format {
            Some(ref date_format) => write!(out, "{}", local.format(date_format)),
            None => write!(
                out,
                "{},{:03}",
                local.format("%Y-%m-%d %H:%M:%S"),
                local.timestamp_subsec_millis()
            ),
        };
        out
    }

    fn lookup<'a>(&self, record: &'a LogRecord, key: &str) -> Option<Value<'a>> {
        let value = match key {
            "name" => Value::Str(Cow::Borrowed(&record.logger)),
            "levelname" => Value::Str(Cow::Borrowed(&record.level_name)),
            "levelno" => Value::Int(i64::from(record.level.rank())),
            "message" => Value::Str(Cow::Borrowed(&record.message)),
            "asctime" => Value::Str(Cow::Owned(self.format_time(record))),
            "created" => Value::Float(record.timestamp.timestamp_micros() as f64 / 1_000_000.0),
            "msecs" => Value::Float(f64::from(record.timestamp.timestamp_subsec_micros()) / 1000.0),
            "pathname" => Value::Str(Cow::Borrowed(&record.location.file)),
            "filename" => Value::Str(Cow::Borrowed(record.location.file_name())),
            "module" => Value::Str(Cow::Borrowed(record.location.module())),
            "lineno" => Value::Int(i64::from(record.location.line)),
            "funcName" => Value::Str(Cow::Borrowed(&record.location.function)),
            "thread" => Value::Str(Cow::Borrowed(&record.thread_id)),
            "threadName" => Value::Str(Cow::Borrowed(
                record.thread_name.as_deref().unwrap_or(&record.thread_id),
            )),
            "process" => Value::Int(i64::from(record.process_id)),
            other => match record.context.get(other)? {
                FieldValue::String(s) => Value::Str(Cow::Borrowed(s)),
                FieldValue::Int(i) => Value::Int(*i),
                FieldValue::Float(f) => Value::Float(*f),
                FieldValue::Bool(b) => Value::Str(Cow::Owned(b.to_string())),
                FieldValue::Null => Value::Str(Cow::Borrowed("null")),
            },
        };
        Some(value)
    }
}

fn validate_date_format(date_format: &str) -> Result<()> {
    if StrftimeItems::new(date_format).any(|item| matches!(item, Item::Error)) {
        return Err(LoggerError::formatter(
            "date",
            format!("invalid strftime format '{}'", date_format),
        ));
    }
    Ok(())
}

fn render(value: &Value<'_>, spec: &FieldSpec) -> String {
    let body = match (spec.conversion, value) {
        (Conversion::Float, Value::Float(f)) => format!("{:.*}", spec.precision.unwrap_or(6), f),
        (Conversion::Float, Value::Int(i)) => {
            format!("{:.*}", spec.precision.unwrap_or(6), *i as f64)
        }
        (Conversion::Int, Value::Float(f)) => (f.trunc() as i64).to_string(),
        (Conversion::Repr, v) => format!("{:?}", v.plain()),
        (Conversion::Str, Value::Float(f)) if spec.precision.is_some() => {
            format!("{:.*}", spec.precision.unwrap_or(6), f)
        }
        (Conversion::Str, Value::Str(s)) if spec.precision.is_some() => {
            s.chars().take(spec.precision.unwrap_or(usize::MAX)).collect()
        }
        (_, v) => v.plain().into_owned(),
    };

    let width = match spec.width {
        Some(width) => width,
        None => return body,
    };
    let len = body.chars().count();
    if len >= width {
        return body;
    }

    let pad = width - len;
    let align = spec.align.unwrap_or(if value.is_numeric() {
        Align::Right
    } else {
        Align::Left
    });
    let fill = |n: usize| std::iter::repeat(spec.fill).take(n).collect::<String>();
    match align {
        Align::Left => format!("{}{}", body, fill(pad)),
        Align::Right => format!("{}{}", fill(pad), body),
        Align::Center => format!("{}{}{}", fill(pad / 2), body, fill(pad - pad / 2)),
    }
}

fn take_number<I: Iterator<Item = char>>(chars: &mut std::iter::Peekable<I>) -> Option<usize> {
    let mut digits = String::new();
    while let Some(c) = chars.peek().copied().filter(char::is_ascii_digit) {
        digits.push(c);
        chars.next();
    }
    digits.parse().ok()
}

fn flush_literal(literal: &mut String, segments: &mut Vec<Segment>) {
    if !literal.is_empty() {
        segments.push(Segment::Literal(std::mem::take(literal)));
    }
}

fn parse_percent(template: &str) -> Result<Vec<Segment>> {
    let err = |message: String| LoggerError::formatter("%", message);
    let mut segments = Vec::new();
    let mut literal = String::new();
    let mut chars = template.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '%' {
            literal.push(c);
            continue;
        }
        match chars.next() {
            Some('%') => literal.push('%'),
            Some('(') => {
                let mut key = String::new();
                loop {
                    match chars.next() {
                        Some(')') => break,
                        Some(ch) => key.push(ch),
                        None => return Err(err(format!("unterminated placeholder '%({}'", key))),
                    }
                }
                if key.is_empty() {
                    return Err(err("empty placeholder '%()'".to_string()));
                }

                let mut spec = FieldSpec {
                    align: Some(Align::Right),
                    ..FieldSpec::default()
                };
                while let Some(&flag) = chars.peek() {
                    match flag {
                        '-' => spec.align = Some(Align::Left),
                        '0' => spec.fill = '0',
                        ' ' | '+' | '#' => {}
                        _ => break,
                    }
                    chars.next();
                }
                if spec.align == Some(Align::Left) {
                    spec.fill = ' ';
                }
                spec.width = take_number(&mut chars);
                if chars.peek() == Some(&'.') {
                    chars.next();
                    spec.precision = Some(take_number(&mut chars).unwrap_or(0));
                }
                spec.conversion = match chars.next() {
                    Some('s') => Conversion::Str,
                    Some('r') | Some('a') => Conversion::Repr,
                    Some('d') | Some('i') | Some('u') => Conversion::Int,
                    Some('f') | Some('F') | Some('e') | Some('E') | Some('g') | Some('G') => {
                        Conversion::Float
                    }
                    other => {
                        return Err(err(format!(
                            "unsupported conversion {:?} for placeholder '{}'",
                            other, key
                        )))
                    }
                };

                flush_literal(&mut literal, &mut segments);
                segments.push(Segment::Field { key, spec });
            }
            other => {
                return Err(err(format!(
                    "expected '(' or '%' after '%', found {:?}",
                    other
                )))
            }
        }
    }
    flush_literal(&mut literal, &mut segments);
    Ok(segments)
}

fn parse_brace_spec(key: &str, raw: &str) -> Result<FieldSpec> {
    let err = |message: String| LoggerError::formatter("{", message);
    let mut spec = FieldSpec::default();
    let chars: Vec<char> = raw.chars().collect();
    let to_align = |c: char| match c {
        '<' => Some(Align::Left),
        '>' | '=' => Some(Align::Right),
        '^' => Some(Align::Center),
        _ => None,
    };

    let mut rest = &chars[..];
    if rest.len() >= 2 && to_align(rest[1]).is_some() {
        spec.fill = rest[0];
        spec.align = to_align(rest[1]);
        rest = &rest[2..];
    } else if let Some(align) = rest.first().copied().and_then(to_align) {
        spec.align = Some(align);
        rest = &rest[1..];
    }

    let mut it = rest.iter().copied().peekable();
    if it.peek() == Some(&'0') {
        it.next();
        if spec.align.is_none() {
            spec.fill = '0';
            spec.align = Some(Align::Right);
        }
    }
    spec.width = take_number(&mut it);
    if it.peek() == Some(&'.') {
        it.next();
        spec.precision = Some(take_number(&mut it).unwrap_or(0));
    }
    spec.conversion = match it.next() {
        None | Some('s') => Conversion::Str,
        Some('d') => Conversion::Int,
        Some('f') | Some('F') | Some('e') | Some('E') | Some('g') | Some('G') => Conversion::Float,
        Some(other) => {
            return Err(err(format!(
                "unsupported format type '{}' for placeholder '{}'",
                other, key
            )))
        }
    };
    if let Some(extra) = it.next() {
        return Err(err(format!(
            "unexpected '{}' in format spec for placeholder '{}'",
            extra, key
        )));
    }
    Ok(spec)
}

fn parse_brace(template: &str) -> Result<Vec<Segment>> {
    let err = |message: String| LoggerError::formatter("{", message);
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
            '}' => return Err(err("single '}' encountered in template".to_string())),
            '{' => {
                let mut body = String::new();
                loop {
                    match chars.next() {
                        Some('}') => break,
                        Some(ch) => body.push(ch),
                        None => return Err(err(format!("unterminated placeholder '{{{}'", body))),
                    }
                }
                let (head, raw_spec) = body.split_once(':').unwrap_or((body.as_str(), ""));
                let (key, repr) = match head.split_once('!') {
                    Some((key, "r")) | Some((key, "a")) => (key, true),
                    Some((key, "s")) => (key, false),
                    Some((_, conv)) => {
                        return Err(err(format!("unsupported conversion '!{}'", conv)))
                    }
                    None => (head, false),
                };
                if key.is_empty() {
                    return Err(err("positional placeholders '{}' are not supported".to_string()));
                }
                let mut spec = parse_brace_spec(key, raw_spec)?;
                if repr {
                    spec.conversion = Conversion::Repr;
                }

                flush_literal(&mut literal, &mut segments);
                segments.push(Segment::Field {
                    key: key.to_string(),
                    spec,
                });
            }
            _ => literal.push(c),
        }
    }
    flush_literal(&mut literal, &mut segments);
    Ok(segments)
}

fn parse_dollar(template: &str) -> Result<Vec<Segment>> {
    let err = |message: String| LoggerError::formatter("$", message);
    let is_start = |c: &char| c.is_ascii_alphabetic() || *c == '_';
    let is_ident = |c: &char| c.is_ascii_alphanumeric() || *c == '_';
    let mut segments = Vec::new();
    let mut literal = String::new();
    let mut chars = template.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '$' {
            literal.push(c);
            continue;
        }
        let key = match chars.peek().copied() {
            Some('$') => {
                chars.next();
                literal.push('$');
                continue;
            }
            Some('{') => {
                chars.next();
                let mut key = String::new();
                loop {
                    match chars.next() {
                        Some('}') => break,
                        Some(ch) => key.push(ch),
                        None => return Err(err(format!("unterminated placeholder '${{{}'", key))),
                    }
                }
                key
            }
            Some(ch) if is_start(&ch) => {
                let mut key = String::new();
                while let Some(ch) = chars.peek().copied().filter(is_ident) {
                    key.push(ch);
                    chars.next();
                }
                key
            }
            other => return Err(err(format!("invalid placeholder after '$': {:?}", other))),
        };
        if key.is_empty() || !key.chars().all(|c| is_ident(&c)) {
            return Err(err(format!("invalid placeholder name '{}'", key)));
        }

        flush_literal(&mut literal, &mut segments);
        segments.push(Segment::Field {
            key,
            spec: FieldSpec::default(),
        });
    }
    flush_literal(&mut literal, &mut segments);
    Ok(segments)
}
