//! Field extraction from reply bodies
//!
//! Replies carry data on lines introduced by a key, e.g.
//!
//! ```text
//! +CWSTATE:2,"home"
//! +CWLAP:(3,"home",-52,"aa:bb:cc:dd:ee:ff",6)
//! ```
//!
//! A [`Template`] names the key and the comma-separated fields that follow.
//! Fields after [`Template::optional`] may be missing; they come back as
//! [`Value::Undefined`]. A field list wrapped in `(` `)`, as in `+CWLAP`
//! records, is unwrapped before parsing unless the first field is text.

use super::ProtocolError;

/// Field grammar
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Signed decimal integer
    Int,
    /// `"..."` with backslash escapes
    Quoted,
    /// Free text up to the end of the line
    Text,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Field {
    kind: FieldKind,
    required: bool,
}

/// Extraction template: a line prefix and its fields
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    prefix: String,
    fields: Vec<Field>,
    required: bool,
}

impl Template {
    /// Template for lines starting with `prefix` (e.g. `"+CWMODE:"`)
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            fields: Vec::new(),
            required: true,
        }
    }

    /// Add an integer field
    pub fn int(self) -> Self {
        self.field(FieldKind::Int)
    }

    /// Add a quoted string field
    pub fn quoted(self) -> Self {
        self.field(FieldKind::Quoted)
    }

    /// Free text; consumes the rest of the line so it must come last
    pub fn text(self) -> Self {
        self.field(FieldKind::Text)
    }

    /// Every field added after this call may be absent
    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    /// Line prefix this template matches
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    fn field(mut self, kind: FieldKind) -> Self {
        self.fields.push(Field {
            kind,
            required: self.required,
        });
        self
    }

    /// Parse one line that starts with the prefix
    fn parse_line(&self, line: &str) -> Result<Vec<Value>, ProtocolError> {
        let rest = line.strip_prefix(self.prefix.as_str()).ok_or_else(|| {
            ProtocolError::malformed(format!("line {:?} lacks prefix {:?}", line, self.prefix))
        })?;

        let rest = match self.fields.first() {
            Some(field) if field.kind != FieldKind::Text => rest
                .strip_prefix('(')
                .and_then(|inner| inner.strip_suffix(')'))
                .unwrap_or(rest),
            _ => rest,
        };

        let mut values = Vec::with_capacity(self.fields.len());
        let mut scanner = Scanner { rest };

        for (idx, field) in self.fields.iter().enumerate() {
            if idx > 0 && !scanner.is_empty() {
                scanner.expect(',', &self.prefix)?;
            }

            if scanner.is_empty() || scanner.at(',') {
                if field.required {
                    return Err(ProtocolError::malformed(format!(
                        "{}: missing field {}",
                        self.prefix, idx
                    )));
                }
                values.push(Value::Undefined);
                continue;
            }

            let value = match field.kind {
                FieldKind::Int => Value::Int(scanner.int(&self.prefix)?),
                FieldKind::Quoted => Value::Str(scanner.quoted(&self.prefix)?),
                FieldKind::Text => Value::Str(scanner.take_rest().to_string()),
            };
            values.push(value);
        }

        if !scanner.is_empty() {
            return Err(ProtocolError::malformed(format!(
                "{}: unexpected trailing data {:?}",
                self.prefix, scanner.rest
            )));
        }
        Ok(values)
    }
}

struct Scanner<'a> {
    rest: &'a str,
}

impl<'a> Scanner<'a> {
    fn is_empty(&self) -> bool {
        self.rest.is_empty()
    }

    fn at(&self, c: char) -> bool {
        self.rest.starts_with(c)
    }

    fn expect(&mut self, c: char, key: &str) -> Result<(), ProtocolError> {
        match self.rest.strip_prefix(c) {
            Some(rest) => {
                self.rest = rest;
                Ok(())
            }
            None => Err(ProtocolError::malformed(format!(
                "{}: expected {:?} at {:?}",
                key, c, self.rest
            ))),
        }
    }

    fn int(&mut self, key: &str) -> Result<i64, ProtocolError> {
        let end = self.rest.find(',').unwrap_or(self.rest.len());
        let token = &self.rest[..end];
        let value = token.trim().parse::<i64>().map_err(|_| {
            ProtocolError::malformed(format!("{}: {:?} is not an integer", key, token))
        })?;
        self.rest = &self.rest[end..];
        Ok(value)
    }

    fn quoted(&mut self, key: &str) -> Result<String, ProtocolError> {
        self.expect('"', key)?;
        let rest = self.rest;
        let mut out = String::new();
        let mut chars = rest.char_indices();
        while let Some((idx, c)) = chars.next() {
            match c {
                '\\' => match chars.next() {
                    Some((_, escaped)) => out.push(escaped),
                    None => break,
                },
                '"' => {
                    self.rest = &rest[idx + 1..];
                    return Ok(out);
                }
                _ => out.push(c),
            }
        }
        Err(ProtocolError::malformed(format!(
            "{}: unterminated string",
            key
        )))
    }

    fn take_rest(&mut self) -> &'a str {
        let rest = self.rest;
        self.rest = "";
        rest
    }
}

/// An extracted field
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// Integer field
    Int(i64),
    /// String or text field, quotes and escapes removed
    Str(String),
    /// Optional field that was not present
    Undefined,
}

impl Value {
    /// Integer value, if this is one
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// String value, if this is one
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Missing optional field
    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined)
    }
}

/// Line-by-line cursor over a reply body
#[derive(Debug, Clone)]
pub struct ReplyCursor<'a> {
    body: &'a [u8],
}

impl<'a> ReplyCursor<'a> {
    /// Cursor over the lines of `body`
    pub fn new(body: &'a [u8]) -> Self {
        Self { body }
    }
}

impl<'a> Iterator for ReplyCursor<'a> {
    type Item = String;

    /// Next non-empty line, lossily decoded
    fn next(&mut self) -> Option<String> {
        while !self.body.is_empty() {
            let end = self
                .body
                .iter()
                .position(|&b| b == b'\n')
                .unwrap_or(self.body.len());
            let line = &self.body[..end];
            self.body = self.body.get(end + 1..).unwrap_or(&[]);
            let line = line.strip_suffix(b"\r").unwrap_or(line);
            if !line.is_empty() {
                return Some(String::from_utf8_lossy(line).into_owned());
            }
        }
        None
    }
}

/// Extract the fields of the first line matching the template prefix
pub fn extract(body: &[u8], template: &Template) -> Result<Vec<Value>, ProtocolError> {
    ReplyCursor::new(body)
        .find(|line| line.starts_with(template.prefix()))
        .ok_or_else(|| {
            ProtocolError::malformed(format!("no line starting with {:?}", template.prefix()))
        })
        .and_then(|line| template.parse_line(&line))
}

/// Extract every line matching the template prefix, in order
pub fn extract_all(body: &[u8], template: &Template) -> Result<Vec<Vec<Value>>, ProtocolError> {
    ReplyCursor::new(body)
        .filter(|line| line.starts_with(template.prefix()))
        .map(|line| template.parse_line(&line))
        .collect()
}

/// Closed set of named variants coded as small integers
pub trait FromCode: Sized {
    /// Map a code to a variant; unknown codes are `MalformedResponse`
    fn from_code(code: i64) -> Result<Self, ProtocolError>;
}

/// Extract a single coded field (`+CWMODE:1`) and map it through [`FromCode`]
pub fn extract_enum<T: FromCode>(body: &[u8], prefix: &str) -> Result<T, ProtocolError> {
    let values = extract(body, &Template::new(prefix).int())?;
    match values.first() {
        Some(Value::Int(code)) => T::from_code(*code),
        _ => Err(ProtocolError::malformed(format!("{}: no code", prefix))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_int() {
        let values = extract(b"\n+CWMODE:1\n", &Template::new("+CWMODE:").int()).unwrap();
        assert_eq!(values, vec![Value::Int(1)]);
    }

    #[test]
    fn test_int_and_quoted() {
        let template = Template::new("+CWSTATE:").int().quoted();
        let values = extract(b"+CWSTATE:2,\"my \\\"net\\\"\"\n", &template).unwrap();
        assert_eq!(
            values,
            vec![Value::Int(2), Value::Str("my \"net\"".to_string())]
        );
    }

    #[test]
    fn test_optional_trailing_fields() {
        let template = Template::new("+CWSTATE:").int().optional().quoted().int();
        let values = extract(b"+CWSTATE:0\n", &template).unwrap();
        assert_eq!(values, vec![Value::Int(0), Value::Undefined, Value::Undefined]);

        let values = extract(b"+CWSTATE:0,\"\"\n", &template).unwrap();
        assert_eq!(
            values,
            vec![Value::Int(0), Value::Str(String::new()), Value::Undefined]
        );
    }

    #[test]
    fn test_missing_required_field() {
        let template = Template::new("+CWSTATE:").int().quoted();
        assert!(matches!(
            extract(b"+CWSTATE:0\n", &template),
            Err(ProtocolError::MalformedResponse(_))
        ));
    }

    #[test]
    fn test_bad_integer() {
        let template = Template::new("+CWMODE:").int();
        assert!(extract(b"+CWMODE:x\n", &template).is_err());
    }

    #[test]
    fn test_trailing_data_rejected() {
        let template = Template::new("+CWMODE:").int();
        assert!(extract(b"+CWMODE:1,2\n", &template).is_err());
    }

    #[test]
    fn test_unterminated_quote() {
        let template = Template::new("+CWHOSTNAME:").quoted();
        assert!(extract(b"+CWHOSTNAME:\"esp\n", &template).is_err());
    }

    #[test]
    fn test_text_field_takes_rest() {
        let template = Template::new("+CIPSNTPTIME:").text();
        let values = extract(b"+CIPSNTPTIME:Thu Aug 04 14:48:05 2016\n", &template).unwrap();
        assert_eq!(values[0].as_str(), Some("Thu Aug 04 14:48:05 2016"));
    }

    #[test]
    fn test_cursor_skips_other_lines() {
        let body = b"AT version:2.2.0.0\n\n+CWMODE:3\n";
        let values = extract(body, &Template::new("+CWMODE:").int()).unwrap();
        assert_eq!(values[0].as_int(), Some(3));
    }

    #[test]
    fn test_extract_all() {
        let body = b"+CWLIF:\"192.168.4.2\"\n+CWLIF:\"192.168.4.3\"\n";
        let rows = extract_all(body, &Template::new("+CWLIF:").quoted()).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1][0].as_str(), Some("192.168.4.3"));
    }

    #[test]
    fn test_parenthesized_record() {
        let template = Template::new("+CWLAP:").int().quoted().int();
        let values = extract(b"+CWLAP:(3,\"home\",-52)\n", &template).unwrap();
        assert_eq!(
            values,
            vec![Value::Int(3), Value::Str("home".to_string()), Value::Int(-52)]
        );
    }

    #[test]
    fn test_unbalanced_parenthesis_rejected() {
        let template = Template::new("+CWLAP:").int().quoted().int();
        assert!(extract(b"+CWLAP:(3,\"home\",-52\n", &template).is_err());
    }

    #[test]
    fn test_text_keeps_parentheses() {
        let template = Template::new("+CWLAP:").text();
        let values = extract(b"+CWLAP:(3,\"home\")\n", &template).unwrap();
        assert_eq!(values[0].as_str(), Some("(3,\"home\")"));
    }

    #[test]
    fn test_no_matching_line() {
        assert!(extract(b"\n", &Template::new("+CWMODE:").int()).is_err());
    }
}
