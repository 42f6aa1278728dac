//! Execution outcomes.
//!
//! Every `execute` call resolves to an [`Outcome`]; the engine never throws
//! across its public boundary. Invariant: `success == true` iff `error` is
//! absent and `result` is present.

use serde::Serialize;
use std::time::Duration;

/// Kind-tagged result value.
///
/// Kernel output in `InputForm` that maps onto JSON (numbers, strings,
/// booleans, lists) is surfaced structured; anything else is surfaced as the
/// raw rendered text.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ResultValue {
    Structured(serde_json::Value),
    Text(String),
}

impl ResultValue {
    /// Classify one rendered kernel result.
    pub fn from_rendered(text: &str) -> Self {
        match parse_input_form(text.trim()) {
            Some(value) => ResultValue::Structured(value),
            None => ResultValue::Text(text.trim().to_string()),
        }
    }
}

/// Structured result of one execution request.
#[derive(Debug, Clone, Serialize)]
pub struct Outcome {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<ResultValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Wall-clock time spent on this request, in seconds.
    #[serde(serialize_with = "serialize_secs")]
    pub elapsed: Duration,
}

impl Outcome {
    pub fn success(result: ResultValue, elapsed: Duration) -> Self {
        Self {
            success: true,
            result: Some(result),
            error: None,
            elapsed,
        }
    }

    pub fn failure(error: impl Into<String>, elapsed: Duration) -> Self {
        Self {
            success: false,
            result: None,
            error: Some(error.into()),
            elapsed,
        }
    }

    /// The engine could not provide a session at all; per contract the
    /// elapsed time reported is zero.
    pub fn unavailable(error: impl Into<String>) -> Self {
        Self::failure(error, Duration::ZERO)
    }

    pub fn timed_out(timeout: Duration, elapsed: Duration) -> Self {
        Self::failure(
            format!("evaluation timed out after {} seconds", timeout.as_secs()),
            elapsed,
        )
    }
}

fn serialize_secs<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_f64(d.as_secs_f64())
}

/// Best-effort conversion of an `InputForm` rendering into a JSON value.
///
/// Handles integers, reals, quoted strings, True/False/Null, and `{...}`
/// lists of the same. Returns None for anything richer, which the caller
/// surfaces as text instead.
fn parse_input_form(text: &str) -> Option<serde_json::Value> {
    let mut parser = InputFormParser { input: text.as_bytes(), pos: 0 };
    parser.skip_ws();
    let value = parser.value()?;
    parser.skip_ws();
    if parser.pos == parser.input.len() {
        Some(value)
    } else {
        None
    }
}

#[derive(Debug)]
struct InputFormParser<'a> {
    input: &'a [u8],
    pos: usize,
}

impl InputFormParser<'_> {
    fn skip_ws(&mut self) {
        while self.pos < self.input.len() && self.input[self.pos].is_ascii_whitespace() {
            self.pos += 1;
        }
    }

    fn peek(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    fn value(&mut self) -> Option<serde_json::Value> {
        match self.peek()? {
            b'{' => self.list(),
            b'"' => self.string(),
            b'-' | b'0'..=b'9' => self.number(),
            _ => self.symbol(),
        }
    }

    fn list(&mut self) -> Option<serde_json::Value> {
        self.pos += 1; // consume '{'
        let mut items = Vec::new();
        self.skip_ws();
        if self.peek() == Some(b'}') {
            self.pos += 1;
            return Some(serde_json::Value::Array(items));
        }
        loop {
            self.skip_ws();
            items.push(self.value()?);
            self.skip_ws();
            match self.peek()? {
                b',' => self.pos += 1,
                b'}' => {
                    self.pos += 1;
                    return Some(serde_json::Value::Array(items));
                }
                _ => return None,
            }
        }
    }

    fn string(&mut self) -> Option<serde_json::Value> {
        self.pos += 1; // consume opening quote
        let mut out = String::new();
        loop {
            match self.peek()? {
                b'"' => {
                    self.pos += 1;
                    return Some(serde_json::Value::String(out));
                }
                b'\\' => {
                    self.pos += 1;
                    match self.peek()? {
                        b'n' => out.push('\n'),
                        b't' => out.push('\t'),
                        other => out.push(other as char),
                    }
                    self.pos += 1;
                }
                _ => {
                    let start = self.pos;
                    while let Some(c) = self.peek() {
                        if c == b'"' || c == b'\\' {
                            break;
                        }
                        self.pos += 1;
                    }
                    out.push_str(std::str::from_utf8(&self.input[start..self.pos]).ok()?);
                }
            }
        }
    }

    fn number(&mut self) -> Option<serde_json::Value> {
        let start = self.pos;
        if self.peek() == Some(b'-') {
            self.pos += 1;
        }
        let mut is_float = false;
        while let Some(c) = self.peek() {
            match c {
                b'0'..=b'9' => self.pos += 1,
                b'.' | b'e' | b'E' => {
                    is_float = true;
                    self.pos += 1;
                }
                b'-' | b'+' if is_float => self.pos += 1,
                _ => break,
            }
        }
        let text = std::str::from_utf8(&self.input[start..self.pos]).ok()?;
        if is_float {
            let parsed: f64 = text.parse().ok()?;
            serde_json::Number::from_f64(parsed).map(serde_json::Value::Number)
        } else {
            let parsed: i64 = text.parse().ok()?;
            Some(serde_json::Value::Number(parsed.into()))
        }
    }

    fn symbol(&mut self) -> Option<serde_json::Value> {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c.is_ascii_alphanumeric() || c == b'$' || c == b'`' {
                self.pos += 1;
            } else {
                break;
            }
        }
        match std::str::from_utf8(&self.input[start..self.pos]).ok()? {
            "True" => Some(serde_json::Value::Bool(true)),
            "False" => Some(serde_json::Value::Bool(false)),
            "Null" => Some(serde_json::Value::Null),
            _ => None,
        }
    }
}
