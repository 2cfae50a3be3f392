use std::fmt;
use std::str::FromStr;

use crate::error::PluginError;
use crate::value::Value;

/// Declared column type of a field mapping.
///
/// The closed set accepted by field definitions. An undeclared type keeps the
/// value's native representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetType {
    Int,
    Float,
    String,
}

impl TargetType {
    pub fn name(self) -> &'static str {
        match self {
            TargetType::Int => "int",
            TargetType::Float => "float",
            TargetType::String => "string",
        }
    }

    /// Convert `value` to this type.
    pub fn coerce(self, value: &Value) -> Result<Value, PluginError> {
        let converted = match (value, self) {
            (Value::Int(i), TargetType::Int) => Some(Value::Int(*i)),
            (Value::Int(i), TargetType::Float) => Some(Value::Float(*i as f64)),
            (Value::Int(i), TargetType::String) => Some(Value::Text(i.to_string())),

            // `as` truncates toward zero and saturates at the i64 range.
            (Value::Float(x), TargetType::Int) => Some(Value::Int(*x as i64)),
            (Value::Float(x), TargetType::Float) => Some(Value::Float(*x)),
            (Value::Float(x), TargetType::String) => Some(Value::Text(x.to_string())),

            (Value::Text(s), TargetType::Int) => parse_int(s).map(Value::Int),
            (Value::Text(s), TargetType::Float) => s.parse::<f64>().ok().map(Value::Float),
            (Value::Text(s), TargetType::String) => Some(Value::Text(s.clone())),

            (Value::Bool(b), TargetType::Int) => Some(Value::Int(i64::from(*b))),
            (Value::Bool(b), TargetType::Float) => Some(Value::Float(if *b { 1.0 } else { 0.0 })),
            (Value::Bool(b), TargetType::String) => {
                Some(Value::Text(if *b { "1" } else { "0" }.to_string()))
            }

            _ => None,
        };

        converted.ok_or_else(|| {
            PluginError::conversion(format!(
                "cannot convert {} value `{value}` to {}",
                value.kind(),
                self.name()
            ))
        })
    }
}

impl FromStr for TargetType {
    type Err = PluginError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "int" => Ok(TargetType::Int),
            "float" => Ok(TargetType::Float),
            "string" => Ok(TargetType::String),
            other => Err(PluginError::conversion(format!("unknown type `{other}`"))),
        }
    }
}

impl fmt::Display for TargetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Convert `value` to the type named by `target`.
///
/// An empty `target` returns the value unchanged. Any other name must be one
/// of `int`, `float`, `string`.
pub fn convert(value: &Value, target: &str) -> Result<Value, PluginError> {
    if target.is_empty() {
        return Ok(value.clone());
    }
    let ty: TargetType = target
        .parse()
        .map_err(|e: PluginError| e.with_context(format!("converting `{value}`")))?;
    ty.coerce(value)
}

/// Same as [`convert`] with an already validated, optional type.
pub fn coerce_opt(value: &Value, ty: Option<TargetType>) -> Result<Value, PluginError> {
    match ty {
        Some(ty) => ty.coerce(value),
        None => Ok(value.clone()),
    }
}

/// Signed integer with an optional base prefix: `0x`, `0o`, `0b`, or a
/// leading `0` for octal.
fn parse_int(s: &str) -> Option<i64> {
    let (negative, digits) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };

    let (radix, body) = if let Some(rest) = strip_prefix_ci(digits, "0x") {
        (16, rest)
    } else if let Some(rest) = strip_prefix_ci(digits, "0o") {
        (8, rest)
    } else if let Some(rest) = strip_prefix_ci(digits, "0b") {
        (2, rest)
    } else if digits.len() > 1 && digits.starts_with('0') {
        (8, &digits[1..])
    } else {
        (10, digits)
    };

    // from_str_radix accepts its own sign; a second one is not a number.
    if body.is_empty() || body.starts_with(['+', '-']) {
        return None;
    }

    let magnitude = i128::from(u64::from_str_radix(body, radix).ok()?);
    let signed = if negative { -magnitude } else { magnitude };
    i64::try_from(signed).ok()
}

fn strip_prefix_ci<'a>(s: &'a str, prefix: &str) -> Option<&'a str> {
    let head = s.get(..prefix.len())?;
    if head.eq_ignore_ascii_case(prefix) {
        s.get(prefix.len()..)
    } else {
        None
    }
}
