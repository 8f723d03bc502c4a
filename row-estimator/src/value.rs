//! The in-memory values that get sized
//!
//! Values are owned trees, so a value can never contain itself. This lets
//! the size approximator recurse without tracking which values it has
//! already visited.

use itertools::Itertools;

/// A single value pulled out of a sampled row
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// A missing value
    Null,
    /// A scalar in its minimal textual form
    Scalar(String),
    /// An ordered list of values
    List(Vec<Value>),
    /// A set of values
    Set(Vec<Value>),
    /// A fixed size tuple of values
    Tuple(Vec<Value>),
    /// A map of keys to values
    Map(Vec<(Value, Value)>),
}

impl Value {
    /// Build a scalar from anything that can be displayed
    ///
    /// # Arguments
    ///
    /// * `scalar` - The scalar to render as text
    pub fn scalar<T: std::fmt::Display>(scalar: T) -> Self {
        Value::Scalar(scalar.to_string())
    }

    /// Check if this value holds other values
    pub fn is_composite(&self) -> bool {
        matches!(
            self,
            Value::List(_) | Value::Set(_) | Value::Tuple(_) | Value::Map(_)
        )
    }
}

impl std::fmt::Display for Value {
    /// Render this value as the text a column holding it prints as
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Scalar(text) => write!(f, "{text}"),
            Value::List(items) => write!(f, "[{}]", items.iter().format(", ")),
            Value::Set(items) => write!(f, "{{{}}}", items.iter().format(", ")),
            Value::Tuple(items) => write!(f, "({})", items.iter().format(", ")),
            Value::Map(entries) => write!(
                f,
                "{{{}}}",
                entries
                    .iter()
                    .format_with(", ", |(key, value), f| f(&format_args!("{key}: {value}")))
            ),
        }
    }
}

impl From<&str> for Value {
    fn from(text: &str) -> Self {
        Value::Scalar(text.to_owned())
    }
}

impl From<String> for Value {
    fn from(text: String) -> Self {
        Value::Scalar(text)
    }
}

impl From<i64> for Value {
    fn from(num: i64) -> Self {
        Value::scalar(num)
    }
}

impl From<i32> for Value {
    fn from(num: i32) -> Self {
        Value::scalar(num)
    }
}

impl From<f64> for Value {
    fn from(num: f64) -> Self {
        Value::scalar(num)
    }
}

impl From<bool> for Value {
    fn from(flag: bool) -> Self {
        Value::scalar(flag)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(maybe: Option<T>) -> Self {
        maybe.map_or(Value::Null, Into::into)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::List(items.into_iter().map(Into::into).collect())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn renders_as_text() {
        assert_eq!(Value::Null.to_string(), "null");
        assert_eq!(Value::from(vec![1_i64, 2]).to_string(), "[1, 2]");
        assert_eq!(
            Value::Set(vec![Value::from("a"), Value::from("b")]).to_string(),
            "{a, b}"
        );
        assert_eq!(
            Value::Tuple(vec![Value::from(true), Value::Null]).to_string(),
            "(true, null)"
        );
        assert_eq!(
            Value::Map(vec![(Value::from("k"), Value::from(vec![1_i64]))]).to_string(),
            "{k: [1]}"
        );
        assert_eq!(Value::List(Vec::new()).to_string(), "[]");
    }
}
