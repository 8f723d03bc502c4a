//! Approximates how many bytes a value takes up

use crate::value::Value;

/// The overheads used to approximate a values footprint
///
/// The defaults follow a CPython-like object model where an empty string
/// costs 49 bytes and each additional character costs 1 byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Footprint {
    /// The cost of an empty string
    pub text_base: u64,
    /// The cost of each byte of text
    pub text_per_byte: u64,
    /// The cost of an empty list
    pub list_base: u64,
    /// The cost of an empty tuple
    pub tuple_base: u64,
    /// The cost of an empty set
    pub set_base: u64,
    /// The cost of an empty map
    pub map_base: u64,
    /// The cost of each slot in a list, tuple, or set
    pub per_item: u64,
    /// The cost of each entry in a map
    pub per_entry: u64,
}

impl Default for Footprint {
    fn default() -> Self {
        Footprint {
            text_base: 49,
            text_per_byte: 1,
            list_base: 56,
            tuple_base: 40,
            set_base: 216,
            map_base: 64,
            per_item: 8,
            per_entry: 16,
        }
    }
}

impl Footprint {
    /// Estimate the footprint of a value in bytes
    ///
    /// The empty baseline for this values kind is deducted so that an empty
    /// string or an empty collection is always 0.
    ///
    /// # Arguments
    ///
    /// * `value` - The value to estimate
    pub fn estimate(&self, value: &Value) -> u64 {
        self.deep(value).saturating_sub(self.baseline(value))
    }

    /// Estimate the footprint of some text in bytes
    ///
    /// # Arguments
    ///
    /// * `text` - The text to estimate
    pub fn estimate_text(&self, text: &str) -> u64 {
        self.text(text).saturating_sub(self.text_base)
    }

    /// Estimate a single column by the text it prints as
    ///
    /// A null column prints as `null` and collections print their elements
    /// in brackets, so `[1, 2]` costs 6.
    ///
    /// # Arguments
    ///
    /// * `value` - The column value to estimate
    pub fn estimate_column(&self, value: &Value) -> u64 {
        self.estimate_text(&value.to_string())
    }

    /// Estimate a full row by summing the estimates of each of its columns
    ///
    /// # Arguments
    ///
    /// * `row` - The values in this row
    pub fn estimate_row(&self, row: &[Value]) -> u64 {
        row.iter().map(|value| self.estimate_column(value)).sum()
    }

    /// The cost of a piece of text including its base overhead
    fn text(&self, text: &str) -> u64 {
        self.text_base + self.text_per_byte * text.len() as u64
    }

    /// The cost of an empty value of the same kind
    fn baseline(&self, value: &Value) -> u64 {
        match value {
            Value::Null | Value::Scalar(_) => self.text_base,
            Value::List(_) => self.list_base,
            Value::Tuple(_) => self.tuple_base,
            Value::Set(_) => self.set_base,
            Value::Map(_) => self.map_base,
        }
    }

    /// The cost of a value without anything it contains
    fn shallow(&self, value: &Value) -> u64 {
        match value {
            // nulls are sized like an empty string
            Value::Null => self.text_base,
            Value::Scalar(text) => self.text(text),
            Value::List(items) | Value::Tuple(items) | Value::Set(items) => {
                self.baseline(value) + self.per_item * items.len() as u64
            }
            Value::Map(entries) => self.map_base + self.per_entry * entries.len() as u64,
        }
    }

    /// The cost of a value and everything it contains
    fn deep(&self, value: &Value) -> u64 {
        // scalars have nothing to recurse into
        if !value.is_composite() {
            return self.shallow(value);
        }
        let nested: u64 = match value {
            Value::List(items) | Value::Tuple(items) | Value::Set(items) => {
                items.iter().map(|item| self.deep(item)).sum()
            }
            Value::Map(entries) => entries
                .iter()
                .map(|(key, value)| self.deep(key) + self.deep(value))
                .sum(),
            Value::Null | Value::Scalar(_) => 0,
        };
        self.shallow(value) + nested
    }
}

/// Estimate a value with the default footprint model
///
/// # Arguments
///
/// * `value` - The value to estimate
pub fn estimate(value: &Value) -> u64 {
    Footprint::default().estimate(value)
}

/// Estimate some text with the default footprint model
///
/// # Arguments
///
/// * `text` - The text to estimate
pub fn estimate_text(text: &str) -> u64 {
    Footprint::default().estimate_text(text)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn empty_is_free() {
        assert_eq!(estimate_text(""), 0);
        assert_eq!(estimate(&Value::from("")), 0);
        assert_eq!(estimate(&Value::Null), 0);
        assert_eq!(estimate(&Value::List(Vec::new())), 0);
        assert_eq!(estimate(&Value::Set(Vec::new())), 0);
        assert_eq!(estimate(&Value::Tuple(Vec::new())), 0);
        assert_eq!(estimate(&Value::Map(Vec::new())), 0);
    }

    #[test]
    fn text_grows_per_byte() {
        assert_eq!(estimate_text("1"), 1);
        assert_eq!(estimate_text("This is a simple test"), 21);
        assert!(estimate_text("ab") > estimate_text("a"));
        // multibyte characters cost their utf-8 length
        assert_eq!(estimate_text("é"), 2);
    }

    #[test]
    fn scalars_size_by_text() {
        assert_eq!(estimate(&Value::from(1_i64)), estimate_text("1"));
        assert_eq!(estimate(&Value::from(true)), estimate_text("true"));
        assert_eq!(estimate(&Value::from(-125_i32)), 4);
    }

    #[test]
    fn composites_recurse() {
        let short = Value::from(vec![1_i64, 2]);
        let long = Value::from(vec![1_i64, 2, 3]);
        assert!(estimate(&long) > estimate(&short));
        // 2 slots plus 2 nested strings of one character
        assert_eq!(estimate(&short), 2 * 8 + 2 * (49 + 1));
    }

    #[test]
    fn maps_count_keys_and_values() {
        let map = Value::Map(vec![(Value::from("k"), Value::from("vv"))]);
        assert_eq!(estimate(&map), 16 + (49 + 1) + (49 + 2));
    }

    #[test]
    fn nested_composites() {
        let inner = Value::Tuple(vec![Value::from("a")]);
        let outer = Value::List(vec![inner.clone()]);
        // the inner tuple is charged its full shallow cost when nested
        assert_eq!(estimate(&outer), 8 + (40 + 8) + (49 + 1));
        assert!(estimate(&outer) > estimate(&inner));
    }

    #[test]
    fn rows_sum_their_values() {
        let footprint = Footprint::default();
        let row = vec![Value::from(1_i64), Value::from("This is a simple test")];
        assert_eq!(footprint.estimate_row(&row), 22);
    }

    #[test]
    fn columns_size_by_printed_text() {
        let footprint = Footprint::default();
        assert_eq!(footprint.estimate_column(&Value::Null), 4);
        assert_eq!(footprint.estimate_column(&Value::from(vec![1_i64, 2])), 6);
        assert_eq!(footprint.estimate_column(&Value::List(Vec::new())), 2);
        // a row with a null and a list column
        let row = vec![Value::from("id"), Value::Null, Value::from(vec![1_i64, 2])];
        assert_eq!(footprint.estimate_row(&row), 2 + 4 + 6);
    }

    #[test]
    fn custom_model() {
        let footprint = Footprint {
            text_per_byte: 2,
            ..Footprint::default()
        };
        assert_eq!(footprint.estimate_text("abc"), 6);
    }
}
