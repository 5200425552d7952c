//! Tagged value parsing (`key = [Type] value`).
//!
//! A value that starts with a bracketed type name is converted into a
//! [`TypedValue`]. Conversion failures never propagate: the property simply
//! ends up without a typed entry.

use std::fmt;
use std::sync::LazyLock;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, TimeZone, Utc};
use regex_lite::Regex;
use serde::Serialize;

use crate::error::CoercionError;

/// Date-time layout for `[Date]` values containing a `T`.
pub const DATE_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%z";
/// Date-only layout for `[Date]` values.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

static TAGGED_VALUE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\[([^\]]+)\](.+)$").expect("tagged value pattern is valid")
});

/// Closed set of recognised type tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TypeTag {
    String,
    Integer,
    Short,
    Long,
    Byte,
    Float,
    Double,
    Boolean,
    Date,
    #[serde(rename = "ArrayList<String>")]
    StringList,
    #[serde(rename = "ArrayList<Integer>")]
    IntegerList,
}

impl TypeTag {
    /// Parse a tag name, ignoring case and surrounding whitespace.
    pub fn parse(name: &str) -> Option<Self> {
        let lowered = name.trim().to_lowercase();
        let tag = match lowered.as_str() {
            "string" => TypeTag::String,
            "integer" => TypeTag::Integer,
            "short" => TypeTag::Short,
            "long" => TypeTag::Long,
            "byte" => TypeTag::Byte,
            "float" => TypeTag::Float,
            "double" => TypeTag::Double,
            "boolean" => TypeTag::Boolean,
            "date" => TypeTag::Date,
            "arraylist<string>" => TypeTag::StringList,
            "arraylist<integer>" => TypeTag::IntegerList,
            _ => return None,
        };
        Some(tag)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TypeTag::String => "String",
            TypeTag::Integer => "Integer",
            TypeTag::Short => "Short",
            TypeTag::Long => "Long",
            TypeTag::Byte => "Byte",
            TypeTag::Float => "Float",
            TypeTag::Double => "Double",
            TypeTag::Boolean => "Boolean",
            TypeTag::Date => "Date",
            TypeTag::StringList => "ArrayList<String>",
            TypeTag::IntegerList => "ArrayList<Integer>",
        }
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A converted property value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum TypedValue {
    String(String),
    Integer(i32),
    Short(i16),
    Long(i64),
    Byte(i8),
    Float(f32),
    Double(f64),
    Boolean(bool),
    Date(DateTime<FixedOffset>),
    StringList(Vec<String>),
    IntegerList(Vec<i32>),
}

impl TypedValue {
    pub fn tag(&self) -> TypeTag {
        match self {
            TypedValue::String(_) => TypeTag::String,
            TypedValue::Integer(_) => TypeTag::Integer,
            TypedValue::Short(_) => TypeTag::Short,
            TypedValue::Long(_) => TypeTag::Long,
            TypedValue::Byte(_) => TypeTag::Byte,
            TypedValue::Float(_) => TypeTag::Float,
            TypedValue::Double(_) => TypeTag::Double,
            TypedValue::Boolean(_) => TypeTag::Boolean,
            TypedValue::Date(_) => TypeTag::Date,
            TypedValue::StringList(_) => TypeTag::StringList,
            TypedValue::IntegerList(_) => TypeTag::IntegerList,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            TypedValue::String(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i32> {
        match self {
            TypedValue::Integer(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_short(&self) -> Option<i16> {
        match self {
            TypedValue::Short(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_long(&self) -> Option<i64> {
        match self {
            TypedValue::Long(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_byte(&self) -> Option<i8> {
        match self {
            TypedValue::Byte(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f32> {
        match self {
            TypedValue::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_double(&self) -> Option<f64> {
        match self {
            TypedValue::Double(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_boolean(&self) -> Option<bool> {
        match self {
            TypedValue::Boolean(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<DateTime<FixedOffset>> {
        match self {
            TypedValue::Date(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_string_list(&self) -> Option<&[String]> {
        match self {
            TypedValue::StringList(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_integer_list(&self) -> Option<&[i32]> {
        match self {
            TypedValue::IntegerList(v) => Some(v),
            _ => None,
        }
    }
}

impl TypedValue {
    /// True when [`Display`](fmt::Display) output converts back to this value.
    ///
    /// List elements are split on `,` and trimmed, so string elements that
    /// contain a comma or carry surrounding whitespace have no text form, and
    /// neither does an empty list.
    pub fn has_text_form(&self) -> bool {
        match self {
            TypedValue::StringList(items) => {
                !items.is_empty()
                    && items
                        .iter()
                        .all(|item| !item.contains(',') && item.trim() == item)
            }
            TypedValue::IntegerList(items) => !items.is_empty(),
            _ => true,
        }
    }
}

/// Renders the raw text that parses back to the same value under its tag.
///
/// Holds only for values where [`TypedValue::has_text_form`] is true.
impl fmt::Display for TypedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypedValue::String(v) => f.write_str(v),
            TypedValue::Integer(v) => write!(f, "{v}"),
            TypedValue::Short(v) => write!(f, "{v}"),
            TypedValue::Long(v) => write!(f, "{v}"),
            TypedValue::Byte(v) => write!(f, "{v}"),
            TypedValue::Float(v) => write!(f, "{v}"),
            TypedValue::Double(v) => write!(f, "{v}"),
            TypedValue::Boolean(v) => write!(f, "{v}"),
            TypedValue::Date(v) => write!(f, "{}", v.format(DATE_TIME_FORMAT)),
            TypedValue::StringList(v) => f.write_str(&v.join(", ")),
            TypedValue::IntegerList(v) => {
                let parts: Vec<String> = v.iter().map(|n| n.to_string()).collect();
                f.write_str(&parts.join(", "))
            }
        }
    }
}

impl From<String> for TypedValue {
    fn from(v: String) -> Self {
        TypedValue::String(v)
    }
}

impl From<&str> for TypedValue {
    fn from(v: &str) -> Self {
        TypedValue::String(v.to_string())
    }
}

impl From<i32> for TypedValue {
    fn from(v: i32) -> Self {
        TypedValue::Integer(v)
    }
}

impl From<i16> for TypedValue {
    fn from(v: i16) -> Self {
        TypedValue::Short(v)
    }
}

impl From<i64> for TypedValue {
    fn from(v: i64) -> Self {
        TypedValue::Long(v)
    }
}

impl From<i8> for TypedValue {
    fn from(v: i8) -> Self {
        TypedValue::Byte(v)
    }
}

impl From<f32> for TypedValue {
    fn from(v: f32) -> Self {
        TypedValue::Float(v)
    }
}

impl From<f64> for TypedValue {
    fn from(v: f64) -> Self {
        TypedValue::Double(v)
    }
}

impl From<bool> for TypedValue {
    fn from(v: bool) -> Self {
        TypedValue::Boolean(v)
    }
}

impl From<DateTime<FixedOffset>> for TypedValue {
    fn from(v: DateTime<FixedOffset>) -> Self {
        TypedValue::Date(v)
    }
}

impl From<Vec<String>> for TypedValue {
    fn from(v: Vec<String>) -> Self {
        TypedValue::StringList(v)
    }
}

impl From<Vec<i32>> for TypedValue {
    fn from(v: Vec<i32>) -> Self {
        TypedValue::IntegerList(v)
    }
}

/// Outcome of coercing one raw property value.
#[derive(Debug, Clone, PartialEq)]
pub struct Coerced {
    /// Text to store as the raw string value.
    pub raw: String,
    /// Typed entry, absent when untyped or conversion failed.
    pub typed: Option<TypedValue>,
    /// Why conversion failed, for diagnostics.
    pub error: Option<CoercionError>,
}

/// Split `[Tag] remainder` into its tag name and trimmed remainder.
pub fn split_tag(value: &str) -> Option<(&str, &str)> {
    let captures = TAGGED_VALUE.captures(value)?;
    let tag = captures.get(1)?.as_str();
    let remainder = captures.get(2)?.as_str().trim();
    Some((tag, remainder))
}

/// Coerce a raw (already trimmed) property value.
///
/// With `extended_syntax` off no typed entries are produced and the raw text
/// is kept unchanged.
pub fn coerce(value: &str, extended_syntax: bool) -> Coerced {
    if !extended_syntax {
        return Coerced {
            raw: value.to_string(),
            typed: None,
            error: None,
        };
    }

    let Some((tag_name, remainder)) = split_tag(value) else {
        return Coerced {
            raw: value.to_string(),
            typed: Some(TypedValue::String(value.to_string())),
            error: None,
        };
    };

    let Some(tag) = TypeTag::parse(tag_name) else {
        return Coerced {
            raw: value.to_string(),
            typed: None,
            error: Some(CoercionError::UnknownTag(tag_name.to_string())),
        };
    };

    match convert(tag, remainder) {
        Ok(typed) => Coerced {
            raw: remainder.to_string(),
            typed: Some(typed),
            error: None,
        },
        Err(error) => Coerced {
            raw: remainder.to_string(),
            typed: None,
            error: Some(error),
        },
    }
}

fn parse_number<T: std::str::FromStr>(tag: TypeTag, value: &str) -> Result<T, CoercionError> {
    value.parse::<T>().map_err(|_| CoercionError::InvalidNumber {
        tag: tag.to_string(),
        value: value.to_string(),
    })
}

/// Decimal text with an optional `f`/`d` suffix. Non-finite spellings such
/// as `inf` or `NaN` are rejected.
fn parse_decimal<T>(tag: TypeTag, value: &str) -> Result<T, CoercionError>
where
    T: std::str::FromStr + Into<f64> + Copy,
{
    let invalid = || CoercionError::InvalidNumber {
        tag: tag.to_string(),
        value: value.to_string(),
    };
    let digits = value
        .strip_suffix(['f', 'F', 'd', 'D'])
        .unwrap_or(value);
    if !digits.bytes().any(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    let parsed = digits.parse::<T>().map_err(|_| invalid())?;
    if parsed.into().is_finite() {
        Ok(parsed)
    } else {
        Err(invalid())
    }
}

fn parse_date(value: &str) -> Result<DateTime<FixedOffset>, CoercionError> {
    if value.contains('T') {
        return DateTime::parse_from_str(value, DATE_TIME_FORMAT).map_err(|_| {
            CoercionError::InvalidDate {
                value: value.to_string(),
                format: DATE_TIME_FORMAT,
            }
        });
    }

    let date =
        NaiveDate::parse_from_str(value, DATE_FORMAT).map_err(|_| CoercionError::InvalidDate {
            value: value.to_string(),
            format: DATE_FORMAT,
        })?;
    let midnight = date.and_time(NaiveTime::MIN);
    Ok(Utc.from_utc_datetime(&midnight).fixed_offset())
}

/// Convert `value` to the type named by `tag`.
pub fn convert(tag: TypeTag, value: &str) -> Result<TypedValue, CoercionError> {
    let typed = match tag {
        TypeTag::String => TypedValue::String(value.to_string()),
        TypeTag::Integer => TypedValue::Integer(parse_number(tag, value)?),
        TypeTag::Short => TypedValue::Short(parse_number(tag, value)?),
        TypeTag::Long => TypedValue::Long(parse_number(tag, value)?),
        TypeTag::Byte => TypedValue::Byte(parse_number(tag, value)?),
        TypeTag::Float => TypedValue::Float(parse_decimal(tag, value)?),
        TypeTag::Double => TypedValue::Double(parse_decimal(tag, value)?),
        TypeTag::Boolean => {
            if value.eq_ignore_ascii_case("true") {
                TypedValue::Boolean(true)
            } else if value.eq_ignore_ascii_case("false") {
                TypedValue::Boolean(false)
            } else {
                return Err(CoercionError::InvalidBoolean(value.to_string()));
            }
        }
        TypeTag::Date => TypedValue::Date(parse_date(value)?),
        TypeTag::StringList => {
            TypedValue::StringList(value.split(',').map(|s| s.trim().to_string()).collect())
        }
        TypeTag::IntegerList => {
            let mut items = Vec::new();
            for element in value.split(',') {
                let element = element.trim();
                let parsed = element
                    .parse::<i32>()
                    .map_err(|_| CoercionError::InvalidList {
                        element: element.to_string(),
                    })?;
                items.push(parsed);
            }
            TypedValue::IntegerList(items)
        }
    };
    Ok(typed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_untagged_is_string() {
        let coerced = coerce("plain value", true);
        assert_eq!(coerced.raw, "plain value");
        assert_eq!(
            coerced.typed,
            Some(TypedValue::String("plain value".to_string()))
        );
    }

    #[test]
    fn test_integer_tag_strips_raw() {
        let coerced = coerce("[Integer] 123", true);
        assert_eq!(coerced.raw, "123");
        assert_eq!(coerced.typed, Some(TypedValue::Integer(123)));
    }

    #[test]
    fn test_tag_is_case_insensitive() {
        assert_eq!(coerce("[LONG]12345678901", true).typed, Some(TypedValue::Long(12345678901)));
        assert_eq!(coerce("[short] 321", true).typed, Some(TypedValue::Short(321)));
        assert_eq!(coerce("[bYtE] 27", true).typed, Some(TypedValue::Byte(27)));
    }

    #[test]
    fn test_sized_integers_reject_overflow() {
        let coerced = coerce("[Byte] 300", true);
        assert_eq!(coerced.typed, None);
        assert_eq!(coerced.raw, "300");
        assert!(matches!(coerced.error, Some(CoercionError::InvalidNumber { .. })));
    }

    #[test]
    fn test_floats() {
        assert_eq!(coerce("[Float] 123.456", true).typed, Some(TypedValue::Float(123.456)));
        assert_eq!(coerce("[Double] 234.567", true).typed, Some(TypedValue::Double(234.567)));
    }

    #[test]
    fn test_float_suffixes_and_non_finite() {
        assert_eq!(coerce("[Float] 1.5f", true).typed, Some(TypedValue::Float(1.5)));
        assert_eq!(coerce("[Double] 2.5D", true).typed, Some(TypedValue::Double(2.5)));
        assert_eq!(coerce("[Double] -3e2d", true).typed, Some(TypedValue::Double(-300.0)));

        for text in ["[Double] inf", "[Float] -Infinity", "[Double] NaN", "[Double] 1e999", "[Float] f"] {
            let coerced = coerce(text, true);
            assert_eq!(coerced.typed, None, "{text}");
            assert!(matches!(coerced.error, Some(CoercionError::InvalidNumber { .. })));
        }
    }

    #[test]
    fn test_boolean_strict() {
        assert_eq!(coerce("[Boolean] TRUE", true).typed, Some(TypedValue::Boolean(true)));
        assert_eq!(coerce("[Boolean] false", true).typed, Some(TypedValue::Boolean(false)));

        let maybe = coerce("[Boolean] maybe", true);
        assert_eq!(maybe.typed, None);
        assert_eq!(maybe.raw, "maybe");
        assert_eq!(
            maybe.error,
            Some(CoercionError::InvalidBoolean("maybe".to_string()))
        );
    }

    #[test]
    fn test_date_time_with_offset() {
        let typed = coerce("[Date] 2001-07-04T12:08:56-0500", true).typed.unwrap();
        let expected = DateTime::parse_from_rfc3339("2001-07-04T12:08:56-05:00").unwrap();
        assert_eq!(typed, TypedValue::Date(expected));
    }

    #[test]
    fn test_date_only_is_midnight_utc() {
        let typed = coerce("[Date] 2001-07-04", true).typed.unwrap();
        let expected = DateTime::parse_from_rfc3339("2001-07-04T00:00:00+00:00").unwrap();
        assert_eq!(typed, TypedValue::Date(expected));
    }

    #[test]
    fn test_bad_date_has_no_typed_entry() {
        let coerced = coerce("[Date] 2001-07-04T12:08", true);
        assert_eq!(coerced.typed, None);
        assert!(matches!(coerced.error, Some(CoercionError::InvalidDate { .. })));
    }

    #[test]
    fn test_lists() {
        assert_eq!(
            coerce("[ArrayList<String>] string 1, string 2 ,string 3", true).typed,
            Some(TypedValue::StringList(vec![
                "string 1".to_string(),
                "string 2".to_string(),
                "string 3".to_string(),
            ]))
        );
        assert_eq!(
            coerce("[arraylist<integer>] 3, 17, 89", true).typed,
            Some(TypedValue::IntegerList(vec![3, 17, 89]))
        );
        assert_eq!(coerce("[ArrayList<Integer>] 3, x", true).typed, None);
    }

    #[test]
    fn test_unknown_tag_keeps_full_raw() {
        let coerced = coerce("[WARN] disk full", true);
        assert_eq!(coerced.raw, "[WARN] disk full");
        assert_eq!(coerced.typed, None);
        assert_eq!(
            coerced.error,
            Some(CoercionError::UnknownTag("WARN".to_string()))
        );
    }

    #[test]
    fn test_extended_syntax_disabled() {
        let coerced = coerce("[Integer] 5", false);
        assert_eq!(coerced.raw, "[Integer] 5");
        assert_eq!(coerced.typed, None);
    }

    #[test]
    fn test_display_reparses() {
        let values = [
            TypedValue::Integer(-7),
            TypedValue::Boolean(true),
            TypedValue::IntegerList(vec![1, 2]),
            TypedValue::StringList(vec!["a".to_string(), "b c".to_string()]),
            TypedValue::Date(DateTime::parse_from_rfc3339("2020-02-29T10:00:00+02:00").unwrap()),
        ];
        for value in values {
            assert!(value.has_text_form());
            let text = value.to_string();
            assert_eq!(convert(value.tag(), &text).unwrap(), value);
        }
    }

    #[test]
    fn test_lists_without_text_form() {
        let comma = TypedValue::StringList(vec!["a,b".to_string(), "c".to_string()]);
        let padded = TypedValue::StringList(vec![" c".to_string()]);
        assert!(!comma.has_text_form());
        assert!(!padded.has_text_form());
        assert!(!TypedValue::StringList(Vec::new()).has_text_form());
        assert!(!TypedValue::IntegerList(Vec::new()).has_text_form());
    }
}
