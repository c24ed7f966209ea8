use std::fmt::{self, Write as _};

use chrono::format::{parse, Item, ParseResult, Parsed, StrftimeItems};
use chrono::NaiveDateTime;
use once_cell::sync::Lazy;
use regex::Regex;
use unicode_properties::{GeneralCategory, UnicodeGeneralCategory};

use crate::error::Error;
use crate::types::{Attribute, DType, Result};

/// Numeric literal with `_` between digit groups, e.g. `1_000.5`
static GROUPED_LITERAL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[+-]?(\d+(_\d+)*)?(\.\d+(_\d+)*)?([eE][+-]?\d+(_\d+)*)?$").unwrap()
});

/// Ideographs that carry a numeric value but are letters, not numbers
const HAN_NUMERALS: &[char] = &[
    '零', '一', '二', '三', '四', '五', '六', '七', '八', '九', '十', '廿', '卅', '卌', '百',
    '千', '万', '萬', '亿', '億', '兆', '壹', '贰', '貳', '叁', '參', '肆', '伍', '陆', '陸',
    '柒', '捌', '玖', '拾', '佰', '仟', '弌', '弍', '弎',
];

/// Reason a cell failed validation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RejectReason {
    NotANumber,
    BaseFormatMismatch,
    DesiredFormatMismatch,
    DateParseFailure,
    UnrecognizedType,
}

impl RejectReason {
    pub fn code(self) -> &'static str {
        match self {
            RejectReason::NotANumber => "not-a-number",
            RejectReason::BaseFormatMismatch => "base-format-mismatch",
            RejectReason::DesiredFormatMismatch => "desired-format-mismatch",
            RejectReason::DateParseFailure => "date-parse-failure",
            RejectReason::UnrecognizedType => "unrecognized-type",
        }
    }
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Result of validating one cell
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The cell passed; carries the value to write to the clean sink
    Accepted(String),
    Rejected(RejectReason),
}

/// A column's validation rule with its patterns compiled
#[derive(Debug, Clone)]
pub enum CellCheck {
    Integer {
        base: Option<Regex>,
        desired: Option<Regex>,
    },
    Number {
        base: Option<Regex>,
        desired: Option<Regex>,
    },
    Date {
        base: String,
        desired: String,
    },
    String {
        base: Option<Regex>,
        desired: Option<Regex>,
    },
    Unrecognized,
}

impl CellCheck {
    /// Compile the formats declared for `column`
    ///
    /// Regex patterns are used for integer, number and string columns;
    /// strftime patterns for date columns. Any pattern that cannot be
    /// compiled is a configuration error.
    pub fn compile(
        column: &str,
        dtype: &DType,
        base_format: Option<&str>,
        desired_format: Option<&str>,
    ) -> Result<Self> {
        let check = match dtype {
            DType::Integer => CellCheck::Integer {
                base: compile_full_match(column, Attribute::BaseFormat, base_format)?,
                desired: compile_full_match(column, Attribute::DesiredFormat, desired_format)?,
            },
            DType::Number => CellCheck::Number {
                base: compile_full_match(column, Attribute::BaseFormat, base_format)?,
                desired: compile_full_match(column, Attribute::DesiredFormat, desired_format)?,
            },
            DType::String => CellCheck::String {
                base: compile_full_match(column, Attribute::BaseFormat, base_format)?,
                desired: compile_full_match(column, Attribute::DesiredFormat, desired_format)?,
            },
            DType::Date => {
                let base = base_format.ok_or_else(|| Error::MissingDateFormat {
                    column: column.to_string(),
                })?;
                let desired = desired_format.unwrap_or(base);
                ensure_strftime(column, Attribute::BaseFormat, base)?;
                ensure_strftime(column, Attribute::DesiredFormat, desired)?;
                CellCheck::Date {
                    base: base.to_string(),
                    desired: desired.to_string(),
                }
            }
            DType::Unrecognized(_) => CellCheck::Unrecognized,
        };
        Ok(check)
    }

    /// Validate a raw cell value
    pub fn apply(&self, value: &str) -> Outcome {
        match self {
            CellCheck::Integer { base, desired } => {
                check_integer(value, base.as_ref(), desired.as_ref())
            }
            CellCheck::Number { base, desired } => {
                check_number(value, base.as_ref(), desired.as_ref())
            }
            CellCheck::Date { base, desired } => check_date(value, base, desired),
            CellCheck::String { base, desired } => {
                check_string(value, base.as_ref(), desired.as_ref())
            }
            CellCheck::Unrecognized => Outcome::Rejected(RejectReason::UnrecognizedType),
        }
    }
}

fn compile_full_match(
    column: &str,
    attribute: Attribute,
    pattern: Option<&str>,
) -> Result<Option<Regex>> {
    let Some(pattern) = pattern.filter(|p| !p.is_empty()) else {
        return Ok(None);
    };
    Regex::new(&format!("^(?:{})$", pattern))
        .map(Some)
        .map_err(|source| Error::InvalidPattern {
            column: column.to_string(),
            attribute: attribute.label(),
            pattern: pattern.to_string(),
            source,
        })
}

fn ensure_strftime(column: &str, attribute: Attribute, format: &str) -> Result<()> {
    if StrftimeItems::new(format).any(|item| matches!(item, Item::Error)) {
        return Err(Error::InvalidDateFormat {
            column: column.to_string(),
            attribute: attribute.label(),
            format: format.to_string(),
        });
    }
    Ok(())
}

/// Integer columns share the numeric rules; values are validated, not reformatted
pub fn check_integer(value: &str, base: Option<&Regex>, desired: Option<&Regex>) -> Outcome {
    check_number(value, base, desired)
}

/// Validate a numeric cell
///
/// The value must read as a number. Declared patterns are then matched
/// against the raw string, base first. The original text is returned
/// unchanged on success.
pub fn check_number(value: &str, base: Option<&Regex>, desired: Option<&Regex>) -> Outcome {
    if !is_number(value) {
        return Outcome::Rejected(RejectReason::NotANumber);
    }
    if base.is_some_and(|re| !re.is_match(value)) {
        return Outcome::Rejected(RejectReason::BaseFormatMismatch);
    }
    if desired.is_some_and(|re| !re.is_match(value)) {
        return Outcome::Rejected(RejectReason::DesiredFormatMismatch);
    }
    Outcome::Accepted(value.to_string())
}

/// Parse with `base` and re-emit with `desired`
pub fn check_date(value: &str, base: &str, desired: &str) -> Outcome {
    let Some(parsed) = parse_date_time(value, base) else {
        return Outcome::Rejected(RejectReason::DateParseFailure);
    };

    let mut out = String::new();
    match write!(out, "{}", parsed.format(desired)) {
        Ok(()) => Outcome::Accepted(out),
        Err(_) => Outcome::Rejected(RejectReason::DateParseFailure),
    }
}

/// Validate a text cell
///
/// A declared Base Format takes precedence; the Desired Format is only
/// consulted when no Base Format exists. Without either, anything passes.
pub fn check_string(value: &str, base: Option<&Regex>, desired: Option<&Regex>) -> Outcome {
    if let Some(re) = base {
        if !re.is_match(value) {
            return Outcome::Rejected(RejectReason::BaseFormatMismatch);
        }
    } else if let Some(re) = desired {
        if !re.is_match(value) {
            return Outcome::Rejected(RejectReason::DesiredFormatMismatch);
        }
    }
    Outcome::Accepted(value.to_string())
}

/// Check whether a value reads as a number
///
/// Accepts decimal and float literals in any script's decimal digits
/// (including `inf`/`nan` and exponents), digit groups separated by `_`, and
/// a single character with a numeric value such as `½`, `Ⅻ` or `五`.
pub fn is_number(value: &str) -> bool {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return false;
    }

    let folded: String = trimmed
        .chars()
        .map(|c| decimal_digit(c).unwrap_or(c))
        .collect();
    if folded.parse::<f64>().is_ok() {
        return true;
    }
    if folded.contains('_') && GROUPED_LITERAL.is_match(&folded) {
        return folded.replace('_', "").parse::<f64>().is_ok();
    }

    let mut chars = value.chars();
    matches!(
        (chars.next(), chars.next()),
        (Some(c), None) if c.is_numeric() || HAN_NUMERALS.contains(&c)
    )
}

/// ASCII form of a decimal digit from any script
///
/// Decimal digits are encoded in contiguous runs of ten starting at zero, so
/// the value is the distance from the start of the run.
fn decimal_digit(c: char) -> Option<char> {
    if c.is_ascii_digit() {
        return Some(c);
    }
    if c.general_category() != GeneralCategory::DecimalNumber {
        return None;
    }

    let mut run = 0;
    let mut code = c as u32;
    while let Some(prev) = code.checked_sub(1).and_then(char::from_u32) {
        if prev.general_category() != GeneralCategory::DecimalNumber {
            break;
        }
        run += 1;
        code -= 1;
    }
    char::from_digit(run % 10, 10)
}

/// Parse a value with a strftime pattern that may hold any subset of fields
///
/// Fields the pattern leaves out take the values of 1900-01-01 00:00:00, so
/// `%Y-%m`, `%B %Y` and `%H:%M` all produce a timestamp.
pub fn parse_date_time(value: &str, format: &str) -> Option<NaiveDateTime> {
    let mut parsed = Parsed::new();
    parse(&mut parsed, value, StrftimeItems::new(format)).ok()?;
    fill_missing_fields(&mut parsed).ok()?;
    parsed.to_naive_datetime_with_offset(0).ok()
}

fn fill_missing_fields(parsed: &mut Parsed) -> ParseResult<()> {
    if parsed.timestamp().is_some() {
        return Ok(());
    }

    if parsed.year().is_none()
        && parsed.year_div_100().is_none()
        && parsed.year_mod_100().is_none()
        && parsed.isoyear().is_none()
    {
        parsed.set_year(1900)?;
    }

    // Ordinal and week fields resolve the date on their own
    let by_week = parsed.isoweek().is_some()
        || parsed.week_from_sun().is_some()
        || parsed.week_from_mon().is_some();
    if parsed.ordinal().is_none() && !by_week {
        if parsed.month().is_none() {
            parsed.set_month(1)?;
        }
        if parsed.day().is_none() {
            parsed.set_day(1)?;
        }
    }

    match (parsed.hour_div_12(), parsed.hour_mod_12()) {
        (None, None) => parsed.set_hour(0)?,
        (None, Some(_)) => parsed.set_ampm(false)?,
        _ => {}
    }
    if parsed.minute().is_none() {
        parsed.set_minute(0)?;
    }
    if parsed.second().is_none() {
        parsed.set_second(0)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full(pattern: &str) -> Regex {
        Regex::new(&format!("^(?:{})$", pattern)).unwrap()
    }

    #[test]
    fn test_is_number() {
        assert!(is_number("42"));
        assert!(is_number("-3.14"));
        assert!(is_number(" 7 "));
        assert!(is_number("1e10"));
        assert!(is_number("1_000"));
        assert!(is_number("½"));
        assert!(is_number("Ⅻ"));
        assert!(!is_number("12a"));
        assert!(!is_number("1__0"));
        assert!(!is_number(""));
        assert!(!is_number("½½"));
    }

    #[test]
    fn test_is_number_other_scripts() {
        assert!(is_number("٣٤"));
        assert!(is_number("１２"));
        assert!(is_number("१.५"));
        assert!(is_number("1_٠٠٠"));
        assert!(is_number("五"));
        assert!(!is_number("五五"));
        assert!(!is_number("字"));
    }

    #[test]
    fn test_decimal_digit() {
        assert_eq!(decimal_digit('7'), Some('7'));
        assert_eq!(decimal_digit('٣'), Some('3'));
        assert_eq!(decimal_digit('９'), Some('9'));
        assert_eq!(decimal_digit('𝟓'), Some('5'));
        assert_eq!(decimal_digit('a'), None);
        assert_eq!(decimal_digit('½'), None);
    }

    #[test]
    fn test_integer_base_format() {
        let base = full(r"\d+");
        assert_eq!(
            check_integer("12a", Some(&base), None),
            Outcome::Rejected(RejectReason::NotANumber)
        );
        assert_eq!(
            check_integer("12", Some(&base), None),
            Outcome::Accepted("12".to_string())
        );
        assert_eq!(
            check_integer("-12", Some(&base), None),
            Outcome::Rejected(RejectReason::BaseFormatMismatch)
        );
    }

    #[test]
    fn test_number_desired_format_checks_raw_value() {
        let desired = full(r"\d+\.\d{2}");
        assert_eq!(
            check_number("3.5", None, Some(&desired)),
            Outcome::Rejected(RejectReason::DesiredFormatMismatch)
        );
        assert_eq!(
            check_number("3.50", None, Some(&desired)),
            Outcome::Accepted("3.50".to_string())
        );
    }

    #[test]
    fn test_number_base_checked_before_desired() {
        let base = full(r"\d+");
        let desired = full(r"\d{3}");
        assert_eq!(
            check_number("1.5", Some(&base), Some(&desired)),
            Outcome::Rejected(RejectReason::BaseFormatMismatch)
        );
        assert_eq!(
            check_number("15", Some(&base), Some(&desired)),
            Outcome::Rejected(RejectReason::DesiredFormatMismatch)
        );
    }

    #[test]
    fn test_number_pattern_is_full_match() {
        let base = full(r"\d");
        assert_eq!(
            check_number("12", Some(&base), None),
            Outcome::Rejected(RejectReason::BaseFormatMismatch)
        );
    }

    #[test]
    fn test_date_reformat() {
        assert_eq!(
            check_date("23-04-2021", "%d-%m-%Y", "%Y/%m/%d"),
            Outcome::Accepted("2021/04/23".to_string())
        );
    }

    #[test]
    fn test_date_parse_failure() {
        assert_eq!(
            check_date("2021-04-23", "%d-%m-%Y", "%Y/%m/%d"),
            Outcome::Rejected(RejectReason::DateParseFailure)
        );
        assert_eq!(
            check_date("31-02-2021", "%d-%m-%Y", "%Y/%m/%d"),
            Outcome::Rejected(RejectReason::DateParseFailure)
        );
    }

    #[test]
    fn test_date_with_time() {
        assert_eq!(
            check_date("2021-02-08 20:29:00", "%Y-%m-%d %H:%M:%S", "%d.%m.%Y %H:%M"),
            Outcome::Accepted("08.02.2021 20:29".to_string())
        );
        assert_eq!(
            check_date("20:29", "%H:%M", "%Y %H%M"),
            Outcome::Accepted("1900 2029".to_string())
        );
    }

    #[test]
    fn test_date_partial_formats() {
        assert_eq!(
            check_date("2021-04", "%Y-%m", "%Y/%m"),
            Outcome::Accepted("2021/04".to_string())
        );
        assert_eq!(
            check_date("April 2021", "%B %Y", "%Y-%m"),
            Outcome::Accepted("2021-04".to_string())
        );
        assert_eq!(
            check_date("04/2021", "%m/%Y", "%Y-%m-%d"),
            Outcome::Accepted("2021-04-01".to_string())
        );
        assert_eq!(
            check_date("2021", "%Y", "%Y-%m-%d %H:%M"),
            Outcome::Accepted("2021-01-01 00:00".to_string())
        );
        assert_eq!(
            check_date("14", "%H", "%Y-%m-%d %H:%M"),
            Outcome::Accepted("1900-01-01 14:00".to_string())
        );
        assert_eq!(
            check_date("07 PM", "%I %p", "%H:%M"),
            Outcome::Accepted("19:00".to_string())
        );
        assert_eq!(
            check_date("Apr 2021", "%B %Y", "%Y-%m"),
            Outcome::Accepted("2021-04".to_string())
        );
    }

    #[test]
    fn test_parse_date_time_defaults() {
        let parsed = parse_date_time("23-04", "%d-%m").unwrap();
        assert_eq!(parsed.to_string(), "1900-04-23 00:00:00");

        let parsed = parse_date_time("2021-113", "%Y-%j").unwrap();
        assert_eq!(parsed.to_string(), "2021-04-23 00:00:00");

        assert!(parse_date_time("2021-04-23 trailing", "%Y-%m-%d").is_none());
        assert!(parse_date_time("13/2021", "%m/%Y").is_none());
    }

    #[test]
    fn test_date_unformattable_output() {
        // A naive value has no offset to render
        assert_eq!(
            check_date("23-04-2021", "%d-%m-%Y", "%Y %z"),
            Outcome::Rejected(RejectReason::DateParseFailure)
        );
    }

    #[test]
    fn test_string_passthrough() {
        assert_eq!(
            check_string("anything, at all", None, None),
            Outcome::Accepted("anything, at all".to_string())
        );
        assert_eq!(check_string("", None, None), Outcome::Accepted(String::new()));
    }

    #[test]
    fn test_string_base_takes_precedence() {
        let base = full("[A-Z]{3}");
        let desired = full("[a-z]+");
        assert_eq!(
            check_string("ABC", Some(&base), Some(&desired)),
            Outcome::Accepted("ABC".to_string())
        );
        assert_eq!(
            check_string("abc", Some(&base), Some(&desired)),
            Outcome::Rejected(RejectReason::BaseFormatMismatch)
        );
        assert_eq!(
            check_string("ABC", None, Some(&desired)),
            Outcome::Rejected(RejectReason::DesiredFormatMismatch)
        );
    }

    #[test]
    fn test_compile_rejects_bad_patterns() {
        let err = CellCheck::compile("age", &DType::Integer, Some("(\\d+"), None).unwrap_err();
        assert!(matches!(err, Error::InvalidPattern { .. }));

        let err = CellCheck::compile("visit", &DType::Date, Some("%d-%Q"), None).unwrap_err();
        assert!(matches!(err, Error::InvalidDateFormat { .. }));

        let err = CellCheck::compile("visit", &DType::Date, None, Some("%Y")).unwrap_err();
        assert!(matches!(err, Error::MissingDateFormat { .. }));
    }

    #[test]
    fn test_compile_date_defaults_desired_to_base() {
        let check = CellCheck::compile("visit", &DType::Date, Some("%d-%m-%Y"), None).unwrap();
        assert_eq!(check.apply("3-4-2021"), Outcome::Accepted("03-04-2021".to_string()));
    }

    #[test]
    fn test_unrecognized_type_rejects_everything() {
        let check =
            CellCheck::compile("flag", &DType::Unrecognized("boolean".into()), None, None).unwrap();
        assert_eq!(
            check.apply("true"),
            Outcome::Rejected(RejectReason::UnrecognizedType)
        );
    }
}
