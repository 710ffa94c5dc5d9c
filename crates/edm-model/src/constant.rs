//! Typed constant expressions and their CSDL literal forms
//!
//! A literal that does not parse for its declared kind is kept verbatim as
//! [`Constant::Malformed`], so a model read from a document always carries
//! every node and the problem surfaces through validation.

use crate::error::{EdmError, EdmErrorCode};
use crate::types::PrimitiveKind;
use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, SecondsFormat, TimeDelta};
use rust_decimal::Decimal;
use std::fmt;
use uuid::Uuid;

/// Kind of constant, matching the CSDL constant element names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConstantKind {
    Binary,
    Boolean,
    Date,
    DateTimeOffset,
    Decimal,
    Duration,
    Floating,
    Guid,
    Integer,
    String,
    TimeOfDay,
    Null,
}

impl ConstantKind {
    /// Every constant kind
    pub const ALL: [Self; 12] = [
        Self::Binary,
        Self::Boolean,
        Self::Date,
        Self::DateTimeOffset,
        Self::Decimal,
        Self::Duration,
        Self::Floating,
        Self::Guid,
        Self::Integer,
        Self::String,
        Self::TimeOfDay,
        Self::Null,
    ];

    /// Element/attribute name used in CSDL, e.g. `Int` or `Bool`
    #[must_use]
    pub const fn element_name(self) -> &'static str {
        match self {
            Self::Binary => "Binary",
            Self::Boolean => "Bool",
            Self::Date => "Date",
            Self::DateTimeOffset => "DateTimeOffset",
            Self::Decimal => "Decimal",
            Self::Duration => "Duration",
            Self::Floating => "Float",
            Self::Guid => "Guid",
            Self::Integer => "Int",
            Self::String => "String",
            Self::TimeOfDay => "TimeOfDay",
            Self::Null => "Null",
        }
    }

    #[must_use]
    pub fn from_element_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.element_name() == name)
    }

    /// Natural primitive type of a constant of this kind
    #[must_use]
    pub const fn primitive_kind(self) -> Option<PrimitiveKind> {
        match self {
            Self::Binary => Some(PrimitiveKind::Binary),
            Self::Boolean => Some(PrimitiveKind::Boolean),
            Self::Date => Some(PrimitiveKind::Date),
            Self::DateTimeOffset => Some(PrimitiveKind::DateTimeOffset),
            Self::Decimal => Some(PrimitiveKind::Decimal),
            Self::Duration => Some(PrimitiveKind::Duration),
            Self::Floating => Some(PrimitiveKind::Double),
            Self::Guid => Some(PrimitiveKind::Guid),
            Self::Integer => Some(PrimitiveKind::Int64),
            Self::String => Some(PrimitiveKind::String),
            Self::TimeOfDay => Some(PrimitiveKind::TimeOfDay),
            Self::Null => None,
        }
    }

    /// Code reported when a literal of this kind cannot be parsed
    #[must_use]
    pub const fn invalid_literal_code(self) -> EdmErrorCode {
        match self {
            Self::Binary => EdmErrorCode::InvalidBinary,
            Self::Boolean => EdmErrorCode::InvalidBoolean,
            Self::Date => EdmErrorCode::InvalidDate,
            Self::DateTimeOffset => EdmErrorCode::InvalidDateTimeOffset,
            Self::Decimal => EdmErrorCode::InvalidDecimal,
            Self::Duration => EdmErrorCode::InvalidDuration,
            Self::Floating => EdmErrorCode::InvalidFloatingPoint,
            Self::Guid => EdmErrorCode::InvalidGuid,
            Self::Integer => EdmErrorCode::InvalidInteger,
            Self::TimeOfDay => EdmErrorCode::InvalidTimeOfDay,
            Self::String | Self::Null => EdmErrorCode::InvalidAttributeValue,
        }
    }
}

impl fmt::Display for ConstantKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.element_name())
    }
}

/// Constant value
#[derive(Debug, Clone, PartialEq)]
pub enum Constant {
    Binary(Vec<u8>),
    Boolean(bool),
    Date(NaiveDate),
    DateTimeOffset(DateTime<FixedOffset>),
    Decimal(Decimal),
    Duration(TimeDelta),
    Floating(f64),
    Guid(Uuid),
    Integer(i64),
    String(String),
    TimeOfDay(NaiveTime),
    Null,
    /// Literal that did not parse as `kind`
    Malformed { kind: ConstantKind, literal: String },
}

impl Constant {
    /// Parse a CSDL literal of the given kind
    #[must_use]
    pub fn parse(kind: ConstantKind, literal: &str) -> Self {
        let parsed = match kind {
            ConstantKind::Binary => URL_SAFE_NO_PAD
                .decode(literal.trim().trim_end_matches('='))
                .ok()
                .map(Self::Binary),
            ConstantKind::Boolean => match literal.trim() {
                t if t.eq_ignore_ascii_case("true") => Some(Self::Boolean(true)),
                t if t.eq_ignore_ascii_case("false") => Some(Self::Boolean(false)),
                _ => None,
            },
            ConstantKind::Date => NaiveDate::parse_from_str(literal.trim(), "%Y-%m-%d")
                .ok()
                .map(Self::Date),
            ConstantKind::DateTimeOffset => DateTime::parse_from_rfc3339(literal.trim())
                .ok()
                .map(Self::DateTimeOffset),
            ConstantKind::Decimal => parse_decimal(literal.trim()).map(Self::Decimal),
            ConstantKind::Duration => parse_duration(literal.trim()).map(Self::Duration),
            ConstantKind::Floating => parse_floating(literal.trim()).map(Self::Floating),
            ConstantKind::Guid => Uuid::parse_str(literal.trim()).ok().map(Self::Guid),
            ConstantKind::Integer => literal.trim().parse().ok().map(Self::Integer),
            ConstantKind::String => Some(Self::String(literal.to_string())),
            ConstantKind::TimeOfDay => parse_time_of_day(literal.trim()).map(Self::TimeOfDay),
            ConstantKind::Null => Some(Self::Null),
        };
        parsed.unwrap_or_else(|| Self::Malformed {
            kind,
            literal: literal.to_string(),
        })
    }

    #[must_use]
    pub fn kind(&self) -> ConstantKind {
        match self {
            Self::Binary(_) => ConstantKind::Binary,
            Self::Boolean(_) => ConstantKind::Boolean,
            Self::Date(_) => ConstantKind::Date,
            Self::DateTimeOffset(_) => ConstantKind::DateTimeOffset,
            Self::Decimal(_) => ConstantKind::Decimal,
            Self::Duration(_) => ConstantKind::Duration,
            Self::Floating(_) => ConstantKind::Floating,
            Self::Guid(_) => ConstantKind::Guid,
            Self::Integer(_) => ConstantKind::Integer,
            Self::String(_) => ConstantKind::String,
            Self::TimeOfDay(_) => ConstantKind::TimeOfDay,
            Self::Null => ConstantKind::Null,
            Self::Malformed { kind, .. } => *kind,
        }
    }

    #[must_use]
    pub fn is_malformed(&self) -> bool {
        matches!(self, Self::Malformed { .. })
    }

    /// Canonical CSDL literal; malformed constants keep their original text
    #[must_use]
    pub fn literal(&self) -> String {
        match self {
            Self::Binary(bytes) => URL_SAFE_NO_PAD.encode(bytes),
            Self::Boolean(value) => value.to_string(),
            Self::Date(value) => value.format("%Y-%m-%d").to_string(),
            Self::DateTimeOffset(value) => value.to_rfc3339_opts(SecondsFormat::AutoSi, true),
            Self::Decimal(value) => value.to_string(),
            Self::Duration(value) => format_duration(*value),
            Self::Floating(value) => format_floating(*value),
            Self::Guid(value) => value.hyphenated().to_string(),
            Self::Integer(value) => value.to_string(),
            Self::String(value) => value.clone(),
            Self::TimeOfDay(value) => format_time_of_day(*value),
            Self::Null => String::new(),
            Self::Malformed { literal, .. } => literal.clone(),
        }
    }

    /// Error for a malformed literal
    #[must_use]
    pub fn error(&self) -> Option<EdmError> {
        match self {
            Self::Malformed { kind, literal } => Some(EdmError::new(
                kind.invalid_literal_code(),
                format!("'{literal}' is not a valid {kind} literal"),
            )),
            _ => None,
        }
    }
}

fn parse_decimal(text: &str) -> Option<Decimal> {
    text.parse::<Decimal>()
        .ok()
        .or_else(|| Decimal::from_scientific(text).ok())
}

fn parse_floating(text: &str) -> Option<f64> {
    match text {
        "INF" => Some(f64::INFINITY),
        "-INF" => Some(f64::NEG_INFINITY),
        "NaN" => Some(f64::NAN),
        _ => text.parse::<f64>().ok().filter(|v| v.is_finite()),
    }
}

fn format_floating(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value == f64::INFINITY {
        "INF".to_string()
    } else if value == f64::NEG_INFINITY {
        "-INF".to_string()
    } else {
        value.to_string()
    }
}

fn parse_time_of_day(text: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(text, "%H:%M:%S%.f")
        .or_else(|_| NaiveTime::parse_from_str(text, "%H:%M"))
        .ok()
}

fn format_time_of_day(value: NaiveTime) -> String {
    value.format("%H:%M:%S%.f").to_string()
}

/// Parse an `xs:dayTimeDuration` literal such as `-P1DT2H3M4.5S`
#[must_use]
pub fn parse_duration(text: &str) -> Option<TimeDelta> {
    let (negative, rest) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text),
    };
    let rest = rest.strip_prefix('P')?;
    let (day_part, time_part) = match rest.split_once('T') {
        Some((days, time)) => (days, Some(time)),
        None => (rest, None),
    };

    let mut total = TimeDelta::zero();
    let mut seen_component = false;

    if !day_part.is_empty() {
        let days: i64 = day_part.strip_suffix('D')?.parse().ok()?;
        total = total.checked_add(&TimeDelta::try_days(days)?)?;
        seen_component = true;
    }

    if let Some(time) = time_part {
        let mut number = String::new();
        for ch in time.chars() {
            let component = match ch {
                '0'..='9' | '.' => {
                    number.push(ch);
                    continue;
                }
                'H' => TimeDelta::try_hours(number.parse().ok()?)?,
                'M' => TimeDelta::try_minutes(number.parse().ok()?)?,
                'S' => parse_seconds(&number)?,
                _ => return None,
            };
            total = total.checked_add(&component)?;
            number.clear();
            seen_component = true;
        }
        if !number.is_empty() || time.is_empty() {
            return None;
        }
    }

    if !seen_component {
        return None;
    }
    Some(if negative { -total } else { total })
}

fn parse_seconds(number: &str) -> Option<TimeDelta> {
    let (whole, fraction) = number.split_once('.').unwrap_or((number, ""));
    if whole.is_empty() || fraction.len() > 9 || !fraction.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let seconds = TimeDelta::try_seconds(whole.parse().ok()?)?;
    let nanos: i64 = if fraction.is_empty() {
        0
    } else {
        format!("{fraction:0<9}").parse().ok()?
    };
    seconds.checked_add(&TimeDelta::nanoseconds(nanos))
}

/// Canonical `xs:dayTimeDuration` literal
#[must_use]
pub fn format_duration(value: TimeDelta) -> String {
    let negative = value < TimeDelta::zero();
    let magnitude = if negative { -value } else { value };

    let total_seconds = magnitude.num_seconds();
    let nanos = magnitude.subsec_nanos();
    let days = total_seconds / 86_400;
    let hours = (total_seconds % 86_400) / 3_600;
    let minutes = (total_seconds % 3_600) / 60;
    let seconds = total_seconds % 60;

    let mut out = String::new();
    if negative {
        out.push('-');
    }
    out.push('P');
    if days > 0 {
        out.push_str(&format!("{days}D"));
    }
    if hours > 0 || minutes > 0 || seconds > 0 || nanos > 0 || days == 0 {
        out.push('T');
        if hours > 0 {
            out.push_str(&format!("{hours}H"));
        }
        if minutes > 0 {
            out.push_str(&format!("{minutes}M"));
        }
        if seconds > 0 || nanos > 0 || (hours == 0 && minutes == 0) {
            if nanos > 0 {
                let fraction = format!("{nanos:09}");
                out.push_str(&format!("{seconds}.{}S", fraction.trim_end_matches('0')));
            } else {
                out.push_str(&format!("{seconds}S"));
            }
        }
    }
    out
}
