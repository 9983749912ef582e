// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use time::macros::format_description;
use time::{Date, OffsetDateTime, Time};

pub const DATE_LAYOUT: &str = "YYYY-MM-DD";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationError {
    InvalidMoney,
    NegativeMoney,
    InvalidDate,
    InvalidInt,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidMoney => f.write_str("invalid money value"),
            Self::NegativeMoney => f.write_str("negative money value"),
            Self::InvalidDate => f.write_str("invalid date value"),
            Self::InvalidInt => f.write_str("invalid integer value"),
        }
    }
}

impl std::error::Error for ValidationError {}

pub type ValidationResult<T> = std::result::Result<T, ValidationError>;

pub fn parse_required_cents(input: &str) -> ValidationResult<i64> {
    parse_cents(input.trim())
}

pub fn parse_optional_cents(input: &str) -> ValidationResult<Option<i64>> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    parse_cents(trimmed).map(Some)
}

pub fn format_cents(cents: i64) -> String {
    let (sign, cents) = if cents < 0 {
        ("-", cents.unsigned_abs())
    } else {
        ("", cents.unsigned_abs())
    };
    let whole = cents / 100;
    let remainder = cents % 100;
    format!("{sign}${}.{remainder:02}", comma_format(whole))
}

pub fn parse_required_date(input: &str) -> ValidationResult<Date> {
    parse_date_value(input.trim())
}

pub fn parse_optional_date(input: &str) -> ValidationResult<Option<Date>> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    parse_date_value(trimmed).map(Some)
}

pub fn format_date(value: Option<Date>) -> String {
    value
        .and_then(|date| {
            date.format(&format_description!("[year]-[month]-[day]"))
                .ok()
        })
        .unwrap_or_default()
}

// Forms capture calendar dates; timestamps are stored at midnight UTC.
pub fn date_to_timestamp(date: Date) -> OffsetDateTime {
    date.with_time(Time::MIDNIGHT).assume_utc()
}

pub fn parse_required_int(input: &str) -> ValidationResult<i64> {
    parse_int(input.trim())
}

pub fn parse_optional_int(input: &str) -> ValidationResult<Option<i64>> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    parse_int(trimmed).map(Some)
}

fn parse_int(input: &str) -> ValidationResult<i64> {
    let cleaned: String = input.chars().filter(|ch| *ch != ',').collect();
    cleaned.parse().map_err(|_| ValidationError::InvalidInt)
}

fn parse_cents(input: &str) -> ValidationResult<i64> {
    let cleaned: String = input
        .chars()
        .filter(|ch| *ch != '$' && *ch != ',')
        .collect();
    if cleaned.is_empty() {
        return Err(ValidationError::InvalidMoney);
    }

    let (whole_raw, fraction_raw) = match cleaned.split_once('.') {
        Some((whole, fraction)) => (whole, fraction),
        None => (cleaned.as_str(), ""),
    };
    let negative = whole_raw.starts_with('-');
    let whole_digits = whole_raw.trim_start_matches('-');
    if !whole_digits.chars().all(|ch| ch.is_ascii_digit()) || whole_digits.is_empty() {
        return Err(ValidationError::InvalidMoney);
    }
    if fraction_raw.len() > 2 || !fraction_raw.chars().all(|ch| ch.is_ascii_digit()) {
        return Err(ValidationError::InvalidMoney);
    }

    let whole: i64 = whole_digits
        .parse()
        .map_err(|_| ValidationError::InvalidMoney)?;
    let fraction: i64 = if fraction_raw.is_empty() {
        0
    } else if fraction_raw.len() == 1 {
        fraction_raw.parse::<i64>().map_err(|_| ValidationError::InvalidMoney)? * 10
    } else {
        fraction_raw.parse().map_err(|_| ValidationError::InvalidMoney)?
    };

    let cents = whole * 100 + fraction;
    if negative {
        return Err(ValidationError::NegativeMoney);
    }
    Ok(cents)
}

fn parse_date_value(input: &str) -> ValidationResult<Date> {
    Date::parse(input, &format_description!("[year]-[month]-[day]"))
        .map_err(|_| ValidationError::InvalidDate)
}

fn comma_format(value: u64) -> String {
    let digits = value.to_string();
    let mut output = String::with_capacity(digits.len() + digits.len() / 3);
    for (index, ch) in digits.chars().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            output.push(',');
        }
        output.push(ch);
    }
    output
}
