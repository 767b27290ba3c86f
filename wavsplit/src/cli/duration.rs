use std::fmt;

/// Parse a span length such as `800`, `800ms`, `0.8s` or `1m` into whole
/// milliseconds.
///
/// # Grammar
///
/// ```text
/// length = number [ unit ] ;
/// number = digits [ "." digits ] ;
/// unit   = "ms" | "s" | "m" ;
/// ```
///
/// A bare number counts milliseconds. Zero is accepted; fractions must land
/// on a whole millisecond.
pub fn parse_millis(value: &str) -> Result<u64, MillisParseError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(MillisParseError::Empty);
    }

    let bytes = trimmed.as_bytes();
    let (mantissa, scale, number_len) = parse_number(bytes)?;
    let unit = parse_unit(&trimmed[number_len..])?;

    let pow10 = 10u128.pow(scale);
    let product = mantissa
        .checked_mul(unit.millis())
        .ok_or(MillisParseError::TooLarge)?;
    if product % pow10 != 0 {
        return Err(MillisParseError::SubMillisecond);
    }
    u64::try_from(product / pow10).map_err(|_| MillisParseError::TooLarge)
}

fn parse_number(bytes: &[u8]) -> Result<(u128, u32, usize), MillisParseError> {
    let mut mantissa: u128 = 0;
    let mut scale: u32 = 0;
    let mut digits = 0usize;
    let mut seen_decimal = false;
    let mut index = 0usize;

    while index < bytes.len() {
        match bytes[index] {
            byte @ b'0'..=b'9' => {
                mantissa = mantissa
                    .checked_mul(10)
                    .and_then(|m| m.checked_add(u128::from(byte - b'0')))
                    .ok_or(MillisParseError::TooLarge)?;
                if seen_decimal {
                    scale += 1;
                }
                digits += 1;
            }
            b'.' if !seen_decimal && digits > 0 => seen_decimal = true,
            _ => break,
        }
        index += 1;
    }

    if digits == 0 {
        return Err(MillisParseError::ExpectedNumber {
            found: bytes.first().map(|&b| b as char),
        });
    }
    if seen_decimal && scale == 0 {
        return Err(MillisParseError::MissingFractionDigits);
    }
    // More than 38 fraction digits would overflow the scale factor.
    if scale > 38 {
        return Err(MillisParseError::SubMillisecond);
    }
    Ok((mantissa, scale, index))
}

fn parse_unit(rest: &str) -> Result<Unit, MillisParseError> {
    match rest {
        "" | "ms" => Ok(Unit::Millisecond),
        "s" => Ok(Unit::Second),
        "m" => Ok(Unit::Minute),
        other => Err(MillisParseError::UnknownUnit(other.to_owned())),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MillisParseError {
    Empty,
    ExpectedNumber { found: Option<char> },
    MissingFractionDigits,
    UnknownUnit(String),
    SubMillisecond,
    TooLarge,
}

impl std::error::Error for MillisParseError {}

impl fmt::Display for MillisParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MillisParseError::Empty => write!(f, "length cannot be empty"),
            MillisParseError::ExpectedNumber { found: Some(ch) } => {
                write!(f, "expected a number but found '{ch}'")
            }
            MillisParseError::ExpectedNumber { found: None } => write!(f, "expected a number"),
            MillisParseError::MissingFractionDigits => {
                write!(f, "expected digits after the decimal point")
            }
            MillisParseError::UnknownUnit(unit) => {
                write!(f, "unknown unit '{unit}' (use ms, s or m)")
            }
            MillisParseError::SubMillisecond => {
                write!(f, "length must be a whole number of milliseconds")
            }
            MillisParseError::TooLarge => write!(f, "length is too large"),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum Unit {
    Millisecond,
    Second,
    Minute,
}

impl Unit {
    fn millis(self) -> u128 {
        match self {
            Unit::Millisecond => 1,
            Unit::Second => 1_000,
            Unit::Minute => 60_000,
        }
    }
}
