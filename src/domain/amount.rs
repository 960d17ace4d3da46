use std::fmt;

/// Ledger amounts are integer stroops to avoid floating-point precision issues.
/// 1 unit = 10_000_000 stroops, so 12.5 XLM = 125_000_000 stroops.
pub type Stroops = i64;

/// Number of fractional digits the ledger supports.
pub const AMOUNT_DECIMALS: usize = 7;

const STROOPS_PER_UNIT: i64 = 10_000_000;

/// Largest representable amount. Used as the "unlimited" trust limit.
pub const MAX_TRUST_LIMIT: Stroops = i64::MAX;

/// Format stroops as a decimal string with exactly 7 fractional digits.
/// Example: 125_000_000 -> "12.5000000", -1 -> "-0.0000001"
pub fn format_stroops(stroops: Stroops) -> String {
    let sign = if stroops < 0 { "-" } else { "" };
    let abs = stroops.unsigned_abs();
    let units = abs / STROOPS_PER_UNIT as u64;
    let remainder = abs % STROOPS_PER_UNIT as u64;
    format!("{}{}.{:07}", sign, units, remainder)
}

/// Parse a decimal string into stroops.
/// Example: "12.5" -> 125_000_000, "100" -> 1_000_000_000, ".0000001" -> 1
pub fn parse_stroops(input: &str) -> Result<Stroops, ParseAmountError> {
    let input = input.trim();
    let negative = input.starts_with('-');
    let input = input.trim_start_matches('-');

    if input.is_empty() {
        return Err(ParseAmountError::InvalidFormat);
    }

    let (units_str, fraction_str) = match input.split_once('.') {
        Some((units, fraction)) => (units, fraction),
        None => (input, ""),
    };

    if fraction_str.contains('.') {
        return Err(ParseAmountError::InvalidFormat);
    }
    if fraction_str.len() > AMOUNT_DECIMALS {
        return Err(ParseAmountError::TooPrecise);
    }
    if !units_str.chars().all(|c| c.is_ascii_digit())
        || !fraction_str.chars().all(|c| c.is_ascii_digit())
        || (units_str.is_empty() && fraction_str.is_empty())
    {
        return Err(ParseAmountError::InvalidFormat);
    }

    let units: i64 = if units_str.is_empty() {
        0
    } else {
        units_str
            .parse()
            .map_err(|_| ParseAmountError::Overflow)?
    };

    // Right-pad the fraction so "5" means 0.5000000
    let fraction: i64 = if fraction_str.is_empty() {
        0
    } else {
        format!("{:0<width$}", fraction_str, width = AMOUNT_DECIMALS)
            .parse()
            .map_err(|_| ParseAmountError::InvalidFormat)?
    };

    let stroops = units
        .checked_mul(STROOPS_PER_UNIT)
        .and_then(|s| s.checked_add(fraction))
        .ok_or(ParseAmountError::Overflow)?;

    Ok(if negative { -stroops } else { stroops })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseAmountError {
    InvalidFormat,
    TooPrecise,
    Overflow,
}

impl fmt::Display for ParseAmountError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseAmountError::InvalidFormat => write!(f, "invalid amount format"),
            ParseAmountError::TooPrecise => {
                write!(f, "amount has more than {} decimal places", AMOUNT_DECIMALS)
            }
            ParseAmountError::Overflow => write!(f, "amount is out of range"),
        }
    }
}

impl std::error::Error for ParseAmountError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_stroops() {
        assert_eq!(format_stroops(125_000_000), "12.5000000");
        assert_eq!(format_stroops(1), "0.0000001");
        assert_eq!(format_stroops(0), "0.0000000");
        assert_eq!(format_stroops(-1), "-0.0000001");
        assert_eq!(format_stroops(MAX_TRUST_LIMIT), "922337203685.4775807");
    }

    #[test]
    fn test_parse_stroops() {
        assert_eq!(parse_stroops("12.5"), Ok(125_000_000));
        assert_eq!(parse_stroops("100"), Ok(1_000_000_000));
        assert_eq!(parse_stroops("0.0000001"), Ok(1));
        assert_eq!(parse_stroops(".5"), Ok(5_000_000));
        assert_eq!(parse_stroops("10."), Ok(100_000_000));
        assert_eq!(parse_stroops("-1.0000000"), Ok(-10_000_000));
        assert_eq!(parse_stroops("922337203685.4775807"), Ok(MAX_TRUST_LIMIT));
    }

    #[test]
    fn test_parse_stroops_invalid() {
        assert_eq!(parse_stroops("abc"), Err(ParseAmountError::InvalidFormat));
        assert_eq!(parse_stroops("1.2.3"), Err(ParseAmountError::InvalidFormat));
        assert_eq!(parse_stroops(""), Err(ParseAmountError::InvalidFormat));
        assert_eq!(parse_stroops("."), Err(ParseAmountError::InvalidFormat));
        assert_eq!(parse_stroops("1e5"), Err(ParseAmountError::InvalidFormat));
        assert_eq!(parse_stroops("0.00000001"), Err(ParseAmountError::TooPrecise));
        assert_eq!(
            parse_stroops("922337203685.4775808"),
            Err(ParseAmountError::Overflow)
        );
    }
}
