use chrono::NaiveTime;
use payroll_core::calculations::common::round_currency;
use rust_decimal::Decimal;

/// Inserts `,` every three digits of a non-negative integer string.
fn group_thousands(digits: &str) -> String {
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Formats an amount as kina, rounded to the toea: `K 1,234.56`.
pub fn format_kina(amount: Decimal) -> String {
    let rounded = round_currency(amount);
    let sign = if rounded.is_sign_negative() && !rounded.is_zero() { "-" } else { "" };
    let text = format!("{:.2}", rounded.abs());
    let (whole, fraction) = text.split_once('.').unwrap_or((text.as_str(), "00"));
    format!("{sign}K {}.{fraction}", group_thousands(whole))
}

/// Formats a percentage figure (`23` means 23%) to two places.
pub fn format_percent(rate: Decimal) -> String {
    format!("{:.2}%", round_currency(rate))
}

/// Formats an optional upper bound, using "no limit" when `None`.
pub fn format_limit(limit: Option<Decimal>) -> String {
    limit.map(format_kina).unwrap_or_else(|| "no limit".to_string())
}

/// Parses a 24-hour clock time, `HH:MM` or `HH:MM:SS`.
pub fn parse_clock_time(input: &str) -> Result<NaiveTime, chrono::ParseError> {
    let trimmed = input.trim();
    NaiveTime::parse_from_str(trimmed, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(trimmed, "%H:%M:%S"))
}
