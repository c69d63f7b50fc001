use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

/// Formats an amount for display: thousands separators, no decimals for
/// whole amounts, two decimals otherwise.
pub fn format_amount(amount: Decimal) -> String {
    let rounded = amount.round_dp(2);
    let sign = if rounded.is_sign_negative() && !rounded.is_zero() { "-" } else { "" };
    let absolute = rounded.abs();
    let grouped = group_thousands(&absolute.trunc().to_string());
    let cents = (absolute.fract() * Decimal::ONE_HUNDRED).to_u8().unwrap_or_default();

    match cents {
        0 => format!("{sign}{grouped}"),
        fraction => format!("{sign}{grouped}.{fraction:02}"),
    }
}

pub fn format_price(amount: Decimal, currency_code: &str) -> String {
    format!("{currency_code} {}", format_amount(amount))
}

fn group_thousands(digits: &str) -> String {
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (index, digit) in digits.chars().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }
    grouped
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::{format_amount, format_price};

    #[test]
    fn groups_whole_amounts_without_decimals() {
        assert_eq!(format_amount(Decimal::from(147_000)), "147,000");
        assert_eq!(format_amount(Decimal::from(1_250_000)), "1,250,000");
        assert_eq!(format_amount(Decimal::from(999)), "999");
        assert_eq!(format_amount(Decimal::new(10500000, 2)), "105,000");
    }

    #[test]
    fn keeps_cents_for_fractional_amounts() {
        assert_eq!(format_amount(Decimal::new(980, 2)), "9.80");
        assert_eq!(format_amount(Decimal::new(123_405, 2)), "1,234.05");
    }

    #[test]
    fn formats_amounts_at_the_top_of_the_decimal_range() {
        assert_eq!(format_amount(Decimal::MAX), "79,228,162,514,264,337,593,543,950,335");
        assert_eq!(
            format_price(Decimal::from_i128_with_scale(98 * 10_i128.pow(26), 0), "TZS"),
            "TZS 9,800,000,000,000,000,000,000,000,000"
        );
        assert_eq!(format_amount(Decimal::MIN), "-79,228,162,514,264,337,593,543,950,335");
    }

    #[test]
    fn negative_zero_has_no_sign() {
        assert_eq!(format_amount(Decimal::new(-1, 3)), "0");
        assert_eq!(format_amount(Decimal::new(-1_050, 2)), "-10.50");
    }

    #[test]
    fn prefixes_currency_code() {
        assert_eq!(format_price(Decimal::from(135_000), "TZS"), "TZS 135,000");
    }
}
