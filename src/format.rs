//! Number formatting for terminal output.

use std::sync::OnceLock;

use numfmt::{Formatter, Precision};

fn currency_formatter(prefix: &str) -> Option<Formatter> {
    Formatter::currency(prefix)
        .ok()
        .map(|formatter| formatter.precision(Precision::Decimals(2)))
}

/// Format `number` as dollars with thousands separators and two decimal places,
/// e.g. "-$1,234.50".
pub fn format_currency(number: f64) -> String {
    static POSITIVE_FMT: OnceLock<Option<Formatter>> = OnceLock::new();
    static NEGATIVE_FMT: OnceLock<Option<Formatter>> = OnceLock::new();

    let formatter = if number < 0.0 {
        NEGATIVE_FMT.get_or_init(|| currency_formatter("-$"))
    } else {
        POSITIVE_FMT.get_or_init(|| currency_formatter("$"))
    };

    let Some(formatter) = formatter else {
        return format!("{}${:.2}", if number < 0.0 { "-" } else { "" }, number.abs());
    };

    if number == 0.0 {
        // numfmt renders zero as a bare "0".
        return "$0.00".to_owned();
    }

    let mut formatted_string = formatter.fmt_string(number.abs());

    // numfmt drops a trailing zero, e.g. "12.30" comes out as "12.3".
    let len = formatted_string.len();
    if len >= 3 && formatted_string.as_bytes().get(len - 3) != Some(&b'.') {
        formatted_string.push('0');
    }

    formatted_string
}

/// Format a percentage with one decimal place, e.g. "42.5%".
pub fn format_percent(number: f64) -> String {
    format!("{number:.1}%")
}
