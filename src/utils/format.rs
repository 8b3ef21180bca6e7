//! Formatting utilities.

use serde::{Deserialize, Serialize};

/// How a view count is written out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum CountFormat {
    /// Abbreviated and floored: `2K+`, `3M+`.
    #[default]
    Short,
    /// Every digit, with thousands separators: `2,143`.
    Full,
}

/// Format a view count for display.
pub fn format_count(n: u64, style: CountFormat) -> String {
    match style {
        CountFormat::Short => format_short(n),
        CountFormat::Full => format_grouped(n),
    }
}

fn format_short(n: u64) -> String {
    const UNITS: [(u64, &str); 4] = [
        (1_000_000_000_000, "T+"),
        (1_000_000_000, "B+"),
        (1_000_000, "M+"),
        (1_000, "K+"),
    ];

    for (threshold, suffix) in UNITS {
        if n >= threshold {
            return format!("{}{}", n / threshold, suffix);
        }
    }
    n.to_string()
}

fn format_grouped(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}
