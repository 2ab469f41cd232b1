/// Reads the leading integer of `raw` the way a lenient text field does:
/// surrounding whitespace is ignored, an optional sign is honoured and
/// anything after the digits is dropped. Text without digits reads as 0.
pub fn parse_int_lossy(raw: &str) -> i64 {
    let s = raw.trim();
    let (negative, rest) = split_sign(s);
    let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();

    if digits.is_empty() {
        return 0;
    }

    // Anything too long for i64 is far past every clamp bound anyway.
    let magnitude = digits.parse::<i64>().unwrap_or(i64::MAX);
    if negative {
        -magnitude
    } else {
        magnitude
    }
}

/// Decimal counterpart of [`parse_int_lossy`]. Accepts `1.5`, `.5`, `2.`
/// and trailing junk such as `1.5min`. Unparseable or non-finite input
/// reads as 0.
pub fn parse_float_lossy(raw: &str) -> f64 {
    let s = raw.trim();
    let (negative, rest) = split_sign(s);

    let mut end = 0;
    let mut seen_dot = false;
    let mut seen_digit = false;
    for (idx, c) in rest.char_indices() {
        match c {
            '0'..='9' => {
                seen_digit = true;
                end = idx + 1;
            }
            '.' if !seen_dot => {
                seen_dot = true;
                end = idx + 1;
            }
            _ => break,
        }
    }

    if !seen_digit {
        return 0.0;
    }

    let value = rest[..end].parse::<f64>().unwrap_or(0.0);
    if !value.is_finite() {
        return 0.0;
    }
    if negative {
        -value
    } else {
        value
    }
}

fn split_sign(s: &str) -> (bool, &str) {
    if let Some(rest) = s.strip_prefix('-') {
        (true, rest)
    } else if let Some(rest) = s.strip_prefix('+') {
        (false, rest)
    } else {
        (false, s)
    }
}

/// Rounds to the nearest tenth.
pub fn round_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Formats a second count as `MM:SS`. Minutes are not wrapped into hours.
pub fn format_clock(total_seconds: u32) -> String {
    format!("{:02}:{:02}", total_seconds / 60, total_seconds % 60)
}
