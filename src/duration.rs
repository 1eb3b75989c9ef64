//! Duration strings in the `4m0s` / `1h30m` / `500ms` notation used by
//! kubeadm configuration files.

use std::time::Duration;

use serde::Serializer;

const NANOS_PER_MICRO: u128 = 1_000;
const NANOS_PER_MILLI: u128 = 1_000_000;
const NANOS_PER_SEC: u128 = 1_000_000_000;

/// Parse a duration string such as `5m0s`, `1h30m`, `1.5s` or `250ms`.
///
/// A bare `0` is accepted. Negative durations and numbers without a unit are
/// rejected.
pub fn parse_duration(input: &str) -> Result<Duration, String> {
    let s = input.trim();
    if s.is_empty() {
        return Err("empty duration".to_string());
    }
    if s == "0" {
        return Ok(Duration::ZERO);
    }
    if s.starts_with('-') {
        return Err(format!("negative duration \"{}\"", input));
    }
    let mut rest = s.strip_prefix('+').unwrap_or(s);
    let invalid = || format!("invalid duration \"{}\"", input);

    let mut total: u128 = 0;
    while !rest.is_empty() {
        let num_end = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(rest.len());
        let number = &rest[..num_end];
        rest = &rest[num_end..];

        let unit_end = rest
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(rest.len());
        let unit = &rest[..unit_end];
        rest = &rest[unit_end..];

        let unit_nanos = match unit {
            "ns" => 1,
            "us" | "µs" | "μs" => NANOS_PER_MICRO,
            "ms" => NANOS_PER_MILLI,
            "s" => NANOS_PER_SEC,
            "m" => 60 * NANOS_PER_SEC,
            "h" => 3600 * NANOS_PER_SEC,
            "" => return Err(format!("missing unit in duration \"{}\"", input)),
            other => {
                return Err(format!(
                    "unknown unit \"{}\" in duration \"{}\"",
                    other, input
                ));
            }
        };

        let (whole, frac) = number.split_once('.').unwrap_or((number, ""));
        if (whole.is_empty() && frac.is_empty()) || frac.contains('.') {
            return Err(invalid());
        }

        if !whole.is_empty() {
            let whole: u128 = whole.parse().map_err(|_| invalid())?;
            total = total
                .checked_add(whole.checked_mul(unit_nanos).ok_or_else(invalid)?)
                .ok_or_else(invalid)?;
        }

        if !frac.is_empty() {
            // Digits past nanosecond precision of the largest unit carry no weight.
            let frac = &frac[..frac.len().min(18)];
            let scale = 10u128.pow(frac.len() as u32);
            let frac: u128 = frac.parse().map_err(|_| invalid())?;
            total = total
                .checked_add(frac * unit_nanos / scale)
                .ok_or_else(invalid)?;
        }
    }

    let nanos = u64::try_from(total).map_err(|_| format!("duration \"{}\" overflows", input))?;
    Ok(Duration::from_nanos(nanos))
}

/// Format a duration the way kubeadm prints it, e.g. `4m0s` or `1h0m0s`.
pub fn format_duration(d: Duration) -> String {
    let nanos = d.as_nanos();
    if nanos == 0 {
        return "0s".to_string();
    }

    if nanos < NANOS_PER_MICRO {
        return format!("{}ns", nanos);
    }
    if nanos < NANOS_PER_MILLI {
        return format!("{}µs", fixed_point(nanos, 3));
    }
    if nanos < NANOS_PER_SEC {
        return format!("{}ms", fixed_point(nanos, 6));
    }

    let total_secs = d.as_secs();
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = fixed_point(
        u128::from(total_secs % 60) * NANOS_PER_SEC + u128::from(d.subsec_nanos()),
        9,
    );

    if hours > 0 {
        format!("{}h{}m{}s", hours, minutes, seconds)
    } else if minutes > 0 {
        format!("{}m{}s", minutes, seconds)
    } else {
        format!("{}s", seconds)
    }
}

/// Render `value / 10^precision` without trailing fractional zeros.
fn fixed_point(value: u128, precision: u32) -> String {
    let scale = 10u128.pow(precision);
    let whole = value / scale;
    let frac = value % scale;
    if frac == 0 {
        return whole.to_string();
    }
    let digits = format!("{:0width$}", frac, width = precision as usize);
    format!("{}.{}", whole, digits.trim_end_matches('0'))
}

/// `serialize_with` helper writing a duration as a kubeadm duration string.
pub fn serialize<S: Serializer>(d: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format_duration(*d))
}
