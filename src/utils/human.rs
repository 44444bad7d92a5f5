//! Human-readable byte counts for progress messages.

const SYMBOLS: [char; 8] = ['K', 'M', 'G', 'T', 'P', 'E', 'Z', 'Y'];

/// Formats a byte count with a binary (1024-based) suffix and one decimal,
/// e.g. `10000 -> "9.8K"`, `100001221 -> "95.4M"`. Values below 1 KiB are printed as
/// plain bytes (`"512B"`).
pub fn format_bytes(n: u64) -> String {
    for (i, symbol) in SYMBOLS.iter().enumerate().rev() {
        let prefix = 1u128 << ((i + 1) * 10);
        if u128::from(n) >= prefix {
            let value = n as f64 / prefix as f64;
            return format!("{value:.1}{symbol}");
        }
    }
    format!("{n}B")
}

/// Signed variant of [`format_bytes`] for memory deltas.
pub fn format_signed_bytes(n: i64) -> String {
    if n < 0 {
        format!("-{}", format_bytes(n.unsigned_abs()))
    } else {
        format_bytes(n as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(0), "0B");
        assert_eq!(format_bytes(1023), "1023B");
        assert_eq!(format_bytes(1024), "1.0K");
        assert_eq!(format_bytes(10000), "9.8K");
        assert_eq!(format_bytes(100001221), "95.4M");
        assert_eq!(format_bytes(3 * (1 << 30)), "3.0G");
    }

    #[test]
    fn test_format_signed_bytes() {
        assert_eq!(format_signed_bytes(-2048), "-2.0K");
        assert_eq!(format_signed_bytes(512), "512B");
    }
}
