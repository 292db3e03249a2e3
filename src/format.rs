//! Response field formatting for the emulated dialects.
//!
//! Every family has its own numeric habits: the Vötsch chambers send
//! zero-padded six-character fields (`0027.1`, `-017.3`), the Maturo NCD
//! answers positions as integers but limits with two decimals, and the
//! Innco CO3000 echoes a commanded target the way a bare float prints
//! (`-123.4`, `100.0`). These helpers keep those habits in one place so
//! the handlers stay readable.

/// Zero-padded fixed field, six characters wide with one decimal.
///
/// `27.1` becomes `0027.1`, `-17.3` becomes `-017.3`. Values too wide for
/// six characters are printed in full rather than truncated.
pub fn zero_padded(value: f64) -> String {
    format!("{value:06.1}")
}

/// Plain decimal with a fixed number of places (`%.Nf` style).
pub fn decimals(value: f64, places: usize) -> String {
    format!("{value:.places$}")
}

/// Echo a commanded value the way a bare float prints.
///
/// Integral values keep one decimal (`100.0`), everything else prints in
/// shortest form (`-123.4`). Used where a dialect echoes back the number
/// the client sent after round-tripping it through a float.
pub fn float_echo(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{value:.1}")
    } else {
        format!("{value}")
    }
}

/// Replace control characters so a wire exchange can go into a log line.
pub fn printable(text: &str) -> String {
    text.replace('\r', "<CR>").replace('\n', "<LF>")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_padded_positive() {
        assert_eq!(zero_padded(27.1), "0027.1");
        assert_eq!(zero_padded(19.2), "0019.2");
        assert_eq!(zero_padded(0.0), "0000.0");
    }

    #[test]
    fn test_zero_padded_negative_keeps_width() {
        assert_eq!(zero_padded(-17.3), "-017.3");
        assert_eq!(zero_padded(-12.3), "-012.3");
    }

    #[test]
    fn test_zero_padded_wide_value_not_truncated() {
        assert_eq!(zero_padded(12345.6), "12345.6");
    }

    #[test]
    fn test_decimals() {
        assert_eq!(decimals(123.456, 0), "123");
        assert_eq!(decimals(123.456, 1), "123.5");
        assert_eq!(decimals(-93.2, 2), "-93.20");
    }

    #[test]
    fn test_float_echo() {
        assert_eq!(float_echo(-123.4), "-123.4");
        assert_eq!(float_echo(100.0), "100.0");
        assert_eq!(float_echo(5.2), "5.2");
        assert_eq!(float_echo(0.0), "0.0");
    }

    #[test]
    fn test_printable() {
        assert_eq!(printable("CP\r\n"), "CP<CR><LF>");
        assert_eq!(printable("plain"), "plain");
    }
}
