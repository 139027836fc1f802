//! Fixed-width number formatting for `.mod` files.
//!
//! Exponents are written with a sign and at least two digits (`1.013e+03`)
//! and non-finite values as `nan`, `inf` or `-inf`, which is what the
//! downstream readers of the files expect.

use std::fmt;

/// A fixed-width numeric format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumberFormat {
    /// Scientific notation, e.g. `9.3e`.
    Exp { width: usize, precision: usize },
    /// Fixed point, e.g. `7.3f`.
    Fixed { width: usize, precision: usize },
}

impl NumberFormat {
    pub const fn exp(width: usize, precision: usize) -> Self {
        Self::Exp { width, precision }
    }

    pub const fn fixed(width: usize, precision: usize) -> Self {
        Self::Fixed { width, precision }
    }

    /// Minimum field width.
    pub fn width(&self) -> usize {
        match *self {
            Self::Exp { width, .. } | Self::Fixed { width, .. } => width,
        }
    }

    /// Format a value right-aligned in the field width.
    pub fn format(&self, value: f64) -> String {
        let width = self.width();
        format!("{:>width$}", self.body(value), width = width)
    }

    fn body(&self, value: f64) -> String {
        if !value.is_finite() {
            return non_finite(value).to_string();
        }
        match *self {
            Self::Exp { precision, .. } => exponential(value, precision),
            Self::Fixed { precision, .. } => format!("{:.*}", precision, value),
        }
    }
}

impl fmt::Display for NumberFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exp { width, precision } => write!(f, "{}.{}e", width, precision),
            Self::Fixed { width, precision } => write!(f, "{}.{}f", width, precision),
        }
    }
}

fn non_finite(value: f64) -> &'static str {
    if value.is_nan() {
        "nan"
    } else if value > 0.0 {
        "inf"
    } else {
        "-inf"
    }
}

/// Scientific notation with a signed, zero-padded exponent.
fn exponential(value: f64, precision: usize) -> String {
    let raw = format!("{:.*e}", precision, value);
    match raw.split_once('e') {
        Some((mantissa, exp)) => {
            let exp: i32 = exp.parse().unwrap_or(0);
            let sign = if exp < 0 { '-' } else { '+' };
            format!("{}e{}{:02}", mantissa, sign, exp.abs())
        }
        None => raw,
    }
}

/// Centered text in a field, extra padding going to the right.
pub fn centered(text: &str, width: usize) -> String {
    format!("{:^width$}", text, width = width)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exponent_has_sign_and_two_digits() {
        let f = NumberFormat::exp(9, 3);
        assert_eq!(f.format(1013.25), "1.013e+03");
        assert_eq!(f.format(0.000123), "1.230e-04");
        assert_eq!(f.format(0.0), "0.000e+00");
        assert_eq!(f.format(-2.5e-7), "-2.500e-07");
        assert_eq!(NumberFormat::exp(10, 3).format(3.0e-6), " 3.000e-06");
        assert_eq!(NumberFormat::exp(11, 4).format(6.0e-5), " 6.0000e-05");
        assert_eq!(f.format(1.0e120), "1.000e+120");
    }

    #[test]
    fn test_fixed_point() {
        assert_eq!(NumberFormat::fixed(11, 3).format(288.15), "    288.150");
        assert_eq!(NumberFormat::fixed(6, 1).format(45.26), "  45.3");
        assert_eq!(NumberFormat::fixed(7, 3).format(-12.0), "-12.000");
        // Too wide values are not truncated
        assert_eq!(NumberFormat::fixed(5, 3).format(123.0), "123.000");
    }

    #[test]
    fn test_non_finite() {
        assert_eq!(NumberFormat::exp(9, 3).format(f64::NAN), "      nan");
        assert_eq!(NumberFormat::fixed(7, 3).format(f64::NAN), "    nan");
        assert_eq!(NumberFormat::fixed(7, 3).format(f64::NEG_INFINITY), "   -inf");
    }

    #[test]
    fn test_centered() {
        assert_eq!(centered("km", 7), "  km   ");
        assert_eq!(centered("Temperature", 11), "Temperature");
        assert_eq!(centered("K.m+2/kg/s", 10), "K.m+2/kg/s");
        assert_eq!(centered("RH", 6), "  RH  ");
    }

    #[test]
    fn test_display() {
        assert_eq!(NumberFormat::exp(9, 3).to_string(), "9.3e");
        assert_eq!(NumberFormat::fixed(7, 4).to_string(), "7.4f");
    }
}
