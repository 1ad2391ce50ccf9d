//! Implementations of the `ArrayElement` trait.

use num_traits::NumCast;

/// An array element type that can be read from or written to a
/// MODFLOW array block.
pub trait ArrayElement: Copy + PartialEq + NumCast + 'static {
    /// Parses one whitespace-delimited token.
    fn parse_token(token: &str) -> Option<Self>;

    /// Formats the value as one fixed-width, right-justified field.
    fn format_field(&self) -> String;

    /// Applies an array control record's `CNSTNT` multiplier.
    fn apply_cnstnt(self, cnstnt: f64) -> Self {
        match self.to_f64().and_then(|v| NumCast::from(v * cnstnt)) {
            Some(scaled) => scaled,
            // A multiplier that leaves the element's range keeps the
            // raw value.
            None => self,
        }
    }
}

impl ArrayElement for f32 {
    fn parse_token(token: &str) -> Option<Self> {
        // Fortran writers may emit D exponents.
        if token.bytes().any(|b| b == b'D' || b == b'd') {
            token.replace(&['D', 'd'][..], "E").parse().ok()
        } else {
            token.parse().ok()
        }
    }

    fn format_field(&self) -> String {
        // `f64::from` would be ambiguous here with `NumCast` in scope.
        let value: f64 = (*self).into();
        format!("{:>15}", format_e(value, 6))
    }
}

impl ArrayElement for i32 {
    fn parse_token(token: &str) -> Option<Self> {
        token.parse().ok()
    }

    fn format_field(&self) -> String {
        format!("{:>10}", self)
    }
}

/// Formats `value` like Fortran's `E` edit descriptor: a fixed number
/// of mantissa digits and a signed, at-least-two-digit exponent
/// (`1.000000E-03`). Rust's `{:E}` prints a bare exponent, so the
/// exponent is re-padded here.
fn format_e(value: f64, precision: usize) -> String {
    let formatted = format!("{:.*E}", precision, value);
    match formatted.split_once('E') {
        Some((mantissa, exponent)) => {
            let (sign, digits) = match exponent.strip_prefix('-') {
                Some(digits) => ('-', digits),
                None => ('+', exponent),
            };
            format!("{}E{}{:0>2}", mantissa, sign, digits)
        }
        None => formatted,
    }
}
