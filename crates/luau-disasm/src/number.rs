//! C `%g` style number formatting

/// Significant digits used for number constants (round-trips any `f64`)
pub const NUMBER_PRECISION: usize = 17;

/// Significant digits used for vector components (round-trips any `f32`)
pub const VECTOR_PRECISION: usize = 9;

/// Format `value` like C's `printf("%.*g", precision, value)`.
///
/// Uses fixed notation when the decimal exponent `x` satisfies
/// `-4 <= x < precision`, scientific notation otherwise, and strips trailing
/// zeros in both cases.
pub fn format_g(value: f64, precision: usize) -> String {
    if value.is_nan() {
        return "nan".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "inf" } else { "-inf" }.to_string();
    }

    let precision = precision.max(1);
    let scientific = format!("{:.*e}", precision - 1, value);
    let (mantissa, exponent) = match scientific.split_once('e') {
        Some(parts) => parts,
        None => return scientific,
    };
    let exponent: i32 = exponent.parse().unwrap_or(0);

    if exponent >= -4 && exponent < precision as i32 {
        let decimals = (precision as i32 - 1 - exponent) as usize;
        let fixed = format!("{:.*}", decimals, value);
        strip_trailing_zeros(&fixed).to_string()
    } else {
        let sign = if exponent < 0 { '-' } else { '+' };
        format!(
            "{}e{}{:02}",
            strip_trailing_zeros(mantissa),
            sign,
            exponent.unsigned_abs()
        )
    }
}

fn strip_trailing_zeros(s: &str) -> &str {
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.')
    } else {
        s
    }
}

/// `%.17g`
pub fn format_number(value: f64) -> String {
    format_g(value, NUMBER_PRECISION)
}

/// `%.9g`
pub fn format_vector_component(value: f32) -> String {
    format_g(f64::from(value), VECTOR_PRECISION)
}
