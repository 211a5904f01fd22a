//! Number serialization following the ECMAScript `Number.prototype.toString`
//! rules that RFC 8785 mandates.

/// Largest integer magnitude an IEEE-754 double represents exactly (2^53)
const MAX_SAFE_INTEGER: u64 = 9_007_199_254_740_992;

/// Format an integer
///
/// Integers inside the double-safe range are written exactly. Anything
/// larger is written through the double path, matching what every other
/// JCS implementation produces for the same number.
pub(crate) fn format_int(i: i64) -> String {
    if i.unsigned_abs() <= MAX_SAFE_INTEGER {
        i.to_string()
    } else {
        format_finite_f64(i as f64)
    }
}

/// Format a finite double; the caller rejects NaN and infinities.
pub(crate) fn format_finite_f64(f: f64) -> String {
    debug_assert!(f.is_finite());
    if f == 0.0 {
        // Covers -0.0 as well
        return "0".to_string();
    }

    let sign = if f.is_sign_negative() { "-" } else { "" };

    // `{:e}` yields the shortest round-trip digits, e.g. "1.2345e-7"
    let sci = format!("{:e}", f.abs());
    let (mantissa, exponent) = match sci.split_once('e') {
        Some(parts) => parts,
        None => (sci.as_str(), "0"),
    };
    let digits: String = mantissa.chars().filter(|c| *c != '.').collect();
    let exponent: i32 = exponent.parse().unwrap_or(0);

    let k = digits.len() as i32;
    // Position of the decimal point relative to the digit string
    let n = exponent + 1;

    let body = if k <= n && n <= 21 {
        let mut s = digits;
        s.extend(std::iter::repeat('0').take((n - k) as usize));
        s
    } else if 0 < n && n <= 21 {
        let (int_part, frac_part) = digits.split_at(n as usize);
        format!("{}.{}", int_part, frac_part)
    } else if -6 < n && n <= 0 {
        let mut s = String::from("0.");
        s.extend(std::iter::repeat('0').take((-n) as usize));
        s.push_str(&digits);
        s
    } else {
        let exp = n - 1;
        let exp_sign = if exp < 0 { '-' } else { '+' };
        let (first, rest) = digits.split_at(1);
        if rest.is_empty() {
            format!("{}e{}{}", first, exp_sign, exp.abs())
        } else {
            format!("{}.{}e{}{}", first, rest, exp_sign, exp.abs())
        }
    };

    format!("{}{}", sign, body)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_and_negative_zero() {
        assert_eq!(format_finite_f64(0.0), "0");
        assert_eq!(format_finite_f64(-0.0), "0");
    }

    #[test]
    fn test_integral_doubles() {
        assert_eq!(format_finite_f64(1.0), "1");
        assert_eq!(format_finite_f64(-42.0), "-42");
        assert_eq!(format_finite_f64(100.0), "100");
        assert_eq!(format_finite_f64(1e20), "100000000000000000000");
    }

    #[test]
    fn test_exponent_thresholds() {
        assert_eq!(format_finite_f64(1e21), "1e+21");
        assert_eq!(format_finite_f64(1e-7), "1e-7");
        assert_eq!(format_finite_f64(0.000001), "0.000001");
        assert_eq!(format_finite_f64(1.5e-7), "1.5e-7");
    }

    #[test]
    fn test_fractions() {
        assert_eq!(format_finite_f64(0.1), "0.1");
        assert_eq!(format_finite_f64(123.456), "123.456");
        assert_eq!(format_finite_f64(-2.5), "-2.5");
    }

    #[test]
    fn test_rfc8785_vectors() {
        assert_eq!(format_finite_f64(f64::from_bits(0x0000000000000001)), "5e-324");
        assert_eq!(
            format_finite_f64(f64::from_bits(0x7fefffffffffffff)),
            "1.7976931348623157e+308"
        );
        assert_eq!(
            format_finite_f64(f64::from_bits(0x4340000000000000)),
            "9007199254740992"
        );
        assert_eq!(
            format_finite_f64(f64::from_bits(0x444b1ae4d6e2ef50)),
            "1e+21"
        );
        assert_eq!(
            format_finite_f64(f64::from_bits(0x44b52d02c7e14af6)),
            "1e+23"
        );
        assert_eq!(
            format_finite_f64(f64::from_bits(0x3eb0c6f7a0b5ed8d)),
            "0.000001"
        );
    }

    #[test]
    fn test_large_integers_use_double_path() {
        assert_eq!(format_int(9_007_199_254_740_992), "9007199254740992");
        assert_eq!(format_int(-17), "-17");
        assert_eq!(format_int(i64::MAX), "9223372036854776000");
    }
}
