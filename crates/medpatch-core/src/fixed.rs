use fixed::types::{I32F32, I64F64};

/// Q32.32 fixed-point: 32 integer bits, 32 fractional bits.
///
/// Every solution quantity in the crate is a `Fixed64`.
pub type Fixed64 = I32F32;

/// Wide intermediate used where a product of two quantities may not fit.
pub(crate) type Wide = I64F64;

/// Ticks are the atomic unit of simulation stepping.
pub type Ticks = u64;

/// Convert an f64 to Fixed64. Use only for initialization, never in sim loop.
#[inline]
pub fn f64_to_fixed64(v: f64) -> Fixed64 {
    Fixed64::from_num(v)
}

/// Convert Fixed64 to f64. Use only for display, never in sim loop.
#[inline]
pub fn fixed64_to_f64(v: Fixed64) -> f64 {
    v.to_num::<f64>()
}

/// `value * percent / 100`, computed in the wide type so large volumes
/// do not overflow. Saturates at `Fixed64::MAX`.
#[inline]
pub fn percent_of(value: Fixed64, percent: Fixed64) -> Fixed64 {
    let wide = Wide::from_num(value) * Wide::from_num(percent) / Wide::from_num(100);
    wide.saturating_to_num::<Fixed64>()
}

/// `a * b / c` in the wide type, truncated. Returns zero when `c` is zero.
#[inline]
pub(crate) fn mul_div(a: Fixed64, b: Fixed64, c: Fixed64) -> Fixed64 {
    if c == Fixed64::ZERO {
        return Fixed64::ZERO;
    }
    let wide = Wide::from_num(a) * Wide::from_num(b) / Wide::from_num(c);
    wide.saturating_to_num::<Fixed64>()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed64_basic_arithmetic() {
        let a = f64_to_fixed64(1.5);
        let b = f64_to_fixed64(2.0);
        assert_eq!(fixed64_to_f64(a + b), 3.5);
    }

    #[test]
    fn percent_of_half() {
        let v = Fixed64::from_num(30);
        assert_eq!(percent_of(v, Fixed64::from_num(50)), Fixed64::from_num(15));
    }

    #[test]
    fn percent_of_zero_and_full() {
        let v = Fixed64::from_num(12);
        assert_eq!(percent_of(v, Fixed64::ZERO), Fixed64::ZERO);
        assert_eq!(percent_of(v, Fixed64::from_num(100)), v);
    }

    #[test]
    fn percent_of_large_volume_does_not_overflow() {
        let v = Fixed64::from_num(2_000_000_000i64);
        assert_eq!(
            percent_of(v, Fixed64::from_num(100)),
            Fixed64::from_num(2_000_000_000i64)
        );
    }

    #[test]
    fn mul_div_by_zero_is_zero() {
        assert_eq!(
            mul_div(Fixed64::from_num(3), Fixed64::from_num(4), Fixed64::ZERO),
            Fixed64::ZERO
        );
    }

    #[test]
    fn mul_div_proportional_share() {
        // 6 of a 10-unit solution, reagent holds 5 -> share is 3.
        let share = mul_div(Fixed64::from_num(5), Fixed64::from_num(6), Fixed64::from_num(10));
        assert_eq!(share, Fixed64::from_num(3));
    }
}
