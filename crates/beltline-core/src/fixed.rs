use fixed::types::I16F16;

/// Q16.16 fixed-point. Used for render-facing interpolation fractions so
/// realized views stay deterministic across platforms; simulation state
/// itself is integer ticks.
pub type Fixed32 = I16F16;

/// Ticks are the atomic unit of simulation time.
pub type Ticks = u64;

/// The fraction `num / den` as Fixed32, clamped to [0, 1]. A zero
/// denominator yields 1 (a finished interval).
#[inline]
pub fn fixed32_ratio(num: Ticks, den: Ticks) -> Fixed32 {
    if den == 0 || num >= den {
        return Fixed32::from_num(1);
    }
    // Both fit in 16 integer bits after the clamp above only if den does;
    // scale via the raw Q16.16 representation to avoid intermediate loss.
    let scaled = (num as u128) << 16;
    Fixed32::from_bits((scaled / den as u128) as i32)
}

/// Convert Fixed32 to f64. Display only, never in the sim loop.
#[inline]
pub fn fixed32_to_f64(v: Fixed32) -> f64 {
    v.to_num::<f64>()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ratio_endpoints() {
        assert_eq!(fixed32_ratio(0, 10), Fixed32::from_num(0));
        assert_eq!(fixed32_ratio(10, 10), Fixed32::from_num(1));
        assert_eq!(fixed32_ratio(15, 10), Fixed32::from_num(1));
    }

    #[test]
    fn ratio_midpoint() {
        assert_eq!(fixed32_ratio(5, 10), Fixed32::from_num(0.5));
        assert_eq!(fixed32_ratio(1, 4), Fixed32::from_num(0.25));
    }

    #[test]
    fn ratio_zero_denominator_is_finished() {
        assert_eq!(fixed32_ratio(3, 0), Fixed32::from_num(1));
    }

    #[test]
    fn ratio_is_deterministic() {
        assert_eq!(fixed32_ratio(7, 13), fixed32_ratio(7, 13));
    }

    #[test]
    fn ratio_large_ticks() {
        // Denominators beyond 16 integer bits still resolve exactly.
        let third = fixed32_ratio(1_000_000, 3_000_000);
        assert!((fixed32_to_f64(third) - 1.0 / 3.0).abs() < 1e-4);
    }
}
