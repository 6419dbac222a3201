//! Period-over-period percent change

/// Replace NaN and infinities with zero.
pub fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

/// Relative change from `previous` to `current`, in percent.
///
/// A zero baseline yields 100 when something appeared and 0 when nothing
/// did. Every KPI metric goes through this function.
pub fn change_pct(current: f64, previous: f64) -> f64 {
    let current = finite_or_zero(current);
    let previous = finite_or_zero(previous);
    if previous == 0.0 {
        return if current > 0.0 { 100.0 } else { 0.0 };
    }
    finite_or_zero((current - previous) / previous * 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_baseline() {
        assert_eq!(change_pct(0.0, 0.0), 0.0);
        assert_eq!(change_pct(42.0, 0.0), 100.0);
    }

    #[test]
    fn test_relative_change() {
        assert_eq!(change_pct(150.0, 100.0), 50.0);
        assert_eq!(change_pct(50.0, 100.0), -50.0);
        assert_eq!(change_pct(0.0, 80.0), -100.0);
    }

    #[test]
    fn test_non_finite_inputs_are_zero() {
        assert_eq!(change_pct(f64::NAN, 100.0), -100.0);
        assert_eq!(change_pct(10.0, f64::INFINITY), 100.0);
        assert_eq!(change_pct(f64::NAN, f64::NAN), 0.0);
    }

    #[test]
    fn test_negative_baseline_keeps_formula() {
        // surplus can be negative; the sign follows the plain formula
        assert_eq!(change_pct(-50.0, -100.0), -50.0);
    }
}
