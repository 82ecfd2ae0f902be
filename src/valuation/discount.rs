//! Closed-form discounted sums over year intervals
//!
//! Benefit in year `t` after the donation is worth `(1+r)^-t` of present
//! benefit. Sums are taken as continuous integrals so that window endpoints
//! may fall between whole years.

/// Rates closer to zero than this use the exact zero-rate formula
pub const RATE_EPSILON: f64 = 1e-10;

/// `∫_start^{start+length} e^{k t} dt` for a continuous log-rate `k`
///
/// Returns 0 for non-positive lengths and `length` when `|k| < RATE_EPSILON`.
pub fn exponential_integral(log_rate: f64, start: f64, length: f64) -> f64 {
    if length <= 0.0 {
        return 0.0;
    }
    if log_rate.abs() < RATE_EPSILON {
        return length;
    }
    // e^{k s} (e^{k L} - 1) / k, with expm1 to keep precision for small kL
    (log_rate * start).exp() * (log_rate * length).exp_m1() / log_rate
}

/// Discounted sum of one unit per year over `[start, end)`
///
/// `(1+r)^-start · (1 − (1+r)^-(end−start)) / ln(1+r)`
pub fn discounted_sum(rate: f64, start: f64, end: f64) -> f64 {
    discounted_window_sum(rate, start, end - start)
}

/// Discounted sum over a window given by start and length
pub fn discounted_window_sum(rate: f64, start: f64, length: f64) -> f64 {
    if length <= 0.0 {
        return 0.0;
    }
    if rate.abs() < RATE_EPSILON {
        return length;
    }
    exponential_integral(-rate.ln_1p(), start, length)
}

/// Discount factor at year `t`
pub fn discount_factor(rate: f64, t: f64) -> f64 {
    (1.0 + rate).powf(-t)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_empty_interval() {
        assert_eq!(discounted_sum(0.05, 10.0, 10.0), 0.0);
        assert_eq!(discounted_sum(0.05, 10.0, 5.0), 0.0);
        assert_eq!(discounted_sum(0.0, 3.0, 1.0), 0.0);
    }

    #[test]
    fn test_zero_rate_is_interval_length() {
        assert_eq!(discounted_sum(0.0, 2.0, 12.0), 10.0);
        assert_eq!(discounted_sum(1e-12, 0.0, 7.5), 7.5);
        assert_eq!(discounted_window_sum(0.0, 0.1, 0.2), 0.2);
    }

    #[test]
    fn test_closed_form() {
        // 10 years at 2%: (1 - 1.02^-10) / ln(1.02)
        let expected = (1.0 - 1.02_f64.powi(-10)) / 1.02_f64.ln();
        assert_relative_eq!(discounted_sum(0.02, 0.0, 10.0), expected, max_relative = 1e-12);
        assert_relative_eq!(
            discounted_sum(0.02, 0.0, 10.0),
            9.072114393603863,
            max_relative = 1e-12
        );
    }

    #[test]
    fn test_shift_scales_by_discount_factor() {
        let rate = 0.03;
        let near = discounted_sum(rate, 0.0, 5.0);
        let far = discounted_sum(rate, 20.0, 25.0);
        assert_relative_eq!(far, near * discount_factor(rate, 20.0), max_relative = 1e-12);
    }

    #[test]
    fn test_additive_over_adjacent_intervals() {
        let rate = 0.07;
        let whole = discounted_sum(rate, 1.5, 30.0);
        let split = discounted_sum(rate, 1.5, 12.25) + discounted_sum(rate, 12.25, 30.0);
        assert_relative_eq!(whole, split, max_relative = 1e-12);
    }

    #[test]
    fn test_negative_rate_grows() {
        assert!(discounted_sum(-0.02, 0.0, 10.0) > 10.0);
    }

    #[test]
    fn test_near_zero_rate_continuous_with_branch() {
        let tiny = discounted_sum(1e-9, 0.0, 10.0);
        assert_relative_eq!(tiny, 10.0, max_relative = 1e-7);
    }

    #[test]
    fn test_exponential_integral_growth() {
        // ∫0^1 e^t dt = e - 1
        assert_relative_eq!(
            exponential_integral(1.0, 0.0, 1.0),
            std::f64::consts::E - 1.0,
            max_relative = 1e-12
        );
    }
}
