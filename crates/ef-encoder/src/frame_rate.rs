//! Frame-rate selection.

/// Tolerance used when comparing frame rates, which are usually the result
/// of a rational division (`30000/1001`).
const EPSILON: f64 = 1e-6;

/// Pick the candidate frame rate that fits `input` best.
///
/// An exact match wins. Otherwise the candidate dividing `input` evenly with
/// the smallest quotient is chosen, i.e. the largest even divisor. Returns
/// `None` when no candidate divides the input rate.
///
/// ```
/// use ef_encoder::frame_rate::matching_frame_rate;
///
/// assert_eq!(matching_frame_rate(25.0, &[29.97, 25.0]), Some(25.0));
/// assert_eq!(matching_frame_rate(25.0, &[2.5, 5.0]), Some(5.0));
/// assert_eq!(matching_frame_rate(25.0, &[29.97, 10.0]), None);
/// ```
pub fn matching_frame_rate(input: f64, candidates: &[f64]) -> Option<f64> {
    if !input.is_finite() || input <= 0.0 {
        return None;
    }

    if let Some(exact) = candidates.iter().find(|r| (**r - input).abs() < EPSILON) {
        return Some(*exact);
    }

    let mut best: Option<(f64, f64)> = None;
    for &rate in candidates {
        if !rate.is_finite() || rate <= 0.0 {
            continue;
        }
        let quotient = (input / rate).round();
        if quotient < 1.0 || (quotient * rate - input).abs() > EPSILON * input.max(1.0) {
            continue;
        }
        if best.map_or(true, |(lowest, _)| quotient < lowest) {
            best = Some((quotient, rate));
        }
    }
    best.map(|(_, rate)| rate)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_match() {
        assert_eq!(matching_frame_rate(25.0, &[25.0]), Some(25.0));
        assert_eq!(matching_frame_rate(25.0, &[29.97, 25.0]), Some(25.0));
    }

    #[test]
    fn divisor_match() {
        assert_eq!(matching_frame_rate(25.0, &[2.5]), Some(2.5));
    }

    #[test]
    fn largest_divisor_wins() {
        assert_eq!(matching_frame_rate(25.0, &[2.5, 5.0]), Some(5.0));
        assert_eq!(matching_frame_rate(25.0, &[5.0, 2.5]), Some(5.0));
    }

    #[test]
    fn no_match() {
        assert_eq!(matching_frame_rate(25.0, &[29.97, 10.0]), None);
        assert_eq!(matching_frame_rate(25.0, &[]), None);
    }

    #[test]
    fn ntsc_rates() {
        let input = 30000.0 / 1001.0;
        assert_eq!(matching_frame_rate(input, &[input / 2.0, 25.0]), Some(input / 2.0));
    }

    #[test]
    fn unknown_input_rate() {
        assert_eq!(matching_frame_rate(0.0, &[25.0]), None);
        assert_eq!(matching_frame_rate(f64::NAN, &[25.0]), None);
    }
}
