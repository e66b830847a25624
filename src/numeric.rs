use crate::synteny::ScoreFloat;

fn close_enough(left: ScoreFloat, right: ScoreFloat, eps: ScoreFloat) -> bool {
    match (left.is_nan(), right.is_nan()) {
        (true, true) => true,
        (false, false) => (left - right).abs() < eps,
        _ => false,
    }
}

/// Assert two scores agree within `eps`. NaN only agrees with NaN.
pub fn assert_float_eq(left: ScoreFloat, right: ScoreFloat, eps: ScoreFloat) {
    assert!(
        close_enough(left, right, eps),
        "score {} differs from expected {} by more than {}",
        left,
        right,
        eps
    );
}

/// Assert two score profiles agree window by window within `eps`.
pub fn assert_floats_eq(left: &[ScoreFloat], right: &[ScoreFloat], eps: ScoreFloat) {
    assert_eq!(
        left.len(),
        right.len(),
        "profiles have {} and {} windows",
        left.len(),
        right.len()
    );
    for (window, (l, r)) in left.iter().zip(right).enumerate() {
        assert!(
            close_enough(*l, *r, eps),
            "window {}: score {} differs from expected {} by more than {}",
            window,
            l,
            r,
            eps
        );
    }
}
