//! Feature extraction — turns one hand's landmarks (plus the previous
//! frame's, when available) into the fixed-width vector the sequence
//! classifier was trained on, along with the aggregate hand velocity the
//! detectors use for gating.
//!
//! Extraction is a pure function of its inputs: the same frame fed twice
//! yields the same output.

use crate::hand::{
    Hand, FINGERTIPS, FINGER_CURL_JOINTS, INDEX_TIP, LANDMARK_COUNT, PINKY_TIP, THUMB_TIP, WRIST,
};

/// Fixed feature-vector width:
/// 5 wrist→tip distances, 4 adjacent tip→tip distances, 2 spread distances,
/// 5 curl ratios, 21 per-landmark velocity norms, 1 aggregate hand velocity.
pub const FEATURE_DIM: usize = 38;

/// Every feature component is clamped into this range so degenerate
/// geometry can never blow up downstream numerics.
pub const FEATURE_CLAMP: f32 = 5.0;

const EPSILON: f32 = 1e-4;

/// Output of one extraction pass. Palm center and scale are returned so
/// detectors reuse the same per-frame values instead of recomputing them.
#[derive(Debug, Clone)]
pub struct FeatureFrame {
    /// Classifier input vector, always `FEATURE_DIM` wide.
    pub vector: [f32; FEATURE_DIM],
    /// Palm-center displacement per second, normalized by hand scale.
    pub hand_velocity: f32,
    /// Palm center in normalized image coordinates.
    pub palm_center: (f32, f32),
    /// Hand scale used for normalization this frame.
    pub scale: f32,
}

fn clamp(v: f32) -> f32 {
    if v.is_finite() {
        v.clamp(-FEATURE_CLAMP, FEATURE_CLAMP)
    } else {
        0.0
    }
}

/// Extract the feature vector and hand velocity for one frame.
///
/// `prev` is the previous frame's landmarks for the same hand; velocities
/// are zero when it is absent or `dt_s` is not positive.
pub fn extract(hand: &Hand, prev: Option<&Hand>, dt_s: f64, min_scale: f32) -> FeatureFrame {
    let scale = hand.scale(min_scale);
    let palm_center = hand.palm_center();
    let mut vector = [0.0f32; FEATURE_DIM];
    let mut idx = 0;

    // Wrist→fingertip distances.
    for &tip in &FINGERTIPS {
        vector[idx] = clamp(hand.landmark_distance(WRIST, tip) / scale);
        idx += 1;
    }

    // Adjacent fingertip→fingertip distances.
    for pair in FINGERTIPS.windows(2) {
        vector[idx] = clamp(hand.landmark_distance(pair[0], pair[1]) / scale);
        idx += 1;
    }

    // Spread distances.
    vector[idx] = clamp(hand.landmark_distance(INDEX_TIP, PINKY_TIP) / scale);
    idx += 1;
    vector[idx] = clamp(hand.landmark_distance(THUMB_TIP, PINKY_TIP) / scale);
    idx += 1;

    // Per-finger curl: tip-to-base over pip-to-base. A curled finger pulls
    // the tip toward the base, driving the ratio below 1.
    for &(tip, pip, base) in &FINGER_CURL_JOINTS {
        let tip_to_base = hand.landmark_distance(tip, base);
        let pip_to_base = hand.landmark_distance(pip, base).max(EPSILON);
        vector[idx] = clamp(tip_to_base / pip_to_base);
        idx += 1;
    }

    // Per-landmark velocity norms, scale- and time-normalized.
    let usable_dt = dt_s > 0.0;
    for i in 0..LANDMARK_COUNT {
        let v = match prev {
            Some(p) if usable_dt => {
                hand.landmarks[i].distance_2d(&p.landmarks[i]) / scale / dt_s as f32
            }
            _ => 0.0,
        };
        vector[idx] = clamp(v);
        idx += 1;
    }

    // Aggregate hand velocity from palm-center displacement.
    let hand_velocity = match prev {
        Some(p) if usable_dt => {
            let (px, py) = p.palm_center();
            let dx = palm_center.0 - px;
            let dy = palm_center.1 - py;
            clamp((dx * dx + dy * dy).sqrt() / scale / dt_s as f32).abs()
        }
        _ => 0.0,
    };
    vector[idx] = hand_velocity;
    idx += 1;

    debug_assert_eq!(idx, FEATURE_DIM);

    FeatureFrame {
        vector,
        hand_velocity,
        palm_center,
        scale,
    }
}

// ── Tests ──────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hand::{test_hand, Landmark};

    #[test]
    fn test_dimension_and_clamp_range() {
        let hand = test_hand();
        let frame = extract(&hand, None, 1.0 / 30.0, 0.01);
        assert_eq!(frame.vector.len(), FEATURE_DIM);
        for (i, v) in frame.vector.iter().enumerate() {
            assert!(
                (-FEATURE_CLAMP..=FEATURE_CLAMP).contains(v),
                "component {i} out of range: {v}"
            );
        }
    }

    #[test]
    fn test_idempotent_without_prev() {
        let hand = test_hand();
        let a = extract(&hand, None, 1.0 / 30.0, 0.01);
        let b = extract(&hand, None, 1.0 / 30.0, 0.01);
        assert_eq!(a.vector, b.vector);
        assert_eq!(a.hand_velocity, b.hand_velocity);
    }

    #[test]
    fn test_velocities_zero_without_prev() {
        let hand = test_hand();
        let frame = extract(&hand, None, 1.0 / 30.0, 0.01);
        // The trailing 22 components are velocities.
        for v in &frame.vector[FEATURE_DIM - 22..] {
            assert_eq!(*v, 0.0);
        }
        assert_eq!(frame.hand_velocity, 0.0);
    }

    #[test]
    fn test_velocities_zero_for_nonpositive_dt() {
        let hand = test_hand();
        let prev = test_hand();
        let frame = extract(&hand, Some(&prev), 0.0, 0.01);
        assert_eq!(frame.hand_velocity, 0.0);
    }

    #[test]
    fn test_motion_produces_velocity() {
        let prev = test_hand();
        let mut hand = test_hand();
        for lm in hand.landmarks.iter_mut() {
            lm.x += 0.05;
        }
        let frame = extract(&hand, Some(&prev), 1.0 / 30.0, 0.01);
        assert!(frame.hand_velocity > 0.0, "palm moved but velocity is zero");
    }

    #[test]
    fn test_degenerate_hand_is_safe() {
        // Every landmark at the origin plus one NaN: output stays bounded.
        let mut hand = crate::hand::Hand::default();
        hand.landmarks[5] = Landmark::new(f32::NAN, f32::INFINITY, 0.0);
        let frame = extract(&hand, None, 1.0 / 30.0, 0.01);
        for v in &frame.vector {
            assert!(v.is_finite(), "non-finite feature leaked through");
        }
        assert!(frame.scale >= 0.01);
    }

    #[test]
    fn test_curl_ratio_drops_when_finger_curls() {
        let open = test_hand();
        let mut curled = test_hand();
        // Pull the index tip back near its MCP.
        let mcp = curled.landmarks[crate::hand::INDEX_MCP];
        curled.landmarks[crate::hand::INDEX_TIP] = Landmark::new(mcp.x, mcp.y + 0.01, 0.0);

        let open_frame = extract(&open, None, 1.0 / 30.0, 0.01);
        let curled_frame = extract(&curled, None, 1.0 / 30.0, 0.01);
        // Index curl ratio lives at offset 12 (5 + 4 + 2 distances, thumb curl first).
        assert!(
            curled_frame.vector[12] < open_frame.vector[12],
            "curl ratio should drop when the finger curls"
        );
    }
}
