//! Hand landmark model — 21 fixed-index points per hand, plus the derived
//! geometry every detector builds on: palm center, hand scale, distances.
//!
//! Coordinates follow the tracker's convention: x and y are normalized image
//! coordinates in [0,1] with y growing downward; z is a relative depth where
//! more negative means closer to the camera.

// ── Landmark indices ───────────────────────────────────────

pub const WRIST: usize = 0;
pub const THUMB_CMC: usize = 1;
pub const THUMB_MCP: usize = 2;
pub const THUMB_IP: usize = 3;
pub const THUMB_TIP: usize = 4;
pub const INDEX_MCP: usize = 5;
pub const INDEX_PIP: usize = 6;
pub const INDEX_DIP: usize = 7;
pub const INDEX_TIP: usize = 8;
pub const MIDDLE_MCP: usize = 9;
pub const MIDDLE_PIP: usize = 10;
pub const MIDDLE_DIP: usize = 11;
pub const MIDDLE_TIP: usize = 12;
pub const RING_MCP: usize = 13;
pub const RING_PIP: usize = 14;
pub const RING_DIP: usize = 15;
pub const RING_TIP: usize = 16;
pub const PINKY_MCP: usize = 17;
pub const PINKY_PIP: usize = 18;
pub const PINKY_DIP: usize = 19;
pub const PINKY_TIP: usize = 20;

/// Total number of landmarks per hand.
pub const LANDMARK_COUNT: usize = 21;

/// Fingertip landmarks in thumb-to-pinky order.
pub const FINGERTIPS: [usize; 5] = [THUMB_TIP, INDEX_TIP, MIDDLE_TIP, RING_TIP, PINKY_TIP];

/// (tip, pip) pairs for the four non-thumb fingers, used for
/// extended-vs-curled classification.
pub const FINGER_TIP_PIP: [(usize, usize); 4] = [
    (INDEX_TIP, INDEX_PIP),
    (MIDDLE_TIP, MIDDLE_PIP),
    (RING_TIP, RING_PIP),
    (PINKY_TIP, PINKY_PIP),
];

/// (tip, pip, mcp) triples per finger for curl ratios. The thumb uses its
/// IP joint in place of a PIP and the CMC as its base.
pub const FINGER_CURL_JOINTS: [(usize, usize, usize); 5] = [
    (THUMB_TIP, THUMB_IP, THUMB_CMC),
    (INDEX_TIP, INDEX_PIP, INDEX_MCP),
    (MIDDLE_TIP, MIDDLE_PIP, MIDDLE_MCP),
    (RING_TIP, RING_PIP, RING_MCP),
    (PINKY_TIP, PINKY_PIP, PINKY_MCP),
];

// ── Data structures ────────────────────────────────────────

/// A single tracked 3D point on a hand.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Landmark {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Euclidean distance in the image plane (x, y only). Depth is a
    /// relative unit and is deliberately excluded from planar distances.
    pub fn distance_2d(&self, other: &Landmark) -> f32 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// One hand as delivered by the tracker: an ordered, fixed-length set of
/// 21 landmarks.
#[derive(Debug, Clone, PartialEq)]
pub struct Hand {
    pub landmarks: [Landmark; LANDMARK_COUNT],
}

impl Default for Hand {
    fn default() -> Self {
        Self {
            landmarks: [Landmark::default(); LANDMARK_COUNT],
        }
    }
}

impl Hand {
    /// Build a hand from a flat `[x, y, z, x, y, z, ...]` slice.
    /// Returns `None` unless exactly 63 values are supplied.
    pub fn from_flat(data: &[f32]) -> Option<Self> {
        if data.len() != LANDMARK_COUNT * 3 {
            return None;
        }
        let mut hand = Hand::default();
        for (i, lm) in hand.landmarks.iter_mut().enumerate() {
            lm.x = data[i * 3];
            lm.y = data[i * 3 + 1];
            lm.z = data[i * 3 + 2];
        }
        Some(hand)
    }

    /// Planar distance between two landmarks by index.
    pub fn landmark_distance(&self, a: usize, b: usize) -> f32 {
        self.landmarks[a].distance_2d(&self.landmarks[b])
    }

    /// Palm center: centroid of wrist, index MCP, middle MCP and pinky MCP.
    pub fn palm_center(&self) -> (f32, f32) {
        let pts = [WRIST, INDEX_MCP, MIDDLE_MCP, PINKY_MCP];
        let mut x = 0.0;
        let mut y = 0.0;
        for &i in &pts {
            x += self.landmarks[i].x;
            y += self.landmarks[i].y;
        }
        (x / pts.len() as f32, y / pts.len() as f32)
    }

    /// Hand scale: mean of the wrist→index-MCP and wrist→middle-MCP
    /// distances, clamped to `min_scale`. Used to normalize every other
    /// geometric measurement against hand size and camera distance.
    pub fn scale(&self, min_scale: f32) -> f32 {
        let a = self.landmark_distance(WRIST, INDEX_MCP);
        let b = self.landmark_distance(WRIST, MIDDLE_MCP);
        let raw = (a + b) * 0.5;
        if raw.is_finite() {
            raw.max(min_scale)
        } else {
            min_scale
        }
    }

    /// Normalized thumb–index pinch distance (divided by hand scale).
    pub fn pinch_distance(&self, min_scale: f32) -> f32 {
        self.landmark_distance(THUMB_TIP, INDEX_TIP) / self.scale(min_scale)
    }
}

#[cfg(test)]
pub(crate) fn test_hand() -> Hand {
    // A rough open right hand: wrist at the bottom, fingers pointing up
    // (smaller y = higher in the image).
    let mut hand = Hand::default();
    let set = |h: &mut Hand, i: usize, x: f32, y: f32| {
        h.landmarks[i] = Landmark::new(x, y, 0.0);
    };
    set(&mut hand, WRIST, 0.50, 0.80);
    set(&mut hand, THUMB_CMC, 0.44, 0.74);
    set(&mut hand, THUMB_MCP, 0.40, 0.68);
    set(&mut hand, THUMB_IP, 0.37, 0.63);
    set(&mut hand, THUMB_TIP, 0.35, 0.58);
    set(&mut hand, INDEX_MCP, 0.46, 0.62);
    set(&mut hand, INDEX_PIP, 0.45, 0.54);
    set(&mut hand, INDEX_DIP, 0.44, 0.48);
    set(&mut hand, INDEX_TIP, 0.44, 0.42);
    set(&mut hand, MIDDLE_MCP, 0.50, 0.61);
    set(&mut hand, MIDDLE_PIP, 0.50, 0.52);
    set(&mut hand, MIDDLE_DIP, 0.50, 0.45);
    set(&mut hand, MIDDLE_TIP, 0.50, 0.39);
    set(&mut hand, RING_MCP, 0.54, 0.62);
    set(&mut hand, RING_PIP, 0.55, 0.54);
    set(&mut hand, RING_DIP, 0.55, 0.48);
    set(&mut hand, RING_TIP, 0.56, 0.42);
    set(&mut hand, PINKY_MCP, 0.58, 0.64);
    set(&mut hand, PINKY_PIP, 0.60, 0.58);
    set(&mut hand, PINKY_DIP, 0.61, 0.53);
    set(&mut hand, PINKY_TIP, 0.62, 0.49);
    hand
}

// ── Tests ──────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_flat_valid() {
        let data: Vec<f32> = (0..63).map(|i| i as f32 * 0.01).collect();
        let hand = Hand::from_flat(&data).expect("63 values should parse");
        assert!((hand.landmarks[0].x - 0.0).abs() < 1e-6);
        assert!((hand.landmarks[1].x - 0.03).abs() < 1e-6);
        assert!((hand.landmarks[20].z - 0.62).abs() < 1e-6);
    }

    #[test]
    fn test_from_flat_wrong_length() {
        assert!(Hand::from_flat(&[0.0; 10]).is_none());
        assert!(Hand::from_flat(&[0.0; 64]).is_none());
    }

    #[test]
    fn test_landmark_distance() {
        let mut hand = Hand::default();
        hand.landmarks[WRIST] = Landmark::new(0.0, 0.0, 0.0);
        hand.landmarks[INDEX_TIP] = Landmark::new(0.3, 0.4, 0.0);
        let d = hand.landmark_distance(WRIST, INDEX_TIP);
        assert!((d - 0.5).abs() < 1e-6, "expected 0.5, got {d}");
    }

    #[test]
    fn test_scale_positive_minimum() {
        // Degenerate hand: every landmark at the same point.
        let hand = Hand::default();
        let scale = hand.scale(0.01);
        assert!(scale >= 0.01, "scale must never drop below the minimum");
    }

    #[test]
    fn test_scale_nonfinite_falls_back() {
        let mut hand = Hand::default();
        hand.landmarks[INDEX_MCP] = Landmark::new(f32::NAN, 0.0, 0.0);
        assert_eq!(hand.scale(0.01), 0.01);
    }

    #[test]
    fn test_palm_center_of_test_hand() {
        let hand = test_hand();
        let (cx, cy) = hand.palm_center();
        assert!(cx > 0.4 && cx < 0.6, "palm center x off: {cx}");
        assert!(cy > 0.6 && cy < 0.75, "palm center y off: {cy}");
    }

    #[test]
    fn test_pinch_distance_normalized() {
        let hand = test_hand();
        let norm = hand.pinch_distance(0.01);
        let raw = hand.landmark_distance(THUMB_TIP, INDEX_TIP);
        assert!(norm > raw, "normalized distance should exceed raw for a small-scale hand");
    }
}
