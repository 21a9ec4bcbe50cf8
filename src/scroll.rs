//! Open-palm scroll detection.
//!
//! Palm-open is a purely geometric test: a majority of the four non-thumb
//! fingers extended (tip above PIP in image coordinates). The detector arms
//! only after a run of consecutive open-palm frames, then converts
//! palm-center displacement into scroll deltas.
//!
//! Direction convention: the delta's sign is the inverse of the palm's
//! vertical image motion (y grows downward), so a palm moving toward
//! smaller y yields a positive, upward delta. The inverse mapping is
//! intentional and must be preserved.

use tracing::debug;

use crate::hand::{Hand, FINGER_TIP_PIP};

// ── Config ─────────────────────────────────────────────────

/// Tunables for palm-scroll detection.
#[derive(Debug, Clone)]
pub struct ScrollConfig {
    /// Non-thumb fingers (of 4) that must be extended for an open palm.
    pub min_extended: usize,
    /// Consecutive open-palm frames before scrolling arms.
    pub arm_frames: u32,
    /// Minimum palm displacement (normalized units) to dispatch a scroll.
    pub min_delta: f32,
    /// Pixels of scroll per normalized unit of palm motion.
    pub gain: f32,
    /// Per-event scroll magnitude cap in pixels.
    pub max_delta_px: f32,
    /// Minimum seconds between scroll dispatches.
    pub min_interval_s: f64,
    /// Also emit horizontal scroll deltas.
    pub horizontal: bool,
}

impl Default for ScrollConfig {
    fn default() -> Self {
        Self {
            min_extended: 3,
            arm_frames: 5,
            min_delta: 0.008,
            gain: 900.0,
            max_delta_px: 120.0,
            min_interval_s: 0.05,
            horizontal: false,
        }
    }
}

// ── Events ─────────────────────────────────────────────────

/// One dispatched scroll. Positive `delta_y` scrolls the content upward.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollDelta {
    pub delta_y: f32,
    pub delta_x: f32,
}

// ── Detector ───────────────────────────────────────────────

/// Open-palm scroll detector.
#[derive(Debug)]
pub struct PalmScrollDetector {
    config: ScrollConfig,
    open_frames: u32,
    prev_palm: Option<(f32, f32)>,
    last_scroll_s: Option<f64>,
}

impl PalmScrollDetector {
    pub fn new(config: ScrollConfig) -> Self {
        Self {
            config,
            open_frames: 0,
            prev_palm: None,
            last_scroll_s: None,
        }
    }

    /// Whether the hand currently shows an open palm: at least
    /// `min_extended` of the four non-thumb fingers with tip above PIP.
    pub fn is_open_palm(&self, hand: &Hand) -> bool {
        let extended = FINGER_TIP_PIP
            .iter()
            .filter(|(tip, pip)| hand.landmarks[*tip].y < hand.landmarks[*pip].y)
            .count();
        extended >= self.config.min_extended
    }

    /// Armed once the palm has stayed open long enough for scrolling to be
    /// deliberate rather than a transient pose.
    pub fn is_armed(&self) -> bool {
        self.open_frames >= self.config.arm_frames
    }

    /// Advance one frame. Returns a scroll delta when one should be
    /// dispatched.
    pub fn update(&mut self, hand: &Hand, now_s: f64) -> Option<ScrollDelta> {
        if !self.is_open_palm(hand) {
            self.open_frames = 0;
            self.prev_palm = None;
            return None;
        }

        self.open_frames = self.open_frames.saturating_add(1);
        let palm = hand.palm_center();
        let prev = self.prev_palm.replace(palm);

        if !self.is_armed() {
            return None;
        }
        let (px, py) = prev?;

        let dy = palm.1 - py;
        let dx = palm.0 - px;
        let interval_ok = self
            .last_scroll_s
            .map_or(true, |t| now_s - t >= self.config.min_interval_s);
        if !interval_ok {
            return None;
        }

        let vertical = dy.abs() >= self.config.min_delta;
        let horizontal = self.config.horizontal && dx.abs() >= self.config.min_delta;
        if !vertical && !horizontal {
            return None;
        }

        let cap = self.config.max_delta_px;
        // Inverse mapping: the delta opposes the palm's y motion.
        let delta = ScrollDelta {
            delta_y: if vertical {
                (-dy * self.config.gain).clamp(-cap, cap)
            } else {
                0.0
            },
            delta_x: if horizontal {
                (-dx * self.config.gain).clamp(-cap, cap)
            } else {
                0.0
            },
        };
        self.last_scroll_s = Some(now_s);
        debug!(delta_y = delta.delta_y, delta_x = delta.delta_x, "scroll dispatched");
        Some(delta)
    }

    /// Forget palm history across a tracking gap: displacement accumulated
    /// while the hand was invisible must not dispatch as one scroll, and
    /// the open-palm run has to restart before the detector re-arms.
    pub fn clear_motion(&mut self) {
        self.open_frames = 0;
        self.prev_palm = None;
    }

    pub fn reset(&mut self) {
        self.open_frames = 0;
        self.prev_palm = None;
        self.last_scroll_s = None;
    }
}

impl Default for PalmScrollDetector {
    fn default() -> Self {
        Self::new(ScrollConfig::default())
    }
}

// ── Tests ──────────────────────────────────────────────────
