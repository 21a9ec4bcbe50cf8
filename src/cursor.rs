//! Cursor motion filter — maps the raw normalized fingertip position into
//! screen space and low-pass filters it into a stable pointer.
//!
//! The filtered position is the one piece of state that survives hand loss
//! and session resets: on re-acquisition the cursor continues from where
//! it was instead of snapping to the raw input.

// ── Config ─────────────────────────────────────────────────

/// Tunables for cursor filtering. Pixel values are in screen coordinates.
#[derive(Debug, Clone)]
pub struct CursorConfig {
    /// Center-relative gain mapping normalized input to the screen. Values
    /// above 1 reach the screen edges before the hand reaches the camera
    /// frame edges, reducing overshoot near the borders.
    pub sensitivity: f32,
    /// EMA coefficient while tracking freely.
    pub alpha_free: f32,
    /// Slower EMA coefficient while a click is in progress.
    pub alpha_pinch: f32,
    /// Additional alpha per pixel of distance to the target, letting fast
    /// motion catch up quicker. Zero disables adaptation.
    pub speed_adapt: f32,
    /// Movements below this many pixels are treated as noise.
    pub dead_zone_px: f32,
    /// Extra damping on the step while actively pinching.
    pub freeze_weight: f32,
    /// Maximum step per target frame interval.
    pub max_step_px: f32,
    /// Frame interval the step cap is defined against.
    pub target_frame_interval_s: f64,
    /// Maximum change between consecutive steps.
    pub max_accel_px: f32,
}

impl Default for CursorConfig {
    fn default() -> Self {
        Self {
            sensitivity: 1.6,
            alpha_free: 0.45,
            alpha_pinch: 0.15,
            speed_adapt: 0.002,
            dead_zone_px: 2.0,
            freeze_weight: 0.35,
            max_step_px: 80.0,
            target_frame_interval_s: 1.0 / 30.0,
            max_accel_px: 40.0,
        }
    }
}

// ── Filter ─────────────────────────────────────────────────

/// Low-pass cursor filter with dead zone, pinch freeze and step clamping.
#[derive(Debug)]
pub struct CursorFilter {
    config: CursorConfig,
    position: Option<(f32, f32)>,
    last_step: (f32, f32),
}

impl CursorFilter {
    pub fn new(config: CursorConfig) -> Self {
        Self {
            config,
            position: None,
            last_step: (0.0, 0.0),
        }
    }

    /// Map a raw normalized position into screen pixels with the
    /// center-relative sensitivity gain.
    fn map_to_screen(&self, raw: (f32, f32), viewport: (f32, f32)) -> (f32, f32) {
        let s = self.config.sensitivity;
        let x = viewport.0 * (0.5 + (raw.0 - 0.5) * s);
        let y = viewport.1 * (0.5 + (raw.1 - 0.5) * s);
        (x.clamp(0.0, viewport.0), y.clamp(0.0, viewport.1))
    }

    /// Advance one frame with the raw fingertip position. Returns the
    /// filtered on-screen position.
    pub fn update(
        &mut self,
        raw: (f32, f32),
        pinching: bool,
        dt_s: f64,
        viewport: (f32, f32),
    ) -> (f32, f32) {
        let target = self.map_to_screen(raw, viewport);

        let pos = match self.position {
            Some(p) => p,
            None => {
                // Very first sample of the session: nothing to filter yet.
                self.position = Some(target);
                return target;
            }
        };

        let dx = target.0 - pos.0;
        let dy = target.1 - pos.1;
        let dist = (dx * dx + dy * dy).sqrt();
        if dist < self.config.dead_zone_px {
            self.last_step = (0.0, 0.0);
            return pos;
        }

        let base_alpha = if pinching {
            self.config.alpha_pinch
        } else {
            self.config.alpha_free
        };
        let alpha = (base_alpha * (1.0 + self.config.speed_adapt * dist)).clamp(base_alpha, 0.9);

        let mut step = (dx * alpha, dy * alpha);
        if pinching {
            step.0 *= self.config.freeze_weight;
            step.1 *= self.config.freeze_weight;
        }

        // Acceleration clamp: bound the change from the previous step.
        let ax = step.0 - self.last_step.0;
        let ay = step.1 - self.last_step.1;
        let accel = (ax * ax + ay * ay).sqrt();
        if accel > self.config.max_accel_px {
            let k = self.config.max_accel_px / accel;
            step = (self.last_step.0 + ax * k, self.last_step.1 + ay * k);
        }

        // Per-frame step cap, scaled with the actual frame interval.
        let dt_ratio = if dt_s > 0.0 {
            (dt_s / self.config.target_frame_interval_s).clamp(0.25, 4.0) as f32
        } else {
            1.0
        };
        let max_step = self.config.max_step_px * dt_ratio;
        let mag = (step.0 * step.0 + step.1 * step.1).sqrt();
        if mag > max_step {
            let k = max_step / mag;
            step = (step.0 * k, step.1 * k);
        }

        let next = (
            (pos.0 + step.0).clamp(0.0, viewport.0),
            (pos.1 + step.1).clamp(0.0, viewport.1),
        );
        self.position = Some(next);
        self.last_step = step;
        next
    }

    /// Current filtered position, if any sample has ever been seen.
    pub fn position(&self) -> Option<(f32, f32)> {
        self.position
    }

    /// Clear motion history but keep the position: the continuity
    /// invariant forbids snapping the cursor on hand re-acquisition.
    pub fn reset_motion(&mut self) {
        self.last_step = (0.0, 0.0);
    }
}

impl Default for CursorFilter {
    fn default() -> Self {
        Self::new(CursorConfig::default())
    }
}

// ── Tests ──────────────────────────────────────────────────
