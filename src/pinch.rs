//! Pinch/click detection — the primary click mechanism, driven purely by
//! geometry and independent of the sequence classifier — plus the
//! depth-touch secondary trigger.
//!
//! The pinch detector averages the scale-normalized thumb–index distance
//! over a small rolling window, compares it against hysteresis thresholds
//! that adapt to hand scale, and runs a strict four-state click machine:
//! Idle → Pinching → Clicked → Released → Idle.

use std::collections::VecDeque;

use tracing::debug;

// ── Click state ────────────────────────────────────────────

/// Click state machine. Only the transitions
/// Idle→Pinching, Pinching→Clicked, Pinching→Released,
/// Clicked→Released and Released→Idle are reachable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickState {
    Idle,
    Pinching,
    Clicked,
    Released,
}

impl ClickState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Pinching => "pinching",
            Self::Clicked => "clicked",
            Self::Released => "released",
        }
    }
}

// ── Config ─────────────────────────────────────────────────

/// Tunables for pinch/click detection. Distances are in hand-scale units
/// (raw distance divided by hand scale).
#[derive(Debug, Clone)]
pub struct PinchConfig {
    /// Rolling-average window over the normalized pinch distance.
    pub window: usize,
    /// Hand scale the base thresholds were tuned at.
    pub reference_scale: f32,
    /// Rolling average below this starts a pinch candidate (at reference
    /// scale; scaled up for smaller/farther hands).
    pub start_threshold: f32,
    /// Rolling average above this releases the pinch. Must exceed
    /// `start_threshold` (hysteresis).
    pub end_threshold: f32,
    /// Bounds on the dynamic threshold factor.
    pub threshold_factor_range: (f32, f32),
    /// Seconds the candidate must be held before confirmation.
    pub min_hold_s: f64,
    /// Consecutive sub-threshold frames required before confirmation.
    pub min_stable_frames: u32,
    /// Hand velocity above which a pinch cannot confirm.
    pub max_speed: f32,
    /// Confidence penalty per unit of hand velocity.
    pub speed_penalty: f32,
    /// Minimum confidence to confirm a pinch.
    pub min_confidence: f32,
    /// Seconds between click events.
    pub cooldown_s: f64,
}

impl Default for PinchConfig {
    fn default() -> Self {
        Self {
            window: 5,
            reference_scale: 0.18,
            start_threshold: 0.35,
            end_threshold: 0.55,
            threshold_factor_range: (0.75, 1.5),
            min_hold_s: 0.10,
            min_stable_frames: 3,
            max_speed: 2.0,
            speed_penalty: 0.15,
            min_confidence: 0.20,
            cooldown_s: 0.6,
        }
    }
}

// ── Detector ───────────────────────────────────────────────

/// Geometric pinch detector and click state machine.
#[derive(Debug)]
pub struct PinchClickDetector {
    config: PinchConfig,
    state: ClickState,
    distances: VecDeque<f32>,
    candidate_since: Option<f64>,
    stable_frames: u32,
    last_click_s: Option<f64>,
}

impl PinchClickDetector {
    pub fn new(config: PinchConfig) -> Self {
        Self {
            distances: VecDeque::with_capacity(config.window),
            config,
            state: ClickState::Idle,
            candidate_since: None,
            stable_frames: 0,
            last_click_s: None,
        }
    }

    /// Start/end thresholds adjusted for the current hand scale: a smaller
    /// (farther) hand gets proportionally more forgiving thresholds.
    fn dynamic_thresholds(&self, scale: f32) -> (f32, f32) {
        let (lo, hi) = self.config.threshold_factor_range;
        let factor = (self.config.reference_scale / scale.max(f32::EPSILON)).clamp(lo, hi);
        (
            self.config.start_threshold * factor,
            self.config.end_threshold * factor,
        )
    }

    /// Advance one frame. `norm_distance` is the thumb–index distance
    /// divided by hand scale; `speed` is the aggregate hand velocity.
    /// Returns true exactly when a click fires this frame.
    pub fn update(&mut self, norm_distance: f32, scale: f32, speed: f32, now_s: f64) -> bool {
        if self.distances.len() == self.config.window {
            self.distances.pop_front();
        }
        self.distances
            .push_back(if norm_distance.is_finite() { norm_distance } else { f32::MAX });
        let avg: f32 = self.distances.iter().sum::<f32>() / self.distances.len() as f32;

        let (start, end) = self.dynamic_thresholds(scale);
        let start_signal = avg < start;
        let release_signal = avg > end;
        let mut fired = false;

        match self.state {
            ClickState::Idle => {
                if start_signal {
                    let since = *self.candidate_since.get_or_insert(now_s);
                    self.stable_frames += 1;

                    let held = now_s - since >= self.config.min_hold_s;
                    let closeness = ((start - avg) / start).clamp(0.0, 1.0);
                    let confidence = closeness - self.config.speed_penalty * speed;

                    if held
                        && self.stable_frames >= self.config.min_stable_frames
                        && speed <= self.config.max_speed
                        && confidence >= self.config.min_confidence
                    {
                        debug!(avg, confidence, "pinch confirmed");
                        self.state = ClickState::Pinching;
                    }
                } else {
                    self.candidate_since = None;
                    self.stable_frames = 0;
                }
            }
            ClickState::Pinching => {
                let cooled = self
                    .last_click_s
                    .map_or(true, |t| now_s - t >= self.config.cooldown_s);
                if cooled {
                    debug!(now_s, "click fired");
                    self.state = ClickState::Clicked;
                    self.last_click_s = Some(now_s);
                    fired = true;
                } else if release_signal {
                    // Cooldown blocked the click; fall through to release.
                    self.state = ClickState::Released;
                }
            }
            ClickState::Clicked => {
                if release_signal {
                    self.state = ClickState::Released;
                }
            }
            ClickState::Released => {
                if !start_signal {
                    self.state = ClickState::Idle;
                    self.candidate_since = None;
                    self.stable_frames = 0;
                }
            }
        }

        fired
    }

    pub fn state(&self) -> ClickState {
        self.state
    }

    /// Whether a pinch is currently engaged (any non-idle state).
    pub fn is_pinching(&self) -> bool {
        self.state != ClickState::Idle
    }

    /// Restore initial values: rolling window, candidate timers and the
    /// state machine.
    pub fn reset(&mut self) {
        self.state = ClickState::Idle;
        self.distances.clear();
        self.candidate_since = None;
        self.stable_frames = 0;
        self.last_click_s = None;
    }
}

impl Default for PinchClickDetector {
    fn default() -> Self {
        Self::new(PinchConfig::default())
    }
}

// ── Depth touch ────────────────────────────────────────────

/// Tunables for the depth-touch secondary click. Depth grows more negative
/// toward the camera.
#[derive(Debug, Clone)]
pub struct DepthTouchConfig {
    /// Depth the fingertip must cross to trigger.
    pub near_z: f32,
    /// More lenient depth that clears the active flag (hysteresis).
    pub exit_z: f32,
    /// Minimum forward (toward-camera) depth velocity, in depth units per
    /// second. Positive value; the measured velocity must be below its
    /// negation.
    pub min_forward_velocity: f32,
    /// Seconds between triggers while the finger hovers near the
    /// threshold. A full retraction past `exit_z` re-arms immediately.
    pub cooldown_s: f64,
}

impl Default for DepthTouchConfig {
    fn default() -> Self {
        Self {
            near_z: -0.12,
            exit_z: -0.06,
            min_forward_velocity: 0.4,
            cooldown_s: 0.5,
        }
    }
}

/// Secondary click trigger on the index fingertip's depth coordinate.
#[derive(Debug)]
pub struct DepthTouchDetector {
    config: DepthTouchConfig,
    active: bool,
    prev_z: Option<f32>,
    last_fire_s: Option<f64>,
}

impl DepthTouchDetector {
    pub fn new(config: DepthTouchConfig) -> Self {
        Self {
            config,
            active: false,
            prev_z: None,
            last_fire_s: None,
        }
    }

    /// Advance one frame with the index fingertip depth. Returns true when
    /// a touch fires.
    pub fn update(&mut self, tip_z: f32, now_s: f64, dt_s: f64) -> bool {
        let vz = match self.prev_z {
            Some(prev) if dt_s > 0.0 => (tip_z - prev) / dt_s as f32,
            _ => 0.0,
        };
        self.prev_z = Some(tip_z);

        let mut fired = false;
        if !self.active {
            let cooled = self
                .last_fire_s
                .map_or(true, |t| now_s - t >= self.config.cooldown_s);
            if cooled && tip_z < self.config.near_z && vz < -self.config.min_forward_velocity {
                debug!(tip_z, vz, "depth touch fired");
                self.active = true;
                self.last_fire_s = Some(now_s);
                fired = true;
            }
        } else if tip_z > self.config.exit_z {
            // Full retraction: clear the flag and the cooldown so the next
            // press can fire immediately.
            self.active = false;
            self.last_fire_s = None;
        }
        fired
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Forget the previous depth sample. Called across tracking gaps:
    /// displacement accumulated while the hand was invisible must not be
    /// divided by a single frame's dt and read as an approach velocity.
    pub fn clear_motion(&mut self) {
        self.prev_z = None;
    }

    pub fn reset(&mut self) {
        self.active = false;
        self.prev_z = None;
        self.last_fire_s = None;
    }
}

impl Default for DepthTouchDetector {
    fn default() -> Self {
        Self::new(DepthTouchConfig::default())
    }
}

// ── Tests ──────────────────────────────────────────────────
