//! Zoom engines — single-hand pinch zoom and two-hand spread zoom.
//!
//! Both variants share the same core machine: a smoothed controlling
//! scalar (EMA then rolling average), a baseline captured on arming, and
//! the Idle → Armed → Zooming → Cooldown cycle with a dead band and
//! per-frame step clamping. They differ in the controlling scalar and the
//! exit policy: the single-hand engine cools down on a timer, the two-hand
//! engine exits after a run of idle frames.

use std::collections::VecDeque;

use tracing::debug;

// ── Zoom state ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZoomState {
    Idle,
    Armed,
    Zooming,
    Cooldown,
}

impl ZoomState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Armed => "armed",
            Self::Zooming => "zooming",
            Self::Cooldown => "cooldown",
        }
    }
}

// ── Tuning ─────────────────────────────────────────────────

/// Tunables shared by both zoom variants. Deltas are in the controlling
/// scalar's units (hand-scale-normalized distance).
#[derive(Debug, Clone)]
pub struct ZoomTuning {
    /// EMA coefficient on the raw controlling scalar.
    pub ema_alpha: f32,
    /// Rolling-average window applied after the EMA.
    pub window: usize,
    /// Consistent frames required before arming (baseline capture).
    pub arm_frames: u32,
    /// |delta from baseline| at which zooming engages.
    pub enter_delta: f32,
    /// |delta| at or below which zooming disengages.
    pub exit_delta: f32,
    /// |delta| at or below which the zoom factor holds still while
    /// zooming. Sits between `exit_delta` and `enter_delta`.
    pub dead_band: f32,
    /// Step gain: per-frame step = delta × sensitivity.
    pub sensitivity: f32,
    /// Per-frame multiplicative step magnitude cap.
    pub max_step: f32,
    pub min_zoom: f32,
    pub max_zoom: f32,
}

impl Default for ZoomTuning {
    fn default() -> Self {
        Self {
            ema_alpha: 0.4,
            window: 5,
            arm_frames: 5,
            enter_delta: 0.12,
            exit_delta: 0.05,
            dead_band: 0.08,
            sensitivity: 0.9,
            max_step: 0.08,
            min_zoom: 0.5,
            max_zoom: 3.0,
        }
    }
}

/// How a zoom engine leaves the Zooming/Cooldown states.
#[derive(Debug, Clone)]
enum ExitPolicy {
    /// Time-based cooldown after disengaging.
    Cooldown { duration_s: f64 },
    /// Return to idle after this many consecutive sub-exit frames, with no
    /// timed cooldown.
    IdleFrames { frames: u32 },
}

// ── Core machine ───────────────────────────────────────────

#[derive(Debug)]
struct ZoomCore {
    tuning: ZoomTuning,
    exit: ExitPolicy,
    state: ZoomState,
    zoom: f32,
    ema: Option<f32>,
    window: VecDeque<f32>,
    baseline: f32,
    consistent_frames: u32,
    idle_run: u32,
    cooldown_until: f64,
}

impl ZoomCore {
    fn new(tuning: ZoomTuning, exit: ExitPolicy) -> Self {
        Self {
            window: VecDeque::with_capacity(tuning.window),
            tuning,
            exit,
            state: ZoomState::Idle,
            zoom: 1.0,
            ema: None,
            baseline: 0.0,
            consistent_frames: 0,
            idle_run: 0,
            cooldown_until: 0.0,
        }
    }

    /// Smooth the raw scalar: EMA first, then a rolling-window average.
    fn stabilize(&mut self, raw: f32) -> f32 {
        let raw = if raw.is_finite() { raw } else { self.ema.unwrap_or(0.0) };
        let a = self.tuning.ema_alpha;
        let ema = match self.ema {
            Some(prev) => prev * (1.0 - a) + raw * a,
            None => raw,
        };
        self.ema = Some(ema);

        if self.window.len() == self.tuning.window {
            self.window.pop_front();
        }
        self.window.push_back(ema);
        self.window.iter().sum::<f32>() / self.window.len() as f32
    }

    /// Advance one frame. `step_damp` scales the applied step (1.0 = no
    /// damping). Returns the current zoom factor.
    fn advance(&mut self, raw: f32, step_damp: f32, now_s: f64) -> f32 {
        let value = self.stabilize(raw);

        match self.state {
            ZoomState::Idle => {
                self.consistent_frames += 1;
                if self.consistent_frames >= self.tuning.arm_frames {
                    self.state = ZoomState::Armed;
                    self.baseline = value;
                    debug!(baseline = value, "zoom armed");
                }
            }
            ZoomState::Armed => {
                let delta = value - self.baseline;
                if delta.abs() >= self.tuning.enter_delta {
                    self.state = ZoomState::Zooming;
                    self.idle_run = 0;
                    debug!(delta, "zooming engaged");
                }
            }
            ZoomState::Zooming => {
                let delta = value - self.baseline;
                if delta.abs() <= self.tuning.exit_delta {
                    match self.exit {
                        ExitPolicy::Cooldown { duration_s } => {
                            self.state = ZoomState::Cooldown;
                            self.cooldown_until = now_s + duration_s;
                        }
                        ExitPolicy::IdleFrames { frames } => {
                            self.idle_run += 1;
                            if self.idle_run >= frames {
                                self.force_idle();
                            }
                        }
                    }
                } else {
                    self.idle_run = 0;
                    if delta.abs() > self.tuning.dead_band {
                        let step = (delta * self.tuning.sensitivity * step_damp)
                            .clamp(-self.tuning.max_step, self.tuning.max_step);
                        self.zoom = (self.zoom * (1.0 + step))
                            .clamp(self.tuning.min_zoom, self.tuning.max_zoom);
                    }
                }
            }
            ZoomState::Cooldown => {
                if now_s >= self.cooldown_until {
                    self.force_idle();
                }
            }
        }

        self.zoom
    }

    /// Back to idle; the baseline is recaptured on the next arm.
    fn force_idle(&mut self) {
        self.state = ZoomState::Idle;
        self.consistent_frames = 0;
        self.idle_run = 0;
    }

    fn reset(&mut self) {
        self.force_idle();
        self.zoom = 1.0;
        self.ema = None;
        self.window.clear();
        self.baseline = 0.0;
        self.cooldown_until = 0.0;
    }
}

// ── Single-hand engine ─────────────────────────────────────

/// Config for single-hand pinch zoom.
#[derive(Debug, Clone)]
pub struct PinchZoomConfig {
    pub tuning: ZoomTuning,
    /// Seconds of cooldown after disengaging.
    pub cooldown_s: f64,
    /// Hand velocity above which the engine is forced idle.
    pub max_hand_speed: f32,
}

impl Default for PinchZoomConfig {
    fn default() -> Self {
        Self {
            tuning: ZoomTuning::default(),
            cooldown_s: 0.4,
            max_hand_speed: 2.0,
        }
    }
}

/// Single-hand zoom driven by the normalized thumb–index distance.
/// Mutually exclusive with clicking and scrolling: either forces idle.
#[derive(Debug)]
pub struct PinchZoomEngine {
    core: ZoomCore,
    max_hand_speed: f32,
}

impl PinchZoomEngine {
    pub fn new(config: PinchZoomConfig) -> Self {
        Self {
            core: ZoomCore::new(
                config.tuning,
                ExitPolicy::Cooldown {
                    duration_s: config.cooldown_s,
                },
            ),
            max_hand_speed: config.max_hand_speed,
        }
    }

    /// Advance one frame. `norm_distance` is the thumb–index distance over
    /// hand scale. Click/scroll activity or a fast hand forces idle.
    pub fn update(
        &mut self,
        norm_distance: f32,
        hand_speed: f32,
        click_active: bool,
        scroll_active: bool,
        now_s: f64,
    ) -> f32 {
        if click_active || scroll_active || hand_speed > self.max_hand_speed {
            self.core.force_idle();
            // Keep the smoothing warm but never step.
            self.core.stabilize(norm_distance);
            return self.core.zoom;
        }
        self.core.advance(norm_distance, 1.0, now_s)
    }

    pub fn state(&self) -> ZoomState {
        self.core.state
    }

    pub fn zoom(&self) -> f32 {
        self.core.zoom
    }

    pub fn is_zooming(&self) -> bool {
        self.core.state == ZoomState::Zooming
    }

    /// Drop to idle but keep the zoom factor and smoothing history.
    pub fn disarm(&mut self) {
        self.core.force_idle();
    }

    pub fn reset(&mut self) {
        self.core.reset();
    }
}

impl Default for PinchZoomEngine {
    fn default() -> Self {
        Self::new(PinchZoomConfig::default())
    }
}

// ── Two-hand engine ────────────────────────────────────────

/// Config for two-hand zoom.
#[derive(Debug, Clone)]
pub struct TwoHandZoomConfig {
    pub tuning: ZoomTuning,
    /// Consecutive sub-exit frames before returning to idle.
    pub idle_exit_frames: u32,
    /// Neither palm may exceed this speed for the engine to arm or engage.
    pub entry_speed_cap: f32,
    /// Pair speed above which steps are dampened (not disabled).
    pub damp_speed: f32,
    /// Step multiplier applied while the pair moves fast.
    pub fast_damp: f32,
}

impl Default for TwoHandZoomConfig {
    fn default() -> Self {
        Self {
            tuning: ZoomTuning {
                // Hands move over a larger range than a pinch; wider bands.
                enter_delta: 0.25,
                exit_delta: 0.10,
                dead_band: 0.16,
                sensitivity: 0.5,
                ..ZoomTuning::default()
            },
            idle_exit_frames: 6,
            entry_speed_cap: 1.5,
            damp_speed: 2.5,
            fast_damp: 0.35,
        }
    }
}

/// Two-hand zoom driven by the distance between the two palm centers,
/// normalized by the mean of both hand scales.
#[derive(Debug)]
pub struct TwoHandZoomEngine {
    core: ZoomCore,
    entry_speed_cap: f32,
    damp_speed: f32,
    fast_damp: f32,
}

impl TwoHandZoomEngine {
    pub fn new(config: TwoHandZoomConfig) -> Self {
        Self {
            core: ZoomCore::new(
                config.tuning,
                ExitPolicy::IdleFrames {
                    frames: config.idle_exit_frames,
                },
            ),
            entry_speed_cap: config.entry_speed_cap,
            damp_speed: config.damp_speed,
            fast_damp: config.fast_damp,
        }
    }

    /// Controlling scalar for a pair of palms.
    pub fn pair_distance(palms: [(f32, f32); 2], scales: [f32; 2]) -> f32 {
        let dx = palms[1].0 - palms[0].0;
        let dy = palms[1].1 - palms[0].1;
        let mean_scale = ((scales[0] + scales[1]) * 0.5).max(f32::EPSILON);
        (dx * dx + dy * dy).sqrt() / mean_scale
    }

    /// Advance one frame with both hands' palm speeds. Entry is blocked
    /// while either hand moves faster than the cap; once zooming, a fast
    /// pair only dampens the step.
    pub fn update(&mut self, pair_distance: f32, speeds: [f32; 2], now_s: f64) -> f32 {
        let pair_speed = speeds[0].max(speeds[1]);

        if self.core.state != ZoomState::Zooming && pair_speed > self.entry_speed_cap {
            self.core.force_idle();
            self.core.stabilize(pair_distance);
            return self.core.zoom;
        }

        let damp = if pair_speed > self.damp_speed {
            self.fast_damp
        } else {
            1.0
        };
        self.core.advance(pair_distance, damp, now_s)
    }

    pub fn state(&self) -> ZoomState {
        self.core.state
    }

    pub fn zoom(&self) -> f32 {
        self.core.zoom
    }

    pub fn is_zooming(&self) -> bool {
        self.core.state == ZoomState::Zooming
    }

    /// Drop to idle but keep the zoom factor and smoothing history.
    pub fn disarm(&mut self) {
        self.core.force_idle();
    }

    pub fn reset(&mut self) {
        self.core.reset();
    }
}

impl Default for TwoHandZoomEngine {
    fn default() -> Self {
        Self::new(TwoHandZoomConfig::default())
    }
}

// ── Tests ──────────────────────────────────────────────────
