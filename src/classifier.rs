//! Classifier interface and label stabilization.
//!
//! The sequence classifier itself is external (and asynchronous): the
//! session hands out a `ClassifyRequest` when a classification is due and
//! the host calls back with the result. This module owns everything that
//! turns the classifier's noisy per-frame probabilities into a temporally
//! stable label: EMA smoothing, asymmetric hysteresis, argmax debouncing,
//! a velocity gate, call-cadence throttling and failure accounting.

use thiserror::Error;
use tracing::{debug, warn};

use crate::features::FEATURE_DIM;
use crate::window::SequenceWindow;

// ── Labels ─────────────────────────────────────────────────

/// Number of gesture classes the classifier emits.
pub const CLASS_COUNT: usize = 3;

/// The closed set of stable gesture labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GestureLabel {
    Neutral,
    OpenPalm,
    Pinch,
}

impl GestureLabel {
    /// Class index, matching the training-time label order.
    pub fn index(&self) -> usize {
        match self {
            Self::Neutral => 0,
            Self::OpenPalm => 1,
            Self::Pinch => 2,
        }
    }

    pub fn from_index(i: usize) -> Option<Self> {
        match i {
            0 => Some(Self::Neutral),
            1 => Some(Self::OpenPalm),
            2 => Some(Self::Pinch),
            _ => None,
        }
    }

    /// String representation for status output.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Neutral => "neutral",
            Self::OpenPalm => "open-palm",
            Self::Pinch => "pinch",
        }
    }
}

/// Per-class probabilities, indexed by `GestureLabel::index`.
pub type ClassProbs = [f32; CLASS_COUNT];

// ── Errors ─────────────────────────────────────────────────

/// Failures the external classifier can report back. None of these
/// propagate beyond the stabilizer; they degrade to a no-update frame.
#[derive(Debug, Error)]
pub enum ClassifierError {
    #[error("classifier model not ready")]
    NotReady,
    #[error("inference failed: {0}")]
    Inference(String),
    #[error("malformed classifier output")]
    MalformedOutput,
}

// ── Requests ───────────────────────────────────────────────

/// A classification the session wants the host to run. The generation
/// stamps the request against later resets: a result whose generation no
/// longer matches is discarded.
#[derive(Debug)]
pub struct ClassifyRequest {
    pub generation: u64,
    pub sequence: Vec<[f32; FEATURE_DIM]>,
}

// ── Config ─────────────────────────────────────────────────

/// Tunables for label stabilization.
#[derive(Debug, Clone)]
pub struct StabilizerConfig {
    /// EMA coefficient applied to incoming probabilities (weight of the
    /// new sample).
    pub smooth_alpha: f32,
    /// Smoothed probability a candidate must exceed to take over.
    pub enter_threshold: f32,
    /// Smoothed probability below which the current label is demoted to
    /// neutral (paired with neutral exceeding its enter threshold).
    pub exit_threshold: f32,
    /// Consecutive argmax frames required before a label switch.
    pub debounce_frames: u32,
    /// Hand velocity (scale-normalized, per second) above which label
    /// changes are suppressed and pending candidates discarded.
    pub velocity_gate: f32,
    /// Run the classifier only every Nth processed frame.
    pub call_every_frames: u32,
    /// Log only every Nth classifier failure.
    pub error_log_every: u64,
}

impl Default for StabilizerConfig {
    fn default() -> Self {
        Self {
            smooth_alpha: 0.35,
            enter_threshold: 0.65,
            exit_threshold: 0.40,
            debounce_frames: 4,
            velocity_gate: 2.5,
            call_every_frames: 3,
            error_log_every: 25,
        }
    }
}

// ── Stabilizer ─────────────────────────────────────────────

/// Converts raw class probabilities into a debounced, hysteresis-protected
/// stable label. Owns the classifier call cadence and failure accounting.
#[derive(Debug)]
pub struct LabelStabilizer {
    config: StabilizerConfig,
    /// Smoothed class distribution, always renormalized to sum 1.
    smoothed: ClassProbs,
    stable: GestureLabel,
    candidate: Option<GestureLabel>,
    candidate_frames: u32,
    frames_since_call: u32,
    in_flight: bool,
    generation: u64,
    model_ready: bool,
    width_ok: bool,
    error_count: u64,
}

impl LabelStabilizer {
    pub fn new(config: StabilizerConfig) -> Self {
        Self {
            config,
            smoothed: [1.0, 0.0, 0.0],
            stable: GestureLabel::Neutral,
            candidate: None,
            candidate_frames: 0,
            frames_since_call: 0,
            in_flight: false,
            generation: 0,
            model_ready: false,
            width_ok: false,
            error_count: 0,
        }
    }

    /// Record the external model's readiness and declared input width.
    /// A width mismatch disables classification (geometric detectors are
    /// unaffected) rather than risking a shape error at inference time.
    pub fn set_model_ready(&mut self, feature_width: usize) {
        self.model_ready = true;
        self.width_ok = feature_width == FEATURE_DIM;
        if !self.width_ok {
            warn!(
                expected = FEATURE_DIM,
                declared = feature_width,
                "classifier feature width mismatch; classification disabled"
            );
        }
    }

    /// Advance the stabilizer by one processed frame. Runs the debounce and
    /// hysteresis logic over the current smoothed distribution (classifier
    /// call or not), and returns a request when a classification is due.
    pub fn advance(
        &mut self,
        window: &SequenceWindow,
        hand_velocity: f32,
    ) -> Option<ClassifyRequest> {
        self.step_label(hand_velocity);

        self.frames_since_call = self.frames_since_call.saturating_add(1);
        let due = self.frames_since_call >= self.config.call_every_frames;
        if due && !self.in_flight && self.model_ready && self.width_ok && window.is_full() {
            self.frames_since_call = 0;
            self.in_flight = true;
            return Some(ClassifyRequest {
                generation: self.generation,
                sequence: window.snapshot(),
            });
        }
        None
    }

    fn step_label(&mut self, hand_velocity: f32) {
        // Classification is unreliable while the hand is moving fast; hold
        // the current label and drop any pending switch.
        if hand_velocity > self.config.velocity_gate {
            if self.candidate.take().is_some() {
                debug!(velocity = hand_velocity, "velocity gate discarded label candidate");
            }
            return;
        }

        let argmax = self.argmax();
        if argmax != self.stable && self.smoothed[argmax.index()] >= self.config.enter_threshold {
            if self.candidate == Some(argmax) {
                self.candidate_frames += 1;
            } else {
                self.candidate = Some(argmax);
                self.candidate_frames = 1;
            }
            if self.candidate_frames >= self.config.debounce_frames {
                debug!(from = self.stable.as_str(), to = argmax.as_str(), "stable label changed");
                self.stable = argmax;
                self.candidate = None;
                self.candidate_frames = 0;
            }
        } else {
            self.candidate = None;
            self.candidate_frames = 0;
        }

        // Asymmetric hysteresis: the active label is demoted once its own
        // score collapses and neutral clears its enter threshold.
        if self.stable != GestureLabel::Neutral
            && self.smoothed[self.stable.index()] < self.config.exit_threshold
            && self.smoothed[GestureLabel::Neutral.index()] >= self.config.enter_threshold
        {
            debug!(from = self.stable.as_str(), "label demoted to neutral");
            self.stable = GestureLabel::Neutral;
            self.candidate = None;
            self.candidate_frames = 0;
        }
    }

    /// Deliver a classifier result. Results stamped with a generation that
    /// predates the last reset are ignored; failures are counted and
    /// treated as a no-update for that frame.
    pub fn on_result(&mut self, generation: u64, result: Result<ClassProbs, ClassifierError>) {
        if generation != self.generation {
            debug!(generation, current = self.generation, "discarding stale classifier result");
            return;
        }
        self.in_flight = false;

        match result {
            Ok(probs) if probs.iter().all(|p| p.is_finite() && *p >= 0.0) => {
                let a = self.config.smooth_alpha;
                for (s, p) in self.smoothed.iter_mut().zip(probs.iter()) {
                    *s = *s * (1.0 - a) + *p * a;
                }
                let sum: f32 = self.smoothed.iter().sum();
                if sum > f32::EPSILON {
                    for s in self.smoothed.iter_mut() {
                        *s /= sum;
                    }
                }
            }
            Ok(_) => self.record_error(&ClassifierError::MalformedOutput),
            Err(e) => self.record_error(&e),
        }
    }

    fn record_error(&mut self, err: &ClassifierError) {
        self.error_count += 1;
        if self.error_count % self.config.error_log_every == 1 {
            warn!(total = self.error_count, error = %err, "classifier failure (smoothed distribution retained)");
        }
    }

    fn argmax(&self) -> GestureLabel {
        let mut best = 0;
        for i in 1..CLASS_COUNT {
            if self.smoothed[i] > self.smoothed[best] {
                best = i;
            }
        }
        GestureLabel::from_index(best).unwrap_or(GestureLabel::Neutral)
    }

    /// Reset to the initial distribution and invalidate any in-flight
    /// classification by bumping the generation.
    pub fn reset(&mut self) {
        self.smoothed = [1.0, 0.0, 0.0];
        self.stable = GestureLabel::Neutral;
        self.candidate = None;
        self.candidate_frames = 0;
        self.frames_since_call = 0;
        self.in_flight = false;
        self.generation += 1;
    }

    pub fn label(&self) -> GestureLabel {
        self.stable
    }

    /// Smoothed probability of the current stable label.
    pub fn confidence(&self) -> f32 {
        self.smoothed[self.stable.index()]
    }

    pub fn probabilities(&self) -> ClassProbs {
        self.smoothed
    }

    pub fn is_ready(&self) -> bool {
        self.model_ready && self.width_ok
    }

    pub fn error_count(&self) -> u64 {
        self.error_count
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

impl Default for LabelStabilizer {
    fn default() -> Self {
        Self::new(StabilizerConfig::default())
    }
}

// ── Tests ──────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn full_window() -> SequenceWindow {
        let mut w = SequenceWindow::default();
        while !w.is_full() {
            w.push([0.0; FEATURE_DIM]);
        }
        w
    }

    /// Drive one classifier round-trip with the given raw probabilities.
    fn feed(stab: &mut LabelStabilizer, window: &SequenceWindow, probs: ClassProbs) {
        // Advance until a request is issued, then answer it.
        for _ in 0..StabilizerConfig::default().call_every_frames {
            if let Some(req) = stab.advance(window, 0.0) {
                stab.on_result(req.generation, Ok(probs));
                return;
            }
        }
        panic!("no request issued within one call cadence");
    }

    #[test]
    fn test_starts_neutral() {
        let stab = LabelStabilizer::default();
        assert_eq!(stab.label(), GestureLabel::Neutral);
        assert!((stab.confidence() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_no_request_until_window_full_and_ready() {
        let mut stab = LabelStabilizer::default();
        let empty = SequenceWindow::default();
        for _ in 0..10 {
            assert!(stab.advance(&empty, 0.0).is_none());
        }
        // Full window but model not ready.
        let window = full_window();
        for _ in 0..10 {
            assert!(stab.advance(&window, 0.0).is_none());
        }
        stab.set_model_ready(FEATURE_DIM);
        let issued = (0..10).filter(|_| stab.advance(&window, 0.0).is_some()).count();
        assert!(issued > 0, "expected at least one request once ready");
    }

    #[test]
    fn test_width_mismatch_disables_classification() {
        let mut stab = LabelStabilizer::default();
        stab.set_model_ready(FEATURE_DIM + 1);
        assert!(!stab.is_ready());
        let window = full_window();
        for _ in 0..10 {
            assert!(stab.advance(&window, 0.0).is_none());
        }
    }

    #[test]
    fn test_no_concurrent_requests() {
        let mut stab = LabelStabilizer::default();
        stab.set_model_ready(FEATURE_DIM);
        let window = full_window();
        let mut first = None;
        for _ in 0..20 {
            if let Some(req) = stab.advance(&window, 0.0) {
                first = Some(req);
                break;
            }
        }
        let first = first.expect("request issued");
        // While the first is unanswered, no second request appears.
        for _ in 0..20 {
            assert!(stab.advance(&window, 0.0).is_none());
        }
        stab.on_result(first.generation, Ok([1.0, 0.0, 0.0]));
        let issued = (0..10).filter(|_| stab.advance(&window, 0.0).is_some()).count();
        assert!(issued > 0, "request flow should resume after the result lands");
    }

    #[test]
    fn test_debounce_delays_switch() {
        let mut stab = LabelStabilizer::default();
        stab.set_model_ready(FEATURE_DIM);
        let window = full_window();

        // One strong open-palm result is not enough.
        feed(&mut stab, &window, [0.0, 1.0, 0.0]);
        assert_eq!(stab.label(), GestureLabel::Neutral, "single frame must not switch");

        // Keep feeding until the debounce count is met.
        for _ in 0..6 {
            feed(&mut stab, &window, [0.0, 1.0, 0.0]);
        }
        assert_eq!(stab.label(), GestureLabel::OpenPalm);
    }

    #[test]
    fn test_velocity_gate_blocks_switch() {
        let mut stab = LabelStabilizer::default();
        stab.set_model_ready(FEATURE_DIM);
        let window = full_window();

        for _ in 0..8 {
            feed(&mut stab, &window, [0.0, 1.0, 0.0]);
        }
        // Distribution now favors open palm strongly; reset the label state
        // and try again at high velocity.
        let mut gated = LabelStabilizer::default();
        gated.set_model_ready(FEATURE_DIM);
        for _ in 0..20 {
            if let Some(req) = gated.advance(&window, 10.0) {
                gated.on_result(req.generation, Ok([0.0, 1.0, 0.0]));
            }
        }
        assert_eq!(
            gated.label(),
            GestureLabel::Neutral,
            "label must not change while velocity exceeds the gate"
        );
    }

    #[test]
    fn test_demotion_to_neutral() {
        let mut stab = LabelStabilizer::default();
        stab.set_model_ready(FEATURE_DIM);
        let window = full_window();

        for _ in 0..8 {
            feed(&mut stab, &window, [0.0, 1.0, 0.0]);
        }
        assert_eq!(stab.label(), GestureLabel::OpenPalm);

        // Strong neutral pushes open-palm below the exit threshold.
        for _ in 0..10 {
            feed(&mut stab, &window, [1.0, 0.0, 0.0]);
        }
        assert_eq!(stab.label(), GestureLabel::Neutral);
    }

    #[test]
    fn test_error_is_no_update() {
        let mut stab = LabelStabilizer::default();
        stab.set_model_ready(FEATURE_DIM);
        let window = full_window();

        for _ in 0..8 {
            feed(&mut stab, &window, [0.0, 1.0, 0.0]);
        }
        let before = stab.probabilities();
        // A failing call leaves the distribution untouched.
        let req = loop {
            if let Some(r) = stab.advance(&window, 0.0) {
                break r;
            }
        };
        stab.on_result(req.generation, Err(ClassifierError::Inference("boom".into())));
        assert_eq!(stab.probabilities(), before);
        assert_eq!(stab.error_count(), 1);
    }

    #[test]
    fn test_malformed_output_rejected() {
        let mut stab = LabelStabilizer::default();
        stab.set_model_ready(FEATURE_DIM);
        let window = full_window();
        let req = loop {
            if let Some(r) = stab.advance(&window, 0.0) {
                break r;
            }
        };
        let before = stab.probabilities();
        stab.on_result(req.generation, Ok([f32::NAN, 0.0, 0.0]));
        assert_eq!(stab.probabilities(), before);
        assert_eq!(stab.error_count(), 1);
    }

    #[test]
    fn test_stale_result_ignored() {
        let mut stab = LabelStabilizer::default();
        stab.set_model_ready(FEATURE_DIM);
        let window = full_window();
        let req = loop {
            if let Some(r) = stab.advance(&window, 0.0) {
                break r;
            }
        };
        stab.reset();
        stab.set_model_ready(FEATURE_DIM);
        stab.on_result(req.generation, Ok([0.0, 0.0, 1.0]));
        // The stale result must not touch the fresh distribution.
        assert!((stab.probabilities()[0] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_smoothed_distribution_normalized() {
        let mut stab = LabelStabilizer::default();
        stab.set_model_ready(FEATURE_DIM);
        let window = full_window();
        feed(&mut stab, &window, [0.2, 0.5, 0.3]);
        let sum: f32 = stab.probabilities().iter().sum();
        assert!((sum - 1.0).abs() < 1e-5, "distribution should sum to 1, got {sum}");
    }
}
