//! Gesture session — the per-frame pipeline driver.
//!
//! Owns every detector, the temporal buffer, the stabilizer and the cursor
//! filter, and runs them in a fixed order over each delivered frame:
//! features are extracted, detectors and the stabilizer observe the same
//! immutable snapshot, the arbitrator resolves the single active mode, and
//! mode-specific events are emitted. Everything is single-threaded; the
//! only asynchronous edge is the classifier round-trip, which is modeled
//! as an explicit request/result pair with generation-stamped staleness
//! checks.

use tracing::{debug, info};

use crate::classifier::{ClassProbs, ClassifierError, ClassifyRequest, LabelStabilizer};
use crate::cursor::CursorFilter;
use crate::features::{self, FeatureFrame};
use crate::hand::{Hand, INDEX_TIP};
use crate::pinch::{ClickState, DepthTouchDetector, PinchClickDetector};
use crate::scroll::PalmScrollDetector;
use crate::window::SequenceWindow;
use crate::zoom::{PinchZoomEngine, TwoHandZoomEngine};

// ── Modes ──────────────────────────────────────────────────

/// The single interaction mode active in a frame, by fixed priority:
/// two-hand zoom > palm scroll > pinch click/zoom > cursor > neutral.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActiveMode {
    /// No hand present.
    Neutral,
    /// Hand present, plain pointer tracking.
    Cursor,
    PinchClick,
    PalmScroll,
    PinchZoom,
    TwoHandZoom,
}

impl ActiveMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Neutral => "neutral",
            Self::Cursor => "cursor",
            Self::PinchClick => "pinch-click",
            Self::PalmScroll => "palm-scroll",
            Self::PinchZoom => "pinch-zoom",
            Self::TwoHandZoom => "two-hand-zoom",
        }
    }
}

// ── Events ─────────────────────────────────────────────────

/// Diagnostic snapshot published with `UiEvent::Status`.
#[derive(Debug, Clone)]
pub struct StatusSnapshot {
    pub mode: ActiveMode,
    pub label: crate::classifier::GestureLabel,
    pub confidence: f32,
    pub probabilities: ClassProbs,
    pub click_state: ClickState,
    pub zoom: f32,
    pub classifier_ready: bool,
    pub classifier_errors: u64,
}

/// Events the session emits toward the host UI layer.
#[derive(Debug, Clone)]
pub enum UiEvent {
    /// Filtered cursor position in screen coordinates.
    CursorMoved { x: f32, y: f32 },
    /// A click fired (no payload; the host clicks at the cursor).
    Click,
    /// Scroll delta, with the point the host should resolve a scrollable
    /// container at. Positive `delta_y` scrolls content upward.
    Scroll { delta_y: f32, delta_x: f32, at: (f32, f32) },
    /// The active zoom factor changed.
    ZoomChanged { factor: f32 },
    /// Throttled diagnostics for display.
    Status(StatusSnapshot),
}

// ── Input / output ─────────────────────────────────────────

/// One tracker frame. Hands are positional (index 0 is the primary hand);
/// zero, one or two may be present.
#[derive(Debug)]
pub struct FrameInput<'a> {
    pub hands: &'a [Hand],
    pub timestamp_s: f64,
    /// Viewport size in pixels.
    pub viewport: (f32, f32),
}

/// Result of processing one frame. `classify_request` is handed to the
/// host to run the external classifier; the host answers via
/// [`GestureSession::on_classifier_result`].
#[derive(Debug, Default)]
pub struct FrameOutput {
    pub events: Vec<UiEvent>,
    pub classify_request: Option<ClassifyRequest>,
}

// ── Config ─────────────────────────────────────────────────

/// Session-level tunables plus every component's config. Supplied at
/// construction; not mutable mid-session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Lower bound on the derived hand scale.
    pub min_hand_scale: f32,
    /// Processing rate cap; faster frames are dropped, never queued.
    pub max_fps: f64,
    /// Consecutive no-hand frames before gesture state resets.
    pub no_hand_reset_frames: u32,
    /// Minimum seconds between `UiEvent::Status` publications.
    pub status_interval_s: f64,
    pub stabilizer: crate::classifier::StabilizerConfig,
    pub pinch: crate::pinch::PinchConfig,
    pub depth_touch: crate::pinch::DepthTouchConfig,
    pub scroll: crate::scroll::ScrollConfig,
    pub pinch_zoom: crate::zoom::PinchZoomConfig,
    pub two_hand_zoom: crate::zoom::TwoHandZoomConfig,
    pub cursor: crate::cursor::CursorConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            min_hand_scale: 0.01,
            max_fps: 30.0,
            no_hand_reset_frames: 10,
            status_interval_s: 0.1,
            stabilizer: Default::default(),
            pinch: Default::default(),
            depth_touch: Default::default(),
            scroll: Default::default(),
            pinch_zoom: Default::default(),
            two_hand_zoom: Default::default(),
            cursor: Default::default(),
        }
    }
}

// ── Session ────────────────────────────────────────────────

/// The per-session pipeline state. Created when gesture mode is enabled;
/// all per-gesture state resets on disable or extended hand loss. The
/// cursor position is the deliberate exception: it survives resets so the
/// pointer never snaps.
pub struct GestureSession {
    config: SessionConfig,
    enabled: bool,
    window: SequenceWindow,
    stabilizer: LabelStabilizer,
    pinch: PinchClickDetector,
    depth_touch: DepthTouchDetector,
    scroll: PalmScrollDetector,
    pinch_zoom: PinchZoomEngine,
    two_hand_zoom: TwoHandZoomEngine,
    cursor: CursorFilter,
    mode: ActiveMode,
    prev_hands: [Option<Hand>; 2],
    last_processed_s: Option<f64>,
    no_hand_frames: u32,
    last_status_s: Option<f64>,
    published_zoom: f32,
}

impl GestureSession {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            window: SequenceWindow::default(),
            stabilizer: LabelStabilizer::new(config.stabilizer.clone()),
            pinch: PinchClickDetector::new(config.pinch.clone()),
            depth_touch: DepthTouchDetector::new(config.depth_touch.clone()),
            scroll: PalmScrollDetector::new(config.scroll.clone()),
            pinch_zoom: PinchZoomEngine::new(config.pinch_zoom.clone()),
            two_hand_zoom: TwoHandZoomEngine::new(config.two_hand_zoom.clone()),
            cursor: CursorFilter::new(config.cursor.clone()),
            config,
            enabled: true,
            mode: ActiveMode::Neutral,
            prev_hands: [None, None],
            last_processed_s: None,
            no_hand_frames: 0,
            last_status_s: None,
            published_zoom: 1.0,
        }
    }

    /// Process one tracker frame. Safe to call at any rate: frames faster
    /// than the configured cap are dropped.
    pub fn on_frame(&mut self, input: &FrameInput) -> FrameOutput {
        let mut out = FrameOutput::default();
        if !self.enabled {
            return out;
        }

        // Rate cap: drop, never queue. The slight margin keeps a tracker
        // running exactly at the cap from dropping every other frame.
        let min_interval = 0.9 / self.config.max_fps;
        let dt = match self.last_processed_s {
            Some(last) => {
                let dt = input.timestamp_s - last;
                if dt < min_interval {
                    return out;
                }
                dt
            }
            None => 1.0 / self.config.max_fps,
        };
        self.last_processed_s = Some(input.timestamp_s);

        if input.hands.is_empty() {
            self.on_no_hand(input.timestamp_s, &mut out);
            return out;
        }
        self.no_hand_frames = 0;

        // Feature extraction: every detector sees this frame's snapshot.
        let primary = &input.hands[0];
        let frame0 = features::extract(
            primary,
            self.prev_hands[0].as_ref(),
            dt,
            self.config.min_hand_scale,
        );
        self.window.push(frame0.vector);
        out.classify_request = self.stabilizer.advance(&self.window, frame0.hand_velocity);

        let frame1 = input.hands.get(1).map(|h| {
            features::extract(h, self.prev_hands[1].as_ref(), dt, self.config.min_hand_scale)
        });

        // Cursor runs first in every hand-present mode (the index fingertip
        // is the pointer), so scroll events carry this frame's position.
        // The pinch flag is the previous frame's state.
        let tip = primary.landmarks[INDEX_TIP];
        let (x, y) = self.cursor.update(
            (tip.x, tip.y),
            self.pinch.is_pinching(),
            dt,
            input.viewport,
        );
        out.events.push(UiEvent::CursorMoved { x, y });

        self.arbitrate(input, &frame0, frame1.as_ref(), dt, &mut out);

        self.prev_hands[0] = Some(primary.clone());
        self.prev_hands[1] = input.hands.get(1).cloned();

        self.publish_status(input.timestamp_s, &mut out);
        out
    }

    /// Resolve the single active mode and run the mode-specific detectors.
    /// Entering a mode resets the non-active detectors' transient state so
    /// stale timers cannot leak into later decisions.
    fn arbitrate(
        &mut self,
        input: &FrameInput,
        frame0: &FeatureFrame,
        frame1: Option<&FeatureFrame>,
        dt: f64,
        out: &mut FrameOutput,
    ) {
        let now = input.timestamp_s;
        let primary = &input.hands[0];
        let norm_pinch = primary.pinch_distance(self.config.min_hand_scale);

        // Two-hand zoom has the highest priority.
        if let Some(f1) = frame1 {
            let pair = TwoHandZoomEngine::pair_distance(
                [frame0.palm_center, f1.palm_center],
                [frame0.scale, f1.scale],
            );
            let zoom =
                self.two_hand_zoom
                    .update(pair, [frame0.hand_velocity, f1.hand_velocity], now);
            if self.two_hand_zoom.is_zooming() {
                self.enter_mode(ActiveMode::TwoHandZoom);
                self.emit_zoom(zoom, out);
                return;
            }
        } else {
            self.two_hand_zoom.disarm();
        }

        // Palm scroll next. The pinch gate uses the previous frame's click
        // state: detectors run in a fixed order within the frame.
        let scroll_delta = if !self.pinch.is_pinching() {
            self.scroll.update(primary, now)
        } else {
            None
        };
        if self.scroll.is_armed() {
            self.enter_mode(ActiveMode::PalmScroll);
            if let Some(d) = scroll_delta {
                let at = self.cursor.position().unwrap_or((
                    input.viewport.0 * 0.5,
                    input.viewport.1 * 0.5,
                ));
                out.events.push(UiEvent::Scroll {
                    delta_y: d.delta_y,
                    delta_x: d.delta_x,
                    at,
                });
            }
            return;
        }

        // Pinch click, depth touch and single-hand zoom share the frame.
        let clicked = self.pinch.update(norm_pinch, frame0.scale, frame0.hand_velocity, now);
        let touched = self
            .depth_touch
            .update(primary.landmarks[INDEX_TIP].z, now, dt);
        if clicked || touched {
            out.events.push(UiEvent::Click);
        }

        let zoom = self.pinch_zoom.update(
            norm_pinch,
            frame0.hand_velocity,
            self.pinch.is_pinching(),
            false,
            now,
        );

        let mode = if self.pinch.is_pinching() {
            ActiveMode::PinchClick
        } else if self.pinch_zoom.is_zooming() {
            ActiveMode::PinchZoom
        } else {
            ActiveMode::Cursor
        };
        self.enter_mode(mode);
        if self.pinch_zoom.is_zooming() {
            self.emit_zoom(zoom, out);
        }
    }

    fn enter_mode(&mut self, mode: ActiveMode) {
        if self.mode == mode {
            return;
        }
        debug!(from = self.mode.as_str(), to = mode.as_str(), "mode change");
        self.mode = mode;

        // Reset what the new mode excludes.
        match mode {
            ActiveMode::TwoHandZoom => {
                self.pinch.reset();
                self.depth_touch.reset();
                self.scroll.reset();
                self.pinch_zoom.disarm();
            }
            ActiveMode::PalmScroll => {
                self.pinch.reset();
                self.depth_touch.reset();
                self.pinch_zoom.disarm();
            }
            ActiveMode::PinchClick => {
                self.scroll.reset();
            }
            ActiveMode::PinchZoom | ActiveMode::Cursor | ActiveMode::Neutral => {}
        }
    }

    fn emit_zoom(&mut self, zoom: f32, out: &mut FrameOutput) {
        if (zoom - self.published_zoom).abs() > 1e-4 {
            self.published_zoom = zoom;
            out.events.push(UiEvent::ZoomChanged { factor: zoom });
        }
    }

    fn on_no_hand(&mut self, now: f64, out: &mut FrameOutput) {
        self.no_hand_frames = self.no_hand_frames.saturating_add(1);
        // Drop all motion history immediately, not just past the reset
        // threshold: displacement spanning a gap of any length would
        // otherwise read as a single frame's motion on reacquisition.
        self.prev_hands = [None, None];
        self.depth_touch.clear_motion();
        self.scroll.clear_motion();
        self.mode = ActiveMode::Neutral;
        if self.no_hand_frames == self.config.no_hand_reset_frames {
            debug!(
                frames = self.no_hand_frames,
                "hand lost; resetting gesture state"
            );
            self.reset_gesture_state();
        }
        self.publish_status(now, out);
    }

    /// Clear every buffer, timer and state machine to initial values.
    /// The cursor keeps its position (continuity invariant); in-flight
    /// classifier results become stale via the generation bump.
    fn reset_gesture_state(&mut self) {
        self.window.clear();
        self.stabilizer.reset();
        self.pinch.reset();
        self.depth_touch.reset();
        self.scroll.reset();
        self.pinch_zoom.reset();
        self.two_hand_zoom.reset();
        self.cursor.reset_motion();
        self.mode = ActiveMode::Neutral;
        self.published_zoom = 1.0;
    }

    fn publish_status(&mut self, now: f64, out: &mut FrameOutput) {
        let due = self
            .last_status_s
            .map_or(true, |t| now - t >= self.config.status_interval_s);
        if !due {
            return;
        }
        self.last_status_s = Some(now);
        out.events.push(UiEvent::Status(self.status()));
    }

    /// Current diagnostics, always reflecting the most recent frame.
    pub fn status(&self) -> StatusSnapshot {
        StatusSnapshot {
            mode: self.mode,
            label: self.stabilizer.label(),
            confidence: self.stabilizer.confidence(),
            probabilities: self.stabilizer.probabilities(),
            click_state: self.pinch.state(),
            zoom: self.published_zoom,
            classifier_ready: self.stabilizer.is_ready(),
            classifier_errors: self.stabilizer.error_count(),
        }
    }

    /// Deliver an asynchronous classifier result. Results from before the
    /// last reset are discarded.
    pub fn on_classifier_result(
        &mut self,
        generation: u64,
        result: Result<ClassProbs, ClassifierError>,
    ) {
        self.stabilizer.on_result(generation, result);
    }

    /// Record that the external classifier finished loading and declared
    /// its expected feature width.
    pub fn on_classifier_ready(&mut self, feature_width: usize) {
        info!(feature_width, "classifier ready");
        self.stabilizer.set_model_ready(feature_width);
    }

    /// Enable or disable the session. Disabling synchronously resets all
    /// gesture state; an in-flight classifier call's eventual result is
    /// discarded by the generation check.
    pub fn set_enabled(&mut self, enabled: bool) {
        if self.enabled == enabled {
            return;
        }
        info!(enabled, "gesture session toggled");
        self.enabled = enabled;
        if !enabled {
            self.reset_gesture_state();
            self.last_processed_s = None;
            self.no_hand_frames = 0;
            self.last_status_s = None;
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn mode(&self) -> ActiveMode {
        self.mode
    }

    pub fn cursor_position(&self) -> Option<(f32, f32)> {
        self.cursor.position()
    }

    /// Number of feature frames currently buffered for classification.
    pub fn buffered_frames(&self) -> usize {
        self.window.len()
    }

    /// Status line for host display, s-expression formatted.
    pub fn status_sexp(&self) -> String {
        let s = self.status();
        format!(
            "(:enabled {} :mode {} :label {} :confidence {:.2} :click-state {} :zoom {:.2} :classifier-ready {} :classifier-errors {})",
            if self.enabled { "t" } else { "nil" },
            s.mode.as_str(),
            s.label.as_str(),
            s.confidence,
            s.click_state.as_str(),
            s.zoom,
            if s.classifier_ready { "t" } else { "nil" },
            s.classifier_errors,
        )
    }
}

impl Default for GestureSession {
    fn default() -> Self {
        Self::new(SessionConfig::default())
    }
}

// ── Test helpers ───────────────────────────────────────────

#[cfg(test)]
fn pinching_hand() -> Hand {
    use crate::hand::*;
    // Start from the open test hand, curl the middle/ring/pinky fingers
    // (so it is not an open palm) and bring thumb and index tips together.
    let mut hand = crate::hand::test_hand();
    for (tip, pip) in [
        (MIDDLE_TIP, MIDDLE_PIP),
        (RING_TIP, RING_PIP),
        (PINKY_TIP, PINKY_PIP),
    ] {
        hand.landmarks[tip].y = hand.landmarks[pip].y + 0.05;
    }
    let index_tip = hand.landmarks[INDEX_TIP];
    hand.landmarks[THUMB_TIP] = Landmark::new(index_tip.x - 0.005, index_tip.y + 0.005, 0.0);
    hand
}

#[cfg(test)]
fn neutral_hand() -> Hand {
    use crate::hand::*;
    // Not an open palm, not a pinch: fingers curled, thumb far out.
    let mut hand = crate::hand::test_hand();
    for (tip, pip) in FINGER_TIP_PIP {
        hand.landmarks[tip].y = hand.landmarks[pip].y + 0.05;
    }
    hand
}

// ── Tests ──────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::GestureLabel;
    use crate::hand::test_hand;

    const DT: f64 = 1.0 / 29.0; // just above the 30fps cap's drop margin
    const VIEWPORT: (f32, f32) = (1920.0, 1080.0);

    /// Route tracing output through the test harness; RUST_LOG selects
    /// the level as usual.
    fn init_logging() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    }

    fn frame<'a>(hands: &'a [Hand], ts: f64) -> FrameInput<'a> {
        FrameInput {
            hands,
            timestamp_s: ts,
            viewport: VIEWPORT,
        }
    }

    fn run(session: &mut GestureSession, hands: &[Hand], start: f64, frames: usize) -> (Vec<UiEvent>, f64) {
        let mut events = Vec::new();
        let mut now = start;
        for _ in 0..frames {
            events.extend(session.on_frame(&frame(hands, now)).events);
            now += DT;
        }
        (events, now)
    }

    #[test]
    fn test_fast_frames_dropped() {
        let mut session = GestureSession::default();
        let hands = [test_hand()];
        session.on_frame(&frame(&hands, 0.0));
        // 5ms later: far above the 30fps cap; the frame is dropped whole.
        let out = session.on_frame(&frame(&hands, 0.005));
        assert!(out.events.is_empty());
        assert_eq!(session.buffered_frames(), 1);
    }

    #[test]
    fn test_cursor_moves_every_processed_frame() {
        let mut session = GestureSession::default();
        let hands = [neutral_hand()];
        let (events, _) = run(&mut session, &hands, 0.0, 3);
        let moves = events
            .iter()
            .filter(|e| matches!(e, UiEvent::CursorMoved { .. }))
            .count();
        assert_eq!(moves, 3);
        assert_eq!(session.mode(), ActiveMode::Cursor);
    }

    #[test]
    fn test_click_through_session() {
        init_logging();
        let mut session = GestureSession::default();
        let hands = [pinching_hand()];
        let (events, _) = run(&mut session, &hands, 0.0, 20);
        let clicks = events.iter().filter(|e| matches!(e, UiEvent::Click)).count();
        assert_eq!(clicks, 1, "one pinch hold should produce one click");
        assert_eq!(session.mode(), ActiveMode::PinchClick);
    }

    #[test]
    fn test_scroll_through_session() {
        let mut session = GestureSession::default();
        // Arm on a stationary open palm first.
        let open = [test_hand()];
        let (_, now) = run(&mut session, &open, 0.0, 8);
        assert_eq!(session.mode(), ActiveMode::PalmScroll);

        // Move the palm down.
        let mut lowered = test_hand();
        for lm in lowered.landmarks.iter_mut() {
            lm.y += 0.03;
        }
        let out = session.on_frame(&frame(&[lowered], now));
        let scroll = out.events.iter().find_map(|e| match e {
            UiEvent::Scroll { delta_y, at, .. } => Some((*delta_y, *at)),
            _ => None,
        });
        let (delta_y, at) = scroll.expect("scroll event expected");
        assert!(delta_y < 0.0, "hand moved down in image coords -> y increased -> negative delta");
        assert_eq!(at, session.cursor_position().unwrap());
    }

    #[test]
    fn test_hand_loss_resets_but_cursor_persists() {
        let mut session = GestureSession::default();
        let hands = [test_hand()];
        let (_, now) = run(&mut session, &hands, 0.0, 12);
        assert!(session.buffered_frames() > 0);
        let cursor_before = session.cursor_position().unwrap();

        let (_, now) = run(&mut session, &[], now, 12);
        assert_eq!(session.buffered_frames(), 0, "window should clear after hand loss");
        assert_eq!(session.mode(), ActiveMode::Neutral);
        assert_eq!(
            session.cursor_position().unwrap(),
            cursor_before,
            "cursor must not move on hand loss"
        );

        // Re-acquisition: cursor continues from where it was.
        let far = {
            let mut hand = neutral_hand();
            for lm in hand.landmarks.iter_mut() {
                lm.x = (lm.x + 0.4).min(1.0);
            }
            hand
        };
        session.on_frame(&frame(&[far], now));
        let after = session.cursor_position().unwrap();
        let jump = ((after.0 - cursor_before.0).powi(2) + (after.1 - cursor_before.1).powi(2)).sqrt();
        assert!(jump <= 80.0 + 1e-3, "cursor snapped on re-acquisition: {jump}");
    }

    #[test]
    fn test_short_gap_does_not_click() {
        let mut session = GestureSession::default();
        // Finger resting at the surface.
        let (_, now) = run(&mut session, &[neutral_hand()], 0.0, 10);

        // Tracking gap shorter than the reset threshold.
        let (_, now) = run(&mut session, &[], now, 5);

        // Reacquired past the depth threshold but stationary: the gap's
        // displacement must not read as an approach velocity.
        let mut deep = neutral_hand();
        deep.landmarks[INDEX_TIP].z = -0.15;
        let (events, _) = run(&mut session, &[deep], now, 10);
        assert!(
            !events.iter().any(|e| matches!(e, UiEvent::Click)),
            "a stationary finger after a short tracking gap must not click"
        );
    }

    #[test]
    fn test_short_gap_does_not_scroll() {
        let mut session = GestureSession::default();
        let (_, now) = run(&mut session, &[test_hand()], 0.0, 8);
        assert_eq!(session.mode(), ActiveMode::PalmScroll);

        // Gap below the reset threshold, then the palm reappears lower.
        let (_, now) = run(&mut session, &[], now, 5);
        let mut lowered = test_hand();
        for lm in lowered.landmarks.iter_mut() {
            lm.y += 0.10;
        }
        let (events, _) = run(&mut session, &[lowered], now, 8);
        assert!(
            !events.iter().any(|e| matches!(e, UiEvent::Scroll { .. })),
            "displacement accumulated across a tracking gap must not scroll"
        );
    }

    #[test]
    fn test_two_hand_zoom_takes_priority() {
        init_logging();
        let mut session = GestureSession::default();
        let left = neutral_hand();
        let mut right = neutral_hand();
        for lm in right.landmarks.iter_mut() {
            lm.x += 0.25;
        }

        // Settle, then move the hands apart slowly (below the entry speed
        // cap) until two-hand zoom engages.
        let mut now = 0.0;
        let mut zoom_events = 0;
        for _ in 0..12 {
            session.on_frame(&frame(&[left.clone(), right.clone()], now));
            now += DT;
        }
        for _ in 0..60 {
            for lm in right.landmarks.iter_mut() {
                lm.x += 0.008;
            }
            let out = session.on_frame(&frame(&[left.clone(), right.clone()], now));
            zoom_events += out
                .events
                .iter()
                .filter(|e| matches!(e, UiEvent::ZoomChanged { .. }))
                .count();
            now += DT;
        }
        assert_eq!(session.mode(), ActiveMode::TwoHandZoom);
        assert!(zoom_events > 0, "zoom changes should have been emitted");
    }

    #[test]
    fn test_disable_resets_and_silences() {
        let mut session = GestureSession::default();
        session.on_classifier_ready(crate::features::FEATURE_DIM);
        let hands = [test_hand()];
        let (_, now) = run(&mut session, &hands, 0.0, 35);
        assert!(session.buffered_frames() > 0);

        session.set_enabled(false);
        assert_eq!(session.buffered_frames(), 0);
        let out = session.on_frame(&frame(&hands, now + 1.0));
        assert!(out.events.is_empty(), "disabled session must emit nothing");
    }

    #[test]
    fn test_stale_classifier_result_after_disable() {
        let mut session = GestureSession::default();
        session.on_classifier_ready(crate::features::FEATURE_DIM);
        let hands = [neutral_hand()];

        // Fill the window and collect a request.
        let mut request = None;
        let mut now = 0.0;
        for _ in 0..40 {
            let out = session.on_frame(&frame(&hands, now));
            if let Some(req) = out.classify_request {
                request = Some(req);
            }
            now += DT;
        }
        let request = request.expect("classifier request expected once the window fills");

        // Reset happens while the call is in flight.
        session.set_enabled(false);
        session.set_enabled(true);
        session.on_classifier_result(request.generation, Ok([0.0, 0.0, 1.0]));
        assert_eq!(
            session.status().label,
            GestureLabel::Neutral,
            "stale result must not influence the fresh session"
        );
        assert!((session.status().probabilities[0] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_status_throttled() {
        let mut session = GestureSession::default();
        let hands = [neutral_hand()];
        let (events, _) = run(&mut session, &hands, 0.0, 30);
        let statuses = events
            .iter()
            .filter(|e| matches!(e, UiEvent::Status(_)))
            .count();
        // 30 frames over ~1.03s at a 100ms status interval.
        assert!(statuses >= 8 && statuses <= 12, "unexpected status count {statuses}");
    }

    #[test]
    fn test_status_sexp_format() {
        let session = GestureSession::default();
        let sexp = session.status_sexp();
        assert!(sexp.starts_with("(:enabled t"));
        assert!(sexp.contains(":mode neutral"));
        assert!(sexp.contains(":label neutral"));
        assert!(sexp.contains(":click-state idle"));
        assert!(sexp.contains(":classifier-ready nil"));
    }

    #[test]
    fn test_mode_change_resets_competitors() {
        let mut session = GestureSession::default();
        // Begin arming palm scroll.
        let open = [test_hand()];
        let (_, now) = run(&mut session, &open, 0.0, 8);
        assert_eq!(session.mode(), ActiveMode::PalmScroll);

        // Switch to a pinch: scroll must disarm, clicking must work.
        let pinch = [pinching_hand()];
        let (events, _) = run(&mut session, &pinch, now, 20);
        let clicks = events.iter().filter(|e| matches!(e, UiEvent::Click)).count();
        assert_eq!(clicks, 1);
        assert_eq!(session.mode(), ActiveMode::PinchClick);
    }
}
