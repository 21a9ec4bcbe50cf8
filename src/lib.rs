//! Hand-gesture control pipeline: turns a stream of tracked hand
//! landmarks into pointer, click, scroll and zoom events.
//!
//! The crate is the signal-processing half of a camera-driven input
//! method. A host application owns the camera, the landmark tracker and
//! the optional sequence classifier; it feeds one [`FrameInput`] per
//! tracker frame into a [`GestureSession`] and applies the [`UiEvent`]s
//! that come back. Everything here is single-threaded and synchronous —
//! the one asynchronous edge, the classifier call, is modeled as an
//! explicit [`ClassifyRequest`]/result pair so the host can run it on
//! whatever executor it likes.
//!
//! Pipeline order within a frame: landmark geometry ([`hand`]), feature
//! extraction ([`features`]), the classifier window ([`window`]) and
//! label stabilization ([`classifier`]), then the geometric detectors
//! ([`pinch`], [`scroll`], [`zoom`]), the cursor filter ([`cursor`]) and
//! finally mode arbitration ([`session`]).
//!
//! Detector failures never propagate to the host: malformed input and
//! classifier errors degrade to a no-op frame.

pub mod classifier;
pub mod cursor;
pub mod features;
pub mod hand;
pub mod pinch;
pub mod scroll;
pub mod session;
pub mod window;
pub mod zoom;

pub use classifier::{
    ClassProbs, ClassifierError, ClassifyRequest, GestureLabel, LabelStabilizer, StabilizerConfig,
};
pub use cursor::{CursorConfig, CursorFilter};
pub use features::{extract, FeatureFrame, FEATURE_DIM};
pub use hand::{Hand, Landmark, LANDMARK_COUNT};
pub use pinch::{ClickState, DepthTouchConfig, DepthTouchDetector, PinchClickDetector, PinchConfig};
pub use scroll::{PalmScrollDetector, ScrollConfig, ScrollDelta};
pub use session::{
    ActiveMode, FrameInput, FrameOutput, GestureSession, SessionConfig, StatusSnapshot, UiEvent,
};
pub use window::{SequenceWindow, SEQUENCE_LEN};
pub use zoom::{
    PinchZoomConfig, PinchZoomEngine, TwoHandZoomConfig, TwoHandZoomEngine, ZoomState, ZoomTuning,
};
