#![forbid(unsafe_code)]

//! Cursor inspection lifecycle.
//!
//! ```text
//!            PointerMove            Click
//!   Idle ───────────────▶ Hover ──────────▶ Frozen
//!    ▲  ◀─────────────────  │                 │
//!    │      PointerLeave    │ PointerMove     │ Click | Close | Cancel |
//!    │                      ▼ (re-query)      │ OutsideInteraction
//!    └────────────────────────────────────────┘
//! ```
//!
//! Hover follows the pointer and re-queries on every move. Freezing pins the
//! hover instant and caches one query result; pointer traffic is ignored until
//! something unfreezes.
//!
//! The frozen instant is held as a time, never as a pixel. Zoom replaces only
//! the scale, so the pinned time (and its hits) survive any zoom sequence and
//! its pixel position is re-projected from the new scale.
//!
//! Every [`InteractionMachine::apply`] call yields an
//! [`InteractionTransition`] with a monotonically increasing id, including
//! no-ops, which carry the reason they were ignored.

use serde::Serialize;
use tabscope_core::event::Timestamp;
use tabscope_layout::axis::TimeScale;

use crate::resolver::{CursorQuery, Hit};

/// Why an inspection was cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CancelReason {
    EscapeKey,
    FocusLost,
    Programmatic,
}

/// Abstract inputs; raw device plumbing maps onto these.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "input", rename_all = "snake_case")]
pub enum InteractionInput {
    /// Pointer at horizontal pixel `x` in the current scale.
    PointerMove { x: f64 },
    Click,
    /// The inspection panel's close control.
    Close,
    Cancel { reason: CancelReason },
    /// A click or focus change outside the inspected surface.
    OutsideInteraction,
    PointerLeave,
    Zoom { pixels_per_second: f64 },
}

/// Lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum InteractionState {
    #[default]
    Idle,
    Hover {
        time: Timestamp,
    },
    Frozen {
        time: Timestamp,
    },
}

impl InteractionState {
    /// Instant under inspection, if any.
    #[must_use]
    pub const fn time(self) -> Option<Timestamp> {
        match self {
            Self::Idle => None,
            Self::Hover { time } | Self::Frozen { time } => Some(time),
        }
    }

    #[must_use]
    pub const fn is_frozen(self) -> bool {
        matches!(self, Self::Frozen { .. })
    }

    const fn name(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Hover { .. } => "hover",
            Self::Frozen { .. } => "frozen",
        }
    }
}

/// What ended a frozen inspection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "by", rename_all = "snake_case")]
pub enum UnfreezeCause {
    Click,
    Close,
    Cancel { reason: CancelReason },
    OutsideInteraction,
}

/// Explicit diagnostics for inputs that are safely ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionNoopReason {
    /// Click, close, cancel, or leave with nothing under inspection.
    IdleWithoutInspection,
    /// Pointer input while frozen.
    FrozenIgnoresPointer,
    /// Close, cancel, or outside interaction while only hovering.
    NothingFrozen,
    /// Pointer position was NaN or infinite.
    NonFinitePointer,
}

/// Effect emitted by one lifecycle step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "effect", rename_all = "snake_case")]
pub enum InteractionEffect {
    HoverMoved {
        time: Timestamp,
        hits: usize,
    },
    HoverCleared,
    Frozen {
        time: Timestamp,
        hits: usize,
    },
    Unfrozen {
        cause: UnfreezeCause,
    },
    Zoomed {
        pixels_per_second: f64,
        /// Re-projected pixel of the frozen instant, when frozen.
        frozen_x: Option<f64>,
    },
    Noop {
        reason: InteractionNoopReason,
    },
}

/// One state-machine transition with deterministic telemetry fields.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct InteractionTransition {
    pub transition_id: u64,
    pub from: InteractionState,
    pub to: InteractionState,
    pub effect: InteractionEffect,
}

/// Runtime lifecycle machine for cursor inspection.
#[derive(Debug, Clone)]
pub struct InteractionMachine {
    state: InteractionState,
    scale: TimeScale,
    hits: Vec<Hit>,
    transition_counter: u64,
}

impl Default for InteractionMachine {
    fn default() -> Self {
        Self::new(TimeScale::default())
    }
}

impl InteractionMachine {
    #[must_use]
    pub fn new(scale: TimeScale) -> Self {
        Self {
            state: InteractionState::Idle,
            scale,
            hits: Vec::new(),
            transition_counter: 0,
        }
    }

    #[must_use]
    pub const fn state(&self) -> InteractionState {
        self.state
    }

    #[must_use]
    pub const fn scale(&self) -> &TimeScale {
        &self.scale
    }

    /// Latest hover result, or the cached result while frozen.
    #[must_use]
    pub fn hits(&self) -> &[Hit] {
        &self.hits
    }

    /// Replace the projection without touching the state. The inspected
    /// instant is held as a time, so only its pixel moves.
    pub fn set_scale(&mut self, scale: TimeScale) {
        self.scale = scale;
    }

    /// Pixel of the inspected instant under the current scale.
    #[must_use]
    pub fn cursor_x(&self) -> Option<f64> {
        self.state.time().map(|t| self.scale.time_to_x(t))
    }

    /// `Frozen at HH:MM:SS.mmm • N events` while frozen.
    #[must_use]
    pub fn frozen_summary(&self) -> Option<String> {
        match self.state {
            InteractionState::Frozen { time } => Some(format!(
                "Frozen at {} • {} events",
                time.format_precise(),
                self.hits.len()
            )),
            _ => None,
        }
    }

    /// Apply one input. Hover moves and freezes query `resolver`; nothing
    /// else does.
    pub fn apply<Q>(&mut self, input: InteractionInput, resolver: &Q) -> InteractionTransition
    where
        Q: CursorQuery + ?Sized,
    {
        let from = self.state;
        let effect = match (self.state, input) {
            (InteractionState::Frozen { .. }, InteractionInput::PointerMove { .. })
            | (InteractionState::Frozen { .. }, InteractionInput::PointerLeave) => {
                InteractionEffect::Noop {
                    reason: InteractionNoopReason::FrozenIgnoresPointer,
                }
            }
            (_, InteractionInput::PointerMove { x }) if !x.is_finite() => InteractionEffect::Noop {
                reason: InteractionNoopReason::NonFinitePointer,
            },
            (_, InteractionInput::PointerMove { x }) => {
                let time = self.scale.x_to_time(x);
                self.hits = resolver.query(time);
                self.state = InteractionState::Hover { time };
                InteractionEffect::HoverMoved {
                    time,
                    hits: self.hits.len(),
                }
            }
            (InteractionState::Hover { time }, InteractionInput::Click) => {
                self.hits = resolver.query(time);
                self.state = InteractionState::Frozen { time };
                InteractionEffect::Frozen {
                    time,
                    hits: self.hits.len(),
                }
            }
            (InteractionState::Frozen { .. }, InteractionInput::Click) => {
                self.unfreeze(UnfreezeCause::Click)
            }
            (InteractionState::Frozen { .. }, InteractionInput::Close) => {
                self.unfreeze(UnfreezeCause::Close)
            }
            (InteractionState::Frozen { .. }, InteractionInput::Cancel { reason }) => {
                self.unfreeze(UnfreezeCause::Cancel { reason })
            }
            (InteractionState::Frozen { .. }, InteractionInput::OutsideInteraction) => {
                self.unfreeze(UnfreezeCause::OutsideInteraction)
            }
            (InteractionState::Hover { .. }, InteractionInput::PointerLeave) => {
                self.state = InteractionState::Idle;
                self.hits.clear();
                InteractionEffect::HoverCleared
            }
            (
                InteractionState::Hover { .. },
                InteractionInput::Close
                | InteractionInput::Cancel { .. }
                | InteractionInput::OutsideInteraction,
            ) => InteractionEffect::Noop {
                reason: InteractionNoopReason::NothingFrozen,
            },
            (_, InteractionInput::Zoom { pixels_per_second }) => {
                self.scale = self.scale.with_pixels_per_second(pixels_per_second);
                let frozen_x = match self.state {
                    InteractionState::Frozen { time } => Some(self.scale.time_to_x(time)),
                    _ => None,
                };
                InteractionEffect::Zoomed {
                    pixels_per_second: self.scale.pixels_per_second(),
                    frozen_x,
                }
            }
            (InteractionState::Idle, _) => InteractionEffect::Noop {
                reason: InteractionNoopReason::IdleWithoutInspection,
            },
        };

        self.transition_counter = self.transition_counter.saturating_add(1);
        tracing::debug!(
            transition_id = self.transition_counter,
            from = from.name(),
            to = self.state.name(),
            hits = self.hits.len(),
            "inspection transition"
        );
        InteractionTransition {
            transition_id: self.transition_counter,
            from,
            to: self.state,
            effect,
        }
    }

    fn unfreeze(&mut self, cause: UnfreezeCause) -> InteractionEffect {
        self.state = InteractionState::Idle;
        self.hits.clear();
        InteractionEffect::Unfrozen { cause }
    }
}
