//! Interaction state and the presentation outputs derived from it.

use bevy::platform::collections::HashSet;
use bevy::prelude::*;

/// Node the orbit controller is centred on while focused.
#[derive(Clone, Debug, PartialEq, Eq, Reflect)]
pub struct FocusTarget {
    pub name:   String,
    pub entity: Entity,
}

/// Where the camera is in its focus lifecycle.
#[derive(Clone, Debug, PartialEq, Eq, Default, Reflect)]
pub enum Phase {
    /// Free orbit around the overview.
    #[default]
    Overview,
    /// Camera choreography toward the rig bound to `target` is running.
    Transitioning { target: String },
    /// Arrived. Orbit is re-enabled and follows the focus target.
    Focused { target: String },
}

/// Externally observable mode, derived from the phase, hover and locks.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InteractionMode {
    Overview,
    Hovering(String),
    Transitioning(String),
    Focused(String),
    Locked,
}

/// Everything the state machine knows about the session.
///
/// Only the state machine observers write this. Pending timers live in
/// [`TaskScheduler`](crate::TaskScheduler) so reset can invalidate them in one step.
#[derive(Resource, Debug, Default, Clone, PartialEq)]
pub struct InteractionState {
    pub(crate) phase:        Phase,
    pub(crate) focus:        Option<FocusTarget>,
    pub(crate) hovered:      Option<String>,
    /// Proxy whose hover effects are currently applied or scheduled.
    pub(crate) hover_active: Option<String>,
    pub(crate) locks:        HashSet<String>,
    /// Proxies whose hover effects were locked open by a click.
    pub(crate) committed:    HashSet<String>,
}

impl InteractionState {
    pub const fn phase(&self) -> &Phase { &self.phase }

    pub const fn focus(&self) -> Option<&FocusTarget> { self.focus.as_ref() }

    pub fn hovered(&self) -> Option<&str> { self.hovered.as_deref() }

    pub fn is_locked(&self) -> bool { !self.locks.is_empty() }

    pub fn has_lock(&self, kind: &str) -> bool { self.locks.contains(kind) }

    pub fn locks(&self) -> impl Iterator<Item = &str> { self.locks.iter().map(String::as_str) }

    pub fn is_committed(&self, proxy: &str) -> bool { self.committed.contains(proxy) }

    /// Collapses the state into a single mode. A lock outranks everything, then camera
    /// motion, then focus, then hover.
    pub fn mode(&self) -> InteractionMode {
        if self.is_locked() {
            return InteractionMode::Locked;
        }
        match &self.phase {
            Phase::Transitioning { target } => InteractionMode::Transitioning(target.clone()),
            Phase::Focused { target } => InteractionMode::Focused(target.clone()),
            Phase::Overview => self
                .hovered
                .clone()
                .map_or(InteractionMode::Overview, InteractionMode::Hovering),
        }
    }

    pub(crate) fn clear(&mut self) { *self = Self::default(); }
}

/// Cursor shape the host should show.
#[derive(Resource, Reflect, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[reflect(Resource)]
pub enum CursorAffordance {
    #[default]
    Default,
    /// Over an enabled proxy.
    Pointer,
}

/// Caption of the hovered proxy and where to draw it, in window pixels.
#[derive(Resource, Reflect, Debug, Clone, Default, PartialEq)]
#[reflect(Resource)]
pub struct Caption {
    pub proxy:  Option<String>,
    pub text:   Option<String>,
    pub anchor: Option<Vec2>,
}

impl Caption {
    pub const fn is_visible(&self) -> bool { self.text.is_some() }
}

/// Last pointer position seen, kept so the caption anchor can be projected with the same
/// viewport size the pointer was reported in.
#[derive(Resource, Debug, Clone, Copy, Default, PartialEq)]
pub struct PointerState {
    pub position: Option<Vec2>,
    pub viewport: Vec2,
}
