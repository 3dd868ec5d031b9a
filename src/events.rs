//! Input events consumed by the interaction core and lifecycle events it emits.

use bevy::prelude::*;

// ============================================================================
// Inputs
// ============================================================================

/// Pointer moved to `position` (window pixels, origin top-left) inside a viewport of
/// `viewport` logical pixels.
#[derive(Event, Reflect, Debug, Clone, Copy)]
#[reflect(Event, FromReflect)]
pub struct PointerMoved {
    pub position: Vec2,
    pub viewport: Vec2,
}

impl PointerMoved {
    pub const fn new(position: Vec2, viewport: Vec2) -> Self { Self { position, viewport } }
}

/// Click or tap. Acts on whatever the last pointer move resolved to.
#[derive(Event, Reflect, Debug, Clone, Copy, Default)]
#[reflect(Event, FromReflect)]
pub struct PointerClicked;

/// Return everything to its initial configuration. Sent by the reset key or a UI button.
#[derive(Event, Reflect, Debug, Clone, Copy, Default)]
#[reflect(Event, FromReflect)]
pub struct ResetRequested;

/// Log the current focus target and camera transform.
#[derive(Event, Reflect, Debug, Clone, Copy, Default)]
#[reflect(Event, FromReflect)]
pub struct FocusDumpRequested;

// ============================================================================
// Hover lifecycle
// ============================================================================

/// Fired when the pointer enters an enabled proxy.
#[derive(Event, Reflect, Debug, Clone)]
#[reflect(Event, FromReflect)]
pub struct HoverStarted {
    pub proxy: String,
}

/// Fired when the hovered proxy is left, removed, or cleared by reset.
#[derive(Event, Reflect, Debug, Clone)]
#[reflect(Event, FromReflect)]
pub struct HoverEnded {
    pub proxy: String,
}

// ============================================================================
// Camera transition lifecycle
// ============================================================================

/// Fired when a `CameraTransition` starts, including one that replaces a transition in flight.
#[derive(EntityEvent, Reflect, Debug, Clone)]
#[reflect(Event, FromReflect)]
pub struct CameraTransitionBegin {
    #[event_target]
    pub camera_entity: Entity,
    pub rig:           String,
    pub duration_ms:   f32,
}

/// Fired exactly once when a transition reaches progress 1.
#[derive(EntityEvent, Reflect, Debug, Clone)]
#[reflect(Event, FromReflect)]
pub struct CameraTransitionEnd {
    #[event_target]
    pub camera_entity: Entity,
    pub rig:           String,
    /// Proxy whose click started the transition, `None` for the return to the home rig.
    pub proxy:         Option<String>,
}

/// Fired when the state machine settles on a focus target.
#[derive(Event, Reflect, Debug, Clone)]
#[reflect(Event, FromReflect)]
pub struct FocusReached {
    pub proxy: String,
}

// ============================================================================
// Terminal side effects
// ============================================================================

/// A proxy bound to an external resource was clicked. The host opens `url`.
#[derive(Event, Reflect, Debug, Clone)]
#[reflect(Event, FromReflect)]
pub struct ExternalNavigation {
    pub proxy: String,
    pub url:   String,
}

/// Fired after a reset has restored the initial configuration.
#[derive(Event, Reflect, Debug, Clone, Copy, Default)]
#[reflect(Event, FromReflect)]
pub struct SceneReset;
