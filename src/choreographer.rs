//! Camera choreography: eased transitions of the live camera between authored rigs.
//!
//! A transition is a component on the camera entity. Inserting a new one replaces the one in
//! flight, so the last started transition always wins. The system below advances it each
//! frame and writes the interpolated transform straight onto the camera; once progress
//! reaches 1 the component is removed and `CameraTransitionEnd` fires.

use bevy::math::curve::Curve;
use bevy::math::curve::easing::EaseFunction;
use bevy::prelude::*;
use bevy_panorbit_camera::PanOrbitCamera;

use crate::events::CameraTransitionBegin;
use crate::events::CameraTransitionEnd;
use crate::extension::PanOrbitCameraExt;

/// Why the camera is moving, which decides what the state machine does on arrival.
#[derive(Clone, Debug, PartialEq, Reflect)]
pub enum TransitionPurpose {
    /// Toward the rig bound to a clicked proxy.
    Focus { proxy: String },
    /// Back to the home rig after a reset.
    Home,
}

/// Live camera transition from one transform to another.
#[derive(Component, Clone, Debug, Reflect)]
#[reflect(Component)]
pub struct CameraTransition {
    pub from:        Transform,
    pub to:          Transform,
    /// Point the orbit controller circles once the camera arrives.
    pub orbit_focus: Vec3,
    pub rig:         String,
    pub purpose:     TransitionPurpose,
    pub duration_ms: f32,
    pub easing:      EaseFunction,
    elapsed_ms:      f32,
}

impl CameraTransition {
    pub fn new(
        from: Transform,
        to: Transform,
        orbit_focus: Vec3,
        rig: impl Into<String>,
        purpose: TransitionPurpose,
        duration_ms: f32,
        easing: EaseFunction,
    ) -> Self {
        Self {
            from,
            to,
            orbit_focus,
            rig: rig.into(),
            purpose,
            duration_ms,
            easing,
            elapsed_ms: 0.0,
        }
    }

    pub const fn elapsed_ms(&self) -> f32 { self.elapsed_ms }

    /// Linear progress in `[0, 1]`. A zero duration counts as already complete.
    pub fn progress(&self) -> f32 {
        if self.duration_ms <= 0.0 {
            return 1.0;
        }
        (self.elapsed_ms / self.duration_ms).min(1.0)
    }

    /// Progress after easing.
    pub fn eased_progress(&self) -> f32 { self.easing.sample_unchecked(self.progress()) }

    pub fn is_complete(&self) -> bool { self.progress() >= 1.0 }

    /// Advances elapsed time and reports whether the transition has completed.
    pub fn advance(&mut self, delta_ms: f32) -> bool {
        self.elapsed_ms += delta_ms.max(0.0);
        self.is_complete()
    }

    /// Interpolated camera transform: componentwise lerp for translation, slerp for
    /// rotation, both driven by the same eased progress.
    pub fn sample(&self) -> Transform {
        if self.is_complete() {
            // Snap to exact target to avoid floating point drift
            return self.to.with_scale(self.from.scale);
        }
        let t = self.eased_progress();
        Transform {
            translation: self.from.translation.lerp(self.to.translation, t),
            rotation:    self.from.rotation.slerp(self.to.rotation, t),
            scale:       self.from.scale,
        }
    }

    /// Proxy whose click started this transition.
    pub fn proxy(&self) -> Option<&str> {
        match &self.purpose {
            TransitionPurpose::Focus { proxy } => Some(proxy),
            TransitionPurpose::Home => None,
        }
    }
}

/// Observer that announces every transition start, including replacements.
pub fn announce_transition_start(
    insert: On<Insert, CameraTransition>,
    mut commands: Commands,
    query: Query<&CameraTransition>,
) {
    let Ok(transition) = query.get(insert.entity) else {
        return;
    };

    info!(
        "CameraTransition: toward `{}` from {:.1?} to {:.1?} over {:.0}ms",
        transition.rig,
        transition.from.translation,
        transition.to.translation,
        transition.duration_ms
    );

    commands.trigger(CameraTransitionBegin {
        camera_entity: insert.entity,
        rig:           transition.rig.clone(),
        duration_ms:   transition.duration_ms,
    });
}

/// System that advances camera transitions and writes the result onto the camera.
///
/// On completion the orbit controller is re-seeded around the transition's focus so user
/// orbit resumes from exactly where the transition left the camera.
pub fn advance_camera_transition(
    mut commands: Commands,
    time: Res<Time>,
    mut camera_query: Query<(
        Entity,
        &mut Transform,
        &mut CameraTransition,
        Option<&mut PanOrbitCamera>,
    )>,
) {
    for (entity, mut transform, mut transition, pan_orbit) in &mut camera_query {
        let complete = transition.advance(time.delta_secs() * 1000.0);
        *transform = transition.sample();

        if !complete {
            continue;
        }

        if let Some(mut pan_orbit) = pan_orbit {
            pan_orbit.orbit_from(transition.to.translation, transition.orbit_focus);
        }

        // Remove the component BEFORE triggering the end event: observers of the end
        // event may start a new transition, and a deferred removal would wipe it.
        commands.entity(entity).remove::<CameraTransition>();
        commands.trigger(CameraTransitionEnd {
            camera_entity: entity,
            rig:           transition.rig.clone(),
            proxy:         transition.proxy().map(str::to_owned),
        });
    }
}
