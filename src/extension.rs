//! Extension trait for handing a `PanOrbitCamera` back and forth between user orbit and
//! scripted camera transitions.

use bevy::prelude::*;
use bevy_panorbit_camera::PanOrbitCamera;

use crate::smoothness::SmoothnessStash;

/// Orbital parameters `(yaw, pitch, radius)` of a camera at `translation` orbiting `focus`.
pub fn orbital_params(translation: Vec3, focus: Vec3) -> (f32, f32, f32) {
    let offset = translation - focus;
    let radius = offset.length();
    let yaw = offset.x.atan2(offset.z);
    let horizontal_dist = offset.x.hypot(offset.z);
    let pitch = offset.y.atan2(horizontal_dist);
    (yaw, pitch, radius)
}

/// Extension trait for `PanOrbitCamera` providing convenience methods.
pub trait PanOrbitCameraExt {
    /// Disables interpolation for precise control during transitions.
    fn disable_interpolation(&mut self);

    /// Stashes current smoothness values and disables smoothness.
    /// Returns a `SmoothnessStash` that can be inserted as a component.
    fn stash_and_disable_smoothness(&mut self) -> SmoothnessStash;

    /// Puts back smoothness values taken by `stash_and_disable_smoothness`.
    fn restore_smoothness(&mut self, stash: &SmoothnessStash);

    /// Sets every target to the current value, so the controller has nothing left to
    /// interpolate and will not write the camera transform on its own.
    fn settle(&mut self);

    /// Re-derives orbit state so the camera sits at `translation` orbiting `focus`,
    /// without any interpolation.
    fn orbit_from(&mut self, translation: Vec3, focus: Vec3);
}

impl PanOrbitCameraExt for PanOrbitCamera {
    fn disable_interpolation(&mut self) {
        self.zoom_smoothness = 0.0;
        self.pan_smoothness = 0.0;
        self.orbit_smoothness = 0.0;
    }

    fn stash_and_disable_smoothness(&mut self) -> SmoothnessStash {
        let stash = SmoothnessStash {
            zoom:  self.zoom_smoothness,
            pan:   self.pan_smoothness,
            orbit: self.orbit_smoothness,
        };

        self.disable_interpolation();

        stash
    }

    fn restore_smoothness(&mut self, stash: &SmoothnessStash) {
        self.zoom_smoothness = stash.zoom;
        self.pan_smoothness = stash.pan;
        self.orbit_smoothness = stash.orbit;
    }

    fn settle(&mut self) {
        self.target_focus = self.focus;
        if let Some(radius) = self.radius {
            self.target_radius = radius;
        }
        if let Some(yaw) = self.yaw {
            self.target_yaw = yaw;
        }
        if let Some(pitch) = self.pitch {
            self.target_pitch = pitch;
        }
    }

    fn orbit_from(&mut self, translation: Vec3, focus: Vec3) {
        let (yaw, pitch, radius) = orbital_params(translation, focus);

        // Synchronize current values with target values to prevent interpolation
        // artifacts when smoothness is restored
        self.focus = focus;
        self.target_focus = focus;
        self.radius = Some(radius);
        self.target_radius = radius;
        self.yaw = Some(yaw);
        self.target_yaw = yaw;
        self.pitch = Some(pitch);
        self.target_pitch = pitch;
        self.force_update = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn orbit_params_match_panorbit_convention() {
        let focus = Vec3::new(1.0, 0.5, -2.0);
        let translation = focus + Vec3::new(3.0, 2.0, 4.0);

        let (yaw, pitch, radius) = orbital_params(translation, focus);

        // PanOrbitCamera places the camera at focus + (yaw * -pitch) * (0, 0, radius)
        let rotation = Quat::from_axis_angle(Vec3::Y, yaw) * Quat::from_axis_angle(Vec3::X, -pitch);
        let rebuilt = focus + rotation * Vec3::new(0.0, 0.0, radius);
        assert!(rebuilt.distance(translation) < 1e-4);
    }

    #[test]
    fn stash_round_trips_smoothness() {
        let mut camera = PanOrbitCamera {
            zoom_smoothness: 0.3,
            pan_smoothness: 0.4,
            orbit_smoothness: 0.5,
            ..default()
        };

        let stash = camera.stash_and_disable_smoothness();
        assert_eq!(camera.orbit_smoothness, 0.0);

        camera.restore_smoothness(&stash);
        assert_eq!(
            (camera.zoom_smoothness, camera.pan_smoothness, camera.orbit_smoothness),
            (0.3, 0.4, 0.5)
        );
    }

    #[test]
    fn orbit_from_syncs_current_and_target() {
        let mut camera = PanOrbitCamera::default();
        camera.orbit_from(Vec3::new(0.0, 0.0, 6.0), Vec3::ZERO);

        assert_eq!(camera.radius, Some(6.0));
        assert_eq!(camera.target_radius, 6.0);
        assert_eq!(camera.yaw, Some(0.0));
        assert_eq!(camera.target_pitch, 0.0);
        assert!(camera.force_update);
    }
}
