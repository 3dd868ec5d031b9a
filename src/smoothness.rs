use bevy::prelude::*;
use bevy_panorbit_camera::PanOrbitCamera;

use crate::choreographer::CameraTransition;
use crate::extension::PanOrbitCameraExt;

/// Component that stores camera smoothness values during transitions.
///
/// While a `CameraTransition` drives the camera, the orbit controller is disabled and its
/// smoothness values are set to 0.0, with the original values stored here. When the
/// transition completes and its component is removed, the smoothness is restored and the
/// controller re-enabled via an observer.
#[derive(Component, Debug, Clone, Copy, Default)]
pub struct SmoothnessStash {
    pub zoom:  f32,
    pub pan:   f32,
    pub orbit: f32,
}

/// Observer that hands the camera over to a starting transition.
///
/// A transition that replaces one in flight keeps the stash of the first, so the values put
/// back at the end are the user's, not the zeroes set here.
pub fn stash_orbit_on_transition_start(
    insert: On<Insert, CameraTransition>,
    mut commands: Commands,
    mut query: Query<(&mut PanOrbitCamera, Has<SmoothnessStash>)>,
) {
    let entity = insert.entity;

    let Ok((mut camera, stashed)) = query.get_mut(entity) else {
        return;
    };

    if !stashed {
        let stash = camera.stash_and_disable_smoothness();
        commands.entity(entity).insert(stash);
    }
    camera.settle();
    camera.enabled = false;
}

/// Observer that restores smoothness and user orbit when `CameraTransition` is removed
pub fn restore_orbit_on_transition_end(
    remove: On<Remove, CameraTransition>,
    mut commands: Commands,
    mut query: Query<(&mut PanOrbitCamera, Option<&SmoothnessStash>)>,
) {
    let entity = remove.entity;

    let Ok((mut camera, stash)) = query.get_mut(entity) else {
        return;
    };

    if let Some(stash) = stash {
        camera.restore_smoothness(stash);
        commands.entity(entity).remove::<SmoothnessStash>();
    }
    camera.enabled = true;
}
