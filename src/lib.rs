// bevy_hitbox_orbit
// Hover and click orchestration for 3D scenes driven by invisible proxy volumes:
// - Hit testing from the pointer to the nearest enabled proxy
// - A table-driven state machine for hover, click, lock and reset
// - Eased camera transitions between authored rigs, handed back to `PanOrbitCamera`
// - Clip playback, delayed reveals and scene restoration

use bevy::ecs::message::Messages;
use bevy::input::InputSystems;
use bevy::prelude::*;
use bevy::window::CursorMoved;
use bevy_panorbit_camera::PanOrbitCameraSystemSet;

mod choreographer;
mod components;
mod error;
mod events;
mod extension;
mod input;
mod lifecycle;
mod machine;
pub mod prelude;
mod registry;
mod reset;
mod sequencer;
mod smoothness;
mod state;
mod support;
mod table;
#[cfg(test)]
mod test_support;
#[cfg(feature = "visualization")]
mod visualization;

// Public API - Events
pub use events::CameraTransitionBegin;
pub use events::CameraTransitionEnd;
pub use events::ExternalNavigation;
pub use events::FocusDumpRequested;
pub use events::FocusReached;
pub use events::HoverEnded;
pub use events::HoverStarted;
pub use events::PointerClicked;
pub use events::PointerMoved;
pub use events::ResetRequested;
pub use events::SceneReset;
pub use registry::NodeReady;

// Public API - Components attached to scene nodes
pub use components::CameraRig;
pub use components::ClipChannel;
pub use components::ClipInfo;
pub use components::ClipLibrary;
pub use components::Emphasized;
pub use components::InteractiveCamera;
pub use components::Proxy;
pub use components::TrackKey;

// Public API - Camera choreography
pub use choreographer::CameraTransition;
pub use choreographer::TransitionPurpose;
pub use extension::PanOrbitCameraExt;
pub use extension::orbital_params;
pub use smoothness::SmoothnessStash;

// Public API - State and outputs
pub use state::Caption;
pub use state::CursorAffordance;
pub use state::FocusTarget;
pub use state::InteractionMode;
pub use state::InteractionState;
pub use state::Phase;
pub use state::PointerState;

// Public API - Playback and lifecycle
pub use lifecycle::RemovedProxy;
pub use lifecycle::SceneLifecycle;
pub use lifecycle::SceneSnapshot;
pub use lifecycle::TaskAction;
pub use lifecycle::TaskScheduler;
pub use sequencer::AnimationSequencer;
pub use sequencer::ClipFamily;
pub use sequencer::LoopMode;
pub use sequencer::PlayOptions;
pub use sequencer::Player;
pub use sequencer::sample_track;

// Public API - Lookup, hit testing and errors
pub use error::InteractionError;
pub use hit_test::HitTester;
pub use hit_test::cursor_to_ndc;
pub use hit_test::project_to_viewport;
pub use hit_test::ray_aabb_distance;
pub use hit_test::ray_from_ndc;
pub use machine::InteractionContext;
pub use registry::AssetRegistry;

// Public API - Configuration resources
pub use table::ClipBinding;
pub use table::DEFAULT_TRANSITION_MS;
pub use table::HoverBinding;
pub use table::HoverExit;
pub use table::InteractionConfig;
pub use table::InteractionTable;
pub use table::LockBinding;
pub use table::ProxyBinding;
pub use table::RevealBinding;
pub use table::RevealSpec;

// Public API - Visualization
#[cfg(feature = "visualization")]
pub use visualization::HitboxGizmo;
#[cfg(feature = "visualization")]
pub use visualization::HitboxVisualizationConfig;
#[cfg(feature = "visualization")]
pub use visualization::HitboxVisualizationPlugin;

// Internal - used by plugin, not for external use
use choreographer::{advance_camera_transition, announce_transition_start};
use input::{forward_clicks, forward_cursor_moves, forward_keys};
use lifecycle::capture_proxy_snapshot;
use machine::{
    on_camera_rig_tagged, on_camera_transition_end, on_focus_dump_requested, on_home_rig_ready,
    on_interactive_camera_added, on_pointer_clicked, on_pointer_moved, run_scheduled_tasks,
    start_ambient_clips, start_ambient_clips_when_named, track_focus_target,
    update_caption_anchor,
};
use registry::{register_named_node, unregister_named_node};
use reset::on_reset_requested;
use sequencer::{advance_players, apply_clip_poses};
use smoothness::{restore_orbit_on_transition_end, stash_orbit_on_transition_start};

/// Plugin that adds hitbox-driven interaction.
///
/// Insert an [`InteractionTable`] (and optionally an [`InteractionConfig`]) to describe the
/// scene; the plugin only fills in defaults for resources that are missing.
pub struct HitboxOrbitPlugin;

impl Plugin for HitboxOrbitPlugin {
    fn build(&self, app: &mut App) {
        app
            // Initialize resources
            .init_resource::<AssetRegistry>()
            .init_resource::<InteractionTable>()
            .init_resource::<InteractionConfig>()
            .init_resource::<InteractionState>()
            .init_resource::<TaskScheduler>()
            .init_resource::<SceneSnapshot>()
            .init_resource::<AnimationSequencer>()
            .init_resource::<CursorAffordance>()
            .init_resource::<Caption>()
            .init_resource::<PointerState>()
            // Register observers for component lifecycle events
            .add_observer(register_named_node)
            .add_observer(unregister_named_node)
            .add_observer(capture_proxy_snapshot)
            .add_observer(start_ambient_clips)
            .add_observer(start_ambient_clips_when_named)
            .add_observer(on_interactive_camera_added)
            .add_observer(announce_transition_start)
            .add_observer(stash_orbit_on_transition_start)
            .add_observer(restore_orbit_on_transition_end)
            // Register observers for custom events
            .add_observer(on_home_rig_ready)
            .add_observer(on_camera_rig_tagged)
            .add_observer(on_pointer_moved)
            .add_observer(on_pointer_clicked)
            .add_observer(on_reset_requested)
            .add_observer(on_focus_dump_requested)
            .add_observer(on_camera_transition_end)
            // Window input, only where the input resources exist
            .add_systems(
                PreUpdate,
                (
                    forward_cursor_moves.run_if(resource_exists::<Messages<CursorMoved>>),
                    forward_clicks.run_if(resource_exists::<ButtonInput<MouseButton>>),
                    forward_keys.run_if(resource_exists::<ButtonInput<KeyCode>>),
                )
                    .chain()
                    .after(InputSystems),
            )
            // Per-frame time advance
            .add_systems(
                Update,
                (
                    run_scheduled_tasks,
                    advance_camera_transition,
                    advance_players,
                    apply_clip_poses,
                    track_focus_target,
                    update_caption_anchor,
                )
                    .chain()
                    .before(PanOrbitCameraSystemSet),
            );
    }
}
