//! Debug overlay for proxy hit volumes and camera rigs.
//!
//! Uses Bevy's GizmoConfigGroup pattern. Proxies are drawn as boxes coloured by state and
//! rigs as axes, so an authored scene can be checked against what the hit tester sees.

use bevy::camera::primitives::Aabb;
use bevy::camera::visibility::RenderLayers;
use bevy::prelude::*;

use crate::components::CameraRig;
use crate::components::InteractiveCamera;
use crate::components::Proxy;
use crate::state::InteractionState;

/// Gizmo config group for hitbox visualization.
/// Toggle via `GizmoConfigStore::config_mut::<HitboxGizmo>().enabled`
#[derive(Default, Reflect, GizmoConfigGroup)]
pub struct HitboxGizmo {}

/// Colours and sizes for the hitbox overlay
#[derive(Resource, Reflect, Debug, Clone)]
#[reflect(Resource)]
pub struct HitboxVisualizationConfig {
    pub enabled_color:   Color,
    pub disabled_color:  Color,
    pub hovered_color:   Color,
    pub rig_axes_length: f32,
    pub line_width:      f32,
}

impl Default for HitboxVisualizationConfig {
    fn default() -> Self {
        Self {
            enabled_color:   Color::srgb(0.0, 1.0, 0.0), // Green
            disabled_color:  Color::srgb(0.4, 0.4, 0.4), // Grey
            hovered_color:   Color::srgb(1.0, 1.0, 0.0), // Yellow
            rig_axes_length: 0.5,
            line_width:      2.0,
        }
    }
}

/// Plugin that adds hitbox visualization
pub struct HitboxVisualizationPlugin;

impl Plugin for HitboxVisualizationPlugin {
    fn build(&self, app: &mut App) {
        app.init_gizmo_group::<HitboxGizmo>()
            .init_resource::<HitboxVisualizationConfig>()
            .add_systems(Startup, init_hitbox_gizmo)
            .add_systems(
                Update,
                (sync_gizmo_render_layers, draw_hitboxes, draw_camera_rigs).chain(),
            );
    }
}

/// Initialize the hitbox gizmo config (disabled by default)
fn init_hitbox_gizmo(
    mut config_store: ResMut<GizmoConfigStore>,
    viz_config: Res<HitboxVisualizationConfig>,
) {
    let (config, _) = config_store.config_mut::<HitboxGizmo>();
    config.enabled = false;
    config.line.width = viz_config.line_width;
    config.depth_bias = -1.0;
}

/// Keeps the gizmo on the interactive camera's render layers
fn sync_gizmo_render_layers(
    mut config_store: ResMut<GizmoConfigStore>,
    viz_config: Res<HitboxVisualizationConfig>,
    camera_query: Query<Option<&RenderLayers>, With<InteractiveCamera>>,
) {
    let Ok(render_layers) = camera_query.single() else {
        return;
    };

    let (gizmo_config, _) = config_store.config_mut::<HitboxGizmo>();
    if let Some(layers) = render_layers {
        gizmo_config.render_layers = layers.clone();
    }
    gizmo_config.line.width = viz_config.line_width;
}

const fn hitbox_color(config: &HitboxVisualizationConfig, enabled: bool, hovered: bool) -> Color {
    match (enabled, hovered) {
        (false, _) => config.disabled_color,
        (true, true) => config.hovered_color,
        (true, false) => config.enabled_color,
    }
}

fn draw_hitboxes(
    mut gizmos: Gizmos<HitboxGizmo>,
    config: Res<HitboxVisualizationConfig>,
    state: Res<InteractionState>,
    volumes: Query<(Entity, &Aabb, &GlobalTransform)>,
    parents: Query<&ChildOf>,
    proxies: Query<&Proxy>,
) {
    for (entity, aabb, global) in &volumes {
        let Some(proxy) = std::iter::once(entity)
            .chain(parents.iter_ancestors(entity))
            .find_map(|ancestor| proxies.get(ancestor).ok())
        else {
            continue;
        };

        let hovered = state.hovered() == Some(proxy.id.as_str());
        let color = hitbox_color(&config, proxy.enabled, hovered);

        let local_box = Transform::from_translation(Vec3::from(aabb.center))
            .with_scale(Vec3::from(aabb.half_extents) * 2.0);
        gizmos.cube(global.compute_transform() * local_box, color);
    }
}

fn draw_camera_rigs(
    mut gizmos: Gizmos<HitboxGizmo>,
    config: Res<HitboxVisualizationConfig>,
    rigs: Query<&GlobalTransform, With<CameraRig>>,
) {
    for global in &rigs {
        gizmos.axes(*global, config.rig_axes_length);
    }
}
