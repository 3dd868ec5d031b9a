//! A primitive-mesh showroom driven by `bevy_hitbox_orbit`.
//!
//! - Hover the car's hood or trunk to open it, click to fly the camera over
//! - Click the menu board to approach it and reveal its four options
//! - The sign opens an external link (logged here)
//! - Press Escape to reset, F to log the current focus, D to toggle the hitbox overlay

use std::collections::HashMap;
use std::f32::consts::FRAC_PI_4;

use bevy::camera::primitives::Aabb;
use bevy::prelude::*;
use bevy_brp_extras::BrpExtrasPlugin;
use bevy_hitbox_orbit::CameraTransitionBegin;
use bevy_hitbox_orbit::ClipChannel;
use bevy_hitbox_orbit::ExternalNavigation;
use bevy_hitbox_orbit::FocusReached;
use bevy_hitbox_orbit::HitboxGizmo;
use bevy_hitbox_orbit::HitboxVisualizationPlugin;
use bevy_hitbox_orbit::SceneReset;
use bevy_hitbox_orbit::TrackKey;
use bevy_hitbox_orbit::prelude::*;
use bevy_panorbit_camera::PanOrbitCamera;
use bevy_panorbit_camera::PanOrbitCameraPlugin;

const HITBOX_PADDING: f32 = 0.05;
const CAPTION_FONT_SIZE: f32 = 18.0;
const STATUS_FONT_SIZE: f32 = 14.0;
const CAPTION_OFFSET: Vec2 = Vec2::new(16.0, -28.0);
const OPTION_COLOR: Color = Color::srgb(0.9, 0.9, 0.95);

const HOOD: Vec3 = Vec3::new(0.0, 0.95, 1.2);
const BACK: Vec3 = Vec3::new(0.0, 0.95, -1.4);
const LAMP: Vec3 = Vec3::new(-1.8, 2.4, -2.5);
const ROBOT: Vec3 = Vec3::new(2.2, 0.6, -2.0);

/// A primitive stand-in for one model of the showroom.
struct Prop {
    name:     &'static str,
    size:     Vec3,
    position: Vec3,
    color:    Color,
    hitbox:   Option<&'static str>,
}

const fn prop(name: &'static str, size: [f32; 3], position: Vec3, rgb: [f32; 3]) -> Prop {
    Prop {
        name,
        size: Vec3::from_array(size),
        position,
        color: Color::srgb(rgb[0], rgb[1], rgb[2]),
        hitbox: None,
    }
}

const fn with_hitbox(mut prop: Prop, hitbox: &'static str) -> Prop {
    prop.hitbox = Some(hitbox);
    prop
}

const MENU: Vec3 = Vec3::new(-3.0, 1.6, -1.0);
const GUIDE: Vec3 = Vec3::new(3.0, 0.8, 0.0);
const TABLE: Vec3 = Vec3::new(3.2, 0.35, -2.8);
const SIGN: Vec3 = Vec3::new(0.0, 2.8, -3.5);
const BODY_RED: [f32; 3] = [0.8, 0.15, 0.15];

const PROPS: [Prop; 12] = [
    prop("ground", [14.0, 0.1, 14.0], Vec3::new(0.0, -0.05, 0.0), [0.3, 0.3, 0.32]),
    prop("car", [1.8, 0.8, 3.6], Vec3::new(0.0, 0.5, 0.0), [0.7, 0.1, 0.1]),
    with_hitbox(prop("hood", [1.7, 0.08, 1.1], HOOD, BODY_RED), "hitbox_hood"),
    with_hitbox(prop("back", [1.7, 0.08, 0.8], BACK, BODY_RED), "hitbox_back"),
    prop("lamp", [0.3, 0.6, 0.3], LAMP, [1.0, 0.9, 0.6]),
    prop("robot", [0.5, 1.2, 0.5], ROBOT, [0.6, 0.6, 0.7]),
    prop("generator", [0.8, 0.8, 0.8], Vec3::new(-2.2, 0.4, -2.2), [0.2, 0.5, 0.3]),
    with_hitbox(prop("menu", [1.6, 1.2, 0.1], MENU, [0.15, 0.15, 0.2]), "hitbox_menu"),
    prop("menu_facade", [1.4, 1.0, 0.02], Vec3::new(-3.0, 1.6, -0.94), [0.2, 0.4, 0.8]),
    with_hitbox(prop("guide", [0.6, 1.6, 0.1], GUIDE, [0.9, 0.8, 0.3]), "hitbox_guide"),
    with_hitbox(prop("table", [1.2, 0.7, 0.8], TABLE, [0.5, 0.35, 0.2]), "hitbox_table"),
    with_hitbox(prop("sign", [1.0, 0.5, 0.1], SIGN, [0.9, 0.9, 0.9]), "hitbox_sign"),
];

fn main() {
    App::new()
        .add_plugins((
            DefaultPlugins,
            PanOrbitCameraPlugin,
            HitboxOrbitPlugin,
            HitboxVisualizationPlugin,
            BrpExtrasPlugin::default(),
        ))
        .insert_resource(InteractionTable {
            overview_focus: Vec3::new(0.0, 0.8, 0.0),
            ..InteractionTable::showroom()
        })
        .add_systems(Startup, setup)
        .add_systems(
            Update,
            (toggle_hitbox_overlay, update_caption_text, update_status_text),
        )
        .add_observer(log_transition_begin)
        .add_observer(log_focus_reached)
        .add_observer(log_navigation)
        .add_observer(log_reset)
        .run();
}

#[derive(Component)]
struct CaptionText;

#[derive(Component)]
struct StatusText;

/// Keyframes rotating a node about its local X axis from closed to `open_angle`.
fn hinge(position: Vec3, open_angle: f32, duration_secs: f32) -> ClipChannel {
    ClipChannel::Track {
        keys: vec![
            TrackKey {
                time_secs:   0.0,
                translation: position,
                rotation:    Quat::IDENTITY,
            },
            TrackKey {
                time_secs:   duration_secs,
                translation: position,
                rotation:    Quat::from_rotation_x(open_angle),
            },
        ],
    }
}

/// Keyframes swinging a node about its local Z axis.
fn swing(position: Vec3, angle: f32, duration_secs: f32) -> ClipChannel {
    ClipChannel::Track {
        keys: vec![
            TrackKey {
                time_secs:   0.0,
                translation: position,
                rotation:    Quat::from_rotation_z(-angle),
            },
            TrackKey {
                time_secs:   duration_secs,
                translation: position,
                rotation:    Quat::from_rotation_z(angle),
            },
        ],
    }
}

struct Showroom<'a, 'w, 's> {
    commands:  &'a mut Commands<'w, 's>,
    meshes:    &'a mut Assets<Mesh>,
    materials: &'a mut Assets<StandardMaterial>,
}

impl Showroom<'_, '_, '_> {
    fn model(&mut self, name: &str, size: Vec3, position: Vec3, color: Color) -> Entity {
        self.commands
            .spawn((
                Name::new(name.to_owned()),
                Mesh3d(self.meshes.add(Cuboid::from_size(size))),
                MeshMaterial3d(self.materials.add(color)),
                Transform::from_translation(position),
            ))
            .id()
    }

    /// An invisible proxy sized to cover `size` around `position`.
    fn proxy(&mut self, proxy: Proxy, size: Vec3, position: Vec3) {
        let half = size * 0.5 + HITBOX_PADDING;
        self.commands
            .spawn((
                Name::new(proxy.id.clone()),
                proxy,
                Transform::from_translation(position),
            ))
            .with_children(|children| {
                children.spawn((Transform::default(), Aabb::from_min_max(-half, half)));
            });
    }

    fn rig(&mut self, name: &str, position: Vec3, looking_at: Vec3) {
        self.commands.spawn((
            Name::new(name.to_owned()),
            CameraRig,
            Transform::from_translation(position).looking_at(looking_at, Vec3::Y),
        ));
    }
}

fn setup(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    commands.spawn((
        Name::new("viewer"),
        InteractiveCamera,
        PanOrbitCamera {
            button_orbit: MouseButton::Right,
            ..default()
        },
        Transform::from_xyz(0.0, 3.0, 9.0),
    ));
    commands.spawn((
        DirectionalLight {
            shadows_enabled: true,
            ..default()
        },
        Transform::from_xyz(4.0, 8.0, 4.0).looking_at(Vec3::ZERO, Vec3::Y),
    ));

    let mut room = Showroom {
        commands:  &mut commands,
        meshes:    &mut meshes,
        materials: &mut materials,
    };

    room.rig("main_cam", Vec3::new(0.0, 3.0, 9.0), Vec3::new(0.0, 0.8, 0.0));
    room.rig("cam_engine", Vec3::new(0.0, 2.6, 3.6), Vec3::new(0.0, 1.0, 1.2));
    room.rig("cam_custom", Vec3::new(0.0, 2.2, -4.6), Vec3::new(0.0, 1.0, -1.4));
    room.rig("cam_menu", Vec3::new(-3.0, 1.8, 2.0), Vec3::new(-3.0, 1.6, -1.0));
    room.rig("cam_guide", Vec3::new(3.0, 1.6, 2.5), Vec3::new(3.0, 1.2, 0.0));

    let mut nodes = HashMap::new();
    for prop in &PROPS {
        nodes.insert(prop.name, room.model(prop.name, prop.size, prop.position, prop.color));
        if let Some(hitbox) = prop.hitbox {
            room.proxy(Proxy::new(hitbox, prop.name), prop.size, prop.position);
        }
    }

    for n in 1..=4_u8 {
        let column = f32::from((n - 1) % 2);
        let row = f32::from((n - 1) / 2);
        let position = Vec3::new(-3.5 + column, 0.5f32.mul_add(-row, 1.85), -0.92);
        let size = Vec3::new(0.6, 0.35, 0.02);

        let option = room.model(&format!("menu_option_{n}"), size, position, OPTION_COLOR);
        room.commands.entity(option).insert(Visibility::Hidden);
        room.proxy(
            Proxy::new(format!("hitbox_menu_option_{n}"), "menu").disabled(),
            size,
            position,
        );
    }

    // Clip libraries are inserted last, as a loader would once the glTF animations resolve
    let libraries = [
        ("hood", vec![ClipInfo::new("hoodOpen", 1.0).with_channel(hinge(HOOD, -1.1, 1.0))]),
        ("back", vec![ClipInfo::new("backOpen", 1.0).with_channel(hinge(BACK, 1.0, 1.0))]),
        ("lamp", vec![
            ClipInfo::new("lampSwing", 2.0).with_channel(swing(LAMP, FRAC_PI_4 * 0.5, 2.0)),
        ]),
        ("robot", vec![ClipInfo::new("robotWave", 1.0).with_channel(swing(ROBOT, 0.15, 1.0))]),
        ("generator", vec![ClipInfo::new("generatorPulse", 1.0)]),
        ("menu", vec![
            ClipInfo::new("camMenuApproach", 1.0),
            ClipInfo::new("menuBlink", 1.0),
        ]),
    ];
    for (name, clips) in libraries {
        if let Some(&entity) = nodes.get(name) {
            commands.entity(entity).insert(ClipLibrary::new(clips));
        }
    }

    commands.spawn((
        CaptionText,
        Text::new(""),
        TextFont {
            font_size: CAPTION_FONT_SIZE,
            ..default()
        },
        Node {
            position_type: PositionType::Absolute,
            ..default()
        },
    ));
    commands.spawn((
        StatusText,
        Text::new(""),
        TextFont {
            font_size: STATUS_FONT_SIZE,
            ..default()
        },
        Node {
            position_type: PositionType::Absolute,
            left: Val::Px(12.0),
            bottom: Val::Px(12.0),
            ..default()
        },
    ));
}

fn toggle_hitbox_overlay(
    keyboard: Res<ButtonInput<KeyCode>>,
    mut config_store: ResMut<GizmoConfigStore>,
) {
    if keyboard.just_pressed(KeyCode::KeyD) {
        let (config, _) = config_store.config_mut::<HitboxGizmo>();
        config.enabled = !config.enabled;
    }
}

fn update_caption_text(
    caption: Res<Caption>,
    mut text: Single<(&mut Text, &mut Node, &mut Visibility), With<CaptionText>>,
) {
    if !caption.is_changed() {
        return;
    }
    let (text, node, visibility) = &mut *text;

    match (&caption.text, caption.anchor) {
        (Some(label), Some(anchor)) => {
            text.0.clone_from(label);
            node.left = Val::Px(anchor.x + CAPTION_OFFSET.x);
            node.top = Val::Px(anchor.y + CAPTION_OFFSET.y);
            **visibility = Visibility::Inherited;
        },
        _ => **visibility = Visibility::Hidden,
    }
}

fn update_status_text(
    state: Res<InteractionState>,
    cursor: Res<CursorAffordance>,
    mut text: Single<&mut Text, With<StatusText>>,
) {
    if state.is_changed() || cursor.is_changed() {
        text.0 = format!("{:?}  cursor: {:?}", state.mode(), *cursor);
    }
}

fn log_transition_begin(begin: On<CameraTransitionBegin>) {
    info!("Camera heading to `{}` over {:.0}ms", begin.rig, begin.duration_ms);
}

fn log_focus_reached(focus: On<FocusReached>) { info!("Focused on `{}`", focus.proxy); }

fn log_navigation(nav: On<ExternalNavigation>) {
    info!("`{}` asks to open {}", nav.proxy, nav.url);
}

fn log_reset(_reset: On<SceneReset>) { info!("Scene reset"); }
