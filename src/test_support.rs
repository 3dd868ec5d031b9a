//! Headless showroom fixture shared by the state machine and reset tests.

use std::time::Duration;

use bevy::camera::primitives::Aabb;
use bevy::mesh::morph::MorphWeights;
use bevy::prelude::*;
use bevy::time::TimeUpdateStrategy;
use bevy_panorbit_camera::PanOrbitCamera;

use crate::HitboxOrbitPlugin;
use crate::components::CameraRig;
use crate::components::ClipChannel;
use crate::components::ClipInfo;
use crate::components::ClipLibrary;
use crate::components::InteractiveCamera;
use crate::components::Proxy;
use crate::events::CameraTransitionBegin;
use crate::events::CameraTransitionEnd;
use crate::events::ExternalNavigation;
use crate::events::FocusReached;
use crate::events::PointerClicked;
use crate::events::PointerMoved;
use crate::events::ResetRequested;
use crate::events::SceneReset;
use crate::hit_test::project_to_viewport;
use crate::registry::AssetRegistry;
use crate::state::InteractionState;
use crate::table::InteractionTable;

pub const VIEWPORT: Vec2 = Vec2::new(800.0, 600.0);
const FRAME: Duration = Duration::from_millis(100);

/// Events observed during a test, in firing order.
#[derive(Resource, Default, Debug)]
pub struct Recorded(pub Vec<String>);

impl Recorded {
    pub fn count(&self, entry: &str) -> usize {
        self.0.iter().filter(|seen| *seen == entry).count()
    }
}

/// Showroom table with the overview orbit centred on the proxies.
pub fn test_table() -> InteractionTable {
    InteractionTable {
        overview_focus: Vec3::new(0.0, 0.0, -10.0),
        ..InteractionTable::showroom()
    }
}

pub fn interaction_app() -> App {
    let mut app = plugin_app();
    spawn_showroom(app.world_mut());
    advance(&mut app, 200);
    app
}

/// The plugin with recording observers and an empty world.
pub fn plugin_app() -> App {
    let mut app = App::new();
    app.add_plugins((MinimalPlugins, TransformPlugin, HitboxOrbitPlugin))
        .insert_resource(TimeUpdateStrategy::ManualDuration(FRAME))
        .insert_resource(test_table())
        .init_resource::<Recorded>()
        .add_observer(|begin: On<CameraTransitionBegin>, mut seen: ResMut<Recorded>| {
            seen.0.push(format!("begin:{}", begin.rig));
        })
        .add_observer(|end: On<CameraTransitionEnd>, mut seen: ResMut<Recorded>| {
            seen.0.push(format!("end:{}", end.rig));
        })
        .add_observer(|focus: On<FocusReached>, mut seen: ResMut<Recorded>| {
            seen.0.push(format!("focus:{}", focus.proxy));
        })
        .add_observer(|nav: On<ExternalNavigation>, mut seen: ResMut<Recorded>| {
            seen.0.push(format!("navigate:{}", nav.url));
        })
        .add_observer(|_: On<SceneReset>, mut seen: ResMut<Recorded>| {
            seen.0.push("reset".to_owned());
        });
    app
}

fn spawn_proxy(world: &mut World, proxy: Proxy, position: Vec3) {
    world
        .spawn((
            Name::new(proxy.id.clone()),
            proxy,
            Transform::from_translation(position),
        ))
        .with_children(|children| {
            children.spawn((
                Transform::default(),
                Aabb::from_min_max(Vec3::splat(-0.5), Vec3::splat(0.5)),
            ));
        });
}

fn spawn_rig(world: &mut World, name: &str, position: Vec3, target: Vec3) {
    let transform = if position == target {
        Transform::from_translation(position)
    } else {
        Transform::from_translation(position).looking_at(target, Vec3::Y)
    };
    world.spawn((Name::new(name.to_owned()), CameraRig, transform));
}

fn spawn_model(world: &mut World, name: &str, position: Vec3, clips: Vec<ClipInfo>) {
    world.spawn((
        Name::new(name.to_owned()),
        Transform::from_translation(position),
        Visibility::default(),
        ClipLibrary::new(clips),
    ));
}

/// Interactive camera at the origin looking down -Z.
pub fn spawn_viewer(world: &mut World) -> Entity {
    world
        .spawn((
            Name::new("viewer"),
            InteractiveCamera,
            Camera3d::default(),
            Projection::Perspective(PerspectiveProjection {
                aspect_ratio: VIEWPORT.x / VIEWPORT.y,
                ..default()
            }),
            PanOrbitCamera::default(),
            Transform::default(),
        ))
        .id()
}

/// Proxies on a plane 10 units in front of a camera at the origin looking down -Z.
pub fn spawn_showroom(world: &mut World) {
    spawn_viewer(world);

    spawn_rig(world, "main_cam", Vec3::ZERO, Vec3::ZERO);
    spawn_rig(world, "cam_engine", Vec3::new(-3.0, 1.0, -5.0), Vec3::new(-3.0, 0.0, -10.0));
    spawn_rig(world, "cam_custom", Vec3::new(3.0, 1.0, -5.0), Vec3::new(3.0, 0.0, -10.0));
    spawn_rig(world, "cam_menu", Vec3::new(0.0, 2.0, -5.0), Vec3::new(0.0, 2.0, -10.0));
    spawn_rig(world, "cam_guide", Vec3::new(0.0, -2.0, -5.0), Vec3::new(0.0, -2.0, -10.0));

    spawn_model(world, "hood", Vec3::new(-3.0, 0.0, -11.0), vec![ClipInfo::new("hoodOpen", 1.0)]);
    spawn_model(world, "back", Vec3::new(3.0, 0.0, -11.0), vec![ClipInfo::new("backOpen", 1.0)]);
    spawn_model(world, "menu", Vec3::new(0.0, 2.0, -11.0), vec![
        ClipInfo::new("camMenuApproach", 1.0),
        ClipInfo::new("menuBlink", 1.0),
    ]);
    spawn_model(world, "guide", Vec3::new(0.0, -2.0, -11.0), Vec::new());
    world.spawn((Name::new("menu_facade"), Transform::default(), Visibility::Inherited));

    spawn_proxy(world, Proxy::new("hitbox_hood", "hood"), Vec3::new(-3.0, 0.0, -10.0));
    spawn_proxy(world, Proxy::new("hitbox_back", "back"), Vec3::new(3.0, 0.0, -10.0));
    spawn_proxy(world, Proxy::new("hitbox_menu", "menu"), Vec3::new(0.0, 2.0, -10.0));
    spawn_proxy(world, Proxy::new("hitbox_guide", "guide"), Vec3::new(0.0, -2.0, -10.0));
    spawn_proxy(world, Proxy::new("hitbox_sign", "sign"), Vec3::new(3.0, 2.5, -10.0));

    // brochure table whose flip is a shape key on its mesh child
    world
        .spawn((
            Name::new("table"),
            Transform::from_xyz(-3.0, 2.5, -11.0),
            Visibility::default(),
            ClipLibrary::new(vec![
                ClipInfo::new("tableFlip", 1.0).with_channel(ClipChannel::Morph { index: 0 }),
            ]),
        ))
        .with_children(|children| {
            children.spawn((Transform::default(), morph_weights(1)));
        });
    spawn_proxy(world, Proxy::new("hitbox_table", "table"), Vec3::new(-3.0, 2.5, -10.0));

    for n in 1..=4 {
        let x = (n as f32).mul_add(2.0, -5.0);
        world.spawn((
            Name::new(format!("menu_option_{n}")),
            Transform::default(),
            Visibility::Hidden,
        ));
        spawn_proxy(
            world,
            Proxy::new(format!("hitbox_menu_option_{n}"), "menu").disabled(),
            Vec3::new(x, 3.5, -10.0),
        );
    }
}

pub fn morph_weights(count: usize) -> MorphWeights {
    MorphWeights::new(vec![0.0; count], None).unwrap()
}

/// First morph weight found under the named node.
pub fn morph_weight(app: &App, name: &str) -> Option<f32> {
    let root = entity(app, name)?;
    let children = app.world().get::<Children>(root)?.to_vec();
    children
        .into_iter()
        .chain([root])
        .find_map(|entity| app.world().get::<MorphWeights>(entity))
        .map(|weights| weights.weights()[0])
}

/// Runs frames until at least `ms` of game time has passed.
pub fn advance(app: &mut App, ms: u64) {
    let target = app.world().resource::<Time>().elapsed() + Duration::from_millis(ms);
    for _ in 0..1000 {
        if app.world().resource::<Time>().elapsed() >= target {
            return;
        }
        app.update();
    }
    panic!("time did not advance");
}

pub fn entity(app: &App, name: &str) -> Option<Entity> {
    app.world().resource::<AssetRegistry>().get(name)
}

pub fn proxy(app: &App, id: &str) -> Option<Proxy> {
    entity(app, id).and_then(|entity| app.world().get::<Proxy>(entity).cloned())
}

pub fn visibility(app: &App, name: &str) -> Option<Visibility> {
    entity(app, name).and_then(|entity| app.world().get::<Visibility>(entity).copied())
}

pub fn state(app: &App) -> InteractionState { app.world().resource::<InteractionState>().clone() }

pub fn camera(app: &mut App) -> Entity {
    app.world_mut()
        .query_filtered::<Entity, With<InteractiveCamera>>()
        .single(app.world())
        .unwrap()
}

/// Window pixel under which the named node's origin appears.
pub fn pixel_of(app: &mut App, name: &str) -> Vec2 {
    let target = entity(app, name).unwrap();
    let point = app.world().get::<GlobalTransform>(target).unwrap().translation();
    let camera = camera(app);
    let cam_global = *app.world().get::<GlobalTransform>(camera).unwrap();
    let projection = app.world().get::<Projection>(camera).unwrap();
    project_to_viewport(point, &cam_global, projection, VIEWPORT).unwrap()
}

/// Triggers `event` and applies whatever the observers queued, as a frame boundary would.
pub fn trigger<'a, E: Event<Trigger<'a>: Default>>(app: &mut App, event: E) {
    let world = app.world_mut();
    world.trigger(event);
    world.flush();
}

pub fn move_pointer(app: &mut App, position: Vec2) {
    trigger(app, PointerMoved::new(position, VIEWPORT));
}

pub fn hover(app: &mut App, proxy: &str) {
    let position = pixel_of(app, proxy);
    move_pointer(app, position);
}

/// Moves the pointer to a corner where nothing is hit.
pub fn hover_nothing(app: &mut App) { move_pointer(app, Vec2::ONE); }

pub fn click(app: &mut App) { trigger(app, PointerClicked); }

pub fn reset(app: &mut App) { trigger(app, ResetRequested); }
