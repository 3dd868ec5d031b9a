//! Time-based clip playback on named targets.
//!
//! The sequencer keeps at most one [`Player`] per (target, clip family). Starting a clip
//! replaces whatever player held that slot, so hover and click bindings on the same object
//! can never layer conflicting influences. Finished one-shot players stay in their slot,
//! holding their final frame, until something replaces or rewinds them.

use bevy::mesh::morph::MorphWeights;
use bevy::platform::collections::HashMap;
use bevy::prelude::*;

use crate::components::ClipChannel;
use crate::components::ClipInfo;
use crate::components::ClipLibrary;
use crate::components::InteractiveCamera;
use crate::components::TrackKey;
use crate::support::self_and_descendants;

/// Clip grouping by naming convention.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Reflect)]
pub enum ClipFamily {
    /// Names starting with `cam`: clips that choreograph a camera rig.
    Camera,
    /// Everything else: object-local motion such as a hood opening.
    Object,
}

impl ClipFamily {
    pub fn of(clip_name: &str) -> Self {
        match clip_name.get(..3) {
            Some(prefix) if prefix.eq_ignore_ascii_case("cam") => Self::Camera,
            _ => Self::Object,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Reflect)]
pub enum LoopMode {
    /// Play once and hold the final frame.
    #[default]
    OnceClamp,
    /// Alternate direction forever.
    PingPong,
    /// Seek to the end and play backwards once, undoing a forward one-shot.
    ReverseFromEnd,
    /// Wrap around forever with a step pose: full weight for the first
    /// [`BLINK_DUTY`] of each cycle, zero for the rest.
    Blink,
}

/// Fraction of a [`LoopMode::Blink`] cycle spent lit.
pub const BLINK_DUTY: f32 = 0.2;

#[derive(Clone, Copy, Debug, PartialEq, Reflect)]
pub struct PlayOptions {
    pub mode:  LoopMode,
    /// Playback rate multiplier. The sign is ignored, direction comes from `mode`.
    pub speed: f32,
}

impl Default for PlayOptions {
    fn default() -> Self {
        Self {
            mode:  LoopMode::OnceClamp,
            speed: 1.0,
        }
    }
}

impl PlayOptions {
    pub const fn new(mode: LoopMode, speed: f32) -> Self { Self { mode, speed } }
}

/// Live playback of one clip.
#[derive(Clone, Debug, PartialEq)]
pub struct Player {
    clip:          String,
    family:        ClipFamily,
    duration_secs: f32,
    time_secs:     f32,
    /// Signed seconds of clip time per second of frame time.
    rate:          f32,
    mode:          LoopMode,
    active:        bool,
}

impl Player {
    fn start(clip: &ClipInfo, options: PlayOptions) -> Self {
        let speed = options.speed.abs();
        let duration_secs = clip.duration_secs.max(0.0);
        let (time_secs, rate) = match options.mode {
            LoopMode::ReverseFromEnd => (duration_secs, -speed),
            LoopMode::OnceClamp | LoopMode::PingPong | LoopMode::Blink => (0.0, speed),
        };

        let mut player = Self {
            clip: clip.name.clone(),
            family: clip.family(),
            duration_secs,
            time_secs,
            rate,
            mode: options.mode,
            active: true,
        };
        if duration_secs <= 0.0 {
            player.time_secs = if rate < 0.0 { 0.0 } else { duration_secs };
            player.active = false;
        }
        player
    }

    pub fn clip(&self) -> &str { &self.clip }

    pub const fn family(&self) -> ClipFamily { self.family }

    pub const fn time_secs(&self) -> f32 { self.time_secs }

    pub const fn rate(&self) -> f32 { self.rate }

    /// False once a one-shot has reached its end and is holding its final frame.
    pub const fn is_active(&self) -> bool { self.active }

    pub fn is_forward(&self) -> bool { self.rate > 0.0 }

    /// Playback position in `[0, 1]`.
    pub fn normalized_time(&self) -> f32 {
        if self.duration_secs <= 0.0 {
            return if self.rate < 0.0 { 0.0 } else { 1.0 };
        }
        (self.time_secs / self.duration_secs).clamp(0.0, 1.0)
    }

    /// Pose weight for morph output. Follows playback position except for blinking clips.
    pub fn weight(&self) -> f32 {
        match self.mode {
            LoopMode::Blink if self.normalized_time() < BLINK_DUTY => 1.0,
            LoopMode::Blink => 0.0,
            _ => self.normalized_time(),
        }
    }

    /// Turns the player around so it plays back to the start and stops there.
    pub fn rewind(&mut self) {
        self.rate = -self.rate.abs();
        self.mode = LoopMode::ReverseFromEnd;
        self.active = self.time_secs > 0.0;
    }

    /// Jumps back to the start and holds there.
    fn settle_at_start(&mut self) {
        self.time_secs = 0.0;
        self.rate = -self.rate.abs();
        self.mode = LoopMode::ReverseFromEnd;
        self.active = false;
    }

    pub fn advance(&mut self, delta_secs: f32) {
        if !self.active || self.duration_secs <= 0.0 {
            return;
        }

        self.time_secs += self.rate * delta_secs;

        match self.mode {
            LoopMode::PingPong => {
                // reflect off either end, possibly several times on a long frame
                while self.time_secs > self.duration_secs || self.time_secs < 0.0 {
                    if self.time_secs > self.duration_secs {
                        self.time_secs = 2.0f32.mul_add(self.duration_secs, -self.time_secs);
                    } else {
                        self.time_secs = -self.time_secs;
                    }
                    self.rate = -self.rate;
                }
            },
            LoopMode::Blink => {
                self.time_secs = self.time_secs.rem_euclid(self.duration_secs);
            },
            LoopMode::OnceClamp | LoopMode::ReverseFromEnd => {
                if self.time_secs >= self.duration_secs {
                    self.time_secs = self.duration_secs;
                    self.active = false;
                } else if self.time_secs <= 0.0 {
                    self.time_secs = 0.0;
                    self.active = false;
                }
            },
        }
    }
}

/// Owner of every player, keyed by (target, family).
#[derive(Resource, Debug, Default)]
pub struct AnimationSequencer {
    players: HashMap<(Entity, ClipFamily), Player>,
}

impl AnimationSequencer {
    /// Starts `clip` on `target`, replacing the player of the same family.
    /// Returns `None` without touching anything when the library has no such clip.
    ///
    /// Replaying the clip that already occupies the slot keeps its playback position and only
    /// changes direction and loop mode, so a half-played hover clip continues instead of
    /// jumping back to its start.
    pub fn play(
        &mut self,
        target: Entity,
        library: &ClipLibrary,
        clip: &str,
        options: PlayOptions,
    ) -> Option<&Player> {
        let info = library.clip(clip)?;
        let mut player = Player::start(info, options);
        let slot = (target, player.family);

        if let Some(previous) = self.players.get(&slot)
            && previous.clip == player.clip
            && player.duration_secs > 0.0
        {
            player.time_secs = previous.time_secs;
            player.active = match player.mode {
                LoopMode::PingPong | LoopMode::Blink => true,
                LoopMode::OnceClamp => player.time_secs < player.duration_secs,
                LoopMode::ReverseFromEnd => player.time_secs > 0.0,
            };
        }

        self.players.insert(slot, player);
        self.players.get(&slot)
    }

    /// Plays the running player of `clip` back to its start. Returns false if `clip` is not
    /// what currently occupies its family slot on `target`.
    pub fn rewind(&mut self, target: Entity, clip: &str) -> bool {
        match self.players.get_mut(&(target, ClipFamily::of(clip))) {
            Some(player) if player.clip == clip => {
                player.rewind();
                true
            },
            _ => false,
        }
    }

    /// Rewinds every player of `family`, running or finished. Returns how many were touched.
    pub fn rewind_family(&mut self, family: ClipFamily) -> usize {
        let mut count = 0;
        for ((_, player_family), player) in &mut self.players {
            if *player_family == family && (player.is_forward() || player.time_secs > 0.0) {
                player.rewind();
                count += 1;
            }
        }
        count
    }

    /// Snaps the player of `clip` on `target` back to its rest pose at time zero. The
    /// player keeps its slot so the rest pose is written on the next frame. Returns false if
    /// `clip` is not what currently occupies its family slot.
    pub fn stop_clip(&mut self, target: Entity, clip: &str) -> bool {
        match self.players.get_mut(&(target, ClipFamily::of(clip))) {
            Some(player) if player.clip == clip => {
                player.settle_at_start();
                true
            },
            _ => false,
        }
    }

    pub fn player(&self, target: Entity, family: ClipFamily) -> Option<&Player> {
        self.players.get(&(target, family))
    }

    pub fn player_for_clip(&self, target: Entity, clip: &str) -> Option<&Player> {
        self.player(target, ClipFamily::of(clip))
            .filter(|player| player.clip == clip)
    }

    /// Number of players on `target` that are still moving.
    pub fn active_count(&self, target: Entity) -> usize {
        self.players
            .iter()
            .filter(|((entity, _), player)| *entity == target && player.active)
            .count()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Entity, &Player)> {
        self.players.iter().map(|((entity, _), player)| (*entity, player))
    }

    pub fn tick(&mut self, delta_secs: f32) {
        for player in self.players.values_mut() {
            player.advance(delta_secs);
        }
    }

    /// Drops players whose target no longer exists.
    pub fn retain_targets(&mut self, mut alive: impl FnMut(Entity) -> bool) {
        self.players.retain(|(entity, _), _| alive(*entity));
    }
}

/// Samples a keyframed track at `time_secs`, holding the first and last keys outside it.
pub fn sample_track(keys: &[TrackKey], time_secs: f32) -> Option<(Vec3, Quat)> {
    let first = keys.first()?;
    if time_secs <= first.time_secs {
        return Some((first.translation, first.rotation));
    }

    for pair in keys.windows(2) {
        let (a, b) = (&pair[0], &pair[1]);
        if time_secs <= b.time_secs {
            let span = b.time_secs - a.time_secs;
            let t = if span > 0.0 {
                (time_secs - a.time_secs) / span
            } else {
                1.0
            };
            return Some((
                a.translation.lerp(b.translation, t),
                a.rotation.slerp(b.rotation, t),
            ));
        }
    }

    keys.last().map(|last| (last.translation, last.rotation))
}

/// System that advances every player by the frame time.
pub fn advance_players(
    time: Res<Time>,
    mut sequencer: ResMut<AnimationSequencer>,
    libraries: Query<(), With<ClipLibrary>>,
) {
    sequencer.retain_targets(|entity| libraries.contains(entity));
    sequencer.tick(time.delta_secs());
}

/// System that writes each player's pose onto its target.
pub fn apply_clip_poses(
    sequencer: Res<AnimationSequencer>,
    libraries: Query<&ClipLibrary>,
    children_query: Query<&Children>,
    mut transforms: Query<&mut Transform, Without<InteractiveCamera>>,
    mut morphs: Query<&mut MorphWeights>,
) {
    for (target, player) in sequencer.iter() {
        let Some(info) = libraries
            .get(target)
            .ok()
            .and_then(|library| library.clip(player.clip()))
        else {
            continue;
        };

        match &info.channel {
            ClipChannel::Time => {},
            ClipChannel::Morph { index } => {
                let weight = player.weight();
                for entity in self_and_descendants(target, &children_query) {
                    let Ok(mut weights) = morphs.get_mut(entity) else {
                        continue;
                    };
                    if let Some(slot) = weights.weights_mut().get_mut(*index) {
                        *slot = weight;
                    }
                }
            },
            ClipChannel::Track { keys } => {
                let Some((translation, rotation)) = sample_track(keys, player.time_secs()) else {
                    continue;
                };
                if let Ok(mut transform) = transforms.get_mut(target) {
                    transform.translation = translation;
                    transform.rotation = rotation;
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn library() -> ClipLibrary {
        ClipLibrary::new(vec![
            ClipInfo::new("hoodOpen", 1.0),
            ClipInfo::new("hoodPeek", 0.5),
            ClipInfo::new("camSweep", 2.0),
        ])
    }

    #[test]
    fn families_follow_naming_convention() {
        assert_eq!(ClipFamily::of("camSweep"), ClipFamily::Camera);
        assert_eq!(ClipFamily::of("CamEngine"), ClipFamily::Camera);
        assert_eq!(ClipFamily::of("hoodOpen"), ClipFamily::Object);
        assert_eq!(ClipFamily::of("ca"), ClipFamily::Object);
    }

    #[test]
    fn once_clamp_holds_final_frame() {
        let mut sequencer = AnimationSequencer::default();
        let target = Entity::from_raw_u32(1).unwrap();
        sequencer.play(target, &library(), "hoodOpen", PlayOptions::default());

        sequencer.tick(0.4);
        let player = sequencer.player(target, ClipFamily::Object).unwrap();
        assert!(player.is_active());
        assert!((player.normalized_time() - 0.4).abs() < 1e-6);

        sequencer.tick(5.0);
        let player = sequencer.player(target, ClipFamily::Object).unwrap();
        assert!(!player.is_active());
        assert_eq!(player.normalized_time(), 1.0);
    }

    #[test]
    fn ping_pong_reflects_at_both_ends() {
        let mut sequencer = AnimationSequencer::default();
        let target = Entity::from_raw_u32(1).unwrap();
        sequencer.play(
            target,
            &library(),
            "hoodOpen",
            PlayOptions::new(LoopMode::PingPong, 1.0),
        );

        sequencer.tick(1.25);
        let player = sequencer.player(target, ClipFamily::Object).unwrap();
        assert!((player.time_secs() - 0.75).abs() < 1e-6);
        assert!(!player.is_forward());

        sequencer.tick(1.0);
        let player = sequencer.player(target, ClipFamily::Object).unwrap();
        assert!((player.time_secs() - 0.25).abs() < 1e-6);
        assert!(player.is_forward());
        assert!(player.is_active());
    }

    #[test]
    fn reverse_from_end_starts_at_the_end_and_runs_back() {
        let mut sequencer = AnimationSequencer::default();
        let target = Entity::from_raw_u32(1).unwrap();
        let player = sequencer
            .play(
                target,
                &library(),
                "camSweep",
                PlayOptions::new(LoopMode::ReverseFromEnd, 2.0),
            )
            .unwrap();
        assert_eq!(player.normalized_time(), 1.0);
        assert_eq!(player.rate(), -2.0);

        sequencer.tick(2.0);
        let player = sequencer.player(target, ClipFamily::Camera).unwrap();
        assert_eq!(player.normalized_time(), 0.0);
        assert!(!player.is_active());
    }

    #[test]
    fn one_player_per_family_and_missing_clips_change_nothing() {
        let mut sequencer = AnimationSequencer::default();
        let target = Entity::from_raw_u32(1).unwrap();

        sequencer.play(target, &library(), "hoodPeek", PlayOptions::default());
        sequencer.play(target, &library(), "hoodOpen", PlayOptions::default());
        sequencer.play(target, &library(), "camSweep", PlayOptions::default());
        assert_eq!(sequencer.active_count(target), 2);
        assert_eq!(
            sequencer.player(target, ClipFamily::Object).map(Player::clip),
            Some("hoodOpen")
        );

        assert!(
            sequencer
                .play(target, &library(), "doesNotExist", PlayOptions::default())
                .is_none()
        );
        assert_eq!(sequencer.active_count(target), 2);
    }

    #[test]
    fn replaying_the_same_clip_keeps_its_position() {
        let mut sequencer = AnimationSequencer::default();
        let target = Entity::from_raw_u32(1).unwrap();
        sequencer.play(target, &library(), "hoodOpen", PlayOptions::default());
        sequencer.tick(0.3);

        let player = sequencer
            .play(target, &library(), "hoodOpen", PlayOptions::default())
            .unwrap();
        assert!((player.time_secs() - 0.3).abs() < 1e-6);
        assert!(player.is_active());

        let player = sequencer
            .play(target, &library(), "hoodPeek", PlayOptions::default())
            .unwrap();
        assert_eq!(player.time_secs(), 0.0);
    }

    #[test]
    fn rewind_only_touches_the_named_clip() {
        let mut sequencer = AnimationSequencer::default();
        let target = Entity::from_raw_u32(1).unwrap();
        sequencer.play(target, &library(), "hoodOpen", PlayOptions::default());
        sequencer.tick(0.5);

        assert!(!sequencer.rewind(target, "hoodPeek"));
        assert!(sequencer.rewind(target, "hoodOpen"));

        sequencer.tick(0.2);
        let player = sequencer.player_for_clip(target, "hoodOpen").unwrap();
        assert!((player.time_secs() - 0.3).abs() < 1e-6);
        assert!(!player.is_forward());
    }

    #[test]
    fn rewind_family_reverses_finished_and_running_camera_clips() {
        let mut sequencer = AnimationSequencer::default();
        let finished = Entity::from_raw_u32(1).unwrap();
        let running = Entity::from_raw_u32(2).unwrap();
        sequencer.play(finished, &library(), "camSweep", PlayOptions::default());
        sequencer.tick(3.0);
        sequencer.play(running, &library(), "camSweep", PlayOptions::default());
        sequencer.play(running, &library(), "hoodOpen", PlayOptions::default());
        sequencer.tick(1.0);

        assert_eq!(sequencer.rewind_family(ClipFamily::Camera), 2);
        for target in [finished, running] {
            let player = sequencer.player(target, ClipFamily::Camera).unwrap();
            assert!(!player.is_forward());
            assert!(player.is_active());
        }
        assert!(sequencer.player(running, ClipFamily::Object).unwrap().is_forward());
    }

    #[test]
    fn track_sampling_interpolates_between_keys() {
        let keys = [
            TrackKey {
                time_secs:   0.0,
                translation: Vec3::ZERO,
                rotation:    Quat::IDENTITY,
            },
            TrackKey {
                time_secs:   2.0,
                translation: Vec3::new(0.0, 2.0, 0.0),
                rotation:    Quat::from_rotation_x(-1.0),
            },
        ];

        let (translation, _) = sample_track(&keys, 1.0).unwrap();
        assert!(translation.distance(Vec3::new(0.0, 1.0, 0.0)) < 1e-6);
        assert_eq!(sample_track(&keys, 9.0).unwrap().0, Vec3::new(0.0, 2.0, 0.0));
        assert_eq!(sample_track(&[], 1.0), None);
    }

    #[test]
    fn blink_wraps_with_a_step_weight() {
        let mut sequencer = AnimationSequencer::default();
        let target = Entity::from_raw_u32(1).unwrap();
        let library = ClipLibrary::new(vec![ClipInfo::new("menuBlink", 1.0)]);
        sequencer.play(target, &library, "menuBlink", PlayOptions::new(LoopMode::Blink, 1.0));

        let weight = |sequencer: &AnimationSequencer| {
            sequencer.player_for_clip(target, "menuBlink").unwrap().weight()
        };
        sequencer.tick(0.1);
        assert_eq!(weight(&sequencer), 1.0);
        sequencer.tick(0.4);
        assert_eq!(weight(&sequencer), 0.0);
        sequencer.tick(0.6);
        assert_eq!(weight(&sequencer), 1.0);
        assert!(sequencer.player_for_clip(target, "menuBlink").unwrap().is_active());
    }

    #[test]
    fn stop_clip_settles_at_rest_and_stays_out_of_rewinds() {
        let mut sequencer = AnimationSequencer::default();
        let target = Entity::from_raw_u32(1).unwrap();
        sequencer.play(target, &library(), "hoodOpen", PlayOptions::default());
        sequencer.tick(0.6);

        assert!(!sequencer.stop_clip(target, "hoodPeek"));
        assert!(sequencer.stop_clip(target, "hoodOpen"));
        let player = sequencer.player_for_clip(target, "hoodOpen").unwrap();
        assert_eq!(player.time_secs(), 0.0);
        assert!(!player.is_active());
        assert_eq!(sequencer.rewind_family(ClipFamily::Object), 0);
    }

    fn pose_app() -> App {
        let mut app = App::new();
        app.init_resource::<AnimationSequencer>()
            .add_systems(Update, apply_clip_poses);
        app
    }

    fn weights(count: usize) -> MorphWeights { MorphWeights::new(vec![0.0; count], None).unwrap() }

    fn play(app: &mut App, target: Entity, clip: &str, options: PlayOptions) {
        let library = app.world().get::<ClipLibrary>(target).unwrap().clone();
        app.world_mut()
            .resource_mut::<AnimationSequencer>()
            .play(target, &library, clip, options);
    }

    fn tick(app: &mut App, delta_secs: f32) {
        app.world_mut().resource_mut::<AnimationSequencer>().tick(delta_secs);
        app.update();
    }

    fn weight_at(app: &App, entity: Entity, index: usize) -> f32 {
        app.world().get::<MorphWeights>(entity).unwrap().weights()[index]
    }

    #[test]
    fn morph_clip_writes_its_weight_on_every_descendant() {
        let mut app = pose_app();
        let hood = app
            .world_mut()
            .spawn(ClipLibrary::new(vec![
                ClipInfo::new("hoodOpen", 1.0).with_channel(ClipChannel::Morph { index: 1 }),
            ]))
            .id();
        let mesh = app.world_mut().spawn((weights(2), ChildOf(hood))).id();
        let nested = app.world_mut().spawn((weights(2), ChildOf(mesh))).id();
        let short = app.world_mut().spawn((weights(1), ChildOf(hood))).id();

        play(&mut app, hood, "hoodOpen", PlayOptions::default());
        tick(&mut app, 0.25);

        for entity in [mesh, nested] {
            assert!((weight_at(&app, entity, 1) - 0.25).abs() < 1e-6);
            assert_eq!(weight_at(&app, entity, 0), 0.0);
        }
        assert_eq!(weight_at(&app, short, 0), 0.0);
    }

    #[test]
    fn rewinding_and_reversed_clips_drive_the_weight_back_to_zero() {
        let mut app = pose_app();
        let hood = app
            .world_mut()
            .spawn((
                ClipLibrary::new(vec![
                    ClipInfo::new("hoodOpen", 1.0).with_channel(ClipChannel::Morph { index: 0 }),
                ]),
                weights(1),
            ))
            .id();

        play(&mut app, hood, "hoodOpen", PlayOptions::default());
        tick(&mut app, 2.0);
        assert_eq!(weight_at(&app, hood, 0), 1.0);

        app.world_mut()
            .resource_mut::<AnimationSequencer>()
            .rewind(hood, "hoodOpen");
        tick(&mut app, 0.5);
        assert!((weight_at(&app, hood, 0) - 0.5).abs() < 1e-6);
        tick(&mut app, 1.0);
        assert_eq!(weight_at(&app, hood, 0), 0.0);

        let trunk = app
            .world_mut()
            .spawn((
                ClipLibrary::new(vec![
                    ClipInfo::new("trunkOpen", 1.0).with_channel(ClipChannel::Morph { index: 0 }),
                ]),
                weights(1),
            ))
            .id();
        play(&mut app, trunk, "trunkOpen", PlayOptions::new(LoopMode::ReverseFromEnd, 1.0));
        tick(&mut app, 0.0);
        assert_eq!(weight_at(&app, trunk, 0), 1.0);
        tick(&mut app, 1.5);
        assert_eq!(weight_at(&app, trunk, 0), 0.0);
    }

    #[test]
    fn track_clip_writes_the_target_transform() {
        let mut app = pose_app();
        let keys = vec![
            TrackKey {
                time_secs:   0.0,
                translation: Vec3::ZERO,
                rotation:    Quat::IDENTITY,
            },
            TrackKey {
                time_secs:   2.0,
                translation: Vec3::new(0.0, 2.0, 0.0),
                rotation:    Quat::from_rotation_x(-1.0),
            },
        ];
        let back = app
            .world_mut()
            .spawn((
                Transform::from_xyz(5.0, 5.0, 5.0),
                ClipLibrary::new(vec![
                    ClipInfo::new("backOpen", 2.0).with_channel(ClipChannel::Track { keys }),
                ]),
            ))
            .id();

        play(&mut app, back, "backOpen", PlayOptions::default());
        tick(&mut app, 1.0);
        let transform = app.world().get::<Transform>(back).unwrap();
        assert!(transform.translation.distance(Vec3::new(0.0, 1.0, 0.0)) < 1e-6);
        assert!(transform.rotation.angle_between(Quat::from_rotation_x(-0.5)) < 1e-4);

        tick(&mut app, 5.0);
        let transform = app.world().get::<Transform>(back).unwrap();
        assert_eq!(transform.translation, Vec3::new(0.0, 2.0, 0.0));
    }
}
