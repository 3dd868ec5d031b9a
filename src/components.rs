//! Components the asset loader attaches to scene nodes so the interaction core can find them.

use bevy::prelude::*;

use crate::sequencer::ClipFamily;

/// Invisible interactive volume standing in for a visible object.
///
/// The entity's `Name` must equal `id`. The hit volume is the `Aabb` on this entity or on
/// any of its descendants.
#[derive(Component, Reflect, Debug, Clone, PartialEq, Eq)]
#[reflect(Component)]
#[require(Transform, Visibility)]
pub struct Proxy {
    pub id:      String,
    /// Name of the model this proxy belongs to.
    pub owner:   String,
    pub enabled: bool,
    pub visible: bool,
}

impl Proxy {
    /// An enabled, invisible proxy.
    pub fn new(id: impl Into<String>, owner: impl Into<String>) -> Self {
        Self {
            id:      id.into(),
            owner:   owner.into(),
            enabled: true,
            visible: false,
        }
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    pub fn shown(mut self) -> Self {
        self.visible = true;
        self
    }

    pub const fn visibility(&self) -> Visibility {
        if self.visible {
            Visibility::Inherited
        } else {
            Visibility::Hidden
        }
    }
}

/// Authored camera viewpoint. Its world transform is the transition target.
#[derive(Component, Reflect, Debug, Default, Clone, Copy)]
#[reflect(Component)]
pub struct CameraRig;

/// Marks the live camera driven by the interaction core.
#[derive(Component, Reflect, Debug, Default, Clone, Copy)]
#[reflect(Component)]
pub struct InteractiveCamera;

/// Visual emphasis toggled alongside a hover player. Renderers decide what it looks like.
#[derive(Component, Reflect, Debug, Default, Clone, Copy)]
#[reflect(Component)]
pub struct Emphasized;

/// One keyframe of a transform track.
#[derive(Reflect, Debug, Clone, Copy, PartialEq)]
pub struct TrackKey {
    pub time_secs:   f32,
    pub translation: Vec3,
    pub rotation:    Quat,
}

/// What a clip drives on its target while it plays.
#[derive(Reflect, Debug, Clone, PartialEq, Default)]
pub enum ClipChannel {
    /// Playback time only, read back through `AnimationSequencer`.
    #[default]
    Time,
    /// A morph target weight on the target and its descendants, 0 at the start of the clip
    /// and 1 at its end.
    Morph { index: usize },
    /// Keyframed local transform of the target.
    Track { keys: Vec<TrackKey> },
}

/// Named, time-bounded animation bound to its owning node.
#[derive(Reflect, Debug, Clone, PartialEq)]
pub struct ClipInfo {
    pub name:          String,
    pub duration_secs: f32,
    pub channel:       ClipChannel,
}

impl ClipInfo {
    pub fn new(name: impl Into<String>, duration_secs: f32) -> Self {
        Self {
            name: name.into(),
            duration_secs,
            channel: ClipChannel::Time,
        }
    }

    pub fn with_channel(mut self, channel: ClipChannel) -> Self {
        self.channel = channel;
        self
    }

    pub fn family(&self) -> ClipFamily { ClipFamily::of(&self.name) }
}

/// Clips available on a loaded node.
#[derive(Component, Reflect, Debug, Clone, Default, PartialEq)]
#[reflect(Component)]
pub struct ClipLibrary {
    pub clips: Vec<ClipInfo>,
}

impl ClipLibrary {
    pub const fn new(clips: Vec<ClipInfo>) -> Self { Self { clips } }

    pub fn clip(&self, name: &str) -> Option<&ClipInfo> {
        self.clips.iter().find(|clip| clip.name == name)
    }
}
