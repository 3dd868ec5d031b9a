//! Declarative configuration: what each proxy does when hovered or clicked.
//!
//! The state machine has no per-proxy branches. Everything a proxy triggers is looked up
//! here by proxy id, so a new scene only needs a new table.

use std::f32::consts::FRAC_PI_6;

use bevy::math::curve::easing::EaseFunction;
use bevy::platform::collections::HashMap;
use bevy::prelude::*;

use crate::sequencer::LoopMode;
use crate::sequencer::PlayOptions;

/// Default camera transition duration in milliseconds
pub const DEFAULT_TRANSITION_MS: f32 = 1000.0;

/// A clip to start on a named node.
#[derive(Clone, Debug, PartialEq, Reflect)]
pub struct ClipBinding {
    pub target: String,
    pub clip:   String,
    pub mode:   LoopMode,
    pub speed:  f32,
}

impl ClipBinding {
    pub fn new(target: impl Into<String>, clip: impl Into<String>, mode: LoopMode) -> Self {
        Self {
            target: target.into(),
            clip: clip.into(),
            mode,
            speed: 1.0,
        }
    }

    pub fn once(target: impl Into<String>, clip: impl Into<String>) -> Self {
        Self::new(target, clip, LoopMode::OnceClamp)
    }

    pub fn ping_pong(target: impl Into<String>, clip: impl Into<String>) -> Self {
        Self::new(target, clip, LoopMode::PingPong)
    }

    pub fn blink(target: impl Into<String>, clip: impl Into<String>) -> Self {
        Self::new(target, clip, LoopMode::Blink)
    }

    pub const fn with_speed(mut self, speed: f32) -> Self {
        self.speed = speed;
        self
    }

    pub const fn options(&self) -> PlayOptions { PlayOptions::new(self.mode, self.speed) }
}

/// What happens to a hover clip when the pointer leaves.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Reflect)]
pub enum HoverExit {
    /// Play back to the start from wherever it is.
    #[default]
    Reverse,
    /// Snap straight back to the rest pose.
    Stop,
}

#[derive(Clone, Debug, PartialEq, Default, Reflect)]
pub struct HoverBinding {
    pub clip:         Option<ClipBinding>,
    pub on_exit:      HoverExit,
    /// Node that gets `Emphasized` while the hover effect is on.
    pub emphasis:     Option<String>,
    /// Hover effects start only after the pointer has rested this long.
    pub delay_ms:     f32,
    /// Whether hover effects still play while a click lock is active.
    pub while_locked: bool,
}

impl HoverBinding {
    pub const fn clip(clip: ClipBinding) -> Self {
        Self {
            clip:         Some(clip),
            on_exit:      HoverExit::Reverse,
            emphasis:     None,
            delay_ms:     0.0,
            while_locked: false,
        }
    }

    pub fn emphasis(node: impl Into<String>) -> Self {
        Self {
            emphasis: Some(node.into()),
            ..default()
        }
    }

    pub fn with_emphasis(mut self, node: impl Into<String>) -> Self {
        self.emphasis = Some(node.into());
        self
    }

    pub const fn with_delay(mut self, delay_ms: f32) -> Self {
        self.delay_ms = delay_ms;
        self
    }

    pub const fn stop_on_exit(mut self) -> Self {
        self.on_exit = HoverExit::Stop;
        self
    }

    pub const fn while_locked(mut self) -> Self {
        self.while_locked = true;
        self
    }
}

/// Named lock set on click, released after `duration_ms`.
#[derive(Clone, Debug, PartialEq, Reflect)]
pub struct LockBinding {
    pub kind:        String,
    pub duration_ms: f32,
}

/// Visibility and enablement changes applied together.
#[derive(Clone, Debug, PartialEq, Eq, Default, Reflect)]
pub struct RevealSpec {
    pub hide:    Vec<String>,
    pub show:    Vec<String>,
    pub enable:  Vec<String>,
    pub disable: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Reflect)]
pub struct RevealBinding {
    pub after_ms: f32,
    pub spec:     RevealSpec,
}

/// Everything one proxy triggers.
#[derive(Clone, Debug, PartialEq, Default, Reflect)]
pub struct ProxyBinding {
    pub caption:       Option<String>,
    /// Camera rig to move to on click.
    pub rig:           Option<String>,
    /// Node the orbit follows once the camera arrives.
    pub focus:         Option<String>,
    /// Clicking emits `ExternalNavigation` to this url and does nothing else.
    pub external_link: Option<String>,
    pub click_clips:   Vec<ClipBinding>,
    pub hover:         Option<HoverBinding>,
    pub lock:          Option<LockBinding>,
    pub reveal:        Option<RevealBinding>,
    /// Despawn the proxy after it is clicked.
    pub one_shot:      bool,
    /// A click locks the hover effect open until reset.
    pub commits:       bool,
    /// A removed one-shot proxy stays removed across resets.
    pub permanent:     bool,
}

impl ProxyBinding {
    pub fn new() -> Self { Self::default() }

    pub fn caption(mut self, caption: impl Into<String>) -> Self {
        self.caption = Some(caption.into());
        self
    }

    /// Moves the camera to `rig` on click and orbits `focus` afterwards.
    pub fn camera(mut self, rig: impl Into<String>, focus: impl Into<String>) -> Self {
        self.rig = Some(rig.into());
        self.focus = Some(focus.into());
        self
    }

    pub fn link(mut self, url: impl Into<String>) -> Self {
        self.external_link = Some(url.into());
        self
    }

    pub fn on_click(mut self, clip: ClipBinding) -> Self {
        self.click_clips.push(clip);
        self
    }

    pub fn on_hover(mut self, hover: HoverBinding) -> Self {
        self.hover = Some(hover);
        self
    }

    pub fn lock(mut self, kind: impl Into<String>, duration_ms: f32) -> Self {
        self.lock = Some(LockBinding {
            kind: kind.into(),
            duration_ms,
        });
        self
    }

    pub fn reveal(mut self, after_ms: f32, spec: RevealSpec) -> Self {
        self.reveal = Some(RevealBinding { after_ms, spec });
        self
    }

    pub const fn one_shot(mut self) -> Self {
        self.one_shot = true;
        self
    }

    pub const fn commits(mut self) -> Self {
        self.commits = true;
        self
    }

    pub const fn permanent(mut self) -> Self {
        self.permanent = true;
        self
    }
}

/// Proxy id to binding, plus the scene-wide defaults.
#[derive(Resource, Reflect, Debug, Clone, PartialEq)]
#[reflect(Resource)]
pub struct InteractionTable {
    /// Rig the camera starts at and returns to on reset.
    pub home_rig:       String,
    /// Point orbited while no focus target is set.
    pub overview_focus: Vec3,
    pub bindings:       HashMap<String, ProxyBinding>,
    /// Clips started as soon as their target's `ClipLibrary` appears. Reset leaves them running.
    pub ambient:        Vec<ClipBinding>,
}

impl Default for InteractionTable {
    fn default() -> Self {
        Self {
            home_rig:       "main_cam".to_owned(),
            overview_focus: Vec3::ZERO,
            bindings:       HashMap::default(),
            ambient:        Vec::new(),
        }
    }
}

impl InteractionTable {
    pub fn binding(&self, proxy: &str) -> Option<&ProxyBinding> { self.bindings.get(proxy) }

    pub fn with_binding(mut self, proxy: impl Into<String>, binding: ProxyBinding) -> Self {
        self.bindings.insert(proxy.into(), binding);
        self
    }

    pub fn with_ambient(mut self, clip: ClipBinding) -> Self {
        self.ambient.push(clip);
        self
    }

    /// Every clip a binding can start from hover or click.
    pub fn bound_clips(&self) -> impl Iterator<Item = &ClipBinding> {
        self.bindings.values().flat_map(|binding| {
            binding
                .click_clips
                .iter()
                .chain(binding.hover.iter().filter_map(|hover| hover.clip.as_ref()))
        })
    }

    /// Car showroom: engine bay, trunk, menu board with four options, guide and a shop sign.
    pub fn showroom() -> Self {
        let menu_options = (1..=4).map(|n| format!("hitbox_menu_option_{n}"));
        let menu_reveal = RevealSpec {
            hide:    vec!["menu_facade".to_owned()],
            show:    (1..=4)
                .map(|n| format!("menu_option_{n}"))
                .chain(menu_options.clone())
                .collect(),
            enable:  menu_options.collect(),
            disable: vec!["hitbox_menu".to_owned()],
        };

        let mut table = Self::default()
            .with_binding(
                "hitbox_hood",
                ProxyBinding::new()
                    .caption("Engine")
                    .camera("cam_engine", "hood")
                    .on_hover(
                        HoverBinding::clip(ClipBinding::once("hood", "hoodOpen"))
                            .with_emphasis("hood"),
                    )
                    .on_click(ClipBinding::once("hood", "hoodOpen"))
                    .one_shot()
                    .commits(),
            )
            .with_binding(
                "hitbox_back",
                ProxyBinding::new()
                    .caption("Customize")
                    .camera("cam_custom", "back")
                    .on_hover(
                        HoverBinding::clip(ClipBinding::once("back", "backOpen")).with_delay(250.0),
                    )
                    .on_click(ClipBinding::once("back", "backOpen"))
                    .commits(),
            )
            .with_binding(
                "hitbox_menu",
                ProxyBinding::new()
                    .caption("Menu")
                    .camera("cam_menu", "menu")
                    .on_click(ClipBinding::once("menu", "camMenuApproach"))
                    .lock("menu_transition", 1500.0)
                    .reveal(DEFAULT_TRANSITION_MS, menu_reveal),
            )
            .with_binding(
                "hitbox_guide",
                ProxyBinding::new()
                    .caption("Guide")
                    .camera("cam_guide", "guide"),
            )
            .with_binding(
                "hitbox_table",
                ProxyBinding::new().caption("Brochures").on_hover(
                    HoverBinding::clip(ClipBinding::once("table", "tableFlip"))
                        .stop_on_exit()
                        .while_locked(),
                ),
            )
            .with_binding(
                "hitbox_sign",
                ProxyBinding::new()
                    .caption("Visit the shop")
                    .link("https://example.com/showroom"),
            )
            .with_ambient(ClipBinding::ping_pong("lamp", "lampSwing"))
            .with_ambient(ClipBinding::ping_pong("robot", "robotWave"))
            .with_ambient(ClipBinding::ping_pong("generator", "generatorPulse"))
            .with_ambient(ClipBinding::blink("menu", "menuBlink"));

        for n in 1..=4 {
            table = table.with_binding(
                format!("hitbox_menu_option_{n}"),
                ProxyBinding::new()
                    .caption(format!("Option {n}"))
                    .on_hover(HoverBinding::emphasis(format!("menu_option_{n}")).while_locked()),
            );
        }
        table
    }
}

/// Timing, keys and orbit limits.
#[derive(Resource, Reflect, Debug, Clone, PartialEq)]
#[reflect(Resource)]
pub struct InteractionConfig {
    pub transition_duration_ms: f32,
    pub easing:                 EaseFunction,
    pub reset_key:              KeyCode,
    pub dump_key:               KeyCode,
    /// `(lower, upper)` pitch limits in radians applied to the orbit controller.
    pub pitch_limits:           Option<(f32, f32)>,
    /// Orbit radius used when a focused proxy names no focus node.
    pub fallback_orbit_radius:  f32,
    /// The camera counts as being at a rig within this distance.
    pub arrival_tolerance:      f32,
}

impl Default for InteractionConfig {
    fn default() -> Self {
        Self {
            transition_duration_ms: DEFAULT_TRANSITION_MS,
            easing:                 EaseFunction::QuadraticInOut,
            reset_key:              KeyCode::Escape,
            dump_key:               KeyCode::KeyF,
            pitch_limits:           Some((0.0, FRAC_PI_6)),
            fallback_orbit_radius:  5.0,
            arrival_tolerance:      1e-3,
        }
    }
}
