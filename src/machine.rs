//! The interaction state machine.
//!
//! Pointer, click and key events arrive as observers. Each one borrows the whole
//! [`InteractionContext`], applies the matching row of the [`InteractionTable`], and leaves
//! [`InteractionState`] consistent before the next event is processed. Per-frame work
//! (scheduled tasks, focus tracking, caption anchoring) runs in `Update` systems.

use bevy::ecs::system::SystemParam;
use bevy::prelude::*;
use bevy_panorbit_camera::PanOrbitCamera;

use crate::choreographer::CameraTransition;
use crate::choreographer::TransitionPurpose;
use crate::components::CameraRig;
use crate::components::ClipLibrary;
use crate::components::InteractiveCamera;
use crate::error::InteractionError;
use crate::events::CameraTransitionEnd;
use crate::events::ExternalNavigation;
use crate::events::FocusDumpRequested;
use crate::events::FocusReached;
use crate::events::HoverEnded;
use crate::events::HoverStarted;
use crate::events::PointerClicked;
use crate::events::PointerMoved;
use crate::extension::PanOrbitCameraExt;
use crate::hit_test::HitTester;
use crate::hit_test::cursor_to_ndc;
use crate::hit_test::project_to_viewport;
use crate::lifecycle::SceneLifecycle;
use crate::lifecycle::TaskAction;
use crate::lifecycle::TaskScheduler;
use crate::registry::AssetRegistry;
use crate::registry::NodeReady;
use crate::sequencer::AnimationSequencer;
use crate::state::Caption;
use crate::state::CursorAffordance;
use crate::state::FocusTarget;
use crate::state::InteractionState;
use crate::state::Phase;
use crate::state::PointerState;
use crate::support::world_transform;
use crate::table::ClipBinding;
use crate::table::HoverBinding;
use crate::table::HoverExit;
use crate::table::InteractionConfig;
use crate::table::InteractionTable;
use crate::table::ProxyBinding;

/// Everything a state machine handler reads or writes.
#[derive(SystemParam)]
pub struct InteractionContext<'w, 's> {
    pub(crate) state:     ResMut<'w, InteractionState>,
    pub(crate) table:     Res<'w, InteractionTable>,
    pub(crate) config:    Res<'w, InteractionConfig>,
    pub(crate) scheduler: ResMut<'w, TaskScheduler>,
    pub(crate) sequencer: ResMut<'w, AnimationSequencer>,
    pub(crate) lifecycle: SceneLifecycle<'w, 's>,
    pub(crate) registry:  Res<'w, AssetRegistry>,
    time:                 Res<'w, Time>,
    cursor:               ResMut<'w, CursorAffordance>,
    caption:              ResMut<'w, Caption>,
    libraries:            Query<'w, 's, &'static ClipLibrary>,
    rigs:                 Query<'w, 's, (), With<CameraRig>>,
    transforms:           Query<'w, 's, &'static Transform>,
    parents:              Query<'w, 's, &'static ChildOf>,
    pub(crate) cameras: Query<
        'w,
        's,
        (Entity, &'static Transform, Option<&'static CameraTransition>),
        With<InteractiveCamera>,
    >,
}

impl<'w, 's> InteractionContext<'w, 's> {
    pub fn now_ms(&self) -> f64 { self.time.elapsed_secs_f64() * 1000.0 }

    pub(crate) const fn commands(&mut self) -> &mut Commands<'w, 's> { self.lifecycle.commands() }

    fn binding(&self, proxy: &str) -> Option<ProxyBinding> { self.table.binding(proxy).cloned() }

    /// World transform of a named node, composed from local transforms.
    pub(crate) fn node_transform(
        &self,
        name: &str,
    ) -> Result<(Entity, Transform), InteractionError> {
        let entity = self.registry.lookup(name)?;
        let transform = world_transform(entity, &self.transforms, &self.parents).ok_or_else(|| {
            InteractionError::NotLoaded {
                name: name.to_owned(),
            }
        })?;
        Ok((entity, transform))
    }

    pub(crate) fn rig_transform(&self, rig: &str) -> Result<Transform, InteractionError> {
        let (entity, transform) = self.node_transform(rig)?;
        if !self.rigs.contains(entity) {
            return Err(InteractionError::NotACameraRig {
                name: rig.to_owned(),
            });
        }
        Ok(transform)
    }

    /// Starts `clip` on its target node.
    pub fn play(&mut self, clip: &ClipBinding) -> Result<(), InteractionError> {
        let target = self.registry.lookup(&clip.target)?;
        let library =
            self.libraries
                .get(target)
                .map_err(|_| InteractionError::MissingClipLibrary {
                    target: clip.target.clone(),
                })?;

        self.sequencer
            .play(target, library, &clip.clip, clip.options())
            .map(|_| ())
            .ok_or_else(|| InteractionError::MissingClip {
                target: clip.target.clone(),
                clip:   clip.clip.clone(),
            })
    }

    /// Plays `clip` back to its start if it is what its target is currently playing.
    pub fn rewind(&mut self, clip: &ClipBinding) -> Result<bool, InteractionError> {
        let target = self.registry.lookup(&clip.target)?;
        Ok(self.sequencer.rewind(target, &clip.clip))
    }

    /// Inserts a camera transition from wherever the camera is now to `to`.
    pub(crate) fn start_transition(
        &mut self,
        rig: &str,
        to: Transform,
        orbit_focus: Vec3,
        purpose: TransitionPurpose,
    ) -> Result<(), InteractionError> {
        let (camera, from, _) = self
            .cameras
            .single()
            .map_err(|_| InteractionError::NoCamera)?;
        let transition = CameraTransition::new(
            *from,
            to,
            orbit_focus,
            rig,
            purpose,
            self.config.transition_duration_ms,
            self.config.easing,
        );
        self.commands().entity(camera).insert(transition);
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Hover
    // ------------------------------------------------------------------------

    /// Applies the result of resolving a pointer move.
    pub fn pointer_moved(&mut self, resolved: Option<String>) {
        if resolved == self.state.hovered {
            return;
        }

        if let Some(previous) = self.state.hovered.take() {
            self.hover_exit(&previous);
        }
        if let Some(proxy) = resolved {
            self.hover_enter(proxy);
        }
        self.refresh_presentation();
    }

    fn hover_allowed(&self, proxy: &str, hover: &HoverBinding) -> bool {
        !self.state.is_committed(proxy) && (hover.while_locked || !self.state.is_locked())
    }

    fn hover_enter(&mut self, proxy: String) {
        self.state.hovered = Some(proxy.clone());
        self.commands().trigger(HoverStarted {
            proxy: proxy.clone(),
        });

        let Some(hover) = self.binding(&proxy).and_then(|binding| binding.hover) else {
            return;
        };
        if !self.hover_allowed(&proxy, &hover) {
            debug!("Hover on `{proxy}` suppressed (committed or locked)");
            return;
        }

        self.state.hover_active = Some(proxy.clone());
        if hover.delay_ms > 0.0 {
            let now = self.now_ms();
            self.scheduler
                .schedule(now, hover.delay_ms, TaskAction::HoverEnter { proxy });
        } else {
            self.apply_hover_effects(&proxy, &hover);
        }
    }

    fn apply_hover_effects(&mut self, proxy: &str, hover: &HoverBinding) {
        if let Some(clip) = &hover.clip
            && let Err(err) = self.play(clip)
        {
            if err.is_not_loaded() {
                debug!("Hover on `{proxy}`: {err}");
            } else {
                warn!("Hover on `{proxy}`: {err}");
            }
        }
        if let Some(node) = &hover.emphasis
            && let Err(err) = self.lifecycle.emphasize(node, true)
        {
            warn!("Hover on `{proxy}`: {err}");
        }
    }

    /// Leaves `proxy`: cancels a pending debounced hover and undoes applied effects.
    /// The caller has already cleared `hovered`.
    pub(crate) fn hover_exit(&mut self, proxy: &str) {
        self.cancel_pending_hover(proxy);
        self.commands().trigger(HoverEnded {
            proxy: proxy.to_owned(),
        });

        if self.state.hover_active.as_deref() != Some(proxy) {
            return;
        }
        self.state.hover_active = None;

        let Some(hover) = self.binding(proxy).and_then(|binding| binding.hover) else {
            return;
        };

        if let Some(clip) = &hover.clip {
            let result = match hover.on_exit {
                HoverExit::Reverse => self.rewind(clip).map(|_| ()),
                HoverExit::Stop => self.registry.lookup(&clip.target).map(|target| {
                    self.sequencer.stop_clip(target, &clip.clip);
                }),
            };
            if let Err(err) = result {
                warn!("Hover exit from `{proxy}`: {err}");
            }
        }
        if let Some(node) = &hover.emphasis
            && let Err(err) = self.lifecycle.emphasize(node, false)
        {
            warn!("Hover exit from `{proxy}`: {err}");
        }
    }

    fn cancel_pending_hover(&mut self, proxy: &str) {
        self.scheduler.cancel_where(|action| {
            matches!(action, TaskAction::HoverEnter { proxy: pending } if pending == proxy)
        });
    }

    /// Drops the hover if its proxy has been disabled or removed since it was resolved.
    fn revalidate_hover(&mut self) {
        let Some(proxy) = self.state.hovered.clone() else {
            return;
        };
        if self.lifecycle.is_enabled(&proxy) {
            return;
        }
        self.state.hovered = None;
        self.hover_exit(&proxy);
        self.refresh_presentation();
    }

    pub(crate) fn refresh_presentation(&mut self) {
        let hovered = self.state.hovered.clone();

        self.cursor.set_if_neq(if hovered.is_some() {
            CursorAffordance::Pointer
        } else {
            CursorAffordance::Default
        });

        if self.caption.proxy != hovered {
            let text = hovered
                .as_deref()
                .and_then(|proxy| self.table.binding(proxy))
                .and_then(|binding| binding.caption.clone());
            *self.caption = Caption {
                proxy: hovered,
                text,
                anchor: None,
            };
        }
    }

    // ------------------------------------------------------------------------
    // Click
    // ------------------------------------------------------------------------

    /// Acts on the current hover resolution.
    pub fn click(&mut self) {
        let Some(proxy) = self.state.hovered.clone() else {
            debug!("Click: nothing under the pointer");
            return;
        };
        if self.state.is_locked() {
            debug!(
                "Click on `{proxy}` ignored while locked by {:?}",
                self.state.locks().collect::<Vec<_>>()
            );
            return;
        }
        if !self.lifecycle.is_enabled(&proxy) {
            debug!("Click on `{proxy}` ignored, proxy is disabled or removed");
            return;
        }

        let binding = self.binding(&proxy).unwrap_or_default();

        if let Some(url) = binding.external_link {
            info!("Click on `{proxy}`: navigating to {url}");
            self.commands().trigger(ExternalNavigation { proxy, url });
            return;
        }

        if let Some(rig) = &binding.rig {
            if let Err(err) = self.focus_on(&proxy, rig, binding.focus.as_deref()) {
                warn!("Click on `{proxy}`: {err}");
                return;
            }
        }

        for clip in &binding.click_clips {
            if let Err(err) = self.play(clip) {
                warn!("Click on `{proxy}`: {err}");
            }
        }

        if binding.commits {
            self.state.committed.insert(proxy.clone());
            if self.state.hover_active.as_deref() == Some(proxy.as_str()) {
                // Hover effects stay as they are; exit must not undo them
                self.cancel_pending_hover(&proxy);
                self.state.hover_active = None;
            }
        }

        let now = self.now_ms();
        if let Some(lock) = &binding.lock {
            info!("Lock `{}` set for {:.0}ms", lock.kind, lock.duration_ms);
            self.state.locks.insert(lock.kind.clone());
            self.scheduler.schedule(
                now,
                lock.duration_ms,
                TaskAction::ReleaseLock {
                    kind: lock.kind.clone(),
                },
            );
        }
        if let Some(reveal) = &binding.reveal {
            self.scheduler
                .schedule(now, reveal.after_ms, TaskAction::Reveal(reveal.spec.clone()));
        }

        if binding.one_shot {
            if let Some(hovered) = self.state.hovered.take() {
                self.hover_exit(&hovered);
            }
            if let Err(err) = self.lifecycle.remove_proxy(&proxy) {
                warn!("Click on `{proxy}`: {err}");
            }
        }

        self.refresh_presentation();
    }

    /// Begins the camera transition for a clicked proxy. Nothing changes if the rig is not
    /// available yet.
    fn focus_on(
        &mut self,
        proxy: &str,
        rig: &str,
        focus_node: Option<&str>,
    ) -> Result<(), InteractionError> {
        let to = self.rig_transform(rig)?;

        let (focus, orbit_focus) = match focus_node.map(|name| (name, self.node_transform(name))) {
            Some((name, Ok((entity, transform)))) => (
                Some(FocusTarget {
                    name: name.to_owned(),
                    entity,
                }),
                transform.translation,
            ),
            Some((_, Err(err))) => {
                warn!("Focus for `{proxy}`: {err}, orbiting in front of `{rig}` instead");
                (None, to.translation + to.forward() * self.config.fallback_orbit_radius)
            },
            None => (None, to.translation + to.forward() * self.config.fallback_orbit_radius),
        };

        self.start_transition(
            rig,
            to,
            orbit_focus,
            TransitionPurpose::Focus {
                proxy: proxy.to_owned(),
            },
        )?;

        self.state.phase = Phase::Transitioning {
            target: proxy.to_owned(),
        };
        self.state.focus = focus;
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Camera arrival, scheduled work, diagnostics
    // ------------------------------------------------------------------------

    pub fn transition_finished(&mut self, proxy: Option<&str>) {
        let Some(proxy) = proxy else {
            debug!("Camera back at the home rig");
            return;
        };

        let arriving =
            matches!(&self.state.phase, Phase::Transitioning { target } if target == proxy);
        if !arriving {
            debug!("Camera arrived for `{proxy}` but the state machine moved on");
            return;
        }

        info!("Focused on `{proxy}`");
        self.state.phase = Phase::Focused {
            target: proxy.to_owned(),
        };
        self.commands().trigger(FocusReached {
            proxy: proxy.to_owned(),
        });
    }

    /// Runs every task that has come due, in firing order.
    pub fn run_due_tasks(&mut self) {
        let now = self.now_ms();
        for action in self.scheduler.take_due(now) {
            match action {
                TaskAction::Reveal(spec) => {
                    info!("Reveal: {spec:?}");
                    self.lifecycle.apply_reveal(&spec);
                    self.revalidate_hover();
                },
                TaskAction::ReleaseLock { kind } => {
                    if self.state.locks.remove(&kind) {
                        info!("Lock `{kind}` released");
                    }
                },
                TaskAction::HoverEnter { proxy } => {
                    let still_hovered = self.state.hovered.as_deref() == Some(proxy.as_str())
                        && self.state.hover_active.as_deref() == Some(proxy.as_str());
                    let hover = self.binding(&proxy).and_then(|binding| binding.hover);
                    if let Some(hover) = hover
                        && still_hovered
                        && self.hover_allowed(&proxy, &hover)
                    {
                        self.apply_hover_effects(&proxy, &hover);
                    }
                },
            }
        }
    }

    pub fn dump_focus(&self) {
        let camera = self.cameras.single().ok().map(|(_, transform, _)| *transform);
        let Some(camera) = camera else {
            warn!("Focus dump: {}", InteractionError::NoCamera);
            return;
        };

        match self.state.focus() {
            Some(focus) => {
                let position = self
                    .node_transform(&focus.name)
                    .map(|(_, transform)| transform.translation)
                    .ok();
                info!(
                    "Focus: `{}` at {:.2?}, camera at {:.2?} facing {:.2?}",
                    focus.name,
                    position,
                    camera.translation,
                    camera.forward()
                );
            },
            None => info!(
                "Focus: none ({:?}), camera at {:.2?} facing {:.2?}",
                self.state.mode(),
                camera.translation,
                camera.forward()
            ),
        }
    }
}

/// Observer that resolves the pointer to a proxy and updates hover.
pub fn on_pointer_moved(
    moved: On<PointerMoved>,
    mut pointer: ResMut<PointerState>,
    mut params: ParamSet<(HitTester, InteractionContext)>,
) {
    pointer.position = Some(moved.position);
    pointer.viewport = moved.viewport;

    let resolved = cursor_to_ndc(moved.position, moved.viewport)
        .and_then(|ndc| params.p0().resolve(ndc))
        .map(|(_, proxy)| proxy);
    params.p1().pointer_moved(resolved);
}

pub fn on_pointer_clicked(_click: On<PointerClicked>, mut interaction: InteractionContext) {
    interaction.click();
}

pub fn on_focus_dump_requested(_dump: On<FocusDumpRequested>, interaction: InteractionContext) {
    interaction.dump_focus();
}

/// Observer that moves from `Transitioning` to `Focused` when the camera arrives.
pub fn on_camera_transition_end(end: On<CameraTransitionEnd>, mut interaction: InteractionContext) {
    interaction.transition_finished(end.proxy.as_deref());
}

/// Snaps the interactive camera onto the home rig and hands it to the orbit controller.
#[derive(SystemParam)]
pub struct HomeRig<'w, 's> {
    table:      Res<'w, InteractionTable>,
    config:     Res<'w, InteractionConfig>,
    rigs:       Query<'w, 's, (), With<CameraRig>>,
    transforms: Query<'w, 's, &'static Transform, Without<InteractiveCamera>>,
    parents:    Query<'w, 's, &'static ChildOf>,
    cameras: Query<
        'w,
        's,
        (&'static mut Transform, Option<&'static mut PanOrbitCamera>),
        (With<InteractiveCamera>, Without<CameraTransition>),
    >,
}

impl HomeRig<'_, '_> {
    fn snap(&mut self, rig: Entity) {
        if !self.rigs.contains(rig) {
            debug!(
                "Home rig `{}` is not tagged `CameraRig` yet, waiting",
                self.table.home_rig
            );
            return;
        }
        let Some(home) = world_transform(rig, &self.transforms, &self.parents) else {
            return;
        };

        for (mut transform, pan_orbit) in &mut self.cameras {
            *transform = home.with_scale(transform.scale);
            if let Some(mut pan_orbit) = pan_orbit {
                pan_orbit.orbit_from(home.translation, self.table.overview_focus);
                if let Some((lower, upper)) = self.config.pitch_limits {
                    pan_orbit.pitch_lower_limit = Some(lower);
                    pan_orbit.pitch_upper_limit = Some(upper);
                }
            }
            info!(
                "Camera placed at home rig `{}` {:.1?}",
                self.table.home_rig, home.translation
            );
        }
    }
}

/// Observer that places the camera once the home rig has loaded.
pub fn on_home_rig_ready(ready: On<NodeReady>, mut home: HomeRig) {
    if ready.name == home.table.home_rig {
        home.snap(ready.entity);
    }
}

/// Observer for a camera that appears after the home rig.
pub fn on_interactive_camera_added(
    _add: On<Add, InteractiveCamera>,
    registry: Res<AssetRegistry>,
    mut home: HomeRig,
) {
    if let Some(rig) = registry.get(&home.table.home_rig) {
        home.snap(rig);
    }
}

/// Observer for a home rig whose `CameraRig` tag lands after its `Name`.
pub fn on_camera_rig_tagged(
    add: On<Add, CameraRig>,
    registry: Res<AssetRegistry>,
    mut home: HomeRig,
) {
    if registry.get(&home.table.home_rig) == Some(add.entity) {
        home.snap(add.entity);
    }
}

/// Observer that starts the table's ambient loops on a node as soon as its clips load.
pub fn start_ambient_clips(
    add: On<Add, ClipLibrary>,
    table: Res<InteractionTable>,
    nodes: Query<(&Name, &ClipLibrary)>,
    mut sequencer: ResMut<AnimationSequencer>,
) {
    if let Ok((name, library)) = nodes.get(add.entity) {
        start_ambient(add.entity, name, library, &table, &mut sequencer);
    }
}

/// Observer for a node whose `Name` arrives after its `ClipLibrary`.
pub fn start_ambient_clips_when_named(
    add: On<Add, Name>,
    table: Res<InteractionTable>,
    nodes: Query<(&Name, &ClipLibrary)>,
    mut sequencer: ResMut<AnimationSequencer>,
) {
    if let Ok((name, library)) = nodes.get(add.entity) {
        start_ambient(add.entity, name, library, &table, &mut sequencer);
    }
}

fn start_ambient(
    entity: Entity,
    name: &Name,
    library: &ClipLibrary,
    table: &InteractionTable,
    sequencer: &mut AnimationSequencer,
) {
    for clip in table.ambient.iter().filter(|clip| clip.target == name.as_str()) {
        // both observers fire when name and clips arrive together
        if sequencer.player_for_clip(entity, &clip.clip).is_some() {
            continue;
        }
        if sequencer
            .play(entity, library, &clip.clip, clip.options())
            .is_some()
        {
            debug!("Ambient clip `{}` started on `{}`", clip.clip, clip.target);
        } else {
            warn!(
                "Ambient: {}",
                InteractionError::MissingClip {
                    target: clip.target.clone(),
                    clip:   clip.clip.clone(),
                }
            );
        }
    }
}

/// System that fires due timers.
pub fn run_scheduled_tasks(mut interaction: InteractionContext) { interaction.run_due_tasks(); }

/// System that keeps the orbit centred on the focus target while focused.
pub fn track_focus_target(
    state: Res<InteractionState>,
    globals: Query<&GlobalTransform>,
    mut cameras: Query<&mut PanOrbitCamera, (With<InteractiveCamera>, Without<CameraTransition>)>,
) {
    let Phase::Focused { .. } = state.phase() else {
        return;
    };
    let Some(position) = state
        .focus()
        .and_then(|focus| globals.get(focus.entity).ok())
        .map(GlobalTransform::translation)
    else {
        return;
    };

    for mut pan_orbit in &mut cameras {
        if pan_orbit.target_focus != position {
            pan_orbit.target_focus = position;
        }
    }
}

/// System that projects the hovered proxy into window space for the caption.
pub fn update_caption_anchor(
    mut caption: ResMut<Caption>,
    pointer: Res<PointerState>,
    registry: Res<AssetRegistry>,
    globals: Query<&GlobalTransform>,
    cameras: Query<(&GlobalTransform, &Projection), With<InteractiveCamera>>,
) {
    let anchor = caption
        .proxy
        .as_deref()
        .and_then(|proxy| registry.get(proxy))
        .and_then(|entity| globals.get(entity).ok())
        .zip(cameras.single().ok())
        .and_then(|(target, (cam_global, projection))| {
            project_to_viewport(target.translation(), cam_global, projection, pointer.viewport)
        });

    if caption.anchor != anchor {
        caption.anchor = anchor;
    }
}
