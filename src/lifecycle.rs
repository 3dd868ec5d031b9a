//! Deferred tasks, proxy enablement and visibility, and the snapshot reset restores from.

use bevy::camera::primitives::Aabb;
use bevy::ecs::system::SystemParam;
use bevy::platform::collections::HashMap;
use bevy::prelude::*;

use crate::components::Emphasized;
use crate::components::Proxy;
use crate::error::InteractionError;
use crate::registry::AssetRegistry;
use crate::support::self_and_descendants;
use crate::table::InteractionTable;
use crate::table::RevealSpec;

/// Work to run once its delay has elapsed.
#[derive(Clone, Debug, PartialEq, Reflect)]
pub enum TaskAction {
    Reveal(RevealSpec),
    ReleaseLock { kind: String },
    /// Debounced hover effects for `proxy`.
    HoverEnter { proxy: String },
}

#[derive(Clone, Debug, PartialEq)]
struct ScheduledTask {
    due_ms:     f64,
    seq:        u64,
    generation: u64,
    action:     TaskAction,
}

/// Timers for delayed reveals, lock expiry and hover debounce.
///
/// Every task is stamped with the generation current when it was scheduled. Reset bumps
/// the generation, and tasks from an older one are dropped instead of applied.
#[derive(Resource, Debug, Default)]
pub struct TaskScheduler {
    tasks:      Vec<ScheduledTask>,
    generation: u64,
    next_seq:   u64,
}

impl TaskScheduler {
    /// Schedules `action` to run `after_ms` from `now_ms`. Returns its sequence number.
    pub fn schedule(&mut self, now_ms: f64, after_ms: f32, action: TaskAction) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.tasks.push(ScheduledTask {
            due_ms: now_ms + f64::from(after_ms.max(0.0)),
            seq,
            generation: self.generation,
            action,
        });
        seq
    }

    pub const fn generation(&self) -> u64 { self.generation }

    /// Starts a new generation. Everything scheduled so far becomes stale.
    pub fn invalidate(&mut self) { self.generation += 1; }

    /// Removes and returns every task due at `now_ms`, in due order with ties broken by
    /// scheduling order. Stale tasks that came due are discarded.
    pub fn take_due(&mut self, now_ms: f64) -> Vec<TaskAction> {
        let (mut due, pending): (Vec<_>, Vec<_>) = std::mem::take(&mut self.tasks)
            .into_iter()
            .partition(|task| task.due_ms <= now_ms);
        self.tasks = pending;

        due.sort_by(|a, b| a.due_ms.total_cmp(&b.due_ms).then(a.seq.cmp(&b.seq)));

        let generation = self.generation;
        due.into_iter()
            .filter(|task| {
                let current = task.generation == generation;
                if !current {
                    debug!("TaskScheduler: dropping stale {:?}", task.action);
                }
                current
            })
            .map(|task| task.action)
            .collect()
    }

    /// Cancels pending tasks matching `predicate`. Returns how many were cancelled.
    pub fn cancel_where(&mut self, mut predicate: impl FnMut(&TaskAction) -> bool) -> usize {
        let before = self.tasks.len();
        self.tasks.retain(|task| !predicate(&task.action));
        before - self.tasks.len()
    }

    /// Pending tasks of the current generation.
    pub fn pending(&self) -> impl Iterator<Item = &TaskAction> {
        self.tasks
            .iter()
            .filter(|task| task.generation == self.generation)
            .map(|task| &task.action)
    }
}

/// Geometry of a despawned proxy, enough to spawn an equivalent one.
#[derive(Clone, Debug)]
pub struct RemovedProxy {
    pub transform: Transform,
    pub parent:    Option<Entity>,
    /// Hit volumes with their transforms relative to the proxy.
    pub volumes:   Vec<(Transform, Aabb)>,
}

/// Initial configuration of the scene, recorded as things are first seen or touched.
#[derive(Resource, Debug, Default)]
pub struct SceneSnapshot {
    /// Proxy flags from when each proxy id first appeared.
    proxies:     HashMap<String, Proxy>,
    removed:     HashMap<String, RemovedProxy>,
    /// Visibility of non-proxy nodes from before the first change this session.
    decorations: HashMap<Entity, Visibility>,
}

impl SceneSnapshot {
    pub fn initial(&self, proxy: &str) -> Option<&Proxy> { self.proxies.get(proxy) }

    pub fn is_removed(&self, proxy: &str) -> bool { self.removed.contains_key(proxy) }

    pub fn touched_decorations(&self) -> usize { self.decorations.len() }
}

/// Observer that records a proxy's initial flags and makes its `Visibility` match them.
pub fn capture_proxy_snapshot(
    add: On<Add, Proxy>,
    mut commands: Commands,
    mut snapshot: ResMut<SceneSnapshot>,
    proxies: Query<&Proxy>,
) {
    let Ok(proxy) = proxies.get(add.entity) else {
        return;
    };

    snapshot
        .proxies
        .entry(proxy.id.clone())
        .or_insert_with(|| proxy.clone());
    commands.entity(add.entity).try_insert(proxy.visibility());
}

/// Writes proxy flags and node visibility on behalf of the state machine and reset.
#[derive(SystemParam)]
pub struct SceneLifecycle<'w, 's> {
    commands:     Commands<'w, 's>,
    registry:     Res<'w, AssetRegistry>,
    snapshot:     ResMut<'w, SceneSnapshot>,
    proxies:      Query<'w, 's, &'static mut Proxy>,
    visibilities: Query<'w, 's, &'static mut Visibility>,
    transforms:   Query<'w, 's, &'static Transform>,
    globals:      Query<'w, 's, &'static GlobalTransform>,
    volumes:      Query<'w, 's, &'static Aabb>,
    parents:      Query<'w, 's, &'static ChildOf>,
    children:     Query<'w, 's, &'static Children>,
    emphasized:   Query<'w, 's, Entity, With<Emphasized>>,
}

impl<'w, 's> SceneLifecycle<'w, 's> {
    pub const fn commands(&mut self) -> &mut Commands<'w, 's> { &mut self.commands }

    fn proxy(&self, id: &str) -> Option<&Proxy> {
        self.registry
            .get(id)
            .and_then(|entity| self.proxies.get(entity).ok())
    }

    pub fn is_enabled(&self, id: &str) -> bool {
        self.proxy(id).is_some_and(|proxy| proxy.enabled)
    }

    /// Shows or hides a node. Proxies keep their `visible` flag in step; other nodes have
    /// their pre-session visibility recorded on first touch.
    pub fn set_visible(&mut self, name: &str, visible: bool) -> Result<(), InteractionError> {
        let entity = self.registry.lookup(name)?;

        if let Ok(mut proxy) = self.proxies.get_mut(entity) {
            proxy.visible = visible;
        } else if let Ok(current) = self.visibilities.get(entity) {
            self.snapshot.decorations.entry(entity).or_insert(*current);
        }

        let visibility = if visible {
            Visibility::Inherited
        } else {
            Visibility::Hidden
        };
        if let Ok(mut current) = self.visibilities.get_mut(entity) {
            current.set_if_neq(visibility);
        } else {
            self.commands.entity(entity).try_insert(visibility);
        }
        Ok(())
    }

    pub fn set_enabled(&mut self, id: &str, enabled: bool) -> Result<(), InteractionError> {
        let entity = self.registry.lookup(id)?;
        match self.proxies.get_mut(entity) {
            Ok(mut proxy) => proxy.enabled = enabled,
            Err(_) => debug!("SceneLifecycle: `{id}` is not a proxy, nothing to enable"),
        }
        Ok(())
    }

    /// Applies every change in `spec`. Nodes that are missing are logged and skipped.
    pub fn apply_reveal(&mut self, spec: &RevealSpec) {
        let changes = spec
            .hide
            .iter()
            .map(|name| (name, Change::Visible(false)))
            .chain(spec.show.iter().map(|name| (name, Change::Visible(true))))
            .chain(spec.disable.iter().map(|name| (name, Change::Enabled(false))))
            .chain(spec.enable.iter().map(|name| (name, Change::Enabled(true))));

        for (name, change) in changes {
            let result = match change {
                Change::Visible(visible) => self.set_visible(name, visible),
                Change::Enabled(enabled) => self.set_enabled(name, enabled),
            };
            if let Err(err) = result {
                warn!("Reveal: {err}");
            }
        }
    }

    /// Despawns a proxy so it can never be hit again, keeping enough geometry to rebuild it.
    pub fn remove_proxy(&mut self, id: &str) -> Result<(), InteractionError> {
        let entity = self.registry.lookup(id)?;

        let Ok(global) = self.globals.get(entity) else {
            return Err(InteractionError::NotLoaded { name: id.to_owned() });
        };
        let volumes = self_and_descendants(entity, &self.children)
            .filter_map(|node| {
                let aabb = self.volumes.get(node).ok()?;
                let relative = self.globals.get(node).ok()?.reparented_to(global);
                Some((relative, *aabb))
            })
            .collect();

        let removed = RemovedProxy {
            transform: self.transforms.get(entity).copied().unwrap_or_default(),
            parent: self.parents.get(entity).ok().map(ChildOf::parent),
            volumes,
        };
        self.snapshot.removed.insert(id.to_owned(), removed);
        self.commands.entity(entity).despawn();
        info!("SceneLifecycle: removed proxy `{id}`");
        Ok(())
    }

    /// Adds or removes the `Emphasized` marker. Repeating either is harmless.
    pub fn emphasize(&mut self, name: &str, on: bool) -> Result<(), InteractionError> {
        let entity = self.registry.lookup(name)?;
        let already = self.emphasized.contains(entity);
        if on && !already {
            self.commands.entity(entity).try_insert(Emphasized);
        } else if !on && already {
            self.commands.entity(entity).try_remove::<Emphasized>();
        }
        Ok(())
    }

    /// Puts every proxy and touched decoration back the way the session found them,
    /// rebuilding removed proxies unless their binding is permanent.
    pub fn restore_initial(&mut self, table: &InteractionTable) {
        let initial: Vec<(String, Proxy)> = self
            .snapshot
            .proxies
            .iter()
            .map(|(id, proxy)| (id.clone(), proxy.clone()))
            .collect();

        for (id, proxy) in initial {
            if let Some(entity) = self.registry.get(&id)
                && let Ok(mut live) = self.proxies.get_mut(entity)
            {
                live.set_if_neq(proxy.clone());
                if let Ok(mut visibility) = self.visibilities.get_mut(entity) {
                    visibility.set_if_neq(proxy.visibility());
                }
                continue;
            }

            let permanent = table.binding(&id).is_some_and(|binding| binding.permanent);
            if permanent {
                continue;
            }
            if let Some(removed) = self.snapshot.removed.remove(&id) {
                self.respawn(proxy, removed);
            }
        }

        for (entity, visibility) in self.snapshot.decorations.drain() {
            if let Ok(mut current) = self.visibilities.get_mut(entity) {
                current.set_if_neq(visibility);
            }
        }

        for entity in &self.emphasized {
            self.commands.entity(entity).try_remove::<Emphasized>();
        }
    }

    fn respawn(&mut self, proxy: Proxy, removed: RemovedProxy) {
        info!("SceneLifecycle: recreating proxy `{}`", proxy.id);

        let parent = removed
            .parent
            .filter(|parent| self.transforms.contains(*parent));
        let visibility = proxy.visibility();

        let mut root = self.commands.spawn((
            Name::new(proxy.id.clone()),
            proxy,
            removed.transform,
            visibility,
        ));
        if let Some(parent) = parent {
            root.insert(ChildOf(parent));
        }

        root.with_children(|builder| {
            for (relative, aabb) in removed.volumes {
                builder.spawn((relative, aabb));
            }
        });
    }
}

enum Change {
    Visible(bool),
    Enabled(bool),
}
