//! Typed lookup from logical node names to loaded entities.
//!
//! Nodes register themselves when their `Name` is added, which is the moment the asset
//! loader finishes spawning them. Interested systems subscribe to [`NodeReady`] instead of
//! polling for a name to appear.

use bevy::platform::collections::HashMap;
use bevy::prelude::*;

use crate::error::InteractionError;

/// Readiness signal for a named node.
#[derive(Event, Debug, Clone)]
pub struct NodeReady {
    pub name:   String,
    pub entity: Entity,
}

#[derive(Resource, Debug, Default)]
pub struct AssetRegistry {
    nodes: HashMap<String, Entity>,
}

impl AssetRegistry {
    /// Resolves `name`, or reports it as not loaded.
    pub fn lookup(&self, name: &str) -> Result<Entity, InteractionError> {
        self.nodes
            .get(name)
            .copied()
            .ok_or_else(|| InteractionError::NotLoaded {
                name: name.to_owned(),
            })
    }

    pub fn get(&self, name: &str) -> Option<Entity> { self.nodes.get(name).copied() }

    pub fn is_ready(&self, name: &str) -> bool { self.nodes.contains_key(name) }

    /// Registers `entity` under `name`. The first live registration of a name wins, so a
    /// nested node sharing its model's name does not shadow the model root.
    fn register(&mut self, name: &str, entity: Entity) -> bool {
        if let Some(existing) = self.nodes.get(name) {
            if *existing != entity {
                debug!("Registry: `{name}` already bound to {existing:?}, ignoring {entity:?}");
            }
            return false;
        }
        self.nodes.insert(name.to_owned(), entity);
        true
    }

    fn unregister(&mut self, name: &str, entity: Entity) {
        if self.nodes.get(name) == Some(&entity) {
            self.nodes.remove(name);
        }
    }
}

/// Observer that registers every newly named entity and announces it.
pub fn register_named_node(
    add: On<Add, Name>,
    mut commands: Commands,
    mut registry: ResMut<AssetRegistry>,
    names: Query<&Name>,
) {
    let entity = add.entity;
    let Ok(name) = names.get(entity) else {
        return;
    };

    if registry.register(name.as_str(), entity) {
        commands.trigger(NodeReady {
            name: name.as_str().to_owned(),
            entity,
        });
    }
}

/// Observer that forgets entities whose `Name` goes away, including on despawn.
pub fn unregister_named_node(
    remove: On<Remove, Name>,
    mut registry: ResMut<AssetRegistry>,
    names: Query<&Name>,
) {
    let entity = remove.entity;
    if let Ok(name) = names.get(entity) {
        registry.unregister(name.as_str(), entity);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry_app() -> App {
        let mut app = App::new();
        app.init_resource::<AssetRegistry>()
            .add_observer(register_named_node)
            .add_observer(unregister_named_node);
        app
    }

    #[test]
    fn lookup_reports_missing_nodes_until_they_load() {
        let mut app = registry_app();
        assert_eq!(
            app.world().resource::<AssetRegistry>().lookup("cam_engine"),
            Err(InteractionError::NotLoaded {
                name: "cam_engine".into(),
            })
        );

        let rig = app.world_mut().spawn(Name::new("cam_engine")).id();

        assert_eq!(
            app.world().resource::<AssetRegistry>().lookup("cam_engine"),
            Ok(rig)
        );
    }

    #[test]
    fn first_registration_wins_and_despawn_unregisters() {
        let mut app = registry_app();
        let root = app.world_mut().spawn(Name::new("hood")).id();
        let nested = app.world_mut().spawn(Name::new("hood")).id();

        assert_eq!(app.world().resource::<AssetRegistry>().get("hood"), Some(root));

        app.world_mut().despawn(nested);
        assert_eq!(app.world().resource::<AssetRegistry>().get("hood"), Some(root));

        app.world_mut().despawn(root);
        assert!(!app.world().resource::<AssetRegistry>().is_ready("hood"));
    }

    #[derive(Resource, Default)]
    struct Announced(Vec<String>);

    #[test]
    fn node_ready_fires_once_per_registration() {
        let mut app = registry_app();
        app.init_resource::<Announced>()
            .add_observer(|ready: On<NodeReady>, mut seen: ResMut<Announced>| {
                seen.0.push(ready.name.clone());
            });

        app.world_mut().spawn(Name::new("menu"));
        app.world_mut().spawn(Name::new("menu"));
        app.world_mut().spawn(Name::new("guide"));

        assert_eq!(app.world().resource::<Announced>().0, vec!["menu", "guide"]);
    }
}
