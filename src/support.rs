//! Support utilities for hierarchy operations.

use bevy::ecs::query::QueryFilter;
use bevy::prelude::*;

/// Composes the local transforms of `entity` and all of its ancestors.
///
/// Unlike `GlobalTransform` this is valid on the frame a node is spawned, before transform
/// propagation has run, which is when readiness observers want to read rigs.
pub fn world_transform<F: QueryFilter>(
    entity: Entity,
    transform_query: &Query<&Transform, F>,
    parent_query: &Query<&ChildOf>,
) -> Option<Transform> {
    let mut world = *transform_query.get(entity).ok()?;
    for ancestor in parent_query.iter_ancestors(entity) {
        let Ok(parent) = transform_query.get(ancestor) else {
            continue;
        };
        world = parent.mul_transform(world);
    }
    Some(world)
}

/// Iterates `entity` followed by all of its descendants.
pub fn self_and_descendants<'a>(
    entity: Entity,
    children_query: &'a Query<&Children>,
) -> impl Iterator<Item = Entity> + 'a {
    std::iter::once(entity).chain(children_query.iter_descendants(entity))
}

#[cfg(test)]
mod tests {
    use bevy::ecs::system::RunSystemOnce;

    use super::*;

    #[test]
    fn world_transform_composes_ancestors() {
        let mut world = World::new();
        let root = world
            .spawn(Transform::from_xyz(10.0, 0.0, 0.0).with_scale(Vec3::splat(2.0)))
            .id();
        let middle = world.spawn((Transform::from_xyz(0.0, 1.0, 0.0), ChildOf(root))).id();
        let leaf = world.spawn((Transform::from_xyz(0.0, 0.0, 1.0), ChildOf(middle))).id();

        let composed = world
            .run_system_once(move |transforms: Query<&Transform>, parents: Query<&ChildOf>| {
                world_transform(leaf, &transforms, &parents)
            })
            .unwrap()
            .unwrap();

        assert!(composed.translation.distance(Vec3::new(10.0, 2.0, 2.0)) < 1e-5);
        assert!(composed.scale.distance(Vec3::splat(2.0)) < 1e-5);
    }
}
