//! Bookkeeping between bodies and the collision geometry attached to them.
//! Geometry and queries live behind `CollisionModel`.

use na::Isometry3;

use crate::{
    error::KinematicsResult, kinematics_cache::KinematicsCache, tree::RigidBodyTree,
    types::Float,
};

/// Handle of a collision element, unique within a tree
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId(pub usize);

/// A piece of collision geometry rigidly attached to a body
#[derive(Clone, Debug, PartialEq)]
pub struct CollisionElement {
    pub id: ElementId,
    pub transform_to_body: Isometry3<Float>, // from element frame to body frame
}

/// A collision world that tracks where each element currently is
pub trait CollisionModel {
    /// Move element `id` to `transform_to_world`. Returns false if the model
    /// does not know the element.
    fn update_element_world_transform(
        &mut self,
        id: ElementId,
        transform_to_world: &Isometry3<Float>,
    ) -> bool;
}

impl RigidBodyTree {
    /// Attach a collision element to `body`, returning its id
    pub fn add_collision_element(
        &mut self,
        body: usize,
        transform_to_body: Isometry3<Float>,
    ) -> KinematicsResult<ElementId> {
        self.body(body)?;
        let id = ElementId(self.next_element_id);
        self.next_element_id += 1;
        self.bodies[body].collision_elements.push(CollisionElement {
            id,
            transform_to_body,
        });
        Ok(id)
    }

    /// Push the world pose of every collision element at the cached
    /// configuration into `model`. Elements the model does not know about
    /// are reported once and skipped.
    pub fn update_dynamic_collision_elements<M: CollisionModel>(
        &self,
        cache: &KinematicsCache<Float>,
        model: &mut M,
    ) -> KinematicsResult<()> {
        self.check_cache(cache, false, false, "update_dynamic_collision_elements")?;
        for (i, body) in self.bodies.iter().enumerate() {
            if body.collision_elements.is_empty() {
                continue;
            }
            let body_to_world = &cache.element(i)?.transform_to_world.iso;
            for element in body.collision_elements.iter() {
                let element_to_world = body_to_world * element.transform_to_body;
                if !model.update_element_world_transform(element.id, &element_to_world) {
                    self.warn_once(
                        &format!("collision element {}", element.id.0),
                        "Collision model does not know an element of the tree",
                    );
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use na::{dvector, vector, Translation3};

    use crate::{assert_vec_close, helpers::build_double_pendulum, PI};

    use super::*;

    #[derive(Default)]
    struct RecordingModel {
        poses: HashMap<ElementId, Isometry3<Float>>,
    }

    impl CollisionModel for RecordingModel {
        fn update_element_world_transform(
            &mut self,
            id: ElementId,
            transform_to_world: &Isometry3<Float>,
        ) -> bool {
            self.poses.insert(id, *transform_to_world);
            true
        }
    }

    #[test]
    fn elements_follow_their_body() {
        // Arrange
        let mut tree = build_double_pendulum(1.0, 1.0).unwrap();
        let ball = tree
            .add_collision_element(2, Isometry3::from(Translation3::new(0., 0., -1.)))
            .unwrap();
        let pivot = tree.add_collision_element(1, Isometry3::identity()).unwrap();
        let cache = tree.kinematics(&dvector![PI / 2.0, 0.0]).unwrap();
        let mut model = RecordingModel::default();

        // Act
        tree.update_dynamic_collision_elements(&cache, &mut model)
            .unwrap();

        // Assert
        assert_ne!(ball, pivot);
        assert_eq!(model.poses.len(), 2);
        assert_vec_close!(model.poses[&ball].translation.vector, vector![-2., 0., 0.], 1e-12);
        assert_vec_close!(model.poses[&pivot].translation.vector, vector![0., 0., 0.], 1e-12);
    }

    #[test]
    fn unknown_body_is_rejected() {
        let mut tree = build_double_pendulum(1.0, 1.0).unwrap();

        let result = tree.add_collision_element(7, Isometry3::identity());

        assert_eq!(result, Err(crate::error::KinematicsError::UnknownBody(7)));
    }
}
