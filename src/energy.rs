use crate::{
    error::KinematicsResult,
    inertia::kinetic_energy,
    kinematics_cache::KinematicsCache,
    tree::RigidBodyTree,
    types::{real, Real},
    util::cast_vector3,
};

impl RigidBodyTree {
    /// Total kinetic energy, 1/2 * v^T * M(q) * v
    pub fn kinetic_energy<T: Real>(&self, cache: &KinematicsCache<T>) -> KinematicsResult<T> {
        self.check_cache(cache, true, false, "kinetic_energy")?;
        let mut total = T::zero();
        for (i, body) in self.bodies.iter().enumerate().skip(1) {
            let element = cache.element(i)?;
            let inertia = body.inertia.cast::<T>().transform(&element.transform_to_world);
            total += kinetic_energy(&inertia, &element.twist_in_world);
        }
        Ok(total)
    }

    /// Gravitational potential energy, zero at the world origin
    pub fn potential_energy<T: Real>(&self, cache: &KinematicsCache<T>) -> KinematicsResult<T> {
        self.check_cache(cache, false, false, "potential_energy")?;
        let gravity = cast_vector3::<T>(self.gravity());
        let mut total = T::zero();
        for (i, body) in self.bodies.iter().enumerate().skip(1) {
            let transform = &cache.element(i)?.transform_to_world;
            let mass_weighted_com = transform.rot() * cast_vector3::<T>(&body.inertia.cross_part)
                + transform.trans() * real::<T>(body.inertia.mass);
            total -= gravity.dot(&mass_weighted_com);
        }
        Ok(total)
    }
}
