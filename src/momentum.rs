use na::{DMatrix, DVector, Matrix3xX, Vector3, Vector6};

use crate::{
    dynamics::newton_euler,
    error::KinematicsResult,
    inertia::SpatialInertia,
    joint::JointModel,
    kinematics_cache::KinematicsCache,
    spatial::{geometric_jacobian::GeometricJacobian, transform::Transform3D, wrench::Wrench},
    tree::RigidBodyTree,
    types::{real, Float, Real},
    util::{cast_vector3, colwise_cross},
    WORLD_FRAME,
};

/// Frame at the center of mass, aligned with the world frame
pub const CENTROIDAL_FRAME: &str = "centroidal";

/// A momentum matrix maps a joint velocity vector to a momentum.
#[derive(Debug, Clone, PartialEq)]
pub struct MomentumMatrix<T: Real = Float> {
    pub frame: String,
    pub angular: Matrix3xX<T>,
    pub linear: Matrix3xX<T>,
}

impl<T: Real> MomentumMatrix<T> {
    pub fn zeros(frame: &str, ncols: usize) -> Self {
        MomentumMatrix {
            frame: frame.to_string(),
            angular: Matrix3xX::zeros(ncols),
            linear: Matrix3xX::zeros(ncols),
        }
    }

    // Computes the momentum matrix given spatial inertia and jacobian
    pub fn mul(inertia: &SpatialInertia<T>, jacobian: &GeometricJacobian<T>) -> MomentumMatrix<T> {
        if inertia.frame != jacobian.frame {
            panic!(
                "inertia frame {} and jacobian frame {} differ!",
                inertia.frame, jacobian.frame
            );
        }
        let Jw = &jacobian.angular;
        let Jv = &jacobian.linear;
        let J = inertia.moment;
        let m = inertia.mass;
        let c = inertia.cross_part;

        let ang = J * Jw + colwise_cross(&c, Jv);
        let lin = Jv * m - colwise_cross(&c, Jw);

        MomentumMatrix {
            frame: jacobian.frame.clone(),
            angular: ang,
            linear: lin,
        }
    }

    /// The result should be a joint-space inertia matrix
    pub fn transpose_mul(&self, jacobian: &GeometricJacobian<T>) -> DMatrix<T> {
        if self.frame != jacobian.frame {
            panic!(
                "self frame {} and jacobian frame {} differ!",
                self.frame, jacobian.frame
            );
        }

        self.angular.transpose() * &jacobian.angular + self.linear.transpose() * &jacobian.linear
    }

    /// Transform the momentum matrix to be expressed in the "to" frame of transform.
    /// Columns are momenta, which transform like wrenches.
    pub fn transform(&self, transform: &Transform3D<T>) -> MomentumMatrix<T> {
        if self.frame != transform.from {
            panic!(
                "momentum matrix {} frame is not equal to transform `from` {} frame!",
                self.frame, transform.from
            );
        }

        let rot = transform.rot();
        let linear = rot * &self.linear;
        let angular = rot * &self.angular + colwise_cross(&transform.trans(), &linear);
        MomentumMatrix {
            frame: transform.to.clone(),
            angular,
            linear,
        }
    }

    /// Momentum [angular; linear] at joint velocities v
    pub fn momentum(&self, v: &DVector<T>) -> Vector6<T> {
        let mut result = Vector6::zeros();
        result.fixed_rows_mut::<3>(0).copy_from(&(&self.angular * v));
        result.fixed_rows_mut::<3>(3).copy_from(&(&self.linear * v));
        result
    }

    /// Stacked 6 x n [angular; linear] matrix
    pub fn as_matrix(&self) -> DMatrix<T> {
        let n = self.angular.ncols();
        let mut result = DMatrix::zeros(6, n);
        result.view_mut((0, 0), (3, n)).copy_from(&self.angular);
        result.view_mut((3, 0), (3, n)).copy_from(&self.linear);
        result
    }
}

impl RigidBodyTree {
    /// Center of mass of all bodies, in world.
    /// Zero, with a one-time warning, if the tree has no mass.
    pub fn center_of_mass<T: Real>(&self, cache: &KinematicsCache<T>) -> KinematicsResult<Vector3<T>> {
        self.check_cache(cache, false, false, "center_of_mass")?;
        let mut total_mass = T::zero();
        let mut weighted = Vector3::zeros();
        for (i, body) in self.bodies.iter().enumerate() {
            let mass: T = real(body.inertia.mass);
            if mass == T::zero() {
                continue;
            }
            let transform = &cache.element(i)?.transform_to_world;
            let com_in_body = cast_vector3::<T>(&body.inertia.cross_part) / mass;
            weighted += transform.transform_point(&com_in_body) * mass;
            total_mass += mass;
        }

        if total_mass <= T::zero() {
            self.warn_zero_mass();
            return Ok(Vector3::zeros());
        }
        Ok(weighted / total_mass)
    }

    fn warn_zero_mass(&self) {
        self.warn_once(
            "zero_total_mass",
            "Tree has no mass; center of mass quantities are reported as zero",
        );
    }

    /// Maps v (or qdot) to the total momentum of the tree about the world
    /// origin, expressed in world
    pub fn world_momentum_matrix<T: Real>(
        &self,
        cache: &mut KinematicsCache<T>,
        in_terms_of_qdot: bool,
    ) -> KinematicsResult<MomentumMatrix<T>> {
        self.check_cache(cache, false, false, "world_momentum_matrix")?;
        if !cache.are_inertias_cached() {
            self.update_composite_rigid_body_inertias(cache)?;
        }

        let ncols = if in_terms_of_qdot {
            self.num_positions()
        } else {
            self.num_velocities()
        };
        let mut result = MomentumMatrix::zeros(WORLD_FRAME, ncols);
        for (i, body) in self.bodies.iter().enumerate() {
            let Some(joint) = body.joint.as_ref() else {
                continue;
            };
            let element = cache.element(i)?;
            let mut block = MomentumMatrix::mul(&element.crb_in_world, &element.motion_subspace_in_world);
            let start = if in_terms_of_qdot {
                block.angular = &block.angular * &element.qdot_to_v;
                block.linear = &block.linear * &element.qdot_to_v;
                body.position_num_start
            } else {
                body.velocity_num_start
            };
            let n = if in_terms_of_qdot {
                joint.num_positions()
            } else {
                joint.num_velocities()
            };
            result.angular.columns_mut(start, n).copy_from(&block.angular);
            result.linear.columns_mut(start, n).copy_from(&block.linear);
        }
        Ok(result)
    }

    /// Adot * v: rate of change of the world momentum at vd = 0, as a wrench
    /// in world
    pub fn world_momentum_matrix_dot_times_v<T: Real>(
        &self,
        cache: &mut KinematicsCache<T>,
    ) -> KinematicsResult<Wrench<T>> {
        self.check_cache(cache, true, true, "world_momentum_matrix_dot_times_v")?;
        if !cache.are_inertias_cached() {
            self.update_composite_rigid_body_inertias(cache)?;
        }

        let mut result = Wrench::zero(WORLD_FRAME);
        for element in cache.elements().iter().skip(1) {
            result += &newton_euler(
                &element.inertia_in_world,
                &element.twist_in_world,
                &element.motion_subspace_in_world_dot_times_v,
            );
        }
        Ok(result)
    }

    fn world_to_centroidal<T: Real>(&self, cache: &KinematicsCache<T>) -> KinematicsResult<Transform3D<T>> {
        let com = self.center_of_mass(cache)?;
        Ok(Transform3D::new(
            WORLD_FRAME,
            CENTROIDAL_FRAME,
            na::Isometry3::translation(-com.x, -com.y, -com.z),
        ))
    }

    /// Momentum matrix about the center of mass, with world orientation
    pub fn centroidal_momentum_matrix<T: Real>(
        &self,
        cache: &mut KinematicsCache<T>,
        in_terms_of_qdot: bool,
    ) -> KinematicsResult<MomentumMatrix<T>> {
        let world = self.world_momentum_matrix(cache, in_terms_of_qdot)?;
        Ok(world.transform(&self.world_to_centroidal(cache)?))
    }

    pub fn centroidal_momentum_matrix_dot_times_v<T: Real>(
        &self,
        cache: &mut KinematicsCache<T>,
    ) -> KinematicsResult<Wrench<T>> {
        let world = self.world_momentum_matrix_dot_times_v(cache)?;
        Ok(world.transform(&self.world_to_centroidal(cache)?))
    }

    /// 3 x nv (or nq) Jacobian of the center of mass, in world
    pub fn center_of_mass_jacobian<T: Real>(
        &self,
        cache: &mut KinematicsCache<T>,
        in_terms_of_qdot: bool,
    ) -> KinematicsResult<DMatrix<T>> {
        let A = self.world_momentum_matrix(cache, in_terms_of_qdot)?;
        let total_mass: T = real(self.total_mass());
        if total_mass <= T::zero() {
            self.warn_zero_mass();
            return Ok(DMatrix::zeros(3, A.linear.ncols()));
        }
        let linear = A.linear / total_mass;
        Ok(DMatrix::from_column_slice(3, linear.ncols(), linear.as_slice()))
    }

    pub fn center_of_mass_jacobian_dot_times_v<T: Real>(
        &self,
        cache: &mut KinematicsCache<T>,
    ) -> KinematicsResult<Vector3<T>> {
        let Adotv = self.world_momentum_matrix_dot_times_v(cache)?;
        let total_mass: T = real(self.total_mass());
        if total_mass <= T::zero() {
            self.warn_zero_mass();
            return Ok(Vector3::zeros());
        }
        Ok(Adotv.linear / total_mass)
    }
}

#[cfg(test)]
mod tests {
    use na::{dvector, vector, DVector, Vector6};
    use rand::{rngs::StdRng, SeedableRng};

    use crate::{
        assert_vec_close,
        helpers::{build_branching_tree, build_double_pendulum, build_floating_body},
        joint::{fixed::FixedJoint, Joint},
        rigid_body::RigidBody,
        util::test_utils::random_dvector,
    };

    use super::*;

    fn momentum_by_summation(tree: &RigidBodyTree, cache: &KinematicsCache) -> Vector6<Float> {
        let mut total = Vector6::zeros();
        for (i, body) in tree.bodies().iter().enumerate() {
            let element = cache.element(i).unwrap();
            let inertia = body.inertia.transform(&element.transform_to_world);
            let twist = &element.twist_in_world;
            let (ang, lin) = crate::util::mul_inertia(
                &inertia.moment,
                &inertia.cross_part,
                inertia.mass,
                &twist.angular,
                &twist.linear,
            );
            total += Vector6::from_iterator(ang.iter().chain(lin.iter()).copied());
        }
        total
    }

    #[test]
    fn world_momentum_is_sum_of_body_momenta() {
        // Arrange
        let tree = build_branching_tree().unwrap();
        let mut rng = StdRng::seed_from_u64(20);
        let q = tree.random_configuration(&mut rng);
        let v = random_dvector(&mut rng, tree.num_velocities(), 1.0);
        let mut cache = tree.kinematics_with_velocity(&q, &v, false).unwrap();

        // Act
        let A = tree.world_momentum_matrix(&mut cache, false).unwrap();

        // Assert
        assert_eq!(A.as_matrix().shape(), (6, tree.num_velocities()));
        assert_vec_close!(A.momentum(&v), momentum_by_summation(&tree, &cache), 1e-10);
    }

    /// With vd = 0, d/dt (A v) = Adot v
    #[test]
    fn momentum_rate_matches_finite_difference() {
        // Arrange
        let tree = build_branching_tree().unwrap();
        let mut rng = StdRng::seed_from_u64(21);
        let q = tree.random_configuration(&mut rng);
        let v = random_dvector(&mut rng, tree.num_velocities(), 1.0);
        let mut cache = tree.kinematics_with_velocity(&q, &v, true).unwrap();

        // Act
        let Adotv = tree.world_momentum_matrix_dot_times_v(&mut cache).unwrap();

        // Assert
        let h = 1e-6;
        let qdot = tree.transform_velocity_to_qdot(&cache, &v).unwrap();
        let mut cache_next = tree.kinematics_with_velocity(&(&q + qdot * h), &v, false).unwrap();
        let momentum = tree.world_momentum_matrix(&mut cache, false).unwrap().momentum(&v);
        let momentum_next = tree
            .world_momentum_matrix(&mut cache_next, false)
            .unwrap()
            .momentum(&v);
        let numerical = (momentum_next - momentum) / h;
        assert_vec_close!(numerical.fixed_rows::<3>(0), Adotv.angular, 1e-4);
        assert_vec_close!(numerical.fixed_rows::<3>(3), Adotv.linear, 1e-4);
    }

    #[test]
    fn in_terms_of_qdot_reproduces_momentum() {
        let tree = build_branching_tree().unwrap();
        let mut rng = StdRng::seed_from_u64(22);
        let q = tree.random_configuration(&mut rng);
        let v = random_dvector(&mut rng, tree.num_velocities(), 1.0);
        let mut cache = tree.kinematics_with_velocity(&q, &v, false).unwrap();
        let qdot = tree.transform_velocity_to_qdot(&cache, &v).unwrap();

        let A_v = tree.world_momentum_matrix(&mut cache, false).unwrap();
        let A_q = tree.world_momentum_matrix(&mut cache, true).unwrap();

        assert_eq!(A_q.angular.ncols(), tree.num_positions());
        assert_vec_close!(A_q.momentum(&qdot), A_v.momentum(&v), 1e-10);
    }

    #[test]
    fn center_of_mass_of_double_pendulum() {
        // Arrange
        let tree = build_double_pendulum(1.0, 1.0).unwrap();
        let q1: Float = 0.3;
        let cache = tree.kinematics(&dvector![q1, 0.0]).unwrap();

        // Act
        let com = tree.center_of_mass(&cache).unwrap();

        // Assert
        // masses at distance 1 and 2 along the same line
        assert_vec_close!(com, vector![-1.5 * q1.sin(), 0., -1.5 * q1.cos()], 1e-12);
    }

    #[test]
    fn center_of_mass_jacobian_matches_finite_difference() {
        // Arrange
        let tree = build_branching_tree().unwrap();
        let mut rng = StdRng::seed_from_u64(23);
        let q = tree.random_configuration(&mut rng);
        let v = random_dvector(&mut rng, tree.num_velocities(), 1.0);
        let mut cache = tree.kinematics_with_velocity(&q, &v, true).unwrap();

        // Act
        let J = tree.center_of_mass_jacobian(&mut cache, false).unwrap();
        let Jdotv = tree.center_of_mass_jacobian_dot_times_v(&mut cache).unwrap();

        // Assert
        let h = 1e-6;
        let qdot = tree.transform_velocity_to_qdot(&cache, &v).unwrap();
        let q_next = &q + qdot * h;
        let mut cache_next = tree.kinematics_with_velocity(&q_next, &v, false).unwrap();
        let com = tree.center_of_mass(&cache).unwrap();
        let com_next = tree.center_of_mass(&cache_next).unwrap();
        let com_velocity = &J * &v;
        assert_vec_close!(&com_velocity, (com_next - com) / h, 1e-4);

        let J_next = tree.center_of_mass_jacobian(&mut cache_next, false).unwrap();
        let numerical: DVector<Float> = (&J_next * &v - &com_velocity) / h;
        assert_vec_close!(numerical, Jdotv, 1e-4);
    }

    /// A translating body has angular momentum about the world origin but
    /// none about its own center of mass
    #[test]
    fn centroidal_momentum_of_translating_body() {
        // Arrange
        let tree = build_floating_body().unwrap();
        let q = dvector![1., 2., 3., 1., 0., 0., 0.];
        let v = dvector![0., 0., 0., 0.5, -1., 2.];
        let mut cache = tree.kinematics_with_velocity(&q, &v, true).unwrap();

        // Act
        let world = tree.world_momentum_matrix(&mut cache, false).unwrap().momentum(&v);
        let centroidal = tree.centroidal_momentum_matrix(&mut cache, false).unwrap();
        let centroidal_rate = tree.centroidal_momentum_matrix_dot_times_v(&mut cache).unwrap();

        // Assert
        let linear = vector![0.5, -1., 2.];
        assert_vec_close!(world.fixed_rows::<3>(0), vector![1., 2., 3.].cross(&linear), 1e-12);
        assert_eq!(centroidal.frame, CENTROIDAL_FRAME);
        assert_vec_close!(centroidal.momentum(&v), dvector![0., 0., 0., 0.5, -1., 2.], 1e-12);
        assert_vec_close!(centroidal_rate.angular, Vector3::<Float>::zeros(), 1e-12);
        assert_vec_close!(centroidal_rate.linear, Vector3::<Float>::zeros(), 1e-12);
    }

    #[test]
    fn massless_tree_reports_zero() {
        // Arrange
        let mut tree = RigidBodyTree::new();
        let body = RigidBody::new("ghost", SpatialInertia::zero("ghost"));
        let joint = Joint::FixedJoint(FixedJoint::new(Transform3D::move_x("ghost", WORLD_FRAME, 1.0)));
        tree.add_body(body, 0, joint).unwrap();
        let mut cache = tree
            .kinematics_with_velocity(&DVector::<Float>::zeros(0), &DVector::zeros(0), true)
            .unwrap();

        // Act
        let com = tree.center_of_mass(&cache).unwrap();
        let J = tree.center_of_mass_jacobian(&mut cache, false).unwrap();
        let Jdotv = tree.center_of_mass_jacobian_dot_times_v(&mut cache).unwrap();

        // Assert
        assert_eq!(com, Vector3::zeros());
        assert_eq!(J.shape(), (3, 0));
        assert_eq!(Jdotv, Vector3::zeros());
    }
}
