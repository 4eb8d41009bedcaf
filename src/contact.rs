use na::{DMatrix, Matrix3xX, Vector3};

use crate::{
    error::{KinematicsError, KinematicsResult},
    kinematics::RotationType,
    kinematics_cache::KinematicsCache,
    rigid_body::BodyOrFrameId,
    spatial::transform::Transform3D,
    tree::RigidBodyTree,
    types::{Float, Real},
    util::cast_vector3,
};

#[derive(Clone, PartialEq, Debug)]
pub struct ContactPoint {
    pub frame: String, // the body frame the contact point is expressed in
    pub location: Vector3<Float>,
}

impl ContactPoint {
    pub fn new(frame: &str, location: Vector3<Float>) -> Self {
        ContactPoint {
            frame: frame.to_string(),
            location,
        }
    }

    /// Location of the contact point expressed in the "to" frame of transform
    pub fn transform<T: Real>(&self, transform: &Transform3D<T>) -> Vector3<T> {
        if self.frame != transform.from {
            panic!(
                "current frame {} != transform from frame {}",
                self.frame, transform.from
            );
        }
        transform.transform_point(&cast_vector3(&self.location))
    }
}

impl RigidBodyTree {
    pub fn add_contact_point(
        &mut self,
        body: usize,
        contact_point: ContactPoint,
    ) -> KinematicsResult<()> {
        self.bodies
            .get_mut(body)
            .ok_or(KinematicsError::UnknownBody(body))?
            .add_contact_point(contact_point)
    }

    /// The given bodies, or every body when `bodies` is None
    fn contact_bodies(&self, bodies: Option<&[usize]>) -> KinematicsResult<Vec<usize>> {
        match bodies {
            Some(bodies) => {
                for &body in bodies {
                    self.body(body)?;
                }
                Ok(bodies.to_vec())
            }
            None => Ok((0..self.num_bodies()).collect()),
        }
    }

    pub fn num_contacts(&self, bodies: Option<&[usize]>) -> KinematicsResult<usize> {
        Ok(self
            .contact_bodies(bodies)?
            .into_iter()
            .map(|body| self.bodies[body].contact_points.len())
            .sum())
    }

    /// World positions of the contact points of `bodies`, one column per
    /// contact, bodies in the given order
    pub fn contact_positions<T: Real>(
        &self,
        cache: &KinematicsCache<T>,
        bodies: Option<&[usize]>,
    ) -> KinematicsResult<Matrix3xX<T>> {
        self.check_cache(cache, false, false, "contact_positions")?;
        let bodies = self.contact_bodies(bodies)?;
        let mut positions = Matrix3xX::zeros(self.num_contacts(Some(bodies.as_slice()))?);
        let mut col = 0;
        for body in bodies {
            let to_world = &cache.element(body)?.transform_to_world;
            for contact_point in &self.bodies[body].contact_points {
                positions
                    .column_mut(col)
                    .copy_from(&contact_point.transform(to_world));
                col += 1;
            }
        }
        Ok(positions)
    }

    /// Jacobian of the stacked `contact_positions`, 3 rows per contact
    pub fn contact_positions_jacobian<T: Real>(
        &self,
        cache: &KinematicsCache<T>,
        bodies: Option<&[usize]>,
        in_terms_of_qdot: bool,
    ) -> KinematicsResult<DMatrix<T>> {
        self.check_cache(cache, false, false, "contact_positions_jacobian")?;
        let bodies = self.contact_bodies(bodies)?;
        let num_rows = 3 * self.num_contacts(Some(bodies.as_slice()))?;
        let mut J = DMatrix::zeros(num_rows, self.num_columns(in_terms_of_qdot));
        let mut row = 0;
        for body in bodies {
            let contact_points = &self.bodies[body].contact_points;
            if contact_points.is_empty() {
                continue;
            }
            let points = Matrix3xX::from_columns(
                &contact_points
                    .iter()
                    .map(|contact_point| cast_vector3::<T>(&contact_point.location))
                    .collect::<Vec<_>>(),
            );
            let body_jacobian = self.forward_kin_jacobian(
                cache,
                &points,
                body,
                0usize,
                RotationType::None,
                in_terms_of_qdot,
            )?;
            J.rows_mut(row, body_jacobian.nrows()).copy_from(&body_jacobian);
            row += body_jacobian.nrows();
        }
        Ok(J)
    }

    /// For contact k between point `x_a[k]` on body `idx_a[k]` and point
    /// `x_b[k]` on body `idx_b[k]`, both in body coordinates, rows 3k..3k+3
    /// hold the Jacobian of the world-frame separation, J_A - J_B.
    pub fn compute_contact_jacobians<T: Real>(
        &self,
        cache: &KinematicsCache<T>,
        idx_a: &[usize],
        idx_b: &[usize],
        x_a: &Matrix3xX<T>,
        x_b: &Matrix3xX<T>,
        in_terms_of_qdot: bool,
    ) -> KinematicsResult<DMatrix<T>> {
        self.check_cache(cache, false, false, "compute_contact_jacobians")?;
        let n = idx_a.len();
        for (what, len) in [("idx_b", idx_b.len()), ("x_a", x_a.ncols()), ("x_b", x_b.ncols())] {
            if len != n {
                return Err(KinematicsError::dimension(what, n, len));
            }
        }

        let mut J = DMatrix::zeros(3 * n, self.num_columns(in_terms_of_qdot));
        for k in 0..n {
            let point_a = Matrix3xX::from_columns(&[x_a.column(k).into_owned()]);
            let point_b = Matrix3xX::from_columns(&[x_b.column(k).into_owned()]);
            let J_a = self.forward_kin_jacobian(
                cache,
                &point_a,
                BodyOrFrameId::Body(idx_a[k]),
                0usize,
                RotationType::None,
                in_terms_of_qdot,
            )?;
            let J_b = self.forward_kin_jacobian(
                cache,
                &point_b,
                BodyOrFrameId::Body(idx_b[k]),
                0usize,
                RotationType::None,
                in_terms_of_qdot,
            )?;
            J.rows_mut(3 * k, 3).copy_from(&(J_a - J_b));
        }
        Ok(J)
    }

    fn num_columns(&self, in_terms_of_qdot: bool) -> usize {
        if in_terms_of_qdot {
            self.num_positions()
        } else {
            self.num_velocities()
        }
    }
}
