use std::collections::HashMap;

use gorilla_kinematics::{
    error::KinematicsResult, helpers::build_double_pendulum, na::dvector, types::Float,
};

/// Swing a double pendulum with semi-implicit Euler steps and watch its
/// total energy drift
pub fn main() -> KinematicsResult<()> {
    let m = 1.0;
    let l: Float = 1.0;
    let tree = build_double_pendulum(m, l)?;

    let mut q = dvector![1., 1.];
    let mut v = dvector![1., 1.];
    let tau = dvector![0., 0.];
    let f_ext = HashMap::new();

    let final_time = 5.0;
    let dt = 1e-3;
    let num_steps = (final_time / dt) as usize;
    for step in 0..num_steps {
        let mut cache = tree.kinematics_with_velocity(&q, &v, true)?;
        if step % 500 == 0 {
            let energy = tree.kinetic_energy(&cache)? + tree.potential_energy(&cache)?;
            let tip = tree.center_of_mass(&cache)?;
            println!(
                "t = {:.2}, q = [{:.4}, {:.4}], energy = {:.6}, com = [{:.4}, {:.4}, {:.4}]",
                step as Float * dt,
                q[0],
                q[1],
                energy,
                tip.x,
                tip.y,
                tip.z
            );
        }

        let vd = tree.forward_dynamics(&mut cache, &tau, &f_ext)?;
        v += vd * dt;
        q += &v * dt;
    }
    Ok(())
}
