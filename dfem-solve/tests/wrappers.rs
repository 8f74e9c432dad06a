//! The cantilever design problem through both wrappers and both backends.

mod common;

use approx::assert_relative_eq;
use common::*;
use dfem::{custom, LinearMap};
use dfem_solve::fe::{Elasticity, FeProblem};
use dfem_solve::{
    ad_wrapper, ad_wrapper_jvp, residual_norm, AdjointWrapper, FieldSum, Objective, Problem,
    ReducedObjective, TangentWrapper,
};

/// Dofs of the mesh point at `(lx, 0)`, the bottom of the loaded edge.
const TIP_Y: usize = 2 * (20 * 11) + 1;

fn reduced_value(problem: &FeProblem<Elasticity>) -> impl FnMut(&[f64]) -> f64 + '_ {
    let wrapper = ad_wrapper(problem, true, false).unwrap();
    move |p: &[f64]| FieldSum.value(&wrapper.solver().solve(p).unwrap())
}

// ============================================================
// Test 1: primal solve
// ============================================================

#[test]
fn cantilever_deflects_under_tip_load() {
    let problem = cantilever();
    assert_eq!(problem.num_dofs(), 462);
    assert_eq!(problem.num_params(), 200);

    let p = uniform_design(200);
    let wrapper = ad_wrapper(&problem, true, false).unwrap();
    let u = wrapper.solver().solve(&p).unwrap();

    assert!(u[TIP_Y] < 0.0);
    // The clamped rows are solved to round-off, not pinned.
    let scale = max_abs(&u);
    for d in problem.constrained_dofs() {
        assert!(u[d].abs() <= 1e-10 * scale, "clamped dof {d} moved: {}", u[d]);
    }
    assert!(residual_norm(&problem, &u, &p) < 1e-8);
}

#[test]
fn linear_flag_matches_newton_on_affine_residual() {
    let problem = cantilever();
    let p = graded_design(200);
    let one_step = ad_wrapper(&problem, true, false).unwrap();
    let newton = ad_wrapper(&problem, false, false).unwrap();
    let u1 = one_step.solver().solve(&p).unwrap();
    let u2 = newton.solver().solve(&p).unwrap();
    assert_relative_eq!(u2[..], u1[..], epsilon = 1e-12 * max_abs(&u1), max_relative = 1e-9);
}

#[test]
fn solved_state_passes_equilibrium_check() {
    let problem = cantilever();
    let p = graded_design(200);
    let wrapper = ad_wrapper(&problem, true, false).unwrap();
    let solver = wrapper.solver();
    let u = solver.solve(&p).unwrap();
    // Two loaded nodes share the tip traction.
    assert_relative_eq!(problem.residual_scale(&p), 50.0 * 2f64.sqrt(), max_relative = 1e-12);
    assert_eq!(solver.equilibrium_defect(&u, &p), None);

    let mut moved = u.clone();
    moved[TIP_Y] += 1e-3;
    let defect = solver.equilibrium_defect(&moved, &p).unwrap();
    assert_relative_eq!(defect, residual_norm(&problem, &moved, &p));
}

// ============================================================
// Test 2: gradient of Σu at the uniform design
// ============================================================

#[test]
fn adjoint_gradient_matches_finite_differences() {
    let problem = cantilever();
    let p = uniform_design(200);
    let wrapper = ad_wrapper(&problem, true, false).unwrap();
    let mut reduced = ReducedObjective::new(&wrapper, FieldSum);
    let (value, grad) = reduced.eval_grad(&p).unwrap();
    assert_eq!(grad.len(), 200);
    assert!(grad.iter().all(|g| g.is_finite()));

    let mut f = reduced_value(&problem);
    assert_eq!(f(&p), value);
    let fd: Vec<f64> = (0..200).map(|i| central_difference(&mut f, &p, i)).collect();
    assert_relative_eq!(grad[..], fd[..], epsilon = 1e-6 * max_abs(&fd), max_relative = 1e-5);
}

#[test]
fn transposed_tangent_gradient_matches_finite_differences() {
    let problem = cantilever();
    let p = uniform_design(200);
    let wrapper = ad_wrapper_jvp(&problem, true, false).unwrap();
    let (_, grad) = ReducedObjective::new(&wrapper, FieldSum).eval_grad(&p).unwrap();

    let mut f = reduced_value(&problem);
    let scale = max_abs(&grad);
    for i in [0, 7, 42, 99, 150, 199] {
        let fd = central_difference(&mut f, &p, i);
        assert!(
            (grad[i] - fd).abs() <= 1e-5 * fd.abs() + 1e-6 * scale,
            "component {i}: {} vs {fd}",
            grad[i]
        );
    }
    for seed in 0..3 {
        let v = direction(200, seed);
        let fd = directional_difference(&mut f, &p, &v);
        assert!((dot(&grad, &v) - fd).abs() <= 1e-5 * fd.abs() + 1e-6 * scale);
    }
}

#[test]
fn both_wrappers_give_the_same_gradient() {
    let problem = cantilever();
    let p = graded_design(200);
    let adjoint = ad_wrapper(&problem, true, false).unwrap();
    let tangent = ad_wrapper_jvp(&problem, true, false).unwrap();
    let (va, ga) = ReducedObjective::new(&adjoint, FieldSum).eval_grad(&p).unwrap();
    let (vt, gt) = ReducedObjective::new(&tangent, FieldSum).eval_grad(&p).unwrap();
    assert_eq!(va, vt);
    assert_relative_eq!(gt[..], ga[..], epsilon = 1e-12 * max_abs(&ga), max_relative = 1e-10);
}

// ============================================================
// Test 3: tangent rule
// ============================================================

#[test]
fn tangent_matches_finite_difference_of_solution() {
    let problem = cantilever();
    let p = uniform_design(200);
    let wrapper = ad_wrapper_jvp(&problem, true, false).unwrap();
    let v = direction(200, 11);
    let (u, u_dot) = custom::jvp(&wrapper, &p, &v).unwrap();
    assert_eq!(u, wrapper.solver().solve(&p).unwrap());

    let mut solve = |q: &[f64]| wrapper.solver().solve(q).unwrap();
    let fd = directional_difference_vec(&mut solve, &p, &v);
    assert_relative_eq!(u_dot[..], fd[..], epsilon = 1e-6 * max_abs(&fd), max_relative = 1e-5);
}

#[test]
fn dot_product_test() {
    let problem = cantilever();
    let p = graded_design(200);
    let wrapper = ad_wrapper_jvp(&problem, true, false).unwrap();
    let v = direction(200, 3);
    let w = direction(462, 4);
    let (_, jv) = custom::jvp(&wrapper, &p, &v).unwrap();
    let (_, jtw) = custom::vjp(&wrapper, &p, &w).unwrap();
    let (lhs, rhs) = (dot(&w, &jv), dot(&jtw, &v));
    assert!((lhs - rhs).abs() <= 1e-10 * lhs.abs().max(rhs.abs()));
}

// ============================================================
// Test 4: adjoint consistency
// ============================================================

#[test]
fn adjoint_vector_is_transpose_sensitivity_solve() {
    let problem = cantilever();
    let p = uniform_design(200);
    let adjoint = ad_wrapper(&problem, true, false).unwrap();
    let tangent = ad_wrapper_jvp(&problem, true, false).unwrap();
    let u = adjoint.solver().solve(&p).unwrap();
    let u_bar = vec![1.0; 462];

    let lambda = adjoint.adjoint_vector(&u, &p, &u_bar).unwrap();
    let op = tangent.sensitivity_operator(&u, &p).unwrap();
    let lambda_t = op.apply_transpose(&u_bar).unwrap();
    assert_relative_eq!(
        lambda[..],
        lambda_t[..],
        epsilon = 1e-14 * max_abs(&lambda),
        max_relative = 1e-12
    );

    // Jᵀ λ = ū
    let residual = op.matrix().transpose_matvec(&lambda);
    assert_relative_eq!(residual[..], u_bar[..], epsilon = 1e-8, max_relative = 0.0);

    let (_, p_bar_a) = custom::vjp(&adjoint, &p, &u_bar).unwrap();
    let (_, p_bar_t) = custom::vjp(&tangent, &p, &u_bar).unwrap();
    assert_relative_eq!(
        p_bar_t[..],
        p_bar_a[..],
        epsilon = 1e-12 * max_abs(&p_bar_a),
        max_relative = 1e-10
    );
}

// ============================================================
// Test 5: determinism and sharing
// ============================================================

#[test]
fn repeated_gradients_are_identical() {
    let problem = cantilever();
    let p = uniform_design(200);
    let wrapper = ad_wrapper(&problem, true, false).unwrap();
    let mut reduced = ReducedObjective::new(&wrapper, FieldSum);
    let first = reduced.eval_grad(&p).unwrap();
    let second = reduced.eval_grad(&p).unwrap();
    assert_eq!(first, second);
    assert_eq!(reduced.func_evals(), 2);
}

#[test]
fn wrappers_are_shareable_across_threads() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<AdjointWrapper<'static, FeProblem<Elasticity>>>();
    assert_send_sync::<TangentWrapper<'static, FeProblem<Elasticity>>>();

    let problem = cantilever();
    let p = graded_design(200);
    let wrapper = ad_wrapper_jvp(&problem, true, false).unwrap();
    let reference = ReducedObjective::new(&wrapper, FieldSum).eval_grad(&p).unwrap();
    let (w, p) = (&wrapper, &p);
    std::thread::scope(|s| {
        let handles: Vec<_> = (0..2)
            .map(|_| s.spawn(move || ReducedObjective::new(w, FieldSum).eval_grad(p).unwrap()))
            .collect();
        for h in handles {
            assert_eq!(h.join().unwrap(), reference);
        }
    });
}

// ============================================================
// Test 6: backend equivalence
// ============================================================

#[cfg(feature = "parallel")]
mod parallel {
    use super::*;

    #[test]
    fn backends_agree_on_solution_and_gradient() {
        let problem = cantilever();
        let p = uniform_design(200);
        let native = ad_wrapper(&problem, true, false).unwrap();
        let parallel = ad_wrapper(&problem, true, true).unwrap();
        assert!(parallel.solver().backend().is_parallel());

        let u_native = native.solver().solve(&p).unwrap();
        let u_parallel = parallel.solver().solve(&p).unwrap();
        assert_relative_eq!(
            u_parallel[..],
            u_native[..],
            epsilon = 1e-10 * max_abs(&u_native),
            max_relative = 1e-9
        );

        let (v_native, g_native) = ReducedObjective::new(&native, FieldSum).eval_grad(&p).unwrap();
        let (v_parallel, g_parallel) =
            ReducedObjective::new(&parallel, FieldSum).eval_grad(&p).unwrap();
        assert_relative_eq!(v_parallel, v_native, max_relative = 1e-9);
        assert_relative_eq!(
            g_parallel[..],
            g_native[..],
            epsilon = 1e-10 * max_abs(&g_native),
            max_relative = 1e-9
        );
    }

    #[test]
    fn transposed_tangent_agrees_across_backends() {
        let problem = cantilever();
        let p = graded_design(200);
        let native = ad_wrapper_jvp(&problem, true, false).unwrap();
        let parallel = ad_wrapper_jvp(&problem, true, true).unwrap();
        let (_, g_native) = ReducedObjective::new(&native, FieldSum).eval_grad(&p).unwrap();
        let (_, g_parallel) = ReducedObjective::new(&parallel, FieldSum).eval_grad(&p).unwrap();
        assert_relative_eq!(
            g_parallel[..],
            g_native[..],
            epsilon = 1e-10 * max_abs(&g_native),
            max_relative = 1e-9
        );
    }

    #[test]
    fn parallel_gradients_match_finite_differences() {
        // Small enough that GMRES runs to the full Krylov space.
        let problem = dfem_solve::fe::cantilever(8, 4, 8.0, 4.0).unwrap();
        let p = graded_design(32);
        let adjoint = ad_wrapper(&problem, true, true).unwrap();
        let tangent = ad_wrapper_jvp(&problem, true, true).unwrap();
        let (_, g_adjoint) = ReducedObjective::new(&adjoint, FieldSum).eval_grad(&p).unwrap();
        let (_, g_tangent) = ReducedObjective::new(&tangent, FieldSum).eval_grad(&p).unwrap();

        let mut f = |q: &[f64]| FieldSum.value(&adjoint.solver().solve(q).unwrap());
        let fd: Vec<f64> = (0..32).map(|i| central_difference(&mut f, &p, i)).collect();
        assert_relative_eq!(
            g_adjoint[..],
            fd[..],
            epsilon = 1e-6 * max_abs(&fd),
            max_relative = 1e-5
        );
        assert_relative_eq!(
            g_tangent[..],
            fd[..],
            epsilon = 1e-6 * max_abs(&fd),
            max_relative = 1e-5
        );
    }

    #[test]
    fn parallel_gradients_are_repeatable() {
        let problem = cantilever();
        let p = uniform_design(200);
        let wrapper = ad_wrapper(&problem, true, true).unwrap();
        let mut reduced = ReducedObjective::new(&wrapper, FieldSum);
        let first = reduced.eval_grad(&p).unwrap();
        let second = reduced.eval_grad(&p).unwrap();
        assert_eq!(first, second);
    }
}
