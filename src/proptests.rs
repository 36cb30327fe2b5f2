//! Property-based tests for elimination, back-substitution and conditioning.

#[cfg(test)]
mod tests {
    use alloc::collections::BTreeSet;
    use alloc::vec;
    use alloc::vec::Vec;

    use proptest::prelude::*;

    use crate::{
        condition_bayes_net, DynMatrix, DynVector, EliminationSettings, GaussianFactorGraph, Key, NoiseModel,
        Ordering,
    };

    const DIM: usize = 2;

    // A 2-dim pose chain: prior on 0, perturbed odometry i -> i+1, and one
    // loop closure 0 -> n-1. Full rank for any perturbation below 0.5.
    fn build(perturb: &[f64], rhs: &[f64], sigmas: &[f64], n: usize) -> GaussianFactorGraph<f64> {
        let eye = DynMatrix::<f64>::eye(DIM);
        let minus_eye = -&eye;
        let b = |i: usize| DynVector::from_slice(&rhs[DIM * i..DIM * (i + 1)]);
        let model = |i: usize| Some(NoiseModel::isotropic(DIM, sigmas[i]));

        let mut graph = GaussianFactorGraph::new();
        graph.add_jacobian(vec![(0, eye.clone())], b(0), model(0)).unwrap();
        for i in 0..n - 1 {
            let p = DynMatrix::from_rows(DIM, DIM, &perturb[4 * i..4 * i + 4]);
            let a = &eye + &p;
            graph
                .add_jacobian(vec![(i as Key, minus_eye.clone()), (i as Key + 1, a)], b(i + 1), model(i + 1))
                .unwrap();
        }
        graph
            .add_jacobian(vec![(0, eye.clone()), (n as Key - 1, minus_eye)], b(n), model(n))
            .unwrap();
        graph
    }

    // Random chain plus a random elimination order over its keys.
    fn chain_graph() -> impl Strategy<Value = (GaussianFactorGraph<f64>, Vec<Key>)> {
        (2usize..7)
            .prop_flat_map(|n| {
                (
                    proptest::collection::vec(-0.3f64..0.3, 4 * n),
                    proptest::collection::vec(-5.0f64..5.0, DIM * (n + 1)),
                    proptest::collection::vec(0.5f64..2.0, n + 1),
                    Just((0..n as Key).collect::<Vec<_>>()).prop_shuffle(),
                )
            })
            .prop_map(|(perturb, rhs, sigmas, order)| {
                let graph = build(&perturb, &rhs, &sigmas, order.len());
                (graph, order)
            })
    }

    proptest! {
        #[test]
        fn solution_independent_of_ordering((graph, order) in chain_graph()) {
            let settings = EliminationSettings::default();
            let natural = Ordering::natural(graph.keys());
            let shuffled = Ordering::new(order).unwrap();
            let x1 = graph.optimize(&natural, &settings).unwrap();
            let x2 = graph.optimize(&shuffled, &settings).unwrap();
            prop_assert!(x1.max_abs_diff(&x2) < 1e-8, "diff {}", x1.max_abs_diff(&x2));
        }

        #[test]
        fn determinant_independent_of_ordering((graph, order) in chain_graph()) {
            let settings = EliminationSettings::default();
            let a = graph.eliminate_sequential(&Ordering::natural(graph.keys()), &settings).unwrap();
            let b = graph.eliminate_sequential(&Ordering::new(order).unwrap(), &settings).unwrap();
            // Householder elimination gives a positive diagonal, so only the magnitude can differ.
            prop_assert!(a.determinant() > 0.0);
            prop_assert!((a.log_determinant() - b.log_determinant()).abs() < 1e-9);
        }

        #[test]
        fn gradient_vanishes_at_optimum((graph, order) in chain_graph()) {
            let x = graph.optimize(&Ordering::new(order).unwrap(), &EliminationSettings::default()).unwrap();
            let g = graph.gradient(&x).unwrap();
            prop_assert!(g.norm() < 1e-7, "gradient norm {}", g.norm());
        }

        #[test]
        fn cauchy_point_never_increases_error((graph, order) in chain_graph()) {
            let net = graph.eliminate_sequential(&Ordering::new(order).unwrap(), &EliminationSettings::default()).unwrap();
            let step = net.optimize_gradient_search().unwrap();
            let zero = step.zero_like();
            prop_assert!(net.error(&step).unwrap() <= net.error(&zero).unwrap() + 1e-12);
        }

        #[test]
        fn conditioning_preserves_retained_values((graph, order) in chain_graph(), keep in 1usize..4) {
            let net = graph.eliminate_sequential(&Ordering::new(order.clone()).unwrap(), &EliminationSettings::default()).unwrap();
            let x = net.optimize().unwrap();
            let saved: BTreeSet<Key> = order.iter().take(keep).copied().collect();
            let reduced = condition_bayes_net(&net, &saved, &x).unwrap();
            let y = reduced.optimize().unwrap();
            prop_assert_eq!(y.keys().collect::<BTreeSet<_>>(), saved);
            prop_assert!(x.max_abs_diff(&y) < 1e-9);
        }
    }
}
