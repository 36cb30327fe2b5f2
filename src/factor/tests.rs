use alloc::borrow::Cow;
use alloc::vec;
use alloc::vec::Vec;

use super::*;
use crate::conditional::GaussianConditional;
use crate::dynmatrix::VerticalBlockMatrix;
use crate::eliminate::{eliminate_qr, EliminationSettings};
use crate::noise::NoiseModel;
use crate::{DynMatrix, DynVector};

fn assert_matrix_near(actual: &DynMatrix<f64>, expected: &DynMatrix<f64>, tol: f64, what: &str) {
    assert_eq!(actual.nrows(), expected.nrows(), "{}: row count", what);
    assert_eq!(actual.ncols(), expected.ncols(), "{}: column count", what);
    for i in 0..expected.nrows() {
        for j in 0..expected.ncols() {
            let (a, e) = (actual[(i, j)], expected[(i, j)]);
            assert!((a - e).abs() < tol, "{} ({}, {}): {} vs {}", what, i, j, a, e);
        }
    }
}

fn assert_slice_near(actual: &[f64], expected: &[f64], tol: f64, what: &str) {
    assert_eq!(actual.len(), expected.len(), "{}: length", what);
    for (i, (a, e)) in actual.iter().zip(expected).enumerate() {
        assert!((a - e).abs() < tol, "{} [{}]: {} vs {}", what, i, a, e);
    }
}

fn values(entries: &[(Key, &[f64])]) -> VectorValues<f64> {
    entries.iter().map(|&(k, v)| (k, DynVector::from_slice(v))).collect()
}

/// Keys 5, 10, 15 with blocks I, 2I, 3I; b = [1, 2, 3]; sigma 0.5.
fn simple_terms() -> Vec<(Key, DynMatrix<f64>)> {
    vec![
        (5, DynMatrix::eye(3)),
        (10, DynMatrix::scaled_eye(3, 2.0)),
        (15, DynMatrix::scaled_eye(3, 3.0)),
    ]
}

fn simple_b() -> DynVector<f64> {
    DynVector::from_slice(&[1.0, 2.0, 3.0])
}

fn simple_noise() -> Option<NoiseModel<f64>> {
    Some(NoiseModel::diagonal(vec![0.5, 0.5, 0.5]))
}

fn simple() -> JacobianFactor<f64> {
    JacobianFactor::new(simple_terms(), simple_b(), simple_noise()).unwrap()
}

#[test]
fn constructors_and_accessors() {
    let b = simple_b();
    let terms = simple_terms();

    // RHS only
    let expected = JacobianFactor::new(vec![], b.clone(), None).unwrap();
    let actual = JacobianFactor::from_rhs(b.clone());
    assert_eq!(expected, actual);
    assert_eq!(actual.b(), b);
    assert!(actual.model().is_none());
    assert!(actual.keys().is_empty());

    // one term
    let expected = JacobianFactor::new(terms[..1].to_vec(), b.clone(), simple_noise()).unwrap();
    let actual = JacobianFactor::unary(5, terms[0].1.clone(), b.clone(), simple_noise()).unwrap();
    assert_eq!(expected, actual);
    assert_eq!(actual.keys().last(), Some(&5));
    assert_eq!(actual.a(0).to_matrix(), terms[0].1);
    assert_eq!(actual.b(), b);
    assert_eq!(actual.model(), simple_noise().as_ref());

    // two terms
    let expected = JacobianFactor::new(terms[..2].to_vec(), b.clone(), simple_noise()).unwrap();
    let actual =
        JacobianFactor::binary(5, terms[0].1.clone(), 10, terms[1].1.clone(), b.clone(), simple_noise()).unwrap();
    assert_eq!(expected, actual);
    assert_eq!(actual.keys().last(), Some(&10));
    assert_eq!(actual.a(1).to_matrix(), terms[1].1);
    assert_eq!(actual.dim(10), Some(3));

    // pre-assembled block matrix
    let expected = simple();
    let mut ab = VerticalBlockMatrix::zeros(&[3, 3, 3, 1], 3);
    for (i, (_, a)) in terms.iter().enumerate() {
        ab.set_block(i, 0, a);
    }
    ab.set_column_block(3, 0, b.as_slice());
    let actual = JacobianFactor::from_blocks(vec![5, 10, 15], ab, simple_noise()).unwrap();
    assert_eq!(expected, actual);
    assert_eq!(actual.keys().last(), Some(&15));
    assert_eq!(actual.a_for(15).unwrap().to_matrix(), terms[2].1);
    assert!(actual.a_for(99).is_none());
}

#[test]
fn construction_errors() {
    let b = DynVector::from_slice(&[1.0, 2.0]);
    assert_eq!(
        JacobianFactor::new(vec![(1, DynMatrix::eye(2)), (1, DynMatrix::eye(2))], b.clone(), None),
        Err(InferenceError::DuplicateKey(1))
    );
    assert_eq!(
        JacobianFactor::new(vec![(1, DynMatrix::eye(3))], b.clone(), None),
        Err(InferenceError::RowMismatch { expected: 2, got: 3 })
    );
    assert_eq!(
        JacobianFactor::unary(1, DynMatrix::eye(2), b, Some(NoiseModel::unit(3))),
        Err(InferenceError::RowMismatch { expected: 2, got: 3 })
    );
}

#[test]
fn construct_from_graph() {
    let iso = |sigma| Some(NoiseModel::isotropic(2, sigma));
    let eye = DynMatrix::<f64>::eye(2);
    let scaled = |s| DynMatrix::<f64>::scaled_eye(2, s);

    let b1 = [2.0, -1.0];
    let b2 = [4.0, -5.0];
    let b3 = [3.0, -6.0];
    let f1 = JacobianFactor::unary(10, eye.clone(), DynVector::from_slice(&b1), iso(0.1)).unwrap();
    let f2 = JacobianFactor::binary(10, scaled(-2.0), 8, scaled(3.0), DynVector::from_slice(&b2), iso(0.5)).unwrap();
    let f3 = JacobianFactor::binary(8, scaled(-4.0), 12, scaled(5.0), DynVector::from_slice(&b3), iso(1.0)).unwrap();

    let zero = DynMatrix::zeros(2, 2);
    let a1 = DynMatrix::vstack(&[&eye, &scaled(-2.0), &zero]);
    let a2 = DynMatrix::vstack(&[&zero, &scaled(3.0), &scaled(-4.0)]);
    let a3 = DynMatrix::vstack(&[&zero, &zero, &scaled(5.0)]);
    let b: Vec<f64> = b1.iter().chain(&b2).chain(&b3).copied().collect();
    let expected = JacobianFactor::new(
        vec![(10, a1), (8, a2), (12, a3)],
        DynVector::from_slice(&b),
        Some(NoiseModel::diagonal(vec![0.1, 0.1, 0.5, 0.5, 1.0, 1.0])),
    )
    .unwrap();

    let actual = JacobianFactor::combine(&[&f1, &f2, &f3], &[10, 8, 12]).unwrap();
    assert_eq!(expected, actual);
}

#[test]
fn combine_orders_unrequested_keys_by_appearance() {
    let f1 = JacobianFactor::binary(
        3,
        DynMatrix::eye(1),
        7,
        DynMatrix::eye(1),
        DynVector::from_slice(&[1.0]),
        None,
    )
    .unwrap();
    let f2 = JacobianFactor::binary(
        4,
        DynMatrix::eye(1),
        3,
        DynMatrix::eye(1),
        DynVector::from_slice(&[2.0]),
        None,
    )
    .unwrap();
    let combined = JacobianFactor::combine(&[&f1, &f2], &[4]).unwrap();
    assert_eq!(combined.keys(), &[4, 3, 7]);
    assert!(combined.model().is_none());
    assert_eq!(combined.b().as_slice(), &[1.0, 2.0]);

    assert_eq!(
        JacobianFactor::combine(&[&f1], &[9]),
        Err(InferenceError::UnknownVariable(9))
    );
    let wide = JacobianFactor::unary(3, DynMatrix::eye(2), DynVector::zeros(2), None).unwrap();
    assert!(matches!(
        JacobianFactor::combine(&[&f1, &wide], &[3]),
        Err(InferenceError::DimensionMismatch { key: 3, expected: 1, got: 2 })
    ));
}

#[test]
fn error() {
    let factor = simple();
    let x = values(&[(5, &[1.0; 3]), (10, &[0.5; 3]), (15, &[1.0 / 3.0; 3])]);

    let unwhitened = factor.unweighted_error(&x).unwrap();
    assert_slice_near(unwhitened.as_slice(), &[2.0, 1.0, 0.0], 1e-12, "unwhitened");

    let whitened = factor.error_vector(&x).unwrap();
    assert_slice_near(whitened.as_slice(), &[4.0, 2.0, 0.0], 1e-12, "whitened");

    let expected = 0.5 * (16.0 + 4.0);
    assert!((factor.error(&x).unwrap() - expected).abs() < 1e-10);

    let missing = values(&[(5, &[1.0; 3])]);
    assert_eq!(factor.error(&missing), Err(InferenceError::MissingValue(10)));
}

#[test]
fn matrices() {
    let factor = simple();
    let terms = simple_terms();
    let a_ref: Vec<&DynMatrix<f64>> = terms.iter().map(|(_, a)| a).collect();

    let mut jacobian = DynMatrix::zeros(3, 9);
    for (i, a) in a_ref.iter().enumerate() {
        jacobian.set_block(0, 3 * i, *a);
    }
    let mut augmented = DynMatrix::zeros(3, 10);
    augmented.set_block(0, 0, &jacobian);
    augmented.set_block(0, 9, &DynMatrix::from_rows(3, 1, simple_b().as_slice()));

    // W = I / 0.5
    let w_aug = &augmented * 2.0;
    let hessian = &w_aug.transpose() * &w_aug;

    assert_matrix_near(&factor.information(), &hessian.block(0, 0, 9, 9), 1e-12, "information");
    assert_matrix_near(&factor.augmented_information(), &hessian, 1e-12, "augmented information");

    let (a, b) = factor.jacobian(true);
    assert_matrix_near(&a, &(&jacobian * 2.0), 1e-12, "whitened A");
    assert_slice_near(b.as_slice(), &[2.0, 4.0, 6.0], 1e-12, "whitened b");
    assert_matrix_near(&factor.augmented_jacobian(true), &w_aug, 1e-12, "whitened [A b]");

    let (a, b) = factor.jacobian(false);
    assert_eq!(a, jacobian);
    assert_eq!(b, simple_b());
    assert_eq!(factor.augmented_jacobian(false), augmented);
}

#[test]
fn operators() {
    let model = Some(NoiseModel::isotropic(2, 0.1));
    let eye = DynMatrix::<f64>::eye(2);
    let lf = JacobianFactor::binary(1, -&eye, 2, eye.clone(), DynVector::from_slice(&[0.2, -0.1]), model).unwrap();

    let c = values(&[(1, &[10.0, 20.0]), (2, &[30.0, 60.0])]);

    let e = lf.multiply(&c).unwrap();
    assert_slice_near(e.as_slice(), &[200.0, 400.0], 1e-9, "A*x");

    let mut x = c.zero_like();
    lf.transpose_multiply_add(1.0, &e, &mut x);
    assert_slice_near(x.at(1).unwrap().as_slice(), &[-2000.0, -4000.0], 1e-9, "x1");
    assert_slice_near(x.at(2).unwrap().as_slice(), &[2000.0, 4000.0], 1e-9, "x2");

    // missing keys start at zero
    let mut fresh = VectorValues::new();
    lf.transpose_multiply_add(1.0, &e, &mut fresh);
    assert_eq!(fresh, x);
}

#[test]
fn gradient_is_at_w_e() {
    let factor = simple();
    let x = values(&[(5, &[1.0; 3]), (10, &[0.5; 3]), (15, &[1.0 / 3.0; 3])]);
    let mut g = VectorValues::new();
    factor.gradient_add(&x, &mut g).unwrap();
    // AᵀWᵀW(Ax - b) = A_kᵀ·(4·[2, 1, 0]), A_k = k·I
    assert_slice_near(g.at(5).unwrap().as_slice(), &[8.0, 4.0, 0.0], 1e-12, "g5");
    assert_slice_near(g.at(10).unwrap().as_slice(), &[16.0, 8.0, 0.0], 1e-12, "g10");
    assert_slice_near(g.at(15).unwrap().as_slice(), &[24.0, 12.0, 0.0], 1e-12, "g15");
}

#[test]
fn default_error() {
    let f = JacobianFactor::<f64>::empty();
    assert_eq!(f.error(&VectorValues::new()).unwrap(), 0.0);
}

#[test]
fn empty() {
    let f = JacobianFactor::<f64>::empty();
    assert!(f.is_empty());
    assert!(!simple().is_empty());
}

#[test]
fn whiten_keeps_constraints() {
    let f = JacobianFactor::unary(
        1,
        DynMatrix::eye(2),
        DynVector::from_slice(&[1.0, 1.0]),
        Some(NoiseModel::mixed(vec![0.0, 0.5])),
    )
    .unwrap();
    let w = f.whiten();
    assert_eq!(w.model().unwrap().sigmas(), &[0.0, 1.0]);
    assert_eq!(w.b().as_slice(), &[1.0, 2.0]);
    assert!(simple().whiten().model().is_none());
}

#[test]
fn eliminate() {
    let diag3 = |v: f64| DynMatrix::<f64>::scaled_eye(3, v);
    let rhs = |v: f64| DynVector::from_slice(&[v; 3]);
    let sigmas = |s: f64| Some(NoiseModel::diagonal(vec![s; 3]));

    let f0 = JacobianFactor::unary(1, diag3(1.0), rhs(1.5), sigmas(1.6)).unwrap();
    let f1 = JacobianFactor::binary(0, diag3(2.0), 1, diag3(-2.0), rhs(2.5), sigmas(2.6)).unwrap();
    let f2 = JacobianFactor::unary(1, diag3(3.0), rhs(3.5), sigmas(3.6)).unwrap();

    let zero = DynMatrix::zeros(3, 3);
    let a0 = DynMatrix::vstack(&[&diag3(2.0), &zero, &zero]);
    let a1 = DynMatrix::vstack(&[&diag3(-2.0), &diag3(1.0), &diag3(3.0)]);
    let b: Vec<f64> = [2.5, 1.5, 3.5].iter().flat_map(|&v| [v; 3]).collect();
    let s: Vec<f64> = [2.6, 1.6, 3.6].iter().flat_map(|&v| [v; 3]).collect();
    let combined = JacobianFactor::new(
        vec![(0, a0), (1, a1)],
        DynVector::from_slice(&b),
        Some(NoiseModel::diagonal(s)),
    )
    .unwrap();

    let settings = EliminationSettings::default();
    let expected = combined.eliminate(&[0], &settings).unwrap();
    let actual = eliminate_qr(&[&f0, &f1, &f2], &[0], &settings).unwrap();

    assert_eq!(actual.conditional.keys(), expected.conditional.keys());
    assert_matrix_near(actual.conditional.rsd().full(), expected.conditional.rsd().full(), 1e-9, "conditional");
    assert_eq!(actual.remaining.keys(), expected.remaining.keys());
    assert_matrix_near(
        &actual.remaining.augmented_information(),
        &expected.remaining.augmented_information(),
        1e-9,
        "residual",
    );
}

#[test]
fn eliminate2() {
    let sigmas = vec![0.2, 0.2, 0.1, 0.1];
    let ax2 = DynMatrix::from_rows(4, 2, &[-1.0, 0.0, 0.0, -1.0, 1.0, 0.0, 0.0, 1.0]);
    #[rustfmt::skip]
    let al1x1 = DynMatrix::from_rows(4, 4, &[
        1.0, 0.0,  0.0,  0.0,
        0.0, 1.0,  0.0,  0.0,
        0.0, 0.0, -1.0,  0.0,
        0.0, 0.0,  0.0, -1.0,
    ]);
    let b = DynVector::from_slice(&[-0.2, 0.3, 0.2, -0.1]);
    let combined = JacobianFactor::new(vec![(2, ax2), (11, al1x1)], b, Some(NoiseModel::diagonal(sigmas))).unwrap();

    let out = combined.eliminate(&[2], &EliminationSettings::default()).unwrap();

    // R was made unit: scale = 1/sqrt(0.008)
    let scale = 125.0_f64.sqrt();
    let cond = &out.conditional;
    assert_eq!(cond.frontals(), &[2]);
    assert_eq!(cond.parents(), &[11]);
    assert!(cond.model().is_unit());
    assert_matrix_near(&cond.r().to_matrix(), &DynMatrix::scaled_eye(2, scale), 1e-9, "R");
    #[rustfmt::skip]
    let s = DynMatrix::from_rows(2, 4, &[
        -0.2,  0.0, -0.8,  0.0,
         0.0, -0.2,  0.0, -0.8,
    ]);
    assert_matrix_near(&cond.s(0).to_matrix(), &(&s * scale), 1e-9, "S");
    assert_slice_near(cond.d().as_slice(), &[0.2 * scale, -0.14 * scale], 1e-9, "d");

    // Residual rows are only defined up to an orthogonal transform.
    let sigma = 0.05_f64.sqrt();
    #[rustfmt::skip]
    let bl1x1 = DynMatrix::from_rows(2, 4, &[
        1.0, 0.0, -1.0,  0.0,
        0.0, 1.0,  0.0, -1.0,
    ]);
    let expected_lf = JacobianFactor::unary(
        11,
        &bl1x1 * (1.0 / sigma),
        DynVector::from_slice(&[0.0, 0.8_f64.sqrt()]),
        None,
    )
    .unwrap();
    let residual = &out.remaining;
    assert_eq!(residual.keys(), &[11]);
    assert!(residual.model().is_none());
    assert_eq!(residual.rows(), 2);
    assert_matrix_near(
        &residual.augmented_information(),
        &expected_lf.augmented_information(),
        1e-9,
        "residual information",
    );
}

/// `[A | b]` of four stacked factors over 3, 5, 7, 9, 11 (two columns each).
fn ordered_ab() -> DynMatrix<f64> {
    #[rustfmt::skip]
    let rows = [
        4., 0., 1., 4., 1., 0., 3., 6., 8., 8., 1.,
        9., 2., 0., 1., 6., 3., 9., 6., 6., 9., 4.,
        5., 3., 7., 9., 5., 5., 9., 1., 3., 7., 0.,
        5., 6., 5., 7., 9., 4., 0., 1., 1., 3., 5.,
        0., 0., 4., 5., 6., 6., 7., 9., 4., 5., 4.,
        0., 0., 9., 4., 8., 6., 2., 1., 4., 1., 6.,
        0., 0., 6., 0., 4., 2., 4., 0., 1., 9., 6.,
        0., 0., 6., 6., 4., 4., 5., 5., 5., 8., 6.,
        0., 0., 0., 0., 8., 0., 9., 8., 2., 8., 0.,
        0., 0., 0., 0., 0., 9., 4., 6., 3., 2., 0.,
        0., 0., 0., 0., 1., 1., 9., 1., 5., 5., 3.,
        0., 0., 0., 0., 1., 1., 3., 3., 2., 0., 5.,
        0., 0., 0., 0., 0., 0., 0., 0., 2., 4., 6.,
        0., 0., 0., 0., 0., 0., 0., 0., 6., 3., 4.,
    ];
    DynMatrix::from_rows(14, 11, &rows)
}

/// Reference triangular factor of `2·ordered_ab()`, rows scaled so the
/// diagonal is non-negative.
fn ordered_r() -> DynMatrix<f64> {
    #[rustfmt::skip]
    let rows = [
        -12.1244, -5.1962, -5.2786, -8.6603, -10.5573, -5.9385, -11.3820, -7.2581, -8.7427, -13.4440, -5.3611,
        0., 4.6904, 5.0254, 5.5432, 5.5737, 3.0153, -3.0153, -3.5635, -3.9290, -2.7412, 2.1625,
        0., 0., -13.8160, -8.7166, -10.2245, -8.8666, -8.7632, -5.2544, -6.9192, -10.5537, -9.3250,
        0., 0., 0., 6.5033, -1.1453, 1.3179, 2.5768, 5.5503, 3.6524, 1.3491, -2.5676,
        0., 0., 0., 0., -9.6242, -2.1148, -9.3509, -10.5846, -3.5366, -6.8561, -3.2277,
        0., 0., 0., 0., 0., 9.7887, 4.3551, 5.7572, 2.7876, 0.1611, 1.1769,
        0., 0., 0., 0., 0., 0., -11.1139, -0.6521, -2.1943, -7.5529, -0.9081,
        0., 0., 0., 0., 0., 0., 0., -4.6479, -1.9367, -6.5170, -3.7685,
        0., 0., 0., 0., 0., 0., 0., 0., 8.2503, 3.3757, 6.8476,
        0., 0., 0., 0., 0., 0., 0., 0., 0., -5.7095, -0.0090,
        0., 0., 0., 0., 0., 0., 0., 0., 0., 0., -7.1635,
    ];
    let mut r = DynMatrix::from_rows(11, 11, &rows);
    for i in 0..11 {
        let s = if r[(i, i)] < 0.0 { -2.0 } else { 2.0 };
        r.scale_row(i, s);
    }
    r
}

#[test]
fn eliminate_three_frontals() {
    let ab = ordered_ab();
    let part = |keys: Vec<Key>, row0: usize, col0: usize, rows: usize| {
        let mut dims = vec![2; keys.len()];
        dims.push(1);
        let block = ab.block(row0, col0, rows, 11 - col0);
        JacobianFactor::from_blocks(
            keys,
            VerticalBlockMatrix::from_matrix(block, &dims),
            Some(NoiseModel::isotropic(rows, 0.5)),
        )
        .unwrap()
    };
    let factors = [
        part(vec![3, 5, 7, 9, 11], 0, 0, 4),
        part(vec![5, 7, 9, 11], 4, 2, 4),
        part(vec![7, 9, 11], 8, 4, 4),
        part(vec![11], 12, 8, 2),
    ];
    let refs: Vec<&JacobianFactor<f64>> = factors.iter().collect();

    // The whitened stack is exactly twice the raw one.
    let stacked = JacobianFactor::combine(&refs, &[3, 5, 7, 9, 11]).unwrap();
    assert_matrix_near(&stacked.augmented_jacobian(true), &(&ab * 2.0), 1e-12, "whitened stack");

    let out = eliminate_qr(&refs, &[3, 5, 7], &EliminationSettings::default()).unwrap();
    let expected = ordered_r();

    let c = &out.conditional;
    assert_eq!(c.frontals(), &[3, 5, 7]);
    assert_eq!(c.parents(), &[9, 11]);
    assert_eq!(c.rows(), 6);
    assert!(c.model().is_unit());
    assert_matrix_near(c.rsd().full(), &expected.block(0, 0, 6, 11), 1e-3, "conditional [R S | d]");

    let rem = &out.remaining;
    assert_eq!(rem.keys(), &[9, 11]);
    assert_eq!(rem.rows(), 4);
    assert!(rem.model().is_none());
    assert_matrix_near(&rem.a(0).to_matrix(), &expected.block(6, 6, 4, 2), 1e-3, "residual block on 9");
    assert_matrix_near(&rem.a(1).to_matrix(), &expected.block(6, 8, 4, 2), 1e-3, "residual block on 11");
    assert_slice_near(rem.b().as_slice(), expected.block(6, 10, 4, 1).as_slice(), 1e-3, "residual rhs");
}

#[test]
fn constraint_eliminate1() {
    let v = DynVector::from_slice(&[1.2, 3.4]);
    let lc = JacobianFactor::unary(1, DynMatrix::eye(2), v.clone(), Some(NoiseModel::constrained(2))).unwrap();

    let out = lc.eliminate(&[1], &EliminationSettings::default()).unwrap();

    assert_eq!(out.remaining.rows(), 0);
    assert!(out.remaining.keys().is_empty());

    let expected =
        GaussianConditional::new(1, v, DynMatrix::eye(2), vec![], Some(NoiseModel::constrained(2))).unwrap();
    assert_eq!(*out.conditional, expected);
}

#[test]
fn constraint_eliminate2() {
    let b = DynVector::from_slice(&[3.0, 4.0]);
    // invertible
    let a1 = DynMatrix::from_rows(2, 2, &[1.0, 2.0, 2.0, 1.0]);
    // singular
    let a2 = DynMatrix::from_rows(2, 2, &[1.0, 2.0, 2.0, 4.0]);
    let lc = JacobianFactor::binary(1, a1, 2, a2, b, Some(NoiseModel::constrained(2))).unwrap();

    let out = lc.eliminate(&[1], &EliminationSettings::default()).unwrap();

    assert_eq!(out.remaining.keys(), &[2]);
    assert_eq!(out.remaining.rows(), 0);

    let cond = &out.conditional;
    assert_eq!(cond.model().sigmas(), &[0.0, 0.0]);
    assert_matrix_near(
        &cond.r().to_matrix(),
        &DynMatrix::from_rows(2, 2, &[1.0, 2.0, 0.0, 1.0]),
        1e-12,
        "R",
    );
    assert_matrix_near(
        &cond.s(0).to_matrix(),
        &DynMatrix::from_rows(2, 2, &[1.0, 2.0, 0.0, 0.0]),
        1e-12,
        "S",
    );
    assert_slice_near(cond.d().as_slice(), &[3.0, 2.0 / 3.0], 1e-12, "d");
}

#[test]
fn zero_frontal_block() {
    let f = JacobianFactor::binary(
        1,
        DynMatrix::zeros(1, 1),
        2,
        DynMatrix::eye(1),
        DynVector::from_slice(&[1.0]),
        None,
    )
    .unwrap();
    let strict = EliminationSettings::default();
    assert!(matches!(
        f.eliminate(&[1], &strict),
        Err(InferenceError::ZeroFrontalBlock(1))
    ));

    let lenient = EliminationSettings {
        allow_free_variables: true,
        ..strict
    };
    let out = f.eliminate(&[1], &lenient).unwrap();
    assert_eq!(out.conditional.r()[(0, 0)], 0.0);
    assert_eq!(out.remaining.keys(), &[2]);
    assert_eq!(out.remaining.rows(), 1);
}

#[test]
fn factor_variant() {
    let jf = simple();
    let wrapped = GaussianFactor::from(jf.clone());
    assert!(matches!(wrapped.to_jacobian(), Cow::Borrowed(_)));
    assert_eq!(wrapped.keys(), &[5, 10, 15]);
    assert_eq!(wrapped.dims(), vec![(5, 3), (10, 3), (15, 3)]);

    let hessian = GaussianFactor::from(HessianFactor::from_jacobian(&jf).unwrap());
    assert!(matches!(hessian.to_jacobian(), Cow::Owned(_)));
    let x = values(&[(5, &[1.0; 3]), (10, &[0.5; 3]), (15, &[1.0 / 3.0; 3])]);
    let (ej, eh) = (wrapped.error(&x).unwrap(), hessian.error(&x).unwrap());
    assert!((ej - eh).abs() < 1e-10, "{} vs {}", ej, eh);
    assert_matrix_near(&wrapped.augmented_information(), &hessian.augmented_information(), 1e-12, "information");
    assert!(!hessian.is_empty());
}
