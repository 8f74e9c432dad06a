use approx::assert_relative_eq;
use dfem::linear::Identity;
use dfem::{CsrMatrix, DiffError, LinearMap};

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// 3×2 and 2×3 rectangular factors, so composition order matters.
fn factors() -> (CsrMatrix<f64>, CsrMatrix<f64>) {
    let a = CsrMatrix::from_triplets(
        3,
        2,
        &[(0, 0, 1.0), (0, 1, -2.0), (1, 1, 4.0), (2, 0, 0.5)],
    )
    .unwrap();
    let b = CsrMatrix::from_triplets(2, 3, &[(0, 0, 3.0), (0, 2, 1.0), (1, 1, -1.0)]).unwrap();
    (a, b)
}

/// ⟨y, M x⟩ = ⟨Mᵀ y, x⟩
fn assert_adjoint<M: LinearMap<f64>>(m: &M, x: &[f64], y: &[f64])
where
    M::Error: std::fmt::Debug,
{
    let mx = m.apply(x).unwrap();
    let mty = m.apply_transpose(y).unwrap();
    assert_eq!(mx.len(), m.output_dim());
    assert_eq!(mty.len(), m.input_dim());
    assert_relative_eq!(dot(y, &mx), dot(&mty, x), max_relative = 1e-14);
}

#[test]
fn sparse_matrix_is_adjoint_consistent() {
    let (a, _) = factors();
    assert_adjoint(&a, &[0.3, -1.7], &[1.0, 2.0, -0.5]);
}

#[test]
fn chain_applies_first_stage_first() {
    let (a, b) = factors();
    let x = [1.0, 2.0];
    let expected = b.matvec(&a.matvec(&x));
    let ba = a.clone().then(b.clone());
    assert_eq!(ba.input_dim(), 2);
    assert_eq!(ba.output_dim(), 2);
    assert_eq!(ba.apply(&x).unwrap(), expected);
    // (B A)ᵀ y = Aᵀ (Bᵀ y)
    let y = [-1.0, 0.25];
    assert_eq!(
        ba.apply_transpose(&y).unwrap(),
        a.transpose_matvec(&b.transpose_matvec(&y))
    );
    assert_adjoint(&ba, &x, &y);
}

#[test]
fn scaled_and_transposed_compose() {
    let (a, b) = factors();
    let m = a.then(b).scaled(-2.0).transposed();
    assert_adjoint(&m, &[0.5, 1.5], &[2.0, -3.0]);

    let inner = m.into_inner();
    let x = [1.0, 1.0];
    // A x = [-1, 4, 0.5], B A x = [-2.5, -4]
    assert_eq!(inner.apply(&x).unwrap(), vec![5.0, 8.0]);
}

#[test]
fn boxed_maps_are_linear_maps() {
    let (a, b) = factors();
    let boxed: Box<dyn LinearMap<f64, Error = DiffError>> = Box::new(a.then(b).scaled(0.5));
    assert_adjoint(&boxed, &[2.0, -1.0], &[1.0, 1.0]);
}

#[test]
fn identity_checks_length() {
    let id = Identity { dim: 3 };
    assert_eq!(
        LinearMap::<f64>::apply(&id, &[1.0, 2.0, 3.0]).unwrap(),
        vec![1.0, 2.0, 3.0]
    );
    let err = LinearMap::<f64>::apply_transpose(&id, &[1.0]).unwrap_err();
    assert!(matches!(err, DiffError::DimensionMismatch { expected: 3, found: 1, .. }));
}

#[test]
fn mismatched_stage_input_is_an_error() {
    let (a, _) = factors();
    let err = a.apply(&[1.0, 2.0, 3.0]).unwrap_err();
    assert!(matches!(err, DiffError::DimensionMismatch { expected: 2, found: 3, .. }));
}
