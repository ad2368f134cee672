use nalgebra::DMatrix;

/// Build the starting simplex around `x0`.
///
/// The simplex has `n + 1` rows of `n` columns. Row 0 is `x0` itself. Rows `1..=n` come from an
/// `n × n` block of ones with `-delta` on the sub-diagonal and `+delta` on the super-diagonal;
/// every row is then scaled column-wise by `x0`.
///
/// Consequences worth knowing:
/// * components of `x0` equal to zero are never perturbed,
/// * the perturbation block is skew-symmetric, so for odd `n` the simplex is degenerate
///   (its vertices span fewer than `n` directions around `x0`).
///
/// Arguments
/// ---------
/// * `x0`: starting point
/// * `delta`: relative step, typically 0.15
///
/// Return
/// ------
/// * the `(n + 1) × n` simplex
pub fn initial_simplex(x0: &[f64], delta: f64) -> DMatrix<f64> {
    let n = x0.len();
    DMatrix::from_fn(n + 1, n, |row, col| {
        let factor = if row == 0 {
            1.0
        } else {
            let r = row - 1;
            if col == r + 1 {
                1.0 + delta
            } else if r >= 1 && col == r - 1 {
                1.0 - delta
            } else {
                1.0
            }
        };
        factor * x0[col]
    })
}
