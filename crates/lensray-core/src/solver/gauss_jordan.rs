//! In-place matrix inversion by Gauss-Jordan elimination with full
//! pivoting.

use ndarray::Array2;

/// Invert the square matrix `a` in place and return its determinant.
///
/// A zero return means `a` is singular; its contents are then unspecified.
/// Non-square or non-finite input is treated as singular.
pub fn invert(a: &mut Array2<f64>) -> f64 {
    let n = a.nrows();
    if a.ncols() != n || a.iter().any(|v| !v.is_finite()) {
        return 0.0;
    }
    let mut pivoted = vec![false; n];
    let mut row_of = vec![0usize; n];
    let mut col_of = vec![0usize; n];
    let mut det = 1.0;

    for step in 0..n {
        let mut big = 0.0;
        let (mut irow, mut icol) = (0, 0);
        for j in (0..n).filter(|&j| !pivoted[j]) {
            for k in (0..n).filter(|&k| !pivoted[k]) {
                let v = a[[j, k]].abs();
                if v > big {
                    big = v;
                    irow = j;
                    icol = k;
                }
            }
        }
        if big == 0.0 || !big.is_finite() {
            return 0.0;
        }
        pivoted[icol] = true;

        // Move the pivot onto the diagonal.
        if irow != icol {
            for l in 0..n {
                a.swap([irow, l], [icol, l]);
            }
            det = -det;
        }
        row_of[step] = irow;
        col_of[step] = icol;

        let pivot = a[[icol, icol]];
        det *= pivot;
        let inv = 1.0 / pivot;
        a[[icol, icol]] = 1.0;
        for l in 0..n {
            a[[icol, l]] *= inv;
        }
        for r in (0..n).filter(|&r| r != icol) {
            let factor = a[[r, icol]];
            if factor != 0.0 {
                a[[r, icol]] = 0.0;
                for l in 0..n {
                    a[[r, l]] -= a[[icol, l]] * factor;
                }
            }
        }
    }

    // Undo the column interchanges in reverse order.
    for step in (0..n).rev() {
        if row_of[step] != col_of[step] {
            for k in 0..n {
                a.swap([k, row_of[step]], [k, col_of[step]]);
            }
        }
    }
    det
}
