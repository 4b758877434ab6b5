use ndarray::Array1;

use crate::error::RigError;

/// Instantaneous velocity from a displacement sequence over a (possibly
/// non-uniform) strictly increasing time base.
///
/// Interior points use a five-point estimate built from two difference terms:
///
/// ```text
/// v[i] = 4/3 * (x[i+1] - x[i-1]) / (t[i+1] - t[i-1])
///      + 1/3 * (x[i-2] - x[i+2]) / (t[i+2] - t[i-2])
/// ```
///
/// On a uniform grid this reduces exactly to the classical fourth-order
/// stencil `(-x[i+2] + 8x[i+1] - 8x[i-1] + x[i-2]) / (12h)`; the tests pin
/// that reduction down. The first and last two points fall back to one-sided
/// two-point differences against the immediate neighbour.
pub fn velocity_from_displacement(
    displacement: &Array1<f64>,
    time: &Array1<f64>,
) -> Result<Array1<f64>, RigError> {
    let n = displacement.len();
    if time.len() != n {
        return Err(RigError::InsufficientData {
            what: "time base (length mismatch with displacement)",
            needed: n,
            got: time.len(),
        });
    }
    if n < 5 {
        return Err(RigError::InsufficientData {
            what: "displacement samples for five-point differentiation",
            needed: 5,
            got: n,
        });
    }

    let x = displacement;
    let t = time;
    let mut velocity = Array1::<f64>::zeros(n);

    velocity[0] = (x[1] - x[0]) / (t[1] - t[0]);
    velocity[1] = (x[2] - x[1]) / (t[2] - t[1]);
    for i in 2..n - 2 {
        velocity[i] = 4.0 * (x[i + 1] - x[i - 1]) / (3.0 * (t[i + 1] - t[i - 1]))
            + (x[i - 2] - x[i + 2]) / (3.0 * (t[i + 2] - t[i - 2]));
    }
    velocity[n - 2] = (x[n - 2] - x[n - 3]) / (t[n - 2] - t[n - 3]);
    velocity[n - 1] = (x[n - 1] - x[n - 2]) / (t[n - 1] - t[n - 2]);

    Ok(velocity)
}
