use rand::Rng;
use std::f64::consts::PI;

use crate::error::{Error, Result};

/// Row-major weight matrix. A dense layer stores its kernel as
/// `rows = fan_in`, `cols = units`, so a forward pass is `x · W`.
#[derive(Debug, Clone, PartialEq)]
pub struct Matrix {
    pub rows: usize,
    pub cols: usize,
    pub data: Vec<f64>,
}

impl Matrix {
    pub fn zeros(rows: usize, cols: usize) -> Matrix {
        Matrix { rows, cols, data: vec![0.0; rows * cols] }
    }

    pub fn from_vec(rows: usize, cols: usize, data: Vec<f64>) -> Result<Matrix> {
        if data.len() != rows * cols {
            return Err(Error::ShapeMismatch {
                expected: vec![rows, cols],
                actual: vec![data.len()],
            });
        }
        Ok(Matrix { rows, cols, data })
    }

    /// Samples a single value from N(0, 1) using the Box-Muller transform.
    pub fn sample_standard_normal<R: Rng + ?Sized>(rng: &mut R) -> f64 {
        // Both uniforms in (0, 1] to avoid log(0).
        let u1: f64 = 1.0 - rng.gen::<f64>();
        let u2: f64 = 1.0 - rng.gen::<f64>();
        (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos()
    }

    /// He initialization: N(0, sqrt(2 / fan_in)). Use before ReLU.
    pub fn he<R: Rng + ?Sized>(rows: usize, cols: usize, fan_in: usize, rng: &mut R) -> Matrix {
        Matrix::normal(rows, cols, (2.0 / fan_in.max(1) as f64).sqrt(), rng)
    }

    /// Xavier (Glorot) initialization: N(0, sqrt(1 / fan_in)).
    pub fn xavier<R: Rng + ?Sized>(rows: usize, cols: usize, fan_in: usize, rng: &mut R) -> Matrix {
        Matrix::normal(rows, cols, (1.0 / fan_in.max(1) as f64).sqrt(), rng)
    }

    fn normal<R: Rng + ?Sized>(rows: usize, cols: usize, std_dev: f64, rng: &mut R) -> Matrix {
        let data = (0..rows * cols)
            .map(|_| Matrix::sample_standard_normal(rng) * std_dev)
            .collect();
        Matrix { rows, cols, data }
    }

    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.data[row * self.cols + col]
    }

    /// Row vector times matrix: `x (1×rows) · W (rows×cols)`.
    pub fn vec_mul(&self, x: &[f64]) -> Vec<f64> {
        debug_assert_eq!(x.len(), self.rows);
        let mut out = vec![0.0; self.cols];
        for (r, &xr) in x.iter().enumerate() {
            if xr == 0.0 {
                continue;
            }
            let row = &self.data[r * self.cols..(r + 1) * self.cols];
            for (o, &w) in out.iter_mut().zip(row) {
                *o += xr * w;
            }
        }
        out
    }

    /// Matrix times column vector: `W (rows×cols) · d (cols)`; the backward
    /// counterpart of `vec_mul`.
    pub fn mul_vec(&self, d: &[f64]) -> Vec<f64> {
        debug_assert_eq!(d.len(), self.cols);
        self.data
            .chunks(self.cols)
            .map(|row| row.iter().zip(d).map(|(w, g)| w * g).sum())
            .collect()
    }

    /// Accumulates the outer product `a ⊗ b` into `target` (same layout as
    /// a `rows × cols` matrix with `rows = a.len()`).
    pub fn add_outer(target: &mut [f64], a: &[f64], b: &[f64]) {
        debug_assert_eq!(target.len(), a.len() * b.len());
        let cols = b.len();
        for (r, &ar) in a.iter().enumerate() {
            if ar == 0.0 {
                continue;
            }
            let row = &mut target[r * cols..(r + 1) * cols];
            for (t, &bc) in row.iter_mut().zip(b) {
                *t += ar * bc;
            }
        }
    }
}

impl Default for Matrix {
    fn default() -> Self {
        Matrix { rows: 0, cols: 0, data: vec![] }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn vec_mul_and_mul_vec() {
        // [[1, 2], [3, 4], [5, 6]]
        let m = Matrix::from_vec(3, 2, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap();
        assert_eq!(m.vec_mul(&[1.0, 0.0, 1.0]), vec![6.0, 8.0]);
        assert_eq!(m.mul_vec(&[1.0, 1.0]), vec![3.0, 7.0, 11.0]);
        assert_eq!(m.get(2, 1), 6.0);
    }

    #[test]
    fn add_outer_accumulates() {
        let mut t = vec![1.0; 4];
        Matrix::add_outer(&mut t, &[1.0, 2.0], &[3.0, 4.0]);
        assert_eq!(t, vec![4.0, 5.0, 7.0, 9.0]);
    }

    #[test]
    fn he_init_is_seeded_and_sized() {
        let a = Matrix::he(4, 8, 4, &mut StdRng::seed_from_u64(7));
        let b = Matrix::he(4, 8, 4, &mut StdRng::seed_from_u64(7));
        assert_eq!(a.data.len(), 32);
        assert_eq!(a, b);
    }

    #[test]
    fn from_vec_checks_length() {
        assert!(Matrix::from_vec(2, 2, vec![0.0; 3]).is_err());
    }
}
