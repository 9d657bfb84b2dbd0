// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use super::{Tensor, TensorError};

impl Tensor {
    /// Apply `f` to every element.
    pub fn map(&self, f: impl Fn(f32) -> f32) -> Tensor {
        Tensor {
            dtype: self.dtype,
            shape: self.shape.clone(),
            data: self.data.iter().map(|&v| f(v)).collect(),
        }
    }

    /// Combine two tensors element by element.
    ///
    /// A rank-0 operand is broadcast against the other side. Otherwise shapes
    /// must match exactly; the result keeps the dtype of `self`.
    pub fn zip_map(&self, other: &Tensor, f: impl Fn(f32, f32) -> f32) -> Result<Tensor, TensorError> {
        if other.is_scalar() {
            let rhs = other.data[0];
            return Ok(self.map(|v| f(v, rhs)));
        }
        if self.is_scalar() {
            let lhs = self.data[0];
            let mut out = other.map(|v| f(lhs, v));
            out.dtype = self.dtype;
            return Ok(out);
        }
        self.check_same_shape(other)?;
        Ok(Tensor {
            dtype: self.dtype,
            shape: self.shape.clone(),
            data: self
                .data
                .iter()
                .zip(&other.data)
                .map(|(&a, &b)| f(a, b))
                .collect(),
        })
    }

    pub fn check_same_shape(&self, other: &Tensor) -> Result<(), TensorError> {
        if self.shape != other.shape {
            return Err(TensorError::ShapeMismatch {
                left: self.shape.clone(),
                right: other.shape.clone(),
            });
        }
        Ok(())
    }

    pub fn add(&self, other: &Tensor) -> Result<Tensor, TensorError> {
        self.zip_map(other, |a, b| a + b)
    }

    pub fn sub(&self, other: &Tensor) -> Result<Tensor, TensorError> {
        self.zip_map(other, |a, b| a - b)
    }

    pub fn scale(&self, factor: f32) -> Tensor {
        self.map(|v| v * factor)
    }

    /// `(1 - alpha) * self + alpha * other`
    pub fn lerp(&self, other: &Tensor, alpha: f32) -> Result<Tensor, TensorError> {
        self.zip_map(other, |a, b| (1.0 - alpha) * a + alpha * b)
    }

    /// Sum of element-wise products, accumulated in `f64`.
    pub fn dot(&self, other: &Tensor) -> Result<f64, TensorError> {
        self.check_same_shape(other)?;
        Ok(self
            .data
            .iter()
            .zip(&other.data)
            .map(|(&a, &b)| a as f64 * b as f64)
            .sum())
    }

    /// Euclidean norm.
    pub fn norm(&self) -> f64 {
        self.data
            .iter()
            .map(|&v| v as f64 * v as f64)
            .sum::<f64>()
            .sqrt()
    }

    pub fn mean(&self) -> f64 {
        if self.data.is_empty() {
            return 0.0;
        }
        self.data.iter().map(|&v| v as f64).sum::<f64>() / self.data.len() as f64
    }

    /// Sample standard deviation (Bessel-corrected).
    pub fn std(&self) -> f64 {
        let n = self.data.len();
        if n < 2 {
            return 0.0;
        }
        let mean = self.mean();
        let var = self
            .data
            .iter()
            .map(|&v| (v as f64 - mean).powi(2))
            .sum::<f64>()
            / (n - 1) as f64;
        var.sqrt()
    }
}
