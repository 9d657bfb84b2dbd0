// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Minimal dense tensor used as the unit of data flowing through a recipe.
//!
//! The engine never interprets archive encodings. Sources hand over values as
//! `f32` elements together with the storage dtype they came from, and sinks get
//! the same dtype back so they can re-encode the merged value.

mod ops;

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Storage type of a tensor inside its archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DType {
    F16,
    BF16,
    F32,
    F64,
}

impl Default for DType {
    fn default() -> Self {
        DType::F32
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DType::F16 => "f16",
            DType::BF16 => "bf16",
            DType::F32 => "f32",
            DType::F64 => "f64",
        };
        f.write_str(name)
    }
}

/// Errors raised by tensor construction and element-wise operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TensorError {
    #[error("shape {shape:?} describes {expected} elements but {actual} were given")]
    ElementCount {
        shape: Vec<usize>,
        expected: usize,
        actual: usize,
    },

    #[error("shape mismatch: {left:?} vs {right:?}")]
    ShapeMismatch { left: Vec<usize>, right: Vec<usize> },

    #[error("dtype mismatch: {left} vs {right}")]
    DTypeMismatch { left: DType, right: DType },
}

/// A dense, row-major tensor.
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor {
    dtype: DType,
    shape: Vec<usize>,
    data: Vec<f32>,
}

impl Tensor {
    /// Build a tensor, checking that `shape` accounts for every element.
    pub fn new(dtype: DType, shape: Vec<usize>, data: Vec<f32>) -> Result<Self, TensorError> {
        let expected: usize = shape.iter().product();
        if expected != data.len() {
            return Err(TensorError::ElementCount {
                shape,
                expected,
                actual: data.len(),
            });
        }
        Ok(Self { dtype, shape, data })
    }

    /// Rank-0 tensor holding a single value.
    pub fn scalar(value: f32) -> Self {
        Self {
            dtype: DType::F32,
            shape: Vec::new(),
            data: vec![value],
        }
    }

    /// One-dimensional `f32` tensor.
    pub fn from_vec(data: Vec<f32>) -> Self {
        Self {
            dtype: DType::F32,
            shape: vec![data.len()],
            data,
        }
    }

    pub fn zeros_like(other: &Tensor) -> Self {
        Self {
            dtype: other.dtype,
            shape: other.shape.clone(),
            data: vec![0.0; other.data.len()],
        }
    }

    pub fn dtype(&self) -> DType {
        self.dtype
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    pub fn into_data(self) -> Vec<f32> {
        self.data
    }

    pub fn numel(&self) -> usize {
        self.data.len()
    }

    pub fn is_scalar(&self) -> bool {
        self.shape.is_empty()
    }

    /// Same values, different storage dtype.
    pub fn with_dtype(mut self, dtype: DType) -> Self {
        self.dtype = dtype;
        self
    }

    /// Approximate in-memory size of the element buffer.
    pub fn byte_len(&self) -> usize {
        self.data.len() * std::mem::size_of::<f32>()
    }

    /// Little-endian element bytes, used to compare outputs bit for bit.
    pub fn to_le_bytes(&self) -> Vec<u8> {
        self.data.iter().flat_map(|v| v.to_le_bytes()).collect()
    }
}
