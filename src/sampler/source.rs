//! Gridded dataset abstraction
//!
//! The sampler only needs named-dimension arrays. NetCDF files provide them
//! through [`crate::netcdf_io::NetcdfSource`]; [`MemorySource`] holds them in
//! memory for tests and for callers that already loaded their data.

use crate::errors::{RemapError, Result};
use ndarray::ArrayD;
use std::collections::HashMap;

/// An array together with the names of its axes
#[derive(Debug, Clone, PartialEq)]
pub struct NamedArray {
    pub dims: Vec<String>,
    pub data: ArrayD<f64>,
}

impl NamedArray {
    pub fn new(dims: &[&str], data: ArrayD<f64>) -> Result<Self> {
        if dims.len() != data.ndim() {
            return Err(RemapError::ShapeMismatch {
                expected: vec![dims.len()],
                found: vec![data.ndim()],
            });
        }
        Ok(Self {
            dims: dims.iter().map(|d| d.to_string()).collect(),
            data,
        })
    }

    /// Position of the axis called `name`
    pub fn axis_of(&self, name: &str) -> Option<usize> {
        self.dims.iter().position(|d| d == name)
    }
}

/// Read access to the variables of one gridded dataset
pub trait GriddedSource {
    /// Name used in error messages and logs
    fn source_name(&self) -> String;

    /// Read a whole variable with its dimension names
    fn read_variable(&self, name: &str) -> Result<NamedArray>;
}

/// A dataset held entirely in memory
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    pub name: String,
    variables: HashMap<String, NamedArray>,
}

impl MemorySource {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            variables: HashMap::new(),
        }
    }

    pub fn with_variable(mut self, name: &str, array: NamedArray) -> Self {
        self.variables.insert(name.to_string(), array);
        self
    }
}

impl GriddedSource for MemorySource {
    fn source_name(&self) -> String {
        self.name.clone()
    }

    fn read_variable(&self, name: &str) -> Result<NamedArray> {
        self.variables
            .get(name)
            .cloned()
            .ok_or_else(|| RemapError::missing(name, &self.name))
    }
}
