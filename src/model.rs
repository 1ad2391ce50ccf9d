//! The owning-model contract.
//!
//! A package does not own the simulation grid; it is handed the grid
//! and stress-period dimensions by the model it belongs to, and it
//! reports registrations (itself, budget output units) back to that
//! model. [`Model`] captures exactly that contract so packages can be
//! used without a full simulation object.

use ndarray::{Array2, ArrayView2};
use std::collections::HashMap;

/// Grid and stress-period dimensions of the owning model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Grid {
    pub nrow: usize,
    pub ncol: usize,
    pub nlay: usize,
    pub nper: usize,
}

impl Grid {
    /// Shape of one 2D model array, `(nrow, ncol)`.
    pub fn shape(&self) -> (usize, usize) {
        (self.nrow, self.ncol)
    }
}

/// Metadata a package hands to the model's registry when it is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PackageMeta {
    /// MODFLOW package name, e.g. `"RCH"`.
    pub name: &'static str,
    /// Conventional filename extension, e.g. `"rch"`.
    pub extension: &'static str,
    /// File unit number the package is addressed by in a name file.
    pub unit: i32,
}

/// What a package needs from the model that owns it.
///
/// Only [`grid`](Model::grid) is required; the registration hooks and
/// the auxiliary (multiplier/zone) array lookups used during
/// parameter resolution default to no-ops.
pub trait Model {
    /// Grid and stress-period dimensions. Immutable for the life of
    /// any package bound to this model.
    fn grid(&self) -> Grid;

    /// When true, loaders report progress via `tracing`.
    fn verbose(&self) -> bool {
        false
    }

    /// Called with the unit number parsed from a package header when
    /// that package routes cell-by-cell budget output somewhere.
    fn register_output_unit(&mut self, unit: i32) {
        let _ = unit;
    }

    /// Called once at the end of package construction.
    fn register_package(&mut self, meta: PackageMeta) {
        let _ = meta;
    }

    /// Named multiplier array, consulted during parameter resolution.
    fn mult_array(&self, name: &str) -> Option<ArrayView2<'_, f32>> {
        let _ = name;
        None
    }

    /// Named zone array, consulted during parameter resolution.
    fn zone_array(&self, name: &str) -> Option<ArrayView2<'_, i32>> {
        let _ = name;
        None
    }
}

/// A minimal [`Model`] that records registrations.
///
/// Suitable for loading package files standalone, and as the model
/// half of round-trip tests.
#[derive(Debug, Clone)]
pub struct BasicModel {
    grid: Grid,
    verbose: bool,
    /// Output units registered by loaded packages, in order.
    pub output_units: Vec<i32>,
    /// Packages registered with this model, in order.
    pub packages: Vec<PackageMeta>,
    mult: HashMap<String, Array2<f32>>,
    zone: HashMap<String, Array2<i32>>,
}

impl BasicModel {
    pub fn new(grid: Grid) -> BasicModel {
        BasicModel {
            grid,
            verbose: false,
            output_units: Vec::new(),
            packages: Vec::new(),
            mult: HashMap::new(),
            zone: HashMap::new(),
        }
    }

    pub fn with_verbose(mut self, verbose: bool) -> BasicModel {
        self.verbose = verbose;
        self
    }

    /// Registers a named multiplier array. Names are matched
    /// case-insensitively, as in the files.
    pub fn add_mult_array<N: Into<String>>(&mut self, name: N, array: Array2<f32>) {
        self.mult.insert(name.into().to_ascii_lowercase(), array);
    }

    /// Registers a named zone array.
    pub fn add_zone_array<N: Into<String>>(&mut self, name: N, array: Array2<i32>) {
        self.zone.insert(name.into().to_ascii_lowercase(), array);
    }
}

impl Model for BasicModel {
    fn grid(&self) -> Grid {
        self.grid
    }

    fn verbose(&self) -> bool {
        self.verbose
    }

    fn register_output_unit(&mut self, unit: i32) {
        self.output_units.push(unit);
    }

    fn register_package(&mut self, meta: PackageMeta) {
        self.packages.push(meta);
    }

    fn mult_array(&self, name: &str) -> Option<ArrayView2<'_, f32>> {
        self.mult.get(&name.to_ascii_lowercase()).map(|a| a.view())
    }

    fn zone_array(&self, name: &str) -> Option<ArrayView2<'_, i32>> {
        self.zone.get(&name.to_ascii_lowercase()).map(|a| a.view())
    }
}
