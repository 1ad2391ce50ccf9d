//! This crate reads and writes the recharge (RCH) package of a
//! MODFLOW model into [`ndarray`]'s `Array2` type.
//!
//! [`ndarray`]: https://github.com/rust-ndarray/ndarray
//!
//! The RCH file is a line-oriented ASCII format: a header record
//! selecting the recharge option and cell-by-cell budget unit,
//! followed by one record per stress period that says whether a new
//! flux array (and, for option 2, a layer-index array) follows or
//! whether the previous period's array is reused.
//!
//! See [`ModflowRch`] for reading/writing package files and
//! [`Transient2d`] for the per-period array slots.
//!
//! # Example
//!
//! ```
//! use modflow_rch::{BasicModel, Grid, Model, ModflowRch, RchOption};
//!
//! let mut model = BasicModel::new(Grid {
//!     nrow: 3,
//!     ncol: 3,
//!     nlay: 1,
//!     nper: 1,
//! });
//! let rch = ModflowRch::new(&mut model, RchOption::HighestActive, 0, 1e-3, 0)?;
//! let mut out = Vec::new();
//! rch.write_file(&mut out)?;
//!
//! let mut model = BasicModel::new(model.grid());
//! let loaded = ModflowRch::load(&out[..], &mut model, None, None)?;
//! assert_eq!(loaded.option(), RchOption::HighestActive);
//! # Ok::<_, Box<dyn std::error::Error>>(())
//! ```
//!
//! # Limitations
//!
//! * Array blocks are read in free format. Of the MODFLOW array
//!   control records, `CONSTANT`, `INTERNAL`, `EXTERNAL`, and
//!   `OPEN/CLOSE` are recognized; fixed-format Fortran field slicing
//!   is not reproduced.
//!
//! * Parameter definitions (the `PARAMETER` variant of the file) are
//!   resolved to concrete arrays at load time; the in-memory package
//!   keeps no connection to the named parameters, matching how the
//!   authoring tool treats them.

mod model;
mod params;
mod rch;
mod transient;
pub mod util2d;

pub use crate::model::{BasicModel, Grid, Model, PackageMeta};
pub use crate::params::{Cluster, Param, ParamError, ParamTable};
pub use crate::rch::{ModflowRch, RchOption, ReadRchError, DEFAULT_UNIT};
pub use crate::transient::{Transient2d, Transient2dSource, TransientError};
pub use crate::util2d::{ArrayElement, ExtUnitMap, LineReader, ReadArrayError};
