//! Reader/writer for the MODFLOW recharge (RCH) package file.

use crate::model::{Grid, Model, PackageMeta};
use crate::params::{ParamError, ParamTable};
use crate::transient::{Transient2d, Transient2dSource, TransientError};
use crate::util2d::{self, ExtUnitMap, LineReader, ReadArrayError};
use ndarray::Array2;
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt;
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use tracing::debug;

/// Conventional file unit for the RCH package in a name file.
pub const DEFAULT_UNIT: i32 = 19;

/// Unit number recorded on the package for cell-by-cell budget
/// output. The unit number actually present in a loaded file is
/// registered with the model and then replaced by this fixed value, a
/// legacy convention downstream consumers rely on.
const IPAKCB_UNIT: i32 = 53;

const HEADING: &str = "# RCH for MODFLOW, generated by modflow-rch.";

/// Which model layer receives the recharge flux.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RchOption {
    /// Recharge is applied to the top grid layer (option code 1).
    TopLayer,
    /// Recharge is applied to the layer given per cell by the `irch`
    /// array (option code 2).
    SpecifiedLayer,
    /// Recharge is applied to the highest active cell in each column
    /// (option code 3).
    HighestActive,
}

impl RchOption {
    pub fn from_code(code: i32) -> Option<RchOption> {
        match code {
            1 => Some(RchOption::TopLayer),
            2 => Some(RchOption::SpecifiedLayer),
            3 => Some(RchOption::HighestActive),
            _ => None,
        }
    }

    pub fn code(self) -> i32 {
        match self {
            RchOption::TopLayer => 1,
            RchOption::SpecifiedLayer => 2,
            RchOption::HighestActive => 3,
        }
    }

    /// True when a per-cell layer-index array accompanies the flux
    /// array in the file.
    pub fn has_layer_array(self) -> bool {
        matches!(self, RchOption::SpecifiedLayer)
    }
}

/// An error reading an RCH package file.
#[derive(Debug)]
pub enum ReadRchError {
    /// An I/O error.
    Io(io::Error),
    /// The header could not be parsed.
    BadHeader { line_no: usize, line: String },
    /// The header carried an unknown recharge option code.
    BadOption(i32),
    /// A stress-period record with missing or non-integer fields.
    BadRecord { period: usize, line: String },
    /// A period asked to reuse the previous array before any array
    /// was defined.
    ReuseBeforeDefine { period: usize },
    /// An error reading an array block.
    Array(ReadArrayError),
    /// An error reading or resolving the parameter table.
    Param(ParamError),
    /// The assembled per-period data failed validation.
    Transient(TransientError),
}

impl Error for ReadRchError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ReadRchError::Io(err) => Some(err),
            ReadRchError::Array(err) => Some(err),
            ReadRchError::Param(err) => Some(err),
            ReadRchError::Transient(err) => Some(err),
            _ => None,
        }
    }
}

impl fmt::Display for ReadRchError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ReadRchError::Io(err) => write!(f, "I/O error: {}", err),
            ReadRchError::BadHeader { line_no, line } => {
                write!(f, "malformed header on line {}: {:?}", line_no, line)
            }
            ReadRchError::BadOption(code) => {
                write!(f, "unknown recharge option code {}", code)
            }
            ReadRchError::BadRecord { period, line } => write!(
                f,
                "malformed record for stress period {}: {:?}",
                period + 1,
                line
            ),
            ReadRchError::ReuseBeforeDefine { period } => write!(
                f,
                "stress period {} reuses an array before any was defined",
                period + 1
            ),
            ReadRchError::Array(err) => write!(f, "error reading array block: {}", err),
            ReadRchError::Param(err) => write!(f, "parameter error: {}", err),
            ReadRchError::Transient(err) => write!(f, "invalid per-period data: {}", err),
        }
    }
}

impl From<io::Error> for ReadRchError {
    fn from(err: io::Error) -> ReadRchError {
        ReadRchError::Io(err)
    }
}

impl From<ReadArrayError> for ReadRchError {
    fn from(err: ReadArrayError) -> ReadRchError {
        ReadRchError::Array(err)
    }
}

impl From<ParamError> for ReadRchError {
    fn from(err: ParamError) -> ReadRchError {
        ReadRchError::Param(err)
    }
}

impl From<TransientError> for ReadRchError {
    fn from(err: TransientError) -> ReadRchError {
        ReadRchError::Transient(err)
    }
}

/// The recharge package: flux (and, for option 2, layer-index)
/// arrays for every stress period of the owning model.
#[derive(Debug, Clone)]
pub struct ModflowRch {
    option: RchOption,
    ipakcb: i32,
    rech: Transient2d<f32>,
    irch: Option<Transient2d<i32>>,
    grid: Grid,
    heading: String,
}

impl ModflowRch {
    /// Builds a package bound to `model`'s grid and registers it.
    ///
    /// `irch` is consulted only when `option` calls for a layer
    /// array; its values are 0-based layer indices and are shifted to
    /// the file format's 1-based convention before storage.
    pub fn new<M, F, I>(
        model: &mut M,
        option: RchOption,
        ipakcb: i32,
        rech: F,
        irch: I,
    ) -> Result<ModflowRch, TransientError>
    where
        M: Model,
        F: Into<Transient2dSource<f32>>,
        I: Into<Transient2dSource<i32>>,
    {
        let grid = model.grid();
        let rech = Transient2d::new(grid.shape(), grid.nper, rech.into())?;
        let irch = if option.has_layer_array() {
            let shifted = shift_indices(irch.into());
            Some(Transient2d::new(grid.shape(), grid.nper, shifted)?)
        } else {
            None
        };
        model.register_package(META);
        Ok(ModflowRch {
            option,
            ipakcb,
            rech,
            irch,
            grid,
            heading: HEADING.to_owned(),
        })
    }

    pub fn option(&self) -> RchOption {
        self.option
    }

    /// Cell-by-cell budget flag; 0 means no budget output.
    pub fn ipakcb(&self) -> i32 {
        self.ipakcb
    }

    /// The flux array slot.
    pub fn rech(&self) -> &Transient2d<f32> {
        &self.rech
    }

    /// The layer-index slot; present iff the option calls for one.
    /// Stored values are 1-based, as in the file.
    pub fn irch(&self) -> Option<&Transient2d<i32>> {
        self.irch.as_ref()
    }

    pub fn grid(&self) -> Grid {
        self.grid
    }

    /// Upper bound on the number of cells that receive recharge.
    pub fn ncells(&self) -> usize {
        self.grid.nrow * self.grid.ncol
    }

    /// Writes the package in the RCH file layout.
    pub fn write_file<W: Write>(&self, mut writer: W) -> io::Result<()> {
        writeln!(writer, "{}", self.heading)?;
        writeln!(writer, "{:>10}{:>10}", self.option.code(), self.ipakcb)?;
        for kper in 0..self.grid.nper {
            let (inrech, rech_entry) = self.rech.kper_entry(kper);
            let (inirch, irch_entry) = match &self.irch {
                Some(irch) => irch.kper_entry(kper),
                // Sentinel for "not applicable", sharing the reuse
                // encoding.
                None => (-1, None),
            };
            writeln!(
                writer,
                "{:>10}{:>10} # Stress period {}",
                inrech,
                inirch,
                kper + 1
            )?;
            if let Some(entry) = rech_entry {
                writer.write_all(entry.as_bytes())?;
            }
            if let Some(entry) = irch_entry {
                writer.write_all(entry.as_bytes())?;
            }
        }
        Ok(())
    }

    /// Writes the package to a file at `path`, creating or
    /// overwriting it. The file is flushed and closed on all exit
    /// paths.
    pub fn write_to_path<P: AsRef<Path>>(&self, path: P) -> io::Result<()> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        self.write_file(&mut writer)?;
        writer.flush()
    }

    /// Reads a package from `reader`.
    ///
    /// `nper` overrides the model's stress-period count when given.
    /// `ext_units` resolves `EXTERNAL` array control records; files
    /// without them load fine with `None`.
    pub fn load<R, M>(
        reader: R,
        model: &mut M,
        nper: Option<usize>,
        ext_units: Option<&ExtUnitMap>,
    ) -> Result<ModflowRch, ReadRchError>
    where
        R: BufRead,
        M: Model,
    {
        if model.verbose() {
            debug!("loading rch package file");
        }
        let mut lines = LineReader::new(reader);

        // Dataset 0: leading comments.
        let mut line = loop {
            match lines.next_line()? {
                Some(line) if line.starts_with('#') => continue,
                Some(line) => break line,
                None => {
                    return Err(ReadRchError::BadHeader {
                        line_no: lines.line_no(),
                        line: String::new(),
                    })
                }
            }
        };

        // Dataset 1 (optional): PARAMETER NPARM.
        let mut npar = 0usize;
        if line.to_ascii_lowercase().contains("parameter") {
            npar = line
                .split_whitespace()
                .nth(1)
                .and_then(|tok| tok.parse().ok())
                .ok_or_else(|| ReadRchError::BadHeader {
                    line_no: lines.line_no(),
                    line: line.clone(),
                })?;
            if npar > 0 && model.verbose() {
                debug!(npar, "parameters detected");
            }
            line = lines.next_line()?.ok_or_else(|| ReadRchError::BadHeader {
                line_no: lines.line_no(),
                line: String::new(),
            })?;
        }

        // Dataset 2: option code and budget unit.
        let t: Vec<&str> = line.split_whitespace().collect();
        let code: i32 = t
            .first()
            .and_then(|tok| tok.parse().ok())
            .ok_or_else(|| ReadRchError::BadHeader {
                line_no: lines.line_no(),
                line: line.clone(),
            })?;
        let option = RchOption::from_code(code).ok_or(ReadRchError::BadOption(code))?;
        // A missing or unparseable unit token means no budget output,
        // never an error.
        let mut ipakcb = 0;
        if let Some(unit) = t.get(1).and_then(|tok| tok.parse::<i32>().ok()) {
            if unit != 0 {
                model.register_output_unit(unit);
                ipakcb = IPAKCB_UNIT;
            }
        }

        // Datasets 3-4: parameter definitions.
        let table = if npar > 0 {
            Some(ParamTable::load(&mut lines, npar)?)
        } else {
            None
        };

        let grid = model.grid();
        let nper = nper.unwrap_or(grid.nper);
        let shape = grid.shape();

        // Datasets 5-8, once per stress period. A period either
        // defines a new array or reuses the latest defined one, so
        // only the explicit arrays are recorded.
        let mut rech_entries: BTreeMap<usize, Array2<f32>> = BTreeMap::new();
        let mut irch_entries: BTreeMap<usize, Array2<i32>> = BTreeMap::new();
        for kper in 0..nper {
            let line = lines.next_line()?.ok_or(ReadRchError::BadRecord {
                period: kper,
                line: String::new(),
            })?;
            let t: Vec<&str> = line.split_whitespace().collect();
            let inrech: i32 =
                t.first()
                    .and_then(|tok| tok.parse().ok())
                    .ok_or_else(|| ReadRchError::BadRecord {
                        period: kper,
                        line: line.clone(),
                    })?;
            let inirch: i32 = if option.has_layer_array() {
                t.get(1)
                    .and_then(|tok| tok.parse().ok())
                    .ok_or_else(|| ReadRchError::BadRecord {
                        period: kper,
                        line: line.clone(),
                    })?
            } else {
                -1
            };

            if inrech >= 0 {
                let array = match &table {
                    None => {
                        if model.verbose() {
                            debug!(period = kper + 1, "loading rech array");
                        }
                        util2d::load_array::<f32, _>(&mut lines, shape, ext_units)?
                    }
                    Some(table) => {
                        let selection =
                            read_selection(&mut lines, table, inrech as usize, kper)?;
                        table.resolve(model, shape, &selection)?
                    }
                };
                rech_entries.insert(kper, array);
            } else if rech_entries.is_empty() {
                return Err(ReadRchError::ReuseBeforeDefine { period: kper });
            }

            if option.has_layer_array() {
                if inirch >= 0 {
                    if model.verbose() {
                        debug!(period = kper + 1, "loading irch array");
                    }
                    let array = util2d::load_array::<i32, _>(&mut lines, shape, ext_units)?;
                    irch_entries.insert(kper, array);
                } else if irch_entries.is_empty() {
                    return Err(ReadRchError::ReuseBeforeDefine { period: kper });
                }
            }
        }

        let rech = Transient2d::new(shape, nper, Transient2dSource::PerPeriod(rech_entries))?;
        let irch = if option.has_layer_array() {
            // Values read from the file are already 1-based.
            Some(Transient2d::new(
                shape,
                nper,
                Transient2dSource::PerPeriod(irch_entries),
            )?)
        } else {
            None
        };
        model.register_package(META);
        Ok(ModflowRch {
            option,
            ipakcb,
            rech,
            irch,
            grid: Grid { nper, ..grid },
            heading: HEADING.to_owned(),
        })
    }

    /// Reads a package from the file at `path`.
    pub fn load_from_path<P, M>(
        path: P,
        model: &mut M,
        nper: Option<usize>,
        ext_units: Option<&ExtUnitMap>,
    ) -> Result<ModflowRch, ReadRchError>
    where
        P: AsRef<Path>,
        M: Model,
    {
        let file = File::open(path)?;
        ModflowRch::load(BufReader::new(file), model, nper, ext_units)
    }
}

const META: PackageMeta = PackageMeta {
    name: "RCH",
    extension: "rch",
    unit: DEFAULT_UNIT,
};

/// Stress-period parameter selections: `inrech` records of `PARNAM
/// [INSTNAM]`, with unknown or absent instance names falling back to
/// the static instance. Selections are keyed by parameter name, so a
/// name listed twice collapses to one entry with the last instance
/// winning.
fn read_selection<R: BufRead>(
    lines: &mut LineReader<R>,
    table: &ParamTable,
    inrech: usize,
    kper: usize,
) -> Result<Vec<(String, String)>, ReadRchError> {
    // `inrech` is an unvalidated file token; don't size an
    // allocation from it.
    let mut selection: Vec<(String, String)> = Vec::with_capacity(inrech.min(16));
    for _ in 0..inrech {
        let line = lines.next_line()?.ok_or(ReadRchError::BadRecord {
            period: kper,
            line: String::new(),
        })?;
        let mut tokens = line.split_whitespace();
        let pname = tokens
            .next()
            .ok_or_else(|| ReadRchError::BadRecord {
                period: kper,
                line: line.clone(),
            })?
            .to_ascii_lowercase();
        let iname = tokens.next().map(|tok| tok.to_ascii_lowercase());
        let iname = table.instance_or_static(&pname, iname.as_deref());
        match selection.iter_mut().find(|(name, _)| *name == pname) {
            Some(entry) => entry.1 = iname,
            None => selection.push((pname, iname)),
        }
    }
    Ok(selection)
}

/// The file format stores layer indices 1-based; callers supply them
/// 0-based, zone style.
fn shift_indices(source: Transient2dSource<i32>) -> Transient2dSource<i32> {
    match source {
        Transient2dSource::Constant(value) => Transient2dSource::Constant(value + 1),
        Transient2dSource::Array(array) => Transient2dSource::Array(array.mapv(|v| v + 1)),
        Transient2dSource::PerPeriod(entries) => Transient2dSource::PerPeriod(
            entries
                .into_iter()
                .map(|(kper, array)| (kper, array.mapv(|v| v + 1)))
                .collect(),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::BasicModel;

    fn model(nper: usize) -> BasicModel {
        BasicModel::new(Grid {
            nrow: 2,
            ncol: 2,
            nlay: 1,
            nper,
        })
    }

    #[test]
    fn option_codes_round_trip() {
        for option in [
            RchOption::TopLayer,
            RchOption::SpecifiedLayer,
            RchOption::HighestActive,
        ] {
            assert_eq!(RchOption::from_code(option.code()), Some(option));
        }
        assert_eq!(RchOption::from_code(0), None);
        assert_eq!(RchOption::from_code(4), None);
    }

    #[test]
    fn only_specified_layer_carries_the_index_array() {
        assert!(RchOption::SpecifiedLayer.has_layer_array());
        assert!(!RchOption::TopLayer.has_layer_array());
        assert!(!RchOption::HighestActive.has_layer_array());
    }

    #[test]
    fn construction_registers_the_package() {
        let mut model = model(1);
        ModflowRch::new(&mut model, RchOption::HighestActive, 0, 1e-3, 0).unwrap();
        assert_eq!(model.packages, vec![META]);
    }

    #[test]
    fn index_array_dropped_unless_option_asks_for_it() {
        let mut model = model(1);
        let rch = ModflowRch::new(&mut model, RchOption::TopLayer, 0, 1e-3, 5).unwrap();
        assert!(rch.irch().is_none());
    }

    #[test]
    fn indices_are_stored_one_based() {
        let mut model = model(1);
        let rch = ModflowRch::new(&mut model, RchOption::SpecifiedLayer, 0, 1e-3, 0).unwrap();
        let irch = rch.irch().unwrap();
        assert!(irch.array(0).iter().all(|&v| v == 1));
    }

    #[test]
    fn ncells_is_the_grid_footprint() {
        let mut model = model(1);
        let rch = ModflowRch::new(&mut model, RchOption::HighestActive, 0, 1e-3, 0).unwrap();
        assert_eq!(rch.ncells(), 4);
    }
}
