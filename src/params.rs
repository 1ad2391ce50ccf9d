//! Legacy multiplier/zone parameter tables.
//!
//! Older model files can define boundary-condition values through
//! named parameters instead of literal arrays. A parameter carries a
//! value and one or more clusters, each naming a multiplier array, a
//! zone array, and the zone numbers it applies to; time-varying
//! parameters group their clusters into named instances. Stress
//! periods then select parameter instances, and the selected values
//! are summed into one concrete array. The in-memory package keeps
//! only that resolved array.

use crate::model::Model;
use crate::util2d::LineReader;
use ndarray::Array2;
use std::collections::HashMap;
use std::error::Error;
use std::fmt;
use std::io::{self, BufRead};

/// Instance name used for parameters defined without `INSTANCES`.
pub const STATIC_INSTANCE: &str = "static";

/// An error reading or resolving a parameter table.
#[derive(Debug)]
pub enum ParamError {
    /// An I/O error.
    Io(io::Error),
    /// A parameter, instance, or cluster record with missing or
    /// unparseable fields.
    Malformed { line_no: usize, line: String },
    /// The input ended inside the table.
    Eof { line_no: usize },
    /// A stress period selected a parameter the table does not
    /// define.
    UnknownParameter(String),
    /// A cluster named a multiplier or zone array the model does not
    /// supply.
    MissingAux { kind: &'static str, name: String },
    /// A supplied auxiliary array does not match the grid shape.
    AuxShape {
        name: String,
        expected: (usize, usize),
        actual: (usize, usize),
    },
}

impl Error for ParamError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ParamError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl fmt::Display for ParamError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ParamError::Io(err) => write!(f, "I/O error: {}", err),
            ParamError::Malformed { line_no, line } => {
                write!(f, "malformed parameter record on line {}: {:?}", line_no, line)
            }
            ParamError::Eof { line_no } => {
                write!(f, "input ended inside parameter table after line {}", line_no)
            }
            ParamError::UnknownParameter(name) => write!(f, "unknown parameter {:?}", name),
            ParamError::MissingAux { kind, name } => {
                write!(f, "model supplies no {} array named {:?}", kind, name)
            }
            ParamError::AuxShape {
                name,
                expected,
                actual,
            } => write!(
                f,
                "auxiliary array {:?} has shape {:?}, expected {:?}",
                name, actual, expected
            ),
        }
    }
}

impl From<io::Error> for ParamError {
    fn from(err: io::Error) -> ParamError {
        ParamError::Io(err)
    }
}

/// One cluster of a parameter: where the parameter value applies and
/// what multiplies it there.
#[derive(Debug, Clone, PartialEq)]
pub struct Cluster {
    /// Multiplier array name; `None` for the literal `NONE`.
    pub mult: Option<String>,
    /// Zone array name; `None` for the literal `ALL` (whole grid).
    pub zone: Option<String>,
    /// Zone numbers the cluster applies to; empty iff `zone` is
    /// `None`.
    pub izones: Vec<i32>,
}

/// A named parameter: its value and its clusters, grouped by
/// instance.
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub value: f32,
    pub instances: HashMap<String, Vec<Cluster>>,
}

/// The parameter definitions of one package file.
#[derive(Debug, Clone, Default)]
pub struct ParamTable {
    params: HashMap<String, Param>,
}

impl ParamTable {
    /// Reads `npar` parameter definitions.
    ///
    /// Each definition is one record `PARNAM PARTYP Parval NCLU
    /// [INSTANCES NUMINST]`, followed by `NCLU` cluster records
    /// `MLTARR ZONARR [IZ...]` — once for a static parameter, or once
    /// per instance after the instance-name record for a time-varying
    /// one. Names are folded to lower case.
    pub fn load<R: BufRead>(
        lines: &mut LineReader<R>,
        npar: usize,
    ) -> Result<ParamTable, ParamError> {
        let mut params = HashMap::new();
        for _ in 0..npar {
            let line = require_line(lines)?;
            let t: Vec<&str> = line.split_whitespace().collect();
            if t.len() < 4 {
                return Err(malformed(lines, &line));
            }
            let name = t[0].to_ascii_lowercase();
            let value: f32 = t[2].parse().map_err(|_| malformed(lines, &line))?;
            let nclu: usize = t[3].parse().map_err(|_| malformed(lines, &line))?;
            let numinst: usize = if t.len() >= 6 && t[4].eq_ignore_ascii_case("instances") {
                t[5].parse().map_err(|_| malformed(lines, &line))?
            } else {
                0
            };
            let mut instances = HashMap::new();
            if numinst == 0 {
                instances.insert(STATIC_INSTANCE.to_owned(), read_clusters(lines, nclu)?);
            } else {
                for _ in 0..numinst {
                    let iline = require_line(lines)?;
                    let iname = iline
                        .split_whitespace()
                        .next()
                        .ok_or_else(|| malformed(lines, &iline))?
                        .to_ascii_lowercase();
                    instances.insert(iname, read_clusters(lines, nclu)?);
                }
            }
            params.insert(name, Param { value, instances });
        }
        Ok(ParamTable { params })
    }

    pub fn contains(&self, pname: &str) -> bool {
        self.params.contains_key(pname)
    }

    pub fn get(&self, pname: &str) -> Option<&Param> {
        self.params.get(pname)
    }

    /// The instance name a stress-period selection resolves to:
    /// `iname` when the parameter defines it, the static instance
    /// otherwise (including when no instance was named at all).
    pub fn instance_or_static(&self, pname: &str, iname: Option<&str>) -> String {
        match (self.params.get(pname), iname) {
            (Some(param), Some(iname)) if param.instances.contains_key(iname) => iname.to_owned(),
            _ => STATIC_INSTANCE.to_owned(),
        }
    }

    /// Sums the selected parameter instances into one array:
    /// `Parval × multiplier` over the cells each cluster's zone
    /// covers. Auxiliary arrays come from the model.
    pub fn resolve<M: Model>(
        &self,
        model: &M,
        shape: (usize, usize),
        selection: &[(String, String)],
    ) -> Result<Array2<f32>, ParamError> {
        let mut out = Array2::<f32>::zeros(shape);
        for (pname, iname) in selection {
            let param = self
                .params
                .get(pname)
                .ok_or_else(|| ParamError::UnknownParameter(pname.clone()))?;
            let clusters = param
                .instances
                .get(iname)
                .or_else(|| param.instances.get(STATIC_INSTANCE))
                .ok_or_else(|| ParamError::UnknownParameter(pname.clone()))?;
            for cluster in clusters {
                let mult = match &cluster.mult {
                    Some(name) => {
                        let view = model.mult_array(name).ok_or_else(|| ParamError::MissingAux {
                            kind: "multiplier",
                            name: name.clone(),
                        })?;
                        check_aux_shape(name, shape, view.dim())?;
                        Some(view)
                    }
                    None => None,
                };
                let zone = match &cluster.zone {
                    Some(name) => {
                        let view = model.zone_array(name).ok_or_else(|| ParamError::MissingAux {
                            kind: "zone",
                            name: name.clone(),
                        })?;
                        check_aux_shape(name, shape, view.dim())?;
                        Some(view)
                    }
                    None => None,
                };
                for ((row, col), cell) in out.indexed_iter_mut() {
                    if let Some(zone) = &zone {
                        if !cluster.izones.contains(&zone[(row, col)]) {
                            continue;
                        }
                    }
                    let m = mult.as_ref().map_or(1.0, |m| m[(row, col)]);
                    *cell += param.value * m;
                }
            }
        }
        Ok(out)
    }
}

fn check_aux_shape(
    name: &str,
    expected: (usize, usize),
    actual: (usize, usize),
) -> Result<(), ParamError> {
    if actual == expected {
        Ok(())
    } else {
        Err(ParamError::AuxShape {
            name: name.to_owned(),
            expected,
            actual,
        })
    }
}

fn read_clusters<R: BufRead>(
    lines: &mut LineReader<R>,
    nclu: usize,
) -> Result<Vec<Cluster>, ParamError> {
    // `nclu` is an unvalidated file token; don't size an allocation
    // from it.
    let mut clusters = Vec::with_capacity(nclu.min(16));
    for _ in 0..nclu {
        let line = require_line(lines)?;
        let t: Vec<&str> = line.split_whitespace().collect();
        if t.len() < 2 {
            return Err(malformed(lines, &line));
        }
        let mult = if t[0].eq_ignore_ascii_case("none") {
            None
        } else {
            Some(t[0].to_ascii_lowercase())
        };
        let (zone, izones) = if t[1].eq_ignore_ascii_case("all") {
            (None, Vec::new())
        } else {
            let izones = t[2..]
                .iter()
                .map(|tok| tok.parse())
                .collect::<Result<Vec<i32>, _>>()
                .map_err(|_| malformed(lines, &line))?;
            if izones.is_empty() {
                return Err(malformed(lines, &line));
            }
            (Some(t[1].to_ascii_lowercase()), izones)
        };
        clusters.push(Cluster { mult, zone, izones });
    }
    Ok(clusters)
}

fn require_line<R: BufRead>(lines: &mut LineReader<R>) -> Result<String, ParamError> {
    lines.next_line()?.ok_or(ParamError::Eof {
        line_no: lines.line_no(),
    })
}

fn malformed<R>(lines: &LineReader<R>, line: &str) -> ParamError
where
    R: BufRead,
{
    ParamError::Malformed {
        line_no: lines.line_no(),
        line: line.to_owned(),
    }
}
