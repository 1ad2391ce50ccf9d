//! Reading and writing of single 2D model arrays.
//!
//! A MODFLOW array block is either free-format data (whitespace-
//! separated values filling the grid row by row) or an array control
//! record redirecting the reader: `CONSTANT` fills the grid with one
//! value, `INTERNAL` announces data on the following lines, and
//! `EXTERNAL`/`OPEN/CLOSE` point at another file. The control records
//! carry a `CNSTNT` multiplier applied to every value read.

mod element;

pub use self::element::ArrayElement;

use ndarray::{Array2, ShapeError};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};

/// An error reading a 2D array block.
#[derive(Debug)]
pub enum ReadArrayError {
    /// An I/O error.
    Io(io::Error),
    /// The input ended before the grid was filled.
    Eof { read: usize, needed: usize },
    /// A token could not be parsed as the element type.
    BadValue { line_no: usize, token: String },
    /// An array control record with missing or unparseable fields.
    BadControlRecord(String),
    /// An `EXTERNAL` record named a unit absent from the registry.
    MissingUnit(i32),
    /// The collected values did not fit the grid shape.
    Shape(ShapeError),
}

impl Error for ReadArrayError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ReadArrayError::Io(err) => Some(err),
            ReadArrayError::Shape(err) => Some(err),
            _ => None,
        }
    }
}

impl fmt::Display for ReadArrayError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ReadArrayError::Io(err) => write!(f, "I/O error: {}", err),
            ReadArrayError::Eof { read, needed } => {
                write!(f, "input ended after {} of {} array values", read, needed)
            }
            ReadArrayError::BadValue { line_no, token } => {
                write!(f, "bad array value {:?} on line {}", token, line_no)
            }
            ReadArrayError::BadControlRecord(line) => {
                write!(f, "bad array control record: {:?}", line)
            }
            ReadArrayError::MissingUnit(unit) => {
                write!(f, "no file registered for external unit {}", unit)
            }
            ReadArrayError::Shape(err) => write!(f, "array shape error: {}", err),
        }
    }
}

impl From<io::Error> for ReadArrayError {
    fn from(err: io::Error) -> ReadArrayError {
        ReadArrayError::Io(err)
    }
}

impl From<ShapeError> for ReadArrayError {
    fn from(err: ShapeError) -> ReadArrayError {
        ReadArrayError::Shape(err)
    }
}

/// Registry mapping MODFLOW file unit numbers to the files behind
/// them, consulted when an `EXTERNAL` control record is read.
#[derive(Debug, Clone, Default)]
pub struct ExtUnitMap {
    units: BTreeMap<i32, PathBuf>,
}

impl ExtUnitMap {
    pub fn new() -> ExtUnitMap {
        ExtUnitMap::default()
    }

    pub fn insert<P: Into<PathBuf>>(&mut self, unit: i32, path: P) {
        self.units.insert(unit, path.into());
    }

    pub fn path(&self, unit: i32) -> Option<&Path> {
        self.units.get(&unit).map(|p| p.as_path())
    }
}

/// Line-at-a-time reader shared by the package and array loaders.
///
/// Array blocks have no terminator of their own; the surrounding
/// package grammar decides where one record ends and the next begins,
/// so everything reads through a single cursor.
#[derive(Debug)]
pub struct LineReader<R> {
    inner: R,
    line_no: usize,
}

impl<R: BufRead> LineReader<R> {
    pub fn new(inner: R) -> LineReader<R> {
        LineReader { inner, line_no: 0 }
    }

    /// Number of the most recently read line, 1-based.
    pub fn line_no(&self) -> usize {
        self.line_no
    }

    /// The next line with the trailing newline removed, or `None` at
    /// end of input.
    pub fn next_line(&mut self) -> io::Result<Option<String>> {
        let mut line = String::new();
        if self.inner.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        self.line_no += 1;
        while line.ends_with('\n') || line.ends_with('\r') {
            line.pop();
        }
        Ok(Some(line))
    }
}

/// Formats an array as free-format rows of fixed-width fields, one
/// grid row per line. This is the block the package writer emits.
pub fn format_array<A: ArrayElement>(array: &Array2<A>) -> String {
    let mut out = String::new();
    for row in array.rows() {
        for value in row.iter() {
            out.push_str(&value.format_field());
        }
        out.push('\n');
    }
    out
}

/// Reads one `(nrow, ncol)` array from `lines`, honoring array
/// control records on the first line.
pub fn load_array<A, R>(
    lines: &mut LineReader<R>,
    shape: (usize, usize),
    ext_units: Option<&ExtUnitMap>,
) -> Result<Array2<A>, ReadArrayError>
where
    A: ArrayElement,
    R: BufRead,
{
    let needed = shape.0 * shape.1;
    let first = match lines.next_line()? {
        Some(line) => line,
        None => return Err(ReadArrayError::Eof { read: 0, needed }),
    };
    let tokens: Vec<&str> = first.split_whitespace().collect();
    let keyword = tokens
        .first()
        .map(|t| t.to_ascii_uppercase())
        .unwrap_or_default();
    match keyword.as_str() {
        "CONSTANT" => {
            let token = tokens
                .get(1)
                .ok_or_else(|| ReadArrayError::BadControlRecord(first.clone()))?;
            let value = A::parse_token(token).ok_or_else(|| ReadArrayError::BadValue {
                line_no: lines.line_no(),
                token: (*token).to_owned(),
            })?;
            Ok(Array2::from_elem(shape, value))
        }
        "INTERNAL" => {
            let cnstnt = control_cnstnt(&tokens, 1, &first)?;
            let mut values = Vec::with_capacity(needed);
            collect_values(lines, needed, &mut values)?;
            build(values, shape, cnstnt)
        }
        "EXTERNAL" => {
            let unit: i32 = tokens
                .get(1)
                .and_then(|t| t.parse().ok())
                .ok_or_else(|| ReadArrayError::BadControlRecord(first.clone()))?;
            let cnstnt = control_cnstnt(&tokens, 2, &first)?;
            let path = ext_units
                .and_then(|units| units.path(unit))
                .ok_or(ReadArrayError::MissingUnit(unit))?;
            load_from_file(path, shape, needed, cnstnt)
        }
        "OPEN/CLOSE" => {
            let path = tokens
                .get(1)
                .ok_or_else(|| ReadArrayError::BadControlRecord(first.clone()))?;
            let cnstnt = control_cnstnt(&tokens, 2, &first)?;
            load_from_file(Path::new(path), shape, needed, cnstnt)
        }
        _ => {
            // Free-format data starts on this line.
            let mut values = Vec::with_capacity(needed);
            push_tokens(&tokens, lines.line_no(), needed, &mut values)?;
            collect_values(lines, needed, &mut values)?;
            build(values, shape, 1.0)
        }
    }
}

/// `CNSTNT` field of a control record: absent means 1, and MODFLOW
/// treats a stored 0 as 1.
fn control_cnstnt(tokens: &[&str], index: usize, line: &str) -> Result<f64, ReadArrayError> {
    match tokens.get(index) {
        None => Ok(1.0),
        Some(token) => {
            let value: f64 = token
                .parse()
                .map_err(|_| ReadArrayError::BadControlRecord(line.to_owned()))?;
            Ok(if value == 0.0 { 1.0 } else { value })
        }
    }
}

fn push_tokens<A: ArrayElement>(
    tokens: &[&str],
    line_no: usize,
    needed: usize,
    out: &mut Vec<A>,
) -> Result<(), ReadArrayError> {
    for token in tokens {
        if out.len() == needed {
            break;
        }
        let value = A::parse_token(token).ok_or_else(|| ReadArrayError::BadValue {
            line_no,
            token: (*token).to_owned(),
        })?;
        out.push(value);
    }
    Ok(())
}

fn collect_values<A, R>(
    lines: &mut LineReader<R>,
    needed: usize,
    out: &mut Vec<A>,
) -> Result<(), ReadArrayError>
where
    A: ArrayElement,
    R: BufRead,
{
    while out.len() < needed {
        let line = lines.next_line()?.ok_or(ReadArrayError::Eof {
            read: out.len(),
            needed,
        })?;
        let tokens: Vec<&str> = line.split_whitespace().collect();
        push_tokens(&tokens, lines.line_no(), needed, out)?;
    }
    Ok(())
}

fn load_from_file<A: ArrayElement>(
    path: &Path,
    shape: (usize, usize),
    needed: usize,
    cnstnt: f64,
) -> Result<Array2<A>, ReadArrayError> {
    let file = File::open(path)?;
    let mut lines = LineReader::new(BufReader::new(file));
    let mut values = Vec::with_capacity(needed);
    collect_values(&mut lines, needed, &mut values)?;
    build(values, shape, cnstnt)
}

fn build<A: ArrayElement>(
    values: Vec<A>,
    shape: (usize, usize),
    cnstnt: f64,
) -> Result<Array2<A>, ReadArrayError> {
    let mut array = Array2::from_shape_vec(shape, values)?;
    if cnstnt != 1.0 {
        array.mapv_inplace(|v| v.apply_cnstnt(cnstnt));
    }
    Ok(array)
}
