//! Tests against hand-written files and the exact output layout.

use modflow_rch::{
    BasicModel, ExtUnitMap, Grid, ModflowRch, ParamError, RchOption, ReadRchError,
};
use ndarray::{array, Array2};
use std::io::Write;

fn model(nrow: usize, ncol: usize, nper: usize) -> BasicModel {
    BasicModel::new(Grid {
        nrow,
        ncol,
        nlay: 1,
        nper,
    })
}

#[test]
fn written_layout_matches_the_reference_writer() {
    let mut m = model(3, 3, 1);
    let rch = ModflowRch::new(&mut m, RchOption::HighestActive, 0, 1e-3, 0).unwrap();
    let mut out = Vec::new();
    rch.write_file(&mut out).unwrap();
    let text = String::from_utf8(out).unwrap();

    let expected = "\
# RCH for MODFLOW, generated by modflow-rch.
         3         0
         0        -1 # Stress period 1
   1.000000E-03   1.000000E-03   1.000000E-03
   1.000000E-03   1.000000E-03   1.000000E-03
   1.000000E-03   1.000000E-03   1.000000E-03
";
    assert_eq!(text, expected);
}

#[test]
fn no_index_block_even_when_an_index_source_was_supplied() {
    let mut m = model(2, 2, 1);
    let rch = ModflowRch::new(&mut m, RchOption::HighestActive, 0, 1e-3, 7).unwrap();
    let mut out = Vec::new();
    rch.write_file(&mut out).unwrap();
    let text = String::from_utf8(out).unwrap();

    // Heading, header, one period record, two array rows. Nothing
    // else.
    assert_eq!(text.lines().count(), 5);
    assert!(text.contains("        0        -1 # Stress period 1"));
    assert!(!text.contains("         7"));
}

#[test]
fn constant_record_loads_a_uniform_array() {
    let text = "\
# hand-written model
         1         0
         0        -1 # Stress period 1
CONSTANT 3.5E-04
";
    let mut m = model(4, 2, 1);
    let loaded = ModflowRch::load(text.as_bytes(), &mut m, None, None).unwrap();
    assert_eq!(loaded.option(), RchOption::TopLayer);
    assert!(loaded.rech().array(0).iter().all(|&v| v == 3.5e-4));
}

#[test]
fn nonzero_budget_unit_is_registered_and_replaced() {
    let text = "\
         3        87
         0        -1
CONSTANT 1.0
";
    let mut m = model(1, 1, 1);
    let loaded = ModflowRch::load(text.as_bytes(), &mut m, None, None).unwrap();
    assert_eq!(m.output_units, vec![87]);
    // The literal unit from the file is discarded in favor of the
    // conventional budget unit.
    assert_eq!(loaded.ipakcb(), 53);
}

#[test]
fn garbage_budget_unit_token_means_no_output() {
    let text = "\
         3   library
         0        -1
CONSTANT 1.0
";
    let mut m = model(1, 1, 1);
    let loaded = ModflowRch::load(text.as_bytes(), &mut m, None, None).unwrap();
    assert!(m.output_units.is_empty());
    assert_eq!(loaded.ipakcb(), 0);
}

#[test]
fn parameter_file_resolves_to_concrete_arrays() {
    let text = "\
PARAMETER  2
         3         0
RCH_EAST  RCH  1.5  1
NONE  ALL
RCH_WEST  RCH  0.25  1
NONE  ALL
         2        -1 # Stress period 1
RCH_EAST
RCH_WEST
         1        -1 # Stress period 2
RCH_EAST
";
    let mut m = model(2, 2, 2);
    let loaded = ModflowRch::load(text.as_bytes(), &mut m, None, None).unwrap();
    assert_eq!(loaded.rech().array(0), &Array2::from_elem((2, 2), 1.75f32));
    assert_eq!(loaded.rech().array(1), &Array2::from_elem((2, 2), 1.5f32));
}

#[test]
fn parameter_instances_fall_back_to_static() {
    let text = "\
PARAMETER  1
         3         0
RCH_P  RCH  2.0  1
NONE  ALL
         1        -1 # Stress period 1
RCH_P  NO_SUCH_INSTANCE
";
    let mut m = model(1, 2, 1);
    let loaded = ModflowRch::load(text.as_bytes(), &mut m, None, None).unwrap();
    assert_eq!(loaded.rech().array(0), &array![[2.0f32, 2.0]]);
}

#[test]
fn repeated_parameter_selection_counts_once() {
    let text = "\
PARAMETER  1
         3         0
RCH_P  RCH  2.0  1
NONE  ALL
         2        -1 # Stress period 1
RCH_P
RCH_P
";
    let mut m = model(1, 2, 1);
    let loaded = ModflowRch::load(text.as_bytes(), &mut m, None, None).unwrap();
    // Selections are keyed by name, so the value is not doubled.
    assert_eq!(loaded.rech().array(0), &array![[2.0f32, 2.0]]);
}

#[test]
fn huge_selection_count_fails_instead_of_allocating() {
    let text = "\
PARAMETER  1
         3         0
RCH_P  RCH  2.0  1
NONE  ALL
2000000000        -1 # Stress period 1
RCH_P
";
    let mut m = model(1, 1, 1);
    match ModflowRch::load(text.as_bytes(), &mut m, None, None) {
        Err(ReadRchError::BadRecord { period: 0, .. }) => {}
        other => panic!("expected BadRecord, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn undefined_parameter_selection_fails() {
    let text = "\
PARAMETER  1
         3         0
RCH_P  RCH  2.0  1
NONE  ALL
         1        -1 # Stress period 1
GHOST
";
    let mut m = model(1, 1, 1);
    match ModflowRch::load(text.as_bytes(), &mut m, None, None) {
        Err(ReadRchError::Param(ParamError::UnknownParameter(name))) => assert_eq!(name, "ghost"),
        other => panic!("expected UnknownParameter, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn non_numeric_record_field_is_an_error() {
    let text = "\
         3         0
       abc        -1 # Stress period 1
";
    let mut m = model(1, 1, 1);
    match ModflowRch::load(text.as_bytes(), &mut m, None, None) {
        Err(ReadRchError::BadRecord { period: 0, .. }) => {}
        other => panic!("expected BadRecord, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn specified_layer_requires_the_second_field() {
    let text = "\
         2         0
         0
CONSTANT 1.0
";
    let mut m = model(1, 1, 1);
    match ModflowRch::load(text.as_bytes(), &mut m, None, None) {
        Err(ReadRchError::BadRecord { period: 0, .. }) => {}
        other => panic!("expected BadRecord, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn unknown_option_code_is_an_error() {
    let text = "         9         0\n";
    let mut m = model(1, 1, 1);
    match ModflowRch::load(text.as_bytes(), &mut m, None, None) {
        Err(ReadRchError::BadOption(9)) => {}
        other => panic!("expected BadOption, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn reuse_on_the_first_period_is_an_error() {
    let text = "\
         3         0
        -1        -1 # Stress period 1
";
    let mut m = model(1, 1, 1);
    match ModflowRch::load(text.as_bytes(), &mut m, None, None) {
        Err(ReadRchError::ReuseBeforeDefine { period: 0 }) => {}
        other => panic!("expected ReuseBeforeDefine, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn external_record_reads_through_the_unit_registry() {
    let dir = tempfile::tempdir().unwrap();
    let array_path = dir.path().join("rech_sp1.dat");
    let mut file = std::fs::File::create(&array_path).unwrap();
    writeln!(file, "1.0 2.0").unwrap();
    writeln!(file, "3.0 4.0").unwrap();
    drop(file);

    let text = "\
         3         0
         0        -1 # Stress period 1
EXTERNAL 44 1.0 (FREE) -1
";
    let mut units = ExtUnitMap::new();
    units.insert(44, &array_path);

    let mut m = model(2, 2, 1);
    let loaded = ModflowRch::load(text.as_bytes(), &mut m, None, Some(&units)).unwrap();
    assert_eq!(loaded.rech().array(0), &array![[1.0f32, 2.0], [3.0, 4.0]]);

    // The same file without the registry entry fails.
    let mut m = model(2, 2, 1);
    match ModflowRch::load(text.as_bytes(), &mut m, None, None) {
        Err(ReadRchError::Array(err)) => {
            assert!(err.to_string().contains("unit 44"), "got: {}", err);
        }
        other => panic!("expected Array error, got {:?}", other.map(|_| ())),
    }
}
