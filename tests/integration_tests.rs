//! Integration tests for the parse / transform / optimise pipeline.
//!
//! Fixtures live in `tests/fixtures`. Most checks are structural (bounds,
//! primitive counts, validation results); the optimizer output for the
//! pocket fixture is pinned exactly since every value in it is exact.

use gcode_tools::model::CONVERTED_COMMENT;
use gcode_tools::transform::{air_travel, extract, Shape};
use gcode_tools::{
    area_cut, merge_documents, multipass, optimize_with_report, parse_program, serialize_program,
    serialize_with, validate_program, ArcCorrector, Axis, FilterChain, Flip, Pocket, Program,
    Rotate, Settings, Translate, Units,
};
use pretty_assertions::assert_eq;
use std::collections::BTreeMap;

const POCKET: &str = include_str!("fixtures/pocket.ngc");
const INCH: &str = include_str!("fixtures/inch.ngc");

// ==================== Test Helpers ====================

fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-6
}

/// Assert two programs hold the same commands, values compared to 1e-4.
fn assert_same_commands(a: &Program, b: &Program) {
    assert_eq!(a.len(), b.len());
    for (x, y) in a.iter().zip(b.iter()) {
        assert!(x.matches(y), "{} != {}", x, y);
    }
}

// ==================== Parsing ====================

#[test]
fn test_pocket_bounds() {
    let program = parse_program(POCKET);

    assert_eq!(program.len(), 26);
    assert_eq!(program.units(), Units::Millimetre);
    assert_eq!(
        program.bounds().as_tuple(),
        (
            Some(0.0),
            Some(62.0),
            Some(0.0),
            Some(40.0),
            Some(-2.0),
            Some(3.0)
        )
    );
}

#[test]
fn test_inch_fixture_normalised() {
    let program = parse_program(INCH);
    let commands = program.commands();

    assert_eq!(program.units(), Units::Inch);
    assert_eq!(commands[0].word, "G21");
    assert_eq!(commands[0].comment.as_deref(), Some(CONVERTED_COMMENT));
    assert!(approx(commands[1].get(Axis::Z).unwrap_or_default(), 2.54));
    assert!(approx(commands[3].get(Axis::Z).unwrap_or_default(), -1.27));
    assert_eq!(commands[3].get(Axis::F), Some(10.0));
    assert!(approx(commands[4].get(Axis::X).unwrap_or_default(), 25.4));
    assert!(approx(commands[4].get(Axis::Y).unwrap_or_default(), 12.7));
    assert!(serialize_program(&program).starts_with("G21 (converted from inch to mm)\n"));
}

// ==================== Transforms ====================

#[test]
fn test_reorigin_then_rotate() {
    let program = parse_program(POCKET);
    let mut chain = FilterChain::new()
        .with(Translate::new(-10.0, -10.0, 0.0))
        .with(Rotate::new(90.0));
    let turned = program.clone_with(&mut chain);

    // (60, 10) -> (50, 0) -> (0, 50)
    let slot_end = &turned.commands()[8];
    assert!(approx(slot_end.get(Axis::X).unwrap_or_default(), 0.0));
    assert!(approx(slot_end.get(Axis::Y).unwrap_or_default(), 50.0));

    // The source is never modified.
    assert_eq!(program.commands()[8].get(Axis::X), Some(60.0));
}

#[test]
fn test_flip_about_center_twice() {
    let program = parse_program(POCKET);
    let flip = Flip::about_center(&program, true, false);
    let once = program.clone_with(&mut FilterChain::new().with(flip.clone()));
    let twice = once.clone_with(&mut FilterChain::new().with(flip));

    assert_eq!(once.commands()[18].word, "G03");
    assert_eq!(once.bounds().x, program.bounds().x);
    assert_same_commands(&program, &twice);
}

#[test]
fn test_fix_arcs_clears_validation_warning() {
    let program = parse_program(POCKET);
    let before = validate_program(&program);
    assert!(before.passed);
    assert_eq!(before.warnings.len(), 1);
    assert!(before.warnings[0].starts_with("Command 19: Arc radius differs"));

    let mut corrector = ArcCorrector::new();
    let fixed = program.clone_with(&mut corrector);
    assert_eq!(corrector.stats().adjusted, 1);
    assert_eq!(corrector.stats().skipped, 0);

    let after = validate_program(&fixed);
    assert!(after.passed);
    assert!(after.warnings.is_empty(), "{:?}", after.warnings);
}

// ==================== Optimizer ====================

#[test]
fn test_optimize_pocket() {
    let program = parse_program(POCKET);
    let (optimised, report) = optimize_with_report(&program);

    insta::assert_snapshot!(serialize_program(&optimised).trim_end(), @r"
    (pocket.ngc - test fixture)
    G21
    G90
    G00 Z3.0000
    G00 X0.0000 Y0.0000
    (slot A)
    G00 X40.0000 Y10.0000
    G01 Z-1.0000 F120.0000
    G01 X60.0000 Y10.0000
    G00 Z3.0000
    G00 X62.0000 Y12.0000
    G01 Z-2.0000
    G00 Z3.0000
    G00 X20.0000 Y10.0000
    G01 Z-1.0000
    G01 X5.0000 Y10.0000
    G00 Z3.0000
    G00 X20.0000 Y30.0000
    G01 Z-1.0000
    G02 X30.0000 Y40.0000 I10.0000 J0.0100
    G00 Z3.0000
    M05
    M02
    ");

    assert_eq!(report.primitives, 4);
    assert_eq!(report.dropped, 3);
    assert_eq!(report.cut_depth, Some(-2.0));
    assert_eq!(report.safe_height, 3.0);
    assert!(report.travel_after < report.travel_before);
    assert!(approx(report.travel_before, air_travel(&program)));
}

#[test]
fn test_optimize_keeps_every_cut() {
    let program = parse_program(POCKET);
    let (optimised, _) = optimize_with_report(&program);

    let count = |p: &Program| {
        let extraction = extract(p);
        let points = extraction
            .primitives
            .iter()
            .filter(|p| matches!(p.shape, Shape::Point(_)))
            .count();
        (extraction.primitives.len(), points)
    };

    assert_eq!(count(&program), (4, 1));
    assert_eq!(count(&optimised), (4, 1));
    assert!(validate_program(&optimised).passed);
}

// ==================== Multipass and merge ====================

#[test]
fn test_multipass_pocket() {
    let parsed = gcode_tools::Parser::new()
        .with_window(gcode_tools::CommandWindow::boilerplate())
        .parse(POCKET);
    assert_eq!(parsed.program.len(), 20);

    let result = multipass(&parsed.program, -3.0, 5.0, -1.0);
    assert_eq!(result.len(), 60);
    assert_eq!(result.bounds().z.min, Some(-3.0));
    assert_eq!(result.bounds().z.max, Some(5.0));

    let depths: Vec<f64> = result
        .iter()
        .filter_map(|c| c.get(Axis::Z))
        .filter(|z| *z < 0.0)
        .collect();
    assert_eq!(depths.len(), 12);
    assert_eq!(&depths[..4], &[-1.0; 4]);
    assert_eq!(&depths[8..], &[-3.0; 4]);
}

#[test]
fn test_merge_documents() {
    let merged = merge_documents([POCKET, INCH]);

    assert_eq!(merged.len(), 23);
    assert_eq!(merged.units(), Units::Millimetre);
    assert_eq!(merged.commands()[19].word, "M05");
    assert!(approx(merged.bounds().z.max.unwrap_or_default(), 3.0));
    assert!(approx(merged.commands()[21].get(Axis::X).unwrap_or_default(), 25.4));
}

// ==================== Pocket generators ====================

#[test]
fn test_area_cut_pipeline() {
    let pocket = Pocket::new(10.0, 7.5)
        .with_tool(2.5)
        .with_depths(-2.0, 3.0);
    let generated = area_cut(&pocket).unwrap();
    let text = serialize_program(&generated);
    assert_same_commands(&generated, &parse_program(&text));

    let (optimised, report) = optimize_with_report(&generated);
    assert_eq!(report.primitives, 8);
    assert!(report.travel_after <= report.travel_before);
    assert!(serialize_program(&optimised).contains("G01 Z-2.0000 F25.4000\n"));

    let windowed = gcode_tools::Parser::new()
        .with_window(gcode_tools::CommandWindow::boilerplate())
        .parse(&text)
        .program;
    let passes = multipass(&windowed, -2.0, 3.0, -1.0);
    let cuts = extract(&passes).primitives;
    assert_eq!(cuts.len(), 16);
    assert_eq!(cuts[0].depth, -1.0);
    assert_eq!(cuts[15].depth, -2.0);
}

#[test]
fn test_fix_arcs_handles_modal_arcs() {
    let program = parse_program("G21\nG00 X0 Y0\nG01 Z-1\nG02 X10 Y0 I5 J0\nX20 Y0.2 I5 J0.5\nG00 Z3\n");
    assert_eq!(validate_program(&program).warnings.len(), 1);

    let fixed = program.clone_with(&mut ArcCorrector::new());
    assert!(validate_program(&fixed).is_clean());
}

// ==================== Settings ====================

#[test]
fn test_settings_wrap_output() {
    let settings = Settings::from_json_str(
        r#"
# shared defaults
{
  // travel height
  "defaults": { "safe": 5.0 },
  "prefix": ["G21", "G00 Z$safe"],
  "suffix": ["G00 Z${safe}", "M02"]
}
"#,
    )
    .unwrap();

    let safe = settings.resolve("safe", None, Some(3.0)).unwrap();
    assert_eq!(safe, 5.0);
    assert!(settings.resolve("cut", None, None).is_err());

    let mut values = BTreeMap::new();
    values.insert("safe".to_string(), safe);

    let program = parse_program("G01 X1 Y2");
    let text = serialize_with(
        &program,
        &settings.render_prefix(&values),
        &settings.render_suffix(&values),
    );
    assert_eq!(
        text,
        "G21\nG00 Z5.0000\nG01 X1.0000 Y2.0000\nG00 Z5.0000\nM02\n"
    );
}
