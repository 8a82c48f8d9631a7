use indoc::indoc;
use sketchport::core::{
    CrossReferenceTable, Decision, DiagnosticKind, SharedInterface, SharedInterfaceBuilder,
};
use sketchport::parsers::{SourceUnit, UnitRole};
use std::path::Path;

fn units(files: &[(&str, &str)]) -> Vec<SourceUnit> {
    files
        .iter()
        .enumerate()
        .map(|(id, (name, src))| {
            let role = UnitRole::from_extension(name.rsplit('.').next().unwrap()).unwrap();
            SourceUnit::parse(id, Path::new(name), role, src.to_string())
        })
        .collect()
}

fn freeze(units: &[SourceUnit]) -> SharedInterface {
    let xref = CrossReferenceTable::build(units);
    let mut builder = SharedInterfaceBuilder::new(units, &xref);
    for unit in units {
        builder.add_unit(unit);
    }
    builder.freeze()
}

fn decision<'i>(
    interface: &'i SharedInterface,
    units: &[SourceUnit],
    unit: usize,
    name: &str,
) -> &'i Decision {
    let index = units[unit]
        .declarations
        .iter()
        .position(|d| d.name == name)
        .unwrap();
    interface.decision((unit, index))
}

fn hoisted_by(files: &[&str]) -> Decision {
    Decision::Hoisted {
        referenced_by: files.iter().map(|f| f.to_string()).collect(),
    }
}

#[test]
fn applies_hoisting_policy_per_kind() {
    let units = units(&[
        (
            "Main.ino",
            indoc! {"
                #include <Arduino.h>
                #include <Wire.h>
                #define LED 13
                #define SQ(x) ((x) * (x))
                int shared = 1;
                int lonely;
                static int hidden;
                struct Reading { int value; };
                void helper() {}
                void privateFn() {}
                static void tick() {}
            "},
        ),
        (
            "helper.cpp",
            indoc! {"
                #include <Wire.h>
                #include <SPI.h>
                void useAll() {
                  Reading r;
                  shared = LED;
                  helper();
                  tick();
                  hidden++;
                }
            "},
        ),
    ]);
    let interface = freeze(&units);

    assert_eq!(decision(&interface, &units, 0, "LED"), &hoisted_by(&["helper.cpp"]));
    assert!(matches!(decision(&interface, &units, 0, "SQ"), Decision::Kept { .. }));
    assert_eq!(decision(&interface, &units, 0, "shared"), &hoisted_by(&["helper.cpp"]));
    assert_eq!(decision(&interface, &units, 0, "lonely"), &Decision::Local);
    assert!(matches!(decision(&interface, &units, 0, "hidden"), Decision::Kept { .. }));
    assert_eq!(decision(&interface, &units, 0, "Reading"), &hoisted_by(&["helper.cpp"]));
    assert_eq!(decision(&interface, &units, 0, "helper"), &hoisted_by(&["helper.cpp"]));
    assert_eq!(decision(&interface, &units, 0, "privateFn"), &Decision::Local);
    assert_eq!(decision(&interface, &units, 0, "tick"), &Decision::Local);
    assert_eq!(decision(&interface, &units, 1, "useAll"), &Decision::Local);

    let names: Vec<_> = interface.entries().iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, vec!["LED", "shared", "Reading", "helper"]);

    let includes: Vec<_> = interface.includes().iter().map(|i| i.target.as_str()).collect();
    assert_eq!(includes, vec!["Wire.h", "SPI.h"]);

    let prototypes: Vec<_> = interface.local_prototypes(&units[0]).collect();
    assert_eq!(prototypes.len(), 2);
    assert!(interface.diagnostics(0).is_empty());
    assert!(interface.diagnostics(1).is_empty());
}

#[test]
fn object_macros_hoist_even_when_unreferenced() {
    let units = units(&[("Main.ino", "#define UNUSED 1\nvoid setup() {}\n")]);
    let interface = freeze(&units);

    assert_eq!(decision(&interface, &units, 0, "UNUSED"), &hoisted_by(&[]));
    assert_eq!(decision(&interface, &units, 0, "setup"), &Decision::Local);
}

#[test]
fn header_units_only_contribute_macros() {
    let units = units(&[
        ("Main.ino", "void setup() { x = BAUD; f(); }\n"),
        (
            "config.h",
            indoc! {"
                #ifndef CONFIG_H
                #define CONFIG_H
                #define BAUD 9600
                int x;
                #endif
            "},
        ),
    ]);
    let interface = freeze(&units);

    assert_eq!(decision(&interface, &units, 1, "BAUD"), &hoisted_by(&["Main.ino"]));
    assert_eq!(
        decision(&interface, &units, 1, "x"),
        &Decision::Kept {
            reason: "declared in a header".to_string()
        }
    );
}

#[test]
fn later_duplicate_is_shadowed_with_warning() {
    let units = units(&[("a.cpp", "int counter;\n"), ("b.cpp", "int counter;\n")]);
    let interface = freeze(&units);

    assert_eq!(decision(&interface, &units, 0, "counter"), &hoisted_by(&["b.cpp"]));
    assert_eq!(
        decision(&interface, &units, 1, "counter"),
        &Decision::Shadowed {
            by_file: "a.cpp".to_string()
        }
    );
    assert_eq!(interface.entries().len(), 1);
    assert_eq!(interface.diagnostics(1).len(), 1);
    assert_eq!(interface.diagnostics(1)[0].kind, DiagnosticKind::DuplicateSymbol);
    assert_eq!(interface.diagnostics(1)[0].location.file, "b.cpp");
}

#[test]
fn exclusive_branches_become_variants() {
    let units = units(&[
        (
            "Main.ino",
            indoc! {"
                #ifdef ESP32
                int pin = 2;
                #else
                int pin = 13;
                #endif
            "},
        ),
        ("use.cpp", "void f() { pin++; }\n"),
    ]);
    let interface = freeze(&units);

    let entry = interface.entry("pin").unwrap();
    assert_eq!(entry.variants, vec![(0, 0), (0, 1)]);
    assert_eq!(entry.referenced_by, vec![1]);
    assert!(interface.decision((0, 0)).is_hoisted());
    assert!(interface.decision((0, 1)).is_hoisted());

    let kinds: Vec<_> = interface.diagnostics(0).iter().map(|d| d.kind).collect();
    assert_eq!(
        kinds,
        vec![
            DiagnosticKind::ConditionalBranchAmbiguity,
            DiagnosticKind::ConditionalBranchAmbiguity
        ]
    );
}

#[test]
fn types_named_by_shared_declarations_are_promoted() {
    let units = units(&[
        (
            "Main.ino",
            indoc! {"
                struct Config { int a; };
                struct Point { int x; int y; };
                Config config;
                static int dist(Point p) { return p.x; }
            "},
        ),
        ("other.cpp", "void use() { config.a = 1; }\n"),
    ]);
    let interface = freeze(&units);

    assert_eq!(decision(&interface, &units, 0, "config"), &hoisted_by(&["other.cpp"]));
    assert_eq!(decision(&interface, &units, 0, "Config"), &hoisted_by(&[]));
    assert_eq!(decision(&interface, &units, 0, "Point"), &Decision::MovedToLocal);
    assert_eq!(decision(&interface, &units, 0, "dist"), &Decision::Local);

    let names: Vec<_> = interface.entries().iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, vec!["config", "Config"]);
    assert_eq!(interface.local_types(0), &[1]);
    assert!(interface.local_types(1).is_empty());
}

#[test]
fn type_with_declarators_is_skipped() {
    let units = units(&[
        ("Main.ino", "struct Pair { int a; } pair;\n"),
        ("other.cpp", "void f() { Pair p; }\n"),
    ]);
    let interface = freeze(&units);

    assert!(matches!(
        decision(&interface, &units, 0, "Pair"),
        Decision::Skipped { .. }
    ));
    assert!(interface.entries().is_empty());
    assert_eq!(
        interface.diagnostics(0)[0].kind,
        DiagnosticKind::StructuralAmbiguity
    );
}
