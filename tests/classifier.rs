use indoc::indoc;
use sketchport::core::DiagnosticKind;
use sketchport::parsers::{DeclDetail, DeclKind, SourceUnit, Storage, UnitRole};
use std::path::Path;

fn parse(name: &str, src: &str) -> SourceUnit {
    let role = UnitRole::from_extension(name.rsplit('.').next().unwrap()).unwrap();
    SourceUnit::parse(0, Path::new(name), role, src.to_string())
}

fn names(unit: &SourceUnit, kind: DeclKind) -> Vec<&str> {
    unit.declarations
        .iter()
        .filter(|d| d.kind == kind)
        .map(|d| d.name.as_str())
        .collect()
}

#[test]
fn classifies_macros_by_parenthesis_placement() {
    let unit = parse(
        "main.ino",
        indoc! {"
            #define LED_PIN 13
            #define MAX(a, b) ((a) > (b) ? (a) : (b))
            #define WRAPPED (1 + 2)
            #define MULTI 1 + \\
                          2
        "},
    );

    assert_eq!(names(&unit, DeclKind::ObjectMacro), vec!["LED_PIN", "WRAPPED", "MULTI"]);
    assert_eq!(names(&unit, DeclKind::FunctionLikeMacro), vec!["MAX"]);

    let multi = unit.declarations.iter().find(|d| d.name == "MULTI").unwrap();
    assert_eq!(multi.line, 4);
    assert!(unit.declaration_text(multi).contains("2"));
    assert!(unit.diagnostics.is_empty());
}

#[test]
fn classifies_global_variables_with_declarators() {
    let unit = parse(
        "main.ino",
        indoc! {r#"
            int counter;
            const char* ssid = "home";
            uint8_t inFX, outFX = 2;
            int table[4][2] = {{1, 2}, {3, 4}};
            static int hidden = 0;
            constexpr int LIMIT = 10;
            LiquidCrystal lcd(12, 11, 5, 4, 3, 2);
            WiFiServer server(port);
            std::map<int, int> lookup;
        "#},
    );

    assert_eq!(
        names(&unit, DeclKind::GlobalVariable),
        vec![
            "counter", "ssid", "inFX", "outFX", "table", "hidden", "LIMIT", "lcd", "server",
            "lookup"
        ]
    );

    let detail = |name: &str| {
        unit.declarations
            .iter()
            .find(|d| d.name == name)
            .map(|d| d.detail.clone())
            .unwrap()
    };

    match detail("ssid") {
        DeclDetail::Variable {
            type_text,
            declarator,
            storage,
            ..
        } => {
            assert_eq!(type_text, "const char");
            assert_eq!(declarator, "*ssid");
            assert_eq!(storage, Storage::External);
        }
        other => panic!("unexpected detail {other:?}"),
    }
    match detail("table") {
        DeclDetail::Variable {
            declarator, ..
        } => assert_eq!(declarator, "table[4][2]"),
        other => panic!("unexpected detail {other:?}"),
    }
    match detail("outFX") {
        DeclDetail::Variable { type_text, .. } => assert_eq!(type_text, "uint8_t"),
        other => panic!("unexpected detail {other:?}"),
    }
    match detail("hidden") {
        DeclDetail::Variable { storage, .. } => assert_eq!(storage, Storage::Internal),
        other => panic!("unexpected detail {other:?}"),
    }
    match detail("LIMIT") {
        DeclDetail::Variable { storage, .. } => assert_eq!(storage, Storage::Deduced),
        other => panic!("unexpected detail {other:?}"),
    }
}

#[test]
fn prototypes_and_externs_are_not_definitions() {
    let unit = parse(
        "main.ino",
        indoc! {"
            void helper(int pin);
            int compute();
            extern int shared;
            String label(String text);
        "},
    );

    assert!(unit.declarations.is_empty());
}

#[test]
fn function_definitions_capture_signature_and_defaults() {
    let unit = parse(
        "main.ino",
        indoc! {"
            void setup() {
              Serial.begin(115200);
            }

            static int scale(int value, int factor = 2) // doubles by default
            {
              return value * factor;
            }

            const char *name(uint8_t idx) const noexcept {
              return names[idx];
            }
        "},
    );

    assert_eq!(
        names(&unit, DeclKind::FunctionSignature),
        vec!["setup", "scale", "name"]
    );

    let scale = &unit.declarations[1];
    assert_eq!(scale.line, 5);
    match &scale.detail {
        DeclDetail::Function {
            signature,
            defaults,
            is_static,
            ..
        } => {
            assert_eq!(signature, "static int scale(int value, int factor = 2)");
            assert!(*is_static);
            assert_eq!(defaults.len(), 1);
            assert_eq!(&unit.raw[defaults[0].clone()], "= 2");
        }
        other => panic!("unexpected detail {other:?}"),
    }
}

#[test]
fn function_bodies_are_never_reclassified() {
    let unit = parse(
        "main.ino",
        indoc! {r#"
            int counter = 0;

            void loop() {
              int counter = 5;
              static long last;
              if (counter) {
                #define INNER 1
              }
              const char* brace = "}";
            }

            int after;
        "#},
    );

    assert_eq!(names(&unit, DeclKind::GlobalVariable), vec!["counter", "after"]);
    assert_eq!(names(&unit, DeclKind::FunctionSignature), vec!["loop"]);
    assert!(names(&unit, DeclKind::ObjectMacro).is_empty());
    assert!(unit.declarations.iter().all(|d| d.scope_depth == 0));
}

#[test]
fn classifies_type_declarations() {
    let unit = parse(
        "main.ino",
        indoc! {"
            struct Reading {
              float value;
              uint32_t at;
            };
            typedef struct { int x; int y; } Point;
            enum class Mode : uint8_t { Idle, Run };
            typedef void (*callback_t)(int);
            struct Pair { int a; int b; } pair;
            struct Forward;
            class Sensor : public Base {
             public:
              void read();
            };
        "},
    );

    assert_eq!(
        names(&unit, DeclKind::TypeDecl),
        vec!["Reading", "Point", "Mode", "callback_t", "Pair", "Sensor"]
    );
    let pair = unit.declarations.iter().find(|d| d.name == "Pair").unwrap();
    assert!(matches!(
        pair.detail,
        DeclDetail::Type {
            has_declarators: true,
            ..
        }
    ));
}

#[test]
fn methods_namespaces_and_linkage_blocks() {
    let unit = parse(
        "lib.cpp",
        indoc! {r#"
            void Sensor::read() {
              int inside;
            }
            namespace util {
              int hidden;
            }
            extern "C" {
              int exported;
              void c_entry(void) {
              }
            }
            ISR(TIMER1_COMPA_vect) {
              tick++;
            }
        "#},
    );

    assert_eq!(names(&unit, DeclKind::GlobalVariable), vec!["exported"]);
    assert_eq!(names(&unit, DeclKind::FunctionSignature), vec!["c_entry"]);
}

#[test]
fn tracks_conditional_branches() {
    let unit = parse(
        "main.ino",
        indoc! {"
            #ifdef ESP32
              #define LED 2
            #elif defined(ESP8266)
              #define LED 4
            #else
              #define LED 13
            #endif
            #define ALWAYS 1
        "},
    );

    let leds: Vec<_> = unit.declarations.iter().filter(|d| d.name == "LED").collect();
    assert_eq!(leds.len(), 3);
    assert_eq!(leds[0].conditional_depth(), 1);
    assert_eq!(leds[2].conditions[0].branch, 2);
    assert_eq!(
        leds[2].conditions[0].directives,
        vec!["#ifdef ESP32", "#elif defined(ESP8266)", "#else"]
    );
    assert!(leds[0].is_exclusive_with(leds[1]));
    assert!(leds[1].is_exclusive_with(leds[2]));

    let always = unit.declarations.iter().find(|d| d.name == "ALWAYS").unwrap();
    assert_eq!(always.conditional_depth(), 0);
}

#[test]
fn header_guard_is_not_a_declaration() {
    let unit = parse(
        "config.h",
        indoc! {"
            // settings
            #ifndef CONFIG_H
            #define CONFIG_H

            #define BAUD 115200

            #endif // CONFIG_H
        "},
    );

    let guard = unit.guard.as_ref().unwrap();
    assert_eq!(guard.name, "CONFIG_H");
    assert!(guard.endif_start.is_some());
    assert_eq!(names(&unit, DeclKind::ObjectMacro), vec!["BAUD"]);
    assert_eq!(unit.declarations[0].conditional_depth(), 0);
}

#[test]
fn records_top_level_includes() {
    let unit = parse(
        "main.ino",
        indoc! {r#"
            #include <Arduino.h>
            #include "helpers.h"
            #ifdef ESP32
            #include <WiFi.h>
            #endif
        "#},
    );

    let targets: Vec<_> = unit.includes.iter().map(|i| i.target.as_str()).collect();
    assert_eq!(targets, vec!["Arduino.h", "helpers.h", "WiFi.h"]);
    assert!(unit.includes[0].system);
    assert!(!unit.includes[1].system);
    assert_eq!(unit.includes[2].conditions.len(), 1);
}

#[test]
fn unbalanced_braces_are_reported_not_fatal() {
    let unit = parse(
        "main.ino",
        indoc! {"
            int first;
            }
            void broken() {
              if (x) {
        "},
    );

    assert_eq!(names(&unit, DeclKind::GlobalVariable), vec!["first"]);
    assert!(names(&unit, DeclKind::FunctionSignature).is_empty());
    let kinds: Vec<_> = unit.diagnostics.iter().map(|d| d.kind).collect();
    assert_eq!(
        kinds,
        vec![DiagnosticKind::StructuralAmbiguity, DiagnosticKind::StructuralAmbiguity]
    );
    assert_eq!(unit.diagnostics[0].location.line, 2);
}

#[test]
fn malformed_literals_become_warnings() {
    let unit = parse("main.ino", "int ok;\n/* open comment\nint lost;\n");

    assert_eq!(names(&unit, DeclKind::GlobalVariable), vec!["ok"]);
    assert_eq!(unit.diagnostics.len(), 1);
    assert_eq!(unit.diagnostics[0].kind, DiagnosticKind::MalformedLiteral);
    assert_eq!(unit.diagnostics[0].location.line, 2);
}

#[test]
fn function_pointer_variables_are_skipped_with_warning() {
    let unit = parse("main.ino", "void (*handler)(int) = nullptr;\nint plain;\n");

    assert_eq!(names(&unit, DeclKind::GlobalVariable), vec!["plain"]);
    assert_eq!(unit.diagnostics.len(), 1);
    assert_eq!(unit.diagnostics[0].kind, DiagnosticKind::StructuralAmbiguity);
}
