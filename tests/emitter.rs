use indoc::indoc;
use sketchport::core::pipeline::{run, PipelineRun, SourceInput};
use sketchport::core::{ConvertError, Decision};
use sketchport::formatters::GlueFormatter;

fn convert(files: &[(&str, &str)]) -> PipelineRun {
    let sources = files
        .iter()
        .map(|(name, text)| SourceInput::new(name, *text).unwrap())
        .collect();
    run(sources, &GlueFormatter::new("arduinoGlue.h"))
}

fn output<'r>(run: &'r PipelineRun, path: &str) -> &'r str {
    run.emissions
        .iter()
        .filter_map(|emission| emission.result.as_ref().ok())
        .flat_map(|emitted| emitted.files.iter())
        .find(|file| file.relative_path.to_string_lossy().replace('\\', "/") == path)
        .map(|file| file.contents.as_str())
        .unwrap_or_else(|| panic!("{path} was not emitted"))
}

#[test]
fn shared_macro_moves_to_glue_once() {
    let run = convert(&[
        (
            "Main.ino",
            indoc! {"
                #define LED_PIN 13

                void setup() {
                  pinMode(LED_PIN, OUTPUT);
                }
            "},
        ),
        (
            "other.cpp",
            indoc! {"
                void blinkLed() {
                  digitalWrite(LED_PIN, HIGH);
                }
            "},
        ),
    ]);

    assert_eq!(
        run.glue.contents,
        indoc! {"
            #ifndef ARDUINOGLUE_H
            #define ARDUINOGLUE_H

            #include <Arduino.h>

            //== Macros ==
            //-- from Main.ino
            #define LED_PIN 13

            #endif // ARDUINOGLUE_H
        "}
    );

    assert_eq!(
        output(&run, "src/Main.cpp"),
        indoc! {r#"
            #include <Arduino.h>
            #include "Main.h"
            //-- moved to arduinoGlue.h: #define LED_PIN 13

            //-- prototype in Main.h
            void setup() {
              pinMode(LED_PIN, OUTPUT);
            }
        "#}
    );

    assert_eq!(
        output(&run, "include/Main.h"),
        indoc! {r#"
            #ifndef MAIN_H
            #define MAIN_H

            #include "arduinoGlue.h"

            //== Local Prototypes ==
            void setup();

            #endif // MAIN_H
        "#}
    );

    let other = output(&run, "src/other.cpp");
    assert!(other.starts_with("#include \"other.h\"\n//-- prototype in other.h\nvoid blinkLed() {"));
}

#[test]
fn file_local_variable_stays_plain() {
    let run = convert(&[
        ("Main.ino", "void setup() {}\n"),
        ("util.cpp", "int counter;\nvoid bump() { counter++; }\n"),
    ]);

    assert!(!run.glue.contents.contains("counter"));
    let util = output(&run, "src/util.cpp");
    assert!(util.contains("int counter;\n"));
    assert!(!util.contains("extern"));
    assert_eq!(run.interface.decision((1, 0)), &Decision::Local);
}

#[test]
fn first_definition_wins_and_later_one_is_annotated() {
    let run = convert(&[
        ("Main.ino", "void loop() { blink(); }\n"),
        ("a.cpp", "void blink() {\n}\n"),
        ("b.cpp", "void blink() {\n}\n"),
    ]);

    assert_eq!(run.glue.contents.matches("void blink();").count(), 1);
    assert!(run
        .glue
        .contents
        .contains("//-- from a.cpp (used in Main.ino, b.cpp)\nvoid blink();\n"));

    assert!(output(&run, "src/a.cpp").contains("//-- prototype in arduinoGlue.h\nvoid blink() {"));
    assert!(output(&run, "src/b.cpp").contains("//-- shadowed by blink from a.cpp\nvoid blink() {"));
    assert_eq!(
        run.interface.decision((2, 0)),
        &Decision::Shadowed {
            by_file: "a.cpp".to_string()
        }
    );
}

#[test]
fn function_like_macro_stays_in_place() {
    let run = convert(&[
        ("Main.ino", "#define MAX(a,b) ((a)>(b)?(a):(b))\n"),
        ("calc.cpp", "int pick(int x) { return MAX(x, 3); }\n"),
    ]);

    assert!(!run.glue.contents.contains("MAX"));
    let main = output(&run, "src/Main.cpp");
    assert!(main.contains("\n#define MAX(a,b) ((a)>(b)?(a):(b))\n"));
    assert!(!main.contains("moved to"));
}

#[test]
fn default_arguments_stay_only_in_the_prototype() {
    let run = convert(&[
        (
            "Main.ino",
            indoc! {"
                int scale(int v, int factor = 2) {
                  return v * factor;
                }
            "},
        ),
        ("other.cpp", "int twice() { return scale(1); }\n"),
    ]);

    assert!(run.glue.contents.contains("int scale(int v, int factor = 2);"));
    assert!(output(&run, "src/Main.cpp").contains("int scale(int v, int factor /* = 2 */) {"));
}

#[test]
fn hoisted_variables_are_annotated_in_place() {
    let run = convert(&[
        (
            "Main.ino",
            indoc! {"
                int speed = 5; int limit = 9;
                uint8_t inFX, outFX;
            "},
        ),
        ("use.cpp", "void f() { speed = limit + inFX + outFX; }\n"),
    ]);

    let main = output(&run, "src/Main.cpp");
    assert!(main.contains("int speed = 5; /*-- extern in arduinoGlue.h */ int limit = 9; //-- extern in arduinoGlue.h\n"));
    assert_eq!(
        main.matches("uint8_t inFX, outFX; //-- extern in arduinoGlue.h\n").count(),
        1
    );
    assert!(run.glue.contents.contains("extern uint8_t inFX;\n"));
    assert!(run.glue.contents.contains("extern uint8_t outFX;\n"));
}

#[test]
fn exclusive_branches_are_rebuilt_in_the_glue() {
    let run = convert(&[
        (
            "Main.ino",
            indoc! {"
                #ifdef ESP32
                int pin = 2;
                #else
                int pin = 13;
                #endif
                void setup() {}
            "},
        ),
        ("use.cpp", "void f() { pin++; }\n"),
    ]);

    assert!(run.glue.contents.contains(indoc! {"
        //== Extern Variables ==
        //-- from Main.ino (used in use.cpp)
        #ifdef ESP32
        extern int pin;
        #else
        extern int pin;
        #endif
    "}));
    assert_eq!(
        output(&run, "src/Main.cpp")
            .matches("//-- extern in arduinoGlue.h")
            .count(),
        2
    );
}

#[test]
fn companion_header_receives_local_prototypes() {
    let run = convert(&[
        ("Main.ino", "void setup() {}\n"),
        (
            "sensor.cpp",
            indoc! {r#"
                #include "sensor.h"
                static int readRaw() { return analogRead(SENSOR_PIN); }
            "#},
        ),
        (
            "sensor.h",
            indoc! {"
                #ifndef SENSOR_H
                #define SENSOR_H
                #define SENSOR_PIN 4
                #endif
            "},
        ),
    ]);

    assert_eq!(run.emissions.len(), 2);
    assert_eq!(run.emissions[1].units, vec![1, 2]);

    assert_eq!(
        output(&run, "include/sensor.h"),
        indoc! {r#"
            #ifndef SENSOR_H
            #define SENSOR_H

            #include "arduinoGlue.h"
            //-- moved to arduinoGlue.h: #define SENSOR_PIN 4

            //== Local Prototypes ==
            static int readRaw();

            #endif
        "#}
    );

    let source = output(&run, "src/sensor.cpp");
    assert!(source.starts_with("#include \"sensor.h\"\n//-- prototype in sensor.h\n"));
}

#[test]
fn unguarded_header_gets_a_guard() {
    let run = convert(&[
        ("Main.ino", "void setup() { Serial.println(VERSION); }\n"),
        ("lib.h", "#define VERSION 3\n"),
    ]);

    assert_eq!(
        output(&run, "include/lib.h"),
        indoc! {r#"
            #ifndef LIB_H
            #define LIB_H

            #include "arduinoGlue.h"

            //-- moved to arduinoGlue.h: #define VERSION 3

            #endif // LIB_H
        "#}
    );
}

#[test]
fn colliding_output_paths_are_fatal_for_the_later_unit() {
    let run = convert(&[
        ("Main.ino", "void setup() {}\n"),
        ("Main.cpp", "void helper() {}\n"),
    ]);

    assert!(run.emissions[0].result.is_ok());
    match &run.emissions[1].result {
        Err(ConvertError::OutputCollision { other, .. }) => assert_eq!(other, "Main.ino"),
        other => panic!("expected collision, got {other:?}"),
    }
}

#[test]
fn configuration_macros_precede_library_includes() {
    let run = convert(&[(
        "Main.ino",
        indoc! {"
            #define MQTT_MAX_PACKET_SIZE 512
            #include <PubSubClient.h>

            void setup() {}
        "},
    )]);

    assert_eq!(
        run.glue.contents,
        indoc! {"
            #ifndef ARDUINOGLUE_H
            #define ARDUINOGLUE_H

            #include <Arduino.h>

            //== Macros ==
            //-- from Main.ino
            #define MQTT_MAX_PACKET_SIZE 512

            #include <PubSubClient.h>

            #endif // ARDUINOGLUE_H
        "}
    );
}

#[test]
fn own_header_follows_project_includes() {
    let run = convert(&[
        (
            "Main.ino",
            indoc! {r#"
                #include "config.h"

                void apply(Config c) {
                }

                void setup() {
                  apply(Config());
                }
            "#},
        ),
        (
            "config.h",
            indoc! {"
                struct Config {
                  int speed;
                };
            "},
        ),
    ]);

    let main = output(&run, "src/Main.cpp");
    assert!(main.starts_with(indoc! {r#"
        #include <Arduino.h>
        #include "config.h"
        #include "Main.h"

        //-- prototype in Main.h
        void apply(Config c) {
    "#}));
    assert!(output(&run, "include/Main.h").contains("void apply(Config c);\n"));
}

#[test]
fn function_bodies_are_emitted_verbatim() {
    let run = convert(&[
        (
            "Main.ino",
            indoc! {"
                int counter = 0;

                void loop() {
                  int counter = 5;
                  counter++;
                }
            "},
        ),
        ("use.cpp", "void reset() { counter = 0; }\n"),
    ]);

    assert!(run.glue.contents.contains("extern int counter;\n"));
    assert_eq!(run.glue.contents.matches("counter").count(), 1);

    let main = output(&run, "src/Main.cpp");
    assert!(main.contains("int counter = 0; //-- extern in arduinoGlue.h\n"));
    assert!(main.contains("void loop() {\n  int counter = 5;\n  counter++;\n}\n"));
    assert_eq!(main.matches("extern in").count(), 1);
}

#[test]
fn shadowed_function_keeps_its_default_arguments() {
    let run = convert(&[
        ("Main.ino", "void loop() { blink(); }\n"),
        ("a.cpp", "void blink(int times = 1) {\n}\n"),
        ("b.cpp", "void blink(int times = 2) {\n}\n"),
    ]);

    assert!(run.glue.contents.contains("void blink(int times = 1);\n"));
    assert!(output(&run, "src/a.cpp").contains("void blink(int times /* = 1 */) {"));
    assert!(output(&run, "src/b.cpp")
        .contains("//-- shadowed by blink from a.cpp\nvoid blink(int times = 2) {"));
}
