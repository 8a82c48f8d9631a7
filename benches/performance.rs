use criterion::{black_box, criterion_group, criterion_main, Criterion};
use sketchport::core::pipeline::{run, SourceInput};
use sketchport::formatters::GlueFormatter;
use sketchport::{ConvertOptions, ProjectConverter};
use std::path::Path;

fn helper_source(i: usize) -> String {
    format!(
        r#"
#include <Wire.h>
#define SENSOR_{i}_PIN {i}

struct Reading{i} {{
    int value;
    unsigned long at;
}};

int lastValue{i} = 0;
static int samples{i}[8];

Reading{i} readSensor{i}(int pin = SENSOR_{i}_PIN) {{
    Reading{i} r;
    r.value = analogRead(pin);
    r.at = millis();
    lastValue{i} = r.value;
    return r;
}}

static int average{i}() {{
    int sum = 0;
    for (int k = 0; k < 8; k++) {{
        sum += samples{i}[k];
    }}
    return sum / 8;
}}
"#
    )
}

fn sketch_source(helpers: usize) -> String {
    let mut loop_body = String::new();
    for i in 0..helpers {
        loop_body.push_str(&format!(
            "  Reading{i} r{i} = readSensor{i}();\n  Serial.println(r{i}.value + lastValue{i});\n"
        ));
    }
    format!(
        "#define BAUD 115200\n\nvoid setup() {{\n  Serial.begin(BAUD);\n}}\n\nvoid loop() {{\n{loop_body}}}\n"
    )
}

fn write_sketch(root: &Path, helpers: usize) {
    std::fs::create_dir_all(root).unwrap();
    std::fs::write(root.join("Bench.ino"), sketch_source(helpers)).unwrap();
    for i in 0..helpers {
        std::fs::write(root.join(format!("sensor_{i}.cpp")), helper_source(i)).unwrap();
    }
}

fn benchmark_pipeline(c: &mut Criterion) {
    let mut group = c.benchmark_group("pipeline");

    for helpers in [10usize, 100] {
        let mut sources = vec![SourceInput::new("Bench.ino", sketch_source(helpers)).unwrap()];
        sources.extend(
            (0..helpers)
                .map(|i| SourceInput::new(format!("sensor_{i}.cpp"), helper_source(i)).unwrap()),
        );
        let glue = GlueFormatter::new("arduinoGlue.h");

        group.bench_function(format!("in_memory_{helpers}_units"), |b| {
            b.iter(|| black_box(run(black_box(sources.clone()), &glue)));
        });
    }

    group.finish();
}

fn benchmark_conversion(c: &mut Criterion) {
    use tempfile::TempDir;

    let mut group = c.benchmark_group("conversion");

    let dir = TempDir::new().unwrap();
    let root = dir.path().join("Bench");
    write_sketch(&root, 25);
    let output = dir.path().join("out");

    group.bench_function("project_to_disk", |b| {
        b.iter(|| {
            let options = ConvertOptions::new()
                .with_output_dir(&output)
                .with_ini(false);
            let report = ProjectConverter::new(options).convert(black_box(&root));
            black_box(report)
        });
    });

    group.finish();
}

criterion_group!(benches, benchmark_pipeline, benchmark_conversion);
criterion_main!(benches);
