//! Benchmarks for the C++ front end and graph builder

use codegraph_cpp::{ingest_parallel, BuildConfig, CppParser, IngestionDriver};
use codegraph_parser_api::{CodeParser, TranslationUnit};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::path::Path;

const SAMPLE_CODE: &str = include_str!("../tests/fixtures/sample.cpp");
const CLASSES_CODE: &str = include_str!("../tests/fixtures/classes.hpp");

/// The fixtures plus `count` generated units deriving from the shapes.
fn units(count: usize) -> Vec<TranslationUnit> {
    let parser = CppParser::new();
    let mut units = vec![
        parser.parse_source(CLASSES_CODE, Path::new("classes.hpp")).unwrap(),
        parser.parse_source(SAMPLE_CODE, Path::new("sample.cpp")).unwrap(),
    ];
    for i in 0..count {
        let source = format!(
            "namespace shapes {{\n\
             class Shape{i} : public Shape {{\n\
             public:\n\
                 double area() const override {{ return helper{i}(); }}\n\
                 double perimeter() const override;\n\
             }};\n\
             double helper{i}() {{ return {i}.0; }}\n\
             }}\n"
        );
        let path = format!("shape{i}.cpp");
        units.push(parser.parse_source(&source, Path::new(&path)).unwrap());
    }
    units
}

fn benchmark_parse_source(c: &mut Criterion) {
    let parser = CppParser::new();

    c.bench_function("cpp_parse_source", |b| {
        b.iter(|| {
            parser
                .parse_source(black_box(SAMPLE_CODE), Path::new("bench.cpp"))
                .unwrap()
        })
    });
}

fn benchmark_ingest(c: &mut Criterion) {
    let units = units(64);

    c.bench_function("cpp_ingest_sequential", |b| {
        b.iter(|| {
            let mut driver = IngestionDriver::new(BuildConfig::default());
            black_box(driver.ingest_all(&units).unwrap())
        })
    });

    c.bench_function("cpp_ingest_parallel", |b| {
        let config = BuildConfig::default().with_workers(4);
        b.iter(|| black_box(ingest_parallel(&units, &config).unwrap()))
    });
}

criterion_group!(benches, benchmark_parse_source, benchmark_ingest);
criterion_main!(benches);
