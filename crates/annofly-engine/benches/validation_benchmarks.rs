//! Benchmarks for template resolution, catalog construction, document
//! validation, annotation extraction, and batch throughput

use annofly_engine::{
    AnnotationExtractor, BatchValidator, CatalogBuilder, DocumentValidator, LoadedTemplate,
    SchemaRegistry,
};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use serde_json::{json, Value};

/// Generate a template source with a root document type and a section
/// type carrying `fields_per_section` fields of mixed kinds
fn generate_template(fields_per_section: usize) -> String {
    let mut fields = vec![json!({
        "name": "heading",
        "type": "string",
        "annotate": true,
        "min_length": 1
    })];
    for i in 0..fields_per_section {
        let field = match i % 3 {
            0 => json!({ "name": format!("text_{}", i), "type": "string", "annotate": true }),
            1 => json!({ "name": format!("count_{}", i), "type": "int", "min": 0, "max": 1000000 }),
            _ => json!({ "name": format!("ratio_{}", i), "type": "float?" }),
        };
        fields.push(field);
    }

    json!({
        "template": "bench",
        "types": [
            {
                "name": "Doc",
                "root": true,
                "fields": [
                    { "name": "title", "type": "string", "annotate": true, "min_length": 1 },
                    { "name": "sections", "type": "Section[]" }
                ]
            },
            { "name": "Section", "fields": fields }
        ]
    })
    .to_string()
}

/// Generate a document matching [`generate_template`] with the given
/// number of sections
fn generate_document(num_sections: usize, fields_per_section: usize) -> Value {
    let sections: Vec<Value> = (0..num_sections)
        .map(|s| {
            let mut section = serde_json::Map::new();
            section.insert("heading".to_string(), json!(format!("Section {}", s)));
            for i in 0..fields_per_section {
                let (name, value) = match i % 3 {
                    0 => (format!("text_{}", i), json!("a short passage of text")),
                    1 => (format!("count_{}", i), json!(i * 7)),
                    _ => (format!("ratio_{}", i), json!(0.5)),
                };
                section.insert(name, value);
            }
            Value::Object(section)
        })
        .collect();

    json!({ "title": "Benchmark document", "sections": sections })
}

/// Generate a JSONL batch of `num_records` small documents
fn generate_jsonl(num_records: usize) -> String {
    let mut input = String::new();
    for r in 0..num_records {
        let record = json!({
            "title": format!("Record {}", r),
            "sections": [
                { "heading": "Only", "text_0": "body", "count_1": r, "ratio_2": 0.25 }
            ]
        });
        input.push_str(&record.to_string());
        input.push('\n');
    }
    input
}

fn bench_template_resolution(c: &mut Criterion) {
    let mut group = c.benchmark_group("template_resolution");

    for fields in [10, 50, 100].iter() {
        let source = generate_template(*fields);
        group.bench_with_input(BenchmarkId::from_parameter(fields), &source, |b, source| {
            b.iter(|| {
                let loaded = LoadedTemplate::load(black_box(source)).unwrap();
                black_box(loaded);
            });
        });
    }

    group.finish();
}

fn bench_catalog_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("catalog_build");

    for fields in [10, 50, 100].iter() {
        let loaded = LoadedTemplate::load(&generate_template(*fields)).unwrap();
        group.bench_with_input(
            BenchmarkId::from_parameter(fields),
            &loaded.schema,
            |b, schema| {
                b.iter(|| {
                    let catalog = CatalogBuilder::build(black_box(schema));
                    black_box(catalog);
                });
            },
        );
    }

    group.finish();
}

fn bench_document_validation(c: &mut Criterion) {
    let mut group = c.benchmark_group("document_validation");
    let loaded = LoadedTemplate::load(&generate_template(9)).unwrap();

    for sections in [10, 100, 1000].iter() {
        let document = generate_document(*sections, 9);
        group.bench_with_input(
            BenchmarkId::from_parameter(sections),
            &document,
            |b, document| {
                let validator = DocumentValidator::new(&loaded.schema);
                b.iter(|| {
                    let outcome = validator.validate(black_box(document));
                    black_box(outcome);
                });
            },
        );
    }

    group.finish();
}

fn bench_annotation_extraction(c: &mut Criterion) {
    let mut group = c.benchmark_group("annotation_extraction");
    let loaded = LoadedTemplate::load(&generate_template(9)).unwrap();

    for sections in [10, 100, 1000].iter() {
        let document = generate_document(*sections, 9);
        group.bench_with_input(
            BenchmarkId::from_parameter(sections),
            &document,
            |b, document| {
                let extractor = AnnotationExtractor::new(&loaded.catalog);
                b.iter(|| {
                    let values = extractor.extract(black_box(document));
                    black_box(values);
                });
            },
        );
    }

    group.finish();
}

fn bench_batch_jsonl(c: &mut Criterion) {
    let mut group = c.benchmark_group("batch_jsonl");
    group.sample_size(20);
    let loaded = LoadedTemplate::load(&generate_template(9)).unwrap();

    for records in [100, 1000].iter() {
        let input = generate_jsonl(*records);
        group.bench_with_input(BenchmarkId::from_parameter(records), &input, |b, input| {
            let validator = BatchValidator::new(&loaded.schema);
            b.iter(|| {
                let report = validator.validate_jsonl(black_box(input));
                black_box(report);
            });
        });
    }

    group.finish();
}

fn bench_registry_cold_load(c: &mut Criterion) {
    let source = generate_template(50);

    c.bench_function("registry_cold_load", |b| {
        b.iter(|| {
            let registry = SchemaRegistry::new();
            let loaded = registry.load(black_box(&source)).unwrap();
            black_box(loaded);
        });
    });
}

fn bench_registry_warm_load(c: &mut Criterion) {
    let source = generate_template(50);
    let registry = SchemaRegistry::new();
    registry.load(&source).unwrap();

    c.bench_function("registry_warm_load", |b| {
        b.iter(|| {
            let loaded = registry.load(black_box(&source)).unwrap();
            black_box(loaded);
        });
    });
}

criterion_group!(
    benches,
    bench_template_resolution,
    bench_catalog_build,
    bench_document_validation,
    bench_annotation_extraction,
    bench_batch_jsonl,
    bench_registry_cold_load,
    bench_registry_warm_load
);
criterion_main!(benches);
