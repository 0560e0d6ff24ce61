//! Performance benchmarks for ontology conversion.
//!
//! Run with: `cargo bench --bench conversion`
//!
//! ## Performance Targets
//!
//! | Operation | Target | Notes |
//! |-----------|--------|-------|
//! | Classify + index | Linear in rows | One hash lookup per row |
//! | Transitive link | O(rows × depth) | One lookup per ancestor |
//! | Full convert | <1s for 100k rows | In-memory reader and writer |

use std::path::Path;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use shrine_anonymizer::{
    classify, AncestorLinker, ConverterConfig, Header, LinkDepth, OntologyConverter, OntologyIndex,
    OntologyNode, SensitivePathSet, SHRINE_ONTOLOGY_COLUMNS,
};

/// A synthetic ontology: `branching` children per node, `depth` levels,
/// every other node sensitive.
fn synthetic(branching: usize, depth: usize) -> (Vec<Vec<String>>, SensitivePathSet) {
    let mut rows = Vec::new();
    let mut sensitive = SensitivePathSet::new();
    let mut frontier = vec![String::from("\\")];
    for level in 1..=depth {
        let mut next = Vec::new();
        for parent in &frontier {
            for i in 0..branching {
                let path = format!("{parent}T{level}_{i}\\");
                let mut fields = vec![String::new(); SHRINE_ONTOLOGY_COLUMNS.len()];
                fields[0] = level.to_string();
                fields[1] = path.clone();
                fields[2] = format!("T{level}_{i}");
                fields[8] = if i % 3 == 2 { "modifier_cd" } else { "concept_cd" }.to_string();
                fields[13] = path.clone();
                fields[15] = path.clone();
                if (rows.len() % 2) == 0 {
                    sensitive.insert(path.clone());
                }
                rows.push(fields);
                next.push(path);
            }
        }
        frontier = next;
    }
    (rows, sensitive)
}

fn to_table(rows: &[Vec<String>]) -> String {
    let mut text = Header::canonical().render_line();
    text.push('\n');
    for r in rows {
        let line = r.iter().map(|f| format!("\"{f}\"")).collect::<Vec<_>>().join(",");
        text.push_str(&line);
        text.push('\n');
    }
    text
}

fn build_index(rows: &[Vec<String>], sensitive: &SensitivePathSet) -> OntologyIndex {
    let mut index = OntologyIndex::new();
    for fields in rows {
        let node = OntologyNode::from_fields(fields).unwrap();
        let class = classify(&node, sensitive).unwrap();
        index.insert(node, class);
    }
    index
}

fn bench_classify(c: &mut Criterion) {
    let mut group = c.benchmark_group("classify_index");
    for depth in [3usize, 4, 5] {
        let (rows, sensitive) = synthetic(6, depth);
        group.throughput(Throughput::Elements(rows.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(rows.len()), &rows, |b, rows| {
            b.iter(|| black_box(build_index(rows, &sensitive)));
        });
    }
    group.finish();
}

fn bench_link(c: &mut Criterion) {
    let mut group = c.benchmark_group("link");
    let (rows, sensitive) = synthetic(6, 5);
    let index = build_index(&rows, &sensitive);
    for depth in [LinkDepth::Transitive, LinkDepth::Nearest] {
        let linker = AncestorLinker::new(depth);
        group.bench_function(format!("{depth:?}"), |b| {
            b.iter(|| {
                let mut index = index.clone();
                black_box(linker.link(&mut index))
            });
        });
    }
    group.finish();
}

fn bench_convert(c: &mut Criterion) {
    let mut group = c.benchmark_group("convert");
    let (rows, sensitive) = synthetic(6, 5);
    let input = to_table(&rows);
    let converter = OntologyConverter::with_sensitive_paths(ConverterConfig::default(), sensitive).unwrap();
    group.throughput(Throughput::Elements(rows.len() as u64));
    group.bench_function("in_memory", |b| {
        b.iter(|| {
            let mut out = Vec::with_capacity(input.len() * 2);
            let outcome = converter
                .convert(input.as_bytes(), Path::new("bench.csv"), &mut out, Path::new("out.csv"))
                .unwrap();
            black_box((outcome.stats.rows_emitted, out.len()))
        });
    });
    group.finish();
}

criterion_group!(benches, bench_classify, bench_link, bench_convert);
criterion_main!(benches);
