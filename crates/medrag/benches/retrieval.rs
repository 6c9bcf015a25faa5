//! Benchmarks for chunking and rank fusion.
//!
//! Measures section parsing plus re-chunking over synthetic manuals, and
//! reciprocal rank fusion across result list sizes.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use medrag_chunker::ChunkPipeline;
use medrag_core::{ChunkConfig, IndexedDocument, SearchHit};
use medrag_query::{reciprocal_rank_fusion, FusionWeights};

const PARAGRAPH: &str = "Khí sắc trầm cảm hầu hết thời gian trong ngày, gần như mỗi ngày, \
    được ghi nhận bởi chủ quan hoặc quan sát của người khác. Giảm rõ rệt hứng thú \
    hoặc niềm vui trong tất cả hoặc hầu hết các hoạt động.";

/// A manual of `chapters` chapters with five subsections each.
fn synthetic_manual(chapters: usize) -> Vec<(u32, String)> {
    let mut lines = Vec::new();
    for chapter in 1..=chapters {
        let page = chapter as u32;
        lines.push((page, format!("{chapter} Rối loạn nhóm {chapter}")));
        lines.push((page, PARAGRAPH.to_string()));
        for sub in 1..=5 {
            lines.push((page, format!("{chapter}.{sub} Rối loạn cụ thể {sub}")));
            // every third subsection is long enough to be split
            let repeats = if sub % 3 == 0 { 12 } else { 2 };
            for _ in 0..repeats {
                lines.push((page, PARAGRAPH.to_string()));
            }
        }
    }
    lines
}

fn hits(prefix: &str, count: usize) -> Vec<SearchHit> {
    (0..count)
        .map(|i| SearchHit {
            id: format!("{prefix}{i}"),
            score: 1.0 / (i + 1) as f32,
            document: IndexedDocument {
                title: format!("Section {i}"),
                content: PARAGRAPH.to_string(),
                section_id: Some(format!("{}.{}", i / 5 + 1, i % 5 + 1)),
                ..IndexedDocument::default()
            },
        })
        .collect()
}

fn chunking_benchmark(c: &mut Criterion) {
    let pipeline = ChunkPipeline::new(ChunkConfig::default()).unwrap();
    let mut group = c.benchmark_group("chunking");

    for chapters in [10, 50, 200] {
        let lines = synthetic_manual(chapters);
        let bytes: usize = lines.iter().map(|(_, l)| l.len()).sum();
        group.throughput(Throughput::Bytes(bytes as u64));
        group.bench_with_input(BenchmarkId::new("process_lines", chapters), &lines, |b, lines| {
            b.iter(|| {
                let chunks = pipeline.process_lines(
                    lines.iter().map(|(page, line)| (*page, line.as_str())),
                    "bench",
                );
                black_box(chunks)
            });
        });
    }
    group.finish();
}

fn fusion_benchmark(c: &mut Criterion) {
    let weights = FusionWeights::default();
    let mut group = c.benchmark_group("rrf");

    for size in [10, 30, 50] {
        // half of each list overlaps with the other
        let keyword = hits("", size);
        let vector = hits("", size + size / 2).split_off(size / 2);

        group.bench_with_input(BenchmarkId::new("fuse", size), &size, |b, _| {
            b.iter(|| {
                let fused = reciprocal_rank_fusion(
                    black_box(keyword.clone()),
                    black_box(vector.clone()),
                    &weights,
                );
                black_box(fused)
            });
        });
    }
    group.finish();
}

criterion_group!(benches, chunking_benchmark, fusion_benchmark);
criterion_main!(benches);
