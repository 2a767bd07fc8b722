//! Benchmarks for the template variable resolver and payload building
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use wacrm::messaging::template::{
    dispatch_parameters, extract_placeholders, render_preview, variable_count,
};
use wacrm::messaging::*;

fn template_with(placeholders: usize) -> TemplateDefinition {
    let body: String = (1..=placeholders)
        .map(|i| format!("Line {} has value {{{{{}}}}}. ", i, i))
        .collect();

    TemplateDefinition::new("bench_template", "en_US")
        .component(TemplateComponent::new(ComponentType::Header, "Order update").format("TEXT"))
        .component(TemplateComponent::new(ComponentType::Body, body))
        .component(TemplateComponent::new(ComponentType::Footer, "Reply STOP to opt out"))
}

fn values(count: usize) -> Vec<String> {
    (0..count).map(|i| format!("value-{}", i)).collect()
}

fn bench_resolver(c: &mut Criterion) {
    let mut group = c.benchmark_group("resolver");

    for size in [1, 10, 100] {
        let template = template_with(size);
        let supplied = values(size);

        group.throughput(Throughput::Elements(size as u64));

        group.bench_function(format!("variable_count_{}", size), |b| {
            b.iter(|| variable_count(black_box(&template)))
        });

        group.bench_function(format!("extract_distinct_{}", size), |b| {
            b.iter(|| extract_placeholders(black_box(&template), ExtractionMode::Distinct))
        });

        group.bench_function(format!("render_preview_{}", size), |b| {
            b.iter(|| render_preview(black_box(&template), black_box(&supplied)))
        });

        group.bench_function(format!("dispatch_parameters_{}", size), |b| {
            b.iter(|| dispatch_parameters(black_box(&supplied[..size / 2]), size))
        });
    }

    group.finish();
}

fn bench_payload(c: &mut Criterion) {
    let mut group = c.benchmark_group("payload");

    let catalog = vec![template_with(10)];
    let request = ComposeRequest::template("bench_template", values(10));
    let to = Recipient::from_phone("+1 555 000 1111").unwrap();

    group.bench_function("compose", |b| {
        b.iter(|| Composer::new(black_box(&catalog)).compose(black_box(&request)))
    });

    let message = Composer::new(&catalog).compose(&request);
    group.bench_function("serialize_template_payload", |b| {
        b.iter(|| serde_json::to_string(&MessagePayload::new(black_box(&message), &to)).unwrap())
    });

    group.finish();
}

criterion_group!(benches, bench_resolver, bench_payload);
criterion_main!(benches);
