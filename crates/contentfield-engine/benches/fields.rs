use contentfield_engine::{
    FieldArgs, ParseContext, SerializeContext,
    convert::{ExternalFiles, Files},
    markdoc, mdx,
    schema::{ComponentRegistry, ContentComponent, FieldSchema},
};
use criterion::{Criterion, criterion_group, criterion_main};
use indexmap::IndexMap;
mod common;

fn callout(name: &str) -> ComponentRegistry {
    ComponentRegistry::from([(
        name.to_string(),
        ContentComponent::wrapper(IndexMap::from([(
            "tone".to_string(),
            FieldSchema::Select {
                options: vec!["note".to_string(), "warning".to_string()],
                default: Some("note".to_string()),
            },
        )])),
    )])
}

fn bench_markdoc(c: &mut Criterion) {
    let mut group = c.benchmark_group("markdoc");
    group.sample_size(10);

    let field = markdoc(FieldArgs {
        label: "Body".to_string(),
        components: callout("callout"),
        ..Default::default()
    })
    .unwrap();
    let content = common::generate_markdoc_content(100);
    let (other, external) = (Files::new(), ExternalFiles::new());
    let ctx = ParseContext {
        content: &content,
        other: &other,
        external: &external,
        slug: None,
    };

    group.bench_function("parse", |b| {
        b.iter(|| field.parse(std::hint::black_box(ctx)).unwrap());
    });

    let value = field.parse(ctx).unwrap();
    group.bench_function("serialize", |b| {
        b.iter(|| field.serialize(std::hint::black_box(&value), SerializeContext::default()));
    });

    group.bench_function("reader", |b| {
        b.iter(|| field.reader().parse(std::hint::black_box(content.as_bytes())).unwrap());
    });

    group.bench_function("to_yjs", |b| {
        let bridge = field.collaboration().unwrap();
        b.iter(|| bridge.to_yjs(std::hint::black_box(&value)));
    });

    group.finish();
}

fn bench_mdx(c: &mut Criterion) {
    let mut group = c.benchmark_group("mdx");
    group.sample_size(10);

    let field = mdx(FieldArgs {
        label: "Body".to_string(),
        components: callout("Callout"),
        ..Default::default()
    })
    .unwrap();
    let content = common::generate_mdx_content(100);
    let (other, external) = (Files::new(), ExternalFiles::new());
    let ctx = ParseContext {
        content: &content,
        other: &other,
        external: &external,
        slug: None,
    };

    group.bench_function("parse", |b| {
        b.iter(|| field.parse(std::hint::black_box(ctx)).unwrap());
    });

    let value = field.parse(ctx).unwrap();
    group.bench_function("serialize", |b| {
        b.iter(|| field.serialize(std::hint::black_box(&value), SerializeContext::default()));
    });

    group.finish();
}

criterion_group!(benches, bench_markdoc, bench_mdx);
criterion_main!(benches);
