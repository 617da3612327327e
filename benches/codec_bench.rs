use criterion::{black_box, criterion_group, criterion_main, Criterion};

use oneharness::codec::{decode_fields, encode_fields};
use oneharness::flatten::deep_flat;
use oneharness::recipe::Recipe;
use oneharness::schema::{FieldNode, FieldType};

/// A form of `groups` groups with a text, a checkbox and a computed field each.
fn sample_schema(groups: usize) -> Vec<FieldNode> {
    (0..groups)
        .map(|g| {
            FieldNode::new(FieldType::Group).test_id(format!("group-{}", g)).with_fields(vec![
                FieldNode::new(FieldType::Text)
                    .name(format!("text{}", g))
                    .title("Text")
                    .prop("defaultValue", "Hello world"),
                FieldNode::new(FieldType::Paper).with_child(
                    FieldNode::new(FieldType::Checkbox)
                        .name(format!("flag{}", g))
                        .recipe("isDisabled", Recipe::FieldTruthy { name: "disabled".into() }),
                ),
                FieldNode::new(FieldType::Typography).recipe(
                    "compute",
                    Recipe::Join {
                        fields: vec![format!("text{}", g), format!("flag{}", g)],
                        separator: ", ".into(),
                        fallback: None,
                    },
                ),
            ])
        })
        .collect()
}

fn bench_flatten(c: &mut Criterion) {
    let schema = sample_schema(50);
    c.bench_function("deep_flat_50_groups", |b| b.iter(|| deep_flat(black_box(&schema)).len()));
}

fn bench_codec(c: &mut Criterion) {
    let schema = sample_schema(50);
    let wire = encode_fields(&schema).unwrap();

    c.bench_function("encode_fields_50_groups", |b| {
        b.iter(|| encode_fields(black_box(&schema)).unwrap())
    });
    c.bench_function("decode_fields_50_groups", |b| {
        b.iter(|| decode_fields(black_box(wire.clone())).unwrap())
    });
}

criterion_group!(benches, bench_flatten, bench_codec);
criterion_main!(benches);
