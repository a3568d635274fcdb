use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};
use quoi::{decode_from_slice, encode_to_vec_with, EncodeOptions, Image};

fn photo_like(width: u32, height: u32) -> Image {
    let mut state = 0x9e37_79b9u32;
    Image::from_fn(width, height, |x, y| {
        state ^= state << 13;
        state ^= state >> 17;
        state ^= state << 5;
        let grain = (state & 0x03) as u8;
        [
            (x / 4) as u8 ^ grain,
            (y / 4) as u8 + grain,
            ((x + y) / 8) as u8,
            255,
        ]
    })
    .unwrap()
}

macro_rules! bench {
    ($c:expr, $label:expr, $options:expr) => {
        let img = photo_like(1024, 768);
        let options = $options;
        $c.bench_function(&format!("encode_{}", $label), |b| {
            b.iter(|| encode_to_vec_with(black_box(&img), &options).unwrap());
        });
    };
}

fn benchmark_encode(c: &mut Criterion) {
    bench!(c, "serial", EncodeOptions::serial());
    bench!(c, "strips_8", EncodeOptions::strips(8));
    bench!(c, "auto", EncodeOptions::default());
}

fn benchmark_decode(c: &mut Criterion) {
    let img = photo_like(1024, 768);
    let data = encode_to_vec_with(&img, &EncodeOptions::serial()).unwrap();
    c.bench_function("decode", |b| {
        b.iter(|| decode_from_slice(black_box(&data)).unwrap());
    });
}

criterion_group!(benches, benchmark_encode, benchmark_decode);
criterion_main!(benches);
