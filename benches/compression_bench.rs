use criterion::{black_box, criterion_group, criterion_main, Criterion};
use ghostline::Frame;

fn bench_compression(c: &mut Criterion) {
    let request = vec![b'a'; 64 * 1024];
    let response = vec![b'b'; 256 * 1024];
    let frame = Frame::new(request, response, 120, 1_700_000_000_000);
    let encoded = frame.encode().unwrap();

    c.bench_function("frame_encode_320kb", |b| b.iter(|| black_box(&frame).encode().unwrap()));

    c.bench_function("zstd_compress_encoded_frame", |b| {
        b.iter(|| zstd::encode_all(black_box(&encoded[..]), 3).unwrap())
    });

    let compressed = zstd::encode_all(&encoded[..], 3).unwrap();
    c.bench_function("zstd_decompress_encoded_frame", |b| {
        b.iter(|| zstd::decode_all(black_box(&compressed[..])).unwrap())
    });
}

criterion_group!(benches, bench_compression);
criterion_main!(benches);
