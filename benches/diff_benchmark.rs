use criterion::{Criterion, black_box, criterion_group, criterion_main};
use image::{ImageBuffer, Rgba, RgbaImage};
use visual_regression::diff::compare;

fn page(width: u32, height: u32, shift: u32) -> RgbaImage {
    ImageBuffer::from_fn(width, height, |x, y| {
        let in_block = (100 + shift..400 + shift).contains(&x) && (100..300).contains(&y);
        if in_block {
            Rgba([40, 40, 120, 255])
        } else {
            Rgba([250, 250, 250, 255])
        }
    })
}

fn benchmark_compare(c: &mut Criterion) {
    let baseline = page(1280, 800, 0);
    let identical = baseline.clone();
    let shifted = page(1280, 800, 25);
    let taller = page(1280, 1000, 0);

    c.bench_function("compare_identical_1280x800", |b| {
        b.iter(|| compare(black_box(&baseline), black_box(&identical), 16))
    });

    c.bench_function("compare_shifted_1280x800", |b| {
        b.iter(|| compare(black_box(&baseline), black_box(&shifted), 16))
    });

    c.bench_function("compare_size_mismatch", |b| {
        b.iter(|| compare(black_box(&baseline), black_box(&taller), 16))
    });
}

criterion_group!(benches, benchmark_compare);
criterion_main!(benches);
