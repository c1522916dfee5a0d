use divan::{counter::BytesCount, Bencher};
use xelishash::{v1, v2, v3};

fn main() {
    divan::main();
}

#[divan::bench]
fn hash_v1(bencher: Bencher) {
    let mut pad = v1::ScratchPad::default();
    let input = [0u8; v1::INPUT_SIZE];

    bencher
        .counter(BytesCount::new(v1::MEMORY_SIZE * 8))
        .bench_local(move || v1::hash(divan::black_box(&input), &mut pad));
}

#[divan::bench]
fn hash_v2(bencher: Bencher) {
    let mut pad = v2::ScratchPad::default();
    let input = [0u8; 112];

    bencher
        .counter(BytesCount::new(v2::MEMORY_SIZE * 8))
        .bench_local(move || v2::hash(divan::black_box(&input), &mut pad));
}

#[divan::bench]
fn hash_v3(bencher: Bencher) {
    let mut pad = v3::ScratchPad::default();
    let input = [0u8; 112];

    bencher
        .counter(BytesCount::new(v3::MEMORY_SIZE * 8))
        .bench_local(move || v3::hash(divan::black_box(&input), &mut pad));
}
