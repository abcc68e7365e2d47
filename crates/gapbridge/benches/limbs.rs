// Use codspeed-criterion-compat when running on CodSpeed (CI), real criterion otherwise
#[cfg(codspeed)]
use codspeed_criterion_compat::{Criterion, black_box, criterion_group, criterion_main};
#[cfg(not(codspeed))]
use criterion::{Criterion, black_box, criterion_group, criterion_main};
use gapbridge::{Engine, Kernel, limbs};
use num_bigint::BigInt;
use num_traits::One;

/// Round-trips `value` through the engine's integer layout.
///
/// One bracket per iteration, so the collector reclaims the bags.
fn round_trip(kernel: &Kernel, value: &BigInt) -> BigInt {
    kernel.enter();
    let obj = limbs::to_engine(kernel, value).unwrap();
    let back = limbs::to_host(kernel, obj).unwrap();
    kernel.leave();
    back
}

fn bench_limbs(c: &mut Criterion) {
    let kernel = Kernel::new();

    let small = BigInt::from(-123_456_789_i64);
    c.bench_function("immediate_round_trip", |b| {
        b.iter(|| black_box(round_trip(&kernel, black_box(&small))));
    });

    let boundary = BigInt::one() << limbs::IMMEDIATE_BITS;
    c.bench_function("boundary_round_trip", |b| {
        b.iter(|| black_box(round_trip(&kernel, black_box(&boundary))));
    });

    let large = -(BigInt::from(3) << 4096_u32) + 17;
    c.bench_function("multi_limb_round_trip", |b| {
        b.iter(|| black_box(round_trip(&kernel, black_box(&large))));
    });
}

criterion_group!(benches, bench_limbs);
criterion_main!(benches);
