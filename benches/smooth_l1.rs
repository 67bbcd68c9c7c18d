use anvil_criterion::{Criterion as _, Element, SmoothL1WeightedCriterion, Tensor, WeightedTarget};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

fn inputs<T: Element>(n: usize) -> (Tensor<T>, Tensor<T>, Tensor<T>, Tensor<T>) {
    let input: Vec<T> = (0..n).map(|i| T::from_f64(((i % 97) as f64 - 48.0) * 0.05)).collect();
    let gt = Tensor::zeros([n / 4, 4]);
    let inside: Vec<T> = (0..n).map(|i| if i % 3 == 0 { T::zero() } else { T::one() }).collect();
    (
        Tensor::from_vec(input, [n / 4, 4]).unwrap(),
        gt,
        Tensor::from_vec(inside, [n / 4, 4]).unwrap(),
        Tensor::full([n / 4, 4], T::from_f64(0.5)),
    )
}

fn bench_forward_backward<T: Element>(c: &mut Criterion, label: &str) {
    let mut group = c.benchmark_group(format!("smooth_l1_{}", label));
    for &n in &[1024usize, 16 * 1024, 256 * 1024] {
        let (input, gt, inside, outside) = inputs::<T>(n);
        let target = WeightedTarget::weighted(&gt, &inside, &outside);
        let mut loss = SmoothL1WeightedCriterion::<T>::new(3.0, 0).unwrap();

        group.bench_with_input(BenchmarkId::new("forward_backward", n), &n, |b, _| {
            b.iter(|| {
                let value = loss.forward(black_box(&input), &target).unwrap();
                let grad = loss.backward(black_box(&input), &target).unwrap();
                black_box((value, grad))
            })
        });
    }
    group.finish();
}

fn smooth_l1_benches(c: &mut Criterion) {
    bench_forward_backward::<f32>(c, "f32");
    bench_forward_backward::<f64>(c, "f64");
}

criterion_group!(benches, smooth_l1_benches);
criterion_main!(benches);
