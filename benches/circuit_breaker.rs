#![deny(warnings)]

use std::thread;
use std::time::Duration;

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use breakwater::{CircuitBreaker, Error};

fn single_threaded(c: &mut Criterion) {
    let circuit_breaker = CircuitBreaker::new(5, Duration::from_secs(5), 1, Duration::from_secs(1));
    let mut n = 0;

    c.bench_function("single_threaded", |b| {
        b.iter(|| {
            let m = n;
            match circuit_breaker.call(move || dangerous_call(m)) {
                Ok(_) => {}
                Err(Error::Inner(_)) => {}
                Err(err) => unreachable!("{:?}", err),
            }
            n += 1;
        })
    });
}

fn multi_threaded_in_batch(c: &mut Criterion) {
    let circuit_breaker = CircuitBreaker::new(5, Duration::from_secs(5), 1, Duration::from_secs(1));
    let batch_size = 10;

    c.bench_function("multi_threaded_in_batch", |b| {
        b.iter(|| {
            let handles: Vec<_> = (0..batch_size)
                .map(|n| {
                    let circuit_breaker = circuit_breaker.clone();
                    thread::spawn(move || match circuit_breaker.call(move || dangerous_call(n)) {
                        Ok(Some(n)) => n,
                        Err(Error::Inner(n)) => n,
                        res => unreachable!("{:?}", res),
                    })
                })
                .collect();

            let res: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
            assert_eq!(45usize, res);
        })
    });
}

fn dangerous_call(n: usize) -> Result<usize, usize> {
    if n % 5 == 0 {
        black_box(Err(n))
    } else {
        black_box(Ok(n))
    }
}

criterion_group!(benches, single_threaded, multi_threaded_in_batch);
criterion_main!(benches);
