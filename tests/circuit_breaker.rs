use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use breakwater::{CircuitBreaker, Config, Error, Instrument, State};

/// Closed -> Open -> rejected -> HalfOpen (no call) -> Closed.
#[test]
fn trip_reject_and_recover() {
    let circuit_breaker = CircuitBreaker::new(2, 1.seconds(), 2, 50.millis());

    for _ in 0..2 {
        assert_eq!(
            Err(Error::Inner("x")),
            circuit_breaker.call(|| Err::<i32, _>("x"))
        );
    }
    assert_eq!(State::Open, circuit_breaker.state());

    assert_eq!(Err(Error::Rejected), circuit_breaker.call(success));

    thread::sleep(1100.millis());

    assert_eq!(Ok(None), circuit_breaker.call(success));
    assert_eq!(State::HalfOpen, circuit_breaker.state());

    assert_eq!(Ok(Some(1)), circuit_breaker.call(success));
    assert_eq!(State::HalfOpen, circuit_breaker.state());

    assert_eq!(Ok(Some(1)), circuit_breaker.call(success));
    assert_eq!(State::Closed, circuit_breaker.state());
}

#[test]
fn slow_call_times_out_and_trips() {
    let circuit_breaker = CircuitBreaker::new(1, 10.millis(), 1, 10.millis());

    let res = circuit_breaker.call(|| {
        thread::sleep(20.millis());
        Ok::<_, ()>(())
    });

    assert_eq!(Err(Error::Timeout(10.millis())), res);
    assert_eq!(State::Open, circuit_breaker.state());
}

#[test]
fn concurrent_calls_are_serialized() {
    let circuit_breaker = CircuitBreaker::new(100, 5.seconds(), 1, 1.seconds());
    let in_flight = Arc::new(AtomicUsize::new(0));
    let max_in_flight = Arc::new(AtomicUsize::new(0));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let circuit_breaker = circuit_breaker.clone();
            let in_flight = in_flight.clone();
            let max_in_flight = max_in_flight.clone();

            thread::spawn(move || {
                circuit_breaker.call(move || {
                    let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                    max_in_flight.fetch_max(now, Ordering::SeqCst);
                    thread::sleep(5.millis());
                    in_flight.fetch_sub(1, Ordering::SeqCst);
                    Ok::<_, ()>(())
                })
            })
        })
        .collect();

    for handle in handles {
        assert_eq!(Ok(Some(())), handle.join().unwrap());
    }
    assert_eq!(1, max_in_flight.load(Ordering::SeqCst));
}

#[test]
fn concurrent_failures_trip_exactly_once() {
    let observer = Observer::default();
    let circuit_breaker = Config::new()
        .failure_threshold(3)
        .recovery_time(60.seconds())
        .timeout(1.seconds())
        .instrument(observer.clone())
        .build()
        .unwrap();

    let handles: Vec<_> = (0..10)
        .map(|_| {
            let circuit_breaker = circuit_breaker.clone();
            thread::spawn(move || circuit_breaker.call(|| Err::<(), _>("down")))
        })
        .collect();

    let mut inner = 0;
    let mut rejected = 0;
    for handle in handles {
        match handle.join().unwrap() {
            Err(Error::Inner("down")) => inner += 1,
            Err(Error::Rejected) => rejected += 1,
            x => unreachable!("{:?}", x),
        }
    }

    assert_eq!(3, inner);
    assert_eq!(7, rejected);
    assert_eq!(State::Open, circuit_breaker.state());
    assert_eq!(vec!["open"], observer.events());
    assert_eq!(7, observer.rejected());
}

#[test]
fn instrument_sees_timeouts_and_transitions() {
    let observer = Observer::default();
    let circuit_breaker = Config::new()
        .failure_threshold(1)
        .recovery_time(10.millis())
        .half_open_max_requests(1)
        .timeout(10.millis())
        .instrument(observer.clone())
        .build()
        .unwrap();

    let _ = circuit_breaker.call(|| {
        thread::sleep(50.millis());
        Ok::<_, ()>(())
    });
    thread::sleep(20.millis());
    assert_eq!(Ok(None), circuit_breaker.call(success));
    assert_eq!(Ok(Some(1)), circuit_breaker.call(success));

    assert_eq!(
        vec!["timeout", "open", "half_open", "closed"],
        observer.events()
    );
}

fn success() -> Result<i32, &'static str> {
    Ok(1)
}

#[derive(Clone, Debug, Default)]
struct Observer {
    events: Arc<Mutex<Vec<&'static str>>>,
    rejected: Arc<AtomicUsize>,
}

impl Observer {
    fn events(&self) -> Vec<&'static str> {
        self.events.lock().unwrap().clone()
    }

    fn rejected(&self) -> usize {
        self.rejected.load(Ordering::SeqCst)
    }

    fn push(&self, event: &'static str) {
        self.events.lock().unwrap().push(event);
    }
}

impl Instrument for Observer {
    fn on_call_rejected(&self) {
        self.rejected.fetch_add(1, Ordering::SeqCst);
    }

    fn on_open(&self) {
        self.push("open");
    }

    fn on_half_open(&self) {
        self.push("half_open");
    }

    fn on_closed(&self) {
        self.push("closed");
    }

    fn on_timeout(&self, _timeout: Duration) {
        self.push("timeout");
    }
}

trait IntoDuration {
    fn seconds(self) -> Duration;
    fn millis(self) -> Duration;
}

impl IntoDuration for u64 {
    fn seconds(self) -> Duration {
        Duration::from_secs(self)
    }

    fn millis(self) -> Duration {
        Duration::from_millis(self)
    }
}
