//! Live run counters in the Prometheus text format.

use crate::engine::StatsSnapshot;
use lazy_static::lazy_static;
use prometheus::{Encoder, IntGauge, Registry, TextEncoder};

lazy_static! {
    static ref REGISTRY: Registry = Registry::new();
    static ref GAUGES: RunGauges = RunGauges::register(&REGISTRY);
}

/// One gauge per aggregate counter.
struct RunGauges {
    done: IntGauge,
    data_errors: IntGauge,
    io_errors: IntGauge,
    timeouts: IntGauge,
}

impl RunGauges {
    fn register(registry: &Registry) -> Self {
        let gauge = |name: &str, help: &str| {
            let gauge = IntGauge::new(name, help).expect("metric can be created");
            registry
                .register(Box::new(gauge.clone()))
                .expect("metric names are unique");
            gauge
        };

        Self {
            done: gauge("gibson_bench_done", "Requests completed successfully so far"),
            data_errors: gauge(
                "gibson_bench_data_errors",
                "Requests answered with an error reply",
            ),
            io_errors: gauge(
                "gibson_bench_io_errors",
                "Workers terminated by a connection error",
            ),
            timeouts: gauge("gibson_bench_timeouts", "Workers terminated by a timeout"),
        }
    }

    fn publish(&self, snapshot: &StatsSnapshot) {
        self.done.set(snapshot.done as i64);
        self.data_errors.set(snapshot.data_errors as i64);
        self.io_errors.set(snapshot.io_errors as i64);
        self.timeouts.set(snapshot.timeouts as i64);
    }
}

/// Publish `snapshot` and render every registered gauge.
pub fn render(snapshot: &StatsSnapshot) -> String {
    GAUGES.publish(snapshot);

    let mut buffer = Vec::new();
    match TextEncoder::new().encode(&REGISTRY.gather(), &mut buffer) {
        Ok(()) => String::from_utf8_lossy(&buffer).into_owned(),
        Err(e) => format!("# Error encoding metrics: {}", e),
    }
}
