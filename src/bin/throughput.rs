use bounded_blocking_queue::BoundedBlockingQueue;
use std::collections::BTreeMap;
use std::env;
use std::str::FromStr;
use std::sync::mpsc::{sync_channel, Receiver, SyncSender};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex,
};
use std::thread;
use std::time::Instant;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const PER_THREAD_RUNS: u32 = 5;

struct Config {
    max_threads: u32,
    capacity: usize,
    messages: u64,
    bench_std: bool,
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => match raw.parse() {
            Ok(value) => value,
            Err(_) => {
                warn!(key, value = %raw, "ignoring unparsable setting");
                default
            }
        },
        Err(_) => default,
    }
}

impl Config {
    fn from_env() -> Config {
        let mut capacity = env_or("THROUGHPUT_CAPACITY", 1024);
        if capacity == 0 {
            warn!("THROUGHPUT_CAPACITY must be non-zero; using 1");
            capacity = 1;
        }
        Config {
            max_threads: env_or::<u32>("THROUGHPUT_THREADS", 4).max(1),
            capacity,
            messages: env_or("THROUGHPUT_MESSAGES", 1_000_000),
            bench_std: env::var_os("BENCH_STD").is_some(),
        }
    }
}

/// The pair of operations the driver needs from a queue under test.
trait Pipe: Send + Sync + 'static {
    fn put(&self, value: u64);
    fn take(&self) -> u64;
}

impl Pipe for BoundedBlockingQueue<u64> {
    fn put(&self, value: u64) {
        self.push(value)
    }

    fn take(&self) -> u64 {
        self.pop()
    }
}

struct StdPipe {
    tx: SyncSender<u64>,
    rx: Mutex<Receiver<u64>>,
}

impl Pipe for StdPipe {
    fn put(&self, value: u64) {
        self.tx
            .send(value)
            .expect("std baseline receiver disconnected");
    }

    fn take(&self) -> u64 {
        let rx = self.rx.lock().unwrap_or_else(|e| e.into_inner());
        rx.recv().expect("std baseline senders disconnected")
    }
}

fn run<P: Pipe>(name: &str, config: &Config, make: impl Fn() -> P) -> BTreeMap<u32, Vec<u128>> {
    let mut results = BTreeMap::new();
    for threads in 1..=config.max_threads {
        for _ in 0..PER_THREAD_RUNS {
            let go = Arc::new(AtomicBool::new(false));
            let pipe = Arc::new(make());
            let mut joiners = Vec::new();
            for _ in 0..threads {
                let go = go.clone();
                let pipe = pipe.clone();
                let messages = config.messages;
                joiners.push(thread::spawn(move || {
                    while !go.load(Ordering::Relaxed) {}
                    for i in 0..messages {
                        pipe.put(i);
                    }
                }));
            }

            go.store(true, Ordering::SeqCst);
            let start = Instant::now();
            let total = config.messages * u64::from(threads);
            for _ in 0..total {
                pipe.take();
            }
            let elapsed = start.elapsed();

            for joiner in joiners {
                // the producers are done once everything was received
                if joiner.join().is_err() {
                    warn!(name, "producer thread panicked");
                }
            }

            let res = u128::from(total) / elapsed.as_millis().max(1);
            info!(
                name,
                threads,
                received = total,
                elapsed = ?elapsed,
                per_ms = %res,
                "run complete"
            );
            results.entry(threads).or_insert_with(Vec::new).push(res);
        }
    }

    results
}

fn serialize(desc: &str, results: &BTreeMap<u32, Vec<u128>>) -> std::io::Result<()> {
    use std::io::Write;
    let mut v = Vec::new();
    writeln!(v, "threads,{}", desc)?;
    for (threads, results) in results {
        for res in results {
            writeln!(v, "{},{}", threads, res)?;
        }
    }
    std::fs::write(desc, v)
}

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("throughput=info"));

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(true)
                .with_thread_names(true)
                .with_timer(fmt::time::uptime()),
        )
        .with(filter)
        .init();
}

fn main() -> std::io::Result<()> {
    init_tracing();
    let config = Config::from_env();
    info!(
        max_threads = config.max_threads,
        capacity = config.capacity,
        messages = config.messages,
        "starting"
    );

    let res = run("queue", &config, || {
        // capacity was clamped to at least 1 above
        BoundedBlockingQueue::<u64>::bounded(config.capacity).unwrap_or_default()
    });
    info!(?res, "queue throughput");
    serialize("queue", &res)?;

    if config.bench_std {
        let res = run("std", &config, || {
            let (tx, rx) = sync_channel(config.capacity);
            StdPipe {
                tx,
                rx: Mutex::new(rx),
            }
        });
        info!(?res, "std throughput");
        serialize("std", &res)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn std_pipe_round_trip() {
        let (tx, rx) = sync_channel(2);
        let pipe = StdPipe {
            tx,
            rx: Mutex::new(rx),
        };
        pipe.put(3);
        pipe.put(4);
        assert_eq!(pipe.take(), 3);
        assert_eq!(pipe.take(), 4);
    }

    #[test]
    #[should_panic(expected = "std baseline senders disconnected")]
    fn std_pipe_disconnect_is_not_counted() {
        let (tx, _) = sync_channel(1);
        let (gone, rx) = sync_channel(1);
        drop(gone);
        let pipe = StdPipe {
            tx,
            rx: Mutex::new(rx),
        };
        pipe.take();
    }
}
