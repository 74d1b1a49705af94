//! Image resize pipeline progress demo
//!
//! Simulates loading and resizing a batch of images on worker threads and
//! prints a single progress line that is rewritten in place.
//!
//! Usage: cargo run --example resize_pipeline
//!        (RUST_LOG=stream_counter=trace shows per-item events)

use crossbeam::channel;
use std::io::{self, Write};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::OnceLock;
use std::thread;
use std::time::Duration;
use stream_counter::{StreamCounter, StreamInfo, StreamItemsTimer, TrackerBuilder};

const IMAGE_COUNT: usize = 40;
const LOADERS: usize = 4;
const RESIZERS: usize = 2;
const SIZES: [&str; 3] = ["small", "medium", "large"];

/// Trackers for each stage of the pipeline
struct Stages {
    overall: StreamCounter,
    loads: StreamItemsTimer,
    waiting_for_resize: StreamCounter,
    resizes: StreamItemsTimer,
}

static STAGES: OnceLock<Stages> = OnceLock::new();
static LAST_MESSAGE_LEN: AtomicUsize = AtomicUsize::new(0);

fn or_zero(ms: Option<f64>) -> f64 {
    ms.unwrap_or(0.0)
}

fn report_progress(carriage_return: bool) {
    let Some(stages) = STAGES.get() else {
        return;
    };

    let overall = stages.overall.snapshot();
    let load_rate = or_zero(stages.loads.overall_rate(Some(5)).ms_per_item());
    let resize_rate = or_zero(stages.resizes.overall_rate(Some(5)).ms_per_item());

    let mut message = format!(
        "{}/{} ({}ms/item) Items Complete; {} images loading (last 5 {}ms/item); \
         {} images waiting to resize; {} images resizing (last 5 {}ms/item);",
        overall.complete,
        overall.total,
        or_zero(overall.rate.ms_per_item()),
        stages.loads.in_progress(),
        load_rate,
        stages.waiting_for_resize.in_progress(),
        stages.resizes.in_progress(),
        resize_rate,
    );

    let mut stdout = io::stdout().lock();
    if carriage_return {
        let last_len = LAST_MESSAGE_LEN.swap(message.len(), Ordering::Relaxed);
        if last_len > message.len() {
            message.push_str(&" ".repeat(last_len - message.len()));
        }
        let _ = write!(stdout, "{message}\r");
    } else {
        let _ = writeln!(stdout, "{message}");
    }
    let _ = stdout.flush();
}

/// Deterministic stand-in for a random delay between `base` and `2 * base`
fn jitter(index: usize, base: u64) -> Duration {
    let spread = (index as u64 * 7919) % base;
    Duration::from_millis(base + spread)
}

fn renamed(image: &str, size: &str) -> String {
    image.replace(".jpg", &format!("_{size}.jpg"))
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let builder = TrackerBuilder::new().on_progress(|| report_progress(true));
    let stages = STAGES.get_or_init(|| Stages {
        overall: builder.clone().build_counter(),
        loads: builder.clone().build_timer(),
        waiting_for_resize: builder.clone().build_counter(),
        resizes: builder.build_timer(),
    });

    let (image_tx, image_rx) = channel::unbounded::<(usize, String)>();
    let (loaded_tx, loaded_rx) = channel::unbounded::<(usize, String)>();
    let (done_tx, done_rx) = channel::unbounded::<Vec<String>>();

    crossbeam::thread::scope(|scope| {
        for _ in 0..LOADERS {
            let image_rx = image_rx.clone();
            let loaded_tx = loaded_tx.clone();
            scope.spawn(move |_| {
                for (index, image) in image_rx {
                    let timer = stages.loads.start_item_timer();
                    thread::sleep(jitter(index, 50));
                    timer.stop();

                    stages.waiting_for_resize.new_item();
                    if loaded_tx.send((index, image)).is_err() {
                        break;
                    }
                }
            });
        }

        for _ in 0..RESIZERS {
            let loaded_rx = loaded_rx.clone();
            let done_tx = done_tx.clone();
            scope.spawn(move |_| {
                for (index, image) in loaded_rx {
                    let timer = stages.resizes.start_item_timer();
                    if let Err(err) = stages.waiting_for_resize.item_complete() {
                        tracing::error!(error = %err, "resize queue out of step");
                    }

                    thread::sleep(jitter(index, 30));
                    let outputs = SIZES.iter().map(|size| renamed(&image, size)).collect();
                    timer.stop();

                    if done_tx.send(outputs).is_err() {
                        break;
                    }
                }
            });
        }

        drop(loaded_tx);
        drop(done_tx);

        for index in 0..IMAGE_COUNT {
            stages.overall.new_item();
            let _ = image_tx.send((index, format!("image_{index:03}.jpg")));
        }
        drop(image_tx);

        let mut written = 0;
        for outputs in done_rx {
            written += outputs.len();
            if let Err(err) = stages.overall.item_complete() {
                tracing::error!(error = %err, "more images finished than started");
            }
        }

        println!();
        report_progress(false);
        println!("Wrote {written} resized images");
    })
    .expect("Pipeline worker panicked");
}
