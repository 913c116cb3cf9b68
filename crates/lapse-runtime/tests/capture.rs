use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::{SystemTime, UNIX_EPOCH};

use lapse_runtime::{Profiler, ProfilerConfig, ProfilerError};
use lapse_wire::{AllocError, Allocator, WireError, decode_capture_default};
use parking_lot::Mutex;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("debug")),
        )
        .with_test_writer()
        .try_init();
}

#[test]
fn main_thread_frame_and_event_round_trip() {
    init_tracing();
    let saved = Arc::new(Mutex::new(Vec::new()));
    let profiler = Profiler::builder()
        .save_sink({
            let saved = saved.clone();
            move |capture: &[u8]| *saved.lock() = capture.to_vec()
        })
        .build();

    let main = profiler.add_thread("MainThread");
    {
        let frame = main.frame();
        let _event = frame.event("Test");
    }

    let len = profiler
        .stop_capture()
        .expect("stop capture")
        .expect("sink is configured");
    let saved = saved.lock();
    assert_eq!(saved.len(), len);

    let threads = decode_capture_default(&saved).expect("decode capture");
    assert_eq!(threads.len(), 1);
    let record = &threads[0];
    assert_eq!(record.name(), Some("MainThread"));
    assert_eq!(record.frames.len(), 1);
    assert_eq!(record.frames[0].index, 0);
    assert!(record.frames[0].end >= record.frames[0].start);
    assert_eq!(record.events.len(), 1);
    assert_eq!(record.events[0].name(), Some("Test"));
    assert!(record.frames[0].start <= record.events[0].start);
    assert!(record.events[0].end <= record.frames[0].end);
}

#[test]
fn capture_while_producers_run() {
    init_tracing();
    const PRODUCERS: usize = 4;
    const EVENTS: usize = 2_000;

    let profiler = Profiler::default();
    let handles: Vec<_> = (0..PRODUCERS)
        .map(|i| profiler.add_thread(format!("worker-{i}")))
        .collect();

    thread::scope(|scope| {
        for handle in &handles {
            scope.spawn(move || {
                for _ in 0..EVENTS {
                    let frame = handle.frame();
                    drop(frame.event("step"));
                }
            });
        }

        for _ in 0..20 {
            let threads = decode_capture_default(&profiler.capture().expect("capture"))
                .expect("every intermediate capture decodes");
            assert_eq!(threads.len(), PRODUCERS);
            for record in &threads {
                assert!(record.events.len() <= EVENTS);
                for (expected, frame) in record.frames.iter().enumerate() {
                    assert_eq!(frame.index, expected as u64);
                }
            }
        }
    });

    let threads =
        decode_capture_default(&profiler.capture().expect("capture")).expect("decode capture");
    for (i, record) in threads.iter().enumerate() {
        assert_eq!(record.name(), Some(format!("worker-{i}").as_str()));
        assert_eq!(record.events.len(), EVENTS);
        assert_eq!(record.frames.len(), EVENTS);
    }
}

#[test]
fn config_capture_path_writes_a_file() {
    init_tracing();
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let path = std::env::temp_dir().join(format!(
        "lapse-capture-{}-{nanos}.capture",
        std::process::id()
    ));

    let profiler = Profiler::new(ProfilerConfig::default().with_capture_path(&path));
    let main = profiler.add_thread("MainThread");
    drop(main.event("Test"));

    let len = profiler
        .stop_capture()
        .expect("stop capture")
        .expect("file sink installed from config");
    let bytes = std::fs::read(&path).expect("capture file exists");
    assert_eq!(bytes.len(), len);

    let threads = decode_capture_default(&bytes).expect("decode capture");
    assert_eq!(threads[0].events[0].name(), Some("Test"));
    let _ = std::fs::remove_file(&path);
}

struct RefusingAllocator {
    attempts: AtomicUsize,
}

impl Allocator for RefusingAllocator {
    fn allocate(&self, size: usize) -> Result<Box<[u8]>, AllocError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(AllocError { len: size })
    }

    fn free(&self, block: Box<[u8]>) {
        drop(block);
    }
}

#[test]
fn allocation_failure_is_returned_and_sink_is_skipped() {
    init_tracing();
    let calls = Arc::new(AtomicUsize::new(0));
    let refusing = Arc::new(RefusingAllocator {
        attempts: AtomicUsize::new(0),
    });
    let profiler = Profiler::builder()
        .allocator(refusing.clone())
        .save_sink({
            let calls = calls.clone();
            move |_: &[u8]| {
                calls.fetch_add(1, Ordering::SeqCst);
            }
        })
        .build();
    profiler.add_thread("MainThread");

    let err = profiler.stop_capture().expect_err("allocation must fail");
    assert_eq!(err, ProfilerError::Wire(WireError::OutOfMemory { len: 1024 }));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert_eq!(refusing.attempts.load(Ordering::SeqCst), 1);
}
