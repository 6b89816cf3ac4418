//! Smoke test for the logging discipline described in the crate-level docs
//! ("Logging"): every variant's `run` call should emit a span carrying a
//! `variant` field naming that variant, so a subscriber installed by a
//! consumer can tell which scheduler produced a given trace line.

use std::io;
use std::sync::{Arc, Mutex};

use bulk_engine::{new_engine, EngineVariant};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::fmt::MakeWriter;

#[derive(Clone, Default)]
struct CapturingWriter(Arc<Mutex<Vec<u8>>>);

impl io::Write for CapturingWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for CapturingWriter {
    type Writer = Self;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

#[test]
fn run_emits_a_span_naming_its_variant_for_every_engine() {
    let buffer = CapturingWriter::default();
    // `FmtSpan::NEW` makes the subscriber print a line when a span is
    // *created*, carrying that span's fields — this is what actually lets
    // the assertion below work for a variant like `Serial`, whose `run`
    // never emits a `trace!`/`debug!` event of its own inside the span.
    let subscriber = tracing_subscriber::fmt()
        .with_writer(buffer.clone())
        .with_ansi(false)
        .with_max_level(tracing::Level::TRACE)
        .with_span_events(FmtSpan::NEW)
        .finish();

    // The span created by `#[instrument]` is entered synchronously on this
    // thread as soon as `run` is called, before any worker thread is
    // spawned, so a thread-local override is enough to observe it — no
    // need to install a process-wide default.
    tracing::subscriber::with_default(subscriber, || {
        for &variant in EngineVariant::all() {
            let engine = new_engine(variant, 2);
            engine.run(&(|_t: i32, _n: i32| {}), 1);
        }
    });

    let output = String::from_utf8(buffer.0.lock().unwrap().clone()).unwrap();

    let expected_field_values =
        ["serial", "always_spawn", "spin_pool", "sleep_pool", "sleep_pool_dag"];
    for field_value in expected_field_values {
        assert!(
            output.contains(field_value),
            "expected a span with variant={field_value:?} in the captured output:\n{output}"
        );
    }
}
