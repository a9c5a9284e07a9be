use std::{io, path::Path, process, thread};

use anyhow::anyhow;
use crossbeam_channel::unbounded;
use shared::{
    Broadcast, Config, Reader, RunOutcome, SharedState, SourceError, WorkerReport, Writer,
};
use tracing::error;

use crate::{sink::SimOut, source::FileSource};

enum Finished {
    Report(WorkerReport),
    Failed { writer: u32, error: SourceError },
}

pub fn run<B: Broadcast>(config: Config, data: &Path, sink: &SimOut) -> anyhow::Result<RunOutcome> {
    let state = SharedState::<B>::new(config, false)?;
    let sources = (0..config.writer_count)
        .map(|_| FileSource::open(data))
        .collect::<Result<Vec<_>, _>>()?;
    let (tx, rx) = unbounded();

    thread::scope(|s| {
        let mut handles = Vec::new();

        for id in 0..config.reader_count {
            let (tx, state) = (tx.clone(), &state);
            let name = format!("reader-{id}");
            let handle = spawned(
                thread::Builder::new()
                    .name(name.clone())
                    .spawn_scoped(s, move || {
                        let report = Reader::new(id, config.slots).run(state);
                        let _ = tx.send(Finished::Report(report));
                    }),
                &name,
            );
            handles.push(handle);
        }

        for (id, source) in (0..).zip(sources) {
            let (tx, state) = (tx.clone(), &state);
            let name = format!("writer-{id}");
            let handle = spawned(
                thread::Builder::new()
                    .name(name.clone())
                    .spawn_scoped(s, move || {
                        let finished = match Writer::new(id, source).run(state) {
                            Ok(report) => Finished::Report(report),
                            Err(error) => Finished::Failed { writer: id, error },
                        };
                        let _ = tx.send(finished);
                    }),
                &name,
            );
            handles.push(handle);
        }
        drop(tx);

        let mut reports = Vec::new();
        for finished in rx.iter() {
            match finished {
                Finished::Report(report) => {
                    sink.record(&report);
                    reports.push(report);
                }
                Finished::Failed { writer, error } => {
                    // Readers are now waiting for values that will never
                    // come; there is nothing left to join.
                    error!(writer, "writer failed: {error}");
                    process::exit(1);
                }
            }
        }

        for handle in handles {
            handle.join().map_err(|_| anyhow!("worker thread panicked"))?;
        }
        Ok(reports.into_iter().collect())
    })
}

// Workers already running would wait on the missing one forever.
fn spawned<T>(result: io::Result<T>, worker: &str) -> T {
    match result {
        Ok(handle) => handle,
        Err(e) => {
            error!(worker, "failed to spawn: {e}");
            process::exit(1);
        }
    }
}
