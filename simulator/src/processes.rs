use std::{
    collections::HashMap,
    io::{self, Write},
    panic::{self, AssertUnwindSafe},
    path::Path,
    process,
};

use anyhow::{bail, Context};
use arrayvec::ArrayVec;
use libc::pid_t;
use rustix::shm;
use shared::{
    shm::{SharedMemory, ShmSafe},
    sync::Mutex,
    Broadcast, Config, Reader, RunOutcome, SharedState, SourceError, WorkerReport, Writer,
    DESCRIPTOR, MAX_WORKERS,
};
use tracing::{debug, error};

use crate::{sink::SimOut, source::FileSource};

/// Layout of the shared segment: the ring state plus a table children
/// leave their final counts in, since an exit status is too narrow.
#[repr(C)]
struct Segment<B> {
    state: SharedState<B>,
    reports: Mutex<ReportTable>,
}

#[repr(C)]
struct ReportTable(ArrayVec<WorkerReport, MAX_WORKERS>);

unsafe impl ShmSafe for ReportTable {}
unsafe impl<B: ShmSafe> ShmSafe for Segment<B> {}

pub fn run<B: Broadcast>(config: Config, data: &Path, sink: &SimOut) -> anyhow::Result<RunOutcome> {
    let state = SharedState::<B>::new(config, true)?;
    let descriptor = format!("{DESCRIPTOR}_{}", process::id());

    let mem = SharedMemory::create(descriptor.clone(), |mem| {
        mem.write(Segment {
            state,
            reports: Mutex::new(ReportTable(ArrayVec::new()), true),
        });
    })
    .context("creating shared memory segment")?;

    ctrlc::set_handler(move || {
        let _ = shm::unlink(&descriptor);
        process::exit(130);
    })?;

    let segment = mem.get();
    let mut children: HashMap<pid_t, String> = HashMap::new();

    for id in 0..config.reader_count {
        let pid = spawn_child(segment, sink, || {
            Ok(Reader::new(id, config.slots).run(&segment.state))
        })?;
        children.insert(pid, format!("reader-{id}"));
    }

    for id in 0..config.writer_count {
        let source = FileSource::open(data)?;
        let pid = spawn_child(segment, sink, move || {
            Writer::new(id, source).run(&segment.state)
        })?;
        children.insert(pid, format!("writer-{id}"));
    }

    reap(&mut children)?;

    let reports = segment.reports.lock().0.clone();
    Ok(reports.into_iter().collect())
}

fn spawn_child<B: Broadcast>(
    segment: &Segment<B>,
    sink: &SimOut,
    work: impl FnOnce() -> Result<WorkerReport, SourceError>,
) -> anyhow::Result<pid_t> {
    match unsafe { libc::fork() } {
        -1 => bail!("fork failed: {}", io::Error::last_os_error()),
        0 => {
            // Ctrl-C should end the child, not run the parent's cleanup.
            unsafe { libc::signal(libc::SIGINT, libc::SIG_DFL) };

            let code = match panic::catch_unwind(AssertUnwindSafe(work)) {
                Ok(Ok(report)) => {
                    segment.reports.lock().0.push(report);
                    sink.record(&report);
                    0
                }
                Ok(Err(e)) => {
                    error!(pid = process::id(), "writer failed: {e}");
                    1
                }
                Err(_) => 101,
            };

            let _ = io::stdout().flush();
            let _ = io::stderr().flush();
            // Skip destructors: the segment belongs to the parent.
            unsafe { libc::_exit(code) }
        }
        pid => Ok(pid),
    }
}

/// Waits for every child. If one of them dies the others can never finish,
/// so they are terminated and the run fails.
fn reap(children: &mut HashMap<pid_t, String>) -> anyhow::Result<()> {
    while !children.is_empty() {
        let mut status = 0;
        let pid = unsafe { libc::waitpid(-1, &mut status, 0) };
        if pid == -1 {
            let err = io::Error::last_os_error();
            if err.kind() == io::ErrorKind::Interrupted {
                continue;
            }
            return Err(err).context("waiting for workers");
        }

        let Some(name) = children.remove(&pid) else {
            continue;
        };

        if libc::WIFEXITED(status) && libc::WEXITSTATUS(status) == 0 {
            debug!(worker = %name, pid, "worker exited");
            continue;
        }

        error!(worker = %name, pid, status, "worker terminated abnormally");
        for (&other, _) in children.iter() {
            unsafe { libc::kill(other, libc::SIGTERM) };
        }
        for (&other, _) in children.iter() {
            unsafe { libc::waitpid(other, &mut status, 0) };
        }
        children.clear();
        bail!("{name} (pid {pid}) terminated with status {status}");
    }
    Ok(())
}
