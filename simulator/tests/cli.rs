//! Drives the built binary end to end. Each run gets its own scratch
//! directory so the process backend's forks never share state with the
//! test harness threads.

use std::{
    env, fs,
    path::{Path, PathBuf},
    process::{self, Command, Output},
};

fn scratch(name: &str) -> PathBuf {
    let dir = env::temp_dir().join(format!("simulator_{name}_{}", process::id()));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).unwrap();
    dir
}

fn simulator(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_simulator"))
        .current_dir(dir)
        .env("RUST_LOG", "warn")
        .args(args)
        .output()
        .unwrap()
}

fn generate(dir: &Path, elements: u64) {
    let out = simulator(
        dir,
        &["generate", "--elements", &elements.to_string(), "--seed", "1"],
    );
    assert!(out.status.success(), "{out:?}");
}

fn assert_sim_out(dir: &Path, readers: usize, writers: usize, elements: u64) {
    let text = fs::read_to_string(dir.join("sim_out")).unwrap();
    let lines: Vec<_> = text.lines().collect();
    assert_eq!(lines.len(), readers + writers);

    let reads = format!("reading {elements} pieces");
    assert_eq!(lines.iter().filter(|l| l.contains(&reads)).count(), readers);

    let written: u64 = lines
        .iter()
        .filter(|l| l.starts_with("writer-"))
        .map(|l| l.split(' ').nth(4).unwrap().parse::<u64>().unwrap())
        .sum();
    assert_eq!(written, elements);
}

#[test]
fn threads_backend_delivers_everything() {
    let dir = scratch("threads");
    generate(&dir, 100);

    let out = simulator(&dir, &["run", "3", "2", "0", "0", "--slots", "4"]);
    assert!(out.status.success(), "{out:?}");
    assert_sim_out(&dir, 3, 2, 100);
}

#[test]
fn processes_backend_delivers_everything() {
    let dir = scratch("processes");
    generate(&dir, 60);

    for notify in ["condvar", "semaphore"] {
        let out = simulator(
            &dir,
            &[
                "run",
                "3",
                "2",
                "0",
                "0",
                "--elements",
                "60",
                "--slots",
                "5",
                "--backend",
                "processes",
                "--notify",
                notify,
            ],
        );
        assert!(out.status.success(), "{notify}: {out:?}");
        assert_sim_out(&dir, 3, 2, 60);
    }
}

#[test]
fn results_csv_is_written() {
    let dir = scratch("results");
    generate(&dir, 20);

    let out = simulator(
        &dir,
        &[
            "run", "2", "1", "0", "0", "--elements", "20", "--slots", "2", "--results",
            "results.csv",
        ],
    );
    assert!(out.status.success(), "{out:?}");

    let csv = fs::read_to_string(dir.join("results.csv")).unwrap();
    assert_eq!(csv, "role,id,items\nreader,0,20\nreader,1,20\nwriter,0,20\n");
}

#[test]
fn short_data_file_is_a_config_error() {
    let dir = scratch("short");
    generate(&dir, 10);

    let out = simulator(&dir, &["run", "1", "1", "0", "0", "--elements", "11"]);
    assert_eq!(out.status.code(), Some(2));
}

#[test]
fn zero_readers_is_a_config_error() {
    let dir = scratch("noreaders");
    generate(&dir, 10);

    let out = simulator(&dir, &["run", "0", "1", "0", "0", "--elements", "10"]);
    assert_eq!(out.status.code(), Some(2));
}
