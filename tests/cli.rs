extern crate assert_cmd;
extern crate predicates;
extern crate tempfile;

use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::process::Command;

#[test]
fn renders_a_small_png() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("frame.png");
    Command::cargo_bin("mandel")
        .unwrap()
        .args(&[
            "--output",
            out.to_str().unwrap(),
            "--size",
            "64",
            "--iterations",
            "50",
        ])
        .assert()
        .success();
    assert!(out.is_file());
}

#[test]
fn rejects_an_unparseable_size() {
    Command::cargo_bin("mandel")
        .unwrap()
        .args(&["--output", "frame.png", "--size", "banana"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Could not parse frame side"));
}

#[test]
fn rejects_an_out_of_range_iteration_count() {
    Command::cargo_bin("mandel")
        .unwrap()
        .args(&["--output", "frame.png", "--iterations", "0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Iteration count"));
}

#[test]
fn bench_mode_prints_statistics_instead_of_an_image() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("frame.png");
    Command::cargo_bin("mandel")
        .unwrap()
        .args(&[
            "--output",
            out.to_str().unwrap(),
            "--size",
            "32",
            "--iterations",
            "20",
            "--bench",
            "2",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("rounds: 2").and(predicate::str::contains("mean")));
    assert!(!out.exists());
}

#[test]
fn copy_back_regime_renders_too() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("frame.png");
    Command::cargo_bin("mandel")
        .unwrap()
        .args(&[
            "--output",
            out.to_str().unwrap(),
            "--size",
            "32",
            "--iterations",
            "20",
            "--copy-back",
            "--interleaved",
        ])
        .assert()
        .success();
    assert!(out.is_file());
}
