use assert_cmd::Command;
use image::{Rgb, RgbImage};
use predicates::prelude::*;
use std::path::Path;

fn chessclip() -> Command {
    Command::cargo_bin("chessclip").expect("binary")
}

/// 160 px top-down board with the given squares occupied.
fn board(occupied: impl Fn(u32, u32) -> bool) -> RgbImage {
    RgbImage::from_fn(160, 160, |x, y| {
        let v = if occupied(y / 20, x / 20) { 25 } else { 205 };
        Rgb([v, v, v])
    })
}

fn write_frames(dir: &Path, frames: &[RgbImage]) {
    for (i, frame) in frames.iter().enumerate() {
        frame.save(dir.join(format!("frame_{i:04}.png"))).expect("save frame");
    }
}

#[test]
fn empty_frame_directory_fails() {
    let dir = tempfile::tempdir().unwrap();
    chessclip()
        .arg(dir.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("no frames found"));
}

#[test]
fn frames_without_a_board_fail() {
    let dir = tempfile::tempdir().unwrap();
    let blank = RgbImage::from_pixel(64, 48, Rgb([90, 90, 90]));
    write_frames(dir.path(), &[blank.clone(), blank.clone(), blank]);
    chessclip()
        .arg(dir.path())
        .args(["--fps", "5"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("board not found in the first 3 frames"));
}

#[test]
fn prerectified_frames_produce_moves_and_result_json() {
    let frames_dir = tempfile::tempdir().unwrap();
    let out_dir = tempfile::tempdir().unwrap();
    let start = |r: u32, _c: u32| matches!(r, 0 | 1 | 6 | 7);
    let after_e4 = move |r: u32, c: u32| (start(r, c) && (r, c) != (6, 4)) || (r, c) == (4, 4);
    write_frames(
        frames_dir.path(),
        &[board(start), board(start), board(after_e4), board(after_e4)],
    );
    let out = out_dir.path().join("result.json");
    // canvas matches the frames, so no resampling blurs the tile edges
    let cfg = out_dir.path().join("config.json");
    std::fs::write(&cfg, r#"{ "locator": { "canvas_size": 160 } }"#).unwrap();

    chessclip()
        .arg(frames_dir.path())
        .args(["--prerectified", "--fps", "2", "--config"])
        .arg(&cfg)
        .arg("--out")
        .arg(&out)
        .assert()
        .success()
        .stdout(predicate::str::contains("moves: e4"))
        .stdout(predicate::str::contains("[Event \"Analyzed\"]"));

    let value: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&out).unwrap()).unwrap();
    assert_eq!(value["status"], "done");
    assert_eq!(value["moves"], serde_json::json!(["e4"]));
}

#[test]
fn unreadable_config_fails() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = dir.path().join("bad.json");
    std::fs::write(&cfg, "{ not json").unwrap();
    chessclip()
        .arg(dir.path())
        .arg("--config")
        .arg(&cfg)
        .assert()
        .failure();
}
