use chessclip::board::{LocateBoard, Polarity, RectifiedBoard};
use chessclip::core::{BoardGrid, Homography, Quad};
use chessclip::{
    ChessclipConfig, Confirmation, JobResult, JobRunner, JobStatus, MemorySource, PipelineDriver,
    PipelineError, PipelineState, PrerectifiedInput, ProgressStore, ProgressUpdate,
};
use image::{Rgb, RgbImage};
use nalgebra::Point2;

const CANVAS: u32 = 160;
const TILE: u32 = CANVAS / 8;

type Grid = BoardGrid<bool>;

fn start() -> Grid {
    Grid::from_fn(|r, _| matches!(r, 0 | 1 | 6 | 7))
}

fn moved(g: &Grid, from: (usize, usize), to: (usize, usize)) -> Grid {
    let mut out = *g;
    out.set(from.0, from.1, false);
    out.set(to.0, to.1, true);
    out
}

/// Top-down board: occupied tiles dark, empty tiles light.
fn render(grid: &Grid) -> RgbImage {
    RgbImage::from_fn(CANVAS, CANVAS, |x, y| {
        let (row, col) = ((y / TILE) as usize, (x / TILE) as usize);
        let light = if (row + col) % 2 == 0 { 205 } else { 195 };
        let v = if grid.get(row, col) { 25 } else { light };
        Rgb([v, v, v])
    })
}

fn frames(grids: &[Grid]) -> Vec<RgbImage> {
    grids.iter().map(render).collect()
}

fn driver(config: ChessclipConfig) -> PipelineDriver<PrerectifiedInput> {
    PipelineDriver::new(PrerectifiedInput { canvas_size: CANVAS }, config)
}

/// Never sees a board.
struct Blind;

impl LocateBoard for Blind {
    fn locate(&self, _frame: &RgbImage) -> Option<RectifiedBoard> {
        None
    }
}

/// Loses the board on black frames.
struct Flaky(PrerectifiedInput);

impl LocateBoard for Flaky {
    fn locate(&self, frame: &RgbImage) -> Option<RectifiedBoard> {
        if frame.get_pixel(0, 0)[0] < 5 {
            return None;
        }
        self.0.locate(frame)
    }
}

#[test]
fn opening_move_is_recorded() {
    let s0 = start();
    let s1 = moved(&s0, (6, 4), (4, 4));
    let mut source = MemorySource::new(frames(&[s0, s0, s1, s1]), Some(2.0));
    let mut progress = Vec::new();
    let mut results = Vec::new();

    let mut driver = driver(ChessclipConfig::default());
    let record = driver
        .run(&mut source, &mut progress, &mut results)
        .expect("run");

    assert_eq!(driver.state(), PipelineState::Done);
    assert_eq!(record.moves, vec!["e4"]);
    assert_eq!(record.records[0].uci, "e2e4");
    assert!(record.pgn.starts_with("[Event \"Analyzed\"]"));
    assert!(record.pgn.contains("1. e4 *"));
    assert_eq!(record.stats.seek_frames, 1);
    assert_eq!(record.stats.tracker.ticks, 4);
    assert_eq!(record.stats.tracker.accepted, 1);

    assert_eq!(
        results,
        vec![JobResult {
            status: "done".to_string(),
            moves: vec!["e4".to_string()],
            pgn: record.pgn.clone(),
        }]
    );
}

/// Camera view of a board seen at an angle: uniform light squares on a
/// darker table, pieces as dark discs in the square centres.
fn render_in_perspective(grid: &Grid) -> RgbImage {
    let quad = Quad::from_ordered([
        Point2::new(52.0, 38.0),
        Point2::new(348.0, 56.0),
        Point2::new(372.0, 334.0),
        Point2::new(30.0, 312.0),
    ]);
    let canvas_from_frame = Homography::canvas_to_quad(CANVAS as f32, &quad)
        .and_then(|h| h.inverse())
        .expect("invertible board mapping");
    let (tile, side) = (TILE as f32, CANVAS as f32);

    RgbImage::from_fn(400, 360, |x, y| {
        let p = canvas_from_frame.apply(Point2::new(x as f32 + 0.5, y as f32 + 0.5));
        if !(0.0..side).contains(&p.x) || !(0.0..side).contains(&p.y) {
            return Rgb([90, 90, 90]);
        }
        let (row, col) = ((p.y / tile) as usize, (p.x / tile) as usize);
        let (cx, cy) = ((col as f32 + 0.5) * tile, (row as f32 + 0.5) * tile);
        let on_piece = grid.get(row, col) && (p.x - cx).powi(2) + (p.y - cy).powi(2) <= 36.0;
        let v = match (on_piece, (row + col) % 2) {
            (true, _) => 20,
            (false, 0) => 205,
            (false, _) => 195,
        };
        Rgb([v, v, v])
    })
}

#[test]
fn contour_locator_tracks_a_board_seen_at_an_angle() {
    let s0 = start();
    let s1 = moved(&s0, (6, 4), (4, 4));
    let video: Vec<RgbImage> = [s0, s0, s1, s1].iter().map(render_in_perspective).collect();
    let mut source = MemorySource::new(video, Some(2.0));

    let mut config = ChessclipConfig::default();
    config.locator.canvas_size = CANVAS;
    // textured squares (a piece on a plain square) score high
    config.binarize.polarity = Polarity::BrightOccupied;

    let mut driver = PipelineDriver::from_config(config);
    let record = driver
        .run(&mut source, &mut Vec::new(), &mut Vec::new())
        .expect("run");

    assert_eq!(driver.state(), PipelineState::Done);
    assert_eq!(record.moves, vec!["e4"]);
    assert_eq!(record.stats.seek_frames, 1);
    assert_eq!(record.stats.board_not_found, 0);
    assert_eq!(record.stats.tracker.no_change, 3);
}

#[test]
fn progress_is_monotone_and_finishes_at_done() {
    let s0 = start();
    let s1 = moved(&s0, (6, 4), (4, 4));
    let mut source = MemorySource::new(frames(&[s0, s0, s1, s1]), Some(2.0));
    let mut progress: Vec<ProgressUpdate> = Vec::new();
    driver(ChessclipConfig::default())
        .run(&mut source, &mut progress, &mut Vec::new())
        .expect("run");

    assert_eq!(progress.first(), Some(&ProgressUpdate::initializing()));
    assert_eq!(progress.last(), Some(&ProgressUpdate::done()));
    let working: Vec<u8> = progress
        .iter()
        .filter(|u| u.status == JobStatus::Working)
        .map(|u| u.progress)
        .collect();
    assert_eq!(working, vec![18, 36, 54, 72]);
    assert!(working.windows(2).all(|w| w[0] <= w[1]));
    assert!(working.iter().all(|&p| p < 100));
}

#[test]
fn missing_board_fails_the_job() {
    let blank = RgbImage::from_pixel(32, 32, Rgb([90, 90, 90]));
    let mut source = MemorySource::new(vec![blank; 250], Some(25.0));
    let mut progress = Vec::new();
    let mut results: Vec<JobResult> = Vec::new();

    let mut driver = PipelineDriver::new(Blind, ChessclipConfig::default());
    let err = driver
        .run(&mut source, &mut progress, &mut results)
        .unwrap_err();

    assert!(matches!(
        err,
        PipelineError::InitializationFailure { attempts: 200 }
    ));
    assert_eq!(driver.state(), PipelineState::Failed);
    let last = progress.last().expect("progress");
    assert_eq!(last.status, JobStatus::Error);
    assert_eq!(last.progress, 100);
    assert!(last.message.as_deref().unwrap_or("").contains("board not found"));
    assert!(results.is_empty());
}

#[test]
fn short_video_ends_the_search_early() {
    let blank = RgbImage::from_pixel(32, 32, Rgb([90, 90, 90]));
    let mut source = MemorySource::new(vec![blank; 7], None);
    let err = PipelineDriver::new(Blind, ChessclipConfig::default())
        .run(&mut source, &mut Vec::new(), &mut Vec::new())
        .unwrap_err();
    assert!(matches!(
        err,
        PipelineError::InitializationFailure { attempts: 7 }
    ));
}

#[test]
fn illegal_candidate_leaves_the_game_untouched() {
    let s0 = start();
    // e2 -> e5 is not a legal pawn move
    let bad = moved(&s0, (6, 4), (3, 4));
    // judged against the rejected observation: d2 -> d4
    let next = moved(&bad, (6, 3), (4, 3));
    let mut source = MemorySource::new(frames(&[s0, bad, next]), Some(2.0));

    let record = driver(ChessclipConfig::default())
        .run(&mut source, &mut Vec::new(), &mut Vec::new())
        .expect("run");
    assert_eq!(record.moves, vec!["d4"]);
    assert_eq!(record.stats.tracker.rejected, 1);
}

#[test]
fn frames_without_board_are_skipped() {
    let s0 = start();
    let s1 = moved(&s0, (6, 4), (4, 4));
    let s2 = moved(&s1, (1, 4), (3, 4));
    let mut video = frames(&[s0, s1]);
    video.push(RgbImage::new(CANVAS, CANVAS));
    video.extend(frames(&[s2]));
    let mut source = MemorySource::new(video, Some(2.0));

    let mut driver = PipelineDriver::new(
        Flaky(PrerectifiedInput { canvas_size: CANVAS }),
        ChessclipConfig::default(),
    );
    let record = driver
        .run(&mut source, &mut Vec::new(), &mut Vec::new())
        .expect("run");
    assert_eq!(record.moves, vec!["e4", "e5"]);
    assert_eq!(record.stats.board_not_found, 1);
    assert_eq!(record.stats.tracker.ticks, 3);
}

#[test]
fn sampling_skips_frames_between_ticks() {
    let s0 = start();
    let s1 = moved(&s0, (6, 4), (4, 4));
    // at 4 fps a tick is taken every second frame; the odd frames carry a
    // bogus move that must never be seen
    let bogus = moved(&s0, (6, 0), (3, 0));
    let mut source = MemorySource::new(frames(&[s0, bogus, s1, bogus, s1]), Some(4.0));
    let record = driver(ChessclipConfig::default())
        .run(&mut source, &mut Vec::new(), &mut Vec::new())
        .expect("run");
    assert_eq!(record.moves, vec!["e4"]);
    assert_eq!(record.stats.tracker.ticks, 3);
    assert_eq!(record.stats.frames_read, 5);
}

#[test]
fn stable_confirmation_ignores_one_frame_glitches() {
    let s0 = start();
    let glitch = moved(&s0, (6, 3), (4, 3));
    let s1 = moved(&s0, (6, 4), (4, 4));

    let mut config = ChessclipConfig::default();
    config.tracking.confirmation = Confirmation::Stable;
    let mut source = MemorySource::new(frames(&[s0, glitch, s0, s0, s1, s1]), Some(2.0));
    let record = driver(config)
        .run(&mut source, &mut Vec::new(), &mut Vec::new())
        .expect("run");
    assert_eq!(record.moves, vec!["e4"]);
}

#[test]
fn rerunning_a_stream_is_deterministic() {
    let s0 = start();
    let s1 = moved(&s0, (6, 4), (4, 4));
    let s2 = moved(&s1, (1, 4), (3, 4));
    let s3 = moved(&s2, (7, 6), (5, 5));
    let video = frames(&[s0, s1, s2, s2, s3]);

    let mut driver = driver(ChessclipConfig::default());
    let first = driver
        .run(&mut MemorySource::new(video.clone(), Some(2.0)), &mut Vec::new(), &mut Vec::new())
        .expect("first run");
    let second = driver
        .run(&mut MemorySource::new(video, Some(2.0)), &mut Vec::new(), &mut Vec::new())
        .expect("second run");
    assert_eq!(first.moves, vec!["e4", "e5", "Nf3"]);
    assert_eq!(first, second);
}

#[test]
fn jobs_run_independently_and_report_progress() {
    let store = ProgressStore::new();
    let runner = JobRunner::new(store.clone(), ChessclipConfig::default());

    let s0 = start();
    let s1 = moved(&s0, (6, 4), (4, 4));
    let good = runner
        .spawn_with(
            "good",
            PrerectifiedInput { canvas_size: CANVAS },
            MemorySource::new(frames(&[s0, s1]), Some(2.0)),
            Vec::<JobResult>::new(),
        )
        .expect("spawn");
    let bad = runner
        .spawn_with(
            "bad",
            Blind,
            MemorySource::new(frames(&[s0; 3]), Some(2.0)),
            Vec::<JobResult>::new(),
        )
        .expect("spawn");

    assert_eq!(good.join().expect("good job").moves, vec!["e4"]);
    assert!(bad.join().is_err());

    assert_eq!(store.get("good"), Some(ProgressUpdate::done()));
    let failed = store.get("bad").expect("bad entry");
    assert_eq!(failed.status, JobStatus::Error);
    assert_eq!(failed.progress, 100);
}
