//! Sequential frame sources with a rewind back to the first frame.

use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdout, Command, Stdio};
use std::thread::{self, JoinHandle};

use image::RgbImage;
use serde::Deserialize;

#[derive(thiserror::Error, Debug)]
pub enum SourceError {
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Image(#[from] image::ImageError),
    #[error("failed to run {program}: {source}")]
    Spawn {
        program: &'static str,
        source: io::Error,
    },
    #[error("cannot read video stream of {path}: {reason}")]
    Probe { path: PathBuf, reason: String },
    #[error("no frames found in {0}")]
    Empty(PathBuf),
    #[error("video decoder failed ({status}): {reason}")]
    Decode { status: String, reason: String },
    #[error("frame buffer does not match {width}x{height} rgb")]
    FrameBuffer { width: u32, height: u32 },
}

/// Frames in display order.
pub trait FrameSource {
    /// Frames per second, when the container reports it.
    fn fps(&self) -> Option<f64>;
    /// Total frame count, when known up front.
    fn frame_count(&self) -> Option<usize>;
    /// Next frame, `None` once the stream is exhausted.
    fn read_frame(&mut self) -> Result<Option<RgbImage>, SourceError>;
    /// Restart from the first frame.
    fn rewind(&mut self) -> Result<(), SourceError>;
}

impl<S: FrameSource + ?Sized> FrameSource for Box<S> {
    fn fps(&self) -> Option<f64> {
        (**self).fps()
    }

    fn frame_count(&self) -> Option<usize> {
        (**self).frame_count()
    }

    fn read_frame(&mut self) -> Result<Option<RgbImage>, SourceError> {
        (**self).read_frame()
    }

    fn rewind(&mut self) -> Result<(), SourceError> {
        (**self).rewind()
    }
}

/// Frames held in memory.
#[derive(Clone, Debug, Default)]
pub struct MemorySource {
    frames: Vec<RgbImage>,
    fps: Option<f64>,
    next: usize,
}

impl MemorySource {
    pub fn new(frames: Vec<RgbImage>, fps: Option<f64>) -> Self {
        Self {
            frames,
            fps,
            next: 0,
        }
    }
}

impl FrameSource for MemorySource {
    fn fps(&self) -> Option<f64> {
        self.fps
    }

    fn frame_count(&self) -> Option<usize> {
        Some(self.frames.len())
    }

    fn read_frame(&mut self) -> Result<Option<RgbImage>, SourceError> {
        let frame = self.frames.get(self.next).cloned();
        if frame.is_some() {
            self.next += 1;
        }
        Ok(frame)
    }

    fn rewind(&mut self) -> Result<(), SourceError> {
        self.next = 0;
        Ok(())
    }
}

const FRAME_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp", "tif", "tiff", "webp"];

/// A directory of still frames, read in file-name order.
#[derive(Clone, Debug)]
pub struct ImageSequenceSource {
    paths: Vec<PathBuf>,
    fps: Option<f64>,
    next: usize,
}

impl ImageSequenceSource {
    pub fn open(dir: impl AsRef<Path>, fps: Option<f64>) -> Result<Self, SourceError> {
        let dir = dir.as_ref();
        let mut paths = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            let is_frame = path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| FRAME_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()));
            if is_frame && path.is_file() {
                paths.push(path);
            }
        }
        if paths.is_empty() {
            return Err(SourceError::Empty(dir.to_path_buf()));
        }
        paths.sort();
        log::debug!("{} frames in {}", paths.len(), dir.display());
        Ok(Self {
            paths,
            fps,
            next: 0,
        })
    }
}

impl FrameSource for ImageSequenceSource {
    fn fps(&self) -> Option<f64> {
        self.fps
    }

    fn frame_count(&self) -> Option<usize> {
        Some(self.paths.len())
    }

    fn read_frame(&mut self) -> Result<Option<RgbImage>, SourceError> {
        let Some(path) = self.paths.get(self.next) else {
            return Ok(None);
        };
        let frame = image::open(path)?.to_rgb8();
        self.next += 1;
        Ok(Some(frame))
    }

    fn rewind(&mut self) -> Result<(), SourceError> {
        self.next = 0;
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
    #[serde(default)]
    format: Option<ProbeFormat>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    #[serde(default)]
    width: u32,
    #[serde(default)]
    height: u32,
    #[serde(default)]
    r_frame_rate: Option<String>,
    #[serde(default)]
    nb_frames: Option<String>,
    #[serde(default)]
    duration: Option<String>,
    #[serde(default)]
    tags: Option<ProbeTags>,
    #[serde(default)]
    side_data_list: Vec<ProbeSideData>,
}

#[derive(Debug, Deserialize)]
struct ProbeTags {
    #[serde(default)]
    rotate: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProbeSideData {
    #[serde(default)]
    rotation: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct ProbeFormat {
    #[serde(default)]
    duration: Option<String>,
}

/// Geometry and timing of the frames the decoder will emit.
#[derive(Clone, Copy, Debug, PartialEq)]
struct VideoInfo {
    width: u32,
    height: u32,
    fps: Option<f64>,
    frame_count: Option<usize>,
}

impl ProbeOutput {
    fn video_info(self) -> Result<VideoInfo, String> {
        let format_duration = self.format.and_then(|f| f.duration);
        let stream = self
            .streams
            .into_iter()
            .next()
            .ok_or_else(|| "no video stream".to_string())?;
        if stream.width == 0 || stream.height == 0 {
            return Err(format!(
                "invalid frame size {}x{}",
                stream.width, stream.height
            ));
        }

        // ffmpeg applies the display rotation, so quarter turns swap the axes
        let rotation = stream
            .side_data_list
            .iter()
            .find_map(|d| d.rotation)
            .or_else(|| {
                stream
                    .tags
                    .as_ref()
                    .and_then(|t| t.rotate.as_deref())
                    .and_then(|r| r.trim().parse().ok())
            })
            .unwrap_or(0.0);
        let (width, height) = if ((rotation / 90.0).round() as i64).rem_euclid(2) == 1 {
            (stream.height, stream.width)
        } else {
            (stream.width, stream.height)
        };

        let fps = stream.r_frame_rate.as_deref().and_then(parse_rate);
        let counted = stream.nb_frames.as_deref().and_then(|n| n.trim().parse().ok());
        let estimated = || {
            let secs: f64 = stream
                .duration
                .as_deref()
                .or(format_duration.as_deref())?
                .trim()
                .parse()
                .ok()?;
            let frames = (secs * fps?).round();
            (frames.is_finite() && frames >= 1.0).then_some(frames as usize)
        };
        Ok(VideoInfo {
            width,
            height,
            fps,
            frame_count: counted.filter(|&n| n > 0).or_else(estimated),
        })
    }
}

/// Child process writing fixed-size raw frames to its stdout.
///
/// Stderr is drained on a separate thread so a chatty decoder never blocks
/// on a full pipe; its last line explains a non-zero exit.
#[derive(Debug)]
struct RawVideoPipe {
    child: Child,
    stdout: ChildStdout,
    stderr: Option<JoinHandle<String>>,
}

impl RawVideoPipe {
    fn spawn(mut command: Command) -> io::Result<Self> {
        let mut child = command
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| io::Error::other("decoder stdout not captured"))?;
        let stderr = child.stderr.take().map(|mut err| {
            thread::spawn(move || {
                let mut raw = Vec::new();
                let _ = err.read_to_end(&mut raw);
                String::from_utf8_lossy(&raw).into_owned()
            })
        });
        Ok(Self {
            child,
            stdout,
            stderr,
        })
    }

    /// Fill `buf` with the next frame; `false` at end of stream. A truncated
    /// trailing frame counts as end of stream.
    fn read_frame(&mut self, buf: &mut [u8]) -> io::Result<bool> {
        match self.stdout.read_exact(buf) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Reap the process after its output ended.
    fn finish(self) -> Result<(), SourceError> {
        let Self {
            mut child,
            stdout,
            stderr,
        } = self;
        drop(stdout);
        let status = child.wait()?;
        let diagnostics = stderr.and_then(|h| h.join().ok()).unwrap_or_default();
        if status.success() {
            return Ok(());
        }
        let reason = diagnostics
            .lines()
            .rev()
            .map(str::trim)
            .find(|l| !l.is_empty())
            .unwrap_or("no diagnostics")
            .to_string();
        Err(SourceError::Decode {
            status: status.to_string(),
            reason,
        })
    }

    fn kill(self) {
        let Self {
            mut child,
            stdout,
            stderr,
        } = self;
        drop(stdout);
        let _ = child.kill();
        let _ = child.wait();
        if let Some(h) = stderr {
            let _ = h.join();
        }
    }
}

/// Video decoded by an `ffmpeg` child process streaming raw rgb24 frames.
///
/// `ffprobe` supplies the display geometry, the frame rate and the frame
/// count (recorded, or estimated from the duration). Rewinding restarts the
/// decoder.
#[derive(Debug)]
pub struct FfmpegSource {
    path: PathBuf,
    info: VideoInfo,
    pipe: Option<RawVideoPipe>,
}

impl FfmpegSource {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, SourceError> {
        let path = path.as_ref().to_path_buf();
        let info = probe(&path)?;
        log::debug!(
            "{}: {}x{}, fps {:?}, {:?} frames",
            path.display(),
            info.width,
            info.height,
            info.fps,
            info.frame_count
        );
        let mut source = Self {
            path,
            info,
            pipe: None,
        };
        source.spawn()?;
        Ok(source)
    }

    fn spawn(&mut self) -> Result<(), SourceError> {
        let mut command = Command::new("ffmpeg");
        command
            .args(["-v", "error", "-nostdin", "-i"])
            .arg(&self.path)
            .args(["-f", "rawvideo", "-pix_fmt", "rgb24", "-"]);
        let pipe = RawVideoPipe::spawn(command).map_err(|source| SourceError::Spawn {
            program: "ffmpeg",
            source,
        })?;
        self.pipe = Some(pipe);
        Ok(())
    }

    fn stop(&mut self) {
        if let Some(pipe) = self.pipe.take() {
            pipe.kill();
        }
    }
}

impl FrameSource for FfmpegSource {
    fn fps(&self) -> Option<f64> {
        self.info.fps
    }

    fn frame_count(&self) -> Option<usize> {
        self.info.frame_count
    }

    fn read_frame(&mut self) -> Result<Option<RgbImage>, SourceError> {
        let Some(pipe) = self.pipe.as_mut() else {
            return Ok(None);
        };
        let (width, height) = (self.info.width, self.info.height);
        let mut buf = vec![0u8; width as usize * height as usize * 3];
        if !pipe.read_frame(&mut buf)? {
            if let Some(pipe) = self.pipe.take() {
                pipe.finish()?;
            }
            return Ok(None);
        }
        RgbImage::from_raw(width, height, buf)
            .map(Some)
            .ok_or(SourceError::FrameBuffer { width, height })
    }

    fn rewind(&mut self) -> Result<(), SourceError> {
        self.stop();
        self.spawn()
    }
}

impl Drop for FfmpegSource {
    fn drop(&mut self) {
        self.stop();
    }
}

fn probe(path: &Path) -> Result<VideoInfo, SourceError> {
    let output = Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-select_streams",
            "v:0",
            "-show_streams",
            "-show_format",
            "-of",
            "json",
        ])
        .arg(path)
        .output()
        .map_err(|source| SourceError::Spawn {
            program: "ffprobe",
            source,
        })?;
    let probe_error = |reason: String| SourceError::Probe {
        path: path.to_path_buf(),
        reason,
    };
    if !output.status.success() {
        return Err(probe_error(
            String::from_utf8_lossy(&output.stderr).trim().to_string(),
        ));
    }
    let parsed: ProbeOutput =
        serde_json::from_slice(&output.stdout).map_err(|e| probe_error(e.to_string()))?;
    parsed.video_info().map_err(probe_error)
}

/// Parse an ffprobe rate such as `30000/1001` or `25`.
fn parse_rate(rate: &str) -> Option<f64> {
    let fps = match rate.split_once('/') {
        Some((num, den)) => {
            let den: f64 = den.trim().parse().ok()?;
            if den == 0.0 {
                return None;
            }
            num.trim().parse::<f64>().ok()? / den
        }
        None => rate.trim().parse().ok()?,
    };
    (fps.is_finite() && fps > 0.0).then_some(fps)
}

/// Open `input` as a frame directory when it is one, as a video otherwise.
///
/// `fps` overrides the rate reported by the source.
pub fn open_source(
    input: impl AsRef<Path>,
    fps: Option<f64>,
) -> Result<Box<dyn FrameSource + Send>, SourceError> {
    let input = input.as_ref();
    if input.is_dir() {
        return Ok(Box::new(ImageSequenceSource::open(input, fps)?));
    }
    let video = FfmpegSource::open(input)?;
    Ok(match fps {
        Some(fps) => Box::new(FpsOverride { inner: video, fps }),
        None => Box::new(video),
    })
}

struct FpsOverride<S> {
    inner: S,
    fps: f64,
}

impl<S: FrameSource> FrameSource for FpsOverride<S> {
    fn fps(&self) -> Option<f64> {
        Some(self.fps)
    }

    fn frame_count(&self) -> Option<usize> {
        self.inner.frame_count()
    }

    fn read_frame(&mut self) -> Result<Option<RgbImage>, SourceError> {
        self.inner.read_frame()
    }

    fn rewind(&mut self) -> Result<(), SourceError> {
        self.inner.rewind()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn solid(v: u8) -> RgbImage {
        RgbImage::from_pixel(4, 4, Rgb([v, v, v]))
    }

    #[test]
    fn memory_source_rewinds() {
        let mut src = MemorySource::new(vec![solid(1), solid(2)], Some(10.0));
        assert_eq!(src.frame_count(), Some(2));
        assert_eq!(src.read_frame().unwrap().unwrap(), solid(1));
        assert_eq!(src.read_frame().unwrap().unwrap(), solid(2));
        assert!(src.read_frame().unwrap().is_none());
        src.rewind().unwrap();
        assert_eq!(src.read_frame().unwrap().unwrap(), solid(1));
    }

    #[test]
    fn image_sequence_reads_in_name_order() {
        let dir = tempfile::tempdir().unwrap();
        solid(30).save(dir.path().join("frame_002.png")).unwrap();
        solid(10).save(dir.path().join("frame_000.png")).unwrap();
        solid(20).save(dir.path().join("frame_001.png")).unwrap();
        std::fs::write(dir.path().join("notes.txt"), "not a frame").unwrap();

        let mut src = ImageSequenceSource::open(dir.path(), None).unwrap();
        assert_eq!(src.frame_count(), Some(3));
        assert_eq!(src.fps(), None);
        let firsts: Vec<u8> = std::iter::from_fn(|| src.read_frame().unwrap())
            .map(|f| f.get_pixel(0, 0)[0])
            .collect();
        assert_eq!(firsts, vec![10, 20, 30]);

        src.rewind().unwrap();
        assert_eq!(src.read_frame().unwrap().unwrap().get_pixel(0, 0)[0], 10);
    }

    #[test]
    fn empty_directory_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            ImageSequenceSource::open(dir.path(), None),
            Err(SourceError::Empty(_))
        ));
    }

    #[test]
    fn parses_frame_rates() {
        approx::assert_relative_eq!(parse_rate("25/1").unwrap(), 25.0);
        approx::assert_relative_eq!(parse_rate("30000/1001").unwrap(), 29.97, epsilon = 1e-2);
        approx::assert_relative_eq!(parse_rate("24").unwrap(), 24.0);
        assert_eq!(parse_rate("0/0"), None);
        assert_eq!(parse_rate("N/A"), None);
    }

    fn info(json: &str) -> Result<VideoInfo, String> {
        serde_json::from_str::<ProbeOutput>(json)
            .expect("probe json")
            .video_info()
    }

    #[test]
    fn probe_reports_recorded_frame_count() {
        let got = info(
            r#"{"streams":[{"width":1920,"height":1080,"r_frame_rate":"30/1","nb_frames":"300"}]}"#,
        )
        .unwrap();
        assert_eq!((got.width, got.height), (1920, 1080));
        assert_eq!(got.frame_count, Some(300));
    }

    #[test]
    fn quarter_turn_rotation_swaps_frame_size() {
        let side_data = info(
            r#"{"streams":[{"width":1920,"height":1080,"r_frame_rate":"30/1",
                "side_data_list":[{"side_data_type":"Display Matrix","rotation":-90}]}]}"#,
        )
        .unwrap();
        assert_eq!((side_data.width, side_data.height), (1080, 1920));

        let tagged = info(
            r#"{"streams":[{"width":640,"height":480,"tags":{"rotate":"270"}}]}"#,
        )
        .unwrap();
        assert_eq!((tagged.width, tagged.height), (480, 640));

        let upside_down = info(
            r#"{"streams":[{"width":640,"height":480,"tags":{"rotate":"180"}}]}"#,
        )
        .unwrap();
        assert_eq!((upside_down.width, upside_down.height), (640, 480));
    }

    #[test]
    fn frame_count_falls_back_to_duration() {
        let from_stream = info(
            r#"{"streams":[{"width":64,"height":48,"r_frame_rate":"25/1","duration":"4.0"}]}"#,
        )
        .unwrap();
        assert_eq!(from_stream.frame_count, Some(100));

        // matroska keeps the duration on the container only
        let from_format = info(
            r#"{"streams":[{"width":64,"height":48,"r_frame_rate":"30000/1001"}],
                "format":{"duration":"10.010000"}}"#,
        )
        .unwrap();
        assert_eq!(from_format.frame_count, Some(300));

        let unknown = info(r#"{"streams":[{"width":64,"height":48}]}"#).unwrap();
        assert_eq!(unknown.frame_count, None);
    }

    #[test]
    fn probe_without_video_is_an_error() {
        assert!(info(r#"{"streams":[]}"#).is_err());
        assert!(info(r#"{"streams":[{"width":0,"height":0}]}"#).is_err());
    }

    #[cfg(unix)]
    fn shell(script: &str) -> Command {
        let mut command = Command::new("sh");
        command.args(["-c", script]);
        command
    }

    #[cfg(unix)]
    #[test]
    fn raw_pipe_yields_whole_frames_then_ends() {
        // two 2×1 rgb frames and a truncated tail
        let mut pipe = RawVideoPipe::spawn(shell("printf 'abcdefghijklXY'")).unwrap();
        let mut buf = [0u8; 6];
        assert!(pipe.read_frame(&mut buf).unwrap());
        assert_eq!(&buf, b"abcdef");
        assert!(pipe.read_frame(&mut buf).unwrap());
        assert_eq!(&buf, b"ghijkl");
        assert!(!pipe.read_frame(&mut buf).unwrap());
        pipe.finish().unwrap();
    }

    #[cfg(unix)]
    #[test]
    fn failing_decoder_surfaces_its_stderr() {
        let mut pipe =
            RawVideoPipe::spawn(shell("echo 'moov atom not found' >&2; exit 1")).unwrap();
        let mut buf = [0u8; 6];
        assert!(!pipe.read_frame(&mut buf).unwrap());
        let err = pipe.finish().unwrap_err();
        assert!(matches!(err, SourceError::Decode { .. }));
        assert!(err.to_string().contains("moov atom not found"));
    }
}
