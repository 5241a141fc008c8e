//! ffmpeg-backed [`Encoder`].

use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use pagepan_common::config::{ConcatMode, EncoderConfig};
use pagepan_common::error::{PagepanError, PagepanResult};

use crate::encoder::Encoder;
use crate::segment::SegmentSpec;

/// Audio format every segment is resampled to, so roll silence and voice
/// takes stay compatible under stream-copy concatenation.
const AUDIO_SAMPLE_RATE: u32 = 48_000;
const AUDIO_CHANNELS: u32 = 2;

/// Name of the concat demuxer list written in stream-copy mode.
const CONCAT_LIST_FILE: &str = "concat_list.txt";

/// Encoder that drives the `ffmpeg` and `ffprobe` binaries.
#[derive(Debug, Clone)]
pub struct FfmpegEncoder {
    config: EncoderConfig,
}

impl FfmpegEncoder {
    pub fn new(config: EncoderConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EncoderConfig {
        &self.config
    }

    fn overwrite_flag(&self) -> &'static str {
        if self.config.overwrite {
            "-y"
        } else {
            "-n"
        }
    }

    /// Leading arguments shared by every invocation.
    fn base_args(&self) -> Vec<String> {
        vec![
            "-hide_banner".to_string(),
            "-nostats".to_string(),
            "-progress".to_string(),
            "pipe:1".to_string(),
            self.overwrite_flag().to_string(),
        ]
    }

    /// Video and audio codec arguments.
    ///
    /// NVENC codecs take their constant-quality value as `-cq`; software
    /// encoders such as libx264 use `-crf`.
    fn codec_args(&self) -> Vec<String> {
        let c = &self.config;
        let mut args = vec!["-c:v".to_string(), c.vcodec.clone()];
        if !c.preset.is_empty() {
            args.extend(["-preset".to_string(), c.preset.clone()]);
        }
        if !c.tune.is_empty() {
            args.extend(["-tune".to_string(), c.tune.clone()]);
        }
        let quality_flag = if c.vcodec.ends_with("_nvenc") {
            "-cq"
        } else {
            "-crf"
        };
        args.extend([
            quality_flag.to_string(),
            c.cq.to_string(),
            "-pix_fmt".to_string(),
            c.pix_fmt.clone(),
            "-r".to_string(),
            c.fps.to_string(),
            "-c:a".to_string(),
            c.acodec.clone(),
            "-b:a".to_string(),
            c.audio_bitrate.clone(),
            "-ar".to_string(),
            AUDIO_SAMPLE_RATE.to_string(),
            "-ac".to_string(),
            AUDIO_CHANNELS.to_string(),
        ]);
        args
    }

    fn segment_args(&self, segment: &SegmentSpec, output: &Path) -> Vec<String> {
        let mut args = self.base_args();
        args.extend([
            "-loop".to_string(),
            "1".to_string(),
            "-framerate".to_string(),
            self.config.fps.to_string(),
            "-i".to_string(),
            path_arg(&segment.image),
            "-i".to_string(),
            path_arg(&segment.audio),
            "-map".to_string(),
            "0:v:0".to_string(),
            "-map".to_string(),
            "1:a:0".to_string(),
            "-vf".to_string(),
            segment.geometry.to_filter_chain(),
        ]);
        args.extend(self.codec_args());
        args.extend(["-shortest".to_string(), path_arg(output)]);
        args
    }

    fn concat_reencode_args(&self, segments: &[PathBuf], output: &Path) -> Vec<String> {
        let mut args = self.base_args();
        for segment in segments {
            args.extend(["-i".to_string(), path_arg(segment)]);
        }
        args.extend([
            "-filter_complex".to_string(),
            concat_filter(segments.len()),
            "-map".to_string(),
            "[v]".to_string(),
            "-map".to_string(),
            "[a]".to_string(),
        ]);
        args.extend(self.codec_args());
        args.extend([
            "-movflags".to_string(),
            "+faststart".to_string(),
            path_arg(output),
        ]);
        args
    }

    fn concat_copy_args(&self, list_file: &Path, output: &Path) -> Vec<String> {
        let mut args = self.base_args();
        args.extend([
            "-f".to_string(),
            "concat".to_string(),
            "-safe".to_string(),
            "0".to_string(),
            "-i".to_string(),
            path_arg(list_file),
            "-c".to_string(),
            "copy".to_string(),
            "-movflags".to_string(),
            "+faststart".to_string(),
            path_arg(output),
        ]);
        args
    }

    fn silence_args(&self, duration_secs: f64, output: &Path) -> Vec<String> {
        let mut args = self.base_args();
        args.extend([
            "-f".to_string(),
            "lavfi".to_string(),
            "-i".to_string(),
            format!("anullsrc=r={AUDIO_SAMPLE_RATE}:cl=stereo"),
            "-t".to_string(),
            format!("{duration_secs:.3}"),
            "-c:a".to_string(),
            "pcm_s16le".to_string(),
            path_arg(output),
        ]);
        args
    }

    fn run_ffmpeg(&self, label: &str, args: &[String]) -> PagepanResult<()> {
        tracing::debug!(stage = label, args = ?args, "Running ffmpeg");
        let mut cmd = Command::new(&self.config.ffmpeg_bin);
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let start = std::time::Instant::now();
        let mut child = cmd.spawn().map_err(|e| {
            PagepanError::encode(
                format!("Failed to start {}", self.config.ffmpeg_bin),
                e.to_string(),
            )
        })?;

        tracing::debug!(stage = label, pid = child.id(), "ffmpeg process started");

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| PagepanError::encode("Failed to capture ffmpeg stdout", ""))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| PagepanError::encode("Failed to capture ffmpeg stderr", ""))?;

        // Drain stderr concurrently so ffmpeg never blocks on a full pipe.
        let stderr_task = std::thread::spawn(move || -> String {
            let mut reader = BufReader::new(stderr);
            let mut output = String::new();
            match reader.read_to_string(&mut output) {
                Ok(_) => output,
                Err(err) => format!("<failed to read ffmpeg stderr: {err}>"),
            }
        });

        let mut reader = BufReader::new(stdout);
        let mut line = String::new();
        let mut progress = ProgressState::default();
        loop {
            line.clear();
            let bytes = match reader.read_line(&mut line) {
                Ok(bytes) => bytes,
                Err(err) => {
                    // Reap the process before bailing out.
                    let _ = child.kill();
                    let _ = child.wait();
                    let stderr_output = stderr_task.join().unwrap_or_default();
                    return Err(PagepanError::encode(
                        format!("Failed reading ffmpeg progress: {err}"),
                        stderr_output.trim(),
                    ));
                }
            };
            if bytes == 0 {
                break;
            }

            if let Some((key, value)) = line.trim().split_once('=') {
                progress.update(key, value);
                if key == "progress" {
                    tracing::trace!(
                        stage = label,
                        out_time_secs = progress.out_time_secs,
                        complete = progress.complete,
                        "ffmpeg progress"
                    );
                }
            }
        }

        let status = child
            .wait()
            .map_err(|e| PagepanError::encode("Failed to wait on ffmpeg", e.to_string()))?;

        let stderr_output = stderr_task
            .join()
            .unwrap_or_else(|_| "<failed to join stderr reader>".to_string());

        if !status.success() {
            return Err(PagepanError::encode(
                format!("ffmpeg {label} failed ({status})"),
                stderr_output.trim(),
            ));
        }

        tracing::debug!(
            stage = label,
            out_time_secs = progress.out_time_secs,
            elapsed_secs = start.elapsed().as_secs_f64(),
            "ffmpeg finished"
        );
        Ok(())
    }

    /// Duration of the first audio stream of `path`, via ffprobe.
    pub fn probe_audio_duration(&self, path: &Path) -> Option<f64> {
        let output = Command::new(&self.config.ffprobe_bin)
            .args([
                "-v",
                "error",
                "-select_streams",
                "a:0",
                "-show_entries",
                "stream=duration",
                "-of",
                "default=noprint_wrappers=1:nokey=1",
            ])
            .arg(path)
            .output()
            .ok()?;

        if !output.status.success() {
            return None;
        }

        let raw = String::from_utf8(output.stdout).ok()?;
        parse_probe_duration(&raw)
    }
}

impl Encoder for FfmpegEncoder {
    fn encode_segment(&self, segment: &SegmentSpec, output: &Path) -> PagepanResult<()> {
        let args = self.segment_args(segment, output);
        self.run_ffmpeg("segment", &args)?;

        match self.probe_audio_duration(output) {
            Some(duration) => tracing::debug!(
                index = segment.index,
                segment = %output.display(),
                audio_secs = duration,
                "Segment encoded"
            ),
            None => tracing::warn!(
                index = segment.index,
                segment = %output.display(),
                "Segment audio duration probe failed"
            ),
        }
        Ok(())
    }

    fn concat(&self, segments: &[PathBuf], output: &Path, scratch_dir: &Path) -> PagepanResult<()> {
        if segments.is_empty() {
            return Err(PagepanError::encode("No segments to concatenate", ""));
        }

        match self.config.concat {
            ConcatMode::Reencode => {
                let args = self.concat_reencode_args(segments, output);
                self.run_ffmpeg("concat", &args)
            }
            ConcatMode::StreamCopy => {
                let list_file = scratch_dir.join(CONCAT_LIST_FILE);
                std::fs::write(&list_file, concat_list(segments))?;
                let args = self.concat_copy_args(&list_file, output);
                self.run_ffmpeg("concat", &args)
            }
        }
    }

    fn generate_silence(&self, duration_secs: f64, output: &Path) -> PagepanResult<()> {
        if !duration_secs.is_finite() || duration_secs <= 0.0 {
            return Err(PagepanError::encode(
                format!("Invalid silence duration {duration_secs}"),
                "",
            ));
        }
        let args = self.silence_args(duration_secs, output);
        self.run_ffmpeg("silence", &args)
    }

    fn is_available(&self) -> bool {
        command_exists(&self.config.ffmpeg_bin) && command_exists(&self.config.ffprobe_bin)
    }

    fn name(&self) -> &str {
        "ffmpeg"
    }
}

/// `[0:v][0:a][1:v][1:a]...concat=n=N:v=1:a=1[v][a]`
fn concat_filter(count: usize) -> String {
    let mut filter = String::new();
    for i in 0..count {
        filter.push_str(&format!("[{i}:v][{i}:a]"));
    }
    filter.push_str(&format!("concat=n={count}:v=1:a=1[v][a]"));
    filter
}

/// Contents of a concat demuxer list file.
fn concat_list(segments: &[PathBuf]) -> String {
    segments
        .iter()
        .map(|p| format!("file '{}'\n", p.to_string_lossy().replace('\'', "'\\''")))
        .collect()
}

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

fn parse_probe_duration(raw: &str) -> Option<f64> {
    let secs = raw.lines().next()?.trim().parse::<f64>().ok()?;
    (secs.is_finite() && secs >= 0.0).then_some(secs)
}

/// Whether `binary` can be executed, either as a path or via `PATH`.
pub fn command_exists(binary: &str) -> bool {
    if binary.contains(std::path::MAIN_SEPARATOR) {
        return Path::new(binary).is_file();
    }
    Command::new("sh")
        .arg("-c")
        .arg(format!("command -v {binary} >/dev/null 2>&1"))
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}

#[derive(Debug, Default)]
struct ProgressState {
    out_time_secs: f64,
    complete: bool,
}

impl ProgressState {
    fn update(&mut self, key: &str, value: &str) {
        match key {
            // ffmpeg reports microseconds under both keys.
            "out_time_ms" | "out_time_us" => {
                if let Ok(us) = value.parse::<f64>() {
                    self.out_time_secs = us / 1_000_000.0;
                }
            }
            "progress" => {
                self.complete = value == "end";
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segment::GeometryBuilder;
    use pagepan_project_model::layout::FrameLayout;
    use pagepan_project_model::plan::PlanSlot;

    fn segment() -> SegmentSpec {
        let builder = GeometryBuilder::new(FrameLayout::new(1080, 1920, 0).unwrap(), "black", "yuv420p", 1);
        SegmentSpec {
            index: 0,
            slot: PlanSlot::PreRoll,
            image: PathBuf::from("/in/page.jpg"),
            audio: PathBuf::from("/in/a.wav"),
            geometry: builder.build(1000, 2000, 240).unwrap(),
        }
    }

    fn value_after<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
        args.iter()
            .position(|a| a == flag)
            .and_then(|i| args.get(i + 1))
            .map(String::as_str)
    }

    #[test]
    fn test_nvenc_uses_cq_and_tune() {
        let encoder = FfmpegEncoder::new(EncoderConfig::default());
        let args = encoder.codec_args();
        assert_eq!(value_after(&args, "-c:v"), Some("h264_nvenc"));
        assert_eq!(value_after(&args, "-cq"), Some("23"));
        assert_eq!(value_after(&args, "-tune"), Some("hq"));
        assert!(!args.iter().any(|a| a == "-crf"));
    }

    #[test]
    fn test_software_codec_uses_crf_and_skips_empty_tune() {
        let encoder = FfmpegEncoder::new(EncoderConfig {
            vcodec: "libx264".to_string(),
            preset: "medium".to_string(),
            tune: String::new(),
            cq: 20,
            ..EncoderConfig::default()
        });
        let args = encoder.codec_args();
        assert_eq!(value_after(&args, "-crf"), Some("20"));
        assert!(!args.iter().any(|a| a == "-cq" || a == "-tune"));
    }

    #[test]
    fn test_segment_args() {
        let encoder = FfmpegEncoder::new(EncoderConfig::default());
        let args = encoder.segment_args(&segment(), Path::new("/tmp/seg_000.mp4"));
        assert_eq!(value_after(&args, "-loop"), Some("1"));
        assert_eq!(value_after(&args, "-framerate"), Some("24"));
        assert_eq!(
            value_after(&args, "-vf"),
            Some("scale=1080:2160,crop=1080:1920:0:240,format=yuv420p,setsar=1")
        );
        assert!(args.iter().any(|a| a == "-shortest"));
        assert!(args.iter().any(|a| a == "-y"));
        assert_eq!(args.last().map(String::as_str), Some("/tmp/seg_000.mp4"));
    }

    #[test]
    fn test_no_overwrite_flag() {
        let encoder = FfmpegEncoder::new(EncoderConfig {
            overwrite: false,
            ..EncoderConfig::default()
        });
        let args = encoder.silence_args(1.0, Path::new("s.wav"));
        assert!(args.iter().any(|a| a == "-n"));
        assert!(!args.iter().any(|a| a == "-y"));
    }

    #[test]
    fn test_concat_filter() {
        assert_eq!(
            concat_filter(2),
            "[0:v][0:a][1:v][1:a]concat=n=2:v=1:a=1[v][a]"
        );
    }

    #[test]
    fn test_concat_reencode_args_list_every_segment() {
        let encoder = FfmpegEncoder::new(EncoderConfig::default());
        let segments = vec![PathBuf::from("a.mp4"), PathBuf::from("b.mp4")];
        let args = encoder.concat_reencode_args(&segments, Path::new("v1.mp4"));
        assert_eq!(args.iter().filter(|a| *a == "-i").count(), 2);
        assert_eq!(value_after(&args, "-filter_complex"), Some(concat_filter(2).as_str()));
    }

    #[test]
    fn test_concat_list_escapes_quotes() {
        let list = concat_list(&[PathBuf::from("/x/seg_000.mp4"), PathBuf::from("/x/it's.mp4")]);
        assert_eq!(list, "file '/x/seg_000.mp4'\nfile '/x/it'\\''s.mp4'\n");
    }

    #[test]
    fn test_silence_args() {
        let encoder = FfmpegEncoder::new(EncoderConfig::default());
        let args = encoder.silence_args(0.5, Path::new("pre.wav"));
        assert_eq!(value_after(&args, "-i"), Some("anullsrc=r=48000:cl=stereo"));
        assert_eq!(value_after(&args, "-t"), Some("0.500"));
    }

    #[test]
    fn test_invalid_silence_duration_is_rejected() {
        let encoder = FfmpegEncoder::new(EncoderConfig::default());
        assert!(encoder.generate_silence(0.0, Path::new("x.wav")).is_err());
        assert!(encoder.generate_silence(f64::NAN, Path::new("x.wav")).is_err());
    }

    #[test]
    fn test_concat_without_segments_fails() {
        let encoder = FfmpegEncoder::new(EncoderConfig::default());
        let err = encoder
            .concat(&[], Path::new("out.mp4"), Path::new("."))
            .unwrap_err();
        assert!(matches!(err, PagepanError::Encode { .. }));
    }

    #[test]
    fn test_parse_probe_duration() {
        assert_eq!(parse_probe_duration("3.250000\n"), Some(3.25));
        assert_eq!(parse_probe_duration("N/A\n"), None);
        assert_eq!(parse_probe_duration(""), None);
    }

    #[test]
    fn test_progress_state_parses_out_time() {
        let mut state = ProgressState::default();
        state.update("out_time_us", "2500000");
        assert!((state.out_time_secs - 2.5).abs() < 1e-9);
        state.update("progress", "end");
        assert!(state.complete);
    }

    #[test]
    fn test_segment_audio_matches_silence_format() {
        let encoder = FfmpegEncoder::new(EncoderConfig::default());
        let args = encoder.segment_args(&segment(), Path::new("seg_000.mp4"));
        assert_eq!(value_after(&args, "-ar"), Some("48000"));
        assert_eq!(value_after(&args, "-ac"), Some("2"));

        let silence = encoder.silence_args(1.0, Path::new("pre.wav"));
        assert_eq!(value_after(&silence, "-i"), Some("anullsrc=r=48000:cl=stereo"));
    }

    #[test]
    fn test_spawn_failure_is_encode_error() {
        let encoder = FfmpegEncoder::new(EncoderConfig {
            ffmpeg_bin: "/definitely/not/ffmpeg".to_string(),
            ..EncoderConfig::default()
        });
        let err = encoder.generate_silence(1.0, Path::new("x.wav")).unwrap_err();
        match err {
            PagepanError::Encode { message, diagnostics } => {
                assert!(message.contains("/definitely/not/ffmpeg"), "{message}");
                assert!(!diagnostics.is_empty());
            }
            other => panic!("expected encode error, got {other:?}"),
        }
    }

    #[cfg(unix)]
    fn fake_ffmpeg(dir: &Path, body: &str) -> String {
        use std::os::unix::fs::PermissionsExt;

        let path = dir.join("fake-ffmpeg");
        std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path.to_string_lossy().into_owned()
    }

    #[cfg(unix)]
    #[test]
    fn test_failed_run_carries_stderr() {
        let dir = tempfile::tempdir().unwrap();
        let encoder = FfmpegEncoder::new(EncoderConfig {
            ffmpeg_bin: fake_ffmpeg(
                dir.path(),
                "echo 'progress=continue'\necho 'moov atom not found' >&2\nexit 1",
            ),
            ..EncoderConfig::default()
        });

        let err = encoder
            .generate_silence(1.0, &dir.path().join("pre.wav"))
            .unwrap_err();
        match err {
            PagepanError::Encode { message, diagnostics } => {
                assert!(message.contains("silence"), "{message}");
                assert!(diagnostics.contains("moov atom not found"), "{diagnostics}");
            }
            other => panic!("expected encode error, got {other:?}"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_successful_run() {
        let dir = tempfile::tempdir().unwrap();
        let encoder = FfmpegEncoder::new(EncoderConfig {
            ffmpeg_bin: fake_ffmpeg(dir.path(), "echo 'out_time_us=500000'\necho 'progress=end'"),
            ..EncoderConfig::default()
        });
        encoder
            .generate_silence(0.5, &dir.path().join("pre.wav"))
            .unwrap();
    }

    #[cfg(unix)]
    #[test]
    fn test_unreadable_progress_stops_the_process() {
        let dir = tempfile::tempdir().unwrap();
        let encoder = FfmpegEncoder::new(EncoderConfig {
            ffmpeg_bin: fake_ffmpeg(dir.path(), "printf '\\377\\n'\nexec sleep 30"),
            ..EncoderConfig::default()
        });

        let start = std::time::Instant::now();
        let err = encoder
            .generate_silence(1.0, &dir.path().join("pre.wav"))
            .unwrap_err();
        assert!(matches!(err, PagepanError::Encode { .. }), "got {err:?}");
        assert!(start.elapsed() < std::time::Duration::from_secs(20));
    }

    #[test]
    fn test_missing_binary_is_not_available() {
        let encoder = FfmpegEncoder::new(EncoderConfig {
            ffmpeg_bin: "/definitely/not/ffmpeg".to_string(),
            ..EncoderConfig::default()
        });
        assert!(!encoder.is_available());
    }
}
