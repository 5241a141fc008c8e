//! `v<N>` naming: picking the newest dialogue take and numbering outputs.
//!
//! Voice takes are written as `v1__line.wav`, `v2__line.wav`, ... and rendered
//! chapters as `v1.mp4`, `v2.mp4`, ... in the document's `video_output/`.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;

use pagepan_common::error::{PagepanError, PagepanResult};

/// `v<digits>` at the start of a take name.
fn take_version_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^v(\d+)").expect("take version pattern is valid"))
}

/// `v<digits>` anywhere in an output name.
fn output_version_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"v(\d+)").expect("output version pattern is valid"))
}

fn captured_version(re: &Regex, file_name: &str) -> Option<u32> {
    re.captures(file_name)?.get(1)?.as_str().parse().ok()
}

/// Leading `v<digits>` number of a file name, if any.
pub fn version_prefix(file_name: &str) -> Option<u32> {
    captured_version(take_version_re(), file_name)
}

fn has_extension(path: &Path, ext: &str) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(ext))
}

fn file_name_of(path: &Path) -> &str {
    path.file_name().and_then(|n| n.to_str()).unwrap_or_default()
}

/// The newest `.wav` take in `dir`.
///
/// Takes are ranked by their `v<N>` prefix; files without one count as
/// version 0. Ties go to the lexicographically last name.
pub fn latest_take(dir: &Path) -> PagepanResult<PathBuf> {
    if !dir.is_dir() {
        return Err(PagepanError::FileNotFound {
            path: dir.to_path_buf(),
        });
    }

    let mut best: Option<(u32, PathBuf)> = None;
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if !path.is_file() || !has_extension(&path, "wav") {
            continue;
        }
        let version = version_prefix(file_name_of(&path)).unwrap_or(0);
        let better = match &best {
            None => true,
            Some((v, p)) => (version, file_name_of(&path)) > (*v, file_name_of(p)),
        };
        if better {
            best = Some((version, path));
        }
    }

    best.map(|(_, path)| path).ok_or_else(|| {
        PagepanError::document(format!("No .wav audio in {}", dir.display()))
    })
}

/// Next free output version in `dir`: one past the highest `v<N>*.mp4`.
///
/// A missing directory has no versions yet, so the first render is `v1`.
pub fn next_version(dir: &Path) -> PagepanResult<u32> {
    if !dir.is_dir() {
        return Ok(1);
    }

    let mut highest = 0;
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        let name = file_name_of(&path);
        if !name.starts_with('v') || !has_extension(&path, "mp4") {
            continue;
        }
        if let Some(v) = captured_version(output_version_re(), name) {
            highest = highest.max(v);
        }
    }
    highest.checked_add(1).ok_or_else(|| {
        PagepanError::config(format!(
            "No output version left after v{highest} in {}",
            dir.display()
        ))
    })
}

/// Output file name for a version (`v3.mp4`).
pub fn output_file_name(version: u32) -> String {
    format!("v{version}.mp4")
}
