//! Stem separation via the external Demucs tool
//!
//! The separation algorithm is an opaque subprocess contract: it takes
//! an audio file path and produces named stem files under
//! `stems/{model}/{id}/`. Two-stem mode (vocals + accompaniment) uses
//! the fast model; four-stem mode uses the fine-tuned one. The tool
//! governs its own retries; there is no inner timeout here.

use mediastem_common::{Error, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::{debug, info};
use uuid::Uuid;

const MODEL_FAST: &str = "htdemucs";
const MODEL_FULL: &str = "htdemucs_ft";
const OUTPUT_BITRATE: &str = "320";
/// Processing segment length in seconds; bounds memory usage
const SEGMENT: &str = "7";

/// One isolated audio component produced by the separation tool
#[derive(Debug, Clone, Serialize)]
pub struct Stem {
    /// Stem name, e.g. "vocals" or "no_vocals"
    pub name: String,
    /// Fetch path for this stem on the HTTP surface
    pub url: String,
}

pub struct StemSeparator {
    binary: String,
    stems_dir: PathBuf,
}

impl StemSeparator {
    pub fn new(binary: String, stems_dir: PathBuf) -> Self {
        Self { binary, stems_dir }
    }

    /// Separate a stored acquisition into stems. The input file is named
    /// `{id}.mp3`, so the tool's output lands under
    /// `{stems_dir}/{model}/{id}/`.
    pub async fn separate(&self, id: Uuid, input: &Path, two_stems: bool) -> Result<Vec<Stem>> {
        if !input.exists() {
            return Err(Error::NotFound(format!(
                "audio file for acquisition {id} is missing"
            )));
        }

        let model = if two_stems { MODEL_FAST } else { MODEL_FULL };
        let args = demucs_args(model, two_stems, &self.stems_dir, input);
        debug!(binary = %self.binary, ?args, "invoking demucs");

        let output = Command::new(&self.binary)
            .args(&args)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| Error::Internal(format!("failed to execute {}: {e}", self.binary)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let trimmed: String = stderr.trim().chars().take(500).collect();
            return Err(Error::Internal(format!("separation failed: {trimmed}")));
        }

        // The output location depends on the model; check both in case
        // a differently configured tool version placed it elsewhere.
        let stems = self
            .candidate_dirs(&id)
            .into_iter()
            .find_map(|dir| {
                let found = collect_stems(&dir, &id);
                if found.is_empty() {
                    None
                } else {
                    Some(found)
                }
            })
            .unwrap_or_default();

        if stems.is_empty() {
            return Err(Error::Internal(
                "separation produced no stem files".to_string(),
            ));
        }

        info!(id = %id, count = stems.len(), model, "stems separated");
        Ok(stems)
    }

    /// Locate one stem file for a completed separation
    pub fn stem_path(&self, id: &Uuid, name: &str) -> Option<PathBuf> {
        self.candidate_dirs(id)
            .into_iter()
            .map(|dir| dir.join(format!("{name}.mp3")))
            .find(|path| path.exists())
    }

    fn candidate_dirs(&self, id: &Uuid) -> [PathBuf; 2] {
        [
            self.stems_dir.join(MODEL_FAST).join(id.to_string()),
            self.stems_dir.join(MODEL_FULL).join(id.to_string()),
        ]
    }
}

fn demucs_args(model: &str, two_stems: bool, stems_dir: &Path, input: &Path) -> Vec<String> {
    let mut args = vec![
        "--mp3".to_string(),
        "--mp3-bitrate".to_string(),
        OUTPUT_BITRATE.to_string(),
        "-o".to_string(),
        stems_dir.display().to_string(),
        "-n".to_string(),
        model.to_string(),
        "--segment".to_string(),
        SEGMENT.to_string(),
        "-j".to_string(),
        "0".to_string(),
    ];
    if two_stems {
        args.push("--two-stems".to_string());
        args.push("vocals".to_string());
    }
    args.push(input.display().to_string());
    args
}

fn collect_stems(dir: &Path, id: &Uuid) -> Vec<Stem> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return vec![];
    };
    let mut stems: Vec<Stem> = entries
        .flatten()
        .filter_map(|entry| {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "mp3") {
                path.file_stem().map(|stem| {
                    let name = stem.to_string_lossy().into_owned();
                    Stem {
                        url: format!("/api/stem/{id}/{name}"),
                        name,
                    }
                })
            } else {
                None
            }
        })
        .collect();
    stems.sort_by(|a, b| a.name.cmp(&b.name));
    stems
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn two_stem_args_use_fast_model_and_vocals_split() {
        let args = demucs_args(
            MODEL_FAST,
            true,
            Path::new("/data/stems"),
            Path::new("/data/downloads/x.mp3"),
        );
        assert!(args.contains(&"htdemucs".to_string()));
        assert!(args.contains(&"--two-stems".to_string()));
        assert!(args.contains(&"vocals".to_string()));
        assert_eq!(args.last().unwrap(), "/data/downloads/x.mp3");
    }

    #[test]
    fn four_stem_args_use_full_model_without_split() {
        let args = demucs_args(
            MODEL_FULL,
            false,
            Path::new("/data/stems"),
            Path::new("/data/downloads/x.mp3"),
        );
        assert!(args.contains(&"htdemucs_ft".to_string()));
        assert!(!args.contains(&"--two-stems".to_string()));
    }

    #[test]
    fn collects_only_mp3_stems_sorted() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("vocals.mp3"), b"v").unwrap();
        std::fs::write(tmp.path().join("no_vocals.mp3"), b"n").unwrap();
        std::fs::write(tmp.path().join("notes.txt"), b"x").unwrap();

        let id = Uuid::new_v4();
        let stems = collect_stems(tmp.path(), &id);
        let names: Vec<&str> = stems.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["no_vocals", "vocals"]);
        assert_eq!(stems[1].url, format!("/api/stem/{id}/vocals"));
    }

    #[test]
    fn stem_path_searches_both_model_dirs() {
        let tmp = tempfile::tempdir().unwrap();
        let separator = StemSeparator::new("demucs".to_string(), tmp.path().to_path_buf());
        let id = Uuid::new_v4();

        let dir = tmp.path().join(MODEL_FULL).join(id.to_string());
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("drums.mp3"), b"d").unwrap();

        assert!(separator.stem_path(&id, "drums").is_some());
        assert!(separator.stem_path(&id, "bass").is_none());
        assert!(separator.stem_path(&Uuid::new_v4(), "drums").is_none());
    }

    #[tokio::test]
    async fn missing_input_is_not_found() {
        let tmp = tempfile::tempdir().unwrap();
        let separator = StemSeparator::new("demucs".to_string(), tmp.path().to_path_buf());
        let err = separator
            .separate(Uuid::new_v4(), Path::new("/nonexistent/file.mp3"), true)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }
}
