//! Saves and loads [`IndexBundle`]s.
//!
//! Layout under the store directory:
//!
//! - `builds/<build_id>/vectors.bin`: bincode-encoded vector matrix
//! - `builds/<build_id>/chunks.json`: chunk metadata in row order
//! - `CURRENT`: the build id of the live bundle
//!
//! A save writes both artifacts into a fresh build directory, then switches
//! `CURRENT` with one atomic rename. Until that rename the previous bundle is
//! the one a load sees, whatever happens to the save. Superseded build
//! directories are removed after the switch.

use crate::error::{Error, Result};
use crate::index::{FlatIndex, IndexBundle, VectorIndex};
use crate::ingest::Chunk;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::{BufReader, BufWriter, Write as _};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use uuid::Uuid;

const CURRENT_FILE: &str = "CURRENT";
const BUILDS_DIR: &str = "builds";
const VECTORS_FILE: &str = "vectors.bin";
const CHUNKS_FILE: &str = "chunks.json";

#[derive(Serialize, Deserialize)]
struct VectorArtifact {
    build_id: Uuid,
    built_at: DateTime<Utc>,
    index: FlatIndex,
}

#[derive(Serialize, Deserialize)]
struct ChunkArtifact {
    build_id: Uuid,
    chunks: Vec<Chunk>,
}

/// Bundle persistence rooted at one directory.
#[derive(Debug, Clone)]
pub struct IndexStore {
    dir: PathBuf,
}

impl IndexStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Directory holding the artifacts of one build.
    pub fn build_dir(&self, build_id: Uuid) -> PathBuf {
        self.dir.join(BUILDS_DIR).join(build_id.to_string())
    }

    fn current_path(&self) -> PathBuf {
        self.dir.join(CURRENT_FILE)
    }

    /// Build id of the live bundle, or `None` when nothing has been saved.
    pub fn current_build(&self) -> Result<Option<Uuid>> {
        let path = self.current_path();
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(error) => {
                return Err(Error::IndexNotFound {
                    path,
                    reason: error.to_string(),
                });
            }
        };
        Uuid::parse_str(content.trim())
            .map(Some)
            .map_err(|error| Error::corrupt(&path, format!("invalid build id: {error}")))
    }

    /// Write the bundle and make it the live one.
    pub fn save(&self, bundle: &IndexBundle) -> Result<()> {
        self.save_gated(bundle, &CommitGate::default())
    }

    fn save_gated(&self, bundle: &IndexBundle, gate: &CommitGate) -> Result<()> {
        let build_dir = self.build_dir(bundle.build_id());
        let result = self
            .write_build(bundle, &build_dir)
            .and_then(|()| gate.commit(|| self.switch_current(bundle.build_id())));

        if let Err(error) = result {
            if self.current_build().ok().flatten() == Some(bundle.build_id()) {
                return Err(error);
            }
            if let Err(cleanup) = std::fs::remove_dir_all(&build_dir) {
                tracing::warn!(
                    dir = %build_dir.display(),
                    %cleanup,
                    "failed to remove unfinished build"
                );
            }
            return Err(error);
        }

        tracing::info!(
            dir = %self.dir.display(),
            build_id = %bundle.build_id(),
            rows = bundle.len(),
            "index bundle saved"
        );
        self.remove_stale_builds(bundle.build_id());
        Ok(())
    }

    fn write_build(&self, bundle: &IndexBundle, build_dir: &Path) -> Result<()> {
        std::fs::create_dir_all(build_dir)?;

        let vectors = VectorArtifact {
            build_id: bundle.build_id(),
            built_at: bundle.built_at(),
            index: bundle.index().clone(),
        };
        write_atomic(&build_dir.join(VECTORS_FILE), |writer| {
            bincode::serialize_into(writer, &vectors).map_err(|error| {
                Error::Other(anyhow::anyhow!("failed to encode vectors: {error}"))
            })
        })?;

        let chunks = ChunkArtifact {
            build_id: bundle.build_id(),
            chunks: bundle.chunks().to_vec(),
        };
        write_atomic(&build_dir.join(CHUNKS_FILE), |writer| {
            serde_json::to_writer(writer, &chunks).map_err(|error| {
                Error::Other(anyhow::anyhow!("failed to encode chunks: {error}"))
            })
        })
    }

    fn switch_current(&self, build_id: Uuid) -> Result<()> {
        write_atomic(&self.current_path(), |writer| {
            writeln!(writer, "{build_id}")?;
            Ok(())
        })
    }

    fn remove_stale_builds(&self, live: Uuid) {
        let builds = self.dir.join(BUILDS_DIR);
        let entries = match std::fs::read_dir(&builds) {
            Ok(entries) => entries,
            Err(error) => {
                tracing::warn!(dir = %builds.display(), %error, "failed to list builds");
                return;
            }
        };
        let live = live.to_string();
        for entry in entries {
            let path = match entry {
                Ok(entry) => entry.path(),
                Err(error) => {
                    tracing::warn!(dir = %builds.display(), %error, "failed to read build entry");
                    continue;
                }
            };
            if path.file_name().is_some_and(|name| name == live.as_str()) {
                continue;
            }
            match std::fs::remove_dir_all(&path) {
                Ok(()) => tracing::debug!(dir = %path.display(), "removed stale build"),
                Err(error) => {
                    tracing::warn!(dir = %path.display(), %error, "failed to remove stale build")
                }
            }
        }
    }

    /// Read the live bundle and verify its artifacts describe the same build.
    pub fn load(&self) -> Result<IndexBundle> {
        // A save may remove the build we just resolved; follow the pointer once more.
        let build_id = self.require_current()?;
        let result = self.load_build(build_id);
        if matches!(result, Err(Error::IndexNotFound { .. })) {
            let latest = self.require_current()?;
            if latest != build_id {
                return self.load_build(latest);
            }
        }
        result
    }

    fn require_current(&self) -> Result<Uuid> {
        self.current_build()?.ok_or_else(|| Error::IndexNotFound {
            path: self.current_path(),
            reason: "no bundle has been saved".into(),
        })
    }

    fn load_build(&self, build_id: Uuid) -> Result<IndexBundle> {
        let build_dir = self.build_dir(build_id);

        let vectors_path = build_dir.join(VECTORS_FILE);
        let vectors: VectorArtifact = {
            let reader = open_artifact(&vectors_path)?;
            bincode::deserialize_from(reader)
                .map_err(|error| Error::corrupt(&vectors_path, error.to_string()))?
        };
        if !vectors.index.is_consistent() {
            return Err(Error::corrupt(
                &vectors_path,
                "vector matrix shape does not match its row count",
            ));
        }

        let chunks_path = build_dir.join(CHUNKS_FILE);
        let chunks: ChunkArtifact = {
            let reader = open_artifact(&chunks_path)?;
            serde_json::from_reader(reader)
                .map_err(|error| Error::corrupt(&chunks_path, error.to_string()))?
        };

        if vectors.build_id != build_id || chunks.build_id != build_id {
            return Err(Error::corrupt(
                &build_dir,
                format!(
                    "artifacts from different builds: expected {build_id}, vectors {}, chunks {}",
                    vectors.build_id, chunks.build_id
                ),
            ));
        }

        let bundle = IndexBundle::from_parts(
            vectors.build_id,
            vectors.built_at,
            vectors.index,
            chunks.chunks,
        )
        .map_err(|reason| Error::corrupt(&build_dir, reason))?;

        tracing::info!(
            dir = %self.dir.display(),
            build_id = %bundle.build_id(),
            rows = bundle.len(),
            dimension = bundle.index().dimension(),
            "index bundle loaded"
        );
        Ok(bundle)
    }

    /// [`save`](Self::save) on the blocking pool, bounded by `timeout`.
    ///
    /// A save that times out before switching `CURRENT` is abandoned and its
    /// build directory removed, so an error always means the live bundle did
    /// not change. A save that switched just as the timeout expired reports
    /// success.
    pub async fn save_async(&self, bundle: Arc<IndexBundle>, timeout: Duration) -> Result<()> {
        let store = self.clone();
        let gate = Arc::new(CommitGate::default());
        let task = tokio::task::spawn_blocking({
            let gate = gate.clone();
            move || store.save_gated(&bundle, &gate)
        });

        match tokio::time::timeout(timeout, task).await {
            Ok(joined) => {
                joined.map_err(|error| anyhow::anyhow!("index save task failed: {error}"))?
            }
            Err(_) => {
                if gate.abandon() {
                    tracing::debug!("index save committed as its timeout expired");
                    return Ok(());
                }
                Err(timed_out("save", timeout))
            }
        }
    }

    /// [`load`](Self::load) on the blocking pool, bounded by `timeout`.
    pub async fn load_async(&self, timeout: Duration) -> Result<IndexBundle> {
        let store = self.clone();
        let task = tokio::task::spawn_blocking(move || store.load());
        match tokio::time::timeout(timeout, task).await {
            Ok(joined) => {
                joined.map_err(|error| anyhow::anyhow!("index load task failed: {error}"))?
            }
            Err(_) => Err(timed_out("load", timeout)),
        }
    }
}

/// Decides, under one lock, whether a save may still switch `CURRENT`.
#[derive(Default)]
struct CommitGate(Mutex<GateState>);

#[derive(Default, PartialEq)]
enum GateState {
    #[default]
    Open,
    Committed,
    Abandoned,
}

impl CommitGate {
    fn commit(&self, switch: impl FnOnce() -> Result<()>) -> Result<()> {
        let mut state = self.0.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if *state == GateState::Abandoned {
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::TimedOut,
                "index save abandoned before commit",
            )));
        }
        switch()?;
        *state = GateState::Committed;
        Ok(())
    }

    /// Stop a pending commit. Returns whether the save had already committed.
    fn abandon(&self) -> bool {
        let mut state = self.0.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if *state == GateState::Committed {
            return true;
        }
        *state = GateState::Abandoned;
        false
    }
}

fn write_atomic<F>(destination: &Path, encode: F) -> Result<()>
where
    F: FnOnce(&mut BufWriter<&std::fs::File>) -> Result<()>,
{
    let parent = destination.parent().unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(parent)?;
    let temp = tempfile::NamedTempFile::new_in(parent)?;
    {
        let mut writer = BufWriter::new(temp.as_file());
        encode(&mut writer)?;
        writer.flush()?;
    }
    temp.as_file().sync_all()?;
    temp.persist(destination).map_err(|error| error.error)?;
    Ok(())
}

fn open_artifact(path: &Path) -> Result<BufReader<std::fs::File>> {
    std::fs::File::open(path)
        .map(BufReader::new)
        .map_err(|error| Error::IndexNotFound {
            path: path.to_path_buf(),
            reason: error.to_string(),
        })
}

fn timed_out(operation: &str, timeout: Duration) -> Error {
    Error::Io(std::io::Error::new(
        std::io::ErrorKind::TimedOut,
        format!("index {operation} timed out after {timeout:?}"),
    ))
}
