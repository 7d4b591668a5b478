//! Artifact store
//!
//! Layout:
//!
//! ```text
//! <model_dir>/<model_name>_model_<id>.json
//! <model_dir>/<model_name>_metadata_<id>.json
//! <model_dir>/manifest_<id>.json
//! <artifacts_dir>/preprocessing_artifacts_<id>.bin
//! ```
//!
//! Every file is written to a temporary sibling and renamed into place, and
//! the manifest is written last, so a reader never sees a partial bundle.
//! [`ArtifactStore::load`] goes through the manifest and verifies content
//! hashes. [`ArtifactStore::load_latest`] picks the newest file of each kind
//! independently and reports when their bundle ids disagree.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::{info, instrument, warn};

use crate::bundle::{BundleMetadata, BundleSource, ModelBundle};
use crate::classifier::SoftmaxClassifier;
use crate::errors::{AiCoreError, Result};
use crate::preprocessing::PreprocessingArtifacts;

const MODEL_MARKER: &str = "_model_";
const METADATA_MARKER: &str = "_metadata_";
const PREPROCESSING_PREFIX: &str = "preprocessing_artifacts_";
const MANIFEST_PREFIX: &str = "manifest_";

/// Timestamp-derived bundle id, `YYYYmmdd_HHMMSS` in UTC
pub fn new_bundle_id() -> String {
    chrono::Utc::now().format("%Y%m%d_%H%M%S").to_string()
}

/// One file recorded in a manifest
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub file_name: String,
    pub blake3: String,
}

/// Co-versioned files of one bundle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BundleManifest {
    pub bundle_id: String,
    pub model_name: String,
    pub model: ManifestEntry,
    pub metadata: ManifestEntry,
    pub preprocessing: ManifestEntry,
}

/// Paths written by [`ArtifactStore::save`]
#[derive(Debug, Clone, PartialEq)]
pub struct SavedBundle {
    pub bundle_id: String,
    pub model_path: PathBuf,
    pub metadata_path: PathBuf,
    pub preprocessing_path: PathBuf,
    pub manifest_path: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ArtifactKind {
    Model,
    Metadata,
    Preprocessing,
}

impl ArtifactKind {
    fn label(self) -> &'static str {
        match self {
            ArtifactKind::Model => "model",
            ArtifactKind::Metadata => "metadata",
            ArtifactKind::Preprocessing => "preprocessing artifacts",
        }
    }

    /// Bundle id embedded in `file_name`, if the name belongs to this kind
    fn bundle_id(self, file_name: &str) -> Option<&str> {
        let id = match self {
            ArtifactKind::Model => {
                if file_name.contains(METADATA_MARKER) {
                    return None;
                }
                let stem = file_name.strip_suffix(".json")?;
                let at = stem.rfind(MODEL_MARKER)?;
                Some(&stem[at + MODEL_MARKER.len()..])
            }
            ArtifactKind::Metadata => {
                let stem = file_name.strip_suffix(".json")?;
                let at = stem.rfind(METADATA_MARKER)?;
                Some(&stem[at + METADATA_MARKER.len()..])
            }
            ArtifactKind::Preprocessing => file_name
                .strip_suffix(".bin")?
                .strip_prefix(PREPROCESSING_PREFIX),
        };
        id.filter(|id| !id.is_empty())
    }
}

#[derive(Debug, Clone)]
struct Located {
    path: PathBuf,
    bundle_id: String,
}

/// Filesystem store for model bundles
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    model_dir: PathBuf,
    artifacts_dir: PathBuf,
}

impl ArtifactStore {
    pub fn new(model_dir: impl Into<PathBuf>, artifacts_dir: impl Into<PathBuf>) -> Self {
        Self {
            model_dir: model_dir.into(),
            artifacts_dir: artifacts_dir.into(),
        }
    }

    pub fn model_dir(&self) -> &Path {
        &self.model_dir
    }

    pub fn artifacts_dir(&self) -> &Path {
        &self.artifacts_dir
    }

    /// Persist one bundle under `metadata.bundle_id`.
    ///
    /// Content hashes are computed here and written into the stored
    /// metadata and the manifest.
    #[instrument(skip_all, fields(bundle_id = %metadata.bundle_id))]
    pub fn save(
        &self,
        mut metadata: BundleMetadata,
        classifier: &SoftmaxClassifier,
        artifacts: &PreprocessingArtifacts,
    ) -> Result<SavedBundle> {
        let bundle_id = metadata.bundle_id.clone();
        validate_bundle_names(&metadata.model_name, &bundle_id)?;

        fs::create_dir_all(&self.model_dir)?;
        fs::create_dir_all(&self.artifacts_dir)?;

        let model_bytes = classifier.to_json()?;
        let preprocessing_bytes = artifacts.to_bytes()?;
        metadata.model_hash = hash_hex(&model_bytes);
        metadata.preprocessing_hash = hash_hex(&preprocessing_bytes);
        let metadata_bytes = serde_json::to_vec_pretty(&metadata)?;

        let model_name = model_file_name(&metadata.model_name, &bundle_id);
        let metadata_name = metadata_file_name(&metadata.model_name, &bundle_id);
        let preprocessing_name = format!("{PREPROCESSING_PREFIX}{bundle_id}.bin");
        let manifest_name = format!("{MANIFEST_PREFIX}{bundle_id}.json");

        let preprocessing_path = self.artifacts_dir.join(&preprocessing_name);
        let model_path = self.model_dir.join(&model_name);
        let metadata_path = self.model_dir.join(&metadata_name);
        let manifest_path = self.model_dir.join(&manifest_name);

        write_atomic(&preprocessing_path, &preprocessing_bytes)?;
        write_atomic(&model_path, &model_bytes)?;
        write_atomic(&metadata_path, &metadata_bytes)?;

        let manifest = BundleManifest {
            bundle_id: bundle_id.clone(),
            model_name: metadata.model_name.clone(),
            model: ManifestEntry {
                file_name: model_name,
                blake3: metadata.model_hash.clone(),
            },
            metadata: ManifestEntry {
                file_name: metadata_name,
                blake3: hash_hex(&metadata_bytes),
            },
            preprocessing: ManifestEntry {
                file_name: preprocessing_name,
                blake3: metadata.preprocessing_hash.clone(),
            },
        };
        write_atomic(&manifest_path, &serde_json::to_vec_pretty(&manifest)?)?;

        info!(
            model = %model_path.display(),
            preprocessing = %preprocessing_path.display(),
            "saved model bundle"
        );

        Ok(SavedBundle {
            bundle_id,
            model_path,
            metadata_path,
            preprocessing_path,
            manifest_path,
        })
    }

    /// Load the newest model, metadata and preprocessing files, each chosen
    /// independently by modification time (ties broken by file name).
    ///
    /// Differing bundle ids are logged and flagged on the returned bundle;
    /// with `strict` they are an error instead.
    #[instrument(skip(self))]
    pub fn load_latest(&self, strict: bool) -> Result<ModelBundle> {
        let model = self.latest(&self.model_dir, ArtifactKind::Model)?;
        let metadata = self.latest(&self.model_dir, ArtifactKind::Metadata)?;
        let preprocessing = self.latest(&self.artifacts_dir, ArtifactKind::Preprocessing)?;

        let mismatched = model.bundle_id != metadata.bundle_id
            || model.bundle_id != preprocessing.bundle_id;
        if mismatched {
            let detail = format!(
                "model={}, metadata={}, preprocessing={}",
                model.bundle_id, metadata.bundle_id, preprocessing.bundle_id
            );
            if strict {
                return Err(AiCoreError::BundleMismatch(detail));
            }
            warn!(%detail, "latest artifacts come from different bundles");
        }

        let bundle = read_bundle(&model.path, &metadata.path, &preprocessing.path)?;
        info!(
            bundle_id = %bundle.metadata.bundle_id,
            model = %model.path.display(),
            "loaded latest model bundle"
        );

        Ok(bundle.with_source(BundleSource {
            model_path: model.path,
            metadata_path: metadata.path,
            preprocessing_path: preprocessing.path,
            mismatched,
        }))
    }

    /// Load exactly the files named by `manifest_<bundle_id>.json`,
    /// verifying each file's hash.
    #[instrument(skip(self))]
    pub fn load(&self, bundle_id: &str) -> Result<ModelBundle> {
        validate_bundle_id(bundle_id)?;
        let manifest = self.manifest(bundle_id)?;

        let model_path = self.model_dir.join(&manifest.model.file_name);
        let metadata_path = self.model_dir.join(&manifest.metadata.file_name);
        let preprocessing_path = self.artifacts_dir.join(&manifest.preprocessing.file_name);

        verify(&model_path, &manifest.model.blake3)?;
        verify(&metadata_path, &manifest.metadata.blake3)?;
        verify(&preprocessing_path, &manifest.preprocessing.blake3)?;

        let bundle = read_bundle(&model_path, &metadata_path, &preprocessing_path)?;
        if bundle.metadata.bundle_id != manifest.bundle_id {
            return Err(AiCoreError::BundleMismatch(format!(
                "manifest {} points at metadata for {}",
                manifest.bundle_id, bundle.metadata.bundle_id
            )));
        }

        Ok(bundle.with_source(BundleSource {
            model_path,
            metadata_path,
            preprocessing_path,
            mismatched: false,
        }))
    }

    pub fn manifest(&self, bundle_id: &str) -> Result<BundleManifest> {
        let path = self.model_dir.join(format!("{MANIFEST_PREFIX}{bundle_id}.json"));
        if !path.is_file() {
            return Err(AiCoreError::ArtifactNotFound(format!(
                "no manifest for bundle {bundle_id} in {}",
                self.model_dir.display()
            )));
        }
        Ok(serde_json::from_slice(&fs::read(&path)?)?)
    }

    /// Bundle ids with a manifest, oldest first
    pub fn list_bundles(&self) -> Result<Vec<String>> {
        let mut ids: Vec<String> = self
            .file_names(&self.model_dir)?
            .into_iter()
            .filter_map(|(name, _)| {
                name.strip_prefix(MANIFEST_PREFIX)?
                    .strip_suffix(".json")
                    .map(str::to_string)
            })
            .collect();
        ids.sort();
        Ok(ids)
    }

    fn latest(&self, dir: &Path, kind: ArtifactKind) -> Result<Located> {
        let mut candidates: Vec<(SystemTime, String, PathBuf, String)> = Vec::new();
        for (name, path) in self.file_names(dir)? {
            let Some(bundle_id) = kind.bundle_id(&name).map(str::to_string) else {
                continue;
            };
            let modified = fs::metadata(&path)?.modified()?;
            candidates.push((modified, name, path, bundle_id));
        }

        candidates
            .into_iter()
            .max_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(&b.1)))
            .map(|(_, _, path, bundle_id)| Located { path, bundle_id })
            .ok_or_else(|| {
                AiCoreError::ArtifactNotFound(format!(
                    "no {} files in {}",
                    kind.label(),
                    dir.display()
                ))
            })
    }

    fn file_names(&self, dir: &Path) -> Result<Vec<(String, PathBuf)>> {
        if !dir.is_dir() {
            return Err(AiCoreError::ArtifactNotFound(format!(
                "directory {} does not exist",
                dir.display()
            )));
        }

        let mut names = Vec::new();
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                names.push((name.to_string(), entry.path()));
            }
        }
        Ok(names)
    }
}

fn read_bundle(model: &Path, metadata: &Path, preprocessing: &Path) -> Result<ModelBundle> {
    let classifier = SoftmaxClassifier::from_json(&fs::read(model)?)?;
    let metadata: BundleMetadata = serde_json::from_slice(&fs::read(metadata)?)?;
    let artifacts = PreprocessingArtifacts::from_bytes(&fs::read(preprocessing)?)?;
    ModelBundle::new(metadata, classifier, artifacts)
}

fn verify(path: &Path, expected: &str) -> Result<()> {
    if !path.is_file() {
        return Err(AiCoreError::ArtifactNotFound(path.display().to_string()));
    }
    let actual = hash_hex(&fs::read(path)?);
    if actual != expected {
        return Err(AiCoreError::IntegrityFailed {
            path: path.display().to_string(),
            expected: expected.to_string(),
            actual,
        });
    }
    Ok(())
}

fn hash_hex(bytes: &[u8]) -> String {
    hex::encode(blake3::hash(bytes).as_bytes())
}

fn model_file_name(model_name: &str, bundle_id: &str) -> String {
    format!("{model_name}{MODEL_MARKER}{bundle_id}.json")
}

fn metadata_file_name(model_name: &str, bundle_id: &str) -> String {
    format!("{model_name}{METADATA_MARKER}{bundle_id}.json")
}

/// Check that a model name and bundle id produce file names that
/// [`ArtifactStore::load_latest`] and [`ArtifactStore::list_bundles`] parse
/// back to the same bundle.
pub fn validate_bundle_names(model_name: &str, bundle_id: &str) -> Result<()> {
    validate_bundle_id(bundle_id)?;
    validate_bundle_id(model_name)?;

    let model_file = model_file_name(model_name, bundle_id);
    let metadata_file = metadata_file_name(model_name, bundle_id);
    let round_trips = ArtifactKind::Model.bundle_id(&model_file) == Some(bundle_id)
        && ArtifactKind::Metadata.bundle_id(&metadata_file) == Some(bundle_id)
        && !model_file.starts_with(MANIFEST_PREFIX)
        && !metadata_file.starts_with(MANIFEST_PREFIX);
    if round_trips {
        Ok(())
    } else {
        Err(AiCoreError::InvalidParameters(format!(
            "model name {model_name:?} with bundle id {bundle_id:?} clashes with artifact file markers"
        )))
    }
}

/// Ids and model names become file name parts
fn validate_bundle_id(id: &str) -> Result<()> {
    let valid = !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if valid {
        Ok(())
    } else {
        Err(AiCoreError::InvalidParameters(format!(
            "invalid bundle id or model name: {id:?}"
        )))
    }
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| AiCoreError::InvalidParameters(format!("bad path {}", path.display())))?;
    let tmp = path.with_file_name(format!(".{file_name}.tmp"));

    {
        let mut file = fs::File::create(&tmp)?;
        std::io::Write::write_all(&mut file, bytes)?;
        file.sync_all()?;
    }
    fs::rename(&tmp, path)?;
    Ok(())
}
