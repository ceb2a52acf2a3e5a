use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::error::CaptureError;
use super::format::RecordingFormat;

/// Metadata describing a finished recording.
///
/// Serializable for JSON hand-off to the upload/transcription
/// collaborator alongside the encoded bytes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactMetadata {
    pub id: String,
    pub mime_type: String,
    pub duration_secs: f64,
    pub byte_len: u64,
    pub checksum: String,
    pub is_fallback_container: bool,
    pub created_at: String,
}

impl ArtifactMetadata {
    pub fn new(format: &RecordingFormat, bytes: &[u8], duration_secs: f64) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            mime_type: format.container_mime.clone(),
            duration_secs,
            byte_len: bytes.len() as u64,
            checksum: format!("{:x}", Sha256::digest(bytes)),
            is_fallback_container: format.is_fallback,
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Local playable reference to a finished recording, for preview playback.
///
/// The encoded bytes are spilled to a uniquely-named temp file and exposed
/// as a `file://` URL. The file is removed when the handle is revoked or
/// dropped, so a dismissed preview does not leak the recording on disk.
#[derive(Debug)]
pub struct PlayableHandle {
    path: PathBuf,
    url: String,
    revoked: bool,
}

impl PlayableHandle {
    fn create(id: &str, extension: &str, bytes: &[u8]) -> Result<Self, CaptureError> {
        let path = std::env::temp_dir().join(format!("dictation_{id}.{extension}"));
        fs::write(&path, bytes)
            .map_err(|e| CaptureError::StorageError(format!("write {}: {e}", path.display())))?;
        let url = format!("file://{}", path.display());
        Ok(Self {
            path,
            url,
            revoked: false,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Remove the preview file. Idempotent.
    pub fn revoke(&mut self) -> Result<(), CaptureError> {
        if self.revoked {
            return Ok(());
        }
        self.revoked = true;
        fs::remove_file(&self.path)
            .map_err(|e| CaptureError::StorageError(format!("remove {}: {e}", self.path.display())))
    }
}

impl Drop for PlayableHandle {
    fn drop(&mut self) {
        if !self.revoked {
            if let Err(e) = self.revoke() {
                log::warn!("failed to revoke playable handle: {e}");
            }
        }
    }
}

/// The finalized output of one capture session: the encoded container
/// bytes, the negotiated MIME type, and a playable preview handle.
///
/// Produced exactly once, when the session finalizes.
#[derive(Debug)]
pub struct Artifact {
    pub mime_type: String,
    pub bytes: Vec<u8>,
    pub duration_secs: f64,
    pub metadata: ArtifactMetadata,
    pub playable: PlayableHandle,
}

impl Artifact {
    pub fn from_encoded(
        format: &RecordingFormat,
        bytes: Vec<u8>,
        duration_secs: f64,
    ) -> Result<Self, CaptureError> {
        let metadata = ArtifactMetadata::new(format, &bytes, duration_secs);
        let playable = PlayableHandle::create(&metadata.id, format.extension(), &bytes)?;
        Ok(Self {
            mime_type: format.container_mime.clone(),
            bytes,
            duration_secs,
            metadata,
            playable,
        })
    }

    /// Metadata as JSON, the shape the upload collaborator consumes.
    pub fn metadata_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(&self.metadata)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn artifact(bytes: &[u8]) -> Artifact {
        Artifact::from_encoded(&RecordingFormat::preferred(), bytes.to_vec(), 1.5)
            .expect("artifact")
    }

    #[test]
    fn metadata_reflects_bytes_and_format() {
        let a = artifact(b"encoded-audio");

        assert_eq!(a.mime_type, "audio/webm");
        assert_eq!(a.metadata.byte_len, 13);
        assert!(!a.metadata.is_fallback_container);
        assert_eq!(a.metadata.checksum.len(), 64);
        assert!((a.duration_secs - 1.5).abs() < f64::EPSILON);
    }

    #[test]
    fn identical_bytes_hash_identically() {
        let a = artifact(b"same");
        let b = artifact(b"same");
        assert_eq!(a.metadata.checksum, b.metadata.checksum);
        assert_ne!(a.metadata.id, b.metadata.id);
    }

    #[test]
    fn playable_file_exists_until_revoked() {
        let mut a = artifact(b"preview-me");
        assert!(a.playable.path().exists());
        assert!(a.playable.url().starts_with("file://"));

        a.playable.revoke().expect("revoke");
        assert!(!a.playable.path().exists());
        a.playable.revoke().expect("second revoke is a no-op");
    }

    #[test]
    fn drop_removes_playable_file() {
        let a = artifact(b"short-lived");
        let path = a.playable.path().to_path_buf();
        assert!(path.exists());
        drop(a);
        assert!(!path.exists());
    }

    #[test]
    fn metadata_json_round_trips() {
        let a = artifact(b"json");
        let json = a.metadata_json().expect("serialize");
        let back: ArtifactMetadata = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, a.metadata);
    }
}
