use std::io;
use std::path::PathBuf;
use tempfile::TempPath;

const LOG_TARGET: &str = "pipeline::artifact";
const ARTIFACT_PREFIX: &str = "speech-worker-";
const ARTIFACT_SUFFIX: &str = ".wav";

/// Allocates uniquely named, initially empty artifact files.
#[derive(Clone, Debug, Default)]
pub(crate) struct ArtifactFactory {
    dir: Option<PathBuf>,
}

impl ArtifactFactory {
    pub(crate) fn new(dir: Option<PathBuf>) -> Self {
        Self { dir }
    }

    pub(crate) fn allocate(&self) -> io::Result<TempPath> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(ARTIFACT_PREFIX).suffix(ARTIFACT_SUFFIX);
        let file = match &self.dir {
            Some(dir) => builder.tempfile_in(dir)?,
            None => builder.tempfile()?,
        };
        Ok(file.into_temp_path())
    }
}

/// Deletes an artifact now rather than on drop. Failures are only logged.
pub(crate) fn remove_artifact(artifact: TempPath) {
    let path = artifact.to_path_buf();
    if let Err(e) = artifact.close() {
        if e.kind() != io::ErrorKind::NotFound {
            tracing::debug!(target: LOG_TARGET, error = %e, path = %path.display(), "failed to remove artifact");
        }
    }
}
