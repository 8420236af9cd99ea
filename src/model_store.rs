use std::{
    fs,
    io::{self, Read, Write},
    path::{Path, PathBuf},
};

use crate::error::ModelLoadError;

pub const MODEL_FILENAME: &str = "leafcare_mbv2.onnx";

pub fn default_model_path() -> PathBuf {
    PathBuf::from("models").join(MODEL_FILENAME)
}

pub fn default_bundled_model_path() -> PathBuf {
    PathBuf::from("assets").join(MODEL_FILENAME)
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ModelStoreEvent {
    AlreadyPresent,
    Started { total: Option<u64> },
    Progress { copied: u64, total: Option<u64> },
    Finished,
}

/// Copies the bundled artifact to `model_path` unless it is already there.
pub fn ensure_model_ready<F>(
    bundled_path: &Path,
    model_path: &Path,
    mut on_event: F,
) -> Result<(), ModelLoadError>
where
    F: FnMut(ModelStoreEvent),
{
    if model_path.exists() {
        on_event(ModelStoreEvent::AlreadyPresent);
        on_event(ModelStoreEvent::Finished);
        return Ok(());
    }

    if !bundled_path.exists() {
        return Err(ModelLoadError::ArtifactMissing(bundled_path.to_path_buf()));
    }

    if let Some(parent) = model_path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(io_error(parent))?;
        }
    }

    log::info!(
        "copying bundled model from {} to {}",
        bundled_path.display(),
        model_path.display()
    );
    copy_to_path(bundled_path, model_path, &mut on_event)
}

fn copy_to_path<F>(src: &Path, dest: &Path, on_event: &mut F) -> Result<(), ModelLoadError>
where
    F: FnMut(ModelStoreEvent),
{
    let tmp_path = dest.with_extension("partial");
    let result = write_partial(src, &tmp_path, on_event)
        .and_then(|()| fs::rename(&tmp_path, dest).map_err(io_error(dest)));
    if result.is_err() {
        // Never leave a half-written artifact behind.
        let _ = fs::remove_file(&tmp_path);
    }
    result?;

    on_event(ModelStoreEvent::Finished);
    Ok(())
}

fn write_partial<F>(src: &Path, tmp_path: &Path, on_event: &mut F) -> Result<(), ModelLoadError>
where
    F: FnMut(ModelStoreEvent),
{
    let mut input = fs::File::open(src).map_err(io_error(src))?;
    let total = input.metadata().ok().map(|meta| meta.len());
    on_event(ModelStoreEvent::Started { total });

    let mut file = fs::File::create(tmp_path).map_err(io_error(tmp_path))?;

    let mut copied: u64 = 0;
    let mut buffer = [0u8; 16 * 1024];
    loop {
        let bytes_read = input.read(&mut buffer).map_err(io_error(src))?;
        if bytes_read == 0 {
            break;
        }
        file.write_all(&buffer[..bytes_read])
            .map_err(io_error(tmp_path))?;
        copied += bytes_read as u64;
        on_event(ModelStoreEvent::Progress { copied, total });
    }

    file.sync_all().map_err(io_error(tmp_path))
}

fn io_error(path: &Path) -> impl FnOnce(io::Error) -> ModelLoadError + use<> {
    let path = path.to_path_buf();
    move |source| ModelLoadError::Io { path, source }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn copies_bundled_artifact_once() {
        let dir = TempDir::new().unwrap();
        let bundled = dir.path().join("assets").join(MODEL_FILENAME);
        fs::create_dir_all(bundled.parent().unwrap()).unwrap();
        fs::write(&bundled, vec![7u8; 40_000]).unwrap();
        let dest = dir.path().join("models").join(MODEL_FILENAME);

        let mut events = Vec::new();
        ensure_model_ready(&bundled, &dest, |evt| events.push(evt)).unwrap();
        assert_eq!(fs::read(&dest).unwrap().len(), 40_000);
        assert_eq!(
            events.first(),
            Some(&ModelStoreEvent::Started {
                total: Some(40_000)
            })
        );
        assert!(events.contains(&ModelStoreEvent::Progress {
            copied: 40_000,
            total: Some(40_000)
        }));
        assert_eq!(events.last(), Some(&ModelStoreEvent::Finished));
        assert!(!dest.with_extension("partial").exists());

        // A second call must leave the existing copy untouched.
        fs::write(&dest, b"already here").unwrap();
        let mut events = Vec::new();
        ensure_model_ready(&bundled, &dest, |evt| events.push(evt)).unwrap();
        assert_eq!(
            events,
            vec![ModelStoreEvent::AlreadyPresent, ModelStoreEvent::Finished]
        );
        assert_eq!(fs::read(&dest).unwrap(), b"already here");
    }

    #[test]
    fn missing_bundled_artifact_is_an_error() {
        let dir = TempDir::new().unwrap();
        let err = ensure_model_ready(
            &dir.path().join("nope.onnx"),
            &dir.path().join("models").join(MODEL_FILENAME),
            |_| {},
        )
        .unwrap_err();
        assert!(matches!(err, ModelLoadError::ArtifactMissing(_)));
        assert!(!dir.path().join("models").exists());
    }

    #[test]
    fn failed_copy_removes_partial_file() {
        let dir = TempDir::new().unwrap();
        let bundled = dir.path().join(MODEL_FILENAME);
        fs::write(&bundled, vec![3u8; 1_000]).unwrap();

        // A non-empty directory in the destination slot makes the final
        // rename fail after the partial file has been written.
        let dest = dir.path().join("models").join(MODEL_FILENAME);
        fs::create_dir_all(dest.join("occupied")).unwrap();

        let mut events = Vec::new();
        let err = copy_to_path(&bundled, &dest, &mut |evt| events.push(evt)).unwrap_err();
        assert!(matches!(err, ModelLoadError::Io { .. }));
        assert!(!dest.with_extension("partial").exists());
        assert!(!events.contains(&ModelStoreEvent::Finished));
    }
}
