//! Filesystem-backed object storage.
//!
//! Objects live at `<root>/<bucket>/<key>`. Streaming uploads are staged in a sibling
//! `.partial` file and renamed into place only once the body has been read to completion,
//! so an aborted upload never leaves a visible object. A content encoding is kept in a
//! `<key>.meta.json` sidecar.

use crate::io::cloud::locator::{validate_bucket, validate_key};
use crate::io::cloud::traits::{CloudIOError, CloudResult, ErrorKind, ObjectIO, ObjectMetadata};
use serde::{Deserialize, Serialize};
use std::fs::{self, File, create_dir_all};
use std::io::{self, BufWriter, Read};
use std::path::{Path, PathBuf};

const SIDECAR_SUFFIX: &str = ".meta.json";
const PARTIAL_SUFFIX: &str = ".partial";

#[derive(Debug, Default, Serialize, Deserialize)]
struct Sidecar {
    #[serde(rename = "contentEncoding", skip_serializing_if = "Option::is_none")]
    content_encoding: Option<String>,
}

fn sidecar_error(err: serde_json::Error) -> CloudIOError {
    CloudIOError::new(ErrorKind::InternalError, format!("corrupt metadata sidecar: {err}"))
}

#[derive(Debug, Clone)]
pub struct LocalObjectIO {
    root: PathBuf,
}

impl LocalObjectIO {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn object_path(&self, bucket: &str, key: &str) -> CloudResult<PathBuf> {
        validate_bucket(bucket)
            .and_then(|()| validate_key(key))
            .map_err(|reason| {
                CloudIOError::new(ErrorKind::InvalidInput, format!("{bucket}/{key}: {reason}"))
            })?;
        Ok(self.root.join(bucket).join(key))
    }

    fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
        let mut name = path.as_os_str().to_os_string();
        name.push(suffix);
        PathBuf::from(name)
    }

    fn prepare_parent(path: &Path) -> CloudResult<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            create_dir_all(parent).map_err(|e| {
                CloudIOError::from(e).with_source(format!("mkdir -p {}", parent.display()))
            })?;
        }
        Ok(())
    }

    fn write_sidecar(path: &Path, content_encoding: Option<&str>) -> CloudResult<()> {
        let sidecar_path = Self::with_suffix(path, SIDECAR_SUFFIX);
        match content_encoding {
            Some(encoding) => {
                let sidecar = Sidecar {
                    content_encoding: Some(encoding.to_string()),
                };
                let json = serde_json::to_vec(&sidecar).map_err(sidecar_error)?;
                fs::write(&sidecar_path, json)?;
            }
            None => match fs::remove_file(&sidecar_path) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            },
        }
        Ok(())
    }

    fn read_sidecar(path: &Path) -> CloudResult<Sidecar> {
        match fs::read(Self::with_suffix(path, SIDECAR_SUFFIX)) {
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(sidecar_error),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Sidecar::default()),
            Err(e) => Err(e.into()),
        }
    }

    fn not_found(bucket: &str, key: &str) -> CloudIOError {
        CloudIOError::new(
            ErrorKind::NotFound,
            format!("Object {bucket}/{key} not found"),
        )
    }

    fn map_read_error(err: io::Error, bucket: &str, key: &str) -> CloudIOError {
        if err.kind() == io::ErrorKind::NotFound {
            Self::not_found(bucket, key)
        } else {
            err.into()
        }
    }
}

impl ObjectIO for LocalObjectIO {
    fn put_object(&self, bucket: &str, key: &str, data: &[u8]) -> CloudResult<()> {
        let mut body = data;
        self.put_object_stream(bucket, key, &mut body, None)
    }

    fn put_object_stream(
        &self,
        bucket: &str,
        key: &str,
        body: &mut dyn Read,
        content_encoding: Option<&str>,
    ) -> CloudResult<()> {
        let path = self.object_path(bucket, key)?;
        Self::prepare_parent(&path)?;
        let partial = Self::with_suffix(&path, PARTIAL_SUFFIX);

        let staged = (|| -> io::Result<()> {
            let mut out = BufWriter::new(File::create(&partial)?);
            io::copy(body, &mut out)?;
            out.into_inner().map_err(io::IntoInnerError::into_error)?.sync_all()
        })();
        if let Err(e) = staged {
            let _ = fs::remove_file(&partial);
            return Err(CloudIOError::new(
                ErrorKind::Network,
                format!("upload of {bucket}/{key} aborted"),
            )
            .with_source(e.to_string()));
        }

        Self::write_sidecar(&path, content_encoding)?;
        fs::rename(&partial, &path)?;
        Ok(())
    }

    fn get_object(&self, bucket: &str, key: &str) -> CloudResult<Vec<u8>> {
        let path = self.object_path(bucket, key)?;
        fs::read(&path).map_err(|e| Self::map_read_error(e, bucket, key))
    }

    fn get_object_reader(&self, bucket: &str, key: &str) -> CloudResult<Box<dyn Read + Send>> {
        let path = self.object_path(bucket, key)?;
        let file = File::open(&path).map_err(|e| Self::map_read_error(e, bucket, key))?;
        Ok(Box::new(io::BufReader::new(file)))
    }

    fn delete_object(&self, bucket: &str, key: &str) -> CloudResult<()> {
        let path = self.object_path(bucket, key)?;
        for target in [Self::with_suffix(&path, SIDECAR_SUFFIX), path] {
            match fs::remove_file(&target) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }

    fn object_exists(&self, bucket: &str, key: &str) -> CloudResult<bool> {
        Ok(self.object_path(bucket, key)?.is_file())
    }

    fn get_metadata(&self, bucket: &str, key: &str) -> CloudResult<ObjectMetadata> {
        let path = self.object_path(bucket, key)?;
        let meta = fs::metadata(&path).map_err(|e| Self::map_read_error(e, bucket, key))?;
        let sidecar = Self::read_sidecar(&path)?;
        Ok(ObjectMetadata {
            key: key.to_string(),
            size: meta.len(),
            content_encoding: sidecar.content_encoding,
            etag: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FailingBody;

    impl Read for FailingBody {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::other("stream interrupted"))
        }
    }

    #[test]
    fn roundtrip_with_encoding_sidecar() -> anyhow::Result<()> {
        let tmp = tempfile::tempdir()?;
        let storage = LocalObjectIO::new(tmp.path());

        let mut body: &[u8] = b"a,b\n1,2\n";
        storage.put_object_stream("out", "dir/file.csv", &mut body, Some("gzip"))?;

        assert!(storage.object_exists("out", "dir/file.csv")?);
        assert_eq!(storage.get_object("out", "dir/file.csv")?, b"a,b\n1,2\n");
        let meta = storage.get_metadata("out", "dir/file.csv")?;
        assert_eq!(meta.content_encoding.as_deref(), Some("gzip"));
        assert_eq!(meta.size, 8);

        storage.put_object("out", "dir/file.csv", b"plain")?;
        let meta = storage.get_metadata("out", "dir/file.csv")?;
        assert_eq!(meta.content_encoding, None);

        let mut contents = String::new();
        storage
            .get_object_reader("out", "dir/file.csv")?
            .read_to_string(&mut contents)?;
        assert_eq!(contents, "plain");
        Ok(())
    }

    #[test]
    fn aborted_upload_leaves_no_object() -> anyhow::Result<()> {
        let tmp = tempfile::tempdir()?;
        let storage = LocalObjectIO::new(tmp.path());

        let err = storage
            .put_object_stream("out", "file.csv", &mut FailingBody, Some("gzip"))
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Network);
        assert!(!storage.object_exists("out", "file.csv")?);
        assert!(!tmp.path().join("out").join("file.csv.partial").exists());
        Ok(())
    }

    #[test]
    fn missing_objects_are_not_found() {
        let tmp = tempfile::tempdir().unwrap();
        let storage = LocalObjectIO::new(tmp.path());
        let err = storage.get_object_reader("in", "missing.csv").err().unwrap();
        assert_eq!(err.kind, ErrorKind::NotFound);
        assert!(storage.object_path("in", "../escape.csv").is_err());
    }
}
