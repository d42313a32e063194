//! Landing downloaded payloads at their scene path.
//!
//! Transfers are written to `<dest>.part` first. Only a completed transfer is
//! moved to `dest`, so an interrupted download never passes the integrity
//! check. Zip payloads are unpacked and the product inside is moved into
//! place; anything else (Landsat `.tar` bundles) is stored verbatim.

use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::debug;

use super::http::{AsyncHttpClient, RequestAuth};
use super::types::ProviderError;

const ZIP_MAGIC: [u8; 4] = *b"PK\x03\x04";

/// Downloads `url` through a `.part` file and lands the product at `dest`.
pub async fn download_product<C: AsyncHttpClient>(
    client: &C,
    url: &str,
    auth: RequestAuth<'_>,
    dest: &Path,
) -> Result<(), ProviderError> {
    if let Some(parent) = dest.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let part = partial_path(dest);

    if let Err(e) = client.download_to(url, auth, &part).await {
        let _ = tokio::fs::remove_file(&part).await;
        return Err(e);
    }
    finalize_download(part, dest.to_path_buf()).await
}

/// Temporary path a transfer for `dest` is written to.
pub fn partial_path(dest: &Path) -> PathBuf {
    let mut name = dest.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".part");
    dest.with_file_name(name)
}

/// Moves the completed transfer at `part` to `dest`, unpacking zips.
pub async fn finalize_download(part: PathBuf, dest: PathBuf) -> Result<(), ProviderError> {
    tokio::task::spawn_blocking(move || finalize_blocking(&part, &dest))
        .await
        .map_err(|e| ProviderError::Io(format!("archive task failed: {}", e)))?
}

fn finalize_blocking(part: &Path, dest: &Path) -> Result<(), ProviderError> {
    if is_zip(part)? {
        let result = extract_product(part, dest);
        let _ = fs::remove_file(part);
        result
    } else {
        fs::rename(part, dest)?;
        Ok(())
    }
}

fn is_zip(path: &Path) -> Result<bool, ProviderError> {
    let mut magic = [0u8; 4];
    let mut file = File::open(path)?;
    match file.read_exact(&mut magic) {
        Ok(()) => Ok(magic == ZIP_MAGIC),
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => Ok(false),
        Err(e) => Err(e.into()),
    }
}

fn extract_product(archive_path: &Path, dest: &Path) -> Result<(), ProviderError> {
    let parent = dest.parent().unwrap_or_else(|| Path::new("."));
    let file_name = dest
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let staging = parent.join(format!(".{}.extract", file_name));
    if staging.exists() {
        fs::remove_dir_all(&staging)?;
    }
    fs::create_dir_all(&staging)?;

    let result = File::open(archive_path)
        .map_err(ProviderError::from)
        .and_then(|file| {
            zip::ZipArchive::new(file).map_err(|e| ProviderError::Archive(e.to_string()))
        })
        .and_then(|mut archive| {
            archive
                .extract(&staging)
                .map_err(|e| ProviderError::Archive(e.to_string()))
        })
        .and_then(|()| locate_product(&staging, &file_name))
        .and_then(|product| {
            fs::rename(&product, dest)?;
            Ok(())
        });

    let _ = fs::remove_dir_all(&staging);
    if result.is_ok() {
        debug!(dest = %dest.display(), "Archive extracted");
    }
    result
}

/// Finds the extracted product: the top-level entry named like the scene, or
/// the only top-level entry.
fn locate_product(staging: &Path, file_name: &str) -> Result<PathBuf, ProviderError> {
    let named = staging.join(file_name);
    if named.exists() {
        return Ok(named);
    }

    let entries = fs::read_dir(staging)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .collect::<Vec<_>>();
    match entries.as_slice() {
        [only] => Ok(only.clone()),
        _ => Err(ProviderError::Archive(format!(
            "archive does not contain {} ({} top-level entries)",
            file_name,
            entries.len()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn write_zip(path: &Path, entries: &[(&str, &[u8])]) {
        let file = File::create(path).unwrap();
        let mut zip = zip::ZipWriter::new(file);
        let options = zip::write::FileOptions::default();
        for (name, content) in entries {
            zip.start_file(*name, options).unwrap();
            zip.write_all(content).unwrap();
        }
        zip.finish().unwrap();
    }

    #[test]
    fn test_partial_path() {
        assert_eq!(
            partial_path(Path::new("/l1/OLCI/S3A_X.SEN3")),
            PathBuf::from("/l1/OLCI/S3A_X.SEN3.part")
        );
    }

    #[tokio::test]
    async fn test_plain_payload_is_renamed() {
        let temp = TempDir::new().unwrap();
        let dest = temp.path().join("LC08_X.tar");
        let part = partial_path(&dest);
        fs::write(&part, b"tar bytes").unwrap();

        finalize_download(part.clone(), dest.clone()).await.unwrap();

        assert_eq!(fs::read(&dest).unwrap(), b"tar bytes");
        assert!(!part.exists());
    }

    #[tokio::test]
    async fn test_zip_payload_extracts_named_product() {
        let temp = TempDir::new().unwrap();
        let dest = temp.path().join("S3A_X.SEN3");
        let part = partial_path(&dest);
        write_zip(
            &part,
            &[
                ("S3A_X.SEN3/xfdumanifest.xml", b"<xml/>"),
                ("S3A_X.SEN3/Oa01_radiance.nc", b"nc"),
            ],
        );

        finalize_download(part.clone(), dest.clone()).await.unwrap();

        assert!(dest.join("xfdumanifest.xml").exists());
        assert!(!part.exists());
        assert!(!temp.path().join(".S3A_X.SEN3.extract").exists());
    }

    #[tokio::test]
    async fn test_zip_with_unexpected_layout_fails() {
        let temp = TempDir::new().unwrap();
        let dest = temp.path().join("S2B_X.SAFE");
        let part = partial_path(&dest);
        write_zip(&part, &[("a.txt", b"a"), ("b.txt", b"b")]);

        let result = finalize_download(part, dest.clone()).await;

        assert!(matches!(result, Err(ProviderError::Archive(_))));
        assert!(!dest.exists());
    }
}
