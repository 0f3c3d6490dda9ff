use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use thiserror::Error;

use super::constants::{
    EXPRESSION_MODEL_NAME, EXPRESSION_MODEL_URL, FACE_MODEL_NAME, FACE_MODEL_URL,
};

#[derive(Error, Debug)]
pub enum ModelResolveError {
    #[error("failed to create cache directory: {0}")]
    CacheDir(#[source] std::io::Error),
    #[error("download failed for {url}: {source}")]
    Download {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("download failed for {url}: HTTP {status}")]
    Status { url: String, status: u16 },
    #[error("failed to write model to {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("model not found: {0}")]
    NotFound(PathBuf),
    #[error("could not determine cache directory")]
    NoCacheDir,
}

/// Progress callback: `(bytes_downloaded, total_bytes)`.
/// `total_bytes` is 0 if the server didn't provide Content-Length.
pub type ProgressFn = dyn Fn(u64, u64) + Send + Sync;

/// Where model artifacts come from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ModelSource {
    /// Cache, then bundled directory, then the built-in download URLs.
    Default,
    /// A local directory holding the artifacts under their file names.
    Directory(PathBuf),
    /// A remote base URL; artifacts are fetched as `<base>/<name>` and cached.
    Remote(String),
}

impl ModelSource {
    /// Interprets a user-supplied URI: `http(s)://` is remote, anything else
    /// is a local directory.
    pub fn parse(uri: &str) -> Self {
        if uri.starts_with("http://") || uri.starts_with("https://") {
            ModelSource::Remote(uri.trim_end_matches('/').to_string())
        } else {
            ModelSource::Directory(PathBuf::from(uri))
        }
    }
}

/// Paths to the two artifacts a detection session needs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModelPaths {
    pub face: PathBuf,
    pub expression: PathBuf,
}

/// Resolves both the face and expression models from `source`.
pub fn resolve_models(
    source: &ModelSource,
    bundled_dir: Option<&Path>,
    progress: Option<&ProgressFn>,
) -> Result<ModelPaths, ModelResolveError> {
    let face = resolve_from(source, FACE_MODEL_NAME, FACE_MODEL_URL, bundled_dir, progress)?;
    let expression = resolve_from(
        source,
        EXPRESSION_MODEL_NAME,
        EXPRESSION_MODEL_URL,
        bundled_dir,
        progress,
    )?;
    Ok(ModelPaths { face, expression })
}

fn resolve_from(
    source: &ModelSource,
    name: &str,
    default_url: &str,
    bundled_dir: Option<&Path>,
    progress: Option<&ProgressFn>,
) -> Result<PathBuf, ModelResolveError> {
    match source {
        ModelSource::Default => resolve(name, default_url, bundled_dir, progress),
        ModelSource::Directory(dir) => {
            let path = dir.join(name);
            if path.exists() {
                Ok(path)
            } else {
                Err(ModelResolveError::NotFound(path))
            }
        }
        ModelSource::Remote(base) => {
            let url = format!("{base}/{name}");
            resolve(name, &url, bundled_dir, progress)
        }
    }
}

/// Resolve a model file by name, checking cache locations before downloading.
///
/// Resolution order:
/// 1. User cache directory (platform-specific)
/// 2. Bundled path (for development / pre-packaged installs)
/// 3. Download from URL to cache
pub fn resolve(
    name: &str,
    url: &str,
    bundled_dir: Option<&Path>,
    progress: Option<&ProgressFn>,
) -> Result<PathBuf, ModelResolveError> {
    let cache_dir = model_cache_dir()?;
    let cached_path = cache_dir.join(name);
    if cached_path.exists() {
        log::debug!("Using cached model {}", cached_path.display());
        return Ok(cached_path);
    }

    if let Some(dir) = bundled_dir {
        let bundled_path = dir.join(name);
        if bundled_path.exists() {
            log::debug!("Using bundled model {}", bundled_path.display());
            return Ok(bundled_path);
        }
    }

    fs::create_dir_all(&cache_dir).map_err(ModelResolveError::CacheDir)?;
    log::info!("Downloading {name} from {url}");
    download(url, &cached_path, progress)?;
    Ok(cached_path)
}

/// Platform-specific model cache directory.
///
/// - macOS: `~/Library/Application Support/facemood/models/`
/// - Linux: `$XDG_CACHE_HOME/facemood/models/` or `~/.cache/facemood/models/`
/// - Windows: `%LOCALAPPDATA%/facemood/models/`
pub fn model_cache_dir() -> Result<PathBuf, ModelResolveError> {
    #[cfg(target_os = "macos")]
    {
        dirs::data_dir()
            .map(|d| d.join("facemood").join("models"))
            .ok_or(ModelResolveError::NoCacheDir)
    }
    #[cfg(not(target_os = "macos"))]
    {
        dirs::cache_dir()
            .map(|d| d.join("facemood").join("models"))
            .ok_or(ModelResolveError::NoCacheDir)
    }
}

fn download(url: &str, dest: &Path, progress: Option<&ProgressFn>) -> Result<(), ModelResolveError> {
    let response = reqwest::blocking::get(url).map_err(|e| ModelResolveError::Download {
        url: url.to_string(),
        source: e,
    })?;

    if !response.status().is_success() {
        return Err(ModelResolveError::Status {
            url: url.to_string(),
            status: response.status().as_u16(),
        });
    }

    let total = response.content_length().unwrap_or(0);
    let bytes = response.bytes().map_err(|e| ModelResolveError::Download {
        url: url.to_string(),
        source: e,
    })?;

    // Stage into `.part` and rename so a failed download never looks cached.
    let temp_path = dest.with_extension("part");
    let write_err = |path: &Path| {
        let path = path.to_path_buf();
        move |source: std::io::Error| ModelResolveError::Write { path, source }
    };
    let mut file = fs::File::create(&temp_path).map_err(write_err(&temp_path))?;

    let mut downloaded: u64 = 0;
    for chunk in bytes.chunks(1024 * 1024) {
        if let Err(e) = file.write_all(chunk) {
            drop(file);
            let _ = fs::remove_file(&temp_path);
            return Err(write_err(&temp_path)(e));
        }
        downloaded += chunk.len() as u64;
        if let Some(cb) = progress {
            cb(downloaded, total);
        }
    }

    file.flush().map_err(write_err(&temp_path))?;
    drop(file);

    fs::rename(&temp_path, dest).map_err(write_err(dest))?;
    Ok(())
}
