//! Turning image sources into decoded pixels.
//!
//! A source is either embedded encoded bytes or a URI. URIs may be `data:`
//! URIs, `http(s)://` URLs, `file://` URLs or plain filesystem paths.
//! Decoding is CPU-bound and runs on the blocking pool.

use std::sync::Arc;
use std::time::Duration;

use futures::future::try_join_all;
use image::RgbaImage;
use kanvas_core::ImageSource;
use url::Url;

use crate::cache::ImageCache;
use crate::error::{CompositeError, CompositeResult};
use crate::image::{decode, parse_data_uri};

/// Configuration for source loading.
#[derive(Debug, Clone)]
pub struct LoaderConfig {
    /// Timeout applied to each remote fetch.
    pub fetch_timeout: Duration,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            fetch_timeout: Duration::from_secs(30),
        }
    }
}

/// Where the bytes of a URI live.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Location {
    Data,
    Remote(Url),
    File(std::path::PathBuf),
}

fn classify(uri: &str) -> CompositeResult<Location> {
    if uri.starts_with("data:") {
        return Ok(Location::Data);
    }
    match Url::parse(uri) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => Ok(Location::Remote(url)),
        Ok(url) if url.scheme() == "file" => url
            .to_file_path()
            .map(Location::File)
            .map_err(|()| CompositeError::Fetch(format!("Invalid file URL: {uri}"))),
        // Single-letter schemes are Windows drive letters.
        Ok(url) if url.scheme().len() > 1 => Err(CompositeError::Fetch(format!(
            "Unsupported URI scheme: {}",
            url.scheme()
        ))),
        _ => Ok(Location::File(uri.into())),
    }
}

/// Fetches and decodes image sources.
#[derive(Debug, Clone)]
pub struct SourceLoader {
    client: reqwest::Client,
    config: LoaderConfig,
}

impl SourceLoader {
    /// Create a loader with default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(LoaderConfig::default())
    }

    /// Create a loader with custom configuration.
    #[must_use]
    pub fn with_config(config: LoaderConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    /// Get the loader configuration.
    #[must_use]
    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    /// Obtain the encoded bytes behind a source.
    ///
    /// # Errors
    ///
    /// Returns [`CompositeError::Fetch`] if the bytes cannot be obtained.
    pub async fn fetch_bytes(&self, source: &ImageSource) -> CompositeResult<Arc<[u8]>> {
        let uri = match source {
            ImageSource::Encoded { bytes, .. } => return Ok(Arc::clone(bytes)),
            ImageSource::Uri(uri) => uri,
        };

        match classify(uri)? {
            Location::Data => Ok(parse_data_uri(uri)?.into()),
            Location::Remote(url) => self.fetch_remote(url).await,
            Location::File(path) => {
                let bytes = tokio::fs::read(&path).await.map_err(|e| {
                    CompositeError::Fetch(format!("Failed to read {}: {e}", path.display()))
                })?;
                Ok(bytes.into())
            }
        }
    }

    async fn fetch_remote(&self, url: Url) -> CompositeResult<Arc<[u8]>> {
        tracing::debug!(%url, "fetching remote image");
        let response = self
            .client
            .get(url.clone())
            .timeout(self.config.fetch_timeout)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| {
                if e.is_timeout() {
                    CompositeError::Fetch(format!("Timed out fetching {url}"))
                } else {
                    CompositeError::Fetch(format!("Failed to fetch {url}: {e}"))
                }
            })?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| CompositeError::Fetch(format!("Failed to read body of {url}: {e}")))?;
        Ok(Arc::from(bytes.as_ref()))
    }

    /// Fetch and decode a single source.
    ///
    /// # Errors
    ///
    /// Returns a decode-class error if the source cannot become pixels.
    pub async fn load(&self, source: &ImageSource) -> CompositeResult<RgbaImage> {
        let bytes = self.fetch_bytes(source).await?;
        tokio::task::spawn_blocking(move || decode(&bytes))
            .await
            .map_err(|e| CompositeError::Decode(format!("Decode task failed: {e}")))?
    }

    /// Fetch and decode several sources concurrently.
    ///
    /// Completes only when every decode has finished; the first failure
    /// fails the whole batch.
    ///
    /// # Errors
    ///
    /// Returns the first decode-class error encountered.
    pub async fn load_all(&self, sources: &[ImageSource]) -> CompositeResult<Vec<RgbaImage>> {
        try_join_all(sources.iter().map(|source| self.load(source))).await
    }

    /// Read-through load: cached buffers are reused, misses are decoded
    /// concurrently and inserted.
    ///
    /// # Errors
    ///
    /// Returns the first decode-class error encountered. Nothing is
    /// inserted into the cache in that case.
    pub async fn load_cached(
        &self,
        cache: &mut ImageCache,
        sources: &[ImageSource],
    ) -> CompositeResult<Vec<Arc<RgbaImage>>> {
        let cached: Vec<Option<Arc<RgbaImage>>> =
            sources.iter().map(|source| cache.get(source)).collect();

        let missing: Vec<ImageSource> = sources
            .iter()
            .zip(&cached)
            .filter(|(_, hit)| hit.is_none())
            .map(|(source, _)| source.clone())
            .collect();
        let mut decoded = self.load_all(&missing).await?.into_iter();

        let mut out = Vec::with_capacity(sources.len());
        for (source, hit) in sources.iter().zip(cached) {
            match hit {
                Some(image) => out.push(image),
                None => {
                    let image = decoded.next().ok_or_else(|| {
                        CompositeError::Decode("Missing decoded image".to_string())
                    })?;
                    out.push(cache.insert(source, image));
                }
            }
        }
        Ok(out)
    }
}

impl Default for SourceLoader {
    fn default() -> Self {
        Self::new()
    }
}
