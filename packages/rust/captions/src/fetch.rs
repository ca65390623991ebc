//! Remote caption retrieval.

use std::path::PathBuf;
use std::time::Duration;

use coursepack_shared::{CoursepackError, Result};
use reqwest::Client;
use tracing::{debug, info, instrument};
use url::Url;

use crate::srt;

/// Default timeout in seconds for caption requests.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// User-Agent string for caption requests.
const USER_AGENT: &str = concat!("coursepack/", env!("CARGO_PKG_VERSION"));

/// Configuration for the caption fetcher.
#[derive(Debug, Clone)]
pub struct FetchOptions {
    pub timeout_secs: u64,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

/// A downloaded and converted caption file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptionAsset {
    /// Local `.srt.sjson` file.
    pub sjson_path: PathBuf,
    /// Destination inside the output package, `static/subs_<id>.srt.sjson`.
    pub static_path: String,
}

/// Downloads `.srt` captions into a scratch directory and converts them.
#[derive(Debug, Clone)]
pub struct CaptionFetcher {
    client: Client,
    captions_dir: PathBuf,
}

impl CaptionFetcher {
    pub fn new(captions_dir: impl Into<PathBuf>, opts: &FetchOptions) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(opts.timeout_secs))
            .build()
            .map_err(|e| CoursepackError::Network(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            captions_dir: captions_dir.into(),
        })
    }

    /// Fetch `url`, store it, and convert it to `.srt.sjson`.
    ///
    /// When `youtube_id` differs from the caption file's stem, the static
    /// destination is named after the video so the player finds it.
    #[instrument(skip_all, fields(url = %url))]
    pub async fn fetch(&self, url: &str, youtube_id: Option<&str>) -> Result<CaptionAsset> {
        let parsed = Url::parse(url)
            .map_err(|e| CoursepackError::validation(format!("invalid caption URL {url}: {e}")))?;
        let file_name = parsed
            .path_segments()
            .and_then(|mut segs| segs.next_back())
            .filter(|name| name.ends_with(".srt"))
            .ok_or_else(|| {
                CoursepackError::validation(format!("caption URL does not name an .srt file: {url}"))
            })?
            .to_string();

        let response = self
            .client
            .get(parsed)
            .send()
            .await
            .map_err(|e| CoursepackError::Network(format!("{url}: {e}")))?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            return Err(CoursepackError::Network(format!("{url}: HTTP {status}")));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| CoursepackError::Network(format!("{url}: failed to read body: {e}")))?;

        let stem = file_name.trim_end_matches(".srt");
        let subs_id = match youtube_id.filter(|id| *id != stem) {
            Some(ytid) => {
                info!(
                    caption = %file_name,
                    youtube_id = %ytid,
                    "caption file named differently from video, renaming"
                );
                ytid
            }
            None => stem,
        };

        // One scratch file per destination; caption files from different
        // lectures often share a basename.
        tokio::fs::create_dir_all(&self.captions_dir)
            .await
            .map_err(|e| CoursepackError::io(&self.captions_dir, e))?;
        let srt_path = self.captions_dir.join(format!("subs_{subs_id}.srt"));
        tokio::fs::write(&srt_path, &body)
            .await
            .map_err(|e| CoursepackError::io(&srt_path, e))?;
        debug!(path = %srt_path.display(), bytes = body.len(), "saved caption file");

        let sjson_path = srt::convert_file(&srt_path)?.ok_or_else(|| {
            CoursepackError::validation(format!("{} is not an srt file", srt_path.display()))
        })?;
        let static_path = format!("static/subs_{subs_id}.srt.sjson");

        info!(dest = %static_path, "retrieved caption file");
        Ok(CaptionAsset {
            sjson_path,
            static_path,
        })
    }
}
