use std::path::PathBuf;
use std::time::Duration;

use zpup_core::{DEFAULT_CONCURRENCY, SIZE_LIMIT};

use crate::EngineError;

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/75.0.3770.100 Safari/537.36";
pub const DEFAULT_REFERER: &str = "https://www.zippyshare.com/";

/// Placeholder replaced by the resolved server identifier.
pub(crate) const SERVER_PLACEHOLDER: &str = "{server}";

const MAX_RETRIES: u32 = 5;

#[derive(Debug, Clone)]
pub struct UploadSettings {
    /// Page scraped for the current upload server.
    pub landing_url: String,
    /// Upload endpoint; `{server}` is replaced by the resolved identifier.
    pub upload_url_template: String,
    /// Domain expected in share links.
    pub share_host: String,
    pub user_agent: String,
    pub referer: String,
    /// `host:port` of an HTTPS proxy.
    pub proxy: Option<String>,
    pub connect_timeout: Duration,
    pub resolve_timeout: Option<Duration>,
    /// Whole-upload timeout; unset by default since bodies can be hundreds of MB.
    pub request_timeout: Option<Duration>,
    pub concurrency: usize,
    pub size_limit: u64,
    pub split_videos: bool,
    /// Extra attempts for a task that failed to resolve or transfer (0-5).
    pub retries: u32,
    pub retry_delay: Duration,
    pub splitter: SplitterSettings,
}

impl Default for UploadSettings {
    fn default() -> Self {
        Self {
            landing_url: "https://www.zippyshare.com/".to_string(),
            upload_url_template: "https://{server}.zippyshare.com/upload".to_string(),
            share_host: "zippyshare.com".to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            referer: DEFAULT_REFERER.to_string(),
            proxy: None,
            connect_timeout: Duration::from_secs(10),
            resolve_timeout: Some(Duration::from_secs(30)),
            request_timeout: None,
            concurrency: DEFAULT_CONCURRENCY,
            size_limit: SIZE_LIMIT,
            split_videos: false,
            retries: 0,
            retry_delay: Duration::from_secs(2),
            splitter: SplitterSettings::default(),
        }
    }
}

impl UploadSettings {
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.concurrency == 0 {
            return Err(EngineError::InvalidSettings(
                "concurrency must be at least 1".into(),
            ));
        }
        if self.size_limit == 0 {
            return Err(EngineError::InvalidSettings(
                "size limit must be positive".into(),
            ));
        }
        if self.retries > MAX_RETRIES {
            return Err(EngineError::InvalidSettings(format!(
                "retries must be between 0 and {MAX_RETRIES}, got {}",
                self.retries
            )));
        }
        if !self.upload_url_template.contains(SERVER_PLACEHOLDER) {
            return Err(EngineError::InvalidSettings(format!(
                "upload url template {:?} lacks {SERVER_PLACEHOLDER}",
                self.upload_url_template
            )));
        }
        url::Url::parse(&self.landing_url)
            .map_err(|err| EngineError::InvalidSettings(format!("landing url: {err}")))?;
        Ok(())
    }

    pub(crate) fn upload_url(&self, server: &str) -> String {
        self.upload_url_template.replace(SERVER_PLACEHOLDER, server)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitterSettings {
    pub ffprobe: PathBuf,
    pub ffmpeg: PathBuf,
}

impl Default for SplitterSettings {
    fn default() -> Self {
        Self {
            ffprobe: PathBuf::from("ffprobe"),
            ffmpeg: PathBuf::from("ffmpeg"),
        }
    }
}
