//! Application configuration structures.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::models::Level;

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// HTTP client behavior
    #[serde(default)]
    pub http: HttpConfig,

    /// Push gateway endpoint
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Channel listing feeds (offset-walk)
    #[serde(default)]
    pub channels: Option<ChannelsConfig>,

    /// Forum thread feed (page-index walk)
    #[serde(default)]
    pub threads: Option<ThreadsConfig>,

    /// Push provider credentials
    #[serde(default)]
    pub providers: ProvidersConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse configuration from TOML text.
    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Load configuration or return default if loading fails.
    ///
    /// The default configuration does not validate, so a run started with it
    /// stops with a configuration error before touching any feed.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Validate that every parameter a run depends on is present and sane.
    pub fn validate(&self) -> Result<()> {
        if self.http.user_agent.trim().is_empty() {
            return Err(AppError::config("http.user_agent is empty"));
        }
        if self.http.timeout_secs == 0 {
            return Err(AppError::config("http.timeout_secs must be > 0"));
        }
        match self.gateway.url.as_deref().map(str::trim) {
            None | Some("") => return Err(AppError::config("gateway.url is required")),
            Some(raw) => {
                url::Url::parse(raw)
                    .map_err(|e| AppError::config(format!("gateway.url is invalid: {e}")))?;
            }
        }
        if self.channels.is_none() && self.threads.is_none() {
            return Err(AppError::config(
                "No feeds configured: add a [channels] or [threads] section",
            ));
        }
        if let Some(channels) = &self.channels {
            channels.validate()?;
        }
        if let Some(threads) = &self.threads {
            threads.validate()?;
        }
        if !self.providers.any() {
            return Err(AppError::config(
                "No push provider configured: add [providers.telegram], [providers.apns] or [providers.bark]",
            ));
        }
        self.providers.validate()
    }

    /// Gateway URL. Only meaningful after [`Config::validate`] succeeded.
    pub fn gateway_url(&self) -> &str {
        self.gateway.url.as_deref().unwrap_or_default().trim()
    }
}

/// HTTP client settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// Pause between two page requests of the same feed, in milliseconds
    #[serde(default)]
    pub request_delay_ms: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
            request_delay_ms: 0,
        }
    }
}

/// Push gateway settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Endpoint accepting `{"messages": [...]}`
    #[serde(default)]
    pub url: Option<String>,
}

/// Keyword rules shared by both feed types.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KeywordRules {
    /// Items whose rendered body contains one of these are never delivered
    #[serde(default)]
    pub block_keywords: Vec<String>,

    /// Items whose body contains one of these are delivered at critical level
    #[serde(default)]
    pub active_keywords: Vec<String>,
}

/// Channel listing feeds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelsConfig {
    /// Channel usernames to poll
    #[serde(default)]
    pub ids: Vec<String>,

    /// Listing base URL; pages live at `{base_url}/{channel}`
    #[serde(default = "defaults::channel_base_url")]
    pub base_url: String,

    /// Records per listing page
    #[serde(default = "defaults::page_size")]
    pub page_size: usize,

    /// Maximum items delivered per channel per run
    #[serde(default = "defaults::max_items")]
    pub max_items: usize,

    /// Notification group
    #[serde(default = "defaults::channel_group")]
    pub group: String,

    /// Icon override; the channel avatar is used otherwise
    #[serde(default)]
    pub icon: Option<String>,

    /// Default interruption level
    #[serde(default)]
    pub level: Level,

    #[serde(flatten)]
    pub keywords: KeywordRules,
}

impl ChannelsConfig {
    fn validate(&self) -> Result<()> {
        if self.ids.is_empty() || self.ids.iter().any(|id| id.trim().is_empty()) {
            return Err(AppError::config(
                "channels.ids must list at least one non-empty channel",
            ));
        }
        let mut seen = HashSet::new();
        if let Some(dup) = self.ids.iter().map(|id| id.trim()).find(|id| !seen.insert(*id)) {
            return Err(AppError::config(format!(
                "channels.ids lists '{dup}' more than once"
            )));
        }
        if self.page_size == 0 {
            return Err(AppError::config("channels.page_size must be > 0"));
        }
        if self.max_items == 0 {
            return Err(AppError::config("channels.max_items must be > 0"));
        }
        url::Url::parse(&self.base_url)
            .map_err(|e| AppError::config(format!("channels.base_url is invalid: {e}")))?;
        Ok(())
    }
}

impl Default for ChannelsConfig {
    fn default() -> Self {
        Self {
            ids: Vec::new(),
            base_url: defaults::channel_base_url(),
            page_size: defaults::page_size(),
            max_items: defaults::max_items(),
            group: defaults::channel_group(),
            icon: None,
            level: Level::default(),
            keywords: KeywordRules::default(),
        }
    }
}

/// Forum thread feed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThreadsConfig {
    /// Thread listing API endpoint
    #[serde(default)]
    pub api_url: String,

    /// Forum section ids, sent as repeated `fid` parameters
    #[serde(default)]
    pub forum_ids: Vec<String>,

    /// Value of the `uid` request header
    #[serde(default)]
    pub uid: String,

    /// Value of the `cid` request header
    #[serde(default)]
    pub cid: String,

    /// First page to fetch
    #[serde(default = "defaults::first_page")]
    pub from: u32,

    /// Last page to fetch (inclusive, may be lower than `from`)
    #[serde(default = "defaults::first_page")]
    pub to: u32,

    /// Keep at most this many threads of each page group
    #[serde(default)]
    pub max_per_page: Option<usize>,

    /// Deliver threads even when already marked as delivered
    #[serde(default)]
    pub force: bool,

    /// Prefix of the per-thread delivery flag keys
    #[serde(default = "defaults::thread_cache_prefix")]
    pub cache_prefix: String,

    /// Notification group
    #[serde(default = "defaults::thread_group")]
    pub group: String,

    /// Default interruption level
    #[serde(default)]
    pub level: Level,

    #[serde(flatten)]
    pub keywords: KeywordRules,
}

impl ThreadsConfig {
    fn validate(&self) -> Result<()> {
        if self.api_url.trim().is_empty() {
            return Err(AppError::config("threads.api_url is required"));
        }
        url::Url::parse(&self.api_url)
            .map_err(|e| AppError::config(format!("threads.api_url is invalid: {e}")))?;
        if self.forum_ids.is_empty() {
            return Err(AppError::config(
                "threads.forum_ids must list at least one section",
            ));
        }
        if self.from == 0 || self.to == 0 {
            return Err(AppError::config("threads.from and threads.to start at 1"));
        }
        if self.max_per_page == Some(0) {
            return Err(AppError::config("threads.max_per_page must be > 0"));
        }
        if self.cache_prefix.trim().is_empty() {
            return Err(AppError::config("threads.cache_prefix is empty"));
        }
        Ok(())
    }

    /// Feed identifier used in reports and logs.
    pub fn feed_id(&self) -> String {
        format!("{}:{}", self.cache_prefix, self.forum_ids.join(","))
    }
}

impl Default for ThreadsConfig {
    fn default() -> Self {
        Self {
            api_url: String::new(),
            forum_ids: Vec::new(),
            uid: String::new(),
            cid: String::new(),
            from: defaults::first_page(),
            to: defaults::first_page(),
            max_per_page: None,
            force: false,
            cache_prefix: defaults::thread_cache_prefix(),
            group: defaults::thread_group(),
            level: Level::default(),
            keywords: KeywordRules::default(),
        }
    }
}

/// Push provider credentials. A missing provider is skipped for every item.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProvidersConfig {
    #[serde(default)]
    pub telegram: Option<TelegramProvider>,

    #[serde(default)]
    pub apns: Option<ApnsProvider>,

    #[serde(default)]
    pub bark: Option<BarkProvider>,
}

impl ProvidersConfig {
    /// Whether at least one provider is configured.
    pub fn any(&self) -> bool {
        self.telegram.is_some() || self.apns.is_some() || self.bark.is_some()
    }

    fn validate(&self) -> Result<()> {
        if let Some(telegram) = &self.telegram {
            if telegram.bot_id.trim().is_empty() || telegram.chat_id.trim().is_empty() {
                return Err(AppError::config(
                    "providers.telegram needs bot_id and chat_id",
                ));
            }
        }
        if let Some(apns) = &self.apns {
            if apns.device_token.trim().is_empty() {
                return Err(AppError::config("providers.apns.device_token is empty"));
            }
        }
        if let Some(bark) = &self.bark {
            if bark.device_key.trim().is_empty() {
                return Err(AppError::config("providers.bark.device_key is empty"));
            }
        }
        Ok(())
    }
}

/// Telegram bot relayed through the gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramProvider {
    pub bot_id: String,
    pub chat_id: String,

    /// Redirect service turning app deep links into https links
    #[serde(default)]
    pub redirect_url: Option<String>,
}

/// Apple push notification target.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApnsProvider {
    pub device_token: String,

    /// Overrides the feed group
    #[serde(default)]
    pub group: Option<String>,
}

/// Bark push target.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BarkProvider {
    pub device_key: String,

    #[serde(default = "defaults::bark_endpoint")]
    pub endpoint: String,
}

mod defaults {
    // HTTP defaults
    pub fn user_agent() -> String {
        "Mozilla/5.0 (compatible; feedcast/0.1)".into()
    }
    pub fn timeout() -> u64 {
        30
    }

    // Channel defaults
    pub fn channel_base_url() -> String {
        "https://t.me/s".into()
    }
    pub fn page_size() -> usize {
        20
    }
    pub fn max_items() -> usize {
        10
    }
    pub fn channel_group() -> String {
        "Telegram".into()
    }

    // Thread defaults
    pub fn first_page() -> u32 {
        1
    }
    pub fn thread_cache_prefix() -> String {
        "forum-threads".into()
    }
    pub fn thread_group() -> String {
        "forum-threads".into()
    }

    // Provider defaults
    pub fn bark_endpoint() -> String {
        "https://api.day.app/push".into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
        [gateway]
        url = "https://push.example.com/api/notifications/push/v3"

        [channels]
        ids = ["rustlang", "tokio_rs"]
        block_keywords = ["spam"]
        active_keywords = ["urgent"]

        [threads]
        api_url = "https://forum.example.com/api/threads"
        forum_ids = ["7", "-7955747"]
        from = 3
        to = 1

        [providers.bark]
        device_key = "abc"
    "#;

    fn sample() -> Config {
        Config::from_toml(SAMPLE).unwrap()
    }

    #[test]
    fn test_parse_sample_applies_defaults() {
        let config = sample();
        let channels = config.channels.as_ref().unwrap();
        assert_eq!(channels.page_size, 20);
        assert_eq!(channels.max_items, 10);
        assert_eq!(channels.base_url, "https://t.me/s");
        assert_eq!(channels.level, Level::Passive);
        assert_eq!(channels.keywords.block_keywords, vec!["spam"]);

        let threads = config.threads.as_ref().unwrap();
        assert_eq!((threads.from, threads.to), (3, 1));
        assert_eq!(threads.cache_prefix, "forum-threads");
        assert!(!threads.force);

        let bark = config.providers.bark.as_ref().unwrap();
        assert_eq!(bark.endpoint, "https://api.day.app/push");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_default_config() {
        assert!(matches!(
            Config::default().validate(),
            Err(AppError::Config(_))
        ));
    }

    #[test]
    fn test_validate_rejects_missing_gateway() {
        let mut config = sample();
        config.gateway.url = None;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_max_items() {
        let mut config = sample();
        config.channels.as_mut().unwrap().max_items = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_missing_providers() {
        let mut config = sample();
        config.providers = ProvidersConfig::default();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_empty_channel_list() {
        let mut config = sample();
        config.channels.as_mut().unwrap().ids.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_repeated_channel() {
        let mut config = sample();
        config.channels.as_mut().unwrap().ids = vec!["news".into(), " news".into()];
        match config.validate() {
            Err(AppError::Config(message)) => assert!(message.contains("'news'")),
            other => panic!("expected configuration error, got {other:?}"),
        }
    }

    #[test]
    fn test_thread_feed_id_lists_sections() {
        let config = sample();
        assert_eq!(
            config.threads.unwrap().feed_id(),
            "forum-threads:7,-7955747"
        );
    }
}
