//! Run configuration loaded from an optional `config.yaml`.
//!
//! Everything a crawl needs beyond the command line lives here: per-source
//! URLs, the opaque request headers each source expects, the lower-bound
//! year for the static enumeration, the page size, the retry cap, and the
//! per-source date-format candidate lists.
//!
//! Date formats are deliberately configuration rather than code: the
//! sources' textual date shapes drift over time, and an unparseable date
//! must stay a quiet `None`, never a failed record.

use serde::Deserialize;

use crate::errors::SetupError;

/// Top-level configuration for one harvester run.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HarvestConfig {
    /// How many additional attempts a failing position gets before it is
    /// abandoned.
    pub max_retries: u32,
    pub arxiv: ArxivConfig,
    pub lens: LensConfig,
}

/// Configuration for the arXiv advanced-search source.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ArxivConfig {
    pub base_url: String,
    /// Opaque session cookie expected by the search interface.
    pub cookie: String,
    pub user_agent: String,
    pub accept: String,
    /// First calendar year of the enumeration; the walk runs through the
    /// current year inclusive.
    pub start_year: i32,
    /// Results per listing page; also the offset stride for the
    /// link-less pagination fallback.
    pub page_size: usize,
    /// Strftime candidates for the listing's submitted/announced dates.
    pub date_formats: Vec<String>,
}

/// Configuration for the Lens works-API source.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LensConfig {
    /// Page the browser session navigates to before any API call; the
    /// session cookies are captured here.
    pub entry_url: String,
    /// The search API endpoint queried from within the page context.
    pub api_url: String,
    pub page_size: usize,
    pub date_formats: Vec<String>,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            arxiv: ArxivConfig::default(),
            lens: LensConfig::default(),
        }
    }
}

impl Default for ArxivConfig {
    fn default() -> Self {
        Self {
            base_url: "https://arxiv.org".to_string(),
            cookie: "arxiv-search-parameters={}".to_string(),
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                         (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36"
                .to_string(),
            accept: "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"
                .to_string(),
            start_year: 1991,
            page_size: 200,
            date_formats: vec![
                "%d %B, %Y".to_string(),
                "%d %B %Y".to_string(),
                "%B %Y".to_string(),
            ],
        }
    }
}

impl Default for LensConfig {
    fn default() -> Self {
        Self {
            entry_url: "https://www.lens.org/lens/search/scholar/list".to_string(),
            api_url: "https://www.lens.org/lens/api/search/scholar".to_string(),
            page_size: 50,
            date_formats: vec!["%Y-%m-%d".to_string(), "%d %b %Y".to_string()],
        }
    }
}

impl HarvestConfig {
    /// Load configuration from a YAML file, or fall back to the defaults
    /// when no path is given.
    pub fn load(path: Option<&str>) -> Result<Self, SetupError> {
        match path {
            None => Ok(Self::default()),
            Some(path) => {
                let raw = std::fs::read_to_string(path)
                    .map_err(|e| SetupError::Config(format!("{path}: {e}")))?;
                serde_yaml::from_str(&raw)
                    .map_err(|e| SetupError::Config(format!("{path}: {e}")))
            }
        }
    }
}
