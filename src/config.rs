//! Run configuration, resolved once at startup from the environment

use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// One crawl target: a top-level catalog section of the site.
#[derive(Debug, Clone, Copy)]
pub struct Target {
    /// Short section name, used in output paths.
    pub name: &'static str,
    /// Path of the section root, relative to the site origin.
    pub path: &'static str,
}

/// The three catalog sections, processed in this order.
pub const TARGETS: &[Target] = &[
    Target { name: "tobacco", path: "/tobacco" },
    Target { name: "hnb", path: "/hnb" },
    Target { name: "e", path: "/e" },
];

pub const BASE_URL: &str = "https://www.yanyue.cn";

const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
     AppleWebKit/537.36 (KHTML, like Gecko) \
     Chrome/119.0.0.0 Safari/537.36";

/// All tunables for a run. Every field has a default; the environment can
/// override each one. Resolved once in `main` and threaded into components.
#[derive(Debug, Clone)]
pub struct Config {
    /// Browser user-agent string (`YANYUE_USER_AGENT`).
    pub user_agent: String,
    /// Mandatory pause after every navigation/pagination action
    /// (`YANYUE_CRAWL_DELAY_MS`).
    pub crawl_delay: Duration,
    /// Cap on listing pages traversed per brand (`YANYUE_MAX_LIST_PAGES`).
    pub max_list_pages: u32,
    /// Cap on detail pages processed per brand (`YANYUE_MAX_DETAILS`,
    /// unlimited when unset).
    pub max_details: Option<usize>,
    /// Cap on brands processed per section (`YANYUE_MAX_BRANDS`,
    /// unlimited when unset).
    pub max_brands: Option<usize>,
    /// Root directory for the per-section output trees (`YANYUE_OUTPUT_ROOT`).
    pub output_root: PathBuf,
    /// Run the browser headless (`YANYUE_HEADLESS`).
    pub headless: bool,
    /// Navigation timeout.
    pub nav_timeout: Duration,
    /// Additional attempts after a failed navigation.
    pub max_retries: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            crawl_delay: Duration::from_millis(3000),
            max_list_pages: 100,
            max_details: None,
            max_brands: None,
            output_root: PathBuf::from("."),
            headless: true,
            nav_timeout: Duration::from_secs(60),
            max_retries: 2,
        }
    }
}

impl Config {
    /// Resolve the configuration from the environment. Unset or unparsable
    /// variables fall back to the defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            user_agent: env::var("YANYUE_USER_AGENT").unwrap_or(defaults.user_agent),
            crawl_delay: parse_var("YANYUE_CRAWL_DELAY_MS")
                .map_or(defaults.crawl_delay, Duration::from_millis),
            max_list_pages: parse_var("YANYUE_MAX_LIST_PAGES").unwrap_or(defaults.max_list_pages),
            max_details: parse_var("YANYUE_MAX_DETAILS"),
            max_brands: parse_var("YANYUE_MAX_BRANDS"),
            output_root: env::var("YANYUE_OUTPUT_ROOT")
                .map_or(defaults.output_root, PathBuf::from),
            headless: parse_var("YANYUE_HEADLESS").unwrap_or(defaults.headless),
            nav_timeout: defaults.nav_timeout,
            max_retries: defaults.max_retries,
        }
    }
}

fn parse_var<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.parse().ok())
}
