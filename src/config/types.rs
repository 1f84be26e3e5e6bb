use serde::Deserialize;

/// Main configuration structure for Magpie
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub discovery: DiscoveryConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub worker: WorkerConfig,
    #[serde(default)]
    pub render: RenderConfig,
    pub output: OutputConfig,
}

/// Discovery producer configuration
#[derive(Debug, Clone, Deserialize)]
pub struct DiscoveryConfig {
    /// Listing search URL to paginate over
    #[serde(rename = "listing-url")]
    pub listing_url: String,

    /// Listings per results page; also the "page fully loaded" threshold
    #[serde(rename = "page-size", default = "default_page_size")]
    pub page_size: usize,

    /// Maximum number of results pages to visit
    #[serde(rename = "max-pages", default = "default_max_pages")]
    pub max_pages: usize,

    /// Attempt budget for incremental content reveal on a results page
    #[serde(rename = "max-reveal-attempts", default = "default_max_reveal_attempts")]
    pub max_reveal_attempts: u32,

    /// Wait after loading a results page (milliseconds)
    #[serde(rename = "page-settle-ms", default = "default_page_settle_ms")]
    pub page_settle_ms: u64,

    /// Wait between reveal attempts (milliseconds)
    #[serde(rename = "reveal-wait-ms", default = "default_reveal_wait_ms")]
    pub reveal_wait_ms: u64,
}

/// Queue and worker-pool configuration
#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    /// Number of extraction workers (one render client each)
    #[serde(rename = "worker-count", default = "default_worker_count")]
    pub worker_count: usize,

    /// Work queue capacity; the producer blocks when it is full
    #[serde(rename = "queue-capacity", default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Dequeue timeout once a worker has seen work (milliseconds)
    #[serde(rename = "dequeue-timeout-ms", default = "default_dequeue_timeout_ms")]
    pub dequeue_timeout_ms: u64,

    /// How long a worker waits for its first item before idle-exiting (seconds)
    #[serde(rename = "first-item-wait-secs", default = "default_first_item_wait_secs")]
    pub first_item_wait_secs: u64,
}

/// Per-item extraction configuration
#[derive(Debug, Clone, Deserialize)]
pub struct WorkerConfig {
    /// Parse attempts per detail page before the item is dropped
    #[serde(rename = "parse-attempts", default = "default_parse_attempts")]
    pub parse_attempts: usize,

    /// Lower bound of the jittered politeness delay (milliseconds)
    #[serde(rename = "settle-min-ms", default = "default_settle_min_ms")]
    pub settle_min_ms: u64,

    /// Upper bound of the jittered politeness delay (milliseconds)
    #[serde(rename = "settle-max-ms", default = "default_settle_max_ms")]
    pub settle_max_ms: u64,

    /// Wait after a reload before re-parsing (milliseconds)
    #[serde(rename = "reload-wait-ms", default = "default_reload_wait_ms")]
    pub reload_wait_ms: u64,
}

/// Render client configuration
#[derive(Debug, Clone, Deserialize)]
pub struct RenderConfig {
    /// User agents to rotate through when provisioning clients
    #[serde(rename = "user-agents", default = "default_user_agents")]
    pub user_agents: Vec<String>,

    /// Per-request timeout (seconds)
    #[serde(rename = "request-timeout-secs", default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Sub-resource URL patterns a client may skip for throughput.
    /// Purely advisory; clients that cannot block resources ignore it.
    #[serde(rename = "blocked-resources", default = "default_blocked_resources")]
    pub blocked_resources: Vec<String>,
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,

    /// Path for CSV export
    #[serde(rename = "csv-path", default = "default_csv_path")]
    pub csv_path: String,

    /// Directory for raw-page dumps of permanently failed items
    #[serde(rename = "error-page-dir", default = "default_error_page_dir")]
    pub error_page_dir: String,
}

fn default_page_size() -> usize {
    25
}

fn default_max_pages() -> usize {
    8
}

fn default_max_reveal_attempts() -> u32 {
    10
}

fn default_page_settle_ms() -> u64 {
    2000
}

fn default_reveal_wait_ms() -> u64 {
    500
}

fn default_worker_count() -> usize {
    10
}

fn default_queue_capacity() -> usize {
    200
}

fn default_dequeue_timeout_ms() -> u64 {
    5000
}

fn default_first_item_wait_secs() -> u64 {
    120
}

fn default_parse_attempts() -> usize {
    3
}

fn default_settle_min_ms() -> u64 {
    1000
}

fn default_settle_max_ms() -> u64 {
    2000
}

fn default_reload_wait_ms() -> u64 {
    2000
}

fn default_csv_path() -> String {
    "./jobs.csv".to_string()
}

fn default_error_page_dir() -> String {
    "./error_pages".to_string()
}

fn default_user_agents() -> Vec<String> {
    vec![
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36".to_string(),
        "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/90.0.4430.212 Safari/537.36".to_string(),
        "Mozilla/5.0 (X11; Ubuntu; Linux x86_64; rv:89.0) Gecko/20100101 Firefox/89.0".to_string(),
    ]
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_blocked_resources() -> Vec<String> {
    [
        "*.jpg", "*.png", "*.svg", "*.gif", "*.webp", "*.css", "*.woff2", "*.ttf", "*.mp4",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            worker_count: default_worker_count(),
            queue_capacity: default_queue_capacity(),
            dequeue_timeout_ms: default_dequeue_timeout_ms(),
            first_item_wait_secs: default_first_item_wait_secs(),
        }
    }
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            parse_attempts: default_parse_attempts(),
            settle_min_ms: default_settle_min_ms(),
            settle_max_ms: default_settle_max_ms(),
            reload_wait_ms: default_reload_wait_ms(),
        }
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            user_agents: default_user_agents(),
            request_timeout_secs: default_request_timeout_secs(),
            blocked_resources: default_blocked_resources(),
        }
    }
}
