// src/config.rs
use crate::error::AppError;
use crate::report::ReportPeriod;
use crate::types::{ApiKey, DatabaseId};
use clap::Parser;
use std::path::PathBuf;

/// Parsed and validated command-line input.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct CommandLineInput {
    /// Maximum number of tasks to fetch (0 = fetch all)
    #[arg(long, default_value_t = 0)]
    pub limit: usize,

    /// Directory holding the cache store, attachments, analysis, and reports
    #[arg(short = 'd', long, default_value = "data")]
    pub data_dir: String,

    /// Enable verbose logging (debug level)
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,

    /// Skip the sync and work from the existing cache store
    #[arg(long, default_value_t = false)]
    pub skip_fetch: bool,

    /// Compose a status report for this period after syncing
    #[arg(long, value_enum)]
    pub report: Option<ReportPeriod>,

    /// Custom report window start, yyyy-mm-dd (overrides the period start)
    #[arg(long)]
    pub report_start: Option<String>,

    /// Custom report window end, yyyy-mm-dd (defaults to today)
    #[arg(long)]
    pub report_end: Option<String>,

    /// Include task body content in the report
    #[arg(long, default_value_t = false)]
    pub include_body: bool,

    /// Truncate report body content to this many lines (0 = no limit)
    #[arg(long, default_value_t = 3)]
    pub body_max_lines: usize,

    /// Inline readable attachment excerpts into the report
    #[arg(long, default_value_t = false)]
    pub include_attachments: bool,

    /// Show the "Uncategorized / Other Tasks" report section
    #[arg(long, default_value_t = false)]
    pub include_uncategorized: bool,

    /// Only report tasks carrying one of these tags (repeatable)
    #[arg(long = "filter-tag")]
    pub filter_tags: Vec<String>,

    /// Treat last-modified stamps within this many seconds as unchanged
    /// instead of requiring exact equality (opt-in)
    #[arg(long)]
    pub updated_tolerance_secs: Option<u64>,
}

/// Remote property (column) names, overridable per deployment.
///
/// Users rename columns in their databases; every name here can be
/// overridden through a `NOTION_PROPERTY_*` environment variable so the
/// mirror follows the rename without a rebuild.
#[derive(Debug, Clone)]
pub struct PropertyNames {
    pub title: String,
    pub nid: String,
    pub status: String,
    pub started: String,
    pub completed: String,
    pub due: String,
    pub priority: String,
    pub files_media: String,
    pub parent_item: String,
    pub sub_item: String,
    pub tags: String,
    pub parent_tags: String,
}

impl Default for PropertyNames {
    fn default() -> Self {
        Self {
            title: "Name".to_string(),
            nid: "NID".to_string(),
            status: "Status".to_string(),
            started: "Started".to_string(),
            completed: "Completed".to_string(),
            due: "Due".to_string(),
            priority: "Priority".to_string(),
            files_media: "Files & media".to_string(),
            parent_item: "Parent item".to_string(),
            sub_item: "Sub-item".to_string(),
            tags: "Tags".to_string(),
            parent_tags: "Parent Tags".to_string(),
        }
    }
}

impl PropertyNames {
    /// Reads overrides from the environment, keeping defaults for names
    /// that are not set.
    fn from_env() -> Self {
        let defaults = Self::default();
        let var = |name: &str, default: String| std::env::var(name).unwrap_or(default);
        Self {
            title: var("NOTION_PROPERTY_NAME", defaults.title),
            nid: var("NOTION_PROPERTY_NID", defaults.nid),
            status: var("NOTION_PROPERTY_STATUS", defaults.status),
            started: var("NOTION_PROPERTY_STARTED", defaults.started),
            completed: var("NOTION_PROPERTY_COMPLETED", defaults.completed),
            due: var("NOTION_PROPERTY_DUE", defaults.due),
            priority: var("NOTION_PROPERTY_PRIORITY", defaults.priority),
            files_media: var("NOTION_PROPERTY_FILES_MEDIA", defaults.files_media),
            parent_item: var("NOTION_PROPERTY_PARENT_ITEM", defaults.parent_item),
            sub_item: var("NOTION_PROPERTY_SUB_ITEM", defaults.sub_item),
            tags: var("NOTION_PROPERTY_TAGS", defaults.tags),
            parent_tags: var("NOTION_PROPERTY_PARENT_TAGS", defaults.parent_tags),
        }
    }
}

/// Resolved configuration — validated and ready to drive a run.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    pub api_key: ApiKey,
    pub database_id: DatabaseId,
    pub data_dir: PathBuf,
    /// None fetches everything.
    pub limit: Option<usize>,
    pub properties: PropertyNames,
    pub updated_tolerance_secs: Option<u64>,
    pub skip_fetch: bool,
    pub verbose: bool,
    pub report: Option<ReportPeriod>,
    pub report_start: Option<String>,
    pub report_end: Option<String>,
    pub include_body: bool,
    pub body_max_lines: usize,
    pub include_attachments: bool,
    pub include_uncategorized: bool,
    pub filter_tags: Vec<String>,
}

impl SyncConfig {
    /// Resolves a complete configuration from CLI input and environment.
    pub fn resolve(cli: CommandLineInput) -> Result<Self, AppError> {
        let api_key_str = std::env::var("NOTION_API_TOKEN").map_err(|_| {
            AppError::MissingConfiguration(
                "NOTION_API_TOKEN environment variable not set".to_string(),
            )
        })?;
        let api_key = ApiKey::new(api_key_str)?;

        let database_str = std::env::var("NOTION_DATABASE_ID").map_err(|_| {
            AppError::MissingConfiguration(
                "NOTION_DATABASE_ID environment variable not set".to_string(),
            )
        })?;
        let database_id = DatabaseId::parse(&database_str)?;

        Ok(Self {
            api_key,
            database_id,
            data_dir: PathBuf::from(cli.data_dir),
            limit: (cli.limit > 0).then_some(cli.limit),
            properties: PropertyNames::from_env(),
            updated_tolerance_secs: cli.updated_tolerance_secs,
            skip_fetch: cli.skip_fetch,
            verbose: cli.verbose,
            report: cli.report,
            report_start: cli.report_start,
            report_end: cli.report_end,
            include_body: cli.include_body,
            body_max_lines: cli.body_max_lines,
            include_attachments: cli.include_attachments,
            include_uncategorized: cli.include_uncategorized,
            filter_tags: cli.filter_tags,
        })
    }

    /// The cache store file.
    pub fn cache_path(&self) -> PathBuf {
        self.data_dir.join("pages.csv")
    }

    /// The JSON mirror of the cache store.
    pub fn json_mirror_path(&self) -> PathBuf {
        self.data_dir.join("pages.json")
    }

    /// Root of the per-record attachment directories.
    pub fn attachment_dir(&self) -> PathBuf {
        self.data_dir.join("attachments")
    }

    /// The plain-text analysis digest.
    pub fn analysis_path(&self) -> PathBuf {
        self.data_dir.join("analysis").join("analysis_output.txt")
    }

    /// Directory for composed period reports.
    pub fn reports_dir(&self) -> PathBuf {
        self.data_dir.join("reports")
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            api_key: ApiKey::new("secret_default_key_for_testing_only")
                .expect("default API key should be valid"),
            database_id: DatabaseId::parse("12345678123456781234567812345678")
                .expect("example database id should be valid"),
            data_dir: PathBuf::from("data"),
            limit: None,
            properties: PropertyNames::default(),
            updated_tolerance_secs: None,
            skip_fetch: false,
            verbose: false,
            report: None,
            report_start: None,
            report_end: None,
            include_body: false,
            body_max_lines: 3,
            include_attachments: false,
            include_uncategorized: false,
            filter_tags: Vec::new(),
        }
    }
}
