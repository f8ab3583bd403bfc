// src/constants.rs
//! Domain constants that define the operational boundaries of the system.
//!
//! Each constant is named for the domain concept it constrains, not its
//! technical role. Reading these constants should tell you the story
//! of how the system operates: how much it fetches per round-trip, how
//! patiently it retries, how it names what it stores.

// ---------------------------------------------------------------------------
// Notion API boundaries
// ---------------------------------------------------------------------------

/// How many objects the Notion API returns per page of results.
///
/// The Notion API maximum is 100. We use the maximum to minimize
/// round-trips during listing and block-tree fetching.
pub const NOTION_API_PAGE_SIZE: usize = 100;

/// Maximum attempts for a single outbound request, counting the first try.
///
/// Covers both throttling (429) retries and transient transport failures.
/// Exceeding the cap surfaces the last error to the caller.
pub const MAX_REQUEST_ATTEMPTS: u32 = 5;

/// Seconds to wait after a throttling response when the server does not
/// suggest a duration via `Retry-After`.
pub const DEFAULT_RETRY_AFTER_SECS: u64 = 1;

/// Base of the exponential backoff applied to transient transport failures:
/// attempt `n` sleeps `BACKOFF_BASE_SECS^n` seconds.
pub const BACKOFF_BASE_SECS: u64 = 2;

// ---------------------------------------------------------------------------
// Local storage boundaries
// ---------------------------------------------------------------------------

/// Longest filename written into an attachment directory.
///
/// Most filesystems cap path components at 255 bytes; declared names from
/// the remote side can be arbitrarily long.
pub const FILENAME_MAX_LENGTH: usize = 255;

// ---------------------------------------------------------------------------
// Report boundaries
// ---------------------------------------------------------------------------

/// When the To-Do section would exceed this many tasks, the report keeps
/// only tasks that are due soon or high priority.
pub const REPORT_TODO_OVERFLOW_LIMIT: usize = 15;

/// "Due soon" window for the overflow filter, in days.
pub const DUE_SOON_WINDOW_DAYS: i64 = 14;

/// Characters of a readable attachment inlined into a report before
/// truncation.
pub const ATTACHMENT_EXCERPT_LENGTH: usize = 1000;

/// Estimated characters per record section, used to pre-allocate report
/// strings. A performance hint, not a constraint.
pub const CHARS_PER_RECORD_ESTIMATE: usize = 256;
