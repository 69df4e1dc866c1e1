/// Source name constants to keep labels consistent across logs, metrics and storage
pub const FANDOM_SOURCE: &str = "fandom";
pub const GOODREADS_SOURCE: &str = "goodreads";
pub const UNKNOWN_SOURCE: &str = "unknown";

// Host substrings used by the classifier
pub const FANDOM_HOST: &str = "fandom.com";
pub const GOODREADS_HOST: &str = "goodreads.com";

/// Sources reject default HTTP clients, so every fetch identifies as a desktop browser.
pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/114.0.0.0 Safari/537.36";

pub const ACCEPT_HTML: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";

/// Title used when the outermost caller opts into a fallback for untitled pages
pub const UNTITLED_SENTINEL: &str = "Untitled";

pub const DEFAULT_EXTRACTION_TIMEOUT_SECS: u64 = 30;

/// Dependency installs (pip/npm) get their own, longer bound
pub const DEFAULT_SETUP_TIMEOUT_SECS: u64 = 600;

/// Program run when Goodreads is switched to out-of-process extraction
pub const DEFAULT_GOODREADS_COMMAND: &str = "goodreads-extract";

/// Stems in subprocess stderr that mark a run as failed. Matched anywhere in a word,
/// so `TypeError`, `errors` and `failed` all count.
pub const STDERR_FAILURE_VOCABULARY: &[&str] = &[
    "error",
    "exception",
    "traceback",
    "fail",
    "fatal",
    "panic",
];

/// Upper bound on create/refetch attempts for one name during reconciliation
pub const RECONCILE_MAX_ATTEMPTS: usize = 3;

/// Get all supported source names
pub fn get_supported_sources() -> Vec<&'static str> {
    vec![FANDOM_SOURCE, GOODREADS_SOURCE]
}
