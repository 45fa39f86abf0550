/// Per-file upload ceiling in megabytes.
pub const MAX_FILE_SIZE_MB: u64 = 10;

/// MIME types the external model accepts as document input.
pub const ACCEPTED_MIME_TYPES: &[&str] = &[
    "application/pdf",
    "image/png",
    "image/jpeg",
    "image/webp",
];

/// Default employer social-charge percentage applied when none is given.
pub const DEFAULT_EMPLOYER_PERCENT: f64 = 23.0;

/// Input limits enforced before anything is sent to the model.
#[derive(Debug, Clone, PartialEq)]
pub struct Limits {
    pub max_file_bytes: u64,
    pub accepted_mime_types: Vec<String>,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_file_bytes: MAX_FILE_SIZE_MB * 1024 * 1024,
            accepted_mime_types: ACCEPTED_MIME_TYPES.iter().map(|m| m.to_string()).collect(),
        }
    }
}

impl Limits {
    pub fn accepts_mime(&self, mime: &str) -> bool {
        self.accepted_mime_types
            .iter()
            .any(|m| m.eq_ignore_ascii_case(mime))
    }
}
