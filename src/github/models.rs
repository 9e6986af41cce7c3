// file: src/github/models.rs
// description: typed GitHub API response models and their tool-facing projections
// reference: https://docs.github.com/en/rest

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use serde::{Deserialize, Serialize};

/// Body summaries are cut at this many characters, with an ellipsis marker.
pub const BODY_SUMMARY_LIMIT: usize = 200;

pub const DECODE_ERROR_MARKER: &str = "Error: Could not decode content.";
pub const DOWNLOAD_ERROR_MARKER: &str = "Error: Could not download content.";
pub const ENCODING_DECODE_ERROR: &str = "error_decoding_base64";
pub const ENCODING_DOWNLOAD_ERROR: &str = "error_downloading";

// Raw API shapes. The API is consumed leniently: every field is optional
// and unknown fields are ignored, so schema drift degrades to nulls
// instead of deserialization failures.

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PullRequest {
    #[serde(default)]
    pub number: Option<u64>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub html_url: Option<String>,
    #[serde(default)]
    pub merged_at: Option<String>,
    #[serde(default)]
    pub merged_by: Option<Actor>,
    #[serde(default)]
    pub user: Option<Actor>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub head: Option<CommitRef>,
    #[serde(default)]
    pub base: Option<BranchRef>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Actor {
    #[serde(default)]
    pub login: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CommitRef {
    #[serde(default)]
    pub sha: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BranchRef {
    #[serde(default, rename = "ref")]
    pub branch: Option<String>,
}

/// One item from the contents endpoint. Doubles as directory-listing entry
/// and file metadata; `content`/`encoding` are only populated for files.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContentItem {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(default)]
    pub sha: Option<String>,
    #[serde(default)]
    pub html_url: Option<String>,
    #[serde(default)]
    pub download_url: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub encoding: Option<String>,
}

/// The contents endpoint returns an array for directories but a bare
/// object when the path addresses a single file.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ContentsResponse {
    Listing(Vec<ContentItem>),
    Single(Box<ContentItem>),
}

impl ContentsResponse {
    /// A single-file response is wrapped as a one-element listing so the
    /// tool payload is always an array on success.
    pub fn into_items(self) -> Vec<ContentItem> {
        match self {
            ContentsResponse::Listing(items) => items,
            ContentsResponse::Single(item) => vec![*item],
        }
    }
}

// Tool-facing projections.

#[derive(Debug, Clone, Serialize)]
pub struct MergedPrSummary {
    pub number: Option<u64>,
    pub title: Option<String>,
    pub url: Option<String>,
    pub merged_at: Option<String>,
    pub merged_by: Option<String>,
    pub author: Option<String>,
    pub body_summary: String,
    pub head_commit_sha: Option<String>,
    pub base_branch: Option<String>,
}

impl MergedPrSummary {
    pub fn from_pull_request(pr: PullRequest) -> Self {
        Self {
            number: pr.number,
            title: pr.title,
            url: pr.html_url,
            merged_at: pr.merged_at,
            merged_by: pr.merged_by.and_then(|a| a.login),
            author: pr.user.and_then(|a| a.login),
            body_summary: summarize_body(pr.body.as_deref()),
            head_commit_sha: pr.head.and_then(|h| h.sha),
            base_branch: pr.base.and_then(|b| b.branch),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DirectoryEntry {
    pub name: Option<String>,
    pub path: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub size: Option<u64>,
    pub sha: Option<String>,
    pub html_url: Option<String>,
    pub download_url: Option<String>,
}

impl DirectoryEntry {
    pub fn from_item(item: ContentItem) -> Self {
        Self {
            name: item.name,
            path: item.path,
            kind: item.kind,
            size: item.size,
            sha: item.sha,
            html_url: item.html_url,
            download_url: item.download_url,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FileContentRecord {
    pub name: Option<String>,
    pub path: Option<String>,
    pub sha: Option<String>,
    pub size: Option<u64>,
    pub encoding: Option<String>,
    pub content: String,
    pub html_url: Option<String>,
    pub download_url: Option<String>,
}

impl FileContentRecord {
    fn new(item: &ContentItem, content: String, encoding: Option<String>) -> Self {
        Self {
            name: item.name.clone(),
            path: item.path.clone(),
            sha: item.sha.clone(),
            size: item.size,
            encoding,
            content,
            html_url: item.html_url.clone(),
            download_url: item.download_url.clone(),
        }
    }
}

/// Outcome of applying the inline decode policy to file metadata. The
/// download step needs the network, so it is left to the client.
#[derive(Debug)]
pub enum ContentResolution {
    Resolved(FileContentRecord),
    NeedsDownload { item: ContentItem, url: String },
}

/// Decode policy, applied in order: inline base64 payload first, then the
/// raw-content URL, then empty content with whatever encoding the
/// metadata declared. Decode failures degrade to marker strings rather
/// than failing the call.
pub fn resolve_file_content(item: ContentItem) -> ContentResolution {
    let has_inline = item.content.as_deref().is_some_and(|c| !c.is_empty())
        && item.encoding.as_deref() == Some("base64");

    if has_inline {
        let payload = item.content.as_deref().unwrap_or_default();
        let record = match decode_base64_text(payload) {
            Some(text) => FileContentRecord::new(&item, text, Some("base64".to_string())),
            None => FileContentRecord::new(
                &item,
                DECODE_ERROR_MARKER.to_string(),
                Some(ENCODING_DECODE_ERROR.to_string()),
            ),
        };
        return ContentResolution::Resolved(record);
    }

    if let Some(url) = item.download_url.clone()
        && !url.is_empty()
    {
        return ContentResolution::NeedsDownload { item, url };
    }

    let encoding = item.encoding.clone();
    ContentResolution::Resolved(FileContentRecord::new(&item, String::new(), encoding))
}

impl FileContentRecord {
    /// Build the record from a completed raw-content download, or from its
    /// failure (marker content, `error_downloading` encoding).
    pub fn from_download(item: &ContentItem, outcome: Option<(String, String)>) -> Self {
        match outcome {
            Some((text, charset)) => FileContentRecord::new(item, text, Some(charset)),
            None => FileContentRecord::new(
                item,
                DOWNLOAD_ERROR_MARKER.to_string(),
                Some(ENCODING_DOWNLOAD_ERROR.to_string()),
            ),
        }
    }
}

/// Decode an inline base64 payload to UTF-8 text. The contents endpoint
/// wraps base64 at 60 columns, so whitespace is stripped first.
pub fn decode_base64_text(payload: &str) -> Option<String> {
    let compact: String = payload.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    let bytes = BASE64_STANDARD.decode(compact.as_bytes()).ok()?;
    String::from_utf8(bytes).ok()
}

/// First merged pull request in the order the API returned them.
pub fn first_merged(pulls: Vec<PullRequest>) -> Option<MergedPrSummary> {
    pulls
        .into_iter()
        .find(|pr| pr.merged_at.is_some())
        .map(MergedPrSummary::from_pull_request)
}

pub fn summarize_body(body: Option<&str>) -> String {
    match body {
        Some(text) if text.chars().count() > BODY_SUMMARY_LIMIT => {
            let truncated: String = text.chars().take(BODY_SUMMARY_LIMIT).collect();
            format!("{}...", truncated)
        }
        Some(text) => text.to_string(),
        None => String::new(),
    }
}
