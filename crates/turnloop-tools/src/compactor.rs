//! Result Compactor (C5): spill large tool results to disk and hand back a
//! short envelope.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use turnloop_core::Timestamp;

use crate::value::StructuredValue;

/// Default number of leading lines kept inline by the head/tail path.
pub const DEFAULT_HEAD_LINES: usize = 10;
/// Default number of trailing lines kept inline by the head/tail path.
pub const DEFAULT_TAIL_LINES: usize = 5;
/// Default character threshold for the `force` compression hint.
pub const DEFAULT_FORCE_THRESHOLD: usize = 500;
/// Default character threshold for normal compression.
pub const DEFAULT_NORMAL_THRESHOLD: usize = 1500;
/// How many search-shaped items are summarized.
pub const SEARCH_TOP_N: usize = 5;
/// Character cap on a search snippet.
pub const SNIPPET_CHARS: usize = 200;

/// Metadata recorded alongside every compaction, independent of which path
/// produced it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompactionMetadata {
    /// Short content-addressed reference id.
    pub ref_id: String,
    /// Where the full payload was written.
    pub file_path: PathBuf,
    /// Length of the original serialized payload, in characters.
    pub original_length: usize,
    /// Which tool produced this result.
    pub tool_name: String,
    /// Which call produced this result.
    pub tool_id: String,
    /// When the compaction happened.
    pub compressed_at: Timestamp,
}

/// A compacted tool result: the inline text handed to the model plus the
/// metadata needed to recover the original.
#[derive(Debug, Clone)]
pub struct CompactedResult {
    /// Inline text: header, head/tail or summary, and a file reference.
    pub content: String,
    /// The recorded metadata.
    pub metadata: CompactionMetadata,
}

/// Writes large tool results to content-addressed files and returns short
/// envelopes in their place.
pub struct ResultCompactor {
    storage_dir: PathBuf,
    head_lines: usize,
    tail_lines: usize,
}

impl ResultCompactor {
    /// Build a compactor writing under `storage_dir` with default head/tail
    /// line counts.
    #[must_use]
    pub fn new(storage_dir: PathBuf) -> Self {
        Self {
            storage_dir,
            head_lines: DEFAULT_HEAD_LINES,
            tail_lines: DEFAULT_TAIL_LINES,
        }
    }

    /// Derive a content-addressed reference id from the inputs that make a
    /// result unique enough to not collide in practice.
    #[must_use]
    pub fn ref_id(tool_name: &str, tool_id: &str, len: usize, now: &Timestamp) -> String {
        let key = format!("{tool_name}|{tool_id}|{len}|{now}");
        let digest = md5::compute(key.as_bytes());
        format!("{digest:x}")[..12].to_string()
    }

    fn file_path(&self, ref_id: &str) -> PathBuf {
        self.storage_dir.join(format!("{ref_id}.json"))
    }

    /// Write `value`'s rendered text under a content-addressed path and
    /// return a head/tail envelope referencing it.
    ///
    /// # Errors
    /// Returns an I/O error if the storage directory cannot be created or
    /// written to.
    pub async fn compact_default(
        &self,
        value: &StructuredValue,
        tool_name: &str,
        tool_id: &str,
    ) -> std::io::Result<CompactedResult> {
        let rendered = value.render();
        let now = Timestamp::now();
        let ref_id = Self::ref_id(tool_name, tool_id, rendered.len(), &now);

        tokio::fs::create_dir_all(&self.storage_dir).await?;
        let file_path = self.file_path(&ref_id);
        tokio::fs::write(&file_path, &rendered).await?;

        let lines: Vec<&str> = rendered.lines().collect();
        let content = if lines.len() <= self.head_lines + self.tail_lines {
            format!("[COMPRESSED:{ref_id}]\n{rendered}")
        } else {
            let head = lines[..self.head_lines].join("\n");
            let tail = lines[lines.len() - self.tail_lines..].join("\n");
            format!(
                "[COMPRESSED:{ref_id}]\n{head}\n… see {path} for full output …\n{tail}",
                path = file_path.display()
            )
        };

        Ok(CompactedResult {
            content,
            metadata: CompactionMetadata {
                ref_id,
                file_path,
                original_length: rendered.len(),
                tool_name: tool_name.to_string(),
                tool_id: tool_id.to_string(),
                compressed_at: now,
            },
        })
    }

    /// Summarize a list-shaped result as up to [`SEARCH_TOP_N`] title/url/
    /// snippet entries, still spilling the full payload to disk.
    ///
    /// # Errors
    /// Returns an I/O error if the storage directory cannot be created or
    /// written to.
    pub async fn compact_search(
        &self,
        value: &StructuredValue,
        tool_name: &str,
        tool_id: &str,
    ) -> std::io::Result<CompactedResult> {
        let rendered = value.render();
        let now = Timestamp::now();
        let ref_id = Self::ref_id(tool_name, tool_id, rendered.len(), &now);

        tokio::fs::create_dir_all(&self.storage_dir).await?;
        let file_path = self.file_path(&ref_id);
        tokio::fs::write(&file_path, &rendered).await?;

        let mut summary = format!("[COMPRESSED:{ref_id}]\n");
        if let Some(items) = value.as_list() {
            for item in items.iter().take(SEARCH_TOP_N) {
                let title = item.get_str("title").unwrap_or("(untitled)");
                let url = item.get_str("url").unwrap_or("");
                let snippet = item.get_str("snippet").unwrap_or("");
                let snippet: String = snippet.chars().take(SNIPPET_CHARS).collect();
                summary.push_str(&format!("- {title} ({url}): {snippet}\n"));
            }
        }
        summary.push_str(&format!("… see {} for full output …", file_path.display()));

        Ok(CompactedResult {
            content: summary,
            metadata: CompactionMetadata {
                ref_id,
                file_path,
                original_length: rendered.len(),
                tool_name: tool_name.to_string(),
                tool_id: tool_id.to_string(),
                compressed_at: now,
            },
        })
    }

    /// Recover the original payload for `ref_id`. A missing file is not an
    /// error; it means "not recoverable" and callers must treat `None`
    /// accordingly.
    pub async fn recover(&self, ref_id: &str) -> Option<String> {
        let path = self.file_path(ref_id);
        tokio::fs::read_to_string(&path).await.ok()
    }

    /// The directory this compactor writes under.
    #[must_use]
    pub fn storage_dir(&self) -> &Path {
        &self.storage_dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn compaction_round_trips_exactly() {
        let dir = tempfile::tempdir().unwrap();
        let compactor = ResultCompactor::new(dir.path().to_path_buf());
        let body = "line\n".repeat(2000);
        let value = StructuredValue::String(body.clone());

        let compacted = compactor
            .compact_default(&value, "search_tool", "call-1")
            .await
            .unwrap();

        assert!(compacted.content.starts_with("[COMPRESSED:"));
        let recovered = compactor.recover(&compacted.metadata.ref_id).await.unwrap();
        assert_eq!(recovered, body);
    }

    #[tokio::test]
    async fn small_results_are_not_split() {
        let dir = tempfile::tempdir().unwrap();
        let compactor = ResultCompactor::new(dir.path().to_path_buf());
        let value = StructuredValue::String("one\ntwo\n".to_string());
        let compacted = compactor.compact_default(&value, "t", "1").await.unwrap();
        assert!(compacted.content.contains("one"));
        assert!(compacted.content.contains("two"));
    }

    #[tokio::test]
    async fn recover_missing_file_returns_none() {
        let dir = tempfile::tempdir().unwrap();
        let compactor = ResultCompactor::new(dir.path().to_path_buf());
        assert!(compactor.recover("does-not-exist").await.is_none());
    }

    #[tokio::test]
    async fn search_path_summarizes_top_entries() {
        let dir = tempfile::tempdir().unwrap();
        let compactor = ResultCompactor::new(dir.path().to_path_buf());
        let items = (0..8)
            .map(|i| {
                let mut map = std::collections::BTreeMap::new();
                map.insert("title".to_string(), StructuredValue::from(format!("item {i}")));
                map.insert("url".to_string(), StructuredValue::from("https://example.test"));
                map.insert("snippet".to_string(), StructuredValue::from("snippet text"));
                StructuredValue::Map(map)
            })
            .collect();
        let value = StructuredValue::List(items);
        let compacted = compactor.compact_search(&value, "search", "call-2").await.unwrap();
        let entry_count = compacted.content.matches("item ").count();
        assert_eq!(entry_count, SEARCH_TOP_N);
    }
}
