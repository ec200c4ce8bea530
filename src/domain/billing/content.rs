//! Catalog items as seen by billing and delivery.
//!
//! The catalog is owned elsewhere; this core only reads items and bumps
//! their download counter.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::domain::foundation::{ContentId, DownloadId, Timestamp, UserId, ValidationError};

/// Packaging of a pack's downloadable file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    #[default]
    Audio,
    Zip,
}

impl FileKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileKind::Audio => "audio",
            FileKind::Zip => "zip",
        }
    }

    pub fn media_type(&self) -> &'static str {
        match self {
            FileKind::Audio => "audio/mpeg",
            FileKind::Zip => "application/zip",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            FileKind::Audio => "mp3",
            FileKind::Zip => "zip",
        }
    }
}

impl FromStr for FileKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "audio" => Ok(FileKind::Audio),
            "zip" => Ok(FileKind::Zip),
            other => Err(ValidationError::invalid_format(
                "file_type",
                format!("unknown file type '{}'", other),
            )),
        }
    }
}

/// A sample pack in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentItem {
    pub id: ContentId,
    pub title: String,
    pub owner_id: UserId,
    pub is_free: bool,
    pub price_cents: i64,
    /// Opaque handle understood by the content storage adapter.
    pub storage_ref: String,
    pub file_kind: FileKind,
    pub download_count: i64,
}

impl ContentItem {
    /// Price to charge at checkout, or `None` if the item cannot be bought.
    pub fn checkout_price(&self) -> Option<i64> {
        if self.is_free || self.price_cents <= 0 {
            None
        } else {
            Some(self.price_cents)
        }
    }

    /// Suggested filename for the downloaded file.
    pub fn download_filename(&self) -> String {
        let stem: String = self
            .title
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == ' ' || c == '-' || c == '_' { c } else { '_' })
            .collect();
        let stem = stem.trim();
        let stem = if stem.is_empty() { self.id.as_str() } else { stem };
        format!("{}.{}", stem, self.file_kind.extension())
    }
}

/// Accounting record appended for every authorized download.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadEvent {
    pub id: DownloadId,
    pub user_id: UserId,
    pub content_id: ContentId,
    pub downloaded_at: Timestamp,
}

impl DownloadEvent {
    pub fn new(user_id: UserId, content_id: ContentId, downloaded_at: Timestamp) -> Self {
        Self {
            id: DownloadId::new(),
            user_id,
            content_id,
            downloaded_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(is_free: bool, price_cents: i64) -> ContentItem {
        ContentItem {
            id: ContentId::new("pack_1").unwrap(),
            title: "Dusty Drums".to_string(),
            owner_id: UserId::new("creator_1").unwrap(),
            is_free,
            price_cents,
            storage_ref: "packs/pack_1.mp3".to_string(),
            file_kind: FileKind::Audio,
            download_count: 0,
        }
    }

    #[test]
    fn priced_item_has_checkout_price() {
        assert_eq!(item(false, 499).checkout_price(), Some(499));
    }

    #[test]
    fn free_or_zero_priced_items_cannot_be_bought() {
        assert_eq!(item(true, 499).checkout_price(), None);
        assert_eq!(item(false, 0).checkout_price(), None);
    }

    #[test]
    fn download_filename_uses_title_and_kind() {
        let mut zip = item(false, 100);
        zip.file_kind = FileKind::Zip;
        zip.title = "Lo-Fi: Vol/2".to_string();

        assert_eq!(item(false, 100).download_filename(), "Dusty Drums.mp3");
        assert_eq!(zip.download_filename(), "Lo-Fi_ Vol_2.zip");
    }
}
