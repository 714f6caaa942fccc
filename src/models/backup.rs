// SPDX-License-Identifier: MIT

//! Shadow records for slope and comment images.
//!
//! Backups mirror the image references embedded in primary records so
//! that accidental loss of the embedded data can be repaired by the
//! reconciler (`services::backup`). They are written fire-and-continue:
//! a backup failure never blocks the primary write.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A stored image reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageRef {
    pub url: String,
    pub created_at: String,
}

/// The four fixed image positions on a slope record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageSlot {
    Position,
    Start,
    Overview,
    End,
}

impl ImageSlot {
    pub const ALL: [ImageSlot; 4] = [
        ImageSlot::Position,
        ImageSlot::Start,
        ImageSlot::Overview,
        ImageSlot::End,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ImageSlot::Position => "position",
            ImageSlot::Start => "start",
            ImageSlot::Overview => "overview",
            ImageSlot::End => "end",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "position" => Some(ImageSlot::Position),
            "start" => Some(ImageSlot::Start),
            "overview" => Some(ImageSlot::Overview),
            "end" => Some(ImageSlot::End),
            _ => None,
        }
    }
}

impl fmt::Display for ImageSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The slot-indexed image set shared by slopes and their backups.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SlopeImageSet {
    pub position: Option<ImageRef>,
    pub start: Option<ImageRef>,
    pub overview: Option<ImageRef>,
    pub end: Option<ImageRef>,
}

impl SlopeImageSet {
    pub fn get(&self, slot: ImageSlot) -> Option<&ImageRef> {
        match slot {
            ImageSlot::Position => self.position.as_ref(),
            ImageSlot::Start => self.start.as_ref(),
            ImageSlot::Overview => self.overview.as_ref(),
            ImageSlot::End => self.end.as_ref(),
        }
    }

    pub fn set(&mut self, slot: ImageSlot, image: Option<ImageRef>) {
        match slot {
            ImageSlot::Position => self.position = image,
            ImageSlot::Start => self.start = image,
            ImageSlot::Overview => self.overview = image,
            ImageSlot::End => self.end = image,
        }
    }

    pub fn count(&self) -> usize {
        ImageSlot::ALL
            .iter()
            .filter(|slot| self.get(**slot).is_some())
            .count()
    }
}

/// Shadow copy of a slope's image slots, keyed by history number.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlopeImageBackup {
    pub history_number: String,
    pub images: SlopeImageSet,
    pub last_backup_at: String,
    pub created_at: String,
}

impl SlopeImageBackup {
    pub fn new(history_number: &str) -> Self {
        let now = chrono::Utc::now().to_rfc3339();
        Self {
            history_number: history_number.to_string(),
            images: SlopeImageSet::default(),
            last_backup_at: now.clone(),
            created_at: now,
        }
    }
}

/// Shadow copy of a comment's image URL list.
///
/// Comments have no fixed slots; deletion replaces the whole tracked
/// list with the post-deletion list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentImageBackup {
    pub history_number: String,
    pub comment_id: String,
    pub image_urls: Vec<String>,
    pub last_backup_at: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slot_roundtrip() {
        for slot in ImageSlot::ALL {
            assert_eq!(ImageSlot::parse(slot.as_str()), Some(slot));
        }
        assert_eq!(ImageSlot::parse("sideways"), None);
    }

    #[test]
    fn test_image_set_get_set() {
        let mut set = SlopeImageSet::default();
        assert_eq!(set.count(), 0);

        let image = ImageRef {
            url: "https://storage.example/slopes/1/overview.jpg".to_string(),
            created_at: chrono::Utc::now().to_rfc3339(),
        };
        set.set(ImageSlot::Overview, Some(image.clone()));
        assert_eq!(set.get(ImageSlot::Overview), Some(&image));
        assert_eq!(set.count(), 1);

        set.set(ImageSlot::Overview, None);
        assert_eq!(set.count(), 0);
    }
}
