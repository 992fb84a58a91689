use std::path::{Path, PathBuf};

use lofty::config::WriteOptions;
use lofty::picture::{MimeType, Picture, PictureType};
use lofty::prelude::*;
use lofty::tag::{ItemKey, ItemValue, Tag, TagItem};
use tracing::debug;

use crate::engine::metadata::{parse_flag, MetadataStore, NumberPair, TagError, TagKey, TagValue};

/// Tag store over the primary tag of any container lofty understands.
/// Changes stay in memory until [`MetadataStore::save`].
pub struct LoftyStore {
    path: PathBuf,
    tag: Tag,
}

impl LoftyStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, TagError> {
        let path = path.as_ref();
        std::fs::metadata(path)?;

        let tagged_file =
            lofty::read_from_path(path).map_err(|e| TagError::Read(e.to_string()))?;
        let tag = match tagged_file.primary_tag() {
            Some(tag) => tag.clone(),
            None => Tag::new(tagged_file.primary_tag_type()),
        };

        debug!(path = %path.display(), tag_type = ?tag.tag_type(), "Opened tags");
        Ok(Self {
            path: path.to_path_buf(),
            tag,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn get_key(&self, key: &TagKey) -> Option<TagValue> {
        let text = match key {
            TagKey::Title => self.tag.title().map(|s| s.into_owned()),
            TagKey::Artist => self.tag.artist().map(|s| s.into_owned()),
            TagKey::Album => self.tag.album().map(|s| s.into_owned()),
            TagKey::Comment => self.tag.comment().map(|s| s.into_owned()),
            TagKey::Genre => self.tag.genre().map(|s| s.into_owned()),
            TagKey::Year => self.tag.year().map(|y| y.to_string()),
            TagKey::TrackNumber => self.tag.track().map(|number| {
                NumberPair {
                    number,
                    total: self.tag.track_total(),
                }
                .to_string()
            }),
            TagKey::DiskNumber => self.tag.disk().map(|number| {
                NumberPair {
                    number,
                    total: self.tag.disk_total(),
                }
                .to_string()
            }),
            TagKey::CoverArt => {
                let pictures = self.tag.pictures();
                return pictures
                    .iter()
                    .find(|p| p.pic_type() == PictureType::CoverFront)
                    .or_else(|| pictures.first())
                    .map(|p| TagValue::Binary(p.data().to_vec()));
            }
            TagKey::FreeForm(name) => {
                return self
                    .tag
                    .get(&ItemKey::Unknown(name.clone()))
                    .map(|item| item_to_value(item.value()));
            }
            other => {
                let item_key = text_item_key(other)?;
                self.tag.get_string(&item_key).map(str::to_owned)
            }
        };
        text.map(TagValue::Text)
    }

    fn set_key(&mut self, key: &TagKey, value: TagValue) -> Result<(), TagError> {
        if let TagKey::CoverArt = key {
            let data = match value {
                TagValue::Binary(bytes) => bytes,
                TagValue::Text(text) => text.into_bytes(),
            };
            let picture =
                Picture::new_unchecked(PictureType::CoverFront, sniff_mime(&data), None, data);
            self.tag.remove_picture_type(PictureType::CoverFront);
            self.tag.push_picture(picture);
            return Ok(());
        }

        if let TagKey::FreeForm(name) = key {
            let item_value = match value {
                TagValue::Text(text) => ItemValue::Text(text),
                TagValue::Binary(bytes) => ItemValue::Binary(bytes),
            };
            self.tag
                .insert_unchecked(TagItem::new(ItemKey::Unknown(name.clone()), item_value));
            return Ok(());
        }

        let text = match value {
            TagValue::Text(text) => text,
            TagValue::Binary(bytes) => String::from_utf8(bytes).map_err(|e| {
                TagError::InvalidValue {
                    key: key.to_string(),
                    value: format!("{} non-UTF-8 bytes", e.as_bytes().len()),
                }
            })?,
        };
        let invalid = || TagError::InvalidValue {
            key: key.to_string(),
            value: text.clone(),
        };

        match key {
            TagKey::Title => self.tag.set_title(text.clone()),
            TagKey::Artist => self.tag.set_artist(text.clone()),
            TagKey::Album => self.tag.set_album(text.clone()),
            TagKey::Comment => self.tag.set_comment(text.clone()),
            TagKey::Genre => self.tag.set_genre(text.clone()),
            TagKey::Year => {
                let year: String = text.trim().chars().take(4).collect();
                self.tag.set_year(year.parse().map_err(|_| invalid())?);
            }
            TagKey::TrackNumber => {
                let pair: NumberPair = text.parse().map_err(|_| invalid())?;
                self.tag.set_track(pair.number);
                match pair.total {
                    Some(total) => self.tag.set_track_total(total),
                    None => self.tag.remove_track_total(),
                }
            }
            TagKey::DiskNumber => {
                let pair: NumberPair = text.parse().map_err(|_| invalid())?;
                self.tag.set_disk(pair.number);
                match pair.total {
                    Some(total) => self.tag.set_disk_total(total),
                    None => self.tag.remove_disk_total(),
                }
            }
            TagKey::Compilation => {
                let flag = if parse_flag(&text) { "1" } else { "0" };
                self.insert_text(key, flag.to_string())?;
            }
            TagKey::Tempo => {
                let bpm: u16 = text.trim().parse().map_err(|_| invalid())?;
                self.insert_text(key, bpm.to_string())?;
            }
            other => self.insert_text(other, text.clone())?,
        }
        Ok(())
    }

    fn insert_text(&mut self, key: &TagKey, text: String) -> Result<(), TagError> {
        let unsupported = || TagError::Unsupported {
            key: key.to_string(),
        };
        let item_key = text_item_key(key).ok_or_else(unsupported)?;
        if self.tag.insert_text(item_key, text) {
            Ok(())
        } else {
            Err(unsupported())
        }
    }
}

impl MetadataStore for LoftyStore {
    fn get(&self, key: &str) -> Option<TagValue> {
        self.get_key(&TagKey::parse(key))
    }

    fn set(&mut self, key: &str, value: TagValue) -> Result<(), TagError> {
        self.set_key(&TagKey::parse(key), value)
    }

    fn remove(&mut self, key: &str) {
        match TagKey::parse(key) {
            TagKey::Title => self.tag.remove_title(),
            TagKey::Artist => self.tag.remove_artist(),
            TagKey::Album => self.tag.remove_album(),
            TagKey::Comment => self.tag.remove_comment(),
            TagKey::Genre => self.tag.remove_genre(),
            TagKey::Year => self.tag.remove_year(),
            TagKey::TrackNumber => {
                self.tag.remove_track();
                self.tag.remove_track_total();
            }
            TagKey::DiskNumber => {
                self.tag.remove_disk();
                self.tag.remove_disk_total();
            }
            TagKey::CoverArt => self.tag.remove_picture_type(PictureType::CoverFront),
            TagKey::FreeForm(name) => self.tag.remove_key(&ItemKey::Unknown(name)),
            other => {
                if let Some(item_key) = text_item_key(&other) {
                    self.tag.remove_key(&item_key);
                }
            }
        }
    }

    fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = TagKey::WELL_KNOWN
            .iter()
            .filter(|key| self.get_key(key).is_some())
            .map(|key| key.atom().to_string())
            .collect();
        keys.extend(self.tag.items().filter_map(|item| match item.key() {
            ItemKey::Unknown(name) => Some(name.clone()),
            _ => None,
        }));
        keys
    }

    fn save(&mut self) -> Result<(), TagError> {
        self.tag
            .save_to_path(&self.path, WriteOptions::default())
            .map_err(|e| TagError::Write(e.to_string()))?;
        debug!(path = %self.path.display(), "Saved tags");
        Ok(())
    }
}

/// Item keys for fields stored as plain text items.
fn text_item_key(key: &TagKey) -> Option<ItemKey> {
    match key {
        TagKey::Title => Some(ItemKey::TrackTitle),
        TagKey::Artist => Some(ItemKey::TrackArtist),
        TagKey::Writer => Some(ItemKey::Composer),
        TagKey::Album => Some(ItemKey::AlbumTitle),
        TagKey::Tool => Some(ItemKey::EncoderSoftware),
        TagKey::Comment => Some(ItemKey::Comment),
        TagKey::Genre => Some(ItemKey::Genre),
        TagKey::Grouping => Some(ItemKey::ContentGroup),
        TagKey::Compilation => Some(ItemKey::FlagCompilation),
        TagKey::Tempo => Some(ItemKey::Bpm),
        _ => None,
    }
}

fn item_to_value(value: &ItemValue) -> TagValue {
    match value {
        ItemValue::Text(text) | ItemValue::Locator(text) => TagValue::Text(text.clone()),
        ItemValue::Binary(bytes) => TagValue::Binary(bytes.clone()),
    }
}

fn sniff_mime(data: &[u8]) -> Option<MimeType> {
    if data.starts_with(&[0x89, b'P', b'N', b'G']) {
        Some(MimeType::Png)
    } else if data.starts_with(&[0xFF, 0xD8]) {
        Some(MimeType::Jpeg)
    } else if data.starts_with(b"GIF8") {
        Some(MimeType::Gif)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mime_sniffing() {
        assert_eq!(sniff_mime(&[0x89, b'P', b'N', b'G', 0x0D]), Some(MimeType::Png));
        assert_eq!(sniff_mime(&[0xFF, 0xD8, 0xFF]), Some(MimeType::Jpeg));
        assert_eq!(sniff_mime(b"\x00\x01"), None);
    }

    #[test]
    fn open_missing_file_is_io() {
        assert!(matches!(
            LoftyStore::open("/no/such/file.m4a"),
            Err(TagError::Io(_))
        ));
    }
}
