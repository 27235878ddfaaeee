//! MusicBrainz recording identifier extraction
//!
//! Reads the recording MBID from an audio file's embedded tags using the
//! `lofty` crate (ID3v2, Vorbis comments, APE, MP4, ...).
//!
//! Historically the Vorbis field is called `MUSICBRAINZ_TRACKID`, but it
//! holds a recording id.

use lofty::file::TaggedFileExt;
use lofty::probe::Probe;
use lofty::tag::{ItemKey, Tag};
use std::path::Path;
use tracing::debug;
use uuid::Uuid;

/// Source of recording identifiers for audio files
///
/// Must be free of side effects so it can be called from several workers
/// at once.
pub trait IdentifierSource: Send + Sync {
    /// Recording identifier of `path`, or `None` if absent or invalid
    fn recording_id(&self, path: &Path) -> Option<Uuid>;
}

/// Reads the recording identifier from embedded tags
#[derive(Debug, Default, Clone, Copy)]
pub struct TagIdentifierSource;

impl TagIdentifierSource {
    pub fn new() -> Self {
        Self
    }

    fn read_tags(&self, path: &Path) -> Option<Uuid> {
        let tagged_file = match Probe::open(path).and_then(|probe| probe.read()) {
            Ok(file) => file,
            Err(e) => {
                debug!(file = %path.display(), error = %e, "Failed to read audio file tags");
                return None;
            }
        };

        // Primary tag first, then any other tag the container carries
        let primary_type = tagged_file.primary_tag_type();
        let tags = tagged_file.primary_tag().into_iter().chain(
            tagged_file
                .tags()
                .iter()
                .filter(move |tag| tag.tag_type() != primary_type),
        );

        let id = find_recording_id(tags);
        if id.is_none() {
            debug!(file = %path.display(), "No usable recording id tag found");
        }
        id
    }
}

impl IdentifierSource for TagIdentifierSource {
    fn recording_id(&self, path: &Path) -> Option<Uuid> {
        self.read_tags(path)
    }
}

/// Recording id from the first tag in `tags` carrying one of the id keys
///
/// Tags are searched in order; only the first tag with a value is parsed.
pub fn find_recording_id<'a, I>(tags: I) -> Option<Uuid>
where
    I: IntoIterator<Item = &'a Tag>,
{
    tags.into_iter()
        .find_map(recording_id_values)
        .and_then(|values| parse_recording_id(values.iter().map(String::as_str)))
}

/// All values of the first recording id key present in `tag`
fn recording_id_values(tag: &Tag) -> Option<Vec<String>> {
    let keys = [
        ItemKey::MusicBrainzRecordingId,
        ItemKey::Unknown("MUSICBRAINZ_TRACKID".to_string()),
        ItemKey::Unknown("MusicBrainz Recording Id".to_string()),
    ];

    keys.iter().find_map(|key| {
        let values: Vec<String> = tag.get_strings(key).map(str::to_string).collect();
        if values.is_empty() {
            None
        } else {
            Some(values)
        }
    })
}

/// Validate the first tag value as a UUID
///
/// When a file carries more than one recording id there is no way to tell
/// which is correct, so the first wins. An invalid first value means no id;
/// later values are not consulted.
pub fn parse_recording_id<'a, I>(values: I) -> Option<Uuid>
where
    I: IntoIterator<Item = &'a str>,
{
    let first = values.into_iter().next()?.trim();
    if first.is_empty() {
        return None;
    }

    match Uuid::parse_str(first) {
        Ok(id) => Some(id),
        Err(_) => {
            debug!(value = %first, "Recording id tag is not a valid UUID");
            None
        }
    }
}
