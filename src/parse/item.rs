use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};
use tracing::warn;

use crate::item::{
    DownloadProgress, DownloadableItem, DownloadableItemBasic, Formats, ItemState, ParsedItem,
    Playlist,
};

/// One record printed by `--dump-json`, reduced to the fields we read.
///
/// Every field is decoded on its own; a field of an unexpected type reads as
/// absent instead of rejecting the record.
#[derive(Debug, Deserialize)]
struct InfoRecord {
    #[serde(default, deserialize_with = "text")]
    url: Option<String>,
    #[serde(default, deserialize_with = "text")]
    webpage_url: Option<String>,
    #[serde(default, deserialize_with = "text")]
    title: Option<String>,
    #[serde(default, deserialize_with = "number")]
    duration: Option<f64>,
    #[serde(default, deserialize_with = "text")]
    uploader: Option<String>,
    #[serde(default, deserialize_with = "text")]
    thumbnail: Option<String>,
    #[serde(default, deserialize_with = "format_list")]
    formats: Option<Vec<FormatRecord>>,
    #[serde(default)]
    playlist: Option<Value>,
    #[serde(default, deserialize_with = "lenient")]
    n_entries: Option<u64>,
    #[serde(default, deserialize_with = "text")]
    playlist_title: Option<String>,
    #[serde(default)]
    playlist_id: Option<Value>,
    #[serde(default, deserialize_with = "lenient")]
    playlist_index: Option<u64>,
    #[serde(default, deserialize_with = "lenient")]
    requested_subtitles: Option<Map<String, Value>>,
}

#[derive(Debug, Deserialize)]
struct FormatRecord {
    #[serde(default, deserialize_with = "text")]
    vcodec: Option<String>,
    #[serde(default, deserialize_with = "text")]
    acodec: Option<String>,
    #[serde(default, deserialize_with = "number")]
    height: Option<f64>,
    #[serde(default, deserialize_with = "number")]
    abr: Option<f64>,
    #[serde(default, deserialize_with = "number")]
    tbr: Option<f64>,
}

fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}

/// Strings as-is, numbers and booleans in their JSON spelling
fn text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => Some(s),
        value @ (Value::Number(_) | Value::Bool(_)) => Some(value.to_string()),
        _ => None,
    })
}

/// Numbers, or strings that spell one
fn number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    })
}

/// A non-list `formats` reads as absent; entries that are not objects are
/// skipped.
fn format_list<'de, D>(deserializer: D) -> Result<Option<Vec<FormatRecord>>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Array(entries) => Some(
            entries
                .into_iter()
                .filter_map(|entry| serde_json::from_value(entry).ok())
                .collect(),
        ),
        _ => None,
    })
}

/// Parse one metadata record. Records with a `formats` list become full
/// items, anything else a basic summary; undecodable input gives `None`.
pub fn parse_item(json: &str) -> Option<ParsedItem> {
    let record: InfoRecord = match serde_json::from_str(json) {
        Ok(record) => record,
        Err(e) => {
            warn!("Unable to parse item metadata: {}", e);
            return None;
        }
    };

    let Some(formats) = record.formats.as_deref() else {
        return Some(ParsedItem::Basic(DownloadableItemBasic {
            url: record.url.unwrap_or_default(),
            title: record.title.unwrap_or_default(),
            duration: record.duration.unwrap_or_default(),
            uploader: record.uploader,
        }));
    };

    let (video, audio) = quality_ladders(formats);

    let playlist = record
        .playlist
        .as_ref()
        .filter(|value| truthy(value))
        .map(|_| Playlist {
            entries: record.n_entries,
            title: record.playlist_title.clone(),
            id: record.playlist_id.as_ref().map(stringify).unwrap_or_default(),
            index: record.playlist_index,
        });

    let subtitles = record
        .requested_subtitles
        .map(|subs| subs.into_iter().map(|(lang, _)| lang).collect())
        .unwrap_or_default();

    let url = record
        .webpage_url
        .filter(|url| !url.is_empty())
        .or(record.url)
        .unwrap_or_default();

    Some(ParsedItem::Full(Box::new(DownloadableItem {
        info: DownloadableItemBasic {
            url,
            title: record.title.unwrap_or_default(),
            duration: record.duration.unwrap_or_default(),
            uploader: record.uploader,
        },
        filepath: None,
        thumbnail: record.thumbnail,
        is_chosen: false,
        state: ItemState::Stopped,
        is_subs_chosen: false,
        is_audio_chosen: false,
        formats: Formats::new(video, audio),
        subtitles,
        progress: DownloadProgress::default(),
        playlist,
    })))
}

/// Collect distinct video heights and audio bitrates, ascending.
///
/// A format that contributes a video level is never considered for an audio
/// level, even if it also carries audio. Combined formats therefore only
/// show up in the video ladder.
fn quality_ladders(formats: &[FormatRecord]) -> (Vec<u32>, Vec<f64>) {
    let mut video: Vec<u32> = Vec::new();
    let mut audio: Vec<f64> = Vec::new();

    for format in formats {
        let height = format.height.unwrap_or(0.0) as u32;
        let bitrate = format.abr.or(format.tbr).unwrap_or(0.0);

        if format.vcodec.as_deref() != Some("none") && !video.contains(&height) {
            video.push(height);
        } else if format.acodec.as_deref() != Some("none") && !audio.contains(&bitrate) {
            audio.push(bitrate);
        }
    }

    video.sort_unstable();
    audio.sort_by(f64::total_cmp);
    (video, audio)
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
