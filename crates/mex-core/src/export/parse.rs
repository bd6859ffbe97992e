//! Minimal export schema: only the sections and fields the job source reads.

use serde::Deserialize;

/// Root of the personal-data export.
#[derive(Debug, Deserialize)]
pub struct Export {
    #[serde(rename = "Video")]
    pub video: Option<VideoSection>,
    #[serde(rename = "Activity")]
    pub activity: Option<ActivitySection>,
}

#[derive(Debug, Deserialize)]
pub struct VideoSection {
    #[serde(rename = "Videos")]
    pub videos: Option<VideoList>,
}

#[derive(Debug, Deserialize)]
pub struct VideoList {
    #[serde(rename = "VideoList", default)]
    pub entries: Vec<MediaEntry>,
}

#[derive(Debug, Deserialize)]
pub struct ActivitySection {
    #[serde(rename = "Favorite Videos")]
    pub favorites: Option<FavoriteList>,
    #[serde(rename = "Video Browsing History")]
    pub browsing: Option<BrowsingList>,
}

#[derive(Debug, Deserialize)]
pub struct FavoriteList {
    #[serde(rename = "FavoriteVideoList", default)]
    pub entries: Vec<MediaEntry>,
}

#[derive(Debug, Deserialize)]
pub struct BrowsingList {
    #[serde(rename = "VideoList", default)]
    pub entries: Vec<MediaEntry>,
}

/// One media reference. `Link` may hold several newline-separated URLs.
#[derive(Debug, Deserialize)]
pub struct MediaEntry {
    #[serde(rename = "Link", default)]
    pub link: Option<String>,
    #[serde(rename = "Date", default)]
    pub date: Option<String>,
}
