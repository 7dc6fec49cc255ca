//! Hero media selection and video URL parsing.

use std::sync::LazyLock;

use regex::Regex;

use crate::domain::template_data::is_link;

static YOUTUBE: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(
        r"(?:youtube\.com/(?:watch\?(?:[^#]*&)?v=|embed/|shorts/)|youtu\.be/)([A-Za-z0-9_-]{11})",
    )
    .ok()
});

static VIMEO: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"vimeo\.com/(?:video/)?(\d+)").ok());

/// A recognized video source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Video {
    /// YouTube video id.
    YouTube(String),
    /// Vimeo numeric id.
    Vimeo(String),
    /// Any other URL, played with a `<video>` element.
    File(String),
}

impl Video {
    /// Classifies a video URL. `None` for empty or unsafe URLs.
    #[must_use]
    pub fn parse(url: &str) -> Option<Self> {
        let url = url.trim();
        if url.is_empty() || !is_link(url) {
            return None;
        }
        if let Some(id) = capture(&YOUTUBE, url) {
            return Some(Self::YouTube(id));
        }
        if let Some(id) = capture(&VIMEO, url) {
            return Some(Self::Vimeo(id));
        }
        Some(Self::File(url.to_string()))
    }

    /// Player URL for an `<iframe>`, or `None` for plain files.
    #[must_use]
    pub fn embed_url(&self) -> Option<String> {
        match self {
            Self::YouTube(id) => Some(format!("https://www.youtube.com/embed/{id}")),
            Self::Vimeo(id) => Some(format!("https://player.vimeo.com/video/{id}")),
            Self::File(_) => None,
        }
    }
}

fn capture(re: &LazyLock<Option<Regex>>, url: &str) -> Option<String> {
    let re = re.as_ref()?;
    re.captures(url)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// What the hero (or an offer block) shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Media {
    /// `embed`, `video`, `image` or `none`.
    pub kind: &'static str,
    /// Source URL for the chosen kind.
    pub url: String,
}

impl Media {
    /// Nothing to show.
    #[must_use]
    pub fn none() -> Self {
        Self {
            kind: "none",
            url: String::new(),
        }
    }

    /// Picks the media: video unless `prefer_image` is set and an image
    /// exists, then image.
    #[must_use]
    pub fn select(video_url: &str, image_url: &str, prefer_image: bool) -> Self {
        let image = image(image_url);
        if prefer_image && let Some(image) = image {
            return image;
        }
        match Video::parse(video_url) {
            Some(video) => match video.embed_url() {
                Some(url) => Self { kind: "embed", url },
                None => Self {
                    kind: "video",
                    url: video_url.trim().to_string(),
                },
            },
            None => image.unwrap_or_else(Self::none),
        }
    }
}

fn image(url: &str) -> Option<Media> {
    let url = url.trim();
    is_link(url).then(|| Media {
        kind: "image",
        url: url.to_string(),
    })
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn youtube_forms_become_embeds() {
        for url in [
            "https://www.youtube.com/watch?v=dQw4w9WgXcQ",
            "https://youtube.com/watch?feature=share&v=dQw4w9WgXcQ",
            "https://youtu.be/dQw4w9WgXcQ",
            "https://www.youtube.com/embed/dQw4w9WgXcQ",
            "https://youtube.com/shorts/dQw4w9WgXcQ",
        ] {
            assert_eq!(
                Video::parse(url),
                Some(Video::YouTube("dQw4w9WgXcQ".into())),
                "{url}"
            );
        }
    }

    #[test]
    fn vimeo_numeric_ids() {
        let Some(video) = Video::parse("https://vimeo.com/76979871") else {
            panic!("vimeo not recognized");
        };
        assert_eq!(
            video.embed_url().as_deref(),
            Some("https://player.vimeo.com/video/76979871")
        );
    }

    #[test]
    fn other_urls_play_as_files() {
        assert_eq!(
            Video::parse("https://cdn.example/v.mp4"),
            Some(Video::File("https://cdn.example/v.mp4".into()))
        );
        assert_eq!(Video::parse("javascript:alert(1)"), None);
        assert_eq!(Video::parse("  "), None);
    }

    #[test]
    fn video_wins_unless_image_preferred() {
        let video = "https://youtu.be/dQw4w9WgXcQ";
        let image = "https://cdn.example/hero.png";
        assert_eq!(Media::select(video, image, false).kind, "embed");
        assert_eq!(Media::select(video, image, true).kind, "image");
        assert_eq!(Media::select(video, "", true).kind, "embed");
        assert_eq!(Media::select("", image, false).kind, "image");
        assert_eq!(Media::select("", "", false), Media::none());
    }
}
