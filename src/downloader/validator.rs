// Request validation - runs before any network or process work

use url::Url;

use super::errors::ValidationError;
use super::models::{
    DownloadRequest, DownloadRequestBody, Platform, AUDIO_ONLY, DEFAULT_AUDIO_TYPE,
    DEFAULT_QUALITY,
};

/// Audio containers yt-dlp can extract to
pub const SUPPORTED_AUDIO_TYPES: &[&str] = &[
    "mp3", "m4a", "aac", "opus", "vorbis", "flac", "wav", "alac", "best",
];

/// Normalize and check a raw request.
///
/// Checks, in order: platform is recognized, URL is an absolute http(s)
/// URL, URL host belongs to the platform. Audio-only YouTube requests must
/// also name an extractable audio type; video requests never use it.
pub fn validate(body: DownloadRequestBody) -> Result<DownloadRequest, ValidationError> {
    let raw_platform = non_empty(body.platform).ok_or(ValidationError::MissingField("Platform"))?;
    let platform = Platform::parse(&raw_platform)
        .ok_or(ValidationError::UnsupportedPlatform(raw_platform))?;

    let url = non_empty(body.url).ok_or(ValidationError::MissingField("URL"))?;
    let parsed = parse_absolute_url(&url)?;
    check_platform_host(platform, &parsed, &url)?;

    let quality = non_empty(body.quality).unwrap_or_else(|| DEFAULT_QUALITY.to_string());
    let audio_type = non_empty(body.audio_type)
        .map(|a| a.to_lowercase())
        .unwrap_or_else(|| DEFAULT_AUDIO_TYPE.to_string());

    if platform == Platform::Youtube
        && quality == AUDIO_ONLY
        && !SUPPORTED_AUDIO_TYPES.contains(&audio_type.as_str())
    {
        return Err(ValidationError::UnsupportedAudioType(audio_type));
    }

    Ok(DownloadRequest {
        url,
        platform,
        quality,
        audio_type,
    })
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_absolute_url(url: &str) -> Result<Url, ValidationError> {
    let parsed = Url::parse(url).map_err(|e| ValidationError::InvalidUrl {
        url: url.to_string(),
        reason: e.to_string(),
    })?;

    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ValidationError::InvalidUrl {
            url: url.to_string(),
            reason: format!("unsupported scheme '{}'", parsed.scheme()),
        });
    }

    if parsed.host_str().map_or(true, str::is_empty) {
        return Err(ValidationError::InvalidUrl {
            url: url.to_string(),
            reason: "missing host".to_string(),
        });
    }

    Ok(parsed)
}

fn check_platform_host(platform: Platform, parsed: &Url, url: &str) -> Result<(), ValidationError> {
    let host = parsed.host_str().unwrap_or_default().to_lowercase();

    if platform.domains().iter().any(|domain| host.contains(domain)) {
        Ok(())
    } else {
        Err(ValidationError::PlatformMismatch {
            platform: platform.label().to_string(),
            url: url.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rstest::rstest;

    fn body(url: &str, platform: &str) -> DownloadRequestBody {
        DownloadRequestBody {
            url: Some(url.to_string()),
            platform: Some(platform.to_string()),
            quality: None,
            audio_type: None,
        }
    }

    #[rstest]
    #[case("https://youtube.com/watch?v=abc", "youtube")]
    #[case("https://www.youtube.com/watch?v=abc", "youtube")]
    #[case("https://m.youtube.com/shorts/abc", "youtube")]
    #[case("https://youtu.be/abc", "youtube")]
    #[case("https://www.instagram.com/reel/xyz/", "instagram")]
    fn test_accepts_matching_hosts(#[case] url: &str, #[case] platform: &str) {
        let request = validate(body(url, platform)).unwrap();
        assert_eq!(request.url, url);
        assert_eq!(request.platform.as_str(), platform);
    }

    #[rstest]
    #[case("https://vimeo.com/123", "youtube")]
    #[case("https://instagram.com/p/1", "youtube")]
    #[case("https://youtube.com/watch?v=abc", "instagram")]
    #[case("https://example.com/?next=youtube.com", "youtube")]
    fn test_rejects_mismatched_hosts(#[case] url: &str, #[case] platform: &str) {
        let err = validate(body(url, platform)).unwrap_err();
        assert!(matches!(err, ValidationError::PlatformMismatch { .. }));
    }

    #[test]
    fn test_platform_checked_before_url() {
        let err = validate(body("not a url", "tiktok")).unwrap_err();
        assert_eq!(err, ValidationError::UnsupportedPlatform("tiktok".to_string()));
    }

    #[rstest]
    #[case("not a url")]
    #[case("/watch?v=abc")]
    #[case("ftp://youtube.com/file")]
    fn test_rejects_malformed_urls(#[case] url: &str) {
        let err = validate(body(url, "youtube")).unwrap_err();
        assert!(matches!(err, ValidationError::InvalidUrl { .. }));
    }

    #[test]
    fn test_missing_fields() {
        let err = validate(DownloadRequestBody::default()).unwrap_err();
        assert_eq!(err, ValidationError::MissingField("Platform"));

        let err = validate(DownloadRequestBody {
            platform: Some("youtube".to_string()),
            ..Default::default()
        })
        .unwrap_err();
        assert_eq!(err, ValidationError::MissingField("URL"));
    }

    #[test]
    fn test_applies_defaults() {
        let request = validate(body("https://youtu.be/abc", "youtube")).unwrap();
        assert_eq!(request.quality, "720p");
        assert_eq!(request.audio_type, "mp3");
    }

    #[test]
    fn test_rejects_unknown_audio_type_for_audio_only() {
        let mut youtube = body("https://youtu.be/abc", "youtube");
        youtube.quality = Some("audio_only".to_string());
        youtube.audio_type = Some("midi".to_string());
        assert_eq!(
            validate(youtube).unwrap_err(),
            ValidationError::UnsupportedAudioType("midi".to_string())
        );

        let mut instagram = body("https://instagram.com/p/1", "instagram");
        instagram.audio_type = Some("midi".to_string());
        assert!(validate(instagram).is_ok());
    }

    #[rstest]
    #[case("720p")]
    #[case("1080p")]
    #[case("best")]
    fn test_video_quality_ignores_audio_type(#[case] quality: &str) {
        let mut youtube = body("https://youtu.be/abc", "youtube");
        youtube.quality = Some(quality.to_string());
        youtube.audio_type = Some("ogg".to_string());

        let request = validate(youtube).unwrap();
        assert_eq!(request.quality, quality);
        assert_eq!(request.audio_type, "ogg");
    }

    #[rstest]
    #[case("YouTube")]
    #[case("INSTAGRAM")]
    fn test_platform_is_case_sensitive(#[case] platform: &str) {
        let err = validate(body("https://youtu.be/abc", platform)).unwrap_err();
        assert_eq!(err, ValidationError::UnsupportedPlatform(platform.to_string()));
    }

    proptest! {
        #[test]
        fn prop_youtube_requires_youtube_host(host in "[a-z]{3,12}\\.(com|net|org)") {
            prop_assume!(!host.contains("youtube.com") && !host.contains("youtu.be"));
            let url = format!("https://{}/watch?v=abc", host);
            prop_assert!(validate(body(&url, "youtube")).is_err());
        }

        #[test]
        fn prop_instagram_requires_instagram_host(host in "[a-z]{3,12}\\.(com|net|org)") {
            prop_assume!(!host.contains("instagram.com"));
            let url = format!("https://{}/p/abc", host);
            prop_assert!(validate(body(&url, "instagram")).is_err());
        }
    }
}
