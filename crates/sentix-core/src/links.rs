use url::Url;

/// Video id from `youtu.be/<id>`, `/shorts/<id>` or `?v=<id>` links. Empty when none applies.
pub fn youtube_id(raw: &str) -> String {
    let Ok(url) = Url::parse(raw.trim()) else {
        return String::new();
    };
    if url.host_str().is_some_and(|h| h.contains("youtu.be")) {
        return url.path().trim_start_matches('/').to_string();
    }
    if let Some(rest) = url.path().strip_prefix("/shorts/") {
        return rest.split('/').next().unwrap_or_default().trim().to_string();
    }
    url.query_pairs()
        .find(|(k, _)| k == "v")
        .map(|(_, v)| v.into_owned())
        .unwrap_or_default()
}

/// Host of an absolute URL without a leading `www.`.
pub fn host_from_url(raw: &str) -> Option<String> {
    let url = Url::parse(raw.trim()).ok()?;
    let host = url.host_str()?;
    Some(host.strip_prefix("www.").unwrap_or(host).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_video_ids() {
        assert_eq!(youtube_id("https://youtu.be/abc123"), "abc123");
        assert_eq!(youtube_id("https://www.youtube.com/shorts/xyz9/"), "xyz9");
        assert_eq!(youtube_id("https://www.youtube.com/watch?v=q1w2&t=30s"), "q1w2");
        assert_eq!(youtube_id("https://www.youtube.com/channel/foo"), "");
        assert_eq!(youtube_id("not a link"), "");
    }

    #[test]
    fn hosts() {
        assert_eq!(host_from_url("https://www.bbc.com/news/1").as_deref(), Some("bbc.com"));
        assert_eq!(host_from_url("http://news.example.org").as_deref(), Some("news.example.org"));
        assert_eq!(host_from_url("/relative/path"), None);
    }
}
