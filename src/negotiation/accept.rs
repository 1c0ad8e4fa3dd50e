//! `Accept` header parsing.

/// One media range from an `Accept` header.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaRange<'a> {
    pub essence: &'a str,
    pub quality: f32,
}

/// Parsed `Accept` header, in the order the client sent it.
#[derive(Debug, Clone, Default)]
pub struct AcceptHeader<'a> {
    ranges: Vec<MediaRange<'a>>,
}

impl<'a> AcceptHeader<'a> {
    /// Parse a raw header value. Malformed ranges are skipped and
    /// unparseable quality values count as 1.0.
    pub fn parse(raw: &'a str) -> Self {
        let ranges = raw
            .split(',')
            .filter_map(|part| {
                let mut params = part.split(';');
                let essence = params.next()?.trim();
                if essence.is_empty() || !essence.contains('/') {
                    return None;
                }
                let quality = params
                    .filter_map(|p| p.trim().strip_prefix("q="))
                    .next()
                    .and_then(|q| q.trim().parse::<f32>().ok())
                    .map(|q| q.clamp(0.0, 1.0))
                    .unwrap_or(1.0);
                Some(MediaRange { essence, quality })
            })
            .collect();
        Self { ranges }
    }

    /// Highest quality of an explicitly listed range accepted by `pred`.
    /// Wildcards (`*/*`, `text/*`) are not explicit and never count.
    pub fn explicit_quality(&self, pred: impl Fn(&str) -> bool) -> f32 {
        self.ranges
            .iter()
            .filter(|r| !r.essence.contains('*') && pred(r.essence))
            .map(|r| r.quality)
            .fold(0.0, f32::max)
    }

    /// Whether any explicitly listed range is accepted by `pred`, whatever its quality.
    pub fn lists(&self, pred: impl Fn(&str) -> bool) -> bool {
        self.ranges
            .iter()
            .any(|r| !r.essence.contains('*') && pred(r.essence))
    }

    pub fn ranges(&self) -> &[MediaRange<'a>] {
        &self.ranges
    }
}

/// `application/json` or any `+json` structured syntax suffix.
pub fn is_json(essence: &str) -> bool {
    let essence = essence.trim();
    essence.eq_ignore_ascii_case("application/json")
        || essence.to_ascii_lowercase().ends_with("+json")
}

pub fn is_plain_text(essence: &str) -> bool {
    essence.trim().eq_ignore_ascii_case("text/plain")
}
