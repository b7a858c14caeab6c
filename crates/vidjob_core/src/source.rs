use url::Url;

/// Where the job identifier lives for a given hosting domain family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum IdLocation {
    QueryParam(&'static str),
    FirstPathSegment,
}

const RECOGNIZED_HOSTS: &[(&str, IdLocation)] = &[
    ("youtube.com", IdLocation::QueryParam("v")),
    ("youtu.be", IdLocation::FirstPathSegment),
];

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SourceError {
    #[error("not a well-formed url: {0}")]
    Malformed(String),
    #[error("unsupported host {0:?}")]
    UnsupportedHost(String),
    #[error("url carries no video identifier")]
    MissingIdentifier,
}

/// A validated input video URL and the identifier embedded in it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceRef {
    pub url: String,
    pub video_id: String,
}

impl SourceRef {
    pub fn parse(raw: &str) -> Result<Self, SourceError> {
        let trimmed = raw.trim();
        let parsed = Url::parse(trimmed).map_err(|err| SourceError::Malformed(err.to_string()))?;
        let host = parsed
            .host_str()
            .ok_or_else(|| SourceError::Malformed("url has no host".to_string()))?
            .to_ascii_lowercase();

        let location = RECOGNIZED_HOSTS
            .iter()
            .find(|(domain, _)| host_matches(&host, domain))
            .map(|(_, location)| *location)
            .ok_or_else(|| SourceError::UnsupportedHost(host.clone()))?;

        let video_id = match location {
            IdLocation::QueryParam(name) => parsed
                .query_pairs()
                .find(|(key, _)| key == name)
                .map(|(_, value)| value.into_owned()),
            IdLocation::FirstPathSegment => parsed
                .path_segments()
                .and_then(|mut segments| segments.next())
                .map(ToOwned::to_owned),
        }
        .filter(|id| !id.is_empty())
        .ok_or(SourceError::MissingIdentifier)?;

        Ok(Self {
            url: trimmed.to_string(),
            video_id,
        })
    }
}

/// Returns the embedded video identifier, or `None` for anything unrecognized.
pub fn extract_video_id(raw: &str) -> Option<String> {
    SourceRef::parse(raw).ok().map(|source| source.video_id)
}

fn host_matches(host: &str, domain: &str) -> bool {
    host == domain
        || host
            .strip_suffix(domain)
            .is_some_and(|prefix| prefix.ends_with('.'))
}
