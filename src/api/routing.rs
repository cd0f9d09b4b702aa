use url::Url;

use crate::error::RequestError;

pub const DEFAULT_BASE_URL: &str = "sqlite://local";

fn has_scheme(url: &str) -> bool {
    let Some((scheme, _)) = url.split_once(':') else {
        return false;
    };
    let mut chars = scheme.chars();
    matches!(chars.next(), Some(first) if first.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

/// Absolute request URLs win over the base; relative ones are appended to
/// it with exactly one separating slash.
pub fn combine_url(base_url: &str, request_url: &str) -> String {
    let base = if base_url.is_empty() {
        DEFAULT_BASE_URL
    } else {
        base_url
    };

    if request_url.is_empty() {
        return base.to_string();
    }

    if has_scheme(request_url) {
        return request_url.to_string();
    }

    match (base.ends_with('/'), request_url.starts_with('/')) {
        (true, true) => format!("{base}{}", &request_url[1..]),
        (false, false) => format!("{base}/{request_url}"),
        _ => format!("{base}{request_url}"),
    }
}

/// Path component of `full_url` without trailing slashes; `/` when empty.
pub fn request_path(full_url: &str) -> Result<String, RequestError> {
    let parsed = Url::parse(full_url).map_err(|err| RequestError::InvalidUrl {
        url: full_url.to_string(),
        reason: err.to_string(),
    })?;

    let trimmed = parsed.path().trim_end_matches('/');
    if trimmed.is_empty() {
        Ok("/".to_string())
    } else {
        Ok(trimmed.to_string())
    }
}
