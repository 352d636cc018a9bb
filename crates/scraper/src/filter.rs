use storage::NewJob;
use url::Url;

use crate::serpapi::RawJob;

/// Job boards whose listings are kept.
pub const ALLOWED_DOMAINS: [&str; 3] = ["linkedin.com", "indeed.com", "glassdoor.com"];

const JUNK_COMPANY_PHRASES: [&str; 8] = [
    "confidential",
    "hiring multiple",
    "urgent",
    "apply now",
    "recruiter",
    "staffing",
    "agency",
    "job opening",
];

const BOARD_NAMES: [&str; 4] = ["linkedin", "indeed", "glassdoor", "unknown"];

/// Collapses whitespace runs to single spaces and trims the ends.
pub fn normalize(raw: Option<&str>) -> String {
    raw.unwrap_or_default()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn looks_like_legit_company(name: &str) -> bool {
    if name.is_empty() {
        return false;
    }
    let lowered = name.to_lowercase();
    if JUNK_COMPANY_PHRASES
        .iter()
        .any(|phrase| lowered.contains(phrase))
    {
        return false;
    }
    if BOARD_NAMES.contains(&lowered.as_str()) {
        return false;
    }
    (2..=80).contains(&name.chars().count())
}

/// Display name of the job board a listing came from, or `None` when it is
/// not one of [`ALLOWED_DOMAINS`].
///
/// An explicit `via` naming a board wins over the link's host.
pub fn source_name(link: &str, via: &str) -> Option<String> {
    let via = via.trim().to_lowercase();
    if BOARD_NAMES[..3].contains(&via.as_str()) {
        return Some(capitalize(&via));
    }
    let host = Url::parse(link)
        .ok()
        .and_then(|url| url.host_str().map(str::to_lowercase))
        .unwrap_or_default();
    ALLOWED_DOMAINS
        .iter()
        .copied()
        .find(|domain| host.ends_with(domain))
        .and_then(|domain| domain.split('.').next())
        .map(capitalize)
}

/// Turns one search result into a storable job, or drops it.
pub fn accept(raw: &RawJob, query_location: &str) -> Option<NewJob> {
    let title = normalize(raw.title.as_deref());
    let company = normalize(raw.company_name.as_deref());
    let via = normalize(raw.via.as_deref());
    let link = raw.apply_link()?.to_string();
    if title.is_empty() || !looks_like_legit_company(&company) {
        return None;
    }
    let source = source_name(&link, &via)?;

    let location = Some(normalize(raw.location.as_deref()))
        .filter(|loc| !loc.is_empty())
        .or_else(|| Some(query_location.trim().to_string()).filter(|loc| !loc.is_empty()))
        .unwrap_or_else(|| "—".to_string());
    let description = normalize(raw.description.as_deref());

    Some(NewJob {
        title,
        company: Some(company),
        location: Some(location),
        description: Some(description).filter(|d| !d.is_empty()),
        link: Some(link),
        source: Some(source),
    })
}

fn capitalize(word: &str) -> String {
    let lowered = word.to_lowercase();
    let mut chars = lowered.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
#[path = "tests/filter_tests.rs"]
mod tests;
