use url::{Url, form_urlencoded};

pub const PLAY_ROUTE: &str = "/play";
pub const DATA_PARAM: &str = "data";

/// Builds `<base>#/play?data=<payload>`. The payload travels in the fragment,
/// so opening the link never sends the quiz to a server.
pub fn share_link(base: &Url, payload: &str) -> String {
    let query = form_urlencoded::Serializer::new(String::new())
        .append_pair(DATA_PARAM, payload)
        .finish();
    let mut link = base.clone();
    link.set_fragment(Some(&format!("{PLAY_ROUTE}?{query}")));
    link.to_string()
}

/// Extracts the `data` value from a share link, a bare fragment
/// (`#/play?data=...`) or a plain query string.
pub fn payload_from_link(link: &str) -> Option<String> {
    let query = match link.split_once('#') {
        Some((_, fragment)) => fragment.split_once('?')?.1,
        None => link.split_once('?').map_or(link, |(_, query)| query),
    };

    form_urlencoded::parse(query.as_bytes())
        .find(|(key, _)| key == DATA_PARAM)
        .map(|(_, value)| value.into_owned())
        .filter(|value| !value.is_empty())
}
