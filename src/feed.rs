//! Fetching and parsing of the RASFF consumer feed.
//!
//! The feed is RSS; Atom documents are accepted as well. Parsing is lenient:
//! a body that is not well-formed XML yields a feed without entries and the
//! parser's message in [`Feed::parse_error`], instead of an error.

use std::borrow::Cow;
use std::sync::LazyLock;
use std::time::Duration;

use regex::{Captures, Regex};
use reqwest::blocking::Client;
use roxmltree::{Document, Node, ParsingOptions};

use crate::error::{FeedError, Result};

/// Feed URL up to the country segment.
pub const RASFF_FEED_BASE: &str =
    "https://webgate.ec.europa.eu/rasff-window/backend/public/consumer/rss";

/// HTTP timeout in seconds.
pub const HTTP_TIMEOUT_SECS: u64 = 60;

/// User agent string identifying this tool.
const USER_AGENT: &str = concat!("rasff-xlsx/", env!("CARGO_PKG_VERSION"));

const ATOM_NS: &str = "http://www.w3.org/2005/Atom";
const RSS1_NS: &str = "http://purl.org/rss/1.0/";

/// A parsed feed document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Feed {
    pub title: Option<String>,
    pub entries: Vec<FeedEntry>,
    /// Set when the body could not be parsed.
    pub parse_error: Option<String>,
}

/// One alert in the feed. Fields are `None` when the element is absent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeedEntry {
    pub title: Option<String>,
    pub link: Option<String>,
    pub description: Option<String>,
}

/// Build the feed URL for a jurisdiction code. The code is inserted as-is.
///
/// # Examples
/// ```
/// use rasff_xlsx::feed::{feed_url, RASFF_FEED_BASE};
///
/// assert_eq!(
///     feed_url(RASFF_FEED_BASE, "5029"),
///     "https://webgate.ec.europa.eu/rasff-window/backend/public/consumer/rss/5029/"
/// );
/// ```
pub fn feed_url(base: &str, country: &str) -> String {
    format!("{}/{country}/", base.trim_end_matches('/'))
}

/// Create a configured HTTP client.
pub fn create_client() -> Result<Client> {
    Client::builder()
        .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
        .user_agent(USER_AGENT)
        .build()
        .map_err(FeedError::Client)
}

/// Download `url` and parse the body as a feed.
///
/// Transport failures and error statuses are returned as
/// [`FeedError::Fetch`]; a malformed body is not an error.
pub fn fetch_feed(client: &Client, url: &str) -> Result<Feed> {
    let fetch_err = |source: reqwest::Error| FeedError::Fetch {
        url: url.to_string(),
        source,
    };

    let response = client
        .get(url)
        .send()
        .and_then(|r| r.error_for_status())
        .map_err(fetch_err)?;
    // decoded with the charset of the Content-Type header, UTF-8 otherwise
    let body = response.text().map_err(fetch_err)?;
    tracing::debug!(url, bytes = body.len(), "Feed downloaded");

    Ok(parse_feed(&body))
}

/// Parse an RSS or Atom document.
///
/// DOCTYPE declarations are allowed. HTML named entities such as `&nbsp;`,
/// which plain XML does not define, are replaced by character references
/// before a second attempt.
pub fn parse_feed(body: &str) -> Feed {
    let body = body.trim_start_matches('\u{feff}');
    let err = match parse_str(body) {
        Ok(feed) => return feed,
        Err(e) => e,
    };

    let err = match replace_html_entities(body) {
        Cow::Owned(patched) => match parse_str(&patched) {
            Ok(feed) => {
                tracing::debug!(error = %err, "Feed parsed after replacing HTML entities");
                return feed;
            }
            Err(e) => e,
        },
        Cow::Borrowed(_) => err,
    };

    tracing::warn!(error = %err, "Feed body is not well-formed XML");
    Feed {
        parse_error: Some(err.to_string()),
        ..Feed::default()
    }
}

fn parse_str(body: &str) -> std::result::Result<Feed, roxmltree::Error> {
    let options = ParsingOptions {
        allow_dtd: true,
        ..ParsingOptions::default()
    };
    Document::parse_with_options(body, options).map(|doc| feed_from_document(&doc))
}

/// HTML named entities seen in feed text, with their code points.
const HTML_ENTITIES: &[(&str, u32)] = &[
    ("nbsp", 0xA0),
    ("iexcl", 0xA1),
    ("cent", 0xA2),
    ("pound", 0xA3),
    ("euro", 0x20AC),
    ("yen", 0xA5),
    ("sect", 0xA7),
    ("copy", 0xA9),
    ("laquo", 0xAB),
    ("reg", 0xAE),
    ("deg", 0xB0),
    ("plusmn", 0xB1),
    ("micro", 0xB5),
    ("middot", 0xB7),
    ("raquo", 0xBB),
    ("frac12", 0xBD),
    ("iquest", 0xBF),
    ("Agrave", 0xC0),
    ("Aacute", 0xC1),
    ("Auml", 0xC4),
    ("Ccedil", 0xC7),
    ("Egrave", 0xC8),
    ("Eacute", 0xC9),
    ("Ntilde", 0xD1),
    ("Ouml", 0xD6),
    ("times", 0xD7),
    ("Uuml", 0xDC),
    ("szlig", 0xDF),
    ("agrave", 0xE0),
    ("aacute", 0xE1),
    ("acirc", 0xE2),
    ("atilde", 0xE3),
    ("auml", 0xE4),
    ("ccedil", 0xE7),
    ("egrave", 0xE8),
    ("eacute", 0xE9),
    ("ecirc", 0xEA),
    ("euml", 0xEB),
    ("iacute", 0xED),
    ("iuml", 0xEF),
    ("ntilde", 0xF1),
    ("oacute", 0xF3),
    ("ocirc", 0xF4),
    ("otilde", 0xF5),
    ("ouml", 0xF6),
    ("divide", 0xF7),
    ("oslash", 0xF8),
    ("uacute", 0xFA),
    ("uuml", 0xFC),
    ("ndash", 0x2013),
    ("mdash", 0x2014),
    ("lsquo", 0x2018),
    ("rsquo", 0x2019),
    ("sbquo", 0x201A),
    ("ldquo", 0x201C),
    ("rdquo", 0x201D),
    ("bdquo", 0x201E),
    ("bull", 0x2022),
    ("hellip", 0x2026),
    ("trade", 0x2122),
];

static NAMED_ENTITY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"&([A-Za-z][A-Za-z0-9]*);").expect("valid regex"));

/// Known HTML entities become `&#N;`; anything else is left alone.
fn replace_html_entities(body: &str) -> Cow<'_, str> {
    NAMED_ENTITY.replace_all(body, |caps: &Captures<'_>| {
        match HTML_ENTITIES.iter().find(|(name, _)| *name == &caps[1]) {
            Some((_, code)) => format!("&#{code};"),
            None => caps[0].to_string(),
        }
    })
}

fn feed_from_document(doc: &Document<'_>) -> Feed {
    let root = doc.root_element();
    match root.tag_name().name() {
        "feed" if root.tag_name().namespace() == Some(ATOM_NS) => Feed {
            title: child_text(root, "title", is_atom),
            entries: root
                .children()
                .filter(|n| n.is_element() && n.tag_name().name() == "entry" && is_atom(*n))
                .map(atom_entry)
                .collect(),
            parse_error: None,
        },
        "rss" | "RDF" => Feed {
            title: root
                .descendants()
                .find(|n| n.is_element() && n.tag_name().name() == "channel")
                .and_then(|channel| child_text(channel, "title", is_rss)),
            entries: root
                .descendants()
                .filter(|n| n.is_element() && n.tag_name().name() == "item" && is_rss(*n))
                .map(rss_entry)
                .collect(),
            parse_error: None,
        },
        other => Feed {
            parse_error: Some(format!("Unrecognised feed root element <{other}>")),
            ..Feed::default()
        },
    }
}

fn rss_entry(item: Node<'_, '_>) -> FeedEntry {
    FeedEntry {
        title: child_text(item, "title", is_rss),
        link: child_text(item, "link", is_rss),
        description: child_text(item, "description", is_rss),
    }
}

fn atom_entry(entry: Node<'_, '_>) -> FeedEntry {
    let link = entry
        .children()
        .filter(|n| n.is_element() && n.tag_name().name() == "link" && is_atom(*n))
        .find(|n| matches!(n.attribute("rel"), None | Some("alternate")))
        .and_then(|n| n.attribute("href"))
        .map(str::to_string);

    FeedEntry {
        title: child_text(entry, "title", is_atom),
        link,
        description: child_text(entry, "summary", is_atom)
            .or_else(|| child_text(entry, "content", is_atom)),
    }
}

/// Plain RSS elements carry no namespace; RSS 1.0 puts them in its own.
fn is_rss(node: Node<'_, '_>) -> bool {
    matches!(node.tag_name().namespace(), None | Some(RSS1_NS))
}

fn is_atom(node: Node<'_, '_>) -> bool {
    node.tag_name().namespace() == Some(ATOM_NS)
}

/// Full text of the first matching child element, CDATA included.
fn child_text(parent: Node<'_, '_>, name: &str, ns_ok: fn(Node<'_, '_>) -> bool) -> Option<String> {
    parent
        .children()
        .find(|n| n.is_element() && n.tag_name().name() == name && ns_ok(*n))
        .map(|n| {
            n.descendants()
                .filter(|d| d.is_text())
                .filter_map(|d| d.text())
                .collect()
        })
}
