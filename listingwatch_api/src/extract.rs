//! Record extraction from a results page.
//!
//! A listing container is the outermost `div` whose text marks exactly one
//! listing: the identifier marker may repeat, but only with the same value. A container becomes a [`Listing`] only
//! when both an identifier and an absolute detail URL are found; title,
//! description and price are best-effort unless [`FieldPolicy`] requires them.

use std::collections::HashSet;
use std::marker::PhantomData;
use std::sync::OnceLock;

use regex::Regex;
use scraper::{ElementRef, Html};
use serde::Deserialize;
use url::Url;

use crate::dom::{normalize_whitespace, Child, Element};
use crate::types::Listing;

/// Text that precedes a listing's identifier.
pub const ID_MARKER: &str = "GI#:";

/// Substring of every detail-page link.
pub const DETAIL_PATH: &str = "guns-for-sale-online/";

const DESCRIPTION_CLASS: &str = "description";
const MORE_INFO: &str = "more info";

fn id_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"GI#:\s*(\d+)").expect("identifier pattern is valid"))
}

fn price_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\$\s*([\d,]+\.?\d*)").expect("price pattern is valid"))
}

fn age_gate_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"I am 18\+").expect("age gate pattern is valid"))
}

/// Why a container did not produce a listing.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtractError {
    #[error("no identifier in container")]
    MissingIdentifier,
    #[error("listing {identifier}: no detail link")]
    MissingDetailUrl { identifier: String },
    #[error("listing {identifier}: cannot resolve detail link {href:?}")]
    UnresolvableUrl { identifier: String, href: String },
    #[error("listing {identifier}: required field {field} missing")]
    MissingField {
        identifier: String,
        field: &'static str,
    },
}

/// Which best-effort fields must be present for a listing to be kept.
///
/// Identifier and detail URL are always required.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FieldPolicy {
    pub require_title: bool,
    pub require_price: bool,
    pub require_description: bool,
}

impl FieldPolicy {
    fn check(&self, listing: &Listing) -> Result<(), ExtractError> {
        let missing = if self.require_title && listing.title.is_none() {
            Some("title")
        } else if self.require_price && listing.price.is_none() {
            Some("price")
        } else if self.require_description && listing.description.is_none() {
            Some("description")
        } else {
            None
        };
        match missing {
            Some(field) => Err(ExtractError::MissingField {
                identifier: listing.identifier.clone(),
                field,
            }),
            None => Ok(()),
        }
    }
}

/// A parsed results page.
pub struct ResultsPage {
    document: Html,
}

impl ResultsPage {
    pub fn parse(body: &str) -> Self {
        Self {
            document: Html::parse_document(body),
        }
    }

    /// True when the page shows the age-confirmation interstitial.
    pub fn has_age_gate(&self) -> bool {
        has_age_gate(self.document.root_element())
    }

    /// Listing containers in document order.
    pub fn containers(&self) -> Containers<'_, ElementRef<'_>> {
        Containers::new(self.document.root_element())
    }

    /// Valid listings in document order. Containers that fail extraction
    /// are logged and skipped.
    pub fn listings<'p>(
        &'p self,
        base: &'p Url,
        policy: &'p FieldPolicy,
    ) -> impl Iterator<Item = Listing> + 'p {
        self.containers()
            .filter_map(move |container| match extract_listing(container, base, policy) {
                Ok(listing) => Some(listing),
                Err(e) => {
                    tracing::debug!("skipping container: {}", e);
                    None
                }
            })
    }
}

/// Depth-first walk yielding listing containers without descending into them.
pub struct Containers<'a, E> {
    stack: Vec<E>,
    _doc: PhantomData<&'a ()>,
}

impl<'a, E: Element<'a>> Containers<'a, E> {
    pub fn new(root: E) -> Self {
        Self {
            stack: vec![root],
            _doc: PhantomData,
        }
    }
}

impl<'a, E: Element<'a>> Iterator for Containers<'a, E> {
    type Item = E;

    fn next(&mut self) -> Option<E> {
        while let Some(el) = self.stack.pop() {
            let listings = distinct_markers(&el.flat_text());
            if listings == 0 {
                continue;
            }
            if listings == 1 && el.name() == "div" {
                return Some(el);
            }
            let children: Vec<E> = el.child_elements().collect();
            self.stack.extend(children.into_iter().rev());
        }
        None
    }
}

/// Number of distinct listings marked in `text`.
///
/// Markers repeating the same identifier count once. A marker with no digits
/// after it counts as a listing of its own.
fn distinct_markers(text: &str) -> usize {
    let mut ids = HashSet::new();
    let mut anonymous = 0;
    for (at, _) in text.match_indices(ID_MARKER) {
        let rest = text[at + ID_MARKER.len()..].trim_start();
        let end = rest
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(rest.len());
        if end == 0 {
            anonymous += 1;
        } else {
            ids.insert(&rest[..end]);
        }
    }
    ids.len() + anonymous
}

/// Extracts one listing from a container element.
pub fn extract_listing<'a, E: Element<'a>>(
    container: E,
    base: &Url,
    policy: &FieldPolicy,
) -> Result<Listing, ExtractError> {
    let identifier =
        extract_identifier(&container.flat_text()).ok_or(ExtractError::MissingIdentifier)?;

    let anchor = find_detail_anchor(container).ok_or_else(|| ExtractError::MissingDetailUrl {
        identifier: identifier.clone(),
    })?;
    let href = anchor.attr("href").unwrap_or_default().trim();
    let listing_url = resolve_url(base, href).ok_or_else(|| ExtractError::UnresolvableUrl {
        identifier: identifier.clone(),
        href: href.to_string(),
    })?;

    let listing = Listing {
        identifier,
        title: extract_title(anchor),
        description: extract_description(container),
        price: extract_price(&container.flat_text_with(" ")),
        listing_url: listing_url.to_string(),
    };
    policy.check(&listing)?;
    Ok(listing)
}

/// Returns the digits following the identifier marker.
pub fn extract_identifier(text: &str) -> Option<String> {
    id_re()
        .captures(text)
        .and_then(|cap| cap.get(1))
        .map(|m| m.as_str().to_string())
}

/// Returns the first currency amount in `text`, formatted as `$` + digits.
pub fn extract_price(text: &str) -> Option<String> {
    price_re()
        .captures(text)
        .and_then(|cap| cap.get(1))
        .map(|m| format!("${}", m.as_str()))
}

fn find_detail_anchor<'a, E: Element<'a>>(container: E) -> Option<E> {
    container.descendants().find(|el| {
        el.name() == "a"
            && el
                .attr("href")
                .map(|href| href.contains(DETAIL_PATH))
                .unwrap_or(false)
    })
}

fn resolve_url(base: &Url, href: &str) -> Option<Url> {
    if href.is_empty() {
        return None;
    }
    let url = base.join(href).ok()?;
    match url.scheme() {
        "http" | "https" => Some(url),
        _ => None,
    }
}

/// Emphasized anchor text, falling back to the anchor's full text.
fn extract_title<'a, E: Element<'a>>(anchor: E) -> Option<String> {
    let emphasized = anchor
        .descendants()
        .find(|el| el.name() == "strong")
        .map(|el| normalize_whitespace(&el.flat_text()))
        .filter(|t| !t.is_empty());
    emphasized.or_else(|| Some(normalize_whitespace(&anchor.flat_text())).filter(|t| !t.is_empty()))
}

/// Direct text of the description block up to the "more info" link, or the
/// block's whole text when that comes out empty.
fn extract_description<'a, E: Element<'a>>(container: E) -> Option<String> {
    let block = container
        .descendants()
        .find(|el| el.has_class(DESCRIPTION_CLASS))?;

    let mut direct = String::new();
    for child in block.children() {
        match child {
            Child::Text(text) => {
                direct.push_str(text);
                direct.push(' ');
            }
            Child::Element(el)
                if el.name() == "a" && el.flat_text().to_lowercase().contains(MORE_INFO) =>
            {
                break;
            }
            Child::Element(_) => {}
        }
    }

    let direct = normalize_whitespace(&direct);
    if !direct.is_empty() {
        return Some(direct);
    }
    Some(normalize_whitespace(&block.flat_text_with(" "))).filter(|t| !t.is_empty())
}

/// True when any button's text matches the age-confirmation control.
pub fn has_age_gate<'a, E: Element<'a>>(root: E) -> bool {
    root.descendants()
        .any(|el| el.name() == "button" && age_gate_re().is_match(&el.flat_text()))
}
