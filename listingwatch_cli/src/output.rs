use listingwatch_lib::{Listing, NotifyReport, RunSummary};
use serde::Serialize;
use tabled::settings::Style;
use tabled::{Table, Tabled};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Table,
    Json,
}

impl OutputFormat {
    pub fn parse(s: &str) -> Self {
        match s {
            "json" => Self::Json,
            _ => Self::Table,
        }
    }
}

#[derive(Tabled, Serialize)]
struct ListingRow {
    #[tabled(rename = "GI#")]
    #[serde(rename = "GI#")]
    identifier: String,
    #[tabled(rename = "Title")]
    #[serde(rename = "Title")]
    title: String,
    #[tabled(rename = "Price")]
    #[serde(rename = "Price")]
    price: String,
    #[tabled(rename = "URL")]
    #[serde(rename = "URL")]
    url: String,
}

#[derive(Tabled)]
struct DeliveryRow {
    #[tabled(rename = "Recipient")]
    recipient: String,
    #[tabled(rename = "Result")]
    result: String,
}

/// JSON shape of a single run.
#[derive(Serialize)]
struct RunReport<'a> {
    stop: String,
    pages_fetched: usize,
    accepted: usize,
    saved: bool,
    new_listings: &'a [Listing],
}

fn build_listing_rows(listings: &[Listing]) -> Vec<ListingRow> {
    listings
        .iter()
        .map(|l| ListingRow {
            identifier: l.identifier.clone(),
            title: truncate(l.display_title(), 60),
            price: l.display_price().to_string(),
            url: l.listing_url.clone(),
        })
        .collect()
}

fn build_delivery_rows(report: &NotifyReport) -> Vec<DeliveryRow> {
    report
        .deliveries
        .iter()
        .map(|d| DeliveryRow {
            recipient: d.recipient.clone(),
            result: match &d.result {
                Ok(()) => "sent".to_string(),
                Err(e) => format!("failed: {}", e),
            },
        })
        .collect()
}

pub fn print_run(summary: &RunSummary, format: &OutputFormat) {
    match format {
        OutputFormat::Json => print_json(&RunReport {
            stop: summary.stop.to_string(),
            pages_fetched: summary.pages_fetched,
            accepted: summary.accepted,
            saved: summary.saved,
            new_listings: &summary.new_listings,
        }),
        OutputFormat::Table => {
            if summary.new_listings.is_empty() {
                println!("No new listings.");
            } else {
                let mut table = Table::new(build_listing_rows(&summary.new_listings));
                table.with(Style::rounded());
                println!("{}", table);
            }
            eprintln!(
                "{} listings from {} pages ({}), {} new, state {}",
                summary.accepted,
                summary.pages_fetched,
                summary.stop,
                summary.new_listings.len(),
                if summary.saved { "saved" } else { "not saved" }
            );
        }
    }
}

pub fn print_deliveries(report: &NotifyReport) {
    println!("{}", Table::new(build_delivery_rows(report)));
}

pub fn print_json<T: serde::Serialize>(data: &T) {
    match serde_json::to_string_pretty(data) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Failed to serialize to JSON: {}", e),
    }
}

fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max_chars.saturating_sub(3)).collect();
    out.push_str("...");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use listingwatch_lib::notify::{Delivery, NotifyError};

    fn listing(id: &str, title: Option<&str>, price: Option<&str>) -> Listing {
        Listing {
            identifier: id.to_string(),
            title: title.map(str::to_string),
            description: None,
            price: price.map(str::to_string),
            listing_url: format!("https://www.gunsinternational.com/guns-for-sale-online/{}.cfm", id),
        }
    }

    #[test]
    fn test_output_format_parse() {
        assert_eq!(OutputFormat::parse("json"), OutputFormat::Json);
        assert_eq!(OutputFormat::parse("table"), OutputFormat::Table);
        assert_eq!(OutputFormat::parse("xml"), OutputFormat::Table);
    }

    #[test]
    fn test_build_listing_rows_placeholders() {
        let rows = build_listing_rows(&[
            listing("102", Some("Smith & Wesson 686"), Some("$1,249.99")),
            listing("103", None, None),
        ]);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].identifier, "102");
        assert_eq!(rows[0].price, "$1,249.99");
        assert_eq!(rows[1].title, "(untitled)");
        assert_eq!(rows[1].price, "Price not listed");
    }

    #[test]
    fn test_long_titles_truncated() {
        let long = "x".repeat(80);
        let rows = build_listing_rows(&[listing("1", Some(&long), None)]);
        assert_eq!(rows[0].title.chars().count(), 60);
        assert!(rows[0].title.ends_with("..."));
    }

    #[test]
    fn test_listing_table_headers() {
        let table = Table::new(build_listing_rows(&[listing("1", Some("Colt"), None)])).to_string();
        for header in ["GI#", "Title", "Price", "URL"] {
            assert!(table.contains(header), "missing header {}", header);
        }
    }

    #[test]
    fn test_delivery_rows() {
        let report = NotifyReport {
            deliveries: vec![
                Delivery {
                    recipient: "a@example.com".into(),
                    result: Ok(()),
                },
                Delivery {
                    recipient: "b@example.com".into(),
                    result: Err(NotifyError::Transport("timed out".into())),
                },
            ],
        };
        let rows = build_delivery_rows(&report);
        assert_eq!(rows[0].result, "sent");
        assert_eq!(rows[1].result, "failed: smtp error: timed out");
    }

    #[test]
    fn test_run_report_json_shape() {
        let listings = [listing("7", Some("Ruger"), None)];
        let report = RunReport {
            stop: "target count reached".into(),
            pages_fetched: 2,
            accepted: 50,
            saved: true,
            new_listings: &listings,
        };
        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["pages_fetched"], 2);
        assert_eq!(value["new_listings"][0]["identifier"], "7");
        assert!(value["new_listings"][0]["price"].is_null());
    }
}
