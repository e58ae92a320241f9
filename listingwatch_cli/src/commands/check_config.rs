//! The `check-config` subcommand.

use std::path::Path;

use anyhow::Result;

pub fn run(config_path: &Path) -> Result<()> {
    let config = super::load_config(config_path)?;
    let settings = config.crawl_settings();
    let first_page = settings.search.to_url(&config.crawl.base_url.parse()?)?;

    println!("Config OK: {}", config_path.display());
    println!("  first page:     {}", first_page);
    println!(
        "  target:         {} listings, {} per page, at most {} pages",
        settings.target_count,
        settings.items_per_page,
        settings.page_ceiling()
    );
    println!("  page delay:     {} ms", config.crawl.page_delay_ms);
    println!("  field policy:   {:?}", settings.policy);
    println!("  state file:     {}", config.state.path.display());
    println!("  interval:       {} minutes", config.schedule.interval_minutes);
    match &config.email {
        Some(email) => {
            println!(
                "  email:          {}:{} ({:?}) -> {}",
                email.smtp_host,
                email.smtp_port,
                email.tls,
                email.recipients.join(", ")
            );
            if !email.username.is_empty() && email.resolve_password().is_none() {
                println!(
                    "  warning:        no password set; define email.password or {}",
                    listingwatch_lib::config::PASSWORD_ENV
                );
            }
        }
        None => println!("  email:          not configured, new listings are logged"),
    }
    Ok(())
}
