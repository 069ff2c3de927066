use anyhow::{anyhow, Result};
use serde_json::json;

use opdash::config::Config;
use opdash::feed::SnapshotFetcher;
use opdash::logging::{log, log_run_summary, obj, v_num, v_str, Domain, Level};
use opdash::pages::{self, Page};
use opdash::render::{JsonRenderer, Renderer, TextRenderer};
use opdash::ui_state::SectionState;

const USAGE: &str = "usage:
  opdash <page> [--text] [section=daily|weekly|monthly ...]
  opdash catalog

pages: macro, fees, governance, bridges";

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let cfg = Config::from_env();

    let Some(command) = args.first() else {
        eprintln!("{}", USAGE);
        return Ok(());
    };

    match command.as_str() {
        "-h" | "--help" | "help" => {
            println!("{}", USAGE);
            Ok(())
        }
        "catalog" => {
            let catalog = cfg.catalog()?;
            let specs: Vec<_> = catalog.iter().collect();
            println!("{}", serde_json::to_string_pretty(&specs)?);
            Ok(())
        }
        name => {
            let page: Page = name.parse().map_err(|e: String| anyhow!("{}\n{}", e, USAGE))?;
            let text = args.iter().any(|a| a == "--text");
            let mut state = SectionState::new(cfg.default_granularity);
            state
                .apply_args(args[1..].iter().map(String::as_str).filter(|a| !a.starts_with("--")))
                .map_err(|e| anyhow!(e))?;

            let fetcher = SnapshotFetcher::from_config(&cfg)?;
            log(
                Level::Info,
                Domain::System,
                "startup",
                obj(&[
                    ("page", v_str(page.as_str())),
                    ("api_base", v_str(&cfg.api_base)),
                    ("cache_ttl_secs", v_num(cfg.cache_ttl_secs as f64)),
                    ("stale_on_error", json!(cfg.stale_on_error)),
                ]),
            );

            let data = pages::load(page, &fetcher).await;
            let view = data.view(&state);
            let rendered = if text {
                TextRenderer.render(&view)?
            } else {
                JsonRenderer { pretty: true }.render(&view)?
            };
            println!("{}", rendered);
            log_run_summary(page.as_str(), view.sections.len());
            Ok(())
        }
    }
}
