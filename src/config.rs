//! Runtime configuration, built once from [`crate::cli::Cli`] (spec §6,
//! grounded on `original_source/src/warc2zim/converter.py`'s `__init__`
//! defaulting logic and metadata-length validation).

use std::path::PathBuf;

use crate::cli::Cli;
use crate::error::{ConverterError, ConverterResult};

const MAX_DESCRIPTION_LEN: usize = 30;
const MAX_LONG_DESCRIPTION_LEN: usize = 4000;
const DEFAULT_TAGS: &[&str] = &["_ftindex:yes", "_category:other"];

#[derive(Debug, Clone)]
pub struct Config {
    pub inputs: Vec<PathBuf>,
    pub name: String,
    pub main_url: Option<String>,
    pub include_domains: Vec<String>,
    pub favicon: Option<String>,
    pub custom_css: Option<String>,
    pub output: PathBuf,
    pub zim_file: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub long_description: Option<String>,
    pub tags: Vec<String>,
    pub lang: Option<String>,
    pub publisher: String,
    pub creator: String,
    pub source: Option<String>,
    pub progress_file: Option<PathBuf>,
    pub scraper: String,
    pub continue_on_error: bool,
    pub failed_items: Option<PathBuf>,
    pub disable_metadata_checks: bool,
    /// `now`, formatted once here so the driver never reads the wall clock itself.
    pub date: String,
}

impl Config {
    /// Build from parsed CLI args. `now` is the one permitted wall-clock
    /// read, captured at the program's I/O boundary in `main()` and
    /// threaded in here rather than read again during the run (spec §6
    /// "`--zim-file`'s `{period}` substitution").
    pub fn from_cli(cli: Cli, now: chrono::DateTime<chrono::Local>) -> ConverterResult<Self> {
        if !cli.disable_metadata_checks {
            if let Some(d) = &cli.description {
                if d.chars().count() > MAX_DESCRIPTION_LEN {
                    return Err(ConverterError::MetadataInvalid(format!(
                        "--description must be at most {MAX_DESCRIPTION_LEN} characters, got {}",
                        d.chars().count()
                    )));
                }
            }
            if let Some(d) = &cli.long_description {
                if d.chars().count() > MAX_LONG_DESCRIPTION_LEN {
                    return Err(ConverterError::MetadataInvalid(format!(
                        "--long-description must be at most {MAX_LONG_DESCRIPTION_LEN} characters, got {}",
                        d.chars().count()
                    )));
                }
            }
        }

        let mut tags: Vec<String> = cli
            .tags
            .as_deref()
            .map(|t| t.split(';').map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).collect())
            .unwrap_or_default();
        for default_tag in DEFAULT_TAGS {
            if !tags.iter().any(|t| t == default_tag) {
                tags.push((*default_tag).to_string());
            }
        }

        let period = now.format("%Y-%m").to_string();
        let zim_file = cli
            .zim_file
            .unwrap_or_else(|| format!("{}_{period}.zim", cli.name))
            .replace("{period}", &period);

        let source = cli.source.clone().or_else(|| cli.url.clone());
        let scraper = match cli.scraper_suffix {
            Some(suffix) => format!("warc2zim-rs {suffix}"),
            None => "warc2zim-rs".to_string(),
        };

        Ok(Config {
            inputs: cli.inputs,
            name: cli.name,
            main_url: cli.url,
            include_domains: cli.include_domains,
            favicon: cli.favicon,
            custom_css: cli.custom_css,
            output: cli.output,
            zim_file,
            title: cli.title,
            description: cli.description,
            long_description: cli.long_description,
            tags,
            lang: cli.lang,
            publisher: cli.publisher,
            creator: cli.creator,
            source,
            progress_file: cli.progress_file,
            scraper,
            continue_on_error: cli.continue_on_error,
            failed_items: cli.failed_items,
            disable_metadata_checks: cli.disable_metadata_checks,
            date: now.format("%Y-%m-%d").to_string(),
        })
    }

    pub fn output_zim_path(&self) -> PathBuf {
        self.output.join(&self.zim_file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn parse(args: &[&str]) -> Cli {
        Cli::parse_from(std::iter::once(&"warc2zim").chain(args.iter()))
    }

    fn now() -> chrono::DateTime<chrono::Local> {
        chrono::DateTime::parse_from_rfc3339("2026-07-27T00:00:00Z").unwrap().with_timezone(&chrono::Local)
    }

    #[test]
    fn default_tags_always_present() {
        let cli = parse(&["--name", "test", "in.warc"]);
        let cfg = Config::from_cli(cli, now()).unwrap();
        assert!(cfg.tags.contains(&"_ftindex:yes".to_string()));
        assert!(cfg.tags.contains(&"_category:other".to_string()));
    }

    #[test]
    fn source_falls_back_to_url() {
        let cli = parse(&["--name", "test", "--url", "https://example.com/", "in.warc"]);
        let cfg = Config::from_cli(cli, now()).unwrap();
        assert_eq!(cfg.source.as_deref(), Some("https://example.com/"));
    }

    #[test]
    fn zim_file_period_substitution() {
        let cli = parse(&["--name", "test", "--zim-file", "out_{period}.zim", "in.warc"]);
        let cfg = Config::from_cli(cli, now()).unwrap();
        assert_eq!(cfg.zim_file, "out_2026-07.zim");
    }

    #[test]
    fn oversized_description_is_rejected() {
        let long = "x".repeat(31);
        let cli = parse(&["--name", "test", "--description", &long, "in.warc"]);
        let err = Config::from_cli(cli, now()).unwrap_err();
        assert!(matches!(err, ConverterError::MetadataInvalid(_)));
    }

    #[test]
    fn disabled_checks_allow_oversized_description() {
        let long = "x".repeat(31);
        let cli = parse(&["--name", "test", "--description", &long, "--disable-metadata-checks", "in.warc"]);
        assert!(Config::from_cli(cli, now()).is_ok());
    }
}
