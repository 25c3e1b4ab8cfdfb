use crate::CLAP_STYLING;
use clap::{arg, command};

pub(crate) fn command_argument_builder() -> clap::Command {
    clap::Command::new("linkhound")
        .version(env!("CARGO_PKG_VERSION"))
        .bin_name("linkhound")
        .styles(CLAP_STYLING)
        .arg(arg!(-q --"quiet" "Suppress banner and progress output").required(false))
        .subcommand_required(true)
        .subcommand(
            command!("scan")
                .about(
                    "Crawl a site in a headless browser, verify every link, image, stylesheet \
                and script it references, and rank what is broken.",
                )
                .arg(
                    arg!(-u --"url" <URL>)
                        .required(true)
                        .help("Root URL of the site to scan"),
                )
                .arg(
                    arg!(-m --"max-pages" <NUM_PAGES>)
                        .required(false)
                        .help("Maximum number of same-domain pages to crawl")
                        .value_parser(clap::value_parser!(usize))
                        .default_value("20"),
                )
                .arg(
                    arg!(--"no-screenshots")
                        .required(false)
                        .help("Skip capturing screenshot evidence for broken links")
                        .action(clap::ArgAction::SetTrue),
                )
                .arg(
                    arg!(-f --"format" <FORMAT>)
                        .required(false)
                        .help("Report format: text, json, csv")
                        .value_parser(["text", "json", "csv"])
                        .default_value("text"),
                )
                .arg(
                    arg!(-o --"output" <PATH>)
                        .required(false)
                        .help("Save report to file (default: display to screen)"),
                )
                .arg(
                    arg!(--"screenshot-dir" <DIR>)
                        .required(false)
                        .help("Write captured screenshots to this directory as issue-<n>.png"),
                )
                .arg(
                    arg!(--"show-browser")
                        .required(false)
                        .help("Run Chromium with a visible window instead of headless")
                        .action(clap::ArgAction::SetTrue),
                )
                .arg(
                    arg!(--"chromium" <PATH>)
                        .required(false)
                        .help("Path to a Chromium or Chrome executable (default: CHROMIUM_PATH or auto-detect)"),
                ),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_defaults() {
        let matches = command_argument_builder()
            .try_get_matches_from(["linkhound", "scan", "-u", "https://example.com"])
            .unwrap();
        let (name, scan) = matches.subcommand().unwrap();

        assert_eq!(name, "scan");
        assert_eq!(scan.get_one::<usize>("max-pages"), Some(&20));
        assert_eq!(scan.get_one::<String>("format").map(String::as_str), Some("text"));
        assert!(!scan.get_flag("no-screenshots"));
        assert!(!scan.get_flag("show-browser"));
        assert!(!matches.get_flag("quiet"));
    }

    #[test]
    fn test_scan_requires_url() {
        assert!(
            command_argument_builder()
                .try_get_matches_from(["linkhound", "scan"])
                .is_err()
        );
    }

    #[test]
    fn test_rejects_unknown_format() {
        assert!(
            command_argument_builder()
                .try_get_matches_from(["linkhound", "scan", "-u", "https://a.test", "-f", "html"])
                .is_err()
        );
    }

    #[test]
    fn test_all_options() {
        let matches = command_argument_builder()
            .try_get_matches_from([
                "linkhound",
                "-q",
                "scan",
                "-u",
                "https://a.test",
                "--max-pages",
                "5",
                "--no-screenshots",
                "-f",
                "csv",
                "-o",
                "~/report.csv",
                "--screenshot-dir",
                "shots",
                "--show-browser",
            ])
            .unwrap();
        let (_, scan) = matches.subcommand().unwrap();

        assert!(matches.get_flag("quiet"));
        assert_eq!(scan.get_one::<usize>("max-pages"), Some(&5));
        assert!(scan.get_flag("no-screenshots"));
        assert_eq!(scan.get_one::<String>("output").map(String::as_str), Some("~/report.csv"));
        assert_eq!(scan.get_one::<String>("screenshot-dir").map(String::as_str), Some("shots"));
        assert!(scan.get_flag("show-browser"));
    }
}
