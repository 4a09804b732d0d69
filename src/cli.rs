use clap::{ArgAction, Parser};

use crate::inspect::Config;

#[derive(Parser, Debug)]
#[command(name = "zlook")]
#[command(version)]
#[command(about = "Look inside zip archives and the archives nested within them", long_about = None)]
#[command(after_help = "Examples:\n  \
  zlook app.ear                       list app.ear and the archives directly inside it\n  \
  zlook -d 3 -t .zip,.jar app.ear     descend three levels into zip and jar entries\n  \
  zlook -d 2 -x MANIFEST.MF app.ear   print the first entry ending in MANIFEST.MF")]
pub struct Cli {
    /// Archive files or HTTP URLs to look at
    #[arg(value_name = "ARCHIVE", required = true)]
    pub paths: Vec<String>,

    /// Maximum depth to which to inspect archives
    #[arg(short = 'd', value_name = "DEPTH", default_value_t = 1)]
    pub max_depth: usize,

    /// Comma separated archive types (default .zip,.esa,.jar,.ear,.war)
    #[arg(short = 't', value_name = "TYPES", value_delimiter = ',')]
    pub archive_types: Vec<String>,

    /// Prefix nested entries with their parent path
    #[arg(short = 'p', value_name = "BOOL", default_value_t = true, action = ArgAction::Set)]
    pub prefix_path: bool,

    /// Extract the first entry whose path ends with ENTRY to stdout
    #[arg(short = 'x', value_name = "ENTRY")]
    pub extract: Option<String>,

    /// Log filter for diagnostics written to stderr
    #[arg(long, value_name = "FILTER", default_value = "warn")]
    pub log_level: String,
}

impl Cli {
    pub fn into_config(self) -> Config {
        Config {
            max_depth: self.max_depth,
            archive_types: self.archive_types,
            prefix_path: self.prefix_path,
            extract_target: self.extract.filter(|x| !x.is_empty()),
            paths: self.paths,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cli = Cli::try_parse_from(["zlook", "a.zip"]).unwrap();
        assert_eq!(cli.log_level, "warn");

        let config = cli.into_config();
        assert_eq!(config.max_depth, 1);
        assert!(config.prefix_path);
        assert!(config.archive_types.is_empty());
        assert_eq!(config.paths, ["a.zip"]);
    }

    #[test]
    fn parses_all_flags() {
        let cli = Cli::try_parse_from([
            "zlook", "-d", "3", "-t", ".zip,.apk", "-p", "false", "-x", "secret.txt", "a.zip",
            "b.jar",
        ])
        .unwrap();

        let config = cli.into_config();
        assert_eq!(config.max_depth, 3);
        assert_eq!(config.archive_types, [".zip", ".apk"]);
        assert!(!config.prefix_path);
        assert_eq!(config.extract_target.as_deref(), Some("secret.txt"));
        assert_eq!(config.paths, ["a.zip", "b.jar"]);
    }

    #[test]
    fn empty_extract_target_lists() {
        let cli = Cli::try_parse_from(["zlook", "-x", "", "a.zip"]).unwrap();
        assert_eq!(cli.into_config().extract_target, None);
    }

    #[test]
    fn requires_an_archive() {
        assert!(Cli::try_parse_from(["zlook", "-d", "2"]).is_err());
    }
}
