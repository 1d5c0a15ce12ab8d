//! Configuration for the archive tool.
//!
//! Parses command-line arguments into a [`Config`]. Three modes:
//!
//! ```text
//! archive <file>... <archiveOut>            compress
//! archive -d <archiveIn> [--out-dir DIR]    decompress
//! archive -l <archiveIn>                    list
//! ```

use std::path::PathBuf;

/// What the tool was asked to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    /// Encode `inputs` into a new archive
    Compress {
        inputs: Vec<PathBuf>,
        archive: PathBuf,
    },

    /// Decode every record of `archive`
    Decompress {
        archive: PathBuf,
        /// Directory extracted files are placed under (default: current dir)
        output_dir: Option<PathBuf>,
    },

    /// Print every record's name, size and checksum
    List { archive: PathBuf },

    /// Print usage and exit
    Help,
}

/// Complete configuration for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub mode: Mode,

    /// 0 = warnings, 1 = debug, 2+ = trace
    pub verbosity: u8,

    /// Whether to print the resolved configuration
    pub print_config: bool,

    /// Whether to print the metrics summary
    pub print_metrics: bool,
}

impl Config {
    /// Parse configuration from command-line arguments (without the program name).
    pub fn from_args(args: &[String]) -> Result<Self, String> {
        let mut decode: Option<PathBuf> = None;
        let mut list: Option<PathBuf> = None;
        let mut output_dir: Option<PathBuf> = None;
        let mut positional: Vec<PathBuf> = Vec::new();
        let mut verbosity: u8 = 0;
        let mut print_config = false;
        let mut print_metrics = true;
        let mut help = false;

        let mut i = 0;
        while i < args.len() {
            match args[i].as_str() {
                "-d" | "--decode" => {
                    i += 1;
                    if i >= args.len() {
                        return Err(format!("{} requires an archive path", args[i - 1]));
                    }
                    decode = Some(PathBuf::from(&args[i]));
                }
                "-l" | "--list" => {
                    i += 1;
                    if i >= args.len() {
                        return Err(format!("{} requires an archive path", args[i - 1]));
                    }
                    list = Some(PathBuf::from(&args[i]));
                }
                "--out-dir" => {
                    i += 1;
                    if i >= args.len() {
                        return Err("--out-dir requires a path".to_string());
                    }
                    output_dir = Some(PathBuf::from(&args[i]));
                }
                "-v" | "--verbose" => {
                    verbosity = verbosity.saturating_add(1);
                }
                "-vv" => {
                    verbosity = verbosity.saturating_add(2);
                }
                "--print-config" => {
                    print_config = true;
                }
                "--no-metrics" => {
                    print_metrics = false;
                }
                "--help" | "-h" => {
                    help = true;
                }
                "--" => {
                    positional.extend(args[i + 1..].iter().map(PathBuf::from));
                    break;
                }
                arg if arg.starts_with('-') && arg.len() > 1 => {
                    return Err(format!("unknown argument: {}", arg));
                }
                arg => {
                    positional.push(PathBuf::from(arg));
                }
            }
            i += 1;
        }

        let mode = if help {
            Mode::Help
        } else {
            match (decode, list) {
                (Some(_), Some(_)) => {
                    return Err("--decode and --list cannot be combined".to_string());
                }
                (Some(archive), None) => {
                    reject_positional(&positional)?;
                    Mode::Decompress { archive, output_dir }
                }
                (None, Some(archive)) => {
                    reject_positional(&positional)?;
                    if output_dir.is_some() {
                        return Err("--out-dir only applies to --decode".to_string());
                    }
                    Mode::List { archive }
                }
                (None, None) => {
                    if output_dir.is_some() {
                        return Err("--out-dir only applies to --decode".to_string());
                    }
                    if positional.len() < 2 {
                        return Err("expected at least one input file and an archive path".to_string());
                    }
                    let archive = positional.pop().unwrap_or_default();
                    Mode::Compress {
                        inputs: positional,
                        archive,
                    }
                }
            }
        };

        Ok(Config {
            mode,
            verbosity,
            print_config,
            print_metrics,
        })
    }

    /// Print the configuration in human-readable form.
    pub fn print(&self) {
        println!("=== Configuration ===");
        match &self.mode {
            Mode::Compress { inputs, archive } => {
                println!("Mode: compress");
                for input in inputs {
                    println!("Input:   {}", input.display());
                }
                println!("Archive: {}", archive.display());
            }
            Mode::Decompress { archive, output_dir } => {
                println!("Mode: decompress");
                println!("Archive:    {}", archive.display());
                println!(
                    "Output dir: {}",
                    output_dir.as_ref().map_or(".".into(), |d| d.display().to_string())
                );
            }
            Mode::List { archive } => {
                println!("Mode: list");
                println!("Archive: {}", archive.display());
            }
            Mode::Help => println!("Mode: help"),
        }
        println!("Verbosity: {}", self.verbosity);
        println!();
    }
}

fn reject_positional(positional: &[PathBuf]) -> Result<(), String> {
    match positional.first() {
        Some(extra) => Err(format!("unexpected argument: {}", extra.display())),
        None => Ok(()),
    }
}

pub fn print_help() {
    println!("archive: multi-file Huffman archiver");
    println!();
    println!("USAGE:");
    println!("    archive [OPTIONS] <FILE>... <ARCHIVE>     Compress files into ARCHIVE");
    println!("    archive [OPTIONS] -d <ARCHIVE>            Extract every file from ARCHIVE");
    println!("    archive [OPTIONS] -l <ARCHIVE>            List and verify ARCHIVE");
    println!();
    println!("OPTIONS:");
    println!("    -d, --decode <ARCHIVE>  Decompress mode");
    println!("    -l, --list <ARCHIVE>    List mode");
    println!("    --out-dir <DIR>         Extract under DIR (default: current directory)");
    println!();
    println!("    -v, --verbose           More log output (repeat for trace)");
    println!("    --print-config          Print resolved configuration");
    println!("    --no-metrics            Don't print metrics summary");
    println!("    --help, -h              Print this help");
    println!();
    println!("Existing files are never overwritten during extraction; a numeric");
    println!("suffix (.1, .2, ...) is appended instead.");
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Config, String> {
        let args: Vec<String> = args.iter().map(|s| s.to_string()).collect();
        Config::from_args(&args)
    }

    #[test]
    fn test_compress_mode() {
        let config = parse(&["a.txt", "b.txt", "out.huf"]).unwrap();
        assert_eq!(
            config.mode,
            Mode::Compress {
                inputs: vec![PathBuf::from("a.txt"), PathBuf::from("b.txt")],
                archive: PathBuf::from("out.huf"),
            }
        );
        assert!(config.print_metrics);
        assert_eq!(config.verbosity, 0);
    }

    #[test]
    fn test_compress_needs_two_paths() {
        assert!(parse(&["only.huf"]).is_err());
        assert!(parse(&[]).is_err());
    }

    #[test]
    fn test_decode_mode() {
        let config = parse(&["-d", "in.huf", "--out-dir", "restored", "--no-metrics"]).unwrap();
        assert_eq!(
            config.mode,
            Mode::Decompress {
                archive: PathBuf::from("in.huf"),
                output_dir: Some(PathBuf::from("restored")),
            }
        );
        assert!(!config.print_metrics);
    }

    #[test]
    fn test_list_mode() {
        let config = parse(&["--list", "in.huf"]).unwrap();
        assert_eq!(
            config.mode,
            Mode::List {
                archive: PathBuf::from("in.huf")
            }
        );
    }

    #[test]
    fn test_verbosity_counts() {
        assert_eq!(parse(&["-v", "a", "b"]).unwrap().verbosity, 1);
        assert_eq!(parse(&["-v", "-v", "a", "b"]).unwrap().verbosity, 2);
        assert_eq!(parse(&["-vv", "a", "b"]).unwrap().verbosity, 2);
    }

    #[test]
    fn test_rejected_combinations() {
        assert!(parse(&["-d", "x.huf", "-l", "y.huf"]).is_err());
        assert!(parse(&["-d", "x.huf", "extra"]).is_err());
        assert!(parse(&["a", "b", "--out-dir", "d"]).is_err());
        assert!(parse(&["-d"]).is_err());
        assert!(parse(&["--bogus", "a", "b"]).is_err());
    }

    #[test]
    fn test_help_wins() {
        assert_eq!(parse(&["-h"]).unwrap().mode, Mode::Help);
        assert_eq!(parse(&["a", "--help"]).unwrap().mode, Mode::Help);
    }

    #[test]
    fn test_double_dash_allows_dash_names() {
        let config = parse(&["--", "-odd", "out.huf"]).unwrap();
        assert_eq!(
            config.mode,
            Mode::Compress {
                inputs: vec![PathBuf::from("-odd")],
                archive: PathBuf::from("out.huf"),
            }
        );
    }
}
