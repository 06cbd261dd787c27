use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq)]
pub enum Mode {
    /// Load config and templates, print what was found
    Info,
    /// One detection pass over a saved screenshot
    Image(PathBuf),
    /// Live detection loop on the primary monitor
    Run,
}

#[derive(Debug, PartialEq)]
pub struct Args {
    pub mode: Mode,
    pub debug_mode: bool,
    pub config_path: PathBuf,
    pub templates_dir: Option<PathBuf>,
    pub rate_hz: Option<f32>,
    pub timeout_secs: Option<u64>,
}

pub const DEFAULT_CONFIG_PATH: &str = "rod-watch.json";

impl Args {
    pub fn parse() -> Option<Self> {
        let args: Vec<String> = env::args().skip(1).collect();
        Self::parse_from(&args)
    }

    /// Parse flags (program name already stripped). `None` means exit.
    pub fn parse_from(args: &[String]) -> Option<Self> {
        let mut mode = Mode::Info;
        let mut debug_mode = false;
        let mut config_path = PathBuf::from(DEFAULT_CONFIG_PATH);
        let mut templates_dir = None;
        let mut rate_hz = None;
        let mut timeout_secs = None;

        for arg in args {
            if arg == "--help" || arg == "-h" {
                print_help();
                return None;
            } else if arg == "--version" || arg == "-v" {
                println!("Rod Watch v{}", env!("CARGO_PKG_VERSION"));
                return None;
            } else if arg == "--debug" {
                debug_mode = true;
            } else if arg == "--run" {
                mode = Mode::Run;
            } else if let Some(val) = arg.strip_prefix("--image=") {
                mode = Mode::Image(PathBuf::from(val));
            } else if let Some(val) = arg.strip_prefix("--config=") {
                config_path = PathBuf::from(val);
            } else if let Some(val) = arg.strip_prefix("--templates=") {
                templates_dir = Some(PathBuf::from(val));
            } else if let Some(val) = arg.strip_prefix("--rate=") {
                match val.parse::<f32>() {
                    Ok(hz) if hz.is_finite() && hz > 0.0 => rate_hz = Some(hz),
                    _ => {
                        eprintln!("❌ Invalid rate value: {}", val);
                        return None;
                    }
                }
            } else if let Some(val) = arg.strip_prefix("--timeout=") {
                match val.parse::<u64>() {
                    Ok(secs) => timeout_secs = Some(secs),
                    Err(_) => {
                        eprintln!("❌ Invalid timeout value: {}", val);
                        return None;
                    }
                }
            } else {
                eprintln!("❌ Unknown argument: {}", arg);
                print_help();
                return None;
            }
        }

        Some(Args {
            mode,
            debug_mode,
            config_path,
            templates_dir,
            rate_hz,
            timeout_secs,
        })
    }
}

fn print_help() {
    println!("🎣 Rod Watch - fishing bot detection core");
    println!();
    println!("USAGE:");
    println!("    rod-watch [FLAGS]");
    println!();
    println!("FLAGS:");
    println!("    (no flags)          Load config and templates, print a summary");
    println!("    --image=FILE        Run one detection pass on a saved screenshot");
    println!("    --run               Live detection loop on the primary monitor");
    println!("                        (needs the 'capture' feature)");
    println!("    --config=FILE       Config file (default: {})", DEFAULT_CONFIG_PATH);
    println!("    --templates=DIR     Override the template directory");
    println!("    --rate=HZ           Detection passes per second");
    println!("    --debug             Enable debug logging");
    println!("    --timeout=N         Auto-exit the live loop after N seconds");
    println!("    --help, -h          Show this help message");
    println!("    --version, -v       Show version information");
    println!();
    println!("EXAMPLES:");
    println!("    rod-watch --image=screenshot.png --templates=templates");
    println!("    rod-watch --run --rate=5 --debug");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Option<Args> {
        let args: Vec<String> = args.iter().map(|s| s.to_string()).collect();
        Args::parse_from(&args)
    }

    #[test]
    fn test_defaults() {
        let args = parse(&[]).unwrap();
        assert_eq!(args.mode, Mode::Info);
        assert!(!args.debug_mode);
        assert_eq!(args.config_path, PathBuf::from(DEFAULT_CONFIG_PATH));
    }

    #[test]
    fn test_flags() {
        let args = parse(&["--image=shot.png", "--templates=tpl", "--rate=2.5", "--debug"]).unwrap();
        assert_eq!(args.mode, Mode::Image(PathBuf::from("shot.png")));
        assert_eq!(args.templates_dir, Some(PathBuf::from("tpl")));
        assert_eq!(args.rate_hz, Some(2.5));
        assert!(args.debug_mode);

        let args = parse(&["--run", "--timeout=30", "--config=bot.json"]).unwrap();
        assert_eq!(args.mode, Mode::Run);
        assert_eq!(args.timeout_secs, Some(30));
        assert_eq!(args.config_path, PathBuf::from("bot.json"));
    }

    #[test]
    fn test_invalid_values() {
        assert!(parse(&["--rate=0"]).is_none());
        assert!(parse(&["--timeout=soon"]).is_none());
        assert!(parse(&["--fish"]).is_none());
    }
}
