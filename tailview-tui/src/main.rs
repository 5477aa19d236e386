mod app;
mod rules_file;
mod source;
mod theme;

use anyhow::Result;
use app::{AppDesc, start_with_source};
use crossterm::{
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{Terminal, backend::CrosstermBackend};
use simplelog::{Config, LevelFilter, WriteLogger};
use source::{FileSource, StdinSource};
use std::{env, fs::File, io, panic, path::PathBuf, process};
use tailview_engine::RuleSet;

fn print_usage() {
    eprintln!("Usage: tailview [FILE|-] [OPTIONS]");
    eprintln!();
    eprintln!("Tail FILE, or read stdin when FILE is '-' or omitted.");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --rules <file>     Load filter rules from a JSON file");
    eprintln!("  --log <file>       Write debug logging to a file");
    eprintln!("  --help, -h         Print this help message");
}

struct Options {
    input: Option<PathBuf>,
    rules: Option<PathBuf>,
    log: Option<PathBuf>,
}

impl Options {
    fn from_args(args: &[String]) -> Result<Self, String> {
        let mut options = Self {
            input: None,
            rules: None,
            log: None,
        };

        let mut iter = args.iter();
        while let Some(arg) = iter.next() {
            match arg.as_str() {
                "--rules" => {
                    let value = iter.next().ok_or("--rules needs a file argument")?;
                    options.rules = Some(PathBuf::from(value));
                }
                "--log" => {
                    let value = iter.next().ok_or("--log needs a file argument")?;
                    options.log = Some(PathBuf::from(value));
                }
                "--help" | "-h" => return Err(String::new()),
                other if other.starts_with("--") => {
                    return Err(format!("Unknown option {:?}", other));
                }
                other => {
                    if options.input.is_some() {
                        return Err("Only one input may be given".to_string());
                    }
                    if other != "-" {
                        options.input = Some(PathBuf::from(other));
                    }
                }
            }
        }

        Ok(options)
    }
}

fn setup_terminal() -> io::Result<Terminal<CrosstermBackend<io::Stdout>>> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    Terminal::new(CrosstermBackend::new(stdout))
}

fn restore_terminal() -> io::Result<()> {
    disable_raw_mode()?;
    execute!(io::stdout(), LeaveAlternateScreen)?;
    Ok(())
}

fn main() -> Result<()> {
    color_eyre::install().ok();

    let args: Vec<String> = env::args().skip(1).collect();
    let options = match Options::from_args(&args) {
        Ok(options) => options,
        Err(message) => {
            if !message.is_empty() {
                eprintln!("{}", message);
                eprintln!();
            }
            print_usage();
            process::exit(if message.is_empty() { 0 } else { 1 });
        }
    };

    if let Some(path) = &options.log {
        WriteLogger::init(LevelFilter::Debug, Config::default(), File::create(path)?).ok();
    }

    let rules = match &options.rules {
        Some(path) => rules_file::load_rules(path)?,
        None => RuleSet::default(),
    };

    let desc = AppDesc {
        rules,
        ..AppDesc::default()
    };

    let mut terminal = setup_terminal()?;

    // restore the terminal on panic before the default hook reports it
    let original_hook = panic::take_hook();
    panic::set_hook(Box::new(move |panic_info| {
        let _ = restore_terminal();
        original_hook(panic_info);
    }));

    let result = match options.input {
        Some(path) => {
            let source = FileSource::new(path.to_string_lossy());
            start_with_source(&mut terminal, source, desc)
        }
        None => start_with_source(&mut terminal, StdinSource::new(), desc),
    };

    restore_terminal()?;
    result
}
