// FILE: src/cli/mod.rs

mod config;
mod handlers;

use crate::config::CompilerConfig;
use crate::error::Result;
use crate::ExtractOptions;
use clap::{Arg, ArgAction, Command, ValueEnum};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Compact JSON
    Json,
    /// Indented JSON
    Pretty,
    /// One `$name: value` line per variable
    Flat,
}

pub struct Cli {
    config: config::ConfigFile,
}

impl Default for Cli {
    fn default() -> Self {
        Self::new()
    }
}

impl Cli {
    pub fn new() -> Self {
        Self {
            config: config::ConfigFile::default(),
        }
    }

    pub fn run(&mut self) -> Result<()> {
        let matches = self.build_cli().get_matches();

        if let Some(config_path) = matches.get_one::<String>("config") {
            self.config = config::load(config_path)?;
        }

        self.setup_logging(matches.get_count("verbose"))?;

        match matches.subcommand() {
            Some(("extract", sub_matches)) => handlers::handle_extract_command(self, sub_matches),
            Some(("names", sub_matches)) => handlers::handle_names_command(sub_matches),
            Some(("compile", sub_matches)) => handlers::handle_compile_command(self, sub_matches),
            _ => {
                println!("No subcommand specified. Use --help for usage information.");
                Ok(())
            }
        }
    }

    fn build_cli(&self) -> Command {
        let include = Arg::new("include")
            .short('I')
            .long("load-path")
            .value_name("DIR")
            .help("Add a load path for imports")
            .action(ArgAction::Append);

        Command::new(crate::NAME)
            .version(crate::VERSION)
            .about(crate::DESCRIPTION)
            .arg(
                Arg::new("config")
                    .short('c')
                    .long("config")
                    .value_name("FILE")
                    .help("Configuration file path (.json or .toml)")
                    .global(true)
                    .action(ArgAction::Set),
            )
            .arg(
                Arg::new("verbose")
                    .short('v')
                    .long("verbose")
                    .help("Increase verbosity (can be used multiple times)")
                    .global(true)
                    .action(ArgAction::Count),
            )
            .subcommand(
                Command::new("extract")
                    .about("Extract root variables as typed values")
                    .arg(Arg::new("input").help("Stylesheet or directory of stylesheets").required(true).index(1))
                    .arg(include.clone())
                    .arg(Arg::new("hook").long("hook").value_name("NAME").help("Name of the extraction hook function"))
                    .arg(Arg::new("format").short('f').long("format").value_parser(clap::value_parser!(OutputFormat)).default_value("pretty").help("Output format"))
                    .arg(Arg::new("output").short('o').long("output").value_name("FILE").help("Write the result to a file"))
                    .arg(Arg::new("watch").short('w').long("watch").help("Watch for changes and extract again").action(ArgAction::SetTrue))
                    .arg(Arg::new("async").long("async").help("Run extraction on the async runtime").action(ArgAction::SetTrue)),
            )
            .subcommand(
                Command::new("names")
                    .about("List the root variable names without compiling")
                    .arg(Arg::new("input").help("Stylesheet").required(true).index(1)),
            )
            .subcommand(
                Command::new("compile")
                    .about("Compile a stylesheet and print the CSS")
                    .arg(Arg::new("input").help("Stylesheet").required(true).index(1))
                    .arg(include),
            )
    }

    fn setup_logging(&self, verbose_count: u8) -> Result<()> {
        let log_level = match verbose_count {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            2 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        };
        env_logger::Builder::from_default_env()
            .filter_level(log_level)
            .format_timestamp_secs()
            .init();
        Ok(())
    }

    /// Command line flags first, then the config file
    pub fn build_compiler_config(&self, matches: &clap::ArgMatches) -> CompilerConfig {
        let mut compiler = CompilerConfig::default();
        if let Some(dirs) = matches.get_many::<String>("include") {
            compiler.load_paths.extend(dirs.map(PathBuf::from));
        }
        if let Some(dirs) = &self.config.load_paths {
            compiler.load_paths.extend(dirs.iter().map(PathBuf::from));
        }
        compiler.style = self.config.style;
        compiler.quiet = self.config.quiet;
        compiler
    }

    pub fn build_extract_options(&self, matches: &clap::ArgMatches) -> ExtractOptions {
        let hook_name = matches
            .get_one::<String>("hook")
            .cloned()
            .or_else(|| self.config.hook_name.clone());
        ExtractOptions {
            compiler: self.build_compiler_config(matches),
            hook_name,
            ..Default::default()
        }
    }
}
