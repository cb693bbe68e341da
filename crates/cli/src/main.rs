// riskview CLI - upload site photos, read the risk report, export it

mod exit_codes;
mod logging;
mod shell;

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};

use riskview_cli::{render, Controller, Refusal, TerminalNotifier};
use riskview_client::{ApiClient, RegisterRequest};
use riskview_config::settings::Settings;
use riskview_config::storage::FileStore;
use riskview_core::SectionKind;
use riskview_io::ExportEngine;

use exit_codes::{refusal_exit_code, EXIT_BACKEND, EXIT_ERROR, EXIT_SUCCESS, EXIT_USAGE};

#[derive(Parser)]
#[command(name = "riskview")]
#[command(about = "Site photo risk analysis client")]
#[command(long_version = long_version())]
#[command(version)]
#[command(subcommand_required = false)]
struct Cli {
    /// Analysis service base URL
    #[arg(long, global = true, env = "RISKVIEW_API_BASE", value_name = "URL")]
    api_base: Option<String>,

    /// More log output (repeat for more)
    #[arg(long, short = 'v', global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only show errors
    #[arg(long, short = 'q', global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in and remember the token
    Login {
        #[arg(long, env = "RISKVIEW_USERNAME")]
        username: Option<String>,

        #[arg(long, env = "RISKVIEW_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },

    /// Forget the saved login
    Logout,

    /// Show the logged-in user
    Whoami,

    /// Check that the service is up
    Health,

    /// List past analysis sessions
    Sessions,

    /// Create an account
    Register {
        #[arg(long)]
        username: String,

        #[arg(long)]
        email: String,

        #[arg(long)]
        password: String,

        #[arg(long)]
        full_name: Option<String>,

        #[arg(long)]
        organization: Option<String>,
    },

    /// Upload images, print the report and optionally write downloads
    #[command(after_help = "\
Examples:
  riskview analyze site1.jpg site2.jpg
  riskview analyze photos/*.jpg --label '3공구 점검' --xls risk,sgr,rec --zip
  riskview analyze site.png --json > report.json")]
    Analyze {
        /// Images to upload
        #[arg(value_name = "FILES")]
        files: Vec<PathBuf>,

        /// Session label (default: "분석 세션 <local time>")
        #[arg(long)]
        label: Option<String>,

        /// Directory for downloads (default: export.outputDir or .)
        #[arg(long, short = 'o', value_name = "DIR")]
        out: Option<PathBuf>,

        /// Spreadsheets to write
        #[arg(long, value_delimiter = ',', value_name = "SECTIONS")]
        xls: Vec<XlsSection>,

        /// Write the markdown archive of all sections
        #[arg(long)]
        zip: bool,

        /// Print the report as JSON instead of tables
        #[arg(long)]
        json: bool,
    },

    /// Rate an analysis session
    Feedback {
        /// Session id printed by `analyze`
        #[arg(long)]
        session: Option<String>,

        /// 1 (poor) to 5 (excellent)
        #[arg(long)]
        rating: Option<u8>,

        #[arg(long)]
        text: Option<String>,
    },

    /// Interactive session
    Shell,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum XlsSection {
    Risk,
    Sgr,
    Rec,
}

impl From<XlsSection> for SectionKind {
    fn from(s: XlsSection) -> Self {
        match s {
            XlsSection::Risk => SectionKind::Risk,
            XlsSection::Sgr => SectionKind::Checklist,
            XlsSection::Rec => SectionKind::Recommendations,
        }
    }
}

fn long_version() -> &'static str {
    if cfg!(debug_assertions) {
        concat!(
            env!("CARGO_PKG_VERSION"),
            " (", env!("GIT_COMMIT_HASH"), ")",
            "\nbuild:   debug",
            "\ntarget:  ", env!("TARGET"),
        )
    } else {
        concat!(
            env!("CARGO_PKG_VERSION"),
            " (", env!("GIT_COMMIT_HASH"), ")",
            "\nbuild:   release",
            "\ntarget:  ", env!("TARGET"),
        )
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init_logging(cli.verbose, cli.quiet);

    let result = match cli.command {
        None => {
            eprintln!("Usage: riskview <command> [options]");
            eprintln!("       riskview --help for more information");
            Ok(())
        }
        Some(command) => run(command, cli.api_base, cli.quiet),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

fn run(command: Commands, api_base: Option<String>, quiet: bool) -> Result<(), CliError> {
    let settings = Settings::load();
    let out_dir = match &command {
        Commands::Analyze { out, .. } => out.clone(),
        _ => None,
    };
    let mut ctrl = build_controller(&settings, api_base, out_dir, quiet)?;

    match command {
        Commands::Login { username, password } => cmd_login(&mut ctrl, username, password),
        Commands::Logout => {
            ctrl.logout();
            Ok(())
        }
        Commands::Whoami => {
            let user = ctrl.whoami().map_err(CliError::refusal)?;
            render::render_user(&mut io::stdout().lock(), &user).map_err(CliError::io)
        }
        Commands::Health => {
            let status = ctrl.check_health().map_err(CliError::refusal)?;
            if status.is_healthy() {
                Ok(())
            } else {
                Err(CliError { code: EXIT_BACKEND, message: String::new(), hint: None })
            }
        }
        Commands::Sessions => {
            let sessions = ctrl.list_sessions().map_err(CliError::refusal)?;
            print_json(&sessions)
        }
        Commands::Register { username, email, password, full_name, organization } => {
            let request = RegisterRequest { username, email, password, full_name, organization };
            ctrl.register(&request).map(|_| ()).map_err(CliError::refusal)
        }
        Commands::Analyze { files, label, out: _, xls, zip, json } => {
            cmd_analyze(&mut ctrl, files, label, xls, zip, json)
        }
        Commands::Feedback { session, rating, text } => {
            if let Some(id) = session {
                ctrl.resume_session(id);
            }
            ctrl.submit_feedback(rating, text.as_deref().unwrap_or(""))
                .map_err(CliError::refusal)
        }
        Commands::Shell => shell::run(&mut ctrl).map_err(CliError::io),
    }
}

fn build_controller(
    settings: &Settings,
    api_base: Option<String>,
    out_dir: Option<PathBuf>,
    quiet: bool,
) -> Result<Controller, CliError> {
    let api_base = api_base
        .filter(|b| !b.trim().is_empty())
        .unwrap_or_else(|| settings.api_base().to_string());
    log::debug!("Service at {}", api_base);

    let client = ApiClient::new(api_base, settings.timeout())
        .map_err(|e| CliError { code: EXIT_ERROR, message: e.to_string(), hint: None })?;
    let exports = ExportEngine::new(out_dir.unwrap_or_else(|| settings.output_dir()));
    let store = FileStore::open_default().map_err(|e| CliError {
        code: EXIT_ERROR,
        message: format!("Cannot open local storage: {}", e),
        hint: Some("set RISKVIEW_CONFIG_DIR to a writable directory".into()),
    })?;

    let mut ctrl = Controller::new(client, exports, Box::new(store), Box::new(TerminalNotifier::new(quiet)))
        .with_label_prefix(settings.session_label_prefix.clone());
    ctrl.startup();
    Ok(ctrl)
}

// ============================================================================
// login
// ============================================================================

fn cmd_login(ctrl: &mut Controller, username: Option<String>, password: Option<String>) -> Result<(), CliError> {
    // flag / env first, then an interactive prompt
    let username = match username {
        Some(u) => u,
        None => prompt("Username")?,
    };
    let password = match password {
        Some(p) => p,
        None => prompt("Password")?,
    };
    ctrl.login(&username, &password).map_err(CliError::refusal)?;
    if let Some(user) = ctrl.user() {
        eprintln!("Authenticated as {}", user.display_name());
    }
    Ok(())
}

fn prompt(label: &str) -> Result<String, CliError> {
    if !atty::is(atty::Stream::Stdin) {
        return Err(CliError {
            code: EXIT_USAGE,
            message: format!("{} not provided and stdin is not a TTY", label),
            hint: Some("pass --username/--password or set RISKVIEW_USERNAME/RISKVIEW_PASSWORD".into()),
        });
    }
    eprint!("{}: ", label);
    io::stderr().flush().ok();
    let mut buf = String::new();
    io::stdin().lock().read_line(&mut buf).map_err(CliError::io)?;
    Ok(buf.trim().to_string())
}

// ============================================================================
// analyze
// ============================================================================

fn cmd_analyze(
    ctrl: &mut Controller,
    files: Vec<PathBuf>,
    label: Option<String>,
    xls: Vec<XlsSection>,
    zip: bool,
    json: bool,
) -> Result<(), CliError> {
    ctrl.select_files(&files).map_err(CliError::refusal)?;
    ctrl.analyze(label.as_deref()).map_err(CliError::refusal)?;

    if let Some(report) = ctrl.report() {
        if json {
            print_json(report)?;
        } else {
            render::render_report(&mut io::stdout().lock(), report).map_err(CliError::io)?;
        }
    }

    // Keep going after a failed download so the others still get written
    let mut first_failure = None;
    let mut exports: Vec<Result<PathBuf, Refusal>> = xls
        .into_iter()
        .map(|section| ctrl.export_table(section.into()))
        .collect();
    if zip {
        exports.push(ctrl.export_archive());
    }
    for result in exports {
        match result {
            Ok(path) => log::info!("Exported {}", path.display()),
            Err(refusal) => {
                first_failure.get_or_insert(refusal);
            }
        }
    }
    match first_failure {
        Some(refusal) => Err(CliError::refusal(refusal)),
        None => Ok(()),
    }
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<(), CliError> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|e| CliError { code: EXIT_ERROR, message: e.to_string(), hint: None })?;
    writeln!(io::stdout().lock(), "{}", text).map_err(CliError::io)
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn io(err: io::Error) -> Self {
        Self { code: EXIT_ERROR, message: err.to_string(), hint: None }
    }

    /// The controller has already told the user what went wrong; only the
    /// exit code and a hint remain.
    pub fn refusal(refusal: Refusal) -> Self {
        let hint = match &refusal {
            Refusal::NotAuthenticated | Refusal::AuthExpired => Some("run `riskview login`".to_string()),
            _ => None,
        };
        log::debug!("Refused: {}", refusal);
        Self { code: refusal_exit_code(&refusal), message: String::new(), hint }
    }
}
