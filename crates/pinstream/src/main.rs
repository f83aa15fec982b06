mod handoff;
mod logging;

use std::fs;
use std::io::{self, IsTerminal, Read};
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use console::style;
use dialoguer::{Confirm, Input, theme::ColorfulTheme};
use pinstream_client::BackendClient;
use pinstream_config::{
    CONFIG_KEYS, DEFAULT_BACKEND_URL, PinConfig, config_exists, get_config_value, load_config,
    open_in_editor, resolve_backend_url, resolve_download_dir, resolve_reenable_delay,
    resolve_simple_output, resolve_timeout, save_config, set_config_value,
};
use pinstream_core::{PinError, PinResult};
use pinstream_session::{Branch, FALLBACK_MESSAGE, SessionController, ViewState};

use crate::handoff::{Handoff, hand_off};

#[derive(Subcommand, Debug)]
enum Commands {
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Get a configuration value
    Get { key: String },
    /// Set a configuration value
    Set { key: String, value: String },
    /// List all configuration values
    List,
    /// Open config file in editor
    Edit,
}

#[derive(Debug, Parser)]
#[command(name = "pinstream")]
#[command(version, about = "Pinterest video download client", long_about = None)]
struct Cli {
    /// Backend base URL serving /inspect and /download
    #[arg(long)]
    backend: Option<String>,
    /// File with one pin URL per line
    #[arg(long)]
    input: Option<String>,
    /// Page address carrying a shared pin in its `url` parameter
    #[arg(long, value_name = "PAGE_ADDRESS")]
    link: Option<String>,
    /// Confirm download rights without prompting
    #[arg(short, long)]
    yes: bool,
    /// Save videos into this directory
    #[arg(long, value_name = "DIR", conflicts_with = "open")]
    save: Option<PathBuf>,
    /// Open download addresses in the system browser
    #[arg(long)]
    open: bool,
    #[arg(long)]
    simple: bool,
    #[arg(short, long)]
    verbose: bool,
    #[arg(value_name = "URL")]
    urls: Vec<String>,
    #[command(subcommand)]
    command: Option<Commands>,
}

struct RunOptions {
    assume_consent: bool,
    /// Whether a consent prompt can be shown at all.
    interactive: bool,
    handoff: Handoff,
    simple: bool,
}

#[derive(Debug, PartialEq, Eq)]
enum Outcome {
    Downloaded,
    Fallback,
    Declined,
}

#[derive(Default)]
struct Tally {
    downloaded: usize,
    fallback: usize,
    declined: usize,
    failed: usize,
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();
    logging::init_tracing(cli.verbose);

    if let Some(Commands::Config { action }) = cli.command {
        if let Err(err) = handle_config_command(action) {
            eprintln!("{} {err}", style("Error:").red());
            std::process::exit(1);
        }
        return;
    }

    let mut config = match load_config() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{} {err}", style("Error:").red());
            std::process::exit(1);
        }
    };

    let urls = gather_inputs(&cli).unwrap_or_else(|err| {
        eprintln!("{} {err}", style("Error:").red());
        std::process::exit(1);
    });

    if urls.is_empty() && cli.link.is_none() {
        eprintln!("{} {}", style("Error:").red(), PinError::EmptyInput);
        std::process::exit(1);
    }

    let backend_url = cli
        .backend
        .clone()
        .unwrap_or_else(|| resolve_or_prompt_backend_url(&mut config));
    let backend = match BackendClient::new(&backend_url, resolve_timeout(&config)) {
        Ok(backend) => backend,
        Err(err) => {
            eprintln!("{} {err}", style("Error:").red());
            std::process::exit(1);
        }
    };
    tracing::debug!(backend = %backend_url, "backend configured");

    let mut controller =
        SessionController::new(backend).with_reenable_delay(resolve_reenable_delay(&config));

    let handoff = if cli.open {
        Handoff::Open
    } else if let Some(dir) = cli.save.clone().or_else(|| resolve_download_dir(&config)) {
        Handoff::Save(dir)
    } else {
        Handoff::Print
    };
    let options = RunOptions {
        assume_consent: cli.yes,
        interactive: io::stdin().is_terminal(),
        handoff,
        simple: cli.simple || resolve_simple_output(&config).unwrap_or(false),
    };

    let mut tally = Tally::default();

    if let Some(link) = &cli.link {
        match controller.bootstrap(link).await {
            Some(result) => {
                let outcome = process_check(&mut controller, result, &options).await;
                record(&mut tally, link, outcome);
            }
            None => {
                tally.failed += 1;
                eprintln!(
                    "{} {link}: no valid pin in the `url` parameter",
                    style("Failed").red()
                );
            }
        }
    }

    for url in &urls {
        let result = controller.check_pin(url).await;
        let outcome = process_check(&mut controller, result, &options).await;
        record(&mut tally, url, outcome);
    }

    print_summary(&tally, options.simple);
    if tally.failed > 0 {
        std::process::exit(1);
    }
}

fn record(tally: &mut Tally, url: &str, outcome: PinResult<Outcome>) {
    match outcome {
        Ok(Outcome::Downloaded) => tally.downloaded += 1,
        Ok(Outcome::Fallback) => tally.fallback += 1,
        Ok(Outcome::Declined) => tally.declined += 1,
        Err(err) => {
            tally.failed += 1;
            eprintln!("{} {url}: {err}", style("Failed").red());
        }
    }
}

fn gather_inputs(cli: &Cli) -> PinResult<Vec<String>> {
    let mut urls = cli.urls.clone();

    if let Some(path) = &cli.input {
        let content = fs::read_to_string(path)
            .map_err(|err| PinError::Config(format!("failed to read input file: {err}")))?;
        urls.extend(parse_lines(&content));
    }

    if urls.is_empty() && cli.link.is_none() && !io::stdin().is_terminal() {
        let mut buffer = String::new();
        io::stdin()
            .read_to_string(&mut buffer)
            .map_err(|err| PinError::Config(format!("failed to read stdin: {err}")))?;
        urls.extend(parse_lines(&buffer));
    }

    Ok(urls)
}

fn parse_lines(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(|line| line.to_string())
        .collect()
}

fn resolve_or_prompt_backend_url(config: &mut PinConfig) -> String {
    let env_override = std::env::var("PINSTREAM_BACKEND_URL")
        .is_ok_and(|value| !value.trim().is_empty());

    // Only a first interactive run without any configured backend prompts
    if env_override || config_exists().unwrap_or(false) || !io::stdin().is_terminal() {
        return resolve_backend_url(config);
    }

    let theme = ColorfulTheme::default();
    println!(
        "{} Let's configure your pinstream settings",
        style("First-time setup:").bold().cyan()
    );

    let input: String = Input::with_theme(&theme)
        .with_prompt("Backend URL")
        .default(DEFAULT_BACKEND_URL.to_string())
        .interact_text()
        .unwrap_or_else(|_| DEFAULT_BACKEND_URL.to_string());

    config.backend.base_url = Some(input.trim().to_string());

    if let Err(err) = save_config(config) {
        eprintln!("{} {err}", style("Warning:").yellow());
    } else {
        println!(
            "{} Config file created at ~/.pinstream/config.toml",
            style("✓").green()
        );
    }

    resolve_backend_url(config)
}

fn handle_config_command(action: ConfigAction) -> PinResult<()> {
    match action {
        ConfigAction::Get { key } => {
            let config = load_config()?;
            match get_config_value(&config, &key) {
                Some(v) => println!("{} = {}", key, v),
                None => println!("{} = <null>", key),
            }
            Ok(())
        }
        ConfigAction::Set { key, value } => {
            set_config_value(&key, &value)?;
            println!("{} Set {} = {}", style("✓").green(), key, value);
            Ok(())
        }
        ConfigAction::List => {
            let config = load_config()?;
            println!("Current configuration:");
            for key in CONFIG_KEYS {
                let value = get_config_value(&config, key);
                println!("{} = {}", key, value.as_deref().unwrap_or("<null>"));
            }
            Ok(())
        }
        ConfigAction::Edit => open_in_editor(),
    }
}

async fn process_check(
    controller: &mut SessionController<BackendClient>,
    result: PinResult<Branch>,
    options: &RunOptions,
) -> PinResult<Outcome> {
    let branch = result?;
    if !options.simple {
        print_preview(controller.state());
    }

    if branch == Branch::Fallback {
        return Ok(Outcome::Fallback);
    }

    let consent = options.assume_consent || prompt_consent(options.interactive);
    controller.set_consent(consent);

    let Some(request) = controller.request_download() else {
        if !options.simple {
            println!("{} download skipped", style("–").dim());
        }
        return Ok(Outcome::Declined);
    };

    hand_off(controller.backend(), &request, &options.handoff, options.simple).await?;
    Ok(Outcome::Downloaded)
}

fn prompt_consent(interactive: bool) -> bool {
    if !interactive {
        eprintln!(
            "{} not a terminal; pass --yes to confirm download rights",
            style("Note:").yellow()
        );
        return false;
    }

    Confirm::with_theme(&ColorfulTheme::default())
        .with_prompt("I own this content or have permission to download it")
        .default(false)
        .interact()
        .unwrap_or(false)
}

fn print_preview(state: &ViewState) {
    let ViewState::PreviewReady { preview, branch } = state else {
        return;
    };

    match &preview.pin_id {
        Some(id) => println!(
            "{} {} {}",
            style("Pin:").cyan(),
            preview.display_title(),
            style(format!("#{id}")).dim()
        ),
        None => println!("{} {}", style("Pin:").cyan(), preview.display_title()),
    }
    if let Some(author) = preview.author() {
        println!("  {} {author}", style("By").dim());
    }
    println!("  {}", preview.display_description());

    match branch {
        Branch::DownloadReady => {
            println!("{} Video detected! Ready for download.", style("✓").green());
        }
        Branch::Fallback => {
            println!(
                "{} Video Not Available for Download",
                style("Warning:").yellow()
            );
            println!("  {FALLBACK_MESSAGE}");
            println!("  {} {}", style("View on Pinterest:").dim(), preview.pin_url);
        }
    }
    println!();
}

fn print_summary(tally: &Tally, simple: bool) {
    if simple {
        return;
    }
    let total = tally.downloaded + tally.fallback + tally.declined + tally.failed;
    println!(
        "{} Total: {} | Downloaded: {} | No video: {} | Skipped: {} | Failed: {}",
        style("Summary:").bold(),
        total,
        tally.downloaded,
        tally.fallback,
        tally.declined,
        tally.failed
    );
}
