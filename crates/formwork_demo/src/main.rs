//! Formwork demo
//!
//! Drives the sample view-models through a logging presenter.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use formwork_core::{FormNode, ItemKind};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod config;
mod presenter;
mod view_models;

use config::DemoConfig;
use presenter::LogPresenter;
use view_models::{AuthMethod, ConnectionScreen, ConnectionViewModel, MenuViewModel};

#[derive(Parser)]
#[command(name = "formwork-demo")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Formwork sample forms", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file (TOML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Walk through the menu screen
    Menu {
        /// Seed for the random number item
        #[arg(long)]
        seed: Option<u64>,

        /// How many times to regenerate the number
        #[arg(short, long, default_value = "3")]
        rolls: u32,
    },

    /// Fill in and save the connection screen
    Connection {
        /// Password to enter
        #[arg(long, default_value = "secret")]
        password: String,

        /// Authenticate with a key instead of a password
        #[arg(long)]
        key: bool,
    },

    /// Print the effective configuration
    Config,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = DemoConfig::load(cli.config.as_deref())?;

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(&config.logging.filter))
            .with_context(|| format!("Invalid log filter '{}'", config.logging.filter))?
    };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    match cli.command {
        Commands::Menu { seed, rolls } => cmd_menu(seed, rolls),
        Commands::Connection { password, key } => cmd_connection(&config, &password, key),
        Commands::Config => cmd_config(&config),
    }
}

fn cmd_menu(seed: Option<u64>, rolls: u32) -> Result<()> {
    let view_model = MenuViewModel::new();
    let form = view_model.build_form(seed);
    let presenter = LogPresenter::attach(&form);
    presenter.present();

    for node in form.items() {
        match node.kind() {
            ItemKind::Button => node.invoke()?,
            ItemKind::Custom(_) => {
                for _ in 0..rolls {
                    node.invoke()?;
                }
            }
            _ => {}
        }
    }

    info!(
        navigation = ?view_model.navigation(),
        number = view_model.random_number(),
        events = presenter.events(),
        "Menu walkthrough finished"
    );
    presenter.present();

    form.dispose();
    Ok(())
}

fn cmd_connection(config: &DemoConfig, password: &str, key: bool) -> Result<()> {
    let view_model = ConnectionViewModel::new(&config.connection);
    let screen = ConnectionScreen::new(view_model.clone(), config.picker_input_type()?);
    let presenter = LogPresenter::attach(&screen.form);
    presenter.present();

    screen.protocol.pick(Some(0))?;
    screen.options.pick(Some(1))?;
    if key {
        screen.auth.pick_value(AuthMethod::Key)?;
    } else {
        screen.password.set_value(password.to_string());
    }

    if !screen.form.is_valid() {
        presenter.present();
        anyhow::bail!("Connection form is still invalid");
    }

    FormNode::invoke(&screen.save)?;
    info!(
        host = %screen.host.value(),
        port = screen.port.value(),
        options = ?screen.options.value(),
        saved = view_model.saved(),
        events = presenter.events(),
        "Connection walkthrough finished"
    );
    presenter.present();

    Ok(())
}

fn cmd_config(config: &DemoConfig) -> Result<()> {
    print!("{}", config.to_toml()?);
    Ok(())
}
