use clap::Parser;
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

mod cli;

use crate::cli::{Cli, Command};
use tcr::engine::TcrEngine;
use tcr::params::Params;
use tcr::report;
use tcr::ui::terminal::Terminal;
use tcr::ui::UserInterface;
use tcr::RunMode;

fn run_mode_for(command: &Command) -> RunMode {
    match command {
        Command::Solo => RunMode::Solo,
        Command::Mob => RunMode::Mob,
        Command::OneShot => RunMode::OneShot,
    }
}

fn params_from(cli: &Cli) -> Params {
    let mut params = Params::new(run_mode_for(&cli.command));
    if let Some(dir) = &cli.base_dir {
        params.base_dir = dir.clone();
    }
    if let Some(toolchain) = &cli.toolchain {
        params.toolchain = toolchain.clone();
    }
    if let Some(language) = &cli.language {
        params.language = language.clone();
    }
    if let Some(auto_push) = cli.auto_push {
        params.auto_push = auto_push;
    }
    if let Some(polling) = cli.polling {
        params.polling_period = polling;
    }
    if let Some(duration) = cli.duration {
        params.mob_turn_duration = duration;
    }
    params
}

fn main() -> ExitCode {
    // Load environment variables from .env if present (no error if missing)
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    if let Some(mode) = cli.color {
        tcr::set_color_mode(mode);
    }

    // Internal diagnostics only; user-visible output goes through the
    // report bus rendered by the terminal.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_env("TCR_LOG").unwrap_or_else(|_| EnvFilter::new("off")))
        .with_writer(std::io::stderr)
        .init();

    let params = params_from(&cli);
    let mode = params.mode;

    let ui = Terminal::new();
    let engine = match TcrEngine::init(ui.clone() as Arc<dyn UserInterface>, params) {
        Ok(Some(engine)) => engine,
        // User declined to run on a root branch: clean exit
        Ok(None) => return ExitCode::SUCCESS,
        Err(e) => {
            report::post_error(e.to_string());
            return ExitCode::from(e.status().exit_code());
        }
    };
    ui.attach(Arc::clone(&engine));

    let code = match mode {
        RunMode::OneShot => {
            engine.run_tcr_cycle();
            engine.quit()
        }
        _ => {
            ui.start();
            engine.quit()
        }
    };
    ExitCode::from(code)
}
