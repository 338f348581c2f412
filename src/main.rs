use anyhow::Result;
use clap::Parser;

use simugen::app::App;
use simugen::cli::{Cli, Command};
use simugen::config::EngineConfig;
use simugen::{logging, ui};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let config = EngineConfig::load(cli.config.as_deref())?;
    let mut app = App::open(&config, cli.user.clone())?;

    for notification in app.drain_notifications() {
        ui::print_notification(&notification);
    }

    match cli.command {
        Command::Generate {
            simulado_id,
            titulo,
            total,
        } => {
            app.generate(&simulado_id, &titulo, total).await?;
        }
        Command::Resume { remote } => {
            app.resume(remote.as_deref()).await?;
        }
        Command::Cancel => {
            app.cancel().await?;
            println!("Geração cancelada.");
        }
        Command::Status { clear_finished } => {
            let state = app.status(clear_finished)?;
            ui::print_status(&state, app.registry().tasks());
        }
        Command::Pending => {
            let jobs = app.pending().await?;
            ui::print_pending(&jobs);
        }
    }

    Ok(())
}
