use clap::{CommandFactory, Parser};
use colored::*;
use tracing_subscriber::EnvFilter;

use traffic_portfolio::cli::{apply_overrides, Args, Command};
use traffic_portfolio::config::FolioConfig;
use std::time::Duration;

use traffic_portfolio::headless::{run_simulation, SimulationOptions};
use traffic_portfolio::traffic::Viewport;
use traffic_portfolio::{
    terminal, web, ChatWidget, GeminiGenerator, SchedulerConfig, TrafficSurface,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = FolioConfig::load_or_default(args.config.as_deref())?;
    let config = apply_overrides(config, &args.command);

    match args.command {
        Command::Chat { question, .. } => {
            let generator = GeminiGenerator::from_env(config.assistant.clone());
            if !generator.has_credential() {
                tracing::warn!("no GEMINI_API_KEY or API_KEY set; requests will fail");
            }
            let chat = ChatWidget::new(generator);
            match question {
                Some(q) => {
                    terminal::one_shot(&chat, &q).await;
                }
                None => terminal::run_repl(&chat, &config.assistant.model).await?,
            }
        }

        Command::Simulate {
            width,
            height,
            ticks,
            pointer_x,
            pointer_y,
            seed,
            frame,
            output,
            ..
        } => {
            let opts = SimulationOptions {
                viewport: Viewport::new(width, height),
                ticks,
                pointer: pointer_x.zip(pointer_y),
                seed,
                theme: config.traffic.theme,
            };
            let run = run_simulation(&opts);
            let json = if frame {
                serde_json::to_string_pretty(
                    &serde_json::json!({ "report": run.report, "frame": run.frame }),
                )?
            } else {
                serde_json::to_string_pretty(&run.report)?
            };
            match output {
                Some(path) => {
                    std::fs::write(&path, json)?;
                    eprintln!(
                        "{}",
                        format!("[simulate] wrote {}", path.display()).bright_green()
                    );
                }
                None => println!("{json}"),
            }
        }

        Command::Animate {
            width,
            height,
            seconds,
            pointer_x,
            pointer_y,
            seed,
            ..
        } => {
            let viewport = Viewport::new(width, height);
            let surface = match seed {
                Some(seed) => TrafficSurface::with_seed(viewport, seed),
                None => TrafficSurface::new(viewport),
            };
            let scheduler = SchedulerConfig {
                fps: config.traffic.fps,
                theme: config.traffic.theme,
            };
            let rendered = terminal::run_animation(
                surface,
                scheduler,
                pointer_x.zip(pointer_y),
                Duration::from_secs(seconds),
            )
            .await;
            eprintln!(
                "{}",
                format!("[animate] {rendered} frames in {seconds}s").bright_green()
            );
        }

        Command::Serve { .. } => {
            let generator = GeminiGenerator::from_env(config.assistant.clone());
            if !generator.has_credential() {
                tracing::warn!("no GEMINI_API_KEY or API_KEY set; chat requests will fail");
            }
            eprintln!(
                "{}",
                format!("  Portfolio API running at http://localhost:{}", config.server.port)
                    .bright_green()
            );
            eprintln!("{}", "  Press Ctrl+C to stop.".bright_blue());
            web::serve(config.server.port, ChatWidget::new(generator), config.traffic.theme)
                .await?;
        }

        Command::Profile { json } => {
            let profile = traffic_portfolio::profile::profile();
            if json {
                println!("{}", serde_json::to_string_pretty(profile)?);
            } else {
                terminal::print_profile(profile);
            }
        }

        Command::Completions { shell } => {
            let mut cmd = Args::command();
            let name = cmd.get_name().to_string();
            clap_complete::generate(shell, &mut cmd, name, &mut std::io::stdout());
        }
    }

    Ok(())
}
