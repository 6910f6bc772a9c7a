use std::path::PathBuf;

use clap::{Parser, Subcommand};
use clap_complete::Shell;

use crate::config::FolioConfig;
use crate::traffic::{Theme, MAX_DIMENSION};

#[derive(Parser)]
#[command(name = "traffic-portfolio")]
#[command(version)]
#[command(about = "Traffic backdrop and research-assistant chat for a transport researcher's portfolio")]
pub struct Args {
    /// Optional TOML config file ([assistant], [traffic], [server])
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Talk to the research assistant (interactive unless a question is given)
    Chat {
        /// Ask a single question and exit
        question: Option<String>,

        /// Override the configured model
        #[arg(long)]
        model: Option<String>,
    },

    /// Run the traffic backdrop headless and print a JSON report
    Simulate {
        #[arg(long, default_value = "1280", value_parser = parse_dimension)]
        width: f64,

        #[arg(long, default_value = "720", value_parser = parse_dimension)]
        height: f64,

        /// Number of frames to simulate
        #[arg(long, default_value = "600")]
        ticks: u32,

        /// Pointer x position (requires --pointer-y)
        #[arg(long, requires = "pointer_y")]
        pointer_x: Option<f64>,

        /// Pointer y position (requires --pointer-x)
        #[arg(long, requires = "pointer_x")]
        pointer_y: Option<f64>,

        /// RNG seed for a reproducible run
        #[arg(long)]
        seed: Option<u64>,

        #[arg(long, value_enum)]
        theme: Option<Theme>,

        /// Include the final frame's draw commands in the output
        #[arg(long)]
        frame: bool,

        /// Write JSON here instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Run the live redraw loop for a while, printing a status line each second
    Animate {
        #[arg(long, default_value = "1280", value_parser = parse_dimension)]
        width: f64,

        #[arg(long, default_value = "720", value_parser = parse_dimension)]
        height: f64,

        /// How long to run
        #[arg(long, default_value = "5")]
        seconds: u64,

        /// Override the configured frame rate
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..=240))]
        fps: Option<u32>,

        /// Pointer x position (requires --pointer-y)
        #[arg(long, requires = "pointer_y")]
        pointer_x: Option<f64>,

        /// Pointer y position (requires --pointer-x)
        #[arg(long, requires = "pointer_x")]
        pointer_y: Option<f64>,

        #[arg(long)]
        seed: Option<u64>,

        #[arg(long, value_enum)]
        theme: Option<Theme>,
    },

    /// Serve the chat widget, traffic frames and profile tables as a local JSON API
    Serve {
        /// Port for the HTTP server
        #[arg(long)]
        port: Option<u16>,
    },

    /// Print the profile tables
    Profile {
        /// Print JSON instead of formatted text
        #[arg(long)]
        json: bool,
    },

    /// Generate shell completion scripts
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Viewport width or height: a finite number in `0..=MAX_DIMENSION`.
fn parse_dimension(raw: &str) -> Result<f64, String> {
    let v: f64 = raw.parse().map_err(|_| format!("'{raw}' is not a number"))?;
    if !v.is_finite() || !(0.0..=MAX_DIMENSION).contains(&v) {
        return Err(format!("must be between 0 and {MAX_DIMENSION}"));
    }
    Ok(v)
}

/// Fold command-line overrides into the file/default config.
pub fn apply_overrides(mut cfg: FolioConfig, command: &Command) -> FolioConfig {
    match command {
        Command::Chat { model: Some(m), .. } => cfg.assistant.model = m.clone(),
        Command::Simulate { theme: Some(t), .. } => cfg.traffic.theme = *t,
        Command::Animate { theme, fps, .. } => {
            if let Some(t) = theme {
                cfg.traffic.theme = *t;
            }
            if let Some(f) = fps {
                cfg.traffic.fps = *f;
            }
        }
        Command::Serve { port: Some(p) } => cfg.server.port = *p,
        _ => {}
    }
    cfg
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_args_parse_chat_interactive() {
        let args = Args::parse_from(["tp", "chat"]);
        assert!(matches!(args.command, Command::Chat { question: None, model: None }));
        assert!(args.config.is_none());
    }

    #[test]
    fn test_args_parse_chat_one_shot() {
        let args = Args::parse_from(["tp", "chat", "What is your PhD topic?"]);
        match args.command {
            Command::Chat { question, .. } => {
                assert_eq!(question.as_deref(), Some("What is your PhD topic?"))
            }
            _ => panic!("expected chat"),
        }
    }

    #[test]
    fn test_args_parse_simulate_defaults() {
        let args = Args::parse_from(["tp", "simulate"]);
        match args.command {
            Command::Simulate { width, height, ticks, pointer_x, seed, frame, .. } => {
                assert_eq!(width, 1280.0);
                assert_eq!(height, 720.0);
                assert_eq!(ticks, 600);
                assert!(pointer_x.is_none());
                assert!(seed.is_none());
                assert!(!frame);
            }
            _ => panic!("expected simulate"),
        }
    }

    #[test]
    fn test_args_pointer_requires_both_axes() {
        assert!(Args::try_parse_from(["tp", "simulate", "--pointer-x", "10"]).is_err());
        assert!(Args::try_parse_from(["tp", "simulate", "--pointer-x", "10", "--pointer-y", "20"]).is_ok());
    }

    #[test]
    fn test_args_theme_value_enum() {
        let args = Args::parse_from(["tp", "simulate", "--theme", "dark"]);
        assert!(matches!(args.command, Command::Simulate { theme: Some(Theme::Dark), .. }));
        assert!(Args::try_parse_from(["tp", "simulate", "--theme", "sepia"]).is_err());
    }

    #[test]
    fn test_args_global_config_after_subcommand() {
        let args = Args::parse_from(["tp", "serve", "--config", "folio.toml"]);
        assert_eq!(args.config, Some(PathBuf::from("folio.toml")));
    }

    #[test]
    fn test_overrides_port_and_model() {
        let cfg = apply_overrides(FolioConfig::default(), &Command::Serve { port: Some(9100) });
        assert_eq!(cfg.server.port, 9100);
        let cmd = Command::Chat { question: None, model: Some("gemini-x".into()) };
        let cfg = apply_overrides(FolioConfig::default(), &cmd);
        assert_eq!(cfg.assistant.model, "gemini-x");
    }

    #[test]
    fn test_overrides_absent_keep_config() {
        let cfg = apply_overrides(FolioConfig::default(), &Command::Serve { port: None });
        assert_eq!(cfg, FolioConfig::default());
    }

    #[test]
    fn test_args_animate_fps_range() {
        assert!(Args::try_parse_from(["tp", "animate", "--fps", "0"]).is_err());
        assert!(Args::try_parse_from(["tp", "animate", "--fps", "500"]).is_err());
        let args = Args::parse_from(["tp", "animate", "--fps", "30", "--theme", "dark"]);
        let cfg = apply_overrides(FolioConfig::default(), &args.command);
        assert_eq!(cfg.traffic.fps, 30);
        assert_eq!(cfg.traffic.theme, Theme::Dark);
    }

    #[rstest]
    #[case::simulate_inf_width(&["tp", "simulate", "--width", "inf"])]
    #[case::simulate_nan_height(&["tp", "simulate", "--height", "NaN"])]
    #[case::animate_huge_height(&["tp", "animate", "--height", "1e12"])]
    #[case::animate_negative_width(&["tp", "animate", "--width", "-10"])]
    fn test_args_reject_bad_dimensions(#[case] argv: &[&str]) {
        assert!(Args::try_parse_from(argv.iter().copied()).is_err());
    }

    #[test]
    fn test_args_accept_max_dimension() {
        let args = Args::parse_from(["tp", "animate", "--width", "8192", "--height", "0"]);
        assert!(matches!(args.command, Command::Animate { width, height, .. } if width == 8192.0 && height == 0.0));
    }

    #[test]
    fn test_args_completions_shell() {
        let args = Args::parse_from(["tp", "completions", "bash"]);
        assert!(matches!(args.command, Command::Completions { shell: Shell::Bash }));
    }
}
