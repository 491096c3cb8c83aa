use clap::Parser;
use color_eyre::Result;
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io;
use trailhead::{app::App, config::Config, events::EventHandler, logging, ui};
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "trailhead")]
#[command(about = "Live location tracker with a path trail and reverse-geocoded popups", long_about = None)]
struct Args {
    /// Config file; defaults are written here if it is missing
    #[arg(long, default_value = "config.toml")]
    config: String,

    /// Keep the path in memory only
    #[arg(long, default_value_t = false)]
    no_persist: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Instrumentation and safety
    let _log_guard = logging::initialize_logging("logs");
    install_panic_hook();
    color_eyre::install()?;

    let args = Args::parse();
    let config = Config::load_from(&args.config);

    // Ready terminal and state
    let mut terminal = setup_terminal()?;
    let mut events = EventHandler::new(config.ui.tick_rate_ms);
    let mut app = match App::new(&config, events.tx.clone(), !args.no_persist) {
        Ok(app) => app,
        Err(e) => {
            restore_terminal(terminal)?;
            return Err(e);
        }
    };
    app.start_tracking();

    // Main loop
    while !app.should_quit {
        terminal.draw(|f| ui::render(f, &app))?;

        match events.next().await {
            Some(event) => app.handle_event(event),
            None => break,
        }
    }

    info!("Shutting down");
    restore_terminal(terminal)?;
    Ok(())
}

fn setup_terminal() -> Result<Terminal<CrosstermBackend<io::Stdout>>> {
    crossterm::terminal::enable_raw_mode()?;
    let mut stdout = io::stdout();
    crossterm::execute!(stdout, crossterm::terminal::EnterAlternateScreen, crossterm::cursor::Hide)?;
    Ok(Terminal::new(CrosstermBackend::new(stdout))?)
}

fn restore_terminal(mut terminal: Terminal<CrosstermBackend<io::Stdout>>) -> Result<()> {
    crossterm::terminal::disable_raw_mode()?;
    crossterm::execute!(terminal.backend_mut(), crossterm::terminal::LeaveAlternateScreen, crossterm::cursor::Show)?;
    Ok(())
}

fn install_panic_hook() {
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        // Force terminal cleanup!
        crossterm::terminal::disable_raw_mode().ok();
        crossterm::execute!(std::io::stdout(), crossterm::terminal::LeaveAlternateScreen, crossterm::cursor::Show).ok();
        original_hook(panic_info);
    }));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = Args::try_parse_from(["trailhead"]).unwrap();
        assert_eq!(args.config, "config.toml");
        assert!(!args.no_persist);
    }

    #[test]
    fn test_flags() {
        let args = Args::try_parse_from(["trailhead", "--config", "walk.toml", "--no-persist"]).unwrap();
        assert_eq!(args.config, "walk.toml");
        assert!(args.no_persist);
    }

    #[test]
    fn test_bad_arguments_are_rejected() {
        assert!(Args::try_parse_from(["trailhead", "--config"]).is_err());
        assert!(Args::try_parse_from(["trailhead", "--persist"]).is_err());
        assert!(Args::try_parse_from(["trailhead", "extra"]).is_err());
    }
}
