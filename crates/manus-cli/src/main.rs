//! manus - terminal client for a remote agent

mod commands;
mod config;
mod interrupt;
mod render;
mod utils;

use clap::Parser;
use manus_api::{ApiClient, ClientConfig};
use manus_session::{
    Applied, ChatSession, Delivery, Locale, RelativeClock, ToastBus, ToastKind, ToolRegistry,
};
use interrupt::Interrupt;
use render::Renderer;

/// manus - chat with a remote agent and watch it work
#[derive(Parser, Debug)]
#[command(name = "manus")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// API base URL (default: http://localhost:8000/api/v1)
    #[arg(long)]
    base_url: Option<String>,

    /// Attach to an existing agent instead of creating one
    #[arg(short, long)]
    agent: Option<String>,

    /// Run in non-interactive mode with a single message
    #[arg(short = 'c', long)]
    command: Option<String>,

    /// Print a shell session's output and exit (requires --agent)
    #[arg(long)]
    shell: Option<String>,

    /// Print a sandbox file and exit (requires --agent)
    #[arg(long)]
    file: Option<String>,

    /// Print the remote desktop URL and exit (requires --agent)
    #[arg(long)]
    vnc: bool,

    /// Display language (en, zh); saved to the config file
    #[arg(short, long)]
    locale: Option<String>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Initialize config file
    #[arg(long)]
    init_config: bool,
}

type Session = ChatSession<ApiClient>;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Setup tracing
    if args.verbose {
        tracing_subscriber::fmt()
            .with_env_filter("manus=debug")
            .with_writer(std::io::stderr)
            .init();
    }

    // Initialize config and exit
    if args.init_config {
        match config::Config::init() {
            Ok(path) => {
                println!("Config file created at: {}", path.display());
                println!("\nExample config:\n{}", config::example_config());
            }
            Err(e) => {
                eprintln!("Error creating config: {}", e);
                std::process::exit(1);
            }
        }
        return Ok(());
    }

    // Load config file
    let mut cfg = config::Config::load();

    // A locale given on the command line is remembered
    if let Some(ref code) = args.locale {
        let locale: Locale = code.parse().map_err(anyhow::Error::msg)?;
        if cfg.locale != Some(locale) {
            cfg.locale = Some(locale);
            if let Err(e) = cfg.save() {
                eprintln!("Warning: Failed to save locale: {}", e);
            }
        }
    }
    let locale = cfg.locale.unwrap_or_default();

    // Merge config with CLI args (CLI takes precedence)
    let base_url = args
        .base_url
        .or(cfg.base_url.clone())
        .unwrap_or_else(|| manus_api::client::DEFAULT_BASE_URL.to_string());

    let registry = ToolRegistry::builtin();
    registry.validate()?;
    let renderer = Renderer::new(registry, locale);

    let client = ApiClient::new(ClientConfig::new(base_url))?;
    tracing::debug!("Using backend {}", client.base_url());

    // Sandbox views for an existing agent
    if args.shell.is_some() || args.file.is_some() || args.vnc {
        let Some(agent_id) = args.agent else {
            anyhow::bail!("--shell, --file and --vnc require --agent <id>");
        };
        let session = ChatSession::with_agent(client, agent_id);
        if let Some(ref session_id) = args.shell {
            println!("{}", renderer.shell_view(&session.view_shell(session_id).await?));
        }
        if let Some(ref file) = args.file {
            println!("{}", renderer.file_view(&session.view_file(file).await?));
        }
        if args.vnc {
            println!("{}", session.vnc_url()?);
        }
        return Ok(());
    }

    let interrupt = Interrupt::install();

    // Non-interactive mode
    if let Some(command) = args.command {
        let mut session = match args.agent {
            Some(id) => ChatSession::with_agent(client, id),
            None => ChatSession::new(client),
        };
        if session.agent_id().is_none() {
            let agent = session.start().await?;
            eprintln!("agent: {}", agent.agent_id);
        }
        println!("manus> {}", command);
        println!();
        drive_turn(&mut session, &renderer, &interrupt, &command).await?;
        return Ok(());
    }

    // Interactive mode: failures are reported as toasts
    let toasts = ToastBus::new();
    let printer = spawn_toast_printer(&toasts);
    let mut session = match args.agent {
        Some(id) => ChatSession::with_agent(client, id),
        None => ChatSession::new(client),
    }
    .with_toasts(toasts);

    let result = run_interactive(&mut session, renderer, &interrupt, &mut cfg).await;
    printer.abort();
    result
}

/// Print toasts to stderr as they are published
fn spawn_toast_printer(toasts: &ToastBus) -> tokio::task::JoinHandle<()> {
    let mut receiver = toasts.subscribe();
    tokio::spawn(async move {
        use tokio::sync::broadcast::error::RecvError;
        loop {
            match receiver.recv().await {
                Ok(toast) => match toast.kind {
                    ToastKind::Error => eprintln!("[error] {}", toast.message),
                    ToastKind::Info => eprintln!("[info] {}", toast.message),
                },
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!("Toast printer skipped {} toasts", skipped);
                }
                Err(RecvError::Closed) => break,
            }
        }
    })
}

/// Send one message and print events until the turn ends or Ctrl-C
async fn drive_turn(
    session: &mut Session,
    renderer: &Renderer,
    interrupt: &Interrupt,
    message: &str,
) -> manus_session::Result<()> {
    let stopped = interrupt.stopped();
    tokio::pin!(stopped);
    interrupt.set_turn_running(true);

    let result = async {
        let mut subscription = session.send(message).await?;

        loop {
            tokio::select! {
                _ = &mut stopped => {
                    session.cancel_turn(&mut subscription);
                    println!("[Stopped]");
                    return Ok(());
                }
                delivery = subscription.next() => {
                    let Some(delivery) = delivery else {
                        break;
                    };
                    let event = match &delivery {
                        Delivery::Event(event) => Some(event.clone()),
                        Delivery::Failed(_) => None,
                    };
                    match session.handle(delivery)? {
                        Applied::Changed | Applied::TurnEnded => {
                            if let Some(event) = event {
                                println!("{}", renderer.event(&event));
                            }
                        }
                        Applied::Ignored => {}
                        Applied::Violation(violation) => {
                            tracing::debug!("Not shown: {}", violation);
                        }
                    }
                }
            }
        }

        session.end_turn();
        Ok::<(), manus_session::Error>(())
    }
    .await;

    interrupt.set_turn_running(false);
    result
}

async fn run_interactive(
    session: &mut Session,
    mut renderer: Renderer,
    interrupt: &Interrupt,
    cfg: &mut config::Config,
) -> anyhow::Result<()> {
    use std::io::{self, Write};

    let clock = RelativeClock::start();

    if session.agent_id().is_none() && session.start().await.is_err() {
        // Already reported; the user can retry with /new
        eprintln!("No agent yet. Type /new to retry.");
    }

    // Show minimal startup info (only if TTY)
    if std::io::IsTerminal::is_terminal(&std::io::stderr()) {
        let agent = session.agent_id().unwrap_or("none");
        eprintln!("manus (agent: {}, locale: {})", agent, renderer.catalog().locale());
        eprintln!("Type /help for commands.");
        eprintln!();
    }

    loop {
        print!("> ");
        io::stdout().flush()?;

        let mut input = String::new();
        if io::stdin().read_line(&mut input)? == 0 {
            // EOF
            break;
        }

        let input = input.trim();
        if input.is_empty() {
            continue;
        }

        // Handle slash commands
        if let Some(result) = commands::execute_command(input, renderer.catalog().locale()) {
            use commands::CommandResult;
            match result {
                CommandResult::Exit => break,
                CommandResult::Message(msg) => println!("{}", msg),
                CommandResult::Unknown(cmd) => {
                    println!("Unknown command: /{}", cmd);
                    println!("Type /help for available commands.");
                }
                CommandResult::NewAgent => {
                    if let Ok(agent) = session.start().await {
                        println!("Started agent {}", agent.agent_id);
                    }
                }
                CommandResult::ViewShell(id) => match session.view_shell(&id).await {
                    Ok(view) => println!("{}", renderer.shell_view(&view)),
                    Err(e) => eprintln!("Error: {}", e.user_message()),
                },
                CommandResult::ViewFile(path) => match session.view_file(&path).await {
                    Ok(view) => println!("{}", renderer.file_view(&view)),
                    Err(e) => eprintln!("Error: {}", e.user_message()),
                },
                CommandResult::ShowVnc => match session.vnc_url() {
                    Ok(url) => println!("{}", url),
                    Err(e) => eprintln!("Error: {}", e.user_message()),
                },
                CommandResult::ChangeLocale(locale) => {
                    renderer.set_locale(locale);
                    cfg.locale = Some(locale);
                    if let Err(e) = cfg.save() {
                        eprintln!("Warning: Failed to save locale: {}", e);
                    }
                    println!("Language set to: {}", locale.label());
                }
                CommandResult::ShowHistory => {
                    println!("{}", renderer.history(session.conversation(), clock.now()));
                }
                CommandResult::ShowTitle => {
                    let title = session
                        .conversation()
                        .title
                        .as_deref()
                        .unwrap_or_else(|| renderer.catalog().t("New conversation"));
                    println!("{}", title);
                }
            }
            continue;
        }

        match drive_turn(session, &renderer, interrupt, input).await {
            Ok(()) => println!(),
            // Transport failures were already shown as toasts
            Err(manus_session::Error::Api(_)) => {}
            Err(e) => eprintln!("Error: {}", e.user_message()),
        }
    }

    Ok(())
}
