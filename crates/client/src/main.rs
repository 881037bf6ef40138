//! `panel` command-line front end.
//!
//! Every invocation restores the stored session, performs one action, and
//! prints the resulting screen. The session survives between invocations
//! through the file-backed local storage.

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};

use panel_client::{Dashboard, PanelConfig, RegisterForm, RouteOutcome, Screen, Section};
use panel_observability::{LogFormat, ObservabilityConfig};

#[derive(Parser)]
#[command(name = "panel")]
#[command(version)]
#[command(about = "Emoji panel administration client")]
struct Cli {
    /// Path to the JSON config document (`apiUrl`, `apiSecret`, `storagePath`)
    #[arg(long, env = "PANEL_CONFIG", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log output format
    #[arg(long, default_value = "pretty", value_name = "FORMAT")]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Restores the stored session and shows the landing view
    Status,
    /// Logs in and stores the session credential
    Login {
        #[arg(long)]
        username: String,
        #[arg(long, env = "PANEL_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Forgets the stored session
    Logout,
    /// Creates an account (does not log in)
    Register {
        #[arg(long)]
        username: String,
        #[arg(long)]
        email: String,
        #[arg(long, env = "PANEL_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Opens a view by location, e.g. `#users`
    Navigate {
        #[arg(value_name = "LOCATION")]
        location: String,
    },
    /// Accepts the usage rules on this device
    AcceptRules,
    /// Deletes the logged-in account
    DeleteAccount {
        /// Confirms the deletion; nothing is sent without it
        #[arg(long)]
        yes: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    panel_observability::init(&ObservabilityConfig {
        format: cli.log_format,
        filter: None,
    });

    let config = PanelConfig::from_env(cli.config.as_deref()).context("loading configuration")?;
    let dashboard = Dashboard::from_config(&config).context("starting dashboard")?;

    match cli.command {
        Command::Status => settle(dashboard.startup("").await).await,
        Command::Navigate { location } => settle(dashboard.startup(&location).await).await,
        Command::Login { username, password } => {
            match dashboard.login(&username, &password).await {
                Ok(outcome) => settle(outcome).await,
                Err(err) => eprintln!("{}", err.inline_message()),
            }
        }
        Command::Logout => {
            dashboard.logout();
        }
        Command::Register {
            username,
            email,
            password,
        } => {
            dashboard.show_register();
            let mut form = RegisterForm::new(username, email, password);
            if let Err(err) = dashboard.register(&mut form).await {
                eprintln!("{}", err.inline_message());
            }
        }
        Command::AcceptRules => {
            dashboard.startup("").await;
            settle(dashboard.accept_consent()?).await;
        }
        Command::DeleteAccount { yes } => {
            settle(dashboard.startup("").await).await;
            let confirm = |_: &str| yes;
            if let Err(err) = dashboard.delete_account(&confirm).await {
                eprintln!("{}", err.inline_message());
            }
        }
    }

    print_screen(&dashboard.screen());
    Ok(())
}

async fn settle(outcome: RouteOutcome) {
    for (target, result) in outcome.settle().await {
        if let Err(err) = result {
            eprintln!("could not load {target}: {}", err.inline_message());
        }
    }
}

fn print_screen(screen: &Screen) {
    match screen.layout.section {
        Some(Section::Login) => println!("[login]"),
        Some(Section::Register) => println!("[register]"),
        Some(Section::Page(view)) => println!("[{}]", view.location()),
        None => println!("[dashboard]"),
    }

    if let Some(identity) = &screen.identity {
        println!("user: {} (id {})", identity.username, identity.id);
    }
    if screen.rules_prompt_open {
        println!("usage rules must be accepted first: panel accept-rules");
    }
    for message in [
        &screen.notices.login_error,
        &screen.notices.register_error,
        &screen.notices.register_success,
    ]
    .into_iter()
    .flatten()
    {
        println!("{message}");
    }

    if let Some(emojis) = &screen.data.emojis {
        println!("emojis ({}):", emojis.len());
        for emoji in emojis {
            println!("  {:>5}  {}  {}", emoji.id, emoji.name, emoji.web_address);
        }
    }
    if let Some(users) = &screen.data.users {
        println!("users ({}):", users.len());
        for user in users {
            let role = panel_auth::Role::from_flags(user.roles);
            println!("  {:>5}  {}  {}", user.id, user.username, role);
        }
    }
    if let Some(domains) = &screen.data.blocked_domains {
        println!("blocked domains ({}):", domains.len());
        for domain in domains {
            println!("  {domain}");
        }
    }
    if let Some(requests) = &screen.data.emoji_requests {
        println!("emoji requests ({}):", requests.len());
        for request in requests {
            println!(
                "  {:>5}  {}  {}  {}",
                request.id,
                request.username.as_deref().unwrap_or("-"),
                request.emoji_name.as_deref().unwrap_or("-"),
                request.vm_node_id
            );
        }
    }
}
