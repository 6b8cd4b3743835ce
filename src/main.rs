use clap::{Parser, Subcommand, ValueEnum};
use dm_courier::{BrowserSession, Channel, Config, Courier, DecisionResponse, Handoff, PageDom};
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "dm-courier")]
#[command(about = "Deliver a pre-composed direct message through the web client")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Verbose output (-v for info, -vv for debug)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Quiet mode (only errors)
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Open the conversation and send the message
    Deliver {
        /// Workspace (team) id
        #[arg(long)]
        team: String,

        /// Recipient user id
        #[arg(long)]
        recipient: String,

        /// Message text (overrides the decision's message)
        #[arg(long)]
        message: Option<String>,

        /// Saved `POST /decision` response body
        #[arg(long, value_name = "FILE")]
        decision: Option<PathBuf>,

        /// How the payload reaches the page
        #[arg(long, value_enum, default_value_t = ChannelArg::Both)]
        channel: ChannelArg,

        /// Config file
        #[arg(long, value_name = "FILE")]
        config: Option<PathBuf>,

        /// Run in headless mode (overrides config)
        #[arg(long)]
        headless: bool,
    },

    /// Print the hand-off URLs without opening a browser
    Link {
        #[arg(long)]
        team: String,

        #[arg(long)]
        recipient: String,

        #[arg(long)]
        message: String,

        #[arg(long, value_name = "FILE")]
        config: Option<PathBuf>,
    },

    /// Validate a config file
    Check {
        #[arg(value_name = "FILE")]
        config: PathBuf,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum ChannelArg {
    Query,
    Session,
    Both,
}

impl From<ChannelArg> for Channel {
    fn from(arg: ChannelArg) -> Self {
        match arg {
            ChannelArg::Query => Channel::Query,
            ChannelArg::Session => Channel::Session,
            ChannelArg::Both => Channel::Both,
        }
    }
}

fn load_config(path: Option<&PathBuf>) -> dm_courier::Result<Config> {
    match path {
        Some(path) => Config::load(path),
        None => Ok(Config::default()),
    }
}

#[tokio::main]
async fn main() -> dm_courier::Result<()> {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let level = if cli.quiet {
        Level::ERROR
    } else {
        match cli.verbose {
            0 => Level::WARN,
            1 => Level::INFO,
            _ => Level::DEBUG,
        }
    };

    FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .init();

    match cli.command {
        Command::Check { config } => {
            let config = Config::load(&config)?;
            println!("Config valid");
            println!("  Selectors: {}", config.selectors.revision());
            for target in dm_courier::Target::ALL {
                println!("    - {}: {}", target, config.selectors.get(target).len());
            }
            println!("  Attempts: {}", config.attempt_budget());
            println!("  Warm-up: {}ms", config.timings.warmup_ms);
            println!("  Composer timeout: {}ms", config.timings.composer_timeout_ms);
            println!(
                "  Resolver bound: {}ms",
                config.timings.resolver_attempt_bound().as_millis() * config.attempt_budget() as u128
            );
            Ok(())
        }

        Command::Link {
            team,
            recipient,
            message,
            config,
        } => {
            let config = load_config(config.as_ref())?;
            let handoff = Handoff::new(team, recipient, message);
            println!("{}", handoff.web_url(&config.payload)?);
            println!("{}", handoff.deep_link()?);
            Ok(())
        }

        Command::Deliver {
            team,
            recipient,
            message,
            decision,
            channel,
            config,
            headless,
        } => {
            let mut config = load_config(config.as_ref())?;
            if headless {
                config.browser.headless = true;
            }

            let handoff = match decision {
                Some(path) => {
                    let resp = DecisionResponse::load(&path)?;
                    match Handoff::from_decision(resp, team, recipient) {
                        Some(mut handoff) => {
                            if let Some(message) = message {
                                handoff.message = message;
                            }
                            handoff
                        }
                        None => {
                            println!("Decision does not open a conversation, nothing to deliver");
                            return Ok(());
                        }
                    }
                }
                None => {
                    let message = message.ok_or_else(|| {
                        dm_courier::Error::Config("--message is required without --decision".into())
                    })?;
                    Handoff::new(team, recipient, message)
                }
            };

            println!("Delivering to: {}", handoff.recipient_id);

            let session = BrowserSession::launch(&config.browser).await?;
            session
                .open(&handoff, &config.payload, channel.into())
                .await?;
            let dom = PageDom::new(session.page());
            let report = Courier::new(&dom, &config).run().await;

            // Print result
            println!();
            if report.sent {
                println!("✓ Sent");
                if let Some(path) = report.send_path {
                    println!("  Via: {:?}", path);
                }
            } else {
                println!("✗ Not sent");
                if let Some(reason) = report.reason {
                    println!("  Reason: {}", reason);
                }
                println!("  Stopped at: {}", report.history.iter().rev().nth(1).unwrap_or(&report.state));
            }
            if let Some(resolution) = report.resolution {
                println!("  Recipient: {:?}", resolution);
            }
            println!("  Duration: {}ms", report.duration_ms);

            session.close().await?;

            if !report.sent {
                std::process::exit(1);
            }

            Ok(())
        }
    }
}
