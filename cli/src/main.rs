//! MailRoute CLI — send email through whichever provider currently scores best.
//!
//! # Commands
//! ```text
//! mailroute send      --to <addr>... --subject <text> --body <text> [--html]
//! mailroute providers
//! mailroute simulate  --scenario outage|degraded|random|healthy [--compare]
//! ```

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use mailroute_core::{ContentType, Dispatcher, Email, Mailbox};

mod cmd_simulate;
mod config;
mod logging;
mod retry;

use cmd_simulate::{Scenario, SimulationConfig};
use config::MailrouteConfig;

#[derive(Parser)]
#[command(
    name = "mailroute",
    about = "Adaptive email dispatcher — MailRoute CLI",
    long_about = "
MailRoute sends each email through the registered provider with the best
current score. Providers that fail lose score and recover after five
minutes without failures.

ENVIRONMENT VARIABLES:
  SENDGRID_API_KEY         Registers SendGrid
  MANDRILL_API_KEY         Registers Mandrill
  MAILROUTE_SENDER_EMAIL   Default sender address
  MAILROUTE_SENDER_NAME    Default sender display name
",
    version
)]
struct Cli {
    /// YAML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Send one email, retrying retryable failures
    Send {
        /// Recipient address (repeatable)
        #[arg(long, required = true, num_args = 1..)]
        to: Vec<String>,
        /// Sender address (default: configured sender)
        #[arg(long)]
        from: Option<String>,
        /// Sender display name
        #[arg(long)]
        from_name: Option<String>,
        #[arg(long)]
        subject: String,
        #[arg(long)]
        body: String,
        /// Send the body as text/html
        #[arg(long)]
        html: bool,
        /// Total attempts (default: configured)
        #[arg(long)]
        attempts: Option<u32>,
        /// Seconds between attempts (default: configured)
        #[arg(long)]
        retry_delay: Option<u64>,
        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },

    /// List configured providers with their configured base scores.
    ///
    /// Scores live in memory, so a fresh process always starts at base;
    /// `*` marks the provider a first send would use.
    Providers,

    /// Simulate the scoring algorithm against a failure scenario
    Simulate {
        #[arg(long, value_enum, default_value_t = Scenario::Outage)]
        scenario: Scenario,
        /// Virtual run time in seconds
        #[arg(long, default_value_t = 1800)]
        duration: u64,
        /// Messages per second
        #[arg(long, default_value_t = 10)]
        rate: u32,
        /// Base score of the always-healthy alternative (0 = none)
        #[arg(long, default_value_t = 40.0)]
        alternative_base: f64,
        /// Order providers at random instead of by score
        #[arg(long)]
        no_scoring: bool,
        /// Also run with scoring disabled and print both failure rates
        #[arg(long)]
        compare: bool,
        /// Print the per-minute score trace
        #[arg(long)]
        trace: bool,
        /// Run every scenario
        #[arg(long)]
        all: bool,
        #[arg(long, default_value_t = 0)]
        seed: u64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = MailrouteConfig::load(cli.config.as_deref())?;
    if cli.verbose {
        config.log.level = "debug".into();
    } else if matches!(cli.command, Commands::Simulate { .. }) {
        // Every simulated failure would log a warning.
        config.log.level = "error".into();
    }
    logging::init_tracing(&config.log);

    match cli.command {
        Commands::Send {
            to,
            from,
            from_name,
            subject,
            body,
            html,
            attempts,
            retry_delay,
            json,
        } => {
            let sender = match from {
                Some(address) => Mailbox {
                    address,
                    name: from_name,
                },
                None => {
                    let mut mailbox = config.sender.mailbox();
                    if from_name.is_some() {
                        mailbox.name = from_name;
                    }
                    mailbox
                }
            };
            let content_type = if html { ContentType::Html } else { ContentType::Plain };
            let email = Email::compose(
                sender,
                to.into_iter().map(Mailbox::new).collect(),
                subject,
                body,
                content_type.as_mime(),
            )?;

            let mut schedule = config.retry.schedule();
            if let Some(attempts) = attempts {
                schedule.attempts = attempts;
            }
            if let Some(secs) = retry_delay {
                schedule.delay = Duration::from_secs(secs);
            }
            cmd_send(&config, &email, schedule, json).await
        }

        Commands::Providers => cmd_providers(&config),

        Commands::Simulate {
            scenario,
            duration,
            rate,
            alternative_base,
            no_scoring,
            compare,
            trace,
            all,
            seed,
        } => {
            let scenarios = if all { Scenario::ALL.to_vec() } else { vec![scenario] };
            for (i, scenario) in scenarios.into_iter().enumerate() {
                if i > 0 {
                    println!();
                }
                let sim = SimulationConfig {
                    scenario,
                    duration: Duration::from_secs(duration),
                    rate,
                    alternative_base_score: alternative_base,
                    disable_scoring: no_scoring,
                    seed,
                    ..Default::default()
                };
                cmd_simulate::run(sim, compare, trace).await?;
            }
            Ok(())
        }
    }
}

// ─── Command implementations ─────────────────────────────────────────────────

async fn cmd_send(
    config: &MailrouteConfig,
    email: &Email,
    schedule: retry::RetrySchedule,
    as_json: bool,
) -> Result<()> {
    let dispatcher = config.build_dispatcher()?;
    let result = retry::deliver(&dispatcher, email, schedule)
        .await
        .context("email not delivered")?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!("Provider:  {}", result.provider);
        for (address, delivered) in &result.delivered {
            let status = if *delivered { "delivered" } else { "rejected" };
            println!("  {address}: {status}");
        }
    }
    Ok(())
}

fn cmd_providers(config: &MailrouteConfig) -> Result<()> {
    let dispatcher = config.build_dispatcher()?;
    for line in providers_table(&dispatcher, &config.sender.mailbox())? {
        println!("{line}");
    }
    Ok(())
}

fn providers_table(dispatcher: &Dispatcher, sender: &Mailbox) -> Result<Vec<String>> {
    if dispatcher.is_empty() {
        return Ok(vec!["No providers configured.".to_string()]);
    }

    let selected = dispatcher.select()?;
    let mut lines = vec![format!("{:<12} {:>7}", "PROVIDER", "BASE")];
    for (name, score) in dispatcher.scores() {
        let marker = if name == selected.name() { " *" } else { "" };
        lines.push(format!("{name:<12} {score:>7.2}{marker}"));
    }
    lines.push(String::new());
    lines.push("* first pick while every provider is at its base score".to_string());
    lines.push(format!("Default sender: {sender}"));
    Ok(lines)
}
