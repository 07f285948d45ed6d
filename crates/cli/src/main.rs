use std::sync::Arc;

use abg_core::{
    classify, render,
    config::{
        auth_policy_from_env_value, gateway_mode_from_env_value, gateway_timeout_from_env_value,
        history_dir_from_env_value,
    },
    validate, AbgError, AbgParameter, AnalysisOrchestrator, AnalysisResult, Connectivity,
    CoreConfig, FixedIdentity, RawAbgInput,
};
use abg_types::{Identity, NonEmptyText};
use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "abg")]
#[command(about = "Arterial blood gas interpreter CLI")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Panel values. Omitted values take a normal default.
#[derive(Args, Debug, Clone, Copy)]
struct Values {
    /// Arterial pH
    #[arg(long, default_value_t = 7.4, allow_negative_numbers = true)]
    ph: f64,
    /// Partial pressure of CO2 (mmHg)
    #[arg(long, default_value_t = 40.0, allow_negative_numbers = true)]
    pco2: f64,
    /// Bicarbonate (mEq/L)
    #[arg(long, default_value_t = 24.0, allow_negative_numbers = true)]
    hco3: f64,
    /// Partial pressure of O2 (mmHg)
    #[arg(long, default_value_t = 95.0, allow_negative_numbers = true)]
    pao2: f64,
    /// Base excess (mEq/L)
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    be: f64,
}

impl From<Values> for RawAbgInput {
    fn from(v: Values) -> Self {
        RawAbgInput {
            ph: v.ph,
            pco2: v.pco2,
            hco3: v.hco3,
            pao2: v.pao2,
            base_excess: v.be,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Show normal and accepted ranges for each parameter
    Ranges,
    /// Classify a panel locally, without remote analysis or history
    Classify {
        #[command(flatten)]
        values: Values,
    },
    /// Run a full analysis and record it in the user's history
    Analyse {
        #[command(flatten)]
        values: Values,
        /// User id to analyse as
        #[arg(long)]
        user: Option<String>,
        /// Treat the user as a guest; guest analyses are not recorded
        #[arg(long, requires = "user")]
        guest: bool,
        /// Skip the inference service
        #[arg(long)]
        offline: bool,
    },
    /// List a user's analyses, newest first
    History {
        /// User id
        #[arg(long)]
        user: String,
    },
}

fn config_from_env() -> anyhow::Result<CoreConfig> {
    Ok(CoreConfig::new(
        history_dir_from_env_value(std::env::var("ABG_HISTORY_DIR").ok()),
        std::env::var("ABG_GATEWAY_URL").ok(),
        gateway_mode_from_env_value(std::env::var("ABG_GATEWAY_MODE").ok())?,
        gateway_timeout_from_env_value(std::env::var("ABG_GATEWAY_TIMEOUT_SECS").ok())?,
        auth_policy_from_env_value(std::env::var("ABG_AUTH_POLICY").ok())?,
    )?)
}

fn print_result(result: &AnalysisResult) {
    println!("ID: {}", result.id);
    println!("Time: {}", result.timestamp);
    println!("Interpretation: {}", result.interpretation);
    println!("Possible conditions: {}", result.possible_conditions);
    let items = result.treatment_items();
    if items.is_empty() {
        println!("Treatment: {}", result.treatment_recommendations);
    } else {
        println!("Treatment:");
        for item in items {
            println!("  - {item}");
        }
    }
}

fn print_rejection(err: &AbgError) {
    match err {
        AbgError::Validation(v) => {
            eprintln!("Invalid input. Please check the values and try again.");
            for violation in &v.violations {
                eprintln!("  {violation}");
            }
        }
        AbgError::AuthRequired => {
            eprintln!("Sign in required: pass --user, or use --offline for a local analysis.")
        }
        other => eprintln!("Error: {other}"),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Ranges) => {
            for param in AbgParameter::ALL {
                let range = param.range();
                let normal = range
                    .normal
                    .map(|b| format!("{} - {}", b.min, b.max))
                    .unwrap_or_else(|| "-".into());
                println!(
                    "{:<5} normal: {:<12} accepted: {} - {} {}",
                    param.label(),
                    normal,
                    range.valid.min,
                    range.valid.max,
                    param.unit().unwrap_or("")
                );
            }
        }
        Some(Commands::Classify { values }) => match validate(&values.into()) {
            Ok(reading) => println!("{}", render(&classify(&reading))),
            Err(e) => print_rejection(&AbgError::Validation(e)),
        },
        Some(Commands::Analyse {
            values,
            user,
            guest,
            offline,
        }) => {
            let identity = match user {
                Some(id) => {
                    let id = NonEmptyText::new(id)?;
                    Some(if guest {
                        Identity::transient(id)
                    } else {
                        Identity::persistent(id)
                    })
                }
                None => None,
            };
            let connectivity = if offline {
                Connectivity::Offline
            } else {
                Connectivity::Online
            };

            let orchestrator = AnalysisOrchestrator::from_config(Arc::new(config_from_env()?))?;
            match orchestrator
                .analyze_current(&values.into(), &FixedIdentity(identity), connectivity)
                .await
            {
                Ok(outcome) => {
                    if let Some(warning) = outcome.warning() {
                        eprintln!("{warning}");
                    }
                    print_result(&outcome.result);
                    if outcome.recorded {
                        println!("Saved to history.");
                    }
                }
                Err(e) => print_rejection(&e),
            }
        }
        Some(Commands::History { user }) => {
            let identity = Identity::persistent(NonEmptyText::new(user)?);
            let orchestrator = AnalysisOrchestrator::from_config(Arc::new(config_from_env()?))?;
            let entries = orchestrator.ledger().list(&identity).await?;
            if entries.is_empty() {
                println!("No analyses found.");
            } else {
                for entry in &entries {
                    print_result(entry);
                    println!();
                }
            }
        }
        None => {
            println!("Use 'abg --help' for commands");
        }
    }

    Ok(())
}
