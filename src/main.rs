//! Evidence notary entrypoint: hash images, keep evidence records, and
//! simulate chain submission.

mod chain;
mod hashing;
mod image;
mod logging;
mod paths;
mod record;
mod settings;
mod store;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;
use tracing::{debug, warn};

use crate::chain::{
    submit_evidence, test_connection, SubmissionRequest, CONNECT_DELAY, SUBMIT_DELAY,
};
use crate::hashing::{is_tx_hash, sha256_file, sha256_hex};
use crate::image::{inspect_image, ImageSelection};
use crate::logging::init_logging;
use crate::paths::{settings_path, store_path};
use crate::settings::{load_settings, save_settings, Network, SettingsUpdate};
use crate::store::{NewRecord, OpResult, RecordStore};

/// CLI arguments for the evidence notary.
#[derive(Parser, Debug)]
#[command(
    name = "evidence-notary",
    version,
    about = "Hash image evidence and keep a local record of submissions"
)]
struct Args {
    /// Record store file (defaults to the platform data directory)
    #[arg(long, value_name = "FILE", env = "EVIDENCE_NOTARY_STORE", global = true)]
    store: Option<PathBuf>,

    /// Chain settings file (defaults to the platform data directory)
    #[arg(long, value_name = "FILE", env = "EVIDENCE_NOTARY_SETTINGS", global = true)]
    settings: Option<PathBuf>,

    /// Artificial delay for simulated chain calls, in milliseconds
    #[arg(long, value_name = "MS", env = "EVIDENCE_NOTARY_DELAY_MS", global = true)]
    delay_ms: Option<u64>,

    /// Enable debug logging on stderr
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Hash an image and print its path, hash, data URI, and file name
    Select {
        /// Image to select; prints `null` when omitted
        image: Option<PathBuf>,
    },
    /// Print the SHA-256 digest of a file, or of stdin when FILE is `-`
    Hash { file: PathBuf },
    /// Record evidence for an image, optionally submitting it on chain first
    Submit {
        #[command(flatten)]
        evidence: EvidenceArgs,

        /// Transaction id obtained elsewhere
        #[arg(long, conflicts_with = "chain")]
        tx: Option<String>,

        /// Run the simulated chain submission before recording
        #[arg(long)]
        chain: bool,

        /// Contract address (0x + 40 hex digits)
        #[arg(long, requires = "chain")]
        contract: Option<String>,

        /// Wallet address (0x + 40 hex digits)
        #[arg(long, requires = "chain")]
        wallet: Option<String>,

        /// Signing key; checked for presence only and never stored
        #[arg(long, requires = "chain")]
        key: Option<String>,
    },
    /// Record evidence locally with a pending transaction id
    SaveLocal {
        #[command(flatten)]
        evidence: EvidenceArgs,
    },
    /// Print every stored record
    List,
    /// Delete a record by id (unknown ids succeed)
    Delete { id: String },
    /// Set the transaction id of a record and mark it confirmed
    UpdateTx { id: String, transaction_id: String },
    /// Show or change chain settings
    Settings {
        #[command(subcommand)]
        action: SettingsAction,
    },
    /// Check an RPC URL (defaults to the configured one)
    TestConnection { url: Option<String> },
}

#[derive(clap::Args, Debug)]
struct EvidenceArgs {
    /// Evidence image
    #[arg(long, value_name = "FILE")]
    image: PathBuf,

    /// Free-form description stored with the record
    #[arg(long, default_value = "")]
    metadata: String,
}

#[derive(Subcommand, Debug)]
enum SettingsAction {
    /// Print the current settings
    Show,
    /// Update one or more settings fields
    Set {
        #[arg(long)]
        rpc_url: Option<String>,
        #[arg(long, value_enum)]
        network: Option<Network>,
        #[arg(long)]
        chain_id: Option<u64>,
        /// Contract ABI as a JSON string
        #[arg(long)]
        abi: Option<String>,
    },
}

fn main() -> Result<ExitCode> {
    let args = Args::parse();
    init_logging(args.verbose);
    run(args)
}

/// Execute one subcommand; failure results exit with status 1.
fn run(args: Args) -> Result<ExitCode> {
    let store = RecordStore::open(store_path(args.store.as_deref()));
    let settings_file = settings_path(args.settings.as_deref());
    debug!(
        store = %store.path().display(),
        settings = %settings_file.display(),
        "resolved data files"
    );

    match args.command {
        Command::Select { image } => {
            let selection = image.as_deref().map(inspect_image).transpose()?;
            print_json(&selection)?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Hash { file } => {
            let hash = if file.as_os_str() == "-" {
                let mut buffer = Vec::new();
                io::stdin().read_to_end(&mut buffer).context("read stdin")?;
                sha256_hex(&buffer)
            } else {
                sha256_file(&file).with_context(|| format!("hash {}", file.display()))?
            };
            println!("{hash}");
            Ok(ExitCode::SUCCESS)
        }
        Command::Submit {
            evidence,
            tx,
            chain,
            contract,
            wallet,
            key,
        } => {
            let selection = inspect_image(&evidence.image)?;
            let transaction_id = if chain {
                let request = SubmissionRequest {
                    contract_address: contract.unwrap_or_default(),
                    wallet_address: wallet.unwrap_or_default(),
                    private_key: key.unwrap_or_default(),
                };
                let settings = load_settings(&settings_file);
                let delay = args.delay_ms.map(Duration::from_millis).unwrap_or(SUBMIT_DELAY);
                let submitted = submit_evidence(
                    &selection.hash,
                    &evidence.metadata,
                    &request,
                    &settings,
                    delay,
                );
                match submitted {
                    Ok(tx) => Some(tx),
                    Err(err) => {
                        warn!(error = %err, "chain submission rejected");
                        let result =
                            OpResult::failure(format!("Blockchain submission failed: {err}"));
                        return emit(&result);
                    }
                }
            } else {
                tx
            };
            record_evidence(&store, &selection, &evidence.metadata, transaction_id.as_deref())
        }
        Command::SaveLocal { evidence } => {
            let selection = inspect_image(&evidence.image)?;
            record_evidence(&store, &selection, &evidence.metadata, Some(""))
        }
        Command::List => {
            print_json(&store.load())?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Delete { id } => emit(&store.delete_result(&id)),
        Command::UpdateTx { id, transaction_id } => {
            if !is_tx_hash(&transaction_id) {
                debug!(%transaction_id, "transaction id is not a 0x-prefixed 32-byte hash");
            }
            emit(&store.update_result(&id, &transaction_id))
        }
        Command::Settings { action } => run_settings(&settings_file, action),
        Command::TestConnection { url } => {
            let url = url.unwrap_or_else(|| load_settings(&settings_file).rpc_url);
            let delay = args.delay_ms.map(Duration::from_millis).unwrap_or(CONNECT_DELAY);
            let result = match test_connection(&url, delay) {
                Ok(()) => OpResult::ok(),
                Err(err) => OpResult::failure(err.to_string()),
            };
            emit(&result)
        }
    }
}

fn record_evidence(
    store: &RecordStore,
    selection: &ImageSelection,
    metadata: &str,
    transaction_id: Option<&str>,
) -> Result<ExitCode> {
    let result = store.add_result(&NewRecord {
        hash: &selection.hash,
        metadata: Some(metadata),
        transaction_id,
        image_path: &selection.path,
        base64_image: &selection.base64,
    });
    emit(&result)
}

fn run_settings(path: &Path, action: SettingsAction) -> Result<ExitCode> {
    let mut settings = load_settings(path);
    match action {
        SettingsAction::Show => {
            print_json(&settings)?;
            Ok(ExitCode::SUCCESS)
        }
        SettingsAction::Set {
            rpc_url,
            network,
            chain_id,
            abi,
        } => {
            settings.apply(SettingsUpdate {
                rpc_url,
                network,
                chain_id,
                contract_abi: abi,
            });
            let result = match save_settings(path, &settings) {
                Ok(()) => OpResult::ok(),
                Err(err) => OpResult::failure(err.to_string()),
            };
            emit(&result)
        }
    }
}

/// Print a boundary result and map `success` onto the exit status.
fn emit(result: &OpResult) -> Result<ExitCode> {
    print_json(result)?;
    Ok(if result.success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("serialize output")?;
    println!("{json}");
    Ok(())
}
