//! Amoy Deployer - deploy and operate the token, vesting and reward contracts
//!
//! Every subcommand runs one sequence of JSON-RPC calls through the
//! rate-limited gateway client and exits non-zero unless it succeeded.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use ethers::signers::Signer;
use ethers::types::{Address, Bytes, U256};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

use amoy_deployer::abi::{decode_hex, parse_address, parse_uint256, AbiValue};
use amoy_deployer::chain::ChainProvider;
use amoy_deployer::config::Settings;
use amoy_deployer::contracts::{CallResult, ContractFunction, ContractOperator};
use amoy_deployer::deployments::DeploymentBook;
use amoy_deployer::metrics;
use amoy_deployer::rpc::RpcClient;
use amoy_deployer::tx::{load_wallet, TransactionSubmitter};
use amoy_deployer::TxOutcome;

#[derive(Debug, Parser)]
#[command(name = "amoy-deployer", version, about)]
struct Cli {
    /// Configuration file (defaults to config/default.toml)
    #[arg(long, global = true, env = "DEPLOYER_CONFIG")]
    config: Option<PathBuf>,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    /// Print Prometheus metrics after the command finishes
    #[arg(long, global = true)]
    metrics: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the chain id reported by the gateway
    ChainId,
    /// Native balance of an address (the signer by default)
    Balance { address: Option<String> },
    /// Deploy contract bytecode and record the address under NAME
    Deploy {
        name: String,
        /// Hex bytecode file or a compiler artifact with a `bytecode` field
        bytecode: PathBuf,
    },
    /// Call any supported function: views print their result, others are sent
    Call {
        contract: String,
        signature: String,
        args: Vec<String>,
    },
    SetRewardContract { target: String, reward: String },
    InitializeDistribution { target: String, token: String },
    CreateVestingSchedule {
        vesting: String,
        beneficiary: String,
        amount: String,
        start: String,
        cliff: String,
        duration: String,
    },
    Release { vesting: String, beneficiary: String },
    Transfer { token: String, to: String, amount: String },
    BalanceOf { token: String, holder: String },
    Owner { contract: String },
    Token { contract: String },
    /// Check that the signer owns the contract
    CheckOwnership { contract: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.json_logs);

    info!("Starting Amoy Deployer v{}", env!("CARGO_PKG_VERSION"));

    let settings = match &cli.config {
        Some(path) => Settings::load_from(path)?,
        None => Settings::load()?,
    };
    info!("Using RPC endpoint {}", settings.endpoint());

    let app = App::new(settings)?;
    let result = app.run(cli.command).await;

    if cli.metrics {
        println!("{}", metrics::render()?);
    }
    result
}

fn init_logging(json: bool) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,amoy_deployer=debug,hyper=warn,reqwest=warn"));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(fmt::layer().json().with_target(true).with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .init();
    }
}

struct App {
    settings: Settings,
    rpc: RpcClient,
    book: DeploymentBook,
}

impl App {
    fn new(settings: Settings) -> Result<Self> {
        let rpc = RpcClient::connect(
            settings.endpoint(),
            settings.request_timeout(),
            settings.rate_limit_interval(),
            settings.read_retry_policy(),
        )?;
        let book = DeploymentBook::load(&settings.deployments.path)?;
        Ok(Self { settings, rpc, book })
    }

    async fn run(mut self, command: Command) -> Result<()> {
        match command {
            Command::ChainId => {
                let provider = self.reader();
                println!("{}", provider.chain_id().await?);
            }
            Command::Balance { address } => {
                let address = match address {
                    Some(raw) => self.resolve(&raw)?,
                    None => load_wallet(&self.settings.private_key()?)?.address(),
                };
                let balance = self.reader().get_balance(address).await?;
                println!("{} wei ({:?})", balance, address);
            }
            Command::Deploy { name, bytecode } => {
                let bytecode = read_bytecode(&bytecode)?;
                let outcome = self.submitter().await?.deploy(bytecode).await?;
                if self.book.record(&name, &outcome) {
                    self.book.save()?;
                }
                report(outcome)?;
            }
            Command::Call {
                contract,
                signature,
                args,
            } => {
                let contract = self.resolve(&contract)?;
                let function = ContractFunction::from_signature(&signature)?;
                let args: Vec<&str> = args.iter().map(String::as_str).collect();
                match self.operator().await?.execute(contract, function, &args).await? {
                    CallResult::Submitted(outcome) => report(outcome)?,
                    CallResult::Returned(values) => {
                        for value in values {
                            println!("{}", format_value(&value));
                        }
                    }
                }
            }
            Command::SetRewardContract { target, reward } => {
                let (target, reward) = (self.resolve(&target)?, self.resolve(&reward)?);
                report(self.operator().await?.set_reward_contract(target, reward).await?)?;
            }
            Command::InitializeDistribution { target, token } => {
                let (target, token) = (self.resolve(&target)?, self.resolve(&token)?);
                report(
                    self.operator()
                        .await?
                        .initialize_distribution(target, token)
                        .await?,
                )?;
            }
            Command::CreateVestingSchedule {
                vesting,
                beneficiary,
                amount,
                start,
                cliff,
                duration,
            } => {
                let vesting = self.resolve(&vesting)?;
                let beneficiary = self.resolve(&beneficiary)?;
                let outcome = self
                    .operator()
                    .await?
                    .create_vesting_schedule(
                        vesting,
                        beneficiary,
                        parse_uint256(&amount)?,
                        parse_uint256(&start)?,
                        parse_uint256(&cliff)?,
                        parse_uint256(&duration)?,
                    )
                    .await?;
                report(outcome)?;
            }
            Command::Release {
                vesting,
                beneficiary,
            } => {
                let (vesting, beneficiary) = (self.resolve(&vesting)?, self.resolve(&beneficiary)?);
                report(self.operator().await?.release(vesting, beneficiary).await?)?;
            }
            Command::Transfer { token, to, amount } => {
                let (token, to) = (self.resolve(&token)?, self.resolve(&to)?);
                let amount = parse_uint256(&amount)?;
                report(self.operator().await?.transfer(token, to, amount).await?)?;
            }
            Command::BalanceOf { token, holder } => {
                let (token, holder) = (self.resolve(&token)?, self.resolve(&holder)?);
                let balance: U256 = self.operator().await?.balance_of(token, holder).await?;
                println!("{}", balance);
            }
            Command::Owner { contract } => {
                let contract = self.resolve(&contract)?;
                println!("{:?}", self.operator().await?.owner(contract).await?);
            }
            Command::Token { contract } => {
                let contract = self.resolve(&contract)?;
                println!("{:?}", self.operator().await?.token(contract).await?);
            }
            Command::CheckOwnership { contract } => {
                let contract = self.resolve(&contract)?;
                if !self.operator().await?.check_ownership(contract).await? {
                    bail!("signer does not own {:?}", contract);
                }
                println!("signer owns {:?}", contract);
            }
        }
        Ok(())
    }

    /// Provider for plain reads with the read retry budget
    fn reader(&self) -> ChainProvider {
        ChainProvider::new(self.rpc.with_retry_policy(self.settings.read_retry_policy()))
    }

    async fn submitter(&self) -> Result<Arc<TransactionSubmitter>> {
        let wallet = load_wallet(&self.settings.private_key()?)?;
        let provider = Arc::new(ChainProvider::new(
            self.rpc.with_retry_policy(self.settings.submit_retry_policy()),
        ));
        let submitter =
            TransactionSubmitter::new(provider, wallet, &self.settings.transactions).await?;
        Ok(Arc::new(submitter))
    }

    async fn operator(&self) -> Result<ContractOperator> {
        Ok(ContractOperator::new(self.submitter().await?))
    }

    /// An address, or a name from the deployment record, then from `[contracts]`
    fn resolve(&self, name_or_address: &str) -> Result<Address> {
        let raw = name_or_address.trim();
        if let Ok(address) = parse_address(raw) {
            return Ok(address);
        }
        if let Some(address) = self.book.address_of(raw) {
            return Ok(address);
        }
        match self.settings.contract(raw) {
            Some(configured) => parse_address(configured)
                .with_context(|| format!("contracts.{} is not an address", raw)),
            None => bail!("unknown contract or address: {}", raw),
        }
    }
}

/// Print the outcome; anything but success is an error
fn report(outcome: TxOutcome) -> Result<()> {
    match outcome {
        TxOutcome::Succeeded { .. } => {
            println!("{}", outcome);
            Ok(())
        }
        TxOutcome::Unknown { ref tx_hash } => {
            warn!("Check {} before retrying; it may still be mined", tx_hash);
            bail!("transaction {}", outcome)
        }
        TxOutcome::Reverted { .. } => bail!("transaction {}", outcome),
    }
}

fn format_value(value: &AbiValue) -> String {
    match value {
        AbiValue::Address(address) => format!("{:?}", address),
        AbiValue::Uint256(number) => number.to_string(),
    }
}

/// Raw hex, or a JSON artifact with `bytecode` as a string or `{ "object": … }`
fn read_bytecode(path: &Path) -> Result<Bytes> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read bytecode file: {:?}", path))?;
    let trimmed = content.trim();

    let hex = if trimmed.starts_with('{') {
        let artifact: serde_json::Value =
            serde_json::from_str(trimmed).with_context(|| format!("Invalid artifact {:?}", path))?;
        let bytecode = &artifact["bytecode"];
        bytecode
            .as_str()
            .or_else(|| bytecode["object"].as_str())
            .map(str::to_string)
            .with_context(|| format!("No bytecode field in {:?}", path))?
    } else {
        trimmed.to_string()
    };

    let bytes = decode_hex(&hex)?;
    if bytes.is_empty() {
        bail!("bytecode in {:?} is empty", path);
    }
    Ok(Bytes::from(bytes))
}
