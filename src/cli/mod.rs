use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::io::{BufRead, Write};
use zeroize::Zeroizing;

use crate::application::{
    AccountService, Action, BulkAction, BulkCoordinator, BulkReport, PreparedTransaction, Receipt,
    parse_network,
};
use crate::config::{DEFAULT_BASE_FEE, DEFAULT_TX_TIMEOUT_SECS, Settings};
use crate::domain::{Network, format_stroops};
use crate::gateway::HorizonGateway;
use crate::io::{ExportFormat, Exporter};

/// Fiducia - Ledger Account Manager
#[derive(Parser)]
#[command(name = "fiducia")]
#[command(
    about = "Manage trustlines, claimable balances and payments of a Stellar-style ledger account"
)]
#[command(version)]
pub struct Cli {
    /// Secret key (S...). Prompted for on stdin when omitted
    #[arg(long, env = "FIDUCIA_SECRET", hide_env_values = true, global = true)]
    pub secret: Option<String>,

    /// Network: public or testnet
    #[arg(short, long, env = "FIDUCIA_NETWORK", default_value = "public", global = true)]
    pub network: String,

    /// Horizon endpoint override for the selected network
    #[arg(long, env = "FIDUCIA_HORIZON_URL", global = true)]
    pub horizon_url: Option<String>,

    /// Base fee per operation, in stroops
    #[arg(long, env = "FIDUCIA_BASE_FEE", default_value_t = DEFAULT_BASE_FEE, global = true)]
    pub base_fee: u32,

    /// Seconds a signed transaction stays valid
    #[arg(long, env = "FIDUCIA_TX_TIMEOUT", default_value_t = DEFAULT_TX_TIMEOUT_SECS, global = true)]
    pub tx_timeout: u64,

    /// Skip the confirmation prompt before submitting
    #[arg(short, long, global = true)]
    pub yes: bool,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show the public address of the secret key
    Address,

    /// Trustline management commands
    #[command(subcommand)]
    Trustlines(TrustlineCommands),

    /// Claimable balance commands
    #[command(subcommand)]
    Balances(BalanceCommands),

    /// Send a payment
    Pay {
        /// Recipient address (G...)
        destination: String,

        /// Amount to send (e.g., "12.5"), up to 7 decimals
        amount: String,

        /// Asset: "native" or CODE:ISSUER
        #[arg(short, long, default_value = "native")]
        asset: String,

        /// Build and sign without submitting
        #[arg(long)]
        dry_run: bool,
    },

    /// Show recent transactions of an account
    History {
        /// Account address (defaults to the secret key's account)
        address: Option<String>,

        /// Maximum number of transactions to show (1-200)
        #[arg(short, long, default_value = "20")]
        limit: u32,
    },

    /// Export data to CSV or JSON
    Export {
        /// What to export: trustlines, balances, history
        export_type: String,

        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<String>,

        /// Format: csv, json
        #[arg(short, long, default_value = "csv")]
        format: String,

        /// Maximum number of transactions for history exports
        #[arg(short, long, default_value = "200")]
        limit: u32,
    },
}

#[derive(Subcommand)]
pub enum TrustlineCommands {
    /// List trustlines with balances and limits
    List,

    /// Remove trustlines, returning any remaining balance to the issuer
    Remove {
        /// Assets as CODE:ISSUER
        assets: Vec<String>,

        /// Remove every trustline of the account
        #[arg(long)]
        all: bool,

        /// Build and sign without submitting
        #[arg(long)]
        dry_run: bool,

        /// Write the bulk report to a file (JSON if it ends in .json, else CSV)
        #[arg(long)]
        report: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum BalanceCommands {
    /// List pending claimable balances
    List,

    /// Claim balances, establishing trust first when needed
    Claim {
        /// Claimable balance ids
        ids: Vec<String>,

        /// Claim every pending balance
        #[arg(long)]
        all: bool,

        /// Build and sign without submitting
        #[arg(long)]
        dry_run: bool,

        /// Write the bulk report to a file (JSON if it ends in .json, else CSV)
        #[arg(long)]
        report: Option<String>,
    },

    /// Reject balances, returning the funds to their sponsor
    Reject {
        /// Claimable balance ids
        ids: Vec<String>,

        /// Reject every pending balance
        #[arg(long)]
        all: bool,

        /// Build and sign without submitting
        #[arg(long)]
        dry_run: bool,

        /// Write the bulk report to a file (JSON if it ends in .json, else CSV)
        #[arg(long)]
        report: Option<String>,
    },
}

/// Everything a command needs once flags are resolved.
struct Session {
    service: AccountService<HorizonGateway>,
    network: Network,
    secret: Option<Zeroizing<String>>,
    assume_yes: bool,
}

impl Session {
    /// Secret from flag or environment, else prompted for once.
    fn secret(&mut self) -> Result<Zeroizing<String>> {
        let secret = match self.secret.take() {
            Some(secret) => secret,
            None => prompt_secret()?,
        };
        let copy = secret.clone();
        self.secret = Some(secret);
        Ok(copy)
    }
}

impl Cli {
    fn settings(&self, network: Network) -> Settings {
        let settings = Settings::default()
            .with_base_fee(self.base_fee)
            .with_tx_timeout(self.tx_timeout);
        match &self.horizon_url {
            Some(url) => settings.with_horizon_url(network, url.as_str()),
            None => settings,
        }
    }

    pub async fn run(self) -> Result<()> {
        let network = parse_network(&self.network)?;
        let settings = self.settings(network);
        let gateway =
            HorizonGateway::new(settings.clone()).context("Failed to set up ledger client")?;

        let mut ctx = Session {
            service: AccountService::new(gateway, settings),
            network,
            secret: self.secret.map(Zeroizing::new),
            assume_yes: self.yes,
        };

        match self.command {
            Commands::Address => {
                let secret = ctx.secret()?;
                let account = ctx.service.resolve_identity(&secret)?;
                println!("{}", account);
            }

            Commands::Trustlines(cmd) => run_trustline_command(&mut ctx, cmd).await?,

            Commands::Balances(cmd) => run_balance_command(&mut ctx, cmd).await?,

            Commands::Pay {
                destination,
                amount,
                asset,
                dry_run,
            } => {
                let action = Action::SendPayment {
                    destination,
                    asset,
                    amount,
                };
                run_single_action(&mut ctx, action, dry_run).await?;
            }

            Commands::History { address, limit } => {
                let address = match address {
                    Some(address) => address,
                    None => {
                        let secret = ctx.secret()?;
                        ctx.service.resolve_identity(&secret)?.to_string()
                    }
                };
                run_history_command(&ctx, &address, limit).await?;
            }

            Commands::Export {
                export_type,
                output,
                format,
                limit,
            } => {
                run_export_command(&mut ctx, &export_type, output.as_deref(), &format, limit)
                    .await?;
            }
        }

        Ok(())
    }
}

async fn run_trustline_command(ctx: &mut Session, cmd: TrustlineCommands) -> Result<()> {
    match cmd {
        TrustlineCommands::List => {
            let secret = ctx.secret()?;
            let lines = ctx.service.list_trustlines(&secret, ctx.network).await?;
            if lines.is_empty() {
                println!("No trustlines found.");
            } else {
                println!("{:<12} {:<58} {:>22} {:>22}", "CODE", "ISSUER", "BALANCE", "LIMIT");
                println!("{}", "-".repeat(117));
                for line in lines {
                    println!(
                        "{:<12} {:<58} {:>22} {:>22}",
                        line.asset.code(),
                        line.asset.issuer().map(|i| i.as_str()).unwrap_or(""),
                        format_stroops(line.balance),
                        line.limit.map(format_stroops).unwrap_or_default()
                    );
                }
            }
        }

        TrustlineCommands::Remove {
            assets,
            all,
            dry_run,
            report,
        } => {
            let targets = if all {
                let secret = ctx.secret()?;
                ctx.service
                    .list_trustlines(&secret, ctx.network)
                    .await?
                    .into_iter()
                    .map(|line| line.asset.key())
                    .collect()
            } else {
                assets
            };
            let options = RunOptions { dry_run, report };
            run_targets(ctx, BulkAction::RemoveTrustline, targets, options).await?;
        }
    }
    Ok(())
}

async fn run_balance_command(ctx: &mut Session, cmd: BalanceCommands) -> Result<()> {
    let (action, ids, all, options) = match cmd {
        BalanceCommands::List => {
            let secret = ctx.secret()?;
            let records = ctx
                .service
                .list_claimable_balances(&secret, ctx.network)
                .await?;
            if records.is_empty() {
                println!("No claimable balances found.");
            } else {
                println!(
                    "{:<72} {:>22} {:<12} {:<12}",
                    "ID", "AMOUNT", "ASSET", "SPONSOR"
                );
                println!("{}", "-".repeat(121));
                for record in records {
                    println!(
                        "{:<72} {:>22} {:<12} {:<12}",
                        record.id.as_str(),
                        format_stroops(record.amount),
                        record.asset.code(),
                        record
                            .sponsor
                            .as_ref()
                            .map(|s| s.short())
                            .unwrap_or_else(|| "-".to_string())
                    );
                }
            }
            return Ok(());
        }
        BalanceCommands::Claim {
            ids,
            all,
            dry_run,
            report,
        } => (BulkAction::Claim, ids, all, RunOptions { dry_run, report }),
        BalanceCommands::Reject {
            ids,
            all,
            dry_run,
            report,
        } => (BulkAction::Reject, ids, all, RunOptions { dry_run, report }),
    };

    let targets = if all {
        let secret = ctx.secret()?;
        ctx.service
            .list_claimable_balances(&secret, ctx.network)
            .await?
            .into_iter()
            .map(|record| record.id.to_string())
            .collect()
    } else {
        ids
    };
    run_targets(ctx, action, targets, options).await
}

struct RunOptions {
    dry_run: bool,
    report: Option<String>,
}

/// One target runs as a single operation; several, or any run that writes a
/// report, go through the bulk coordinator.
async fn run_targets(
    ctx: &mut Session,
    action: BulkAction,
    targets: Vec<String>,
    options: RunOptions,
) -> Result<()> {
    match targets.as_slice() {
        [] => {
            println!("Nothing to {}.", action);
            Ok(())
        }
        [target] if options.report.is_none() => {
            run_single_action(ctx, action.action_for(target), options.dry_run).await
        }
        _ if options.dry_run => {
            let secret = ctx.secret()?;
            for target in &targets {
                match ctx
                    .service
                    .prepare(&secret, ctx.network, &action.action_for(target))
                    .await
                {
                    Ok(prepared) => print_prepared(&prepared),
                    Err(e) => eprintln!("{}: {}", target, e),
                }
                println!();
            }
            Ok(())
        }
        _ => {
            let noun = if targets.len() == 1 { "target" } else { "targets" };
            println!("About to {} {} {} on {}:", action, targets.len(), noun, ctx.network);
            for target in &targets {
                println!("  {}", target);
            }
            if !confirm(ctx.assume_yes)? {
                println!("Aborted.");
                return Ok(());
            }

            let secret = ctx.secret()?;
            let report = BulkCoordinator::new(&ctx.service)
                .run(&secret, ctx.network, action, &targets)
                .await;
            print_bulk_report(&report);
            if let Some(path) = &options.report {
                write_bulk_report(&report, path)?;
            }
            Ok(())
        }
    }
}

async fn run_single_action(ctx: &mut Session, action: Action, dry_run: bool) -> Result<()> {
    let secret = ctx.secret()?;
    let prepared = ctx.service.prepare(&secret, ctx.network, &action).await?;

    print_prepared(&prepared);
    if dry_run {
        return Ok(());
    }
    if !confirm(ctx.assume_yes)? {
        println!("Aborted.");
        return Ok(());
    }

    let receipt = ctx.service.submit(prepared).await?;
    print_receipt(&receipt);
    Ok(())
}

async fn run_history_command(ctx: &Session, address: &str, limit: u32) -> Result<()> {
    let transactions = ctx
        .service
        .transaction_history(address, ctx.network, limit)
        .await?;

    if transactions.is_empty() {
        println!("No transactions found.");
        return Ok(());
    }

    println!(
        "{:<20} {:<64} {:>4} {:<7} {}",
        "DATE", "HASH", "OPS", "STATUS", "MEMO"
    );
    println!("{}", "-".repeat(110));
    for tx in transactions {
        println!(
            "{:<20} {:<64} {:>4} {:<7} {}",
            tx.created_at.format("%Y-%m-%d %H:%M:%S"),
            tx.hash,
            tx.operation_count,
            if tx.successful { "ok" } else { "failed" },
            truncate(tx.memo.as_deref().unwrap_or(""), 28)
        );
    }
    Ok(())
}

async fn run_export_command(
    ctx: &mut Session,
    export_type: &str,
    output: Option<&str>,
    format: &str,
    limit: u32,
) -> Result<()> {
    use std::fs::File;
    use std::io::stdout;

    let format: ExportFormat = format.parse().map_err(|e: String| anyhow::anyhow!(e))?;
    let exporter = Exporter::new(format);
    let secret = ctx.secret()?;

    // Determine output writer
    let writer: Box<dyn Write> = match output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create output file: {}", path))?;
            Box::new(file)
        }
        None => Box::new(stdout()),
    };

    let count = match export_type {
        "trustlines" => {
            let lines = ctx.service.list_trustlines(&secret, ctx.network).await?;
            exporter.export_trustlines(&lines, writer)?
        }
        "balances" => {
            let records = ctx
                .service
                .list_claimable_balances(&secret, ctx.network)
                .await?;
            exporter.export_claimable_balances(&records, writer)?
        }
        "history" => {
            let address = ctx.service.resolve_identity(&secret)?;
            let transactions = ctx
                .service
                .transaction_history(address.as_str(), ctx.network, limit)
                .await?;
            exporter.export_history(&transactions, writer)?
        }
        _ => {
            anyhow::bail!(
                "Invalid export type '{}'. Valid types: trustlines, balances, history",
                export_type
            );
        }
    };

    if output.is_some() {
        eprintln!("Exported {} {}", count, export_type);
    }
    Ok(())
}

fn print_prepared(prepared: &PreparedTransaction) {
    let tx = &prepared.signed.transaction;
    println!("Transaction: {} ({})", prepared.description, prepared.network);
    println!("  Source:     {}", tx.source);
    println!("  Sequence:   {}", tx.sequence);
    println!("  Fee:        {} stroops", tx.fee);
    println!("  Operations:");
    for (i, op) in prepared.plan.operations().iter().enumerate() {
        println!("    {}. {}", i + 1, op.describe());
    }
    println!("  Hash:       {}", prepared.signed.hash);
    println!("  Envelope:   {}", prepared.signed.envelope_base64());
}

fn write_bulk_report(report: &BulkReport, path: &str) -> Result<()> {
    let format = if path.ends_with(".json") {
        ExportFormat::Json
    } else {
        ExportFormat::Csv
    };
    let file = std::fs::File::create(path)
        .with_context(|| format!("Failed to create report file: {}", path))?;
    Exporter::new(format).export_bulk_report(report, file)?;
    eprintln!("Report written to {}", path);
    Ok(())
}

fn print_receipt(receipt: &Receipt) {
    println!("Submitted: {}", receipt.description);
    println!("  Hash: {}", receipt.hash);
}

fn print_bulk_report(report: &BulkReport) {
    println!(
        "Done: {} succeeded, {} failed (of {})",
        report.success_count,
        report.failure_count(),
        report.total()
    );
    if !report.failures.is_empty() {
        println!("Failures:");
        println!("{}", report.failure_text());
    }
}

/// Ask for an explicit YES before anything is submitted.
fn confirm(assume_yes: bool) -> Result<bool> {
    if assume_yes {
        return Ok(true);
    }
    print!("Type YES to submit: ");
    std::io::stdout().flush()?;

    let mut answer = String::new();
    std::io::stdin()
        .lock()
        .read_line(&mut answer)
        .context("Failed to read confirmation")?;
    Ok(answer.trim() == "YES")
}

fn prompt_secret() -> Result<Zeroizing<String>> {
    eprint!("Secret key: ");
    std::io::stderr().flush()?;

    let mut secret = Zeroizing::new(String::new());
    std::io::stdin()
        .lock()
        .read_line(&mut secret)
        .context("Failed to read secret key")?;
    let trimmed = Zeroizing::new(secret.trim().to_string());
    Ok(trimmed)
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len - 3).collect();
        format!("{}...", kept)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a much longer memo", 10), "a much ...");
    }

    #[test]
    fn test_parse_remove_command() {
        let cli = Cli::try_parse_from([
            "fiducia",
            "--network",
            "testnet",
            "trustlines",
            "remove",
            "USD:GABC",
            "EUR:GDEF",
            "--dry-run",
        ])
        .unwrap();
        assert_eq!(cli.network, "testnet");
        match cli.command {
            Commands::Trustlines(TrustlineCommands::Remove {
                assets,
                all,
                dry_run,
                report,
            }) => {
                assert_eq!(assets, vec!["USD:GABC", "EUR:GDEF"]);
                assert!(!all);
                assert!(dry_run);
                assert_eq!(report, None);
            }
            _ => panic!("expected trustlines remove"),
        }
    }

    #[tokio::test]
    async fn test_single_target_writes_report() -> anyhow::Result<()> {
        use serde_json::json;
        use wiremock::matchers::{method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        const HOLDER_SECRET: &str = "SAAQCAIBAEAQCAIBAEAQCAIBAEAQCAIBAEAQCAIBAEAQCAIBAEAQC5MY";
        const HOLDER: &str = "GCFIRY65OQE7DFP5KLNS2PF2LVZMUZYJX4OZIEQ36N2IQANUB5XVYOJR";
        const ISSUER: &str = "GCATS5YOVB6ROX2WUNKGNQ2MP3GMXDMKSG2O4N5CLX3A6W4PZGZZI55U";

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(format!("/accounts/{}", HOLDER)))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": HOLDER,
                "account_id": HOLDER,
                "sequence": "100",
                "balances": [
                    {
                        "balance": "0.0000000",
                        "limit": "1000.0000000",
                        "asset_type": "credit_alphanum4",
                        "asset_code": "USD",
                        "asset_issuer": ISSUER
                    },
                    { "balance": "10.0000000", "asset_type": "native" }
                ]
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/transactions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "hash": "abc123",
                "successful": true
            })))
            .expect(1)
            .mount(&server)
            .await;

        let settings = Settings::default().with_horizon_url(Network::Testnet, server.uri());
        let mut ctx = Session {
            service: AccountService::new(HorizonGateway::new(settings.clone())?, settings),
            network: Network::Testnet,
            secret: Some(Zeroizing::new(HOLDER_SECRET.to_string())),
            assume_yes: true,
        };
        let dir = tempfile::TempDir::new()?;
        let report_path = dir.path().join("report.csv");

        run_targets(
            &mut ctx,
            BulkAction::RemoveTrustline,
            vec![format!("USD:{}", ISSUER)],
            RunOptions {
                dry_run: false,
                report: Some(report_path.to_string_lossy().into_owned()),
            },
        )
        .await?;

        let written = std::fs::read_to_string(&report_path)?;
        let lines: Vec<&str> = written.lines().collect();
        assert_eq!(lines[0], "target,status,hash,error");
        assert_eq!(lines.len(), 2);
        assert!(lines[1].starts_with(&format!("USD:{},success,abc123", ISSUER)));
        Ok(())
    }

    #[test]
    fn test_defaults() {
        let cli = Cli::try_parse_from(["fiducia", "address"]).unwrap();
        assert_eq!(cli.base_fee, 100);
        assert_eq!(cli.tx_timeout, 180);
        assert!(!cli.yes);
    }
}
