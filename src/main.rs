//! ChainSeed 命令行入口
//!
//! 命令形如 <verb>[-<chain>]，链由注册表从后缀解析，无后缀的基础命令
//! 回退到默认链。助记词只通过环境变量名传入，不出现在命令行参数里

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use chainseed::chains::build_registry;
use chainseed::config::Config;
use chainseed::domain::chain_adapter::ChainAdapter;
use chainseed::domain::seed::SeedPhrase;
use chainseed::error::WalletError;
use chainseed::infrastructure::logging::init_logging;
use chainseed::service::{
    cross_reference, inspector::TransactionInspector, scanner, wallet_store::WalletStore,
};

const USAGE: &str = "Usage: chainseed <verb>[-<chain>] <seedEnvVar|address|file> [options]
  verbs:    generate | scan | transfer | find | tx
  chains:   stacks (default) | sol | eth | bsc
  options:  -c <count>  -n <network>  -o <outputFile>  -a <address>  -l <limit>";

/// 解析后的命令行
struct CliArgs {
    command: String,
    target: String,
    count: u32,
    network: Option<String>,
    output: Option<PathBuf>,
    address: Option<String>,
    limit: u32,
}

fn parse_args(args: &[String]) -> Result<CliArgs, WalletError> {
    if args.len() < 3 {
        return Err(WalletError::Validation("Missing command or argument".into()));
    }

    let mut cli = CliArgs {
        command: args[1].clone(),
        target: args[2].clone(),
        count: 1,
        network: None,
        output: None,
        address: None,
        limit: 20,
    };

    let mut iter = args[3..].iter();
    while let Some(flag) = iter.next() {
        let value = iter
            .next()
            .ok_or_else(|| WalletError::Validation(format!("Missing value for {}", flag)))?;
        match flag.as_str() {
            "-c" => {
                cli.count = value.parse().map_err(|_| {
                    WalletError::Validation(format!("Invalid count: {}", value))
                })?;
            }
            "-n" => cli.network = Some(value.clone()),
            "-o" => cli.output = Some(PathBuf::from(value)),
            "-a" => cli.address = Some(value.clone()),
            "-l" => {
                cli.limit = value.parse().map_err(|_| {
                    WalletError::Validation(format!("Invalid limit: {}", value))
                })?;
            }
            other => {
                return Err(WalletError::Validation(format!("Unknown flag: {}", other)));
            }
        }
    }
    Ok(cli)
}

/// 0x + 64 hex 视为交易 id，其余当作地址
fn looks_like_txid(value: &str) -> bool {
    value.len() == 66
        && value.starts_with("0x")
        && value[2..].chars().all(|c| c.is_ascii_hexdigit())
}

fn wallet_name_for(output: Option<&Path>, adapter: &dyn ChainAdapter) -> String {
    output
        .and_then(|p| p.file_stem())
        .and_then(|s| s.to_str())
        .map(str::to_string)
        .unwrap_or_else(|| format!("{}_wallets", adapter.metadata().key))
}

async fn run() -> Result<(), WalletError> {
    let args: Vec<String> = std::env::args().collect();
    let cli = parse_args(&args)?;

    let config_path = std::env::var("CONFIG_PATH").ok();
    let config = Config::from_env_and_file(config_path.as_deref())
        .map_err(|e| WalletError::Config(e.to_string()))?;

    let registry = build_registry(&config)?;
    let adapter = registry.detect_chain_from_command(&cli.command)?;
    let base_command = registry.get_base_command(&cli.command).to_lowercase();

    let meta = adapter.metadata().clone();
    let network = cli
        .network
        .clone()
        .unwrap_or_else(|| meta.default_network.clone());

    match base_command.as_str() {
        "generate" => {
            // 快速模式：只派生，不查余额
            let seed = SeedPhrase::from_env(&cli.target)
                .map_err(|e| WalletError::Validation(e.to_string()))?;
            let accounts =
                adapter.generate_addresses(seed.as_str(), cli.count, &network)?;

            for account in &accounts {
                println!("[{}] {}  {}", account.index, account.address, account.derivation_path);
            }

            if let Some(output) = &cli.output {
                let file = chainseed::domain::account::WalletFile::new(
                    &meta.name,
                    &wallet_name_for(Some(output), adapter.as_ref()),
                    &network,
                    accounts.into_iter().map(Into::into).collect(),
                );
                WalletStore::save(output, &file)?;
                println!("Wrote {}", output.display());
            }
        }

        "scan" => {
            let seed = SeedPhrase::from_env(&cli.target)
                .map_err(|e| WalletError::Validation(e.to_string()))?;
            let (accounts, mut summary) =
                scanner::scan(adapter.as_ref(), seed.as_str(), cli.count, &network).await?;

            // 美元估值（尽力而为）
            if let Some(chain_cfg) = config.chain(&meta.key) {
                if let Some(id) = chain_cfg.coingecko_id.as_deref() {
                    let prices = chainseed::service::price::PriceService::new(
                        config.settings.http_timeout_secs,
                    )
                    .fetch_usd_prices(&[id])
                    .await;
                    if let Some(price) = prices.get(id) {
                        let total = summary.total_available + summary.total_locked;
                        let divisor = 10f64.powi(meta.decimals as i32);
                        summary.usd_value = Some(total as f64 / divisor * price);
                    }
                }
            }

            for scanned in &accounts {
                println!(
                    "[{}] {}  {} {}{}",
                    scanned.account.index,
                    scanned.account.address,
                    scanned.balance.balance,
                    meta.symbol,
                    scanned
                        .balance
                        .error
                        .as_deref()
                        .map(|e| format!("  (degraded: {})", e))
                        .unwrap_or_default()
                );
            }
            println!("{}", summary.display(&meta.symbol, meta.decimals));

            if let Some(output) = &cli.output {
                if output.extension().and_then(|e| e.to_str()) == Some("csv") {
                    std::fs::write(output, adapter.format_csv(&accounts))?;
                } else {
                    let file = chainseed::domain::account::WalletFile::new(
                        &meta.name,
                        &wallet_name_for(Some(output), adapter.as_ref()),
                        &network,
                        accounts.into_iter().map(Into::into).collect(),
                    );
                    WalletStore::save(output, &file)?;
                }
                println!("Wrote {}", output.display());
            }
        }

        "transfer" => {
            // 可选能力：先探测
            if !adapter.capabilities().transfers {
                println!("Transfers are not supported for {}", meta.name);
                return Ok(());
            }
            let seed = SeedPhrase::from_env(&cli.target)
                .map_err(|e| WalletError::Validation(e.to_string()))?;
            adapter
                .transfer_menu(seed.as_str(), cli.count, &network)
                .await?;
        }

        "find" => {
            let address = cli.address.clone().ok_or_else(|| {
                WalletError::Validation("find requires -a <address>".into())
            })?;
            let wallet = WalletStore::load(Path::new(&cli.target))?;

            match WalletStore::find_address(&wallet, &address) {
                Some(entry) => {
                    println!(
                        "Found at index {} (path {})",
                        entry.account.index, entry.account.derivation_path
                    );
                }
                None => println!("Address not found in {}", cli.target),
            }
        }

        "tx" => {
            if looks_like_txid(&cli.target) {
                let inspector = TransactionInspector::new(adapter.as_ref());
                let record = inspector.inspect(&cli.target, &network).await?;
                println!("{}", inspector.summarize(&record));

                // 拆账收款列表 × 钱包文件 交叉比对
                if let Some(wallet_path) = &cli.output {
                    if record.recipients.is_empty() {
                        println!("No recipients to cross-reference");
                    } else {
                        let report = cross_reference::cross_reference_path(
                            &record.recipients,
                            wallet_path,
                        )?;
                        println!(
                            "{}",
                            cross_reference::format_report(&report, &meta.symbol, meta.decimals)
                        );
                    }
                }
            } else {
                // 地址模式：可读交易列表（可选能力）
                if !adapter.capabilities().view_transactions {
                    println!("Transaction view is not supported for {}", meta.name);
                    return Ok(());
                }
                let listing = adapter
                    .view_transactions(&cli.target, &network, cli.limit)
                    .await?;
                println!("{}", listing);
            }
        }

        other => {
            return Err(WalletError::Validation(format!(
                "Unknown command: {}",
                other
            )));
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    init_logging("info");

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        // 校验/配置错误：用法问题，退出码 2
        Err(err @ (WalletError::Validation(_) | WalletError::Config(_))) => {
            eprintln!("Error: {}", err);
            eprintln!("{}", USAGE);
            ExitCode::from(2)
        }
        // 其余：I/O、网络等不可恢复错误
        Err(err) => {
            eprintln!("Error: {}", err);
            ExitCode::FAILURE
        }
    }
}
