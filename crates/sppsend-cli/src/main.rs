//! sppsend CLI
//!
//! 命令行客户端，默认通过 Unix Socket 与守护进程通信，
//! 使用 `--direct` 时在本进程内直接完成传输。

mod client;
mod local;

use anyhow::{Result, bail};
use clap::{Parser, Subcommand};
use sppsend_core::{Command, LogLevel, Reply, Settings, TransferResult, TransportKind};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "sppsend", version, about = "通过蓝牙串口协议发送文件")]
struct Cli {
    /// 输出调试日志
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 发送文件
    Send {
        /// 要发送的文件路径
        file: String,
        /// 目标设备地址 (不指定则使用配置中的 default_device)
        #[arg(short, long)]
        device: Option<String>,
        /// 对端看到的文件名 (默认为源文件名)
        #[arg(short, long)]
        name: Option<String>,
        /// 不经过守护进程，直接在本进程内发送
        #[arg(long)]
        direct: bool,
        /// 直接模式下使用 TCP 传输 (设备地址为 host:port)
        #[arg(long, requires = "direct")]
        tcp: bool,
    },
    /// 请求开启蓝牙适配器
    Enable {
        /// 不经过守护进程
        #[arg(long)]
        direct: bool,
    },
    /// 查看守护进程状态
    Status,
    /// 在 TCP 上接收一个文件 (调试用)
    Receive {
        /// 监听地址
        #[arg(short, long, default_value = "127.0.0.1:9000")]
        listen: String,
        /// 保存目录
        #[arg(short, long, default_value = ".")]
        output: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let _ = tracing_log::LogTracer::init();
    let default_filter = if cli.verbose {
        LogLevel::Debug.directive()
    } else {
        LogLevel::Warn.directive()
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .try_init();

    let mut settings = Settings::load();

    match cli.command {
        Commands::Send {
            file,
            device,
            name,
            direct,
            tcp,
        } => {
            let Some(device) = device.or_else(|| settings.default_device.clone()) else {
                bail!("未指定目标设备 (使用 --device 或在配置中设置 default_device)");
            };

            println!("📤 发送文件: {}", file);
            println!("   目标设备: {}", device);

            let result = if direct {
                if tcp {
                    settings.transport = TransportKind::Tcp;
                }
                local::send(&settings, &file, &device, name).await?
            } else {
                send_via_daemon(file, device, name).await?
            };
            report(&result)?;
        }
        Commands::Enable { direct } => {
            let requested = if direct {
                local::enable(&settings).await?
            } else {
                match client::request(&Command::EnableAdapter, |_| {}).await? {
                    Reply::Enabled { requested } => requested,
                    other => bail!("意外的应答: {:?}", other),
                }
            };
            if requested {
                println!("✅ 已请求开启适配器");
            } else {
                println!("适配器已开启");
            }
        }
        Commands::Status => {
            if let Reply::Status { busy } = client::request(&Command::Status, |_| {}).await? {
                println!("状态: {}", if busy { "传输中" } else { "空闲" });
            }
        }
        Commands::Receive { listen, output } => {
            println!("📥 接收模式 (监听: {}, 保存到: {})", listen, output);
            let path = local::receive(&listen, std::path::Path::new(&output)).await?;
            println!("✅ 已保存: {}", path.display());
        }
    }

    Ok(())
}

async fn send_via_daemon(
    file: String,
    device: String,
    name: Option<String>,
) -> Result<TransferResult> {
    let file_path = std::fs::canonicalize(&file)
        .map(|p| p.to_string_lossy().into_owned())
        .unwrap_or(file);

    let command = Command::SendFile {
        file_path: Some(file_path),
        device_address: Some(device),
        remote_name: name,
    };

    match client::request(&command, |reply| {
        if let Reply::Progress { percent } = reply {
            local::print_progress(*percent);
        }
    })
    .await?
    {
        Reply::Finished(result) => Ok(result),
        Reply::Error { code, message, .. } => bail!("{}: {}", code, message),
        other => bail!("意外的应答: {:?}", other),
    }
}

fn report(result: &TransferResult) -> Result<()> {
    match &result.error {
        None => {
            println!("✅ 发送完成");
            Ok(())
        }
        Some(error) => bail!("发送失败 [{}]: {}", error.kind, error.message),
    }
}
