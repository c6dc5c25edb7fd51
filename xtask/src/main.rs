use anyhow::Result;
use clap::{Parser, Subcommand};
use xshell::{Shell, cmd};

#[derive(Parser)]
#[command(name = "xtask", about = "sppsend 开发任务自动化")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 构建所有组件 (release, 启用 BlueZ)
    Build,
    /// 运行守护进程 (开发模式)
    Dev {
        /// 日志级别 (trace, debug, info, warn, error)
        #[arg(short, long, default_value = "debug")]
        log_level: String,
    },
    /// 启动回环演示: 本地 TCP 接收端 + 直接模式发送
    Loopback {
        /// 要发送的文件
        file: String,
        /// 接收端监听端口
        #[arg(short, long, default_value = "9000")]
        port: u16,
    },
    /// 运行测试
    Test,
    /// 清理构建产物
    Clean,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let sh = Shell::new()?;

    // 确保在项目根目录执行
    let project_root = std::env::var("CARGO_MANIFEST_DIR")
        .map(std::path::PathBuf::from)
        .ok()
        .and_then(|p| p.parent().map(std::path::Path::to_path_buf));
    if let Some(root) = project_root {
        sh.change_dir(root);
    }

    match cli.command {
        Commands::Build => build(&sh)?,
        Commands::Dev { log_level } => dev(&sh, &log_level)?,
        Commands::Loopback { file, port } => loopback(&sh, &file, port)?,
        Commands::Test => test(&sh)?,
        Commands::Clean => clean(&sh)?,
    }

    Ok(())
}

fn build(sh: &Shell) -> Result<()> {
    println!("🔨 构建所有组件...");
    cmd!(
        sh,
        "cargo build --release -p sppsend-daemon -p sppsend-cli --features bluez"
    )
    .run()?;
    println!("✅ 构建完成");
    Ok(())
}

fn dev(sh: &Shell, log_level: &str) -> Result<()> {
    println!("🚀 启动开发模式守护进程...");
    let rust_log = format!("{level},sppsend_core={level},bluer=info", level = log_level);
    let _env = sh.push_env("RUST_LOG", rust_log);
    cmd!(sh, "cargo run -p sppsend-daemon --features bluez").run()?;
    Ok(())
}

fn loopback(sh: &Shell, file: &str, port: u16) -> Result<()> {
    let addr = format!("127.0.0.1:{port}");
    println!("🔁 回环演示: {} -> {}", file, addr);

    cmd!(sh, "cargo build -p sppsend-cli").run()?;

    let out_dir = "target/loopback";
    sh.create_dir(out_dir)?;

    let receiver = std::process::Command::new("target/debug/sppsend")
        .args(["receive", "--listen", &addr, "--output", out_dir])
        .current_dir(sh.current_dir())
        .spawn()?;

    // 等待接收端开始监听
    std::thread::sleep(std::time::Duration::from_millis(300));

    let sent = cmd!(
        sh,
        "target/debug/sppsend send {file} --device {addr} --direct --tcp"
    )
    .run();

    let output = receiver.wait_with_output()?;
    sent?;
    if !output.status.success() {
        anyhow::bail!("接收端异常退出: {}", output.status);
    }

    println!("✅ 文件已保存到 {}", out_dir);
    Ok(())
}

fn test(sh: &Shell) -> Result<()> {
    println!("🧪 运行测试...");
    cmd!(sh, "cargo test --workspace").run()?;
    println!("✅ 测试完成");
    Ok(())
}

fn clean(sh: &Shell) -> Result<()> {
    println!("🧹 清理构建产物...");
    cmd!(sh, "cargo clean").run()?;
    println!("✅ 清理完成");
    Ok(())
}
