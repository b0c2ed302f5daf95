//! 命令行参数定义

use std::collections::BTreeSet;
use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "keel", version, about = "Converge declared clusters toward their desired state")]
pub struct Cli {
    /// 配置文件（默认 config/default.toml）
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// 对一个资源声明执行一轮收敛检查
    Check {
        /// YAML 资源文件
        #[arg(long)]
        file: PathBuf,
    },
    /// 从现网集群导出最小声明（YAML 输出到 stdout）
    Export {
        #[arg(long)]
        account: String,
        #[arg(long)]
        app: String,
        #[arg(long)]
        stack: Option<String>,
        #[arg(long)]
        detail: Option<String>,
        /// 可重复
        #[arg(long = "region", required = true)]
        regions: Vec<String>,
        #[arg(long, default_value = "keel@spinnaker.io")]
        service_account: String,
    },
}

impl Command {
    pub fn export_regions(regions: &[String]) -> BTreeSet<String> {
        regions.iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_check() {
        let cli = Cli::parse_from(["keel", "check", "--file", "cluster.yml"]);
        assert!(matches!(cli.command, Command::Check { ref file } if file == &PathBuf::from("cluster.yml")));
    }

    #[test]
    fn test_parses_export_with_repeated_regions() {
        let cli = Cli::parse_from([
            "keel", "export", "--account", "test", "--app", "fnord", "--stack", "test",
            "--region", "us-west-2", "--region", "us-east-1",
        ]);
        match cli.command {
            Command::Export {
                account,
                stack,
                detail,
                regions,
                ..
            } => {
                assert_eq!(account, "test");
                assert_eq!(stack.as_deref(), Some("test"));
                assert!(detail.is_none());
                assert_eq!(Command::export_regions(&regions).len(), 2);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }
}
