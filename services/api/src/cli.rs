use crate::demo::{run_demo, DemoArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use goods_receipt::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Goods Receipt",
    about = "Serve or demonstrate PZ goods-received bookkeeping from the command line",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Walk through contractor, catalog and PZ document flows against an in-memory store
    Demo(DemoArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Demo(args) => run_demo(args).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serve_is_the_default_command() {
        let cli = Cli::try_parse_from(["goods-receipt-api"]).expect("parses");
        assert!(cli.command.is_none());
    }

    #[test]
    fn demo_accepts_a_receipt_date() {
        let cli = Cli::try_parse_from(["goods-receipt-api", "demo", "--date", "2024-03-14"])
            .expect("parses");
        match cli.command {
            Some(Command::Demo(args)) => assert_eq!(
                args.date.map(|date| date.to_string()),
                Some("2024-03-14".to_string())
            ),
            other => panic!("expected demo command, got {other:?}"),
        }
    }

    #[test]
    fn serve_overrides_are_parsed() {
        let cli = Cli::try_parse_from(["goods-receipt-api", "serve", "--port", "8081"])
            .expect("parses");
        match cli.command {
            Some(Command::Serve(args)) => {
                assert_eq!(args.port, Some(8081));
                assert!(args.host.is_none());
            }
            other => panic!("expected serve command, got {other:?}"),
        }
    }
}
