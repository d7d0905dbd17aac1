//! dbscaffold binary.
//!
//! Every command prints one JSON [`Response`] on stdout. Logs go to stderr,
//! so the output can be piped straight into other tools.

use clap::Parser;
use dbscaffold::{
    Cli, Command, ConnectionArgs, PASSWORD_ENV, compiled_dialects, load_config, resolve_password,
};
use dbscaffold_core::{
    ConnectionParams, ConnectionSettings, Pipeline, Response, ScaffoldError, init_logging,
};
use serde::Serialize;
use std::process::ExitCode;
use tracing::{error, info};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = init_logging(cli.global.verbose, cli.global.quiet) {
        eprintln!("Error: {}", e);
        return ExitCode::FAILURE;
    }

    match run(cli.command).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            error!("{:#}", e);
            print_json(&serde_json::json!({ "success": false, "error": format!("{:#}", e) }));
            ExitCode::FAILURE
        }
    }
}

/// Runs one command and reports whether its response was successful.
async fn run(command: Command) -> anyhow::Result<bool> {
    match command {
        Command::Analyze(args) => {
            let params = connection_params(&args)?;
            info!("Analyzing {} database", args.dialect);
            Ok(emit(Pipeline::default().analyze(&args.dialect, &params).await))
        }
        Command::Test(args) => {
            let params = connection_params(&args)?;
            info!("Testing {} connection", args.dialect);
            let result = Pipeline::default().test_connection(&args.dialect, &params).await;
            if result.is_ok() {
                info!("✓ Connection test successful");
            }
            Ok(emit(result))
        }
        Command::Generate(args) => {
            let password = resolve_password(args.ask_password, env_password(), prompt)?;
            let config = load_config(&args.config, password)?;
            info!(
                "Generating application from {} into {}",
                args.config.display(),
                args.output_dir.display()
            );
            let result = Pipeline::default()
                .generate_application(&config, &args.output_dir)
                .await;
            if let Ok(report) = &result {
                info!(
                    "✓ Wrote {} files to {}",
                    report.files_written,
                    report.output_dir.display()
                );
            }
            Ok(emit(result))
        }
        Command::Query(args) => {
            let params = connection_params(&args.connection)?;
            let pipeline = Pipeline::new(
                ConnectionSettings::default().with_read_only(!args.writable),
            );
            let dialect = &args.connection.dialect;
            if args.execute {
                Ok(emit(pipeline.execute_statement(dialect, &params, &args.sql).await))
            } else {
                Ok(emit(pipeline.run_query(dialect, &params, &args.sql).await))
            }
        }
        Command::List => {
            let dialects: Vec<_> = compiled_dialects()
                .into_iter()
                .map(|d| {
                    serde_json::json!({
                        "type": d.as_str(),
                        "name": d.display_name(),
                        "default_port": d.default_port(),
                    })
                })
                .collect();
            Ok(emit(Ok::<_, ScaffoldError>(dialects)))
        }
    }
}

fn connection_params(args: &ConnectionArgs) -> anyhow::Result<ConnectionParams> {
    let password = resolve_password(args.ask_password, env_password(), prompt)?;
    Ok(args.to_params(password))
}

fn env_password() -> Option<String> {
    std::env::var(PASSWORD_ENV).ok()
}

fn prompt() -> std::io::Result<String> {
    rpassword::prompt_password("Database password: ")
}

/// Prints the response envelope and returns its success flag.
fn emit<T: Serialize>(result: dbscaffold_core::Result<T>) -> bool {
    if let Err(e) = &result {
        error!("{}", e);
    }
    let response = Response::from_result(result);
    print_json(&response);
    response.success
}

fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Error: failed to render response: {}", e),
    }
}
