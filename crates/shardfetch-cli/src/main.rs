use shardfetch_lib::cli::{ResolvedCommand, parse_args, resolve_command, run_download, run_validate};
use shardfetch_lib::error::ShardFetchError;

#[tokio::main(flavor = "multi_thread")]
async fn main() -> Result<(), ShardFetchError> {
    color_eyre::install()?;

    let args = parse_args();
    let command = resolve_command(args.command)?;

    match command {
        ResolvedCommand::Download(params) => run_download(params).await?,
        ResolvedCommand::Validate(params) => run_validate(params).await?,
    }

    Ok(())
}
