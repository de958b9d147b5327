use docker_manifest_client::cli::{Args, Runner};
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse_args();

    let runner = match Runner::new(args) {
        Ok(runner) => runner,
        Err(err) => {
            eprintln!("❌ ERROR: {}", err);
            return ExitCode::from(2);
        }
    };

    match runner.run().await {
        Ok(0) => ExitCode::SUCCESS,
        Ok(_) => ExitCode::FAILURE,
        Err(err) => {
            eprintln!("❌ ERROR: {}", err);
            ExitCode::FAILURE
        }
    }
}
