use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    tapclaw::init();

    let goal: String = std::env::args().skip(1).collect::<Vec<_>>().join(" ");
    if goal.trim().is_empty() {
        eprintln!("usage: tapclaw <goal>");
        return ExitCode::from(2);
    }

    match tapclaw::run_task(&goal).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => {
            tracing::warn!("run ended without a terminal status");
            ExitCode::FAILURE
        }
        Err(e) => {
            tracing::error!(error = %e, "run failed");
            ExitCode::FAILURE
        }
    }
}
