use std::process::ExitCode;

use dotenv::dotenv;
use log::{error, info};

use logistics_flow::config::{AppConfig, ReportFormat};
use logistics_flow::distribution::report::render_json;
use logistics_flow::distribution::run_pipeline;
use logistics_flow::domain::solver_factory::create_solver;

fn run() -> logistics_flow::Result<()> {
    let config = AppConfig::from_env()?;
    let solver = create_solver(config.solver);
    info!("Planning distribution with {}", solver.name());

    let outcome = run_pipeline(&config, solver.as_ref())?;

    match config.report_format {
        ReportFormat::Text => print!("{}", outcome),
        ReportFormat::Json => println!("{}", render_json(&outcome)?),
    }
    Ok(())
}

fn main() -> ExitCode {
    dotenv().ok();
    env_logger::init();

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}
