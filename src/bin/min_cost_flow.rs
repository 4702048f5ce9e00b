use std::process::ExitCode;

use dotenv::dotenv;
use log::error;

use logistics_flow::config::{AppConfig, ReportFormat};
use logistics_flow::domain::solver::SolveOptions;
use logistics_flow::domain::solver_factory::create_solver;
use logistics_flow::flow::{reference_network, solve_min_cost_flow};

fn run() -> logistics_flow::Result<()> {
    let config = AppConfig::from_env()?;
    let solver = create_solver(config.solver);
    let network = reference_network()?;

    let result = solve_min_cost_flow(
        &network,
        solver.as_ref(),
        &SolveOptions::with_time_limit(config.stage1_time_limit),
    )?;

    match config.report_format {
        ReportFormat::Text => print!("{}", result),
        ReportFormat::Json => println!("{}", serde_json::to_string_pretty(&result)?),
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
