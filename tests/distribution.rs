use logistics_flow::config::{AppConfig, InstanceConfig};
use logistics_flow::distribution::planning::{plan_distribution, Corridor, Goal};
use logistics_flow::distribution::routing::{plan_routes, RoutingParams};
use logistics_flow::distribution::{run_pipeline, run_stages, DistanceMatrix, Instance, StageOutcome, Vehicle};
use logistics_flow::domain::solver::{SolveOptions, Solver};
use logistics_flow::domain::solvers::MicrolpSolver;
use logistics_flow::models::{IntegerProgram, Solution, Status};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::process::Command;
use std::time::Duration;

/// Solves exactly but reports optimal results as unproven incumbents
struct IncumbentSolver;

impl Solver for IncumbentSolver {
    fn solve(&self, program: &IntegerProgram, options: &SolveOptions) -> logistics_flow::Result<Solution> {
        let mut solution = MicrolpSolver::new().solve(program, options)?;
        if solution.status == Status::Optimal {
            solution.status = Status::Feasible;
        }
        Ok(solution)
    }

    fn name(&self) -> &str {
        "incumbent"
    }
}

fn fleet(count: usize) -> Vec<Vehicle> {
    (0..count)
        .map(|id| Vehicle {
            id,
            capacity: 50,
            cost_per_distance: 4,
        })
        .collect()
}

/// Producers 0-1, relays 2-3, consumers 4-6
fn two_tier_instance() -> Instance {
    let mut d = DistanceMatrix::new(7);
    d.set_symmetric(0, 2, 10);
    d.set_symmetric(0, 3, 40);
    d.set_symmetric(1, 2, 30);
    d.set_symmetric(1, 3, 15);
    d.set_symmetric(2, 4, 10);
    d.set_symmetric(2, 5, 20);
    d.set_symmetric(2, 6, 35);
    d.set_symmetric(3, 4, 25);
    d.set_symmetric(3, 5, 30);
    d.set_symmetric(3, 6, 12);
    Instance::from_parts(&[100, 100], 2, &[30, 40, 20], fleet(2), d).unwrap()
}

/// Two relays 0 and 1 joined by a corridor of length 10
fn corridor_instance(vehicles: usize) -> Instance {
    let mut d = DistanceMatrix::new(2);
    d.set_symmetric(0, 1, 10);
    Instance::from_parts(&[], 2, &[], fleet(vehicles), d).unwrap()
}

fn single_goal(target: i64) -> Corridor {
    Corridor::new(vec![Goal { from: 0, to: 1, target }])
}

fn route(instance: &Instance, corridor: &Corridor, params: &RoutingParams) -> StageOutcome<logistics_flow::distribution::RoutePlan> {
    plan_routes(instance, corridor, params, &MicrolpSolver::new(), &SolveOptions::default()).unwrap()
}

#[test]
fn test_stage1_selects_cheapest_corridor() {
    let instance = two_tier_instance();
    let outcome = plan_distribution(&instance, &MicrolpSolver::new(), &SolveOptions::default()).unwrap();
    let plan = outcome.plan().expect("stage 1 should be solved");

    assert_eq!(plan.objective, 67);
    let selected: Vec<(usize, usize, i64)> = plan.selected.iter().map(|a| (a.from, a.to, a.volume)).collect();
    assert_eq!(
        selected,
        vec![(0, 2, 70), (1, 3, 20), (2, 4, 30), (2, 5, 40), (3, 6, 20)]
    );
    assert_eq!(plan.verify(&instance), Ok(()));

    let corridor = plan.corridor();
    assert_eq!(corridor.goals.len(), 5);
    assert!(corridor.paths.contains(&(4, 2)));
    assert!(corridor.paths.contains(&(6, 6)));
    assert!(!corridor.paths.contains(&(0, 3)));
}

#[test]
fn test_stage2_single_vehicle_covers_goal() {
    let instance = corridor_instance(1);
    let corridor = single_goal(50);
    let params = RoutingParams {
        horizon: 3,
        max_distance: 500,
    };
    let outcome = route(&instance, &corridor, &params);
    let plan = outcome.plan().unwrap();
    assert_eq!(plan.objective, 80);
    assert_eq!(plan.assignments.len(), 3);
    assert_eq!(plan.verify(&instance, &corridor, &params), Ok(()));
}

#[test]
fn test_stage2_target_above_fleet_capacity_is_infeasible() {
    let params = RoutingParams {
        horizon: 3,
        max_distance: 500,
    };
    let outcome = route(&corridor_instance(1), &single_goal(100), &params);
    assert_eq!(outcome, StageOutcome::Unsolved(Status::Infeasible));
}

#[test]
fn test_stage2_second_vehicle_doubles_coverage() {
    let instance = corridor_instance(2);
    let corridor = single_goal(100);
    let params = RoutingParams {
        horizon: 3,
        max_distance: 500,
    };
    let outcome = route(&instance, &corridor, &params);
    let plan = outcome.plan().unwrap();
    assert_eq!(plan.objective, 160);
    assert_eq!(plan.verify(&instance, &corridor, &params), Ok(()));
    assert_eq!(plan.route_distance(&instance, 1), 20);
}

#[test]
fn test_stage2_boundaries_report_infeasibility() {
    let params = RoutingParams {
        horizon: 3,
        max_distance: 10,
    };
    assert_eq!(
        route(&corridor_instance(1), &single_goal(50), &params),
        StageOutcome::Unsolved(Status::Infeasible)
    );

    let zero_horizon = RoutingParams {
        horizon: 0,
        max_distance: 500,
    };
    assert_eq!(
        route(&corridor_instance(1), &single_goal(50), &zero_horizon),
        StageOutcome::Unsolved(Status::Infeasible)
    );

    let params = RoutingParams {
        horizon: 3,
        max_distance: 500,
    };
    assert_eq!(
        route(&corridor_instance(0), &single_goal(50), &params),
        StageOutcome::Unsolved(Status::Infeasible)
    );
}

#[test]
fn test_no_demand_gives_trivial_plan() {
    let mut d = DistanceMatrix::new(3);
    d.set_symmetric(0, 1, 10);
    d.set_symmetric(1, 2, 20);
    let instance = Instance::from_parts(&[100], 1, &[0], fleet(1), d).unwrap();
    let params = RoutingParams {
        horizon: 5,
        max_distance: 500,
    };
    let outcome = run_stages(
        instance,
        &params,
        &MicrolpSolver::new(),
        &SolveOptions::default(),
        &SolveOptions::default(),
    )
    .unwrap();

    assert_eq!(outcome.stage1.plan().unwrap().objective, 0);
    let routes = outcome.stage2.as_ref().and_then(StageOutcome::plan).unwrap();
    assert_eq!(routes.objective, 0);
    assert!(routes.assignments.is_empty());
}

#[test]
fn test_pipeline_routes_through_relay() {
    let mut d = DistanceMatrix::new(3);
    d.set_symmetric(0, 1, 10);
    d.set_symmetric(1, 2, 20);
    let instance = Instance::from_parts(&[100], 1, &[50], fleet(1), d).unwrap();
    let params = RoutingParams {
        horizon: 5,
        max_distance: 500,
    };
    let outcome = run_stages(
        instance,
        &params,
        &MicrolpSolver::new(),
        &SolveOptions::default(),
        &SolveOptions::default(),
    )
    .unwrap();

    let plan = outcome.stage1.plan().unwrap();
    assert_eq!(plan.objective, 30);
    assert_eq!(plan.verify(&outcome.instance), Ok(()));

    let routes = outcome.stage2.as_ref().and_then(StageOutcome::plan).unwrap();
    assert_eq!(routes.objective, 240);
    assert_eq!(routes.verify(&outcome.instance, &plan.corridor(), &params), Ok(()));
    assert_eq!(routes.route_distance(&outcome.instance, 0), 60);

    let text = outcome.to_string();
    assert!(text.contains("Stage 2 (routing): total cost 240"));
    assert_eq!(text.lines().filter(|line| line.starts_with("0,")).count(), 5);
}

#[test]
fn test_failed_stage1_skips_routing() {
    let mut d = DistanceMatrix::new(3);
    d.set_symmetric(0, 1, 10);
    d.set_symmetric(1, 2, 20);
    let instance = Instance::from_parts(&[20], 1, &[50], fleet(1), d).unwrap();
    let params = RoutingParams {
        horizon: 5,
        max_distance: 500,
    };
    let outcome = run_stages(
        instance,
        &params,
        &MicrolpSolver::new(),
        &SolveOptions::default(),
        &SolveOptions::default(),
    )
    .unwrap();

    assert_eq!(outcome.stage1, StageOutcome::Unsolved(Status::Infeasible));
    assert!(outcome.stage2.is_none());
    assert!(outcome.to_string().ends_with("no solution\n"));
}

#[test]
fn test_incumbent_plans_feed_routing() {
    let mut d = DistanceMatrix::new(3);
    d.set_symmetric(0, 1, 10);
    d.set_symmetric(1, 2, 20);
    let instance = Instance::from_parts(&[100], 1, &[50], fleet(1), d).unwrap();
    let params = RoutingParams {
        horizon: 5,
        max_distance: 500,
    };
    let outcome = run_stages(
        instance,
        &params,
        &IncumbentSolver,
        &SolveOptions::default(),
        &SolveOptions::default(),
    )
    .unwrap();

    let plan = outcome.stage1.plan().expect("incumbent should be reported");
    assert_eq!(plan.status, Status::Feasible);
    let routes = outcome.stage2.as_ref().and_then(StageOutcome::plan).expect("routing should run");
    assert_eq!(routes.status, Status::Feasible);
    assert_eq!(routes.objective, 240);
}

#[test]
fn test_stage1_time_limit_without_incumbent_stops_pipeline() {
    let config = AppConfig {
        stage1_time_limit: Some(Duration::from_nanos(1)),
        instance: InstanceConfig {
            producers: 3,
            relays: 4,
            consumers: 20,
            vehicles: 2,
            supply_range: (1000, 1000),
            ..InstanceConfig::default()
        },
        ..AppConfig::default()
    };
    let outcome = run_pipeline(&config, &MicrolpSolver::new()).unwrap();
    assert!(outcome.instance.total_supply() >= outcome.instance.total_demand());
    assert_eq!(outcome.stage1, StageOutcome::Unsolved(Status::TimeLimit));
    assert!(outcome.stage2.is_none());
    assert!(outcome.to_string().ends_with("no solution\n"));
}

#[test]
fn test_duplicate_vehicle_ids_are_rejected() {
    let mut fleet = fleet(2);
    fleet[1].id = 0;
    let mut d = DistanceMatrix::new(2);
    d.set_symmetric(0, 1, 10);
    assert!(matches!(
        Instance::from_parts(&[], 2, &[], fleet, d),
        Err(logistics_flow::Error::InvalidInput(_))
    ));
}

#[test]
fn test_same_seed_same_instance() {
    let config = InstanceConfig {
        seed: 11,
        producers: 2,
        relays: 3,
        consumers: 6,
        vehicles: 3,
        ..InstanceConfig::default()
    };
    let first = Instance::generate(&config, &mut ChaCha8Rng::seed_from_u64(config.seed)).unwrap();
    let second = Instance::generate(&config, &mut ChaCha8Rng::seed_from_u64(config.seed)).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_default_configuration_runs_out_of_supply() {
    let config = AppConfig::default();
    let outcome = run_pipeline(&config, &MicrolpSolver::new()).unwrap();
    assert!(outcome.instance.total_supply() < outcome.instance.total_demand());
    assert_eq!(outcome.stage1, StageOutcome::Unsolved(Status::Infeasible));
    assert!(outcome.stage2.is_none());
}

#[test]
fn test_binary_reports_default_instance() {
    let mut command = Command::new(env!("CARGO_BIN_EXE_distribution-plan"));
    for key in [
        "SOLVER",
        "REPORT_FORMAT",
        "STAGE1_TIME_LIMIT_SECS",
        "STAGE2_TIME_LIMIT_SECS",
        "DISTRIBUTION_SEED",
        "PRODUCERS",
        "RELAYS",
        "CONSUMERS",
        "VEHICLES",
        "VEHICLE_CAPACITY",
        "VEHICLE_COST",
        "HORIZON",
        "MAX_DISTANCE",
        "RUST_LOG",
    ] {
        command.env_remove(key);
    }
    let output = command.output().expect("Failed to run distribution-plan");
    assert!(output.status.success());
    assert_eq!(String::from_utf8(output.stdout).unwrap(), "Stage 1 (arc selection)\nno solution\n");
}
