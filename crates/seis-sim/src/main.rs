use anyhow::Context;
use clap::{value_parser, Arg, ArgAction, Command};
use seis_sim::{run_simulator, SimulatorConfig, SIM_INTERVAL};
use tracing_subscriber::EnvFilter;

const CHECKS: [&str; 6] = [
    "no partition holds an id twice",
    "reconciling the last payload again is a no-op",
    "every cached partition equals the authority's query for its window",
    "only observed windows hold a partition",
    "cached history log equals the authority's log",
    "a rejected request leaves the cache and busy counter untouched",
];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .with_target(true)
        .init();

    let cli = Command::new("seis-sim")
        .version(seis_sim::VERSION)
        .about("History session simulator")
        .subcommand(
            Command::new("simulate")
                .about("Run random undo/redo sessions against the in-memory authority")
                .arg(
                    Arg::new("steps")
                        .long("steps")
                        .default_value("1000")
                        .value_parser(value_parser!(u64))
                        .help("Number of operations to simulate"),
                )
                .arg(
                    Arg::new("seed")
                        .long("seed")
                        .default_value("42")
                        .value_parser(value_parser!(u64))
                        .help("Random seed for reproducibility"),
                )
                .arg(
                    Arg::new("events")
                        .long("events")
                        .default_value("4")
                        .value_parser(value_parser!(usize))
                        .help("Number of events seeded into the authority"),
                )
                .arg(
                    Arg::new("stop-on-violation")
                        .long("stop-on-violation")
                        .action(ArgAction::SetTrue)
                        .help("Stop simulation on first violation"),
                )
                .arg(
                    Arg::new("json")
                        .long("json")
                        .action(ArgAction::SetTrue)
                        .help("Output as JSON"),
                ),
        )
        .subcommand(Command::new("report").about("List the invariants the simulator checks"));

    let matches = cli.get_matches();

    match matches.subcommand() {
        Some(("simulate", args)) => {
            let defaults = SimulatorConfig::default();
            let config = SimulatorConfig {
                seed: args.get_one::<u64>("seed").copied().unwrap_or(defaults.seed),
                steps: args.get_one::<u64>("steps").copied().unwrap_or(defaults.steps),
                events: args.get_one::<usize>("events").copied().unwrap_or(defaults.events),
                stop_on_first_violation: args.get_flag("stop-on-violation"),
                ..defaults
            };
            let json = args.get_flag("json");

            tracing::info!(
                "simulating {} steps, seed {}, {} events",
                config.steps,
                config.seed,
                config.events
            );
            let report = run_simulator(config).await;

            if json {
                println!("{}", report.generate_json().context("failed to encode report")?);
            } else {
                println!("{}", report.generate_text());
            }

            std::process::exit(if report.passed() { 0 } else { 1 });
        }
        Some(("report", _)) => {
            println!("History Session Simulator");
            println!("=========================");
            println!();
            println!("Interval: {SIM_INTERVAL}");
            println!("Checks after every step:");
            for check in CHECKS {
                println!("  - {check}");
            }
        }
        _ => {
            println!("run `seis-sim simulate --help` for options");
        }
    }

    Ok(())
}
