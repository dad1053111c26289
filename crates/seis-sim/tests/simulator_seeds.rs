use seis_sim::{run_simulator, SimulatorConfig};

#[tokio::test]
async fn several_seeds_pass() {
    for seed in [1, 7, 42, 1_234] {
        let report = run_simulator(SimulatorConfig {
            seed,
            steps: 300,
            events: 3,
            ..SimulatorConfig::default()
        })
        .await;
        assert!(report.passed(), "seed {seed}:\n{}", report.generate_text());
        assert!(report.stats.records > 0);
        assert!(report.stats.undos > 0);
        assert!(report.stats.interval_changes > 0);
    }
}

#[tokio::test]
async fn same_seed_same_counters() {
    let config = SimulatorConfig {
        seed: 99,
        steps: 150,
        ..SimulatorConfig::default()
    };
    let a = run_simulator(config.clone()).await;
    let b = run_simulator(config).await;

    pretty_assertions::assert_eq!(
        serde_json::to_value(&a.stats).unwrap(),
        serde_json::to_value(&b.stats).unwrap()
    );
}

#[tokio::test]
async fn no_events_still_runs() {
    let report = run_simulator(SimulatorConfig {
        events: 0,
        steps: 100,
        ..SimulatorConfig::default()
    })
    .await;
    assert!(report.passed(), "{}", report.generate_text());
}
