//! Whole-engine properties of the calcium simulation
//!
//! Stability of the resting state, field bounds under extreme stimuli,
//! absence of phantom fluxes, seed determinism, generated cell structure,
//! locality of uncaging and buffer reconfiguration.
use approx::assert_abs_diff_eq;
use calcium_sim_core::{CalciumSimulation, GatingMode, ModelParameters};
use tracing_subscriber::EnvFilter;

#[ctor::ctor]
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn params(grid_size: usize) -> ModelParameters {
    ModelParameters {
        grid_size,
        ..Default::default()
    }
}

fn assert_bounded(sim: &CalciumSimulation) {
    let bounds = sim.parameters().bounds();
    let checks = [
        ("calcium", sim.calcium(), bounds.calcium_max),
        ("er_calcium", sim.er_calcium(), bounds.er_calcium_max),
        ("mito_calcium", sim.mito_calcium(), bounds.mito_calcium_max),
        ("ip3", sim.ip3(), bounds.ip3_max),
        ("buffer_bound", sim.buffer_bound(), bounds.buffer_max),
    ];
    for (name, field, max) in checks {
        for &v in &field.data {
            assert!(
                (0.0..=max).contains(&v),
                "{name} out of bounds at step {}: {v}",
                sim.step_count()
            );
        }
    }
    for (open, cluster) in sim.ip3r_open().data.iter().zip(&sim.ip3r_clusters().data) {
        assert!(open <= cluster, "open {open} exceeds cluster {cluster}");
    }
}

#[test]
fn test_resting_state_is_stable() {
    // Small dt keeps the explicit scheme well inside its stability region
    let p = ModelParameters {
        grid_size: 64,
        dt: 1e-5,
        ..Default::default()
    };
    let mut sim = CalciumSimulation::with_seed(p, 11).unwrap();
    let eq = sim.equilibrium_calcium();
    assert!(!sim.equilibrium_fallback());
    assert_abs_diff_eq!(eq, 5.0376e-4, epsilon = 1e-7);

    for _ in 0..1000 {
        sim.step();
        let (lo, hi) = sim.calcium().min_max();
        assert!((lo - eq).abs() < 1e-4 && (hi - eq).abs() < 1e-4);
    }
    // No IP3 means no channel ever opens
    assert_eq!(sim.stats().open_channels, 0);
}

#[test]
fn test_fields_bounded_under_strong_stimuli() {
    for mode in [GatingMode::Lumped, GatingMode::PerChannel] {
        let p = ModelParameters {
            ip3r_cluster_density: 0.2,
            ip3r_open_rate: 5.0,
            ..params(40)
        };
        let mut sim = CalciumSimulation::with_seed(p, 3).unwrap();
        sim.set_gating_mode(mode);
        sim.inject_ip3_global(1.0e6, 0.001).unwrap();
        sim.schedule_local_uncaging(20.0, 20.0, 8.0, 1.0e4, 0.05).unwrap();
        assert_bounded(&sim);

        for _ in 0..100 {
            sim.step();
            assert_bounded(&sim);
        }
        assert!(sim.stats().total_channels > 0);
    }
}

#[test]
fn test_no_phantom_flux_without_sources_or_sinks() {
    let p = ModelParameters {
        leak_rate: 0.0,
        pmca_rate: 0.0,
        mcu_rate: 0.0,
        ..params(32)
    };
    let mut sim = CalciumSimulation::with_seed(p.clone(), 5).unwrap();
    assert_eq!(sim.equilibrium_calcium(), 0.0);

    for _ in 0..200 {
        sim.step();
    }
    assert!(sim.calcium().data.iter().all(|&v| v == 0.0));
    assert!(sim.er_calcium().data.iter().all(|&v| v == p.er_calcium_init));
    assert!(sim.mito_calcium().data.iter().all(|&v| v == p.mito_calcium_init));
    assert!(sim.ip3().data.iter().all(|&v| v == 0.0));
    assert!(sim.buffer_bound().data.iter().all(|&v| v == 0.0));
    assert_eq!(sim.ip3r_open().total(), 0);
}

#[test]
fn test_same_seed_same_trajectory() {
    let p = ModelParameters {
        ip3r_cluster_density: 0.1,
        ip3r_open_rate: 1.0,
        ..params(48)
    };
    let run = || {
        let mut sim = CalciumSimulation::with_seed(p.clone(), 1234).unwrap();
        sim.inject_ip3_local(24.0, 24.0, 10.0, 5.0, 0.01).unwrap();
        sim.schedule_global_uncaging(0.5, 0.02).unwrap();
        for _ in 0..60 {
            sim.step();
        }
        sim
    };

    let a = run();
    let b = run();
    assert_eq!(a.ip3r_clusters(), b.ip3r_clusters());
    assert_eq!(a.er_mask(), b.er_mask());
    assert_eq!(a.ip3r_open(), b.ip3r_open());
    assert_eq!(a.calcium(), b.calcium());
    assert_eq!(a.er_calcium(), b.er_calcium());
    assert_eq!(a.mito_calcium(), b.mito_calcium());
    assert_eq!(a.ip3(), b.ip3());
    assert_eq!(a.buffer_bound(), b.buffer_bound());
    assert_eq!(a.stats(), b.stats());
}

#[test]
fn test_different_seeds_differ() {
    let a = CalciumSimulation::with_seed(params(64), 1).unwrap();
    let b = CalciumSimulation::with_seed(params(64), 2).unwrap();
    assert_ne!(a.er_mask(), b.er_mask());
}

#[test]
fn test_structure_at_reference_size() {
    let sim = CalciumSimulation::with_seed(params(200), 42).unwrap();
    let n = 200;

    let pm = sim.plasma_membrane_mask();
    for row in 0..n {
        for col in 0..n {
            let border = row == 0 || col == 0 || row == n - 1 || col == n - 1;
            assert_eq!(pm.is_set(row, col), border, "PM at ({row}, {col})");
        }
    }
    assert_eq!(sim.plasma_membrane_site_count(), 4 * n - 4);

    assert!(sim.er_site_count() > 0);
    assert!(sim.mitochondria_site_count() > 0);

    let stats = sim.stats();
    assert!(stats.cluster_sites > 0);
    assert!(stats.total_channels > 0);

    // Clusters only sit on ER
    for (count, er) in sim.ip3r_clusters().data.iter().zip(&sim.er_mask().data) {
        if *count > 0 {
            assert_eq!(*er, 1);
        }
    }
}

#[test]
fn test_regenerate_structure_keeps_fields() {
    let mut sim = CalciumSimulation::with_seed(params(64), 9).unwrap();
    sim.inject_ip3_global(1.0, 0.01).unwrap();
    let ip3_before = sim.ip3().clone();
    let er_before = sim.er_mask().clone();

    sim.regenerate_structure();
    assert_ne!(sim.er_mask(), &er_before);
    assert_eq!(sim.ip3(), &ip3_before);
    assert_eq!(sim.ip3r_open().total(), 0);
}

#[test]
fn test_local_uncaging_is_local() {
    let mut sim = CalciumSimulation::with_seed(params(200), 8).unwrap();
    sim.inject_ip3_local(100.0, 100.0, 5.0, 1.0, 1.0).unwrap();
    let dt = sim.parameters().dt;
    let ip3 = sim.ip3();

    for row in 0..200 {
        for col in 0..200 {
            let d_sq = (col as f64 - 100.0).powi(2) + (row as f64 - 100.0).powi(2);
            let v = ip3.get(row, col);
            if d_sq <= 25.0 {
                assert_abs_diff_eq!(v, dt, epsilon = 1e-15);
            } else {
                assert_eq!(v, 0.0, "IP3 leaked to ({row}, {col})");
            }
        }
    }
    assert_eq!(ip3.get(100, 120), 0.0);
}

#[test]
fn test_set_buffer_conditions_resets_fields() {
    let mut sim = CalciumSimulation::with_seed(params(48), 17).unwrap();
    sim.schedule_global_uncaging(2.0, 0.05).unwrap();
    sim.run(20);
    let er_mask = sim.er_mask().clone();

    sim.set_buffer_conditions(50.0, 1.0, 50.0).unwrap();

    let p = sim.parameters();
    assert_eq!(p.buffer_total, 50.0);
    assert_eq!(p.buffer_kd, 1.0);
    assert_eq!(p.buffer_kon, 50.0);

    let eq = sim.equilibrium_calcium();
    let bound = 50.0 * eq / (eq + 1.0);
    assert!(sim.calcium().data.iter().all(|&v| v == eq));
    assert!(sim.buffer_bound().data.iter().all(|&v| v == bound));
    assert!(sim.ip3().data.iter().all(|&v| v == 0.0));
    assert!(sim.er_calcium().data.iter().all(|&v| v == p.er_calcium_init));
    assert!(sim.mito_calcium().data.iter().all(|&v| v == p.mito_calcium_init));
    assert_eq!(sim.ip3r_open().total(), 0);
    assert_eq!(sim.step_count(), 0);
    assert!(sim.active_pulses().is_empty());
    assert_eq!(sim.er_mask(), &er_mask);
}

#[test]
fn test_set_buffer_conditions_rejects_negative() {
    let mut sim = CalciumSimulation::with_seed(params(32), 1).unwrap();
    assert!(sim.set_buffer_conditions(-1.0, 1.0, 1.0).is_err());
    assert_eq!(sim.parameters().buffer_total, 100.0);
}

#[test]
fn test_equilibrium_fallback_without_serca() {
    let p = ModelParameters {
        serca_rate: 0.0,
        ..params(32)
    };
    let mut sim = CalciumSimulation::with_seed(p, 1).unwrap();
    assert!(sim.equilibrium_fallback());
    assert_eq!(sim.equilibrium_calcium(), 0.0);
    sim.step();
    assert!(sim.calcium().data.iter().all(|v| v.is_finite()));
}
