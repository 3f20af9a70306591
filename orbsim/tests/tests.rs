use approx::assert_relative_eq;

use orbsim::simulation::forces::{AccelSet, Acceleration, GrPotential, NewtonianGravity};
use orbsim::simulation::heartbeat::{IntervalSchedule, ProgressReporter};
use orbsim::simulation::integrator::{check_state, verlet_integrator, IntegratorState};
use orbsim::simulation::scenario::{mercury_offset, KAPPA_RANGE};
use orbsim::{
    construct_fresh, gr_potential_defaults, orbit_to_particle, solar_system, ConstructionError,
    ConstructionSpec, Effect, EffectError, EffectSet, IntegratorError, IntegratorKind, NVec3,
    OrbitalElements, Particle, ParamValue, Perturbation, RunConfig, RunConfigFile, SemiMajorOffset,
    System,
};

use std::f64::consts::PI;
use std::path::PathBuf;

/// Build a simple 2-body System separated along x-axis
pub fn two_body_system(dist: f64, m1: f64, m2: f64) -> System {
    let b1 = Particle::new([-dist / 2.0, 0.0, 0.0].into(), NVec3::zeros(), m1);
    let b2 = Particle::new([dist / 2.0, 0.0, 0.0].into(), NVec3::zeros(), m2);
    System {
        bodies: vec![b1, b2],
        t: 0.0,
    }
}

/// Run parameters for tests
pub fn test_run(integrator: IntegratorKind) -> RunConfig {
    RunConfig {
        archive_path: PathBuf::from("unused.bin"),
        end_time: 1.0,
        dt: 0.001,
        checkpoint_interval: 1.0,
        report_interval: 1.0,
        integrator,
        G: 1.0,
        max_distance: None,
    }
}

/// Central mass 1, one body with mass ratio 1e-6 on a = 1, e = 0.1
pub fn two_body_spec() -> ConstructionSpec {
    ConstructionSpec::Elements {
        central_mass: 1.0,
        bodies: vec![OrbitalElements::planar(1e-6, 1.0, 0.1, 0.0, 0.0)],
        perturbation: None,
    }
}

fn com_residuals(sys: &System) -> (f64, f64) {
    let mut x = NVec3::zeros();
    let mut v = NVec3::zeros();
    for b in &sys.bodies {
        x += b.m * b.x;
        v += b.m * b.v;
    }
    (x.norm(), v.norm())
}

fn energy(sys: &System, g: f64) -> f64 {
    let mut e = 0.0;
    for (i, bi) in sys.bodies.iter().enumerate() {
        e += 0.5 * bi.m * bi.v.norm_squared();
        for bj in &sys.bodies[i + 1..] {
            e -= g * bi.m * bj.m / (bj.x - bi.x).norm();
        }
    }
    e
}

// ==================================================================================
// Gravity tests
// ==================================================================================

#[test]
fn gravity_newton_third_law() {
    let sys = two_body_system(1.0, 2.0, 3.0);
    let forces = AccelSet::new().with(NewtonianGravity { G: 0.1 });

    let mut acc = vec![NVec3::zeros(); 2];
    forces.accumulate_accels(sys.t, &sys, &mut acc);

    let net = acc[0] * sys.bodies[0].m + acc[1] * sys.bodies[1].m;
    assert!(net.norm() < 1e-12, "Net momentum not zero: {:?}", net);
}

#[test]
fn gravity_inverse_square_law() {
    let sys_r = two_body_system(1.0, 1.0, 1.0);
    let sys_2r = two_body_system(2.0, 1.0, 1.0);
    let forces = AccelSet::new().with(NewtonianGravity { G: 1.0 });

    let mut acc_r = vec![NVec3::zeros(); 2];
    let mut acc_2r = vec![NVec3::zeros(); 2];
    forces.accumulate_accels(0.0, &sys_r, &mut acc_r);
    forces.accumulate_accels(0.0, &sys_2r, &mut acc_2r);

    assert_relative_eq!(acc_r[0].norm() / acc_2r[0].norm(), 4.0, epsilon = 1e-12);
}

#[test]
fn gr_potential_is_attractive_and_conserves_momentum() {
    let mut sys = two_body_system(1.0, 1.0, 1e-3);
    sys.bodies[0].x = NVec3::zeros();
    sys.bodies[1].x = NVec3::new(1.0, 0.0, 0.0);

    let gr = GrPotential { G: 1.0, c: 100.0 };
    let mut acc = vec![NVec3::zeros(); 2];
    gr.acceleration(0.0, &sys, &mut acc);

    // a = -6 (G M)^2 / (c^2 r^4) r
    assert_relative_eq!(acc[1].x, -6.0 / 1.0e4, epsilon = 1e-15);
    let net = acc[0] * sys.bodies[0].m + acc[1] * sys.bodies[1].m;
    assert!(net.norm() < 1e-18, "GR term should not change total momentum: {:?}", net);
}

// ==================================================================================
// Orbit conversion tests
// ==================================================================================

#[test]
fn circular_orbit_speed() {
    let sun = Particle::at_rest(1.0);
    let el = OrbitalElements::planar(1e-3, 2.0, 0.0, 0.0, 0.0);
    let p = orbit_to_particle(1.0, &sun, &el);

    assert_relative_eq!(p.x, NVec3::new(2.0, 0.0, 0.0), epsilon = 1e-15);
    let v_circ = (1.0f64 * (1.0 + 1e-3) / 2.0).sqrt();
    assert_relative_eq!(p.v, NVec3::new(0.0, v_circ, 0.0), epsilon = 1e-15);
    assert_relative_eq!(p.m, 1e-3);
}

#[test]
fn eccentric_orbit_apsides() {
    let sun = Particle::at_rest(1.0);
    let peri = orbit_to_particle(1.0, &sun, &OrbitalElements::planar(1e-6, 1.0, 0.1, 0.0, 0.0));
    let apo = orbit_to_particle(1.0, &sun, &OrbitalElements::planar(1e-6, 1.0, 0.1, 0.0, PI));

    assert_relative_eq!(peri.x.norm(), 0.9, epsilon = 1e-14);
    assert_relative_eq!(apo.x.norm(), 1.1, epsilon = 1e-14);
    // vis-viva: v^2 = mu (2/r - 1/a)
    let mu = 1.0 + 1e-6;
    assert_relative_eq!(peri.v.norm_squared(), mu * (2.0 / 0.9 - 1.0), epsilon = 1e-12);
    assert_relative_eq!(apo.v.norm_squared(), mu * (2.0 / 1.1 - 1.0), epsilon = 1e-12);
}

#[test]
fn inclined_orbit_leaves_the_plane() {
    let sun = Particle::at_rest(1.0);
    let el = OrbitalElements {
        mass_ratio: 1e-6,
        a: 1.0,
        e: 0.0,
        inc: PI / 2.0,
        node: 0.0,
        peri: PI / 2.0,
        anomaly: 0.0,
    };
    let p = orbit_to_particle(1.0, &sun, &el);
    assert_relative_eq!(p.x, NVec3::new(0.0, 0.0, 1.0), epsilon = 1e-12);
    // angular momentum lies in the reference plane
    let h = p.x.cross(&p.v);
    assert!(h.z.abs() < 1e-12);
}

#[test]
fn orbit_relative_to_moving_primary() {
    let primary = Particle::new(NVec3::new(1.0, 2.0, 3.0), NVec3::new(0.5, 0.0, 0.0), 1.0);
    let el = OrbitalElements::planar(1e-6, 1.0, 0.0, 0.0, 0.0);
    let p = orbit_to_particle(1.0, &primary, &el);
    assert_relative_eq!(p.x, NVec3::new(2.0, 2.0, 3.0), epsilon = 1e-14);
    assert_relative_eq!(p.v.x, 0.5, epsilon = 1e-14);
}

// ==================================================================================
// Construction tests
// ==================================================================================

#[test]
fn fresh_two_body_is_in_com_frame() {
    let run = test_run(IntegratorKind::Verlet);
    let sim = construct_fresh(&two_body_spec(), &run).unwrap();

    assert_eq!(sim.particle_count(), 2);
    assert_eq!(sim.t(), 0.0);
    assert_eq!(sim.steps(), 0);
    let (x, v) = com_residuals(sim.system());
    assert!(x < 1e-12 && v < 1e-12, "COM residuals {x} {v}");
    // the central body moved off the origin to balance the planet
    assert!(sim.system().bodies[0].x.norm() > 0.0);
}

#[test]
fn fresh_solar_system_is_in_com_frame() {
    let run = test_run(IntegratorKind::Verlet);
    let perturbation = Perturbation {
        eccentricity_scale: 0.9,
        semi_major_offset: Some(mercury_offset(1.0)),
    };
    let spec = solar_system(&perturbation).unwrap();
    let sim = construct_fresh(&spec, &run).unwrap();

    assert_eq!(sim.particle_count(), 10);
    assert_eq!(sim.perturbation(), Some(&perturbation));
    let (x, v) = com_residuals(sim.system());
    assert!(x < 1e-12 && v < 1e-12, "COM residuals {x} {v}");
}

#[test]
fn ephemeris_used_as_given_then_recentred() {
    let run = test_run(IntegratorKind::Leapfrog);
    let bodies = vec![
        Particle::new(NVec3::new(1.0, 0.0, 0.0), NVec3::zeros(), 1.0),
        Particle::new(NVec3::new(3.0, 0.0, 0.0), NVec3::new(0.0, 1.0, 0.0), 1.0),
    ];
    let sim = construct_fresh(&ConstructionSpec::Ephemeris { bodies }, &run).unwrap();

    // separation is preserved, origin moves to the barycentre
    let b = &sim.system().bodies;
    assert_relative_eq!(b[0].x, NVec3::new(-1.0, 0.0, 0.0));
    assert_relative_eq!(b[1].x, NVec3::new(1.0, 0.0, 0.0));
    assert_relative_eq!(b[1].v - b[0].v, NVec3::new(0.0, 1.0, 0.0));
    assert_eq!(sim.integrator(), IntegratorKind::Leapfrog);
}

#[test]
fn construction_rejects_bad_input() {
    let run = test_run(IntegratorKind::Verlet);

    let zero_ratio = ConstructionSpec::Elements {
        central_mass: 1.0,
        bodies: vec![OrbitalElements::planar(0.0, 1.0, 0.1, 0.0, 0.0)],
        perturbation: None,
    };
    assert!(matches!(
        construct_fresh(&zero_ratio, &run),
        Err(ConstructionError::NonPositiveMassRatio { index: 1, .. })
    ));

    let unbound = ConstructionSpec::Elements {
        central_mass: 1.0,
        bodies: vec![OrbitalElements::planar(1e-6, 1.0, 1.0, 0.0, 0.0)],
        perturbation: None,
    };
    assert!(matches!(
        construct_fresh(&unbound, &run),
        Err(ConstructionError::UnboundEccentricity { .. })
    ));

    let no_sun = ConstructionSpec::Elements { central_mass: 0.0, bodies: vec![], perturbation: None };
    assert!(matches!(
        construct_fresh(&no_sun, &run),
        Err(ConstructionError::NonPositiveCentralMass { .. })
    ));

    let empty = ConstructionSpec::Ephemeris { bodies: vec![] };
    assert!(matches!(construct_fresh(&empty, &run), Err(ConstructionError::NoParticles)));

    let negative = ConstructionSpec::Ephemeris { bodies: vec![Particle::at_rest(-1.0)] };
    assert!(matches!(
        construct_fresh(&negative, &run),
        Err(ConstructionError::NegativeMass { index: 0, .. })
    ));

    let massless = ConstructionSpec::Ephemeris { bodies: vec![Particle::at_rest(0.0)] };
    assert!(matches!(construct_fresh(&massless, &run), Err(ConstructionError::ZeroTotalMass)));
}

#[test]
fn perturbation_scales_and_offsets() {
    let mut bodies = vec![
        OrbitalElements { inc: 0.2, ..OrbitalElements::planar(1e-6, 1.0, 0.1, 0.0, 0.0) },
        OrbitalElements::planar(1e-6, 2.0, 0.2, 0.0, 0.0),
    ];
    let p = Perturbation {
        eccentricity_scale: 0.5,
        semi_major_offset: Some(SemiMajorOffset { body: 1, delta: 0.25 }),
    };
    p.apply(&mut bodies).unwrap();

    assert_relative_eq!(bodies[0].e, 0.05);
    assert_relative_eq!(bodies[0].inc, 0.1);
    assert_relative_eq!(bodies[1].e, 0.1);
    assert_relative_eq!(bodies[0].a, 1.0);
    assert_relative_eq!(bodies[1].a, 2.25);

    let out_of_range = Perturbation {
        eccentricity_scale: 1.0,
        semi_major_offset: Some(SemiMajorOffset { body: 5, delta: 0.1 }),
    };
    assert!(matches!(
        out_of_range.apply(&mut bodies),
        Err(ConstructionError::PerturbationOutOfRange { body: 5, count: 2 })
    ));
}

#[test]
fn sampled_kappa_is_seeded_and_in_range() {
    let a = Perturbation::sample_kappa(Some(7));
    let b = Perturbation::sample_kappa(Some(7));
    assert_eq!(a, b);
    assert!((KAPPA_RANGE.0..=KAPPA_RANGE.1).contains(&a));
}

// ==================================================================================
// Integrator tests
// ==================================================================================

#[test]
fn verlet_conserves_energy_over_one_orbit() {
    let mut run = test_run(IntegratorKind::Verlet);
    run.dt = 2.0 * PI / 2000.0;
    let mut sim = construct_fresh(&two_body_spec(), &run).unwrap();
    let forces = AccelSet::new().with(NewtonianGravity { G: 1.0 });

    let e0 = energy(sim.system(), 1.0);
    let x0 = sim.system().bodies[1].x;
    for _ in 0..2000 {
        sim.step(&forces, None).unwrap();
    }
    let e1 = energy(sim.system(), 1.0);

    assert!(((e1 - e0) / e0).abs() < 1e-5, "energy drift {}", (e1 - e0) / e0);
    // back near the starting point after one period
    assert!((sim.system().bodies[1].x - x0).norm() < 1e-2);
    assert_eq!(sim.steps(), 2000);
}

#[test]
fn leapfrog_conserves_energy_over_one_orbit() {
    let mut run = test_run(IntegratorKind::Leapfrog);
    run.dt = 2.0 * PI / 2000.0;
    let mut sim = construct_fresh(&two_body_spec(), &run).unwrap();
    let forces = AccelSet::new().with(NewtonianGravity { G: 1.0 });

    let e0 = energy(sim.system(), 1.0);
    for _ in 0..2000 {
        sim.step(&forces, None).unwrap();
    }
    let e1 = energy(sim.system(), 1.0);
    assert!(((e1 - e0) / e0).abs() < 1e-5);
    assert!(sim.integrator_state().cached_accel.is_none());
}

#[test]
fn verlet_cache_matches_fresh_force_evaluation() {
    let forces = AccelSet::new().with(NewtonianGravity { G: 1.0 });
    let mut sys = two_body_system(1.0, 1.0, 1e-3);
    sys.bodies[1].v = NVec3::new(0.0, 1.0, 0.0);

    let mut cached = IntegratorState::default();
    verlet_integrator(&mut sys, &forces, 0.01, &mut cached).unwrap();
    assert!(cached.cached_accel.is_some());

    let mut a = sys.clone();
    let mut b = sys.clone();
    verlet_integrator(&mut a, &forces, 0.01, &mut cached).unwrap();
    verlet_integrator(&mut b, &forces, 0.01, &mut IntegratorState::default()).unwrap();
    assert_eq!(a, b);
}

#[test]
fn verlet_rejects_cache_of_wrong_size() {
    let forces = AccelSet::new().with(NewtonianGravity { G: 1.0 });
    let mut sys = two_body_system(1.0, 1.0, 1.0);
    let mut state = IntegratorState { cached_accel: Some(vec![NVec3::zeros(); 3]) };

    let err = verlet_integrator(&mut sys, &forces, 0.01, &mut state).unwrap_err();
    assert!(matches!(err, IntegratorError::StateMismatch { cached: 3, particles: 2 }));
}

#[test]
fn check_state_flags_breakdown() {
    let mut sys = two_body_system(1.0, 1.0, 1.0);
    assert!(check_state(&sys, Some(10.0)).is_ok());

    assert!(matches!(
        check_state(&sys, Some(0.1)),
        Err(IntegratorError::Ejection { index: 0, .. })
    ));

    sys.bodies[1].v.y = f64::NAN;
    assert!(matches!(check_state(&sys, None), Err(IntegratorError::NonFinite { index: 1, .. })));
}

// ==================================================================================
// Heartbeat scheduling tests
// ==================================================================================

#[test]
fn interval_schedule_fires_once_per_boundary() {
    let mut s = IntervalSchedule::new(1.0, 0.0);
    assert_eq!(s.due(0.5), None);
    assert_eq!(s.due(1.0), Some(1));
    assert_eq!(s.due(1.0), None);
    assert_eq!(s.due(1.7), None);
    // skipping over several boundaries fires once
    assert_eq!(s.due(3.2), Some(3));
    assert_eq!(s.due(3.9), None);
}

#[test]
fn interval_schedule_does_not_refire_on_resume() {
    let mut s = IntervalSchedule::new(2.0, 4.0);
    assert_eq!(s.due(4.0), None);
    assert_eq!(s.due(5.9), None);
    assert_eq!(s.due(6.0), Some(3));
}

#[test]
fn interval_schedule_is_exact_after_many_steps() {
    // boundary detection uses t directly, no accumulated counter
    let dt = 8.0 / 365.25 * 2.0 * PI;
    let interval = 2.0 * PI * 1.0e3;
    let mut s = IntervalSchedule::new(interval, 0.0);
    let mut fired = 0;
    let mut t = 0.0;
    for _ in 0..2_000_000 {
        t += dt;
        if s.due(t).is_some() {
            fired += 1;
            let k = (t / interval).floor();
            assert!(t - k * interval < dt);
        }
    }
    assert_eq!(fired as f64, (t / interval).floor());
}

#[test]
fn progress_reporter_measures_fraction() {
    let mut r = ProgressReporter::new(0.0, 10.0);
    let p = r.measure(5.0);
    assert_relative_eq!(p.fraction, 0.5);
    assert!(p.eta.is_some());
}

// ==================================================================================
// Effect tests
// ==================================================================================

#[test]
fn default_effects_build_gravity_plus_gr() {
    let forces = gr_potential_defaults().build_forces(1.0).unwrap();
    assert_eq!(forces.len(), 2);
    assert_eq!(EffectSet::new().build_forces(1.0).unwrap().len(), 1);
}

#[test]
fn effect_errors_are_reported() {
    let unknown = EffectSet::new().with(Effect::new("tides_constant_time_lag"));
    assert!(matches!(unknown.build_forces(1.0), Err(EffectError::UnknownEffect { .. })));

    let missing = EffectSet::new().with(Effect::new("gr_potential"));
    assert!(matches!(missing.build_forces(1.0), Err(EffectError::MissingParam { .. })));

    let wrong = EffectSet::new().with(Effect::new("gr_potential").with_param("c", ParamValue::Int(3)));
    assert!(matches!(wrong.build_forces(1.0), Err(EffectError::WrongParamType { .. })));

    let zero = EffectSet::new().with(Effect::new("gr_potential").with_param("c", ParamValue::Double(0.0)));
    assert!(matches!(zero.build_forces(1.0), Err(EffectError::NonPositiveParam { .. })));
}

// ==================================================================================
// Configuration tests
// ==================================================================================

const TWO_BODY_YAML: &str = r#"
run:
  archive: runs/two_body.bin
  end_time: 10.0
  dt: 0.01
  checkpoint_interval: 1.0
  integrator: "verlet"

system:
  kind: elements
  central_mass: 1.0
  bodies:
    - { mass_ratio: 1.0e-6, a: 1.0, e: 0.1, anomaly: 180.0 }
"#;

#[test]
fn yaml_run_config_defaults() {
    let cfg: RunConfigFile = serde_yaml::from_str(TWO_BODY_YAML).unwrap();
    let run = cfg.run_config().unwrap();

    assert_eq!(run.archive_path, PathBuf::from("runs/two_body.bin"));
    assert_eq!(run.report_interval, run.checkpoint_interval);
    assert_eq!(run.G, 1.0);
    assert_eq!(run.integrator, IntegratorKind::Verlet);
    assert_eq!(run.effects_path(), PathBuf::from("runs/two_body.bin.effects"));
    // no effects section: gr_potential defaults
    assert_eq!(cfg.effect_set(), gr_potential_defaults());

    match cfg.construction_spec().unwrap() {
        ConstructionSpec::Elements { central_mass, bodies, .. } => {
            assert_eq!(central_mass, 1.0);
            assert_relative_eq!(bodies[0].anomaly, PI, epsilon = 1e-15);
        }
        other => panic!("unexpected spec {other:?}"),
    }
}

#[test]
fn yaml_sampled_kappa_reaches_the_simulation() {
    let yaml = TWO_BODY_YAML.replace(
        "    - { mass_ratio: 1.0e-6, a: 1.0, e: 0.1, anomaly: 180.0 }",
        "    - { mass_ratio: 1.0e-6, a: 1.0, e: 0.1, anomaly: 180.0 }\n  perturbation: { sample_kappa: true }",
    );
    let cfg: RunConfigFile = serde_yaml::from_str(&yaml).unwrap();
    let run = cfg.run_config().unwrap();

    let spec = cfg.construction_spec().unwrap();
    let kappa = match &spec {
        ConstructionSpec::Elements { bodies, perturbation: Some(p), .. } => {
            assert_relative_eq!(bodies[0].e, 0.1 * p.eccentricity_scale);
            p.eccentricity_scale
        }
        other => panic!("unexpected spec {other:?}"),
    };
    assert!((KAPPA_RANGE.0..KAPPA_RANGE.1).contains(&kappa));

    let sim = construct_fresh(&spec, &run).unwrap();
    assert_eq!(sim.perturbation().map(|p| p.eccentricity_scale), Some(kappa));
}

#[test]
fn yaml_effects_and_ephemeris() {
    let yaml = r#"
run:
  archive: eph.bin
  end_time: 1.0
  dt: 0.1
  checkpoint_interval: 0.5
  integrator: "leapfrog"
system:
  kind: ephemeris
  bodies:
    - { x: [0.0, 0.0, 0.0], v: [0.0, 0.0, 0.0], m: 1.0 }
    - { x: [1.0, 0.0], v: [0.0, 1.0, 0.0], m: 0.001 }
effects:
  - name: gr_potential
    params: { c: 500.5, order: 2 }
"#;
    let cfg: RunConfigFile = serde_yaml::from_str(yaml).unwrap();
    let effects = cfg.effect_set();
    let gr = effects.get("gr_potential").unwrap();
    assert_eq!(gr.param("c"), Some(ParamValue::Double(500.5)));
    assert_eq!(gr.param("order"), Some(ParamValue::Int(2)));

    let err = cfg.construction_spec().unwrap_err();
    assert!(matches!(
        err,
        orbsim::Error::Construction(ConstructionError::MalformedVector { index: 1, field: "x", len: 2 })
    ));
}

#[test]
fn yaml_rejects_bad_cadence() {
    let yaml = TWO_BODY_YAML.replace("dt: 0.01", "dt: 0.0");
    let cfg: RunConfigFile = serde_yaml::from_str(&yaml).unwrap();
    assert!(cfg.run_config().is_err());
}
