//! # Kinematics Benchmark

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use swerve_lib::{
    drivetrain::{Drivetrain, DrivetrainParams, InputData},
    geom::{ChassisVel, WheelState, NUM_MODULES},
    kinematics::{ModuleGeometry, SwerveKinematics},
    sim::SimParams,
};

fn kinematics_benchmark(c: &mut Criterion) {
    let kinematics =
        SwerveKinematics::new(ModuleGeometry::rectangular(0.5, 0.5).unwrap()).unwrap();

    let vel = ChassisVel::field(1.2, -0.4, 2.0);
    let prev = [WheelState::default(); NUM_MODULES];

    c.bench_function("SwerveKinematics::to_wheel_states", |b| {
        b.iter(|| kinematics.to_wheel_states(black_box(vel), black_box(0.7), &prev))
    });

    let states = kinematics.to_wheel_states(vel, 0.7, &prev);

    c.bench_function("SwerveKinematics::to_chassis_vel", |b| {
        b.iter(|| kinematics.to_chassis_vel(black_box(&states)))
    });
}

fn drivetrain_benchmark(c: &mut Criterion) {
    let params: DrivetrainParams =
        util::params::from_str(include_str!("../../params/drivetrain.toml")).unwrap();
    let sim_params: SimParams =
        util::params::from_str(include_str!("../../params/sim.toml")).unwrap();

    let mut drivetrain = Drivetrain::new_sim(params, &sim_params).unwrap();
    drivetrain.set_chassis_vel(ChassisVel::field(1.0, 0.5, 1.0));

    let input = InputData {
        enabled: true,
        ..Default::default()
    };

    // One full cycle including the simulation sub-steps
    c.bench_function("Drivetrain::proc", |b| b.iter(|| drivetrain.proc(&input)));
}

criterion_group!(benches, kinematics_benchmark, drivetrain_benchmark);
criterion_main!(benches);
