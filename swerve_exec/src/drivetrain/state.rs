//! Implementations for the drivetrain state structure

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, info, trace, warn};
use serde::Serialize;

// Internal
use super::*;
use crate::{
    geom::{ChassisVel, ModuleId, Pose2, WheelState, WheelStates, NUM_MODULES},
    gyro::{Gyro, SimGyro},
    kinematics::{ModuleGeometry, SwerveKinematics},
    pose_est::PoseEstimator,
    sim::{QuadSwerveSim, SimParams},
    traj_ctrl::{HolonomicController, TrajFollower, Trajectory},
    wheel_module::{ActuationTarget, Axis, ModuleController, SimWheelModule, WheelModule},
};
use comms_if::tm::DrivetrainTm;
use util::maths::deadband;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The drivetrain.
pub struct Drivetrain {
    pub(crate) params: DrivetrainParams,

    kinematics: SwerveKinematics,
    module_ctrl: ModuleController,

    modules: [Box<dyn WheelModule>; NUM_MODULES],
    gyro: Box<dyn Gyro>,
    plant: Plant,

    estimator: PoseEstimator,

    /// Controller used by `go_to_pose`.
    go_to_ctrl: HolonomicController,

    orientation_mode: OrientationMode,
    demand: Demand,
    enabled: bool,

    target_states: WheelStates,
    measured_states: Option<WheelStates>,
    actuation: [ActuationTarget; NUM_MODULES],

    est_pose: Pose2,
    speed_ms: f64,
    downfield: bool,

    num_cycles: u64,
}

/// Input data to the drivetrain.
#[derive(Debug, Copy, Clone)]
pub struct InputData {
    /// If false all actuation is zero.
    pub enabled: bool,

    /// Units: volts
    pub battery_voltage_v: f64,
}

/// Output of one drivetrain cycle.
#[derive(Debug, Copy, Clone, Default, Serialize)]
pub struct OutputData {
    /// Voltages applied to each module.
    pub actuation: [ActuationTarget; NUM_MODULES],

    /// Wheel states the modules were asked to reach.
    pub target_states: WheelStates,

    /// The pose estimate after this cycle.
    pub est_pose: Pose2,
}

/// Status report for drivetrain processing.
#[derive(Debug, Copy, Clone, Default, Serialize)]
pub struct StatusReport {
    /// True if wheel speeds were scaled down to respect the module speed
    /// limit.
    pub desaturated: bool,

    /// True if the pose estimate was updated this cycle.
    pub pose_updated: bool,

    /// True if at least one module provided no feedback.
    pub missing_feedback: bool,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// What the modules are attached to.
#[derive(Debug, Clone)]
pub enum Plant {
    /// Real modules which read their own encoders.
    Hardware,

    /// Modules driven by a simulation, which is stepped each cycle.
    Simulated(QuadSwerveSim),
}

/// The held motion demand.
#[derive(Debug, Copy, Clone)]
enum Demand {
    Chassis(ChassisVel),
    Wheels(WheelStates),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for InputData {
    fn default() -> Self {
        Self {
            enabled: false,
            battery_voltage_v: NOMINAL_BATTERY_VOLTAGE_V,
        }
    }
}

impl Drivetrain {
    /// Create a simulated drivetrain, starting at rest at the parameterised
    /// start pose.
    pub fn new_sim(
        params: DrivetrainParams,
        sim_params: &SimParams,
    ) -> Result<Self, DrivetrainError> {
        let kinematics = Self::validate(&params)?;
        let start_pose = params.start_pose();
        let r = params.wheel_radius_m;

        let sim = QuadSwerveSim::new(sim_params, kinematics.clone(), r, start_pose)
            .map_err(DrivetrainError::SimError)?;

        let modules: [Box<dyn WheelModule>; NUM_MODULES] = [
            Box::new(SimWheelModule::new(r)),
            Box::new(SimWheelModule::new(r)),
            Box::new(SimWheelModule::new(r)),
            Box::new(SimWheelModule::new(r)),
        ];

        let mut gyro = SimGyro::default();
        gyro.set_angle(start_pose.heading_rad);

        info!("Simulated drivetrain created");

        Ok(Self::build(
            params,
            kinematics,
            modules,
            Box::new(gyro),
            Plant::Simulated(sim),
        ))
    }

    /// Create a drivetrain driving real modules.
    ///
    /// Modules must be given in `ModuleId` order.
    pub fn new_hardware(
        params: DrivetrainParams,
        modules: [Box<dyn WheelModule>; NUM_MODULES],
        gyro: Box<dyn Gyro>,
    ) -> Result<Self, DrivetrainError> {
        let kinematics = Self::validate(&params)?;

        info!("Hardware drivetrain created");

        Ok(Self::build(params, kinematics, modules, gyro, Plant::Hardware))
    }

    fn validate(params: &DrivetrainParams) -> Result<SwerveKinematics, DrivetrainError> {
        if !(params.wheel_radius_m.is_finite() && params.wheel_radius_m > 0.0) {
            return Err(DrivetrainError::InvalidWheelRadius(params.wheel_radius_m));
        }
        if !(params.ctrl_period_s.is_finite() && params.ctrl_period_s > 0.0) {
            return Err(DrivetrainError::InvalidPeriod(params.ctrl_period_s));
        }

        ModuleGeometry::rectangular(params.track_width_m, params.wheelbase_m)
            .and_then(SwerveKinematics::new)
            .map_err(DrivetrainError::InvalidGeometry)
    }

    fn build(
        params: DrivetrainParams,
        kinematics: SwerveKinematics,
        modules: [Box<dyn WheelModule>; NUM_MODULES],
        gyro: Box<dyn Gyro>,
        plant: Plant,
    ) -> Self {
        let start_pose = params.start_pose();

        let estimator = PoseEstimator::new(
            kinematics.clone(),
            params.ctrl_period_s,
            start_pose,
            gyro.heading_rad(),
            &params.estimator,
        );

        Self {
            kinematics,
            module_ctrl: ModuleController::new(params.module_ctrl.clone()),
            modules,
            gyro,
            plant,
            estimator,
            go_to_ctrl: HolonomicController::new(&params.traj_ctrl, params.ctrl_period_s),
            orientation_mode: OrientationMode::default(),
            demand: Demand::Chassis(ChassisVel::zero()),
            enabled: false,
            target_states: [WheelState::default(); NUM_MODULES],
            measured_states: None,
            actuation: [ActuationTarget::default(); NUM_MODULES],
            est_pose: start_pose,
            speed_ms: 0.0,
            downfield: is_heading_downfield(start_pose.heading_rad),
            num_cycles: 0,
            params,
        }
    }

    /// Perform one control cycle.
    pub fn proc(&mut self, input_data: &InputData) -> (OutputData, StatusReport) {
        let mut report = StatusReport::default();

        if input_data.enabled != self.enabled {
            info!(
                "Drivetrain {}",
                if input_data.enabled { "enabled" } else { "disabled" }
            );
        }
        self.enabled = input_data.enabled;

        // ---- ACTUATION ----

        self.target_states = match self.demand {
            Demand::Chassis(vel) => {
                let mut states = self.kinematics.to_wheel_states(
                    vel,
                    self.est_pose.heading_rad,
                    &self.target_states,
                );
                report.desaturated =
                    SwerveKinematics::desaturate(&mut states, self.params.max_module_speed_ms);
                states
            }
            Demand::Wheels(states) => states,
        };

        for (i, module) in self.modules.iter_mut().enumerate() {
            self.actuation[i] = if self.enabled {
                self.module_ctrl.calc(
                    self.target_states[i],
                    module.measured_state(),
                    input_data.battery_voltage_v,
                )
            } else {
                ActuationTarget::default()
            };

            module.apply(self.actuation[i]);
        }

        // ---- SIMULATION ----

        if let Plant::Simulated(ref mut sim) = self.plant {
            for id in ModuleId::ALL.iter() {
                let module = &self.modules[id.index()];

                if self.enabled {
                    sim.set_input_voltages(
                        *id,
                        module.output_voltage(Axis::Drive),
                        module.output_voltage(Axis::Steer),
                    );
                } else {
                    sim.set_input_voltages(*id, 0.0, 0.0);
                }
            }

            sim.update(self.params.ctrl_period_s);

            for id in ModuleId::ALL.iter() {
                let fb = sim.feedback(*id);
                let module = &mut self.modules[id.index()];

                module.set_encoder_feedback(Axis::Drive, fb.drive_pos_rad, fb.drive_vel_rads);
                module.set_encoder_feedback(Axis::Steer, fb.steer_pos_rad, fb.steer_vel_rads);
            }

            self.gyro.set_angle(sim.actual_pose().heading_rad);
        }

        // ---- FEEDBACK ----

        self.measured_states = self.read_measured_states();
        report.missing_feedback = self.measured_states.is_none();

        // ---- ESTIMATION ----

        self.num_cycles += 1;
        let time_s = self.time_s();

        match self.estimator.update(
            time_s,
            self.gyro.heading_rad(),
            self.measured_states.as_ref(),
        ) {
            Some(pose) => {
                self.speed_ms = self.est_pose.distance(&pose) / self.params.ctrl_period_s;
                self.est_pose = pose;
                self.downfield = is_heading_downfield(pose.heading_rad);
                report.pose_updated = true;
            }
            None => self.speed_ms = 0.0,
        }

        trace!(
            "Cycle {}: pose ({:.3}, {:.3}) m {:.1} deg, speed {:.2} m/s",
            self.num_cycles,
            self.est_pose.x(),
            self.est_pose.y(),
            self.est_pose.heading_deg(),
            self.speed_ms
        );

        (
            OutputData {
                actuation: self.actuation,
                target_states: self.target_states,
                est_pose: self.est_pose,
            },
            report,
        )
    }

    fn read_measured_states(&self) -> Option<WheelStates> {
        let mut states = [WheelState::default(); NUM_MODULES];

        for (state, module) in states.iter_mut().zip(self.modules.iter()) {
            *state = module.measured_state()?;
        }

        Some(states)
    }

    // ---- COMMANDS ----

    /// Hold a chassis velocity demand.
    pub fn set_chassis_vel(&mut self, vel: ChassisVel) {
        if !(vel.vx_ms.is_finite() && vel.vy_ms.is_finite() && vel.omega_rads.is_finite()) {
            warn!("Ignoring non-finite velocity demand {:?}, stopping", vel);
            self.stop();
            return;
        }

        self.demand = Demand::Chassis(vel);
    }

    /// Hold a demand for each wheel directly.
    pub fn set_wheel_states(&mut self, states: WheelStates) {
        if states
            .iter()
            .any(|s| !(s.speed_ms.is_finite() && s.angle_rad.is_finite()))
        {
            warn!("Ignoring non-finite wheel demand {:?}, stopping", states);
            self.stop();
            return;
        }

        self.demand = Demand::Wheels(states);
    }

    /// Hold a joystick-style demand, interpreted under the current
    /// orientation mode.
    pub fn set_input(&mut self, input: SwerveInput) {
        let clamped = input.clamped();
        if clamped != input {
            debug!("Joystick input {:?} clamped to {:?}", input, clamped);
        }

        let band = self.params.input_deadband;
        let vx = deadband(clamped.translate_x, band) * self.params.max_fwd_rev_speed_ms;
        let vy = deadband(clamped.translate_y, band) * self.params.max_strafe_speed_ms;
        let omega = deadband(clamped.rotate, band) * self.params.max_rotate_speed_rads;

        let vel = match self.orientation_mode {
            OrientationMode::FieldOriented => ChassisVel::field(vx, vy, omega),
            OrientationMode::RobotOriented => ChassisVel::robot(vx, vy, omega),
        };

        self.set_chassis_vel(vel);
    }

    /// Demand zero velocity. Wheels keep their current angles.
    pub fn stop(&mut self) {
        self.demand = Demand::Chassis(ChassisVel::zero());
    }

    pub fn set_orientation_mode(&mut self, mode: OrientationMode) {
        if mode != self.orientation_mode {
            info!("Orientation mode set to {:?}", mode);
        }
        self.orientation_mode = mode;
    }

    /// Force the pose estimate to `pose`.
    ///
    /// The drive encoders are zeroed first so the next odometry update
    /// starts from the new pose.
    pub fn set_known_pose(&mut self, pose: Pose2) {
        for module in self.modules.iter_mut() {
            module.reset_drive_encoder();
        }

        self.estimator.reset(pose, self.gyro.heading_rad());
        self.est_pose = pose;
        self.speed_ms = 0.0;
        self.downfield = is_heading_downfield(pose.heading_rad);
        self.go_to_ctrl.reset();
    }

    /// Teleport the simulated vehicle to `pose`. The estimate is not changed.
    pub fn model_reset(&mut self, pose: Pose2) {
        match self.plant {
            Plant::Simulated(ref mut sim) => {
                sim.model_reset(pose);
                self.gyro.set_angle(pose.heading_rad);
            }
            Plant::Hardware => warn!("Model reset requested on a hardware drivetrain, ignoring"),
        }
    }

    /// Make the current heading the new zero heading.
    ///
    /// The estimate keeps its position and takes a heading of zero, so field
    /// oriented driving is relative to the way the chassis now faces.
    pub fn zero_gyro(&mut self) {
        info!("Zeroing heading sensor");
        self.gyro.zero();

        let position = self.est_pose.position_m;
        self.set_known_pose(Pose2 {
            position_m: position,
            heading_rad: 0.0,
        });
    }

    /// Blend an external pose measurement (e.g. vision) into the estimate.
    pub fn add_pose_measurement(&mut self, pose: Pose2) {
        self.estimator.add_vision_measurement(pose);
        self.est_pose = self.estimator.pose();
        self.downfield = is_heading_downfield(self.est_pose.heading_rad);
    }

    /// Create a follower for `trajectory` using the drivetrain's controller
    /// parameters.
    pub fn follower(&self, trajectory: Trajectory) -> TrajFollower {
        TrajFollower::new(
            trajectory,
            HolonomicController::new(&self.params.traj_ctrl, self.params.ctrl_period_s),
        )
    }

    /// Make one correction toward `target`'s position, facing `heading_deg`.
    ///
    /// Translation is limited to `max_speed_ms`. Returns true once the
    /// estimate is within tolerance of the target. Call `reset_go_to_pose`
    /// before heading for a new target.
    pub fn go_to_pose(&mut self, target: Pose2, heading_deg: f64, max_speed_ms: f64) -> bool {
        let mut vel = self.go_to_ctrl.calculate(
            &self.est_pose,
            &target,
            0.0,
            heading_deg.to_radians(),
        );

        let speed_ms = vel.linear_speed_ms();
        let limit_ms = max_speed_ms.abs();
        if speed_ms > limit_ms {
            let scale = limit_ms / speed_ms;
            vel.vx_ms *= scale;
            vel.vy_ms *= scale;
        }

        self.set_chassis_vel(vel);

        self.go_to_ctrl.at_reference()
    }

    /// Forget the history of the go-to-pose controller.
    pub fn reset_go_to_pose(&mut self) {
        self.go_to_ctrl.reset();
    }

    // ---- ACCESSORS ----

    pub fn est_pose(&self) -> Pose2 {
        self.est_pose
    }

    /// The simulated "actual" pose, `None` on hardware.
    pub fn actual_pose(&self) -> Option<Pose2> {
        match self.plant {
            Plant::Simulated(ref sim) => Some(sim.actual_pose()),
            Plant::Hardware => None,
        }
    }

    /// Speed over ground from the last two estimates.
    ///
    /// Units: meters/second
    pub fn speed_ms(&self) -> f64 {
        self.speed_ms
    }

    pub fn is_downfield(&self) -> bool {
        self.downfield
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn orientation_mode(&self) -> OrientationMode {
        self.orientation_mode
    }

    pub fn target_states(&self) -> WheelStates {
        self.target_states
    }

    pub fn measured_states(&self) -> Option<WheelStates> {
        self.measured_states
    }

    pub fn actuation(&self) -> [ActuationTarget; NUM_MODULES] {
        self.actuation
    }

    /// Distance rolled by each wheel since the last encoder reset.
    pub fn drive_distances_m(&self) -> [Option<f64>; NUM_MODULES] {
        let mut distances = [None; NUM_MODULES];
        for (d, module) in distances.iter_mut().zip(self.modules.iter()) {
            *d = module.drive_distance_m();
        }
        distances
    }

    pub fn kinematics(&self) -> &SwerveKinematics {
        &self.kinematics
    }

    pub fn params(&self) -> &DrivetrainParams {
        &self.params
    }

    /// Time of the last completed cycle.
    pub fn time_s(&self) -> f64 {
        self.num_cycles as f64 * self.params.ctrl_period_s
    }

    pub fn num_cycles(&self) -> u64 {
        self.num_cycles
    }

    /// Telemetry for the last completed cycle.
    pub fn telemetry(&self) -> DrivetrainTm {
        let actual = self.actual_pose();
        let measured = self
            .measured_states
            .unwrap_or([WheelState::default(); NUM_MODULES]);
        let [fl, fr, bl, br] = measured;
        let [fl_act, fr_act, bl_act, br_act] = self.actuation;

        DrivetrainTm {
            time_s: self.time_s(),
            enabled: self.enabled,
            field_oriented: self.orientation_mode == OrientationMode::FieldOriented,

            est_x_m: self.est_pose.x(),
            est_y_m: self.est_pose.y(),
            est_heading_rad: self.est_pose.heading_rad,

            act_x_m: actual.map(|p| p.x()),
            act_y_m: actual.map(|p| p.y()),
            act_heading_rad: actual.map(|p| p.heading_rad),

            speed_ms: self.speed_ms,
            downfield: self.downfield,

            fl_speed_ms: fl.speed_ms,
            fl_angle_rad: fl.angle_rad,
            fr_speed_ms: fr.speed_ms,
            fr_angle_rad: fr.angle_rad,
            bl_speed_ms: bl.speed_ms,
            bl_angle_rad: bl.angle_rad,
            br_speed_ms: br.speed_ms,
            br_angle_rad: br.angle_rad,

            fl_drive_v: fl_act.drive_v,
            fl_steer_v: fl_act.steer_v,
            fr_drive_v: fr_act.drive_v,
            fr_steer_v: fr_act.steer_v,
            bl_drive_v: bl_act.drive_v,
            bl_steer_v: bl_act.steer_v,
            br_drive_v: br_act.drive_v,
            br_steer_v: br_act.steer_v,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::traj_ctrl::TrajectorySample;
    use std::cell::Cell;
    use std::f64::consts::FRAC_PI_2;
    use std::rc::Rc;

    const PERIOD_S: f64 = 0.02;

    fn params() -> DrivetrainParams {
        util::params::from_str(include_str!("../../../params/drivetrain.toml")).unwrap()
    }

    fn sim_drivetrain() -> Drivetrain {
        let sim_params: SimParams =
            util::params::from_str(include_str!("../../../params/sim.toml")).unwrap();
        Drivetrain::new_sim(params(), &sim_params).unwrap()
    }

    fn run(dt: &mut Drivetrain, enabled: bool, cycles: usize) {
        let input = InputData {
            enabled,
            battery_voltage_v: 12.0,
        };
        for _ in 0..cycles {
            dt.proc(&input);
        }
    }

    #[test]
    fn test_invalid_params() {
        let sim_params: SimParams =
            util::params::from_str(include_str!("../../../params/sim.toml")).unwrap();

        let mut p = params();
        p.track_width_m = f64::NAN;
        assert!(matches!(
            Drivetrain::new_sim(p, &sim_params),
            Err(DrivetrainError::InvalidGeometry(_))
        ));

        let mut p = params();
        p.ctrl_period_s = 0.0;
        assert!(matches!(
            Drivetrain::new_sim(p, &sim_params),
            Err(DrivetrainError::InvalidPeriod(_))
        ));
    }

    #[test]
    fn test_straight_line() {
        let mut dt = sim_drivetrain();
        dt.set_chassis_vel(ChassisVel::field(1.0, 0.0, 0.0));
        run(&mut dt, true, 50);

        let est = dt.est_pose();
        let act = dt.actual_pose().unwrap();

        assert!((est.x() - 1.0).abs() < 0.1, "est x = {}", est.x());
        assert!((act.x() - 1.0).abs() < 0.1, "act x = {}", act.x());
        assert!(est.y().abs() < 1e-3);
        assert!(est.heading_rad.abs() < 1e-3);

        // Up to speed by the end
        assert!((dt.speed_ms() - 1.0).abs() < 0.05, "speed = {}", dt.speed_ms());
        assert!(dt.is_downfield());
    }

    #[test]
    fn test_pure_rotation() {
        let mut dt = sim_drivetrain();
        dt.set_chassis_vel(ChassisVel::robot(0.0, 0.0, FRAC_PI_2));
        run(&mut dt, true, 50);

        let est = dt.est_pose();
        assert!(
            (est.heading_rad - FRAC_PI_2).abs() < 0.1,
            "heading = {} deg",
            est.heading_rad.to_degrees()
        );
        assert!(est.position_m.norm() < 0.05);

        // The estimate follows the heading sensor, which follows the model
        let act = dt.actual_pose().unwrap();
        assert!((act.heading_rad - est.heading_rad).abs() < 0.01);
    }

    #[test]
    fn test_disabled_coast() {
        let mut dt = sim_drivetrain();
        dt.set_chassis_vel(ChassisVel::robot(2.0, 1.0, 1.0));

        let input = InputData {
            enabled: false,
            battery_voltage_v: 12.0,
        };
        for _ in 0..20 {
            let (output, _) = dt.proc(&input);
            for a in output.actuation.iter() {
                assert_eq!(*a, ActuationTarget::default());
            }
        }

        assert_eq!(dt.actual_pose(), Some(Pose2::default()));
        assert_eq!(dt.speed_ms(), 0.0);
        assert!(!dt.is_enabled());

        // Disabling while moving lets the vehicle coast to a stop
        run(&mut dt, true, 25);
        assert!(dt.speed_ms() > 0.5);
        run(&mut dt, false, 100);
        assert!(dt.speed_ms() < 0.05, "speed = {}", dt.speed_ms());
    }

    #[test]
    fn test_stationary_speed() {
        let mut dt = sim_drivetrain();
        run(&mut dt, true, 10);

        assert_eq!(dt.speed_ms(), 0.0);
        assert_eq!(dt.est_pose(), Pose2::default());
        assert!(dt.measured_states().is_some());
    }

    #[test]
    fn test_set_known_pose() {
        let mut dt = sim_drivetrain();
        dt.set_chassis_vel(ChassisVel::robot(1.0, 0.0, 0.0));
        run(&mut dt, true, 20);
        assert!(dt.drive_distances_m()[0].unwrap() > 0.1);

        let known = Pose2::from_degrees(3.0, 2.0, 135.0);
        dt.set_known_pose(known);

        assert_eq!(dt.est_pose(), known);
        assert!(!dt.is_downfield());
        for d in dt.drive_distances_m().iter() {
            assert_eq!(*d, Some(0.0));
        }

        // The next update continues from the known pose
        dt.stop();
        run(&mut dt, true, 1);
        assert!(dt.est_pose().distance(&known) < 0.1);
        assert!((dt.est_pose().heading_rad - known.heading_rad).abs() < 0.01);
    }

    #[test]
    fn test_orientation_modes() {
        let mut dt = sim_drivetrain();
        dt.set_known_pose(Pose2::from_degrees(0.0, 0.0, 90.0));

        // Facing field +Y, field oriented forwards drives to the robot's right
        dt.set_orientation_mode(OrientationMode::FieldOriented);
        dt.set_input(SwerveInput::new(0.5, 0.0, 0.0));
        run(&mut dt, false, 1);
        for s in dt.target_states().iter() {
            assert!((s.angle_rad + FRAC_PI_2).abs() < 1e-6);
        }

        dt.set_orientation_mode(OrientationMode::RobotOriented);
        dt.set_input(SwerveInput::new(0.5, 0.0, 0.0));
        run(&mut dt, false, 1);
        for s in dt.target_states().iter() {
            assert!(s.angle_rad.abs() < 1e-6);
            assert!(s.speed_ms > 0.0);
        }

        // Inside the deadband nothing moves and wheels hold their angle
        dt.set_input(SwerveInput::new(0.01, -0.01, 0.0));
        run(&mut dt, false, 1);
        for s in dt.target_states().iter() {
            assert_eq!(s.speed_ms, 0.0);
        }
    }

    #[test]
    fn test_desaturation() {
        let mut dt = sim_drivetrain();
        dt.set_input(SwerveInput::new(1.0, 1.0, 1.0));
        let (output, report) = dt.proc(&InputData::default());

        assert!(report.desaturated);
        let max_module_speed_ms = dt.params().max_module_speed_ms;
        for s in output.target_states.iter() {
            assert!(s.speed_ms <= max_module_speed_ms + 1e-9);
        }
    }

    #[test]
    fn test_model_reset() {
        let mut dt = sim_drivetrain();
        let teleport = Pose2::new(5.0, 5.0, 1.0);
        dt.model_reset(teleport);

        assert_eq!(dt.actual_pose(), Some(teleport));
        assert_eq!(dt.est_pose(), Pose2::default());
    }

    #[test]
    fn test_zero_gyro() {
        let mut dt = sim_drivetrain();
        dt.set_chassis_vel(ChassisVel::robot(0.0, 0.0, 1.0));
        run(&mut dt, true, 25);
        dt.stop();
        run(&mut dt, true, 10);
        assert!(dt.est_pose().heading_rad > 0.2);

        dt.zero_gyro();
        assert_eq!(dt.est_pose().heading_rad, 0.0);

        run(&mut dt, true, 5);
        assert!(dt.est_pose().heading_rad.abs() < 0.05);
    }

    #[test]
    fn test_go_to_pose() {
        let mut dt = sim_drivetrain();
        let target = Pose2::new(1.0, 0.5, 0.0);

        let mut reached = false;
        for _ in 0..250 {
            if dt.go_to_pose(target, 45.0, 1.5) {
                reached = true;
                break;
            }
            run(&mut dt, true, 1);
            assert!(dt.speed_ms() < 1.5 + 0.1);
        }

        assert!(reached, "Stopped at {:?}", dt.est_pose());
        assert!(dt.est_pose().distance(&target) < 0.1);
    }

    #[test]
    fn test_follow_trajectory() {
        let mut dt = sim_drivetrain();

        let sample = |t: f64| TrajectorySample {
            time_s: t,
            pose: Pose2::new(0.5 * t, 0.0, 0.0),
            velocity_ms: 0.5,
            heading_rad: 0.0,
        };
        let traj = Trajectory::new((0..=4).map(|i| sample(i as f64 * 0.5)).collect()).unwrap();
        let mut follower = dt.follower(traj);

        let start_s = dt.time_s();
        loop {
            let out = follower.step(dt.time_s() - start_s, &dt.est_pose());
            dt.set_chassis_vel(out.vel);
            if out.complete {
                break;
            }
            run(&mut dt, true, 1);
            assert!(dt.time_s() < 10.0);
        }

        assert!((dt.est_pose().x() - 1.0).abs() < 0.1, "x = {}", dt.est_pose().x());
        assert!(dt.est_pose().y().abs() < 0.05);
    }

    #[test]
    fn test_telemetry() {
        let mut dt = sim_drivetrain();
        dt.set_chassis_vel(ChassisVel::robot(0.5, 0.0, 0.0));
        run(&mut dt, true, 5);

        let tm = dt.telemetry();
        assert!((tm.time_s - 5.0 * PERIOD_S).abs() < 1e-9);
        assert!(tm.enabled);
        assert!(tm.field_oriented);
        assert!(tm.act_x_m.is_some());
        assert_eq!(tm.est_x_m, dt.est_pose().x());
        assert!(tm.fl_drive_v > 0.0);
    }

    /// A hardware module whose feedback is written by the test.
    struct TestModule {
        feedback: Rc<Cell<Option<WheelState>>>,
        applied: ActuationTarget,
    }

    impl WheelModule for TestModule {
        fn apply(&mut self, target: ActuationTarget) {
            self.applied = target;
        }

        fn output_voltage(&self, axis: Axis) -> f64 {
            match axis {
                Axis::Drive => self.applied.drive_v,
                Axis::Steer => self.applied.steer_v,
            }
        }

        fn set_encoder_feedback(&mut self, _: Axis, _: f64, _: f64) {}

        fn absolute_angle(&self) -> f64 {
            self.feedback.get().map(|s| s.angle_rad).unwrap_or(0.0)
        }

        fn measured_state(&self) -> Option<WheelState> {
            self.feedback.get()
        }

        fn drive_distance_m(&self) -> Option<f64> {
            None
        }

        fn reset_drive_encoder(&mut self) {}
    }

    #[test]
    fn test_hardware_cold_start() {
        let feedback = Rc::new(Cell::new(None));
        let module = || -> Box<dyn WheelModule> {
            Box::new(TestModule {
                feedback: feedback.clone(),
                applied: ActuationTarget::default(),
            })
        };

        let mut dt = Drivetrain::new_hardware(
            params(),
            [module(), module(), module(), module()],
            Box::new(SimGyro::default()),
        )
        .unwrap();
        assert!(dt.actual_pose().is_none());

        dt.set_chassis_vel(ChassisVel::robot(1.0, 0.0, 0.0));
        let input = InputData {
            enabled: true,
            battery_voltage_v: 12.0,
        };

        // No feedback yet, the estimate is held at the start pose
        for _ in 0..10 {
            let (output, report) = dt.proc(&input);
            assert!(report.missing_feedback && !report.pose_updated);
            assert_eq!(output.est_pose, Pose2::default());
            assert!(output.actuation[0].drive_v > 0.0);
        }
        assert_eq!(dt.speed_ms(), 0.0);

        // Ignored on hardware
        dt.model_reset(Pose2::new(5.0, 5.0, 1.0));
        assert!(dt.actual_pose().is_none());
        assert_eq!(dt.est_pose(), Pose2::default());

        // Feedback arrives, every wheel rolling forwards at 1 m/s
        feedback.set(Some(WheelState::new(1.0, 0.0)));
        for _ in 0..5 {
            let (_, report) = dt.proc(&input);
            assert!(!report.missing_feedback && report.pose_updated);
        }

        assert!((dt.est_pose().x() - 5.0 * PERIOD_S).abs() < 1e-9);
        assert!(dt.est_pose().y().abs() < 1e-9);
        assert!((dt.speed_ms() - 1.0).abs() < 1e-9);
    }
}
