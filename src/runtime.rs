// Fixed-rate control loop with watchdog
//
// Joystick commands drive the teleop pipeline; motion commands drive the
// coordinator's async API and are polled for settling every tick. Only one
// of the two owns the drive at a time: fresh joystick input cancels an
// outstanding motion, and a motion request takes over from teleop.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::{Duration, Instant};

use tokio::time::interval;
use tracing::{debug, error, info, warn};

use crate::chassis::{
    AsyncPositionController, ChassisController, ChassisModel, ChassisScales, DriveProfile,
    Gearset, GearsetRatioPair, ThreadDelay,
};
use crate::config::{
    Args, CMD_TIMEOUT, GEAR_RATIO, LEFT_MOTOR_IDS, POSITION_KP, RIGHT_MOTOR_IDS,
    SETTLE_TOLERANCE, TELEOP_TAKEOVER_DEADBAND, TOPIC_CMD_JOYSTICK, TOPIC_CMD_MOTION, TOPIC_HEALTH, TOPIC_RT_DRIVE,
    TOPIC_STATE, WHEEL_DIAMETER_M, WHEEL_TRACK_M,
};
use crate::curve::{shared, ExpoCurve};
use crate::error::{ChassisError, Result};
use crate::messages::{
    ChassisState, ControlMode, DriveActuation, JoystickCommand, MotionCommand, RuntimeHealth,
};
use crate::motor::{self, FeetechBus, FeetechSide, FeetechSkidSteer, PositionLoopConfig, SideMotors};
use crate::sim::simulated_chassis;
use crate::units::{Angle, Length};

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

pub struct Runtime<C, M> {
    chassis: ChassisController<C, M, ThreadDelay>,
    profile: DriveProfile,
    latest_joystick: Option<JoystickCommand>,
    joystick_received_at: Instant,
    cmd_timeout: Duration,
    mode: ControlMode,
    health: RuntimeHealth,
}

impl<C, M> Runtime<C, M>
where
    C: AsyncPositionController,
    M: ChassisModel,
{
    pub fn new(chassis: ChassisController<C, M, ThreadDelay>, profile: DriveProfile) -> Self {
        Self {
            chassis,
            profile,
            latest_joystick: None,
            joystick_received_at: Instant::now(),
            cmd_timeout: CMD_TIMEOUT,
            mode: ControlMode::Idle,
            health: RuntimeHealth::CmdStale, // Start stale until first cmd
        }
    }

    pub fn with_cmd_timeout(mut self, timeout: Duration) -> Self {
        self.cmd_timeout = timeout;
        self
    }

    pub fn mode(&self) -> ControlMode {
        self.mode
    }

    pub fn health(&self) -> RuntimeHealth {
        self.health
    }

    pub fn chassis(&self) -> &ChassisController<C, M, ThreadDelay> {
        &self.chassis
    }

    /// Process incoming stick input. Sticks inside the deadband never
    /// interrupt an autonomous motion.
    pub fn on_joystick(&mut self, cmd: JoystickCommand) -> Result<()> {
        if self.mode == ControlMode::Autonomous {
            if !is_deflected(&cmd) {
                debug!("Ignoring centred sticks during motion");
                return Ok(());
            }
            warn!("Operator input during motion, cancelling motion");
            self.chassis.stop()?;
        }
        if self.mode != ControlMode::Teleop {
            info!("Teleop ({:?} profile) took over the drive", self.profile.kind());
        }
        self.mode = ControlMode::Teleop;
        self.latest_joystick = Some(cmd);
        self.joystick_received_at = Instant::now();
        Ok(())
    }

    /// Process incoming autonomous request
    pub fn on_motion(&mut self, cmd: MotionCommand) -> Result<()> {
        info!("Received motion command: {:?}", cmd);
        match cmd {
            MotionCommand::MoveDistance { meters } => {
                self.begin_motion()?;
                self.chassis.move_distance_async(Length::meters(meters))?;
            }
            MotionCommand::MoveRaw { ticks } => {
                self.begin_motion()?;
                self.chassis.move_distance_async(ticks)?;
            }
            MotionCommand::TurnAngle { degrees } => {
                self.begin_motion()?;
                self.chassis.turn_angle_async(Angle::degrees(degrees))?;
            }
            MotionCommand::TurnRaw { ticks } => {
                self.begin_motion()?;
                self.chassis.turn_angle_async(ticks)?;
            }
            MotionCommand::Stop => {
                self.chassis.stop()?;
                self.mode = ControlMode::Idle;
            }
            MotionCommand::SetMaxVelocity { velocity } => self.chassis.set_max_velocity(velocity)?,
            MotionCommand::SetTurnsMirrored { mirrored } => {
                self.chassis.set_turns_mirrored(mirrored)
            }
        }
        Ok(())
    }

    /// Motion takes the drive away from teleop
    fn begin_motion(&mut self) -> Result<()> {
        if self.mode == ControlMode::Teleop {
            info!("Motion request took over the drive from teleop");
            self.chassis.model_mut().stop()?;
            self.latest_joystick = None;
        }
        self.mode = ControlMode::Autonomous;
        Ok(())
    }

    /// Run one control tick and return the open-loop actuation applied
    pub fn tick(&mut self, dt: Duration) -> Result<DriveActuation> {
        self.chassis.step(dt)?;

        match self.mode {
            ControlMode::Autonomous => {
                self.health = RuntimeHealth::Ok;
                if self.chassis.poll_settled()? {
                    info!("Motion settled");
                    self.mode = ControlMode::Idle;
                }
                Ok(DriveActuation::default())
            }
            ControlMode::Teleop => self.teleop_tick(),
            ControlMode::Idle => Ok(DriveActuation::default()),
        }
    }

    fn teleop_tick(&mut self) -> Result<DriveActuation> {
        let cmd_age = self.joystick_received_at.elapsed();

        match self.latest_joystick {
            Some(cmd) if cmd_age <= self.cmd_timeout => {
                self.health = RuntimeHealth::Ok;
                let (first, second) =
                    self.profile
                        .apply(self.chassis.model_mut(), cmd.first, cmd.second)?;
                let (left, right) = self.profile.side_outputs(first, second);
                Ok(DriveActuation { left, right })
            }
            _ => {
                // Watchdog triggered - stop the robot
                if self.health != RuntimeHealth::CmdStale {
                    warn!("Joystick stale ({:?} old), stopping robot", cmd_age);
                }
                self.health = RuntimeHealth::CmdStale;
                self.chassis.model_mut().stop()?;
                self.latest_joystick = None;
                self.mode = ControlMode::Idle;
                Ok(DriveActuation::default())
            }
        }
    }

    /// Record a fault and bring the chassis to rest
    pub fn fault(&mut self, e: &ChassisError) {
        error!("Chassis fault: {}", e);
        self.health = RuntimeHealth::Fault;
        self.mode = ControlMode::Idle;
        self.latest_joystick = None;
        if let Err(stop_err) = self.chassis.stop() {
            error!("Failed to stop chassis after fault: {}", stop_err);
        }
    }

    pub fn state(&self) -> ChassisState {
        let left = self.chassis.left_controller();
        let right = self.chassis.right_controller();
        ChassisState {
            mode: self.mode,
            left_target: left.target(),
            right_target: right.target(),
            enabled: !left.is_disabled() || !right.is_disabled(),
            turns_mirrored: self.chassis.turns_mirrored(),
            max_velocity: self.chassis.model().max_velocity(),
        }
    }
}

fn is_deflected(cmd: &JoystickCommand) -> bool {
    cmd.first.abs() > TELEOP_TAKEOVER_DEADBAND || cmd.second.abs() > TELEOP_TAKEOVER_DEADBAND
}

fn build_chassis<C, M>(
    left: C,
    right: C,
    model: M,
    args: &Args,
) -> Result<ChassisController<C, M, ThreadDelay>>
where
    C: AsyncPositionController,
    M: ChassisModel,
{
    let gearset = GearsetRatioPair::new(Gearset::Sts3215, GEAR_RATIO)?;
    let scales = ChassisScales::new(
        Length::meters(WHEEL_DIAMETER_M),
        Length::meters(WHEEL_TRACK_M),
        gearset.tpr(),
    )?;
    let mut chassis = ChassisController::new(left, right, model, ThreadDelay, gearset, scales);
    chassis.set_turns_mirrored(args.mirror_turns);
    chassis.set_max_velocity(args.max_velocity)?;
    Ok(chassis)
}

fn build_profile(args: &Args) -> DriveProfile {
    DriveProfile::from_curves(
        args.profile,
        shared(ExpoCurve::new(args.gain)),
        shared(ExpoCurve::new(args.gain)),
    )
}

pub async fn run(args: Args) -> std::result::Result<(), BoxError> {
    let profile = build_profile(&args);

    if args.sim {
        info!("Running against simulated drive");
        let (left, right, model, _clock) = simulated_chassis(args.max_velocity, SETTLE_TOLERANCE);
        let chassis = build_chassis(left, right, model, &args)?;
        return run_loop(Runtime::new(chassis, profile), &args).await;
    }

    info!("Opening motor bus on {}", args.port);
    let bus = Rc::new(RefCell::new(FeetechBus::open(&args.port)?));
    let left = SideMotors::new(LEFT_MOTOR_IDS.to_vec(), false);
    let right = SideMotors::new(RIGHT_MOTOR_IDS.to_vec(), true);
    motor::initialize(&bus, [&left, &right])?;

    let loop_config = PositionLoopConfig {
        kp: POSITION_KP,
        tolerance: SETTLE_TOLERANCE,
        max_velocity: args.max_velocity,
    };
    let model = FeetechSkidSteer::new(
        Rc::clone(&bus),
        left.clone(),
        right.clone(),
        args.max_velocity,
    );
    let chassis = build_chassis(
        FeetechSide::new(Rc::clone(&bus), left, loop_config),
        FeetechSide::new(bus, right, loop_config),
        model,
        &args,
    )?;
    run_loop(Runtime::new(chassis, profile), &args).await
}

async fn run_loop<C, M>(mut runtime: Runtime<C, M>, args: &Args) -> std::result::Result<(), BoxError>
where
    C: AsyncPositionController,
    M: ChassisModel,
{
    info!("Opening Zenoh session...");
    let session = zenoh::open(zenoh::Config::default()).await?;

    info!("Setting up publishers and subscribers...");
    let joystick_sub = session.declare_subscriber(TOPIC_CMD_JOYSTICK).await?;
    let motion_sub = session.declare_subscriber(TOPIC_CMD_MOTION).await?;
    let pub_drive = session.declare_publisher(TOPIC_RT_DRIVE).await?;
    let pub_health = session.declare_publisher(TOPIC_HEALTH).await?;
    let pub_state = session.declare_publisher(TOPIC_STATE).await?;

    let period = args.loop_period();
    let mut tick = interval(period);

    info!(
        "Runtime started: {}Hz loop, {}ms watchdog timeout, {:?} profile",
        args.loop_hz,
        CMD_TIMEOUT.as_millis(),
        args.profile
    );
    info!("Subscribed to: {}, {}", TOPIC_CMD_JOYSTICK, TOPIC_CMD_MOTION);
    info!(
        "Publishing to: {}, {}, {}",
        TOPIC_RT_DRIVE, TOPIC_HEALTH, TOPIC_STATE
    );

    loop {
        tick.tick().await;

        // 1. Drain pending motion requests, then stick input (non-blocking)
        while let Ok(Some(sample)) = motion_sub.try_recv() {
            let payload = sample.payload().to_bytes();
            match serde_json::from_slice::<MotionCommand>(&payload) {
                Ok(cmd) => {
                    if let Err(e) = runtime.on_motion(cmd) {
                        runtime.fault(&e);
                    }
                }
                Err(e) => warn!("Failed to parse motion command: {}", e),
            }
        }
        while let Ok(Some(sample)) = joystick_sub.try_recv() {
            let payload = sample.payload().to_bytes();
            match serde_json::from_slice::<JoystickCommand>(&payload) {
                Ok(cmd) => {
                    if let Err(e) = runtime.on_joystick(cmd) {
                        runtime.fault(&e);
                    }
                }
                Err(e) => warn!("Failed to parse joystick command: {}", e),
            }
        }

        // 2. Step controllers, settle polling, teleop and watchdog
        let actuation = match runtime.tick(period) {
            Ok(actuation) => actuation,
            Err(e) => {
                runtime.fault(&e);
                DriveActuation::default()
            }
        };

        // 3. Publish actuation, health and coordinator state
        pub_drive.put(serde_json::to_string(&actuation)?).await?;
        pub_health.put(serde_json::to_string(&runtime.health())?).await?;
        pub_state.put(serde_json::to_string(&runtime.state())?).await?;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chassis::ProfileKind;
    use crate::sim::{SimController, SimModel};

    const DT: Duration = Duration::from_millis(20);

    fn runtime(profile: ProfileKind) -> Runtime<SimController, SimModel> {
        let args = Args {
            port: String::new(),
            sim: true,
            loop_hz: 50,
            profile,
            gain: 0.0,
            max_velocity: 1000.0,
            mirror_turns: false,
        };
        let (left, right, model, _clock) = simulated_chassis(args.max_velocity, 2.0);
        let chassis = build_chassis(left, right, model, &args).unwrap();
        Runtime::new(chassis, build_profile(&args))
    }

    fn run_until_idle(runtime: &mut Runtime<SimController, SimModel>) -> usize {
        for ticks in 1..=500 {
            runtime.tick(DT).unwrap();
            if runtime.mode() == ControlMode::Idle {
                return ticks;
            }
        }
        panic!("motion never settled");
    }

    #[test]
    fn test_motion_runs_until_settled() {
        let mut runtime = runtime(ProfileKind::Tank);
        runtime.on_motion(MotionCommand::MoveRaw { ticks: 100.0 }).unwrap();
        assert_eq!(runtime.mode(), ControlMode::Autonomous);
        assert!(runtime.state().enabled);

        let ticks = run_until_idle(&mut runtime);
        assert!(ticks > 1);

        let state = runtime.state();
        assert_eq!((state.left_target, state.right_target), (100.0, 100.0));
        assert!(!state.enabled);
        assert!((runtime.chassis().left_controller().position() - 100.0).abs() <= 2.0);
    }

    #[test]
    fn test_mirrored_turn_request() {
        let mut runtime = runtime(ProfileKind::Tank);
        runtime
            .on_motion(MotionCommand::SetTurnsMirrored { mirrored: true })
            .unwrap();
        runtime.on_motion(MotionCommand::TurnRaw { ticks: 60.0 }).unwrap();
        run_until_idle(&mut runtime);

        let state = runtime.state();
        assert!(state.turns_mirrored);
        assert_eq!((state.left_target, state.right_target), (-60.0, 60.0));
    }

    #[test]
    fn test_joystick_cancels_motion() {
        let mut runtime = runtime(ProfileKind::Tank);
        runtime.on_motion(MotionCommand::MoveRaw { ticks: 5000.0 }).unwrap();
        runtime.tick(DT).unwrap();

        runtime
            .on_joystick(JoystickCommand {
                first: 127.0,
                second: 127.0,
            })
            .unwrap();
        assert_eq!(runtime.mode(), ControlMode::Teleop);
        assert!(!runtime.state().enabled);

        let actuation = runtime.tick(DT).unwrap();
        assert_eq!(actuation, DriveActuation { left: 1.0, right: 1.0 });
        assert_eq!(runtime.health(), RuntimeHealth::Ok);
    }

    #[test]
    fn test_centred_sticks_do_not_cancel_motion() {
        let mut runtime = runtime(ProfileKind::Tank);
        runtime.on_motion(MotionCommand::MoveRaw { ticks: 200.0 }).unwrap();
        runtime.tick(DT).unwrap();

        for cmd in [
            JoystickCommand::default(),
            JoystickCommand {
                first: 3.0,
                second: -TELEOP_TAKEOVER_DEADBAND,
            },
        ] {
            runtime.on_joystick(cmd).unwrap();
            assert_eq!(runtime.mode(), ControlMode::Autonomous);
            assert!(runtime.state().enabled);
        }

        run_until_idle(&mut runtime);
        assert!((runtime.chassis().left_controller().position() - 200.0).abs() <= 2.0);
    }

    #[test]
    fn test_arcade_actuation_is_mixed() {
        let mut runtime = runtime(ProfileKind::Arcade);
        runtime
            .on_joystick(JoystickCommand {
                first: 63.5,
                second: 31.75,
            })
            .unwrap();
        let actuation = runtime.tick(DT).unwrap();
        assert_eq!(actuation, DriveActuation { left: 0.75, right: 0.25 });
    }

    #[test]
    fn test_stale_joystick_stops_drive() {
        let mut runtime = runtime(ProfileKind::Tank).with_cmd_timeout(Duration::ZERO);
        runtime
            .on_joystick(JoystickCommand {
                first: 100.0,
                second: 100.0,
            })
            .unwrap();
        std::thread::sleep(Duration::from_millis(2));

        let actuation = runtime.tick(DT).unwrap();
        assert_eq!(actuation, DriveActuation::default());
        assert_eq!(runtime.health(), RuntimeHealth::CmdStale);
        assert_eq!(runtime.mode(), ControlMode::Idle);
    }

    #[test]
    fn test_max_velocity_request() {
        let mut runtime = runtime(ProfileKind::Tank);
        runtime
            .on_motion(MotionCommand::SetMaxVelocity { velocity: 42.0 })
            .unwrap();
        assert_eq!(runtime.state().max_velocity, 42.0);
        assert_eq!(runtime.chassis().left_controller().max_velocity(), 42.0);
        assert_eq!(runtime.chassis().right_controller().max_velocity(), 42.0);
    }

    #[test]
    fn test_stop_request() {
        let mut runtime = runtime(ProfileKind::Tank);
        runtime.on_motion(MotionCommand::TurnAngle { degrees: 90.0 }).unwrap();
        runtime.on_motion(MotionCommand::Stop).unwrap();
        assert_eq!(runtime.mode(), ControlMode::Idle);
        assert!(!runtime.state().enabled);
    }
}
