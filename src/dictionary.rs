//! # Object Dictionary
//!
//! The single aggregate of telemetry, commands and sequencer state shared by
//! the control loop, the packet pump and the telemetry logger.
//!
//! One instance is built at startup and passed by reference into whatever
//! needs it. Measurements start as `NaN` ("unknown"); actuator commands start
//! at their safe defaults. The struct carries no lock: whoever owns the loop
//! owns the dictionary.

use serde::Serialize;

/// Hopper sequencer states
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FsmState {
    #[default]
    Idle,
    GimbalHoming,
    MainValvesHoming,
    TarePressures,
    TareOrientation,
    Armed,
    Launch,
    Abort,
}

impl FsmState {
    /// Numeric code used in CSV output
    pub fn code(self) -> u8 {
        self as u8
    }
}

/// Shared process state
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ObjectDictionary {
    // IMU
    pub gyro_x: f32,
    pub gyro_y: f32,
    pub gyro_z: f32,
    pub acc_x: f32,
    pub acc_y: f32,
    pub acc_z: f32,
    pub baro: f32,

    // Attitude estimate
    pub kalman_yaw: f32,
    pub kalman_pitch: f32,
    pub kalman_roll: f32,

    // Gimbal setpoints, deg
    pub gimbal_x: f32,
    pub gimbal_y: f32,

    // Power, V
    pub hv_voltage: f32,
    pub lv_voltage: f32,

    // Pressures, bar
    pub chamber_pressure: f32,
    pub pressure_tank_eth: f32,
    pub pressure_tank_n2o: f32,
    pub pressure_inj_eth: f32,
    pub pressure_inj_n2o: f32,
    pub pressure_line_eth: f32,
    pub pressure_line_n2o: f32,

    // Main valve drive current, A
    pub current_eth_main_valve: f32,
    pub current_n2o_main_valve: f32,

    pub position_eth_main_valve: f32,
    pub position_n2o_main_valve: f32,

    // Gimbal drive current, A
    pub gimbal_x_current: f32,
    pub gimbal_y_current: f32,

    pub position_gimbal_x: f32,
    pub position_gimbal_y: f32,

    /// N2O temperature, degC
    pub temp_n2o: f32,

    pub vent_eth: bool,
    pub vent_n2o: bool,
    pub sol_n2: bool,

    /// Main valve commands, %
    pub main_eth: f32,
    pub main_n2o: f32,

    pub sol_eth: bool,
    pub sol_n2o: bool,

    pub igniter: bool,
    pub sequence_finished: bool,

    pub eth_main_valves_homing: bool,
    pub eth_main_valves_homing_done: bool,
    pub n2o_main_valves_homing: bool,
    pub n2o_main_valves_homing_done: bool,
    pub gimbal_homing: bool,
    pub gimbal_homing_done: bool,

    pub thrust_control: bool,

    pub cmd_idle: bool,
    pub cmd_arm: bool,
    pub cmd_launch: bool,
    pub cmd_abort: bool,
    pub cmd_tare_orientation: bool,
    pub cmd_tare_pressures: bool,

    pub hopper_state: FsmState,
}

impl Default for ObjectDictionary {
    fn default() -> Self {
        Self {
            gyro_x: f32::NAN,
            gyro_y: f32::NAN,
            gyro_z: f32::NAN,
            acc_x: f32::NAN,
            acc_y: f32::NAN,
            acc_z: f32::NAN,
            baro: f32::NAN,
            kalman_yaw: f32::NAN,
            kalman_pitch: f32::NAN,
            kalman_roll: f32::NAN,
            gimbal_x: f32::NAN,
            gimbal_y: f32::NAN,
            hv_voltage: f32::NAN,
            lv_voltage: f32::NAN,
            chamber_pressure: f32::NAN,
            pressure_tank_eth: f32::NAN,
            pressure_tank_n2o: f32::NAN,
            pressure_inj_eth: f32::NAN,
            pressure_inj_n2o: f32::NAN,
            pressure_line_eth: f32::NAN,
            pressure_line_n2o: f32::NAN,
            current_eth_main_valve: f32::NAN,
            current_n2o_main_valve: f32::NAN,
            position_eth_main_valve: f32::NAN,
            position_n2o_main_valve: f32::NAN,
            gimbal_x_current: f32::NAN,
            gimbal_y_current: f32::NAN,
            position_gimbal_x: f32::NAN,
            position_gimbal_y: f32::NAN,
            temp_n2o: f32::NAN,
            // vents fail open
            vent_eth: true,
            vent_n2o: true,
            sol_n2: false,
            main_eth: 0.0,
            main_n2o: 0.0,
            sol_eth: false,
            sol_n2o: false,
            igniter: false,
            sequence_finished: false,
            eth_main_valves_homing: false,
            eth_main_valves_homing_done: false,
            n2o_main_valves_homing: false,
            n2o_main_valves_homing_done: false,
            gimbal_homing: false,
            gimbal_homing_done: false,
            thrust_control: false,
            cmd_idle: false,
            cmd_arm: false,
            cmd_launch: false,
            cmd_abort: false,
            cmd_tare_orientation: false,
            cmd_tare_pressures: false,
            hopper_state: FsmState::Idle,
        }
    }
}

/// One CSV cell before formatting
#[derive(Debug, Clone, Copy)]
enum Cell {
    Float(f32),
    Flag(bool),
    State(FsmState),
}

impl ObjectDictionary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Column names and values in logging order
    fn columns(&self) -> [(&'static str, Cell); 52] {
        use Cell::*;
        [
            ("gyro_x", Float(self.gyro_x)),
            ("gyro_y", Float(self.gyro_y)),
            ("gyro_z", Float(self.gyro_z)),
            ("acc_x", Float(self.acc_x)),
            ("acc_y", Float(self.acc_y)),
            ("acc_z", Float(self.acc_z)),
            ("baro", Float(self.baro)),
            ("kalman_yaw", Float(self.kalman_yaw)),
            ("kalman_pitch", Float(self.kalman_pitch)),
            ("kalman_roll", Float(self.kalman_roll)),
            ("gimbal_x", Float(self.gimbal_x)),
            ("gimbal_x_current", Float(self.gimbal_x_current)),
            ("position_gimbal_x", Float(self.position_gimbal_x)),
            ("gimbal_y", Float(self.gimbal_y)),
            ("gimbal_y_current", Float(self.gimbal_y_current)),
            ("position_gimbal_y", Float(self.position_gimbal_y)),
            ("hv_voltage", Float(self.hv_voltage)),
            ("lv_voltage", Float(self.lv_voltage)),
            ("chamber_pressure", Float(self.chamber_pressure)),
            ("pressure_tank_eth", Float(self.pressure_tank_eth)),
            ("pressure_tank_n2o", Float(self.pressure_tank_n2o)),
            ("pressure_line_eth", Float(self.pressure_line_eth)),
            ("pressure_line_n2o", Float(self.pressure_line_n2o)),
            ("pressure_inj_eth", Float(self.pressure_inj_eth)),
            ("pressure_inj_n2o", Float(self.pressure_inj_n2o)),
            ("temp_n2o", Float(self.temp_n2o)),
            ("vent_eth", Flag(self.vent_eth)),
            ("vent_n2o", Flag(self.vent_n2o)),
            ("sol_n2", Flag(self.sol_n2)),
            ("main_eth", Float(self.main_eth)),
            ("current_eth_main_valve", Float(self.current_eth_main_valve)),
            ("position_eth_main_valve", Float(self.position_eth_main_valve)),
            ("main_n2o", Float(self.main_n2o)),
            ("current_n2o_main_valve", Float(self.current_n2o_main_valve)),
            ("position_n2o_main_valve", Float(self.position_n2o_main_valve)),
            ("sol_eth", Flag(self.sol_eth)),
            ("sol_n2o", Flag(self.sol_n2o)),
            ("igniter", Flag(self.igniter)),
            ("sequence_finished", Flag(self.sequence_finished)),
            ("eth_main_valves_homing", Flag(self.eth_main_valves_homing)),
            ("eth_main_valves_homing_done", Flag(self.eth_main_valves_homing_done)),
            ("n2o_main_valves_homing", Flag(self.n2o_main_valves_homing)),
            ("n2o_main_valves_homing_done", Flag(self.n2o_main_valves_homing_done)),
            ("gimbal_homing", Flag(self.gimbal_homing)),
            ("gimbal_homing_done", Flag(self.gimbal_homing_done)),
            ("cmd_idle", Flag(self.cmd_idle)),
            ("cmd_arm", Flag(self.cmd_arm)),
            ("cmd_launch", Flag(self.cmd_launch)),
            ("cmd_abort", Flag(self.cmd_abort)),
            ("cmd_tare_orientation", Flag(self.cmd_tare_orientation)),
            ("cmd_tare_pressures", Flag(self.cmd_tare_pressures)),
            ("hopper_state", State(self.hopper_state)),
        ]
    }

    /// CSV header matching [`ObjectDictionary::csv_row`]
    pub fn csv_header() -> String {
        Self::default()
            .columns()
            .iter()
            .map(|(name, _)| *name)
            .collect::<Vec<_>>()
            .join(",")
    }

    /// One CSV row; unknown measurements print as `nan`, flags as 0/1
    pub fn csv_row(&self) -> String {
        self.columns()
            .iter()
            .map(|(_, cell)| match cell {
                Cell::Float(v) if v.is_nan() => "nan".to_string(),
                Cell::Float(v) => format!("{:.9}", v),
                Cell::Flag(b) => u8::from(*b).to_string(),
                Cell::State(s) => s.code().to_string(),
            })
            .collect::<Vec<_>>()
            .join(",")
    }
}
