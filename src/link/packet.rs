//! # Packet Schema
//!
//! Byte-exact layout of the two packets exchanged with the propulsion board.
//!
//! Both packets are densely packed, little-endian, with no padding and no
//! version or length tag: the field order below *is* the wire contract, so
//! any change must be deployed to both ends at once. Continuous fields hold
//! Q9.6 words (see [`super::fixed_point`]); flags are one byte, nonzero = true.

use bytes::{Buf, BufMut};

/// Packet id the propulsion link uses on the shared serial line
pub const PROP_BOARD_ID: u8 = 46;

/// Packed size of [`DownlinkPacket`]
pub const DOWNLINK_PACKET_SIZE: usize = 16;

/// Packed size of [`UplinkPacket`]
pub const UPLINK_PACKET_SIZE: usize = 28;

/// Largest packet either side can receive
pub const MAX_PACKET_SIZE: usize = if DOWNLINK_PACKET_SIZE > UPLINK_PACKET_SIZE {
    DOWNLINK_PACKET_SIZE
} else {
    UPLINK_PACKET_SIZE
};

/// A fixed-size packet with a defined byte layout
pub trait WirePacket: Copy + Default + PartialEq + std::fmt::Debug {
    /// Exact packed size in bytes
    const SIZE: usize;

    /// Serialize into the first `SIZE` bytes of `out`
    ///
    /// Panics if `out` is shorter than `SIZE`.
    fn write_bytes(&self, out: &mut [u8]);

    /// Reinterpret the first `SIZE` bytes of `bytes` as a packet
    ///
    /// No field is validated, mirroring a raw memory copy. Panics if
    /// `bytes` is shorter than `SIZE`.
    fn read_bytes(bytes: &[u8]) -> Self;
}

/// Flight computer -> propulsion board: actuator commands
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DownlinkPacket {
    /// Ethanol main valve opening, [0, 100] %
    pub main_eth: u16,
    /// N2O main valve opening, [0, 100] %
    pub main_n2o: u16,
    pub sol_eth: u8,
    pub sol_n2o: u8,
    /// Gimbal X setpoint, [-15, 15] deg
    pub gimbal_x: u16,
    /// Gimbal Y setpoint, [-15, 15] deg
    pub gimbal_y: u16,
    pub eth_main_valves_homing: u8,
    pub n2o_main_valves_homing: u8,
    pub thrust_control: u8,
    pub vent_eth: u8,
    pub vent_n2o: u8,
    pub sol_n2: u8,
}

impl WirePacket for DownlinkPacket {
    const SIZE: usize = DOWNLINK_PACKET_SIZE;

    fn write_bytes(&self, out: &mut [u8]) {
        let mut buf = &mut out[..Self::SIZE];
        buf.put_u16_le(self.main_eth);
        buf.put_u16_le(self.main_n2o);
        buf.put_u8(self.sol_eth);
        buf.put_u8(self.sol_n2o);
        buf.put_u16_le(self.gimbal_x);
        buf.put_u16_le(self.gimbal_y);
        buf.put_u8(self.eth_main_valves_homing);
        buf.put_u8(self.n2o_main_valves_homing);
        buf.put_u8(self.thrust_control);
        buf.put_u8(self.vent_eth);
        buf.put_u8(self.vent_n2o);
        buf.put_u8(self.sol_n2);
    }

    fn read_bytes(bytes: &[u8]) -> Self {
        let mut buf = &bytes[..Self::SIZE];
        Self {
            main_eth: buf.get_u16_le(),
            main_n2o: buf.get_u16_le(),
            sol_eth: buf.get_u8(),
            sol_n2o: buf.get_u8(),
            gimbal_x: buf.get_u16_le(),
            gimbal_y: buf.get_u16_le(),
            eth_main_valves_homing: buf.get_u8(),
            n2o_main_valves_homing: buf.get_u8(),
            thrust_control: buf.get_u8(),
            vent_eth: buf.get_u8(),
            vent_n2o: buf.get_u8(),
            sol_n2: buf.get_u8(),
        }
    }
}

/// Propulsion board -> flight computer: measurements and homing status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UplinkPacket {
    /// Tank and feed pressures, [0, 50] bar
    pub pressure_tank_eth: u16,
    pub pressure_tank_n2o: u16,
    pub pressure_inj_eth: u16,
    pub pressure_inj_n2o: u16,
    pub pressure_line_eth: u16,
    pub pressure_line_n2o: u16,
    pub chamber_pressure: u16,
    /// Valve and gimbal positions, [0, 100] %
    pub n2o_main_valve_position: u16,
    pub eth_main_valve_position: u16,
    pub gimbal_x_position: u16,
    pub gimbal_y_position: u16,
    pub eth_main_valves_homing_done: u8,
    pub n2o_main_valves_homing_done: u8,
    /// N2O temperature, [-70, 40] degC
    pub temp_n2o: u16,
    /// High-voltage bus, [0, 26] V
    pub hv_voltage: u16,
}

impl WirePacket for UplinkPacket {
    const SIZE: usize = UPLINK_PACKET_SIZE;

    fn write_bytes(&self, out: &mut [u8]) {
        let mut buf = &mut out[..Self::SIZE];
        buf.put_u16_le(self.pressure_tank_eth);
        buf.put_u16_le(self.pressure_tank_n2o);
        buf.put_u16_le(self.pressure_inj_eth);
        buf.put_u16_le(self.pressure_inj_n2o);
        buf.put_u16_le(self.pressure_line_eth);
        buf.put_u16_le(self.pressure_line_n2o);
        buf.put_u16_le(self.chamber_pressure);
        buf.put_u16_le(self.n2o_main_valve_position);
        buf.put_u16_le(self.eth_main_valve_position);
        buf.put_u16_le(self.gimbal_x_position);
        buf.put_u16_le(self.gimbal_y_position);
        buf.put_u8(self.eth_main_valves_homing_done);
        buf.put_u8(self.n2o_main_valves_homing_done);
        buf.put_u16_le(self.temp_n2o);
        buf.put_u16_le(self.hv_voltage);
    }

    fn read_bytes(bytes: &[u8]) -> Self {
        let mut buf = &bytes[..Self::SIZE];
        Self {
            pressure_tank_eth: buf.get_u16_le(),
            pressure_tank_n2o: buf.get_u16_le(),
            pressure_inj_eth: buf.get_u16_le(),
            pressure_inj_n2o: buf.get_u16_le(),
            pressure_line_eth: buf.get_u16_le(),
            pressure_line_n2o: buf.get_u16_le(),
            chamber_pressure: buf.get_u16_le(),
            n2o_main_valve_position: buf.get_u16_le(),
            eth_main_valve_position: buf.get_u16_le(),
            gimbal_x_position: buf.get_u16_le(),
            gimbal_y_position: buf.get_u16_le(),
            eth_main_valves_homing_done: buf.get_u8(),
            n2o_main_valves_homing_done: buf.get_u8(),
            temp_n2o: buf.get_u16_le(),
            hv_voltage: buf.get_u16_le(),
        }
    }
}
