//! # Link Roles
//!
//! Each end of the link sends one packet type and merges the other. The role
//! decides which dictionary fields go out and which come back in.

use super::fixed_point::{decode, encode};
use super::packet::{DownlinkPacket, UplinkPacket, WirePacket};
use crate::dictionary::ObjectDictionary;

/// Which packet a node emits and which it merges into its dictionary
pub trait LinkRole {
    /// Packet produced by this node
    type Outbound: WirePacket;

    /// Packet accepted from the remote node
    type Inbound: WirePacket;

    /// Short name for logs
    const NAME: &'static str;

    /// Populate the outbound packet from the dictionary
    fn load(dict: &ObjectDictionary, packet: &mut Self::Outbound);

    /// Write the inbound packet's values into the dictionary
    fn merge(packet: &Self::Inbound, dict: &mut ObjectDictionary);
}

/// Flight computer side: sends commands, receives propulsion status
#[derive(Debug, Clone, Copy, Default)]
pub struct AvionicsRole;

/// Propulsion board side: sends status, receives commands
#[derive(Debug, Clone, Copy, Default)]
pub struct PropulsionRole;

fn flag(value: bool) -> u8 {
    u8::from(value)
}

fn is_set(byte: u8) -> bool {
    byte != 0
}

impl LinkRole for AvionicsRole {
    type Outbound = DownlinkPacket;
    type Inbound = UplinkPacket;
    const NAME: &'static str = "avionics";

    fn load(dict: &ObjectDictionary, packet: &mut DownlinkPacket) {
        packet.gimbal_x = encode(dict.gimbal_x);
        packet.gimbal_y = encode(dict.gimbal_y);
        packet.main_eth = encode(dict.main_eth);
        packet.main_n2o = encode(dict.main_n2o);
        packet.sol_eth = flag(dict.sol_eth);
        packet.sol_n2o = flag(dict.sol_n2o);
        packet.vent_eth = flag(dict.vent_eth);
        packet.vent_n2o = flag(dict.vent_n2o);
        packet.sol_n2 = flag(dict.sol_n2);
        packet.eth_main_valves_homing = flag(dict.eth_main_valves_homing);
        packet.n2o_main_valves_homing = flag(dict.n2o_main_valves_homing);
        packet.thrust_control = flag(dict.thrust_control);
    }

    fn merge(packet: &UplinkPacket, dict: &mut ObjectDictionary) {
        dict.pressure_tank_eth = decode(packet.pressure_tank_eth);
        dict.pressure_tank_n2o = decode(packet.pressure_tank_n2o);
        dict.pressure_inj_eth = decode(packet.pressure_inj_eth);
        dict.pressure_inj_n2o = decode(packet.pressure_inj_n2o);
        dict.pressure_line_eth = decode(packet.pressure_line_eth);
        dict.pressure_line_n2o = decode(packet.pressure_line_n2o);
        dict.chamber_pressure = decode(packet.chamber_pressure);
        dict.position_n2o_main_valve = decode(packet.n2o_main_valve_position);
        dict.position_eth_main_valve = decode(packet.eth_main_valve_position);
        dict.position_gimbal_x = decode(packet.gimbal_x_position);
        dict.position_gimbal_y = decode(packet.gimbal_y_position);
        dict.temp_n2o = decode(packet.temp_n2o);
        dict.hv_voltage = decode(packet.hv_voltage);
        dict.eth_main_valves_homing_done = is_set(packet.eth_main_valves_homing_done);
        dict.n2o_main_valves_homing_done = is_set(packet.n2o_main_valves_homing_done);
    }
}

impl LinkRole for PropulsionRole {
    type Outbound = UplinkPacket;
    type Inbound = DownlinkPacket;
    const NAME: &'static str = "propulsion";

    fn load(dict: &ObjectDictionary, packet: &mut UplinkPacket) {
        packet.pressure_tank_eth = encode(dict.pressure_tank_eth);
        packet.pressure_tank_n2o = encode(dict.pressure_tank_n2o);
        packet.pressure_inj_eth = encode(dict.pressure_inj_eth);
        packet.pressure_inj_n2o = encode(dict.pressure_inj_n2o);
        packet.pressure_line_eth = encode(dict.pressure_line_eth);
        packet.pressure_line_n2o = encode(dict.pressure_line_n2o);
        packet.chamber_pressure = encode(dict.chamber_pressure);
        packet.n2o_main_valve_position = encode(dict.position_n2o_main_valve);
        packet.eth_main_valve_position = encode(dict.position_eth_main_valve);
        packet.gimbal_x_position = encode(dict.position_gimbal_x);
        packet.gimbal_y_position = encode(dict.position_gimbal_y);
        packet.temp_n2o = encode(dict.temp_n2o);
        packet.hv_voltage = encode(dict.hv_voltage);
        packet.eth_main_valves_homing_done = flag(dict.eth_main_valves_homing_done);
        packet.n2o_main_valves_homing_done = flag(dict.n2o_main_valves_homing_done);
    }

    fn merge(packet: &DownlinkPacket, dict: &mut ObjectDictionary) {
        dict.gimbal_x = decode(packet.gimbal_x);
        dict.gimbal_y = decode(packet.gimbal_y);
        dict.main_eth = decode(packet.main_eth);
        dict.main_n2o = decode(packet.main_n2o);
        dict.sol_eth = is_set(packet.sol_eth);
        dict.sol_n2o = is_set(packet.sol_n2o);
        dict.vent_eth = is_set(packet.vent_eth);
        dict.vent_n2o = is_set(packet.vent_n2o);
        dict.sol_n2 = is_set(packet.sol_n2);
        dict.eth_main_valves_homing = is_set(packet.eth_main_valves_homing);
        dict.n2o_main_valves_homing = is_set(packet.n2o_main_valves_homing);
        dict.thrust_control = is_set(packet.thrust_control);
    }
}
