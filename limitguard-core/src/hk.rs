//! Housekeeping telemetry packing
//!
//! The housekeeping payload compresses the whole results picture into a
//! fixed packet: scalar counters up front, then every watchpoint result
//! at two bits and every actionpoint state/result pair at a nibble each.
//!
//! The code constants and the bit positions live here and only here;
//! the packer, the unpack helpers, and the tests all read the same
//! definitions, so a layout change cannot half-apply.
//!
//! ## Packed layouts
//!
//! ```text
//! Watch results, byte k:          Action results, byte k:
//! bits 7-6  WP 4k+3               bits 7-4  AP 2k+1 (state | result)
//! bits 5-4  WP 4k+2               bits 3-0  AP 2k   (state | result)
//! bits 3-2  WP 4k+1
//! bits 1-0  WP 4k
//! ```

use crate::config::{AP_PACK_BYTES, MAX_ACTIONPOINTS, MAX_WATCHPOINTS, WP_PACK_BYTES};
use crate::tables::{ActionResult, ApState, ApplicationState, TableSet, WatchResult};

/// Two-bit watch result codes and four-bit action state/result codes
pub mod codes {
    /// Watch result: stale
    pub const WP_STALE: u8 = 0b00;
    /// Watch result: false
    pub const WP_FALSE: u8 = 0b01;
    /// Watch result: true
    pub const WP_TRUE: u8 = 0b10;
    /// Watch result: error
    pub const WP_ERROR: u8 = 0b11;

    /// Action state: not used (also reported for permanently-off)
    pub const AP_STATE_NOT_USED: u8 = 0b00;
    /// Action state: active
    pub const AP_STATE_ACTIVE: u8 = 0b01;
    /// Action state: passive
    pub const AP_STATE_PASSIVE: u8 = 0b10;
    /// Action state: disabled
    pub const AP_STATE_DISABLED: u8 = 0b11;

    /// Action result: stale
    pub const AP_STALE: u8 = 0b00;
    /// Action result: pass
    pub const AP_PASS: u8 = 0b01;
    /// Action result: fail
    pub const AP_FAIL: u8 = 0b10;
    /// Action result: error
    pub const AP_ERROR: u8 = 0b11;
}

/// Housekeeping payload size in bytes
pub const HK_PAYLOAD_SIZE: usize = 16 + WP_PACK_BYTES + AP_PACK_BYTES;

/// One housekeeping packet, ready to encode onto the bus
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HkPacket {
    /// Accepted commands
    pub cmd_count: u8,
    /// Rejected commands
    pub cmd_err_count: u8,
    /// Application monitoring state
    pub lc_state: u8,
    /// Actionpoints currently active
    pub active_aps: u8,
    /// Actionpoints sampled
    pub ap_sample_count: u16,
    /// Stored-sequence requests suppressed by passive monitoring
    pub passive_rts_exec_count: u16,
    /// Watchpoint entries monitoring a field
    pub wps_in_use: u16,
    /// Stored-sequence requests issued
    pub rts_exec_count: u16,
    /// Monitored messages dispatched to watchpoints
    pub monitored_msg_count: u32,
    /// Packed watch results, four per byte
    pub wp_results: [u8; WP_PACK_BYTES],
    /// Packed action state/result pairs, two per byte
    pub ap_results: [u8; AP_PACK_BYTES],
}

/// Gather counters and pack both results tables into one packet.
///
/// Counts active actionpoints while packing, the same single pass the
/// packed bytes come from.
pub fn build(tables: &TableSet, app: &ApplicationState) -> HkPacket {
    let mut active_aps: u8 = 0;

    let mut wp_results = [0u8; WP_PACK_BYTES];
    for (k, byte) in wp_results.iter_mut().enumerate() {
        let base = k * 4;
        *byte = (wp_code(tables.wrt[base + 3].watch_result) << 6)
            | (wp_code(tables.wrt[base + 2].watch_result) << 4)
            | (wp_code(tables.wrt[base + 1].watch_result) << 2)
            | wp_code(tables.wrt[base].watch_result);
    }

    let mut ap_results = [0u8; AP_PACK_BYTES];
    for (k, byte) in ap_results.iter_mut().enumerate() {
        let base = k * 2;
        let high = ap_nibble(
            tables.art[base + 1].current_state,
            tables.art[base + 1].action_result,
            &mut active_aps,
        );
        let low = ap_nibble(
            tables.art[base].current_state,
            tables.art[base].action_result,
            &mut active_aps,
        );
        *byte = (high << 4) | low;
    }

    HkPacket {
        cmd_count: app.cmd_count,
        cmd_err_count: app.cmd_err_count,
        lc_state: app.lc_state as u8,
        active_aps,
        ap_sample_count: app.ap_sample_count,
        passive_rts_exec_count: app.passive_rts_exec_count,
        wps_in_use: tables.watchpoints_in_use(),
        rts_exec_count: app.rts_exec_count,
        monitored_msg_count: app.monitored_msg_count,
        wp_results,
        ap_results,
    }
}

impl HkPacket {
    /// Encode the payload in mission interface order, multi-byte fields
    /// big-endian.
    pub fn encode(&self) -> [u8; HK_PAYLOAD_SIZE] {
        let mut out = [0u8; HK_PAYLOAD_SIZE];
        out[0] = self.cmd_count;
        out[1] = self.cmd_err_count;
        out[2] = self.lc_state;
        out[3] = self.active_aps;
        out[4..6].copy_from_slice(&self.ap_sample_count.to_be_bytes());
        out[6..8].copy_from_slice(&self.passive_rts_exec_count.to_be_bytes());
        out[8..10].copy_from_slice(&self.wps_in_use.to_be_bytes());
        out[10..12].copy_from_slice(&self.rts_exec_count.to_be_bytes());
        out[12..16].copy_from_slice(&self.monitored_msg_count.to_be_bytes());
        out[16..16 + WP_PACK_BYTES].copy_from_slice(&self.wp_results);
        out[16 + WP_PACK_BYTES..].copy_from_slice(&self.ap_results);
        out
    }
}

/// Two-bit code for a watch result; anything unexpected reads as error
pub const fn wp_code(result: WatchResult) -> u8 {
    match result {
        WatchResult::Stale => codes::WP_STALE,
        WatchResult::False => codes::WP_FALSE,
        WatchResult::True => codes::WP_TRUE,
        WatchResult::Error => codes::WP_ERROR,
    }
}

/// Four-bit state/result nibble; permanently-off reports as not used
fn ap_nibble(state: ApState, result: ActionResult, active_aps: &mut u8) -> u8 {
    let state_code = match state {
        ApState::NotUsed | ApState::PermOff => codes::AP_STATE_NOT_USED,
        ApState::Active => {
            *active_aps = active_aps.saturating_add(1);
            codes::AP_STATE_ACTIVE
        }
        ApState::Passive => codes::AP_STATE_PASSIVE,
        ApState::Disabled => codes::AP_STATE_DISABLED,
    };

    let result_code = match result {
        ActionResult::Stale => codes::AP_STALE,
        ActionResult::Pass => codes::AP_PASS,
        ActionResult::Fail => codes::AP_FAIL,
        ActionResult::Error => codes::AP_ERROR,
    };

    (state_code << 2) | result_code
}

/// Recover the two-bit code of one watchpoint from packed bytes
pub fn unpack_wp(packed: &[u8; WP_PACK_BYTES], index: usize) -> u8 {
    let shift = (index % 4) * 2;
    (packed[index / 4] >> shift) & 0b11
}

/// Recover the (state, result) codes of one actionpoint from packed bytes
pub fn unpack_ap(packed: &[u8; AP_PACK_BYTES], index: usize) -> (u8, u8) {
    let shift = (index % 2) * 4;
    let nibble = (packed[index / 2] >> shift) & 0b1111;
    (nibble >> 2, nibble & 0b11)
}

const _: () = assert!(MAX_WATCHPOINTS == WP_PACK_BYTES * 4);
const _: () = assert!(MAX_ACTIONPOINTS == AP_PACK_BYTES * 2);
