//! Definition and results tables
//!
//! Four fixed arrays hold the whole monitoring configuration and state:
//!
//! - watchpoint definitions (immutable after load)
//! - actionpoint definitions (immutable after load)
//! - watchpoint results (mutated by evaluation and commands)
//! - actionpoint results (mutated by sampling and commands)
//!
//! [`TableSet`] owns all four. It is created once from validated
//! definition images and then borrowed immutably for definitions and
//! mutably by the sampler, which is exactly the two-phase lifecycle the
//! heritage tables had - minus the raw pointers.
//!
//! Counters saturate at their declared width instead of wrapping, so a
//! long-running load cannot roll a fault counter back to zero.

use heapless::{String, Vec};

use crate::config::{MAX_ACTIONPOINTS, MAX_ACTION_TEXT, MAX_RPN_EQU_SIZE, MAX_WATCHPOINTS};
use crate::errors::TableError;
use crate::events::Severity;
use crate::rpn::{self, RpnToken};
use crate::time::MissionTime;
use crate::value::{DataType, OperatorId, WatchValue};

/// Opaque software-bus message identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MessageId(pub u16);

impl MessageId {
    /// The raw identifier value
    pub const fn raw(self) -> u16 {
        self.0
    }
}

/// Outcome of the last watchpoint evaluation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum WatchResult {
    /// No fresh evaluation inside the freshness budget
    Stale = 0,
    /// Comparison evaluated false
    False = 1,
    /// Comparison evaluated true
    True = 2,
    /// Field read or comparison faulted
    Error = 3,
}

/// Outcome of the last actionpoint sample
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum ActionResult {
    /// Equation could not produce pass or fail from fresh inputs
    Stale = 0,
    /// Equation evaluated false
    Pass = 1,
    /// Equation evaluated true
    Fail = 2,
    /// Equation malformed or referenced a faulted watchpoint
    Error = 3,
}

/// Actionpoint monitoring state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum ApState {
    /// Table entry monitors nothing; only a table load changes this
    NotUsed = 0,
    /// Failures request the stored sequence
    Active = 1,
    /// Failures are counted but the sequence is not requested
    Passive = 2,
    /// Not sampled; commandable back to active or passive
    Disabled = 3,
    /// Not sampled; only a table load restores it
    PermOff = 4,
}

impl ApState {
    /// Decode a commanded actionpoint state; only the three non-sticky
    /// states are commandable.
    pub const fn from_command_raw(raw: u16) -> Option<Self> {
        match raw {
            1 => Some(Self::Active),
            2 => Some(Self::Passive),
            3 => Some(Self::Disabled),
            _ => None,
        }
    }
}

/// Application-level monitoring state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum LcState {
    /// Failures may request stored sequences
    Active = 1,
    /// Failures are counted, requests suppressed
    Passive = 2,
    /// Actionpoint sampling is ignored entirely
    Disabled = 3,
}

impl LcState {
    /// Decode a commanded application state
    pub const fn from_raw(raw: u16) -> Option<Self> {
        match raw {
            1 => Some(Self::Active),
            2 => Some(Self::Passive),
            3 => Some(Self::Disabled),
            _ => None,
        }
    }
}

/// One watchpoint definition (immutable after table load)
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WatchpointDefinition {
    /// Type and endianness of the monitored field
    pub data_type: DataType,
    /// Comparison applied to the decoded field
    pub operator: OperatorId,
    /// Message the field lives in
    pub message_id: MessageId,
    /// Byte offset of the field within the message payload
    pub offset: u32,
    /// Mask applied to the widened integer value before comparison;
    /// ignored for floats
    pub bit_mask: u32,
    /// Limit the masked value is compared against
    pub comparison: WatchValue,
    /// Sample commands until a TRUE/FALSE result decays to stale;
    /// zero means the result never goes stale
    pub result_age_when_stale: u32,
    /// Argument passed to the custom predicate
    pub custom_arg: u32,
}

impl WatchpointDefinition {
    /// An entry that monitors nothing
    pub const fn unused() -> Self {
        Self {
            data_type: DataType::Unused,
            operator: OperatorId::None,
            message_id: MessageId(0),
            offset: 0,
            bit_mask: 0,
            comparison: WatchValue::Unsigned(0),
            result_age_when_stale: 0,
            custom_arg: 0,
        }
    }

    /// Whether this entry monitors a field
    pub const fn is_used(&self) -> bool {
        !matches!(self.data_type, DataType::Unused)
    }
}

/// Value and time captured at a watchpoint result transition
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TransitionRecord {
    /// Masked 32-bit value that caused the transition
    pub value: u32,
    /// Data type the value was decoded as
    pub data_type: DataType,
    /// When the transition was detected
    pub timestamp: MissionTime,
}

impl TransitionRecord {
    /// A record holding no transition
    pub const fn cleared() -> Self {
        Self {
            value: 0,
            data_type: DataType::Unused,
            timestamp: MissionTime::ZERO,
        }
    }
}

/// One watchpoint's mutable results
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WatchpointResult {
    /// Most recent evaluation outcome
    pub watch_result: WatchResult,
    /// Sample commands remaining before the result goes stale
    pub countdown_to_stale: u32,
    /// Comparisons performed
    pub evaluation_count: u32,
    /// False-to-true transitions observed
    pub false_to_true_count: u32,
    /// Consecutive TRUE results
    pub consecutive_true_count: u32,
    /// Total TRUE results
    pub cumulative_true_count: u32,
    /// Most recent false-to-true transition
    pub last_false_to_true: TransitionRecord,
    /// Most recent true-to-false transition
    pub last_true_to_false: TransitionRecord,
}

impl WatchpointResult {
    /// Bring-up state: stale, all counters zero
    pub const fn startup() -> Self {
        Self {
            watch_result: WatchResult::Stale,
            countdown_to_stale: 0,
            evaluation_count: 0,
            false_to_true_count: 0,
            consecutive_true_count: 0,
            cumulative_true_count: 0,
            last_false_to_true: TransitionRecord::cleared(),
            last_true_to_false: TransitionRecord::cleared(),
        }
    }

    /// Clear counters and transition records, preserving the most recent
    /// result and its freshness countdown.
    pub fn reset_stats(&mut self) {
        self.evaluation_count = 0;
        self.false_to_true_count = 0;
        self.consecutive_true_count = 0;
        self.cumulative_true_count = 0;
        self.last_false_to_true = TransitionRecord::cleared();
        self.last_true_to_false = TransitionRecord::cleared();
    }
}

/// Fixed-capacity postfix equation storage
pub type RpnProgram = Vec<RpnToken, MAX_RPN_EQU_SIZE>;

/// One actionpoint definition (immutable after table load)
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ActionpointDefinition {
    /// State the actionpoint starts in after a table load
    pub default_state: ApState,
    /// Limit on passive-suppression events per statistics window
    pub max_passive_events: u8,
    /// Limit on failure events per fail streak
    pub max_pass_fail_events: u8,
    /// Limit on recovery events per statistics window
    pub max_fail_pass_events: u8,
    /// Stored command sequence requested when the trigger fires
    pub rts_id: u16,
    /// Consecutive failures required to fire the trigger
    pub max_fails_before_rts: u16,
    /// Postfix equation over watchpoint results
    pub equation: RpnProgram,
    /// Severity of the configured failure event
    pub event_type: Severity,
    /// Identifier of the configured failure event
    pub event_id: u16,
    /// Text of the configured failure event
    pub event_text: String<MAX_ACTION_TEXT>,
}

impl ActionpointDefinition {
    /// An entry that monitors nothing
    pub fn unused() -> Self {
        Self {
            default_state: ApState::NotUsed,
            max_passive_events: 0,
            max_pass_fail_events: 0,
            max_fail_pass_events: 0,
            rts_id: 0,
            max_fails_before_rts: 0,
            equation: RpnProgram::new(),
            event_type: Severity::Info,
            event_id: 0,
            event_text: String::new(),
        }
    }

    /// Whether this entry is sampled at all
    pub fn is_used(&self) -> bool {
        self.default_state != ApState::NotUsed
    }
}

/// One actionpoint's mutable results
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ActionpointResult {
    /// Most recent sample outcome
    pub action_result: ActionResult,
    /// Current monitoring state
    pub current_state: ApState,
    /// Triggers suppressed because monitoring was passive
    pub passive_ap_count: u32,
    /// Fail-to-pass transitions observed
    pub fail_to_pass_count: u32,
    /// Pass-to-fail transitions observed
    pub pass_to_fail_count: u32,
    /// Consecutive FAIL samples
    pub consecutive_fail_count: u32,
    /// Total FAIL samples
    pub cumulative_fail_count: u32,
    /// Stored-sequence requests issued for this actionpoint
    pub cumulative_rts_exec_count: u32,
    /// Event messages actually sent for this actionpoint
    pub cumulative_event_msgs_sent: u32,
    /// Failure events sent since the last pass-to-fail transition
    pub events_since_transition: u8,
}

impl ActionpointResult {
    /// Bring-up state for an entry with the given default state
    pub const fn startup(state: ApState) -> Self {
        Self {
            action_result: ActionResult::Stale,
            current_state: state,
            passive_ap_count: 0,
            fail_to_pass_count: 0,
            pass_to_fail_count: 0,
            consecutive_fail_count: 0,
            cumulative_fail_count: 0,
            cumulative_rts_exec_count: 0,
            cumulative_event_msgs_sent: 0,
            events_since_transition: 0,
        }
    }

    /// Clear counters, preserving the most recent result and the current
    /// state.
    pub fn reset_stats(&mut self) {
        self.passive_ap_count = 0;
        self.fail_to_pass_count = 0;
        self.pass_to_fail_count = 0;
        self.consecutive_fail_count = 0;
        self.cumulative_fail_count = 0;
        self.cumulative_rts_exec_count = 0;
        self.cumulative_event_msgs_sent = 0;
        self.events_since_transition = 0;
    }
}

/// Application-level state and counters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ApplicationState {
    /// Application monitoring state
    pub lc_state: LcState,
    /// Accepted commands
    pub cmd_count: u8,
    /// Rejected commands
    pub cmd_err_count: u8,
    /// Actionpoints sampled
    pub ap_sample_count: u16,
    /// Monitored messages dispatched to watchpoints
    pub monitored_msg_count: u32,
    /// Stored-sequence requests issued
    pub rts_exec_count: u16,
    /// Stored-sequence requests suppressed by passive monitoring
    pub passive_rts_exec_count: u16,
}

impl ApplicationState {
    /// Bring-up state with the given monitoring state
    pub const fn new(lc_state: LcState) -> Self {
        Self {
            lc_state,
            cmd_count: 0,
            cmd_err_count: 0,
            ap_sample_count: 0,
            monitored_msg_count: 0,
            rts_exec_count: 0,
            passive_rts_exec_count: 0,
        }
    }

    /// Zero every scalar counter, the command counter included.
    pub fn reset_counters(&mut self) {
        self.cmd_count = 0;
        self.cmd_err_count = 0;
        self.ap_sample_count = 0;
        self.monitored_msg_count = 0;
        self.rts_exec_count = 0;
        self.passive_rts_exec_count = 0;
    }
}

impl Default for ApplicationState {
    fn default() -> Self {
        Self::new(LcState::Active)
    }
}

/// The owning container for all four tables
#[derive(Debug, Clone)]
pub struct TableSet {
    /// Watchpoint definitions
    pub wdt: [WatchpointDefinition; MAX_WATCHPOINTS],
    /// Actionpoint definitions
    pub adt: [ActionpointDefinition; MAX_ACTIONPOINTS],
    /// Watchpoint results
    pub wrt: [WatchpointResult; MAX_WATCHPOINTS],
    /// Actionpoint results
    pub art: [ActionpointResult; MAX_ACTIONPOINTS],
    watchpoints_in_use: u16,
}

impl TableSet {
    /// Validate both definition images and build the result tables in
    /// their bring-up state.
    pub fn new(
        wdt: [WatchpointDefinition; MAX_WATCHPOINTS],
        adt: [ActionpointDefinition; MAX_ACTIONPOINTS],
    ) -> Result<Self, TableError> {
        validate_wdt(&wdt)?;
        validate_adt(&adt)?;

        let wrt = [WatchpointResult::startup(); MAX_WATCHPOINTS];
        let mut art = [ActionpointResult::startup(ApState::NotUsed); MAX_ACTIONPOINTS];
        for (entry, def) in art.iter_mut().zip(adt.iter()) {
            *entry = ActionpointResult::startup(def.default_state);
        }

        let watchpoints_in_use = wdt.iter().filter(|def| def.is_used()).count() as u16;

        Ok(Self {
            wdt,
            adt,
            wrt,
            art,
            watchpoints_in_use,
        })
    }

    /// Number of watchpoint entries that monitor a field
    pub const fn watchpoints_in_use(&self) -> u16 {
        self.watchpoints_in_use
    }

    /// Split borrows for the actionpoint sampler: definitions and
    /// watchpoint results immutable, actionpoint results mutable.
    pub fn split_for_sampling(
        &mut self,
    ) -> (
        &[ActionpointDefinition; MAX_ACTIONPOINTS],
        &mut [ActionpointResult; MAX_ACTIONPOINTS],
        &[WatchpointResult; MAX_WATCHPOINTS],
    ) {
        (&self.adt, &mut self.art, &self.wrt)
    }

    /// Split borrows for watchpoint evaluation: definitions immutable,
    /// watchpoint results mutable.
    pub fn split_for_watch(
        &mut self,
    ) -> (
        &[WatchpointDefinition; MAX_WATCHPOINTS],
        &mut [WatchpointResult; MAX_WATCHPOINTS],
    ) {
        (&self.wdt, &mut self.wrt)
    }
}

/// Validate a watchpoint definition image.
///
/// Checks offset alignment against the declared type, operator presence,
/// and that the comparison limit is in the same scalar category as the
/// field. Unused entries are not checked.
pub fn validate_wdt(wdt: &[WatchpointDefinition; MAX_WATCHPOINTS]) -> Result<(), TableError> {
    for (index, def) in wdt.iter().enumerate() {
        let index = index as u16;
        if !def.is_used() {
            continue;
        }

        if def.operator == OperatorId::None {
            return Err(TableError::Watchpoint {
                index,
                reason: "no operator for a monitored field",
            });
        }

        let width = def.data_type.width();
        if def.offset as usize % width != 0 {
            return Err(TableError::Watchpoint {
                index,
                reason: "offset misaligned for the declared type",
            });
        }

        if def.operator != OperatorId::Custom {
            let matches_category = match def.comparison {
                WatchValue::Float(_) => def.data_type.is_float(),
                WatchValue::Signed(_) => def.data_type.is_signed(),
                WatchValue::Unsigned(_) => {
                    !def.data_type.is_float() && !def.data_type.is_signed()
                }
            };
            if !matches_category {
                return Err(TableError::Watchpoint {
                    index,
                    reason: "comparison value category does not match the data type",
                });
            }
        }
    }

    Ok(())
}

/// Validate an actionpoint definition image.
///
/// Checks the failure threshold and the postfix equation of every used
/// entry; the equation check covers terminator presence, stack balance,
/// and watchpoint index range.
pub fn validate_adt(adt: &[ActionpointDefinition; MAX_ACTIONPOINTS]) -> Result<(), TableError> {
    for (index, def) in adt.iter().enumerate() {
        let index = index as u16;
        if !def.is_used() {
            continue;
        }

        if def.max_fails_before_rts == 0 {
            return Err(TableError::Actionpoint {
                index,
                reason: "zero consecutive-failure threshold",
            });
        }

        if let Err(reason) = rpn::validate_program(&def.equation) {
            return Err(TableError::Actionpoint { index, reason });
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn used_wp() -> WatchpointDefinition {
        WatchpointDefinition {
            data_type: DataType::U16Be,
            operator: OperatorId::GreaterThan,
            message_id: MessageId(0x0881),
            offset: 12,
            bit_mask: 0xFFFF,
            comparison: WatchValue::Unsigned(100),
            result_age_when_stale: 5,
            custom_arg: 0,
        }
    }

    fn used_ap() -> ActionpointDefinition {
        let mut def = ActionpointDefinition::unused();
        def.default_state = ApState::Active;
        def.max_fails_before_rts = 3;
        def.equation =
            RpnProgram::from_slice(&[RpnToken::WatchPoint(0), RpnToken::End]).unwrap();
        def
    }

    #[test]
    fn table_set_counts_used_watchpoints() {
        let mut wdt = [WatchpointDefinition::unused(); MAX_WATCHPOINTS];
        wdt[0] = used_wp();
        wdt[3] = used_wp();
        let adt = core::array::from_fn(|_| ActionpointDefinition::unused());

        let tables = TableSet::new(wdt, adt).unwrap();
        assert_eq!(tables.watchpoints_in_use(), 2);
        assert_eq!(tables.wrt[0].watch_result, WatchResult::Stale);
    }

    #[test]
    fn results_start_in_default_state() {
        let wdt = [WatchpointDefinition::unused(); MAX_WATCHPOINTS];
        let mut adt: [ActionpointDefinition; MAX_ACTIONPOINTS] =
            core::array::from_fn(|_| ActionpointDefinition::unused());
        adt[5] = used_ap();
        adt[5].default_state = ApState::Passive;

        let tables = TableSet::new(wdt, adt).unwrap();
        assert_eq!(tables.art[5].current_state, ApState::Passive);
        assert_eq!(tables.art[0].current_state, ApState::NotUsed);
    }

    #[test]
    fn rejects_misaligned_watchpoint() {
        let mut wdt = [WatchpointDefinition::unused(); MAX_WATCHPOINTS];
        wdt[1] = used_wp();
        wdt[1].offset = 13;

        assert_eq!(
            validate_wdt(&wdt),
            Err(TableError::Watchpoint {
                index: 1,
                reason: "offset misaligned for the declared type",
            })
        );
    }

    #[test]
    fn rejects_comparison_category_mismatch() {
        let mut wdt = [WatchpointDefinition::unused(); MAX_WATCHPOINTS];
        wdt[0] = used_wp();
        wdt[0].comparison = WatchValue::Signed(100);

        assert!(matches!(
            validate_wdt(&wdt),
            Err(TableError::Watchpoint { index: 0, .. })
        ));
    }

    #[test]
    fn rejects_zero_failure_threshold() {
        let mut adt: [ActionpointDefinition; MAX_ACTIONPOINTS] =
            core::array::from_fn(|_| ActionpointDefinition::unused());
        adt[2] = used_ap();
        adt[2].max_fails_before_rts = 0;

        assert!(matches!(
            validate_adt(&adt),
            Err(TableError::Actionpoint { index: 2, .. })
        ));
    }

    #[test]
    fn stats_reset_preserves_result_and_state() {
        let mut result = ActionpointResult::startup(ApState::Active);
        result.action_result = ActionResult::Fail;
        result.consecutive_fail_count = 4;
        result.reset_stats();

        assert_eq!(result.action_result, ActionResult::Fail);
        assert_eq!(result.current_state, ApState::Active);
        assert_eq!(result.consecutive_fail_count, 0);
    }
}
