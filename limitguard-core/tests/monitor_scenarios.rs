//! End-to-End Monitoring Scenarios
//!
//! These tests drive the engine the way the host does: one bus message at
//! a time through dispatch, with recording doubles standing in for the
//! event service and the stored-sequence executor.

use limitguard_core::{
    cmds::fc,
    config::{MAX_ACTIONPOINTS, MAX_WATCHPOINTS},
    events::Severity,
    hk::{self, codes},
    rpn::RpnToken,
    tables::RpnProgram,
    time::{FixedClock, MissionTime},
    ActionResult, ActionpointDefinition, ApState, DataType, Dispatch, EventSink, LimitChecker,
    MessageId, OperatorId, ReservedIds, RtsExecutor, WatchResult, WatchValue,
    WatchpointDefinition,
};

// ===== TEST FIXTURES =====

const SAMPLE_MID: MessageId = MessageId(0x18A4);
const SEND_HK_MID: MessageId = MessageId(0x18A5);
const CMD_MID: MessageId = MessageId(0x18A6);

/// Telemetry message watched by WP0
const TLM_MID: MessageId = MessageId(0x0881);
/// Message watched by WP1; never sent, so WP1 stays stale
const QUIET_MID: MessageId = MessageId(0x0882);

/// WP0 watches a u16 at this offset
const WP_OFFSET: usize = 12;
/// Stored sequence requested by AP0
const RTS_ID: u16 = 7;
/// Consecutive failures before the request
const MAX_FAILS: u16 = 3;
/// Event configured for AP0 failures
const FAIL_EVENT_ID: u16 = 900;

struct EventLog(Vec<(u16, Severity)>);

impl EventSink for EventLog {
    fn emit(&mut self, event_id: u16, severity: Severity, _text: &str) {
        self.0.push((event_id, severity));
    }
}

struct RtsLog(Vec<u16>);

impl RtsExecutor for RtsLog {
    fn request_rts(&mut self, rts_id: u16) {
        self.0.push(rts_id);
    }
}

type Checker = LimitChecker<EventLog, RtsLog, FixedClock>;

fn definitions() -> (
    [WatchpointDefinition; MAX_WATCHPOINTS],
    [ActionpointDefinition; MAX_ACTIONPOINTS],
) {
    let mut wdt = [WatchpointDefinition::unused(); MAX_WATCHPOINTS];
    // WP0: u16 big-endian at offset 12, true when > 100
    wdt[0] = WatchpointDefinition {
        data_type: DataType::U16Be,
        operator: OperatorId::GreaterThan,
        message_id: TLM_MID,
        offset: WP_OFFSET as u32,
        bit_mask: 0xFFFF,
        comparison: WatchValue::Unsigned(100),
        result_age_when_stale: 5,
        custom_arg: 0,
    };
    // WP1: same comparison on a message that never arrives
    wdt[1] = wdt[0];
    wdt[1].message_id = QUIET_MID;

    let mut adt: [ActionpointDefinition; MAX_ACTIONPOINTS] =
        core::array::from_fn(|_| ActionpointDefinition::unused());

    // AP0: fails when WP0 is true
    let mut ap0 = ActionpointDefinition::unused();
    ap0.default_state = ApState::Active;
    ap0.max_fails_before_rts = MAX_FAILS;
    ap0.max_pass_fail_events = 2;
    ap0.max_passive_events = 2;
    ap0.max_fail_pass_events = 2;
    ap0.rts_id = RTS_ID;
    ap0.event_id = FAIL_EVENT_ID;
    ap0.event_type = Severity::Error;
    ap0.equation = RpnProgram::from_slice(&[RpnToken::WatchPoint(0), RpnToken::End]).unwrap();
    adt[0] = ap0.clone();

    // AP1: fails when WP0 and WP1 are both true
    let mut ap1 = ap0.clone();
    ap1.equation = RpnProgram::from_slice(&[
        RpnToken::WatchPoint(0),
        RpnToken::WatchPoint(1),
        RpnToken::And,
        RpnToken::End,
    ])
    .unwrap();
    adt[1] = ap1;

    // AP2: starts disabled
    let mut ap2 = ap0;
    ap2.default_state = ApState::Disabled;
    adt[2] = ap2;

    (wdt, adt)
}

fn checker() -> Checker {
    let (wdt, adt) = definitions();
    LimitChecker::new(
        wdt,
        adt,
        ReservedIds {
            sample: SAMPLE_MID,
            send_hk: SEND_HK_MID,
            cmd: CMD_MID,
        },
        EventLog(Vec::new()),
        RtsLog(Vec::new()),
        FixedClock::new(MissionTime::new(1000, 0)),
    )
    .unwrap()
}

/// Telemetry payload carrying `value` at the watched offset
fn telemetry(value: u16) -> [u8; 16] {
    let mut payload = [0u8; 16];
    payload[WP_OFFSET..WP_OFFSET + 2].copy_from_slice(&value.to_be_bytes());
    payload
}

/// Sample request covering `[start, end]`
fn sample(start: u16, end: u16, update_age: u16) -> [u8; 6] {
    let mut payload = [0u8; 6];
    payload[0..2].copy_from_slice(&start.to_be_bytes());
    payload[2..4].copy_from_slice(&end.to_be_bytes());
    payload[4..6].copy_from_slice(&update_age.to_be_bytes());
    payload
}

fn set_ap_state(ap: u16, state: ApState) -> [u8; 5] {
    let mut payload = [fc::SET_AP_STATE, 0, 0, 0, 0];
    payload[1..3].copy_from_slice(&ap.to_be_bytes());
    payload[3..5].copy_from_slice(&(state as u16).to_be_bytes());
    payload
}

fn failure_events(checker: &Checker) -> usize {
    checker
        .events()
        .0
        .iter()
        .filter(|(id, _)| *id == FAIL_EVENT_ID)
        .count()
}

// ===== SCENARIOS =====

/// Three consecutive limit violations request the stored sequence once.
#[test]
fn test_single_wp_transition_triggers_rts() {
    let mut checker = checker();

    for _ in 0..3 {
        assert_eq!(checker.dispatch(TLM_MID, &telemetry(150)), Dispatch::Monitored(1));
        checker.dispatch(SAMPLE_MID, &sample(0, 0, 1));
    }

    assert_eq!(checker.rts().0, vec![RTS_ID]);
    let ap0 = &checker.tables().art[0];
    assert_eq!(ap0.cumulative_rts_exec_count, 1);
    assert_eq!(ap0.consecutive_fail_count, 3);
    assert_eq!(ap0.cumulative_fail_count, 3);
    assert_eq!(failure_events(&checker), 1);
    assert_eq!(checker.app_state().rts_exec_count, 1);
}

/// A passive actionpoint counts the trigger but requests nothing.
#[test]
fn test_passive_actionpoint_suppresses_request() {
    let mut checker = checker();
    checker.dispatch(CMD_MID, &set_ap_state(0, ApState::Passive));

    for _ in 0..3 {
        checker.dispatch(TLM_MID, &telemetry(150));
        checker.dispatch(SAMPLE_MID, &sample(0, 0, 1));
    }

    assert!(checker.rts().0.is_empty());
    let ap0 = &checker.tables().art[0];
    assert_eq!(ap0.passive_ap_count, 1);
    assert_eq!(ap0.cumulative_rts_exec_count, 0);
    assert_eq!(checker.app_state().passive_rts_exec_count, 1);
}

/// Without fresh telemetry the watchpoint decays to stale and the
/// actionpoint follows on the next sample, with no counter movement.
#[test]
fn test_result_decays_to_stale() {
    let mut checker = checker();

    checker.dispatch(TLM_MID, &telemetry(150));
    for _ in 0..5 {
        checker.dispatch(SAMPLE_MID, &sample(0, 0, 1));
    }

    // Fifth aging pass exhausted the freshness budget
    assert_eq!(checker.tables().wrt[0].watch_result, WatchResult::Stale);
    assert_eq!(checker.tables().wrt[0].countdown_to_stale, 0);

    let before = checker.tables().art[0];
    checker.dispatch(SAMPLE_MID, &sample(0, 0, 1));
    let after = checker.tables().art[0];

    assert_eq!(after.action_result, ActionResult::Stale);
    assert_eq!(after.cumulative_fail_count, before.cumulative_fail_count);
    assert_eq!(after.consecutive_fail_count, before.consecutive_fail_count);
    assert_eq!(after.pass_to_fail_count, before.pass_to_fail_count);
}

/// Three-valued conjunction: a stale operand is absorbed by false but
/// not by true.
#[test]
fn test_conjunction_with_stale_operand() {
    let mut checker = checker();

    // WP0 true, WP1 stale -> unknown
    checker.dispatch(TLM_MID, &telemetry(150));
    checker.dispatch(SAMPLE_MID, &sample(1, 1, 0));
    assert_eq!(checker.tables().art[1].action_result, ActionResult::Stale);

    // WP0 false, WP1 stale -> pass
    checker.dispatch(TLM_MID, &telemetry(50));
    checker.dispatch(SAMPLE_MID, &sample(1, 1, 0));
    assert_eq!(checker.tables().art[1].action_result, ActionResult::Pass);
}

/// Permanently-off is reachable only from disabled and then sticks.
#[test]
fn test_permanently_off_protection() {
    let mut checker = checker();
    let before = *checker.app_state();

    checker.dispatch(CMD_MID, &[fc::SET_AP_PERMOFF, 0, 2]);
    assert_eq!(checker.tables().art[2].current_state, ApState::PermOff);
    assert_eq!(checker.app_state().cmd_count, before.cmd_count + 1);

    checker.dispatch(CMD_MID, &set_ap_state(2, ApState::Active));
    assert_eq!(checker.tables().art[2].current_state, ApState::PermOff);
    assert_eq!(checker.app_state().cmd_err_count, before.cmd_err_count + 1);
}

/// The housekeeping packet reflects engine state through the packed
/// codes and counters.
#[test]
fn test_housekeeping_reflects_results() {
    let mut checker = checker();

    checker.dispatch(TLM_MID, &telemetry(150));
    checker.dispatch(SAMPLE_MID, &sample(0, 0, 0));

    let packet = match checker.dispatch(SEND_HK_MID, &[]) {
        Dispatch::Housekeeping(Some(packet)) => packet,
        other => panic!("expected housekeeping packet, got {other:?}"),
    };

    assert_eq!(packet.wps_in_use, 2);
    assert_eq!(packet.active_aps, 2);
    assert_eq!(packet.monitored_msg_count, 1);
    assert_eq!(hk::unpack_wp(&packet.wp_results, 0), codes::WP_TRUE);
    assert_eq!(hk::unpack_wp(&packet.wp_results, 1), codes::WP_STALE);
    let (state, result) = hk::unpack_ap(&packet.ap_results, 0);
    assert_eq!(state, codes::AP_STATE_ACTIVE);
    assert_eq!(result, codes::AP_FAIL);
    // Disabled AP2 reports its state with a stale result
    let (state, result) = hk::unpack_ap(&packet.ap_results, 2);
    assert_eq!(state, codes::AP_STATE_DISABLED);
    assert_eq!(result, codes::AP_STALE);
}

// ===== PROPERTIES =====

/// The three-valued truth tables, exhaustively for all operand pairs.
///
/// One telemetry message drives both operands: a watchpoint meant to read
/// TRUE compares against 0, one meant to read FALSE compares against the
/// ceiling, and one meant to stay STALE watches a message that never
/// arrives.
#[test]
fn test_three_valued_truth_tables() {
    const OPERANDS: [WatchResult; 3] =
        [WatchResult::False, WatchResult::True, WatchResult::Stale];

    fn operand_wp(result: WatchResult) -> WatchpointDefinition {
        let mut def = WatchpointDefinition {
            data_type: DataType::U16Be,
            operator: OperatorId::GreaterThan,
            message_id: TLM_MID,
            offset: WP_OFFSET as u32,
            bit_mask: 0xFFFF,
            comparison: WatchValue::Unsigned(0),
            result_age_when_stale: 0,
            custom_arg: 0,
        };
        match result {
            WatchResult::True => {}
            WatchResult::False => def.comparison = WatchValue::Unsigned(u16::MAX as u32),
            _ => def.message_id = QUIET_MID,
        }
        def
    }

    // Reference semantics over Option<bool> (None = unknown)
    fn as_opt(result: WatchResult) -> Option<bool> {
        match result {
            WatchResult::False => Some(false),
            WatchResult::True => Some(true),
            _ => None,
        }
    }

    fn expected(op: RpnToken, a: Option<bool>, b: Option<bool>) -> ActionResult {
        let value = match op {
            RpnToken::And => match (a, b) {
                (Some(false), _) | (_, Some(false)) => Some(false),
                (Some(true), Some(true)) => Some(true),
                _ => None,
            },
            RpnToken::Or => match (a, b) {
                (Some(true), _) | (_, Some(true)) => Some(true),
                (Some(false), Some(false)) => Some(false),
                _ => None,
            },
            RpnToken::Xor => match (a, b) {
                (Some(x), Some(y)) => Some(x != y),
                _ => None,
            },
            RpnToken::Equal => match (a, b) {
                (Some(x), Some(y)) => Some(x == y),
                _ => None,
            },
            _ => unreachable!(),
        };
        match value {
            Some(false) => ActionResult::Pass,
            Some(true) => ActionResult::Fail,
            None => ActionResult::Stale,
        }
    }

    for op in [RpnToken::And, RpnToken::Or, RpnToken::Xor, RpnToken::Equal] {
        for a in OPERANDS {
            for b in OPERANDS {
                let mut wdt = [WatchpointDefinition::unused(); MAX_WATCHPOINTS];
                wdt[0] = operand_wp(a);
                wdt[1] = operand_wp(b);

                let mut adt: [ActionpointDefinition; MAX_ACTIONPOINTS] =
                    core::array::from_fn(|_| ActionpointDefinition::unused());
                let mut def = ActionpointDefinition::unused();
                def.default_state = ApState::Active;
                def.max_fails_before_rts = MAX_FAILS;
                def.equation = RpnProgram::from_slice(&[
                    RpnToken::WatchPoint(0),
                    RpnToken::WatchPoint(1),
                    op,
                    RpnToken::End,
                ])
                .unwrap();
                adt[0] = def;

                let mut checker = LimitChecker::new(
                    wdt,
                    adt,
                    ReservedIds {
                        sample: SAMPLE_MID,
                        send_hk: SEND_HK_MID,
                        cmd: CMD_MID,
                    },
                    EventLog(Vec::new()),
                    RtsLog(Vec::new()),
                    FixedClock::default(),
                )
                .unwrap();

                checker.dispatch(TLM_MID, &telemetry(150));
                checker.dispatch(SAMPLE_MID, &sample(0, 0, 0));

                assert_eq!(
                    checker.tables().art[0].action_result,
                    expected(op, as_opt(a), as_opt(b)),
                    "op {op:?} with operands {a:?}, {b:?}"
                );
            }
        }
    }
}

/// Negation over all three operand values.
#[test]
fn test_negation_truth_table() {
    let (wdt, mut adt) = definitions();
    adt[0].equation = RpnProgram::from_slice(&[
        RpnToken::WatchPoint(0),
        RpnToken::Not,
        RpnToken::End,
    ])
    .unwrap();

    let cases = [
        (Some(150u16), ActionResult::Pass), // true -> not -> pass
        (Some(50), ActionResult::Fail),     // false -> not -> fail
        (None, ActionResult::Stale),        // stale -> not -> stale
    ];

    for (value, expected) in cases {
        let mut checker = LimitChecker::new(
            wdt,
            adt.clone(),
            ReservedIds {
                sample: SAMPLE_MID,
                send_hk: SEND_HK_MID,
                cmd: CMD_MID,
            },
            EventLog(Vec::new()),
            RtsLog(Vec::new()),
            FixedClock::default(),
        )
        .unwrap();

        if let Some(value) = value {
            checker.dispatch(TLM_MID, &telemetry(value));
        }
        checker.dispatch(SAMPLE_MID, &sample(0, 0, 0));
        assert_eq!(checker.tables().art[0].action_result, expected);
    }
}

/// A fresh TRUE or FALSE always re-arms the freshness countdown.
#[test]
fn test_fresh_result_rearms_countdown() {
    let mut checker = checker();

    checker.dispatch(TLM_MID, &telemetry(150));
    assert_eq!(checker.tables().wrt[0].countdown_to_stale, 5);

    // Age it down, then refresh with the opposite result
    checker.dispatch(SAMPLE_MID, &sample(0, 0, 1));
    checker.dispatch(SAMPLE_MID, &sample(0, 0, 1));
    assert_eq!(checker.tables().wrt[0].countdown_to_stale, 3);

    checker.dispatch(TLM_MID, &telemetry(50));
    assert_eq!(checker.tables().wrt[0].watch_result, WatchResult::False);
    assert_eq!(checker.tables().wrt[0].countdown_to_stale, 5);
}

/// The wildcard state command accepts even when every entry is sticky.
#[test]
fn test_wildcard_state_command_allow_all() {
    let mut checker = checker();
    checker.dispatch(CMD_MID, &set_ap_state(0, ApState::Disabled));
    checker.dispatch(CMD_MID, &set_ap_state(1, ApState::Disabled));
    checker.dispatch(CMD_MID, &[fc::SET_AP_PERMOFF, 0, 0]);
    checker.dispatch(CMD_MID, &[fc::SET_AP_PERMOFF, 0, 1]);
    checker.dispatch(CMD_MID, &[fc::SET_AP_PERMOFF, 0, 2]);
    let accepted = checker.app_state().cmd_count;

    checker.dispatch(CMD_MID, &set_ap_state(0xFFFF, ApState::Active));

    // No entry moved, the command still counted as accepted
    assert_eq!(checker.tables().art[0].current_state, ApState::PermOff);
    assert_eq!(checker.app_state().cmd_count, accepted + 1);
}
