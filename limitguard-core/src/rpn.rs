//! Postfix equation evaluation over watchpoint results
//!
//! Each actionpoint carries a small postfix (reverse-Polish) boolean
//! program. Atoms push the referenced watchpoint's current result, or a
//! constant; operators pop their operands; an explicit terminator ends
//! the program with exactly one value on the stack.
//!
//! Evaluation is three-valued: a stale watchpoint contributes an unknown
//! that short-circuit rules can still absorb (`unknown AND false` is
//! false, `unknown OR true` is true). A watchpoint in the ERROR state
//! poisons the whole equation instead - a faulted input must never be
//! read as "probably fine".
//!
//! The stack is a fixed-capacity vector sized by the maximum program
//! length, so evaluation is allocation-free and bounded.

use heapless::Vec;

use crate::config::{MAX_RPN_EQU_SIZE, MAX_WATCHPOINTS};
use crate::errors::{MonitorError, MonitorResult};
use crate::tables::{ActionResult, RpnProgram, WatchResult, WatchpointResult};

/// One token of a postfix equation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RpnToken {
    /// Push the referenced watchpoint's current result
    WatchPoint(u16),
    /// Push a constant
    Const(bool),
    /// Pop two, push three-valued conjunction
    And,
    /// Pop two, push three-valued disjunction
    Or,
    /// Pop two, push exclusive or (unknown if either side is unknown)
    Xor,
    /// Pop two, push equality (unknown if either side is unknown)
    Equal,
    /// Pop one, push negation
    Not,
    /// Terminate; the single remaining value is the equation result
    End,
}

/// Three-valued logic operand
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Trit {
    False,
    True,
    Unknown,
}

impl Trit {
    const fn from_bool(value: bool) -> Self {
        if value {
            Self::True
        } else {
            Self::False
        }
    }

    fn and(self, other: Self) -> Self {
        match (self, other) {
            (Self::False, _) | (_, Self::False) => Self::False,
            (Self::Unknown, _) | (_, Self::Unknown) => Self::Unknown,
            _ => Self::True,
        }
    }

    fn or(self, other: Self) -> Self {
        match (self, other) {
            (Self::True, _) | (_, Self::True) => Self::True,
            (Self::Unknown, _) | (_, Self::Unknown) => Self::Unknown,
            _ => Self::False,
        }
    }

    fn xor(self, other: Self) -> Self {
        match (self, other) {
            (Self::Unknown, _) | (_, Self::Unknown) => Self::Unknown,
            (a, b) => Self::from_bool(a != b),
        }
    }

    fn equal(self, other: Self) -> Self {
        match (self, other) {
            (Self::Unknown, _) | (_, Self::Unknown) => Self::Unknown,
            (a, b) => Self::from_bool(a == b),
        }
    }

    fn not(self) -> Self {
        match self {
            Self::False => Self::True,
            Self::True => Self::False,
            Self::Unknown => Self::Unknown,
        }
    }
}

/// Evaluate a postfix equation against the watchpoint results table.
///
/// `Ok` carries `Pass` when the equation is false, `Fail` when true, and
/// `Stale` when unknowns could not be absorbed. Structural faults (stack
/// underflow or overflow, a missing terminator) report as malformed; an
/// atom referencing a watchpoint in the ERROR state or outside the
/// results table is a runtime fault. Either way the caller records an
/// ERROR result.
pub fn evaluate(program: &RpnProgram, wrt: &[WatchpointResult]) -> MonitorResult<ActionResult> {
    let mut stack: Vec<Trit, MAX_RPN_EQU_SIZE> = Vec::new();

    for (position, token) in program.iter().enumerate() {
        match *token {
            RpnToken::WatchPoint(index) => {
                let operand = match wrt.get(index as usize) {
                    Some(entry) => match entry.watch_result {
                        WatchResult::False => Trit::False,
                        WatchResult::True => Trit::True,
                        WatchResult::Stale => Trit::Unknown,
                        // A faulted input poisons the equation
                        WatchResult::Error => {
                            return Err(MonitorError::RpnRuntime { position })
                        }
                    },
                    None => return Err(MonitorError::RpnRuntime { position }),
                };
                if stack.push(operand).is_err() {
                    return Err(MonitorError::RpnMalformed { position });
                }
            }
            RpnToken::Const(value) => {
                if stack.push(Trit::from_bool(value)).is_err() {
                    return Err(MonitorError::RpnMalformed { position });
                }
            }
            RpnToken::Not => {
                let Some(a) = stack.pop() else {
                    return Err(MonitorError::RpnMalformed { position });
                };
                // Push after a pop cannot overflow
                let _ = stack.push(a.not());
            }
            RpnToken::And | RpnToken::Or | RpnToken::Xor | RpnToken::Equal => {
                let (Some(b), Some(a)) = (stack.pop(), stack.pop()) else {
                    return Err(MonitorError::RpnMalformed { position });
                };
                let value = match *token {
                    RpnToken::And => a.and(b),
                    RpnToken::Or => a.or(b),
                    RpnToken::Xor => a.xor(b),
                    _ => a.equal(b),
                };
                let _ = stack.push(value);
            }
            RpnToken::End => {
                if stack.len() != 1 {
                    return Err(MonitorError::RpnMalformed { position });
                }
                return Ok(match stack[0] {
                    Trit::False => ActionResult::Pass,
                    Trit::True => ActionResult::Fail,
                    Trit::Unknown => ActionResult::Stale,
                });
            }
        }
    }

    // Token stream exhausted without a terminator
    Err(MonitorError::RpnMalformed {
        position: program.len(),
    })
}

/// Statically check a postfix equation at table load.
///
/// Simulates stack depth with unknown atoms: every atom must fit in the
/// bounded stack, every operator must find its operands, the terminator
/// must be present, leave exactly one value, and be the final token.
pub fn validate_program(program: &RpnProgram) -> Result<(), &'static str> {
    let mut depth = 0usize;

    for (position, token) in program.iter().enumerate() {
        match *token {
            RpnToken::WatchPoint(index) => {
                if index as usize >= MAX_WATCHPOINTS {
                    return Err("equation references a watchpoint outside the table");
                }
                depth += 1;
            }
            RpnToken::Const(_) => depth += 1,
            RpnToken::Not => {
                if depth < 1 {
                    return Err("equation underflows its stack");
                }
            }
            RpnToken::And | RpnToken::Or | RpnToken::Xor | RpnToken::Equal => {
                if depth < 2 {
                    return Err("equation underflows its stack");
                }
                depth -= 1;
            }
            RpnToken::End => {
                if depth != 1 {
                    return Err("equation terminator leaves more than one value");
                }
                if position + 1 != program.len() {
                    return Err("tokens follow the equation terminator");
                }
                return Ok(());
            }
        }
        if depth > MAX_RPN_EQU_SIZE {
            return Err("equation overflows its stack");
        }
    }

    Err("equation has no terminator")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MAX_WATCHPOINTS;

    fn wrt_with(results: &[WatchResult]) -> [WatchpointResult; MAX_WATCHPOINTS] {
        let mut wrt = [WatchpointResult::startup(); MAX_WATCHPOINTS];
        for (entry, result) in wrt.iter_mut().zip(results.iter()) {
            entry.watch_result = *result;
        }
        wrt
    }

    fn program(tokens: &[RpnToken]) -> RpnProgram {
        RpnProgram::from_slice(tokens).unwrap()
    }

    #[test]
    fn single_atom_maps_results() {
        let prog = program(&[RpnToken::WatchPoint(0), RpnToken::End]);

        let wrt = wrt_with(&[WatchResult::True]);
        assert_eq!(evaluate(&prog, &wrt), Ok(ActionResult::Fail));

        let wrt = wrt_with(&[WatchResult::False]);
        assert_eq!(evaluate(&prog, &wrt), Ok(ActionResult::Pass));

        let wrt = wrt_with(&[WatchResult::Stale]);
        assert_eq!(evaluate(&prog, &wrt), Ok(ActionResult::Stale));

        let wrt = wrt_with(&[WatchResult::Error]);
        assert_eq!(
            evaluate(&prog, &wrt),
            Err(MonitorError::RpnRuntime { position: 0 })
        );
    }

    #[test]
    fn unknown_absorption() {
        // unknown AND false -> false (pass)
        let prog = program(&[
            RpnToken::WatchPoint(0),
            RpnToken::WatchPoint(1),
            RpnToken::And,
            RpnToken::End,
        ]);
        let wrt = wrt_with(&[WatchResult::Stale, WatchResult::False]);
        assert_eq!(evaluate(&prog, &wrt), Ok(ActionResult::Pass));

        // unknown OR true -> true (fail)
        let prog = program(&[
            RpnToken::WatchPoint(0),
            RpnToken::WatchPoint(1),
            RpnToken::Or,
            RpnToken::End,
        ]);
        let wrt = wrt_with(&[WatchResult::Stale, WatchResult::True]);
        assert_eq!(evaluate(&prog, &wrt), Ok(ActionResult::Fail));

        // unknown XOR anything -> unknown (stale)
        let prog = program(&[
            RpnToken::WatchPoint(0),
            RpnToken::WatchPoint(1),
            RpnToken::Xor,
            RpnToken::End,
        ]);
        let wrt = wrt_with(&[WatchResult::Stale, WatchResult::True]);
        assert_eq!(evaluate(&prog, &wrt), Ok(ActionResult::Stale));
    }

    #[test]
    fn constants_and_negation() {
        let prog = program(&[RpnToken::Const(true), RpnToken::Not, RpnToken::End]);
        let wrt = wrt_with(&[]);
        assert_eq!(evaluate(&prog, &wrt), Ok(ActionResult::Pass));
    }

    #[test]
    fn malformed_programs_error() {
        let wrt = wrt_with(&[WatchResult::True]);

        // Underflow
        let prog = program(&[RpnToken::And, RpnToken::End]);
        assert_eq!(
            evaluate(&prog, &wrt),
            Err(MonitorError::RpnMalformed { position: 0 })
        );

        // No terminator
        let prog = program(&[RpnToken::WatchPoint(0)]);
        assert_eq!(
            evaluate(&prog, &wrt),
            Err(MonitorError::RpnMalformed { position: 1 })
        );

        // Two values left at the terminator
        let prog = program(&[
            RpnToken::WatchPoint(0),
            RpnToken::WatchPoint(0),
            RpnToken::End,
        ]);
        assert_eq!(
            evaluate(&prog, &wrt),
            Err(MonitorError::RpnMalformed { position: 2 })
        );

        // Atom outside the results table
        let prog = program(&[RpnToken::WatchPoint(u16::MAX), RpnToken::End]);
        assert_eq!(
            evaluate(&prog, &wrt),
            Err(MonitorError::RpnRuntime { position: 0 })
        );
    }

    #[test]
    fn validation_mirrors_evaluation() {
        assert!(validate_program(&program(&[
            RpnToken::WatchPoint(0),
            RpnToken::WatchPoint(1),
            RpnToken::And,
            RpnToken::End,
        ]))
        .is_ok());

        assert!(validate_program(&program(&[RpnToken::And, RpnToken::End])).is_err());
        assert!(validate_program(&program(&[RpnToken::WatchPoint(0)])).is_err());
        assert!(validate_program(&program(&[
            RpnToken::WatchPoint(MAX_WATCHPOINTS as u16),
            RpnToken::End,
        ]))
        .is_err());
        assert!(validate_program(&program(&[
            RpnToken::Const(true),
            RpnToken::End,
            RpnToken::Const(false),
        ]))
        .is_err());
    }
}
