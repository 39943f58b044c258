//! Observable outputs of the system under test.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::amount::TokenAmount;
use crate::cid::Cid;
use crate::encoding::base64_bytes;

/// Exit code reported in a receipt. A non-zero code is a valid outcome,
/// not a harness error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExitCode(u32);

impl ExitCode {
    pub const OK: ExitCode = ExitCode(0);
    pub const SYS_ERR_SENDER_INVALID: ExitCode = ExitCode(1);
    pub const SYS_ERR_SENDER_STATE_INVALID: ExitCode = ExitCode(2);
    pub const SYS_ERR_INVALID_METHOD: ExitCode = ExitCode(3);
    pub const SYS_ERR_INVALID_RECEIVER: ExitCode = ExitCode(5);
    pub const SYS_ERR_INSUFFICIENT_FUNDS: ExitCode = ExitCode(6);
    pub const SYS_ERR_OUT_OF_GAS: ExitCode = ExitCode(7);
    pub const SYS_ERR_FORBIDDEN: ExitCode = ExitCode(8);
    pub const ERR_ILLEGAL_ARGUMENT: ExitCode = ExitCode(16);
    pub const ERR_NOT_FOUND: ExitCode = ExitCode(17);
    pub const ERR_ILLEGAL_STATE: ExitCode = ExitCode(20);

    pub const fn new(code: u32) -> Self {
        ExitCode(code)
    }

    pub fn value(self) -> u32 {
        self.0
    }

    pub fn is_success(self) -> bool {
        self == ExitCode::OK
    }

    pub fn name(self) -> Option<&'static str> {
        Some(match self {
            ExitCode::OK => "Ok",
            ExitCode::SYS_ERR_SENDER_INVALID => "SysErrSenderInvalid",
            ExitCode::SYS_ERR_SENDER_STATE_INVALID => "SysErrSenderStateInvalid",
            ExitCode::SYS_ERR_INVALID_METHOD => "SysErrInvalidMethod",
            ExitCode::SYS_ERR_INVALID_RECEIVER => "SysErrInvalidReceiver",
            ExitCode::SYS_ERR_INSUFFICIENT_FUNDS => "SysErrInsufficientFunds",
            ExitCode::SYS_ERR_OUT_OF_GAS => "SysErrOutOfGas",
            ExitCode::SYS_ERR_FORBIDDEN => "SysErrForbidden",
            ExitCode::ERR_ILLEGAL_ARGUMENT => "ErrIllegalArgument",
            ExitCode::ERR_NOT_FOUND => "ErrNotFound",
            ExitCode::ERR_ILLEGAL_STATE => "ErrIllegalState",
            _ => return None,
        })
    }
}

impl fmt::Display for ExitCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{}({})", name, self.0),
            None => write!(f, "ExitCode({})", self.0),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageReceipt {
    pub exit_code: ExitCode,
    #[serde(with = "base64_bytes")]
    pub return_value: Vec<u8>,
    pub gas_used: i64,
}

/// Outcome of applying one message, including the resulting state root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplyMessageResult {
    pub receipt: MessageReceipt,
    pub penalty: TokenAmount,
    pub reward: TokenAmount,
    pub root: Cid,
}

/// Outcome of applying a tip-set: one receipt per canonical message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplyTipSetResult {
    pub receipts: Vec<MessageReceipt>,
    pub root: Cid,
}

impl ApplyTipSetResult {
    /// Sum of receipt gas, saturating at the `i64` bounds.
    pub fn total_gas_used(&self) -> i64 {
        self.receipts
            .iter()
            .fold(0i64, |total, r| total.saturating_add(r.gas_used))
    }
}

/// Actor record as exposed by the state inspection surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub code: Cid,
    pub head: Cid,
    pub call_seq_num: u64,
    pub balance: TokenAmount,
}

/// Which observable channels a run compares.
///
/// An empty `test_suites` list enables every suite.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationConfig {
    pub check_gas: bool,
    pub check_exit_code: bool,
    pub check_return_value: bool,
    pub check_state_root: bool,
    #[serde(default)]
    pub test_suites: Vec<String>,
}

impl ValidationConfig {
    pub fn suite_enabled(&self, suite: &str) -> bool {
        self.test_suites.is_empty() || self.test_suites.iter().any(|s| s == suite)
    }
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            check_gas: true,
            check_exit_code: true,
            check_return_value: true,
            check_state_root: true,
            test_suites: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_code_display() {
        assert_eq!(ExitCode::OK.to_string(), "Ok(0)");
        assert_eq!(
            ExitCode::SYS_ERR_SENDER_INVALID.to_string(),
            "SysErrSenderInvalid(1)"
        );
        assert_eq!(ExitCode::new(33).to_string(), "ExitCode(33)");
    }

    #[test]
    fn test_suite_filter() {
        let mut config = ValidationConfig::default();
        assert!(config.suite_enabled("tipset"));
        config.test_suites = vec!["message_application".into()];
        assert!(config.suite_enabled("message_application"));
        assert!(!config.suite_enabled("tipset"));
    }

    #[test]
    fn test_tip_set_total_gas() {
        let receipt = |gas| MessageReceipt {
            exit_code: ExitCode::OK,
            return_value: vec![],
            gas_used: gas,
        };
        let result = ApplyTipSetResult {
            receipts: vec![receipt(130), receipt(268)],
            root: Cid::of_bytes(b"root"),
        };
        assert_eq!(result.total_gas_used(), 398);
    }

    #[test]
    fn test_tip_set_total_gas_saturates() {
        let receipt = |gas| MessageReceipt {
            exit_code: ExitCode::OK,
            return_value: vec![],
            gas_used: gas,
        };
        let result = ApplyTipSetResult {
            receipts: vec![receipt(i64::MAX), receipt(10), receipt(1)],
            root: Cid::of_bytes(b"root"),
        };
        assert_eq!(result.total_gas_used(), i64::MAX);
    }
}
