//! Message construction.
//!
//! Defaults are fixed when the producer is created. Each call starts from a
//! copy of them and applies zero or more [`MessageOpt`]s left to right:
//!
//! ```ignore
//! let msg = producer.transfer(&bob, &alice, &[value(50), nonce(1)]);
//! ```

use chain_validation_types::{Address, Message, MethodNum, TokenAmount, METHOD_SEND};

/// Producer-wide defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageDefaults {
    /// Default 0.
    pub value: TokenAmount,
    /// Default 1,000,000.
    pub gas_limit: i64,
    /// Default 1.
    pub gas_fee_cap: TokenAmount,
    /// Default 1.
    pub gas_premium: TokenAmount,
}

impl Default for MessageDefaults {
    fn default() -> Self {
        Self {
            value: TokenAmount::zero(),
            gas_limit: 1_000_000,
            gas_fee_cap: TokenAmount::from(1),
            gas_premium: TokenAmount::from(1),
        }
    }
}

/// Fully-specified per-message parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageOpts {
    pub value: TokenAmount,
    /// Default 0.
    pub call_seq_num: u64,
    pub gas_limit: i64,
    pub gas_fee_cap: TokenAmount,
    pub gas_premium: TokenAmount,
}

impl From<&MessageDefaults> for MessageOpts {
    fn from(d: &MessageDefaults) -> Self {
        Self {
            value: d.value.clone(),
            call_seq_num: 0,
            gas_limit: d.gas_limit,
            gas_fee_cap: d.gas_fee_cap.clone(),
            gas_premium: d.gas_premium.clone(),
        }
    }
}

/// A pure override of one or more fields.
pub type MessageOpt = Box<dyn Fn(MessageOpts) -> MessageOpts>;

pub fn value(v: impl Into<TokenAmount>) -> MessageOpt {
    let v = v.into();
    Box::new(move |o| MessageOpts {
        value: v.clone(),
        ..o
    })
}

pub fn nonce(n: u64) -> MessageOpt {
    Box::new(move |o| MessageOpts {
        call_seq_num: n,
        ..o
    })
}

pub fn gas_limit(limit: i64) -> MessageOpt {
    Box::new(move |o| MessageOpts {
        gas_limit: limit,
        ..o
    })
}

pub fn gas_fee_cap(cap: impl Into<TokenAmount>) -> MessageOpt {
    let cap = cap.into();
    Box::new(move |o| MessageOpts {
        gas_fee_cap: cap.clone(),
        ..o
    })
}

pub fn gas_premium(premium: impl Into<TokenAmount>) -> MessageOpt {
    let premium = premium.into();
    Box::new(move |o| MessageOpts {
        gas_premium: premium.clone(),
        ..o
    })
}

/// Builds messages and keeps an append-only log of everything built.
///
/// The log is for introspection only; no applier reads it.
#[derive(Debug, Default)]
pub struct MessageProducer {
    defaults: MessageDefaults,
    messages: Vec<Message>,
}

impl MessageProducer {
    pub fn new(defaults: MessageDefaults) -> Self {
        Self {
            defaults,
            messages: Vec::new(),
        }
    }

    pub fn defaults(&self) -> &MessageDefaults {
        &self.defaults
    }

    /// Every message built so far, in build order.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn resolve(&self, opts: &[MessageOpt]) -> MessageOpts {
        opts.iter()
            .fold(MessageOpts::from(&self.defaults), |acc, opt| opt(acc))
    }

    pub fn build(
        &mut self,
        to: &Address,
        from: &Address,
        method: MethodNum,
        params: Vec<u8>,
        opts: &[MessageOpt],
    ) -> Message {
        let o = self.resolve(opts);
        let msg = Message {
            to: to.clone(),
            from: from.clone(),
            call_seq_num: o.call_seq_num,
            value: o.value,
            method,
            params,
            gas_fee_cap: o.gas_fee_cap,
            gas_premium: o.gas_premium,
            gas_limit: o.gas_limit,
        };
        self.messages.push(msg.clone());
        msg
    }

    /// Plain value transfer (method 0, no params).
    pub fn transfer(&mut self, to: &Address, from: &Address, opts: &[MessageOpt]) -> Message {
        self.build(to, from, METHOD_SEND, Vec::new(), opts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alice() -> Address {
        Address::new_secp256k1(b"alice")
    }

    fn bob() -> Address {
        Address::new_secp256k1(b"bob")
    }

    #[test]
    fn test_defaults_apply_without_options() {
        let mut producer = MessageProducer::new(MessageDefaults::default());
        let msg = producer.transfer(&bob(), &alice(), &[]);
        assert_eq!(msg.value, TokenAmount::zero());
        assert_eq!(msg.call_seq_num, 0);
        assert_eq!(msg.gas_limit, 1_000_000);
        assert_eq!(msg.gas_fee_cap, TokenAmount::from(1));
        assert_eq!(msg.gas_premium, TokenAmount::from(1));
        assert_eq!(msg.method, METHOD_SEND);
    }

    #[test]
    fn test_options_override_independently() {
        let mut producer = MessageProducer::new(MessageDefaults::default());
        let msg = producer.transfer(
            &bob(),
            &alice(),
            &[value(50u64), nonce(3), gas_limit(10), gas_fee_cap(4u64), gas_premium(2u64)],
        );
        assert_eq!(msg.value, TokenAmount::from(50));
        assert_eq!(msg.call_seq_num, 3);
        assert_eq!(msg.gas_limit, 10);
        assert_eq!(msg.gas_fee_cap, TokenAmount::from(4));
        assert_eq!(msg.gas_premium, TokenAmount::from(2));
    }

    #[test]
    fn test_later_options_win() {
        let producer = MessageProducer::new(MessageDefaults::default());
        let opts = producer.resolve(&[value(1u64), value(2u64)]);
        assert_eq!(opts.value, TokenAmount::from(2));
    }

    #[test]
    fn test_options_do_not_leak_between_calls() {
        let mut producer = MessageProducer::new(MessageDefaults::default());
        let first = producer.transfer(&bob(), &alice(), &[value(50u64), gas_limit(5)]);
        let second = producer.transfer(&bob(), &alice(), &[]);
        assert_eq!(first.value, TokenAmount::from(50));
        assert_eq!(second.value, TokenAmount::zero());
        assert_eq!(second.gas_limit, 1_000_000);
    }

    #[test]
    fn test_identical_calls_differ_only_in_log_position() {
        let mut producer = MessageProducer::new(MessageDefaults {
            value: TokenAmount::from(9),
            ..MessageDefaults::default()
        });
        let a = producer.build(&bob(), &alice(), 2, vec![1], &[gas_premium(7u64)]);
        let b = producer.build(&bob(), &alice(), 2, vec![1], &[gas_premium(7u64)]);
        assert_eq!(a, b);
        assert_eq!(a.cid(), b.cid());
        assert_eq!(producer.messages(), &[a, b]);
    }
}
