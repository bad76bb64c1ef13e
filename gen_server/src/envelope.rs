// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

//! # Envelopes
//!
//! Every message a process receives is a plain `Term`. The envelope protocol classifies that term
//! by its protocol tag:
//!
//! - `{'$gen_call', {Pid, Ref}, Request}` is a **call** and expects the reply `{Ref, Reply}`.
//! - `{'$gen_cast', Request}` is a **cast**.
//! - `{'$gen_control', ...}` is a **control** signal for the runtime itself.
//! - Anything else is **info**, including tuples that carry a known tag but the wrong shape.
//!
//! Classification never fails. A term that only resembles a call or a cast is delivered to
//! `handle_info` untouched.
//!

use crate::{Pid, Reference, Term};

/// Tag of call envelopes.
pub const CALL_TAG: &str = "$gen_call";
/// Tag of cast envelopes.
pub const CAST_TAG: &str = "$gen_cast";
/// Tag of control envelopes.
pub const CONTROL_TAG: &str = "$gen_control";

/// Sender descriptor of a call.
#[derive(Clone, Debug, PartialEq)]
pub struct Caller {
    /// The calling process. Replies are sent here.
    pub pid: Pid,
    /// The correlation reference echoed in the reply.
    pub reference: Reference,
}

impl Caller {
    /// Parses a `{Pid, Ref}` tuple.
    fn from_term(term: &Term) -> Option<Self> {
        match term.as_tuple()? {
            [Term::Pid(pid), Term::Ref(reference)] => Some(Caller {
                pid: pid.clone(),
                reference: reference.clone(),
            }),
            _ => None,
        }
    }

    /// Builds the `{Pid, Ref}` tuple.
    pub fn to_term(&self) -> Term {
        Term::tuple(vec![
            Term::Pid(self.pid.clone()),
            Term::Ref(self.reference.clone()),
        ])
    }
}

/// A classified message.
#[derive(Clone, Debug, PartialEq)]
pub enum Envelope {
    /// Two-way request.
    Call {
        /// Who is waiting for the reply.
        from: Caller,
        /// Request body.
        request: Term,
    },
    /// One-way request body.
    Cast(Term),
    /// Runtime control signal. Holds the whole received term.
    Control(Term),
    /// Unclassified message, verbatim.
    Info(Term),
}

impl Envelope {
    /// Classifies a term received on a regular (plain or addressed) channel.
    pub fn classify(term: Term) -> Self {
        let tag = term
            .as_tuple()
            .and_then(|elements| elements.first())
            .and_then(Term::as_atom)
            .map(|atom| atom.as_str().to_owned());

        match tag.as_deref() {
            Some(CALL_TAG) => Self::classify_call(term),
            Some(CAST_TAG) => Self::classify_cast(term),
            Some(CONTROL_TAG) => Envelope::Control(term),
            _ => Envelope::Info(term),
        }
    }

    fn classify_call(term: Term) -> Self {
        if let Term::Tuple(mut elements) = term {
            if elements.len() == 3 {
                if let Some(from) = Caller::from_term(&elements[1]) {
                    let request = elements.swap_remove(2);
                    return Envelope::Call { from, request };
                }
            }
            return Envelope::Info(Term::Tuple(elements));
        }
        Envelope::Info(term)
    }

    fn classify_cast(term: Term) -> Self {
        match term {
            Term::Tuple(mut elements) if elements.len() == 2 => {
                Envelope::Cast(elements.swap_remove(1))
            }
            other => Envelope::Info(other),
        }
    }

    /// Builds the wire term of the envelope.
    pub fn into_term(self) -> Term {
        match self {
            Envelope::Call { from, request } => Term::tuple(vec![
                Term::atom(CALL_TAG),
                from.to_term(),
                request,
            ]),
            Envelope::Cast(request) => {
                Term::tuple(vec![Term::atom(CAST_TAG), request])
            }
            Envelope::Control(term) | Envelope::Info(term) => term,
        }
    }
}

/// Builds the `{Ref, Reply}` term answering a call.
pub fn reply_term(reference: &Reference, reply: Term) -> Term {
    Term::tuple(vec![Term::Ref(reference.clone()), reply])
}

/// Builds a control term carrying `payload`.
pub fn control_term(payload: Term) -> Term {
    Term::tuple(vec![Term::atom(CONTROL_TAG), payload])
}

#[cfg(test)]
mod tests {

    use super::*;
    use crate::Atom;

    fn pid() -> Pid {
        Pid {
            node: Atom::from("demo"),
            id: 1,
            serial: 0,
            creation: 1,
        }
    }

    fn reference() -> Reference {
        Reference::from_nanos(Atom::from("demo"), 1, 99)
    }

    #[test]
    fn test_classify_call() {
        let term = Term::tuple(vec![
            Term::atom(CALL_TAG),
            Term::tuple(vec![Term::Pid(pid()), Term::Ref(reference())]),
            Term::from("ping"),
        ]);
        assert_eq!(
            Envelope::classify(term),
            Envelope::Call {
                from: Caller {
                    pid: pid(),
                    reference: reference(),
                },
                request: Term::from("ping"),
            }
        );
    }

    #[test]
    fn test_call_round_trips_through_term() {
        let envelope = Envelope::Call {
            from: Caller {
                pid: pid(),
                reference: reference(),
            },
            request: Term::Integer(5),
        };
        assert_eq!(Envelope::classify(envelope.clone().into_term()), envelope);
    }

    #[test]
    fn test_classify_cast() {
        let term = Term::tuple(vec![Term::atom(CAST_TAG), Term::from("log-me")]);
        assert_eq!(
            Envelope::classify(term),
            Envelope::Cast(Term::from("log-me"))
        );
    }

    #[test]
    fn test_classify_control() {
        let term = control_term(Term::atom("stop"));
        assert_eq!(Envelope::classify(term.clone()), Envelope::Control(term));
    }

    #[test]
    fn test_malformed_envelopes_are_info() {
        let malformed = vec![
            // Reference-less call.
            Term::tuple(vec![Term::atom(CALL_TAG), Term::from("ping")]),
            // Sender descriptor is not a tuple.
            Term::tuple(vec![
                Term::atom(CALL_TAG),
                Term::Pid(pid()),
                Term::from("ping"),
            ]),
            // Sender descriptor with the elements swapped.
            Term::tuple(vec![
                Term::atom(CALL_TAG),
                Term::tuple(vec![Term::Ref(reference()), Term::Pid(pid())]),
                Term::from("ping"),
            ]),
            // Call with an extra element.
            Term::tuple(vec![
                Term::atom(CALL_TAG),
                Term::tuple(vec![Term::Pid(pid()), Term::Ref(reference())]),
                Term::from("ping"),
                Term::Nil,
            ]),
            // Cast without a body.
            Term::tuple(vec![Term::atom(CAST_TAG)]),
            // Cast with two bodies.
            Term::tuple(vec![Term::atom(CAST_TAG), Term::Nil, Term::Nil]),
            // Tag as a string rather than an atom.
            Term::tuple(vec![Term::from(CAST_TAG), Term::Nil]),
            Term::tuple(vec![]),
            Term::atom("hello"),
            Term::List(vec![Term::atom(CAST_TAG), Term::Nil]),
        ];
        for term in malformed {
            assert_eq!(Envelope::classify(term.clone()), Envelope::Info(term));
        }
    }

    #[test]
    fn test_reply_term() {
        assert_eq!(
            reply_term(&reference(), Term::from("pong")),
            Term::tuple(vec![Term::Ref(reference()), Term::from("pong")])
        );
    }
}
