//! Overloaded-operator table.
//!
//! For each C++ operator: its surface spelling, whether it must be a
//! member, and the allowed parameter counts in member and non-member form.
//! The typing checker validates declared `operator` functions against this
//! table.

/// Identifies one overloadable operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpId {
    New,
    NewArray,
    Delete,
    DeleteArray,
    Call,       // ()
    Subscript,  // []
    Arrow,      // ->
    ArrowStar,  // ->*
    PlusPlus,   // ++ (prefix or postfix)
    MinusMinus, // --
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Caret,
    Amp,
    Pipe,
    Tilde,
    Exclam,
    Assign,
    Less,
    Greater,
    PlusAssign,
    MinusAssign,
    StarAssign,
    SlashAssign,
    PercentAssign,
    CaretAssign,
    AmpAssign,
    PipeAssign,
    ShiftLeft,
    ShiftRight,
    ShiftLeftAssign,
    ShiftRightAssign,
    EqualEqual,
    NotEqual,
    LessEqual,
    GreaterEqual,
    Spaceship, // <=>
    AmpAmp,
    PipePipe,
    Comma,
}

/// Where an operator may be declared.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpPlace {
    MemberOnly,
    NonMemberOnly,
    Either,
}

/// No practical upper bound on parameters.
pub const PARAMS_UNLIMITED: u8 = u8::MAX;

#[derive(Debug, Clone, Copy)]
pub struct OpInfo {
    pub id: OpId,
    pub literal: &'static str,
    pub place: OpPlace,
    /// Inclusive parameter-count range when declared as a member.
    pub member_params: (u8, u8),
    /// Inclusive parameter-count range when declared at namespace scope.
    pub nonmember_params: (u8, u8),
}

const fn op(
    id: OpId,
    literal: &'static str,
    place: OpPlace,
    member_params: (u8, u8),
    nonmember_params: (u8, u8),
) -> OpInfo {
    OpInfo {
        id,
        literal,
        place,
        member_params,
        nonmember_params,
    }
}

use OpPlace::{Either, MemberOnly};

/// Longest literals first so `lookup` can match greedily (`<<=` before
/// `<<` before `<`).
pub static OPERATORS: &[OpInfo] = &[
    op(OpId::NewArray, "new[]", Either, (1, PARAMS_UNLIMITED), (1, PARAMS_UNLIMITED)),
    op(OpId::DeleteArray, "delete[]", Either, (1, PARAMS_UNLIMITED), (1, PARAMS_UNLIMITED)),
    op(OpId::New, "new", Either, (1, PARAMS_UNLIMITED), (1, PARAMS_UNLIMITED)),
    op(OpId::Delete, "delete", Either, (1, PARAMS_UNLIMITED), (1, PARAMS_UNLIMITED)),
    op(OpId::ShiftLeftAssign, "<<=", Either, (1, 1), (2, 2)),
    op(OpId::ShiftRightAssign, ">>=", Either, (1, 1), (2, 2)),
    op(OpId::Spaceship, "<=>", Either, (1, 1), (2, 2)),
    op(OpId::ArrowStar, "->*", Either, (1, 1), (2, 2)),
    op(OpId::ShiftLeft, "<<", Either, (1, 1), (2, 2)),
    op(OpId::ShiftRight, ">>", Either, (1, 1), (2, 2)),
    op(OpId::EqualEqual, "==", Either, (1, 1), (2, 2)),
    op(OpId::NotEqual, "!=", Either, (1, 1), (2, 2)),
    op(OpId::LessEqual, "<=", Either, (1, 1), (2, 2)),
    op(OpId::GreaterEqual, ">=", Either, (1, 1), (2, 2)),
    op(OpId::PlusAssign, "+=", Either, (1, 1), (2, 2)),
    op(OpId::MinusAssign, "-=", Either, (1, 1), (2, 2)),
    op(OpId::StarAssign, "*=", Either, (1, 1), (2, 2)),
    op(OpId::SlashAssign, "/=", Either, (1, 1), (2, 2)),
    op(OpId::PercentAssign, "%=", Either, (1, 1), (2, 2)),
    op(OpId::CaretAssign, "^=", Either, (1, 1), (2, 2)),
    op(OpId::AmpAssign, "&=", Either, (1, 1), (2, 2)),
    op(OpId::PipeAssign, "|=", Either, (1, 1), (2, 2)),
    op(OpId::PlusPlus, "++", Either, (0, 1), (1, 2)),
    op(OpId::MinusMinus, "--", Either, (0, 1), (1, 2)),
    op(OpId::AmpAmp, "&&", Either, (1, 1), (2, 2)),
    op(OpId::PipePipe, "||", Either, (1, 1), (2, 2)),
    op(OpId::Arrow, "->", MemberOnly, (0, 0), (0, 0)),
    op(OpId::Call, "()", MemberOnly, (0, PARAMS_UNLIMITED), (0, PARAMS_UNLIMITED)),
    op(OpId::Subscript, "[]", MemberOnly, (1, 1), (1, 1)),
    op(OpId::Plus, "+", Either, (0, 1), (1, 2)),
    op(OpId::Minus, "-", Either, (0, 1), (1, 2)),
    op(OpId::Star, "*", Either, (0, 1), (1, 2)),
    op(OpId::Slash, "/", Either, (1, 1), (2, 2)),
    op(OpId::Percent, "%", Either, (1, 1), (2, 2)),
    op(OpId::Caret, "^", Either, (1, 1), (2, 2)),
    op(OpId::Amp, "&", Either, (0, 1), (1, 2)),
    op(OpId::Pipe, "|", Either, (1, 1), (2, 2)),
    op(OpId::Tilde, "~", Either, (0, 0), (1, 1)),
    op(OpId::Exclam, "!", Either, (0, 0), (1, 1)),
    op(OpId::Assign, "=", MemberOnly, (1, 1), (1, 1)),
    op(OpId::Less, "<", Either, (1, 1), (2, 2)),
    op(OpId::Greater, ">", Either, (1, 1), (2, 2)),
    op(OpId::Comma, ",", Either, (1, 1), (2, 2)),
];

pub fn info(id: OpId) -> &'static OpInfo {
    OPERATORS
        .iter()
        .find(|o| o.id == id)
        .expect("every OpId has a table row")
}

/// Looks up an operator by its surface spelling.
pub fn lookup(literal: &str) -> Option<&'static OpInfo> {
    OPERATORS.iter().find(|o| o.literal == literal)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_spellings() {
        assert_eq!(lookup("<<").unwrap().id, OpId::ShiftLeft);
        assert_eq!(lookup("<<=").unwrap().id, OpId::ShiftLeftAssign);
        assert_eq!(lookup("new[]").unwrap().id, OpId::NewArray);
        assert!(lookup("?:").is_none());
    }

    #[test]
    fn test_member_unary_minus_range() {
        let minus = info(OpId::Minus);
        assert_eq!(minus.member_params, (0, 1));
        assert_eq!(minus.nonmember_params, (1, 2));
    }

    #[test]
    fn test_arrow_member_only() {
        let arrow = info(OpId::Arrow);
        assert_eq!(arrow.place, OpPlace::MemberOnly);
        assert_eq!(arrow.member_params, (0, 0));
    }

    #[test]
    fn test_every_id_has_info() {
        // info() panics if a row is missing; touch a few spread-out ids.
        for id in [OpId::New, OpId::Spaceship, OpId::Comma, OpId::Call] {
            let _ = info(id);
        }
    }
}
