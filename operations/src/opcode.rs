//! One-byte operation tags.

use agora_types::FeeSchedule;

/// The leading byte of every operation payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Opcode {
    RegisterDelegate = 0xc0,
    VoteDelegates = 0xc1,
    RevokeDelegates = 0xc2,
    RegisterCommittee = 0xc3,
    VoteCommittee = 0xc4,
    RevokeCommittee = 0xc5,
    SubmitBill = 0xc6,
    VoteBill = 0xc7,
    RegisterName = 0xc8,
    CreateToken = 0xd0,
    TransferToken = 0xd1,
    LockToken = 0xd2,
}

impl Opcode {
    pub const ALL: [Opcode; 12] = [
        Self::RegisterDelegate,
        Self::VoteDelegates,
        Self::RevokeDelegates,
        Self::RegisterCommittee,
        Self::VoteCommittee,
        Self::RevokeCommittee,
        Self::SubmitBill,
        Self::VoteBill,
        Self::RegisterName,
        Self::CreateToken,
        Self::TransferToken,
        Self::LockToken,
    ];

    pub fn from_u8(byte: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|op| *op as u8 == byte)
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::RegisterDelegate => "register_delegate",
            Self::VoteDelegates => "vote_delegates",
            Self::RevokeDelegates => "revoke_delegates",
            Self::RegisterCommittee => "register_committee",
            Self::VoteCommittee => "vote_committee",
            Self::RevokeCommittee => "revoke_committee",
            Self::SubmitBill => "submit_bill",
            Self::VoteBill => "vote_bill",
            Self::RegisterName => "register_name",
            Self::CreateToken => "create_token",
            Self::TransferToken => "transfer_token",
            Self::LockToken => "lock_token",
        }
    }

    pub fn min_fee(self, fees: &FeeSchedule) -> u64 {
        match self {
            Self::RegisterDelegate => fees.register_delegate,
            Self::VoteDelegates => fees.vote_delegate,
            Self::RevokeDelegates => fees.revoke_delegate,
            Self::RegisterCommittee => fees.register_committee,
            Self::RegisterName => fees.register_name,
            Self::VoteCommittee | Self::RevokeCommittee => fees.vote_committee,
            Self::SubmitBill => fees.submit_bill,
            Self::VoteBill => fees.vote_bill,
            Self::CreateToken => fees.create_token,
            Self::TransferToken => fees.send_token,
            Self::LockToken => fees.lock_token,
        }
    }
}
