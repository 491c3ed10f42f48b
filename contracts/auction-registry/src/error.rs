use commons::{AuctionId, ContractTokenAmount, CustomContractError};
use concordium_std::*;

/// Rejections of the auction state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuctionError {
    UnknownAuction(AuctionId),
    /// Duration is zero or the end time would overflow.
    InvalidDuration,
    /// The lot is the token bids are paid in.
    LotIsPaymentToken,
    /// Bid arrived at or after the contained bidding end time.
    BiddingEnded(Timestamp),
    /// The contained bid does not exceed the current highest bid.
    BidTooLow(ContractTokenAmount),
    /// Auction can not be ended before the contained bidding end time.
    AuctionStillActive(Timestamp),
    AuctionAlreadyEnded,
    AuctionDidNotEnd,
    NoFundsToWithdraw,
    Overflow,
}

impl From<AuctionError> for CustomContractError {
    fn from(error: AuctionError) -> Self {
        match error {
            AuctionError::UnknownAuction(_) => Self::UnknownAuction,
            AuctionError::InvalidDuration => Self::InvalidDuration,
            AuctionError::LotIsPaymentToken => Self::LotIsPaymentToken,
            AuctionError::BiddingEnded(_) => Self::BiddingEnded,
            AuctionError::BidTooLow(_) => Self::BidTooLow,
            AuctionError::AuctionStillActive(_) => Self::AuctionStillActive,
            AuctionError::AuctionAlreadyEnded => Self::AuctionAlreadyEnded,
            AuctionError::AuctionDidNotEnd => Self::AuctionDidNotEnd,
            AuctionError::NoFundsToWithdraw => Self::NoFundsToWithdraw,
            AuctionError::Overflow => Self::Overflow,
        }
    }
}
