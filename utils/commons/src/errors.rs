use super::*;

/// The custom errors the auction contracts can produce.
#[derive(Serialize, Debug, PartialEq, Eq, Reject, SchemaType)]
pub enum CustomContractError {
    /// Failed parsing the parameter (Error code: -1).
    #[from(ParseError)]
    ParseParams,
    /// Failed logging: Log is full (Error code: -2).
    LogFull,
    /// Failed logging: Log is malformed (Error code: -3).
    LogMalformed,
    /// Failed to invoke a contract (Error code: -4).
    InvokeContractError,
    /// Invoked contract does not look like a CIS-2 ledger (Error code: -5).
    Incompatible,
    /// This function must only be called by a contract (Error code: -6).
    ContractOnly,
    /// Only account addresses can create auctions, bid or withdraw (Error code: -7).
    OnlyAccountAddress,
    /// No auction with the given id exists (Error code: -8).
    UnknownAuction,
    /// Auction duration must be positive and the end time representable (Error code: -9).
    InvalidDuration,
    /// Raised if a bid arrives at or after the bidding end time (Error code: -10).
    BiddingEnded,
    /// Raised if a bid is not strictly greater than the highest bid (Error code: -11).
    BidTooLow,
    /// Raised on an attempt to end the auction before its expiry (Error code: -12).
    AuctionStillActive,
    /// Raised if the auction has already been ended (Error code: -13).
    AuctionAlreadyEnded,
    /// Raised on an attempt to withdraw from an auction that was not ended (Error code: -14).
    AuctionDidNotEnd,
    /// Raised if there is no escrowed bid to withdraw (Error code: -15).
    NoFundsToWithdraw,
    /// A token transfer into custody that the registry did not initiate (Error code: -16).
    UnexpectedTransfer,
    /// Counter or amount arithmetic overflowed (Error code: -17).
    Overflow,
    /// The payment token can not be auctioned (Error code: -18).
    LotIsPaymentToken,
}

/// Mapping the logging errors to CustomContractError.
impl From<LogError> for CustomContractError {
    fn from(le: LogError) -> Self {
        match le {
            LogError::Full => Self::LogFull,
            LogError::Malformed => Self::LogMalformed,
        }
    }
}

/// Mapping errors related to contract invocations to CustomContractError.
impl<T> From<CallContractError<T>> for CustomContractError {
    fn from(_cce: CallContractError<T>) -> Self {
        Self::InvokeContractError
    }
}

/// Failure of a read-only ledger query.
#[derive(Debug)]
pub enum ContractReadError<R> {
    /// The invocation itself failed.
    Call(CallContractError<R>),
    /// The ledger returned no value.
    Compatibility,
    /// The returned value could not be parsed.
    Parse,
}
