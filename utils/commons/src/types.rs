use super::*;

/// Sequential auction identifier. The first auction gets id 1.
pub type AuctionId = u64;

/// Contract token ID type, shared by lots and the payment token.
pub type ContractTokenId = TokenIdVec;

/// Contract token amount type.
pub type ContractTokenAmount = TokenAmountU64;

pub type TransferParameter = TransferParams<ContractTokenId, ContractTokenAmount>;

/// Parameter type for the CIS-2 function `balanceOf` specialized to the subset
/// of TokenIDs used by the auction contracts.
pub type ContractBalanceOfQueryParams = BalanceOfQueryParams<ContractTokenId>;

/// Response type for the CIS-2 function `balanceOf` specialized to the subset
/// of TokenAmounts used by the auction contracts.
pub type ContractBalanceOfQueryResponse = BalanceOfQueryResponse<ContractTokenAmount>;

/// Parameter of the `onReceivingCIS2` hook.
pub type ContractOnReceivingParams = OnReceivingCis2Params<ContractTokenId, ContractTokenAmount>;
