use commons::{AuctionId, ContractTokenAmount, Token};
use concordium_std::*;

#[derive(Debug, Clone, Serialize, SchemaType)]
pub struct InitParams {
    /// Registry owner. Recorded for off-chain tooling, grants no rights over auctions.
    pub owner: AccountAddress,
    /// CIS-2 token bids are denominated in. Fixed for the lifetime of the registry.
    pub payment_token: Token,
}

#[derive(Debug, Clone, Serialize, SchemaType)]
pub struct CreateAuctionParams {
    /// NFT to auction. The sender must own it and have added the registry as its operator.
    pub lot: Token,
    /// Bidding period, counted from the creation slot time.
    pub duration: Duration,
}

#[derive(Debug, Clone, Copy, Serialize, SchemaType)]
pub struct PlaceBidParams {
    pub auction_id: AuctionId,
    /// New bid. Must exceed the highest bid; the sender must have added the registry as operator
    /// on the payment token.
    pub amount: ContractTokenAmount,
}

/// Escrow ledger key.
#[derive(Debug, Clone, Copy, Serialize, SchemaType, PartialEq, Eq)]
pub struct EscrowKey {
    pub bidder: AccountAddress,
    pub auction_id: AuctionId,
}

#[derive(Debug, Clone, Serialize, SchemaType, PartialEq, Eq)]
pub struct RegistryView {
    pub owner: AccountAddress,
    pub payment_token: Token,
    /// Number of auctions created so far, equal to the latest auction id.
    pub auction_counter: u64,
}

#[derive(Debug, Clone, Serialize, SchemaType, PartialEq, Eq)]
pub struct AuctionView {
    pub id: AuctionId,
    pub lot: Token,
    pub bidding_end_time: Timestamp,
    /// `None` until the first bid.
    pub highest_bidder: Option<AccountAddress>,
    /// Zero until the first bid.
    pub highest_bid: ContractTokenAmount,
    pub ended: bool,
    pub creator: AccountAddress,
}

/// Custody as reported by the ledgers themselves.
#[derive(Debug, Clone, Serialize, SchemaType, PartialEq, Eq)]
pub struct CustodyView {
    /// Whether the registry holds the lot of the auction.
    pub lot_in_custody: bool,
    /// Payment token balance of the registry across all auctions.
    pub escrow_balance: ContractTokenAmount,
}
