/// Tag for the AuctionCreated event.
pub const AUCTION_CREATED_TAG: u8 = u8::MAX - 8;

/// Tag for the BidPlaced event.
pub const BID_PLACED_TAG: u8 = u8::MAX - 11;

/// Tag for the AuctionEnded event.
pub const AUCTION_ENDED_TAG: u8 = u8::MAX - 12;

/// Tag for the EscrowWithdrawn event.
pub const ESCROW_WITHDRAWN_TAG: u8 = u8::MAX - 23;

/// Entrypoint every CIS-2 token contract exposes for transfers.
pub const TRANSFER_ENTRYPOINT: &str = "transfer";

/// Entrypoint every CIS-2 token contract exposes for balance queries.
pub const BALANCE_OF_ENTRYPOINT: &str = "balanceOf";

/// Hook a CIS-2 contract calls on a receiving contract.
pub const ON_RECEIVING_CIS2_ENTRYPOINT: &str = "onReceivingCIS2";
