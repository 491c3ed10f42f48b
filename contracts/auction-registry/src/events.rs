use commons::{
    AuctionId, ContractTokenAmount, ContractTokenId, AUCTION_CREATED_TAG, AUCTION_ENDED_TAG,
    BID_PLACED_TAG, ESCROW_WITHDRAWN_TAG,
};
use concordium_std::*;

/// Auction creation event data.
#[derive(Debug, Serial)]
pub struct AuctionCreatedEvent<'a> {
    pub auction_id: AuctionId,
    /// NFT contract address.
    pub contract: &'a ContractAddress,
    /// NFT token identifier.
    pub id: &'a ContractTokenId,
    pub bidding_end_time: Timestamp,
}

/// Bid event data.
#[derive(Debug, Serial)]
pub struct BidPlacedEvent<'a> {
    pub auction_id: AuctionId,
    /// Bidder account address.
    pub bidder: &'a AccountAddress,
    /// Bid amount.
    pub amount: ContractTokenAmount,
}

/// Auction settlement event data.
#[derive(Debug, Serial)]
pub struct AuctionEndedEvent {
    pub auction_id: AuctionId,
    /// `None` if the auction ended without bids.
    pub winner: Option<AccountAddress>,
    /// Winning bid, zero without a winner.
    pub amount: ContractTokenAmount,
}

#[derive(Debug, Serial)]
pub struct EscrowWithdrawnEvent<'a> {
    pub auction_id: AuctionId,
    pub bidder: &'a AccountAddress,
    pub amount: ContractTokenAmount,
}

/// Tagged Custom event to be serialized for the event log.
#[derive(Debug)]
pub enum RegistryEvents<'a> {
    AuctionCreated(AuctionCreatedEvent<'a>),
    BidPlaced(BidPlacedEvent<'a>),
    AuctionEnded(AuctionEndedEvent),
    EscrowWithdrawn(EscrowWithdrawnEvent<'a>),
}

impl<'a> RegistryEvents<'a> {
    pub fn auction_created(
        auction_id: AuctionId,
        contract: &'a ContractAddress,
        id: &'a ContractTokenId,
        bidding_end_time: Timestamp,
    ) -> Self {
        Self::AuctionCreated(AuctionCreatedEvent {
            auction_id,
            contract,
            id,
            bidding_end_time,
        })
    }

    pub fn bid_placed(
        auction_id: AuctionId,
        bidder: &'a AccountAddress,
        amount: ContractTokenAmount,
    ) -> Self {
        Self::BidPlaced(BidPlacedEvent {
            auction_id,
            bidder,
            amount,
        })
    }

    pub fn auction_ended(
        auction_id: AuctionId,
        winner: Option<AccountAddress>,
        amount: ContractTokenAmount,
    ) -> Self {
        Self::AuctionEnded(AuctionEndedEvent {
            auction_id,
            winner,
            amount,
        })
    }

    pub fn escrow_withdrawn(
        auction_id: AuctionId,
        bidder: &'a AccountAddress,
        amount: ContractTokenAmount,
    ) -> Self {
        Self::EscrowWithdrawn(EscrowWithdrawnEvent {
            auction_id,
            bidder,
            amount,
        })
    }
}

impl<'a> Serial for RegistryEvents<'a> {
    fn serial<W: Write>(&self, out: &mut W) -> Result<(), W::Err> {
        match self {
            RegistryEvents::AuctionCreated(event) => {
                out.write_u8(AUCTION_CREATED_TAG)?;
                event.serial(out)
            }
            RegistryEvents::BidPlaced(event) => {
                out.write_u8(BID_PLACED_TAG)?;
                event.serial(out)
            }
            RegistryEvents::AuctionEnded(event) => {
                out.write_u8(AUCTION_ENDED_TAG)?;
                event.serial(out)
            }
            RegistryEvents::EscrowWithdrawn(event) => {
                out.write_u8(ESCROW_WITHDRAWN_TAG)?;
                event.serial(out)
            }
        }
    }
}
