use commons::{AuctionId, ContractTokenAmount, Token};
use concordium_std::*;

use crate::error::AuctionError;
use crate::external::{AuctionView, EscrowKey, RegistryView};

/// Current leader of an auction.
#[derive(Debug, Clone, Copy, Serialize, SchemaType, PartialEq, Eq)]
pub struct HighestBid {
    pub bidder: AccountAddress,
    pub amount: ContractTokenAmount,
}

#[derive(Debug, Clone, Serialize, SchemaType, PartialEq, Eq)]
pub struct Auction {
    /// Escrowed NFT.
    pub lot: Token,
    /// No bids are accepted from this time on. Never changes after creation.
    pub bidding_end_time: Timestamp,
    /// Leading bid, `None` before the first bid.
    pub highest_bid: Option<HighestBid>,
    /// Set exactly once, by a successful settlement.
    pub ended: bool,
    /// Seller. Receives the proceeds, or the lot back if nobody bid.
    pub creator: AccountAddress,
}

impl Auction {
    pub fn highest_bidder(&self) -> Option<AccountAddress> {
        self.highest_bid.map(|bid| bid.bidder)
    }

    /// Highest bid amount, zero before the first bid.
    pub fn highest_amount(&self) -> ContractTokenAmount {
        self.highest_bid
            .map(|bid| bid.amount)
            .unwrap_or_else(|| ContractTokenAmount::from(0))
    }

    pub fn view(&self, id: AuctionId) -> AuctionView {
        AuctionView {
            id,
            lot: self.lot.clone(),
            bidding_end_time: self.bidding_end_time,
            highest_bidder: self.highest_bidder(),
            highest_bid: self.highest_amount(),
            ended: self.ended,
            creator: self.creator,
        }
    }
}

/// Transfers that settle an ended auction. Must be executed by the caller.
#[must_use]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Settlement {
    /// Lot goes to the winner, the winning bid to the creator.
    Sold {
        lot: Token,
        creator: AccountAddress,
        winner: AccountAddress,
        price: ContractTokenAmount,
    },
    /// No bids were placed, the lot goes back to the creator.
    Unsold { lot: Token, creator: AccountAddress },
}

/// Transfer into custody the registry is about to pull. The receive hook accepts this transfer
/// and nothing else.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Receipt {
    pub auction_id: AuctionId,
    pub token: Token,
    pub from: AccountAddress,
    pub amount: ContractTokenAmount,
}

/// The contract state.
#[derive(Serial, DeserialWithState, StateClone)]
#[concordium(state_parameter = "S")]
pub struct State<S: HasStateApi> {
    /// Registry owner.
    pub owner: AccountAddress,
    /// Token every bid is paid in.
    pub payment_token: Token,
    /// Id of the latest auction, 0 if none was created.
    pub auction_counter: AuctionId,
    /// All auctions ever created. Records are never removed.
    pub auctions: StateMap<AuctionId, Auction, S>,
    /// Payment tokens held for each bidder on each auction.
    pub escrow: StateMap<EscrowKey, ContractTokenAmount, S>,
    /// Set only while a pull into custody is in flight.
    pub pending_receipt: Option<Receipt>,
}

impl<S: HasStateApi> State<S> {
    /// Create a new state with no auctions.
    pub fn new(
        state_builder: &mut StateBuilder<S>,
        owner: AccountAddress,
        payment_token: Token,
    ) -> Self {
        State {
            owner,
            payment_token,
            auction_counter: 0,
            auctions: state_builder.new_map(),
            escrow: state_builder.new_map(),
            pending_receipt: None,
        }
    }

    /// Record a new auction for `lot` and return its id and bidding end time. The lot itself has
    /// to be moved into custody by the caller.
    pub fn create_auction(
        &mut self,
        lot: Token,
        creator: AccountAddress,
        slot_time: Timestamp,
        duration: Duration,
    ) -> Result<(AuctionId, Timestamp), AuctionError> {
        ensure!(duration.millis() > 0, AuctionError::InvalidDuration);
        ensure!(lot != self.payment_token, AuctionError::LotIsPaymentToken);
        let bidding_end_time = slot_time
            .checked_add(duration)
            .ok_or(AuctionError::InvalidDuration)?;

        let id = self
            .auction_counter
            .checked_add(1)
            .ok_or(AuctionError::Overflow)?;
        self.auction_counter = id;

        self.auctions.insert(
            id,
            Auction {
                lot,
                bidding_end_time,
                highest_bid: None,
                ended: false,
                creator,
            },
        );

        Ok((id, bidding_end_time))
    }

    /// Admit a bid and record it as the bidder's escrow. Returns the amount that still has to be
    /// pulled from the bidder: a bidder raising their own earlier bid only pays the difference.
    pub fn place_bid(
        &mut self,
        auction_id: AuctionId,
        bidder: AccountAddress,
        amount: ContractTokenAmount,
        slot_time: Timestamp,
    ) -> Result<ContractTokenAmount, AuctionError> {
        let mut auction = self
            .auctions
            .get_mut(&auction_id)
            .ok_or(AuctionError::UnknownAuction(auction_id))?;

        ensure!(
            slot_time < auction.bidding_end_time,
            AuctionError::BiddingEnded(auction.bidding_end_time)
        );
        // Settlement requires expiry, so this only guards against clock skew in callers
        ensure!(!auction.ended, AuctionError::AuctionAlreadyEnded);
        ensure!(
            amount.0 > auction.highest_amount().0,
            AuctionError::BidTooLow(amount)
        );

        let key = EscrowKey {
            bidder,
            auction_id,
        };
        let held = self
            .escrow
            .get(&key)
            .map(|held| *held)
            .unwrap_or_else(|| ContractTokenAmount::from(0));
        // Own earlier bids were highest when placed, so they never exceed the new one
        let top_up = amount
            .0
            .checked_sub(held.0)
            .ok_or(AuctionError::Overflow)?;

        self.escrow.insert(key, amount);
        auction.highest_bid = Some(HighestBid { bidder, amount });

        Ok(ContractTokenAmount::from(top_up))
    }

    /// Mark the auction as ended and release the winner's escrow to the settlement.
    pub fn end_auction(
        &mut self,
        auction_id: AuctionId,
        slot_time: Timestamp,
    ) -> Result<Settlement, AuctionError> {
        let mut auction = self
            .auctions
            .get_mut(&auction_id)
            .ok_or(AuctionError::UnknownAuction(auction_id))?;

        ensure!(!auction.ended, AuctionError::AuctionAlreadyEnded);
        ensure!(
            slot_time >= auction.bidding_end_time,
            AuctionError::AuctionStillActive(auction.bidding_end_time)
        );

        auction.ended = true;

        let settlement = match auction.highest_bid {
            Some(HighestBid { bidder, amount }) => {
                // The winning escrow is paid out to the creator, it must never be withdrawn
                self.escrow.remove(&EscrowKey {
                    bidder,
                    auction_id,
                });
                Settlement::Sold {
                    lot: auction.lot.clone(),
                    creator: auction.creator,
                    winner: bidder,
                    price: amount,
                }
            }
            None => Settlement::Unsold {
                lot: auction.lot.clone(),
                creator: auction.creator,
            },
        };

        Ok(settlement)
    }

    /// Release the escrow of a non-winning bidder. Returns the amount to pay back.
    pub fn withdraw(
        &mut self,
        auction_id: AuctionId,
        bidder: AccountAddress,
    ) -> Result<ContractTokenAmount, AuctionError> {
        let auction = self
            .auctions
            .get(&auction_id)
            .ok_or(AuctionError::UnknownAuction(auction_id))?;
        ensure!(auction.ended, AuctionError::AuctionDidNotEnd);

        self.escrow
            .remove_and_get(&EscrowKey {
                bidder,
                auction_id,
            })
            .filter(|amount| amount.0 > 0)
            .ok_or(AuctionError::NoFundsToWithdraw)
    }

    pub fn expect_receipt(&mut self, receipt: Receipt) {
        self.pending_receipt = Some(receipt);
    }

    pub fn clear_receipt(&mut self) {
        self.pending_receipt = None;
    }

    /// Whether `receipt` is exactly the pull currently in flight.
    pub fn is_expected(&self, receipt: &Receipt) -> bool {
        self.pending_receipt.as_ref() == Some(receipt)
    }

    pub fn auction(&self, auction_id: AuctionId) -> Option<Auction> {
        self.auctions
            .get(&auction_id)
            .map(|auction| Auction::clone(&auction))
    }

    pub fn escrowed(&self, key: &EscrowKey) -> ContractTokenAmount {
        self.escrow
            .get(key)
            .map(|amount| *amount)
            .unwrap_or_else(|| ContractTokenAmount::from(0))
    }

    pub fn view(&self) -> RegistryView {
        RegistryView {
            owner: self.owner,
            payment_token: self.payment_token.clone(),
            auction_counter: self.auction_counter,
        }
    }
}

#[concordium_cfg_test]
mod tests {
    use super::*;
    use concordium_cis2::TokenIdVec;
    use concordium_std::test_infrastructure::*;

    const OWNER: AccountAddress = AccountAddress([0; 32]);
    const CARL: AccountAddress = AccountAddress([1; 32]);
    const ALICE: AccountAddress = AccountAddress([2; 32]);
    const BOB: AccountAddress = AccountAddress([3; 32]);

    const START: u64 = 1_000_000;
    const TEN_MINUTES: u64 = 10 * 60 * 1000;

    fn payment_token() -> Token {
        Token {
            contract: ContractAddress {
                index: 1,
                subindex: 0,
            },
            id: TokenIdVec(vec![]),
        }
    }

    fn lot(id: u8) -> Token {
        Token {
            contract: ContractAddress {
                index: 2,
                subindex: 0,
            },
            id: TokenIdVec(vec![id]),
        }
    }

    fn at(millis: u64) -> Timestamp {
        Timestamp::from_timestamp_millis(millis)
    }

    fn usdc(amount: u64) -> ContractTokenAmount {
        ContractTokenAmount::from(amount)
    }

    fn new_state() -> State<TestStateApi> {
        let mut state_builder = TestStateBuilder::new();
        State::new(&mut state_builder, OWNER, payment_token())
    }

    /// State with a single ten minute auction by Carl, id 1.
    fn state_with_auction() -> State<TestStateApi> {
        let mut state = new_state();
        let (id, _) = state
            .create_auction(
                lot(0),
                CARL,
                at(START),
                Duration::from_millis(TEN_MINUTES),
            )
            .expect_report("Auction creation should pass");
        claim_eq!(id, 1);
        state
    }

    fn escrow_of(state: &State<TestStateApi>, bidder: AccountAddress) -> ContractTokenAmount {
        state.escrowed(&EscrowKey {
            bidder,
            auction_id: 1,
        })
    }

    fn claim_consistent(auction: &Auction) {
        claim_eq!(
            auction.highest_amount().0 == 0,
            auction.highest_bidder().is_none()
        );
    }

    #[concordium_test]
    fn test_create_auction_records_lot() {
        let mut state = new_state();
        claim_eq!(state.auction_counter, 0);

        let id = state.create_auction(
            lot(0),
            CARL,
            at(START),
            Duration::from_millis(TEN_MINUTES),
        );
        claim_eq!(id, Ok((1, at(START + TEN_MINUTES))));
        claim_eq!(state.auction_counter, 1);

        let auction = state.auction(1).expect_report("Auction should exist");
        claim_eq!(auction.lot, lot(0));
        claim_eq!(auction.bidding_end_time, at(START + TEN_MINUTES));
        claim_eq!(auction.highest_bidder(), None);
        claim_eq!(auction.highest_amount(), usdc(0));
        claim!(!auction.ended);
        claim_eq!(auction.creator, CARL);
    }

    #[concordium_test]
    fn test_create_auction_ids_are_sequential() {
        let mut state = new_state();
        for expected in 1..=3u64 {
            let id = state.create_auction(
                lot(expected as u8),
                CARL,
                at(START),
                Duration::from_millis(TEN_MINUTES),
            );
            claim_eq!(id.map(|(id, _)| id), Ok(expected));
            claim_eq!(state.auction_counter, expected);
        }
        claim!(state.auction(0).is_none());
    }

    #[concordium_test]
    fn test_create_auction_zero_duration() {
        let mut state = new_state();
        let id = state.create_auction(lot(0), CARL, at(START), Duration::from_millis(0));
        claim_eq!(id, Err(AuctionError::InvalidDuration));
        claim_eq!(state.auction_counter, 0);
    }

    #[concordium_test]
    fn test_create_auction_lot_is_payment_token() {
        let mut state = new_state();
        let id = state.create_auction(
            payment_token(),
            CARL,
            at(START),
            Duration::from_millis(TEN_MINUTES),
        );
        claim_eq!(id, Err(AuctionError::LotIsPaymentToken));
        claim_eq!(state.auction_counter, 0);

        // Same contract, different token id is a valid lot
        let id = state.create_auction(
            Token {
                contract: payment_token().contract,
                id: TokenIdVec(vec![1]),
            },
            CARL,
            at(START),
            Duration::from_millis(TEN_MINUTES),
        );
        claim_eq!(id.map(|(id, _)| id), Ok(1));
    }

    #[concordium_test]
    fn test_pending_receipt() {
        let mut state = state_with_auction();
        let receipt = Receipt {
            auction_id: 1,
            token: payment_token(),
            from: ALICE,
            amount: usdc(10),
        };
        claim!(!state.is_expected(&receipt));

        state.expect_receipt(receipt.clone());
        claim!(state.is_expected(&receipt));
        claim!(!state.is_expected(&Receipt {
            amount: usdc(11),
            ..receipt.clone()
        }));
        claim!(!state.is_expected(&Receipt {
            from: BOB,
            ..receipt.clone()
        }));

        state.clear_receipt();
        claim!(!state.is_expected(&receipt));
    }

    #[concordium_test]
    fn test_place_bid_must_increase() {
        let mut state = state_with_auction();

        claim_eq!(
            state.place_bid(1, ALICE, usdc(0), at(START)),
            Err(AuctionError::BidTooLow(usdc(0)))
        );
        claim_eq!(
            state.place_bid(1, ALICE, usdc(10), at(START)),
            Ok(usdc(10))
        );
        claim_eq!(
            state.place_bid(1, BOB, usdc(5), at(START + 1)),
            Err(AuctionError::BidTooLow(usdc(5)))
        );
        claim_eq!(
            state.place_bid(1, BOB, usdc(10), at(START + 1)),
            Err(AuctionError::BidTooLow(usdc(10)))
        );

        let auction = state.auction(1).expect_report("Auction should exist");
        claim_eq!(auction.highest_bidder(), Some(ALICE));
        claim_eq!(auction.highest_amount(), usdc(10));
        claim_consistent(&auction);
        claim_eq!(escrow_of(&state, ALICE), usdc(10));
        claim_eq!(escrow_of(&state, BOB), usdc(0));
    }

    #[concordium_test]
    fn test_outbid_escrow_is_kept() {
        let mut state = state_with_auction();

        claim_eq!(
            state.place_bid(1, ALICE, usdc(10), at(START)),
            Ok(usdc(10))
        );
        claim_eq!(state.place_bid(1, BOB, usdc(20), at(START)), Ok(usdc(20)));

        // Alice is not refunded when outbid
        claim_eq!(escrow_of(&state, ALICE), usdc(10));
        claim_eq!(escrow_of(&state, BOB), usdc(20));
        let auction = state.auction(1).expect_report("Auction should exist");
        claim_eq!(auction.highest_bidder(), Some(BOB));
        claim_eq!(auction.highest_amount(), usdc(20));
    }

    #[concordium_test]
    fn test_rebid_tops_up_own_escrow() {
        let mut state = state_with_auction();

        claim_eq!(
            state.place_bid(1, ALICE, usdc(10), at(START)),
            Ok(usdc(10))
        );
        claim_eq!(state.place_bid(1, BOB, usdc(20), at(START)), Ok(usdc(20)));
        // Alice already has 10 in escrow, so a bid of 30 costs 20 more
        claim_eq!(
            state.place_bid(1, ALICE, usdc(30), at(START)),
            Ok(usdc(20))
        );

        claim_eq!(escrow_of(&state, ALICE), usdc(30));
        claim_eq!(escrow_of(&state, BOB), usdc(20));
    }

    #[concordium_test]
    fn test_place_bid_after_expiry() {
        let mut state = state_with_auction();
        let end = at(START + TEN_MINUTES);

        claim_eq!(
            state.place_bid(1, ALICE, usdc(10), end),
            Err(AuctionError::BiddingEnded(end))
        );
        claim_eq!(
            state.place_bid(1, ALICE, usdc(10), at(START + TEN_MINUTES + 1)),
            Err(AuctionError::BiddingEnded(end))
        );
        claim_eq!(
            state.place_bid(1, ALICE, usdc(10), at(START + TEN_MINUTES - 1)),
            Ok(usdc(10))
        );
    }

    #[concordium_test]
    fn test_unknown_auction() {
        let mut state = state_with_auction();

        claim_eq!(
            state.place_bid(2, ALICE, usdc(10), at(START)),
            Err(AuctionError::UnknownAuction(2))
        );
        claim_eq!(
            state.end_auction(2, at(START + TEN_MINUTES)),
            Err(AuctionError::UnknownAuction(2))
        );
        claim_eq!(
            state.withdraw(0, ALICE),
            Err(AuctionError::UnknownAuction(0))
        );
    }

    #[concordium_test]
    fn test_end_auction_before_expiry() {
        let mut state = state_with_auction();
        let end = at(START + TEN_MINUTES);

        claim_eq!(
            state.end_auction(1, at(START + TEN_MINUTES - 1)),
            Err(AuctionError::AuctionStillActive(end))
        );
        claim!(!state.auction(1).expect_report("Auction should exist").ended);
    }

    #[concordium_test]
    fn test_end_auction_exactly_once() {
        let mut state = state_with_auction();
        claim_eq!(
            state.place_bid(1, ALICE, usdc(10), at(START)),
            Ok(usdc(10))
        );

        let settlement = state.end_auction(1, at(START + 900_000));
        claim_eq!(
            settlement,
            Ok(Settlement::Sold {
                lot: lot(0),
                creator: CARL,
                winner: ALICE,
                price: usdc(10),
            })
        );
        claim!(state.auction(1).expect_report("Auction should exist").ended);

        claim_eq!(
            state.end_auction(1, at(START + 900_000)),
            Err(AuctionError::AuctionAlreadyEnded)
        );
        claim!(state.auction(1).expect_report("Auction should exist").ended);
    }

    #[concordium_test]
    fn test_end_auction_without_bids() {
        let mut state = state_with_auction();

        let settlement = state.end_auction(1, at(START + TEN_MINUTES));
        claim_eq!(
            settlement,
            Ok(Settlement::Unsold {
                lot: lot(0),
                creator: CARL,
            })
        );

        let auction = state.auction(1).expect_report("Auction should exist");
        claim!(auction.ended);
        claim_consistent(&auction);
    }

    #[concordium_test]
    fn test_withdraw_before_end() {
        let mut state = state_with_auction();
        claim_eq!(
            state.place_bid(1, ALICE, usdc(10), at(START)),
            Ok(usdc(10))
        );
        claim_eq!(state.place_bid(1, BOB, usdc(20), at(START)), Ok(usdc(20)));

        claim_eq!(
            state.withdraw(1, ALICE),
            Err(AuctionError::AuctionDidNotEnd)
        );
        claim_eq!(escrow_of(&state, ALICE), usdc(10));
    }

    #[concordium_test]
    fn test_withdraw_exactly_once() {
        let mut state = state_with_auction();
        claim_eq!(
            state.place_bid(1, ALICE, usdc(10), at(START)),
            Ok(usdc(10))
        );
        claim_eq!(state.place_bid(1, BOB, usdc(20), at(START)), Ok(usdc(20)));
        let _ = state.end_auction(1, at(START + TEN_MINUTES));

        claim_eq!(state.withdraw(1, ALICE), Ok(usdc(10)));
        claim_eq!(escrow_of(&state, ALICE), usdc(0));
        claim_eq!(
            state.withdraw(1, ALICE),
            Err(AuctionError::NoFundsToWithdraw)
        );
    }

    #[concordium_test]
    fn test_winner_can_not_withdraw() {
        let mut state = state_with_auction();
        claim_eq!(
            state.place_bid(1, ALICE, usdc(10), at(START)),
            Ok(usdc(10))
        );
        let _ = state.end_auction(1, at(START + TEN_MINUTES));

        claim_eq!(escrow_of(&state, ALICE), usdc(0));
        claim_eq!(
            state.withdraw(1, ALICE),
            Err(AuctionError::NoFundsToWithdraw)
        );
        // Bob never bid
        claim_eq!(
            state.withdraw(1, BOB),
            Err(AuctionError::NoFundsToWithdraw)
        );
    }

    #[concordium_test]
    fn test_escrow_is_per_auction() {
        let mut state = state_with_auction();
        let (second, _) = state
            .create_auction(
                lot(1),
                CARL,
                at(START),
                Duration::from_millis(TEN_MINUTES * 2),
            )
            .expect_report("Auction creation should pass");

        claim_eq!(
            state.place_bid(1, ALICE, usdc(10), at(START)),
            Ok(usdc(10))
        );
        claim_eq!(
            state.place_bid(second, ALICE, usdc(5), at(START)),
            Ok(usdc(5))
        );
        claim_eq!(state.place_bid(1, BOB, usdc(20), at(START)), Ok(usdc(20)));
        let _ = state.end_auction(1, at(START + TEN_MINUTES));

        claim_eq!(state.withdraw(1, ALICE), Ok(usdc(10)));
        // Second auction is still running
        claim_eq!(
            state.withdraw(second, ALICE),
            Err(AuctionError::AuctionDidNotEnd)
        );
        claim_eq!(
            state.escrowed(&EscrowKey {
                bidder: ALICE,
                auction_id: second,
            }),
            usdc(5)
        );
    }
}
