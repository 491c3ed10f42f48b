use commons::{
    AuctionId, ContractOnReceivingParams, ContractReadError, ContractTokenAmount,
    CustomContractError, HostAssetLedgerExt, HostTokenLedgerExt, Token,
    ON_RECEIVING_CIS2_ENTRYPOINT,
};
use concordium_cis2::{AdditionalData, Receiver};
use concordium_std::*;

use crate::events::*;
use crate::external::*;
use crate::state::{Receipt, Settlement, State};

/// Initialize the registry with no auctions.
#[init(contract = "AuctionRegistry", parameter = "InitParams")]
fn contract_init<S: HasStateApi>(
    ctx: &impl HasInitContext,
    state_builder: &mut StateBuilder<S>,
) -> InitResult<State<S>> {
    let params = InitParams::deserial(&mut ctx.parameter_cursor())?;
    Ok(State::new(state_builder, params.owner, params.payment_token))
}

/// Put an NFT up for auction. The lot is pulled from the sender into custody, so the sender must
/// have added the registry as an operator on the NFT contract beforehand.
///
/// It rejects if:
/// - Fails to parse `CreateAuctionParams` parameters.
/// - The sender is a contract.
/// - The duration is zero.
/// - The lot is the payment token.
/// - The NFT contract refuses the transfer.
#[receive(
    mutable,
    contract = "AuctionRegistry",
    name = "createAuction",
    parameter = "CreateAuctionParams",
    return_value = "AuctionId",
    enable_logger
)]
fn contract_create_auction<S: HasStateApi>(
    ctx: &impl HasReceiveContext,
    host: &mut impl HasHost<State<S>, StateApiType = S>,
    logger: &mut impl HasLogger,
) -> ReceiveResult<AuctionId> {
    let params = CreateAuctionParams::deserial(&mut ctx.parameter_cursor())?;
    let creator = sender_account(ctx)?;

    let (auction_id, bidding_end_time) = host
        .state_mut()
        .create_auction(
            params.lot.clone(),
            creator,
            ctx.metadata().slot_time(),
            params.duration,
        )
        .map_err(CustomContractError::from)?;

    logger.log(&RegistryEvents::auction_created(
        auction_id,
        &params.lot.contract,
        &params.lot.id,
        bidding_end_time,
    ))?;

    host.state_mut().expect_receipt(Receipt {
        auction_id,
        token: params.lot.clone(),
        from: creator,
        amount: ContractTokenAmount::from(1),
    });
    host.asset_transfer(
        &params.lot,
        Address::Account(creator),
        custody_receiver(ctx),
        AdditionalData::from(to_bytes(&auction_id)),
    )
    .map_err(handle_call_error)?;
    host.state_mut().clear_receipt();

    Ok(auction_id)
}

/// Bid on a running auction. The bid is escrowed with the registry until the auction ends, the
/// sender must have added the registry as an operator on the payment token beforehand.
///
/// It rejects if:
/// - Fails to parse `PlaceBidParams` parameters.
/// - The sender is a contract.
/// - The auction does not exist or bidding has ended.
/// - The bid does not exceed the highest bid.
/// - The payment token contract refuses the transfer.
#[receive(
    mutable,
    contract = "AuctionRegistry",
    name = "placeBid",
    parameter = "PlaceBidParams",
    enable_logger
)]
fn contract_place_bid<S: HasStateApi>(
    ctx: &impl HasReceiveContext,
    host: &mut impl HasHost<State<S>, StateApiType = S>,
    logger: &mut impl HasLogger,
) -> ReceiveResult<()> {
    let params = PlaceBidParams::deserial(&mut ctx.parameter_cursor())?;
    let bidder = sender_account(ctx)?;

    let top_up = host
        .state_mut()
        .place_bid(
            params.auction_id,
            bidder,
            params.amount,
            ctx.metadata().slot_time(),
        )
        .map_err(CustomContractError::from)?;

    logger.log(&RegistryEvents::bid_placed(
        params.auction_id,
        &bidder,
        params.amount,
    ))?;

    if top_up.0 > 0 {
        let payment_token = host.state().payment_token.clone();
        host.state_mut().expect_receipt(Receipt {
            auction_id: params.auction_id,
            token: payment_token.clone(),
            from: bidder,
            amount: top_up,
        });
        host.token_transfer(
            &payment_token,
            Address::Account(bidder),
            custody_receiver(ctx),
            top_up,
            AdditionalData::from(to_bytes(&params.auction_id)),
        )
        .map_err(handle_call_error)?;
        host.state_mut().clear_receipt();
    }

    Ok(())
}

/// Settle an expired auction. Anyone can call it, but only once per auction.
///
/// It rejects if:
/// - Fails to parse the auction id.
/// - The auction does not exist, is still running or was already ended.
/// - Either ledger refuses its transfer. Nothing is settled in that case.
#[receive(
    mutable,
    contract = "AuctionRegistry",
    name = "endAuction",
    parameter = "AuctionId",
    enable_logger
)]
fn contract_end_auction<S: HasStateApi>(
    ctx: &impl HasReceiveContext,
    host: &mut impl HasHost<State<S>, StateApiType = S>,
    logger: &mut impl HasLogger,
) -> ReceiveResult<()> {
    let auction_id = AuctionId::deserial(&mut ctx.parameter_cursor())?;

    let settlement = host
        .state_mut()
        .end_auction(auction_id, ctx.metadata().slot_time())
        .map_err(CustomContractError::from)?;

    let registry = Address::Contract(ctx.self_address());
    match settlement {
        Settlement::Sold {
            lot,
            creator,
            winner,
            price,
        } => {
            logger.log(&RegistryEvents::auction_ended(
                auction_id,
                Some(winner),
                price,
            ))?;

            host.asset_transfer(
                &lot,
                registry,
                Receiver::Account(winner),
                AdditionalData::empty(),
            )
            .map_err(handle_call_error)?;

            let payment_token = host.state().payment_token.clone();
            host.token_transfer(
                &payment_token,
                registry,
                Receiver::Account(creator),
                price,
                AdditionalData::empty(),
            )
            .map_err(handle_call_error)?;
        }
        Settlement::Unsold { lot, creator } => {
            logger.log(&RegistryEvents::auction_ended(
                auction_id,
                None,
                ContractTokenAmount::from(0),
            ))?;

            // Nobody bid, the lot goes back to the seller
            host.asset_transfer(
                &lot,
                registry,
                Receiver::Account(creator),
                AdditionalData::empty(),
            )
            .map_err(handle_call_error)?;
        }
    }

    Ok(())
}

/// Reclaim the escrow of a lost auction.
///
/// It rejects if:
/// - Fails to parse the auction id.
/// - The sender is a contract.
/// - The auction does not exist or was not ended yet.
/// - The sender has nothing in escrow, because they never bid, already withdrew or won.
#[receive(
    mutable,
    contract = "AuctionRegistry",
    name = "withdraw",
    parameter = "AuctionId",
    enable_logger
)]
fn contract_withdraw<S: HasStateApi>(
    ctx: &impl HasReceiveContext,
    host: &mut impl HasHost<State<S>, StateApiType = S>,
    logger: &mut impl HasLogger,
) -> ReceiveResult<()> {
    let auction_id = AuctionId::deserial(&mut ctx.parameter_cursor())?;
    let bidder = sender_account(ctx)?;

    let amount = host
        .state_mut()
        .withdraw(auction_id, bidder)
        .map_err(CustomContractError::from)?;

    logger.log(&RegistryEvents::escrow_withdrawn(auction_id, &bidder, amount))?;

    let payment_token = host.state().payment_token.clone();
    host.token_transfer(
        &payment_token,
        Address::Contract(ctx.self_address()),
        Receiver::Account(bidder),
        amount,
        AdditionalData::empty(),
    )
    .map_err(handle_call_error)?;

    Ok(())
}

/// CIS-2 receive hook. Only the transfer the registry is pulling at this moment is accepted,
/// matched exactly on auction id, token, sender and amount. Direct deposits are rejected, so
/// nothing ends up in custody without an escrow record.
#[receive(
    contract = "AuctionRegistry",
    name = "onReceivingCIS2",
    parameter = "ContractOnReceivingParams"
)]
fn contract_on_receiving_cis2<S: HasStateApi>(
    ctx: &impl HasReceiveContext,
    host: &impl HasHost<State<S>, StateApiType = S>,
) -> ReceiveResult<()> {
    let params = ContractOnReceivingParams::deserial(&mut ctx.parameter_cursor())?;

    let token_contract = if let Address::Contract(sender) = ctx.sender() {
        sender
    } else {
        bail!(CustomContractError::ContractOnly.into());
    };

    let from = if let Address::Account(from) = params.from {
        from
    } else {
        bail!(CustomContractError::UnexpectedTransfer.into());
    };

    let auction_id: AuctionId = from_bytes(params.data.as_ref())
        .map_err(|_| CustomContractError::UnexpectedTransfer)?;

    let receipt = Receipt {
        auction_id,
        token: Token {
            contract: token_contract,
            id: params.token_id,
        },
        from,
        amount: params.amount,
    };
    ensure!(
        host.state().is_expected(&receipt),
        CustomContractError::UnexpectedTransfer.into()
    );

    Ok(())
}

#[receive(
    contract = "AuctionRegistry",
    name = "view",
    return_value = "RegistryView"
)]
fn contract_view<S: HasStateApi>(
    _ctx: &impl HasReceiveContext,
    host: &impl HasHost<State<S>, StateApiType = S>,
) -> ReceiveResult<RegistryView> {
    Ok(host.state().view())
}

#[receive(
    contract = "AuctionRegistry",
    name = "viewAuction",
    parameter = "AuctionId",
    return_value = "AuctionView"
)]
fn contract_view_auction<S: HasStateApi>(
    ctx: &impl HasReceiveContext,
    host: &impl HasHost<State<S>, StateApiType = S>,
) -> ReceiveResult<AuctionView> {
    let auction_id = AuctionId::deserial(&mut ctx.parameter_cursor())?;
    let auction = host
        .state()
        .auction(auction_id)
        .ok_or(CustomContractError::UnknownAuction)?;
    Ok(auction.view(auction_id))
}

/// Escrowed amount of a bidder on an auction, zero if there is none.
#[receive(
    contract = "AuctionRegistry",
    name = "viewEscrow",
    parameter = "EscrowKey",
    return_value = "ContractTokenAmount"
)]
fn contract_view_escrow<S: HasStateApi>(
    ctx: &impl HasReceiveContext,
    host: &impl HasHost<State<S>, StateApiType = S>,
) -> ReceiveResult<ContractTokenAmount> {
    let key = EscrowKey::deserial(&mut ctx.parameter_cursor())?;
    Ok(host.state().escrowed(&key))
}

/// Ask both ledgers what the registry actually holds for an auction.
#[receive(
    contract = "AuctionRegistry",
    name = "viewCustody",
    parameter = "AuctionId",
    return_value = "CustodyView"
)]
fn contract_view_custody<S: HasStateApi>(
    ctx: &impl HasReceiveContext,
    host: &impl HasHost<State<S>, StateApiType = S>,
) -> ReceiveResult<CustodyView> {
    let auction_id = AuctionId::deserial(&mut ctx.parameter_cursor())?;
    let auction = host
        .state()
        .auction(auction_id)
        .ok_or(CustomContractError::UnknownAuction)?;
    let payment_token = host.state().payment_token.clone();
    let registry = Address::Contract(ctx.self_address());

    let lot_in_custody = host
        .asset_held_by(&auction.lot, registry)
        .map_err(handle_read_error)?;
    let escrow_balance = host
        .token_balance_of(&payment_token, registry)
        .map_err(handle_read_error)?;

    Ok(CustodyView {
        lot_in_custody,
        escrow_balance,
    })
}

fn sender_account(ctx: &impl HasReceiveContext) -> ReceiveResult<AccountAddress> {
    match ctx.sender() {
        Address::Account(account) => Ok(account),
        Address::Contract(_) => Err(CustomContractError::OnlyAccountAddress.into()),
    }
}

/// Tokens pulled into custody are delivered through the registry's own receive hook.
fn custody_receiver(ctx: &impl HasReceiveContext) -> Receiver {
    Receiver::Contract(
        ctx.self_address(),
        OwnedEntrypointName::new_unchecked(String::from(ON_RECEIVING_CIS2_ENTRYPOINT)),
    )
}

fn handle_call_error<R>(error: CallContractError<R>) -> Reject {
    match error {
        CallContractError::MissingEntrypoint | CallContractError::MessageFailed => {
            CustomContractError::Incompatible.into()
        }
        // Ledger rejected the transfer: missing operator rights, balance or ownership
        CallContractError::LogicReject { .. } => CustomContractError::InvokeContractError.into(),
        e => e.into(),
    }
}

fn handle_read_error<R>(error: ContractReadError<R>) -> Reject {
    match error {
        ContractReadError::Call(error) => handle_call_error(error),
        ContractReadError::Compatibility | ContractReadError::Parse => {
            CustomContractError::Incompatible.into()
        }
    }
}

#[concordium_cfg_test]
mod tests {
    use super::*;
    use commons::test::*;
    use commons::{ContractBalanceOfQueryParams, TransferParameter};
    use concordium_cis2::{BalanceOfQueryResponse, TokenIdVec};
    use concordium_std::test_infrastructure::*;

    const NFT_CONTRACT: ContractAddress = ContractAddress {
        index: 1,
        subindex: 0,
    };
    const USDC_CONTRACT: ContractAddress = ContractAddress {
        index: 2,
        subindex: 0,
    };
    const REGISTRY: ContractAddress = ContractAddress {
        index: 10,
        subindex: 0,
    };

    const OWNER: AccountAddress = AccountAddress([0; 32]);
    const CARL: AccountAddress = AccountAddress([1; 32]);
    const ALICE: AccountAddress = AccountAddress([2; 32]);
    const BOB: AccountAddress = AccountAddress([3; 32]);

    const START: u64 = 1_000_000;
    const DURATION: u64 = 600 * 1000;
    const AFTER_END: u64 = START + 900 * 1000;

    fn lot() -> Token {
        Token {
            contract: NFT_CONTRACT,
            id: TokenIdVec(vec![7]),
        }
    }

    fn usdc() -> Token {
        Token {
            contract: USDC_CONTRACT,
            id: TokenIdVec(vec![]),
        }
    }

    fn amount(amount: u64) -> ContractTokenAmount {
        ContractTokenAmount::from(amount)
    }

    fn transfer_entrypoint() -> OwnedEntrypointName {
        OwnedEntrypointName::new_unchecked(String::from("transfer"))
    }

    fn balance_of_entrypoint() -> OwnedEntrypointName {
        OwnedEntrypointName::new_unchecked(String::from("balanceOf"))
    }

    fn receive_ctx<'a>(sender: Address, parameter: &'a [u8], slot_time: u64) -> TestReceiveContext<'a> {
        let mut ctx = TestReceiveContext::empty();
        ctx.set_sender(sender)
            .set_self_address(REGISTRY)
            .set_parameter(parameter)
            .set_metadata_slot_time(Timestamp::from_timestamp_millis(slot_time));
        ctx
    }

    fn default_host() -> TestHost<State<TestStateApi>> {
        let mut ctx = TestInitContext::empty();
        let params = InitParams {
            owner: OWNER,
            payment_token: usdc(),
        };
        let bytes = to_bytes(&params);
        ctx.set_init_origin(OWNER).set_parameter(&bytes);
        let mut state_builder = TestStateBuilder::new();

        let state = contract_init(&ctx, &mut state_builder)
            .expect_report("Failed during init_AuctionRegistry");

        let mut host = TestHost::new(state, state_builder);
        // Both ledgers accept every well formed transfer unless a test says otherwise
        host.setup_mock_entrypoint(
            NFT_CONTRACT,
            transfer_entrypoint(),
            accept_mock::<TransferParameter, _>(()),
        );
        host.setup_mock_entrypoint(
            USDC_CONTRACT,
            transfer_entrypoint(),
            accept_mock::<TransferParameter, _>(()),
        );
        host
    }

    fn create_auction(
        host: &mut TestHost<State<TestStateApi>>,
        duration: u64,
    ) -> ReceiveResult<AuctionId> {
        let params = CreateAuctionParams {
            lot: lot(),
            duration: Duration::from_millis(duration),
        };
        let bytes = to_bytes(&params);
        let ctx = receive_ctx(Address::Account(CARL), &bytes, START);
        let mut logger = TestLogger::init();
        contract_create_auction(&ctx, host, &mut logger)
    }

    fn place_bid(
        host: &mut TestHost<State<TestStateApi>>,
        bidder: AccountAddress,
        bid: u64,
        slot_time: u64,
    ) -> ReceiveResult<()> {
        let params = PlaceBidParams {
            auction_id: 1,
            amount: amount(bid),
        };
        let bytes = to_bytes(&params);
        let ctx = receive_ctx(Address::Account(bidder), &bytes, slot_time);
        let mut logger = TestLogger::init();
        contract_place_bid(&ctx, host, &mut logger)
    }

    fn end_auction(host: &mut TestHost<State<TestStateApi>>, slot_time: u64) -> ReceiveResult<()> {
        let bytes = to_bytes(&1u64);
        let ctx = receive_ctx(Address::Account(BOB), &bytes, slot_time);
        let mut logger = TestLogger::init();
        contract_end_auction(&ctx, host, &mut logger)
    }

    fn withdraw(host: &mut TestHost<State<TestStateApi>>, bidder: AccountAddress) -> ReceiveResult<()> {
        let bytes = to_bytes(&1u64);
        let ctx = receive_ctx(Address::Account(bidder), &bytes, AFTER_END);
        let mut logger = TestLogger::init();
        contract_withdraw(&ctx, host, &mut logger)
    }

    fn escrow_of(host: &TestHost<State<TestStateApi>>, bidder: AccountAddress) -> ContractTokenAmount {
        host.state().escrowed(&EscrowKey {
            bidder,
            auction_id: 1,
        })
    }

    fn is_transfer(
        params: &TransferParameter,
        from: Address,
        to: AccountAddress,
        value: u64,
    ) -> bool {
        params.0.len() == 1
            && params.0[0].from == from
            && params.0[0].amount == amount(value)
            && matches!(params.0[0].to, Receiver::Account(account) if account == to)
    }

    #[concordium_test]
    fn test_init() {
        let host = default_host();
        let state = host.state();

        claim_eq!(state.owner, OWNER);
        claim_eq!(state.payment_token, usdc());
        claim_eq!(state.auction_counter, 0);
    }

    #[concordium_test]
    fn test_create_auction() {
        let mut host = default_host();
        host.setup_mock_entrypoint(
            NFT_CONTRACT,
            transfer_entrypoint(),
            check_mock(
                |params: &TransferParameter| {
                    params.0.len() == 1
                        && params.0[0].token_id == TokenIdVec(vec![7])
                        && params.0[0].amount == amount(1)
                        && params.0[0].from == Address::Account(CARL)
                        && matches!(params.0[0].to, Receiver::Contract(address, _) if address == REGISTRY)
                        && params.0[0].data.as_ref() == to_bytes(&1u64).as_slice()
                },
                (),
            ),
        );

        let params = CreateAuctionParams {
            lot: lot(),
            duration: Duration::from_millis(DURATION),
        };
        let bytes = to_bytes(&params);
        let ctx = receive_ctx(Address::Account(CARL), &bytes, START);
        let mut logger = TestLogger::init();
        let result = contract_create_auction(&ctx, &mut host, &mut logger);

        claim_eq!(result, Ok(1));
        claim_eq!(host.state().auction_counter, 1);

        let auction = host
            .state()
            .auction(1)
            .expect_report("Auction should be recorded");
        claim_eq!(auction.lot, lot());
        claim_eq!(
            auction.bidding_end_time,
            Timestamp::from_timestamp_millis(START + DURATION)
        );
        claim_eq!(auction.highest_bidder(), None);
        claim_eq!(auction.highest_amount(), amount(0));
        claim!(!auction.ended);
        claim_eq!(auction.creator, CARL);

        claim_eq!(logger.logs.len(), 1);
        claim_eq!(
            logger.logs[0],
            to_bytes(&RegistryEvents::auction_created(
                1,
                &NFT_CONTRACT,
                &TokenIdVec(vec![7]),
                Timestamp::from_timestamp_millis(START + DURATION),
            ))
        );
    }

    #[concordium_test]
    fn test_create_auction_increments_counter() {
        let mut host = default_host();

        claim_eq!(create_auction(&mut host, DURATION), Ok(1));
        claim_eq!(create_auction(&mut host, DURATION), Ok(2));
        claim_eq!(host.state().auction_counter, 2);
    }

    #[concordium_test]
    fn test_create_auction_rejects() {
        let mut host = default_host();

        claim_eq!(
            create_auction(&mut host, 0),
            Err(CustomContractError::InvalidDuration.into())
        );

        // Creator did not authorize the registry on the NFT contract
        host.setup_mock_entrypoint(NFT_CONTRACT, transfer_entrypoint(), trap_mock());
        claim!(create_auction(&mut host, DURATION).is_err());

        let params = CreateAuctionParams {
            lot: lot(),
            duration: Duration::from_millis(DURATION),
        };
        let bytes = to_bytes(&params);
        let ctx = receive_ctx(Address::Contract(NFT_CONTRACT), &bytes, START);
        let mut logger = TestLogger::init();
        claim_eq!(
            contract_create_auction(&ctx, &mut host, &mut logger),
            Err(CustomContractError::OnlyAccountAddress.into())
        );
    }

    #[concordium_test]
    fn test_create_auction_of_payment_token() {
        let mut host = default_host();
        let params = CreateAuctionParams {
            lot: usdc(),
            duration: Duration::from_millis(DURATION),
        };
        let bytes = to_bytes(&params);
        let ctx = receive_ctx(Address::Account(CARL), &bytes, START);
        let mut logger = TestLogger::init();
        claim_eq!(
            contract_create_auction(&ctx, &mut host, &mut logger),
            Err(CustomContractError::LotIsPaymentToken.into())
        );
        claim_eq!(host.state().auction_counter, 0);
    }

    #[concordium_test]
    fn test_place_bid() {
        let mut host = default_host();
        claim_eq!(create_auction(&mut host, DURATION), Ok(1));
        host.setup_mock_entrypoint(
            USDC_CONTRACT,
            transfer_entrypoint(),
            check_mock(
                |params: &TransferParameter| {
                    params.0[0].from == Address::Account(ALICE)
                        && params.0[0].amount == amount(10)
                        && matches!(params.0[0].to, Receiver::Contract(address, _) if address == REGISTRY)
                },
                (),
            ),
        );

        let params = PlaceBidParams {
            auction_id: 1,
            amount: amount(10),
        };
        let bytes = to_bytes(&params);
        let ctx = receive_ctx(Address::Account(ALICE), &bytes, START + 1);
        let mut logger = TestLogger::init();
        let result = contract_place_bid(&ctx, &mut host, &mut logger);

        claim_eq!(result, Ok(()));
        let auction = host.state().auction(1).expect_report("Auction should exist");
        claim_eq!(auction.highest_bidder(), Some(ALICE));
        claim_eq!(auction.highest_amount(), amount(10));
        claim_eq!(escrow_of(&host, ALICE), amount(10));
        claim_eq!(
            logger.logs,
            vec![to_bytes(&RegistryEvents::bid_placed(1, &ALICE, amount(10)))]
        );
    }

    #[concordium_test]
    fn test_place_bid_rejects() {
        let mut host = default_host();
        claim_eq!(create_auction(&mut host, DURATION), Ok(1));

        claim_eq!(
            place_bid(&mut host, ALICE, 0, START),
            Err(CustomContractError::BidTooLow.into())
        );
        claim_eq!(
            place_bid(&mut host, ALICE, 10, START + DURATION),
            Err(CustomContractError::BiddingEnded.into())
        );

        let params = PlaceBidParams {
            auction_id: 2,
            amount: amount(10),
        };
        let bytes = to_bytes(&params);
        let ctx = receive_ctx(Address::Account(ALICE), &bytes, START);
        let mut logger = TestLogger::init();
        claim_eq!(
            contract_place_bid(&ctx, &mut host, &mut logger),
            Err(CustomContractError::UnknownAuction.into())
        );

        // Bidder has no allowance or balance on the payment token
        host.setup_mock_entrypoint(USDC_CONTRACT, transfer_entrypoint(), trap_mock());
        claim!(place_bid(&mut host, ALICE, 10, START).is_err());
    }

    #[concordium_test]
    fn test_rebid_pulls_only_increment() {
        let mut host = default_host();
        claim_eq!(create_auction(&mut host, DURATION), Ok(1));
        claim_eq!(place_bid(&mut host, ALICE, 10, START), Ok(()));
        claim_eq!(place_bid(&mut host, BOB, 20, START), Ok(()));

        host.setup_mock_entrypoint(
            USDC_CONTRACT,
            transfer_entrypoint(),
            check_mock(
                |params: &TransferParameter| {
                    params.0[0].from == Address::Account(ALICE) && params.0[0].amount == amount(15)
                },
                (),
            ),
        );
        claim_eq!(place_bid(&mut host, ALICE, 25, START), Ok(()));
        claim_eq!(escrow_of(&host, ALICE), amount(25));
        claim_eq!(escrow_of(&host, BOB), amount(20));
    }

    #[concordium_test]
    fn test_end_auction_before_expiry() {
        let mut host = default_host();
        claim_eq!(create_auction(&mut host, DURATION), Ok(1));
        claim_eq!(place_bid(&mut host, ALICE, 10, START), Ok(()));

        claim_eq!(
            end_auction(&mut host, START + DURATION - 1),
            Err(CustomContractError::AuctionStillActive.into())
        );
        claim!(!host.state().auction(1).expect_report("Auction should exist").ended);
    }

    #[concordium_test]
    fn test_end_auction_without_bids() {
        let mut host = default_host();
        claim_eq!(create_auction(&mut host, DURATION), Ok(1));
        host.setup_mock_entrypoint(
            NFT_CONTRACT,
            transfer_entrypoint(),
            check_mock(
                |params: &TransferParameter| {
                    is_transfer(params, Address::Contract(REGISTRY), CARL, 1)
                },
                (),
            ),
        );
        // No proceeds to pay out
        host.setup_mock_entrypoint(USDC_CONTRACT, transfer_entrypoint(), trap_mock());

        let bytes = to_bytes(&1u64);
        let ctx = receive_ctx(Address::Account(BOB), &bytes, AFTER_END);
        let mut logger = TestLogger::init();
        let result = contract_end_auction(&ctx, &mut host, &mut logger);

        claim_eq!(result, Ok(()));
        claim!(host.state().auction(1).expect_report("Auction should exist").ended);
        claim_eq!(
            logger.logs,
            vec![to_bytes(&RegistryEvents::auction_ended(1, None, amount(0)))]
        );
    }

    #[concordium_test]
    fn test_end_auction_failed_settlement() {
        let mut host = default_host();
        claim_eq!(create_auction(&mut host, DURATION), Ok(1));
        claim_eq!(place_bid(&mut host, ALICE, 10, START), Ok(()));

        // Whole call is rolled back by the host when any transfer fails
        host.setup_mock_entrypoint(NFT_CONTRACT, transfer_entrypoint(), trap_mock());
        claim!(end_auction(&mut host, AFTER_END).is_err());

        let mut host = default_host();
        claim_eq!(create_auction(&mut host, DURATION), Ok(1));
        claim_eq!(place_bid(&mut host, ALICE, 10, START), Ok(()));
        host.setup_mock_entrypoint(USDC_CONTRACT, transfer_entrypoint(), trap_mock());
        claim!(end_auction(&mut host, AFTER_END).is_err());
    }

    #[concordium_test]
    fn test_withdraw_before_end() {
        let mut host = default_host();
        claim_eq!(create_auction(&mut host, DURATION), Ok(1));
        claim_eq!(place_bid(&mut host, ALICE, 10, START), Ok(()));
        claim_eq!(place_bid(&mut host, BOB, 20, START), Ok(()));

        claim_eq!(
            withdraw(&mut host, ALICE),
            Err(CustomContractError::AuctionDidNotEnd.into())
        );
        claim_eq!(escrow_of(&host, ALICE), amount(10));
    }

    #[concordium_test]
    fn test_scenario_single_bidder_wins() {
        let mut host = default_host();
        claim_eq!(create_auction(&mut host, DURATION), Ok(1));

        claim_eq!(place_bid(&mut host, ALICE, 10, START + 1), Ok(()));
        claim_eq!(
            place_bid(&mut host, BOB, 5, START + 2),
            Err(CustomContractError::BidTooLow.into())
        );
        claim_eq!(escrow_of(&host, BOB), amount(0));

        // Lot goes to Alice, the proceeds to Carl
        host.setup_mock_entrypoint(
            NFT_CONTRACT,
            transfer_entrypoint(),
            check_mock(
                |params: &TransferParameter| {
                    is_transfer(params, Address::Contract(REGISTRY), ALICE, 1)
                },
                (),
            ),
        );
        host.setup_mock_entrypoint(
            USDC_CONTRACT,
            transfer_entrypoint(),
            check_mock(
                |params: &TransferParameter| {
                    is_transfer(params, Address::Contract(REGISTRY), CARL, 10)
                },
                (),
            ),
        );
        claim_eq!(end_auction(&mut host, AFTER_END), Ok(()));
        claim!(host.state().auction(1).expect_report("Auction should exist").ended);

        claim_eq!(
            end_auction(&mut host, AFTER_END),
            Err(CustomContractError::AuctionAlreadyEnded.into())
        );
        claim_eq!(
            withdraw(&mut host, ALICE),
            Err(CustomContractError::NoFundsToWithdraw.into())
        );
    }

    #[concordium_test]
    fn test_scenario_outbid_bidder_withdraws() {
        let mut host = default_host();
        claim_eq!(create_auction(&mut host, DURATION), Ok(1));

        claim_eq!(place_bid(&mut host, ALICE, 10, START + 1), Ok(()));
        claim_eq!(place_bid(&mut host, BOB, 20, START + 2), Ok(()));

        host.setup_mock_entrypoint(
            NFT_CONTRACT,
            transfer_entrypoint(),
            check_mock(
                |params: &TransferParameter| {
                    is_transfer(params, Address::Contract(REGISTRY), BOB, 1)
                },
                (),
            ),
        );
        host.setup_mock_entrypoint(
            USDC_CONTRACT,
            transfer_entrypoint(),
            check_mock(
                |params: &TransferParameter| {
                    is_transfer(params, Address::Contract(REGISTRY), CARL, 20)
                },
                (),
            ),
        );
        claim_eq!(end_auction(&mut host, AFTER_END), Ok(()));

        host.setup_mock_entrypoint(
            USDC_CONTRACT,
            transfer_entrypoint(),
            check_mock(
                |params: &TransferParameter| {
                    is_transfer(params, Address::Contract(REGISTRY), ALICE, 10)
                },
                (),
            ),
        );
        let bytes = to_bytes(&1u64);
        let ctx = receive_ctx(Address::Account(ALICE), &bytes, AFTER_END);
        let mut logger = TestLogger::init();
        claim_eq!(contract_withdraw(&ctx, &mut host, &mut logger), Ok(()));
        claim_eq!(
            logger.logs,
            vec![to_bytes(&RegistryEvents::escrow_withdrawn(1, &ALICE, amount(10)))]
        );
        claim_eq!(escrow_of(&host, ALICE), amount(0));

        claim_eq!(
            withdraw(&mut host, ALICE),
            Err(CustomContractError::NoFundsToWithdraw.into())
        );
        // Bob won, his escrow went to Carl
        claim_eq!(
            withdraw(&mut host, BOB),
            Err(CustomContractError::NoFundsToWithdraw.into())
        );
    }

    /// Ledger mock that only transfers while the registry announces exactly `receipt`.
    fn receipt_mock(receipt: Receipt) -> MockFn<State<TestStateApi>> {
        MockFn::new(
            move |_parameter, _amount, _balance, state: &mut State<TestStateApi>| {
                if state.pending_receipt.as_ref() == Some(&receipt) {
                    Ok((false, Some(())))
                } else {
                    Err(CallContractError::Trap)
                }
            },
        )
    }

    fn lot_receipt() -> Receipt {
        Receipt {
            auction_id: 1,
            token: lot(),
            from: CARL,
            amount: amount(1),
        }
    }

    fn payment_receipt(from: AccountAddress, value: u64) -> Receipt {
        Receipt {
            auction_id: 1,
            token: usdc(),
            from,
            amount: amount(value),
        }
    }

    #[concordium_test]
    fn test_pulls_are_announced_to_receive_hook() {
        let mut host = default_host();
        host.setup_mock_entrypoint(NFT_CONTRACT, transfer_entrypoint(), receipt_mock(lot_receipt()));
        claim_eq!(create_auction(&mut host, DURATION), Ok(1));
        claim_eq!(host.state().pending_receipt, None);

        host.setup_mock_entrypoint(
            USDC_CONTRACT,
            transfer_entrypoint(),
            receipt_mock(payment_receipt(ALICE, 10)),
        );
        claim_eq!(place_bid(&mut host, ALICE, 10, START), Ok(()));
        claim_eq!(host.state().pending_receipt, None);

        // Raising the own bid announces only the increment
        host.setup_mock_entrypoint(
            USDC_CONTRACT,
            transfer_entrypoint(),
            receipt_mock(payment_receipt(ALICE, 5)),
        );
        claim_eq!(place_bid(&mut host, ALICE, 15, START), Ok(()));
        claim_eq!(host.state().pending_receipt, None);
    }

    #[concordium_test]
    fn test_on_receiving_lot() {
        let mut host = default_host();
        claim_eq!(create_auction(&mut host, DURATION), Ok(1));
        // The NFT contract calls back while the lot is being pulled
        host.state_mut().expect_receipt(lot_receipt());

        let transfer = |from: AccountAddress, data: Vec<u8>| ContractOnReceivingParams {
            token_id: TokenIdVec(vec![7]),
            amount: amount(1),
            from: Address::Account(from),
            data: AdditionalData::from(data),
        };

        let bytes = to_bytes(&transfer(CARL, to_bytes(&1u64)));
        let ctx = receive_ctx(Address::Contract(NFT_CONTRACT), &bytes, START);
        claim_eq!(contract_on_receiving_cis2(&ctx, &host), Ok(()));

        // Someone other than the creator sends the lot
        let bytes = to_bytes(&transfer(ALICE, to_bytes(&1u64)));
        let ctx = receive_ctx(Address::Contract(NFT_CONTRACT), &bytes, START);
        claim_eq!(
            contract_on_receiving_cis2(&ctx, &host),
            Err(CustomContractError::UnexpectedTransfer.into())
        );

        // Wrong auction
        let bytes = to_bytes(&transfer(CARL, to_bytes(&2u64)));
        let ctx = receive_ctx(Address::Contract(NFT_CONTRACT), &bytes, START);
        claim_eq!(
            contract_on_receiving_cis2(&ctx, &host),
            Err(CustomContractError::UnexpectedTransfer.into())
        );

        // Plain deposit without auction data
        let bytes = to_bytes(&transfer(CARL, Vec::new()));
        let ctx = receive_ctx(Address::Contract(NFT_CONTRACT), &bytes, START);
        claim_eq!(
            contract_on_receiving_cis2(&ctx, &host),
            Err(CustomContractError::UnexpectedTransfer.into())
        );

        let bytes = to_bytes(&transfer(CARL, to_bytes(&1u64)));
        let ctx = receive_ctx(Address::Account(CARL), &bytes, START);
        claim_eq!(
            contract_on_receiving_cis2(&ctx, &host),
            Err(CustomContractError::ContractOnly.into())
        );

        // Sending the lot again once the pull completed
        host.state_mut().clear_receipt();
        let bytes = to_bytes(&transfer(CARL, to_bytes(&1u64)));
        let ctx = receive_ctx(Address::Contract(NFT_CONTRACT), &bytes, START);
        claim_eq!(
            contract_on_receiving_cis2(&ctx, &host),
            Err(CustomContractError::UnexpectedTransfer.into())
        );
    }

    #[concordium_test]
    fn test_on_receiving_payment() {
        let mut host = default_host();
        claim_eq!(create_auction(&mut host, DURATION), Ok(1));
        host.state_mut().expect_receipt(payment_receipt(ALICE, 10));

        let payment = |from: AccountAddress, value: u64| ContractOnReceivingParams {
            token_id: TokenIdVec(vec![]),
            amount: amount(value),
            from: Address::Account(from),
            data: AdditionalData::from(to_bytes(&1u64)),
        };

        let bytes = to_bytes(&payment(ALICE, 10));
        let ctx = receive_ctx(Address::Contract(USDC_CONTRACT), &bytes, START);
        claim_eq!(contract_on_receiving_cis2(&ctx, &host), Ok(()));

        // Less or more than is being pulled
        for value in vec![9u64, 11] {
            let bytes = to_bytes(&payment(ALICE, value));
            let ctx = receive_ctx(Address::Contract(USDC_CONTRACT), &bytes, START);
            claim_eq!(
                contract_on_receiving_cis2(&ctx, &host),
                Err(CustomContractError::UnexpectedTransfer.into())
            );
        }

        // Another bidder
        let bytes = to_bytes(&payment(BOB, 10));
        let ctx = receive_ctx(Address::Contract(USDC_CONTRACT), &bytes, START);
        claim_eq!(
            contract_on_receiving_cis2(&ctx, &host),
            Err(CustomContractError::UnexpectedTransfer.into())
        );

        // Unrelated token contract
        let bytes = to_bytes(&payment(ALICE, 10));
        let ctx = receive_ctx(
            Address::Contract(ContractAddress {
                index: 99,
                subindex: 0,
            }),
            &bytes,
            START,
        );
        claim_eq!(
            contract_on_receiving_cis2(&ctx, &host),
            Err(CustomContractError::UnexpectedTransfer.into())
        );
    }

    #[concordium_test]
    fn test_direct_deposit_is_rejected() {
        let mut host = default_host();
        claim_eq!(create_auction(&mut host, DURATION), Ok(1));
        claim_eq!(place_bid(&mut host, ALICE, 10, START), Ok(()));
        claim_eq!(escrow_of(&host, ALICE), amount(10));

        // Alice transfers 10 more on her own, with valid auction data
        let params = ContractOnReceivingParams {
            token_id: TokenIdVec(vec![]),
            amount: amount(10),
            from: Address::Account(ALICE),
            data: AdditionalData::from(to_bytes(&1u64)),
        };
        let bytes = to_bytes(&params);
        let ctx = receive_ctx(Address::Contract(USDC_CONTRACT), &bytes, START);
        claim_eq!(
            contract_on_receiving_cis2(&ctx, &host),
            Err(CustomContractError::UnexpectedTransfer.into())
        );
        claim_eq!(escrow_of(&host, ALICE), amount(10));
    }

    #[concordium_test]
    fn test_views() {
        let mut host = default_host();
        claim_eq!(create_auction(&mut host, DURATION), Ok(1));
        claim_eq!(place_bid(&mut host, ALICE, 10, START), Ok(()));

        let ctx = TestReceiveContext::empty();
        claim_eq!(
            contract_view(&ctx, &host),
            Ok(RegistryView {
                owner: OWNER,
                payment_token: usdc(),
                auction_counter: 1,
            })
        );

        let bytes = to_bytes(&1u64);
        let ctx = receive_ctx(Address::Account(BOB), &bytes, START);
        claim_eq!(
            contract_view_auction(&ctx, &host),
            Ok(AuctionView {
                id: 1,
                lot: lot(),
                bidding_end_time: Timestamp::from_timestamp_millis(START + DURATION),
                highest_bidder: Some(ALICE),
                highest_bid: amount(10),
                ended: false,
                creator: CARL,
            })
        );

        let bytes = to_bytes(&2u64);
        let ctx = receive_ctx(Address::Account(BOB), &bytes, START);
        claim_eq!(
            contract_view_auction(&ctx, &host),
            Err(CustomContractError::UnknownAuction.into())
        );

        let bytes = to_bytes(&EscrowKey {
            bidder: ALICE,
            auction_id: 1,
        });
        let ctx = receive_ctx(Address::Account(BOB), &bytes, START);
        claim_eq!(contract_view_escrow(&ctx, &host), Ok(amount(10)));

        let bytes = to_bytes(&EscrowKey {
            bidder: BOB,
            auction_id: 1,
        });
        let ctx = receive_ctx(Address::Account(BOB), &bytes, START);
        claim_eq!(contract_view_escrow(&ctx, &host), Ok(amount(0)));
    }

    #[concordium_test]
    fn test_view_custody() {
        let mut host = default_host();
        claim_eq!(create_auction(&mut host, DURATION), Ok(1));
        host.setup_mock_entrypoint(
            NFT_CONTRACT,
            balance_of_entrypoint(),
            map_mock(|params: &ContractBalanceOfQueryParams| {
                let held = params.queries[0].address == Address::Contract(REGISTRY);
                Some(BalanceOfQueryResponse(vec![amount(held as u64)]))
            }),
        );
        host.setup_mock_entrypoint(
            USDC_CONTRACT,
            balance_of_entrypoint(),
            map_mock(|_: &ContractBalanceOfQueryParams| {
                Some(BalanceOfQueryResponse(vec![amount(30)]))
            }),
        );

        let bytes = to_bytes(&1u64);
        let ctx = receive_ctx(Address::Account(BOB), &bytes, START);
        claim_eq!(
            contract_view_custody(&ctx, &host),
            Ok(CustodyView {
                lot_in_custody: true,
                escrow_balance: amount(30),
            })
        );

        // Ledger without balanceOf
        let mut host = default_host();
        claim_eq!(create_auction(&mut host, DURATION), Ok(1));
        host.setup_mock_entrypoint(NFT_CONTRACT, balance_of_entrypoint(), trap_mock());
        claim!(contract_view_custody(&ctx, &host).is_err());
    }
}
