use super::*;

/// Ledger of the auctioned NFTs. Any CIS-2 contract where a lot has a balance of 1 for its owner.
pub trait HostAssetLedgerExt<S>: HasHost<S> {
    /// Move a single unit of `asset` from `owner` to `custodian`. The invoking contract must be an
    /// operator of `owner` unless it is the owner itself.
    fn asset_transfer(
        &mut self,
        asset: &Token,
        owner: Address,
        custodian: Receiver,
        data: AdditionalData,
    ) -> Result<(), CallContractError<Self::ReturnValueType>> {
        cis2_transfer::<S, Self>(
            self,
            asset,
            ContractTokenAmount::from(1),
            owner,
            custodian,
            data,
        )
    }

    /// Check whether `holder` currently owns `asset`.
    fn asset_held_by(
        &self,
        asset: &Token,
        holder: Address,
    ) -> Result<bool, ContractReadError<Self::ReturnValueType>> {
        let balance = cis2_balance_of::<S, Self>(self, asset, holder)?;
        Ok(balance.0 > 0)
    }
}

impl<S, H: HasHost<S>> HostAssetLedgerExt<S> for H {}

/// Ledger of the fungible payment token bids are denominated in.
pub trait HostTokenLedgerExt<S>: HasHost<S> {
    /// Move `amount` of `token` from `payer` to `payee`. The invoking contract must be an operator
    /// of `payer` unless it is the payer itself.
    fn token_transfer(
        &mut self,
        token: &Token,
        payer: Address,
        payee: Receiver,
        amount: ContractTokenAmount,
        data: AdditionalData,
    ) -> Result<(), CallContractError<Self::ReturnValueType>> {
        cis2_transfer::<S, Self>(self, token, amount, payer, payee, data)
    }

    fn token_balance_of(
        &self,
        token: &Token,
        holder: Address,
    ) -> Result<ContractTokenAmount, ContractReadError<Self::ReturnValueType>> {
        cis2_balance_of::<S, Self>(self, token, holder)
    }
}

impl<S, H: HasHost<S>> HostTokenLedgerExt<S> for H {}

fn cis2_transfer<S, H: HasHost<S> + ?Sized>(
    host: &mut H,
    token: &Token,
    amount: ContractTokenAmount,
    from: Address,
    to: Receiver,
    data: AdditionalData,
) -> Result<(), CallContractError<H::ReturnValueType>> {
    let parameter: TransferParameter = TransferParams(vec![Transfer {
        token_id: token.id.clone(),
        amount,
        from,
        to,
        data,
    }]);

    host.invoke_contract(
        &token.contract,
        &parameter,
        EntrypointName::new_unchecked(TRANSFER_ENTRYPOINT),
        Amount::zero(),
    )?;

    Ok(())
}

fn cis2_balance_of<S, H: HasHost<S> + ?Sized>(
    host: &H,
    token: &Token,
    holder: Address,
) -> Result<ContractTokenAmount, ContractReadError<H::ReturnValueType>> {
    let parameter = ContractBalanceOfQueryParams {
        queries: vec![BalanceOfQuery {
            token_id: token.id.clone(),
            address: holder,
        }],
    };

    let mut response = host
        .invoke_contract_read_only(
            &token.contract,
            &parameter,
            EntrypointName::new_unchecked(BALANCE_OF_ENTRYPOINT),
            Amount::zero(),
        )
        .map_err(ContractReadError::Call)?
        .ok_or(ContractReadError::Compatibility)?;

    // One query was sent, so exactly one amount must come back
    let mut amounts = ContractBalanceOfQueryResponse::deserial(&mut response)
        .map_err(|_| ContractReadError::Parse)?
        .0;
    match (amounts.pop(), amounts.is_empty()) {
        (Some(amount), true) => Ok(amount),
        _ => Err(ContractReadError::Compatibility),
    }
}

#[concordium_cfg_test]
mod tests {
    use super::*;
    use crate::test::*;
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
        index: 3,
        subindex: 0,
    };

    const USER_1: AccountAddress = AccountAddress([1; 32]);
    const USER_2: AccountAddress = AccountAddress([2; 32]);

    fn lot() -> Token {
        Token {
            contract: NFT_CONTRACT,
            id: TokenIdVec(vec![0]),
        }
    }

    fn usdc() -> Token {
        Token {
            contract: USDC_CONTRACT,
            id: TokenIdVec(vec![]),
        }
    }

    fn hook() -> Receiver {
        Receiver::Contract(
            REGISTRY,
            OwnedEntrypointName::new_unchecked(String::from(ON_RECEIVING_CIS2_ENTRYPOINT)),
        )
    }

    fn empty_host() -> TestHost<()> {
        TestHost::new((), TestStateBuilder::new())
    }

    #[concordium_test]
    fn test_asset_transfer_moves_single_unit() {
        let mut host = empty_host();
        host.setup_mock_entrypoint(
            NFT_CONTRACT,
            OwnedEntrypointName::new_unchecked(String::from(TRANSFER_ENTRYPOINT)),
            check_mock(
                |params: &TransferParameter| {
                    params.0.len() == 1
                        && params.0[0].token_id == TokenIdVec(vec![0])
                        && params.0[0].amount == ContractTokenAmount::from(1)
                        && params.0[0].from == Address::Account(USER_1)
                        && matches!(params.0[0].to, Receiver::Contract(address, _) if address == REGISTRY)
                },
                (),
            ),
        );

        let result = host.asset_transfer(
            &lot(),
            Address::Account(USER_1),
            hook(),
            AdditionalData::empty(),
        );
        claim!(result.is_ok());
    }

    #[concordium_test]
    fn test_token_transfer_moves_amount() {
        let mut host = empty_host();
        host.setup_mock_entrypoint(
            USDC_CONTRACT,
            OwnedEntrypointName::new_unchecked(String::from(TRANSFER_ENTRYPOINT)),
            check_mock(
                |params: &TransferParameter| {
                    params.0[0].amount == ContractTokenAmount::from(10)
                        && params.0[0].from == Address::Contract(REGISTRY)
                        && matches!(params.0[0].to, Receiver::Account(account) if account == USER_2)
                },
                (),
            ),
        );

        let result = host.token_transfer(
            &usdc(),
            Address::Contract(REGISTRY),
            Receiver::Account(USER_2),
            ContractTokenAmount::from(10),
            AdditionalData::empty(),
        );
        claim!(result.is_ok());
    }

    #[concordium_test]
    fn test_failed_transfer_is_reported() {
        let mut host = empty_host();
        host.setup_mock_entrypoint(
            USDC_CONTRACT,
            OwnedEntrypointName::new_unchecked(String::from(TRANSFER_ENTRYPOINT)),
            trap_mock(),
        );

        let result = host.token_transfer(
            &usdc(),
            Address::Account(USER_1),
            hook(),
            ContractTokenAmount::from(10),
            AdditionalData::empty(),
        );
        claim!(result.is_err());
    }

    #[concordium_test]
    fn test_asset_held_by() {
        let mut host = empty_host();
        host.setup_mock_entrypoint(
            NFT_CONTRACT,
            OwnedEntrypointName::new_unchecked(String::from(BALANCE_OF_ENTRYPOINT)),
            map_mock(|params: &ContractBalanceOfQueryParams| {
                let held = params.queries[0].address == Address::Contract(REGISTRY);
                Some(BalanceOfQueryResponse(vec![ContractTokenAmount::from(
                    held as u64,
                )]))
            }),
        );

        let held = host.asset_held_by(&lot(), Address::Contract(REGISTRY));
        claim!(matches!(held, Ok(true)));

        let held = host.asset_held_by(&lot(), Address::Account(USER_1));
        claim!(matches!(held, Ok(false)));
    }

    #[concordium_test]
    fn test_token_balance_of() {
        let mut host = empty_host();
        host.setup_mock_entrypoint(
            USDC_CONTRACT,
            OwnedEntrypointName::new_unchecked(String::from(BALANCE_OF_ENTRYPOINT)),
            map_mock(|_: &ContractBalanceOfQueryParams| {
                Some(BalanceOfQueryResponse(vec![ContractTokenAmount::from(30)]))
            }),
        );

        let balance = host.token_balance_of(&usdc(), Address::Contract(REGISTRY));
        claim!(matches!(balance, Ok(amount) if amount == ContractTokenAmount::from(30)));
    }

    #[concordium_test]
    fn test_balance_of_with_unexpected_response() {
        let mut host = empty_host();
        host.setup_mock_entrypoint(
            USDC_CONTRACT,
            OwnedEntrypointName::new_unchecked(String::from(BALANCE_OF_ENTRYPOINT)),
            map_mock(|_: &ContractBalanceOfQueryParams| {
                Some(BalanceOfQueryResponse(Vec::<ContractTokenAmount>::new()))
            }),
        );

        let balance = host.token_balance_of(&usdc(), Address::Contract(REGISTRY));
        claim!(matches!(balance, Err(ContractReadError::Compatibility)));
    }
}
