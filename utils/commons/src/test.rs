//! Mock CIS-2 ledger entrypoints for `TestHost` based tests. Compiled wherever
//! `concordium_cfg_test` code is, and for other crates through the `mocks` feature.
use concordium_std::test_infrastructure::MockFn;
use concordium_std::*;

/// Answer with a value computed from the parameter. Traps if the parameter does not parse as
/// `D` or `f` returns `None`.
pub fn map_mock<D: Deserial + 'static, T: Serial + 'static, S>(
    f: impl Fn(&D) -> Option<T> + 'static,
) -> MockFn<S> {
    MockFn::new(move |parameter, _amount, _balance, _state| {
        let value =
            D::deserial(&mut Cursor::new(parameter)).map_err(|_| CallContractError::Trap)?;
        f(&value)
            .map(|r| (false, Some(r)))
            .ok_or(CallContractError::Trap)
    })
}

/// Accept any parameter of type `D` and answer with `return_value`.
pub fn accept_mock<D: Deserial + 'static, S>(
    return_value: impl Clone + Serial + 'static,
) -> MockFn<S> {
    map_mock(move |_: &D| Some(return_value.clone()))
}

/// Accept only parameters passing `check`. Pins down the exact transfer a ledger is asked to
/// execute.
pub fn check_mock<D: Deserial + 'static, S>(
    check: impl Fn(&D) -> bool + 'static,
    return_value: impl Clone + Serial + 'static,
) -> MockFn<S> {
    map_mock(move |value: &D| check(value).then(|| return_value.clone()))
}

/// Ledger that fails every call, e.g. missing operator rights or balance.
pub fn trap_mock<S>() -> MockFn<S> {
    map_mock(|_: &()| None::<()>)
}
