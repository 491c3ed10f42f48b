//! Types, errors and CIS-2 ledger interfaces shared by the auction contracts.
#![cfg_attr(not(feature = "std"), no_std)]
pub use crate::{constants::*, errors::*, ledger::*, structs::*, types::*};
use concordium_cis2::*;
use concordium_std::*;

#[cfg(any(test, feature = "wasm-test", feature = "mocks"))]
pub mod test;

mod constants;
mod errors;
mod ledger;
mod structs;
mod types;
