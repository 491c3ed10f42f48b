//! English auction registry for CIS-2 NFTs. Sellers escrow a lot with the registry, bidders escrow
//! payment tokens, and on expiry the lot goes to the highest bidder and the proceeds to the seller.
//! Outbid bidders reclaim their escrow with `withdraw`.
#![cfg_attr(not(feature = "std"), no_std)]

mod contract;
mod error;
mod events;
mod external;
mod state;
