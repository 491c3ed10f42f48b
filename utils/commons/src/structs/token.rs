use super::*;

/// A token held by a CIS-2 contract. Identifies both auctioned lots and the payment token.
#[derive(Debug, Serialize, SchemaType, Hash, PartialEq, Eq, Clone)]
pub struct Token {
    pub contract: ContractAddress,
    pub id: ContractTokenId,
}

impl Token {
    /// Check whether a token with `id` from `contract` is this token.
    pub fn is(&self, contract: &ContractAddress, id: &ContractTokenId) -> bool {
        self.contract == *contract && self.id == *id
    }
}
