//! Argument records marshalled by the typed call wrappers.
//!
//! These are thin serde shapes matching the node's wire format; signatures
//! and identifiers are hex strings produced elsewhere and passed through
//! untouched.

use serde::{Deserialize, Serialize};

/// Empty argument object for parameterless methods.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EmptyArguments {}

/// An asset registration record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetRecord {
    /// Display name of the asset.
    pub name: String,
    /// Content fingerprint identifying the asset.
    pub fingerprint: String,
    /// Packed metadata string.
    pub metadata: String,
    /// Registrant account.
    pub registrant: String,
    /// Registrant's signature over the record.
    pub signature: String,
}

/// An issuance record minting one item of a registered asset.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueRecord {
    /// Identifier of the asset being issued.
    pub asset_id: String,
    /// Owner account receiving the issue.
    pub owner: String,
    /// Issuance nonce.
    pub nonce: u64,
    /// Owner's signature over the record.
    pub signature: String,
}

/// Arguments for `Ledger.Create`: assets and their issues in one request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateArguments {
    /// Assets to register.
    pub assets: Vec<AssetRecord>,
    /// Issues to mint.
    pub issues: Vec<IssueRecord>,
}

/// Arguments for `Ledger.Proof`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProofArguments {
    /// Payment identifier being proven.
    pub pay_id: String,
    /// Client-computed nonce.
    pub nonce: String,
}

/// Arguments for `Transaction.Status`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionArguments {
    /// Transaction identifier to query.
    #[serde(rename = "txId")]
    pub tx_id: String,
}

/// An ownership transfer record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferRecord {
    /// Identifier of the transaction being transferred.
    pub link: String,
    /// New owner account.
    pub owner: String,
    /// Current owner's signature.
    pub signature: String,
}

/// A share-creation record splitting an item into fungible shares.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShareRecord {
    /// Identifier of the transaction being converted.
    pub link: String,
    /// Number of shares to create.
    pub quantity: u64,
    /// Owner's signature.
    pub signature: String,
}

/// A share grant record moving shares to another account.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShareGrantRecord {
    /// Share identifier.
    pub share_id: String,
    /// Number of shares granted.
    pub quantity: u64,
    /// Granting account.
    pub owner: String,
    /// Receiving account.
    pub recipient: String,
    /// Block height before which the grant must be confirmed.
    pub before_block: u64,
    /// Granter's signature.
    pub signature: String,
}

/// A share swap record exchanging shares between two accounts atomically.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShareSwapRecord {
    /// First share identifier.
    pub share_id_one: String,
    /// Quantity offered from the first share.
    pub quantity_one: u64,
    /// First account.
    pub owner_one: String,
    /// Second share identifier.
    pub share_id_two: String,
    /// Quantity offered from the second share.
    pub quantity_two: u64,
    /// Second account.
    pub owner_two: String,
    /// Block height before which the swap must be confirmed.
    pub before_block: u64,
    /// Combined signature.
    pub signature: String,
}
