//! Typed call wrappers, one per remote method.
//!
//! Each wrapper shapes a small argument record and delegates to
//! [`LedgerClient::call`], returning the raw reply payload undecoded.
//! They carry no state and no retry logic of their own.

use serde_json::Value;

use crate::error::Result;
use crate::records::{
    AssetRecord, CreateArguments, EmptyArguments, IssueRecord, ProofArguments, ShareGrantRecord,
    ShareRecord, ShareSwapRecord, TransactionArguments, TransferRecord,
};
use crate::router::LedgerClient;

impl LedgerClient {
    /// Registers assets and mints their issues in one `Ledger.Create` request.
    ///
    /// Not idempotent: a call abandoned on timeout may still be applied by
    /// the server, so blind retries risk duplicate issuance.
    pub async fn create(
        &self,
        assets: Vec<AssetRecord>,
        issues: Vec<IssueRecord>,
    ) -> Result<Value> {
        let args = CreateArguments { assets, issues };
        self.call("Ledger.Create", serde_json::to_value(args)?).await
    }

    /// Submits a payment proof via `Ledger.Proof`.
    pub async fn proof(&self, pay_id: &str, nonce: &str) -> Result<Value> {
        let args = ProofArguments {
            pay_id: pay_id.to_string(),
            nonce: nonce.to_string(),
        };
        self.call("Ledger.Proof", serde_json::to_value(args)?).await
    }

    /// Fetches node information via `Node.Info`.
    pub async fn node_info(&self) -> Result<Value> {
        self.call("Node.Info", serde_json::to_value(EmptyArguments {})?)
            .await
    }

    /// Queries the status of a transaction via `Transaction.Status`.
    pub async fn transaction_status(&self, tx_id: &str) -> Result<Value> {
        let args = TransactionArguments {
            tx_id: tx_id.to_string(),
        };
        self.call("Transaction.Status", serde_json::to_value(args)?)
            .await
    }

    /// Submits an ownership transfer via `Ledger.Transfer`.
    pub async fn transfer(&self, transfer: TransferRecord) -> Result<Value> {
        self.call("Ledger.Transfer", serde_json::to_value(transfer)?)
            .await
    }

    /// Converts an item into fungible shares via `Share.Create`.
    pub async fn create_shares(&self, share: ShareRecord) -> Result<Value> {
        self.call("Share.Create", serde_json::to_value(share)?).await
    }

    /// Grants shares to another account via `Share.Grant`.
    pub async fn grant_shares(&self, grant: ShareGrantRecord) -> Result<Value> {
        self.call("Share.Grant", serde_json::to_value(grant)?).await
    }

    /// Swaps shares between two accounts via `Share.Swap`.
    pub async fn swap_shares(&self, swap: ShareSwapRecord) -> Result<Value> {
        self.call("Share.Swap", serde_json::to_value(swap)?).await
    }
}
