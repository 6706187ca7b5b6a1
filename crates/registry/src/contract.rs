//! On-chain registry client.
//!
//! Wraps the `PublicKeyRegistry` contract. Reads are `eth_call`s; writes are
//! signed with the configured key, sent, and awaited until a receipt is
//! available. A receipt with a failed status is reported as
//! [`RegistryError::Reverted`].

use alloy::network::EthereumWallet;
use alloy::primitives::{Address, Bytes};
use alloy::providers::{Provider, ProviderBuilder};
use alloy::rpc::types::TransactionReceipt;
use alloy::signers::local::PrivateKeySigner;
use alloy::sol;
use anyhow::Context;
use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::error::{RegistryError, Result};
use crate::{Confirmation, KeyRegistry};

// Type alias for the Alloy provider with wallet support
// This complex type is necessary until Alloy provides a simpler abstraction
// See: https://github.com/alloy-rs/alloy/issues/1800
type WalletProvider = alloy::providers::fillers::FillProvider<
    alloy::providers::fillers::JoinFill<
        alloy::providers::fillers::JoinFill<
            alloy::providers::Identity,
            alloy::providers::fillers::JoinFill<
                alloy::providers::fillers::GasFiller,
                alloy::providers::fillers::JoinFill<
                    alloy::providers::fillers::BlobGasFiller,
                    alloy::providers::fillers::JoinFill<
                        alloy::providers::fillers::NonceFiller,
                        alloy::providers::fillers::ChainIdFiller,
                    >,
                >,
            >,
        >,
        alloy::providers::fillers::WalletFiller<EthereumWallet>,
    >,
    alloy::providers::RootProvider<alloy::transports::http::Http<alloy::transports::http::Client>>,
    alloy::transports::http::Http<alloy::transports::http::Client>,
    alloy::network::Ethereum,
>;

// Generate PublicKeyRegistry contract bindings
sol! {
    #[allow(missing_docs)]
    #[sol(rpc)]
    contract PublicKeyRegistry {
        function isUserRegistered(string userId) external view returns (bool registered);
        function getPublicKey(string userId) external view returns (bytes publicKey);
        function setPublicKey(string userId, bytes publicKey) external;
        function updatePublicKey(string userId, bytes publicKey) external;
        function deletePublicKey(string userId) external;
    }
}

/// [`KeyRegistry`] backed by the `PublicKeyRegistry` contract.
#[derive(Clone)]
pub struct ContractRegistry {
    contract: PublicKeyRegistry::PublicKeyRegistryInstance<
        alloy::transports::http::Http<alloy::transports::http::Client>,
        WalletProvider,
    >,
}

impl ContractRegistry {
    /// Connect to the registry at `contract_address` through `rpc_url`,
    /// signing writes with `signer`.
    ///
    /// When `expected_chain_id` is set, the endpoint's chain id must match.
    pub async fn connect(
        rpc_url: &str,
        contract_address: Address,
        signer: PrivateKeySigner,
        expected_chain_id: Option<u64>,
    ) -> anyhow::Result<Self> {
        let url = rpc_url
            .parse()
            .with_context(|| format!("Invalid RPC URL: {}", rpc_url))?;

        let sender = signer.address();
        let wallet = EthereumWallet::from(signer);

        let provider = ProviderBuilder::new()
            .with_recommended_fillers()
            .wallet(wallet)
            .on_http(url);

        if let Some(expected) = expected_chain_id {
            let actual = provider
                .get_chain_id()
                .await
                .context("Failed to query chain id")?;
            anyhow::ensure!(
                actual == expected,
                "RPC endpoint reports chain id {} but {} is configured",
                actual,
                expected
            );
        }

        let contract = PublicKeyRegistry::new(contract_address, provider);

        info!(
            "Connected to PublicKeyRegistry at {} (sender {})",
            contract_address, sender
        );

        Ok(Self { contract })
    }

    /// Address of the bound contract.
    pub fn address(&self) -> Address {
        *self.contract.address()
    }
}

fn confirmation_from_receipt(call: &str, receipt: &TransactionReceipt) -> Result<Confirmation> {
    // status = false means the transaction was mined but reverted
    if !receipt.status() {
        warn!(
            "{} reverted: 0x{} in block {} (gas used: {})",
            call,
            hex::encode(receipt.transaction_hash),
            receipt.block_number.unwrap_or_default(),
            receipt.gas_used
        );
        return Err(RegistryError::Reverted {
            tx_hash: receipt.transaction_hash,
            block_number: receipt.block_number,
        });
    }

    info!(
        "{} confirmed: 0x{} in block {}",
        call,
        hex::encode(receipt.transaction_hash),
        receipt.block_number.unwrap_or_default()
    );

    Ok(Confirmation {
        tx_hash: receipt.transaction_hash,
        block_number: receipt.block_number,
    })
}

#[async_trait]
impl KeyRegistry for ContractRegistry {
    async fn is_user_registered(&self, user_id: &str) -> Result<bool> {
        let result = self
            .contract
            .isUserRegistered(user_id.to_string())
            .call()
            .await
            .map_err(RegistryError::rpc)?;
        debug!("isUserRegistered({}) = {}", user_id, result.registered);
        Ok(result.registered)
    }

    async fn get_public_key(&self, user_id: &str) -> Result<Vec<u8>> {
        let result = self
            .contract
            .getPublicKey(user_id.to_string())
            .call()
            .await
            .map_err(RegistryError::rpc)?;
        Ok(result.publicKey.to_vec())
    }

    async fn set_public_key(&self, user_id: &str, der: &[u8]) -> Result<Confirmation> {
        let tx = self
            .contract
            .setPublicKey(user_id.to_string(), Bytes::copy_from_slice(der))
            .send()
            .await
            .map_err(RegistryError::rpc)?;
        info!("setPublicKey sent: 0x{}", hex::encode(tx.tx_hash()));

        let receipt = tx.get_receipt().await.map_err(RegistryError::rpc)?;
        confirmation_from_receipt("setPublicKey", &receipt)
    }

    async fn update_public_key(&self, user_id: &str, der: &[u8]) -> Result<Confirmation> {
        let tx = self
            .contract
            .updatePublicKey(user_id.to_string(), Bytes::copy_from_slice(der))
            .send()
            .await
            .map_err(RegistryError::rpc)?;
        info!("updatePublicKey sent: 0x{}", hex::encode(tx.tx_hash()));

        let receipt = tx.get_receipt().await.map_err(RegistryError::rpc)?;
        confirmation_from_receipt("updatePublicKey", &receipt)
    }

    async fn delete_public_key(&self, user_id: &str) -> Result<Confirmation> {
        let tx = self
            .contract
            .deletePublicKey(user_id.to_string())
            .send()
            .await
            .map_err(RegistryError::rpc)?;
        info!("deletePublicKey sent: 0x{}", hex::encode(tx.tx_hash()));

        let receipt = tx.get_receipt().await.map_err(RegistryError::rpc)?;
        confirmation_from_receipt("deletePublicKey", &receipt)
    }
}
