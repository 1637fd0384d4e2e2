//! Fixed contract call surface of the token, vesting and reward contracts

use crate::abi::{decode_output, AbiValue, FunctionSignature, ParamType};
use crate::chain::TxOutcome;
use crate::error::{DeployerError, DeployerResult};
use crate::tx::TransactionSubmitter;

use ethers::types::{Address, Bytes, U256};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Every function the deployer knows how to call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContractFunction {
    SetRewardContract,
    InitializeDistribution,
    CreateVestingSchedule,
    Release,
    Transfer,
    BalanceOf,
    Owner,
    Token,
}

impl ContractFunction {
    pub const ALL: [ContractFunction; 8] = [
        ContractFunction::SetRewardContract,
        ContractFunction::InitializeDistribution,
        ContractFunction::CreateVestingSchedule,
        ContractFunction::Release,
        ContractFunction::Transfer,
        ContractFunction::BalanceOf,
        ContractFunction::Owner,
        ContractFunction::Token,
    ];

    /// Canonical Solidity signature
    pub fn signature(&self) -> &'static str {
        match self {
            ContractFunction::SetRewardContract => "setRewardContract(address)",
            ContractFunction::InitializeDistribution => "initializeDistribution(address)",
            ContractFunction::CreateVestingSchedule => {
                "createVestingSchedule(address,uint256,uint256,uint256,uint256)"
            }
            ContractFunction::Release => "release(address)",
            ContractFunction::Transfer => "transfer(address,uint256)",
            ContractFunction::BalanceOf => "balanceOf(address)",
            ContractFunction::Owner => "owner()",
            ContractFunction::Token => "token()",
        }
    }

    /// Selectors the deployed contracts are known to use. Call data is always
    /// built from the Keccak derivation; this table only cross-checks it.
    pub fn known_selector(&self) -> [u8; 4] {
        match self {
            ContractFunction::SetRewardContract => [0x51, 0x50, 0x8f, 0x0a],
            ContractFunction::InitializeDistribution => [0x93, 0x41, 0xaa, 0x4e],
            ContractFunction::CreateVestingSchedule => [0x1b, 0xf0, 0xb0, 0x8b],
            ContractFunction::Release => [0x19, 0x16, 0x55, 0x87],
            ContractFunction::Transfer => [0xa9, 0x05, 0x9c, 0xbb],
            ContractFunction::BalanceOf => [0x70, 0xa0, 0x82, 0x31],
            ContractFunction::Owner => [0x8d, 0xa5, 0xcb, 0x5b],
            ContractFunction::Token => [0xfc, 0x0c, 0x54, 0x6a],
        }
    }

    /// Look up a function by signature; parameter names and spacing are ignored
    pub fn from_signature(signature: &str) -> DeployerResult<Self> {
        let canonical = FunctionSignature::parse(signature)
            .map_err(|_| DeployerError::UnknownSignature(signature.to_string()))?
            .canonical();
        Self::ALL
            .iter()
            .copied()
            .find(|f| f.signature() == canonical)
            .ok_or_else(|| DeployerError::UnknownSignature(signature.to_string()))
    }

    /// Read-only functions go through `eth_call` instead of a transaction
    pub fn is_view(&self) -> bool {
        matches!(
            self,
            ContractFunction::BalanceOf | ContractFunction::Owner | ContractFunction::Token
        )
    }

    /// Return types of view functions
    pub fn outputs(&self) -> &'static [ParamType] {
        match self {
            ContractFunction::BalanceOf => &[ParamType::Uint256],
            ContractFunction::Owner | ContractFunction::Token => &[ParamType::Address],
            _ => &[],
        }
    }

    pub fn function_signature(&self) -> DeployerResult<FunctionSignature> {
        FunctionSignature::parse(self.signature())
    }

    /// Call data from typed arguments
    pub fn encode(&self, args: &[AbiValue]) -> DeployerResult<Bytes> {
        self.function_signature()?.encode_call(args)
    }

    /// Call data from human-written arguments
    pub fn encode_str(&self, args: &[&str]) -> DeployerResult<Bytes> {
        let signature = self.function_signature()?;
        let values = signature.parse_values(args)?;
        signature.encode_call(&values)
    }
}

impl fmt::Display for ContractFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.signature())
    }
}

/// Result of `ContractOperator::execute`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallResult {
    /// State-changing call sent as a transaction
    Submitted(TxOutcome),
    /// Decoded return values of a view call
    Returned(Vec<AbiValue>),
}

/// Calls the fixed contract functions through a submitter
pub struct ContractOperator {
    submitter: Arc<TransactionSubmitter>,
}

impl ContractOperator {
    pub fn new(submitter: Arc<TransactionSubmitter>) -> Self {
        Self { submitter }
    }

    pub fn submitter(&self) -> &TransactionSubmitter {
        &self.submitter
    }

    pub async fn set_reward_contract(
        &self,
        target: Address,
        reward: Address,
    ) -> DeployerResult<TxOutcome> {
        info!("Setting reward contract of {:?} to {:?}", target, reward);
        self.transact(target, ContractFunction::SetRewardContract, &[reward.into()])
            .await
    }

    pub async fn initialize_distribution(
        &self,
        target: Address,
        token: Address,
    ) -> DeployerResult<TxOutcome> {
        info!("Initializing distribution on {:?} with token {:?}", target, token);
        self.transact(
            target,
            ContractFunction::InitializeDistribution,
            &[token.into()],
        )
        .await
    }

    pub async fn create_vesting_schedule(
        &self,
        vesting: Address,
        beneficiary: Address,
        amount: U256,
        start: U256,
        cliff: U256,
        duration: U256,
    ) -> DeployerResult<TxOutcome> {
        info!(
            "Creating vesting schedule on {:?} for {:?}: {} over {}s (cliff {}s, start {})",
            vesting, beneficiary, amount, duration, cliff, start
        );
        self.transact(
            vesting,
            ContractFunction::CreateVestingSchedule,
            &[
                beneficiary.into(),
                amount.into(),
                start.into(),
                cliff.into(),
                duration.into(),
            ],
        )
        .await
    }

    pub async fn release(&self, vesting: Address, beneficiary: Address) -> DeployerResult<TxOutcome> {
        info!("Releasing vested tokens on {:?} for {:?}", vesting, beneficiary);
        self.transact(vesting, ContractFunction::Release, &[beneficiary.into()])
            .await
    }

    pub async fn transfer(
        &self,
        token: Address,
        to: Address,
        amount: U256,
    ) -> DeployerResult<TxOutcome> {
        info!("Transferring {} of {:?} to {:?}", amount, token, to);
        self.transact(token, ContractFunction::Transfer, &[to.into(), amount.into()])
            .await
    }

    pub async fn balance_of(&self, token: Address, holder: Address) -> DeployerResult<U256> {
        let values = self
            .view(token, ContractFunction::BalanceOf, &[holder.into()])
            .await?;
        match values.first() {
            Some(AbiValue::Uint256(balance)) => Ok(*balance),
            _ => Err(DeployerError::Parse("balanceOf returned no uint256".to_string())),
        }
    }

    pub async fn owner(&self, contract: Address) -> DeployerResult<Address> {
        self.view_address(contract, ContractFunction::Owner).await
    }

    pub async fn token(&self, contract: Address) -> DeployerResult<Address> {
        self.view_address(contract, ContractFunction::Token).await
    }

    /// Whether the signer owns `contract`
    pub async fn check_ownership(&self, contract: Address) -> DeployerResult<bool> {
        let owner = self.owner(contract).await?;
        let signer = self.submitter.wallet_address();
        if owner == signer {
            info!("{:?} is owned by the signer", contract);
        } else {
            warn!("{:?} is owned by {:?}, not the signer {:?}", contract, owner, signer);
        }
        Ok(owner == signer)
    }

    /// Generic entry: views are answered by `eth_call`, everything else is
    /// submitted as a transaction
    pub async fn execute(
        &self,
        contract: Address,
        function: ContractFunction,
        args: &[&str],
    ) -> DeployerResult<CallResult> {
        let values = function.function_signature()?.parse_values(args)?;
        if function.is_view() {
            Ok(CallResult::Returned(self.view(contract, function, &values).await?))
        } else {
            Ok(CallResult::Submitted(
                self.transact(contract, function, &values).await?,
            ))
        }
    }

    async fn transact(
        &self,
        contract: Address,
        function: ContractFunction,
        args: &[AbiValue],
    ) -> DeployerResult<TxOutcome> {
        let data = function.encode(args)?;
        debug!("Calling {} on {:?}", function, contract);
        self.submitter.submit(Some(contract), data).await
    }

    async fn view(
        &self,
        contract: Address,
        function: ContractFunction,
        args: &[AbiValue],
    ) -> DeployerResult<Vec<AbiValue>> {
        let data = function.encode(args)?;
        let output = self.submitter.provider().call(contract, &data).await?;
        decode_output(function.outputs(), &output)
    }

    async fn view_address(
        &self,
        contract: Address,
        function: ContractFunction,
    ) -> DeployerResult<Address> {
        let values = self.view(contract, function, &[]).await?;
        match values.first() {
            Some(AbiValue::Address(address)) => Ok(*address),
            _ => Err(DeployerError::Parse(format!("{} returned no address", function))),
        }
    }
}
