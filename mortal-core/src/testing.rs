//! In-crate fakes for the backend and wallet seams.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use alloy::primitives::{Address, U256};
use async_trait::async_trait;
use mortal_sdk::client::ClientError;
use mortal_sdk::objects::{
    AgentStatus, ChainInfo, CreateOrderRequest, MenuResponse, OrderResponse, OrderStatus,
    Service, VerifyResponse,
};
use reqwest::StatusCode;
use rust_decimal::Decimal;

use crate::api::AgentApi;
use crate::verify::TxHash;
use crate::wallet::contracts::parse_address;
use crate::wallet::{TokenWallet, TxReceipt, WalletError};

pub const VAULT: &str = "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed";
pub const ATTACKER: &str = "0x000000000000000000000000000000000000dEaD";
pub const TOKEN: &str = "0x833589fCD6eDb6E08f4c7C32D4f71b54bdA02913";
pub const ACCOUNT: &str = "0x1111111111111111111111111111111111111111";

pub fn address(value: &str) -> Address {
    parse_address(value).unwrap()
}

pub fn units(n: u64) -> U256 {
    U256::from(n)
}

pub fn unavailable() -> ClientError {
    ClientError::Api {
        status: StatusCode::SERVICE_UNAVAILABLE,
        body: "agent is sleeping".into(),
    }
}

pub fn tx_hash(fill: char) -> TxHash {
    TxHash::parse(&format!("0x{}", fill.to_string().repeat(64))).unwrap()
}

pub fn service() -> Service {
    Service {
        id: "tarot".into(),
        name: "Tarot Reading".into(),
        price_usd: Decimal::new(500, 2),
        delivery_time_minutes: 2,
        shareable: true,
        description: None,
    }
}

pub fn chain() -> ChainInfo {
    ChainInfo {
        id: "base".into(),
        name: "Base".into(),
        token: "USDC".into(),
        decimals: 6,
        token_address: Some(TOKEN.into()),
    }
}

fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

/// Scriptable backend.
pub struct FakeApi {
    pub vault_address: Mutex<Option<String>>,
    pub payment_address: Mutex<String>,
    pub status_fails: Mutex<bool>,
    /// Scripted `GET /order/{id}` answers; the last one repeats. `None`
    /// simulates a transport failure.
    pub order_statuses: Mutex<VecDeque<Option<OrderStatus>>>,
    pub verify_response: Mutex<Option<VerifyResponse>>,
    pub created: Mutex<Vec<CreateOrderRequest>>,
    pub verified: Mutex<Vec<(String, TxHash)>>,
    pub status_polls: AtomicUsize,
    order_counter: AtomicUsize,
}

impl FakeApi {
    pub fn new() -> Self {
        Self {
            vault_address: Mutex::new(Some(VAULT.into())),
            payment_address: Mutex::new(VAULT.to_lowercase()),
            status_fails: Mutex::new(false),
            order_statuses: Mutex::new(VecDeque::from([Some(OrderStatus::PendingPayment)])),
            verify_response: Mutex::new(Some(VerifyResponse {
                status: OrderStatus::Paid,
                result: None,
            })),
            created: Mutex::new(Vec::new()),
            verified: Mutex::new(Vec::new()),
            status_polls: AtomicUsize::new(0),
            order_counter: AtomicUsize::new(0),
        }
    }

    pub fn script_statuses(&self, statuses: impl IntoIterator<Item = Option<OrderStatus>>) {
        *lock(&self.order_statuses) = statuses.into_iter().collect();
    }

    pub fn set_verify(&self, response: Option<VerifyResponse>) {
        *lock(&self.verify_response) = response;
    }

    pub fn polls(&self) -> usize {
        self.status_polls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AgentApi for FakeApi {
    async fn status(&self) -> Result<AgentStatus, ClientError> {
        if *lock(&self.status_fails) {
            return Err(unavailable());
        }
        Ok(AgentStatus {
            vault_address: lock(&self.vault_address).clone(),
            ..AgentStatus::default()
        })
    }

    async fn menu(&self) -> Result<MenuResponse, ClientError> {
        Ok(MenuResponse {
            services: vec![service()],
            supported_chains: vec![chain()],
            default_chain: "base".into(),
        })
    }

    async fn create_order(
        &self,
        request: &CreateOrderRequest,
    ) -> Result<OrderResponse, ClientError> {
        lock(&self.created).push(request.clone());
        let n = self.order_counter.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(OrderResponse {
            order_id: format!("ord_{n}"),
            payment_address: lock(&self.payment_address).clone(),
            price_usd: Decimal::new(500, 2),
            expires_minutes: 30,
        })
    }

    async fn order_status(&self, _order_id: &str) -> Result<OrderStatus, ClientError> {
        self.status_polls.fetch_add(1, Ordering::SeqCst);
        let mut queue = lock(&self.order_statuses);
        let next = if queue.len() > 1 {
            queue.pop_front().flatten()
        } else {
            queue.front().copied().flatten()
        };
        next.ok_or_else(unavailable)
    }

    async fn verify_payment(
        &self,
        order_id: &str,
        tx_hash: &TxHash,
    ) -> Result<VerifyResponse, ClientError> {
        lock(&self.verified).push((order_id.to_owned(), tx_hash.clone()));
        lock(&self.verify_response).clone().ok_or_else(unavailable)
    }
}

/// How a scripted wallet call should fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalletFailure {
    Reject,
    Provider,
}

impl WalletFailure {
    fn into_error(self) -> WalletError {
        match self {
            WalletFailure::Reject => WalletError::from_rpc(4001, "User denied transaction"),
            WalletFailure::Provider => WalletError::from_rpc(-32603, "execution reverted: nonce too low"),
        }
    }
}

/// Scriptable wallet.
pub struct FakeWallet {
    pub fail_submissions: Mutex<Option<WalletFailure>>,
    /// Scripted allowance reads; the last one repeats. `None` is a failed
    /// read.
    pub allowances: Mutex<VecDeque<Option<U256>>>,
    /// Receipt appears on this call (1-based); `None` never.
    pub receipt_on_call: Mutex<Option<usize>>,
    pub receipt_success: Mutex<bool>,
    pub transfers: Mutex<Vec<(Address, Address, U256)>>,
    pub approvals: Mutex<Vec<(Address, Address, U256)>>,
    pub loans: Mutex<Vec<(Address, U256, u32)>>,
    pub receipt_calls: AtomicUsize,
    pub allowance_calls: AtomicUsize,
}

impl FakeWallet {
    pub fn new() -> Self {
        Self {
            fail_submissions: Mutex::new(None),
            allowances: Mutex::new(VecDeque::from([Some(U256::ZERO)])),
            receipt_on_call: Mutex::new(Some(1)),
            receipt_success: Mutex::new(true),
            transfers: Mutex::new(Vec::new()),
            approvals: Mutex::new(Vec::new()),
            loans: Mutex::new(Vec::new()),
            receipt_calls: AtomicUsize::new(0),
            allowance_calls: AtomicUsize::new(0),
        }
    }

    pub fn script_allowances(&self, values: impl IntoIterator<Item = Option<U256>>) {
        *lock(&self.allowances) = values.into_iter().collect();
    }

    pub fn receipt_on(&self, call: Option<usize>) {
        *lock(&self.receipt_on_call) = call;
    }

    fn check_submission(&self) -> Result<(), WalletError> {
        match *lock(&self.fail_submissions) {
            Some(failure) => Err(failure.into_error()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl TokenWallet for FakeWallet {
    async fn account(&self) -> Result<Address, WalletError> {
        Ok(address(ACCOUNT))
    }

    async fn transfer(
        &self,
        token: Address,
        to: Address,
        amount: U256,
    ) -> Result<TxHash, WalletError> {
        self.check_submission()?;
        lock(&self.transfers).push((token, to, amount));
        Ok(tx_hash('a'))
    }

    async fn approve(
        &self,
        token: Address,
        spender: Address,
        amount: U256,
    ) -> Result<TxHash, WalletError> {
        self.check_submission()?;
        lock(&self.approvals).push((token, spender, amount));
        Ok(tx_hash('b'))
    }

    async fn lend(
        &self,
        vault: Address,
        amount: U256,
        interest_rate_bps: u32,
    ) -> Result<TxHash, WalletError> {
        self.check_submission()?;
        lock(&self.loans).push((vault, amount, interest_rate_bps));
        Ok(tx_hash('c'))
    }

    async fn allowance(
        &self,
        _token: Address,
        _owner: Address,
        _spender: Address,
    ) -> Result<U256, WalletError> {
        self.allowance_calls.fetch_add(1, Ordering::SeqCst);
        let mut queue = lock(&self.allowances);
        let next = if queue.len() > 1 {
            queue.pop_front().flatten()
        } else {
            queue.front().copied().flatten()
        };
        next.ok_or_else(|| WalletError::from_rpc(-32000, "header not found"))
    }

    async fn receipt(&self, _tx: &TxHash) -> Result<Option<TxReceipt>, WalletError> {
        let call = self.receipt_calls.fetch_add(1, Ordering::SeqCst) + 1;
        match *lock(&self.receipt_on_call) {
            Some(n) if call >= n => Ok(Some(TxReceipt {
                success: *lock(&self.receipt_success),
                block_number: 100,
            })),
            _ => Ok(None),
        }
    }
}
