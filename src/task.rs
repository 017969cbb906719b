use futures_timer::Delay;
use futures_util::ready;
use pin_project::pin_project;

use ethers_core::{
    abi::{self, Event, RawLog},
    types::{TransactionReceipt, H256, U64},
};
use std::{
    future::Future,
    pin::Pin,
    task::{Context, Poll},
    time::Duration,
};

use crate::wallet::{WalletError, WalletProvider};

/// Confirmation error
#[derive(Debug, thiserror::Error)]
pub enum ConfirmationError {
    /// Mined with a failed status
    #[error("Transaction {:?} reverted", .0.transaction_hash)]
    Reverted(Box<TransactionReceipt>),
    /// Not mined within the retry budget
    #[error("Transaction not mined after the configured number of polls")]
    TooManyRetries,
    /// The wallet errored while polling
    #[error(transparent)]
    Wallet(#[from] WalletError),
}

/// Decode the receipt logs emitted as `event`. Logs of other events are
/// skipped.
pub fn decode_logs(receipt: &TransactionReceipt, event: &Event) -> Vec<abi::Log> {
    receipt
        .logs
        .iter()
        .filter_map(|log| {
            event
                .parse_log(RawLog {
                    topics: log.topics.clone(),
                    data: log.data.to_vec(),
                })
                .ok()
        })
        .collect()
}

// convenience
type PinBoxFut<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A sent transaction, resolving to its receipt once mined
///
/// Retries are decremented each time the wallet reports no receipt yet.
/// Wallet errors are not retried.
#[pin_project(project = PendingProj)]
pub struct PendingTransaction<'a, W: WalletProvider + ?Sized> {
    /// Transaction hash
    tx_hash: H256,
    /// Wallet
    wallet: &'a W,
    /// polling state
    state: PendingState<'a>,
    /// retries
    retries: usize,
    /// delay between requests
    delay: Duration,
}

const DEFAULT_RETRIES: usize = 40;
const DEFAULT_DELAY: u64 = 3;

enum PendingState<'a> {
    /// Waiting before the next receipt request
    Delaying(Pin<Box<Delay>>),
    /// Receipt request in flight
    Requesting(PinBoxFut<'a, Result<Option<TransactionReceipt>, WalletError>>),
}

impl<'a, W: WalletProvider + ?Sized> std::fmt::Debug for PendingTransaction<'a, W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingTransaction")
            .field("tx_hash", &self.tx_hash)
            .field("retries", &self.retries)
            .finish()
    }
}

impl<'a, W: WalletProvider + ?Sized> PendingTransaction<'a, W> {
    /// Instantiate a pending transaction
    pub fn new(tx_hash: H256, wallet: &'a W) -> Self {
        let delay = Duration::from_secs(DEFAULT_DELAY);
        Self {
            tx_hash,
            wallet,
            state: PendingState::Delaying(Box::pin(Delay::new(delay))),
            retries: DEFAULT_RETRIES,
            delay,
        }
    }

    /// The transaction hash
    pub fn tx_hash(&self) -> H256 {
        self.tx_hash
    }

    /// Set the number of polls that may come back without a receipt
    #[must_use]
    pub fn retries(mut self, retries: usize) -> Self {
        self.retries = retries;
        self
    }

    /// Sets the polling delay (the time between poll attempts)
    #[must_use]
    pub fn polling_interval<T: Into<Duration>>(mut self, duration: T) -> Self {
        self.delay = duration.into();

        if matches!(self.state, PendingState::Delaying(_)) {
            self.state = PendingState::Delaying(Box::pin(Delay::new(self.delay)))
        }

        self
    }
}

macro_rules! make_request {
    ($cx:ident, $this:ident) => {
        *$this.state = PendingState::Requesting($this.wallet.transaction_receipt(*$this.tx_hash));
        $cx.waker().wake_by_ref();
        return Poll::Pending
    };
}

macro_rules! delay_it {
    ($cx:ident, $this:ident) => {
        *$this.state = PendingState::Delaying(Box::pin(Delay::new(*$this.delay)));
        $cx.waker().wake_by_ref();
        return Poll::Pending
    };
}

impl<'a, W: WalletProvider + ?Sized> Future for PendingTransaction<'a, W> {
    type Output = Result<TransactionReceipt, ConfirmationError>;

    #[tracing::instrument(
        skip(self),
        fields(tx_hash = ?self.tx_hash, retries_remaining = self.retries)
    )]
    fn poll(self: Pin<&mut Self>, cx: &mut Context) -> Poll<Self::Output> {
        let this = self.project();

        let receipt_fut = match this.state {
            // early returns only :)
            PendingState::Delaying(delay) => {
                ready!(delay.as_mut().poll(cx));
                make_request!(cx, this);
            }
            // just unpack the future
            PendingState::Requesting(fut) => fut,
        };

        let receipt = match ready!(receipt_fut.as_mut().poll(cx)) {
            Ok(receipt) => receipt,
            Err(e) => {
                tracing::warn!(error = %e, "Receipt request failed");
                return Poll::Ready(Err(e.into()));
            }
        };

        let receipt = match receipt {
            Some(receipt) => receipt,
            None => {
                if *this.retries == 0 {
                    return Poll::Ready(Err(ConfirmationError::TooManyRetries));
                }
                *this.retries -= 1;
                delay_it!(cx, this);
            }
        };

        if receipt.status == Some(U64::zero()) {
            tracing::warn!(block = ?receipt.block_number, "Transaction reverted");
            return Poll::Ready(Err(ConfirmationError::Reverted(Box::new(receipt))));
        }
        tracing::info!(block = ?receipt.block_number, "Transaction confirmed");
        Poll::Ready(Ok(receipt))
    }
}
