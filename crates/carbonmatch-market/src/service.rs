//! Single-writer market service.
//!
//! One tokio task owns the [`CarbonMarket`] and drains a bounded request
//! queue in arrival order, so no two operations ever interleave and every
//! read observes all earlier writes. Callers hold a cloneable
//! [`MarketHandle`] and await a oneshot reply per request.
//!
//! Dropping every handle closes the queue; the task then finishes and
//! hands the market back through its `JoinHandle`.

use carbonmatch_types::{
    AccountId, Address, CarbonError, Envelope, ListingId, MatchResult, Request, Response, Result,
};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::{CarbonMarket, MarketSnapshot};

enum Command {
    Execute {
        envelope: Envelope,
        reply: oneshot::Sender<Result<Response>>,
    },
    Snapshot {
        reply: oneshot::Sender<Result<MarketSnapshot>>,
    },
    VerifySupply {
        reply: oneshot::Sender<Result<()>>,
    },
}

pub struct MarketService;

impl MarketService {
    /// Move `market` into a new task processing up to `depth` queued
    /// requests. Must be called inside a tokio runtime.
    pub fn spawn(market: CarbonMarket, depth: usize) -> (MarketHandle, JoinHandle<CarbonMarket>) {
        let (tx, rx) = mpsc::channel(depth.max(1));
        let task = tokio::spawn(run(market, rx));
        (MarketHandle { tx }, task)
    }
}

async fn run(mut market: CarbonMarket, mut rx: mpsc::Receiver<Command>) -> CarbonMarket {
    tracing::info!("Market service started");
    let mut processed: u64 = 0;
    while let Some(command) = rx.recv().await {
        processed += 1;
        match command {
            Command::Execute { envelope, reply } => {
                let Envelope { caller, request } = envelope;
                let read_only = request.is_read_only();
                let outcome = market.execute(&caller, request);
                match &outcome {
                    Err(err) if !read_only => {
                        tracing::debug!(caller = %caller.short(), %err, "Request rejected");
                    }
                    _ => {}
                }
                // The caller may have stopped waiting; the request still ran.
                let _ = reply.send(outcome);
            }
            Command::Snapshot { reply } => {
                let _ = reply.send(market.snapshot());
            }
            Command::VerifySupply { reply } => {
                let _ = reply.send(market.verify_supply());
            }
        }
    }
    tracing::info!(processed, "Market service stopped");
    market
}

/// Cloneable handle to a running [`MarketService`].
#[derive(Clone)]
pub struct MarketHandle {
    tx: mpsc::Sender<Command>,
}

impl MarketHandle {
    /// Submit `request` on behalf of `caller` and wait for its outcome.
    ///
    /// # Errors
    /// Whatever the operation returns, or `ServiceUnavailable` if the
    /// service task is gone.
    pub async fn call(&self, caller: Address, request: Request) -> Result<Response> {
        self.submit(Envelope { caller, request }).await
    }

    pub async fn submit(&self, envelope: Envelope) -> Result<Response> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Execute { envelope, reply }).await?;
        rx.await.map_err(|_| CarbonError::ServiceUnavailable)?
    }

    pub async fn snapshot(&self) -> Result<MarketSnapshot> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Snapshot { reply }).await?;
        rx.await.map_err(|_| CarbonError::ServiceUnavailable)?
    }

    pub async fn verify_supply(&self) -> Result<()> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::VerifySupply { reply }).await?;
        rx.await.map_err(|_| CarbonError::ServiceUnavailable)?
    }

    async fn send(&self, command: Command) -> Result<()> {
        self.tx
            .send(command)
            .await
            .map_err(|_| CarbonError::ServiceUnavailable)
    }

    // --- typed helpers ---

    pub async fn allocate_credit(
        &self,
        caller: Address,
        generator: AccountId,
        amount: u64,
    ) -> Result<()> {
        self.call(caller, Request::AllocateCredit { generator, amount })
            .await
            .map(drop)
    }

    pub async fn list_credit(
        &self,
        caller: Address,
        seller: AccountId,
        price: u64,
        quantity: u64,
    ) -> Result<ListingId> {
        match self
            .call(
                caller,
                Request::ListCredit {
                    seller,
                    price,
                    quantity,
                },
            )
            .await?
        {
            Response::Listed(id) => Ok(id),
            other => Err(unexpected(&other)),
        }
    }

    pub async fn buy_credit(
        &self,
        caller: Address,
        buyer: AccountId,
        quantity: u64,
    ) -> Result<MatchResult> {
        match self
            .call(caller, Request::BuyCredit { buyer, quantity })
            .await?
        {
            Response::Matched(result) => Ok(result),
            other => Err(unexpected(&other)),
        }
    }

    pub async fn get_credits(&self, caller: Address, account: AccountId) -> Result<u64> {
        match self.call(caller, Request::GetCredits { account }).await? {
            Response::Amount(amount) => Ok(amount),
            other => Err(unexpected(&other)),
        }
    }

    pub async fn check_emissions(&self, caller: Address) -> Result<Vec<AccountId>> {
        match self.call(caller, Request::CheckEmissions).await? {
            Response::Accounts(ids) => Ok(ids),
            other => Err(unexpected(&other)),
        }
    }

    pub async fn num_listings(&self, caller: Address) -> Result<usize> {
        match self.call(caller, Request::GetNumListings).await? {
            Response::Count(n) => Ok(n),
            other => Err(unexpected(&other)),
        }
    }
}

fn unexpected(response: &Response) -> CarbonError {
    CarbonError::Internal(format!("unexpected response {response:?}"))
}
