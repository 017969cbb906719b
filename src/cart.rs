//! Client-side quadratic voting cart.
//!
//! Votes accumulate per project until the whole ballot is submitted in a
//! single relay message. The total weight across items never exceeds
//! [`VOTE_BUDGET`]: adding or incrementing past it leaves the cart unchanged
//! and reports why, while a typed amount is clamped to the budget left.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Total vote weight a single ballot may distribute
pub const VOTE_BUDGET: u32 = 100;

/// Cart error
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CartError {
    /// Project is already in the cart
    #[error("Project {0} is already in the cart")]
    AlreadyInCart(String),
    /// No budget left for a new project
    #[error("Vote budget of {} is exhausted", VOTE_BUDGET)]
    BudgetExhausted,
    /// Requested change would exceed the budget
    #[error("Requested total {requested} exceeds the vote budget of {}", VOTE_BUDGET)]
    OverBudget {
        /// Total the change would have produced
        requested: u32,
    },
    /// Project is not in the cart
    #[error("Project {0} is not in the cart")]
    UnknownItem(String),
}

/// A project and the vote weight assigned to it
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CartItem {
    /// Project id
    pub id: String,
    /// Display name
    pub name: String,
    /// Vote weight
    pub amount: u32,
}

/// Ordered collection of cart items
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VoteCart {
    items: Vec<CartItem>,
}

impl VoteCart {
    /// An empty cart
    pub fn new() -> Self {
        Self::default()
    }

    /// Items in insertion order
    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    /// Whether the cart has no items
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Whether a project is in the cart
    pub fn contains(&self, id: &str) -> bool {
        self.items.iter().any(|item| item.id == id)
    }

    /// Sum of all vote weights
    pub fn total(&self) -> u32 {
        self.items.iter().map(|item| item.amount).sum()
    }

    /// Weight still available
    pub fn remaining(&self) -> u32 {
        VOTE_BUDGET.saturating_sub(self.total())
    }

    /// Add a project with a weight of 1
    pub fn add(&mut self, id: impl Into<String>, name: impl Into<String>) -> Result<(), CartError> {
        let id = id.into();
        if self.contains(&id) {
            return Err(CartError::AlreadyInCart(id));
        }
        if self.total() >= VOTE_BUDGET {
            return Err(CartError::BudgetExhausted);
        }
        self.items.push(CartItem {
            id,
            name: name.into(),
            amount: 1,
        });
        Ok(())
    }

    /// Add one vote to a project. Returns the new weight.
    pub fn increment(&mut self, id: &str) -> Result<u32, CartError> {
        let position = self.position(id)?;
        let amount = self.items[position].amount.saturating_add(1);
        self.update(position, amount)
    }

    /// Remove one vote from a project, stopping at zero. Returns the new weight.
    pub fn decrement(&mut self, id: &str) -> Result<u32, CartError> {
        let position = self.position(id)?;
        let amount = self.items[position].amount.saturating_sub(1);
        self.update(position, amount)
    }

    /// Set a project's weight as typed by the user. The value is clamped to
    /// `0..=remaining() + current`, so an oversized entry takes whatever
    /// budget is left. Returns the new weight.
    pub fn set_amount(&mut self, id: &str, amount: i64) -> Result<u32, CartError> {
        let position = self.position(id)?;
        let ceiling = self.remaining() + self.items[position].amount;
        let amount = u32::try_from(amount.clamp(0, i64::from(ceiling))).unwrap_or(ceiling);
        self.update(position, amount)
    }

    fn update(&mut self, position: usize, amount: u32) -> Result<u32, CartError> {
        let others = self.total() - self.items[position].amount;
        let requested = others.saturating_add(amount);
        if requested > VOTE_BUDGET {
            return Err(CartError::OverBudget { requested });
        }

        self.items[position].amount = amount;
        Ok(amount)
    }

    /// Drop a project from the cart
    pub fn remove(&mut self, id: &str) -> Option<CartItem> {
        let position = self.position(id).ok()?;
        Some(self.items.remove(position))
    }

    /// Empty the cart, e.g. after a ballot was submitted
    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Weight per project id, the shape of a submitted ballot
    pub fn votes(&self) -> BTreeMap<String, u32> {
        self.items
            .iter()
            .map(|item| (item.id.clone(), item.amount))
            .collect()
    }

    fn position(&self, id: &str) -> Result<usize, CartError> {
        self.items
            .iter()
            .position(|item| item.id == id)
            .ok_or_else(|| CartError::UnknownItem(id.to_owned()))
    }

    fn amount(&self, id: &str) -> Result<u32, CartError> {
        self.position(id).map(|position| self.items[position].amount)
    }
}
