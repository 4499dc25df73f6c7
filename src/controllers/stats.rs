//! Summary figures derived from a loaded collection.
//!
//! Everything here is recomputed from scratch on each call.

use std::collections::HashSet;
use std::hash::Hash;

use chrono::{NaiveDate, NaiveDateTime};

use crate::domain::{Banner, Order, DELIVERED, PENDING};

pub fn count_where<T>(items: &[T], predicate: impl Fn(&T) -> bool) -> usize {
    items.iter().filter(|item| predicate(item)).count()
}

pub fn sum_by<T>(items: &[T], value: impl Fn(&T) -> f64) -> f64 {
    items.iter().map(value).sum()
}

/// Number of distinct keys; items without a key are not counted.
pub fn distinct_by<T, K: Eq + Hash>(items: &[T], key: impl Fn(&T) -> Option<K>) -> usize {
    items.iter().filter_map(key).collect::<HashSet<_>>().len()
}

/// Figures shown on the dashboard and above the orders table.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct OrderSummary {
    pub total_orders: usize,
    pub revenue: f64,
    pub orders_today: usize,
    pub active_customers: usize,
    pub pending: usize,
    pub delivered: usize,
}

impl OrderSummary {
    pub fn compute(orders: &[Order], today: NaiveDate) -> Self {
        Self {
            total_orders: orders.len(),
            revenue: sum_by(orders, Order::total),
            orders_today: count_where(orders, |o| o.created_on() == Some(today)),
            active_customers: distinct_by(orders, |o| o.user.identity()),
            pending: count_where(orders, |o| o.status_name() == Some(PENDING)),
            delivered: count_where(orders, |o| o.status_name() == Some(DELIVERED)),
        }
    }
}

pub fn active_banners(banners: &[Banner], now: NaiveDateTime) -> usize {
    count_where(banners, |b| b.is_active(now))
}
