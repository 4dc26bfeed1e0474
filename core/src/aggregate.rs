//! Folding of result rows into per-transaction aggregates.
//!
//! The aggregator surfaces in-flight publishes: transactions that have not
//! seen a `PublishEnd` event and that touched the requested content type.

use crate::error::EventReaderError;
use crate::event::{PublishEvent, TransactionEvent};
use crate::rows::ResultRow;
use serde::Deserialize;
use std::collections::HashMap;

/// Decode the event carried by a row, if any.
///
/// # Errors
///
/// Returns [`EventReaderError::Decode`] when the payload is not a publish event.
pub fn decode_event(row: &ResultRow) -> Result<Option<PublishEvent>, EventReaderError> {
    row.payload()
        .map(|payload| {
            PublishEvent::deserialize(payload).map_err(|e| {
                EventReaderError::Decode(format!("row {} is not a publish event: {e}", row.offset))
            })
        })
        .transpose()
}

/// Incremental fold of events keyed by transaction id.
///
/// Transactions are kept in first-seen order; events within a transaction
/// keep arrival order.
#[derive(Debug, Default)]
pub struct TransactionFold {
    index: HashMap<String, usize>,
    transactions: Vec<TransactionEvent>,
}

impl TransactionFold {
    /// Create an empty fold.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one event into its transaction, creating it on first sight.
    pub fn record(&mut self, event: PublishEvent) {
        let slot = match self.index.get(&event.transaction_id) {
            Some(&slot) => slot,
            None => {
                let slot = self.transactions.len();
                self.index.insert(event.transaction_id.clone(), slot);
                self.transactions
                    .push(TransactionEvent::new(event.transaction_id.clone()));
                slot
            }
        };
        self.transactions[slot].record(event);
    }

    /// Number of distinct transactions seen.
    #[must_use]
    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    /// Whether no event has been folded yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }

    /// Look up a transaction by id.
    #[must_use]
    pub fn get(&self, transaction_id: &str) -> Option<&TransactionEvent> {
        self.index
            .get(transaction_id)
            .map(|&slot| &self.transactions[slot])
    }

    /// Open transactions with at least one event of the given content type.
    #[must_use]
    pub fn into_open(self, content_type: &str) -> Vec<TransactionEvent> {
        self.transactions
            .into_iter()
            .filter(|tx| !tx.closed && tx.has_content_type(content_type))
            .collect()
    }
}

/// Group result rows into open transactions for a content type.
///
/// # Errors
///
/// Returns [`EventReaderError::Decode`] if any row fails to decode; no
/// partial result is produced.
pub fn aggregate_transactions(
    rows: &[ResultRow],
    content_type: &str,
) -> Result<Vec<TransactionEvent>, EventReaderError> {
    let mut fold = TransactionFold::new();
    for row in rows {
        if let Some(event) = decode_event(row)? {
            fold.record(event);
        }
    }

    let seen = fold.len();
    let open = fold.into_open(content_type);
    tracing::debug!(
        rows = rows.len(),
        transactions = seen,
        open = open.len(),
        content_type,
        "Aggregated search rows"
    );
    Ok(open)
}

/// Decode the first event of a result set.
///
/// # Errors
///
/// Returns [`EventReaderError::NoResults`] when no row carries an event and
/// [`EventReaderError::Decode`] when the first event is malformed.
pub fn latest_event(rows: &[ResultRow]) -> Result<PublishEvent, EventReaderError> {
    rows.iter()
        .find(|row| row.payload().is_some())
        .map_or(Err(EventReaderError::NoResults), |row| {
            decode_event(row)?.ok_or(EventReaderError::NoResults)
        })
}
