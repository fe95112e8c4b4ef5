use linkrelay_types::{MessageId, MessageQuery};

/// Position of the incremental sync.
///
/// Starts `Unset` (fetch the latest messages without a lower bound) and moves to
/// `Active` once a fetch has observed at least one message. The position never
/// decreases.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SyncCursor {
    #[default]
    Unset,
    Active(MessageId),
}

impl SyncCursor {
    /// Cursor resuming after `id`, or unset
    pub fn starting_after(id: Option<MessageId>) -> Self {
        id.map_or(Self::Unset, Self::Active)
    }

    pub fn position(&self) -> Option<MessageId> {
        match self {
            Self::Unset => None,
            Self::Active(id) => Some(*id),
        }
    }

    pub fn is_unset(&self) -> bool {
        matches!(self, Self::Unset)
    }

    /// Listing query for the next tick
    pub fn next_query(&self, limit: usize) -> MessageQuery {
        match self {
            Self::Unset => MessageQuery::latest(limit),
            Self::Active(id) => MessageQuery::latest(limit).min_id(*id),
        }
    }

    /// Move to the highest id observed in a tick.
    ///
    /// `None` (nothing fetched) leaves the cursor as it is. Returns `true` if the
    /// position changed.
    pub fn advance(&mut self, observed_max: Option<MessageId>) -> bool {
        let Some(observed) = observed_max else {
            return false;
        };
        let next = match self {
            Self::Unset => observed,
            Self::Active(current) => (*current).max(observed),
        };
        let changed = self.position() != Some(next);
        *self = Self::Active(next);
        changed
    }
}
