//! Filters for history reads.


/// Range, order and page of a history read.
///
/// Bounds are inclusive. A `limit` or `offset` of zero is treated as absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryQuery {
    pub from_ts: Option<i64>,
    pub to_ts: Option<i64>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
    pub ascending: bool,
}


impl Default for HistoryQuery {
    fn default() -> Self {
        Self {
            from_ts: None,
            to_ts: None,
            limit: None,
            offset: None,
            ascending: true,
        }
    }
}


impl HistoryQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn since(mut self, ts: i64) -> Self {
        self.from_ts = Some(ts);
        self
    }

    pub fn until(mut self, ts: i64) -> Self {
        self.to_ts = Some(ts);
        self
    }

    pub fn take(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn skip(mut self, offset: u32) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn descending(mut self) -> Self {
        self.ascending = false;
        self
    }

    pub(crate) fn effective_limit(&self) -> Option<u32> {
        self.limit.filter(|n| *n > 0)
    }

    pub(crate) fn effective_offset(&self) -> Option<u32> {
        self.offset.filter(|n| *n > 0)
    }
}
