//! Record-source interfaces: pull-based traversal with filtering and
//! grouping, over any supply of records.
//!
//! These never own file handles; indexed readers hand their record streams
//! to these adapters.

use pulse_common::Position;

use crate::record::BamRecord;

/// A pull-based source of records.
pub trait RecordSource {
    fn get_next(&mut self) -> Option<BamRecord>;

    /// Releases the source; the default just drops it.
    fn close(self)
    where
        Self: Sized,
    {
    }

    /// Restricts the source to records matching a predicate.
    fn filter<F>(self, predicate: F) -> FilterQuery<Self, F>
    where
        Self: Sized,
        F: FnMut(&BamRecord) -> bool,
    {
        FilterQuery {
            source: self,
            predicate,
        }
    }
}

/// Wraps any iterator of records as a source.
pub struct RecordStream<I> {
    records: I,
}

impl<I> RecordStream<I>
where
    I: Iterator<Item = BamRecord>,
{
    pub fn new(records: I) -> RecordStream<I> {
        RecordStream { records }
    }
}

impl RecordStream<std::vec::IntoIter<BamRecord>> {
    pub fn from_records(records: Vec<BamRecord>) -> Self {
        RecordStream {
            records: records.into_iter(),
        }
    }
}

impl<I> RecordSource for RecordStream<I>
where
    I: Iterator<Item = BamRecord>,
{
    fn get_next(&mut self) -> Option<BamRecord> {
        self.records.next()
    }
}

pub struct FilterQuery<S, F> {
    source: S,
    predicate: F,
}

impl<S, F> RecordSource for FilterQuery<S, F>
where
    S: RecordSource,
    F: FnMut(&BamRecord) -> bool,
{
    fn get_next(&mut self) -> Option<BamRecord> {
        while let Some(record) = self.source.get_next() {
            if (self.predicate)(&record) {
                return Some(record);
            }
        }
        None
    }
}

/// Yields only records overlapping one reference interval.
pub struct GenomicIntervalQuery<S> {
    source: S,
    reference_id: i32,
    start: Position,
    end: Position,
}

impl<S: RecordSource> GenomicIntervalQuery<S> {
    pub fn new(source: S, reference_id: i32, start: Position, end: Position) -> Self {
        GenomicIntervalQuery {
            source,
            reference_id,
            start,
            end,
        }
    }
}

impl<S: RecordSource> RecordSource for GenomicIntervalQuery<S> {
    fn get_next(&mut self) -> Option<BamRecord> {
        while let Some(record) = self.source.get_next() {
            if !record.is_mapped() || record.reference_id() != self.reference_id {
                continue;
            }
            if record.reference_start() < self.end && record.reference_end() > self.start {
                return Some(record);
            }
        }
        None
    }
}

/// Groups consecutive records that share a key.
pub struct GroupQuery<S, K, F> {
    source: S,
    key_of: F,
    pending: Option<(K, BamRecord)>,
}

impl<S, K, F> GroupQuery<S, K, F>
where
    S: RecordSource,
    K: PartialEq,
    F: FnMut(&BamRecord) -> Option<K>,
{
    pub fn new(source: S, key_of: F) -> Self {
        GroupQuery {
            source,
            key_of,
            pending: None,
        }
    }

    /// Next run of records sharing a key; `None` when exhausted.
    pub fn next_group(&mut self) -> Option<Vec<BamRecord>> {
        let (key, first) = match self.pending.take() {
            Some(pending) => pending,
            None => loop {
                let record = self.source.get_next()?;
                if let Some(key) = (self.key_of)(&record) {
                    break (key, record);
                }
            },
        };

        let mut group = vec![first];
        while let Some(record) = self.source.get_next() {
            match (self.key_of)(&record) {
                Some(next_key) if next_key == key => group.push(record),
                Some(next_key) => {
                    self.pending = Some((next_key, record));
                    break;
                }
                None => continue,
            }
        }
        Some(group)
    }
}

/// Groups consecutive records by ZMW hole number.
pub fn by_hole_number<S: RecordSource>(
    source: S,
) -> GroupQuery<S, i32, impl FnMut(&BamRecord) -> Option<i32>> {
    GroupQuery::new(source, |record| record.hole_number().ok())
}

/// Groups consecutive records by full query name.
pub fn by_name<S: RecordSource>(
    source: S,
) -> GroupQuery<S, String, impl FnMut(&BamRecord) -> Option<String>> {
    GroupQuery::new(source, |record| Some(record.full_name()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str, ref_id: i32, pos: Position, len: u32) -> BamRecord {
        let mut r = BamRecord::new();
        {
            let raw = r.raw_mut();
            raw.set_name(name).unwrap();
            if pos >= 0 {
                raw.set_mapped(true);
                raw.set_reference_id(ref_id);
                raw.set_position(pos);
                raw.set_cigar(&format!("{len}M").parse().unwrap());
            }
        }
        r
    }

    #[test]
    fn test_filter() {
        let records = vec![
            record("m/1/0_5", 0, 10, 5),
            record("m/2/0_5", 0, 50, 5),
            record("m/3/0_5", 0, 90, 5),
        ];
        let mut query =
            RecordStream::from_records(records).filter(|r| r.reference_start() >= 50);
        assert_eq!(query.get_next().unwrap().full_name(), "m/2/0_5");
        assert_eq!(query.get_next().unwrap().full_name(), "m/3/0_5");
        assert!(query.get_next().is_none());
    }

    #[test]
    fn test_interval_query() {
        let records = vec![
            record("m/1/0_5", 0, 10, 5),
            record("m/2/0_5", 1, 10, 5),
            record("m/3/0_5", 0, 100, 5),
            record("m/4/0_5", -1, -1, 0),
        ];
        let mut query = GenomicIntervalQuery::new(RecordStream::from_records(records), 0, 0, 50);
        assert_eq!(query.get_next().unwrap().full_name(), "m/1/0_5");
        assert!(query.get_next().is_none());
    }

    #[test]
    fn test_zmw_grouping() {
        let records = vec![
            record("m/1/0_5", -1, -1, 0),
            record("m/1/5_9", -1, -1, 0),
            record("m/2/0_5", -1, -1, 0),
            record("m/3/0_5", -1, -1, 0),
        ];
        let mut groups = by_hole_number(RecordStream::from_records(records));
        assert_eq!(groups.next_group().unwrap().len(), 2);
        assert_eq!(groups.next_group().unwrap().len(), 1);
        assert_eq!(groups.next_group().unwrap().len(), 1);
        assert!(groups.next_group().is_none());
    }

    #[test]
    fn test_name_grouping() {
        let records = vec![
            record("m/1/0_5", -1, -1, 0),
            record("m/1/0_5", -1, -1, 0),
            record("m/2/0_5", -1, -1, 0),
        ];
        let mut groups = by_name(RecordStream::from_records(records));
        let first = groups.next_group().unwrap();
        assert_eq!(first.len(), 2);
        assert_eq!(first[0].full_name(), "m/1/0_5");
        assert_eq!(groups.next_group().unwrap().len(), 1);
    }
}
