//! Folds activity and cost records into per-bucket hours, cost and
//! distinct-participant series aligned to one bucket-key sequence.

use std::collections::{HashMap, HashSet};

use serde::Serialize;
use tracing::{debug, trace};

use crate::bucket::{bucket_key, enumerate_buckets, BucketKey, Granularity};
use crate::filter::{DateRange, RecordFilter};
use crate::models::{ActivityRecord, CostRecord, CostType};

/// Everything that selects one aggregation pass. Memoizable as a whole.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SeriesQuery {
    pub range: DateRange,
    pub granularity: Granularity,
    pub filter: RecordFilter,
    /// Restricts the cost series to one cost type; `None` sums all costs.
    pub cost_type: Option<CostType>,
}

impl SeriesQuery {
    pub fn new(range: DateRange, granularity: Granularity) -> Self {
        Self {
            range,
            granularity,
            filter: RecordFilter::default(),
            cost_type: None,
        }
    }

    pub fn with_filter(mut self, filter: RecordFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_cost_type(mut self, cost_type: Option<CostType>) -> Self {
        self.cost_type = cost_type;
        self
    }
}

#[derive(Debug, Default)]
struct Accumulator {
    hours: f64,
    cost: f64,
    participants: HashSet<i64>,
}

/// Four parallel sequences of equal length.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeSeries {
    pub keys: Vec<BucketKey>,
    pub hours: Vec<f64>,
    pub cost: Vec<f64>,
    pub participants: Vec<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SeriesTotals {
    pub hours: f64,
    pub cost: f64,
}

impl TimeSeries {
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn totals(&self) -> SeriesTotals {
        SeriesTotals {
            hours: self.hours.iter().sum(),
            cost: self.cost.iter().sum(),
        }
    }

    /// `(key, hours, cost, participants)` rows in bucket order.
    pub fn rows(&self) -> impl Iterator<Item = (&BucketKey, f64, f64, usize)> + '_ {
        self.keys
            .iter()
            .zip(&self.hours)
            .zip(&self.cost)
            .zip(&self.participants)
            .map(|(((key, hours), cost), participants)| (key, *hours, *cost, *participants))
    }
}

pub fn aggregate(activities: &[ActivityRecord], costs: &[CostRecord], query: &SeriesQuery) -> TimeSeries {
    let keys = enumerate_buckets(query.range.start(), query.range.end(), query.granularity);
    let index: HashMap<&BucketKey, usize> = keys.iter().enumerate().map(|(i, key)| (key, i)).collect();
    let mut buckets: Vec<Accumulator> = keys.iter().map(|_| Accumulator::default()).collect();

    let mut skipped = 0usize;
    for activity in activities {
        if !query.filter.admits(activity, &query.range) {
            skipped += 1;
            continue;
        }
        let key = bucket_key(activity.activity_date, query.granularity);
        match index.get(&key) {
            Some(&slot) => {
                let bucket = &mut buckets[slot];
                bucket.hours += activity.hours;
                bucket.participants.insert(activity.personnel_id);
            }
            None => trace!(activity_id = activity.id, %key, "activity bucket not enumerated, dropping"),
        }
    }

    for cost in costs {
        if !query.filter.admits(cost, &query.range) {
            skipped += 1;
            continue;
        }
        if query.cost_type.is_some_and(|wanted| wanted != cost.cost_type) {
            skipped += 1;
            continue;
        }
        let key = bucket_key(cost.cost_date, query.granularity);
        match index.get(&key) {
            Some(&slot) => buckets[slot].cost += cost.amount,
            None => trace!(cost_id = cost.id, %key, "cost bucket not enumerated, dropping"),
        }
    }

    debug!(
        buckets = keys.len(),
        granularity = %query.granularity,
        skipped,
        "aggregated time series"
    );

    let hours = buckets.iter().map(|b| b.hours).collect();
    let cost = buckets.iter().map(|b| b.cost).collect();
    let participants = buckets.iter().map(|b| b.participants.len()).collect();

    TimeSeries {
        keys,
        hours,
        cost,
        participants,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ActivityType;
    use chrono::NaiveDate;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn activity(personnel_id: i64, lab_id: i64, project_id: Option<i64>, on: NaiveDate, hours: f64) -> ActivityRecord {
        ActivityRecord {
            id: 0,
            personnel_id,
            personnel_name: format!("person-{personnel_id}"),
            lab_id,
            lab_name: format!("lab-{lab_id}"),
            project_id,
            activity_date: on,
            hours,
            activity_type: ActivityType::Own,
            supported_lab_id: None,
            supported_lab_name: None,
            description: None,
        }
    }

    fn cost(lab_id: i64, on: NaiveDate, amount: f64, cost_type: CostType) -> CostRecord {
        CostRecord {
            id: 0,
            lab_id,
            lab_name: format!("lab-{lab_id}"),
            project_id: None,
            cost_date: on,
            amount,
            cost_type,
            category: Some("equipment".to_string()),
            description: None,
        }
    }

    fn query(start: NaiveDate, end: NaiveDate, granularity: Granularity) -> SeriesQuery {
        SeriesQuery::new(DateRange::new(start, end).unwrap(), granularity)
    }

    #[test]
    fn same_day_hours_sum_into_one_bucket() {
        let day = date(2024, 4, 2);
        let activities = vec![activity(1, 1, None, day, 3.0), activity(2, 1, None, day, 5.0)];
        let series = aggregate(&activities, &[], &query(day, day, Granularity::Day));

        assert_eq!(series.keys.len(), 1);
        assert_eq!(series.hours, vec![8.0]);
        assert_eq!(series.participants, vec![2]);
    }

    #[test]
    fn participant_counted_once_per_bucket() {
        let activities = vec![
            activity(7, 1, None, date(2024, 4, 2), 2.0),
            activity(7, 2, None, date(2024, 4, 2), 1.5),
            activity(7, 1, None, date(2024, 4, 20), 4.0),
        ];

        let daily = aggregate(&activities, &[], &query(date(2024, 4, 2), date(2024, 4, 2), Granularity::Day));
        assert_eq!(daily.participants, vec![1]);

        let monthly = aggregate(&activities, &[], &query(date(2024, 4, 1), date(2024, 4, 30), Granularity::Month));
        assert_eq!(monthly.participants, vec![1]);
        assert_eq!(monthly.hours, vec![7.5]);
    }

    #[test]
    fn all_sequences_share_length() {
        let activities = vec![activity(1, 1, None, date(2024, 1, 15), 2.0)];
        let costs = vec![cost(1, date(2024, 2, 10), 500.0, CostType::Actual)];
        for granularity in Granularity::ALL {
            let series = aggregate(&activities, &costs, &query(date(2023, 12, 20), date(2024, 3, 3), granularity));
            assert!(!series.is_empty());
            assert_eq!(series.keys.len(), series.hours.len());
            assert_eq!(series.keys.len(), series.cost.len());
            assert_eq!(series.keys.len(), series.participants.len());
        }
    }

    #[test]
    fn hour_total_matches_admitted_records() {
        let activities = vec![
            activity(1, 1, Some(10), date(2024, 1, 3), 1.5),
            activity(2, 1, Some(11), date(2024, 1, 9), 2.5),
            activity(3, 2, Some(10), date(2024, 1, 17), 4.0),
            activity(4, 1, Some(10), date(2024, 2, 29), 6.0),
        ];
        let q = query(date(2024, 1, 1), date(2024, 2, 15), Granularity::Week)
            .with_filter(RecordFilter::new(Some(1), Some(10)));
        let series = aggregate(&activities, &[], &q);

        assert_eq!(series.totals().hours, 1.5);
    }

    #[test]
    fn records_outside_range_never_contribute() {
        let activities = vec![
            activity(1, 1, None, date(2023, 12, 31), 9.0),
            activity(1, 1, None, date(2024, 1, 31), 2.0),
            activity(1, 1, None, date(2024, 2, 1), 9.0),
        ];
        let costs = vec![
            cost(1, date(2023, 12, 31), 100.0, CostType::Actual),
            cost(1, date(2024, 2, 1), 100.0, CostType::Budget),
        ];
        // The 2024 bucket would still take the February records without the day-level check.
        let series = aggregate(&activities, &costs, &query(date(2024, 1, 1), date(2024, 1, 31), Granularity::Year));

        assert_eq!(series.hours, vec![2.0]);
        assert_eq!(series.cost, vec![0.0]);
    }

    #[test]
    fn costs_fold_by_bucket_and_optional_type() {
        let costs = vec![
            cost(1, date(2024, 1, 5), 1000.0, CostType::Actual),
            cost(1, date(2024, 1, 25), 250.5, CostType::Budget),
            cost(2, date(2024, 3, 2), 400.0, CostType::Actual),
        ];
        let q = query(date(2024, 1, 1), date(2024, 3, 31), Granularity::Month);

        let all = aggregate(&[], &costs, &q);
        assert_eq!(all.cost, vec![1250.5, 0.0, 400.0]);
        assert_eq!(all.participants, vec![0, 0, 0]);

        let actual = aggregate(&[], &costs, &q.with_cost_type(Some(CostType::Actual)));
        assert_eq!(actual.cost, vec![1000.0, 0.0, 400.0]);
    }

    #[test]
    fn empty_inputs_produce_zero_series() {
        let series = aggregate(&[], &[], &query(date(2024, 1, 1), date(2024, 1, 3), Granularity::Day));
        assert_eq!(series.len(), 3);
        assert_eq!(series.hours, vec![0.0; 3]);
        assert_eq!(series.cost, vec![0.0; 3]);
        assert_eq!(series.participants, vec![0; 3]);
    }

    #[test]
    fn aggregation_does_not_mutate_inputs() {
        let activities = vec![activity(1, 1, None, date(2024, 1, 2), 3.0)];
        let q = query(date(2024, 1, 1), date(2024, 1, 31), Granularity::Month);
        let first = aggregate(&activities, &[], &q);
        let second = aggregate(&activities, &[], &q);
        assert_eq!(first, second);
        assert_eq!(activities[0].hours, 3.0);
    }

    #[test]
    fn rows_zip_parallel_sequences() {
        let activities = vec![activity(1, 1, None, date(2024, 1, 2), 3.0)];
        let costs = vec![cost(1, date(2024, 1, 3), 50.0, CostType::Actual)];
        let series = aggregate(&activities, &costs, &query(date(2024, 1, 2), date(2024, 1, 3), Granularity::Day));
        let rows: Vec<_> = series.rows().map(|(k, h, c, p)| (k.to_string(), h, c, p)).collect();
        assert_eq!(
            rows,
            vec![
                ("2024-01-02".to_string(), 3.0, 0.0, 1),
                ("2024-01-03".to_string(), 0.0, 50.0, 0),
            ]
        );
    }
}
