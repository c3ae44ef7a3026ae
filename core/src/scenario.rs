//! Scenario filtering
//!
//! Several tests can share one fixture file by tagging rows with a scenario name
//! in the marker column. Rows with a blank marker are baseline rows and belong
//! to every scenario.

use log::debug;

use crate::error::{CoreError, Result};
use crate::models::{DataValue, ScenarioMarker, ScenarioName};
use crate::reader::RawTable;

/// Selects the rows of a raw table that apply to the requested scenarios
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScenarioFilter {
    marker: ScenarioMarker,
    scenarios: Vec<ScenarioName>,
}

impl ScenarioFilter {
    /// Create a filter for a non-empty list of scenarios
    pub fn new(marker: ScenarioMarker, scenarios: Vec<ScenarioName>) -> Result<Self> {
        if scenarios.is_empty() {
            return Err(CoreError::InvalidRequest(
                "at least one scenario name is required".to_string(),
            ));
        }
        Ok(ScenarioFilter { marker, scenarios })
    }

    /// Marker column header
    pub fn marker(&self) -> &ScenarioMarker {
        &self.marker
    }

    /// Requested scenarios, in request order
    pub fn scenarios(&self) -> &[ScenarioName] {
        &self.scenarios
    }

    /// Whether a row with this marker cell belongs to the request
    pub fn accepts(&self, marker_value: &DataValue) -> bool {
        match marker_value {
            DataValue::Text(value) => {
                let value = value.trim();
                value.is_empty() || self.scenarios.iter().any(|s| s.as_str() == value)
            }
            DataValue::Null => true,
            DataValue::Binary(_) => false,
        }
    }

    /// Keep the applicable rows and drop the marker column.
    ///
    /// A table without the marker column is returned unchanged. Row order is
    /// preserved.
    pub fn filter(&self, raw: RawTable) -> RawTable {
        let Some(marker_index) = raw.column_index(self.marker.as_str()) else {
            return raw;
        };

        let total = raw.rows.len();
        let mut columns = raw.columns;
        columns.remove(marker_index);

        let rows: Vec<Vec<DataValue>> = raw
            .rows
            .into_iter()
            .filter(|row| {
                row.get(marker_index)
                    .map(|value| self.accepts(value))
                    .unwrap_or(true)
            })
            .map(|mut row| {
                if marker_index < row.len() {
                    row.remove(marker_index);
                }
                row
            })
            .collect();

        debug!(
            "Scenario filter {:?} kept {} of {} rows",
            self.scenarios.iter().map(ScenarioName::as_str).collect::<Vec<_>>(),
            rows.len(),
            total
        );

        RawTable::new(columns, rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn scenario(name: &str) -> ScenarioName {
        ScenarioName::new(name).unwrap()
    }

    fn users() -> RawTable {
        RawTable::new(
            vec!["[Scenario]".into(), "ID".into(), "NAME".into()],
            vec![
                vec![DataValue::text(""), DataValue::text("1"), DataValue::text("Alice")],
                vec![
                    DataValue::text("shouldSaveNewUser"),
                    DataValue::text("2"),
                    DataValue::text("Bob"),
                ],
            ],
        )
    }

    #[test]
    fn test_matching_scenario_keeps_baseline_and_tagged_rows() {
        let filter =
            ScenarioFilter::new(ScenarioMarker::default(), vec![scenario("shouldSaveNewUser")])
                .unwrap();
        let filtered = filter.filter(users());

        assert_eq!(filtered.columns, vec!["ID", "NAME"]);
        assert_eq!(
            filtered.rows,
            vec![
                vec![DataValue::text("1"), DataValue::text("Alice")],
                vec![DataValue::text("2"), DataValue::text("Bob")],
            ]
        );
    }

    #[test]
    fn test_other_scenario_keeps_only_baseline() {
        let filter = ScenarioFilter::new(ScenarioMarker::default(), vec![scenario("other")]).unwrap();
        let filtered = filter.filter(users());

        assert_eq!(
            filtered.rows,
            vec![vec![DataValue::text("1"), DataValue::text("Alice")]]
        );
    }

    #[test]
    fn test_table_without_marker_is_untouched() {
        let raw = RawTable::new(
            vec!["ID".into()],
            vec![vec![DataValue::text("1")], vec![DataValue::text("2")]],
        );
        let filter = ScenarioFilter::new(ScenarioMarker::default(), vec![scenario("any")]).unwrap();
        assert_eq!(filter.filter(raw.clone()), raw);
    }

    #[test]
    fn test_custom_marker_and_several_scenarios() {
        let raw = RawTable::new(
            vec!["ID".into(), "case".into()],
            vec![
                vec![DataValue::text("1"), DataValue::text("a")],
                vec![DataValue::text("2"), DataValue::text("b")],
                vec![DataValue::text("3"), DataValue::text("c")],
                vec![DataValue::text("4"), DataValue::Null],
            ],
        );
        let filter = ScenarioFilter::new(
            ScenarioMarker::new("case").unwrap(),
            vec![scenario("c"), scenario("a")],
        )
        .unwrap();
        let ids: Vec<DataValue> = filter.filter(raw).rows.into_iter().map(|r| r[0].clone()).collect();

        // Source order is kept, not request order
        assert_eq!(
            ids,
            vec![DataValue::text("1"), DataValue::text("3"), DataValue::text("4")]
        );
    }

    #[test]
    fn test_marker_matching_is_case_sensitive() {
        let filter = ScenarioFilter::new(ScenarioMarker::default(), vec![scenario("Save")]).unwrap();
        assert!(filter.accepts(&DataValue::text("Save")));
        assert!(filter.accepts(&DataValue::text(" Save ")));
        assert!(!filter.accepts(&DataValue::text("save")));
    }

    #[test]
    fn test_empty_request_is_rejected() {
        assert!(ScenarioFilter::new(ScenarioMarker::default(), Vec::new()).is_err());
    }

    fn marker_cell() -> impl Strategy<Value = DataValue> {
        prop_oneof![
            Just(DataValue::Null),
            Just(DataValue::text("")),
            Just(DataValue::text("  ")),
            "[a-d]".prop_map(DataValue::Text),
        ]
    }

    proptest! {
        #[test]
        fn prop_baseline_rows_always_kept_and_tagged_rows_match_exactly(
            markers in proptest::collection::vec(marker_cell(), 0..30),
            requested in proptest::collection::btree_set("[a-d]", 1..4),
        ) {
            let raw = RawTable::new(
                vec!["[Scenario]".into(), "N".into()],
                markers
                    .iter()
                    .enumerate()
                    .map(|(i, m)| vec![m.clone(), DataValue::Text(i.to_string())])
                    .collect(),
            );
            let scenarios: Vec<ScenarioName> = requested.iter().map(|s| scenario(s)).collect();
            let filter = ScenarioFilter::new(ScenarioMarker::default(), scenarios).unwrap();
            let kept: Vec<DataValue> = filter.filter(raw).rows.into_iter().map(|r| r[0].clone()).collect();

            let expected: Vec<DataValue> = markers
                .iter()
                .enumerate()
                .filter(|(_, m)| m.is_blank() || requested.contains(m.as_text().unwrap_or_default()))
                .map(|(i, _)| DataValue::Text(i.to_string()))
                .collect();

            prop_assert_eq!(kept, expected);
        }
    }
}
