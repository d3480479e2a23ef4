use crate::flag::country_code_to_flag;
use crate::rows::{Row, RowId, RowState};

use std::fmt;

pub const TITLE: &str = "IP Lookup";
pub const DESCRIPTION: &str = "Enter an IP address to see where it is located and its local time.";
pub const EMPTY_STATE: &str = "No IP addresses added";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    pub country: String,
    pub city: Option<String>,
    pub flag: String,
    pub local_time: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Pending,
    Loading,
    Found(Location),
    Failed(String),
}

/// What one row shows, derived from its state on demand
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowView {
    pub id: RowId,
    pub label: String,
    pub ip: String,
    pub input_disabled: bool,
    pub validation_hint: Option<&'static str>,
    pub outcome: Outcome,
}

impl RowView {
    /// `position` counts from one. The hint is hidden while the field has focus.
    pub fn of(position: usize, row: &Row, focused: bool, local_time: &str) -> Self {
        let validation_hint = if focused {
            None
        } else {
            row.validation().validation_error()
        };
        let outcome = match row.state() {
            RowState::Idle => Outcome::Pending,
            RowState::Loading => Outcome::Loading,
            RowState::Success { result, .. } => Outcome::Found(Location {
                country: result.country.clone(),
                city: result.city.clone().filter(|city| !city.is_empty()),
                flag: country_code_to_flag(&result.country_code),
                local_time: local_time.to_owned(),
            }),
            RowState::Error(message) => Outcome::Failed(message.clone()),
        };
        Self {
            id: row.id(),
            label: format!("{position}."),
            ip: row.ip().to_owned(),
            input_disabled: matches!(outcome, Outcome::Loading),
            validation_hint,
            outcome,
        }
    }
}

impl fmt::Display for RowView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.label, self.ip)?;
        if let Some(hint) = self.validation_hint {
            write!(f, " [{hint}]")?;
        }
        match &self.outcome {
            Outcome::Pending => Ok(()),
            Outcome::Loading => write!(f, " ..."),
            Outcome::Found(location) => {
                write!(f, " ->")?;
                if !location.flag.is_empty() {
                    write!(f, " {}", location.flag)?;
                }
                write!(f, " {}", location.country)?;
                if let Some(city) = &location.city {
                    write!(f, ", {city}")?;
                }
                if !location.local_time.is_empty() {
                    write!(f, " {}", location.local_time)?;
                }
                Ok(())
            }
            Outcome::Failed(message) => write!(f, " !! {message}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionView {
    pub rows: Vec<RowView>,
}

impl CollectionView {
    pub fn of<F>(rows: &[Row], focused: Option<RowId>, local_time: F) -> Self
    where
        F: Fn(RowId) -> String,
    {
        Self {
            rows: rows
                .iter()
                .enumerate()
                .map(|(index, row)| {
                    RowView::of(
                        index + 1,
                        row,
                        focused == Some(row.id()),
                        &local_time(row.id()),
                    )
                })
                .collect(),
        }
    }

    pub fn empty_state(&self) -> Option<&'static str> {
        if self.rows.is_empty() {
            Some(EMPTY_STATE)
        } else {
            None
        }
    }
}

impl fmt::Display for CollectionView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{TITLE}")?;
        if let Some(empty_state) = self.empty_state() {
            return writeln!(f, "{empty_state}");
        }
        for row in &self.rows {
            writeln!(f, "{row}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::{GatewayError, LookupGateway, LookupResponse};
    use crate::rows::{RowCollection, RowStatus};
    use crate::validation::INVALID_IP_MESSAGE;
    use async_trait::async_trait;

    struct FixedGateway(Result<LookupResponse, String>);

    #[async_trait]
    impl LookupGateway for FixedGateway {
        async fn lookup(&self, _ip: &str) -> Result<LookupResponse, GatewayError> {
            self.0.clone().map_err(GatewayError::Rejected)
        }
    }

    fn response(city: Option<&str>, country_code: &str) -> LookupResponse {
        LookupResponse {
            ip: "8.8.8.8".into(),
            country: "United States".into(),
            country_code: country_code.into(),
            timezone: "America/New_York".into(),
            city: city.map(str::to_owned),
        }
    }

    async fn looked_up(gateway: FixedGateway, ip: &str) -> Row {
        let collection = RowCollection::new(gateway);
        let id = RowId::new(1);
        collection.update_row_ip(id, ip);
        collection.lookup_row(id).await;
        collection.row(id).unwrap()
    }

    fn idle_row(ip: &str) -> Row {
        let collection = RowCollection::new(FixedGateway(Err(String::new())));
        collection.update_row_ip(RowId::new(1), ip);
        collection.row(RowId::new(1)).unwrap()
    }

    #[test]
    fn label_counts_from_one() {
        let view = RowView::of(3, &idle_row(""), false, "");
        assert_eq!(view.label, "3.");
        assert_eq!(view.outcome, Outcome::Pending);
        assert!(!view.input_disabled);
    }

    #[test]
    fn hint_only_for_unfocused_invalid_text() {
        assert_eq!(
            RowView::of(1, &idle_row("invalid"), false, "").validation_hint,
            Some(INVALID_IP_MESSAGE)
        );
        assert_eq!(RowView::of(1, &idle_row("invalid"), true, "").validation_hint, None);
        assert_eq!(RowView::of(1, &idle_row("   "), false, "").validation_hint, None);
        assert_eq!(RowView::of(1, &idle_row("8.8.8.8"), false, "").validation_hint, None);
    }

    #[tokio::test]
    async fn loading_disables_input() {
        let collection = RowCollection::new(FixedGateway(Ok(response(None, "US"))));
        let id = RowId::new(1);
        collection.update_row_ip(id, "8.8.8.8");
        let lookup = collection.lookup_row(id);
        let view = RowView::of(1, &collection.row(id).unwrap(), false, "");
        assert!(view.input_disabled);
        assert_eq!(view.outcome, Outcome::Loading);
        lookup.await;
        let view = RowView::of(1, &collection.row(id).unwrap(), false, "");
        assert!(!view.input_disabled);
    }

    #[tokio::test]
    async fn found_location() {
        let row = looked_up(FixedGateway(Ok(response(Some("Mountain View"), "us"))), "8.8.8.8").await;
        assert_eq!(row.status(), RowStatus::Success);
        let view = RowView::of(1, &row, false, "07:00:05");
        assert_eq!(
            view.outcome,
            Outcome::Found(Location {
                country: "United States".into(),
                city: Some("Mountain View".into()),
                flag: "\u{1F1FA}\u{1F1F8}".into(),
                local_time: "07:00:05".into(),
            })
        );
        assert_eq!(
            view.to_string(),
            "1. 8.8.8.8 -> \u{1F1FA}\u{1F1F8} United States, Mountain View 07:00:05"
        );
    }

    #[tokio::test]
    async fn blank_city_and_bad_country_code() {
        let row = looked_up(FixedGateway(Ok(response(Some(""), "USA"))), "8.8.8.8").await;
        let view = RowView::of(2, &row, false, "");
        match &view.outcome {
            Outcome::Found(location) => {
                assert_eq!(location.city, None);
                assert_eq!(location.flag, "");
            }
            outcome => panic!("unexpected {outcome:?}"),
        }
        assert_eq!(view.to_string(), "2. 8.8.8.8 -> United States");
    }

    #[tokio::test]
    async fn failed_lookup() {
        let row = looked_up(FixedGateway(Err("Network error".into())), "8.8.8.8").await;
        let view = RowView::of(1, &row, false, "");
        assert_eq!(view.outcome, Outcome::Failed("Network error".into()));
        assert_eq!(view.to_string(), "1. 8.8.8.8 !! Network error");
    }

    #[test]
    fn empty_collection() {
        let view = CollectionView::of(&[], None, |_| String::new());
        assert_eq!(view.empty_state(), Some(EMPTY_STATE));
        assert_eq!(view.to_string(), format!("{TITLE}\n{EMPTY_STATE}\n"));
    }

    #[test]
    fn collection_rows_in_order() {
        let collection = RowCollection::new(FixedGateway(Err(String::new())));
        let second = collection.add_row();
        collection.update_row_ip(RowId::new(1), "invalid");
        collection.update_row_ip(second, "1.1.1.1");
        let view = CollectionView::of(&collection.rows(), Some(RowId::new(1)), |_| String::new());
        assert_eq!(view.empty_state(), None);
        assert_eq!(view.rows.len(), 2);
        assert_eq!(view.rows[0].label, "1.");
        assert_eq!(view.rows[0].validation_hint, None);
        assert_eq!(view.rows[1].label, "2.");
        assert_eq!(view.rows[1].id, second);
        assert_eq!(view.to_string(), format!("{TITLE}\n1. invalid\n2. 1.1.1.1\n"));
    }
}
