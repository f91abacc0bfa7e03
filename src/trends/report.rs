//! The date × topic trend table.

use std::io::Write;

use chrono::NaiveDate;

/// One topic's counts across the report window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicRow {
    /// Canonical topic.
    pub topic: String,
    /// One count per report date, aligned with [`TrendReport::dates`].
    pub counts: Vec<u64>,
    /// Sum of `counts`.
    pub total: u64,
}

/// Topic rows by date columns.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TrendReport {
    /// Column dates, ascending.
    pub dates: Vec<NaiveDate>,
    /// Rows, by total descending then topic name.
    pub rows: Vec<TopicRow>,
}

impl TrendReport {
    /// True when no topic was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Writes the table as CSV: header `Topic,<YYYY-MM-DD>...`, one row per topic.
    ///
    /// # Errors
    ///
    /// Returns the csv writer error if serialization or the underlying write fails.
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<(), csv::Error> {
        let mut csv = csv::Writer::from_writer(writer);

        let mut header = Vec::with_capacity(self.dates.len() + 1);
        header.push("Topic".to_string());
        header.extend(self.dates.iter().map(|date| date.format("%Y-%m-%d").to_string()));
        csv.write_record(&header)?;

        for row in &self.rows {
            let mut record = Vec::with_capacity(row.counts.len() + 1);
            record.push(row.topic.clone());
            record.extend(row.counts.iter().map(ToString::to_string));
            csv.write_record(&record)?;
        }

        csv.flush()?;
        Ok(())
    }
}
