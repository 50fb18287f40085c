//! Local usage counters kept in `analytics.json`. Tracking is best effort: a failed
//! write is logged and the counters stay in memory.

use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::{errors::Result, utils::PathResolver};
use crate::storage::json_backend::replace_file;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UsageEvent {
    AppStart,
    Calculation,
    QuoteSaved,
    Export,
    SettingsChange,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AnalyticsData {
    pub app_starts: u64,
    pub calculations_made: u64,
    pub quotes_saved: u64,
    pub csv_exports: u64,
    pub settings_changes: u64,
    /// Seconds.
    pub time_spent: u64,
    pub last_used: Option<DateTime<Utc>>,
    pub most_used_features: BTreeMap<String, u64>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AnalyticsSummary {
    pub app_starts: u64,
    pub calculations_made: u64,
    pub quotes_saved: u64,
    pub exports: u64,
    pub settings_changes: u64,
    pub minutes_used: f64,
    pub last_used: Option<DateTime<Utc>>,
    /// Most used first.
    pub top_features: Vec<(String, u64)>,
}

pub struct Analytics {
    path: PathBuf,
    data: AnalyticsData,
}

impl Analytics {
    pub fn open(base: &Path) -> Self {
        let path = PathResolver::analytics_file_in(base);
        let data = read_data(&path);
        Self { path, data }
    }

    pub fn reload(&mut self) {
        self.data = read_data(&self.path);
    }

    pub fn data(&self) -> &AnalyticsData {
        &self.data
    }

    pub fn track(&mut self, event: UsageEvent) {
        let counter = match event {
            UsageEvent::AppStart => &mut self.data.app_starts,
            UsageEvent::Calculation => &mut self.data.calculations_made,
            UsageEvent::QuoteSaved => &mut self.data.quotes_saved,
            UsageEvent::Export => &mut self.data.csv_exports,
            UsageEvent::SettingsChange => &mut self.data.settings_changes,
        };
        *counter += 1;
        self.stamp_and_save();
    }

    pub fn track_time_spent(&mut self, seconds: u64) {
        self.data.time_spent += seconds;
        self.stamp_and_save();
    }

    pub fn track_feature(&mut self, feature: &str) {
        *self
            .data
            .most_used_features
            .entry(feature.to_string())
            .or_insert(0) += 1;
        self.stamp_and_save();
    }

    pub fn summary(&self) -> AnalyticsSummary {
        let mut top_features: Vec<(String, u64)> = self
            .data
            .most_used_features
            .iter()
            .map(|(name, count)| (name.clone(), *count))
            .collect();
        top_features.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        AnalyticsSummary {
            app_starts: self.data.app_starts,
            calculations_made: self.data.calculations_made,
            quotes_saved: self.data.quotes_saved,
            exports: self.data.csv_exports,
            settings_changes: self.data.settings_changes,
            minutes_used: (self.data.time_spent as f64 / 60.0 * 100.0).round() / 100.0,
            last_used: self.data.last_used,
            top_features,
        }
    }

    pub fn reset(&mut self) -> Result<()> {
        self.data = AnalyticsData::default();
        self.save()
    }

    pub fn save(&self) -> Result<()> {
        let json = serde_json::to_string_pretty(&self.data)?;
        replace_file(&self.path, &json)
    }

    fn stamp_and_save(&mut self) {
        self.data.last_used = Some(Utc::now());
        if let Err(err) = self.save() {
            tracing::warn!(path = %self.path.display(), error = %err, "error saving analytics");
        }
    }
}

fn read_data(path: &Path) -> AnalyticsData {
    fs::read_to_string(path)
        .ok()
        .and_then(|raw| match serde_json::from_str(&raw) {
            Ok(data) => Some(data),
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "unreadable analytics, starting fresh");
                None
            }
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn counters_persist_between_sessions() {
        let temp = tempdir().expect("temp dir");
        let mut analytics = Analytics::open(temp.path());
        analytics.track(UsageEvent::AppStart);
        analytics.track(UsageEvent::Calculation);
        analytics.track(UsageEvent::Calculation);
        analytics.track_time_spent(90);

        let reopened = Analytics::open(temp.path());
        assert_eq!(reopened.data().app_starts, 1);
        assert_eq!(reopened.data().calculations_made, 2);
        assert_eq!(reopened.summary().minutes_used, 1.5);
        assert!(reopened.data().last_used.is_some());
    }

    #[test]
    fn features_rank_by_use() {
        let temp = tempdir().expect("temp dir");
        let mut analytics = Analytics::open(temp.path());
        for feature in ["calc", "export", "calc", "backup", "calc", "export"] {
            analytics.track_feature(feature);
        }
        let summary = analytics.summary();
        assert_eq!(summary.top_features[0], ("calc".to_string(), 3));
        assert_eq!(summary.top_features[1], ("export".to_string(), 2));

        analytics.reset().expect("reset");
        assert_eq!(Analytics::open(temp.path()).data(), &AnalyticsData::default());
    }

    #[test]
    fn reload_discards_unsaved_view() {
        let temp = tempdir().expect("temp dir");
        let mut analytics = Analytics::open(temp.path());
        analytics.track(UsageEvent::Calculation);
        let mut other = Analytics::open(temp.path());
        other.track(UsageEvent::Calculation);

        analytics.reload();
        assert_eq!(analytics.data().calculations_made, 2);
    }

    #[test]
    fn garbage_file_starts_fresh() {
        let temp = tempdir().expect("temp dir");
        fs::write(temp.path().join("analytics.json"), "[oops").expect("write");
        let analytics = Analytics::open(temp.path());
        assert_eq!(analytics.data().app_starts, 0);
    }
}
