//! Stand-ins for models and storage used across unit tests

#![cfg(test)]

use std::collections::HashMap;
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use uuid::Uuid;

use crate::core::error::{AppError, Result};
use crate::features::reports::models::{CreateIssueReport, IssueReport};
use crate::features::reports::ReportRepository;
use crate::modules::inference::{
    Detection, ImageClassifier, ImageTensor, InferenceError, IssuePipeline, Segmenter,
    WeightedEnsemble,
};

/// Classifier that returns the same output for every input
pub struct FixedClassifier {
    name: String,
    output: Vec<f32>,
}

impl FixedClassifier {
    pub fn arc(name: &str, output: Vec<f32>) -> Arc<dyn ImageClassifier> {
        Arc::new(Self {
            name: name.to_string(),
            output,
        })
    }
}

impl ImageClassifier for FixedClassifier {
    fn predict(&self, _input: &ImageTensor) -> std::result::Result<Vec<f32>, InferenceError> {
        Ok(self.output.clone())
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Segmenter that finds nothing and counts how often it ran
#[derive(Default)]
pub struct RecordingSegmenter {
    calls: AtomicUsize,
}

impl RecordingSegmenter {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Segmenter for RecordingSegmenter {
    fn segment(&self, _image: &RgbImage) -> std::result::Result<Vec<Detection>, InferenceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(Vec::new())
    }
}

pub fn sample_image() -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_fn(32, 24, |x, y| {
        Rgb([(x * 8) as u8, (y * 10) as u8, 128])
    }))
}

pub fn png_bytes() -> Vec<u8> {
    let mut buf = Vec::new();
    sample_image()
        .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
        .unwrap();
    buf
}

/// Pipeline whose detector emits `no_issue` and whose classifier emits `class_probs`
pub fn stub_pipeline(no_issue: f32, class_probs: Vec<f32>) -> IssuePipeline {
    IssuePipeline::new(
        WeightedEnsemble::single(FixedClassifier::arc("detector", vec![no_issue])),
        WeightedEnsemble::single(FixedClassifier::arc("classifier", class_probs)),
        Arc::new(RecordingSegmenter::default()),
        Arc::new(RecordingSegmenter::default()),
        0.5,
    )
}

pub fn new_report(username: &str, label: Option<&str>) -> CreateIssueReport {
    CreateIssueReport {
        issue_id: Uuid::now_v7(),
        username: username.to_string(),
        location: Some(r#"{"lat":1.0,"lng":2.0}"#.to_string()),
        confidence_score: 0.75,
        segmented_image: label.map(|_| format!("/static/segmented/{}.png", Uuid::new_v4())),
        label: label.map(str::to_string),
    }
}

/// Report store backed by a map, ids assigned from 1
#[derive(Default)]
pub struct InMemoryReportRepository {
    rows: Mutex<HashMap<i64, IssueReport>>,
}

#[async_trait]
impl ReportRepository for InMemoryReportRepository {
    async fn create(&self, data: &CreateIssueReport) -> Result<IssueReport> {
        let mut rows = self.rows.lock().unwrap();
        let report = IssueReport {
            id: rows.len() as i64 + 1,
            issue_id: data.issue_id,
            username: data.username.clone(),
            location: data.location.clone(),
            confidence_score: data.confidence_score,
            segmented_image: data.segmented_image.clone(),
            is_resolved: false,
            label: data.label.clone(),
            created_at: Utc::now(),
        };
        rows.insert(report.id, report.clone());
        Ok(report)
    }

    async fn list(&self, is_resolved: Option<bool>) -> Result<Vec<IssueReport>> {
        let rows = self.rows.lock().unwrap();
        let mut reports: Vec<IssueReport> = rows
            .values()
            .filter(|r| is_resolved.map_or(true, |flag| r.is_resolved == flag))
            .cloned()
            .collect();
        reports.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(reports)
    }

    async fn get_by_id(&self, id: i64) -> Result<IssueReport> {
        self.rows
            .lock()
            .unwrap()
            .get(&id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Report {} not found", id)))
    }

    async fn set_resolved(&self, id: i64, is_resolved: bool) -> Result<IssueReport> {
        let mut rows = self.rows.lock().unwrap();
        let report = rows
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("Report {} not found", id)))?;
        report.is_resolved = is_resolved;
        Ok(report.clone())
    }
}

/// Report store whose every call fails like an unreachable database
pub struct FailingReportRepository;

#[async_trait]
impl ReportRepository for FailingReportRepository {
    async fn create(&self, _data: &CreateIssueReport) -> Result<IssueReport> {
        Err(AppError::Database(sqlx::Error::PoolTimedOut))
    }

    async fn list(&self, _is_resolved: Option<bool>) -> Result<Vec<IssueReport>> {
        Err(AppError::Database(sqlx::Error::PoolTimedOut))
    }

    async fn get_by_id(&self, _id: i64) -> Result<IssueReport> {
        Err(AppError::Database(sqlx::Error::PoolTimedOut))
    }

    async fn set_resolved(&self, _id: i64, _is_resolved: bool) -> Result<IssueReport> {
        Err(AppError::Database(sqlx::Error::PoolTimedOut))
    }
}
