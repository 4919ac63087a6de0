use serde::Serialize;

use crate::catalog::{display_name, guidance_for, ConfidenceTier, Severity};
use crate::error::{Error, Result};
use crate::math::argmax;
use crate::network::Sequential;
use crate::preprocess::preprocess;

/// How many ranked alternatives a response carries at most.
pub const TOP_K: usize = 3;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TopPrediction {
    pub disease: String,
    pub confidence_score: f64,
    pub confidence: ConfidenceTier,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictionResponse {
    pub disease: String,
    pub confidence: ConfidenceTier,
    pub severity: Severity,
    pub treatment: String,
    pub treatment_steps: Vec<String>,
    pub top_predictions: Vec<TopPrediction>,
}

/// Percentage rounded to two decimals.
pub fn percentage(score: f64) -> f64 {
    (score * 100.0 * 100.0).round() / 100.0
}

fn label_at<'a>(labels: &[&'a str], index: usize) -> Result<&'a str> {
    labels.get(index).copied().ok_or(Error::LabelMismatch {
        index,
        labels: labels.len(),
    })
}

/// Turns one row of class scores into the response record.
///
/// The winning index is the first maximum. Any index that has to be looked
/// up in `labels` (the winner or one of the top entries) and falls outside
/// it is reported as [`Error::LabelMismatch`].
///
/// Ranking is a stable descending sort, so tied scores keep ascending index
/// order and the first top entry is always the winner. A reversed ascending
/// argsort would list tied classes highest index first instead.
pub fn interpret(scores: &[f64], labels: &[&str]) -> Result<PredictionResponse> {
    let best = argmax(scores);
    let class_id = label_at(labels, best)?;
    let score = scores.get(best).copied().unwrap_or(0.0);
    let guidance = guidance_for(class_id);

    let mut ranked: Vec<usize> = (0..scores.len()).collect();
    // Stable: equal scores keep index order.
    ranked.sort_by(|&a, &b| {
        scores[b]
            .partial_cmp(&scores[a])
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let top_predictions = ranked
        .into_iter()
        .take(TOP_K)
        .map(|index| {
            let s = scores[index];
            Ok(TopPrediction {
                disease: display_name(label_at(labels, index)?).into_owned(),
                confidence_score: percentage(s),
                confidence: ConfidenceTier::from_score(s),
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(PredictionResponse {
        disease: display_name(class_id).into_owned(),
        confidence: ConfidenceTier::from_score(score),
        severity: guidance.severity,
        treatment: guidance.treatment.to_string(),
        treatment_steps: guidance.steps.iter().map(|s| s.to_string()).collect(),
        top_predictions,
    })
}

/// Decodes and classifies one uploaded image.
pub fn predict_image(model: &Sequential, labels: &[&str], bytes: &[u8]) -> Result<PredictionResponse> {
    let batch = preprocess(bytes)?;
    let rows = model.predict(&batch)?;
    let scores = rows
        .into_iter()
        .next()
        .ok_or_else(|| Error::Layer("model returned no output rows".to_string()))?;
    interpret(&scores, labels)
}
