//! Strict decoding of analysis responses.
//!
//! A response that does not match the schema fails here, at the boundary,
//! with [`InferenceError::MalformedResponse`]. Nothing downstream ever
//! sees an unchecked shape.

use serde_json::Value;

use super::InferenceError;
use crate::db::models::AnalysisResult;
use crate::findings::COORD_SPACE;

pub fn decode_analysis(raw: Value) -> Result<AnalysisResult, InferenceError> {
    let result: AnalysisResult = serde_json::from_value(raw)
        .map_err(|err| InferenceError::MalformedResponse(err.to_string()))?;
    validate(&result)?;
    Ok(result)
}

fn validate(result: &AnalysisResult) -> Result<(), InferenceError> {
    if result.diagnoses.is_empty() {
        return Err(InferenceError::MalformedResponse(
            "diagnosis list is empty".to_string(),
        ));
    }

    for (index, diagnosis) in result.diagnoses.iter().enumerate() {
        if !(0.0..=100.0).contains(&diagnosis.likelihood) {
            return Err(InferenceError::MalformedResponse(format!(
                "diagnosis {index} likelihood {} outside 0-100",
                diagnosis.likelihood
            )));
        }
    }

    for (index, bbox) in result.bounding_boxes.iter().enumerate() {
        let in_space = |v: f64| (0.0..=COORD_SPACE).contains(&v);
        if !(in_space(bbox.xmin) && in_space(bbox.xmax) && in_space(bbox.ymin) && in_space(bbox.ymax))
        {
            return Err(InferenceError::MalformedResponse(format!(
                "bounding box {index} outside the 0-{COORD_SPACE:.0} coordinate space"
            )));
        }
        if bbox.xmin > bbox.xmax || bbox.ymin > bbox.ymax {
            return Err(InferenceError::MalformedResponse(format!(
                "bounding box {index} has inverted extents"
            )));
        }
        if !(0.0..=100.0).contains(&bbox.confidence) {
            return Err(InferenceError::MalformedResponse(format!(
                "bounding box {index} confidence {} outside 0-100",
                bbox.confidence
            )));
        }
    }

    Ok(())
}
