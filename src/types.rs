//! Common types and the shared prediction session state
//!
//! Background tasks mutate [`Session`] behind a mutex and request a repaint;
//! the UI thread reads it every frame. Completions are applied in arrival
//! order, so when requests overlap the last one to finish wins.

use chrono::{DateTime, Local};
use serde::Deserialize;

/// Decoded RGBA pixels, ready for texture upload on the UI thread.
#[derive(Clone, PartialEq)]
pub struct DecodedImage {
    pub rgba: Vec<u8>,
    pub width: usize,
    pub height: usize,
}

/// JSON reply from the classifier endpoint. Every key is optional: a reply
/// missing one of them still decodes, the field just renders as absent.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct PredictResponse {
    pub image_url: Option<String>,
    pub prediction: Option<String>,
    pub gradcam_url: Option<String>,
}

/// Which server-provided image a fetch belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultSlot {
    Uploaded,
    Gradcam,
}

/// An image display slot. `revision` bumps on every write so the UI thread
/// knows when to rebuild its texture.
#[derive(Default)]
pub struct ImageSlot {
    pub image: Option<DecodedImage>,
    pub revision: u64,
    /// (downloaded, total) while a fetch streams in
    pub progress: Option<(u64, u64)>,
}

impl ImageSlot {
    pub fn set(&mut self, image: DecodedImage) {
        self.image = Some(image);
        self.revision += 1;
        self.progress = None;
    }
}

/// One completed prediction, for the sidebar history list.
pub struct HistoryEntry {
    pub at: DateTime<Local>,
    pub file_name: String,
    pub label: Option<String>,
}

/// Session state shared between the UI thread and background tasks.
#[derive(Default)]
pub struct Session {
    /// Locally decoded rendition of the selected file. Independent of any
    /// network activity and never replaced by a server response.
    pub preview: ImageSlot,
    /// Image fetched from the server-confirmed `image_url`.
    pub uploaded: ImageSlot,
    /// Image fetched from `gradcam_url`.
    pub gradcam: ImageSlot,
    /// The decoded reply triple. Only ever replaced whole.
    pub result: Option<PredictResponse>,
    /// Preview decodes currently running.
    pub decoding: usize,
    /// Prediction requests currently in flight.
    pub in_flight: usize,
    pub history: Vec<HistoryEntry>,
    /// Most recent failure, surfaced as a toast. `error_seq` lets the UI
    /// tell a new error from one it already showed.
    pub last_error: Option<String>,
    pub error_seq: u64,
}

impl Session {
    pub fn slot_mut(&mut self, slot: ResultSlot) -> &mut ImageSlot {
        match slot {
            ResultSlot::Uploaded => &mut self.uploaded,
            ResultSlot::Gradcam => &mut self.gradcam,
        }
    }

    pub fn report_error(&mut self, message: String) {
        tracing::error!(error = %message, "session error");
        self.last_error = Some(message);
        self.error_seq += 1;
    }

    pub fn finish_preview(&mut self, file_name: &str, result: Result<DecodedImage, String>) {
        self.decoding = self.decoding.saturating_sub(1);
        match result {
            Ok(image) => self.preview.set(image),
            Err(e) => self.report_error(format!("Could not preview {}: {}", file_name, e)),
        }
    }

    /// Apply a finished prediction request. The reply triple is assigned as
    /// one value; a failure leaves the previous result untouched.
    pub fn finish_predict(
        &mut self,
        file_name: &str,
        result: Result<PredictResponse, String>,
    ) -> Option<PredictResponse> {
        self.in_flight = self.in_flight.saturating_sub(1);
        match result {
            Ok(response) => {
                self.history.push(HistoryEntry {
                    at: Local::now(),
                    file_name: file_name.to_string(),
                    label: response.prediction.clone(),
                });
                self.result = Some(response.clone());
                Some(response)
            }
            Err(e) => {
                self.report_error(format!("Prediction failed: {}", e));
                None
            }
        }
    }

    pub fn finish_fetch(&mut self, slot: ResultSlot, result: Result<DecodedImage, String>) {
        match result {
            Ok(image) => self.slot_mut(slot).set(image),
            Err(e) => {
                self.slot_mut(slot).progress = None;
                self.report_error(format!("Could not load result image: {}", e));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn px(fill: u8) -> DecodedImage {
        DecodedImage { rgba: vec![fill; 4], width: 1, height: 1 }
    }

    fn ok_response(label: &str) -> PredictResponse {
        PredictResponse {
            image_url: Some(format!("/u/{}.png", label)),
            prediction: Some(label.to_string()),
            gradcam_url: Some(format!("/g/{}.png", label)),
        }
    }

    #[test]
    fn preview_decode_touches_only_the_preview_slot() {
        let mut s = Session::default();
        s.decoding = 1;
        s.finish_preview("cat.png", Ok(px(1)));

        assert_eq!(s.preview.revision, 1);
        assert!(s.preview.image.is_some());
        assert!(s.result.is_none());
        assert!(s.uploaded.image.is_none());
        assert!(s.gradcam.image.is_none());
        assert_eq!(s.decoding, 0);
    }

    #[test]
    fn successful_reply_sets_the_triple_together() {
        let mut s = Session::default();
        s.in_flight = 1;
        let echoed = s.finish_predict("cat.png", Ok(ok_response("cat")));

        let r = s.result.as_ref().unwrap();
        assert_eq!(r.image_url.as_deref(), Some("/u/cat.png"));
        assert_eq!(r.prediction.as_deref(), Some("cat"));
        assert_eq!(r.gradcam_url.as_deref(), Some("/g/cat.png"));
        assert_eq!(echoed.as_ref(), Some(r));
        assert_eq!(s.in_flight, 0);
        assert_eq!(s.history.len(), 1);
        assert_eq!(s.history[0].label.as_deref(), Some("cat"));
    }

    #[test]
    fn reply_missing_prediction_decodes_with_field_absent() {
        let json = r#"{"image_url":"/u/1.png","gradcam_url":"/g/1.png"}"#;
        let r: PredictResponse = serde_json::from_str(json).unwrap();
        assert_eq!(r.image_url.as_deref(), Some("/u/1.png"));
        assert!(r.prediction.is_none());
        assert_eq!(r.gradcam_url.as_deref(), Some("/g/1.png"));
    }

    #[test]
    fn unknown_keys_in_reply_are_ignored() {
        let json = r#"{"prediction":"dog","confidence":0.93}"#;
        let r: PredictResponse = serde_json::from_str(json).unwrap();
        assert_eq!(r.prediction.as_deref(), Some("dog"));
        assert!(r.image_url.is_none());
    }

    #[test]
    fn failed_request_leaves_prior_result_standing() {
        let mut s = Session::default();
        s.in_flight = 1;
        s.finish_predict("cat.png", Ok(ok_response("cat")));

        s.in_flight = 1;
        let echoed = s.finish_predict("dog.png", Err("connection refused".into()));

        assert!(echoed.is_none());
        assert_eq!(s.result.as_ref().unwrap().prediction.as_deref(), Some("cat"));
        assert_eq!(s.error_seq, 1);
        assert!(s.last_error.as_ref().unwrap().contains("connection refused"));
        assert_eq!(s.history.len(), 1);
    }

    #[test]
    fn overlapping_requests_last_completion_wins() {
        let mut s = Session::default();
        s.in_flight = 2;

        // Second submission's reply arrives first, then the first one's.
        s.finish_predict("b.png", Ok(ok_response("dog")));
        s.finish_predict("a.png", Ok(ok_response("cat")));

        assert_eq!(s.result.as_ref().unwrap().prediction.as_deref(), Some("cat"));
        assert_eq!(s.in_flight, 0);
        assert_eq!(s.history.len(), 2);
    }

    #[test]
    fn fetch_failure_clears_progress_and_keeps_prior_image() {
        let mut s = Session::default();
        s.uploaded.set(px(1));
        s.uploaded.progress = Some((10, 100));

        s.finish_fetch(ResultSlot::Uploaded, Err("HTTP 404".into()));

        assert!(s.uploaded.progress.is_none());
        assert!(s.uploaded.image.is_some());
        assert_eq!(s.uploaded.revision, 1);
        assert_eq!(s.error_seq, 1);
    }

    #[test]
    fn slot_revision_bumps_on_every_write() {
        let mut slot = ImageSlot::default();
        slot.set(px(1));
        slot.set(px(2));
        assert_eq!(slot.revision, 2);
        assert_eq!(slot.image.as_ref().unwrap().rgba, vec![2; 4]);
    }
}
