//! Prediction submission and result image fetching

use super::picker::{decode_image, file_name_of};
use super::App;
use crate::constants::UPLOAD_FIELD;
use crate::types::{PredictResponse, ResultSlot, Session};
use crate::utils::{guess_mime, join_url};
use eframe::egui;
use futures::StreamExt;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

/// POST the file as multipart form data and decode the JSON reply.
/// Non-2xx statuses and malformed JSON both surface as request failures.
async fn run_predict(
    client: &reqwest::Client,
    server_url: &str,
    path: &Path,
) -> Result<PredictResponse, String> {
    let bytes = tokio::fs::read(path).await.map_err(|e| e.to_string())?;
    debug!(path = %path.display(), size = bytes.len(), "Uploading image");

    let part = reqwest::multipart::Part::bytes(bytes)
        .file_name(file_name_of(path))
        .mime_str(guess_mime(path))
        .map_err(|e| e.to_string())?;
    let form = reqwest::multipart::Form::new().part(UPLOAD_FIELD, part);

    let response = client
        .post(server_url)
        .multipart(form)
        .send()
        .await
        .map_err(|e| e.to_string())?;

    if !response.status().is_success() {
        return Err(format!("HTTP {}", response.status()));
    }

    response
        .json::<PredictResponse>()
        .await
        .map_err(|e| e.to_string())
}

/// Stream a result image down with byte progress, then decode it.
async fn fetch_result_image(
    client: reqwest::Client,
    url: String,
    slot: ResultSlot,
    session: Arc<Mutex<Session>>,
    ctx: egui::Context,
) {
    session.lock().unwrap().slot_mut(slot).progress = Some((0, 0));
    ctx.request_repaint();

    let result: Result<Vec<u8>, String> = async {
        let response = client.get(&url).send().await.map_err(|e| e.to_string())?;
        if !response.status().is_success() {
            return Err(format!("HTTP {}", response.status()));
        }

        let total = response.content_length().unwrap_or(0);
        let mut downloaded: u64 = 0;
        let mut bytes = Vec::with_capacity(total as usize);
        let mut stream = response.bytes_stream();
        let mut last_repaint = std::time::Instant::now();

        while let Some(chunk) = stream.next().await {
            let data = chunk.map_err(|e| e.to_string())?;
            downloaded += data.len() as u64;
            bytes.extend_from_slice(&data);
            session.lock().unwrap().slot_mut(slot).progress = Some((downloaded, total));
            if last_repaint.elapsed() >= std::time::Duration::from_millis(100) {
                ctx.request_repaint();
                last_repaint = std::time::Instant::now();
            }
        }
        Ok(bytes)
    }
    .await;

    let decoded = result.and_then(|bytes| decode_image(&bytes));
    session.lock().unwrap().finish_fetch(slot, decoded);
    ctx.request_repaint();
}

impl App {
    /// Submit the selected file to the classifier. Re-submitting while a
    /// prior request is in flight is allowed; completions apply in arrival
    /// order, so the last reply to land is the one displayed.
    pub fn submit(&mut self, ctx: &egui::Context) {
        let Some(path) = self.selected_file.clone() else {
            return;
        };
        let server_url = self.server_url();
        if server_url.is_empty() {
            self.session
                .lock()
                .unwrap()
                .report_error("No server URL configured".to_string());
            return;
        }

        info!(path = %path.display(), server = %server_url, "Submitting prediction request");
        self.session.lock().unwrap().in_flight += 1;

        let client = self.http.clone();
        let session = self.session.clone();
        let ctx = ctx.clone();

        self.runtime.spawn(async move {
            let name = file_name_of(&path);
            let result = run_predict(&client, &server_url, &path).await;

            let applied = session.lock().unwrap().finish_predict(&name, result);
            ctx.request_repaint();

            // Fetch whichever result images the reply pointed at
            if let Some(response) = applied {
                info!(
                    prediction = response.prediction.as_deref().unwrap_or("<absent>"),
                    "Prediction received"
                );
                let targets = [
                    (ResultSlot::Uploaded, response.image_url),
                    (ResultSlot::Gradcam, response.gradcam_url),
                ];
                for (slot, url) in targets {
                    let Some(url) = url else { continue };
                    tokio::spawn(fetch_result_image(
                        client.clone(),
                        join_url(&server_url, &url),
                        slot,
                        session.clone(),
                        ctx.clone(),
                    ));
                }
            }
        });
    }
}
