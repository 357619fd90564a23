//! # Model Training Endpoint
//!
//! `POST /train` turns three recorded hotword samples into a model file.
//!
//! ## Pipeline (every step may short-circuit with an error envelope):
//! 1. **Auth**: check the `api_key` query parameter against the stored key
//! 2. **Collect**: read the `files` parts of the multipart body
//! 3. **Count**: exactly `training.required_files` uploads
//! 4. **Validate**: per file, content type, size ceiling, WAV header
//! 5. **Persist**: write uploads to fresh temp paths (+1 output path)
//! 6. **Invoke**: run the training tool on those paths
//! 7. **Collect artifact**: read the model back from the output path
//! 8. **Cleanup**: remove every temp path
//! 9. **Respond**: base64 JSON (`text=true`, default) or raw bytes
//!
//! ## Query parameters:
//! - `text`: `true`/`false` (also `1`/`0`, `yes`/`no`, `on`/`off`)
//! - `api_key`: shared secret, required when a key file is configured

use crate::error::{AppError, AppResult};
use crate::state::AppState;
use crate::storage::TempFileSet;
use crate::wav;
use actix_multipart::Multipart;
use actix_web::{http::header, web, HttpResponse};
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;
use futures_util::stream::StreamExt;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Declared content type every upload must carry.
pub const WAV_MIMETYPE: &str = "audio/wav";

/// Media type of the binary model response.
pub const MODEL_MIMETYPE: &str = "application/octet-stream";

/// Multipart field carrying the samples.
const FILES_FIELD: &str = "files";

#[derive(Debug, Default, Deserialize)]
pub struct TrainParams {
    pub text: Option<String>,
    pub api_key: Option<String>,
}

/// One uploaded sample, alive for the duration of the request.
#[derive(Debug)]
pub struct UploadedFile {
    pub filename: String,
    pub content_type: Option<String>,
    /// Buffered bytes, at most `max_file_size + 1`
    pub content: Vec<u8>,
    /// Bytes the client actually sent for this part
    pub size: usize,
}

/// Successful JSON response (`text=true`).
#[derive(Debug, Serialize)]
pub struct ModelResponse {
    pub err: bool,
    pub name: String,
    pub data: String,
}

/// The trained model, ready to be sent back.
#[derive(Debug)]
pub struct ModelArtifact {
    pub name: String,
    pub data: Vec<u8>,
}

/// Handler for `POST /train`.
///
/// ## Rust Concepts:
/// - **Extractors**: `web::Data`, `web::Query` and `Multipart` are pulled
///   out of the request by actix before the handler body runs. A malformed
///   query string is turned into an error envelope by the `QueryConfig`
///   registered in [`crate::handlers::configure`].
/// - **AppResult**: returning `Err(AppError)` renders the `{err, errmsg}`
///   envelope through `ResponseError`.
///
/// ## Why the multipart body is streamed:
/// The key check runs before the body is touched, and no part is buffered
/// past the size ceiling, so rejected requests cost little memory.
pub async fn train(
    state: web::Data<AppState>,
    params: web::Query<TrainParams>,
    payload: Multipart,
) -> AppResult<HttpResponse> {
    let params = params.into_inner();
    let as_text = parse_flag(params.text.as_deref(), true)?;

    let result = run_pipeline(&state, params.api_key.as_deref(), payload).await;
    let artifact = match result {
        Ok(artifact) => artifact,
        Err(e) => {
            warn!(kind = e.kind(), error = %e, "Training request rejected");
            return Err(e);
        }
    };

    info!(name = %artifact.name, bytes = artifact.data.len(), as_text, "Model generated");
    Ok(encode_response(artifact, as_text))
}

async fn run_pipeline(
    state: &AppState,
    api_key: Option<&str>,
    payload: Multipart,
) -> AppResult<ModelArtifact> {
    authorize(state, api_key)?;

    let training = &state.config.training;
    let (uploads, count) =
        collect_uploads(payload, training.required_files, training.max_file_size).await?;

    if count != training.required_files {
        return Err(AppError::FileCount(format!(
            "Incorrect number of files: {} ({} required)",
            count, training.required_files
        )));
    }

    let contents = uploads
        .into_iter()
        .map(|upload| validate_upload(upload, training.max_file_size))
        .collect::<AppResult<Vec<_>>>()?;

    let data = generate_model(state, &contents).await?;
    let name = format!("model-{}.{}", Uuid::now_v7(), training.model_suffix);

    Ok(ModelArtifact { name, data })
}

/// Reject the request unless the supplied key matches the configured one.
/// Runs before any of the body is read.
fn authorize(state: &AppState, api_key: Option<&str>) -> AppResult<()> {
    match state.api_keys.verify(api_key) {
        Ok(true) => Ok(()),
        Ok(false) => Err(AppError::Authentication("Invalid API Key".to_string())),
        Err(e) => {
            error!(path = %state.api_keys.path().display(), error = %e, "Unable to read API key");
            Err(AppError::Authentication("Unable to verify API Key".to_string()))
        }
    }
}

/// Read the `files` parts of the body.
///
/// Returns the first `required` uploads and the total number of `files`
/// parts seen. Parts past `required` are drained without buffering, and no
/// part buffers more than `max_file_size + 1` bytes.
async fn collect_uploads(
    mut payload: Multipart,
    required: usize,
    max_file_size: usize,
) -> AppResult<(Vec<UploadedFile>, usize)> {
    let mut uploads = Vec::with_capacity(required);
    let mut count = 0;

    while let Some(item) = payload.next().await {
        let mut field = item?;

        let is_upload = field
            .content_disposition()
            .and_then(|cd| cd.get_name())
            .is_some_and(|name| name == FILES_FIELD);
        let keep = is_upload && uploads.len() < required;

        let filename = field
            .content_disposition()
            .and_then(|cd| cd.get_filename())
            .unwrap_or("<unnamed>")
            .to_string();
        let content_type = field.content_type().map(|mime| mime.essence_str().to_string());

        let mut content = Vec::new();
        let mut size = 0;
        while let Some(chunk) = field.next().await {
            let chunk = chunk?;
            size += chunk.len();
            if keep && content.len() <= max_file_size {
                let room = max_file_size + 1 - content.len();
                content.extend_from_slice(&chunk[..chunk.len().min(room)]);
            }
        }

        if !is_upload {
            continue;
        }
        count += 1;
        if keep {
            debug!(filename = %filename, ?content_type, size, "Upload received");
            uploads.push(UploadedFile {
                filename,
                content_type,
                content,
                size,
            });
        }
    }

    Ok((uploads, count))
}

/// Check one upload: content type, then size, then WAV header.
fn validate_upload(upload: UploadedFile, max_file_size: usize) -> AppResult<Vec<u8>> {
    let content_type = upload.content_type.as_deref().unwrap_or("none");
    if content_type != WAV_MIMETYPE {
        return Err(AppError::ContentType(format!(
            "Wrong mimetype for file {}: {}",
            upload.filename, content_type
        )));
    }

    if upload.size > max_file_size {
        return Err(AppError::FileSize(format!(
            "File {} exceeds max size ({} bytes)",
            upload.filename, max_file_size
        )));
    }

    if !wav::is_valid_wav(&upload.content) {
        return Err(AppError::FormatValidation(format!(
            "Wrong file format: {}. Should be WAV.",
            upload.filename
        )));
    }

    // Format fields are informational only
    if let Some(header) = wav::parse_header(&upload.content) {
        debug!(
            filename = %upload.filename,
            riff_size = header.riff_size,
            fmt_chunk_size = header.fmt_chunk_size,
            "WAV header accepted"
        );
        if let Some(format) = header.format {
            debug!(
                filename = %upload.filename,
                audio_format = format.audio_format,
                channels = format.channels,
                sample_rate = format.sample_rate,
                byte_rate = format.byte_rate,
                block_align = format.block_align,
                bits_per_sample = format.bits_per_sample,
                "WAV format"
            );
        }
    }

    Ok(upload.content)
}

/// Persist the samples, run the training tool and read the model back.
///
/// The temp files are removed before this returns, on success explicitly and
/// on every early return when `files` is dropped.
async fn generate_model(state: &AppState, contents: &[Vec<u8>]) -> AppResult<Vec<u8>> {
    let write_error = |e: std::io::Error| {
        AppError::FilesystemWrite(format!("Error writing to filesystem: {}", e))
    };

    let files = TempFileSet::reserve(&state.config.training.tmp_dir, contents.len())
        .await
        .map_err(write_error)?;
    debug!(paths = ?files.paths(), "Temp paths reserved");
    files.persist(contents).await.map_err(write_error)?;

    let _job = state.start_job();
    let result = state
        .invoker
        .invoke(files.inputs(), files.output())
        .await
        .map_err(|e| {
            state.record_training(false, 0);
            AppError::Invocation(format!("Error generating model: {}", e))
        })?;
    state.record_training(result.success, result.duration.as_millis() as u64);

    if !result.success {
        return Err(AppError::Invocation(result.failure_message()));
    }

    let model = tokio::fs::read(files.output()).await;
    files.cleanup().await;

    model.map_err(|e| {
        AppError::FilesystemRead(format!("Error reading model from filesystem: {}", e))
    })
}

fn encode_response(artifact: ModelArtifact, as_text: bool) -> HttpResponse {
    if as_text {
        HttpResponse::Ok().json(ModelResponse {
            err: false,
            data: BASE64_STANDARD.encode(&artifact.data),
            name: artifact.name,
        })
    } else {
        HttpResponse::Ok()
            .content_type(MODEL_MIMETYPE)
            .insert_header((
                header::CONTENT_DISPOSITION,
                format!("attachment; filename={}", artifact.name),
            ))
            .body(artifact.data)
    }
}

/// Parse a boolean query flag, `default` when absent.
fn parse_flag(raw: Option<&str>, default: bool) -> AppResult<bool> {
    let Some(raw) = raw else {
        return Ok(default);
    };
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(AppError::BadRequest(format!(
            "Invalid boolean value for text: {}",
            raw
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upload(content_type: Option<&str>, content: Vec<u8>) -> UploadedFile {
        UploadedFile {
            filename: "sample.wav".to_string(),
            content_type: content_type.map(str::to_string),
            size: content.len(),
            content,
        }
    }

    #[test]
    fn test_parse_flag() {
        assert!(parse_flag(None, true).unwrap());
        assert!(!parse_flag(Some("false"), true).unwrap());
        assert!(!parse_flag(Some("0"), true).unwrap());
        assert!(parse_flag(Some("Yes"), false).unwrap());
        assert!(matches!(parse_flag(Some("maybe"), true), Err(AppError::BadRequest(_))));
    }

    #[test]
    fn test_validation_order() {
        let wav = wav::pcm_wav(16_000, 1, &[0; 8]);

        // Content type is checked before anything else
        let err = validate_upload(upload(Some("audio/mpeg"), b"junk".to_vec()), 10).unwrap_err();
        assert_eq!(err.to_string(), "Wrong mimetype for file sample.wav: audio/mpeg");

        let err = validate_upload(upload(None, wav.clone()), 1024).unwrap_err();
        assert!(matches!(err, AppError::ContentType(_)));

        // Size before format
        let err = validate_upload(upload(Some(WAV_MIMETYPE), vec![0; 11]), 10).unwrap_err();
        assert_eq!(err.to_string(), "File sample.wav exceeds max size (10 bytes)");

        let err = validate_upload(upload(Some(WAV_MIMETYPE), b"not a wav".to_vec()), 1024).unwrap_err();
        assert_eq!(err.to_string(), "Wrong file format: sample.wav. Should be WAV.");

        let content = validate_upload(upload(Some(WAV_MIMETYPE), wav.clone()), 1024).unwrap();
        assert_eq!(content, wav);
    }

    #[test]
    fn test_size_uses_bytes_sent_not_bytes_buffered() {
        let mut file = upload(Some(WAV_MIMETYPE), wav::pcm_wav(16_000, 1, &[]));
        file.size = 1_000_000;
        assert!(matches!(validate_upload(file, 512_000), Err(AppError::FileSize(_))));
    }
}

#[cfg(all(test, unix))]
mod pipeline_tests {
    use crate::config::AppConfig;
    use crate::handlers;
    use crate::state::AppState;
    use crate::training::tests::script;
    use crate::wav;
    use actix_web::{http::header, test, web, App};
    use base64::Engine;
    use std::collections::HashSet;
    use std::path::{Path, PathBuf};
    use std::time::Duration;
    use tempfile::TempDir;

    const BOUNDARY: &str = "hotword-test-boundary";

    struct Part<'a> {
        name: &'a str,
        filename: &'a str,
        content_type: Option<&'a str>,
        data: Vec<u8>,
    }

    fn sample(filename: &str, data: Vec<u8>) -> Part<'_> {
        Part {
            name: "files",
            filename,
            content_type: Some("audio/wav"),
            data,
        }
    }

    fn samples(n: usize) -> Vec<Part<'static>> {
        const NAMES: [&str; 5] = ["a.wav", "b.wav", "c.wav", "d.wav", "e.wav"];
        (0..n)
            .map(|i| sample(NAMES[i], wav::pcm_wav(16_000, 1, &[i as i16; 16])))
            .collect()
    }

    fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
        let mut body = Vec::new();
        for part in parts {
            body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
            body.extend_from_slice(
                format!(
                    "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
                    part.name, part.filename
                )
                .as_bytes(),
            );
            if let Some(content_type) = part.content_type {
                body.extend_from_slice(format!("Content-Type: {}\r\n", content_type).as_bytes());
            }
            body.extend_from_slice(b"\r\n");
            body.extend_from_slice(&part.data);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
        body
    }

    fn train_request(query: &str, parts: &[Part<'_>]) -> test::TestRequest {
        test::TestRequest::post()
            .uri(&format!("/train{}", query))
            .insert_header((
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", BOUNDARY),
            ))
            .set_payload(multipart_body(parts))
    }

    struct Fixture {
        dir: TempDir,
        config: AppConfig,
    }

    impl Fixture {
        /// `tool` is the body of the stub training script.
        fn new(tool: &str) -> Self {
            let dir = tempfile::tempdir().unwrap();
            let executable = script(dir.path(), "gen_model.sh", tool);
            let mut config = AppConfig::default();
            config.training.executable = executable;
            config.training.tmp_dir = dir.path().join("tmp");
            config.training.timeout_secs = 10;
            config.auth.keys_dir = dir.path().join("keys");
            Fixture { dir, config }
        }

        fn concatenating() -> Self {
            Self::new(r#"cat "$1" "$2" "$3" > "$4""#)
        }

        fn with_key(self, key: &str) -> Self {
            std::fs::create_dir_all(&self.config.auth.keys_dir).unwrap();
            std::fs::write(self.config.auth.keys_dir.join("APIKey.txt"), key).unwrap();
            self
        }

        fn tmp_dir(&self) -> PathBuf {
            self.config.training.tmp_dir.clone()
        }

        fn leftover_files(&self) -> usize {
            std::fs::read_dir(self.tmp_dir())
                .map(|entries| entries.count())
                .unwrap_or(0)
        }

        async fn post(&self, query: &str, parts: &[Part<'_>]) -> (header::HeaderMap, Vec<u8>) {
            let app = test::init_service(
                App::new()
                    .app_data(web::Data::new(AppState::new(self.config.clone())))
                    .configure(handlers::configure),
            )
            .await;

            let req = train_request(query, parts).to_request();
            let resp = test::call_service(&app, req).await;
            assert!(resp.status().is_success());
            let headers = resp.headers().clone();
            let body = test::read_body(resp).await;
            (headers, body.to_vec())
        }

        async fn post_json(&self, query: &str, parts: &[Part<'_>]) -> serde_json::Value {
            let (_, body) = self.post(query, parts).await;
            serde_json::from_slice(&body).unwrap()
        }

        fn path(&self) -> &Path {
            self.dir.path()
        }
    }

    fn expected_model(parts: &[Part<'_>]) -> Vec<u8> {
        parts.iter().flat_map(|p| p.data.clone()).collect()
    }

    #[actix_web::test]
    async fn test_success_returns_base64_model() {
        let fixture = Fixture::concatenating();
        let parts = samples(3);

        let json = fixture.post_json("", &parts).await;

        assert_eq!(json["err"], false);
        let name = json["name"].as_str().unwrap();
        assert!(name.starts_with("model-") && name.ends_with(".pmdl"));
        let data = base64::engine::general_purpose::STANDARD
            .decode(json["data"].as_str().unwrap())
            .unwrap();
        assert_eq!(data, expected_model(&parts));
        assert_eq!(fixture.leftover_files(), 0);
    }

    #[actix_web::test]
    async fn test_success_binary_response() {
        let fixture = Fixture::concatenating();
        let parts = samples(3);

        let (headers, body) = fixture.post("?text=false", &parts).await;

        let content_type = headers.get(header::CONTENT_TYPE).unwrap().to_str().unwrap();
        assert_eq!(content_type, "application/octet-stream");
        let disposition = headers.get(header::CONTENT_DISPOSITION).unwrap().to_str().unwrap();
        assert!(disposition.starts_with("attachment; filename=model-"));
        assert!(disposition.ends_with(".pmdl"));
        assert_eq!(body, expected_model(&parts));
        assert_eq!(fixture.leftover_files(), 0);
    }

    #[actix_web::test]
    async fn test_wrong_file_count_creates_no_files() {
        let fixture = Fixture::concatenating();

        let json = fixture.post_json("", &samples(2)).await;
        assert_eq!(json["err"], true);
        assert_eq!(json["errmsg"], "Incorrect number of files: 2 (3 required)");

        let json = fixture.post_json("", &samples(5)).await;
        assert_eq!(json["errmsg"], "Incorrect number of files: 5 (3 required)");

        assert!(!fixture.tmp_dir().exists());
    }

    #[actix_web::test]
    async fn test_oversized_file_is_named() {
        let fixture = Fixture::concatenating();
        let mut parts = samples(3);
        parts[1] = sample("big.wav", wav::pcm_wav(16_000, 1, &vec![0; 300_000]));

        let json = fixture.post_json("", &parts).await;
        assert_eq!(json["errmsg"], "File big.wav exceeds max size (512000 bytes)");
        assert!(!fixture.tmp_dir().exists());
    }

    #[actix_web::test]
    async fn test_wrong_mimetype_is_rejected() {
        let fixture = Fixture::concatenating();
        let mut parts = samples(3);
        parts[2].content_type = Some("audio/mpeg");

        let json = fixture.post_json("", &parts).await;
        assert_eq!(json["errmsg"], "Wrong mimetype for file c.wav: audio/mpeg");
    }

    #[actix_web::test]
    async fn test_invalid_wav_is_rejected() {
        let fixture = Fixture::concatenating();
        let mut parts = samples(3);
        parts[0].data = b"ID3 this is an mp3 pretending to be a wav".to_vec();

        let json = fixture.post_json("", &parts).await;
        assert_eq!(json["errmsg"], "Wrong file format: a.wav. Should be WAV.");
    }

    #[actix_web::test]
    async fn test_api_key_is_enforced() {
        let fixture = Fixture::concatenating().with_key("hunter2\n");

        let json = fixture.post_json("", &samples(3)).await;
        assert_eq!(json["errmsg"], "Invalid API Key");

        let json = fixture.post_json("?api_key=wrong", &samples(3)).await;
        assert_eq!(json["errmsg"], "Invalid API Key");
        assert!(!fixture.tmp_dir().exists());

        let json = fixture.post_json("?api_key=hunter2", &samples(3)).await;
        assert_eq!(json["err"], false);
    }

    #[actix_web::test]
    async fn test_no_key_file_accepts_any_key() {
        let fixture = Fixture::concatenating();
        let json = fixture.post_json("?api_key=whatever", &samples(3)).await;
        assert_eq!(json["err"], false);
    }

    #[actix_web::test]
    async fn test_nonzero_exit_reports_code_and_output() {
        let fixture = Fixture::new("echo 'not enough voice' >&2; touch \"$4\"; exit 7");

        let json = fixture.post_json("", &samples(3)).await;
        assert_eq!(json["err"], true);
        let message = json["errmsg"].as_str().unwrap();
        assert!(message.contains("exited with code 7"));
        assert!(message.contains("not enough voice"));
        assert_eq!(fixture.leftover_files(), 0);
    }

    #[actix_web::test]
    async fn test_missing_executable_is_reported() {
        let mut fixture = Fixture::concatenating();
        fixture.config.training.executable = fixture.path().join("missing.sh");

        let json = fixture.post_json("", &samples(3)).await;
        assert!(json["errmsg"].as_str().unwrap().starts_with("Error generating model:"));
        assert_eq!(fixture.leftover_files(), 0);
    }

    #[actix_web::test]
    async fn test_missing_model_is_read_error() {
        let fixture = Fixture::new("exit 0");

        let json = fixture.post_json("", &samples(3)).await;
        assert!(json["errmsg"]
            .as_str()
            .unwrap()
            .starts_with("Error reading model from filesystem:"));
        assert_eq!(fixture.leftover_files(), 0);
    }

    #[actix_web::test]
    async fn test_unwritable_tmp_dir_is_write_error() {
        let mut fixture = Fixture::concatenating();
        // A regular file where the temp directory should be
        let blocker = fixture.path().join("blocker");
        std::fs::write(&blocker, b"").unwrap();
        fixture.config.training.tmp_dir = blocker;

        let json = fixture.post_json("", &samples(3)).await;
        assert!(json["errmsg"]
            .as_str()
            .unwrap()
            .starts_with("Error writing to filesystem:"));
    }

    #[actix_web::test]
    async fn test_invalid_text_flag_is_rejected() {
        let fixture = Fixture::concatenating();
        let json = fixture.post_json("?text=maybe", &samples(3)).await;
        assert_eq!(json["errmsg"], "Invalid boolean value for text: maybe");
    }

    #[actix_web::test]
    async fn test_malformed_query_gets_error_envelope() {
        let fixture = Fixture::concatenating();

        let json = fixture.post_json("?api_key=a&api_key=b", &samples(3)).await;
        assert_eq!(json["err"], true);
        let message = json["errmsg"].as_str().unwrap();
        assert!(message.starts_with("Invalid query string:"), "{}", message);
        assert!(message.contains("api_key"));
        assert!(!fixture.tmp_dir().exists());
    }

    #[actix_web::test]
    async fn test_timeout_leaves_no_late_output() {
        // The forked trainer outlives the wrapper's timeout and would write
        // the output path after the request is answered.
        let mut fixture = Fixture::new(r#"(sleep 2; echo late > "$4") & sleep 6"#);
        fixture.config.training.timeout_secs = 1;

        let json = fixture.post_json("", &samples(3)).await;
        assert_eq!(json["errmsg"], "Error generating model: training tool timed out after 1s");
        assert_eq!(fixture.leftover_files(), 0);

        tokio::time::sleep(Duration::from_millis(2500)).await;
        assert_eq!(fixture.leftover_files(), 0);
    }

    #[actix_web::test]
    async fn test_concurrent_requests_run_one_at_a_time() {
        // Each run logs its arguments; a run that starts while another
        // holds the lock directory logs an overlap.
        let mut fixture = Fixture::new(
            r#"d=$(dirname "$0")
mkdir "$d/running" 2>/dev/null || echo overlap >> "$d/runs.log"
echo "$1 $2 $3 $4" >> "$d/runs.log"
sleep 0.2
cat "$1" "$2" "$3" > "$4"
rmdir "$d/running""#,
        );
        fixture.config.training.max_concurrent_jobs = 1;

        let state = web::Data::new(AppState::new(fixture.config.clone()));
        let app = test::init_service(
            App::new()
                .app_data(state.clone())
                .configure(handlers::configure),
        )
        .await;

        let parts = samples(3);
        let responses = futures_util::future::join_all(
            (0..4).map(|_| test::call_service(&app, train_request("", &parts).to_request())),
        )
        .await;
        for resp in responses {
            let json: serde_json::Value = test::read_body_json(resp).await;
            assert_eq!(json["err"], false, "{}", json);
        }

        let log = std::fs::read_to_string(fixture.path().join("runs.log")).unwrap();
        let lines: Vec<&str> = log.lines().collect();
        assert!(!lines.contains(&"overlap"), "runs overlapped: {:?}", lines);
        assert_eq!(lines.len(), 4);

        let paths: HashSet<&str> = lines.iter().flat_map(|line| line.split(' ')).collect();
        assert_eq!(paths.len(), 16);
        assert_eq!(fixture.leftover_files(), 0);
        assert_eq!(state.invoker.available_slots(), 1);
        assert_eq!(state.get_metrics_snapshot().active_jobs, 0);
    }

    #[actix_web::test]
    async fn test_other_fields_are_ignored() {
        let fixture = Fixture::concatenating();
        let mut parts = samples(3);
        parts.insert(
            1,
            Part {
                name: "comment",
                filename: "notes.txt",
                content_type: Some("text/plain"),
                data: b"hello".to_vec(),
            },
        );

        let json = fixture.post_json("", &parts).await;
        assert_eq!(json["err"], false);
    }
}
