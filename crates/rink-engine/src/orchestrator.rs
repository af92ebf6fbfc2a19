use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::bail;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use rink_contracts::events::{EventPayload, EventWriter};
use rink_contracts::history::{GeneratedResult, ResultIdClock};
use rink_contracts::params::DesignParams;
use serde_json::{json, Map, Value};
use sha2::{Digest, Sha256};

use crate::config::{EngineConfig, IMAGE_ASPECT_RATIO};
use crate::error::GenerateError;
use crate::prompt::compile;
use crate::providers::{
    default_provider_registry, ImageProviderRegistry, ProviderRequest, ProviderResponse,
    ResponsePart,
};

pub const IMAGE_DATA_URI_PREFIX: &str = "data:image/png;base64,";

/// Runs one generation at a time against the selected image provider.
///
/// The in-flight slot is owned here: a `submit` that overlaps another one fails
/// with [`GenerateError::Busy`] instead of queueing. There is no retry, timeout
/// (unless configured on the HTTP client) or cancellation.
pub struct DesignEngine {
    providers: ImageProviderRegistry,
    provider: String,
    model: String,
    events: EventWriter,
    ids: ResultIdClock,
    in_flight: AtomicBool,
}

struct InFlightSlot<'a> {
    flag: &'a AtomicBool,
}

impl Drop for InFlightSlot<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

impl DesignEngine {
    pub fn new(config: &EngineConfig, provider: &str, events: EventWriter) -> anyhow::Result<Self> {
        let providers = default_provider_registry(config)?;
        Self::with_registry(providers, provider, &config.image_model, events)
    }

    pub fn with_registry(
        providers: ImageProviderRegistry,
        provider: &str,
        model: &str,
        events: EventWriter,
    ) -> anyhow::Result<Self> {
        if providers.get(provider).is_none() {
            bail!(
                "unknown image provider '{provider}' (available: {})",
                providers.names().join(", ")
            );
        }
        let engine = Self {
            providers,
            provider: provider.to_string(),
            model: model.to_string(),
            events,
            ids: ResultIdClock::new(),
            in_flight: AtomicBool::new(false),
        };
        engine.log(
            "session_started",
            map_object(json!({
                "provider": provider,
                "model": model,
            })),
        );
        Ok(engine)
    }

    pub fn provider_name(&self) -> &str {
        &self.provider
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn events(&self) -> &EventWriter {
        &self.events
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Validates, compiles and sends one design request. Either a complete result
    /// comes back or an error; nothing partial is ever returned.
    pub fn submit(&self, params: &DesignParams) -> Result<GeneratedResult, GenerateError> {
        let outcome = self.try_submit(params);
        if let Err(err) = &outcome {
            let detail = match err {
                GenerateError::NoImage { detail } => detail.clone(),
                _ => None,
            };
            self.log(
                "generation_failed",
                map_object(json!({
                    "kind": err.kind(),
                    "message": err.to_string(),
                    "detail": detail,
                })),
            );
        }
        outcome
    }

    fn try_submit(&self, params: &DesignParams) -> Result<GeneratedResult, GenerateError> {
        let _slot = self.claim_slot()?;
        params.validate()?;

        let provider = self.providers.get(&self.provider).ok_or_else(|| {
            GenerateError::Config(format!("unknown image provider '{}'", self.provider))
        })?;
        let compiled = compile(params);
        let prompt_sha256 = sha256_hex(&compiled.prompt);
        self.log(
            "generation_started",
            map_object(json!({
                "provider": self.provider,
                "model": self.model,
                "style": params.style.label(),
                "mode": params.mode.as_str(),
                "colors": params.colors,
                "has_reference": compiled.attachment.is_some(),
                "prompt_sha256": prompt_sha256,
            })),
        );

        let request = ProviderRequest {
            model: self.model.clone(),
            prompt: compiled.prompt,
            attachment: compiled.attachment,
            aspect_ratio: IMAGE_ASPECT_RATIO.to_string(),
        };
        let response = provider.generate(&request)?;
        let (image_url, image_bytes) = first_image_data_uri(&response)?;

        let (id, created_at) = self.ids.next();
        let result = GeneratedResult {
            id,
            image_url,
            params: params.clone(),
            created_at,
            prompt: request.prompt,
        };
        self.log(
            "generation_finished",
            map_object(json!({
                "result_id": result.id,
                "prompt_sha256": prompt_sha256,
                "image_bytes": image_bytes,
                "provider_request": Value::Object(response.provider_request),
            })),
        );
        Ok(result)
    }

    fn claim_slot(&self) -> Result<InFlightSlot<'_>, GenerateError> {
        self.in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| GenerateError::Busy)?;
        Ok(InFlightSlot {
            flag: &self.in_flight,
        })
    }

    fn log(&self, event_type: &str, payload: EventPayload) {
        if let Err(err) = self.events.emit(event_type, payload) {
            eprintln!("rink: failed to record {event_type} event: {err:#}");
        }
    }
}

/// First inline image part wins; its payload must be valid base64.
fn first_image_data_uri(response: &ProviderResponse) -> Result<(String, usize), GenerateError> {
    let data = response.parts.iter().find_map(|part| match part {
        ResponsePart::InlineImage { data, .. } if !data.is_empty() => Some(data.as_str()),
        _ => None,
    });
    let Some(data) = data else {
        return Err(GenerateError::NoImage {
            detail: response.text(),
        });
    };
    let bytes = BASE64
        .decode(data.as_bytes())
        .map_err(|err| GenerateError::Service(format!("image payload was not valid base64: {err}")))?;
    Ok((format!("{IMAGE_DATA_URI_PREFIX}{data}"), bytes.len()))
}

fn sha256_hex(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    hex::encode(hasher.finalize())
}

fn map_object(value: Value) -> Map<String, Value> {
    value.as_object().cloned().unwrap_or_default()
}

#[cfg(test)]
pub(crate) mod tests {
    use std::fs;
    use std::sync::mpsc;
    use std::sync::{Arc, Mutex};
    use std::thread;

    use rink_contracts::events::EventWriter;
    use rink_contracts::params::{DesignParams, ParamsError, RenderMode};
    use rink_contracts::styles::StyleCatalog;
    use serde_json::Value;

    use super::{DesignEngine, IMAGE_DATA_URI_PREFIX};
    use crate::config::EngineConfig;
    use crate::error::GenerateError;
    use crate::prompt::{compile, FLAT_2D_DIRECTIVE};
    use crate::providers::{
        ImageProvider, ImageProviderRegistry, ProviderError, ProviderRequest, ProviderResponse,
        ResponsePart,
    };

    pub(crate) const PNG_BASE64: &str =
        "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAIAAACQd1PeAAAADElEQVR4nGP4z8AAAAMBAQDJ/pLvAAAAAElFTkSuQmCC";

    /// Replays one canned outcome and records every request it sees.
    pub(crate) struct ScriptedProvider {
        outcome: Result<Vec<ResponsePart>, ProviderError>,
        pub(crate) seen: Arc<Mutex<Vec<ProviderRequest>>>,
    }

    impl ScriptedProvider {
        pub(crate) fn new(outcome: Result<Vec<ResponsePart>, ProviderError>) -> Self {
            Self {
                outcome,
                seen: Arc::new(Mutex::new(Vec::new())),
            }
        }

        pub(crate) fn image() -> Self {
            Self::new(Ok(vec![
                ResponsePart::Text("Here is the print.".to_string()),
                ResponsePart::InlineImage {
                    mime_type: Some("image/png".to_string()),
                    data: PNG_BASE64.to_string(),
                },
            ]))
        }
    }

    impl ImageProvider for ScriptedProvider {
        fn name(&self) -> &str {
            "scripted"
        }

        fn generate(&self, request: &ProviderRequest) -> Result<ProviderResponse, ProviderError> {
            if let Ok(mut seen) = self.seen.lock() {
                seen.push(request.clone());
            }
            self.outcome.clone().map(|parts| ProviderResponse {
                parts,
                ..ProviderResponse::default()
            })
        }
    }

    pub(crate) fn engine_with<P: ImageProvider + 'static>(
        provider: P,
        events: EventWriter,
    ) -> anyhow::Result<DesignEngine> {
        let name = provider.name().to_string();
        let mut registry = ImageProviderRegistry::new();
        registry.register(provider);
        DesignEngine::with_registry(registry, &name, "gemini-2.5-flash-image", events)
    }

    pub(crate) fn city_hockey() -> DesignParams {
        DesignParams {
            text: "CITY\nHOCKEY".to_string(),
            colors: "#EF4444, #000000".to_string(),
            style: StyleCatalog::global().get(25).unwrap_or_default(),
            mode: RenderMode::TwoD,
            ..DesignParams::default()
        }
    }

    fn event_types(path: &std::path::Path) -> anyhow::Result<Vec<String>> {
        let raw = fs::read_to_string(path)?;
        Ok(raw
            .lines()
            .filter_map(|line| serde_json::from_str::<Value>(line).ok())
            .filter_map(|row| row.get("type").and_then(Value::as_str).map(str::to_string))
            .collect())
    }

    #[test]
    fn submit_returns_png_data_uri_and_compiled_prompt() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let events_path = temp.path().join("events.jsonl");
        let provider = ScriptedProvider::image();
        let seen = provider.seen.clone();
        let engine = engine_with(provider, EventWriter::new(&events_path, "studio-test"))?;

        let params = city_hockey();
        let result = engine.submit(&params)?;
        let expected_prompt = compile(&params).prompt;

        assert!(result.image_url.starts_with(IMAGE_DATA_URI_PREFIX));
        assert_eq!(result.prompt, expected_prompt);
        assert!(result.prompt.contains(FLAT_2D_DIRECTIVE));
        assert_eq!(result.params, params);
        assert!(!result.id.is_empty());
        assert!(!engine.is_busy());

        let seen = seen.lock().map_err(|_| anyhow::anyhow!("poisoned"))?;
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].prompt, expected_prompt);
        assert_eq!(seen[0].aspect_ratio, "1:1");
        assert!(seen[0].attachment.is_none());

        assert_eq!(
            event_types(&events_path)?,
            vec!["session_started", "generation_started", "generation_finished"]
        );
        Ok(())
    }

    #[test]
    fn response_without_image_is_a_distinct_error() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let events_path = temp.path().join("events.jsonl");
        let engine = engine_with(
            ScriptedProvider::new(Ok(vec![ResponsePart::Text(
                "I can't draw that.".to_string(),
            )])),
            EventWriter::new(&events_path, "studio-test"),
        )?;

        let err = engine.submit(&city_hockey()).err();
        assert_eq!(
            err,
            Some(GenerateError::NoImage {
                detail: Some("I can't draw that.".to_string())
            })
        );
        assert!(!engine.is_busy());

        let raw = fs::read_to_string(&events_path)?;
        let failed = raw
            .lines()
            .filter_map(|line| serde_json::from_str::<Value>(line).ok())
            .find(|row| row["type"] == "generation_failed")
            .unwrap_or(Value::Null);
        assert_eq!(failed["kind"], "no_image");
        assert_eq!(failed["detail"], "I can't draw that.");
        Ok(())
    }

    #[test]
    fn service_failures_propagate_without_retry() -> anyhow::Result<()> {
        let provider = ScriptedProvider::new(Err(ProviderError::service(
            "Gemini request failed (429): quota",
        )));
        let seen = provider.seen.clone();
        let engine = engine_with(provider, EventWriter::disabled())?;

        let err = engine.submit(&city_hockey()).err();
        assert_eq!(
            err,
            Some(GenerateError::Service(
                "Gemini request failed (429): quota".to_string()
            ))
        );
        assert_eq!(seen.lock().map(|seen| seen.len()).unwrap_or_default(), 1);
        Ok(())
    }

    #[test]
    fn invalid_base64_image_is_rejected() -> anyhow::Result<()> {
        let engine = engine_with(
            ScriptedProvider::new(Ok(vec![ResponsePart::InlineImage {
                mime_type: None,
                data: "***".to_string(),
            }])),
            EventWriter::disabled(),
        )?;
        assert!(matches!(
            engine.submit(&city_hockey()),
            Err(GenerateError::Service(_))
        ));
        Ok(())
    }

    #[test]
    fn missing_credential_is_a_config_error_without_network() -> anyhow::Result<()> {
        let config = EngineConfig {
            api_base: "http://127.0.0.1:9".to_string(),
            ..EngineConfig::default()
        };
        let engine = DesignEngine::new(&config, "gemini", EventWriter::disabled())?;
        let err = engine.submit(&city_hockey()).err();
        assert!(matches!(err, Some(GenerateError::Config(ref message)) if message.contains("API Key is missing")));
        Ok(())
    }

    #[test]
    fn invalid_params_never_reach_provider() -> anyhow::Result<()> {
        let provider = ScriptedProvider::image();
        let seen = provider.seen.clone();
        let engine = engine_with(provider, EventWriter::disabled())?;
        let mut params = city_hockey();
        params.text = "  ".to_string();
        assert_eq!(
            engine.submit(&params).err(),
            Some(GenerateError::InvalidParams(ParamsError::EmptyText))
        );
        assert_eq!(seen.lock().map(|seen| seen.len()).unwrap_or_default(), 0);
        Ok(())
    }

    #[test]
    fn unwritable_event_log_does_not_block_generation() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let blocker = temp.path().join("not-a-dir");
        fs::write(&blocker, "file")?;
        let events = EventWriter::new(blocker.join("events.jsonl"), "studio-test");

        let engine = engine_with(ScriptedProvider::image(), events)?;
        let result = engine.submit(&city_hockey())?;
        assert!(result.image_url.starts_with(IMAGE_DATA_URI_PREFIX));
        Ok(())
    }

    #[test]
    fn unknown_provider_is_rejected_up_front() {
        let registry = ImageProviderRegistry::new();
        let err = DesignEngine::with_registry(registry, "nope", "m", EventWriter::disabled())
            .err()
            .map(|err| err.to_string())
            .unwrap_or_default();
        assert!(err.contains("unknown image provider 'nope'"));
    }

    struct GatedProvider {
        entered: Mutex<mpsc::Sender<()>>,
        release: Mutex<mpsc::Receiver<()>>,
    }

    impl ImageProvider for GatedProvider {
        fn name(&self) -> &str {
            "gated"
        }

        fn generate(&self, _request: &ProviderRequest) -> Result<ProviderResponse, ProviderError> {
            if let Ok(entered) = self.entered.lock() {
                let _ = entered.send(());
            }
            if let Ok(release) = self.release.lock() {
                let _ = release.recv();
            }
            Ok(ProviderResponse {
                parts: vec![ResponsePart::InlineImage {
                    mime_type: Some("image/png".to_string()),
                    data: PNG_BASE64.to_string(),
                }],
                ..ProviderResponse::default()
            })
        }
    }

    #[test]
    fn overlapping_submit_is_rejected_while_in_flight() -> anyhow::Result<()> {
        let (entered_tx, entered_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel();
        let engine = engine_with(
            GatedProvider {
                entered: Mutex::new(entered_tx),
                release: Mutex::new(release_rx),
            },
            EventWriter::disabled(),
        )?;
        let params = city_hockey();

        let first = thread::scope(|scope| -> anyhow::Result<_> {
            let handle = scope.spawn(|| engine.submit(&params));
            entered_rx.recv()?;
            assert!(engine.is_busy());
            assert_eq!(engine.submit(&params).err(), Some(GenerateError::Busy));
            release_tx.send(())?;
            handle
                .join()
                .map_err(|_| anyhow::anyhow!("generation thread panicked"))
        })?;

        assert!(first.is_ok());
        assert!(!engine.is_busy());
        release_tx.send(())?;
        assert!(engine.submit(&params).is_ok());
        Ok(())
    }

    #[test]
    fn result_ids_are_unique() -> anyhow::Result<()> {
        let engine = engine_with(ScriptedProvider::image(), EventWriter::disabled())?;
        let first = engine.submit(&city_hockey())?;
        let second = engine.submit(&city_hockey())?;
        assert_ne!(first.id, second.id);
        Ok(())
    }
}
