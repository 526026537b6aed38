// Cliente HTTP del servicio de completions.
use crate::errors::{ProviderError, Result};
use crate::settings::CompletionSettings;
use serde::{Deserialize, Serialize};

/// Cuerpo de la petición `completions`. Los parámetros son fijos: salida
/// determinista y corte en `#` o `;` para obtener sólo el cuerpo del SQL.
#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
  prompt: &'a str,
  temperature: f32,
  max_tokens: u32,
  top_p: f32,
  frequency_penalty: f32,
  presence_penalty: f32,
  stop: [&'static str; 2],
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
  #[serde(default)]
  choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
  #[serde(default)]
  text: String,
}

#[derive(Debug, Clone)]
pub struct CompletionClient {
  http: reqwest::Client,
  settings: CompletionSettings,
}

impl CompletionClient {
  pub fn new(http: reqwest::Client, settings: CompletionSettings) -> Self {
    Self { http, settings }
  }

  pub fn settings(&self) -> &CompletionSettings {
    &self.settings
  }

  /// Envía `prompt` y devuelve el texto de la primera opción.
  pub async fn complete(&self, prompt: &str) -> Result<String> {
    let body = CompletionRequest { prompt,
                                   temperature: self.settings.temperature,
                                   max_tokens: self.settings.max_tokens,
                                   top_p: 1.0,
                                   frequency_penalty: 0.0,
                                   presence_penalty: 0.0,
                                   stop: ["#", ";"] };
    log::debug!("solicitando completion al deployment {}", self.settings.deployment);
    let resp = self.http
                   .post(self.settings.completions_url())
                   .header("api-key", &self.settings.api_key)
                   .json(&body)
                   .send()
                   .await
                   .map_err(|e| ProviderError::Completion(e.to_string()))?;
    let status = resp.status();
    if !status.is_success() {
      let text = resp.text().await.unwrap_or_default();
      return Err(ProviderError::Completion(format!("HTTP {}: {}", status, text)));
    }
    let parsed: CompletionResponse = resp.json()
                                         .await
                                         .map_err(|e| ProviderError::Completion(format!("respuesta inválida: {}", e)))?;
    first_choice(parsed)
  }
}

fn first_choice(resp: CompletionResponse) -> Result<String> {
  resp.choices
      .into_iter()
      .next()
      .map(|c| c.text)
      .ok_or_else(|| ProviderError::Completion("la respuesta no contiene opciones".into()))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn request_carries_fixed_parameters() {
    let body = CompletionRequest { prompt: "p",
                                   temperature: 0.0,
                                   max_tokens: 150,
                                   top_p: 1.0,
                                   frequency_penalty: 0.0,
                                   presence_penalty: 0.0,
                                   stop: ["#", ";"] };
    let v = serde_json::to_value(&body).unwrap();
    assert_eq!(v["max_tokens"], 150);
    assert_eq!(v["stop"], serde_json::json!(["#", ";"]));
  }

  #[test]
  fn first_choice_text_is_used() {
    let resp: CompletionResponse =
      serde_json::from_str(r#"{"choices":[{"text":" id FROM users"},{"text":"other"}]}"#).unwrap();
    assert_eq!(first_choice(resp).unwrap(), " id FROM users");
  }

  #[test]
  fn missing_choices_is_an_error() {
    let resp: CompletionResponse = serde_json::from_str(r#"{"id":"x"}"#).unwrap();
    assert!(matches!(first_choice(resp), Err(ProviderError::Completion(_))));
  }
}
